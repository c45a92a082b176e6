// Shared test doubles for the integration suite.
#![allow(dead_code)]

use std::collections::VecDeque;

use async_trait::async_trait;
use parking_lot::Mutex;

use crypto_market_sync::{HttpResponse, HttpTransport};

/// One scripted transport outcome.
pub enum Step {
    Status(u16, String),
    NetErr(String),
}

impl Step {
    pub fn ok_json(body: &str) -> Self {
        Step::Status(200, body.to_string())
    }
}

/// Transport that replays a fixed script and records every requested URL.
/// An exhausted script keeps answering with the configured fallback.
pub struct ScriptedTransport {
    script: Mutex<VecDeque<Step>>,
    calls: Mutex<Vec<String>>,
    fallback: Step,
}

impl ScriptedTransport {
    pub fn new(steps: Vec<Step>) -> Self {
        Self {
            script: Mutex::new(steps.into()),
            calls: Mutex::new(Vec::new()),
            fallback: Step::Status(500, "script exhausted".into()),
        }
    }

    pub fn with_fallback(mut self, fallback: Step) -> Self {
        self.fallback = fallback;
        self
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }
}

#[async_trait]
impl HttpTransport for ScriptedTransport {
    async fn get(&self, url: &str) -> Result<HttpResponse, String> {
        self.calls.lock().push(url.to_string());
        let step = self.script.lock().pop_front();
        let step = step.as_ref().unwrap_or(&self.fallback);
        match step {
            Step::Status(status, body) => Ok(HttpResponse {
                status: *status,
                body: body.clone(),
            }),
            Step::NetErr(msg) => Err(msg.clone()),
        }
    }
}
