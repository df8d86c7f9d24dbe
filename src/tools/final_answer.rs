//! final_answer tool - submit results to the central system
//!
//! Dispatching this tool with an ok result is the loop's sole termination
//! signal. A non-zero acknowledgement code means the answer was rejected and
//! the loop keeps running.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::{Result, SleuthError};
use crate::tools::gateway::DbGateway;
use crate::tools::{FINAL_ANSWER, Tool};

pub struct FinalAnswerTool {
    gateway: Arc<dyn DbGateway>,
}

impl FinalAnswerTool {
    pub fn new(gateway: Arc<dyn DbGateway>) -> Self {
        Self { gateway }
    }
}

#[async_trait]
impl Tool for FinalAnswerTool {
    fn name(&self) -> &'static str {
        FINAL_ANSWER
    }

    async fn execute(&self, input: Value) -> Result<Value> {
        let answer: Vec<String> = input["answer"]
            .as_array()
            .ok_or_else(|| SleuthError::Tool("missing 'answer' parameter".into()))?
            .iter()
            .map(|v| match v {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            })
            .collect();

        let ack = self.gateway.report(&answer).await?;

        let code = ack.get("code").and_then(|c| c.as_i64()).unwrap_or(0);
        if code != 0 {
            let message = ack
                .get("message")
                .and_then(|m| m.as_str())
                .unwrap_or("no message");
            return Err(SleuthError::Tool(format!(
                "central system rejected answer (code {}): {}",
                code, message
            )));
        }

        Ok(ack)
    }
}
