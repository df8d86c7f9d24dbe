//! Actions and execution results
//!
//! An action is one parameterized tool invocation, frozen once dispatched.
//! Every action produces exactly one execution result. The gateway convention
//! `error == "OK"` for success is interpreted in exactly one place here.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Prefix marking results of argument validation failures
///
/// The controller branches on this to apply the retry-once-then-fatal policy.
pub const SCHEMA_VIOLATION_PREFIX: &str = "schema violation: ";

/// Success marker used by the database gateway's `error` field
const GATEWAY_OK: &str = "OK";

/// One parameterized tool invocation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Action {
    /// Short reasoning behind the selection, diagnostic only
    pub rationale: String,
    pub tool_name: String,
    pub arguments: Value,
}

impl Action {
    pub fn new(tool_name: impl Into<String>, rationale: impl Into<String>, arguments: Value) -> Self {
        Self {
            rationale: rationale.into(),
            tool_name: tool_name.into(),
            arguments,
        }
    }
}

/// Outcome status of one execution
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecStatus {
    Ok,
    Error,
}

/// Result of dispatching one action, produced exactly once
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionResult {
    pub status: ExecStatus,
    /// Tool-specific value on success, null on error
    pub payload: Value,
    /// Human-readable failure description on error
    pub error_detail: Option<String>,
}

impl ExecutionResult {
    /// Create a successful result
    pub fn ok(payload: Value) -> Self {
        Self {
            status: ExecStatus::Ok,
            payload,
            error_detail: None,
        }
    }

    /// Create a failed result
    pub fn error(detail: impl Into<String>) -> Self {
        Self {
            status: ExecStatus::Error,
            payload: Value::Null,
            error_detail: Some(detail.into()),
        }
    }

    /// Create a failed result for an argument validation failure
    pub fn schema_violation(detail: impl Into<String>) -> Self {
        Self::error(format!("{}{}", SCHEMA_VIOLATION_PREFIX, detail.into()))
    }

    pub fn is_ok(&self) -> bool {
        self.status == ExecStatus::Ok
    }

    pub fn is_error(&self) -> bool {
        self.status == ExecStatus::Error
    }

    /// Whether this result records an argument validation failure
    pub fn is_schema_violation(&self) -> bool {
        self.error_detail
            .as_deref()
            .is_some_and(|d| d.starts_with(SCHEMA_VIOLATION_PREFIX))
    }

    /// Interpret a raw tool reply using the gateway conventions
    ///
    /// Objects carry `{reply, error}` where `error == "OK"` means success and
    /// any other string is a failure description. Strings are raw reasoning
    /// output where emptiness is the failure signal. Anything else is taken
    /// as a successful payload.
    pub fn from_reply(reply: Value) -> Self {
        match &reply {
            Value::Object(map) => match map.get("error").and_then(|e| e.as_str()) {
                Some(GATEWAY_OK) | None => {
                    let payload = map.get("reply").cloned().unwrap_or(reply.clone());
                    Self::ok(payload)
                }
                Some(detail) => Self::error(detail.to_string()),
            },
            Value::String(text) => {
                let trimmed = text.trim();
                if trimmed.is_empty() {
                    Self::error("tool returned an empty reply")
                } else {
                    Self::ok(Value::String(trimmed.to_string()))
                }
            }
            _ => Self::ok(reply),
        }
    }
}
