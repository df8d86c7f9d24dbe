//! LLM client layer - the reasoning component seam
//!
//! This module provides:
//! - Message types for LLM communication
//! - LlmClient trait for API abstraction
//! - AnthropicClient implementation
//! - MockLlmClient for deterministic tests
//! - JSON extraction from free-form model output

pub mod anthropic;
pub mod client;

pub use anthropic::{AnthropicClient, AnthropicConfig};
pub use client::{
    CompletionRequest, CompletionResponse, LlmClient, LlmError, Message, MockLlmClient, Role, Usage,
};

use serde_json::Value;

/// Extract a JSON value from free-form model output
///
/// Handles a fenced ```json block or the first `{`..last `}` span. The agent
/// protocol asks for pure JSON but models occasionally wrap it in prose.
pub fn extract_json(text: &str) -> Result<Value, LlmError> {
    let trimmed = text.trim();

    let candidate = if let Some(start) = trimmed.find("```json") {
        let rest = &trimmed[start + 7..];
        match rest.find("```") {
            Some(end) => rest[..end].trim(),
            None => rest.trim(),
        }
    } else if let (Some(start), Some(end)) = (trimmed.find('{'), trimmed.rfind('}')) {
        if start < end {
            &trimmed[start..=end]
        } else {
            trimmed
        }
    } else {
        return Err(LlmError::InvalidResponse(format!(
            "no JSON object in output: {}",
            trimmed
        )));
    };

    serde_json::from_str(candidate)
        .map_err(|e| LlmError::InvalidResponse(format!("{}: {}", e, candidate)))
}
