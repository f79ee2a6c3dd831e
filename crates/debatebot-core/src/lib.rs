//! Core domain types and the plugin trait for debatebot-rs.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Keyword arguments of a function call.
pub type Arguments = Map<String, Value>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionSpec {
    pub name: String,
    pub description: String,
    pub parameters: Value,
}

impl FunctionSpec {
    pub fn new(name: impl Into<String>, description: impl Into<String>, parameters: Value) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            parameters,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionRequest {
    pub function_name: String,
    #[serde(default)]
    pub arguments: Arguments,
}

/// Uniform outcome of a plugin invocation.
///
/// Successful results carry `data`, failed ones carry `error`; `status` is an
/// HTTP-style code either produced locally or copied from the upstream service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionResult {
    pub status: u16,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<Value>,
}

impl ExecutionResult {
    pub fn success(status: u16, data: Value) -> Self {
        Self {
            status,
            data: Some(data),
            error: None,
        }
    }

    pub fn failure(status: u16, error: impl Into<Value>) -> Self {
        Self {
            status,
            data: None,
            error: Some(error.into()),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status) && self.error.is_none()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum PluginError {
    #[error("unknown function: {0}")]
    UnknownFunction(String),
    #[error("invalid arguments: {0}")]
    InvalidArguments(String),
    #[error("configuration error: {0}")]
    Configuration(String),
}

/// Collaborator the orchestrator passes along with every call.
pub trait Helper: Send + Sync {}

/// Helper for callers that have no orchestrator state to share.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopHelper;

impl Helper for NoopHelper {}

#[async_trait]
pub trait Plugin: Send + Sync {
    /// Identifier the orchestrator routes on.
    fn source_name(&self) -> &str;

    fn spec(&self) -> Vec<FunctionSpec>;

    /// Runs `function_name`. Runtime failures are reported through the
    /// returned [`ExecutionResult`]; `Err` is reserved for caller bugs.
    async fn execute(
        &self,
        function_name: &str,
        helper: &dyn Helper,
        arguments: Arguments,
    ) -> Result<ExecutionResult, PluginError>;
}

pub fn ensure_function(expected: &str, function_name: &str) -> Result<(), PluginError> {
    if function_name != expected {
        return Err(PluginError::UnknownFunction(function_name.to_string()));
    }
    Ok(())
}
