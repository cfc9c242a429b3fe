//! Tool dispatch.
//!
//! Validates a call against the target tool's declared signature, runs the
//! handler and normalises whatever happens into either a result string or a
//! [`DispatchError`].

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::tools::registry::{ToolArgs, ToolRegistry};
use crate::types::{ParamName, ToolName};

/// Incoming tool call: `{"action": "<tool>", "arguments": {...}}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCallRequest {
    pub action: String,
    /// Absent and `null` both mean "no arguments".
    #[serde(default)]
    pub arguments: Option<ToolArgs>,
}

/// Successful tool call, serialised as `{"result": "..."}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolCallResult {
    pub result: String,
}

/// Failure of a tool call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchError {
    /// No tool is registered under the requested name.
    NotFound(ToolName),
    /// The request is unusable (malformed, or missing required arguments).
    BadRequest(String),
    /// The handler failed while running.
    Execution(String),
}

impl DispatchError {
    /// Build the error for a call that lacks required arguments.
    pub fn missing_arguments(tool: &ToolName, missing: &[ParamName]) -> Self {
        let names: Vec<&str> = missing.iter().map(ParamName::as_str).collect();
        Self::BadRequest(format!(
            "Missing required arguments for '{}': {}",
            tool,
            names.join(", ")
        ))
    }

    /// HTTP status code this error maps to.
    pub fn status_code(&self) -> u16 {
        match self {
            Self::NotFound(_) => 404,
            Self::BadRequest(_) => 400,
            Self::Execution(_) => 500,
        }
    }
}

impl std::fmt::Display for DispatchError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotFound(name) => write!(f, "Tool '{}' not found.", name),
            Self::BadRequest(msg) => write!(f, "{}", msg),
            Self::Execution(msg) => write!(f, "Error executing tool: {}", msg),
        }
    }
}

impl std::error::Error for DispatchError {}

/// Runs tool calls against a shared, read-only registry.
#[derive(Clone, Debug)]
pub struct Dispatcher {
    registry: Arc<ToolRegistry>,
}

impl Dispatcher {
    pub fn new(registry: Arc<ToolRegistry>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &Arc<ToolRegistry> {
        &self.registry
    }

    /// Execute `tool_name` with `arguments`.
    ///
    /// Every declared parameter without a default must be present; all
    /// missing ones are reported together. Undeclared keys are forwarded to
    /// the handler untouched. The handler runs on its own task, so a panic
    /// inside it surfaces as [`DispatchError::Execution`] rather than
    /// unwinding into the caller.
    pub async fn execute(
        &self,
        tool_name: &str,
        arguments: ToolArgs,
    ) -> Result<ToolCallResult, DispatchError> {
        let name = ToolName::new(tool_name);
        let handler = self
            .registry
            .get(tool_name)
            .ok_or_else(|| DispatchError::NotFound(name.clone()))?;

        let missing: Vec<ParamName> = handler
            .required_params()
            .into_iter()
            .filter(|param| !arguments.contains_key(param.as_str()))
            .collect();
        if !missing.is_empty() {
            debug!(tool = %name, ?missing, "Rejecting call with missing arguments");
            return Err(DispatchError::missing_arguments(&name, &missing));
        }

        info!(tool = %name, arg_count = arguments.len(), "Executing tool");
        let task = tokio::spawn(async move { handler.call(arguments).await });

        match task.await {
            Ok(Ok(result)) => Ok(ToolCallResult { result }),
            Ok(Err(e)) => {
                warn!(tool = %name, error = %format!("{:#}", e), "Tool returned an error");
                Err(DispatchError::Execution(format!("{:#}", e)))
            }
            Err(join_err) => {
                warn!(tool = %name, error = %join_err, "Tool task did not complete");
                let msg = if join_err.is_panic() {
                    "tool panicked during execution".to_string()
                } else {
                    "tool execution was cancelled".to_string()
                };
                Err(DispatchError::Execution(msg))
            }
        }
    }
}
