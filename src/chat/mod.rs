//! Chat turns.
//!
//! Each inbound chat message is one turn: the planner picks at most one
//! tool, the dispatcher runs it, and exactly one text reply comes back.
//! Failures are turned into a readable message instead of ending the
//! conversation.

pub mod planner;

use std::sync::Arc;

use tracing::{debug, warn};

use crate::tools::{DispatchError, Dispatcher, list_tools};

pub use planner::{OllamaPlanner, PrefixPlanner, TurnDecision, TurnPlanner};

/// Prefix of every reply that reports a failed turn.
pub const FAILURE_MARKER: &str = "❌ Error:";

/// Runs chat turns against the tool registry.
#[derive(Clone)]
pub struct ChatService {
    dispatcher: Dispatcher,
    planner: Arc<dyn TurnPlanner>,
}

impl ChatService {
    pub fn new(dispatcher: Dispatcher, planner: Arc<dyn TurnPlanner>) -> Self {
        Self { dispatcher, planner }
    }

    /// Produce the single reply for `message`.
    pub async fn respond(&self, message: &str) -> String {
        let tools = list_tools(self.dispatcher.registry());

        let decision = match self.planner.plan(message, &tools).await {
            Ok(decision) => decision,
            Err(e) => {
                warn!(error = %format!("{:#}", e), "Planner failed");
                return format!("{} {:#}", FAILURE_MARKER, e);
            }
        };

        match decision {
            TurnDecision::Reply(text) => {
                debug!("Planner replied without a tool call");
                text
            }
            TurnDecision::CallTool { name, arguments } => {
                match self.dispatcher.execute(&name, arguments).await {
                    Ok(result) => result.result,
                    Err(DispatchError::NotFound(tool)) => format!(
                        "{} the model called an unknown tool '{}'.",
                        FAILURE_MARKER, tool
                    ),
                    Err(e) => format!("{} {}", FAILURE_MARKER, e),
                }
            }
        }
    }
}

impl std::fmt::Debug for ChatService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChatService")
            .field("dispatcher", &self.dispatcher)
            .finish_non_exhaustive()
    }
}
