// Core modules
pub mod api;
pub mod chat;
pub mod config;
pub mod relay;
pub mod tools;
mod types;

// Re-export key types and functions
pub use api::{AppState, create_router};
pub use chat::{ChatService, OllamaPlanner, PrefixPlanner, TurnDecision, TurnPlanner};
pub use config::ToolConfig;
pub use tools::{
    DispatchError, Dispatcher, ToolCallRequest, ToolCallResult, ToolHandler, ToolRegistry,
    ToolSchema, builtin_registry, list_tools,
};
pub use types::{ParamName, ToolName};

use std::sync::Arc;

/// Convenience function to build the HTTP/WebSocket app.
///
/// Registers the built-in tools from `config` and wires dispatch and chat
/// to the same registry.
pub fn create_app(config: &ToolConfig, planner: Arc<dyn TurnPlanner>) -> axum::Router {
    let registry = Arc::new(builtin_registry(config));
    let dispatcher = Dispatcher::new(registry);
    let chat = ChatService::new(dispatcher.clone(), planner);

    create_router(AppState::new(dispatcher, chat))
}
