// HTTP and WebSocket endpoints

mod error;
mod ws;

pub use error::ApiError;

use axum::{
    Router,
    body::Bytes,
    extract::State,
    response::Json,
    routing::{get, post},
};
use serde_json::Value;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::debug;

use crate::chat::ChatService;
use crate::tools::{Dispatcher, ToolCallRequest, ToolCallResult, ToolSchema, list_tools};

/// Shared state for every route. Cloned per request; everything inside is
/// reference-counted and read-only.
#[derive(Clone, Debug)]
pub struct AppState {
    pub dispatcher: Dispatcher,
    pub chat: ChatService,
}

impl AppState {
    pub fn new(dispatcher: Dispatcher, chat: ChatService) -> Self {
        Self { dispatcher, chat }
    }
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/tools", get(get_tools))
        .route("/execute_tool", post(execute_tool))
        .route("/ws", get(ws::ws_handler))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive()),
        )
        .with_state(state)
}

async fn health_check() -> Json<Value> {
    Json(serde_json::json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339()
    }))
}

async fn get_tools(State(state): State<AppState>) -> Json<Vec<ToolSchema>> {
    Json(list_tools(state.dispatcher.registry()))
}

/// Parse a tool call body.
///
/// The body is decoded by hand so that every malformed request maps to
/// 400 rather than the extractor's own rejection codes.
fn parse_tool_call(body: &[u8]) -> Result<ToolCallRequest, ApiError> {
    serde_json::from_slice(body).map_err(|e| {
        if e.is_syntax() || e.is_eof() {
            ApiError::bad_request("Invalid JSON format in request body.")
        } else {
            ApiError::bad_request(format!("Invalid tool call: {}", e))
        }
    })
}

async fn execute_tool(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<ToolCallResult>, ApiError> {
    let call = parse_tool_call(&body)?;
    debug!(action = %call.action, "Received tool call");

    let result = state
        .dispatcher
        .execute(&call.action, call.arguments.unwrap_or_default())
        .await?;

    Ok(Json(result))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chat::PrefixPlanner;
    use crate::tools::{FnTool, ParamSpec, ToolRegistry};
    use axum::body::Body;
    use axum::http::{Request, StatusCode, header};
    use serde_json::json;
    use std::sync::Arc;
    use tower::ServiceExt;

    fn app(registry: ToolRegistry) -> Router {
        let dispatcher = Dispatcher::new(Arc::new(registry));
        let chat = ChatService::new(dispatcher.clone(), Arc::new(PrefixPlanner));
        create_router(AppState::new(dispatcher, chat))
    }

    fn hello_registry() -> ToolRegistry {
        ToolRegistry::new().register_handler(FnTool::new(
            "hello",
            "Say hello to the world.",
            vec![],
            |_| async { Ok("Hello, World!".to_string()) },
        ))
    }

    fn send_registry() -> ToolRegistry {
        ToolRegistry::new().register_handler(FnTool::new(
            "send",
            "Send a value.\nArgs:\n a: The value.\n b: Optional note.",
            vec![ParamSpec::required("a"), ParamSpec::optional("b")],
            |_| async { Ok("sent".to_string()) },
        ))
    }

    fn post_json(body: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/execute_tool")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn json_body(response: axum::response::Response) -> Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_health() {
        let response = app(ToolRegistry::new())
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await["status"], "healthy");
    }

    #[tokio::test]
    async fn test_list_tools() {
        let response = app(hello_registry())
            .oneshot(Request::builder().uri("/tools").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body[0]["type"], "function");
        assert_eq!(body[0]["function"]["name"], "hello");
        assert_eq!(body[0]["function"]["description"], "Say hello to the world.");
        assert_eq!(body[0]["function"]["parameters"]["required"], json!([]));
    }

    #[tokio::test]
    async fn test_list_tools_empty_registry() {
        let response = app(ToolRegistry::new())
            .oneshot(Request::builder().uri("/tools").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await, json!([]));
    }

    #[tokio::test]
    async fn test_execute_hello() {
        let response = app(hello_registry())
            .oneshot(post_json(r#"{"action":"hello","arguments":{}}"#))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await, json!({"result": "Hello, World!"}));
    }

    #[tokio::test]
    async fn test_execute_without_arguments_field() {
        let response = app(hello_registry())
            .oneshot(post_json(r#"{"action":"hello"}"#))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_execute_unknown_tool() {
        let response = app(hello_registry())
            .oneshot(post_json(r#"{"action":"ghost","arguments":{}}"#))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(
            json_body(response).await,
            json!({"detail": "Tool 'ghost' not found."})
        );
    }

    #[tokio::test]
    async fn test_execute_malformed_json() {
        let response = app(hello_registry())
            .oneshot(post_json(r#"{"action": "hello""#))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            json_body(response).await,
            json!({"detail": "Invalid JSON format in request body."})
        );
    }

    #[tokio::test]
    async fn test_execute_missing_action() {
        let response = app(hello_registry())
            .oneshot(post_json(r#"{"arguments":{}}"#))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_optional_argument_scenario() {
        let router = app(send_registry());

        let ok = router
            .clone()
            .oneshot(post_json(r#"{"action":"send","arguments":{"a":"x"}}"#))
            .await
            .unwrap();
        assert_eq!(ok.status(), StatusCode::OK);
        assert_eq!(json_body(ok).await, json!({"result": "sent"}));

        let missing = router
            .oneshot(post_json(r#"{"action":"send","arguments":{}}"#))
            .await
            .unwrap();
        assert_eq!(missing.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            json_body(missing).await,
            json!({"detail": "Missing required arguments for 'send': a"})
        );
    }

    #[tokio::test]
    async fn test_handler_failure_is_500() {
        let registry = ToolRegistry::new().register_handler(FnTool::new(
            "broken",
            "Fails.",
            vec![],
            |_| async { Err(anyhow::anyhow!("upstream timed out")) },
        ));

        let response = app(registry)
            .oneshot(post_json(r#"{"action":"broken","arguments":{}}"#))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            json_body(response).await,
            json!({"detail": "Error executing tool: upstream timed out"})
        );
    }

    #[tokio::test]
    async fn test_cors_allows_any_origin() {
        let response = app(hello_registry())
            .oneshot(
                Request::builder()
                    .uri("/tools")
                    .header(header::ORIGIN, "http://localhost:5500")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(
            response.headers().get(header::ACCESS_CONTROL_ALLOW_ORIGIN).unwrap(),
            "*"
        );
    }
}
