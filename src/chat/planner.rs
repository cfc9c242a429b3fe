//! Turn planners: decide what a single chat message should do.
//!
//! A planner looks at one user message and the current tool listing and
//! returns either one tool call or a plain-text reply. Tools are never
//! chained within a turn.

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use anyhow::{Context, anyhow};
use serde::Deserialize;
use serde_json::{Value, json};

use crate::config::OllamaConfig;
use crate::tools::{ToolArgs, ToolSchema};

const SYSTEM_PROMPT: &str = "You are a helpful assistant with access to tools. \
When the user asks for something one of the tools can do, you MUST call that tool \
with arguments taken from the user's message. Do not ask for confirmation before \
calling a tool. Otherwise, answer the user directly.";

const PLANNER_TIMEOUT: Duration = Duration::from_secs(120);

/// What to do with a chat turn.
#[derive(Debug, Clone, PartialEq)]
pub enum TurnDecision {
    /// Invoke one tool with these arguments.
    CallTool { name: String, arguments: ToolArgs },
    /// Send this text back as-is.
    Reply(String),
}

pub type PlanFuture<'a> = Pin<Box<dyn Future<Output = anyhow::Result<TurnDecision>> + Send + 'a>>;

pub trait TurnPlanner: Send + Sync {
    fn plan<'a>(&'a self, message: &'a str, tools: &'a [ToolSchema]) -> PlanFuture<'a>;
}

/// Offline planner driven by an explicit `tool_name: text` prefix.
///
/// When the prefix names a listed tool, the text is bound to that tool's
/// first required parameter. Every other message is echoed back.
#[derive(Debug, Clone, Copy, Default)]
pub struct PrefixPlanner;

impl PrefixPlanner {
    pub fn decide(message: &str, tools: &[ToolSchema]) -> TurnDecision {
        if let Some((prefix, rest)) = message.split_once(':') {
            let prefix = prefix.trim();
            if let Some(tool) = tools.iter().find(|t| t.function.name == prefix) {
                let mut arguments = ToolArgs::new();
                if let Some(param) = tool.function.parameters.required.first() {
                    arguments.insert(param.clone(), Value::String(rest.trim().to_string()));
                }
                return TurnDecision::CallTool {
                    name: prefix.to_string(),
                    arguments,
                };
            }
        }
        TurnDecision::Reply(format!("Echo: {}", message))
    }
}

impl TurnPlanner for PrefixPlanner {
    fn plan<'a>(&'a self, message: &'a str, tools: &'a [ToolSchema]) -> PlanFuture<'a> {
        Box::pin(async move { Ok(Self::decide(message, tools)) })
    }
}

#[derive(Debug, Deserialize)]
struct OllamaChatResponse {
    message: OllamaMessage,
}

#[derive(Debug, Deserialize)]
struct OllamaMessage {
    #[serde(default)]
    content: String,
    #[serde(default)]
    tool_calls: Vec<OllamaToolCall>,
}

#[derive(Debug, Deserialize)]
struct OllamaToolCall {
    function: OllamaFunctionCall,
}

#[derive(Debug, Deserialize)]
struct OllamaFunctionCall {
    name: String,
    #[serde(default)]
    arguments: Value,
}

/// Planner backed by a local Ollama model with native tool calling.
pub struct OllamaPlanner {
    config: OllamaConfig,
    http: reqwest::Client,
}

impl OllamaPlanner {
    pub fn new(config: OllamaConfig, http: reqwest::Client) -> Self {
        Self { config, http }
    }

    async fn ask(&self, message: &str, tools: &[ToolSchema]) -> anyhow::Result<TurnDecision> {
        let url = format!("{}/api/chat", self.config.url.trim_end_matches('/'));
        let request = json!({
            "model": self.config.model,
            "messages": [
                {"role": "system", "content": SYSTEM_PROMPT},
                {"role": "user", "content": message}
            ],
            "tools": tools,
            "stream": false,
            "options": {"temperature": 0.0}
        });

        let response = self
            .http
            .post(&url)
            .json(&request)
            .timeout(PLANNER_TIMEOUT)
            .send()
            .await
            .with_context(|| format!("Ollama request failed. Is Ollama running at {}?", self.config.url))?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(anyhow!("Ollama error ({}): {}", status, text));
        }

        let parsed: OllamaChatResponse = response
            .json()
            .await
            .context("Failed to parse Ollama response")?;

        match parsed.message.tool_calls.into_iter().next() {
            Some(call) => {
                let arguments = tool_arguments(call.function.arguments)?;
                tracing::info!(tool = %call.function.name, "Model requested a tool call");
                Ok(TurnDecision::CallTool {
                    name: call.function.name,
                    arguments,
                })
            }
            None => Ok(TurnDecision::Reply(parsed.message.content)),
        }
    }
}

/// Normalise model-produced arguments into an object.
///
/// Some models emit the arguments as a JSON-encoded string.
fn tool_arguments(raw: Value) -> anyhow::Result<ToolArgs> {
    match raw {
        Value::Object(map) => Ok(map),
        Value::Null => Ok(ToolArgs::new()),
        Value::String(text) => match serde_json::from_str::<Value>(&text) {
            Ok(Value::Object(map)) => Ok(map),
            _ => Err(anyhow!("Model returned unusable tool arguments: {}", text)),
        },
        other => Err(anyhow!("Model returned unusable tool arguments: {}", other)),
    }
}

impl TurnPlanner for OllamaPlanner {
    fn plan<'a>(&'a self, message: &'a str, tools: &'a [ToolSchema]) -> PlanFuture<'a> {
        Box::pin(self.ask(message, tools))
    }
}
