//! Tool registry.
//!
//! Provides the `ToolHandler` trait every tool implements and the
//! `ToolRegistry` that maps tool names to handlers. The registry is filled
//! once at startup and then shared read-only behind an `Arc`.

use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use anyhow::Result;
use serde_json::{Map, Value};

use crate::types::{ParamName, ToolName};

/// Arguments of a tool call, keyed by parameter name.
pub type ToolArgs = Map<String, Value>;

/// Future returned by [`ToolHandler::call`].
pub type ToolFuture<'a> = Pin<Box<dyn Future<Output = Result<String>> + Send + 'a>>;

/// One entry of a handler's declared signature.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParamSpec {
    pub name: ParamName,
    /// Parameters with a default may be omitted by callers.
    pub has_default: bool,
}

impl ParamSpec {
    pub fn required(name: impl Into<ParamName>) -> Self {
        Self {
            name: name.into(),
            has_default: false,
        }
    }

    pub fn optional(name: impl Into<ParamName>) -> Self {
        Self {
            name: name.into(),
            has_default: true,
        }
    }

    pub fn is_required(&self) -> bool {
        !self.has_default
    }
}

/// A callable tool.
///
/// Implementors declare their documentation and ordered parameter list up
/// front; discovery and argument validation are derived from those
/// declarations rather than from the call itself.
pub trait ToolHandler: Send + Sync {
    /// Default registry key, used by [`ToolRegistry::register_handler`].
    fn name(&self) -> &str;

    /// Free-form documentation. Text before an `Args:` line is the tool
    /// description; `param: text` lines after it describe parameters.
    fn doc(&self) -> &str;

    /// Declared parameters, in declaration order.
    fn params(&self) -> Vec<ParamSpec>;

    /// Invoke the tool. `args` may contain keys that are not declared.
    fn call(&self, args: ToolArgs) -> ToolFuture<'_>;

    /// Names of the parameters without a default, in declaration order.
    fn required_params(&self) -> Vec<ParamName> {
        self.params()
            .into_iter()
            .filter(ParamSpec::is_required)
            .map(|p| p.name)
            .collect()
    }
}

type BoxedCall = dyn Fn(ToolArgs) -> ToolFuture<'static> + Send + Sync;

/// A `ToolHandler` built from a closure.
///
/// Handy for small tools that need no state of their own.
pub struct FnTool {
    name: String,
    doc: String,
    params: Vec<ParamSpec>,
    call: Box<BoxedCall>,
}

impl FnTool {
    pub fn new<F, Fut>(
        name: impl Into<String>,
        doc: impl Into<String>,
        params: Vec<ParamSpec>,
        f: F,
    ) -> Self
    where
        F: Fn(ToolArgs) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<String>> + Send + 'static,
    {
        Self {
            name: name.into(),
            doc: doc.into(),
            params,
            call: Box::new(move |args| -> ToolFuture<'static> { Box::pin(f(args)) }),
        }
    }
}

impl fmt::Debug for FnTool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnTool")
            .field("name", &self.name)
            .field("params", &self.params)
            .finish_non_exhaustive()
    }
}

impl ToolHandler for FnTool {
    fn name(&self) -> &str {
        &self.name
    }

    fn doc(&self) -> &str {
        &self.doc
    }

    fn params(&self) -> Vec<ParamSpec> {
        self.params.clone()
    }

    fn call(&self, args: ToolArgs) -> ToolFuture<'_> {
        (self.call)(args)
    }
}

/// Registry of tool handlers keyed by [`ToolName`].
///
/// Entries keep their registration order, which is the order discovery
/// reports them in. Re-registering a name replaces the handler in place.
#[derive(Clone, Default)]
pub struct ToolRegistry {
    entries: Vec<(ToolName, Arc<dyn ToolHandler>)>,
    index: HashMap<ToolName, usize>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `handler` under `name` and hand the handler back.
    ///
    /// Any earlier binding for `name` is overwritten.
    pub fn register(
        &mut self,
        name: impl Into<ToolName>,
        handler: Arc<dyn ToolHandler>,
    ) -> Arc<dyn ToolHandler> {
        let name = name.into();
        match self.index.get(&name) {
            Some(&slot) => {
                tracing::debug!(tool = %name, "Replacing registered tool handler");
                self.entries[slot].1 = handler.clone();
            }
            None => {
                tracing::debug!(tool = %name, "Registering tool handler");
                self.index.insert(name.clone(), self.entries.len());
                self.entries.push((name, handler.clone()));
            }
        }
        handler
    }

    /// Builder-style registration under the handler's own name.
    pub fn register_handler<T: ToolHandler + 'static>(mut self, handler: T) -> Self {
        let name = ToolName::new(handler.name());
        self.register(name, Arc::new(handler));
        self
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn ToolHandler>> {
        self.index.get(name).map(|&slot| self.entries[slot].1.clone())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// Entries in registration order.
    pub fn iter(&self) -> impl Iterator<Item = (&ToolName, &Arc<dyn ToolHandler>)> {
        self.entries.iter().map(|(name, handler)| (name, handler))
    }

    pub fn names(&self) -> Vec<ToolName> {
        self.entries.iter().map(|(name, _)| name.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl fmt::Debug for ToolRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ToolRegistry")
            .field("tools", &self.names())
            .finish()
    }
}

/// Read an argument as a string.
///
/// Every parameter is string-typed on the wire, but callers sometimes send
/// numbers or booleans; those are rendered with their JSON text. `null` is
/// treated as absent.
pub fn arg_string(args: &ToolArgs, name: &str) -> Option<String> {
    match args.get(name)? {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn echo_tool(name: &str) -> FnTool {
        FnTool::new(
            name,
            "Echo the input back.",
            vec![ParamSpec::required("text")],
            |args| async move { Ok(arg_string(&args, "text").unwrap_or_default()) },
        )
    }

    #[test]
    fn test_registry_empty() {
        let registry = ToolRegistry::new();
        assert_eq!(registry.len(), 0);
        assert!(registry.is_empty());
        assert!(registry.get("anything").is_none());
    }

    #[test]
    fn test_register_returns_same_handler() {
        let mut registry = ToolRegistry::new();
        let handler: Arc<dyn ToolHandler> = Arc::new(echo_tool("echo"));
        let returned = registry.register("echo", handler.clone());

        assert!(Arc::ptr_eq(&handler, &returned));
        assert!(registry.contains("echo"));
    }

    #[test]
    fn test_register_under_custom_name() {
        let mut registry = ToolRegistry::new();
        registry.register("shout", Arc::new(echo_tool("echo")));

        assert!(registry.contains("shout"));
        assert!(!registry.contains("echo"));
    }

    #[test]
    fn test_last_registration_wins() {
        let mut registry = ToolRegistry::new();
        let first: Arc<dyn ToolHandler> = Arc::new(echo_tool("echo"));
        let second: Arc<dyn ToolHandler> = Arc::new(echo_tool("echo"));
        registry.register("echo", first.clone());
        registry.register("other", Arc::new(echo_tool("other")));
        registry.register("echo", second.clone());

        assert_eq!(registry.len(), 2);
        let current = registry.get("echo").unwrap();
        assert!(Arc::ptr_eq(&current, &second));
        assert!(!Arc::ptr_eq(&current, &first));
        // The replaced entry keeps its original slot.
        assert_eq!(
            registry.names(),
            vec![ToolName::new("echo"), ToolName::new("other")]
        );
    }

    #[test]
    fn test_registration_order_is_kept() {
        let registry = ToolRegistry::new()
            .register_handler(echo_tool("zeta"))
            .register_handler(echo_tool("alpha"))
            .register_handler(echo_tool("mid"));

        let names: Vec<_> = registry.iter().map(|(n, _)| n.as_str().to_string()).collect();
        assert_eq!(names, vec!["zeta", "alpha", "mid"]);
    }

    #[test]
    fn test_required_params_skip_defaults() {
        let tool = FnTool::new(
            "send",
            "Send something.",
            vec![
                ParamSpec::required("a"),
                ParamSpec::optional("b"),
                ParamSpec::required("c"),
            ],
            |_| async { Ok(String::new()) },
        );

        assert_eq!(
            tool.required_params(),
            vec![ParamName::new("a"), ParamName::new("c")]
        );
    }

    #[test]
    fn test_arg_string() {
        let args = json!({"s": "text", "n": 42, "b": true, "z": null})
            .as_object()
            .cloned()
            .unwrap();

        assert_eq!(arg_string(&args, "s").as_deref(), Some("text"));
        assert_eq!(arg_string(&args, "n").as_deref(), Some("42"));
        assert_eq!(arg_string(&args, "b").as_deref(), Some("true"));
        assert_eq!(arg_string(&args, "z"), None);
        assert_eq!(arg_string(&args, "missing"), None);
    }

    #[tokio::test]
    async fn test_fn_tool_call() {
        let tool = echo_tool("echo");
        let mut args = ToolArgs::new();
        args.insert("text".to_string(), json!("hi"));

        assert_eq!(tool.call(args).await.unwrap(), "hi");
    }
}
