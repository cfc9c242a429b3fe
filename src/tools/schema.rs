//! Tool discovery.
//!
//! Derives a function-calling schema for every registered tool from its
//! declared parameters and documentation. Schemas are never cached: each
//! call to [`list_tools`] reflects the registry as it is now.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::tools::registry::{ToolHandler, ToolRegistry};

/// Marker that starts the parameter section of a tool's documentation.
const ARGS_MARKER: &str = "Args:";

/// One entry of the discovery listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolSchema {
    #[serde(rename = "type")]
    pub kind: String,
    pub function: FunctionSchema,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionSchema {
    pub name: String,
    pub description: String,
    pub parameters: ParametersSchema,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParametersSchema {
    #[serde(rename = "type")]
    pub kind: String,
    pub properties: BTreeMap<String, PropertySchema>,
    pub required: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropertySchema {
    #[serde(rename = "type")]
    pub kind: String,
    pub description: String,
}

/// Describe every registered tool, in registration order.
pub fn list_tools(registry: &ToolRegistry) -> Vec<ToolSchema> {
    registry
        .iter()
        .map(|(name, handler)| describe(name.as_str(), handler.as_ref()))
        .collect()
}

/// Build the schema of a single handler as registered under `name`.
pub fn describe(name: &str, handler: &dyn ToolHandler) -> ToolSchema {
    let doc = handler.doc();
    let arg_docs = parse_arg_docs(doc);

    let mut properties = BTreeMap::new();
    let mut required = Vec::new();
    for param in handler.params() {
        let description = arg_docs
            .iter()
            .find(|(arg, _)| *arg == param.name.as_str())
            .map(|(_, text)| text.to_string())
            .unwrap_or_else(|| format!("The content for the {} parameter.", param.name));

        if param.is_required() {
            required.push(param.name.to_string());
        }
        properties.insert(
            param.name.into_inner(),
            PropertySchema {
                kind: "string".to_string(),
                description,
            },
        );
    }

    ToolSchema {
        kind: "function".to_string(),
        function: FunctionSchema {
            name: name.to_string(),
            description: description_of(doc).to_string(),
            parameters: ParametersSchema {
                kind: "object".to_string(),
                properties,
                required,
            },
        },
    }
}

/// Documentation text before the first `Args:` marker, trimmed.
pub fn description_of(doc: &str) -> &str {
    match doc.find(ARGS_MARKER) {
        Some(idx) => doc[..idx].trim(),
        None => doc.trim(),
    }
}

/// Parse `name: text` lines following the `Args:` marker.
///
/// Lines without a colon continue the previous parameter's text.
fn parse_arg_docs(doc: &str) -> Vec<(&str, String)> {
    let Some(idx) = doc.find(ARGS_MARKER) else {
        return Vec::new();
    };

    let mut out: Vec<(&str, String)> = Vec::new();
    for line in doc[idx + ARGS_MARKER.len()..].lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        match line.split_once(':') {
            Some((name, text)) if is_identifier(name.trim()) => {
                out.push((name.trim(), text.trim().to_string()));
            }
            _ => {
                if let Some((_, text)) = out.last_mut() {
                    text.push(' ');
                    text.push_str(line);
                }
            }
        }
    }
    out
}

fn is_identifier(s: &str) -> bool {
    !s.is_empty() && s.chars().all(|c| c.is_alphanumeric() || c == '_')
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::registry::{FnTool, ParamSpec};
    use serde_json::json;

    fn tool(name: &str, doc: &str, params: Vec<ParamSpec>) -> FnTool {
        FnTool::new(name, doc, params, |_| async { Ok(String::new()) })
    }

    #[test]
    fn test_description_stops_at_args_marker() {
        let doc = "\n    Publishes a text post.\n    Args:\n    content: The text.\n";
        assert_eq!(description_of(doc), "Publishes a text post.");
    }

    #[test]
    fn test_description_without_marker() {
        assert_eq!(description_of("  Says hello.  "), "Says hello.");
        assert_eq!(description_of(""), "");
    }

    #[test]
    fn test_parse_arg_docs() {
        let doc = "Search trains.\nArgs:\n  source_city: Starting city\n    (e.g. 'Madurai').\n  date: YYYY-MM-DD\n";
        let parsed = parse_arg_docs(doc);
        assert_eq!(
            parsed,
            vec![
                ("source_city", "Starting city (e.g. 'Madurai').".to_string()),
                ("date", "YYYY-MM-DD".to_string()),
            ]
        );
    }

    #[test]
    fn test_empty_registry_lists_nothing() {
        assert!(list_tools(&ToolRegistry::new()).is_empty());
    }

    #[test]
    fn test_hello_schema_shape() {
        let registry = ToolRegistry::new().register_handler(tool("hello", "Say hello.", vec![]));
        let schemas = list_tools(&registry);

        assert_eq!(
            serde_json::to_value(&schemas).unwrap(),
            json!([{
                "type": "function",
                "function": {
                    "name": "hello",
                    "description": "Say hello.",
                    "parameters": {
                        "type": "object",
                        "properties": {},
                        "required": []
                    }
                }
            }])
        );
    }

    #[test]
    fn test_required_matches_params_without_default() {
        let registry = ToolRegistry::new().register_handler(tool(
            "send",
            "Send.\nArgs:\n a: first\n",
            vec![
                ParamSpec::required("a"),
                ParamSpec::optional("b"),
                ParamSpec::required("c"),
            ],
        ));
        let schema = &list_tools(&registry)[0];
        let params = &schema.function.parameters;

        assert_eq!(params.required, vec!["a", "c"]);
        assert_eq!(params.properties.len(), 3);
        assert!(params.properties.values().all(|p| p.kind == "string"));
        assert_eq!(params.properties["a"].description, "first");
        assert_eq!(
            params.properties["b"].description,
            "The content for the b parameter."
        );
    }

    #[test]
    fn test_one_schema_per_registered_name() {
        let mut registry = ToolRegistry::new()
            .register_handler(tool("one", "One.", vec![]))
            .register_handler(tool("two", "Two.", vec![]));
        registry.register("one", std::sync::Arc::new(tool("one", "Replaced.", vec![])));

        let schemas = list_tools(&registry);
        let names: Vec<_> = schemas.iter().map(|s| s.function.name.as_str()).collect();
        assert_eq!(names, vec!["one", "two"]);
        assert_eq!(schemas[0].function.description, "Replaced.");
    }

    #[test]
    fn test_schema_uses_registry_key_not_handler_name() {
        let mut registry = ToolRegistry::new();
        registry.register("alias", std::sync::Arc::new(tool("original", "Doc.", vec![])));

        assert_eq!(list_tools(&registry)[0].function.name, "alias");
    }

    #[test]
    fn test_discovery_is_idempotent() {
        let registry = ToolRegistry::new()
            .register_handler(tool("x", "X.", vec![ParamSpec::required("p")]))
            .register_handler(tool("y", "Y.", vec![ParamSpec::optional("q")]));

        assert_eq!(list_tools(&registry), list_tools(&registry));
    }
}
