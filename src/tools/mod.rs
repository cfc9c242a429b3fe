//! Tool registry, discovery and dispatch, plus the built-in tools.
//!
//! New tools implement [`ToolHandler`] and are added to the registry at
//! startup; discovery and dispatch pick them up without further wiring.

mod registry;
pub mod dispatch;
pub mod schema;

pub use dispatch::{DispatchError, Dispatcher, ToolCallRequest, ToolCallResult};
pub use registry::{FnTool, ParamSpec, ToolArgs, ToolFuture, ToolHandler, ToolRegistry, arg_string};
pub use schema::{ToolSchema, list_tools};

// Built-in tools
mod email;
mod linkedin;
mod trains;
mod weather;

pub use email::{MailError, Mailer, SendEmailHandler};
pub use linkedin::PostLinkedinHandler;
pub use trains::{SearchTrainsHandler, station_code};
pub use weather::CurrentWeatherHandler;

use crate::config::ToolConfig;

/// Registry holding every built-in tool, configured from `config`.
pub fn builtin_registry(config: &ToolConfig) -> ToolRegistry {
    let http = reqwest::Client::new();

    ToolRegistry::new()
        .register_handler(PostLinkedinHandler::new(config.linkedin.clone(), http.clone()))
        .register_handler(SendEmailHandler::new(Mailer::new(config.smtp.clone())))
        .register_handler(SearchTrainsHandler::new(config.trains.clone(), http.clone()))
        .register_handler(CurrentWeatherHandler::new(config.weather.clone(), http))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_registry_contents() {
        let registry = builtin_registry(&ToolConfig::default());
        let names: Vec<String> = registry.names().into_iter().map(|n| n.into_inner()).collect();
        assert_eq!(
            names,
            vec!["post_linkedin", "send_email", "search_trains", "get_current_weather"]
        );
    }

    #[test]
    fn test_builtin_schemas_have_descriptions() {
        let registry = builtin_registry(&ToolConfig::default());
        for schema in list_tools(&registry) {
            assert!(!schema.function.description.is_empty());
            assert!(!schema.function.description.contains("Args:"));
            for (name, prop) in &schema.function.parameters.properties {
                assert!(
                    !prop.description.starts_with("The content for"),
                    "{} lacks a documented description for {}",
                    schema.function.name,
                    name
                );
            }
        }
    }

    #[test]
    fn test_search_trains_schema() {
        let registry = builtin_registry(&ToolConfig::default());
        let schemas = list_tools(&registry);
        let trains = schemas
            .iter()
            .find(|s| s.function.name == "search_trains")
            .unwrap();

        assert_eq!(
            trains.function.description,
            "Searches for available trains between two cities on a specific date."
        );
        assert_eq!(
            trains.function.parameters.required,
            vec!["source_city", "destination_city", "date_of_journey"]
        );
    }
}
