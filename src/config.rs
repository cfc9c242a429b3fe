//! Environment-driven configuration.
//!
//! Credentials and upstream endpoints for the built-in tools are read from
//! the process environment, optionally seeded from a `.env` file. Missing
//! credentials are not an error here: the tool that needs them reports it
//! when called.

use std::env;

use anyhow::Context;
use url::Url;

pub const DEFAULT_LINKEDIN_API_URL: &str = "https://api.linkedin.com";
pub const DEFAULT_SMTP_HOST: &str = "smtp.gmail.com";
pub const DEFAULT_SMTP_PORT: u16 = 465;
pub const DEFAULT_WEATHER_API_URL: &str = "http://api.openweathermap.org";
pub const DEFAULT_OLLAMA_URL: &str = "http://localhost:11434";
pub const DEFAULT_OLLAMA_MODEL: &str = "qwen2:7b-instruct";

#[derive(Debug, Clone, Default)]
pub struct LinkedinConfig {
    pub user_id: Option<String>,
    pub access_token: Option<String>,
    pub api_url: String,
}

#[derive(Debug, Clone, Default)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub sender_email: Option<String>,
    pub sender_password: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct TrainApiConfig {
    pub api_key: Option<String>,
    pub api_host: Option<String>,
    /// Overrides `https://<api_host>` as the request base.
    pub base_url: Option<String>,
}

impl TrainApiConfig {
    /// Base URL for requests, if the API host is configured.
    pub fn resolved_base_url(&self) -> Option<String> {
        self.base_url
            .clone()
            .or_else(|| self.api_host.as_ref().map(|host| format!("https://{}", host)))
    }
}

#[derive(Debug, Clone, Default)]
pub struct WeatherConfig {
    pub api_key: Option<String>,
    pub api_url: String,
}

#[derive(Debug, Clone, Default)]
pub struct OllamaConfig {
    pub url: String,
    pub model: String,
}

/// Configuration for every built-in tool and the chat planner.
#[derive(Debug, Clone, Default)]
pub struct ToolConfig {
    pub linkedin: LinkedinConfig,
    pub smtp: SmtpConfig,
    pub trains: TrainApiConfig,
    pub weather: WeatherConfig,
    pub ollama: OllamaConfig,
}

impl ToolConfig {
    /// Load `.env` (if present) and read the process environment.
    pub fn from_env() -> Self {
        match dotenvy::dotenv() {
            Ok(path) => tracing::info!("Loaded environment from {}", path.display()),
            Err(e) if e.not_found() => {}
            Err(e) => tracing::warn!("Ignoring unreadable .env file: {}", e),
        }
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build the configuration from an arbitrary key lookup.
    ///
    /// Blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let smtp_port = match get("SMTP_PORT") {
            Some(raw) => raw.parse().unwrap_or_else(|_| {
                tracing::warn!("Invalid SMTP_PORT `{}`, using {}", raw, DEFAULT_SMTP_PORT);
                DEFAULT_SMTP_PORT
            }),
            None => DEFAULT_SMTP_PORT,
        };

        Self {
            linkedin: LinkedinConfig {
                user_id: get("LINKEDIN_USER_ID"),
                access_token: get("LINKEDIN_ACCESS_TOKEN"),
                api_url: get("LINKEDIN_API_URL")
                    .unwrap_or_else(|| DEFAULT_LINKEDIN_API_URL.to_string()),
            },
            smtp: SmtpConfig {
                host: get("SMTP_HOST").unwrap_or_else(|| DEFAULT_SMTP_HOST.to_string()),
                port: smtp_port,
                sender_email: get("SENDER_EMAIL"),
                sender_password: get("SENDER_PASSWORD"),
            },
            trains: TrainApiConfig {
                api_key: get("RAPIDAPI_KEY"),
                api_host: get("RAPIDAPI_HOST"),
                base_url: get("RAPIDAPI_BASE_URL"),
            },
            weather: WeatherConfig {
                api_key: get("WEATHER_API_KEY"),
                api_url: get("WEATHER_API_URL")
                    .unwrap_or_else(|| DEFAULT_WEATHER_API_URL.to_string()),
            },
            ollama: OllamaConfig {
                url: get("OLLAMA_URL").unwrap_or_else(|| DEFAULT_OLLAMA_URL.to_string()),
                model: get("OLLAMA_MODEL").unwrap_or_else(|| DEFAULT_OLLAMA_MODEL.to_string()),
            },
        }
    }

    /// Check that every configured endpoint is a well-formed URL.
    pub fn validate(&self) -> anyhow::Result<()> {
        let mut endpoints = vec![
            ("LINKEDIN_API_URL", self.linkedin.api_url.clone()),
            ("WEATHER_API_URL", self.weather.api_url.clone()),
            ("OLLAMA_URL", self.ollama.url.clone()),
        ];
        if let Some(base) = self.trains.resolved_base_url() {
            endpoints.push(("RAPIDAPI_HOST", base));
        }

        for (key, value) in endpoints {
            Url::parse(&value).with_context(|| format!("{} is not a valid URL: {}", key, value))?;
        }
        Ok(())
    }
}
