//! `get_current_weather`: current conditions from OpenWeatherMap.

use std::time::Duration;

use anyhow::{Context, anyhow};
use serde_json::Value;

use crate::config::WeatherConfig;
use crate::tools::registry::{ParamSpec, ToolArgs, ToolFuture, ToolHandler, arg_string};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

pub struct CurrentWeatherHandler {
    config: WeatherConfig,
    http: reqwest::Client,
}

impl CurrentWeatherHandler {
    pub fn new(config: WeatherConfig, http: reqwest::Client) -> Self {
        Self { config, http }
    }

    async fn fetch(&self, city_name: String) -> anyhow::Result<String> {
        let api_key = self
            .config
            .api_key
            .as_deref()
            .ok_or_else(|| anyhow!("Weather API Key not configured. Check WEATHER_API_KEY."))?;

        let url = format!("{}/data/2.5/weather", self.config.api_url.trim_end_matches('/'));
        let response = self
            .http
            .get(&url)
            .query(&[("q", city_name.as_str()), ("appid", api_key), ("units", "metric")])
            .timeout(REQUEST_TIMEOUT)
            .send()
            .await
            .context("Failed to connect to Weather API")?;

        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Ok(city_not_found(&city_name));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(anyhow!(
                "Weather API returned an error: {}. Details: {}",
                status.as_u16(),
                body
            ));
        }

        let data: Value = response
            .json()
            .await
            .context("Weather API returned malformed JSON")?;

        // OpenWeatherMap reports `cod` as a string on errors and a number on success.
        if data.get("cod").and_then(Value::as_str) == Some("404") {
            return Ok(city_not_found(&city_name));
        }
        Ok(format_weather(&data))
    }
}

fn city_not_found(city_name: &str) -> String {
    format!(
        "❌ City/Area '{}' not found. Please try a different location.",
        city_name
    )
}

/// Render a JSON value the way a person would read it; absent fields show as `None`.
fn show(value: Option<&Value>) -> String {
    match value {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Null) | None => "None".to_string(),
        Some(other) => other.to_string(),
    }
}

fn title_case(text: &str) -> String {
    text.split(' ')
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Format an OpenWeatherMap "current weather" payload.
pub fn format_weather(data: &Value) -> String {
    let weather = data.pointer("/weather/0");
    let description = weather
        .and_then(|w| w.get("description"))
        .and_then(Value::as_str)
        .map(title_case)
        .unwrap_or_else(|| "None".to_string());

    format!(
        "☀️ **Current Weather in {}, {}**:\n\
         - **Condition**: {} ({})\n\
         - **Temperature**: {}°C (Feels like {}°C)\n\
         - **Humidity**: {}%\n\
         - **Wind Speed**: {} m/s",
        show(data.get("name")),
        show(data.pointer("/sys/country")),
        description,
        show(weather.and_then(|w| w.get("main"))),
        show(data.pointer("/main/temp")),
        show(data.pointer("/main/feels_like")),
        show(data.pointer("/main/humidity")),
        show(data.pointer("/wind/speed")),
    )
}

impl ToolHandler for CurrentWeatherHandler {
    fn name(&self) -> &str {
        "get_current_weather"
    }

    fn doc(&self) -> &str {
        "Fetches the current weather conditions for a specified city.
        Args:
            city_name: The name of the city for which to fetch the weather (e.g., 'Chennai' or 'London')."
    }

    fn params(&self) -> Vec<ParamSpec> {
        vec![ParamSpec::required("city_name")]
    }

    fn call(&self, args: ToolArgs) -> ToolFuture<'_> {
        let city_name = arg_string(&args, "city_name").unwrap_or_default();
        Box::pin(self.fetch(city_name))
    }
}
