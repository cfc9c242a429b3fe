//! `search_trains`: trains between two stations on a given day, via RapidAPI.

use std::time::Duration;

use anyhow::{Context, anyhow};
use chrono::NaiveDate;
use serde::Deserialize;
use serde_json::Value;

use crate::config::TrainApiConfig;
use crate::tools::registry::{ParamSpec, ToolArgs, ToolFuture, ToolHandler, arg_string};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Map a city name to its station code.
///
/// Unknown names are assumed to already be a station code.
pub fn station_code(city: &str) -> String {
    let key = city.trim().to_lowercase();
    let known = match key.as_str() {
        "madurai" | "mdu" => Some("MDU"),
        "chennai" | "mas" => Some("MAS"),
        "coimbatore" => Some("CBE"),
        "delhi" => Some("NDLS"),
        "mumbai" => Some("CSTM"),
        _ => None,
    };
    known
        .map(str::to_string)
        .unwrap_or_else(|| city.trim().to_uppercase())
}

#[derive(Debug, Deserialize)]
struct TrainResponse {
    #[serde(default)]
    status: bool,
    #[serde(default)]
    message: Option<String>,
    /// Absent or `null` when the upstream rejects the query.
    #[serde(default)]
    data: Option<Vec<Train>>,
}

#[derive(Debug, Deserialize)]
struct Train {
    train_name: Option<String>,
    train_number: Option<Value>,
    from_std: Option<String>,
    to_sta: Option<String>,
    duration: Option<String>,
    #[serde(default)]
    class_type: Option<Vec<String>>,
}

fn or_na(value: &Option<String>) -> &str {
    value.as_deref().unwrap_or("N/A")
}

pub struct SearchTrainsHandler {
    config: TrainApiConfig,
    http: reqwest::Client,
}

impl SearchTrainsHandler {
    pub fn new(config: TrainApiConfig, http: reqwest::Client) -> Self {
        Self { config, http }
    }

    async fn search(
        &self,
        source_city: String,
        destination_city: String,
        date_of_journey: String,
    ) -> anyhow::Result<String> {
        let (Some(api_key), Some(api_host), Some(base_url)) = (
            self.config.api_key.as_deref(),
            self.config.api_host.as_deref(),
            self.config.resolved_base_url(),
        ) else {
            return Err(anyhow!(
                "RAPIDAPI_KEY or RAPIDAPI_HOST environment variables not set."
            ));
        };

        NaiveDate::parse_from_str(&date_of_journey, "%Y-%m-%d").map_err(|_| {
            anyhow!(
                "Date format must be YYYY-MM-DD, received {}. Cannot proceed.",
                date_of_journey
            )
        })?;

        let source_code = station_code(&source_city);
        let destination_code = station_code(&destination_city);
        tracing::debug!(%source_code, %destination_code, date = %date_of_journey, "Searching trains");

        let url = format!("{}/api/v3/trainBetweenStations", base_url.trim_end_matches('/'));
        let response = self
            .http
            .get(&url)
            .header("X-RapidAPI-Key", api_key)
            .header("X-RapidAPI-Host", api_host)
            .query(&[
                ("fromStationCode", source_code.as_str()),
                ("toStationCode", destination_code.as_str()),
                ("dateOfJourney", date_of_journey.as_str()),
            ])
            .timeout(REQUEST_TIMEOUT)
            .send()
            .await
            .context("Failed to connect to Train API")?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(anyhow!(
                "Train API returned an error: {}. Details: {}",
                status.as_u16(),
                body
            ));
        }

        let parsed: TrainResponse = response
            .json()
            .await
            .context("Train API returned malformed JSON")?;

        if !parsed.status {
            return Ok(format!(
                "Train API failed with message: {}",
                parsed.message.as_deref().unwrap_or("Unknown Error")
            ));
        }

        let trains = parsed.data.unwrap_or_default();
        if trains.is_empty() {
            return Ok(format!(
                "No trains found from {} ({}) to {} ({}) on {}. API message: {}",
                source_city,
                source_code,
                destination_city,
                destination_code,
                date_of_journey,
                parsed.message.as_deref().unwrap_or("Success but no data")
            ));
        }

        Ok(format_trains(
            &trains,
            &source_city,
            &destination_city,
            &date_of_journey,
        ))
    }
}

fn format_trains(trains: &[Train], source: &str, destination: &str, date: &str) -> String {
    let mut lines = vec![
        format!(
            "🚆 Found {} trains from {} to {} on {}:",
            trains.len(),
            source,
            destination,
            date
        ),
        "---------------------------------------------------".to_string(),
    ];

    for (i, train) in trains.iter().enumerate() {
        let number = match &train.train_number {
            Some(Value::String(s)) => s.clone(),
            Some(Value::Null) | None => "N/A".to_string(),
            Some(other) => other.to_string(),
        };
        lines.push(format!("**{}. {} ({})**", i + 1, or_na(&train.train_name), number));
        lines.push(format!(
            "   Dep: {}, Arr: {}",
            or_na(&train.from_std),
            or_na(&train.to_sta)
        ));
        lines.push(format!("   Duration: {}", or_na(&train.duration)));
        let classes = train.class_type.as_deref().unwrap_or_default();
        lines.push(format!("   Classes: {}", classes.join(", ")));
        lines.push(String::new());
    }

    lines.join("\n")
}

impl ToolHandler for SearchTrainsHandler {
    fn name(&self) -> &str {
        "search_trains"
    }

    fn doc(&self) -> &str {
        "Searches for available trains between two cities on a specific date.
        Args:
            source_city: The starting city name or 3-letter station code (e.g., 'Madurai' or 'MDU').
            destination_city: The destination city name or 3-letter station code (e.g., 'Chennai' or 'MAS').
            date_of_journey: The date of travel in YYYY-MM-DD format (e.g., '2025-10-03')."
    }

    fn params(&self) -> Vec<ParamSpec> {
        vec![
            ParamSpec::required("source_city"),
            ParamSpec::required("destination_city"),
            ParamSpec::required("date_of_journey"),
        ]
    }

    fn call(&self, args: ToolArgs) -> ToolFuture<'_> {
        let source = arg_string(&args, "source_city").unwrap_or_default();
        let destination = arg_string(&args, "destination_city").unwrap_or_default();
        let date = arg_string(&args, "date_of_journey").unwrap_or_default();
        Box::pin(self.search(source, destination, date))
    }
}
