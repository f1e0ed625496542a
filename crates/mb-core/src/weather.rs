//! Current-weather lookup (OpenWeatherMap)

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::config::WeatherConfig;
use crate::error::{Error, Result};

/// Resolves a location to a short weather description
#[async_trait]
pub trait WeatherLookup: Send + Sync {
    async fn query(&self, location: &str) -> Result<String>;
}

/// OpenWeatherMap `data/2.5/weather` client
#[derive(Clone)]
pub struct OpenWeatherClient {
    client: Client,
    api_key: String,
    base_url: String,
}

impl OpenWeatherClient {
    pub fn new(config: &WeatherConfig) -> Result<Self> {
        let api_key = config
            .api_key
            .clone()
            .ok_or_else(|| Error::Config("WEATHER_API_KEY not set".to_string()))?;

        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .map_err(Error::Http)?;

        Ok(Self {
            client,
            api_key,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl WeatherLookup for OpenWeatherClient {
    async fn query(&self, location: &str) -> Result<String> {
        let url = format!("{}/weather", self.base_url);

        debug!("Looking up weather for {}", location);

        let response = self
            .client
            .get(&url)
            .query(&[("appid", self.api_key.as_str()), ("q", location)])
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            warn!("Weather API error: {} - {}", status, body);
            return Err(Error::Weather(format!("{}: {}", status, body)));
        }

        let report: WeatherReport = serde_json::from_str(&body)?;
        report
            .description()
            .map(str::to_string)
            .ok_or_else(|| Error::Weather(format!("No weather forecast available for {}", location)))
    }
}

#[derive(Debug, Deserialize)]
struct WeatherReport {
    #[serde(default)]
    weather: Vec<WeatherCondition>,
}

#[derive(Debug, Deserialize)]
struct WeatherCondition {
    description: Option<String>,
}

impl WeatherReport {
    fn description(&self) -> Option<&str> {
        self.weather
            .first()
            .and_then(|w| w.description.as_deref())
            .filter(|d| !d.is_empty())
    }
}
