use std::sync::Arc;

use async_trait::async_trait;
use tracing::warn;

use super::{ActionContext, ActionHandler, RouterOutcome, SpecializedReply};
use crate::weather::WeatherLookup;

/// Parameter carrying the city name
pub const CITY_PARAMETER: &str = "geo-city";

/// Answers with the current weather of the `geo-city` parameter.
///
/// Without a city, or when the lookup fails, the NLU fragments are sent
/// instead.
pub struct WeatherHandler {
    lookup: Arc<dyn WeatherLookup>,
}

impl WeatherHandler {
    pub fn new(lookup: Arc<dyn WeatherLookup>) -> Self {
        Self { lookup }
    }
}

#[async_trait]
impl ActionHandler for WeatherHandler {
    async fn handle(&self, ctx: &ActionContext<'_>) -> RouterOutcome {
        let Some(city) = ctx.parameters.get_str(CITY_PARAMETER) else {
            return ctx.delegate();
        };

        match self.lookup.query(city).await {
            Ok(description) => {
                let prefix = ctx.first_text().unwrap_or_default();
                let reply = format!("{} {}", prefix, description).trim().to_string();
                RouterOutcome::Reply(SpecializedReply::Text(reply))
            }
            Err(e) => {
                warn!(city, "Weather lookup failed: {}", e);
                ctx.delegate()
            }
        }
    }
}
