//! Dialogflow v2 REST client

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::{IntentResult, NluClient};
use crate::config::DialogflowConfig;
use crate::error::{Error, Result};

/// Dialogflow `detectIntent` client
#[derive(Clone)]
pub struct DialogflowClient {
    client: Client,
    project_id: String,
    language_code: String,
    access_token: String,
    base_url: String,
}

impl DialogflowClient {
    pub fn new(config: &DialogflowConfig) -> Result<Self> {
        let access_token = config
            .access_token
            .clone()
            .ok_or_else(|| Error::Config("DF_ACCESS_TOKEN not set".to_string()))?;

        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .map_err(Error::Http)?;

        Ok(Self {
            client,
            project_id: config.project_id.clone(),
            language_code: config.language_code.clone(),
            access_token,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    fn session_url(&self, session_id: &str) -> String {
        format!(
            "{}/projects/{}/agent/sessions/{}:detectIntent",
            self.base_url, self.project_id, session_id
        )
    }
}

#[async_trait]
impl NluClient for DialogflowClient {
    async fn detect_intent(&self, session_id: &str, text: &str) -> Result<IntentResult> {
        let url = self.session_url(session_id);

        let request = DetectIntentRequest {
            query_input: QueryInput {
                text: TextInput {
                    text,
                    language_code: &self.language_code,
                },
            },
        };

        debug!("Sending detectIntent for session {}: {}", session_id, text);

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.access_token)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            warn!("Dialogflow API error: {} - {}", status, body);
            return Err(Error::Dialogflow(format!("{}: {}", status, body)));
        }

        let parsed: DetectIntentResponse = serde_json::from_str(&body).map_err(|e| {
            Error::Dialogflow(format!("Failed to parse response: {} - {}", e, body))
        })?;

        let result = parsed.query_result.unwrap_or_default();
        info!(
            "Dialogflow response: action={:?}, fragments={}",
            result.action(),
            result.fragments.len()
        );

        Ok(result)
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct DetectIntentRequest<'a> {
    query_input: QueryInput<'a>,
}

#[derive(Debug, Serialize)]
struct QueryInput<'a> {
    text: TextInput<'a>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct TextInput<'a> {
    text: &'a str,
    language_code: &'a str,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DetectIntentResponse {
    #[allow(dead_code)]
    response_id: Option<String>,
    query_result: Option<IntentResult>,
}
