//! Natural-language-understanding results and client

pub mod dialogflow;

pub use dialogflow::DialogflowClient;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::reply::ReplyFragment;
use crate::Result;

/// Resolves user text to an intent within a conversation session
#[async_trait]
pub trait NluClient: Send + Sync {
    async fn detect_intent(&self, session_id: &str, text: &str) -> Result<IntentResult>;
}

/// Structured parameters extracted by the NLU service
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Parameters(Map<String, Value>);

impl Parameters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.0.insert(name.into(), value.into());
        self
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.0.get(name)
    }

    /// String value of `name`, if present and non-empty
    pub fn get_str(&self, name: &str) -> Option<&str> {
        self.0
            .get(name)
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Conversational context maintained by the NLU service
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutputContext {
    pub name: String,
    #[serde(default)]
    pub lifespan_count: Option<i32>,
    #[serde(default)]
    pub parameters: Parameters,
}

/// Outcome of one detect-intent call
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IntentResult {
    #[serde(default)]
    pub query_text: String,
    #[serde(default)]
    pub fulfillment_text: String,
    #[serde(default, rename = "fulfillmentMessages")]
    pub fragments: Vec<ReplyFragment>,
    #[serde(default)]
    pub action: Option<String>,
    #[serde(default, rename = "outputContexts")]
    pub contexts: Vec<OutputContext>,
    #[serde(default)]
    pub parameters: Parameters,
}

impl IntentResult {
    /// The action name, ignoring empty strings
    pub fn action(&self) -> Option<&str> {
        self.action.as_deref().filter(|a| !a.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_query_result() {
        let json = r#"{
            "queryText": "weather in Paris",
            "action": "get-current-weather",
            "parameters": {"geo-city": "Paris", "date": ""},
            "fulfillmentText": "The weather is",
            "fulfillmentMessages": [{"text": {"text": ["The weather is"]}}],
            "outputContexts": [{
                "name": "projects/p/agent/sessions/s/contexts/weather",
                "lifespanCount": 5,
                "parameters": {"geo-city": "Paris"}
            }],
            "intentDetectionConfidence": 1
        }"#;

        let result: IntentResult = serde_json::from_str(json).unwrap();
        assert_eq!(result.action(), Some("get-current-weather"));
        assert_eq!(result.parameters.get_str("geo-city"), Some("Paris"));
        assert_eq!(result.parameters.get_str("date"), None);
        assert_eq!(result.fragments, vec![ReplyFragment::text("The weather is")]);
        assert_eq!(result.contexts.len(), 1);
        assert_eq!(result.contexts[0].lifespan_count, Some(5));
        assert_eq!(result.contexts[0].parameters.get_str("geo-city"), Some("Paris"));
    }

    #[test]
    fn test_empty_action_is_none() {
        let result: IntentResult = serde_json::from_str(r#"{"action": ""}"#).unwrap();
        assert_eq!(result.action(), None);
        assert!(result.fragments.is_empty());
        assert!(result.parameters.is_empty());
    }

    #[test]
    fn test_parameters_non_string() {
        let params = Parameters::new().with("count", 3).with("name", "Ada");
        assert_eq!(params.get_str("count"), None);
        assert_eq!(params.get("count"), Some(&Value::from(3)));
        assert_eq!(params.get_str("name"), Some("Ada"));
    }
}
