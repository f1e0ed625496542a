//! Facebook Messenger Send API and Graph API client

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info};

use mb_core::{CarouselElement, FacebookConfig, QuickReply, SenderAction, TemplateButton};

use crate::error::{FacebookError, Result};
use crate::types::UserProfile;

/// Fetches a user's public profile
#[async_trait]
pub trait ProfileLookup: Send + Sync {
    async fn user_profile(&self, psid: &str) -> Result<UserProfile>;
}

/// Facebook API client
#[derive(Clone)]
pub struct FacebookApi {
    client: Client,
    access_token: String,
    graph_url: String,
}

impl FacebookApi {
    /// Create a new Facebook API client
    pub fn new(config: &FacebookConfig) -> Result<Self> {
        if config.page_token.is_empty() {
            return Err(FacebookError::AccessTokenNotSet);
        }

        let client = Client::builder().timeout(Duration::from_secs(30)).build()?;

        Ok(Self {
            client,
            access_token: config.page_token.clone(),
            graph_url: config.graph_url.trim_end_matches('/').to_string(),
        })
    }

    fn messages_url(&self) -> String {
        format!("{}/me/messages", self.graph_url)
    }

    /// Send a plain text message
    pub async fn send_text(&self, recipient_id: &str, text: &str) -> Result<MessageResponse> {
        self.send(&SendRequest::message(recipient_id, OutgoingMessage::text(text)))
            .await
    }

    /// Send an image by URL
    pub async fn send_image(&self, recipient_id: &str, url: &str) -> Result<MessageResponse> {
        let attachment = Attachment::Image {
            payload: UrlPayload { url: url.to_string() },
        };
        self.send(&SendRequest::message(recipient_id, OutgoingMessage::attachment(attachment)))
            .await
    }

    /// Send a prompt with quick-reply buttons
    pub async fn send_quick_replies(
        &self,
        recipient_id: &str,
        text: &str,
        replies: &[QuickReply],
    ) -> Result<MessageResponse> {
        let message = OutgoingMessage {
            quick_replies: Some(replies.iter().map(OutgoingQuickReply::from).collect()),
            ..OutgoingMessage::text(text)
        };
        self.send(&SendRequest::message(recipient_id, message)).await
    }

    /// Send a generic template (carousel)
    pub async fn send_generic_template(
        &self,
        recipient_id: &str,
        elements: &[CarouselElement],
    ) -> Result<MessageResponse> {
        let attachment = Attachment::Template {
            payload: TemplatePayload::Generic {
                elements: elements.to_vec(),
            },
        };
        self.send(&SendRequest::message(recipient_id, OutgoingMessage::attachment(attachment)))
            .await
    }

    /// Send a button template
    pub async fn send_button_template(
        &self,
        recipient_id: &str,
        text: &str,
        buttons: &[TemplateButton],
    ) -> Result<MessageResponse> {
        let attachment = Attachment::Template {
            payload: TemplatePayload::Button {
                text: text.to_string(),
                buttons: buttons.to_vec(),
            },
        };
        self.send(&SendRequest::message(recipient_id, OutgoingMessage::attachment(attachment)))
            .await
    }

    /// Show or hide the typing indicator, or mark the conversation seen
    pub async fn send_sender_action(&self, recipient_id: &str, action: SenderAction) -> Result<MessageResponse> {
        self.send(&SendRequest::action(recipient_id, action)).await
    }

    async fn send(&self, request: &SendRequest) -> Result<MessageResponse> {
        debug!("Calling Send API for {}", request.recipient.id);

        let response = self
            .client
            .post(self.messages_url())
            .query(&[("access_token", &self.access_token)])
            .json(request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            error!("Facebook API error: {} - {}", status, body);
            return Err(FacebookError::Api(format!("{} - {}", status, body)));
        }

        let message_response: MessageResponse = response.json().await?;
        match &message_response.message_id {
            Some(id) => info!(
                "Sent message {} to recipient {}",
                id,
                message_response.recipient_id.as_deref().unwrap_or_default()
            ),
            None => debug!("Send API call succeeded for {}", request.recipient.id),
        }

        Ok(message_response)
    }

    /// Get user profile information
    pub async fn get_user_profile(&self, user_id: &str) -> Result<UserProfile> {
        let url = format!("{}/{}", self.graph_url, user_id);

        let response = self
            .client
            .get(&url)
            .query(&[
                ("fields", "first_name,last_name,profile_pic"),
                ("access_token", &self.access_token),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            error!("Facebook API error: {} - {}", status, body);
            return Err(FacebookError::Api(format!("{} - {}", status, body)));
        }

        let profile: UserProfile = response.json().await?;
        debug!("Got user profile: {:?}", profile);

        Ok(profile)
    }
}

#[async_trait]
impl ProfileLookup for FacebookApi {
    async fn user_profile(&self, psid: &str) -> Result<UserProfile> {
        self.get_user_profile(psid).await
    }
}

// =============================================================================
// Send API request bodies
// =============================================================================

#[derive(Debug, Serialize)]
struct SendRequest {
    recipient: Recipient,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<OutgoingMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    sender_action: Option<SenderAction>,
}

impl SendRequest {
    fn message(recipient_id: &str, message: OutgoingMessage) -> Self {
        Self {
            recipient: Recipient {
                id: recipient_id.to_string(),
            },
            message: Some(message),
            sender_action: None,
        }
    }

    fn action(recipient_id: &str, action: SenderAction) -> Self {
        Self {
            recipient: Recipient {
                id: recipient_id.to_string(),
            },
            message: None,
            sender_action: Some(action),
        }
    }
}

#[derive(Debug, Serialize)]
struct Recipient {
    id: String,
}

#[derive(Debug, Default, Serialize)]
struct OutgoingMessage {
    #[serde(skip_serializing_if = "Option::is_none")]
    text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    attachment: Option<Attachment>,
    #[serde(skip_serializing_if = "Option::is_none")]
    quick_replies: Option<Vec<OutgoingQuickReply>>,
}

impl OutgoingMessage {
    fn text(text: &str) -> Self {
        Self {
            text: Some(text.to_string()),
            ..Default::default()
        }
    }

    fn attachment(attachment: Attachment) -> Self {
        Self {
            attachment: Some(attachment),
            ..Default::default()
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum Attachment {
    Image { payload: UrlPayload },
    Template { payload: TemplatePayload },
}

#[derive(Debug, Serialize)]
struct UrlPayload {
    url: String,
}

#[derive(Debug, Serialize)]
#[serde(tag = "template_type", rename_all = "snake_case")]
enum TemplatePayload {
    Generic { elements: Vec<CarouselElement> },
    Button { text: String, buttons: Vec<TemplateButton> },
}

#[derive(Debug, Serialize)]
struct OutgoingQuickReply {
    content_type: &'static str,
    title: String,
    payload: String,
}

impl From<&QuickReply> for OutgoingQuickReply {
    fn from(reply: &QuickReply) -> Self {
        Self {
            content_type: "text",
            title: reply.title.clone(),
            payload: reply.payload.clone(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct MessageResponse {
    pub recipient_id: Option<String>,
    pub message_id: Option<String>,
}
