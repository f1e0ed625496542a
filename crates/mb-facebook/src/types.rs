//! Messenger Platform webhook types

use serde::Deserialize;
use serde_json::Value;

/// Top-level webhook body
#[derive(Debug, Clone, Deserialize)]
pub struct WebhookPayload {
    #[serde(default)]
    pub object: String,
    #[serde(default)]
    pub entry: Vec<WebhookEntry>,
}

impl WebhookPayload {
    /// Only page subscriptions carry Messenger events
    pub fn is_page(&self) -> bool {
        self.object == "page"
    }
}

/// One page entry; several may be batched into a single delivery
#[derive(Debug, Clone, Deserialize)]
pub struct WebhookEntry {
    pub id: Option<String>,
    pub time: Option<i64>,
    #[serde(default)]
    pub messaging: Vec<MessagingEvent>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Party {
    pub id: String,
}

/// A single messaging event. At most one of the optional payloads is set.
#[derive(Debug, Clone, Deserialize)]
pub struct MessagingEvent {
    pub sender: Party,
    pub recipient: Option<Party>,
    pub timestamp: Option<i64>,
    pub optin: Option<Optin>,
    pub message: Option<IncomingMessage>,
    pub delivery: Option<Delivery>,
    pub postback: Option<Postback>,
    pub read: Option<Read>,
    pub account_linking: Option<AccountLinking>,
}

/// Borrowed view of whichever payload an event carries
#[derive(Debug, Clone, Copy)]
pub enum Event<'a> {
    Optin(&'a Optin),
    Message(&'a IncomingMessage),
    Delivery(&'a Delivery),
    Postback(&'a Postback),
    Read(&'a Read),
    AccountLinking(&'a AccountLinking),
    Unknown,
}

impl MessagingEvent {
    pub fn event(&self) -> Event<'_> {
        if let Some(optin) = &self.optin {
            Event::Optin(optin)
        } else if let Some(message) = &self.message {
            Event::Message(message)
        } else if let Some(delivery) = &self.delivery {
            Event::Delivery(delivery)
        } else if let Some(postback) = &self.postback {
            Event::Postback(postback)
        } else if let Some(read) = &self.read {
            Event::Read(read)
        } else if let Some(linking) = &self.account_linking {
            Event::AccountLinking(linking)
        } else {
            Event::Unknown
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Optin {
    #[serde(rename = "ref")]
    pub reference: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct IncomingMessage {
    pub mid: Option<String>,
    pub text: Option<String>,
    #[serde(default)]
    pub is_echo: bool,
    pub app_id: Option<u64>,
    pub metadata: Option<String>,
    pub quick_reply: Option<IncomingQuickReply>,
    #[serde(default)]
    pub attachments: Vec<IncomingAttachment>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct IncomingQuickReply {
    pub payload: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct IncomingAttachment {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub payload: Value,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Delivery {
    #[serde(default)]
    pub mids: Vec<String>,
    pub watermark: Option<i64>,
    pub seq: Option<i64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Postback {
    pub title: Option<String>,
    #[serde(default)]
    pub payload: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Read {
    pub watermark: Option<i64>,
    pub seq: Option<i64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AccountLinking {
    pub status: Option<String>,
    pub authorization_code: Option<String>,
}

/// Graph API user profile
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct UserProfile {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub profile_pic: Option<String>,
}
