//! Outbound messaging capability

use async_trait::async_trait;
use serde::Serialize;

use super::carousel::{CarouselElement, TemplateButton};
use crate::recipient::RecipientId;

/// Quick-reply button shown under a prompt
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QuickReply {
    pub title: String,
    pub payload: String,
}

impl QuickReply {
    pub fn new(title: impl Into<String>, payload: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            payload: payload.into(),
        }
    }

    /// Title and payload are the same label
    pub fn echo(label: impl Into<String>) -> Self {
        let label = label.into();
        Self {
            title: label.clone(),
            payload: label,
        }
    }
}

/// Indicator actions shown in the conversation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SenderAction {
    TypingOn,
    TypingOff,
}

/// Sends messages to a recipient.
///
/// Implementations report their own failures (log them) instead of returning
/// errors, so callers never have to handle a failed send.
#[async_trait]
pub trait MessageTransport: Send + Sync {
    async fn send_text(&self, recipient: &RecipientId, text: &str);

    async fn send_image(&self, recipient: &RecipientId, uri: &str);

    async fn send_quick_replies(&self, recipient: &RecipientId, title: &str, options: &[QuickReply]);

    async fn send_carousel(&self, recipient: &RecipientId, elements: &[CarouselElement]);

    async fn send_buttons(&self, recipient: &RecipientId, text: &str, buttons: &[TemplateButton]);

    async fn send_sender_action(&self, recipient: &RecipientId, action: SenderAction);
}

/// Recording transport for tests in this and downstream crates
#[cfg(any(test, feature = "test-util"))]
pub mod testing {
    use std::sync::{Mutex, MutexGuard};
    use std::time::Duration;

    use tokio::time::Instant;

    use super::*;

    /// What a transport was asked to send
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub enum Sent {
        Text(String),
        Image(String),
        QuickReplies(String, Vec<QuickReply>),
        Carousel(Vec<CarouselElement>),
        Buttons(String, Vec<TemplateButton>),
        Action(SenderAction),
    }

    #[derive(Debug, Clone)]
    pub struct Delivery {
        pub at: Duration,
        pub recipient: RecipientId,
        pub sent: Sent,
    }

    /// Records every send together with the (virtual) time it happened
    pub struct RecordingTransport {
        started: Instant,
        deliveries: Mutex<Vec<Delivery>>,
    }

    impl RecordingTransport {
        pub fn new() -> Self {
            Self {
                started: Instant::now(),
                deliveries: Mutex::new(Vec::new()),
            }
        }

        fn lock(&self) -> MutexGuard<'_, Vec<Delivery>> {
            self.deliveries.lock().unwrap_or_else(|e| e.into_inner())
        }

        pub fn deliveries(&self) -> Vec<Delivery> {
            self.lock().clone()
        }

        pub fn sent(&self) -> Vec<Sent> {
            self.deliveries().into_iter().map(|d| d.sent).collect()
        }

        /// Sends ordered by time, millisecond resolution
        pub fn timeline(&self) -> Vec<(u128, Sent)> {
            let mut timeline: Vec<(u128, Sent)> = self
                .deliveries()
                .into_iter()
                .map(|d| (d.at.as_millis(), d.sent))
                .collect();
            timeline.sort_by_key(|(at, _)| *at);
            timeline
        }

        fn record(&self, recipient: &RecipientId, sent: Sent) {
            self.lock().push(Delivery {
                at: self.started.elapsed(),
                recipient: recipient.clone(),
                sent,
            });
        }
    }

    impl Default for RecordingTransport {
        fn default() -> Self {
            Self::new()
        }
    }

    #[async_trait]
    impl MessageTransport for RecordingTransport {
        async fn send_text(&self, recipient: &RecipientId, text: &str) {
            self.record(recipient, Sent::Text(text.to_string()));
        }

        async fn send_image(&self, recipient: &RecipientId, uri: &str) {
            self.record(recipient, Sent::Image(uri.to_string()));
        }

        async fn send_quick_replies(&self, recipient: &RecipientId, title: &str, options: &[QuickReply]) {
            self.record(recipient, Sent::QuickReplies(title.to_string(), options.to_vec()));
        }

        async fn send_carousel(&self, recipient: &RecipientId, elements: &[CarouselElement]) {
            self.record(recipient, Sent::Carousel(elements.to_vec()));
        }

        async fn send_buttons(&self, recipient: &RecipientId, text: &str, buttons: &[TemplateButton]) {
            self.record(recipient, Sent::Buttons(text.to_string(), buttons.to_vec()));
        }

        async fn send_sender_action(&self, recipient: &RecipientId, action: SenderAction) {
            self.record(recipient, Sent::Action(action));
        }
    }
}
