//! `MessageTransport` over the Send API

use async_trait::async_trait;
use tracing::error;

use mb_core::{CarouselElement, MessageTransport, QuickReply, RecipientId, SenderAction, TemplateButton};

use crate::api::{FacebookApi, MessageResponse};
use crate::error::Result;

/// Sends replies through the Messenger Send API. Failures are logged and
/// swallowed.
#[derive(Clone)]
pub struct MessengerTransport {
    api: FacebookApi,
}

impl MessengerTransport {
    pub fn new(api: FacebookApi) -> Self {
        Self { api }
    }
}

fn report(kind: &str, recipient: &RecipientId, result: Result<MessageResponse>) {
    if let Err(e) = result {
        error!(recipient = %recipient, "Failed to send {}: {}", kind, e);
    }
}

#[async_trait]
impl MessageTransport for MessengerTransport {
    async fn send_text(&self, recipient: &RecipientId, text: &str) {
        report("text", recipient, self.api.send_text(recipient.as_str(), text).await);
    }

    async fn send_image(&self, recipient: &RecipientId, uri: &str) {
        report("image", recipient, self.api.send_image(recipient.as_str(), uri).await);
    }

    async fn send_quick_replies(&self, recipient: &RecipientId, title: &str, options: &[QuickReply]) {
        let result = self
            .api
            .send_quick_replies(recipient.as_str(), title, options)
            .await;
        report("quick replies", recipient, result);
    }

    async fn send_carousel(&self, recipient: &RecipientId, elements: &[CarouselElement]) {
        let result = self
            .api
            .send_generic_template(recipient.as_str(), elements)
            .await;
        report("carousel", recipient, result);
    }

    async fn send_buttons(&self, recipient: &RecipientId, text: &str, buttons: &[TemplateButton]) {
        let result = self
            .api
            .send_button_template(recipient.as_str(), text, buttons)
            .await;
        report("buttons", recipient, result);
    }

    async fn send_sender_action(&self, recipient: &RecipientId, action: SenderAction) {
        let result = self.api.send_sender_action(recipient.as_str(), action).await;
        report("sender action", recipient, result);
    }
}
