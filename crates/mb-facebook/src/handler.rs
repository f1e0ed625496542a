//! Messaging event dispatch

use std::sync::Arc;

use tracing::{debug, error, info, warn};

use mb_core::{IntentResultHandler, MessageTransport, NluClient, RecipientId, ReplyBurst, SenderAction, FALLBACK_REPLY};

use crate::api::ProfileLookup;
use crate::session::SessionRegistry;
use crate::types::{Event, IncomingMessage, MessagingEvent, Postback, WebhookPayload};

pub const PAYLOAD_GET_STARTED: &str = "GET_STARTED";
pub const PAYLOAD_CHAT: &str = "CHAT";
pub const PAYLOAD_JOB_APPLY: &str = "JOB_APPLY";

const GREETING: &str =
    "I can answer frequently asked questions for you and I perform job interviews. What can I help you with?";

/// Facebook message handler
pub struct FacebookHandler {
    intents: IntentResultHandler,
    nlu: Arc<dyn NluClient>,
    profiles: Arc<dyn ProfileLookup>,
    sessions: Arc<SessionRegistry>,
}

impl FacebookHandler {
    pub fn new(
        intents: IntentResultHandler,
        nlu: Arc<dyn NluClient>,
        profiles: Arc<dyn ProfileLookup>,
        sessions: Arc<SessionRegistry>,
    ) -> Self {
        Self {
            intents,
            nlu,
            profiles,
            sessions,
        }
    }

    pub fn sessions(&self) -> &Arc<SessionRegistry> {
        &self.sessions
    }

    fn transport(&self) -> &Arc<dyn MessageTransport> {
        self.intents.scheduler().transport()
    }

    /// Dispatch every event of a page payload. Non-page objects are ignored.
    pub async fn process_payload(&self, payload: &WebhookPayload) -> Vec<ReplyBurst> {
        if !payload.is_page() {
            debug!("Ignoring webhook for object {:?}", payload.object);
            return Vec::new();
        }

        let mut bursts = Vec::new();
        for entry in &payload.entry {
            for event in &entry.messaging {
                bursts.push(self.handle_event(event).await);
            }
        }
        bursts
    }

    /// Handle a single messaging event
    pub async fn handle_event(&self, event: &MessagingEvent) -> ReplyBurst {
        let sender = RecipientId::from(event.sender.id.as_str());

        match event.event() {
            Event::Optin(optin) => {
                info!(
                    recipient = %sender,
                    "Received authentication with pass-through param {:?}",
                    optin.reference
                );
                self.transport()
                    .send_text(&sender, "Authentication successful")
                    .await;
                ReplyBurst::default()
            }
            Event::Message(message) => self.handle_message(&sender, message).await,
            Event::Delivery(delivery) => {
                for mid in &delivery.mids {
                    debug!("Received delivery confirmation for message ID: {}", mid);
                }
                debug!("All messages before {:?} were delivered", delivery.watermark);
                ReplyBurst::default()
            }
            Event::Postback(postback) => self.handle_postback(&sender, postback).await,
            Event::Read(read) => {
                debug!(
                    recipient = %sender,
                    "Messages read up to watermark {:?}, seq {:?}",
                    read.watermark,
                    read.seq
                );
                ReplyBurst::default()
            }
            Event::AccountLinking(linking) => {
                info!(
                    recipient = %sender,
                    "Account link event with status {:?}",
                    linking.status
                );
                ReplyBurst::default()
            }
            Event::Unknown => {
                warn!(recipient = %sender, "Webhook received unknown messaging event");
                ReplyBurst::default()
            }
        }
    }

    async fn handle_message(&self, sender: &RecipientId, message: &IncomingMessage) -> ReplyBurst {
        if message.is_echo {
            debug!(
                "Received echo for message {:?} and app {:?} with metadata {:?}",
                message.mid, message.app_id, message.metadata
            );
            return ReplyBurst::default();
        }

        self.ensure_session(sender).await;

        if let Some(quick_reply) = &message.quick_reply {
            info!(
                "Quick reply for message {:?} with payload {}",
                message.mid, quick_reply.payload
            );
            return self.send_to_nlu(sender, &quick_reply.payload).await;
        }

        match message.text.as_deref() {
            Some(text) if !text.is_empty() => self.send_to_nlu(sender, text).await,
            _ if !message.attachments.is_empty() => {
                self.transport()
                    .send_text(sender, "Attachment received. Thank you.")
                    .await;
                ReplyBurst::default()
            }
            _ => ReplyBurst::default(),
        }
    }

    async fn handle_postback(&self, sender: &RecipientId, postback: &Postback) -> ReplyBurst {
        self.ensure_session(sender).await;
        info!(recipient = %sender, payload = %postback.payload, "Received postback");

        match postback.payload.as_str() {
            PAYLOAD_GET_STARTED => {
                self.greet(sender).await;
                ReplyBurst::default()
            }
            PAYLOAD_CHAT => {
                self.transport()
                    .send_text(
                        sender,
                        "I love chatting too. Do you have any other questions for me?",
                    )
                    .await;
                ReplyBurst::default()
            }
            PAYLOAD_JOB_APPLY => self.send_to_nlu(sender, "job openings").await,
            _ => {
                self.transport().send_text(sender, FALLBACK_REPLY).await;
                ReplyBurst::default()
            }
        }
    }

    async fn greet(&self, sender: &RecipientId) {
        let first_name = self
            .sessions
            .profile(sender)
            .and_then(|profile| profile.first_name)
            .filter(|name| !name.is_empty());

        let text = match first_name {
            Some(name) => format!("Welcome {}! {}", name, GREETING),
            None => format!("Welcome! {}", GREETING),
        };
        self.transport().send_text(sender, &text).await;
    }

    /// Create the NLU session and fetch the profile on first contact
    async fn ensure_session(&self, sender: &RecipientId) {
        self.sessions.session_id(sender);

        if self.sessions.has_profile(sender) {
            return;
        }
        match self.profiles.user_profile(sender.as_str()).await {
            Ok(profile) => self.sessions.store_profile(sender, profile),
            Err(e) => warn!(recipient = %sender, "Cannot get profile: {}", e),
        }
    }

    async fn send_to_nlu(&self, sender: &RecipientId, text: &str) -> ReplyBurst {
        let session_id = self.sessions.session_id(sender);
        self.transport()
            .send_sender_action(sender, SenderAction::TypingOn)
            .await;

        match self.nlu.detect_intent(&session_id, text).await {
            Ok(result) => {
                self.transport()
                    .send_sender_action(sender, SenderAction::TypingOff)
                    .await;
                self.intents.handle_detect_result(sender, &result).await
            }
            Err(e) => {
                error!(recipient = %sender, "NLU request failed: {}", e);
                ReplyBurst::default()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{fixture, Sent};
    use crate::types::UserProfile;

    fn payload(events: &str) -> WebhookPayload {
        serde_json::from_str(&format!(
            r#"{{"object": "page", "entry": [{{"id": "page", "messaging": [{}]}}]}}"#,
            events
        ))
        .unwrap()
    }

    async fn run(handler: &FacebookHandler, payload: &WebhookPayload) {
        for burst in handler.process_payload(payload).await {
            burst.finished().await;
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_text_message_goes_through_nlu() {
        let fx = fixture();
        run(
            &fx.handler,
            &payload(r#"{"sender": {"id": "u1"}, "message": {"mid": "m1", "text": "hello"}}"#),
        )
        .await;

        assert_eq!(
            fx.transport.sent(),
            vec![
                Sent::Action(SenderAction::TypingOn),
                Sent::Action(SenderAction::TypingOff),
                Sent::Text("echo: hello".into()),
            ]
        );
        let queries = fx.nlu.queries();
        assert_eq!(queries.len(), 1);
        assert_eq!(queries[0].1, "hello");
        assert_eq!(queries[0].0, fx.handler.sessions().session_id(&RecipientId::from("u1")));
    }

    #[tokio::test(start_paused = true)]
    async fn test_quick_reply_payload_sent_to_nlu() {
        let fx = fixture();
        run(
            &fx.handler,
            &payload(
                r#"{"sender": {"id": "u1"}, "message": {"text": "Less than a year", "quick_reply": {"payload": "Less than a year."}}}"#,
            ),
        )
        .await;

        assert_eq!(fx.nlu.queries()[0].1, "Less than a year.");
    }

    #[tokio::test(start_paused = true)]
    async fn test_echo_ignored() {
        let fx = fixture();
        run(
            &fx.handler,
            &payload(r#"{"sender": {"id": "page"}, "message": {"is_echo": true, "text": "mine"}}"#),
        )
        .await;

        assert!(fx.transport.sent().is_empty());
        assert!(fx.nlu.queries().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_attachment_acknowledged() {
        let fx = fixture();
        run(
            &fx.handler,
            &payload(r#"{"sender": {"id": "u1"}, "message": {"attachments": [{"type": "image", "payload": {}}]}}"#),
        )
        .await;

        assert_eq!(
            fx.transport.sent(),
            vec![Sent::Text("Attachment received. Thank you.".into())]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_postbacks() {
        let fx = fixture();
        fx.profiles.set(
            "u1",
            UserProfile {
                first_name: Some("Ada".into()),
                ..Default::default()
            },
        );

        run(
            &fx.handler,
            &payload(
                r#"{"sender": {"id": "u1"}, "postback": {"payload": "GET_STARTED"}},
                   {"sender": {"id": "u2"}, "postback": {"payload": "GET_STARTED"}},
                   {"sender": {"id": "u1"}, "postback": {"payload": "CHAT"}},
                   {"sender": {"id": "u1"}, "postback": {"payload": "SOMETHING"}}"#,
            ),
        )
        .await;

        assert_eq!(
            fx.transport.sent(),
            vec![
                Sent::Text(format!("Welcome Ada! {}", GREETING)),
                Sent::Text(format!("Welcome! {}", GREETING)),
                Sent::Text("I love chatting too. Do you have any other questions for me?".into()),
                Sent::Text(FALLBACK_REPLY.into()),
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_job_apply_postback() {
        let fx = fixture();
        run(
            &fx.handler,
            &payload(r#"{"sender": {"id": "u1"}, "postback": {"payload": "JOB_APPLY"}}"#),
        )
        .await;

        assert_eq!(fx.nlu.queries()[0].1, "job openings");
    }

    #[tokio::test(start_paused = true)]
    async fn test_optin_and_passive_events() {
        let fx = fixture();
        run(
            &fx.handler,
            &payload(
                r#"{"sender": {"id": "u1"}, "optin": {"ref": "x"}},
                   {"sender": {"id": "u1"}, "delivery": {"mids": ["m"], "watermark": 1}},
                   {"sender": {"id": "u1"}, "read": {"watermark": 2}},
                   {"sender": {"id": "u1"}, "account_linking": {"status": "linked"}},
                   {"sender": {"id": "u1"}}"#,
            ),
        )
        .await;

        assert_eq!(fx.transport.sent(), vec![Sent::Text("Authentication successful".into())]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_nlu_failure_sends_nothing_more() {
        let fx = fixture();
        fx.nlu.fail();
        run(
            &fx.handler,
            &payload(r#"{"sender": {"id": "u1"}, "message": {"text": "hello"}}"#),
        )
        .await;

        assert_eq!(fx.transport.sent(), vec![Sent::Action(SenderAction::TypingOn)]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_non_page_payload_ignored() {
        let fx = fixture();
        let payload: WebhookPayload = serde_json::from_str(
            r#"{"object": "user", "entry": [{"messaging": [{"sender": {"id": "u1"}, "message": {"text": "hi"}}]}]}"#,
        )
        .unwrap();

        assert!(fx.handler.process_payload(&payload).await.is_empty());
        assert!(fx.transport.sent().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_profile_fetched_once() {
        let fx = fixture();
        run(
            &fx.handler,
            &payload(
                r#"{"sender": {"id": "u1"}, "message": {"text": "one"}},
                   {"sender": {"id": "u1"}, "message": {"text": "two"}}"#,
            ),
        )
        .await;

        assert_eq!(fx.profiles.lookups(), 1);
        assert!(fx.handler.sessions().has_profile(&RecipientId::from("u1")));
    }
}
