//! Messenger bot implementation
//!
//! Wires the Send API, reply scheduler, session registry and webhook server

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast;
use tracing::info;

use mb_core::{ActionRouter, Config, IntentResultHandler, NluClient, ReplyScheduler};

use crate::api::FacebookApi;
use crate::error::{FacebookError, Result};
use crate::handler::FacebookHandler;
use crate::session::SessionRegistry;
use crate::transport::MessengerTransport;
use crate::webhook::{create_webhook_router, WebhookState};

/// Messenger bot for the Dialogflow bridge
pub struct MessengerBot {
    port: u16,
    verify_token: String,
    handler: Arc<FacebookHandler>,
    sessions: Arc<SessionRegistry>,
}

impl MessengerBot {
    /// Create a new bot. Must be called inside a tokio runtime; the session
    /// cleanup task starts immediately.
    pub fn new(config: &Config, nlu: Arc<dyn NluClient>, router: ActionRouter) -> Result<Self> {
        if config.facebook.verify_token.is_empty() {
            return Err(FacebookError::VerifyTokenNotSet);
        }

        let api = FacebookApi::new(&config.facebook)?;
        let transport = Arc::new(MessengerTransport::new(api.clone()));
        let scheduler = ReplyScheduler::new(transport).with_interval(config.reply.interval());
        let intents = IntentResultHandler::new(router, scheduler);

        let sessions = Arc::new(SessionRegistry::new(Duration::from_secs(config.session.ttl_secs)));
        let _cleanup = Arc::clone(&sessions).start_cleanup_task();

        let handler = Arc::new(FacebookHandler::new(
            intents,
            nlu,
            Arc::new(api),
            Arc::clone(&sessions),
        ));

        Ok(Self {
            port: config.server.port,
            verify_token: config.facebook.verify_token.clone(),
            handler,
            sessions,
        })
    }

    pub fn handler(&self) -> &Arc<FacebookHandler> {
        &self.handler
    }

    pub fn sessions(&self) -> &Arc<SessionRegistry> {
        &self.sessions
    }

    /// Run the webhook server until `shutdown` fires
    pub async fn run(&self, mut shutdown: broadcast::Receiver<()>) -> Result<()> {
        let state = WebhookState {
            verify_token: self.verify_token.clone(),
            handler: Arc::clone(&self.handler),
        };

        let addr = format!("0.0.0.0:{}", self.port);
        let listener = tokio::net::TcpListener::bind(&addr)
            .await
            .map_err(|e| FacebookError::Webhook(e.to_string()))?;

        info!("Messenger webhook server listening on {}", addr);

        let app = create_webhook_router(state);

        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                info!("Messenger bot shutting down");
            })
            .await
            .map_err(|e| FacebookError::Webhook(e.to_string()))?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::EchoNlu;

    fn config() -> Config {
        let mut config = Config::default();
        config.facebook.page_token = "page-token".into();
        config.facebook.verify_token = "verify".into();
        config.reply.interval_ms = 500;
        config
    }

    #[tokio::test]
    async fn test_bot_creation() {
        let bot = MessengerBot::new(&config(), Arc::new(EchoNlu::default()), ActionRouter::new()).unwrap();
        assert!(bot.sessions().is_empty());
    }

    #[tokio::test]
    async fn test_bot_creation_fails_without_credentials() {
        let mut missing_verify = config();
        missing_verify.facebook.verify_token.clear();
        assert!(matches!(
            MessengerBot::new(&missing_verify, Arc::new(EchoNlu::default()), ActionRouter::new()),
            Err(FacebookError::VerifyTokenNotSet)
        ));

        let mut missing_page = config();
        missing_page.facebook.page_token.clear();
        assert!(matches!(
            MessengerBot::new(&missing_page, Arc::new(EchoNlu::default()), ActionRouter::new()),
            Err(FacebookError::AccessTokenNotSet)
        ));
    }
}
