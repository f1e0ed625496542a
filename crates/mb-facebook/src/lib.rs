//! mb-facebook: Facebook Messenger front end for mb-gateway
//!
//! Receives Messenger webhooks, forwards user text to the NLU agent and
//! delivers the paced replies through the Send API.

pub mod api;
pub mod bot;
pub mod error;
pub mod handler;
pub mod session;
pub mod transport;
pub mod types;
pub mod webhook;

#[cfg(test)]
mod testing;

pub use api::{FacebookApi, ProfileLookup};
pub use bot::MessengerBot;
pub use error::{FacebookError, Result};
pub use handler::FacebookHandler;
pub use session::SessionRegistry;
pub use transport::MessengerTransport;
pub use types::{UserProfile, WebhookPayload};
pub use webhook::{create_webhook_router, WebhookState};
