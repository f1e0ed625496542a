//! mb-core: Messenger bridge core library
//!
//! Turns Dialogflow intent results into paced Messenger replies: fragment
//! classification, carousel building, the reply scheduler and action
//! routing, plus the stores and lookups the built-in actions use.

pub mod action;
pub mod config;
pub mod error;
pub mod intent;
pub mod nlu;
pub mod recipient;
pub mod reply;
pub mod store;
pub mod weather;

pub use action::{ActionContext, ActionHandler, ActionRouter, RouterOutcome, SpecializedReply};
pub use config::{
    Config, DialogflowConfig, FacebookConfig, ReplyConfig, ServerConfig, SessionConfig, StorageConfig,
    WeatherConfig,
};
pub use error::{Error, Result};
pub use intent::{IntentResultHandler, ReplyBurst, FALLBACK_REPLY};
pub use nlu::{DialogflowClient, IntentResult, NluClient, OutputContext, Parameters};
pub use recipient::RecipientId;
pub use reply::{
    CarouselElement, MessageTransport, QuickReply, ReplyFragment, ReplyScheduler, SenderAction, TemplateButton,
};
pub use store::{ColorCatalog, InMemoryPreferenceStore, PreferenceStore, SqlitePreferenceStore};
pub use weather::{OpenWeatherClient, WeatherLookup};
