//! Action routing
//!
//! Maps NLU action names to handlers that build a specialized reply. Any
//! action without a handler falls through to the generic reply scheduler
//! with the NLU fragments untouched.

mod preference;
mod support;
mod weather;

pub use preference::{BuyWithFavouriteHandler, ColorListHandler, FavouriteColorHandler};
pub use support::{FaqDeliveryHandler, JobApplicationHandler};
pub use weather::WeatherHandler;

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;

use crate::nlu::{OutputContext, Parameters};
use crate::recipient::RecipientId;
use crate::reply::{QuickReply, ReplyFragment, TemplateButton};
use crate::store::{ColorCatalog, PreferenceStore};
use crate::weather::WeatherLookup;

/// Lists the available colors
pub const ACTION_COLOR_LIST: &str = "iphone_colors";
/// Stores the recipient's favourite color
pub const ACTION_FAVOURITE_COLOR: &str = "iphone_colors.favourite";
/// Offers the recipient's favourite color when buying
pub const ACTION_BUY: &str = "buy.iphone";
/// Current weather for a city
pub const ACTION_WEATHER: &str = "get-current-weather";
/// Delivery FAQ with follow-up buttons
pub const ACTION_FAQ_DELIVERY: &str = "faq-delivery";
/// Job application dialog
pub const ACTION_JOB_APPLICATION: &str = "detailed_application";

/// Everything a handler may look at
#[derive(Debug, Clone, Copy)]
pub struct ActionContext<'a> {
    pub recipient: &'a RecipientId,
    pub action: &'a str,
    pub fragments: &'a [ReplyFragment],
    pub contexts: &'a [OutputContext],
    pub parameters: &'a Parameters,
}

impl ActionContext<'_> {
    /// Hand the NLU fragments to the scheduler unchanged
    pub fn delegate(&self) -> RouterOutcome {
        RouterOutcome::Delegate(self.fragments.to_vec())
    }

    /// First line of the first text fragment
    pub fn first_text(&self) -> Option<&str> {
        self.fragments.iter().find_map(ReplyFragment::first_line)
    }
}

/// What to do with an intent result
#[derive(Debug, Clone, PartialEq)]
pub enum RouterOutcome {
    /// Send these fragments through the reply scheduler
    Delegate(Vec<ReplyFragment>),
    /// Send a reply built by a handler
    Reply(SpecializedReply),
}

/// Replies built by action handlers
#[derive(Debug, Clone, PartialEq)]
pub enum SpecializedReply {
    Text(String),
    QuickReplies {
        title: String,
        options: Vec<QuickReply>,
    },
    /// Schedule `fragments`, show the typing indicator, then send a button
    /// template after `delay`
    FollowUp {
        fragments: Vec<ReplyFragment>,
        delay: Duration,
        text: String,
        buttons: Vec<TemplateButton>,
    },
}

/// Handler for one action name
#[async_trait]
pub trait ActionHandler: Send + Sync {
    async fn handle(&self, ctx: &ActionContext<'_>) -> RouterOutcome;
}

/// Adapts a plain function into an [`ActionHandler`]
pub struct FnHandler<F>(pub F);

#[async_trait]
impl<F> ActionHandler for FnHandler<F>
where
    F: Fn(&ActionContext<'_>) -> RouterOutcome + Send + Sync,
{
    async fn handle(&self, ctx: &ActionContext<'_>) -> RouterOutcome {
        (self.0)(ctx)
    }
}

/// Action name to handler table
#[derive(Clone, Default)]
pub struct ActionRouter {
    handlers: HashMap<String, Arc<dyn ActionHandler>>,
}

impl ActionRouter {
    /// Create an empty router; every action delegates
    pub fn new() -> Self {
        Self::default()
    }

    /// Router with the built-in handlers. The weather action is only
    /// registered when a lookup is available.
    pub fn with_default_actions(
        preferences: Arc<dyn PreferenceStore>,
        catalog: Arc<dyn ColorCatalog>,
        weather: Option<Arc<dyn WeatherLookup>>,
    ) -> Self {
        let mut router = Self::new();

        router.register(ACTION_COLOR_LIST, Arc::new(ColorListHandler::new(catalog)));
        router.register(
            ACTION_FAVOURITE_COLOR,
            Arc::new(FavouriteColorHandler::new(Arc::clone(&preferences))),
        );
        router.register(ACTION_BUY, Arc::new(BuyWithFavouriteHandler::new(preferences)));
        if let Some(weather) = weather {
            router.register(ACTION_WEATHER, Arc::new(WeatherHandler::new(weather)));
        }
        router.register(ACTION_FAQ_DELIVERY, Arc::new(FaqDeliveryHandler::default()));
        router.register(ACTION_JOB_APPLICATION, Arc::new(JobApplicationHandler));

        router
    }

    /// Register a handler, replacing any existing one for `action`
    pub fn register(&mut self, action: impl Into<String>, handler: Arc<dyn ActionHandler>) {
        self.handlers.insert(action.into(), handler);
    }

    /// Register a synchronous function as handler
    pub fn register_fn<F>(&mut self, action: impl Into<String>, handler: F)
    where
        F: Fn(&ActionContext<'_>) -> RouterOutcome + Send + Sync + 'static,
    {
        self.register(action, Arc::new(FnHandler(handler)));
    }

    pub fn contains(&self, action: &str) -> bool {
        self.handlers.contains_key(action)
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    pub fn action_names(&self) -> Vec<&str> {
        self.handlers.keys().map(|s| s.as_str()).collect()
    }

    /// Exact-name lookup; unknown actions delegate
    pub async fn route(&self, ctx: &ActionContext<'_>) -> RouterOutcome {
        match self.handlers.get(ctx.action) {
            Some(handler) => {
                debug!(recipient = %ctx.recipient, action = ctx.action, "Routing action");
                handler.handle(ctx).await
            }
            None => {
                debug!(action = ctx.action, "No handler registered, delegating");
                ctx.delegate()
            }
        }
    }
}
