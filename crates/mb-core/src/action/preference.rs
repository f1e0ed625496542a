//! Favourite-color actions

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{error, info};

use super::{ActionContext, ActionHandler, RouterOutcome, SpecializedReply};
use crate::store::{ColorCatalog, PreferenceStore};

/// Parameter carrying the chosen color
pub const COLOR_PARAMETER: &str = "color";

/// Replies with every color in the catalog
pub struct ColorListHandler {
    catalog: Arc<dyn ColorCatalog>,
}

impl ColorListHandler {
    pub fn new(catalog: Arc<dyn ColorCatalog>) -> Self {
        Self { catalog }
    }
}

#[async_trait]
impl ActionHandler for ColorListHandler {
    async fn handle(&self, ctx: &ActionContext<'_>) -> RouterOutcome {
        match self.catalog.all_colors() {
            Ok(colors) => RouterOutcome::Reply(SpecializedReply::Text(format!(
                "IPhone XXX is available in {}, Which is your favourite?",
                colors.join(", ")
            ))),
            Err(e) => {
                error!("Failed to read color catalog: {}", e);
                ctx.delegate()
            }
        }
    }
}

/// Remembers the color given in the `color` parameter
pub struct FavouriteColorHandler {
    preferences: Arc<dyn PreferenceStore>,
}

impl FavouriteColorHandler {
    pub fn new(preferences: Arc<dyn PreferenceStore>) -> Self {
        Self { preferences }
    }
}

#[async_trait]
impl ActionHandler for FavouriteColorHandler {
    async fn handle(&self, ctx: &ActionContext<'_>) -> RouterOutcome {
        let Some(color) = ctx.parameters.get_str(COLOR_PARAMETER) else {
            return ctx.delegate();
        };

        match self.preferences.set(ctx.recipient, color) {
            Ok(()) => {
                info!(recipient = %ctx.recipient, color, "Stored favourite color");
                RouterOutcome::Reply(SpecializedReply::Text(
                    "Oh, I like it too. I will remember that.".to_string(),
                ))
            }
            Err(e) => {
                error!("Failed to store favourite color: {}", e);
                ctx.delegate()
            }
        }
    }
}

/// Suggests the stored favourite color, or asks for one
pub struct BuyWithFavouriteHandler {
    preferences: Arc<dyn PreferenceStore>,
}

impl BuyWithFavouriteHandler {
    pub fn new(preferences: Arc<dyn PreferenceStore>) -> Self {
        Self { preferences }
    }
}

#[async_trait]
impl ActionHandler for BuyWithFavouriteHandler {
    async fn handle(&self, ctx: &ActionContext<'_>) -> RouterOutcome {
        let reply = match self.preferences.get(ctx.recipient) {
            Ok(Some(color)) if !color.is_empty() => {
                format!("Would you like it in your favourite color {} ?", color)
            }
            Ok(_) => "In what color would you like to have it ?".to_string(),
            Err(e) => {
                error!("Failed to read favourite color: {}", e);
                return ctx.delegate();
            }
        };

        RouterOutcome::Reply(SpecializedReply::Text(reply))
    }
}
