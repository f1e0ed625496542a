//! Carousel payload construction
//!
//! Turns a run of card fragments into generic-template elements. The
//! serialized form matches the Messenger Platform template shape.

use serde::Serialize;

use super::fragment::{CardButton, CardFragment};

/// Button attached to a template element
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TemplateButton {
    /// Opens `url` in the browser
    #[serde(rename = "web_url")]
    Link { title: String, url: String },
    /// Echoes `payload` back to the webhook when tapped
    Postback { title: String, payload: String },
    /// Dials `payload`
    PhoneNumber { title: String, payload: String },
}

impl TemplateButton {
    pub fn title(&self) -> &str {
        match self {
            TemplateButton::Link { title, .. }
            | TemplateButton::Postback { title, .. }
            | TemplateButton::PhoneNumber { title, .. } => title,
        }
    }
}

/// One element of a carousel (generic template)
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CarouselElement {
    pub title: String,
    pub image_url: String,
    pub subtitle: String,
    pub buttons: Vec<TemplateButton>,
}

/// Builds carousel elements from card fragments
#[derive(Debug, Clone, Copy, Default)]
pub struct CarouselBuilder;

impl CarouselBuilder {
    /// One element per card, buttons in card order
    pub fn build(cards: &[CardFragment]) -> Vec<CarouselElement> {
        cards
            .iter()
            .map(|card| CarouselElement {
                title: card.title.clone(),
                image_url: card.image_uri.clone(),
                subtitle: card.subtitle.clone(),
                buttons: card.buttons.iter().map(Self::button).collect(),
            })
            .collect()
    }

    /// Targets starting with `http` become links, anything else a postback.
    /// The target is not validated.
    pub fn button(button: &CardButton) -> TemplateButton {
        if button.target.starts_with("http") {
            TemplateButton::Link {
                title: button.label.clone(),
                url: button.target.clone(),
            }
        } else {
            TemplateButton::Postback {
                title: button.label.clone(),
                payload: button.target.clone(),
            }
        }
    }
}
