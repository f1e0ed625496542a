//! Reply fragments returned by the NLU service and their classification

use serde::Deserialize;

/// One part of a multi-part bot reply
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(from = "RawFragment")]
pub enum ReplyFragment {
    /// Each line is sent as its own message
    Text(Vec<String>),
    /// A prompt with quick-reply buttons
    QuickReplies { title: String, options: Vec<String> },
    /// An image attachment
    Image { uri: String },
    /// A carousel card; consecutive cards are sent together
    Card(CardFragment),
    /// A message kind this bridge does not render
    Unknown,
}

/// A single card of a carousel
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CardFragment {
    pub title: String,
    pub subtitle: String,
    pub image_uri: String,
    pub buttons: Vec<CardButton>,
}

/// Card button: `target` is either a URL or an opaque postback payload
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct CardButton {
    #[serde(rename = "text")]
    pub label: String,
    #[serde(rename = "postback")]
    pub target: String,
}

impl CardButton {
    pub fn new(label: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            target: target.into(),
        }
    }
}

/// Kind tag of a [`ReplyFragment`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FragmentKind {
    Text,
    QuickReplies,
    Image,
    Card,
    Unknown,
}

/// Tag a fragment with its kind
pub fn classify(fragment: &ReplyFragment) -> FragmentKind {
    match fragment {
        ReplyFragment::Text(_) => FragmentKind::Text,
        ReplyFragment::QuickReplies { .. } => FragmentKind::QuickReplies,
        ReplyFragment::Image { .. } => FragmentKind::Image,
        ReplyFragment::Card(_) => FragmentKind::Card,
        ReplyFragment::Unknown => FragmentKind::Unknown,
    }
}

impl ReplyFragment {
    pub fn kind(&self) -> FragmentKind {
        classify(self)
    }

    pub fn text(line: impl Into<String>) -> Self {
        ReplyFragment::Text(vec![line.into()])
    }

    pub fn card(title: impl Into<String>, buttons: Vec<CardButton>) -> Self {
        ReplyFragment::Card(CardFragment {
            title: title.into(),
            buttons,
            ..Default::default()
        })
    }

    /// First line of a text fragment
    pub fn first_line(&self) -> Option<&str> {
        match self {
            ReplyFragment::Text(lines) => lines.first().map(String::as_str),
            _ => None,
        }
    }
}

// =============================================================================
// Dialogflow `fulfillmentMessages` wire shape
// =============================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawFragment {
    text: Option<RawText>,
    quick_replies: Option<RawQuickReplies>,
    image: Option<RawImage>,
    card: Option<CardFragment>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawText {
    text: Vec<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct RawQuickReplies {
    title: String,
    quick_replies: Vec<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct RawImage {
    image_uri: String,
}

impl From<RawFragment> for ReplyFragment {
    fn from(raw: RawFragment) -> Self {
        if let Some(text) = raw.text {
            ReplyFragment::Text(text.text)
        } else if let Some(quick) = raw.quick_replies {
            ReplyFragment::QuickReplies {
                title: quick.title,
                options: quick.quick_replies,
            }
        } else if let Some(image) = raw.image {
            ReplyFragment::Image {
                uri: image.image_uri,
            }
        } else if let Some(card) = raw.card {
            ReplyFragment::Card(card)
        } else {
            ReplyFragment::Unknown
        }
    }
}
