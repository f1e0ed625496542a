//! Per-recipient preference storage
//!
//! The favourite color of each recipient plus the catalog of colors the bot
//! offers. `SqlitePreferenceStore` persists both; `InMemoryPreferenceStore`
//! keeps them in process memory.

mod memory;
mod sqlite;

pub use memory::InMemoryPreferenceStore;
pub use sqlite::SqlitePreferenceStore;

use crate::recipient::RecipientId;
use crate::Result;

/// Colors offered when the catalog is first created
pub const DEFAULT_COLORS: &[&str] = &["Blue", "Silver", "Black", "Red"];

/// Favourite-color storage keyed by recipient
pub trait PreferenceStore: Send + Sync {
    fn get(&self, recipient: &RecipientId) -> Result<Option<String>>;

    fn set(&self, recipient: &RecipientId, color: &str) -> Result<()>;
}

/// Colors a recipient can choose from
pub trait ColorCatalog: Send + Sync {
    fn all_colors(&self) -> Result<Vec<String>>;
}
