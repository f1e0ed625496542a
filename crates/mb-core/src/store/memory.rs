use std::collections::HashMap;
use std::sync::RwLock;

use super::{ColorCatalog, PreferenceStore, DEFAULT_COLORS};
use crate::recipient::RecipientId;
use crate::{Error, Result};

/// Process-local preference store
#[derive(Debug)]
pub struct InMemoryPreferenceStore {
    colors: Vec<String>,
    favourites: RwLock<HashMap<RecipientId, String>>,
}

impl InMemoryPreferenceStore {
    pub fn new() -> Self {
        Self::with_colors(DEFAULT_COLORS.iter().map(|c| c.to_string()).collect())
    }

    pub fn with_colors(colors: Vec<String>) -> Self {
        Self {
            colors,
            favourites: RwLock::new(HashMap::new()),
        }
    }
}

impl Default for InMemoryPreferenceStore {
    fn default() -> Self {
        Self::new()
    }
}

impl PreferenceStore for InMemoryPreferenceStore {
    fn get(&self, recipient: &RecipientId) -> Result<Option<String>> {
        let favourites = self
            .favourites
            .read()
            .map_err(|e| Error::Store(e.to_string()))?;
        Ok(favourites.get(recipient).cloned())
    }

    fn set(&self, recipient: &RecipientId, color: &str) -> Result<()> {
        let mut favourites = self
            .favourites
            .write()
            .map_err(|e| Error::Store(e.to_string()))?;
        favourites.insert(recipient.clone(), color.to_string());
        Ok(())
    }
}

impl ColorCatalog for InMemoryPreferenceStore {
    fn all_colors(&self) -> Result<Vec<String>> {
        Ok(self.colors.clone())
    }
}
