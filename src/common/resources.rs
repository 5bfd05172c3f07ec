//! Game resources: item names and item prefix (modifier) names.

use std::collections::HashMap;
use std::path::Path;

use serde::Deserialize;
use tracing::error;

use crate::common::error::ConfigError;

/// Name lookup for the numeric ids embedded in chat item tags.
pub trait ItemLookup: Send + Sync {
    fn item_name(&self, id: u32) -> Option<&str>;
    fn prefix_name(&self, id: u32) -> Option<&str>;
}

/// Item and prefix names shipped with the bridge, in the items file layout.
const BUILTIN_ITEMS: &str = include_str!("../../assets/items.json");

/// Item and prefix names, built in plus overrides from a JSON file.
#[derive(Debug, Clone, Default)]
pub struct ItemTable {
    items: HashMap<u32, String>,
    prefixes: HashMap<u32, String>,
}

/// On-disk layout of the items file.
#[derive(Debug, Default, Deserialize)]
struct ItemFile {
    #[serde(default)]
    items: HashMap<u32, String>,
    #[serde(default)]
    prefixes: HashMap<u32, String>,
}

impl ItemTable {
    /// Table holding only the built-in names.
    pub fn builtin() -> Self {
        match serde_json::from_str::<ItemFile>(BUILTIN_ITEMS) {
            Ok(file) => Self {
                items: file.items,
                prefixes: file.prefixes,
            },
            Err(e) => {
                error!("Built-in item names are unreadable: {}", e);
                Self::default()
            }
        }
    }

    #[cfg(test)]
    pub fn from_entries(
        items: impl IntoIterator<Item = (u32, String)>,
        prefixes: impl IntoIterator<Item = (u32, String)>,
    ) -> Self {
        Self {
            items: items.into_iter().collect(),
            prefixes: prefixes.into_iter().collect(),
        }
    }

    /// Built-in table extended (and overridden) by a JSON items file.
    ///
    /// The file looks like `{"items": {"259": "Name"}, "prefixes": {"1": "Large"}}`.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ItemTable {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        let file: ItemFile =
            serde_json::from_str(&content).map_err(|e| ConfigError::ItemTable {
                path: path.display().to_string(),
                message: e.to_string(),
            })?;

        let mut table = Self::builtin();
        table.items.extend(file.items);
        table.prefixes.extend(file.prefixes);
        Ok(table)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }
}

impl ItemLookup for ItemTable {
    fn item_name(&self, id: u32) -> Option<&str> {
        self.items.get(&id).map(String::as_str)
    }

    fn prefix_name(&self, id: u32) -> Option<&str> {
        self.prefixes.get(&id).map(String::as_str)
    }
}
