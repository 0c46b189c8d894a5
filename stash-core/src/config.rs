//! Store configuration.

use serde::{Deserialize, Serialize};

fn default_call_immediately() -> bool {
    true
}

/// Options applied when a store is created with
/// [`create_store_with`](crate::create_store_with).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Label attached to log events emitted by the store.
    pub name: Option<String>,

    /// Whether [`StoreHandle::subscribe_default`](crate::store::StoreHandle::subscribe_default)
    /// invokes the callback once at registration.
    #[serde(default = "default_call_immediately")]
    pub accessor_call_immediately: bool,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            name: None,
            accessor_call_immediately: default_call_immediately(),
        }
    }
}

impl StoreConfig {
    /// Create a configuration with the given store name.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Self::default()
        }
    }

    /// Override the accessor subscription default.
    pub fn with_accessor_call_immediately(mut self, call_immediately: bool) -> Self {
        self.accessor_call_immediately = call_immediately;
        self
    }

    /// Parse a configuration from JSON. Missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Name used in logs and errors.
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or("anonymous")
    }
}
