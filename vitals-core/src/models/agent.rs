use serde::{Deserialize, Serialize};
use url::Url;

/// A metrics agent known to the manager.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentDescriptor {
    pub id: i32,
    pub address: Url,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

fn default_enabled() -> bool {
    true
}

impl AgentDescriptor {
    pub fn new(id: i32, address: Url) -> Self {
        Self {
            id,
            address,
            enabled: true,
        }
    }

    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }
}
