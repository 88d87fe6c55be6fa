use std::collections::BTreeMap;
use tokio::sync::RwLock;
use tracing::info;

use crate::models::AgentDescriptor;

/// In-memory map of agent id to agent descriptor, held for the lifetime of
/// the manager. There is no removal and no health-based expiry.
#[derive(Debug, Default)]
pub struct AgentRegistry {
    agents: RwLock<BTreeMap<i32, AgentDescriptor>>,
}

impl AgentRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn with_agents(agents: impl IntoIterator<Item = AgentDescriptor>) -> Self {
        let registry = Self::new();
        for agent in agents {
            registry.register(agent).await;
        }
        registry
    }

    /// Inserts the descriptor, replacing any previous entry with the same id.
    pub async fn register(&self, descriptor: AgentDescriptor) {
        let mut agents = self.agents.write().await;
        let id = descriptor.id;
        let address = descriptor.address.to_string();
        let enabled = descriptor.enabled;

        match agents.insert(id, descriptor) {
            Some(_) => info!(agent_id = id, address = %address, enabled, "Agent updated"),
            None => info!(agent_id = id, address = %address, enabled, "Agent registered"),
        }
    }

    /// All agents, ordered by id.
    pub async fn list(&self) -> Vec<AgentDescriptor> {
        self.agents.read().await.values().cloned().collect()
    }

    pub async fn get(&self, id: i32) -> Option<AgentDescriptor> {
        self.agents.read().await.get(&id).cloned()
    }

    pub async fn len(&self) -> usize {
        self.agents.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.agents.read().await.is_empty()
    }
}
