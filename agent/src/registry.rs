use std::collections::HashMap;
use std::sync::Arc;

use crate::agent::Agent;

/// Id-keyed agent registry. Populated once at startup, read-only after.
#[derive(Default)]
pub struct AgentRegistry {
    agents: HashMap<String, Arc<dyn Agent>>,
}

impl AgentRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, id: impl Into<String>, agent: Arc<dyn Agent>) {
        self.agents.insert(id.into(), agent);
    }

    pub fn get(&self, id: &str) -> Option<Arc<dyn Agent>> {
        self.agents.get(id).cloned()
    }

    /// Registered ids, sorted for stable diagnostics output.
    pub fn ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.agents.keys().cloned().collect();
        ids.sort();
        ids
    }
}
