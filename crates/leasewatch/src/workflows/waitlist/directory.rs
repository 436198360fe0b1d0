use std::collections::BTreeMap;

/// Static routing table from agent display names to leasing inboxes.
///
/// The fallback address is reserved for the manual single-unit alert path;
/// automatic sweeps only ever deliver to a named agent's own address.
#[derive(Debug, Clone)]
pub struct AgentDirectory {
    from_address: String,
    fallback_address: String,
    agents: BTreeMap<String, String>,
}

impl AgentDirectory {
    pub fn new(from_address: impl Into<String>, fallback_address: impl Into<String>) -> Self {
        Self {
            from_address: from_address.into(),
            fallback_address: fallback_address.into(),
            agents: BTreeMap::new(),
        }
    }

    pub fn with_agent(mut self, name: impl AsRef<str>, email: impl Into<String>) -> Self {
        self.agents
            .insert(name.as_ref().trim().to_lowercase(), email.into());
        self
    }

    pub fn from_pairs(
        from_address: impl Into<String>,
        fallback_address: impl Into<String>,
        pairs: impl IntoIterator<Item = (String, String)>,
    ) -> Self {
        pairs
            .into_iter()
            .fold(Self::new(from_address, fallback_address), |dir, (name, email)| {
                dir.with_agent(name, email)
            })
    }

    pub fn from_address(&self) -> &str {
        &self.from_address
    }

    pub fn fallback_address(&self) -> &str {
        &self.fallback_address
    }

    /// Case-insensitive lookup by agent display name.
    pub fn address_for(&self, agent: &str) -> Option<&str> {
        self.agents
            .get(&agent.trim().to_lowercase())
            .map(String::as_str)
    }

    /// Manual-path resolution: a missing or unknown agent routes to the
    /// shared leasing inbox.
    pub fn address_or_fallback(&self, agent: Option<&str>) -> &str {
        agent
            .and_then(|name| self.address_for(name))
            .unwrap_or(&self.fallback_address)
    }
}
