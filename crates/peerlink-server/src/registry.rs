//! Client registry and pairing.
//!
//! An in-memory, insertion-ordered collection of registered clients.
//! There is no unregister operation; entries live as long as the
//! process. The registry is owned exclusively by the server's event
//! loop, so no synchronization is required.

/// A registered client's advertised address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Registration {
    /// Unique client identifier, the registry key.
    pub client_id: String,
    /// Advertised IP address.
    pub ip: String,
    /// Advertised TCP port.
    pub port: u16,
}

/// Insertion-ordered registry of clients.
#[derive(Debug, Default)]
pub struct Registry {
    entries: Vec<Registration>,
}

impl Registry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a registration, or overwrites an existing one for the
    /// same identifier. Last write wins; the entry keeps its original
    /// position so pairing order is unaffected by re-registration.
    pub fn register(&mut self, client_id: impl Into<String>, ip: impl Into<String>, port: u16) {
        let client_id = client_id.into();
        let ip = ip.into();
        if let Some(entry) = self.entries.iter_mut().find(|r| r.client_id == client_id) {
            entry.ip = ip;
            entry.port = port;
        } else {
            self.entries.push(Registration {
                client_id,
                ip,
                port,
            });
        }
    }

    /// Returns true if `client_id` is registered.
    pub fn contains(&self, client_id: &str) -> bool {
        self.entries.iter().any(|r| r.client_id == client_id)
    }

    /// Looks up a client's own registration.
    pub fn get(&self, client_id: &str) -> Option<&Registration> {
        self.entries.iter().find(|r| r.client_id == client_id)
    }

    /// Returns the first registered client other than `client_id`, in
    /// insertion order, or `None` if `client_id` itself is unregistered
    /// or no other client exists.
    ///
    /// First-available and non-reciprocal: the returned peer is not
    /// reserved or removed, so two requesters may be handed the same
    /// peer. Callers own the resulting direct-connection failure.
    pub fn find_peer(&self, client_id: &str) -> Option<&Registration> {
        if !self.contains(client_id) {
            return None;
        }
        self.entries.iter().find(|r| r.client_id != client_id)
    }

    /// Iterates registrations in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &Registration> {
        self.entries.iter()
    }

    /// Number of registered clients.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn register_then_lookup() {
        let mut registry = Registry::new();
        registry.register("alice", "127.0.0.1", 5001);
        assert!(registry.contains("alice"));
        assert_eq!(registry.get("alice").unwrap().port, 5001);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn reregister_keeps_one_entry_with_new_address() {
        let mut registry = Registry::new();
        registry.register("alice", "127.0.0.1", 5001);
        registry.register("bob", "127.0.0.1", 5002);
        registry.register("alice", "127.0.0.1", 6001);

        assert_eq!(registry.len(), 2);
        assert_eq!(registry.get("alice").unwrap().port, 6001);
        // Position retained: alice still pairs first for bob.
        assert_eq!(registry.find_peer("bob").unwrap().client_id, "alice");
    }

    #[test]
    fn find_peer_empty_registry() {
        let registry = Registry::new();
        assert!(registry.find_peer("alice").is_none());
    }

    #[test]
    fn find_peer_requires_caller_registered() {
        let mut registry = Registry::new();
        registry.register("bob", "127.0.0.1", 5002);
        assert!(registry.find_peer("alice").is_none());
    }

    #[test]
    fn find_peer_excludes_self() {
        let mut registry = Registry::new();
        registry.register("alice", "127.0.0.1", 5001);
        assert!(registry.find_peer("alice").is_none());
    }

    #[test]
    fn find_peer_first_in_insertion_order() {
        let mut registry = Registry::new();
        registry.register("alice", "127.0.0.1", 5001);
        registry.register("bob", "127.0.0.1", 5002);
        registry.register("carol", "127.0.0.1", 5003);

        assert_eq!(registry.find_peer("alice").unwrap().client_id, "bob");
        assert_eq!(registry.find_peer("bob").unwrap().client_id, "alice");
        assert_eq!(registry.find_peer("carol").unwrap().client_id, "alice");
    }

    #[test]
    fn find_peer_stable_across_calls() {
        let mut registry = Registry::new();
        registry.register("alice", "127.0.0.1", 5001);
        registry.register("bob", "127.0.0.1", 5002);

        let first = registry.find_peer("alice").cloned();
        let second = registry.find_peer("alice").cloned();
        assert_eq!(first, second);
    }
}
