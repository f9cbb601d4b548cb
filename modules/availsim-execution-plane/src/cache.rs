//! The Discovery Cache (C12): bastion address plus per-node public address,
//! refreshed on a TTL rather than looked up per fault.

use arc_swap::ArcSwapOption;
use dashmap::DashMap;
use std::time::{Duration, Instant};

struct CachedAddress {
    address: String,
    cached_at: Instant,
}

/// Caches the bastion's address (a single swappable value) and each worker
/// node's public address (a map, since membership changes independently of
/// the bastion), each entry expiring after `ttl`.
pub struct DiscoveryCache {
    bastion: ArcSwapOption<CachedAddress>,
    nodes: DashMap<String, CachedAddress>,
    ttl: Duration,
}

impl DiscoveryCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            bastion: ArcSwapOption::from(None),
            nodes: DashMap::new(),
            ttl,
        }
    }

    pub fn set_bastion(&self, address: impl Into<String>) {
        self.bastion.store(Some(std::sync::Arc::new(CachedAddress {
            address: address.into(),
            cached_at: Instant::now(),
        })));
    }

    /// Returns the cached bastion address if present and not yet expired.
    pub fn bastion(&self) -> Option<String> {
        let guard = self.bastion.load();
        guard.as_deref().and_then(|entry| {
            if entry.cached_at.elapsed() < self.ttl {
                Some(entry.address.clone())
            } else {
                None
            }
        })
    }

    pub fn set_node_address(&self, node_id: impl Into<String>, address: impl Into<String>) {
        self.nodes.insert(
            node_id.into(),
            CachedAddress {
                address: address.into(),
                cached_at: Instant::now(),
            },
        );
    }

    /// Returns the cached public address for `node_id` if present and not
    /// yet expired (an expired entry is treated as a cache miss, forcing
    /// the caller to re-discover rather than silently evicting here).
    pub fn node_address(&self, node_id: &str) -> Option<String> {
        self.nodes.get(node_id).and_then(|entry| {
            if entry.cached_at.elapsed() < self.ttl {
                Some(entry.address.clone())
            } else {
                None
            }
        })
    }

    pub fn is_stale(&self, node_id: &str) -> bool {
        self.node_address(node_id).is_none()
    }

    /// Drops a node's cached address, forcing the next lookup to
    /// rediscover it (used after a restart, since the node may come back
    /// with a different public address).
    pub fn invalidate_node(&self, node_id: &str) {
        self.nodes.remove(node_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn caches_and_returns_bastion_address() {
        let cache = DiscoveryCache::new(Duration::from_secs(60));
        assert!(cache.bastion().is_none());
        cache.set_bastion("10.0.0.1");
        assert_eq!(cache.bastion().as_deref(), Some("10.0.0.1"));
    }

    #[test]
    fn caches_and_returns_node_address() {
        let cache = DiscoveryCache::new(Duration::from_secs(60));
        cache.set_node_address("node-a", "203.0.113.5");
        assert_eq!(cache.node_address("node-a").as_deref(), Some("203.0.113.5"));
        assert!(cache.node_address("node-b").is_none());
    }

    #[test]
    fn invalidate_forces_rediscovery() {
        let cache = DiscoveryCache::new(Duration::from_secs(60));
        cache.set_node_address("node-a", "203.0.113.5");
        cache.invalidate_node("node-a");
        assert!(cache.node_address("node-a").is_none());
    }

    #[test]
    fn entries_expire_after_ttl() {
        let cache = DiscoveryCache::new(Duration::from_millis(10));
        cache.set_node_address("node-a", "203.0.113.5");
        std::thread::sleep(Duration::from_millis(30));
        assert!(cache.node_address("node-a").is_none());
        assert!(cache.is_stale("node-a"));
    }
}
