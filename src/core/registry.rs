use std::collections::HashMap;

use tracing::{debug, info};

use crate::core::session::AvatarColor;
use crate::core::Vec3;

/// One remote session as reported by a position pull.
#[derive(Debug, Clone, PartialEq)]
pub struct RemoteState {
    pub position: Vec3,
    pub color: AvatarColor,
}

/// Everyone's last known position at poll time, keyed by user id. Entries are
/// unordered and positions may jump arbitrarily between snapshots.
pub type RemoteSnapshot = HashMap<String, RemoteState>;

/// What happens to a proxy whose id stops showing up in snapshots.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProxyExpiry {
    /// Keep it where it was last seen, forever.
    Never,
    /// Drop it once it has been missing from this many consecutive snapshots.
    AfterMisses(u32),
}

impl Default for ProxyExpiry {
    fn default() -> Self {
        ProxyExpiry::AfterMisses(5)
    }
}

/// Local stand-in for a remote user's avatar.
#[derive(Debug, Clone, PartialEq)]
pub struct RemotePlayerProxy {
    pub user_id: String,
    pub position: Vec3,
    /// Fixed at creation; later snapshots never recolor a proxy.
    pub color: AvatarColor,
    /// Sequence number of the last snapshot containing this id.
    pub last_seen: u64,
    /// Consecutive snapshots this id has been absent from.
    pub missed: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ApplyReport {
    pub created: Vec<String>,
    pub updated: usize,
    pub expired: Vec<String>,
}

/// Reconciles position snapshots into one proxy per remote user id.
#[derive(Debug, Clone, Default)]
pub struct RemotePlayerRegistry {
    proxies: HashMap<String, RemotePlayerProxy>,
    expiry: ProxyExpiry,
    sequence: u64,
}

impl RemotePlayerRegistry {
    pub fn new(expiry: ProxyExpiry) -> Self {
        Self {
            proxies: HashMap::new(),
            expiry,
            sequence: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.proxies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.proxies.is_empty()
    }

    pub fn get(&self, user_id: &str) -> Option<&RemotePlayerProxy> {
        self.proxies.get(user_id)
    }

    pub fn proxies(&self) -> impl Iterator<Item = &RemotePlayerProxy> {
        self.proxies.values()
    }

    /// Number of snapshots applied so far.
    pub fn snapshots_applied(&self) -> u64 {
        self.sequence
    }

    /// Fold one snapshot in. `self_id` is skipped when known.
    pub fn apply(&mut self, snapshot: &RemoteSnapshot, self_id: Option<&str>) -> ApplyReport {
        self.sequence += 1;
        let seq = self.sequence;
        let mut report = ApplyReport::default();

        for (user_id, remote) in snapshot {
            if Some(user_id.as_str()) == self_id {
                continue;
            }

            let proxy = self.proxies.entry(user_id.clone()).or_insert_with(|| {
                report.created.push(user_id.clone());
                RemotePlayerProxy {
                    user_id: user_id.clone(),
                    position: remote.position,
                    color: remote.color.clone(),
                    last_seen: seq,
                    missed: 0,
                }
            });
            proxy.position = remote.position;
            proxy.last_seen = seq;
            proxy.missed = 0;
            report.updated += 1;
        }

        for proxy in self.proxies.values_mut() {
            if proxy.last_seen != seq {
                proxy.missed += 1;
            }
        }

        if let ProxyExpiry::AfterMisses(limit) = self.expiry {
            self.proxies.retain(|user_id, proxy| {
                let keep = proxy.missed < limit;
                if !keep {
                    report.expired.push(user_id.clone());
                }
                keep
            });
        }

        for user_id in &report.created {
            info!(user_id = %user_id, "remote player appeared");
        }
        for user_id in &report.expired {
            info!(user_id = %user_id, "remote player expired");
        }
        debug!(seq, proxies = self.proxies.len(), "applied position snapshot");
        report
    }

    /// Drop the proxy for `user_id`, if any.
    pub fn forget(&mut self, user_id: &str) -> Option<RemotePlayerProxy> {
        self.proxies.remove(user_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state(x: f32, y: f32, z: f32, color: &str) -> RemoteState {
        RemoteState {
            position: Vec3::new(x, y, z),
            color: AvatarColor::parse(color),
        }
    }

    fn snapshot(entries: &[(&str, RemoteState)]) -> RemoteSnapshot {
        entries
            .iter()
            .map(|(id, s)| (id.to_string(), s.clone()))
            .collect()
    }

    #[test]
    fn second_snapshot_moves_a_and_creates_b() {
        let mut registry = RemotePlayerRegistry::new(ProxyExpiry::Never);

        registry.apply(&snapshot(&[("A", state(1.0, 0.0, 1.0, "red"))]), Some("me"));
        let report = registry.apply(
            &snapshot(&[
                ("A", state(2.0, 0.0, 2.0, "red")),
                ("B", state(0.0, 0.0, 0.0, "blue")),
            ]),
            Some("me"),
        );

        assert_eq!(registry.len(), 2);
        assert_eq!(report.created, vec!["B".to_string()]);
        assert_eq!(registry.get("A").unwrap().position, Vec3::new(2.0, 0.0, 2.0));
        let b = registry.get("B").unwrap();
        assert_eq!(b.position, Vec3::new(0.0, 0.0, 0.0));
        assert_eq!(b.color, AvatarColor::parse("blue"));
    }

    #[test]
    fn self_is_never_proxied() {
        let mut registry = RemotePlayerRegistry::default();
        registry.apply(
            &snapshot(&[("me", state(0.0, 0.0, 0.0, "#00ff00"))]),
            Some("me"),
        );
        assert!(registry.is_empty());
    }

    #[test]
    fn color_is_fixed_at_creation() {
        let mut registry = RemotePlayerRegistry::new(ProxyExpiry::Never);
        registry.apply(&snapshot(&[("A", state(0.0, 0.0, 0.0, "#ff0000"))]), None);
        registry.apply(&snapshot(&[("A", state(3.0, 0.0, 0.0, "#0000ff"))]), None);

        let a = registry.get("A").unwrap();
        assert_eq!(a.color, AvatarColor::parse("#ff0000"));
        assert_eq!(a.position.x, 3.0);
    }

    #[test]
    fn absent_ids_stay_when_expiry_is_off() {
        let mut registry = RemotePlayerRegistry::new(ProxyExpiry::Never);
        registry.apply(&snapshot(&[("A", state(1.0, 0.0, 1.0, "red"))]), None);
        for _ in 0..50 {
            registry.apply(&RemoteSnapshot::new(), None);
        }

        let a = registry.get("A").unwrap();
        assert_eq!(a.position, Vec3::new(1.0, 0.0, 1.0));
        assert_eq!(a.missed, 50);
        assert_eq!(a.last_seen, 1);
    }

    #[test]
    fn proxy_expires_after_consecutive_misses() {
        let mut registry = RemotePlayerRegistry::new(ProxyExpiry::AfterMisses(3));
        registry.apply(&snapshot(&[("A", state(1.0, 0.0, 1.0, "red"))]), None);

        registry.apply(&RemoteSnapshot::new(), None);
        registry.apply(&RemoteSnapshot::new(), None);
        assert!(registry.get("A").is_some());

        let report = registry.apply(&RemoteSnapshot::new(), None);
        assert_eq!(report.expired, vec!["A".to_string()]);
        assert!(registry.is_empty());
    }

    #[test]
    fn reappearing_resets_the_miss_count() {
        let mut registry = RemotePlayerRegistry::new(ProxyExpiry::AfterMisses(2));
        let seen = snapshot(&[("A", state(1.0, 0.0, 1.0, "red"))]);

        registry.apply(&seen, None);
        registry.apply(&RemoteSnapshot::new(), None);
        registry.apply(&seen, None);
        registry.apply(&RemoteSnapshot::new(), None);

        assert_eq!(registry.get("A").unwrap().missed, 1);
    }

    #[test]
    fn forget_drops_a_proxy() {
        let mut registry = RemotePlayerRegistry::new(ProxyExpiry::Never);
        registry.apply(&snapshot(&[("me", state(0.0, 0.0, 0.0, "red"))]), None);
        assert!(registry.forget("me").is_some());
        assert!(registry.is_empty());
    }
}
