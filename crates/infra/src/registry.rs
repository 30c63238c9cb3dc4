//! Process-wide endpoint registry consulted on every request.

use std::sync::Arc;

use dashmap::DashMap;

use miniauth_auth::RoleEndpoint;

/// Concurrent `Id -> RoleEndpoint` map.
///
/// Entries are `Arc`s replaced wholesale: a reader holding an entry keeps a
/// consistent descriptor even while an admin update swaps in a new one.
/// Guards never outlive a method call, so nothing is held across an await.
#[derive(Debug, Default)]
pub struct EndpointRegistry {
    entries: DashMap<String, Arc<RoleEndpoint>>,
}

impl EndpointRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: &str) -> Option<Arc<RoleEndpoint>> {
        self.entries.get(id).map(|e| e.value().clone())
    }

    /// Snapshot of all entries, ordered by id descending.
    pub fn all(&self) -> Vec<Arc<RoleEndpoint>> {
        let mut all: Vec<Arc<RoleEndpoint>> =
            self.entries.iter().map(|e| e.value().clone()).collect();
        all.sort_by(|a, b| b.id.cmp(&a.id));
        all
    }

    /// Insert or replace by id (last writer wins).
    pub fn upsert(&self, entry: RoleEndpoint) -> Arc<RoleEndpoint> {
        let entry = Arc::new(entry);
        self.entries.insert(entry.id.clone(), entry.clone());
        entry
    }

    pub fn remove(&self, id: &str) -> Option<Arc<RoleEndpoint>> {
        self.entries.remove(id).map(|(_, v)| v)
    }

    /// Load a full set of entries (bootstrap). Existing ids are overwritten,
    /// ids absent from `entries` are dropped.
    pub fn replace_all<I>(&self, entries: I)
    where
        I: IntoIterator<Item = RoleEndpoint>,
    {
        let fresh: Vec<RoleEndpoint> = entries.into_iter().collect();
        let keep: std::collections::HashSet<&str> = fresh.iter().map(|e| e.id.as_str()).collect();
        self.entries.retain(|id, _| keep.contains(id.as_str()));
        for entry in fresh {
            self.upsert(entry);
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use miniauth_auth::EndpointUpdate;

    fn ep(id: &str) -> RoleEndpoint {
        RoleEndpoint::system(id, id, vec!["GET".to_string()], true)
    }

    #[test]
    fn upsert_is_idempotent_per_id() {
        let reg = EndpointRegistry::new();
        reg.upsert(ep("/a"));
        let before: Vec<RoleEndpoint> = reg.all().iter().map(|e| (**e).clone()).collect();

        reg.upsert(ep("/a"));
        let after: Vec<RoleEndpoint> = reg.all().iter().map(|e| (**e).clone()).collect();

        assert_eq!(before, after);
        assert_eq!(reg.len(), 1);
    }

    #[test]
    fn last_writer_wins() {
        let reg = EndpointRegistry::new();
        reg.upsert(ep("/a"));
        reg.upsert(ep("/a").with_enable(false));
        assert!(!reg.get("/a").unwrap().enable);
    }

    #[test]
    fn held_entry_is_not_mutated_by_replacement() {
        let reg = EndpointRegistry::new();
        reg.upsert(ep("/a"));
        let held = reg.get("/a").unwrap();

        let next = held.apply(&EndpointUpdate {
            enable: false,
            roles: Some(vec!["admin".to_string()]),
            redirect_to_login_page: true,
        });
        reg.upsert(next);

        assert!(held.enable);
        assert!(held.roles.is_none());
        assert!(!reg.get("/a").unwrap().enable);
    }

    #[test]
    fn all_is_sorted_descending() {
        let reg = EndpointRegistry::new();
        for id in ["/b", "/c", "/a"] {
            reg.upsert(ep(id));
        }
        let ids: Vec<String> = reg.all().iter().map(|e| e.id.clone()).collect();
        assert_eq!(ids, vec!["/c", "/b", "/a"]);
    }

    #[test]
    fn replace_all_drops_stale_entries() {
        let reg = EndpointRegistry::new();
        reg.upsert(ep("/old"));
        reg.replace_all(vec![ep("/new")]);
        assert!(reg.get("/old").is_none());
        assert!(reg.get("/new").is_some());
        assert!(reg.remove("/new").is_some());
        assert!(reg.is_empty());
    }

    #[test]
    fn concurrent_readers_see_whole_descriptors() {
        let reg = Arc::new(EndpointRegistry::new());
        reg.upsert(ep("/a").with_roles(["r0"]));

        let writer = {
            let reg = reg.clone();
            std::thread::spawn(move || {
                for i in 0..500 {
                    let role = format!("r{i}");
                    // enable flips with the role index so readers can check consistency
                    reg.upsert(ep("/a").with_roles([role]).with_enable(i % 2 == 0));
                }
            })
        };

        let readers: Vec<_> = (0..4)
            .map(|_| {
                let reg = reg.clone();
                std::thread::spawn(move || {
                    for _ in 0..500 {
                        let e = reg.get("/a").unwrap();
                        let idx: usize = e.required_roles()[0][1..].parse().unwrap();
                        assert_eq!(e.enable, idx % 2 == 0);
                    }
                })
            })
            .collect();

        writer.join().unwrap();
        for r in readers {
            r.join().unwrap();
        }
    }
}
