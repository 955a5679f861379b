//! Port registry: custody of publisher, subscriber and condition variable
//! objects created on behalf of client processes.

use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;

use dashmap::DashMap;
use tracing::debug;

use crate::process_management::PortId;
use crate::process_management::PortKind;
use crate::process_management::PortRegistry;

/// Record of one created resource.
#[derive(Debug, Clone)]
pub struct PortRecord {
    pub owner: String,
    pub kind: PortKind,
}

/// Concurrent port registry issuing opaque ids.
#[derive(Debug, Default)]
pub struct PortStore {
    ports: DashMap<u64, PortRecord>,
    next_id: AtomicU64,
}

impl PortStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.ports.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ports.is_empty()
    }

    pub fn get(&self, id: PortId) -> Option<PortRecord> {
        self.ports.get(&id.0).map(|entry| entry.clone())
    }

    /// Ids of every resource owned by `owner`.
    pub fn ports_of(&self, owner: &str) -> Vec<PortId> {
        self.ports
            .iter()
            .filter(|entry| entry.value().owner == owner)
            .map(|entry| PortId(*entry.key()))
            .collect()
    }
}

impl PortRegistry for PortStore {
    fn create(&self, owner: &str, kind: PortKind) -> PortId {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed) + 1;
        debug!(owner = %owner, id = id, kind = ?kind, "port created");
        self.ports.insert(
            id,
            PortRecord {
                owner: owner.to_string(),
                kind,
            },
        );
        PortId(id)
    }

    fn destroy(&self, id: PortId) {
        if let Some((_, record)) = self.ports.remove(&id.0) {
            debug!(owner = %record.owner, id = id.0, "port destroyed");
        }
    }
}
