//! Static per-user shared memory segment bookkeeping.
//!
//! The provider owns the segments; processes only ever hold
//! [`ChunkPoolHandle`]s. Lease counts are tracked so teardown bugs surface
//! as count mismatches instead of silent leaks.

use std::collections::HashMap;
use std::sync::Mutex;

use tracing::debug;
use tracing::info;
use tracing::warn;

use crate::process_management::ChunkPoolHandle;
use crate::process_management::SegmentProvider;

/// Description of one user's segment.
#[derive(Debug, Clone)]
pub struct SegmentConfig {
    pub user: String,
    pub chunk_count: u32,
    pub chunk_size: u32,
}

#[derive(Debug)]
struct Segment {
    id: u64,
    config: SegmentConfig,
}

#[derive(Debug)]
struct ProviderState {
    /// Segments keyed by owning user
    segments: HashMap<String, Segment>,
    /// Outstanding leases, pool id to owning user
    leases: HashMap<u64, String>,
    next_pool_id: u64,
}

/// Issues chunk pool leases from a fixed set of per-user segments created
/// at startup.
#[derive(Debug)]
pub struct StaticSegmentProvider {
    state: Mutex<ProviderState>,
}

impl StaticSegmentProvider {
    pub fn new(configs: Vec<SegmentConfig>) -> Self {
        let mut segments = HashMap::with_capacity(configs.len());
        for (index, config) in configs.into_iter().enumerate() {
            let id = index as u64 + 1;
            info!(
                user = %config.user,
                segment_id = id,
                chunk_count = config.chunk_count,
                chunk_size = config.chunk_size,
                "shared memory segment configured"
            );
            segments.insert(config.user.clone(), Segment { id, config });
        }
        Self {
            state: Mutex::new(ProviderState {
                segments,
                leases: HashMap::new(),
                next_pool_id: 0,
            }),
        }
    }

    /// Number of currently leased chunk pools across all segments.
    pub fn live_leases(&self) -> usize {
        self.state.lock().expect("poisoned").leases.len()
    }

    pub fn segment_id_for_user(&self, user: &str) -> Option<u64> {
        self.state
            .lock()
            .expect("poisoned")
            .segments
            .get(user)
            .map(|segment| segment.id)
    }

    pub fn chunk_size_for_user(&self, user: &str) -> Option<u32> {
        self.state
            .lock()
            .expect("poisoned")
            .segments
            .get(user)
            .map(|segment| segment.config.chunk_size)
    }
}

impl SegmentProvider for StaticSegmentProvider {
    fn chunk_pool_for_user(&self, user: &str) -> Option<ChunkPoolHandle> {
        let mut state = self.state.lock().expect("poisoned");
        let segment_id = state.segments.get(user)?.id;
        state.next_pool_id += 1;
        let pool_id = state.next_pool_id;
        state.leases.insert(pool_id, user.to_string());
        debug!(user = %user, segment_id = segment_id, pool_id = pool_id, "chunk pool leased");
        Some(ChunkPoolHandle {
            segment_id,
            pool_id,
        })
    }

    fn release(&self, handle: ChunkPoolHandle) {
        let mut state = self.state.lock().expect("poisoned");
        match state.leases.remove(&handle.pool_id) {
            Some(user) => {
                debug!(user = %user, pool_id = handle.pool_id, "chunk pool released");
            }
            None => {
                warn!(pool_id = handle.pool_id, "release of unknown chunk pool ignored");
            }
        }
    }
}
