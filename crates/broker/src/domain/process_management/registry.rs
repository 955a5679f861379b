//! Bounded registry of admitted processes.

use std::collections::HashMap;

use super::types::Process;
use super::types::ProcessManagementError;
use super::types::Result;

/// Bounded table of admitted processes, keyed by unique process name.
///
/// The process manager is the sole mutator; everyone else observes
/// snapshots taken under the manager's lock. Lookup is by exact name, the
/// pid plays no role in identity.
#[derive(Debug)]
pub struct ProcessRegistry {
    capacity: usize,
    entries: HashMap<String, Process>,
}

impl ProcessRegistry {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            entries: HashMap::with_capacity(capacity),
        }
    }

    /// Inserts the entry if its name is free and the table has room.
    /// Rejection leaves the registry untouched.
    pub fn insert(&mut self, process: Process) -> Result<()> {
        if self.entries.contains_key(&process.name) {
            return Err(ProcessManagementError::AlreadyRegistered {
                name: process.name.clone(),
            });
        }
        if self.entries.len() >= self.capacity {
            return Err(ProcessManagementError::RegistryFull {
                capacity: self.capacity,
            });
        }
        self.entries.insert(process.name.clone(), process);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&Process> {
        self.entries.get(name)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut Process> {
        self.entries.get_mut(name)
    }

    pub fn remove(&mut self, name: &str) -> Option<Process> {
        self.entries.remove(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Process> {
        self.entries.values()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Process> {
        self.entries.values_mut()
    }

    pub fn names(&self) -> Vec<String> {
        self.entries.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
