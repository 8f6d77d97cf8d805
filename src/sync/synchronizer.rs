// Thu Jan 16 2026 - Alex

use super::source::{Observation, TreeSource};
use crate::memory::Address;
use ahash::AHashSet;
use indexmap::IndexMap;
use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "lowercase")]
pub enum SyncEvent {
    Added { address: Address, parent: Address },
    Updated { address: Address },
    Removed { address: Address },
}

impl SyncEvent {
    pub fn address(&self) -> Address {
        match self {
            SyncEvent::Added { address, .. } | SyncEvent::Updated { address } | SyncEvent::Removed { address } => {
                *address
            }
        }
    }
}

impl fmt::Display for SyncEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SyncEvent::Added { address, parent } => write!(f, "+ {} under {}", address, parent),
            SyncEvent::Updated { address } => write!(f, "~ {}", address),
            SyncEvent::Removed { address } => write!(f, "- {}", address),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncStats {
    pub added: usize,
    pub updated: usize,
    pub removed: usize,
}

impl SyncStats {
    pub fn from_events(events: &[SyncEvent]) -> Self {
        let mut stats = Self::default();
        for event in events {
            match event {
                SyncEvent::Added { .. } => stats.added += 1,
                SyncEvent::Updated { .. } => stats.updated += 1,
                SyncEvent::Removed { .. } => stats.removed += 1,
            }
        }
        stats
    }

    pub fn has_structural_changes(&self) -> bool {
        self.added > 0 || self.removed > 0
    }
}

/// Local wrapper state for one realized node.
#[derive(Debug, Clone, PartialEq)]
pub struct NodeRecord {
    pub address: Address,
    pub parent: Address,
    pub name: String,
    pub class_name: String,
    /// Realized children in remote array order.
    pub children: Vec<Address>,
    /// View state owned by the consumer, kept across ticks.
    pub expanded: bool,
}

impl NodeRecord {
    fn new(obs: &Observation) -> Self {
        Self {
            address: obs.address,
            parent: obs.parent,
            name: obs.name.clone(),
            class_name: obs.class_name.clone(),
            children: Vec::new(),
            expanded: false,
        }
    }

    fn root(address: Address) -> Self {
        Self {
            address,
            parent: Address::NULL,
            name: String::new(),
            class_name: String::new(),
            children: Vec::new(),
            expanded: true,
        }
    }
}

/// Keeps a realized copy of a remote subtree in step with the remote tree,
/// one walk per tick. Records of nodes that survive a tick are updated in
/// place, so any view state attached to them persists.
#[derive(Debug, Default)]
pub struct TreeSynchronizer {
    root: Address,
    records: IndexMap<Address, NodeRecord>,
    previous: Vec<Address>,
}

impl TreeSynchronizer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn root(&self) -> Address {
        self.root
    }

    pub fn record(&self, address: Address) -> Option<&NodeRecord> {
        self.records.get(&address)
    }

    /// Realized descendants as of the last tick, in walk order.
    pub fn previous(&self) -> &[Address] {
        &self.previous
    }

    pub fn len(&self) -> usize {
        self.previous.len()
    }

    pub fn is_empty(&self) -> bool {
        self.previous.is_empty()
    }

    pub fn set_expanded(&mut self, address: Address, expanded: bool) -> bool {
        match self.records.get_mut(&address) {
            Some(record) => {
                record.expanded = expanded;
                true
            }
            None => false,
        }
    }

    /// Drops every record and starts over from `root`.
    pub fn reset(&mut self, root: Address) -> Vec<SyncEvent> {
        let events = self
            .previous
            .drain(..)
            .map(|address| SyncEvent::Removed { address })
            .collect();
        self.records.clear();
        self.root = root;
        if !root.is_null() {
            self.records.insert(root, NodeRecord::root(root));
        }
        events
    }

    /// Reconciles the realized tree with one fresh walk of `source`.
    pub fn tick(&mut self, source: &dyn TreeSource) -> Vec<SyncEvent> {
        let mut events = Vec::new();
        let root = source.root();
        if root != self.root {
            log::debug!("sync root moved from {} to {}", self.root, root);
            events.extend(self.reset(root));
        }
        if root.is_null() {
            return events;
        }

        let current = source.observe();
        let current_set: AHashSet<Address> = current.iter().map(|obs| obs.address).collect();

        // Adds and updates first, in walk order so parents are realized before children
        for obs in &current {
            if obs.address == root {
                continue;
            }
            let parent_realized = self.records.contains_key(&obs.parent);
            if let Some(record) = self.records.get_mut(&obs.address) {
                record.name.clone_from(&obs.name);
                record.class_name.clone_from(&obs.class_name);
                if parent_realized {
                    record.parent = obs.parent;
                }
                events.push(SyncEvent::Updated { address: obs.address });
                continue;
            }
            if parent_realized {
                self.records.insert(obs.address, NodeRecord::new(obs));
                events.push(SyncEvent::Added { address: obs.address, parent: obs.parent });
            } else {
                log::trace!("{} seen under unrealized {}", obs.address, obs.parent);
            }
        }

        // Then removes of everything the walk no longer reached
        let stale: Vec<Address> = self
            .records
            .keys()
            .filter(|address| **address != root && !current_set.contains(*address))
            .copied()
            .collect();
        for address in stale {
            self.records.shift_remove(&address);
            events.push(SyncEvent::Removed { address });
        }

        // And records left without a parent record
        loop {
            let orphans: Vec<Address> = self
                .records
                .values()
                .filter(|r| r.address != root && !self.records.contains_key(&r.parent))
                .map(|r| r.address)
                .collect();
            if orphans.is_empty() {
                break;
            }
            for address in orphans {
                self.records.shift_remove(&address);
                events.push(SyncEvent::Removed { address });
            }
        }

        self.relink(&current);
        log::debug!("sync tick over {}: {:?}", root, SyncStats::from_events(&events));
        events
    }

    // Child lists follow the walk, which follows the remote arrays.
    fn relink(&mut self, current: &[Observation]) {
        for record in self.records.values_mut() {
            record.children.clear();
        }
        self.previous.clear();
        for obs in current {
            let Some(parent) = self.records.get(&obs.address).map(|r| r.parent) else {
                continue;
            };
            if obs.address == self.root {
                continue;
            }
            if let Some(record) = self.records.get_mut(&parent) {
                record.children.push(obs.address);
            }
            self.previous.push(obs.address);
        }
    }

    /// Realized nodes in tree order with their depth below the root.
    pub fn flatten(&self) -> Vec<(usize, &NodeRecord)> {
        let mut out = Vec::with_capacity(self.records.len());
        let Some(root) = self.records.get(&self.root) else {
            return out;
        };
        let mut stack: Vec<(usize, Address)> = root.children.iter().rev().map(|a| (0, *a)).collect();
        while let Some((depth, address)) = stack.pop() {
            let Some(record) = self.records.get(&address) else {
                continue;
            };
            out.push((depth, record));
            stack.extend(record.children.iter().rev().map(|a| (depth + 1, *a)));
        }
        out
    }
}
