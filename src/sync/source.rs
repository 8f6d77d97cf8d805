// Thu Jan 16 2026 - Alex

use crate::instance::Instance;
use crate::memory::Address;

/// One node as seen during a walk of the remote tree.
#[derive(Debug, Clone, PartialEq)]
pub struct Observation {
    pub address: Address,
    /// The node the walk found this one under.
    pub parent: Address,
    pub name: String,
    pub class_name: String,
}

impl Observation {
    pub fn new(address: Address, parent: Address, name: impl Into<String>, class_name: impl Into<String>) -> Self {
        Self {
            address,
            parent,
            name: name.into(),
            class_name: class_name.into(),
        }
    }
}

/// Something that can be walked once per tick.
pub trait TreeSource {
    fn root(&self) -> Address;

    /// Descendants of the root in pre-order, siblings in remote array order.
    fn observe(&self) -> Vec<Observation>;
}

/// Walks a live instance subtree.
pub struct InstanceSource {
    root: Instance,
}

impl InstanceSource {
    pub fn new(root: Instance) -> Self {
        Self { root }
    }

    pub fn instance(&self) -> &Instance {
        &self.root
    }
}

impl TreeSource for InstanceSource {
    fn root(&self) -> Address {
        self.root.address()
    }

    fn observe(&self) -> Vec<Observation> {
        self.root
            .walk()
            .into_iter()
            .map(|(node, parent)| Observation {
                address: node.address(),
                parent,
                name: node.name(),
                class_name: node.class_name(),
            })
            .collect()
    }
}
