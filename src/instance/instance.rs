// Wed Jan 15 2026 - Alex

use super::{ClassKind, Descriptor, DescriptorKind, ModelError, Session};
use crate::memory::accessor::{POINTER_STRIDE, RECORD_STRIDE};
use crate::memory::{Accessor, Address};
use crate::offsets::names;
use ahash::AHashSet;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

/// Depth at which traversals stop descending; far beyond any real tree.
pub const MAX_DEPTH: usize = 1024;
pub const UNKNOWN_CLASS: &str = "unknown";

/// Handle to one remote instance. Identity is the address: handles for the
/// same address compare and hash equal. Every read re-derives its value from
/// remote memory, and a null handle answers every accessor with its default.
#[derive(Clone)]
pub struct Instance {
    address: Address,
    kind: ClassKind,
    session: Arc<Session>,
}

impl Instance {
    pub(crate) fn from_parts(session: Arc<Session>, address: Address, kind: ClassKind) -> Self {
        Self { address, kind, session }
    }

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn kind(&self) -> ClassKind {
        self.kind
    }

    pub fn session(&self) -> &Arc<Session> {
        &self.session
    }

    pub(crate) fn memory(&self) -> &Accessor {
        self.session.memory()
    }

    pub fn is_null(&self) -> bool {
        self.address.is_null()
    }

    pub fn non_null(self) -> Option<Instance> {
        if self.is_null() {
            None
        } else {
            Some(self)
        }
    }

    /// Address of a named field of this instance.
    pub(crate) fn field(&self, name: &str) -> Result<Address, ModelError> {
        if self.is_null() {
            return Err(ModelError::NullInstance);
        }
        Ok(self.address + self.session.offset(name)?)
    }

    /// Follows the pointer stored in a named field; null is a broken chain.
    pub(crate) fn pointer_field(&self, name: &str) -> Result<Address, ModelError> {
        let ptr = self.memory().try_read_ptr(self.field(name)?)?;
        ptr.non_null().ok_or_else(|| ModelError::BrokenChain(name.to_string()))
    }

    pub(crate) fn write_field<F>(&self, name: &str, write: F) -> bool
    where
        F: FnOnce(&Accessor, Address) -> bool,
    {
        match self.field(name) {
            Ok(addr) => write(self.memory(), addr),
            Err(e) => {
                log::trace!("write of {} on {} skipped: {}", name, self.address, e);
                false
            }
        }
    }

    pub(crate) fn instance_field(&self, name: &str) -> Instance {
        match self.pointer_field(name) {
            Ok(addr) => self.session.instance(addr),
            Err(_) => self.session.null_instance(),
        }
    }

    pub fn try_class_descriptor(&self) -> Result<Address, ModelError> {
        self.pointer_field(names::CLASS_DESCRIPTOR)
    }

    pub fn class_descriptor(&self) -> Address {
        self.try_class_descriptor().unwrap_or_default()
    }

    pub fn try_class_name(&self) -> Result<String, ModelError> {
        let desc = self.try_class_descriptor()?;
        let slot = desc + self.session.offset(names::CLASS_DESCRIPTOR_TO_CLASS_NAME)?;
        let ptr = self.memory().try_read_ptr(slot)?;
        if ptr.is_null() {
            return Err(ModelError::BrokenChain(names::CLASS_DESCRIPTOR_TO_CLASS_NAME.to_string()));
        }
        Ok(self.memory().try_read_small_string(ptr)?)
    }

    pub fn class_name(&self) -> String {
        self.try_class_name().unwrap_or_else(|_| UNKNOWN_CLASS.to_string())
    }

    pub fn try_name(&self) -> Result<String, ModelError> {
        let ptr = self.pointer_field(names::NAME)?;
        Ok(self.memory().try_read_small_string(ptr)?)
    }

    pub fn name(&self) -> String {
        self.try_name().unwrap_or_default()
    }

    pub fn set_name(&self, value: &str) -> bool {
        match self.pointer_field(names::NAME) {
            Ok(ptr) => self.memory().write_small_string(ptr, value),
            Err(_) => false,
        }
    }

    pub fn parent(&self) -> Instance {
        self.instance_field(names::PARENT)
    }

    pub fn set_parent(&self, parent: &Instance) -> bool {
        self.write_field(names::PARENT, |mem, addr| mem.write_ptr(addr, parent.address))
    }

    /// Children in remote array order; null slots are skipped.
    pub fn try_children(&self) -> Result<Vec<Instance>, ModelError> {
        let list = self.pointer_field(names::CHILDREN)?;
        let end_offset = self.session.offset(names::CHILDREN_END)?;
        let start = self.memory().try_read_ptr(list)?;
        let end = self.memory().try_read_ptr(list + end_offset)?;
        Ok(self
            .memory()
            .read_pointer_array(start, end, RECORD_STRIDE, |addr| self.session.instance(addr)))
    }

    pub fn children(&self) -> Vec<Instance> {
        self.try_children().unwrap_or_default()
    }

    /// Depth-first pre-order walk of the subtree, recomputed on every call.
    /// A node reachable twice (a torn or cyclic observation) is visited once.
    pub fn descendants(&self) -> Vec<Instance> {
        self.walk().into_iter().map(|(node, _)| node).collect()
    }

    /// Pre-order walk that also reports the node each child was found under.
    pub fn walk(&self) -> Vec<(Instance, Address)> {
        let mut out = Vec::new();
        let mut seen = AHashSet::new();
        seen.insert(self.address);

        let mut stack = vec![(self.address, self.children().into_iter())];
        while let Some((parent, siblings)) = stack.last_mut() {
            let parent = *parent;
            let Some(child) = siblings.next() else {
                stack.pop();
                continue;
            };
            if !seen.insert(child.address) {
                continue;
            }
            if stack.len() < MAX_DEPTH {
                stack.push((child.address, child.children().into_iter()));
            }
            out.push((child, parent));
        }
        out
    }

    /// Dot-joined names from the root down to this instance.
    pub fn full_name(&self) -> String {
        let mut parts = vec![self.name()];
        let mut seen = AHashSet::new();
        seen.insert(self.address);

        let mut current = self.parent();
        while !current.is_null() && parts.len() < MAX_DEPTH && seen.insert(current.address) {
            parts.push(current.name());
            current = current.parent();
        }
        parts.reverse();
        parts.join(".")
    }

    fn search(&self, recursive: bool) -> Vec<Instance> {
        if recursive {
            self.descendants()
        } else {
            self.children()
        }
    }

    /// First child (or descendant) named exactly `name`; null if none.
    pub fn find_first_child(&self, name: &str, recursive: bool) -> Instance {
        self.search(recursive)
            .into_iter()
            .find(|child| child.name() == name)
            .unwrap_or_else(|| self.session.null_instance())
    }

    pub fn find_first_child_of_class(&self, class_name: &str, recursive: bool) -> Instance {
        self.search(recursive)
            .into_iter()
            .find(|child| child.class_name() == class_name)
            .unwrap_or_else(|| self.session.null_instance())
    }

    /// Follows a dot-separated path of child names.
    pub fn find_path(&self, path: &str) -> Instance {
        path.split('.')
            .filter(|segment| !segment.is_empty())
            .fold(self.clone(), |current, segment| {
                if current.is_null() {
                    current
                } else {
                    current.find_first_child(segment, false)
                }
            })
    }

    pub fn descriptors(&self, kind: DescriptorKind) -> Vec<Descriptor> {
        let Ok(desc) = self.try_class_descriptor() else {
            return Vec::new();
        };
        let Ok(offset) = self.session.offset(kind.offset_name()) else {
            return Vec::new();
        };
        self.memory()
            .read_list(desc + offset, POINTER_STRIDE, |addr| Descriptor::new(self.clone(), addr, kind))
    }

    pub fn descriptor(&self, kind: DescriptorKind, name: &str) -> Option<Descriptor> {
        self.descriptors(kind).into_iter().find(|d| d.name() == name)
    }

    pub fn property_descriptors(&self) -> Vec<Descriptor> {
        self.descriptors(DescriptorKind::Property)
    }

    pub fn event_descriptors(&self) -> Vec<Descriptor> {
        self.descriptors(DescriptorKind::Event)
    }

    pub fn bound_functions(&self) -> Vec<Descriptor> {
        self.descriptors(DescriptorKind::BoundFunction)
    }
}

impl PartialEq for Instance {
    fn eq(&self, other: &Self) -> bool {
        self.address == other.address
    }
}

impl Eq for Instance {}

impl Hash for Instance {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.address.hash(state);
    }
}

impl fmt::Debug for Instance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Instance")
            .field("address", &self.address)
            .field("kind", &self.kind)
            .finish()
    }
}

impl fmt::Display for Instance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({} object at {})", self.name(), self.class_name(), self.address)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instance::fixture::TreeBuilder;

    fn sample() -> (TreeBuilder, Address, Vec<Address>) {
        let mut tree = TreeBuilder::new();
        let game = tree.root("DataModel", "Game");
        let workspace = tree.node("Workspace", "Workspace", game);
        let a = tree.node("Model", "A", workspace);
        let a1 = tree.node("Part", "A1", a);
        let a2 = tree.node("Part", "A2", a);
        let b = tree.node("Folder", "B", workspace);
        let b1 = tree.node("Sound", "B1", b);
        (tree, workspace, vec![a, a1, a2, b, b1])
    }

    #[test]
    fn test_name_and_class() {
        let (tree, workspace, nodes) = sample();
        let session = tree.session();
        let ws = session.instance(workspace);
        assert_eq!(ws.name(), "Workspace");
        assert_eq!(ws.class_name(), "Workspace");
        assert_eq!(ws.kind(), ClassKind::Workspace);
        assert_eq!(session.instance(nodes[3]).kind(), ClassKind::Generic);
        assert_eq!(session.instance(nodes[3]).class_name(), "Folder");
        assert_eq!(ws.to_string(), format!("Workspace (Workspace object at {})", workspace));
    }

    #[test]
    fn test_children_in_array_order_skipping_null() {
        let mut tree = TreeBuilder::new();
        let root = tree.root("Folder", "Root");
        let mut expected = Vec::new();
        for i in 0..5 {
            expected.push(tree.node("Part", &format!("P{}", i), root));
            if i == 2 {
                tree.push_null_child(root);
            }
        }
        let session = tree.session();
        let children: Vec<Address> = session.instance(root).children().iter().map(|c| c.address()).collect();
        assert_eq!(children, expected);
    }

    #[test]
    fn test_descendants_preorder() {
        let (tree, workspace, nodes) = sample();
        let session = tree.session();
        let order: Vec<Address> = session.instance(workspace).descendants().iter().map(|d| d.address()).collect();
        assert_eq!(order, nodes);
    }

    #[test]
    fn test_descendants_survive_cycles() {
        let (mut tree, workspace, nodes) = sample();
        // B1 claims the workspace as a child
        tree.attach(workspace, nodes[4]);
        let session = tree.session();
        assert_eq!(session.instance(workspace).descendants().len(), nodes.len());
    }

    #[test]
    fn test_deep_chain() {
        let mut tree = TreeBuilder::new();
        let root = tree.root("Folder", "Root");
        let mut parent = root;
        for i in 0..300 {
            parent = tree.node("Folder", &format!("L{}", i), parent);
        }
        let session = tree.session();
        assert_eq!(session.instance(root).descendants().len(), 300);
        assert!(session.instance(parent).full_name().starts_with("Root.L0.L1."));
    }

    #[test]
    fn test_find_first_child() {
        let (tree, workspace, nodes) = sample();
        let session = tree.session();
        let ws = session.instance(workspace);
        assert!(ws.find_first_child("A1", false).is_null());
        assert_eq!(ws.find_first_child("A1", true).address(), nodes[1]);
        assert_eq!(ws.find_first_child_of_class("Sound", true).address(), nodes[4]);
        assert!(ws.find_first_child_of_class("Humanoid", true).is_null());
        assert_eq!(ws.find_path("A.A2").address(), nodes[2]);
        assert!(ws.find_path("A.Missing.A2").is_null());
        assert_eq!(session.instance(nodes[2]).full_name(), "Game.Workspace.A.A2");
        assert_eq!(session.instance(nodes[2]).parent().address(), nodes[0]);
    }

    #[test]
    fn test_null_instance_defaults() {
        let session = TreeBuilder::new().session();
        let null = session.null_instance();
        assert_eq!(null.name(), "");
        assert_eq!(null.class_name(), UNKNOWN_CLASS);
        assert!(null.parent().is_null());
        assert!(null.children().is_empty());
        assert!(null.descendants().is_empty());
        assert!(null.find_first_child("x", true).is_null());
        assert!(!null.set_name("x"));
        assert!(!null.set_parent(&null));
        assert!(matches!(null.try_name(), Err(ModelError::NullInstance)));
    }

    #[test]
    fn test_broken_chain_defaults() {
        let mut tree = TreeBuilder::new();
        let root = tree.root("Folder", "Root");
        let node = tree.node("Part", "Orphan", root);
        tree.poke_u64(node + tree.offset("ClassDescriptor"), 0);
        tree.poke_u64(node + tree.offset("Name"), 0xdead_0000);
        tree.poke_u64(node + tree.offset("Children"), 0);
        let session = tree.session();
        let inst = session.instance(node);
        assert_eq!(inst.kind(), ClassKind::Generic);
        assert_eq!(inst.class_name(), UNKNOWN_CLASS);
        assert_eq!(inst.name(), "");
        assert!(inst.children().is_empty());
        assert!(matches!(inst.try_children(), Err(ModelError::BrokenChain(_))));
        assert!(session.cache().get(node).is_none());
    }

    #[test]
    fn test_missing_offsets_default() {
        let (mut tree, workspace, _) = sample();
        *tree.offsets_mut() = crate::offsets::OffsetTable::new();
        let session = tree.session();
        let ws = session.instance(workspace);
        assert_eq!(ws.name(), "");
        assert!(ws.children().is_empty());
        assert!(matches!(ws.try_name(), Err(ModelError::Unsupported(_))));
    }

    #[test]
    fn test_rename_and_reparent() {
        let (tree, workspace, nodes) = sample();
        let session = tree.session();
        let part = session.instance(nodes[1]);
        assert!(part.set_name("A Renamed Part With A Long Name"));
        assert_eq!(part.name(), "A Renamed Part With A Long Name");
        assert!(part.set_parent(&session.instance(workspace)));
        assert_eq!(part.parent().address(), workspace);
    }
}
