// Wed Jan 15 2026 - Alex

use super::Instance;
use crate::memory::Address;
use crate::offsets::names;
use serde::Serialize;
use std::fmt;

const NAME_OFFSET: u64 = 0x8;
const FUNCTION_OFFSET: u64 = 0x70;
const SECURITY_OFFSET: u64 = 0x4C;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum DescriptorKind {
    Property,
    Event,
    BoundFunction,
}

impl DescriptorKind {
    pub(crate) fn offset_name(self) -> &'static str {
        match self {
            DescriptorKind::Property => names::CLASS_DESCRIPTOR_TO_PROPERTY_DESCRIPTOR,
            DescriptorKind::Event => names::CLASS_DESCRIPTOR_TO_EVENT_DESCRIPTOR,
            DescriptorKind::BoundFunction => names::CLASS_DESCRIPTOR_TO_BOUND_FUNCTION,
        }
    }
}

/// Member metadata hanging off a class descriptor.
#[derive(Clone)]
pub struct Descriptor {
    address: Address,
    kind: DescriptorKind,
    owner: Instance,
}

impl Descriptor {
    pub(crate) fn new(owner: Instance, address: Address, kind: DescriptorKind) -> Self {
        Self { address, kind, owner }
    }

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn kind(&self) -> DescriptorKind {
        self.kind
    }

    pub fn owner(&self) -> &Instance {
        &self.owner
    }

    pub fn name(&self) -> String {
        let memory = self.owner.memory();
        let ptr = memory.read_ptr(self.address + NAME_OFFSET);
        if ptr.is_null() {
            return String::new();
        }
        memory.read_small_string(ptr)
    }

    /// Native entry point; only bound functions carry one.
    pub fn function(&self) -> Address {
        if self.kind != DescriptorKind::BoundFunction {
            return Address::NULL;
        }
        self.owner.memory().read_ptr(self.address + FUNCTION_OFFSET)
    }

    pub fn security(&self) -> i32 {
        if self.kind != DescriptorKind::BoundFunction {
            return 0;
        }
        self.owner.memory().read_i32(self.address + SECURITY_OFFSET)
    }
}

impl fmt::Debug for Descriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Descriptor")
            .field("address", &self.address)
            .field("kind", &self.kind)
            .finish()
    }
}

impl fmt::Display for Descriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?} {} at {}", self.kind, self.name(), self.address)
    }
}
