// Tue Jan 13 2026 - Alex

use serde::{Serialize, Serializer};
use std::fmt;
use std::ops::{Add, Sub};

/// A location in the target's address space. Zero is the null sentinel and is
/// never dereferenced.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Address {
    value: u64,
}

impl Address {
    pub const NULL: Address = Address { value: 0 };

    pub const fn new(value: u64) -> Self {
        Self { value }
    }

    pub const fn null() -> Self {
        Self::NULL
    }

    pub const fn as_u64(&self) -> u64 {
        self.value
    }

    pub const fn is_null(&self) -> bool {
        self.value == 0
    }

    pub fn non_null(self) -> Option<Self> {
        if self.is_null() {
            None
        } else {
            Some(self)
        }
    }

    pub fn offset(&self, offset: u64) -> Self {
        Self { value: self.value.wrapping_add(offset) }
    }

    pub fn distance(&self, other: Self) -> u64 {
        self.value.wrapping_sub(other.value)
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:X}", self.value)
    }
}

impl fmt::LowerHex for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::LowerHex::fmt(&self.value, f)
    }
}

impl fmt::UpperHex for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::UpperHex::fmt(&self.value, f)
    }
}

impl Serialize for Address {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

// Remote pointers are untrusted; arithmetic wraps instead of panicking on garbage.
impl Add<u64> for Address {
    type Output = Self;
    fn add(self, rhs: u64) -> Self::Output {
        self.offset(rhs)
    }
}

impl Sub<u64> for Address {
    type Output = Self;
    fn sub(self, rhs: u64) -> Self::Output {
        Self { value: self.value.wrapping_sub(rhs) }
    }
}

impl From<u64> for Address {
    fn from(value: u64) -> Self {
        Self::new(value)
    }
}

impl From<Address> for u64 {
    fn from(addr: Address) -> Self {
        addr.value
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_null_sentinel() {
        assert!(Address::null().is_null());
        assert_eq!(Address::new(0x10).non_null(), Some(Address::new(0x10)));
        assert_eq!(Address::NULL.non_null(), None);
    }

    #[test]
    fn test_offset_wraps() {
        let addr = Address::new(u64::MAX);
        assert_eq!(addr + 2, Address::new(1));
        assert_eq!(format!("{}", Address::new(0xbeef)), "0xBEEF");
    }
}
