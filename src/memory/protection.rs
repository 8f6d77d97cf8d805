// Tue Jan 13 2026 - Alex

use bitflags::bitflags;
use std::fmt;

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Protection: u32 {
        const READ = 1;
        const WRITE = 2;
        const EXECUTE = 4;
        const READ_WRITE = Self::READ.bits() | Self::WRITE.bits();
        const READ_EXECUTE = Self::READ.bits() | Self::EXECUTE.bits();
        const READ_WRITE_EXECUTE = Self::READ.bits() | Self::WRITE.bits() | Self::EXECUTE.bits();
    }
}

impl Protection {
    pub fn from_flags(flags: u32) -> Self {
        Self::from_bits_truncate(flags & 7)
    }

    pub fn to_flags(self) -> u32 {
        self.bits()
    }

    pub fn is_readable(self) -> bool {
        self.contains(Self::READ)
    }

    pub fn is_writable(self) -> bool {
        self.contains(Self::WRITE)
    }

    pub fn is_executable(self) -> bool {
        self.contains(Self::EXECUTE)
    }

    #[cfg(target_os = "windows")]
    pub fn to_page_flags(self) -> u32 {
        const PAGE_NOACCESS: u32 = 0x01;
        const PAGE_READONLY: u32 = 0x02;
        const PAGE_READWRITE: u32 = 0x04;
        const PAGE_EXECUTE: u32 = 0x10;
        const PAGE_EXECUTE_READ: u32 = 0x20;
        const PAGE_EXECUTE_READWRITE: u32 = 0x40;

        match (self.is_readable(), self.is_writable(), self.is_executable()) {
            (_, true, true) => PAGE_EXECUTE_READWRITE,
            (_, true, false) => PAGE_READWRITE,
            (true, false, true) => PAGE_EXECUTE_READ,
            (false, false, true) => PAGE_EXECUTE,
            (true, false, false) => PAGE_READONLY,
            (false, false, false) => PAGE_NOACCESS,
        }
    }

    #[cfg(target_os = "windows")]
    pub fn from_page_flags(flags: u32) -> Self {
        match flags & 0xFF {
            0x02 => Self::READ,
            0x04 | 0x08 => Self::READ_WRITE,
            0x10 => Self::EXECUTE,
            0x20 => Self::READ_EXECUTE,
            0x40 | 0x80 => Self::READ_WRITE_EXECUTE,
            _ => Self::empty(),
        }
    }
}

impl fmt::Display for Protection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{}{}",
            if self.is_readable() { 'r' } else { '-' },
            if self.is_writable() { 'w' } else { '-' },
            if self.is_executable() { 'x' } else { '-' }
        )
    }
}
