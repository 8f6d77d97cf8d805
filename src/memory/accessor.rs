// Wed Jan 15 2026 - Alex

use crate::memory::{Address, MemoryError, Protection, RemoteMemory};
use ahash::AHashMap;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;

/// Strings shorter than this live inline in the slot, longer ones behind a pointer.
pub const STRING_INLINE_CAPACITY: usize = 16;
/// Position of the stored length inside a small-string slot.
pub const STRING_LENGTH_OFFSET: u64 = 0x18;
pub const MAX_STRING_LEN: usize = 4096;

pub const POINTER_STRIDE: u64 = 0x8;
pub const RECORD_STRIDE: u64 = 0x10;
pub const MAX_LIST_ENTRIES: u64 = 0x10000;

#[derive(Debug, Clone, Copy)]
struct OwnedBuffer {
    addr: Address,
    capacity: usize,
}

/// Typed reads and writes over a remote address space.
///
/// Plain `read_*` calls fail closed to a zero value and `write_*` calls report
/// a bool. A legitimately zero field and a failed read look the same through
/// them; the `try_*` twins keep the error for callers that need to tell the
/// two apart. Liveness is checked with [`Accessor::is_alive`], never by
/// interpreting read failures.
pub struct Accessor {
    remote: Arc<dyn RemoteMemory>,
    // string slot -> buffer this accessor allocated for it
    owned_strings: Mutex<AHashMap<Address, OwnedBuffer>>,
}

impl Accessor {
    pub fn new(remote: Arc<dyn RemoteMemory>) -> Self {
        Self {
            remote,
            owned_strings: Mutex::new(AHashMap::new()),
        }
    }

    pub fn remote(&self) -> &Arc<dyn RemoteMemory> {
        &self.remote
    }

    pub fn is_alive(&self) -> bool {
        self.remote.is_alive()
    }

    pub fn module_base(&self) -> Address {
        self.remote.module_base()
    }

    pub fn pid(&self) -> u32 {
        self.remote.pid()
    }

    pub fn try_read_bytes(&self, addr: Address, len: usize) -> Result<Vec<u8>, MemoryError> {
        if addr.is_null() {
            return Err(MemoryError::NullAddress);
        }
        let bytes = self.remote.read_bytes(addr, len)?;
        if bytes.len() < len {
            return Err(MemoryError::ReadFailed(addr.as_u64()));
        }
        Ok(bytes)
    }

    /// Zero-filled on failure, like every other fail-closed read.
    pub fn read_bytes(&self, addr: Address, len: usize) -> Vec<u8> {
        self.try_read_bytes(addr, len).unwrap_or_else(|e| {
            log::trace!("read of {} bytes at {} failed: {}", len, addr, e);
            vec![0u8; len]
        })
    }

    fn try_read_array<const N: usize>(&self, addr: Address) -> Result<[u8; N], MemoryError> {
        let bytes = self.try_read_bytes(addr, N)?;
        let mut out = [0u8; N];
        out.copy_from_slice(&bytes[..N]);
        Ok(out)
    }

    pub fn try_read_u8(&self, addr: Address) -> Result<u8, MemoryError> {
        Ok(self.try_read_array::<1>(addr)?[0])
    }

    pub fn try_read_u32(&self, addr: Address) -> Result<u32, MemoryError> {
        Ok(u32::from_le_bytes(self.try_read_array(addr)?))
    }

    pub fn try_read_i32(&self, addr: Address) -> Result<i32, MemoryError> {
        Ok(i32::from_le_bytes(self.try_read_array(addr)?))
    }

    pub fn try_read_u64(&self, addr: Address) -> Result<u64, MemoryError> {
        Ok(u64::from_le_bytes(self.try_read_array(addr)?))
    }

    pub fn try_read_f32(&self, addr: Address) -> Result<f32, MemoryError> {
        Ok(f32::from_le_bytes(self.try_read_array(addr)?))
    }

    pub fn try_read_f64(&self, addr: Address) -> Result<f64, MemoryError> {
        Ok(f64::from_le_bytes(self.try_read_array(addr)?))
    }

    pub fn try_read_bool(&self, addr: Address) -> Result<bool, MemoryError> {
        Ok(self.try_read_u8(addr)? != 0)
    }

    pub fn try_read_ptr(&self, addr: Address) -> Result<Address, MemoryError> {
        Ok(Address::new(self.try_read_u64(addr)?))
    }

    pub fn read_u8(&self, addr: Address) -> u8 {
        self.try_read_u8(addr).unwrap_or_default()
    }

    pub fn read_u32(&self, addr: Address) -> u32 {
        self.try_read_u32(addr).unwrap_or_default()
    }

    pub fn read_i32(&self, addr: Address) -> i32 {
        self.try_read_i32(addr).unwrap_or_default()
    }

    pub fn read_u64(&self, addr: Address) -> u64 {
        self.try_read_u64(addr).unwrap_or_default()
    }

    pub fn read_f32(&self, addr: Address) -> f32 {
        self.try_read_f32(addr).unwrap_or_default()
    }

    pub fn read_f64(&self, addr: Address) -> f64 {
        self.try_read_f64(addr).unwrap_or_default()
    }

    pub fn read_bool(&self, addr: Address) -> bool {
        self.try_read_bool(addr).unwrap_or_default()
    }

    pub fn read_ptr(&self, addr: Address) -> Address {
        self.try_read_ptr(addr).unwrap_or_default()
    }

    /// Makes the region writable before writing; target pages are often
    /// read-only or execute-only.
    pub fn try_write_bytes(&self, addr: Address, data: &[u8]) -> Result<(), MemoryError> {
        if addr.is_null() {
            return Err(MemoryError::NullAddress);
        }
        if let Err(e) = self.remote.protect(addr, data.len(), Protection::READ_WRITE_EXECUTE) {
            log::trace!("protect {} (+{}) failed: {}", addr, data.len(), e);
        }
        self.remote.write_bytes(addr, data)
    }

    pub fn write_bytes(&self, addr: Address, data: &[u8]) -> bool {
        match self.try_write_bytes(addr, data) {
            Ok(()) => true,
            Err(e) => {
                log::trace!("write of {} bytes at {} failed: {}", data.len(), addr, e);
                false
            }
        }
    }

    pub fn try_write_u8(&self, addr: Address, value: u8) -> Result<(), MemoryError> {
        self.try_write_bytes(addr, &[value])
    }

    pub fn try_write_i32(&self, addr: Address, value: i32) -> Result<(), MemoryError> {
        self.try_write_bytes(addr, &value.to_le_bytes())
    }

    pub fn try_write_u64(&self, addr: Address, value: u64) -> Result<(), MemoryError> {
        self.try_write_bytes(addr, &value.to_le_bytes())
    }

    pub fn try_write_ptr(&self, addr: Address, value: Address) -> Result<(), MemoryError> {
        self.try_write_u64(addr, value.as_u64())
    }

    pub fn write_u8(&self, addr: Address, value: u8) -> bool {
        self.write_bytes(addr, &[value])
    }

    pub fn write_u32(&self, addr: Address, value: u32) -> bool {
        self.write_bytes(addr, &value.to_le_bytes())
    }

    pub fn write_i32(&self, addr: Address, value: i32) -> bool {
        self.write_bytes(addr, &value.to_le_bytes())
    }

    pub fn write_u64(&self, addr: Address, value: u64) -> bool {
        self.write_bytes(addr, &value.to_le_bytes())
    }

    pub fn write_f32(&self, addr: Address, value: f32) -> bool {
        self.write_bytes(addr, &value.to_le_bytes())
    }

    pub fn write_f64(&self, addr: Address, value: f64) -> bool {
        self.write_bytes(addr, &value.to_le_bytes())
    }

    pub fn write_bool(&self, addr: Address, value: bool) -> bool {
        self.write_u8(addr, value as u8)
    }

    pub fn write_ptr(&self, addr: Address, value: Address) -> bool {
        self.write_u64(addr, value.as_u64())
    }

    pub fn try_read_floats(&self, addr: Address, count: usize) -> Result<Vec<f32>, MemoryError> {
        let bytes = self.try_read_bytes(addr, count * 4)?;
        Ok(bytes
            .chunks_exact(4)
            .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
            .collect())
    }

    /// Vector and matrix fields: 2, 3, 12 or 16 packed floats.
    pub fn read_floats(&self, addr: Address, count: usize) -> Vec<f32> {
        self.try_read_floats(addr, count).unwrap_or_else(|_| vec![0.0; count])
    }

    pub fn write_floats(&self, addr: Address, values: &[f32]) -> bool {
        let bytes: Vec<u8> = values.iter().flat_map(|v| v.to_le_bytes()).collect();
        self.write_bytes(addr, &bytes)
    }

    pub fn read_bool_mask(&self, addr: Address, mask: u8) -> bool {
        self.try_read_u8(addr).map(|b| b & mask != 0).unwrap_or(false)
    }

    /// Read-modify-write of one bit group; the other bits of the byte are kept.
    pub fn write_bool_mask(&self, addr: Address, mask: u8, value: bool) -> bool {
        let Ok(byte) = self.try_read_u8(addr) else {
            return false;
        };
        let updated = if value { byte | mask } else { byte & !mask };
        self.write_u8(addr, updated)
    }

    pub fn try_read_c_string(&self, addr: Address, max_len: usize) -> Result<String, MemoryError> {
        let bytes = self.try_read_bytes(addr, max_len)?;
        Ok(decode_c_string(&bytes))
    }

    /// NUL-terminated string of at most [`MAX_STRING_LEN`] bytes. Reads
    /// shrink towards the address when the tail of the window is unmapped.
    pub fn read_c_string(&self, addr: Address) -> String {
        if addr.is_null() {
            return String::new();
        }
        let mut window = MAX_STRING_LEN;
        while window >= STRING_INLINE_CAPACITY {
            if let Ok(s) = self.try_read_c_string(addr, window) {
                return s;
            }
            window /= 4;
        }
        String::new()
    }

    pub fn try_read_small_string(&self, addr: Address) -> Result<String, MemoryError> {
        if addr.is_null() {
            return Err(MemoryError::NullAddress);
        }
        let length = self.try_read_i32(addr + STRING_LENGTH_OFFSET)?;
        if length >= STRING_INLINE_CAPACITY as i32 {
            let body = self.try_read_ptr(addr)?;
            if body.is_null() {
                return Err(MemoryError::NullAddress);
            }
            let len = (length as usize + 1).min(MAX_STRING_LEN);
            self.try_read_c_string(body, len)
        } else {
            self.try_read_c_string(addr, STRING_INLINE_CAPACITY)
        }
    }

    /// Small-string slot: inline below 16 bytes, otherwise behind the pointer
    /// stored in the first 8 bytes. Undecodable bytes are replaced.
    pub fn read_small_string(&self, addr: Address) -> String {
        self.try_read_small_string(addr).unwrap_or_default()
    }

    pub fn try_write_small_string(&self, addr: Address, value: &str) -> Result<(), MemoryError> {
        if addr.is_null() {
            return Err(MemoryError::NullAddress);
        }
        let len = value.len();
        let mut body = value.as_bytes().to_vec();
        body.push(0);

        if len < STRING_INLINE_CAPACITY {
            self.try_write_bytes(addr, &body)?;
            self.try_write_i32(addr + STRING_LENGTH_OFFSET, len as i32)?;
            self.release_string_buffer(addr);
            return Ok(());
        }

        let previous_len = self.try_read_i32(addr + STRING_LENGTH_OFFSET).unwrap_or(0);
        if previous_len >= STRING_INLINE_CAPACITY as i32 {
            let current = self.try_read_ptr(addr).unwrap_or_default();
            if !current.is_null() {
                let owned = self.owned_strings.lock().get(&addr).copied();
                let capacity = match owned {
                    Some(buffer) if buffer.addr == current => buffer.capacity,
                    _ => previous_len as usize + 1,
                };
                if body.len() <= capacity {
                    self.try_write_bytes(current, &body)?;
                    return self.try_write_i32(addr + STRING_LENGTH_OFFSET, len as i32);
                }
            }
        }

        // Growing past the current storage: move the body to a fresh buffer.
        let fresh = self.try_allocate(body.len())?;
        if let Err(e) = self
            .try_write_bytes(fresh, &body)
            .and_then(|_| self.try_write_ptr(addr, fresh))
        {
            self.free(fresh);
            return Err(e);
        }
        let replaced = self.owned_strings.lock().insert(
            addr,
            OwnedBuffer {
                addr: fresh,
                capacity: body.len(),
            },
        );
        if let Some(old) = replaced {
            self.free(old.addr);
        }
        self.try_write_i32(addr + STRING_LENGTH_OFFSET, len as i32)
    }

    pub fn write_small_string(&self, addr: Address, value: &str) -> bool {
        match self.try_write_small_string(addr, value) {
            Ok(()) => true,
            Err(e) => {
                log::debug!("string write at {} failed: {}", addr, e);
                false
            }
        }
    }

    fn release_string_buffer(&self, slot: Address) {
        let released = self.owned_strings.lock().remove(&slot);
        if let Some(buffer) = released {
            self.free(buffer.addr);
        }
    }

    /// Remote string buffers currently owned by this accessor.
    pub fn owned_string_buffers(&self) -> usize {
        self.owned_strings.lock().len()
    }

    /// Walks `[start, end)` in `stride` steps, decoding every non-null pointer
    /// found at the head of each record. Implausible bounds yield nothing.
    pub fn read_pointer_array<T, F>(&self, start: Address, end: Address, stride: u64, mut decode: F) -> Vec<T>
    where
        F: FnMut(Address) -> T,
    {
        if start.is_null() || end <= start || stride < POINTER_STRIDE {
            return Vec::new();
        }
        let span = end.distance(start);
        if span / stride > MAX_LIST_ENTRIES {
            log::debug!("ignoring list {}..{} with {} entries", start, end, span / stride);
            return Vec::new();
        }

        let Ok(bytes) = self.try_read_bytes(start, span as usize) else {
            return Vec::new();
        };
        bytes
            .chunks(stride as usize)
            .filter(|record| record.len() >= POINTER_STRIDE as usize)
            .map(|record| {
                let mut raw = [0u8; 8];
                raw.copy_from_slice(&record[..8]);
                Address::new(u64::from_le_bytes(raw))
            })
            .filter(|ptr| !ptr.is_null())
            .map(&mut decode)
            .collect()
    }

    /// List whose begin/end pointers sit at `addr` and `addr + 8`.
    pub fn read_list<T, F>(&self, addr: Address, stride: u64, decode: F) -> Vec<T>
    where
        F: FnMut(Address) -> T,
    {
        if addr.is_null() {
            return Vec::new();
        }
        let start = self.read_ptr(addr);
        let end = self.read_ptr(addr + POINTER_STRIDE);
        self.read_pointer_array(start, end, stride, decode)
    }

    /// Rewrites the pointer slots of a stride-8 list in place and moves its end pointer.
    pub fn write_list(&self, addr: Address, items: &[Address]) -> bool {
        if addr.is_null() {
            return false;
        }
        let start = self.read_ptr(addr);
        if start.is_null() {
            return false;
        }
        let bytes: Vec<u8> = items.iter().flat_map(|a| a.as_u64().to_le_bytes()).collect();
        if !bytes.is_empty() && !self.write_bytes(start, &bytes) {
            return false;
        }
        self.write_ptr(addr + POINTER_STRIDE, start + bytes.len() as u64)
    }

    pub fn try_allocate(&self, size: usize) -> Result<Address, MemoryError> {
        let addr = self.remote.allocate(size)?;
        if addr.is_null() {
            return Err(MemoryError::AllocationFailed(size));
        }
        if let Err(e) = self.remote.protect(addr, size, Protection::READ_WRITE_EXECUTE) {
            log::trace!("protect of allocation {} failed: {}", addr, e);
        }
        Ok(addr)
    }

    /// Null on failure; nothing may be written through the result without checking.
    pub fn allocate(&self, size: usize) -> Address {
        self.try_allocate(size).unwrap_or_else(|e| {
            log::debug!("allocation of {} bytes failed: {}", size, e);
            Address::NULL
        })
    }

    pub fn free(&self, addr: Address) -> bool {
        if addr.is_null() {
            return false;
        }
        match self.remote.free(addr) {
            Ok(()) => true,
            Err(e) => {
                log::debug!("free of {} failed: {}", addr, e);
                false
            }
        }
    }

    pub fn run_thread(&self, start: Address, timeout: Duration) -> bool {
        if start.is_null() {
            return false;
        }
        match self.remote.run_thread(start, timeout) {
            Ok(()) => true,
            Err(e) => {
                log::debug!("remote thread at {} failed: {}", start, e);
                false
            }
        }
    }

    /// Copies `code` into a fresh region, runs it on a remote thread and reads
    /// the 8-byte result slot at `result_offset`. Returns 0 on any failure.
    /// A region whose thread did not finish in time is left allocated.
    pub fn call_remote(&self, code: &[u8], result_offset: u64, timeout: Duration) -> u64 {
        let size = code.len().max(result_offset as usize + 8);
        let region = self.allocate(size);
        if region.is_null() {
            return 0;
        }
        if !self.write_bytes(region, code) {
            self.free(region);
            return 0;
        }
        if !self.run_thread(region, timeout) {
            log::warn!("remote call at {} did not finish, leaving region allocated", region);
            return 0;
        }
        let result = self.read_u64(region + result_offset);
        self.free(region);
        result
    }
}

fn decode_c_string(bytes: &[u8]) -> String {
    let end = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
    String::from_utf8_lossy(&bytes[..end]).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::mock::MockMemory;

    fn setup() -> (Arc<MockMemory>, Accessor) {
        let mock = Arc::new(MockMemory::new());
        mock.map(0x1000, 0x1000, Protection::READ_WRITE);
        let accessor = Accessor::new(mock.clone());
        (mock, accessor)
    }

    #[test]
    fn test_reads_fail_closed() {
        let (_, mem) = setup();
        assert_eq!(mem.read_u64(Address::new(0xdead_0000)), 0);
        assert_eq!(mem.read_f32(Address::NULL), 0.0);
        assert!(!mem.read_bool(Address::new(0x9999_0000)));
        assert_eq!(mem.read_bytes(Address::new(0x5), 4), vec![0; 4]);
        assert!(mem.try_read_u64(Address::new(0xdead_0000)).is_err());
    }

    #[test]
    fn test_typed_roundtrip() {
        let (_, mem) = setup();
        let base = Address::new(0x1000);
        assert!(mem.write_i32(base, -7));
        assert!(mem.write_f64(base + 8, 2.5));
        assert!(mem.write_bool(base + 16, true));
        assert_eq!(mem.read_i32(base), -7);
        assert_eq!(mem.read_f64(base + 8), 2.5);
        assert!(mem.read_bool(base + 16));
        assert!(!mem.write_u64(Address::NULL, 1));
    }

    #[test]
    fn test_write_flips_protection() {
        let (mock, mem) = setup();
        mock.map(0x4000, 0x100, Protection::READ_EXECUTE);
        assert!(mem.write_u64(Address::new(0x4000), 0x1122));
        assert_eq!(mem.read_u64(Address::new(0x4000)), 0x1122);
        assert_eq!(mock.protection_of(Address::new(0x4000)), Some(Protection::READ_WRITE_EXECUTE));
    }

    #[test]
    fn test_bool_mask() {
        let (_, mem) = setup();
        let addr = Address::new(0x1100);
        mem.write_u8(addr, 0b0000_0101);
        assert!(mem.read_bool_mask(addr, 0b0000_0100));
        assert!(!mem.read_bool_mask(addr, 0b0000_0010));
        assert!(mem.write_bool_mask(addr, 0b0000_0010, true));
        assert_eq!(mem.read_u8(addr), 0b0000_0111);
        assert!(mem.write_bool_mask(addr, 0b0000_0001, false));
        assert_eq!(mem.read_u8(addr), 0b0000_0110);
    }

    #[test]
    fn test_inline_small_string() {
        let (_, mem) = setup();
        let slot = Address::new(0x1200);
        assert!(mem.write_small_string(slot, "Workspace"));
        assert_eq!(mem.read_i32(slot + STRING_LENGTH_OFFSET), 9);
        assert_eq!(mem.read_small_string(slot), "Workspace");
        assert_eq!(mem.owned_string_buffers(), 0);
    }

    #[test]
    fn test_indirect_string_roundtrip_frees_once() {
        let (mock, mem) = setup();
        let slot = Address::new(0x1300);

        assert!(mem.write_small_string(slot, "REMOTE_STRING_12345678901234567890"));
        assert_eq!(mem.read_small_string(slot), "REMOTE_STRING_12345678901234567890");
        assert_eq!(mock.outstanding_allocations(), 1);

        assert!(mem.write_small_string(slot, "REMOTE_STRING_12345678901234567890_AND_MORE"));
        assert_eq!(mem.read_small_string(slot), "REMOTE_STRING_12345678901234567890_AND_MORE");
        assert_eq!(mock.outstanding_allocations(), 1);
        assert_eq!(mock.free_count(), 1);

        // shorter text reuses the buffer it already owns
        assert!(mem.write_small_string(slot, "REMOTE_STRING_1234567"));
        assert_eq!(mem.read_small_string(slot), "REMOTE_STRING_1234567");
        assert_eq!(mock.outstanding_allocations(), 1);

        assert!(mem.write_small_string(slot, "short"));
        assert_eq!(mem.read_small_string(slot), "short");
        assert_eq!(mock.outstanding_allocations(), 0);
        assert_eq!(mock.free_count(), 2);
        assert_eq!(mock.double_frees(), 0);
    }

    #[test]
    fn test_string_write_without_allocation_fails() {
        let (mock, mem) = setup();
        mock.fail_allocations(true);
        let slot = Address::new(0x1400);
        assert!(!mem.write_small_string(slot, "a string that is far too long to inline"));
        assert_eq!(mem.read_u64(slot), 0);
    }

    #[test]
    fn test_lossy_string_decoding() {
        let (mock, mem) = setup();
        let slot = Address::new(0x1500);
        mock.poke(slot, &[b'o', b'k', 0xff, b'!', 0, b'x']);
        mock.poke(slot + STRING_LENGTH_OFFSET, &4i32.to_le_bytes());
        assert_eq!(mem.read_small_string(slot), "ok\u{fffd}!");
    }

    #[test]
    fn test_pointer_array_skips_null() {
        let (mock, mem) = setup();
        let start = Address::new(0x1600);
        let pointers = [0x2000u64, 0, 0x2100, 0x2200];
        for (i, p) in pointers.iter().enumerate() {
            mock.poke(start + i as u64 * RECORD_STRIDE, &p.to_le_bytes());
        }
        let end = start + pointers.len() as u64 * RECORD_STRIDE;
        let found = mem.read_pointer_array(start, end, RECORD_STRIDE, |a| a.as_u64());
        assert_eq!(found, vec![0x2000, 0x2100, 0x2200]);
        assert!(mem.read_pointer_array(end, start, RECORD_STRIDE, |a| a).is_empty());
    }

    #[test]
    fn test_write_list_moves_end() {
        let (mock, mem) = setup();
        let header = Address::new(0x1800);
        mock.poke(header, &0x1900u64.to_le_bytes());
        mock.poke(header + 8, &0x1900u64.to_le_bytes());
        let items = [Address::new(0xa0), Address::new(0xb0)];
        assert!(mem.write_list(header, &items));
        assert_eq!(mem.read_list(header, POINTER_STRIDE, |a| a), items.to_vec());
    }

    #[test]
    fn test_call_remote_reads_result_slot() {
        let (mock, mem) = setup();
        mock.on_thread(|mock, start| {
            mock.poke(start + 0xF8, &0x4242u64.to_le_bytes());
        });
        let result = mem.call_remote(&[0x90, 0xC3], 0xF8, Duration::from_millis(50));
        assert_eq!(result, 0x4242);
        assert_eq!(mock.outstanding_allocations(), 0);
    }
}
