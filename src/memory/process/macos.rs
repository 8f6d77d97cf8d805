// Tue Jan 13 2026 - Alex

use super::name_matches;
use crate::memory::{Address, MemoryError, Protection, RemoteMemory};
use ahash::AHashMap;
use libc::{c_int, c_uint, c_void, pid_t};
use parking_lot::Mutex;
use std::path::PathBuf;
use std::time::Duration;

#[allow(non_camel_case_types)]
type mach_port_t = c_uint;
#[allow(non_camel_case_types)]
type kern_return_t = c_int;
#[allow(non_camel_case_types)]
type vm_address_t = u64;
#[allow(non_camel_case_types)]
type vm_size_t = u64;
#[allow(non_camel_case_types)]
type vm_prot_t = c_int;
#[allow(non_camel_case_types)]
type vm_region_flavor_t = c_int;
#[allow(non_camel_case_types)]
type vm_region_info_t = *mut c_int;

const KERN_SUCCESS: kern_return_t = 0;
const VM_FLAGS_ANYWHERE: c_int = 1;
const VM_REGION_BASIC_INFO_64: vm_region_flavor_t = 9;
const VM_REGION_BASIC_INFO_COUNT_64: u32 = 9;
const PROC_ALL_PIDS: u32 = 1;
const PROC_PIDPATHINFO_MAXSIZE: u32 = 4096;

#[repr(C)]
#[derive(Debug, Clone, Copy, Default)]
#[allow(non_camel_case_types)]
struct vm_region_basic_info_64 {
    protection: vm_prot_t,
    max_protection: vm_prot_t,
    inheritance: c_uint,
    shared: c_uint,
    reserved: c_uint,
    offset: u64,
    behavior: c_int,
    user_wired_count: u16,
}

extern "C" {
    fn mach_task_self() -> mach_port_t;
    fn task_for_pid(target_task: mach_port_t, pid: c_int, task: *mut mach_port_t) -> kern_return_t;
    fn vm_read_overwrite(
        target_task: mach_port_t,
        address: vm_address_t,
        size: vm_size_t,
        data: vm_address_t,
        out_size: *mut vm_size_t,
    ) -> kern_return_t;
    fn mach_vm_write(target_task: mach_port_t, address: vm_address_t, data: usize, data_count: c_uint) -> kern_return_t;
    fn mach_vm_protect(
        target_task: mach_port_t,
        address: vm_address_t,
        size: vm_size_t,
        set_maximum: c_int,
        new_protection: vm_prot_t,
    ) -> kern_return_t;
    fn mach_vm_allocate(target_task: mach_port_t, address: *mut vm_address_t, size: vm_size_t, flags: c_int) -> kern_return_t;
    fn mach_vm_deallocate(target_task: mach_port_t, address: vm_address_t, size: vm_size_t) -> kern_return_t;
    fn mach_vm_region(
        target_task: mach_port_t,
        address: *mut vm_address_t,
        size: *mut vm_size_t,
        flavor: vm_region_flavor_t,
        info: vm_region_info_t,
        info_count: *mut u32,
        object_name: *mut mach_port_t,
    ) -> kern_return_t;
    fn proc_listpids(type_: u32, typeinfo: u32, buffer: *mut c_void, buffersize: c_int) -> c_int;
    fn proc_pidpath(pid: c_int, buffer: *mut c_void, buffersize: u32) -> c_int;
}

fn list_pids() -> Vec<pid_t> {
    let size = unsafe { proc_listpids(PROC_ALL_PIDS, 0, std::ptr::null_mut(), 0) };
    if size <= 0 {
        return Vec::new();
    }
    let mut pids: Vec<pid_t> = vec![0; size as usize / std::mem::size_of::<pid_t>()];
    let filled = unsafe { proc_listpids(PROC_ALL_PIDS, 0, pids.as_mut_ptr() as *mut c_void, size) };
    if filled <= 0 {
        return Vec::new();
    }
    pids.truncate(filled as usize / std::mem::size_of::<pid_t>());
    pids.retain(|&pid| pid != 0);
    pids
}

pub fn process_path(pid: u32) -> Option<PathBuf> {
    let mut buffer = vec![0u8; PROC_PIDPATHINFO_MAXSIZE as usize];
    let len = unsafe { proc_pidpath(pid as c_int, buffer.as_mut_ptr() as *mut c_void, PROC_PIDPATHINFO_MAXSIZE) };
    if len <= 0 {
        return None;
    }
    buffer.truncate(len as usize);
    String::from_utf8(buffer).ok().map(PathBuf::from)
}

pub fn find_process(name: &str) -> Result<Option<u32>, MemoryError> {
    Ok(list_pids().into_iter().map(|pid| pid as u32).find(|&pid| {
        process_path(pid)
            .and_then(|path| path.to_str().map(|p| name_matches(p, name)))
            .unwrap_or(false)
    }))
}

pub struct MachProcess {
    pid: pid_t,
    task: mach_port_t,
    base: Address,
    // mach deallocation needs the size the region was created with
    allocations: Mutex<AHashMap<u64, u64>>,
}

impl MachProcess {
    pub fn attach(pid: u32) -> Result<Self, MemoryError> {
        let mut task: mach_port_t = 0;
        let result = unsafe { task_for_pid(mach_task_self(), pid as c_int, &mut task) };
        if result != KERN_SUCCESS {
            return Err(MemoryError::ProcessNotFound(format!(
                "Failed to attach to process {} (error {}). Root privileges may be required.",
                pid, result
            )));
        }
        let mut process = Self {
            pid: pid as pid_t,
            task,
            base: Address::NULL,
            allocations: Mutex::new(AHashMap::new()),
        };
        process.base = process.first_executable_region()?;
        log::info!("attached to pid {} at base {}", pid, process.base);
        Ok(process)
    }

    fn region_at(&self, addr: u64) -> Option<(u64, u64, Protection)> {
        let mut address: vm_address_t = addr;
        let mut size: vm_size_t = 0;
        let mut info = vm_region_basic_info_64::default();
        let mut info_count = VM_REGION_BASIC_INFO_COUNT_64;
        let mut object_name: mach_port_t = 0;
        let result = unsafe {
            mach_vm_region(
                self.task,
                &mut address,
                &mut size,
                VM_REGION_BASIC_INFO_64,
                &mut info as *mut _ as vm_region_info_t,
                &mut info_count,
                &mut object_name,
            )
        };
        if result != KERN_SUCCESS {
            return None;
        }
        Some((address, size, Protection::from_flags(info.protection as u32)))
    }

    fn first_executable_region(&self) -> Result<Address, MemoryError> {
        let mut address = 0u64;
        while let Some((start, size, protection)) = self.region_at(address) {
            if protection.is_executable() {
                return Ok(Address::new(start));
            }
            address = start.saturating_add(size);
            if size == 0 || address == 0 {
                break;
            }
        }
        Err(MemoryError::ModuleNotFound("no executable region".to_string()))
    }
}

impl RemoteMemory for MachProcess {
    fn read_bytes(&self, addr: Address, len: usize) -> Result<Vec<u8>, MemoryError> {
        let mut buffer = vec![0u8; len];
        let mut out_size: vm_size_t = 0;
        let result = unsafe {
            vm_read_overwrite(
                self.task,
                addr.as_u64(),
                len as vm_size_t,
                buffer.as_mut_ptr() as vm_address_t,
                &mut out_size,
            )
        };
        if result != KERN_SUCCESS {
            return Err(MemoryError::ReadFailed(addr.as_u64()));
        }
        buffer.truncate(out_size as usize);
        Ok(buffer)
    }

    fn write_bytes(&self, addr: Address, data: &[u8]) -> Result<(), MemoryError> {
        let result = unsafe { mach_vm_write(self.task, addr.as_u64(), data.as_ptr() as usize, data.len() as c_uint) };
        if result != KERN_SUCCESS {
            return Err(MemoryError::WriteFailed(addr.as_u64()));
        }
        Ok(())
    }

    fn protect(&self, addr: Address, len: usize, protection: Protection) -> Result<Protection, MemoryError> {
        let previous = self
            .region_at(addr.as_u64())
            .map(|(_, _, p)| p)
            .unwrap_or(Protection::empty());
        let result = unsafe { mach_vm_protect(self.task, addr.as_u64(), len as vm_size_t, 0, protection.to_flags() as vm_prot_t) };
        if result != KERN_SUCCESS {
            return Err(MemoryError::ProtectFailed(addr.as_u64()));
        }
        Ok(previous)
    }

    fn allocate(&self, size: usize) -> Result<Address, MemoryError> {
        let mut address: vm_address_t = 0;
        let result = unsafe { mach_vm_allocate(self.task, &mut address, size as vm_size_t, VM_FLAGS_ANYWHERE) };
        if result != KERN_SUCCESS || address == 0 {
            return Err(MemoryError::AllocationFailed(size));
        }
        self.allocations.lock().insert(address, size as u64);
        Ok(Address::new(address))
    }

    fn free(&self, addr: Address) -> Result<(), MemoryError> {
        let size = self
            .allocations
            .lock()
            .remove(&addr.as_u64())
            .ok_or(MemoryError::FreeFailed(addr.as_u64()))?;
        let result = unsafe { mach_vm_deallocate(self.task, addr.as_u64(), size) };
        if result != KERN_SUCCESS {
            return Err(MemoryError::FreeFailed(addr.as_u64()));
        }
        Ok(())
    }

    fn run_thread(&self, _start: Address, _timeout: Duration) -> Result<(), MemoryError> {
        Err(MemoryError::NotSupported("remote threads on macOS".to_string()))
    }

    fn is_alive(&self) -> bool {
        unsafe { libc::kill(self.pid, 0) == 0 }
    }

    fn module_base(&self) -> Address {
        self.base
    }

    fn pid(&self) -> u32 {
        self.pid as u32
    }
}
