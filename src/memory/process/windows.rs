// Wed Jan 15 2026 - Alex

use super::name_matches;
use crate::memory::{Address, MemoryError, Protection, RemoteMemory};
use std::ffi::c_void;
use std::path::PathBuf;
use std::time::Duration;
use windows::core::PWSTR;
use windows::Win32::Foundation::{CloseHandle, HANDLE, STILL_ACTIVE, WAIT_OBJECT_0, WAIT_TIMEOUT};
use windows::Win32::System::Diagnostics::Debug::{ReadProcessMemory, WriteProcessMemory};
use windows::Win32::System::Diagnostics::ToolHelp::{
    CreateToolhelp32Snapshot, Module32FirstW, Process32FirstW, Process32NextW, MODULEENTRY32W,
    PROCESSENTRY32W, TH32CS_SNAPMODULE, TH32CS_SNAPMODULE32, TH32CS_SNAPPROCESS,
};
use windows::Win32::System::Memory::{
    VirtualAllocEx, VirtualFreeEx, VirtualProtectEx, MEM_COMMIT, MEM_RELEASE, MEM_RESERVE,
    PAGE_PROTECTION_FLAGS,
};
use windows::Win32::System::Threading::{
    CreateRemoteThread, GetExitCodeProcess, OpenProcess, QueryFullProcessImageNameW,
    WaitForSingleObject, LPTHREAD_START_ROUTINE, PROCESS_ALL_ACCESS, PROCESS_NAME_WIN32,
    PROCESS_QUERY_LIMITED_INFORMATION,
};

fn wide_to_string(wide: &[u16]) -> String {
    let end = wide.iter().position(|&c| c == 0).unwrap_or(wide.len());
    String::from_utf16_lossy(&wide[..end])
}

struct OwnedHandle(HANDLE);

impl Drop for OwnedHandle {
    fn drop(&mut self) {
        unsafe {
            let _ = CloseHandle(self.0);
        }
    }
}

pub fn find_process(name: &str) -> Result<Option<u32>, MemoryError> {
    let snapshot = unsafe { CreateToolhelp32Snapshot(TH32CS_SNAPPROCESS, 0) }
        .map_err(|e| MemoryError::NotSupported(format!("process snapshot: {}", e)))?;
    let snapshot = OwnedHandle(snapshot);

    let mut entry = PROCESSENTRY32W {
        dwSize: std::mem::size_of::<PROCESSENTRY32W>() as u32,
        ..Default::default()
    };
    let mut next = unsafe { Process32FirstW(snapshot.0, &mut entry) };
    while next.is_ok() {
        if name_matches(&wide_to_string(&entry.szExeFile), name) {
            return Ok(Some(entry.th32ProcessID));
        }
        next = unsafe { Process32NextW(snapshot.0, &mut entry) };
    }
    Ok(None)
}

pub fn process_path(pid: u32) -> Option<PathBuf> {
    let handle = unsafe { OpenProcess(PROCESS_QUERY_LIMITED_INFORMATION, false, pid) }.ok()?;
    let handle = OwnedHandle(handle);
    let mut buffer = vec![0u16; 1024];
    let mut size = buffer.len() as u32;
    unsafe { QueryFullProcessImageNameW(handle.0, PROCESS_NAME_WIN32, PWSTR(buffer.as_mut_ptr()), &mut size) }.ok()?;
    Some(PathBuf::from(wide_to_string(&buffer[..size as usize])))
}

fn module_base(pid: u32, name: &str) -> Result<Address, MemoryError> {
    let snapshot = unsafe { CreateToolhelp32Snapshot(TH32CS_SNAPMODULE | TH32CS_SNAPMODULE32, pid) }
        .map_err(|_| MemoryError::ModuleNotFound(name.to_string()))?;
    let snapshot = OwnedHandle(snapshot);
    let mut entry = MODULEENTRY32W {
        dwSize: std::mem::size_of::<MODULEENTRY32W>() as u32,
        ..Default::default()
    };
    // The first module of a snapshot is the main executable.
    unsafe { Module32FirstW(snapshot.0, &mut entry) }.map_err(|_| MemoryError::ModuleNotFound(name.to_string()))?;
    Ok(Address::new(entry.modBaseAddr as u64))
}

pub struct WindowsProcess {
    handle: OwnedHandle,
    pid: u32,
    base: Address,
}

// The process handle is a kernel object reference usable from any thread.
unsafe impl Send for WindowsProcess {}
unsafe impl Sync for WindowsProcess {}

impl WindowsProcess {
    pub fn open(pid: u32, name: &str) -> Result<Self, MemoryError> {
        let handle = unsafe { OpenProcess(PROCESS_ALL_ACCESS, false, pid) }.map_err(|e| {
            MemoryError::ProcessNotFound(format!("failed to open pid {} ({}), elevation may be required", pid, e))
        })?;
        let handle = OwnedHandle(handle);
        let base = module_base(pid, name)?;
        log::info!("attached to {} (pid {}) at base {}", name, pid, base);
        Ok(Self { handle, pid, base })
    }
}

impl RemoteMemory for WindowsProcess {
    fn read_bytes(&self, addr: Address, len: usize) -> Result<Vec<u8>, MemoryError> {
        let mut buffer = vec![0u8; len];
        let mut read = 0usize;
        unsafe {
            ReadProcessMemory(
                self.handle.0,
                addr.as_u64() as *const c_void,
                buffer.as_mut_ptr() as *mut c_void,
                len,
                Some(&mut read),
            )
        }
        .map_err(|_| MemoryError::ReadFailed(addr.as_u64()))?;
        buffer.truncate(read);
        Ok(buffer)
    }

    fn write_bytes(&self, addr: Address, data: &[u8]) -> Result<(), MemoryError> {
        let mut written = 0usize;
        unsafe {
            WriteProcessMemory(
                self.handle.0,
                addr.as_u64() as *const c_void,
                data.as_ptr() as *const c_void,
                data.len(),
                Some(&mut written),
            )
        }
        .map_err(|_| MemoryError::WriteFailed(addr.as_u64()))?;
        if written != data.len() {
            return Err(MemoryError::WriteFailed(addr.as_u64()));
        }
        Ok(())
    }

    fn protect(&self, addr: Address, len: usize, protection: Protection) -> Result<Protection, MemoryError> {
        let mut old = PAGE_PROTECTION_FLAGS(0);
        unsafe {
            VirtualProtectEx(
                self.handle.0,
                addr.as_u64() as *const c_void,
                len,
                PAGE_PROTECTION_FLAGS(protection.to_page_flags()),
                &mut old,
            )
        }
        .map_err(|_| MemoryError::ProtectFailed(addr.as_u64()))?;
        Ok(Protection::from_page_flags(old.0))
    }

    fn allocate(&self, size: usize) -> Result<Address, MemoryError> {
        let ptr = unsafe {
            VirtualAllocEx(
                self.handle.0,
                None,
                size,
                MEM_COMMIT | MEM_RESERVE,
                PAGE_PROTECTION_FLAGS(Protection::READ_WRITE_EXECUTE.to_page_flags()),
            )
        };
        if ptr.is_null() {
            return Err(MemoryError::AllocationFailed(size));
        }
        Ok(Address::new(ptr as u64))
    }

    fn free(&self, addr: Address) -> Result<(), MemoryError> {
        unsafe { VirtualFreeEx(self.handle.0, addr.as_u64() as *mut c_void, 0, MEM_RELEASE) }
            .map_err(|_| MemoryError::FreeFailed(addr.as_u64()))
    }

    fn run_thread(&self, start: Address, timeout: Duration) -> Result<(), MemoryError> {
        // SAFETY: the routine is only ever started inside the target process.
        let routine: LPTHREAD_START_ROUTINE = unsafe { std::mem::transmute(start.as_u64() as usize) };
        let thread = unsafe { CreateRemoteThread(self.handle.0, None, 0, routine, None, 0, None) }
            .map_err(|e| MemoryError::ThreadFailed(e.to_string()))?;
        let thread = OwnedHandle(thread);

        let millis = timeout.as_millis().min(u32::MAX as u128) as u32;
        let wait = unsafe { WaitForSingleObject(thread.0, millis) };
        if wait == WAIT_OBJECT_0 {
            Ok(())
        } else if wait == WAIT_TIMEOUT {
            Err(MemoryError::Timeout)
        } else {
            Err(MemoryError::ThreadFailed(format!("wait returned {:#x}", wait.0)))
        }
    }

    fn is_alive(&self) -> bool {
        let mut code = 0u32;
        match unsafe { GetExitCodeProcess(self.handle.0, &mut code) } {
            Ok(()) => code == STILL_ACTIVE.0 as u32,
            Err(_) => false,
        }
    }

    fn module_base(&self) -> Address {
        self.base
    }

    fn pid(&self) -> u32 {
        self.pid
    }
}
