// Wed Jan 15 2026 - Alex

#[cfg(target_os = "macos")]
mod macos;
#[cfg(target_os = "windows")]
mod windows;

use crate::memory::{MemoryError, RemoteMemory};
use std::path::PathBuf;
use std::sync::Arc;

#[cfg(target_os = "macos")]
pub use macos::MachProcess;
#[cfg(target_os = "windows")]
pub use windows::WindowsProcess;

/// Compares an executable path or image name against the requested process
/// name. Matching is on the file name and ignores ASCII case.
#[cfg_attr(not(any(target_os = "windows", target_os = "macos")), allow(dead_code))]
pub(crate) fn name_matches(candidate: &str, wanted: &str) -> bool {
    let file_name = candidate.rsplit(['/', '\\']).next().unwrap_or(candidate);
    let stem = wanted.strip_suffix(".exe").unwrap_or(wanted);
    file_name.eq_ignore_ascii_case(wanted) || file_name.eq_ignore_ascii_case(stem)
}

/// Pid of the first running process whose image matches `name`.
pub fn find_process(name: &str) -> Result<Option<u32>, MemoryError> {
    #[cfg(target_os = "windows")]
    {
        windows::find_process(name)
    }
    #[cfg(target_os = "macos")]
    {
        macos::find_process(name)
    }
    #[cfg(not(any(target_os = "windows", target_os = "macos")))]
    {
        let _ = name;
        Err(MemoryError::NotSupported(std::env::consts::OS.to_string()))
    }
}

/// Full executable path of the named process, if it is running.
pub fn process_path(name: &str) -> Option<PathBuf> {
    let pid = find_process(name).ok().flatten()?;
    #[cfg(target_os = "windows")]
    {
        windows::process_path(pid)
    }
    #[cfg(target_os = "macos")]
    {
        macos::process_path(pid)
    }
    #[cfg(not(any(target_os = "windows", target_os = "macos")))]
    {
        let _ = pid;
        None
    }
}

pub fn attach(name: &str) -> Result<Arc<dyn RemoteMemory>, MemoryError> {
    let pid = find_process(name)?.ok_or_else(|| MemoryError::ProcessNotFound(name.to_string()))?;
    log::debug!("found {} with pid {}", name, pid);

    #[cfg(target_os = "windows")]
    {
        let process = WindowsProcess::open(pid, name)?;
        Ok(Arc::new(process))
    }
    #[cfg(target_os = "macos")]
    {
        let process = MachProcess::attach(pid)?;
        Ok(Arc::new(process))
    }
    #[cfg(not(any(target_os = "windows", target_os = "macos")))]
    {
        Err(MemoryError::NotSupported(format!("attaching to pid {} on {}", pid, std::env::consts::OS)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_name_matching() {
        assert!(name_matches("C:\\Roblox\\RobloxPlayerBeta.exe", "RobloxPlayerBeta.exe"));
        assert!(name_matches("robloxplayerbeta.exe", "RobloxPlayerBeta.exe"));
        assert!(name_matches("/Applications/Roblox.app/Contents/MacOS/RobloxPlayer", "RobloxPlayer"));
        assert!(!name_matches("/usr/bin/RobloxPlayerInstaller", "RobloxPlayer"));
    }
}
