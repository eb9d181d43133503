//! Windows backend using the Win32 process and virtual memory APIs

use std::ffi::c_void;
use std::mem;

use tracing::debug;
use windows::Win32::Foundation::{CloseHandle, HANDLE};
use windows::Win32::System::Diagnostics::Debug::ReadProcessMemory;
use windows::Win32::System::Diagnostics::ToolHelp::{
    CreateToolhelp32Snapshot, PROCESSENTRY32W, Process32FirstW, Process32NextW,
    TH32CS_SNAPPROCESS,
};
use windows::Win32::System::Memory::{
    MEM_COMMIT, MEMORY_BASIC_INFORMATION, PAGE_GUARD, PAGE_NOACCESS, PAGE_PROTECTION_FLAGS,
    VIRTUAL_ALLOCATION_TYPE, VirtualQueryEx,
};
use windows::Win32::System::Threading::{
    GetExitCodeProcess, OpenProcess, PROCESS_QUERY_INFORMATION, PROCESS_VM_READ,
};

use crate::error::{Error, Result};
use crate::memory::{MemoryAccess, MemoryRegion, ProcessProvider, ReadMemory};

/// Exit code reported by `GetExitCodeProcess` while the process runs
const STILL_ACTIVE: u32 = 259;

/// The game is a 32-bit process; its user space ends here
const USER_SPACE_LIMIT: u64 = 0xFFFF_FFFF;

#[derive(Debug, Clone, Copy, Default)]
pub struct WindowsProvider;

impl ProcessProvider for WindowsProvider {
    type Process = WindowsProcess;

    fn find_process(&self, name: &str) -> Option<u32> {
        // SAFETY: a process snapshot has no preconditions; the handle is closed below.
        let snapshot = unsafe { CreateToolhelp32Snapshot(TH32CS_SNAPPROCESS, 0) }.ok()?;

        let mut entry = PROCESSENTRY32W {
            dwSize: mem::size_of::<PROCESSENTRY32W>() as u32,
            ..Default::default()
        };

        let mut found = None;
        // SAFETY: `entry.dwSize` is initialized as the API requires.
        let mut more = unsafe { Process32FirstW(snapshot, &mut entry) }.is_ok();
        while more {
            let len = entry
                .szExeFile
                .iter()
                .position(|&c| c == 0)
                .unwrap_or(entry.szExeFile.len());
            let exe = String::from_utf16_lossy(&entry.szExeFile[..len]);
            if exe.eq_ignore_ascii_case(name) {
                found = Some(entry.th32ProcessID);
                break;
            }
            // SAFETY: same snapshot and entry as above.
            more = unsafe { Process32NextW(snapshot, &mut entry) }.is_ok();
        }

        // SAFETY: `snapshot` is a valid handle owned by this function.
        unsafe {
            let _ = CloseHandle(snapshot);
        }
        found
    }

    fn attach(&self, pid: u32) -> Result<WindowsProcess> {
        // SAFETY: OpenProcess has no memory-safety preconditions.
        let handle = unsafe { OpenProcess(PROCESS_VM_READ | PROCESS_QUERY_INFORMATION, false, pid) }
            .map_err(|e| Error::Attach {
                pid,
                message: format!("OpenProcess failed: {e}. Are you running as Administrator?"),
            })?;

        debug!("Opened process handle for pid {}", pid);
        Ok(WindowsProcess { pid, handle })
    }
}

#[derive(Debug)]
pub struct WindowsProcess {
    pid: u32,
    handle: HANDLE,
}

// SAFETY: a process HANDLE is a kernel object reference usable from any thread;
// WindowsProcess owns it exclusively and closes it once in Drop.
unsafe impl Send for WindowsProcess {}

impl ReadMemory for WindowsProcess {
    fn read_bytes(&self, address: u64, size: usize) -> Result<Vec<u8>> {
        let mut buffer = vec![0u8; size];
        let mut read = 0usize;

        // SAFETY: `buffer` is valid for `size` bytes of writes; the target
        // address is only dereferenced by the kernel, which validates it.
        let result = unsafe {
            ReadProcessMemory(
                self.handle,
                address as *const c_void,
                buffer.as_mut_ptr().cast(),
                size,
                Some(&mut read as *mut usize),
            )
        };

        match result {
            Ok(()) if read > 0 => {
                buffer.truncate(read);
                Ok(buffer)
            }
            Ok(()) => Err(Error::MemoryReadFailed {
                address,
                message: "no bytes read".to_string(),
            }),
            Err(e) => Err(Error::MemoryReadFailed {
                address,
                message: e.to_string(),
            }),
        }
    }
}

impl MemoryAccess for WindowsProcess {
    fn pid(&self) -> u32 {
        self.pid
    }

    fn readable_regions(&self) -> Result<Vec<MemoryRegion>> {
        let mut regions = Vec::new();
        let mut address: u64 = 0;

        loop {
            let mut info = MEMORY_BASIC_INFORMATION::default();
            // SAFETY: `info` is a properly sized out-parameter.
            let written = unsafe {
                VirtualQueryEx(
                    self.handle,
                    Some(address as *const c_void),
                    &mut info,
                    mem::size_of::<MEMORY_BASIC_INFORMATION>(),
                )
            };
            if written == 0 {
                break;
            }

            let base = info.BaseAddress as u64;
            let size = info.RegionSize as u64;
            if is_scannable(info.State, info.Protect) {
                regions.push(MemoryRegion::new(base, size));
            }

            let next = base.saturating_add(size);
            if next <= address || next >= USER_SPACE_LIMIT {
                break;
            }
            address = next;
        }

        if regions.is_empty() {
            return Err(Error::RegionQueryFailed(format!(
                "VirtualQueryEx returned no readable regions for pid {}",
                self.pid
            )));
        }
        Ok(regions)
    }

    fn is_alive(&self) -> bool {
        let mut code = 0u32;
        // SAFETY: `code` is a valid out-parameter for the duration of the call.
        let ok = unsafe { GetExitCodeProcess(self.handle, &mut code) }.is_ok();
        ok && code == STILL_ACTIVE
    }
}

/// Committed pages that are neither no-access nor guard pages
fn is_scannable(state: VIRTUAL_ALLOCATION_TYPE, protect: PAGE_PROTECTION_FLAGS) -> bool {
    state == MEM_COMMIT && (protect.0 & (PAGE_NOACCESS.0 | PAGE_GUARD.0)) == 0
}

impl Drop for WindowsProcess {
    fn drop(&mut self) {
        // SAFETY: the handle came from OpenProcess and is closed exactly once.
        unsafe {
            let _ = CloseHandle(self.handle);
        }
    }
}
