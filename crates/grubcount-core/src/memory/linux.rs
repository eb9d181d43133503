//! Linux backend (native or Proton/Wine) using procfs
//!
//! Under Proton the game runs as a Wine process, so discovery matches the
//! image name against the whole command line rather than `comm`.

use std::fs::{self, File};
use std::io::ErrorKind;
use std::os::unix::fs::FileExt;
use std::path::PathBuf;

use tracing::debug;

use crate::error::{Error, Result};
use crate::memory::{MemoryAccess, MemoryRegion, ProcessProvider, ReadMemory};

#[derive(Debug, Clone, Copy, Default)]
pub struct LinuxProvider;

impl ProcessProvider for LinuxProvider {
    type Process = LinuxProcess;

    fn find_process(&self, name: &str) -> Option<u32> {
        let needle = name.to_lowercase();
        let own_pid = std::process::id();

        let entries = fs::read_dir("/proc").ok()?;
        entries
            .filter_map(|entry| entry.ok()?.file_name().to_str()?.parse::<u32>().ok())
            .filter(|&pid| pid != own_pid)
            .filter(|&pid| {
                fs::read(format!("/proc/{pid}/cmdline"))
                    .map(|raw| cmdline_matches(&raw, &needle))
                    .unwrap_or(false)
            })
            .min()
    }

    fn attach(&self, pid: u32) -> Result<LinuxProcess> {
        let maps = maps_path(pid);
        if !maps.exists() {
            return Err(Error::Attach {
                pid,
                message: format!(
                    "Cannot access {}. Run as the same user or root.",
                    maps.display()
                ),
            });
        }

        let mem = File::open(format!("/proc/{pid}/mem")).map_err(|e| Error::Attach {
            pid,
            message: match e.kind() {
                ErrorKind::PermissionDenied => {
                    format!("{e}. Run as the same user or root.")
                }
                _ => e.to_string(),
            },
        })?;

        debug!("Opened /proc/{}/mem", pid);
        Ok(LinuxProcess { pid, mem })
    }
}

fn maps_path(pid: u32) -> PathBuf {
    PathBuf::from(format!("/proc/{pid}/maps"))
}

/// Case-insensitive match of `needle` (already lowercased) against a
/// NUL-separated `/proc/<pid>/cmdline`.
fn cmdline_matches(raw: &[u8], needle: &str) -> bool {
    if raw.is_empty() {
        return false;
    }
    let cmdline: String = String::from_utf8_lossy(raw)
        .chars()
        .map(|c| if c == '\0' { ' ' } else { c })
        .collect();
    cmdline.to_lowercase().contains(needle)
}

/// Parse one `/proc/<pid>/maps` line into a region if it is readable.
///
/// Format: `start-end perms offset dev inode [pathname]`
fn parse_maps_line(line: &str) -> Option<MemoryRegion> {
    let mut fields = line.split_whitespace();
    let range = fields.next()?;
    let perms = fields.next()?;
    if !perms.contains('r') {
        return None;
    }

    let (start, end) = range.split_once('-')?;
    let start = u64::from_str_radix(start, 16).ok()?;
    let end = u64::from_str_radix(end, 16).ok()?;
    if end <= start {
        return None;
    }
    Some(MemoryRegion::new(start, end - start))
}

#[derive(Debug)]
pub struct LinuxProcess {
    pid: u32,
    mem: File,
}

impl ReadMemory for LinuxProcess {
    fn read_bytes(&self, address: u64, size: usize) -> Result<Vec<u8>> {
        let mut buffer = vec![0u8; size];
        let mut filled = 0;

        while filled < size {
            match self.mem.read_at(&mut buffer[filled..], address + filled as u64) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) if filled == 0 => {
                    return Err(Error::MemoryReadFailed {
                        address,
                        message: e.to_string(),
                    });
                }
                Err(_) => break,
            }
        }

        if filled == 0 && size > 0 {
            return Err(Error::MemoryReadFailed {
                address,
                message: "no bytes read".to_string(),
            });
        }

        buffer.truncate(filled);
        Ok(buffer)
    }
}

impl MemoryAccess for LinuxProcess {
    fn pid(&self) -> u32 {
        self.pid
    }

    fn readable_regions(&self) -> Result<Vec<MemoryRegion>> {
        let maps = fs::read_to_string(maps_path(self.pid))
            .map_err(|e| Error::RegionQueryFailed(e.to_string()))?;
        Ok(maps.lines().filter_map(parse_maps_line).collect())
    }

    fn is_alive(&self) -> bool {
        maps_path(self.pid).exists()
    }
}
