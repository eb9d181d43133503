//! Grub count from Telltale `.save` files
//!
//! Save files start with a fixed magic; every byte after it is XOR 0xFF.
//! The decoded stream contains a 16-byte marker directly followed by the
//! little-endian count.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use memchr::memmem;
use thiserror::Error;
use tracing::debug;

use crate::memory::layout::{read_u32_le, save};

#[derive(Debug, Error)]
pub enum SaveError {
    #[error("file not found: {}", .0.display())]
    FileNotFound(PathBuf),

    #[error("read error: {0}")]
    Read(#[from] io::Error),

    #[error("not a valid save file (invalid magic)")]
    InvalidMagic,

    #[error("no grub count (wrong chapter?)")]
    CountNotFound,

    #[error("file corrupted (too short)")]
    Truncated,
}

/// One row of a save directory listing
#[derive(Debug)]
pub struct SaveEntry {
    pub path: PathBuf,
    pub count: Result<u32, SaveError>,
}

impl SaveEntry {
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default()
    }
}

/// Decode the grub count from raw save file contents.
pub fn decode_count(raw: &[u8]) -> Result<u32, SaveError> {
    let body = raw
        .strip_prefix(&save::FILE_MAGIC[..])
        .ok_or(SaveError::InvalidMagic)?;

    let decoded: Vec<u8> = body.iter().map(|b| b ^ save::XOR_KEY).collect();
    let idx = memmem::find(&decoded, &save::SIGNATURE).ok_or(SaveError::CountNotFound)?;

    read_u32_le(&decoded, idx + save::SIGNATURE.len()).ok_or(SaveError::Truncated)
}

/// Read and decode a save file.
pub fn read_count<P: AsRef<Path>>(path: P) -> Result<u32, SaveError> {
    let path = path.as_ref();
    if !path.is_file() {
        return Err(SaveError::FileNotFound(path.to_path_buf()));
    }
    let raw = fs::read(path)?;
    decode_count(&raw)
}

/// `*.save` files in `dir`, newest name first.
///
/// A missing or unreadable directory yields an empty list.
pub fn list_saves<P: AsRef<Path>>(dir: P) -> Vec<PathBuf> {
    let dir = dir.as_ref();
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) => {
            debug!("Cannot read save directory {}: {}", dir.display(), e);
            return Vec::new();
        }
    };

    let mut saves: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| path.is_file() && path.extension().is_some_and(|ext| ext == "save"))
        .collect();
    saves.sort();
    saves.reverse();
    saves
}

/// Decode every save in `dir`, keeping per-file errors.
pub fn scan_save_dir<P: AsRef<Path>>(dir: P) -> Vec<SaveEntry> {
    list_saves(dir)
        .into_iter()
        .map(|path| {
            let count = read_count(&path);
            SaveEntry { path, count }
        })
        .collect()
}

/// `<Documents>/Telltale Games/Tales of Monkey Island 3`
pub fn default_save_dir() -> Option<PathBuf> {
    let documents = dirs::document_dir().or_else(|| dirs::home_dir().map(|h| h.join("Documents")))?;
    Some(documents.join("Telltale Games").join("Tales of Monkey Island 3"))
}
