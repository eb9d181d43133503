use std::fs;
use std::path::{Path, PathBuf};

use crate::error::Result;

/// Placeholder replaced by the decimal count
pub const COUNT_PLACEHOLDER: &str = "{count}";

pub struct StreamOutput {
    enabled: bool,
    path: PathBuf,
    template: String,
}

impl StreamOutput {
    pub fn new(enabled: bool, path: impl Into<PathBuf>, template: impl Into<String>) -> Self {
        Self {
            enabled,
            path: path.into(),
            template: template.into(),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Substitute `count` into the template.
    pub fn render(&self, count: u32) -> String {
        self.template.replace(COUNT_PLACEHOLDER, &count.to_string())
    }

    /// Overwrite the output file with the rendered count.
    ///
    /// Unknown values are never written; the file keeps the last known count.
    pub fn write_count(&self, count: u32) -> Result<()> {
        if !self.enabled {
            return Ok(());
        }
        fs::write(&self.path, self.render(count))?;
        Ok(())
    }
}

/// Display text for a possibly unknown count
pub fn format_count(count: Option<u32>) -> String {
    match count {
        Some(value) => value.to_string(),
        None => "?".to_string(),
    }
}
