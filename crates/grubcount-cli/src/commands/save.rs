//! Grub count from save files.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use grubcount_core::SaveEntry;
use grubcount_core::save::{default_save_dir, read_count, scan_save_dir};

const COL_NAME: usize = 30;
const COL_COUNT: usize = 40;

pub fn run(file: Option<PathBuf>, dir: Option<PathBuf>) -> Result<ExitCode> {
    if let Some(file) = file {
        return Ok(match read_count(&file) {
            Ok(count) => {
                println!("Grub Count: {}", count);
                ExitCode::SUCCESS
            }
            Err(e) => {
                println!("Error: {}", e);
                ExitCode::FAILURE
            }
        });
    }

    let explicit_dir = dir.is_some();
    let save_dir = match dir {
        Some(dir) => dir,
        None => default_save_dir().context("Cannot determine the Documents directory")?,
    };

    let entries = scan_save_dir(&save_dir);
    if entries.is_empty() {
        println!("No .save files found in:\n  {}", save_dir.display());
        if !explicit_dir {
            println!("Tip: use --dir <folder> to specify a different save directory");
        }
        return Ok(ExitCode::FAILURE);
    }

    for line in render_table(&entries) {
        println!("{}", line);
    }
    Ok(ExitCode::SUCCESS)
}

fn render_table(entries: &[SaveEntry]) -> Vec<String> {
    let mut lines = vec![
        format!("{:<COL_NAME$} {:>COL_COUNT$}", "File", "Grub Count"),
        "-".repeat(COL_NAME + COL_COUNT + 1),
    ];
    lines.extend(entries.iter().map(|entry| {
        let count = match &entry.count {
            Ok(count) => count.to_string(),
            Err(e) => e.to_string(),
        };
        format!("{:<COL_NAME$} {:>COL_COUNT$}", entry.file_name(), count)
    }));
    lines
}
