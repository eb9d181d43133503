//! Single-shot read of the live count.

use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use grubcount_core::memory::layout::{process, timing};
use grubcount_core::{
    Candidate, DefaultProvider, MemoryAccess, ScanReport, ShutdownSignal, SignatureScanner,
};
use tracing::info;

use crate::retry::wait_for_process;

pub fn run(process_name: Option<String>, verbose: bool) -> Result<ExitCode> {
    let process_name = process_name.unwrap_or_else(|| process::PROCESS_NAME.to_string());

    let shutdown = Arc::new(ShutdownSignal::new());
    let shutdown_ctrlc = Arc::clone(&shutdown);
    ctrlc::set_handler(move || {
        info!("Received shutdown signal, stopping...");
        shutdown_ctrlc.trigger();
    })?;

    let provider = DefaultProvider::default();
    let interval = Duration::from_millis(timing::POLL_INTERVAL_MS);
    let process = wait_for_process(&provider, &process_name, interval, &shutdown, || {
        println!("Waiting for {} to be launched... (Ctrl+C to cancel)", process_name);
    })?;
    let Some(process) = process else {
        println!("Cancelled.");
        return Ok(ExitCode::SUCCESS);
    };

    println!("Attached to {} (pid={})", process_name, process.pid());

    let report = SignatureScanner::new().locate(&process);
    if verbose {
        for line in candidate_report(&report) {
            println!("{}", line);
        }
    }

    match report.selection.value() {
        Some(value) => {
            println!("Grub Count: {}", value);
            Ok(ExitCode::SUCCESS)
        }
        None => {
            println!("Count not found (game not in episode 3?)");
            Ok(ExitCode::FAILURE)
        }
    }
}

fn describe(c: &Candidate) -> String {
    format!(
        "  candidate: addr=0x{:08X}  value={:6}  local_ptrs={}",
        c.node_address, c.value, c.locality_score
    )
}

/// Every candidate by address, then the active subset
fn candidate_report(report: &ScanReport) -> Vec<String> {
    let mut sorted: Vec<&Candidate> = report.candidates.iter().collect();
    sorted.sort_by_key(|c| c.node_address);

    let mut lines: Vec<String> = sorted.into_iter().map(describe).collect();
    let active: Vec<String> = report
        .active_candidates()
        .map(|c| format!("(0x{:08X}, {}, {})", c.node_address, c.value, c.locality_score))
        .collect();
    lines.push(format!("  active candidates: [{}]", active.join(", ")));

    if report.selection.is_ambiguous() {
        lines.push("  warning: several candidates tied on score and value".to_string());
    }
    lines
}
