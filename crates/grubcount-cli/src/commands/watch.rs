//! Continuous tracking mode.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use grubcount_core::memory::layout::timing;
use grubcount_core::{
    Config, DefaultProvider, Monitor, ShutdownSignal, Status, StreamOutput, Tracker,
    TrackerEvent, format_count,
};
use owo_colors::OwoColorize;
use tracing::{debug, info, warn};

use crate::cli::WatchArgs;
use crate::input;

/// Run the watcher until Ctrl+C, Esc or q
pub fn run(args: WatchArgs) -> Result<ExitCode> {
    let config_path = Config::default_path();
    let mut settings = match &config_path {
        Some(path) => Config::load_or_default(path),
        None => {
            warn!("No config directory available, settings will not persist");
            Config::default()
        }
    };
    apply_overrides(&mut settings, args);

    let shutdown = Arc::new(ShutdownSignal::new());
    let shutdown_ctrlc = Arc::clone(&shutdown);
    ctrlc::set_handler(move || {
        info!("Received shutdown signal, stopping...");
        shutdown_ctrlc.trigger();
    })?;

    let _keyboard_handle = input::spawn_keyboard_monitor(Arc::clone(&shutdown));

    let mut watcher = Watcher::new(&settings, config_path);

    info!("grubcount {}", env!("CARGO_PKG_VERSION"));
    if watcher.output.is_enabled() {
        println!(
            "Counting grubs... writing to {} (Press Esc or q to quit)",
            watcher.output.path().display()
        );
    } else {
        println!("Counting grubs... (Press Esc or q to quit)");
    }
    watcher.show_last_known();

    let tracker = Tracker::new(DefaultProvider::default(), settings.process_name.clone());
    let monitor = Monitor::spawn(tracker, settings.poll_interval(), Arc::clone(&shutdown))?;

    let drain_interval = Duration::from_millis(timing::EVENT_DRAIN_INTERVAL_MS);
    loop {
        for event in monitor.drain() {
            watcher.handle(event);
        }
        if monitor.is_finished() || shutdown.wait(drain_interval) {
            break;
        }
    }

    monitor.stop();
    println!("Stopped.");
    Ok(ExitCode::SUCCESS)
}

/// Command-line flags win over the stored config for this run only.
fn apply_overrides(config: &mut Config, args: WatchArgs) {
    if let Some(output) = args.output {
        config.output_file = output;
    }
    if let Some(template) = args.format {
        config.template = template;
    }
    if args.no_write {
        config.write_enabled = false;
    }
    if let Some(process) = args.process {
        config.process_name = process;
    }
    if let Some(interval_ms) = args.interval_ms {
        config.poll_interval_ms = interval_ms;
    }
}

struct Watcher {
    output: StreamOutput,
    config_path: Option<PathBuf>,
    last_count: Option<u32>,
    /// The console currently shows the last known count
    showing_last_known: bool,
}

impl Watcher {
    fn new(settings: &Config, config_path: Option<PathBuf>) -> Self {
        Self {
            output: StreamOutput::new(
                settings.write_enabled,
                settings.output_file.clone(),
                settings.template.clone(),
            ),
            config_path,
            last_count: settings.last_count,
            showing_last_known: false,
        }
    }

    fn handle(&mut self, event: TrackerEvent) {
        match event {
            TrackerEvent::Status(status) => {
                print_status(&status);
                if status.resets_display() {
                    self.show_last_known();
                }
            }
            TrackerEvent::Count(Some(value)) => {
                self.showing_last_known = false;
                println!("Grub Count: {}", value.bold());
                if let Err(e) = self.output.write_count(value) {
                    warn!("Failed to write {}: {}", self.output.path().display(), e);
                }
                self.remember(value);
            }
            TrackerEvent::Count(None) => {
                self.showing_last_known = false;
                println!("Grub Count: {}", format_count(None).dimmed());
            }
        }
    }

    /// Fall back to the last known count unless it is already on screen.
    ///
    /// Returns `true` if a line was printed.
    fn show_last_known(&mut self) -> bool {
        let Some(last) = self.last_count else {
            return false;
        };
        if self.showing_last_known {
            return false;
        }
        self.showing_last_known = true;
        println!("Grub Count: {} {}", last, "(last known)".dimmed());
        true
    }

    /// Persist a newly observed count.
    ///
    /// Only `last_count` changes in the stored file; flag overrides stay out of it.
    fn remember(&mut self, value: u32) {
        if self.last_count == Some(value) {
            return;
        }
        self.last_count = Some(value);

        let Some(path) = &self.config_path else {
            return;
        };
        let mut stored = Config::load_or_default(path);
        stored.last_count = Some(value);
        match stored.save(path) {
            Ok(()) => debug!("Saved last count {} to {}", value, path.display()),
            Err(e) => warn!("Failed to save config: {}", e),
        }
    }
}

fn print_status(status: &Status) {
    match status {
        Status::Connected { .. } => println!("{}", status.green()),
        Status::AttachFailed { .. } => println!("{}", status.red()),
        Status::NotFound => println!("{}", status.yellow()),
        Status::Waiting { .. } | Status::Exited { .. } => println!("{}", status.cyan()),
    }
}
