//! Poll state machine with an incremental re-validation cache
//!
//! A full sweep touches hundreds of MB, so once the active node is known
//! each poll reads just its 4-byte count. The cached address is dropped and a
//! full scan runs whenever the cheap read cannot be trusted:
//!
//! - the read fails (node unmapped)
//! - the count decreased (save reloaded to an earlier point)
//! - the count jumped by more than 1 (save reloaded to a later point, or the
//!   stale address now aliases unrelated data)
//! - the last count was 0 (a dead decoy also reads 0)

use std::fmt;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::error::Error;
use crate::memory::{MemoryAccess, ProcessProvider};
use crate::scan::{SignatureScanner, read_count_at};
use crate::shutdown::ShutdownSignal;

/// Last-known-good node
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrackedNode {
    pub address: u64,
    pub last_value: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackerState {
    Unattached,
    /// Never scanned, or the last scan found nothing
    AttachedNoNode,
    Tracking(TrackedNode),
}

/// Human-readable connection status, reported on transitions
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Status {
    Waiting { process: String },
    Connected { process: String, pid: u32 },
    AttachFailed { message: String },
    Exited { process: String },
    NotFound,
}

impl Status {
    /// Whether a display should fall back to the last known count
    pub fn resets_display(&self) -> bool {
        matches!(self, Status::Waiting { .. } | Status::Exited { .. })
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Status::Waiting { process } => write!(f, "Waiting for {}...", process),
            Status::Connected { process, pid } => {
                write!(f, "Connected to {} (pid={})", process, pid)
            }
            Status::AttachFailed { message } => write!(f, "Cannot open process: {}", message),
            Status::Exited { process } => {
                write!(f, "Game exited. Waiting for {}...", process)
            }
            Status::NotFound => write!(f, "Count not found (game not in episode 3?)"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TrackerEvent {
    Status(Status),
    /// The observed count changed; `None` means unknown
    Count(Option<u32>),
}

/// Validate a cheap-path read against the cached count.
///
/// The count only ever grows by one between polls; anything else means the
/// cached node is stale.
pub fn accept_cached_read(last_value: u32, read: Option<u32>) -> Option<u32> {
    read.filter(|&value| value >= last_value && value <= last_value.saturating_add(1))
}

pub struct Tracker<P: ProcessProvider> {
    provider: P,
    process_name: String,
    scanner: SignatureScanner,
    process: Option<P::Process>,
    node: Option<TrackedNode>,
    /// Value emitted on a previous tick of this session
    emitted: Option<Option<u32>>,
    last_status: Option<Status>,
}

impl<P: ProcessProvider> Tracker<P> {
    pub fn new(provider: P, process_name: impl Into<String>) -> Self {
        Self {
            provider,
            process_name: process_name.into(),
            scanner: SignatureScanner::new(),
            process: None,
            node: None,
            emitted: None,
            last_status: None,
        }
    }

    pub fn state(&self) -> TrackerState {
        match (&self.process, self.node) {
            (None, _) => TrackerState::Unattached,
            (Some(_), None) => TrackerState::AttachedNoNode,
            (Some(_), Some(node)) => TrackerState::Tracking(node),
        }
    }

    pub fn process_name(&self) -> &str {
        &self.process_name
    }

    /// Run one tick and return the events it produced.
    pub fn poll(&mut self) -> Vec<TrackerEvent> {
        let mut events = Vec::new();

        if self.process.is_none() && !self.connect(&mut events) {
            return events;
        }

        let alive = self.process.as_ref().is_some_and(|p| p.is_alive());
        if !alive {
            self.release();
            let process = self.process_name.clone();
            self.report(&mut events, Status::Exited { process });
            return events;
        }

        let observed = self.observe();
        if self.emitted != Some(observed) {
            self.emitted = Some(observed);
            events.push(TrackerEvent::Count(observed));
            match observed {
                Some(_) => self.last_status = None,
                None => self.report(&mut events, Status::NotFound),
            }
        }
        events
    }

    /// Poll until `shutdown` triggers, sleeping `interval` between ticks.
    ///
    /// The process handle is released before returning.
    pub fn run<F>(&mut self, shutdown: &ShutdownSignal, interval: Duration, mut on_event: F)
    where
        F: FnMut(TrackerEvent),
    {
        while !shutdown.is_shutdown() {
            for event in self.poll() {
                on_event(event);
            }
            if shutdown.wait(interval) {
                break;
            }
        }
        self.release();
    }

    /// Drop the process handle and forget the cached node.
    pub fn release(&mut self) {
        if let Some(process) = self.process.take() {
            info!("Released process (pid={})", process.pid());
        }
        self.node = None;
        self.emitted = None;
    }

    fn connect(&mut self, events: &mut Vec<TrackerEvent>) -> bool {
        match self.provider.find_and_attach(&self.process_name) {
            Ok(process) => {
                let pid = process.pid();
                info!("Attached to {} (pid={})", self.process_name, pid);
                self.process = Some(process);
                self.node = None;
                self.emitted = None;
                let process = self.process_name.clone();
                self.report(events, Status::Connected { process, pid });
                true
            }
            Err(Error::ProcessNotFound(_)) => {
                let process = self.process_name.clone();
                self.report(events, Status::Waiting { process });
                false
            }
            Err(e) => {
                warn!("Attach failed: {}", e);
                let message = match e {
                    Error::Attach { message, .. } => message,
                    other => other.to_string(),
                };
                self.report(events, Status::AttachFailed { message });
                false
            }
        }
    }

    /// Determine this tick's count, via the cache when it can be trusted.
    fn observe(&mut self) -> Option<u32> {
        let process = self.process.as_ref()?;

        if let Some(node) = self.node
            && node.last_value != 0
        {
            let read = read_count_at(process, node.address);
            if let Some(value) = accept_cached_read(node.last_value, read) {
                self.node = Some(TrackedNode {
                    address: node.address,
                    last_value: value,
                });
                return Some(value);
            }
            debug!(
                "Cached node 0x{:08X} invalidated (last={}, read={:?}), rescanning",
                node.address, node.last_value, read
            );
        }

        let report = self.scanner.locate(process);
        self.node = report.selection.chosen().map(|c| TrackedNode {
            address: c.node_address,
            last_value: c.value,
        });
        self.node.map(|node| node.last_value)
    }

    fn report(&mut self, events: &mut Vec<TrackerEvent>, status: Status) {
        if self.last_status.as_ref() == Some(&status) {
            return;
        }
        self.last_status = Some(status.clone());
        events.push(TrackerEvent::Status(status));
    }
}
