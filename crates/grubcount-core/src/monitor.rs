//! Background poll worker
//!
//! The worker thread is the sole owner of the tracker (and with it the
//! process handle and cached node). It reports through a one-way channel
//! that the front end drains on a short timer; nothing mutable is shared.

use std::sync::Arc;
use std::sync::mpsc::{self, Receiver};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use tracing::{debug, warn};

use crate::error::Result;
use crate::memory::ProcessProvider;
use crate::shutdown::ShutdownSignal;
use crate::tracker::{Tracker, TrackerEvent};

pub struct Monitor {
    events: Receiver<TrackerEvent>,
    shutdown: Arc<ShutdownSignal>,
    worker: Option<JoinHandle<()>>,
}

impl Monitor {
    /// Move `tracker` onto a worker thread and start polling.
    pub fn spawn<P>(
        tracker: Tracker<P>,
        interval: Duration,
        shutdown: Arc<ShutdownSignal>,
    ) -> Result<Self>
    where
        P: ProcessProvider + Send + 'static,
        P::Process: Send,
    {
        let (tx, rx) = mpsc::channel();
        let worker_shutdown = Arc::clone(&shutdown);

        let worker = thread::Builder::new()
            .name("grubcount-poll".to_string())
            .spawn(move || {
                let mut tracker = tracker;
                debug!("Poll worker started");
                tracker.run(&worker_shutdown, interval, |event| {
                    if tx.send(event).is_err() {
                        // consumer is gone
                        worker_shutdown.trigger();
                    }
                });
                debug!("Poll worker stopped");
            })?;

        Ok(Self {
            events: rx,
            shutdown,
            worker: Some(worker),
        })
    }

    /// Take every event queued since the last drain without blocking.
    pub fn drain(&self) -> Vec<TrackerEvent> {
        self.events.try_iter().collect()
    }

    pub fn is_finished(&self) -> bool {
        self.worker.as_ref().is_none_or(|w| w.is_finished())
    }

    /// Signal the worker and wait for it to release the process.
    pub fn stop(mut self) {
        self.join();
    }

    fn join(&mut self) {
        self.shutdown.trigger();
        if let Some(worker) = self.worker.take()
            && worker.join().is_err()
        {
            warn!("Poll worker panicked");
        }
    }
}

impl Drop for Monitor {
    fn drop(&mut self) {
        self.join();
    }
}
