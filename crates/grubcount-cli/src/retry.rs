//! Waiting for the game process.

use std::time::Duration;

use anyhow::Result;
use grubcount_core::{Error, ProcessProvider, ShutdownSignal};
use tracing::debug;

/// Find and attach to `process_name`, retrying every `interval` until it
/// appears.
///
/// `on_waiting` runs once, before the first retry. Returns `Ok(None)` if
/// shutdown was signaled. Attach failures other than "not running" are
/// returned as errors.
pub fn wait_for_process<P, F>(
    provider: &P,
    process_name: &str,
    interval: Duration,
    shutdown: &ShutdownSignal,
    on_waiting: F,
) -> Result<Option<P::Process>>
where
    P: ProcessProvider,
    F: FnOnce(),
{
    let mut on_waiting = Some(on_waiting);
    let mut attempts = 0u32;

    loop {
        if shutdown.is_shutdown() {
            return Ok(None);
        }
        attempts += 1;

        match provider.find_and_attach(process_name) {
            Ok(process) => {
                debug!("Attached after {} attempt(s)", attempts);
                return Ok(Some(process));
            }
            Err(Error::ProcessNotFound(_)) => {
                if let Some(notify) = on_waiting.take() {
                    notify();
                }
            }
            Err(e) => return Err(e.into()),
        }

        // Wait before retry (interruptible)
        if shutdown.wait(interval) {
            return Ok(None);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use grubcount_core::{MemoryAccess, MemoryRegion, ReadMemory};
    use std::cell::Cell;
    use std::sync::Arc;
    use std::thread;

    #[derive(Debug)]
    struct StubProcess;

    impl ReadMemory for StubProcess {
        fn read_bytes(&self, address: u64, _size: usize) -> grubcount_core::Result<Vec<u8>> {
            Err(Error::MemoryReadFailed {
                address,
                message: "stub".to_string(),
            })
        }
    }

    impl MemoryAccess for StubProcess {
        fn pid(&self) -> u32 {
            7
        }

        fn readable_regions(&self) -> grubcount_core::Result<Vec<MemoryRegion>> {
            Ok(Vec::new())
        }

        fn is_alive(&self) -> bool {
            true
        }
    }

    /// Appears after `absent_for` lookups
    struct DelayedProvider {
        absent_for: u32,
        lookups: Cell<u32>,
        deny: bool,
    }

    impl DelayedProvider {
        fn new(absent_for: u32) -> Self {
            Self {
                absent_for,
                lookups: Cell::new(0),
                deny: false,
            }
        }
    }

    impl ProcessProvider for DelayedProvider {
        type Process = StubProcess;

        fn find_process(&self, _name: &str) -> Option<u32> {
            let n = self.lookups.get();
            self.lookups.set(n + 1);
            (n >= self.absent_for).then_some(7)
        }

        fn attach(&self, pid: u32) -> grubcount_core::Result<StubProcess> {
            if self.deny {
                return Err(Error::Attach {
                    pid,
                    message: "access denied".to_string(),
                });
            }
            Ok(StubProcess)
        }
    }

    #[test]
    fn test_attaches_when_process_appears() {
        let provider = DelayedProvider::new(2);
        let shutdown = ShutdownSignal::new();
        let waited = Cell::new(0);

        let process =
            wait_for_process(&provider, "game.exe", Duration::from_millis(1), &shutdown, || {
                waited.set(waited.get() + 1)
            })
            .unwrap();

        assert_eq!(process.map(|p| p.pid()), Some(7));
        assert_eq!(provider.lookups.get(), 3);
        assert_eq!(waited.get(), 1);
    }

    #[test]
    fn test_no_waiting_message_when_already_running() {
        let provider = DelayedProvider::new(0);
        let shutdown = ShutdownSignal::new();
        let waited = Cell::new(false);

        let process =
            wait_for_process(&provider, "game.exe", Duration::from_millis(1), &shutdown, || {
                waited.set(true)
            })
            .unwrap();
        assert!(process.is_some());
        assert!(!waited.get());
    }

    #[test]
    fn test_attach_error_is_returned() {
        let provider = DelayedProvider {
            deny: true,
            ..DelayedProvider::new(0)
        };
        let shutdown = ShutdownSignal::new();
        let err =
            wait_for_process(&provider, "game.exe", Duration::from_millis(1), &shutdown, || {})
                .unwrap_err();
        assert!(err.to_string().contains("access denied"));
    }

    #[test]
    fn test_shutdown_cancels_wait() {
        let shutdown = Arc::new(ShutdownSignal::new());
        let trigger = Arc::clone(&shutdown);
        let handle = thread::spawn(move || {
            thread::sleep(Duration::from_millis(30));
            trigger.trigger();
        });

        let provider = DelayedProvider::new(u32::MAX);
        let process =
            wait_for_process(&provider, "game.exe", Duration::from_secs(10), &shutdown, || {})
                .unwrap();
        assert!(process.is_none());
        handle.join().unwrap();
    }
}
