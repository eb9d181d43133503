//! Quit keys for `grubcount watch`.

use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use grubcount_core::ShutdownSignal;
use tracing::debug;

const KEY_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Watch the terminal for a quit key while the grub counter runs.
///
/// A quit key triggers the signal the poll worker sleeps on. Shutdown from
/// anywhere else ends this thread on its next key poll.
pub fn spawn_keyboard_monitor(shutdown: Arc<ShutdownSignal>) -> JoinHandle<()> {
    thread::spawn(move || {
        debug!("Keyboard monitor started");

        while !shutdown.is_shutdown() {
            if event::poll(KEY_POLL_INTERVAL).unwrap_or(false)
                && let Ok(Event::Key(key_event)) = event::read()
                && should_shutdown(&key_event)
            {
                debug!("Shutdown key pressed: {:?}", key_event.code);
                shutdown.trigger();
                break;
            }
        }

        debug!("Keyboard monitor stopped");
    })
}

/// Esc, q, Q and Ctrl+C quit; key releases are ignored so a quit key is
/// handled once on terminals that report both edges.
fn should_shutdown(event: &KeyEvent) -> bool {
    if event.kind == KeyEventKind::Release {
        return false;
    }
    match event.code {
        KeyCode::Esc | KeyCode::Char('q') | KeyCode::Char('Q') => true,
        KeyCode::Char('c') => event.modifiers.contains(KeyModifiers::CONTROL),
        _ => false,
    }
}
