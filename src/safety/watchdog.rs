//! Background watchdog monitor.
//!
//! Polls the gate on a fixed interval from its own thread, so a stalled
//! control loop still trips the heartbeat deadline and the continuous-time
//! ceiling.

use super::gate::SafetyGate;
use crate::error::Result;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::debug;

/// Start polling `gate` every `interval`.
///
/// Returns a guard; dropping it stops the thread.
///
/// # Errors
///
/// Returns an I/O error if the thread cannot be spawned.
pub fn start_watchdog_monitor(gate: Arc<SafetyGate>, interval: Duration) -> Result<WatchdogMonitor> {
    let cancelled = Arc::new(AtomicBool::new(false));
    let cancelled_clone = Arc::clone(&cancelled);

    let handle = thread::Builder::new()
        .name("safety-watchdog".to_string())
        .spawn(move || {
            debug!("Watchdog monitor started ({} ms interval)", interval.as_millis());
            while !cancelled_clone.load(Ordering::SeqCst) {
                thread::sleep(interval);
                if cancelled_clone.load(Ordering::SeqCst) {
                    break;
                }
                gate.poll();
            }
            debug!("Watchdog monitor stopped");
        })?;

    Ok(WatchdogMonitor {
        cancelled,
        handle: Some(handle),
    })
}

/// Guard that stops the monitor thread when dropped.
pub struct WatchdogMonitor {
    cancelled: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl Drop for WatchdogMonitor {
    fn drop(&mut self) {
        self.cancelled.store(true, Ordering::SeqCst);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}
