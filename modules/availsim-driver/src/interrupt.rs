//! The Interrupt Handler (C11): watches for Ctrl-C and makes that
//! observable from anywhere in the event loop without threading a signal
//! handler through every call site.

use tokio::sync::watch;

/// Wraps a `watch::Receiver<bool>` that flips to `true` the moment a
/// `SIGINT` arrives. Checked at the top of the event loop and at sleep
/// boundaries, mirroring the original simulator's `signal.signal(SIGINT, ...)`
/// handler but without a process-wide global.
#[derive(Clone)]
pub struct InterruptHandler {
    rx: watch::Receiver<bool>,
}

impl InterruptHandler {
    /// Spawns a background task that resolves the watch channel on the
    /// first Ctrl-C.
    pub fn spawn() -> Self {
        let (tx, rx) = watch::channel(false);
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                let _ = tx.send(true);
            }
        });
        Self { rx }
    }

    pub fn from_receiver(rx: watch::Receiver<bool>) -> Self {
        Self { rx }
    }

    pub fn is_interrupted(&self) -> bool {
        *self.rx.borrow()
    }
}
