//! Process-wide shutdown state.
//!
//! Ctrl+C is the only global signal the supervisor reacts to.
//! `SHUTDOWN_TX` wakes the supervisor loop so it can stop the script.

use std::sync::OnceLock;

use tokio::sync::watch;

/// Shutdown signal sender for the supervisor loop
static SHUTDOWN_TX: OnceLock<watch::Sender<bool>> = OnceLock::new();

fn sender() -> &'static watch::Sender<bool> {
    SHUTDOWN_TX.get_or_init(|| watch::Sender::new(false))
}

/// Setup the global Ctrl+C handler. Call once at program start
///
/// The handler only records the request; the supervisor stops the running
/// script and picks the exit code.
pub fn setup_shutdown_handler() -> anyhow::Result<()> {
    let tx = sender();
    ctrlc::set_handler(move || request_shutdown(tx))
        .map_err(|e| anyhow::anyhow!("failed to set Ctrl+C handler: {}", e))
}

fn request_shutdown(tx: &watch::Sender<bool>) {
    tx.send_replace(true);
}

/// Receiver that observes `true` once shutdown has been requested
pub fn shutdown_signal() -> watch::Receiver<bool> {
    sender().subscribe()
}
