//! Core state shared across the codebase.

mod state;

pub use state::{setup_shutdown_handler, shutdown_signal};
