//! Utility modules shared by the walker, installer and supervisor.

pub mod exec;
pub mod path;
