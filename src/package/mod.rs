//! Package bookkeeping.
//!
//! - `manifest`: declared ranges from `package.json`
//! - `environment`: what is already in `node_modules`
//! - `reconcile`: discovered names → pending install specs
//! - `install`: one installer invocation per batch

mod environment;
mod install;
mod manifest;
mod reconcile;
mod version;

pub use environment::{Environment, NodeModules};
pub use install::{InstallError, Installer, NpmInstaller, install_pending};
pub use manifest::{ManifestError, ManifestStore, PackageJson};
pub use reconcile::reconcile;
