//! Import graph discovery.
//!
//! - `extract`: specifiers of a single source file
//! - `resolve`: specifier → file on disk
//! - `walker`: transitive walk from the entry script

mod builtin;
mod extract;
mod resolve;
mod specifier;
mod walker;

pub use extract::ParseError;
pub use resolve::{NodeResolver, ResolveError, Resolver};
pub use walker::{ExternalNames, VisitedSet, WalkError, walk};
