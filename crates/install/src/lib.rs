#![deny(clippy::pedantic, unsafe_code)]
#![allow(clippy::module_name_repetitions)]

//! Atomic installation for osup
//!
//! Files are first staged next to their targets as `.update.<name>`, the
//! filesystem is synced, and only then is each staged file renamed into
//! place, parents before children.

#[macro_use]
mod macros;

mod context;
mod finalize;
mod fix;
mod installer;
mod staging;

pub use context::InstallContext;
pub use finalize::{FinalizeOutcome, Finalizer};
pub use fix::{ManifestPathFixer, PathFixer};
pub use installer::Installer;
pub use staging::{update_name, StageOutcome, Stager};
