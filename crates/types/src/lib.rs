#![deny(clippy::pedantic, unsafe_code)]
#![allow(clippy::module_name_repetitions)]

//! Core type definitions for the osup updater
//!
//! This crate provides the data model shared by the fetch and install
//! pipeline: file records, bundle subscriptions, the release manifest and
//! the reports each stage produces.

pub mod file;
pub mod manifest;
pub mod reports;
pub mod subscription;
pub mod version;

// Re-export commonly used types
pub use file::{is_install_ordered, sort_for_install, FileKind, FileRecord};
pub use manifest::{BundleEntry, Manifest};
pub use reports::{FailedPack, FetchReport, InstallReport, MissingPack};
pub use subscription::Subscription;
pub use version::Version;
