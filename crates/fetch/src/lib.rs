#![deny(clippy::pedantic, unsafe_code)]
#![allow(clippy::module_name_repetitions)]

//! Pack fetching for osup
//!
//! Works out which bundles need a delta pack, downloads those packs with
//! bounded concurrency, and extracts each one into the content store as it
//! lands. Packs the server does not have are collected and reported once at
//! the end of the batch rather than failing it.

mod fetcher;
mod handler;
mod pack;
mod registry;

pub use fetcher::PackFetcher;
pub use pack::{mix_pack_path, pack_url, PackDescriptor};
pub use registry::{BundleRegistry, TrackingDirRegistry};
