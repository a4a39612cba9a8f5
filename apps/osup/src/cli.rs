//! Command line interface definition

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// osup - fetch OS content packs and install them atomically
#[derive(Parser)]
#[command(name = "osup")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Fetch OS content packs and install them atomically")]
#[command(long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    #[command(flatten)]
    pub global: GlobalArgs,
}

/// Global arguments available for all commands
#[derive(Parser)]
pub struct GlobalArgs {
    /// Output in JSON format
    #[arg(long, global = true)]
    pub json: bool,

    /// Write JSON debug logs below the state directory
    #[arg(long, global = true)]
    pub debug: bool,

    /// Use alternate config file
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Install root
    #[arg(short = 'p', long, global = true, value_name = "ROOT")]
    pub path: Option<PathBuf>,

    /// State directory holding the content store
    #[arg(short = 'S', long, global = true, value_name = "DIR")]
    pub statedir: Option<PathBuf>,

    /// Content base URL
    #[arg(short = 'u', long, global = true, value_name = "URL")]
    pub url: Option<String>,

    /// Maximum number of concurrent pack downloads
    #[arg(long, global = true, value_name = "N")]
    pub max_parallel_downloads: Option<usize>,
}

/// Available commands
#[derive(Subcommand)]
pub enum Commands {
    /// Download and extract the packs for a set of bundle transitions
    Fetch {
        #[command(flatten)]
        manifest: ManifestArg,

        #[command(flatten)]
        subscriptions: SubscriptionsArg,

        /// Fail on the first pack that cannot be fetched
        #[arg(long)]
        required: bool,
    },

    /// Stage and finalize files whose content is already in the store
    Install {
        #[command(flatten)]
        manifest: ManifestArg,

        #[command(flatten)]
        files: FilesArg,

        /// Do not recreate missing target directories
        #[arg(long)]
        no_autofix: bool,
    },

    /// Fetch packs, then install the given files
    #[command(alias = "up")]
    Update {
        #[command(flatten)]
        manifest: ManifestArg,

        #[command(flatten)]
        subscriptions: SubscriptionsArg,

        #[command(flatten)]
        files: FilesArg,

        /// Fail on the first pack that cannot be fetched
        #[arg(long)]
        required: bool,

        /// Do not recreate missing target directories
        #[arg(long)]
        no_autofix: bool,
    },
}

impl Commands {
    /// Whether the command downloads anything
    pub fn fetches(&self) -> bool {
        !matches!(self, Self::Install { .. })
    }
}

#[derive(Args)]
pub struct ManifestArg {
    /// Release manifest (JSON)
    #[arg(id = "manifest", short, long = "manifest", value_name = "FILE")]
    pub path: PathBuf,
}

#[derive(Args)]
pub struct SubscriptionsArg {
    /// Bundle transitions to fetch packs for (JSON list)
    #[arg(id = "subscriptions", short, long = "subscriptions", value_name = "FILE")]
    pub path: PathBuf,
}

#[derive(Args)]
pub struct FilesArg {
    /// File records to install (JSON list)
    #[arg(id = "files", short, long = "files", value_name = "FILE")]
    pub path: PathBuf,
}
