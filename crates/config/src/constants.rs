//! Fixed names and default locations used by the updater
//!
//! The directory names below the state directory and install root are part
//! of the on-disk format shared with the update server tooling, so they are
//! not configurable.

pub const DEFAULT_INSTALL_ROOT: &str = "/";
pub const DEFAULT_STATE_DIR: &str = "/var/lib/osup";
pub const DEFAULT_MIX_STATE_DIR: &str = "/usr/share/mix/update/www";
/// Bundle tracking directory, relative to the install root
pub const DEFAULT_BUNDLES_DIR: &str = "usr/share/osup/bundles";

/// Content store, below the state directory
pub const STAGED_DIR: &str = "staged";
/// Scratch directory for renaming directory payloads, below the state directory
pub const TMP_RENAME_DIR: &str = "tmprenamedir";
/// Debug log directory, below the state directory
pub const LOGS_DIR: &str = "logs";

/// Anomaly recovery area, below the install root
pub const LOST_FOUND_DIR: &str = "lost+found";

/// Prefix of staged temporaries placed next to their final path
pub const UPDATE_PREFIX: &str = ".update.";
