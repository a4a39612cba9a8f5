use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Unit a progress counter is measured in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProgressUnit {
    Bytes,
    Items,
}

/// Progress tracking events
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ProgressEvent {
    Started {
        id: String,
        operation: String,
        total: Option<u64>,
        unit: ProgressUnit,
    },

    Updated {
        id: String,
        current: u64,
        total: Option<u64>,
    },

    Completed {
        id: String,
        duration: Duration,
    },

    Failed {
        id: String,
        failure: super::FailureContext,
    },
}

impl ProgressEvent {
    /// Create a progress started event counting items
    pub fn started(id: impl Into<String>, operation: impl Into<String>, total: Option<u64>) -> Self {
        Self::Started {
            id: id.into(),
            operation: operation.into(),
            total,
            unit: ProgressUnit::Items,
        }
    }

    /// Create a progress started event counting bytes
    pub fn started_bytes(
        id: impl Into<String>,
        operation: impl Into<String>,
        total: Option<u64>,
    ) -> Self {
        Self::Started {
            id: id.into(),
            operation: operation.into(),
            total,
            unit: ProgressUnit::Bytes,
        }
    }

    pub fn updated(id: impl Into<String>, current: u64, total: Option<u64>) -> Self {
        Self::Updated {
            id: id.into(),
            current,
            total,
        }
    }

    pub fn completed(id: impl Into<String>, duration: Duration) -> Self {
        Self::Completed {
            id: id.into(),
            duration,
        }
    }

    pub fn failed(id: impl Into<String>, failure: super::FailureContext) -> Self {
        Self::Failed {
            id: id.into(),
            failure,
        }
    }

    /// Identifier of the tracked operation
    #[must_use]
    pub fn id(&self) -> &str {
        match self {
            Self::Started { id, .. }
            | Self::Updated { id, .. }
            | Self::Completed { id, .. }
            | Self::Failed { id, .. } => id,
        }
    }
}
