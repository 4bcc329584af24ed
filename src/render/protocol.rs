//! Protocol definitions shared between the render coordinator and the load worker.

use crate::error::ScopeError;
use crate::loader::{LoadProgress, LoadReport};
use crate::store::SessionStore;
use chrono::{DateTime, Utc};
use std::path::PathBuf;
use std::sync::Arc;

/// Identifier attached to cross-task requests so responses can be correlated.
pub type RequestId = u64;

/// Commands sent from the render coordinator to the load worker.
#[derive(Debug, Clone, PartialEq)]
pub enum LoadCommand {
    Load {
        request_id: RequestId,
        root: PathBuf,
        /// Only sessions modified at or after this instant are scanned.
        modified_after: Option<DateTime<Utc>>,
    },
    Shutdown,
}

/// Events emitted by the load worker back to the coordinator.
#[derive(Debug)]
pub enum LoadEvent {
    Progress {
        request_id: RequestId,
        progress: LoadProgress,
    },
    Loaded {
        request_id: RequestId,
        store: Arc<SessionStore>,
        report: LoadReport,
    },
    Failed {
        request_id: RequestId,
        error: ScopeError,
    },
}

impl LoadEvent {
    pub fn request_id(&self) -> RequestId {
        match self {
            LoadEvent::Progress { request_id, .. }
            | LoadEvent::Loaded { request_id, .. }
            | LoadEvent::Failed { request_id, .. } => *request_id,
        }
    }
}
