use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// A file in the storage root. The name is its only identifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct StoredFile {
    pub name: String,
    pub size: u64,
}

/// Completion percentage of an in-flight upload, broadcast to every observer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ProgressEvent {
    pub progress: u8,
}

impl ProgressEvent {
    /// Builds an event, clamping the percentage to 100.
    pub fn new(progress: u8) -> Self {
        Self {
            progress: progress.min(100),
        }
    }
}
