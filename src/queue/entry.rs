use crate::operations::preview::PreviewHandle;
use std::path::PathBuf;
use std::sync::Arc;
use uuid::Uuid;

/// Lifecycle state of a queued image.
///
/// The URL exists only for Complete entries and the message only for Error
/// entries; the enum encodes both invariants.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntryState {
    Waiting,
    Uploading,
    Complete { url: String },
    Error { message: String },
}

impl EntryState {
    /// Waiting or Uploading; submission is refused while any entry is pending.
    pub fn is_pending(&self) -> bool {
        matches!(self, EntryState::Waiting | EntryState::Uploading)
    }

    pub fn url(&self) -> Option<&str> {
        match self {
            EntryState::Complete { url } => Some(url),
            _ => None,
        }
    }

    pub fn error_message(&self) -> Option<&str> {
        match self {
            EntryState::Error { message } => Some(message),
            _ => None,
        }
    }
}

pub(crate) struct ImageEntry {
    pub id: Uuid,
    pub file_name: String,
    pub source: Arc<Vec<u8>>,
    pub preview: Option<PreviewHandle>,
    pub state: EntryState,
}

/// Observable copy of one queue entry, safe to hand to UIs and tests.
#[derive(Debug, Clone)]
pub struct EntrySnapshot {
    pub id: Uuid,
    pub file_name: String,
    pub state: EntryState,
    pub preview_path: Option<PathBuf>,
}

impl From<&ImageEntry> for EntrySnapshot {
    fn from(entry: &ImageEntry) -> Self {
        Self {
            id: entry.id,
            file_name: entry.file_name.clone(),
            state: entry.state.clone(),
            preview_path: entry.preview.as_ref().map(|p| p.path().to_path_buf()),
        }
    }
}
