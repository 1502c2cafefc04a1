pub mod bootstrap;
pub mod common;
pub mod config;
pub mod operations;
pub mod queue;
pub mod remote;
pub mod submission;

pub use config::IngestConfig;
pub use operations::compression::{CompressionOutcome, CompressionSettings, compress_image};
pub use queue::entry::{EntrySnapshot, EntryState};
pub use queue::{QueueSettings, UploadQueue};
pub use remote::session::{SessionProvider, TokenSession};
pub use remote::storage::{HttpObjectStorage, ObjectStorage};
pub use submission::{Condition, ListingForm, ListingPayload, SubmitError, assemble_payload};
