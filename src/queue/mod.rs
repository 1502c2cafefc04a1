//! Upload queue state machine.
//!
//! Includes:
//! - Entry lifecycle: Waiting → Uploading → Complete | Error
//! - Single-flight processor draining Waiting entries in stable queue order
//! - User actions: add, remove, retry
//! - Confirmed-result application (results for removed ids are discarded)
//!
//! "Concurrency" here is overlapping asynchronous work, not parallelism: the
//! entry list is only mutated by user actions and by the single processor,
//! and the in-flight flag keeps the processor single-flight. No two storage
//! calls for one queue are ever overlapping.

pub mod entry;

use crate::common::is_accepted_image;
use crate::operations::compression::{self, CompressionSettings};
use crate::operations::preview;
use crate::remote::session::SessionProvider;
use crate::remote::storage::ObjectStorage;
use anyhow::{Result, bail};
use entry::{EntrySnapshot, EntryState, ImageEntry};
use log::{debug, info, warn};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};
use uuid::Uuid;

const SESSION_ABSENT_MESSAGE: &str = "no active session; sign in and retry the upload";

#[derive(Debug, Clone)]
pub struct QueueSettings {
    /// Target container handed to the storage endpoint with every object.
    pub container: String,
    pub preview_dir: PathBuf,
    pub compression: CompressionSettings,
    pub max_images: usize,
}

impl Default for QueueSettings {
    fn default() -> Self {
        Self {
            container: "listing-images".to_string(),
            preview_dir: PathBuf::from("./preview"),
            compression: CompressionSettings::default(),
            max_images: crate::common::MAX_IMAGES_PER_LISTING,
        }
    }
}

/// Controller for one form session's image uploads.
///
/// Owned exclusively by that session; entries are never shared across
/// sessions. Generic over the storage and session collaborators so both can
/// be replaced in tests.
pub struct UploadQueue<S, P> {
    entries: Mutex<Vec<ImageEntry>>,
    /// Single-flight flag: at most one processor drains the queue at a time,
    /// which also guarantees at most one entry is ever Uploading.
    in_flight: AtomicBool,
    storage: S,
    session: P,
    settings: QueueSettings,
}

impl<S, P> UploadQueue<S, P>
where
    S: ObjectStorage + 'static,
    P: SessionProvider + 'static,
{
    pub fn new(storage: S, session: P, settings: QueueSettings) -> Self {
        Self {
            entries: Mutex::new(Vec::new()),
            in_flight: AtomicBool::new(false),
            storage,
            session,
            settings,
        }
    }

    // ────────────────────────────────────────────────────────────────
    // User actions
    // ────────────────────────────────────────────────────────────────

    /// Add an image to the queue in Waiting state and schedule a drain.
    ///
    /// The file type must be an accepted image extension and the per-listing
    /// image cap must not be reached. Preview generation failure is tolerated;
    /// the entry simply has no preview.
    pub async fn add(self: &Arc<Self>, file_name: &str, bytes: Vec<u8>) -> Result<Uuid> {
        if !is_accepted_image(file_name) {
            bail!("unsupported image type: {:?}", file_name);
        }

        let id = Uuid::new_v4();
        let source = Arc::new(bytes);

        // Decoding and resizing the preview is CPU-bound, same as compression.
        let input = Arc::clone(&source);
        let preview_dir = self.settings.preview_dir.clone();
        let job = tokio::task::spawn_blocking(move || {
            preview::generate_preview(&input, &preview_dir, id)
        });
        let preview = match job.await {
            Ok(Ok(handle)) => Some(handle),
            Ok(Err(error)) => {
                warn!("preview generation failed for '{file_name}': {error:#}");
                None
            }
            Err(join_error) => {
                warn!("preview task aborted for '{file_name}': {join_error}");
                None
            }
        };

        {
            let mut entries = self.lock_entries();
            if entries.len() >= self.settings.max_images {
                drop(entries);
                if let Some(handle) = preview {
                    handle.release();
                }
                bail!(
                    "a listing can hold at most {} images",
                    self.settings.max_images
                );
            }
            entries.push(ImageEntry {
                id,
                file_name: file_name.to_string(),
                source,
                preview,
                state: EntryState::Waiting,
            });
        }

        self.schedule_pump();
        Ok(id)
    }

    /// Remove an entry, releasing its preview immediately.
    ///
    /// An entry that never started is simply skipped by the selector; one
    /// already uploading finishes, but its result is discarded because the id
    /// no longer exists.
    pub fn remove(&self, id: Uuid) -> bool {
        let mut entries = self.lock_entries();
        let Some(position) = entries.iter().position(|entry| entry.id == id) else {
            return false;
        };
        let entry = entries.remove(position);
        drop(entries);
        if let Some(handle) = entry.preview {
            handle.release();
        }
        debug!("removed entry {id} ('{}')", entry.file_name);
        true
    }

    /// Reset an Error entry to Waiting and schedule a drain.
    ///
    /// Any other state is left untouched and `false` is returned, so invoking
    /// retry repeatedly while the entry is already Waiting or Uploading has no
    /// effect, and a Complete entry can never be re-uploaded.
    pub fn retry(self: &Arc<Self>, id: Uuid) -> bool {
        let transitioned = {
            let mut entries = self.lock_entries();
            match entries.iter_mut().find(|entry| entry.id == id) {
                Some(entry) if matches!(entry.state, EntryState::Error { .. }) => {
                    entry.state = EntryState::Waiting;
                    true
                }
                _ => false,
            }
        };
        if transitioned {
            self.schedule_pump();
        }
        transitioned
    }

    /// Discard the whole form session: drop every entry and release previews.
    pub fn dispose(&self) {
        let mut entries = self.lock_entries();
        for entry in entries.drain(..) {
            if let Some(handle) = entry.preview {
                handle.release();
            }
        }
    }

    // ────────────────────────────────────────────────────────────────
    // Observation
    // ────────────────────────────────────────────────────────────────

    pub fn snapshot(&self) -> Vec<EntrySnapshot> {
        self.lock_entries().iter().map(EntrySnapshot::from).collect()
    }

    /// True when no entry is Waiting or Uploading.
    pub fn is_settled(&self) -> bool {
        !self
            .lock_entries()
            .iter()
            .any(|entry| entry.state.is_pending())
    }

    // ────────────────────────────────────────────────────────────────
    // Processor
    // ────────────────────────────────────────────────────────────────

    /// Drain Waiting entries one at a time, in queue order.
    ///
    /// Idempotent against concurrent invocation: a second caller observing
    /// the in-flight flag returns immediately, so overlapping pumps (one per
    /// queue mutation) are harmless.
    pub async fn pump(&self) {
        loop {
            if self.in_flight.swap(true, Ordering::SeqCst) {
                return;
            }
            while let Some((id, file_name, source)) = self.start_next() {
                self.process_entry(id, file_name, source).await;
            }
            self.in_flight.store(false, Ordering::SeqCst);
            // A retry or add racing the drain may have queued work between the
            // last selection and the flag release.
            if !self.has_waiting() {
                return;
            }
        }
    }

    /// Wait until no entry is Waiting or Uploading.
    pub async fn settle(&self) {
        loop {
            self.pump().await;
            if self.is_settled() {
                return;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    }

    /// Select the first Waiting entry and mark it Uploading.
    ///
    /// Entries whose turn arrives while no session is present are marked
    /// Error on the spot, without any network attempt.
    fn start_next(&self) -> Option<(Uuid, String, Arc<Vec<u8>>)> {
        let mut entries = self.lock_entries();
        while let Some(entry) = entries
            .iter_mut()
            .find(|entry| entry.state == EntryState::Waiting)
        {
            if !self.session.session_present() {
                warn!("skipped upload of '{}': no active session", entry.file_name);
                entry.state = EntryState::Error {
                    message: SESSION_ABSENT_MESSAGE.to_string(),
                };
                continue;
            }
            entry.state = EntryState::Uploading;
            return Some((entry.id, entry.file_name.clone(), Arc::clone(&entry.source)));
        }
        None
    }

    async fn process_entry(&self, id: Uuid, file_name: String, source: Arc<Vec<u8>>) {
        let start_time = Instant::now();

        let (bytes, outcome) =
            compression::compress_image(source, &self.settings.compression).await;
        debug!("compression outcome for '{file_name}': {outcome:?}");

        let result = self
            .storage
            .put_object(&self.settings.container, &file_name, &bytes)
            .await;

        let duration = format!("{:?}", start_time.elapsed());
        match &result {
            Ok(url) => info!(duration = &*duration; "uploaded '{}' -> {}", file_name, url),
            Err(error) => {
                warn!(duration = &*duration; "upload of '{}' failed: {error:#}", file_name)
            }
        }

        self.apply_result(id, result);
    }

    /// Apply a confirmed upload result to the entry that started it.
    ///
    /// Local state is mutated only here, never speculatively before the call
    /// resolves. An id that no longer exists (removed mid-upload) discards
    /// the result, and an entry no longer Uploading is left untouched, so a
    /// Complete entry can never silently change state.
    fn apply_result(&self, id: Uuid, result: Result<String>) {
        let mut entries = self.lock_entries();
        let Some(entry) = entries.iter_mut().find(|entry| entry.id == id) else {
            debug!("discarding upload result for removed entry {id}");
            return;
        };
        if entry.state != EntryState::Uploading {
            debug!(
                "ignoring upload result for entry {id} in state {:?}",
                entry.state
            );
            return;
        }
        entry.state = match result {
            Ok(url) => EntryState::Complete { url },
            Err(error) => EntryState::Error {
                message: format!("{error:#}"),
            },
        };
    }

    fn has_waiting(&self) -> bool {
        self.lock_entries()
            .iter()
            .any(|entry| entry.state == EntryState::Waiting)
    }

    fn lock_entries(&self) -> MutexGuard<'_, Vec<ImageEntry>> {
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Re-trigger the processor after a queue mutation. No persistent
    /// background loop exists; the queue is self-draining through these
    /// pokes, and the in-flight flag makes extra pokes no-ops.
    fn schedule_pump(self: &Arc<Self>) {
        if !self.has_waiting() {
            return;
        }
        let queue = Arc::clone(self);
        tokio::spawn(async move {
            queue.pump().await;
        });
    }
}
