//! Flush coordinator: the single owner of the "when do we write the
//! journal" decision.
//!
//! One long-lived worker thread owns all debounce state (`is_dirty`,
//! `needs_full_export`, the deadline). External code communicates only
//! through a bounded channel of typed events; the debounce timer is the
//! channel receive timeout against the owned deadline. This removes the
//! shared-boolean races: there is no flag anywhere that two threads can
//! both write.
//!
//! Guarantees:
//! - Any number of `mark_dirty` calls within the debounce window produce
//!   exactly one flush.
//! - `flush_now` bypasses the debounce but serializes behind an
//!   in-progress flush (the worker is single-threaded).
//! - `shutdown` is idempotent; the first call performs at most one final
//!   flush, and every call returns the same result.
//! - Events arriving while a flush is running stay queued and make the
//!   state dirty again afterwards.

use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, SyncSender};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use tracing::{debug, warn};

use beads_store::{META_EXPORT_HASHES, META_JOURNAL_HASH, Storage};

use crate::codec;
use crate::export;

/// Default debounce window between a mark and the flush it triggers.
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_secs(5);

/// Mark-event buffer size; absorbs bursts without blocking callers.
const EVENT_BUFFER: usize = 64;

/// Idle receive timeout when no deadline is armed.
const IDLE_WAIT: Duration = Duration::from_secs(3600);

/// Errors surfaced by flush operations.
///
/// Kept `Clone` so a shutdown result can be replayed to repeat callers.
#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum FlushError {
    /// The store was closed before or during the flush.
    #[error("store is inactive")]
    StoreInactive,

    /// The export failed; the dirty set is retained.
    #[error("journal export failed: {0}")]
    Export(String),

    /// The coordinator worker is gone.
    #[error("flush coordinator terminated")]
    Terminated,
}

enum FlushEvent {
    MarkDirty { full: bool },
    FlushNow { reply: SyncSender<Result<(), FlushError>> },
    Shutdown { reply: SyncSender<Result<(), FlushError>> },
}

/// Handle to the coordinator. Cheap to clone via `Arc` at the call site;
/// all methods are thread-safe.
pub struct FlushCoordinator {
    tx: SyncSender<FlushEvent>,
    handle: Mutex<Option<JoinHandle<()>>>,
    shutdown_result: Mutex<Option<Result<(), FlushError>>>,
    flush_count: Arc<AtomicU64>,
    failure_count: Arc<AtomicU64>,
}

impl FlushCoordinator {
    /// Starts the coordinator worker for the given store and journal.
    pub fn new(store: Arc<dyn Storage>, journal_path: PathBuf, debounce: Duration) -> Self {
        let (tx, rx) = mpsc::sync_channel(EVENT_BUFFER);
        let flush_count = Arc::new(AtomicU64::new(0));
        let failure_count = Arc::new(AtomicU64::new(0));

        let worker = Worker {
            store,
            journal_path,
            debounce,
            flush_count: Arc::clone(&flush_count),
            failure_count: Arc::clone(&failure_count),
        };
        let handle = std::thread::Builder::new()
            .name("beads-flush".into())
            .spawn(move || worker.run(rx))
            .expect("failed to spawn flush coordinator thread");

        Self {
            tx,
            handle: Mutex::new(Some(handle)),
            shutdown_result: Mutex::new(None),
            flush_count,
            failure_count,
        }
    }

    /// Records that the store changed; never blocks. The actual flush
    /// happens after the debounce window elapses.
    pub fn mark_dirty(&self, full_export: bool) {
        let event = FlushEvent::MarkDirty { full: full_export };
        if self.tx.try_send(event).is_err() && full_export {
            // The queue is saturated with pending marks, so dirtiness is
            // already guaranteed; only the full-export promotion must not
            // be dropped.
            let _ = self.tx.send(FlushEvent::MarkDirty { full: true });
        }
    }

    /// Flushes synchronously, bypassing the debounce. Blocks until the
    /// flush completes and returns its result.
    pub fn flush_now(&self) -> Result<(), FlushError> {
        let (reply_tx, reply_rx) = mpsc::sync_channel(1);
        if self.tx.send(FlushEvent::FlushNow { reply: reply_tx }).is_err() {
            return Err(FlushError::Terminated);
        }
        reply_rx.recv().unwrap_or(Err(FlushError::Terminated))
    }

    /// Shuts the coordinator down, flushing once if dirty. Safe to call
    /// any number of times from any thread; every call returns the first
    /// call's result.
    pub fn shutdown(&self) -> Result<(), FlushError> {
        let mut guard = self
            .shutdown_result
            .lock()
            .unwrap_or_else(|poison| poison.into_inner());
        if let Some(ref result) = *guard {
            return result.clone();
        }

        let (reply_tx, reply_rx) = mpsc::sync_channel(1);
        let result = match self.tx.send(FlushEvent::Shutdown { reply: reply_tx }) {
            Ok(()) => reply_rx.recv().unwrap_or(Err(FlushError::Terminated)),
            // Worker already exited (disconnect path flushed for us).
            Err(_) => Ok(()),
        };

        if let Some(handle) = self
            .handle
            .lock()
            .unwrap_or_else(|poison| poison.into_inner())
            .take()
        {
            let _ = handle.join();
        }

        *guard = Some(result.clone());
        result
    }

    /// Number of successful flushes since startup.
    pub fn flush_count(&self) -> u64 {
        self.flush_count.load(Ordering::SeqCst)
    }

    /// Number of failed flushes since startup.
    pub fn failure_count(&self) -> u64 {
        self.failure_count.load(Ordering::SeqCst)
    }
}

// ---------------------------------------------------------------------------
// Worker
// ---------------------------------------------------------------------------

struct Worker {
    store: Arc<dyn Storage>,
    journal_path: PathBuf,
    debounce: Duration,
    flush_count: Arc<AtomicU64>,
    failure_count: Arc<AtomicU64>,
}

impl Worker {
    /// The run loop. All debounce state lives in this stack frame.
    fn run(&self, rx: Receiver<FlushEvent>) {
        let mut is_dirty = false;
        let mut needs_full = false;
        let mut deadline: Option<Instant> = None;

        loop {
            let wait = deadline
                .map(|d| d.saturating_duration_since(Instant::now()))
                .unwrap_or(IDLE_WAIT);

            match rx.recv_timeout(wait) {
                Ok(FlushEvent::MarkDirty { full }) => {
                    is_dirty = true;
                    needs_full |= full;
                    deadline = Some(Instant::now() + self.debounce);
                }
                Ok(FlushEvent::FlushNow { reply }) => {
                    let result = self.perform_flush(needs_full);
                    if result.is_ok() {
                        is_dirty = false;
                        needs_full = false;
                        deadline = None;
                    }
                    let _ = reply.send(result);
                }
                Ok(FlushEvent::Shutdown { reply }) => {
                    let result = if is_dirty {
                        self.perform_flush(needs_full)
                    } else {
                        Ok(())
                    };
                    let _ = reply.send(result);
                    return;
                }
                Err(RecvTimeoutError::Timeout) => {
                    if is_dirty && deadline.is_some_and(|d| Instant::now() >= d) {
                        match self.perform_flush(needs_full) {
                            Ok(()) => {
                                is_dirty = false;
                                needs_full = false;
                                deadline = None;
                            }
                            Err(e) => {
                                // Keep the dirty state; retry on the next
                                // event rather than spinning on a broken
                                // journal.
                                warn!(error = %e, "debounced flush failed");
                                deadline = None;
                            }
                        }
                    } else if deadline.is_some_and(|d| Instant::now() >= d) {
                        deadline = None;
                    }
                }
                Err(RecvTimeoutError::Disconnected) => {
                    // Handle dropped without shutdown: final flush, then
                    // exit.
                    if is_dirty {
                        if let Err(e) = self.perform_flush(needs_full) {
                            warn!(error = %e, "final flush on disconnect failed");
                        }
                    }
                    return;
                }
            }
        }
    }

    /// One flush: integrity check, then incremental or full export.
    fn perform_flush(&self, mut full: bool) -> Result<(), FlushError> {
        if !self.store.is_active() {
            return Err(FlushError::StoreInactive);
        }

        // Journal integrity: if the file on disk no longer matches the
        // hash we recorded after our last write, someone edited it behind
        // our back. Per-issue hashes are then meaningless; fall back to a
        // full rewrite.
        match self.verify_journal_integrity() {
            Ok(true) => {}
            Ok(false) => {
                debug!("journal modified out-of-band; promoting to full export");
                let _ = self.store.set_metadata(META_EXPORT_HASHES, "{}");
                full = true;
            }
            Err(e) => {
                self.failure_count.fetch_add(1, Ordering::SeqCst);
                return Err(FlushError::Export(e.to_string()));
            }
        }

        let result = if full {
            export::full_export(self.store.as_ref(), &self.journal_path).map(|_| ())
        } else {
            export::incremental_export(self.store.as_ref(), &self.journal_path).map(|_| ())
        };

        match result {
            Ok(()) => {
                self.flush_count.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }
            Err(e) => {
                self.failure_count.fetch_add(1, Ordering::SeqCst);
                Err(FlushError::Export(e.to_string()))
            }
        }
    }

    /// Returns `false` when the journal was modified by someone else
    /// since our last export.
    fn verify_journal_integrity(&self) -> crate::Result<bool> {
        let recorded = self.store.get_metadata(META_JOURNAL_HASH)?;
        let Some(recorded) = recorded else {
            // Never exported: nothing to verify.
            return Ok(true);
        };
        if !self.journal_path.exists() {
            // The journal vanished; a full export restores it.
            return Ok(false);
        }
        let contents = std::fs::read_to_string(&self.journal_path)?;
        Ok(codec::journal_hash(&contents) == recorded)
    }
}
