//! Counting driver: splitter → bounded queue → worker pool → Presence Set.
//!
//! ```text
//!   ChunkSource ──► LineSplitter ──► bounded(queue_depth) ──► worker 0..N
//!   (driver thread, sequential)        (backpressure)            │
//!                                                               ▼
//!                                                         PresenceSet
//!                                                               │
//!                              join (barrier) ──► count() ◄─────┘
//! ```
//!
//! # Lifecycle
//! 1. Validate config, size blocks and the buffer pool, allocate a fresh
//!    Presence Set.
//! 2. Spawn scoped workers that each drain the queue.
//! 3. Run the splitter on the calling thread, publishing chunks in file
//!    order. A full queue blocks the splitter.
//! 4. Drop the sender unconditionally, closing the queue. On a producer
//!    error the abort flag is raised so workers discard queued chunks. A
//!    worker that rejects an over-long line raises the same flag, which
//!    stops the splitter at its next chunk.
//! 5. Leave the scope (joins every worker), then either count or return
//!    the error. When several over-long lines were seen, the one starting
//!    first is reported. A run never yields both.
//!
//! Allocation of the pool and the Presence Set is fallible and reported as
//! [`CountError::Alloc`] before any thread starts.
//!
//! # Sizing
//! The pool holds `queue_depth + workers + 1` buffers: every queued chunk,
//! every chunk being scanned, and the block being filled. With the queue
//! bounding the producer, acquisition cannot starve. Peak buffer memory is
//! `pool_capacity * (block_len + max_record_len)`; see
//! [`CountConfig::pool_capacity`].

use std::ops::ControlFlow;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use tracing::{info, warn};

use crate::block_pool::{BlockPool, BlockPoolConfig};
use crate::config::{CountConfig, IoMode, MIB};
use crate::error::CountError;
use crate::presence::PresenceSet;
use crate::source::{BufferedSource, ChunkSource, MappedSource};
use crate::splitter::{LineChunk, LineSplitter, SplitStats};
use crate::worker::{run_worker, LineRules, WorkerMetrics};

/// Cooperative cancellation shared between a caller and a running count.
///
/// Clones observe the same flag. Raising it makes the splitter stop before
/// its next read and workers discard chunks still queued; the run then
/// returns [`CountError::Cancelled`].
#[derive(Clone, Debug, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    /// Creates a flag in the not-cancelled state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests cancellation. Idempotent.
    #[inline]
    pub fn cancel(&self) {
        self.0.store(true, Ordering::Release);
    }

    /// Whether cancellation was requested.
    #[inline]
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// Summary of a completed counting run.
#[derive(Clone, Copy, Debug)]
pub struct CountReport {
    /// Distinct Address Keys observed.
    pub unique: u64,
    /// Lines converted to keys (duplicates included).
    pub lines: u64,
    /// Lines skipped as malformed.
    pub malformed: u64,
    /// Line Chunks handed to workers.
    pub chunks: u64,
    /// Bytes read from the source.
    pub bytes: u64,
    /// Worker threads used.
    pub workers: usize,
    /// Raw Block length used.
    pub block_len: usize,
    /// Wall-clock duration of the run.
    pub elapsed: Duration,
}

impl CountReport {
    /// Read throughput in MiB/s (0 for an instantaneous run).
    pub fn throughput_mib_s(&self) -> f64 {
        let secs = self.elapsed.as_secs_f64();
        if secs > 0.0 {
            (self.bytes as f64 / MIB as f64) / secs
        } else {
            0.0
        }
    }
}

/// Counts distinct IPv4 addresses in `path`.
///
/// `buffer_mib` sizes the read buffer in buffered mode and is ignored when
/// `use_mmap` is set. All other knobs take their defaults.
///
/// # Errors
///
/// Any I/O failure, an over-long record, or an invalid argument (for
/// example `workers == 0`).
pub fn count_unique(
    path: impl AsRef<Path>,
    workers: usize,
    buffer_mib: usize,
    use_mmap: bool,
) -> Result<u64, CountError> {
    let cfg = CountConfig {
        workers,
        buffer_mib,
        io_mode: if use_mmap {
            IoMode::Mapped
        } else {
            IoMode::Buffered
        },
        ..CountConfig::default()
    };
    count_unique_with(path, &cfg).map(|report| report.unique)
}

/// Counts distinct addresses in `path` with full configuration and report.
pub fn count_unique_with(
    path: impl AsRef<Path>,
    cfg: &CountConfig,
) -> Result<CountReport, CountError> {
    count_unique_cancellable(path, cfg, &CancelFlag::new())
}

/// Like [`count_unique_with`], aborting with [`CountError::Cancelled`] once
/// `cancel` is raised.
pub fn count_unique_cancellable(
    path: impl AsRef<Path>,
    cfg: &CountConfig,
    cancel: &CancelFlag,
) -> Result<CountReport, CountError> {
    cfg.validate()?;
    let path = path.as_ref();
    match cfg.io_mode {
        IoMode::Buffered => {
            let mut source = BufferedSource::open(path)?;
            count_source(&mut source, cfg, cancel)
        }
        IoMode::Mapped => {
            let mut source = MappedSource::open(path)?;
            count_source(&mut source, cfg, cancel)
        }
    }
}

/// Runs the full pipeline over an already opened [`ChunkSource`].
///
/// `cfg.io_mode` only influences block sizing here; the source decides how
/// bytes are actually read.
pub fn count_source<S: ChunkSource + ?Sized>(
    source: &mut S,
    cfg: &CountConfig,
    cancel: &CancelFlag,
) -> Result<CountReport, CountError> {
    cfg.validate()?;
    let start = Instant::now();

    let file_len = source.len_hint().unwrap_or(0);
    let block_len = cfg.resolve_block_len(file_len);
    let mut splitter = LineSplitter::new(block_len, cfg.max_record_len);
    let pool = BlockPool::new(BlockPoolConfig {
        buffer_len: splitter.buffer_len(),
        total_buffers: cfg.pool_capacity(),
    })?;
    let mut presence = PresenceSet::new()?;
    let abort = CancelFlag::new();
    let rules = LineRules {
        policy: cfg.malformed,
        max_record_len: cfg.max_record_len,
    };

    info!(
        workers = cfg.workers,
        block_len,
        queue_depth = cfg.effective_queue_depth(),
        pool_buffers = pool.capacity(),
        pool_bytes = cfg.peak_buffer_bytes(file_len),
        io_mode = ?cfg.io_mode,
        policy = ?cfg.malformed,
        "counting run started"
    );

    let outcome = thread::scope(|scope| -> Result<(SplitStats, WorkerMetrics), CountError> {
        let (tx, rx) = crossbeam_channel::bounded::<LineChunk>(cfg.effective_queue_depth());

        let mut handles = Vec::with_capacity(cfg.workers);
        for worker_id in 0..cfg.workers {
            let queue = rx.clone();
            let presence = &presence;
            let abort = &abort;
            let spawned = thread::Builder::new()
                .name(format!("ipv4-worker-{worker_id}"))
                .spawn_scoped(scope, move || {
                    run_worker(worker_id, queue, presence, rules, cancel, abort)
                });
            match spawned {
                Ok(handle) => handles.push(handle),
                Err(err) => {
                    // Dropping `tx` on return lets already spawned workers exit.
                    abort.cancel();
                    return Err(CountError::Spawn(err));
                }
            }
        }
        drop(rx);

        let split = splitter.run(source, &pool, cancel, |chunk| {
            // A worker rejected a line; its error is collected at the join.
            if abort.is_cancelled() {
                return ControlFlow::Break(());
            }
            match tx.send(chunk) {
                Ok(()) => ControlFlow::Continue(()),
                // Every receiver is gone; only possible if all workers died.
                Err(_) => ControlFlow::Break(()),
            }
        });
        if split.is_err() {
            abort.cancel();
        }
        drop(tx);

        let mut metrics = WorkerMetrics::default();
        let mut worker_failure: Option<CountError> = None;
        for handle in handles {
            match handle.join() {
                Ok(Ok(local)) => metrics.merge(&local),
                Ok(Err(err)) => {
                    worker_failure = Some(match worker_failure {
                        Some(prev) => earliest_record(prev, err),
                        None => err,
                    });
                }
                Err(payload) => std::panic::resume_unwind(payload),
            }
        }

        match (split, worker_failure) {
            (Ok(stats), None) => Ok((stats, metrics)),
            (Ok(_), Some(err)) => Err(err),
            (Err(err), None) => Err(err),
            (Err(err), Some(worker_err)) => Err(earliest_record(err, worker_err)),
        }
    });

    let (split, metrics) = match outcome {
        Ok(parts) if !cancel.is_cancelled() => parts,
        Ok(_) => {
            warn!("counting run cancelled");
            return Err(CountError::Cancelled);
        }
        Err(err) => {
            warn!(error = %err, "counting run aborted");
            return Err(err);
        }
    };

    let report = CountReport {
        unique: presence.count(),
        lines: metrics.lines,
        malformed: metrics.malformed,
        chunks: split.chunks,
        bytes: split.bytes,
        workers: cfg.workers,
        block_len,
        elapsed: start.elapsed(),
    };
    debug_assert_eq!(metrics.chunks, split.chunks);
    debug_assert_eq!(metrics.inserted, report.unique);

    info!(
        unique = report.unique,
        lines = report.lines,
        malformed = report.malformed,
        chunks = report.chunks,
        bytes = report.bytes,
        elapsed_ms = report.elapsed.as_millis() as u64,
        "counting run finished"
    );
    Ok(report)
}

/// Picks the error to report when both the splitter and a worker failed, or
/// several workers did: the over-long record starting first, otherwise
/// `first`.
fn earliest_record(first: CountError, second: CountError) -> CountError {
    match (&first, &second) {
        (
            CountError::RecordTooLarge { offset: a, .. },
            CountError::RecordTooLarge { offset: b, .. },
        ) if b < a => second,
        _ => first,
    }
}
