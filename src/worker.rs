//! Worker side of the pipeline: pull chunks, split into lines, mark keys.
//!
//! Workers share nothing but the queue receiver and the [`PresenceSet`].
//! Metrics are accumulated in a worker-local [`WorkerMetrics`] and merged by
//! the driver after the join, so the hot loop touches no shared counters.

use crossbeam_channel::Receiver;
use memchr::memchr_iter;
use tracing::debug;

use crate::address::key_for_line;
use crate::config::MalformedPolicy;
use crate::error::CountError;
use crate::pipeline::CancelFlag;
use crate::presence::PresenceSet;
use crate::splitter::LineChunk;

/// Per-line rules every worker applies.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LineRules {
    /// Malformed-line handling.
    pub policy: MalformedPolicy,
    /// Longest accepted line, excluding its `'\n'`. Matches the splitter's
    /// carry limit so a line is judged the same wherever block edges fall.
    pub max_record_len: usize,
}

/// Per-worker counters.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct WorkerMetrics {
    /// Chunks scanned.
    pub chunks: u64,
    /// Chunks dropped unscanned because the run was aborting.
    pub chunks_dropped: u64,
    /// Bytes scanned.
    pub bytes: u64,
    /// Lines converted to keys.
    pub lines: u64,
    /// Lines skipped as malformed.
    pub malformed: u64,
    /// Keys this worker inserted first.
    pub inserted: u64,
}

impl WorkerMetrics {
    /// Adds `other` into `self`.
    pub fn merge(&mut self, other: &WorkerMetrics) {
        self.chunks += other.chunks;
        self.chunks_dropped += other.chunks_dropped;
        self.bytes += other.bytes;
        self.lines += other.lines;
        self.malformed += other.malformed;
        self.inserted += other.inserted;
    }
}

/// Scans one buffer of whole lines starting at stream offset `offset`,
/// marking every key in `presence`.
///
/// A final segment without a terminator is treated as a line; an empty
/// final segment is not.
///
/// # Errors
///
/// [`CountError::RecordTooLarge`] for the first line longer than
/// `rules.max_record_len`. Lines before it have already been marked.
#[inline]
pub fn scan_lines(
    data: &[u8],
    offset: u64,
    presence: &PresenceSet,
    rules: LineRules,
    metrics: &mut WorkerMetrics,
) -> Result<(), CountError> {
    let mut start = 0usize;
    for end in memchr_iter(b'\n', data) {
        mark_line(&data[start..end], offset + start as u64, presence, rules, metrics)?;
        start = end + 1;
    }
    if start < data.len() {
        mark_line(&data[start..], offset + start as u64, presence, rules, metrics)?;
    }
    metrics.bytes += data.len() as u64;
    Ok(())
}

#[inline(always)]
fn mark_line(
    line: &[u8],
    offset: u64,
    presence: &PresenceSet,
    rules: LineRules,
    metrics: &mut WorkerMetrics,
) -> Result<(), CountError> {
    if line.len() > rules.max_record_len {
        return Err(CountError::RecordTooLarge {
            offset,
            len: line.len(),
            max: rules.max_record_len,
        });
    }
    match key_for_line(line, rules.policy) {
        Some(key) => {
            metrics.lines += 1;
            if presence.mark(key) {
                metrics.inserted += 1;
            }
        }
        None => metrics.malformed += 1,
    }
    Ok(())
}

/// Worker loop: drains `queue` until it is closed and empty.
///
/// Once `cancel` or `abort` is raised, remaining chunks are still received
/// (so their buffers go back to the pool and a blocked producer can make
/// progress) but are dropped unscanned. A scan error raises `abort` and is
/// returned after the queue is drained.
pub fn run_worker(
    worker_id: usize,
    queue: Receiver<LineChunk>,
    presence: &PresenceSet,
    rules: LineRules,
    cancel: &CancelFlag,
    abort: &CancelFlag,
) -> Result<WorkerMetrics, CountError> {
    let mut metrics = WorkerMetrics::default();
    let mut failure = None;
    for chunk in queue.iter() {
        if cancel.is_cancelled() || abort.is_cancelled() {
            metrics.chunks_dropped += 1;
            continue;
        }
        if let Err(err) = scan_lines(chunk.data(), chunk.offset(), presence, rules, &mut metrics) {
            abort.cancel();
            failure = Some(err);
            metrics.chunks_dropped += 1;
            continue;
        }
        metrics.chunks += 1;
    }
    debug!(
        worker_id,
        chunks = metrics.chunks,
        dropped = metrics.chunks_dropped,
        lines = metrics.lines,
        malformed = metrics.malformed,
        inserted = metrics.inserted,
        failed = failure.is_some(),
        "worker finished"
    );
    match failure {
        Some(err) => Err(err),
        None => Ok(metrics),
    }
}
