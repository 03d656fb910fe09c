//! Error types for counting runs.
//!
//! Every variant is fatal: the pipeline aborts on the first one and the
//! caller receives either a count or an error, never both. The enum is
//! `#[non_exhaustive]`; consumers should include a fallback match arm.
//!
//! Malformed address lines are not errors. Depending on
//! [`MalformedPolicy`](crate::config::MalformedPolicy) they are skipped and
//! counted, or folded into a key without validation.

use std::fmt;
use std::io;
use std::path::PathBuf;

/// Errors from a counting run.
#[derive(Debug)]
#[non_exhaustive]
pub enum CountError {
    /// Opening or inspecting the input file failed.
    Open { path: PathBuf, source: io::Error },
    /// Memory-mapping the input file failed.
    Map(io::Error),
    /// A read from the Chunk Source failed.
    Read { offset: u64, source: io::Error },
    /// A line starting at `offset` is longer than the record limit.
    RecordTooLarge { offset: u64, len: usize, max: usize },
    /// No pooled buffer was available for the next block.
    PoolExhausted { capacity: usize },
    /// A run-scoped allocation (pool buffer or Presence Set) was refused.
    Alloc { bytes: usize },
    /// A worker thread could not be started.
    Spawn(io::Error),
    /// The run was cancelled through its [`CancelFlag`](crate::CancelFlag).
    Cancelled,
    /// The configuration cannot run.
    InvalidConfig { reason: &'static str },
}

impl CountError {
    /// Creates an open error carrying the offending path.
    #[inline]
    pub fn open(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Open {
            path: path.into(),
            source,
        }
    }

    /// Creates a read error at `offset`.
    #[inline]
    pub fn read(offset: u64, source: io::Error) -> Self {
        Self::Read { offset, source }
    }

    /// Creates a configuration error.
    #[inline]
    pub fn invalid_config(reason: &'static str) -> Self {
        Self::InvalidConfig { reason }
    }

    /// True for failures originating in file access or buffer allocation.
    pub fn is_io(&self) -> bool {
        matches!(
            self,
            Self::Open { .. }
                | Self::Map(_)
                | Self::Read { .. }
                | Self::PoolExhausted { .. }
                | Self::Alloc { .. }
                | Self::Spawn(_)
        )
    }
}

impl fmt::Display for CountError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Open { path, source } => {
                write!(f, "open file error: {}: {source}", path.display())
            }
            Self::Map(err) => write!(f, "memory map error: {err}"),
            Self::Read { offset, source } => {
                write!(f, "read from file error at offset {offset}: {source}")
            }
            Self::RecordTooLarge { offset, len, max } => write!(
                f,
                "record at offset {offset} exceeds {max} bytes (len {len})"
            ),
            Self::PoolExhausted { capacity } => {
                write!(f, "buffer pool exhausted (capacity {capacity})")
            }
            Self::Alloc { bytes } => write!(f, "failed to allocate {bytes} bytes"),
            Self::Spawn(err) => write!(f, "failed to spawn worker thread: {err}"),
            Self::Cancelled => write!(f, "counting run cancelled"),
            Self::InvalidConfig { reason } => write!(f, "invalid configuration: {reason}"),
        }
    }
}

impl std::error::Error for CountError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Open { source, .. } | Self::Read { source, .. } => Some(source),
            Self::Map(err) | Self::Spawn(err) => Some(err),
            _ => None,
        }
    }
}
