//! Segment writer and crash-recovery reader for the ramdb write-ahead log.
//!
//! A WAL directory holds a sequence of segment files named `1`, `2`, … At
//! most one segment is open for append (the *active* segment) at any time;
//! older segments are immutable. [`SegmentWriter`] owns the active file
//! handle and rotates to a new segment when the configured size would be
//! exceeded, always splitting on a `\n` record boundary. [`recovery::replay`]
//! reconstructs state from an on-disk WAL at startup.

pub mod error;
pub mod recovery;
pub mod repo;
mod segment;

pub use error::WalError;
pub use recovery::{encode, replay, Entry};
pub use segment::SegmentWriter;

/// [`SegmentWriter`] configuration.
#[derive(Clone, Copy, Debug)]
pub struct Options {
    /// Maximum size in bytes a segment is allowed to grow to, modulo the
    /// rotation margin (see [`segment::MARGIN`]).
    pub seg_max_bytes: u64,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            seg_max_bytes: 64 * 1024 * 1024,
        }
    }
}
