use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Errors raised by [`crate::SegmentWriter`] and [`crate::repo`].
#[derive(Debug, Error)]
pub enum WalError {
    #[error("wal directory {0} does not exist or is not readable")]
    DirUnreadable(PathBuf, #[source] io::Error),

    #[error("failed to open or create segment {0}")]
    SegmentOpen(PathBuf, #[source] io::Error),

    #[error("failed to append to segment {0}")]
    SegmentWrite(PathBuf, #[source] io::Error),

    #[error("fsync failed on segment {0}")]
    Fsync(PathBuf, #[source] io::Error),

    #[error("failed to rotate past segment {0}")]
    Rotate(PathBuf, #[source] io::Error),
}
