//! The active-segment append path of the write-ahead log.
//!
//! [`SegmentWriter`] owns the set of WAL segment files in a directory. It
//! appends batches of bytes, fsyncing after every successful write, and
//! rotates to a fresh, strictly-higher-numbered segment whenever the active
//! one would exceed [`crate::Options::seg_max_bytes`]. Rotation always
//! splits on a `\n` record boundary, never mid-record.

use std::path::PathBuf;

use tracing::debug;

use crate::error::WalError;
use crate::repo::{FileLike, Repo};

/// Slack kept below `seg_max_bytes` before a segment is considered full.
///
/// A batch that fits within the margin is appended without rotating; one
/// that doesn't is written, then the segment is rotated before the next
/// write.
pub(crate) const MARGIN: u64 = 10;

/// Owns the active WAL segment and performs size-bounded rotation.
pub struct SegmentWriter<R: Repo> {
    repo: R,
    seg_max_bytes: u64,
    active_num: u64,
    active: R::Segment,
    active_size: u64,
}

impl<R: Repo> SegmentWriter<R> {
    /// Discover existing segments in `repo`, resuming the highest-numbered
    /// one if it still has room, or starting a fresh one otherwise. Creates
    /// segment `1` if the repo is empty.
    pub fn open(repo: R, seg_max_bytes: u64) -> Result<Self, WalError> {
        assert!(seg_max_bytes > 0, "seg_max_bytes must be strictly positive");

        let mut segments = repo
            .existing_segments()
            .map_err(|e| WalError::DirUnreadable(repo.segment_path(0), e))?;
        segments.sort_unstable();

        let (active_num, active_size, resume) = match segments.last() {
            Some(&highest) => {
                let size = repo
                    .segment_len(highest)
                    .map_err(|e| WalError::SegmentOpen(repo.segment_path(highest), e))?;
                if size + MARGIN < seg_max_bytes {
                    (highest, size, true)
                } else {
                    (highest + 1, 0, false)
                }
            }
            None => (1, 0, false),
        };

        let active = if resume {
            repo.open_segment_for_append(active_num)
                .map_err(|e| WalError::SegmentOpen(repo.segment_path(active_num), e))?
        } else {
            repo.create_segment(active_num)
                .map_err(|e| WalError::SegmentOpen(repo.segment_path(active_num), e))?
        };

        debug!(segment = active_num, size = active_size, "wal opened");

        Ok(Self {
            repo,
            seg_max_bytes,
            active_num,
            active,
            active_size,
        })
    }

    /// Append `bytes` to the active segment, rotating as needed so that no
    /// segment is split mid-record.
    ///
    /// Returns the number of bytes written (always `bytes.len()` on
    /// success). Calls fsync before returning `Ok`.
    pub fn write(&mut self, bytes: &[u8]) -> Result<usize, WalError> {
        if bytes.is_empty() {
            return Ok(0);
        }

        let prospective = self.active_size + bytes.len() as u64;

        // Case 1: fits with margin.
        if prospective + MARGIN <= self.seg_max_bytes {
            self.append_and_fsync(bytes)?;
            return Ok(bytes.len());
        }

        // Case 2: exceeds the margin, but the raw sum still fits.
        if prospective <= self.seg_max_bytes {
            self.append_and_fsync(bytes)?;
            self.rotate()?;
            return Ok(bytes.len());
        }

        // Case 3: raw sum exceeds seg_max_bytes. Find the largest split index
        // `i <= seg_max_bytes - active_size` such that bytes[i-1] == b'\n'.
        let budget = (self.seg_max_bytes.saturating_sub(self.active_size) as usize).min(bytes.len());
        let split_in_budget = bytes[..budget].iter().rposition(|&b| b == b'\n').map(|i| i + 1);

        if let Some(i) = split_in_budget.filter(|&i| i > 0) {
            let (head, tail) = bytes.split_at(i);
            self.append_and_fsync(head)?;
            self.rotate()?;
            if tail.is_empty() {
                return Ok(bytes.len());
            }
            return self.write(tail).map(|_| bytes.len());
        }

        // No record boundary fits the remaining budget at all.
        if self.active_size == 0 {
            // The active segment is already empty, so this single record is
            // simply larger than `seg_max_bytes`: write it whole rather than
            // splitting mid-record, giving it sole occupancy of this segment.
            let first_newline = bytes.iter().position(|&b| b == b'\n').map(|i| i + 1).unwrap_or(bytes.len());
            let (head, tail) = bytes.split_at(first_newline);
            self.append_and_fsync(head)?;
            if tail.is_empty() {
                return Ok(bytes.len());
            }
            self.rotate()?;
            return self.write(tail).map(|_| bytes.len());
        }

        // The active segment has existing data but no room for even one more
        // record within budget: rotate to a fresh segment and retry there.
        self.rotate()?;
        self.write(bytes)
    }

    fn append_and_fsync(&mut self, bytes: &[u8]) -> Result<(), WalError> {
        use std::io::Write as _;

        self.active
            .write_all(bytes)
            .map_err(|e| WalError::SegmentWrite(self.repo.segment_path(self.active_num), e))?;
        self.active
            .fsync()
            .map_err(|e| WalError::Fsync(self.repo.segment_path(self.active_num), e))?;
        self.active_size += bytes.len() as u64;
        Ok(())
    }

    fn rotate(&mut self) -> Result<(), WalError> {
        let next_num = self.active_num + 1;
        let next = self
            .repo
            .create_segment(next_num)
            .map_err(|e| WalError::Rotate(self.repo.segment_path(next_num), e))?;
        debug!(from = self.active_num, to = next_num, "wal rotated");
        self.active_num = next_num;
        self.active = next;
        self.active_size = 0;
        Ok(())
    }

    /// All segment paths, ascending numeric order — used by
    /// [`crate::recovery::replay`].
    pub fn segment_paths(&self) -> Result<Vec<PathBuf>, WalError> {
        let mut segments = self
            .repo
            .existing_segments()
            .map_err(|e| WalError::DirUnreadable(self.repo.segment_path(0), e))?;
        segments.sort_unstable();
        Ok(segments.into_iter().map(|n| self.repo.segment_path(n)).collect())
    }

    /// Close the active segment's file handle.
    pub fn close(self) -> Result<(), WalError> {
        debug!(segment = self.active_num, "wal closed");
        Ok(())
    }

    #[cfg(test)]
    pub(crate) fn active_segment_number(&self) -> u64 {
        self.active_num
    }
}
