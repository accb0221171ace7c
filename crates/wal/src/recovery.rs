//! Crash-recovery replay.
//!
//! [`replay`] reconstructs in-memory state from an on-disk WAL at startup by
//! reading each segment in file order and, within a file, byte order — the
//! same order the group-commit barrier appended them in, so the replayed
//! sequence matches what clients observed.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use tracing::warn;

use crate::error::WalError;

/// One parsed WAL entry line. `GET` is never persisted, so only the two
/// mutating verbs appear here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Entry {
    Set(String, String),
    Del(String),
}

/// Format `entry` exactly as it will be written to the WAL: `VERB ARG1[
/// ARG2]\n`, single-space separated, LF-terminated, no trailing whitespace.
pub fn encode(entry: &Entry) -> Vec<u8> {
    match entry {
        Entry::Set(k, v) => format!("SET {k} {v}\n").into_bytes(),
        Entry::Del(k) => format!("DEL {k}\n").into_bytes(),
    }
}

/// Parse a single already-trimmed WAL line. Returns `None` for anything that
/// isn't a well-formed `SET`/`DEL` entry; callers log and skip.
fn parse_line(line: &str) -> Option<Entry> {
    let mut parts = line.split(' ');
    match parts.next()? {
        "SET" => {
            let key = parts.next()?;
            let value = parts.next()?;
            if parts.next().is_some() || key.is_empty() || value.is_empty() {
                return None;
            }
            Some(Entry::Set(key.to_string(), value.to_string()))
        }
        "DEL" => {
            let key = parts.next()?;
            if parts.next().is_some() || key.is_empty() {
                return None;
            }
            Some(Entry::Del(key.to_string()))
        }
        _ => None,
    }
}

/// Replay `segments` (in the given order — callers pass
/// [`crate::SegmentWriter::segment_paths`]) into the map via `apply_set` and
/// `apply_del`.
///
/// Lines that fail to parse are skipped with a warning; a trailing partial
/// line (no terminating `\n`) is skipped silently. Errors from `apply_del`
/// are ignored — deleting a key that was never set is not a replay failure.
pub fn replay(
    segments: &[impl AsRef<Path>],
    mut apply_set: impl FnMut(&str, &str),
    mut apply_del: impl FnMut(&str),
) -> Result<(), WalError> {
    for path in segments {
        replay_segment(path.as_ref(), &mut apply_set, &mut apply_del)?;
    }
    Ok(())
}

fn replay_segment(
    path: &Path,
    apply_set: &mut impl FnMut(&str, &str),
    apply_del: &mut impl FnMut(&str),
) -> Result<(), WalError> {
    let file = File::open(path).map_err(|e| WalError::SegmentOpen(path.to_path_buf(), e))?;
    let mut reader = BufReader::new(file);
    let mut offset: u64 = 0;

    loop {
        let mut raw = Vec::new();
        let n = reader
            .read_until(b'\n', &mut raw)
            .map_err(|e| WalError::SegmentOpen(path.to_path_buf(), e))?;
        if n == 0 {
            break; // EOF
        }
        if raw.last() != Some(&b'\n') {
            // Trailing partial line: skipped silently.
            break;
        }
        raw.pop(); // drop the trailing '\n'

        match std::str::from_utf8(&raw).ok().and_then(parse_line) {
            Some(Entry::Set(k, v)) => apply_set(&k, &v),
            Some(Entry::Del(k)) => apply_del(&k),
            None => warn!(
                path = %path.display(),
                offset,
                "skipping malformed WAL line during replay"
            ),
        }

        offset += n as u64;
    }

    Ok(())
}
