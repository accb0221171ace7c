//! Segment writer and recovery exercised against real files on disk,
//! mirroring spec scenarios S1, S2, and S4 (segment.rs's unit tests cover
//! the same rotation logic against the in-memory `Repo`; this suite checks
//! the real `std::fs`-backed path and end-to-end replay).

use std::fs;

use pretty_assertions::assert_eq;
use ramdb_wal::repo::Fs;
use ramdb_wal::{replay, SegmentWriter};

fn segment_bytes(dir: &std::path::Path, name: &str) -> Vec<u8> {
    fs::read(dir.join(name)).unwrap()
}

/// S1: three commands in one batch land in a single segment, byte-exact.
#[test]
fn three_commands_one_call_one_segment_on_disk() {
    let dir = tempfile::tempdir().unwrap();
    let repo = Fs::open(dir.path()).unwrap();
    let mut w = SegmentWriter::open(repo, 1024).unwrap();

    w.write(b"SET a 1\nSET b 2\nDEL a\n").unwrap();
    w.close().unwrap();

    assert_eq!(segment_bytes(dir.path(), "1"), b"SET a 1\nSET b 2\nDEL a\n");
    assert!(!dir.path().join("2").exists());
}

/// S2: at seg_size_bytes=20, two 10-byte lines fill segment 1 exactly and
/// the third rotates into segment 2.
#[test]
fn rotation_at_twenty_bytes_splits_third_record_to_segment_two() {
    let dir = tempfile::tempdir().unwrap();
    let repo = Fs::open(dir.path()).unwrap();
    let mut w = SegmentWriter::open(repo, 20).unwrap();

    w.write(b"SET aa 11\n").unwrap();
    w.write(b"SET bb 22\n").unwrap();
    w.write(b"SET cc 33\n").unwrap();

    assert_eq!(segment_bytes(dir.path(), "1"), b"SET aa 11\nSET bb 22\n");
    assert_eq!(segment_bytes(dir.path(), "2"), b"SET cc 33\n");
}

/// S4: a single batch larger than seg_size_bytes splits at the last
/// in-budget newline, never mid-record.
#[test]
fn single_batch_split_across_segments_on_a_record_boundary() {
    let dir = tempfile::tempdir().unwrap();
    let repo = Fs::open(dir.path()).unwrap();
    let mut w = SegmentWriter::open(repo, 15).unwrap();

    w.write(b"SET aa 11\nSET bb 22\n").unwrap();

    assert_eq!(segment_bytes(dir.path(), "1"), b"SET aa 11\n");
    assert_eq!(segment_bytes(dir.path(), "2"), b"SET bb 22\n");
}

/// Non-numeric directory entries never turn into segments and are ignored
/// by discovery (spec §3 Segment invariants).
#[test]
fn non_numeric_files_in_the_wal_dir_are_ignored() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("README.md"), b"not a segment").unwrap();
    fs::write(dir.path().join("1.tmp"), b"not a segment either").unwrap();

    let repo = Fs::open(dir.path()).unwrap();
    let mut w = SegmentWriter::open(repo, 1024).unwrap();
    w.write(b"SET a 1\n").unwrap();

    assert_eq!(segment_bytes(dir.path(), "1"), b"SET a 1\n");
    assert!(dir.path().join("README.md").exists());
}

/// Testable property #2: every segment on disk ends with `\n` or is empty.
#[test]
fn every_segment_on_disk_ends_on_a_newline_boundary() {
    let dir = tempfile::tempdir().unwrap();
    let repo = Fs::open(dir.path()).unwrap();
    let mut w = SegmentWriter::open(repo, 24).unwrap();

    for i in 0..9 {
        w.write(format!("SET k{i} v{i}\n").as_bytes()).unwrap();
    }

    for entry in fs::read_dir(dir.path()).unwrap() {
        let path = entry.unwrap().path();
        let bytes = fs::read(&path).unwrap();
        if !bytes.is_empty() {
            assert_eq!(*bytes.last().unwrap(), b'\n', "{} does not end on a newline", path.display());
        }
    }
}

/// A writer that restarts against an existing directory resumes the
/// highest-numbered segment and replay reconstructs the same map either
/// way (testable property #6: idempotent replay).
#[test]
fn reopening_then_replaying_reproduces_prior_state() {
    use std::collections::HashMap;

    let dir = tempfile::tempdir().unwrap();
    {
        let repo = Fs::open(dir.path()).unwrap();
        let mut w = SegmentWriter::open(repo, 1024).unwrap();
        w.write(b"SET a 1\nSET b 2\nDEL a\nSET b 3\n").unwrap();
    }

    let segments = {
        let repo = Fs::open(dir.path()).unwrap();
        let w = SegmentWriter::open(repo, 1024).unwrap();
        w.segment_paths().unwrap()
    };

    let mut first = HashMap::new();
    replay(
        &segments,
        |k, v| {
            first.insert(k.to_string(), v.to_string());
        },
        |k| {
            first.remove(k);
        },
    )
    .unwrap();

    let mut second = HashMap::new();
    replay(
        &segments,
        |k, v| {
            second.insert(k.to_string(), v.to_string());
        },
        |k| {
            second.remove(k);
        },
    )
    .unwrap();

    assert_eq!(first, second);
    assert_eq!(first.get("a"), None);
    assert_eq!(first.get("b").map(String::as_str), Some("3"));
}
