use std::collections::BTreeMap;
use std::io;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use super::{FileLike, Repo};

#[derive(Debug, Default, Clone)]
pub struct Memory {
    segments: Arc<Mutex<BTreeMap<u64, Vec<u8>>>>,
}

/// A segment handle backed by a shared in-memory buffer, for exercising
/// [`crate::SegmentWriter`] rotation logic without touching the filesystem.
#[derive(Clone)]
pub struct Cursor {
    seg_num: u64,
    segments: Arc<Mutex<BTreeMap<u64, Vec<u8>>>>,
}

impl io::Write for Cursor {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut segments = self.segments.lock().unwrap();
        segments.entry(self.seg_num).or_default().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl io::Read for Cursor {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let segments = self.segments.lock().unwrap();
        let data = segments.get(&self.seg_num).cloned().unwrap_or_default();
        let n = data.len().min(buf.len());
        buf[..n].copy_from_slice(&data[..n]);
        Ok(n)
    }
}

impl FileLike for Cursor {
    fn fsync(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Memory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contents(&self, seg_num: u64) -> Vec<u8> {
        self.segments.lock().unwrap().get(&seg_num).cloned().unwrap_or_default()
    }
}

impl Repo for Memory {
    type Segment = Cursor;

    fn create_segment(&self, seg_num: u64) -> io::Result<Self::Segment> {
        let mut segments = self.segments.lock().unwrap();
        if segments.contains_key(&seg_num) {
            return Err(io::Error::new(io::ErrorKind::AlreadyExists, "segment exists"));
        }
        segments.insert(seg_num, Vec::new());
        Ok(Cursor {
            seg_num,
            segments: self.segments.clone(),
        })
    }

    fn open_segment_for_append(&self, seg_num: u64) -> io::Result<Self::Segment> {
        let segments = self.segments.lock().unwrap();
        if !segments.contains_key(&seg_num) {
            return Err(io::Error::new(io::ErrorKind::NotFound, "segment does not exist"));
        }
        Ok(Cursor {
            seg_num,
            segments: self.segments.clone(),
        })
    }

    fn segment_len(&self, seg_num: u64) -> io::Result<u64> {
        Ok(self.contents(seg_num).len() as u64)
    }

    fn segment_path(&self, seg_num: u64) -> PathBuf {
        PathBuf::from(format!("mem://{seg_num}"))
    }

    fn existing_segments(&self) -> io::Result<Vec<u64>> {
        Ok(self.segments.lock().unwrap().keys().copied().collect())
    }
}
