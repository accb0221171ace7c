use std::fs::{self, File};
use std::io;
use std::path::PathBuf;

use super::Repo;

/// A [`Repo`] which stores segments as ordinary files named after their
/// segment number in a directory (`1`, `2`, …, no extension).
#[derive(Clone, Debug)]
pub struct Fs {
    root: PathBuf,
}

impl Fs {
    /// Open a repo rooted at `root`. `root` must already exist.
    pub fn open(root: impl Into<PathBuf>) -> io::Result<Self> {
        let root = root.into();
        let meta = fs::metadata(&root)?;
        if !meta.is_dir() {
            return Err(io::Error::new(
                io::ErrorKind::NotADirectory,
                format!("{} is not a directory", root.display()),
            ));
        }
        Ok(Self { root })
    }

    fn path_of(&self, seg_num: u64) -> PathBuf {
        self.root.join(seg_num.to_string())
    }
}

impl Repo for Fs {
    type Segment = File;

    fn create_segment(&self, seg_num: u64) -> io::Result<Self::Segment> {
        File::options()
            .append(true)
            .read(true)
            .create_new(true)
            .open(self.path_of(seg_num))
    }

    fn open_segment_for_append(&self, seg_num: u64) -> io::Result<Self::Segment> {
        File::options().append(true).read(true).open(self.path_of(seg_num))
    }

    fn segment_len(&self, seg_num: u64) -> io::Result<u64> {
        fs::metadata(self.path_of(seg_num)).map(|m| m.len())
    }

    fn segment_path(&self, seg_num: u64) -> PathBuf {
        self.path_of(seg_num)
    }

    fn existing_segments(&self) -> io::Result<Vec<u64>> {
        let mut segments = Vec::new();
        for entry in fs::read_dir(&self.root)? {
            let entry = entry?;
            if !entry.file_type()?.is_file() {
                continue;
            }
            let name = entry.file_name();
            let name = name.to_string_lossy();
            // Non-numeric filenames are invisible to the WAL.
            if let Ok(seg_num) = name.parse::<u64>() {
                segments.push(seg_num);
            }
        }
        segments.sort_unstable();
        Ok(segments)
    }
}

