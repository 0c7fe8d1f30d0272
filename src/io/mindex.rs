//! # Mindex Lookup
//!
//! The mindex is a raw array of `i64` byte offsets, one entry per shards
//! table row, pointing into the matching variant file at (or before) the
//! record that covers that row's start position. Entries are stored
//! little-endian; the mindex writer must agree. An entry at or beyond the
//! variant file's size means "past end of file": seeking there simply
//! leaves the reader at EOF.
//!
//! Lookups prefetch a small window of consecutive entries per disk read,
//! because cutting one shard needs two neighboring boundaries. The default
//! of 3 covers both even when shards are cut two rows at a time.

use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

use crate::error::{Result, ShardrError};

const ENTRY_BYTES: usize = 8;

/// Default number of entries fetched per disk read.
pub const DEFAULT_PREFETCH: usize = 3;

/// Random-access view of one mindex file, with forward prefetch.
#[derive(Debug)]
pub struct Mindex {
    path: PathBuf,
    file: File,
    prefetch: usize,
    /// First shard the cache holds data for.
    base: usize,
    /// Cached window of entries, possibly shorter than `prefetch` at the
    /// tail of the file. Empty until the first lookup.
    cached: Vec<i64>,
}

impl Mindex {
    /// Open a mindex file with the default prefetch.
    pub fn open(path: &Path) -> Result<Self> {
        Self::with_prefetch(path, DEFAULT_PREFETCH)
    }

    /// Open a mindex file fetching `prefetch` entries per disk read.
    pub fn with_prefetch(path: &Path, prefetch: usize) -> Result<Self> {
        let file = File::open(path)?;
        Ok(Self {
            path: path.to_path_buf(),
            file,
            prefetch: prefetch.max(1),
            base: 0,
            cached: Vec::new(),
        })
    }

    /// Return the entry for the given shard, from cache when the window
    /// covers it, from disk otherwise.
    pub fn get(&mut self, shard_no: usize) -> Result<i64> {
        if self.cached.is_empty() || shard_no < self.base || shard_no >= self.base + self.cached.len()
        {
            self.load(shard_no)?;
        }
        Ok(self.cached[shard_no - self.base])
    }

    fn load(&mut self, shard_no: usize) -> Result<()> {
        self.file
            .seek(SeekFrom::Start((shard_no * ENTRY_BYTES) as u64))?;
        let mut buf = vec![0u8; self.prefetch * ENTRY_BYTES];
        let mut filled = 0;
        while filled < buf.len() {
            let n = self.file.read(&mut buf[filled..])?;
            if n == 0 {
                break;
            }
            filled += n;
        }
        let entries = filled / ENTRY_BYTES;
        if entries == 0 {
            return Err(ShardrError::invalid_data(format!(
                "mindex {} has no entry for shard {}",
                self.path.display(),
                shard_no
            )));
        }
        self.base = shard_no;
        self.cached = buf[..entries * ENTRY_BYTES]
            .chunks_exact(ENTRY_BYTES)
            .map(|chunk| {
                let mut raw = [0u8; ENTRY_BYTES];
                raw.copy_from_slice(chunk);
                i64::from_le_bytes(raw)
            })
            .collect();
        Ok(())
    }
}
