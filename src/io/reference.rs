//! # Reference Base Lookup
//!
//! Boundary splits need a single reference base to rebuild the REF column
//! of a spliced record. The capability is modeled as a small trait so the
//! cut machinery can be tested without a FASTA on disk.

use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use noodles::core::{Position as SequencePosition, Region};
use noodles::fasta;

use crate::error::{Result, ShardrError};

/// One base at a (contig, 1-based position), plus a query counter for the
/// metrics. Must be callable from multiple workers.
pub trait ReferenceSource: Send + Sync {
    fn base_at(&self, contig: &str, pos: u32) -> Result<u8>;

    /// How many times `base_at` was called.
    fn query_count(&self) -> u64;
}

type IndexedFasta = fasta::io::IndexedReader<fasta::io::BufReader<File>>;

/// Single-entry cache state behind the mutex. `cached` is `None` both
/// before the first query and after a failed one.
struct Backend {
    fasta: Option<IndexedFasta>,
    cached: Option<(String, u32, u8)>,
}

/// FASTA-backed [`ReferenceSource`]. The indexed reader is opened on the
/// first query (building the index view is expensive and many runs never
/// split a boundary record), and a one-entry cache absorbs the repeated
/// lookups that the begin and end cut of one shard tend to make.
pub struct FastaReference {
    path: PathBuf,
    backend: Mutex<Backend>,
    queries: AtomicU64,
}

impl FastaReference {
    pub fn new(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
            backend: Mutex::new(Backend {
                fasta: None,
                cached: None,
            }),
            queries: AtomicU64::new(0),
        }
    }
}

impl ReferenceSource for FastaReference {
    fn base_at(&self, contig: &str, pos: u32) -> Result<u8> {
        self.queries.fetch_add(1, Ordering::Relaxed);
        let mut backend = self
            .backend
            .lock()
            .map_err(|_| ShardrError::bug("reference mutex poisoned"))?;
        let Backend { fasta, cached } = &mut *backend;
        let reader = match fasta {
            Some(reader) => reader,
            slot => {
                let reader = fasta::io::indexed_reader::Builder::default()
                    .build_from_path(&self.path)?;
                slot.insert(reader)
            }
        };
        if let Some((cached_contig, cached_pos, base)) = cached {
            if *cached_pos == pos && cached_contig == contig {
                return Ok(*base);
            }
        }
        // Cleared up front so a failing query never looks cached.
        *cached = None;
        let start = SequencePosition::try_from(pos as usize)
            .map_err(|_| ShardrError::bug(format!("non-positive reference position {pos}")))?;
        let region = Region::new(contig, start..=start);
        let record = reader.query(&region)?;
        let sequence: &[u8] = record.sequence().as_ref();
        if sequence.len() != 1 {
            return Err(ShardrError::bug(format!(
                "reference base at {contig}:{pos} should be 1 letter, got {} bytes",
                sequence.len()
            )));
        }
        let base = sequence[0];
        *cached = Some((contig.to_string(), pos, base));
        Ok(base)
    }

    fn query_count(&self) -> u64 {
        self.queries.load(Ordering::Relaxed)
    }
}
