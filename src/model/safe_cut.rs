//! # Safe-Cut Search
//!
//! A "safe cut" is a genomic position such that cutting just before it
//! would not split any deletion listed in any of the input files. If a
//! file has a deletion spanning 10-20 then 10 is a safe cut, but 11 is
//! not (and neither is 20).
//!
//! Insertions are always safe to cut around: they anchor at a single
//! reference base, so the inserted bases end before the next position and
//! land whole in one shard. Only multi-base REF alleles forbid a cut.
//!
//! The search is a fixed point across all inputs: each reader advances the
//! candidate past any deletion it finds the candidate inside, which can
//! push the candidate into a deletion in another file, and so on until a
//! full pass moves nothing. The candidate only ever moves forward, so the
//! loop terminates after finitely many records.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use rayon::prelude::*;
use tracing::debug;

use crate::data::position::{ContigOrder, Position};
use crate::data::shard_table::ShardTable;
use crate::error::{Result, ShardrError};
use crate::io::mindex::Mindex;
use crate::io::reference::ReferenceSource;
use crate::io::vcf::VcfReader;
use crate::utils::threading::build_worker_pool;

/// Inputs initialized per pool instance; a fresh pool is created for each
/// batch, which bounds per-worker state under sustained submission.
const INIT_BATCH: usize = 250;

/// Init workers mostly block on I/O, so the pool is wider than the core
/// count whenever more than one thread was requested.
const INIT_POOL_THREADS: usize = 32;

/// Returns true iff the record is a deletion. Deletions are the records
/// listing more than one reference base.
pub fn is_deletion(record: &str) -> bool {
    ref_allele(record).is_some_and(|allele| allele.len() > 1)
}

fn ref_allele(record: &str) -> Option<&str> {
    record.split('\t').nth(3)
}

/// Finds safe cuts across a cohort of variant files.
///
/// Reusable: `init` can be called repeatedly on one instance to find the
/// start of different shards without reloading the shards table, the
/// mindexes, or the already-open readers.
pub struct SafeCutFinder {
    vcf_paths: Vec<PathBuf>,
    /// A reader per input, opened lazily by `init`.
    readers: Vec<Option<VcfReader>>,
    /// Contents of the shards file.
    table: ShardTable,
    /// Each input's corresponding mindex.
    mindexes: Vec<Mindex>,
    reference: Arc<dyn ReferenceSource>,
    threads: usize,
    /// Where we are currently thinking of cutting. `None` until `init`.
    tentative: Option<Position>,
}

impl SafeCutFinder {
    /// Load the shards table and mindexes; readers open lazily in `init`.
    pub fn new(
        shards: &Path,
        mindex_paths: &[PathBuf],
        vcf_paths: Vec<PathBuf>,
        threads: usize,
        reference: Arc<dyn ReferenceSource>,
    ) -> Result<Self> {
        if mindex_paths.len() != vcf_paths.len() {
            return Err(ShardrError::config(format!(
                "got {} mindexes for {} variant files",
                mindex_paths.len(),
                vcf_paths.len()
            )));
        }
        let table = ShardTable::load(shards)?;
        let mindexes = mindex_paths
            .iter()
            .map(|path| Mindex::open(path))
            .collect::<Result<Vec<_>>>()?;
        let readers = (0..vcf_paths.len()).map(|_| None).collect();
        Ok(Self {
            vcf_paths,
            readers,
            table,
            mindexes,
            reference,
            threads,
            tentative: None,
        })
    }

    /// Number of rows in the shards table.
    pub fn num_shards(&self) -> usize {
        self.table.len()
    }

    /// The contig ordering derived from the shards table.
    pub fn contig_order(&self) -> Arc<ContigOrder> {
        self.table.contig_order()
    }

    /// Open every input (on first use) and seek it to the mindexed offset
    /// for `shard_no`, then advance to that row's start position. Call
    /// before [`Self::find_safe_cut`]; calling again finds another shard's
    /// cut on the same instance.
    ///
    /// Fails when a mindex entry sends a reader beyond the target instead
    /// of at or before it.
    pub fn init(&mut self, shard_no: usize) -> Result<()> {
        let tentative = self.table.get(shard_no).clone();
        let order = self.table.contig_order();
        let count = self.vcf_paths.len();
        let pool_threads = if self.threads > 1 { INIT_POOL_THREADS } else { 1 };
        for start in (0..count).step_by(INIT_BATCH) {
            let end = (start + INIT_BATCH).min(count);
            let pool = build_worker_pool(pool_threads)?;
            let readers = &mut self.readers[start..end];
            let mindexes = &mut self.mindexes[start..end];
            let paths = &self.vcf_paths[start..end];
            let reference = &self.reference;
            let tentative = &tentative;
            let order = &order;
            pool.install(|| {
                readers
                    .par_iter_mut()
                    .zip(mindexes.par_iter_mut())
                    .zip(paths.par_iter())
                    .try_for_each(|((slot, mindex), path)| {
                        init_reader(slot, mindex, path, shard_no, tentative, order, reference)
                    })
            })?;
        }
        self.tentative = Some(tentative);
        Ok(())
    }

    /// Advance from the tentative position until a safe cut is found
    /// (stays in place if the tentative position is already safe).
    ///
    /// The inputs are split across `threads` partitions; each partition
    /// runs to its own fixed point and the outer loop combines partition
    /// results by taking the latest, until a round changes nothing. The
    /// result is the same for any positive partition count, because every
    /// step only moves the candidate forward.
    pub fn find_safe_cut(&mut self) -> Result<Position> {
        let tentative = self.ensure_initialized()?;
        let parallelism = self.threads.max(1);
        let per_worker = self.readers.len().div_ceil(parallelism).max(1);
        let pool = build_worker_pool(parallelism)?;
        let mut considering = tentative;
        loop {
            let initial = considering.clone();
            let locals = pool.install(|| {
                self.readers
                    .par_chunks_mut(per_worker)
                    .map(|chunk| subset_safe_cut(chunk, &initial))
                    .collect::<Result<Vec<Position>>>()
            })?;
            let mut changed = false;
            for local in locals {
                if local != initial {
                    changed = true;
                }
                if considering < local {
                    considering = local;
                }
            }
            if !changed {
                break;
            }
        }
        debug!(cut = %considering, "safe cut found");
        Ok(considering)
    }

    /// For each input, the byte offset of the record just before the cut,
    /// i.e. the last record *not* part of the upcoming shard. The previous
    /// shard ends there, so storing these makes adjacent shards contiguous.
    pub fn previous_offsets(&mut self) -> Result<Vec<i64>> {
        self.ensure_initialized()?;
        self.readers
            .iter_mut()
            .map(|slot| match slot {
                Some(reader) => reader.previous_offset(),
                None => Err(ShardrError::bug("previous_offsets() called before init()")),
            })
            .collect()
    }

    fn ensure_initialized(&self) -> Result<Position> {
        self.tentative
            .clone()
            .ok_or_else(|| ShardrError::bug("call init() first"))
    }
}

fn init_reader(
    slot: &mut Option<VcfReader>,
    mindex: &mut Mindex,
    path: &Path,
    shard_no: usize,
    tentative: &Position,
    order: &Arc<ContigOrder>,
    reference: &Arc<dyn ReferenceSource>,
) -> Result<()> {
    let reader = match slot {
        Some(reader) => reader,
        slot => slot.insert(VcfReader::open(
            path,
            Arc::clone(order),
            Arc::clone(reference),
        )?),
    };
    let offset = mindex.get(shard_no)?;
    if offset < 0 {
        return Err(ShardrError::invalid_data(format!(
            "negative mindex entry {} for shard {} of {}",
            offset,
            shard_no,
            path.display()
        )));
    }
    // An entry at or past the file size is the past-EOF sentinel; seeking
    // there leaves the reader at EOF, which the cut search handles.
    reader.seek(offset as u64)?;
    reader.advance_to(tentative, true)
}

/// Finds a safe cut for a subset of the inputs, at or after `tentative`.
fn subset_safe_cut(readers: &mut [Option<VcfReader>], tentative: &Position) -> Result<Position> {
    let mut tentative = tentative.clone();
    loop {
        let initial = tentative.clone();
        for slot in readers.iter_mut() {
            let reader = match slot {
                Some(reader) => reader,
                None => return Err(ShardrError::bug("cut search before init()")),
            };
            reader.advance_to_at_least(&tentative)?;
            match reader.position()? {
                Some(actual) => {
                    if actual.pos() > tentative.pos() {
                        if let Some(previous) = reader.previous()? {
                            if is_deletion(previous) {
                                // We had to move forward and the record we
                                // stepped over isn't splittable, so the
                                // cut must move up to where we landed.
                                tentative = actual;
                            }
                        }
                    }
                }
                None => {
                    // No record at or past the candidate. A trailing
                    // deletion can still cover it; everything else at EOF
                    // is safe.
                    if let Some(past) = past_trailing_deletion(reader, &tentative)? {
                        tentative = past;
                    }
                }
            }
        }
        // Repeat until fixed point.
        if tentative == initial {
            return Ok(tentative);
        }
    }
}

/// When a file's final record is a deletion whose extent covers the
/// candidate cut, the first safe position is just past that extent.
fn past_trailing_deletion(reader: &mut VcfReader, cut: &Position) -> Result<Option<Position>> {
    let previous = match reader.previous()? {
        // No previous record happens when the seek offset was already past
        // the end of the file.
        None => return Ok(None),
        Some(line) if !is_deletion(line) => return Ok(None),
        Some(line) => line.to_owned(),
    };
    let start = reader.parse_position(&previous)?;
    let Some(allele) = ref_allele(&previous) else {
        return Ok(None);
    };
    let deletion_end = start.pos() + allele.len() as u32 - 1;
    let covers_cut = start.contig() == cut.contig()
        && start.pos() <= cut.pos()
        && cut.pos() <= deletion_end;
    if covers_cut {
        Ok(Some(cut.with_pos(deletion_end + 1)))
    } else {
        Ok(None)
    }
}
