//! # Sharding Pipeline
//!
//! Writes out one shard of a collection of GVCF files: find the begin and
//! end safe cuts, then copy the byte range between them out of every
//! input, splitting the records that straddle the boundaries.

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use rayon::prelude::*;
use tracing::{debug, info};

use crate::data::position::Position;
use crate::error::{Result, ShardrError};
use crate::io::reference::ReferenceSource;
use crate::io::vcf::VcfReader;
use crate::model::safe_cut::SafeCutFinder;
use crate::utils::metrics::{OffsetSummary, ShardMetrics};
use crate::utils::threading::build_worker_pool;

/// Orchestrates one shard operation over a cohort of inputs.
pub struct Sharder {
    shards: PathBuf,
    mindexes: Vec<PathBuf>,
    vcf_paths: Vec<PathBuf>,
    total_shards: usize,
    out_paths: Vec<PathBuf>,
    metrics_path: Option<PathBuf>,
    reference: Arc<dyn ReferenceSource>,
    skip_writing: bool,
}

impl Sharder {
    pub fn new(
        shards: PathBuf,
        mindexes: Vec<PathBuf>,
        vcf_paths: Vec<PathBuf>,
        total_shards: usize,
        out_paths: Vec<PathBuf>,
        metrics_path: Option<PathBuf>,
        reference: Arc<dyn ReferenceSource>,
    ) -> Result<Self> {
        if mindexes.len() != vcf_paths.len() {
            return Err(ShardrError::config("must have as many mindexes as vcfs"));
        }
        if out_paths.len() != vcf_paths.len() {
            return Err(ShardrError::config(
                "must have as many output paths as vcfs",
            ));
        }
        if vcf_paths.is_empty() {
            return Err(ShardrError::config("need at least one input file"));
        }
        Ok(Self {
            shards,
            mindexes,
            vcf_paths,
            total_shards,
            out_paths,
            metrics_path,
            reference,
            skip_writing: false,
        })
    }

    /// Determine the cuts and metrics but copy nothing.
    pub fn skip_writing(mut self, skip: bool) -> Self {
        self.skip_writing = skip;
        self
    }

    /// Copy the specified shard, optionally multithreaded.
    pub fn shard(&self, shard_no: usize, threads: usize) -> Result<()> {
        if shard_no >= self.total_shards {
            return Err(ShardrError::config(
                "shard number must be between 0 and shards_total - 1",
            ));
        }
        if threads == 0 {
            return Err(ShardrError::config("need at least 1 thread"));
        }
        self.check_outputs_writeable()?;
        let total_clock = Instant::now();
        info!(shard = shard_no, "starting on shard");

        let mut finder = SafeCutFinder::new(
            &self.shards,
            &self.mindexes,
            self.vcf_paths.clone(),
            threads,
            Arc::clone(&self.reference),
        )?;
        let rows = finder.num_shards();
        if self.total_shards > rows {
            return Err(ShardrError::config(format!(
                "'shards_total' must be at most the number of rows in the shards file \
                 ({} > {rows})",
                self.total_shards
            )));
        }
        if rows % self.total_shards != 0 {
            return Err(ShardrError::config(format!(
                "'shards_total' must be a divisor of the number of rows in the shards \
                 file; got {} for {rows} rows",
                self.total_shards
            )));
        }
        let shards_at_a_time = rows / self.total_shards;

        // 1. Find the safe begin cut.
        debug!("computing first cut");
        let mut init_secs = 0.0;
        let clock = Instant::now();
        finder.init(shard_no * shards_at_a_time)?;
        init_secs += clock.elapsed().as_secs_f64();
        let begin_cut = finder.find_safe_cut()?;
        let begin_offsets = finder.previous_offsets()?;
        debug!(cut = %begin_cut, "first cut");

        // 2. Find the safe end cut; the final shard instead runs to EOF.
        let end_row = (shard_no + 1) * shards_at_a_time;
        let (end_cut, end_offsets) = if end_row < self.total_shards * shards_at_a_time {
            debug!("computing second cut");
            let clock = Instant::now();
            finder.init(end_row)?;
            init_secs += clock.elapsed().as_secs_f64();
            let cut = finder.find_safe_cut()?;
            let offsets = finder.previous_offsets()?;
            (Some(cut), offsets)
        } else {
            debug!("no second cut, copying until end of file");
            let mut sizes = Vec::with_capacity(self.vcf_paths.len());
            for path in &self.vcf_paths {
                sizes.push(fs::metadata(path)?.len() as i64);
            }
            (None, sizes)
        };
        info!(
            begin = %begin_cut,
            end = %end_cut.as_ref().map_or_else(|| "EOF".to_string(), Position::to_string),
            "safe cut points found, cutting"
        );

        let order = finder.contig_order();
        // Release the finder's channels before the copy workers open their own.
        drop(finder);

        // 3. Copy the shard between the cut points.
        let mut write_secs = 0.0;
        if !self.skip_writing {
            let clock = Instant::now();
            let per_worker = self.vcf_paths.len().div_ceil(threads);
            let pool = build_worker_pool(threads)?;
            let indices: Vec<usize> = (0..self.vcf_paths.len()).collect();
            pool.install(|| {
                indices.par_chunks(per_worker).try_for_each(|chunk| {
                    for &i in chunk {
                        let mut reader = VcfReader::open(
                            &self.vcf_paths[i],
                            Arc::clone(&order),
                            Arc::clone(&self.reference),
                        )?;
                        let mut sink = BufWriter::new(File::create(&self.out_paths[i])?);
                        reader.copy(
                            begin_offsets[i],
                            &begin_cut,
                            end_offsets[i],
                            end_cut.as_ref(),
                            &mut sink,
                        )?;
                        sink.flush()?;
                    }
                    Ok::<(), ShardrError>(())
                })
            })?;
            write_secs = clock.elapsed().as_secs_f64();
            info!(outputs = self.out_paths.len(), "done writing shard outputs");
        } else {
            info!("writing skipped as requested; cut points computed only");
        }

        // 4. Metrics.
        if let Some(metrics_path) = &self.metrics_path {
            let metrics = self.collect_metrics(
                shard_no,
                threads,
                &begin_cut,
                end_cut.as_ref(),
                &begin_offsets,
                &end_offsets,
                init_secs,
                write_secs,
                total_clock.elapsed().as_secs_f64(),
            )?;
            metrics.write_json(metrics_path)?;
        } else {
            debug!("metrics path not specified, skipping metrics");
        }
        Ok(())
    }

    /// Probe-write every destination so bad output paths abort before any
    /// real work. The probe files are deleted again.
    fn check_outputs_writeable(&self) -> Result<()> {
        for path in &self.out_paths {
            try_write(path)?;
        }
        if let Some(metrics_path) = &self.metrics_path {
            try_write(metrics_path)?;
        }
        Ok(())
    }

    #[allow(clippy::too_many_arguments)]
    fn collect_metrics(
        &self,
        shard_no: usize,
        threads: usize,
        begin_cut: &Position,
        end_cut: Option<&Position>,
        begin_offsets: &[i64],
        end_offsets: &[i64],
        init_s: f64,
        write_s: f64,
        total_s: f64,
    ) -> Result<ShardMetrics> {
        let shard_size = if self.skip_writing {
            None
        } else {
            let mut sizes = Vec::with_capacity(self.out_paths.len());
            for path in &self.out_paths {
                sizes.push(fs::metadata(path)?.len() as i64);
            }
            Some(OffsetSummary::from_offsets(&sizes))
        };
        Ok(ShardMetrics {
            shard_number: shard_no,
            shards_total: self.total_shards,
            vcf_count: self.vcf_paths.len(),
            threads,
            begin_cut: begin_cut.to_string(),
            end_cut: end_cut.map_or_else(|| "null".to_string(), Position::to_string),
            begin_offset: OffsetSummary::from_offsets(begin_offsets),
            end_offset: OffsetSummary::from_offsets(end_offsets),
            init_s,
            write_s,
            total_s,
            shard_size,
            ref_queried: (!self.skip_writing).then(|| self.reference.query_count()),
            write_skipped: self.skip_writing.then_some(true),
        })
    }
}

fn try_write(path: &Path) -> Result<()> {
    {
        let mut file = File::create(path)?;
        file.write_all(b"probe\n")?;
    }
    fs::remove_file(path)?;
    Ok(())
}
