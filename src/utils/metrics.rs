//! # Shard Metrics
//!
//! One JSON document per shard operation: cut points, per-input offset
//! summaries, timings, reference query count.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use serde::Serialize;

use crate::error::{Result, ShardrError};

/// Summary of one family of per-input values (begin offsets, end offsets,
/// output sizes). `first` is reported verbatim so that adjacent shards can
/// be QC'd for contiguity: one shard's end offset must equal the next
/// shard's begin offset for the same input, and printing every input would
/// be far too much.
#[derive(Clone, Copy, Debug, Serialize)]
pub struct OffsetSummary {
    pub min: i64,
    pub avg: i64,
    pub max: i64,
    pub first: i64,
}

impl OffsetSummary {
    pub fn from_offsets(offsets: &[i64]) -> Self {
        let first = offsets[0];
        let mut min = first;
        let mut max = first;
        let mut total = 0.0;
        for &offset in offsets {
            total += offset as f64;
            if offset < min {
                min = offset;
            } else if offset > max {
                max = offset;
            }
        }
        Self {
            min,
            avg: (total / offsets.len() as f64).round() as i64,
            max,
            first,
        }
    }
}

/// Everything the metrics sink receives for one shard operation.
#[derive(Debug, Serialize)]
pub struct ShardMetrics {
    pub shard_number: usize,
    pub shards_total: usize,
    pub vcf_count: usize,
    pub threads: usize,
    /// Begin cut as `CONTIG:POS`.
    pub begin_cut: String,
    /// End cut as `CONTIG:POS`, or `"null"` for the final shard.
    pub end_cut: String,
    pub begin_offset: OffsetSummary,
    pub end_offset: OffsetSummary,
    /// Seconds spent opening inputs and seeking to the indexed offsets.
    pub init_s: f64,
    /// Seconds spent copying shard bytes, including boundary splits.
    pub write_s: f64,
    /// Seconds spent in the whole shard operation.
    pub total_s: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shard_size: Option<OffsetSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ref_queried: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub write_skipped: Option<bool>,
}

impl ShardMetrics {
    /// Write the metrics as one pretty-printed JSON document.
    pub fn write_json(&self, path: &Path) -> Result<()> {
        let file = File::create(path)?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut writer, self)
            .map_err(|e| ShardrError::invalid_data(format!("cannot serialize metrics: {e}")))?;
        writeln!(writer)?;
        writer.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn summarizes_min_avg_max_first() {
        let summary = OffsetSummary::from_offsets(&[40, 10, 30]);
        assert_eq!(summary.min, 10);
        assert_eq!(summary.max, 40);
        assert_eq!(summary.avg, 27);
        assert_eq!(summary.first, 40);
    }

    #[test]
    fn single_value_summary_is_that_value_everywhere() {
        let summary = OffsetSummary::from_offsets(&[7]);
        assert_eq!(
            (summary.min, summary.avg, summary.max, summary.first),
            (7, 7, 7, 7)
        );
    }
}
