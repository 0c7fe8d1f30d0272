//! # Shards Table
//!
//! Parses the shards file: tab-separated interval triples
//! `CONTIG\tSTART\tEND`, one or more triples per line, `#` comments
//! ignored. Only the first triple's (CONTIG, START) of each line becomes a
//! `Position`; the contig ordering is derived from a pre-scan over every
//! triple, in first-appearance order.

use std::fs;
use std::path::Path;
use std::sync::Arc;

use crate::data::position::{ContigOrder, Position};
use crate::error::{Result, ShardrError};

/// The parsed shards file: one start position per non-comment line, all
/// sharing one `ContigOrder`.
#[derive(Debug)]
pub struct ShardTable {
    positions: Vec<Position>,
    order: Arc<ContigOrder>,
}

impl ShardTable {
    /// Load and parse a shards file. Malformed lines are fatal.
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        let order = Arc::new(scan_contigs(&text)?);
        let mut positions = Vec::new();
        for (idx, line) in text.lines().enumerate() {
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let fields = check_and_split(idx + 1, line)?;
            let start: u32 = fields[1].parse().map_err(|_| {
                ShardrError::parse(idx + 1, format!("expected integer start, got {:?}", fields[1]))
            })?;
            positions.push(Position::new(fields[0], start, Arc::clone(&order)));
        }
        Ok(Self { positions, order })
    }

    /// Number of rows, which is the number of shards described by the file.
    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    /// Start position of the given shard row.
    pub fn get(&self, shard_no: usize) -> &Position {
        &self.positions[shard_no]
    }

    /// The contig ordering shared by every position in this table.
    pub fn contig_order(&self) -> Arc<ContigOrder> {
        Arc::clone(&self.order)
    }
}

/// Pre-scan pass: collect the contig of every triple on every line.
fn scan_contigs(text: &str) -> Result<ContigOrder> {
    let mut names = Vec::new();
    for (idx, line) in text.lines().enumerate() {
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let fields = check_and_split(idx + 1, line)?;
        for triple in fields.chunks(3) {
            names.push(triple[0]);
        }
    }
    Ok(ContigOrder::from_first_appearance(names))
}

fn check_and_split(line_no: usize, line: &str) -> Result<Vec<&str>> {
    let fields: Vec<&str> = line.split('\t').collect();
    if fields.len() % 3 != 0 {
        return Err(ShardrError::parse(
            line_no,
            format!("expected fields in triples, got {}: {:?}", fields.len(), line),
        ));
    }
    if fields.len() < 3 {
        return Err(ShardrError::parse(
            line_no,
            format!("expected at least 3 fields, got {}: {:?}", fields.len(), line),
        ));
    }
    Ok(fields)
}
