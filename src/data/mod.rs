//! # Data Module
//!
//! Value types shared across the crate: genomic positions with a table-wide
//! contig ordering, and the parsed shards table itself.

pub mod position;
pub mod shard_table;

pub use position::{ContigOrder, Position};
pub use shard_table::ShardTable;
