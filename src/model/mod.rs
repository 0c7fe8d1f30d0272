//! # Model Module
//!
//! The safe-cut fixed-point search, the algorithmic heart of the crate.

pub mod safe_cut;

pub use safe_cut::{is_deletion, SafeCutFinder};
