//! # I/O Module
//!
//! Byte-level file access: the mindex offset table, the seekable variant
//! reader with its boundary-record splitting, and the reference backend.

pub mod mindex;
pub mod reference;
pub mod vcf;

pub use mindex::Mindex;
pub use reference::{FastaReference, ReferenceSource};
pub use vcf::{VcfReader, UNKNOWN_OFFSET};
