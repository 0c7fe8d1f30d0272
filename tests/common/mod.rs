//! Shared fixtures: two small hand-built GVCF bodies whose deletions and
//! reference blocks land the safe cuts on known positions, plus writers
//! for shards tables and mindex files.

#![allow(dead_code)]

use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use shardr::error::Result;
use shardr::io::ReferenceSource;

/// First input. A deletion opens the file, a 39-base deletion at 340
/// pushes cuts from inside it to 379, and two deletions in chr2 chain with
/// the one in the second input.
pub const TEST1: &[&str] = &[
    "chr1\t1\tdelfirst\tGATGATGATGAT\tA\t29\tPASS\tNS=3;DP=14;AF=0.5;DB;H2\tGT:GQ:DP:HQ\t0|0:48:1:51,51",
    "chr1\t13\t.\tT\t<NON_REF>\t.\t.\tEND=339\tGT:DP:GQ:MIN_DP:PL\t0/0:7:18:7:0,18,270",
    "chr1\t340\t.\tGATGATGATGATGATGATGATGATGATGATGATGATGAT\tG\t50\tPASS\tNS=3;DP=9\tGT:GQ:DP:HQ\t1|0:21:6:23,27",
    "chr1\t379\t.\tA\t<NON_REF>\t.\t.\tEND=999\tGT:DP:GQ:MIN_DP:PL\t0/0:9:24:9:0,24,360",
    "chr1\t1000\t.\tC\t<NON_REF>\t.\t.\tEND=1999\tGT:DP:GQ:MIN_DP:PL\t0/0:12:33:10:0,33,495",
    "chr2\t100\t.\tA\t<NON_REF>\t.\t.\tEND=149\tGT:DP:GQ:MIN_DP:PL\t0/0:8:21:8:0,21,315",
    "chr2\t150\tdel2a\tAAAAAAAAAAA\tA\t31\tPASS\tNS=2;DP=11\tGT:GQ:DP:HQ\t0|1:44:9:50,48",
    "chr2\t161\t.\tC\t<NON_REF>\t.\t.\tEND=169\tGT:DP:GQ:MIN_DP:PL\t0/0:7:15:6:0,15,225",
    "chr2\t170\tdel2b\tAAAAAAAAAAAAAAAAAAAA\tA\t27\tPASS\tNS=2;DP=10\tGT:GQ:DP:HQ\t0|1:39:8:44,41",
    "chr2\t190\t.\tT\t<NON_REF>\t.\t.\tEND=299\tGT:DP:GQ:MIN_DP:PL\t0/0:9:27:9:0,27,405",
    "chr3\t1\t.\tA\t<NON_REF>\t.\t.\tEND=500\tGT:DP:GQ:MIN_DP:PL\t0/0:10:30:10:0,30,450",
    "chr4\t1\t.\tG\t<NON_REF>\t.\t.\tEND=500\tGT:DP:GQ:MIN_DP:PL\t0/0:11:30:10:0,30,450",
];

/// Second input. Mostly reference blocks; its chr2 deletion at 160 picks
/// up the chain started by the first input, and the block at 172 is the
/// one that gets trimmed and spliced at the chr2:190 boundary.
pub const TEST2: &[&str] = &[
    "chr1\t1\t.\tA\t<NON_REF>\t.\t.\tEND=299\tGT:DP:GQ:MIN_DP:PL\t0/0:6:12:5:0,12,180",
    "chr1\t300\t.\tG\t<NON_REF>\t.\t.\tEND=378\tGT:DP:GQ:MIN_DP:PL\t0/0:7:18:7:0,18,270",
    "chr1\t379\t.\tG\t<NON_REF>\t.\t.\tEND=999\tGT:DP:GQ:MIN_DP:PL\t0/0:8:24:8:0,24,360",
    "chr1\t1000\t.\tT\t<NON_REF>\t.\t.\tEND=1999\tGT:DP:GQ:MIN_DP:PL\t0/0:9:24:9:0,24,360",
    "chr2\t100\t.\tA\t<NON_REF>\t.\t.\tEND=159\tGT:DP:GQ:MIN_DP:PL\t0/0:8:18:7:0,18,270",
    "chr2\t160\tdel2c\tAAAAAAAAAAAA\tA\t35\tPASS\tNS=2;DP=12\tGT:GQ:DP:HQ\t1|0:47:10:51,49",
    "chr2\t172\t.\tG\t<NON_REF>\t.\t.\tEND=299\tGT:DP:GQ:MIN_DP:PL\t0/0:9:21:8:0,21,315",
    "chr2\t300\t.\tA\t<NON_REF>\t.\t.\tEND=400\tGT:DP:GQ:MIN_DP:PL\t0/0:10:27:9:0,27,405",
    "chr3\t1\t.\tC\t<NON_REF>\t.\t.\tEND=450\tGT:DP:GQ:MIN_DP:PL\t0/0:9:24:8:0,24,360",
    "chr4\t1\t.\tT\t<NON_REF>\t.\t.\tEND=520\tGT:DP:GQ:MIN_DP:PL\t0/0:10:27:9:0,27,405",
];

/// `TEST2` cut short after chr2, for the past-EOF last-shard scenario.
pub const TEST2B_LEN: usize = 8;

/// Five rows; row 1 lands inside the 340 deletion of `TEST1`, row 2 inside
/// the chained chr2 deletions, rows 3 and 4 open their contigs.
pub const SHARDS_TSV: &str = "\
# contig\tstart\tend
chr1\t1\t349
chr1\t350\t699
chr2\t155\t400
chr3\t1\t500
chr4\t1\t500
";

/// The same span cut into ten rows; taking them two at a time must give
/// the same cut points as `SHARDS_TSV`.
pub const SHARDS_10_TSV: &str = "\
# contig\tstart\tend
chr1\t1\t149
chr1\t150\t349
chr1\t350\t499
chr1\t500\t699
chr2\t155\t249
chr2\t250\t400
chr3\t1\t249
chr3\t250\t500
chr4\t1\t249
chr4\t250\t500
";

/// Expected safe cuts for `SHARDS_TSV` rows 0..=4 over `TEST1` + `TEST2`.
pub const EXPECTED_CUTS: &[&str] = &["chr1:1", "chr1:379", "chr2:190", "chr3:1", "chr4:1"];

/// Write LF-terminated lines to `dir/name`.
pub fn write_lines(dir: &Path, name: &str, lines: &[&str]) -> PathBuf {
    let path = dir.join(name);
    let mut file = File::create(&path).unwrap();
    for line in lines {
        writeln!(file, "{line}").unwrap();
    }
    file.flush().unwrap();
    path
}

/// Write raw text to `dir/name`.
pub fn write_text(dir: &Path, name: &str, text: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, text).unwrap();
    path
}

/// Write a mindex file of little-endian i64 entries.
pub fn write_mindex(dir: &Path, name: &str, entries: &[i64]) -> PathBuf {
    let path = dir.join(name);
    let mut file = File::create(&path).unwrap();
    for entry in entries {
        file.write_all(&entry.to_le_bytes()).unwrap();
    }
    file.flush().unwrap();
    path
}

/// Byte offset at which `lines[index]` starts when written LF-terminated.
pub fn line_offset(lines: &[&str], index: usize) -> i64 {
    lines[..index]
        .iter()
        .map(|line| line.len() as i64 + 1)
        .sum()
}

/// Total size in bytes of the LF-terminated lines.
pub fn body_len(lines: &[&str]) -> i64 {
    line_offset(lines, lines.len())
}

/// Concatenate lines into the LF-terminated body they produce on disk.
pub fn body(lines: &[&str]) -> String {
    lines.iter().map(|line| format!("{line}\n")).collect()
}

/// A dummy reference, for testing purposes: cycles through ACGT by
/// position so spliced bases are predictable without a FASTA.
pub struct CyclingReference {
    queries: AtomicU64,
}

impl CyclingReference {
    pub fn new() -> Self {
        Self {
            queries: AtomicU64::new(0),
        }
    }
}

impl ReferenceSource for CyclingReference {
    fn base_at(&self, _contig: &str, pos: u32) -> Result<u8> {
        self.queries.fetch_add(1, Ordering::Relaxed);
        Ok(b"ACGT"[pos as usize % 4])
    }

    fn query_count(&self) -> u64 {
        self.queries.load(Ordering::Relaxed)
    }
}
