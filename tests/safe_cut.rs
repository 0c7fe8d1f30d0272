//! Safe-cut scenarios over the shared two-input fixtures, plus the
//! staggered-deletion cohort that punishes any search skipping an input.

mod common;

use std::path::PathBuf;
use std::sync::Arc;

use tempfile::TempDir;

use common::*;
use shardr::SafeCutFinder;

const THREADS: usize = 4;

fn standard_vcfs(dir: &TempDir) -> Vec<PathBuf> {
    vec![
        write_lines(dir.path(), "test1.vcf", TEST1),
        write_lines(dir.path(), "test2.vcf", TEST2),
    ]
}

fn finder_over(dir: &TempDir, vcfs: Vec<PathBuf>) -> SafeCutFinder {
    let shards = write_text(dir.path(), "shards.tsv", SHARDS_TSV);
    let mindex = write_mindex(dir.path(), "mindex", &[0; 5]);
    let mindexes = vec![mindex; vcfs.len()];
    SafeCutFinder::new(
        &shards,
        &mindexes,
        vcfs,
        THREADS,
        Arc::new(CyclingReference::new()),
    )
    .unwrap()
}

#[test]
fn first_shard_begins_at_one() {
    let dir = TempDir::new().unwrap();
    let mut cutter = finder_over(&dir, standard_vcfs(&dir));
    cutter.init(0).unwrap();
    let cut = cutter.find_safe_cut().unwrap();
    // There's a deletion at position 1, but that doesn't stop us from
    // cutting *before* it; nothing can begin earlier.
    assert_eq!(cut.contig(), "chr1");
    assert_eq!(cut.pos(), 1);
}

#[test]
fn advances_past_a_deletion() {
    let dir = TempDir::new().unwrap();
    let mut cutter = finder_over(&dir, standard_vcfs(&dir));
    cutter.init(1).unwrap();
    let cut = cutter.find_safe_cut().unwrap();
    // Row 1 is inside the 39-base deletion at chr1:340; the first record
    // past it is at 379.
    assert_eq!(cut.contig(), "chr1");
    assert_eq!(cut.pos(), 379);
}

#[test]
fn reversed_input_order_gives_the_same_cut() {
    let dir = TempDir::new().unwrap();
    let mut vcfs = standard_vcfs(&dir);
    vcfs.reverse();
    let mut cutter = finder_over(&dir, vcfs);
    cutter.init(1).unwrap();
    let cut = cutter.find_safe_cut().unwrap();
    assert_eq!(cut.contig(), "chr1");
    assert_eq!(cut.pos(), 379);
}

#[test]
fn chained_deletions_across_files_reach_a_fixed_point() {
    let dir = TempDir::new().unwrap();
    let mut cutter = finder_over(&dir, standard_vcfs(&dir));
    cutter.init(2).unwrap();
    let cut = cutter.find_safe_cut().unwrap();
    // Row 2 sits in a deletion in test1; escaping it lands in a deletion
    // in test2, and escaping that lands in another deletion in test1.
    assert_eq!(cut.contig(), "chr2");
    assert_eq!(cut.pos(), 190);
}

#[test]
fn cuts_cleanly_at_a_contig_start() {
    let dir = TempDir::new().unwrap();
    let mut cutter = finder_over(&dir, standard_vcfs(&dir));
    cutter.init(3).unwrap();
    let cut = cutter.find_safe_cut().unwrap();
    assert_eq!(cut.contig(), "chr3");
    assert_eq!(cut.pos(), 1);
}

#[test]
fn reused_finder_matches_a_fresh_one() {
    let dir = TempDir::new().unwrap();
    let mut reused = finder_over(&dir, standard_vcfs(&dir));
    for shard_no in 0..5 {
        reused.init(shard_no).unwrap();
        let cut = reused.find_safe_cut().unwrap();
        let offsets = reused.previous_offsets().unwrap();

        let mut fresh = finder_over(&dir, standard_vcfs(&dir));
        fresh.init(shard_no).unwrap();
        assert_eq!(fresh.find_safe_cut().unwrap(), cut, "cut of row {shard_no}");
        assert_eq!(
            fresh.previous_offsets().unwrap(),
            offsets,
            "offsets of row {shard_no}"
        );
        assert_eq!(cut.to_string(), EXPECTED_CUTS[shard_no]);
    }
}

/// Each input has its own 5-base deletion, staggered 4 apart, so every
/// escape from one input's deletion lands inside the next input's. If the
/// search skipped any input it would stop early; forward and reverse
/// orderings must both walk the whole chain.
#[test]
fn staggered_deletions_across_many_inputs() {
    let input_count = 63;
    let dir = TempDir::new().unwrap();
    let mut vcfs = Vec::with_capacity(input_count);
    for i in 0..input_count {
        let pos = i * 4 + 349;
        let mut lines = vec!["chr1\t1\t.\tAAAAA\tA,<NON_REF>\t0\t.\t\t\t".to_string()];
        if pos > 5 {
            lines.push(format!("chr1\t5\t.\tC\t<NON_REF>\t.\t.\tEND={}\t\t", pos - 1));
        }
        lines.push(format!("chr1\t{pos}\t.\tAAAAA\tA,<NON_REF>\t0\t.\t\t\t"));
        lines.push(format!(
            "chr1\t{}\t.\tA\t<NON_REF>\t.\t.\tEND=999000\t\t",
            pos + 5
        ));
        let lines: Vec<&str> = lines.iter().map(String::as_str).collect();
        vcfs.push(write_lines(dir.path(), &format!("vcf-{i}"), &lines));
    }
    let expected = (4 * (input_count - 1) + 349 + 5) as u32;

    let mut forward = finder_over(&dir, vcfs.clone());
    forward.init(1).unwrap();
    let cut = forward.find_safe_cut().unwrap();
    assert_eq!(cut.contig(), "chr1", "forward direction");
    assert_eq!(cut.pos(), expected, "forward direction");

    vcfs.reverse();
    let mut reverse = finder_over(&dir, vcfs);
    reverse.init(1).unwrap();
    let cut = reverse.find_safe_cut().unwrap();
    assert_eq!(cut.contig(), "chr1", "reverse direction");
    assert_eq!(cut.pos(), expected, "reverse direction");
}

/// A deletion as the very last record of a file still forbids cuts inside
/// its extent; the cut lands just past it.
#[test]
fn trailing_deletion_pushes_the_cut_past_its_extent() {
    let dir = TempDir::new().unwrap();
    let lines = &[
        "chr1\t1\t.\tA\t<NON_REF>\t.\t.\tEND=339\tGT\t0/0",
        // 21 reference bases: covers 340..=360, and nothing follows.
        "chr1\t340\tdeltail\tAAAAAAAAAAAAAAAAAAAAA\tA\t33\tPASS\tNS=1;DP=8\tGT\t1|0",
    ];
    let vcfs = vec![write_lines(dir.path(), "tail.vcf", lines)];
    let mut cutter = finder_over(&dir, vcfs);
    cutter.init(1).unwrap();
    let cut = cutter.find_safe_cut().unwrap();
    assert_eq!(cut.contig(), "chr1");
    assert_eq!(cut.pos(), 361);
}

/// No computed cut may fall strictly inside any deletion of any input.
#[test]
fn no_cut_splits_a_deletion() {
    let dir = TempDir::new().unwrap();
    let mut cutter = finder_over(&dir, standard_vcfs(&dir));
    for shard_no in 0..5 {
        cutter.init(shard_no).unwrap();
        let cut = cutter.find_safe_cut().unwrap();
        for line in TEST1.iter().chain(TEST2.iter()) {
            let fields: Vec<&str> = line.split('\t').collect();
            let ref_len = fields[3].len() as u32;
            if ref_len <= 1 || fields[0] != cut.contig() {
                continue;
            }
            let start: u32 = fields[1].parse().unwrap();
            let end = start + ref_len - 1;
            assert!(
                !(start < cut.pos() && cut.pos() <= end),
                "cut {cut} splits deletion at {}:{start}-{end}",
                fields[0]
            );
        }
    }
}
