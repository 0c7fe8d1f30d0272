//! # Configuration Logic
//!
//! CLI argument parsing and validation using clap derive.

use clap::Parser;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use crate::error::{Result, ShardrError};

/// shardr: cut one byte-accurate shard out of a cohort of GVCF files
#[derive(Parser, Debug, Clone)]
#[command(name = "shardr")]
#[command(version = "0.1.0")]
#[command(about = "Cut one shard out of a cohort of GVCF files", long_about = None)]
pub struct Config {
    /// TSV file that describes each shard
    #[arg(long, value_name = "FILE")]
    pub shards_file: PathBuf,

    /// Index of the shard to cut (starts at 0)
    #[arg(long)]
    pub shard_number: usize,

    /// Total number of shards for the inputs (even though only one is written)
    #[arg(long)]
    pub shards_total: usize,

    /// File that lists the input VCF files (one per line)
    #[arg(long, value_name = "FILE")]
    pub vcf_files: PathBuf,

    /// File that lists the mindex files corresponding to the VCF files (one per line)
    #[arg(long, value_name = "FILE")]
    pub mindex_files: PathBuf,

    /// FASTA file for the reference
    #[arg(long, value_name = "FASTA")]
    pub reference: PathBuf,

    /// Folder for the output files; their names are derived from the input names
    #[arg(long, value_name = "DIR")]
    pub output_folder: PathBuf,

    /// Number of threads for I/O; also enables parallel init if > 1
    #[arg(long, default_value = "1")]
    pub threads: usize,

    /// Path for the metrics file (omit to skip metrics)
    #[arg(long, value_name = "FILE")]
    pub metrics: Option<PathBuf>,

    /// Print a few more things along the way
    #[arg(long)]
    pub verbose: bool,

    /// Determine the cut but do not copy any files
    #[arg(long)]
    pub skip_writing: bool,
}

impl Config {
    /// Parse command line arguments and validate
    pub fn parse_and_validate() -> Result<Self> {
        let config = Self::parse();
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration parameters
    pub fn validate(&self) -> Result<()> {
        for path in [&self.shards_file, &self.vcf_files, &self.mindex_files] {
            if !path.exists() {
                return Err(ShardrError::FileNotFound { path: path.clone() });
            }
        }
        if !self.output_folder.is_dir() {
            return Err(ShardrError::config(format!(
                "'output_folder' must be an existing directory: {:?}",
                self.output_folder
            )));
        }
        if self.threads == 0 {
            return Err(ShardrError::config("'threads' must be at least 1"));
        }
        if self.shards_total == 0 {
            return Err(ShardrError::config("'shards_total' must be at least 1"));
        }
        if self.shard_number >= self.shards_total {
            return Err(ShardrError::config(
                "'shard_number' must be between 0 and shards_total - 1",
            ));
        }
        Ok(())
    }

    /// Load a list file: one path per line, empty lines ignored.
    pub fn load_path_list(&self, list: &Path) -> Result<Vec<PathBuf>> {
        let reader = BufReader::new(File::open(list)?);
        let mut paths = Vec::new();
        for line in reader.lines() {
            let line = line?;
            if !line.is_empty() {
                paths.push(PathBuf::from(line));
            }
        }
        Ok(paths)
    }

    /// Derive one output path per input:
    /// `{prefix}.shard-{NNNNN}-of-{NNNNN}.{suffix}` inside the output
    /// folder, keeping a `.g.vcf` extension when the input has one.
    pub fn output_paths(&self, inputs: &[PathBuf]) -> Vec<PathBuf> {
        inputs
            .iter()
            .map(|input| {
                let name = input
                    .file_name()
                    .map(|name| name.to_string_lossy().into_owned())
                    .unwrap_or_default();
                let (prefix, suffix) = match name.strip_suffix(".g.vcf") {
                    Some(prefix) => (prefix.to_string(), "g.vcf"),
                    None => (name.clone(), "vcf"),
                };
                self.output_folder.join(format!(
                    "{prefix}.shard-{:05}-of-{:05}.{suffix}",
                    self.shard_number, self.shards_total
                ))
            })
            .collect()
    }
}
