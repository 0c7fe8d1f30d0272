//! # Application Entry Point

use std::sync::Arc;

use anyhow::Context;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use shardr::config::Config;
use shardr::io::FastaReference;
use shardr::pipelines::Sharder;

fn main() -> anyhow::Result<()> {
    let config = Config::parse_and_validate()?;

    let default_filter = if config.verbose {
        "shardr=debug,info"
    } else {
        "info"
    };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let vcf_paths = config.load_path_list(&config.vcf_files)?;
    let mindex_paths = config.load_path_list(&config.mindex_files)?;
    let out_paths = config.output_paths(&vcf_paths);
    let reference = Arc::new(FastaReference::new(&config.reference));

    Sharder::new(
        config.shards_file.clone(),
        mindex_paths,
        vcf_paths,
        config.shards_total,
        out_paths,
        config.metrics.clone(),
        reference,
    )?
    .skip_writing(config.skip_writing)
    .shard(config.shard_number, config.threads)
    .context("shard operation failed")?;
    Ok(())
}
