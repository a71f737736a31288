// SPDX-License-Identifier: MIT OR Apache-2.0

//! Kibitz CLI - board/comment plausibility baseline
//!
//! Pairs every annotated board with its correct comment and with a wrong
//! candidate, tunes a logistic regression on train+validation and reports
//! held-out test metrics.

use anyhow::Result;
use clap::Parser;
use kibitz_cli::{Args, PipelineConfig};
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    let args = Args::parse();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let config = PipelineConfig::from_env()?;
    let report = kibitz_cli::run(&args, config)?;
    println!("{report}");
    Ok(())
}
