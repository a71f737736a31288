// SPDX-License-Identifier: MIT OR Apache-2.0

//! Kibitz command-line pipeline
//!
//! Wires discovery, feature extraction, pairing and model selection into one
//! offline run. The `kibitz` binary is a thin wrapper over [`run`].

pub mod config;
pub mod pipeline;
pub mod report;

use anyhow::Result;
use tracing::info;

pub use config::{Args, PipelineConfig};
pub use pipeline::Pipeline;
pub use report::{RunReport, SplitSummary};

/// Execute one full run and write its report into `args.out_dir`
pub fn run(args: &Args, config: PipelineConfig) -> Result<RunReport> {
    info!("Starting run: {}", args.notes);
    info!("Data directory: {}", args.data_dir.display());
    info!("Output directory: {}", args.out_dir.display());
    info!("Configuration: {}", serde_json::to_string(&config)?);

    let pipeline = Pipeline::open(&args.data_dir, config)?;
    let report = pipeline.run(args)?;

    let path = report.write(&args.out_dir)?;
    info!("Report written to {}", path.display());
    Ok(report)
}
