//! Pipeline driver
//!
//! Runs stage → decode → transform → export for each configured source.
//! Sources are independent: one failure is logged and reported without
//! stopping the rest of the batch. The caller decides the process outcome
//! from the aggregated report.

use atlas_common::Result;
use reqwest::Client;
use tracing::{error, info};

use crate::sources::SourceDescriptor;
use crate::{decode, export, retrieve, transform};

/// Per-source outcome of one pipeline run.
#[derive(Debug, Default)]
pub struct PipelineReport {
    pub succeeded: Vec<String>,
    /// Failed source keys with the error that stopped them
    pub failed: Vec<(String, String)>,
}

impl PipelineReport {
    pub fn all_succeeded(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Process every descriptor, aggregating per-source outcomes.
pub async fn run(client: &Client, descriptors: &[SourceDescriptor]) -> PipelineReport {
    let mut report = PipelineReport::default();

    for descriptor in descriptors {
        info!(source = %descriptor.key, "Processing source");
        match run_source(client, descriptor).await {
            Ok(()) => report.succeeded.push(descriptor.key.clone()),
            Err(e) => {
                error!(source = %descriptor.key, error = %e, "Source failed");
                report.failed.push((descriptor.key.clone(), e.to_string()));
            },
        }
    }

    info!(
        succeeded = report.succeeded.len(),
        failed = report.failed.len(),
        "Pipeline run complete"
    );
    report
}

async fn run_source(client: &Client, descriptor: &SourceDescriptor) -> Result<()> {
    descriptor.validate()?;

    let payload = retrieve::stage(client, descriptor).await?;

    let table = decode::decode(&payload, descriptor)?;
    info!(
        source = %descriptor.key,
        rows = table.num_rows(),
        columns = table.num_columns(),
        "Decoded table"
    );

    let table = transform::apply_chain(table, &descriptor.transforms)?;
    info!(
        source = %descriptor.key,
        rows = table.num_rows(),
        columns = table.num_columns(),
        "Final table"
    );

    export::write_table(&table, &descriptor.output_path)?;
    let size = std::fs::metadata(&descriptor.output_path)?.len();
    info!(
        source = %descriptor.key,
        path = %descriptor.output_path.display(),
        bytes = size,
        "Parquet file written"
    );
    Ok(())
}
