//! Atlas Ingest Library
//!
//! Builds the Bee Atlas datasets from remote biodiversity sources.
//!
//! # Pipeline
//!
//! Configured sources (`sources::builtin`) flow through staging
//! (`retrieve`), typed decoding (`decode`), a per-source transform chain
//! (`transform`), and Parquet export (`export`), orchestrated by
//! `pipeline::run`:
//!
//! - **GBIF backbone**: zipped taxonomy TSV, downloaded once and staged
//! - **Master 2025**: field observation spreadsheet, fetched per run
//! - **Ecdysis WA**: live occurrence export, re-queried per run
//!
//! # Enrichment
//!
//! `enrich` crawls Ecdysis record pages for the exported occurrences —
//! rate-limited, resumable via an on-disk page cache — and writes the
//! occurrence → iNaturalist observation mapping.
//!
//! # Example
//!
//! ```no_run
//! use atlas_ingest::{pipeline, sources};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let paths = sources::DataPaths::new("data/raw", "data/processed");
//!     paths.ensure_dirs()?;
//!     let client = reqwest::Client::new();
//!     let report = pipeline::run(&client, &sources::builtin(&paths)?).await;
//!     anyhow::ensure!(report.all_succeeded(), "some sources failed");
//!     Ok(())
//! }
//! ```

pub mod decode;
pub mod enrich;
pub mod export;
pub mod pipeline;
pub mod retrieve;
pub mod sources;
pub mod table;
pub mod transform;
