//! Source descriptors
//!
//! Each ingested dataset is described by a [`SourceDescriptor`]: where the
//! bytes come from, how they are retrieved and staged, the declared column
//! types, the transform chain, and the output artifact. Descriptors are
//! static configuration built once at process start; [`builtin`] constructs
//! the three Bee Atlas sources, parameterized by [`DataPaths`] so tests can
//! point everything at temporary directories.

use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

use atlas_common::{AtlasError, Result};
use url::Url;

use crate::table::ColumnType;
use crate::transform::Transform;

const GBIF_BACKBONE_URL: &str =
    "https://hosted-datasets.gbif.org/datasets/backbone/current/backbone.zip";
const MASTER_2025_URL: &str =
    "https://docs.google.com/spreadsheets/d/1lcul17yLdZvd0QmbhUHN-fcDpocsY04v/export?format=csv&gid=784598513";
const ECDYSIS_DOWNLOAD_URL: &str = "https://ecdysis.org/collections/download/downloadhandler.php";

/// Timeout for large archive downloads.
const DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(300);
/// Timeout for small in-memory fetches.
const FETCH_TIMEOUT: Duration = Duration::from_secs(60);

/// How the raw bytes for a source are obtained. Closed set; adding a
/// strategy means adding a variant and its handler in `retrieve`.
#[derive(Debug, Clone, PartialEq)]
pub enum RetrievalStrategy {
    /// GET to the staging path once; an existing staged file is reused with
    /// no freshness check against the remote.
    CachedFile,
    /// POST the fixed form body and overwrite the staging path on every run.
    /// Used for live query exports where cached bytes would be stale.
    AlwaysRefreshFile { form: Vec<(String, String)> },
    /// GET straight to memory; nothing is persisted.
    InMemory,
}

/// Declarative description of one ingested dataset.
#[derive(Debug, Clone)]
pub struct SourceDescriptor {
    /// Unique name within a run
    pub key: String,
    pub strategy: RetrievalStrategy,
    pub url: Url,
    /// Entry to read when the retrieved bytes are a ZIP archive
    pub inner_path: Option<String>,
    /// Local path for persisted raw bytes (file strategies only)
    pub staging_path: Option<PathBuf>,
    /// Field delimiter of the delimited table
    pub delimiter: u8,
    /// Per-request timeout for this source
    pub timeout: Duration,
    /// Declared column types; raw columns not listed here pass through as
    /// text, declared columns missing from the raw header are an error
    pub schema: HashMap<String, ColumnType>,
    /// Transform chain applied after decoding, in order
    pub transforms: Vec<Transform>,
    /// Destination of the exported Parquet artifact
    pub output_path: PathBuf,
}

impl SourceDescriptor {
    /// Check invariants that cannot be expressed in the type itself.
    pub fn validate(&self) -> Result<()> {
        match self.strategy {
            RetrievalStrategy::CachedFile | RetrievalStrategy::AlwaysRefreshFile { .. }
                if self.staging_path.is_none() =>
            {
                Err(AtlasError::Config(format!(
                    "source '{}': file strategy requires a staging path",
                    self.key
                )))
            },
            RetrievalStrategy::InMemory if self.inner_path.is_some() => {
                Err(AtlasError::Config(format!(
                    "source '{}': in-memory retrieval cannot address an archive entry",
                    self.key
                )))
            },
            _ => Ok(()),
        }
    }
}

/// Directories the pipeline reads and writes. Passed in explicitly so
/// components never depend on process-wide path constants.
#[derive(Debug, Clone)]
pub struct DataPaths {
    /// Staging area for raw downloads
    pub raw_dir: PathBuf,
    /// Destination for exported Parquet artifacts
    pub processed_dir: PathBuf,
}

impl DataPaths {
    pub fn new(raw_dir: impl Into<PathBuf>, processed_dir: impl Into<PathBuf>) -> Self {
        Self {
            raw_dir: raw_dir.into(),
            processed_dir: processed_dir.into(),
        }
    }

    /// Create both directories if absent.
    pub fn ensure_dirs(&self) -> Result<()> {
        std::fs::create_dir_all(&self.raw_dir)?;
        std::fs::create_dir_all(&self.processed_dir)?;
        Ok(())
    }
}

/// The configured Bee Atlas sources, in processing order.
pub fn builtin(paths: &DataPaths) -> Result<Vec<SourceDescriptor>> {
    Ok(vec![taxon(paths)?, master_2025(paths)?, ecdysis_wa(paths)?])
}

/// GBIF backbone taxonomy: one large zipped TSV, downloaded once and staged.
fn taxon(paths: &DataPaths) -> Result<SourceDescriptor> {
    Ok(SourceDescriptor {
        key: "taxon".to_string(),
        strategy: RetrievalStrategy::CachedFile,
        url: parse_url(GBIF_BACKBONE_URL)?,
        inner_path: Some("backbone/Taxon.tsv".to_string()),
        staging_path: Some(paths.raw_dir.join("backbone.zip")),
        delimiter: b'\t',
        timeout: DOWNLOAD_TIMEOUT,
        schema: taxon_schema(),
        transforms: vec![
            Transform::DropColumns {
                columns: vec!["datasetID".to_string()],
            },
            Transform::DropEmptyColumns {
                columns: vec![
                    "nameAccordingTo".to_string(),
                    "nomenclaturalStatus".to_string(),
                ],
            },
            Transform::FilterByStatus {
                column: "taxonomicStatus".to_string(),
                exclude: "doubtful".to_string(),
            },
        ],
        output_path: paths.processed_dir.join("taxon.parquet"),
    })
}

/// Master 2025 field observations: a spreadsheet CSV export, small enough
/// to decode straight from the response body.
fn master_2025(paths: &DataPaths) -> Result<SourceDescriptor> {
    Ok(SourceDescriptor {
        key: "master_2025".to_string(),
        strategy: RetrievalStrategy::InMemory,
        url: parse_url(MASTER_2025_URL)?,
        inner_path: None,
        staging_path: None,
        delimiter: b',',
        timeout: FETCH_TIMEOUT,
        schema: master_2025_schema(),
        transforms: vec![],
        output_path: paths.processed_dir.join("master_2025.parquet"),
    })
}

/// Ecdysis Washington occurrences: a live query export, re-posted on every
/// run because the collection changes between runs.
fn ecdysis_wa(paths: &DataPaths) -> Result<SourceDescriptor> {
    Ok(SourceDescriptor {
        key: "ecdysis_wa".to_string(),
        strategy: RetrievalStrategy::AlwaysRefreshFile {
            form: ecdysis_download_form(&[
                ("db", "164"),
                ("state", "Washington"),
                ("taxa", "Arthropoda"),
            ]),
        },
        url: parse_url(ECDYSIS_DOWNLOAD_URL)?,
        inner_path: Some("occurrences.tab".to_string()),
        staging_path: Some(paths.raw_dir.join("ecdysis_wa.zip")),
        delimiter: b'\t',
        timeout: DOWNLOAD_TIMEOUT,
        schema: ecdysis_schema(),
        transforms: vec![Transform::FilterByPrefix {
            column: "catalogNumber".to_string(),
            prefix: "WSDA_".to_string(),
        }],
        output_path: paths.processed_dir.join("ecdysis_wa.parquet"),
    })
}

/// Build the symbiota download form for one Ecdysis search. The search
/// parameters are folded into the urlencoded `searchvar` field ahead of the
/// fixed search options.
pub fn ecdysis_download_form(search: &[(&str, &str)]) -> Vec<(String, String)> {
    let mut searchvar = url::form_urlencoded::Serializer::new(String::new());
    for (key, value) in search {
        searchvar.append_pair(key, value);
    }
    for (key, value) in [
        ("usethes", "1"),
        ("taxontype", "4"),
        ("association-type", "none"),
    ] {
        searchvar.append_pair(key, value);
    }

    vec![
        ("schema".to_string(), "symbiota".to_string()),
        ("format".to_string(), "tab".to_string()),
        ("zip".to_string(), "1".to_string()),
        ("searchvar".to_string(), searchvar.finish()),
    ]
}

fn parse_url(raw: &str) -> Result<Url> {
    Url::parse(raw).map_err(|e| AtlasError::Config(format!("invalid url '{raw}': {e}")))
}

fn schema(columns: &[(&str, ColumnType)]) -> HashMap<String, ColumnType> {
    columns
        .iter()
        .map(|(name, ty)| (name.to_string(), *ty))
        .collect()
}

/// Column types for the GBIF backbone Taxon table.
fn taxon_schema() -> HashMap<String, ColumnType> {
    use ColumnType::*;
    schema(&[
        ("taxonID", Int),
        ("parentNameUsageID", NullableInt),
        ("acceptedNameUsageID", NullableInt),
        ("originalNameUsageID", NullableInt),
        // String columns
        ("scientificName", Text),
        ("scientificNameAuthorship", Text),
        ("canonicalName", Text),
        ("genericName", Text),
        ("specificEpithet", Text),
        ("infraspecificEpithet", Text),
        ("namePublishedIn", Text),
        ("taxonRemarks", Text),
        // High-cardinality, keep as string not categorical
        ("genus", Text),
        // Repeated values from a fixed set
        ("taxonRank", Categorical),
        ("taxonomicStatus", Categorical),
        ("kingdom", Categorical),
        ("phylum", Categorical),
        ("class", Categorical),
        ("order", Categorical),
        ("family", Categorical),
    ])
}

/// Column types for the Master 2025 field observation sheet.
fn master_2025_schema() -> HashMap<String, ColumnType> {
    use ColumnType::*;
    schema(&[
        // IDs and numeric identifiers
        ("fieldNumber", Int),
        ("catalogNumber", NullableInt),
        ("userId", NullableInt),
        ("specimenId", Int),
        // Dates
        ("day", Int),
        ("month", Int),
        ("year", Int),
        ("day2", NullableInt),
        ("month2", NullableInt),
        ("year2", NullableInt),
        ("startDayofYear", NullableInt),
        ("endDayofYear", NullableInt),
        // Location
        ("decimalLatitude", Float),
        ("decimalLongitude", Float),
        ("coordinateUncertaintyInMeters", Float),
        ("verbatimElevation", Float),
        // String columns
        ("dateLabelPrint", Text),
        ("occurrenceID", Text),
        ("userLogin", Text),
        ("firstName", Text),
        ("firstNameInitial", Text),
        ("lastName", Text),
        ("recordedBy", Text),
        ("sampleId", Text),
        ("verbatimEventDate", Text),
        ("country", Text),
        ("stateProvince", Text),
        ("county", Text),
        ("locality", Text),
        ("samplingProtocol", Text),
        ("relationshipOfResource", Text),
        ("resourceID", Text),
        ("relatedResourceID", Text),
        ("phylumPlant", Text),
        ("orderPlant", Text),
        ("familyPlant", Text),
        ("genusPlant", Text),
        ("speciesPlant", Text),
        ("taxonRankPlant", Text),
        ("url", Text),
        ("specificEpithet", Text),
    ])
}

/// Column types for Ecdysis occurrence exports (DarwinCore format).
fn ecdysis_schema() -> HashMap<String, ColumnType> {
    use ColumnType::*;
    schema(&[
        ("id", Int),
        ("taxonID", NullableInt),
        ("year", NullableInt),
        ("month", NullableInt),
        ("day", NullableInt),
        ("startDayOfYear", NullableInt),
        ("endDayOfYear", NullableInt),
        ("decimalLatitude", Float),
        ("decimalLongitude", Float),
        ("coordinateUncertaintyInMeters", NullableInt),
        ("minimumElevationInMeters", Float),
        ("maximumElevationInMeters", Float),
        ("minimumDepthInMeters", Float),
        ("maximumDepthInMeters", Float),
        ("individualCount", NullableInt),
        ("collID", NullableInt),
        ("recordID", Text),
        // String columns (many DarwinCore fields)
        ("institutionCode", Text),
        ("collectionCode", Text),
        ("ownerInstitutionCode", Text),
        ("basisOfRecord", Text),
        ("occurrenceID", Text),
        ("catalogNumber", Text),
        ("otherCatalogNumbers", Text),
        ("kingdom", Text),
        ("phylum", Text),
        ("class", Text),
        ("order", Text),
        ("family", Text),
        ("scientificName", Text),
        ("scientificNameAuthorship", Text),
        ("genus", Text),
        ("subgenus", Text),
        ("specificEpithet", Text),
        ("taxonRank", Text),
        ("identifiedBy", Text),
        ("dateIdentified", Text),
        ("recordedBy", Text),
        ("eventDate", Text),
        ("verbatimEventDate", Text),
        ("locality", Text),
        ("stateProvince", Text),
        ("county", Text),
        ("countryCode", Text),
        ("geodeticDatum", Text),
        ("lifeStage", Text),
        ("sex", Text),
        ("references", Text),
    ])
}
