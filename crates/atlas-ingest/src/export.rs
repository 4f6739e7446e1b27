//! Parquet export and read-back
//!
//! Writes a transformed table as a single-batch, Snappy-compressed Parquet
//! file, always overwriting the destination. The table model has no spatial
//! column type, so only plain attribute columns can reach this stage. The
//! crawler reads the key column of an exported dataset back through a
//! projected Parquet reader.

use std::fs::File;
use std::path::Path;
use std::sync::Arc;

use arrow::array::{Array as _, ArrayRef, Float64Array, Int64Array, StringArray};
use arrow::datatypes::{DataType, Field, Schema, SchemaRef};
use arrow::record_batch::RecordBatch;
use atlas_common::{AtlasError, Result};
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use parquet::arrow::{ArrowWriter, ProjectionMask};
use parquet::basic::Compression;
use parquet::file::properties::WriterProperties;

use crate::enrich::InatLink;
use crate::table::{ColumnValues, Table};

/// Column names of the crawler's mapping artifact.
pub const OCCURRENCE_ID_COLUMN: &str = "occurrenceID";
pub const OBSERVATION_ID_COLUMN: &str = "inat_observation_id";

fn writer_properties() -> WriterProperties {
    WriterProperties::builder()
        .set_compression(Compression::SNAPPY)
        .build()
}

/// Write a table to `path`, overwriting any existing file.
pub fn write_table(table: &Table, path: &Path) -> Result<()> {
    let mut fields = Vec::with_capacity(table.num_columns());
    let mut arrays: Vec<ArrayRef> = Vec::with_capacity(table.num_columns());

    for column in table.columns() {
        match &column.values {
            ColumnValues::Int(values) => {
                fields.push(Field::new(
                    &column.name,
                    DataType::Int64,
                    column.ty.is_nullable(),
                ));
                arrays.push(Arc::new(Int64Array::from(values.clone())));
            },
            ColumnValues::Float(values) => {
                fields.push(Field::new(&column.name, DataType::Float64, true));
                arrays.push(Arc::new(Float64Array::from(values.clone())));
            },
            ColumnValues::Text(values) => {
                fields.push(Field::new(&column.name, DataType::Utf8, true));
                arrays.push(Arc::new(StringArray::from(values.clone())));
            },
        }
    }

    let schema = Arc::new(Schema::new(fields));
    let batch = RecordBatch::try_new(schema.clone(), arrays)
        .map_err(|e| AtlasError::export(format!("record batch build failed: {e}")))?;
    write_single_batch(schema, &batch, path)
}

/// Write the occurrence → observation mapping, one row per distinct key,
/// `inat_observation_id` nullable.
pub fn write_links(links: &[InatLink], path: &Path) -> Result<()> {
    let schema = Arc::new(Schema::new(vec![
        Field::new(OCCURRENCE_ID_COLUMN, DataType::Utf8, false),
        Field::new(OBSERVATION_ID_COLUMN, DataType::Int64, true),
    ]));

    let occurrence_ids = StringArray::from(
        links
            .iter()
            .map(|l| Some(l.occurrence_id.as_str()))
            .collect::<Vec<_>>(),
    );
    let observation_ids =
        Int64Array::from(links.iter().map(|l| l.observation_id).collect::<Vec<_>>());

    let batch = RecordBatch::try_new(
        schema.clone(),
        vec![Arc::new(occurrence_ids), Arc::new(observation_ids)],
    )
    .map_err(|e| AtlasError::export(format!("record batch build failed: {e}")))?;
    write_single_batch(schema, &batch, path)
}

fn write_single_batch(schema: SchemaRef, batch: &RecordBatch, path: &Path) -> Result<()> {
    let file = File::create(path)?;
    let mut writer = ArrowWriter::try_new(file, schema, Some(writer_properties()))
        .map_err(|e| AtlasError::export(format!("parquet writer init failed: {e}")))?;
    writer
        .write(batch)
        .map_err(|e| AtlasError::export(format!("parquet write failed: {e}")))?;
    writer
        .close()
        .map_err(|e| AtlasError::export(format!("parquet close failed: {e}")))?;
    Ok(())
}

/// Read the non-null values of one string column from a Parquet file, in
/// row order.
pub fn read_text_column(path: &Path, column: &str) -> Result<Vec<String>> {
    let file = File::open(path)?;
    let builder = ParquetRecordBatchReaderBuilder::try_new(file)
        .map_err(|e| AtlasError::export(format!("parquet open failed: {e}")))?;
    let projection = ProjectionMask::columns(builder.parquet_schema(), [column]);
    let reader = builder
        .with_projection(projection)
        .build()
        .map_err(|e| AtlasError::export(format!("parquet reader build failed: {e}")))?;

    let mut values = Vec::new();
    for batch in reader {
        let batch = batch.map_err(|e| AtlasError::export(format!("parquet read failed: {e}")))?;
        let array = batch
            .column_by_name(column)
            .ok_or_else(|| AtlasError::MissingColumn {
                column: column.to_string(),
            })?;
        let strings = array
            .as_any()
            .downcast_ref::<StringArray>()
            .ok_or_else(|| {
                AtlasError::export(format!("column '{column}' is not a string column"))
            })?;
        for i in 0..strings.len() {
            if strings.is_valid(i) {
                values.push(strings.value(i).to_string());
            }
        }
    }
    Ok(values)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::{Column, ColumnType};

    fn sample_table() -> Table {
        Table::new(vec![
            Column::new(
                "id",
                ColumnType::Int,
                ColumnValues::Int(vec![Some(1), Some(2)]),
            ),
            Column::new(
                "occurrenceID",
                ColumnType::Text,
                ColumnValues::Text(vec![
                    Some("urn:wsda:1".to_string()),
                    Some("urn:wsda:2".to_string()),
                ]),
            ),
            Column::new(
                "decimalLatitude",
                ColumnType::Float,
                ColumnValues::Float(vec![Some(47.6), None]),
            ),
        ])
    }

    #[test]
    fn test_write_then_read_key_column() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ecdysis_wa.parquet");

        write_table(&sample_table(), &path).unwrap();
        let keys = read_text_column(&path, "occurrenceID").unwrap();
        assert_eq!(keys, ["urn:wsda:1", "urn:wsda:2"]);
    }

    #[test]
    fn test_write_overwrites_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.parquet");

        write_table(&sample_table(), &path).unwrap();
        let smaller = sample_table().filter_rows(&[true, false]);
        write_table(&smaller, &path).unwrap();

        let keys = read_text_column(&path, "occurrenceID").unwrap();
        assert_eq!(keys, ["urn:wsda:1"]);
    }

    #[test]
    fn test_write_links_nullable_observation_id() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("links.parquet");

        let links = vec![
            InatLink {
                occurrence_id: "A".to_string(),
                observation_id: Some(123),
            },
            InatLink {
                occurrence_id: "B".to_string(),
                observation_id: None,
            },
        ];
        write_links(&links, &path).unwrap();

        let keys = read_text_column(&path, OCCURRENCE_ID_COLUMN).unwrap();
        assert_eq!(keys, ["A", "B"]);
    }

    #[test]
    fn test_read_missing_column_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.parquet");
        write_table(&sample_table(), &path).unwrap();
        assert!(read_text_column(&path, "nope").is_err());
    }
}
