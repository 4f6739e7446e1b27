//! Typed decoding of delimited tables
//!
//! Turns a staged payload (a file, an entry inside a ZIP archive, or an
//! in-memory body) into a [`Table`] using the source's declared column
//! types. The schema is a superset contract: every declared column must be
//! present in the raw header, while undeclared raw columns pass through as
//! text. The empty string is null for every column; a null or unparseable
//! value in a non-nullable column aborts the source.

use std::fs::File;
use std::io::Read;

use atlas_common::{AtlasError, Result};
use tracing::debug;

use crate::retrieve::StagedPayload;
use crate::sources::SourceDescriptor;
use crate::table::{Column, ColumnType, ColumnValues, Table};

/// Decode the staged payload for one source into a typed table.
pub fn decode(payload: &StagedPayload, descriptor: &SourceDescriptor) -> Result<Table> {
    match payload {
        StagedPayload::File(path) => match &descriptor.inner_path {
            Some(inner) => {
                debug!(path = %path.display(), entry = %inner, "Decoding archive entry");
                let file = File::open(path)?;
                let mut archive = zip::ZipArchive::new(file)
                    .map_err(|e| AtlasError::Archive(format!("{}: {e}", path.display())))?;
                let entry = archive
                    .by_name(inner)
                    .map_err(|e| AtlasError::Archive(format!("entry '{inner}': {e}")))?;
                from_reader(entry, descriptor)
            },
            None => {
                debug!(path = %path.display(), "Decoding staged file");
                from_reader(File::open(path)?, descriptor)
            },
        },
        StagedPayload::Memory(body) => {
            debug!(bytes = body.len(), "Decoding in-memory body");
            from_reader(body.as_bytes(), descriptor)
        },
    }
}

fn from_reader<R: Read>(reader: R, descriptor: &SourceDescriptor) -> Result<Table> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .delimiter(descriptor.delimiter)
        .from_reader(reader);

    let headers: Vec<String> = csv_reader
        .headers()
        .map_err(|e| AtlasError::Parse(format!("cannot read header: {e}")))?
        .iter()
        .map(str::to_string)
        .collect();

    // Superset check: every declared column must exist in the raw header.
    for declared in descriptor.schema.keys() {
        if !headers.iter().any(|h| h == declared) {
            return Err(AtlasError::MissingColumn {
                column: declared.clone(),
            });
        }
    }

    let types: Vec<ColumnType> = headers
        .iter()
        .map(|name| {
            descriptor
                .schema
                .get(name)
                .copied()
                .unwrap_or(ColumnType::Text)
        })
        .collect();

    let mut builders: Vec<ColumnValues> = types
        .iter()
        .map(|ty| match ty {
            ColumnType::Int | ColumnType::NullableInt => ColumnValues::Int(Vec::new()),
            ColumnType::Float => ColumnValues::Float(Vec::new()),
            ColumnType::Text | ColumnType::Categorical => ColumnValues::Text(Vec::new()),
        })
        .collect();

    for record in csv_reader.records() {
        let record = record.map_err(|e| AtlasError::Parse(format!("malformed record: {e}")))?;
        for (index, raw) in record.iter().enumerate().take(builders.len()) {
            push_value(&mut builders[index], types[index], &headers[index], raw)?;
        }
    }

    let columns = headers
        .into_iter()
        .zip(types)
        .zip(builders)
        .map(|((name, ty), values)| Column::new(name, ty, values))
        .collect();

    Ok(Table::new(columns))
}

/// Coerce one raw field into the column's storage. The empty string is null
/// regardless of declared type.
fn push_value(
    builder: &mut ColumnValues,
    ty: ColumnType,
    column: &str,
    raw: &str,
) -> Result<()> {
    let null = raw.is_empty();
    match builder {
        ColumnValues::Int(values) => {
            if null {
                if !ty.is_nullable() {
                    return Err(AtlasError::InvalidValue {
                        column: column.to_string(),
                        value: raw.to_string(),
                        expected: "non-null integer",
                    });
                }
                values.push(None);
            } else {
                let parsed = raw.parse::<i64>().map_err(|_| AtlasError::InvalidValue {
                    column: column.to_string(),
                    value: raw.to_string(),
                    expected: "integer",
                })?;
                values.push(Some(parsed));
            }
        },
        ColumnValues::Float(values) => {
            if null {
                values.push(None);
            } else {
                let parsed = raw.parse::<f64>().map_err(|_| AtlasError::InvalidValue {
                    column: column.to_string(),
                    value: raw.to_string(),
                    expected: "float",
                })?;
                values.push(Some(parsed));
            }
        },
        ColumnValues::Text(values) => {
            values.push(if null { None } else { Some(raw.to_string()) });
        },
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sources::RetrievalStrategy;
    use std::collections::HashMap;
    use std::io::Write;
    use std::time::Duration;
    use url::Url;

    fn descriptor(
        schema: &[(&str, ColumnType)],
        delimiter: u8,
        inner_path: Option<&str>,
    ) -> SourceDescriptor {
        SourceDescriptor {
            key: "test".to_string(),
            strategy: RetrievalStrategy::InMemory,
            url: Url::parse("http://localhost/data").unwrap(),
            inner_path: inner_path.map(str::to_string),
            staging_path: None,
            delimiter,
            timeout: Duration::from_secs(1),
            schema: schema
                .iter()
                .map(|(n, t)| (n.to_string(), *t))
                .collect::<HashMap<_, _>>(),
            transforms: vec![],
            output_path: "out.parquet".into(),
        }
    }

    #[test]
    fn test_nullable_int_empty_string_is_null() {
        let desc = descriptor(&[("year", ColumnType::NullableInt)], b',', None);
        let payload = StagedPayload::Memory("year,notes\n2024,a\n,b\n".to_string());
        let table = decode(&payload, &desc).unwrap();
        assert_eq!(
            table.column("year").unwrap().values,
            ColumnValues::Int(vec![Some(2024), None])
        );
    }

    #[test]
    fn test_null_in_non_nullable_int_is_fatal() {
        let desc = descriptor(&[("id", ColumnType::Int)], b',', None);
        let payload = StagedPayload::Memory("id,name\n7,a\n,b\n".to_string());
        let err = decode(&payload, &desc).unwrap_err();
        assert!(matches!(
            err,
            AtlasError::InvalidValue { column, .. } if column == "id"
        ));
    }

    #[test]
    fn test_declared_column_missing_from_header_is_fatal() {
        let desc = descriptor(&[("taxonID", ColumnType::Int)], b',', None);
        let payload = StagedPayload::Memory("id,name\n1,x\n".to_string());
        let err = decode(&payload, &desc).unwrap_err();
        assert!(matches!(
            err,
            AtlasError::MissingColumn { column } if column == "taxonID"
        ));
    }

    #[test]
    fn test_undeclared_columns_pass_through_as_text() {
        let desc = descriptor(&[("id", ColumnType::Int)], b',', None);
        let payload = StagedPayload::Memory("id,habitat\n1,meadow\n".to_string());
        let table = decode(&payload, &desc).unwrap();
        let habitat = table.column("habitat").unwrap();
        assert_eq!(habitat.ty, ColumnType::Text);
        assert_eq!(
            habitat.values,
            ColumnValues::Text(vec![Some("meadow".to_string())])
        );
    }

    #[test]
    fn test_unparseable_int_is_fatal() {
        let desc = descriptor(&[("id", ColumnType::Int)], b',', None);
        let payload = StagedPayload::Memory("id\nnot-a-number\n".to_string());
        assert!(decode(&payload, &desc).is_err());
    }

    #[test]
    fn test_float_and_tab_delimiter() {
        let desc = descriptor(&[("decimalLatitude", ColumnType::Float)], b'\t', None);
        let payload = StagedPayload::Memory("decimalLatitude\tlocality\n47.6\tSeattle\n\t\n".to_string());
        let table = decode(&payload, &desc).unwrap();
        assert_eq!(
            table.column("decimalLatitude").unwrap().values,
            ColumnValues::Float(vec![Some(47.6), None])
        );
    }

    #[test]
    fn test_decode_zip_inner_entry() {
        let dir = tempfile::tempdir().unwrap();
        let zip_path = dir.path().join("export.zip");

        let mut writer = zip::ZipWriter::new(std::io::Cursor::new(Vec::new()));
        writer
            .start_file("occurrences.tab", zip::write::FileOptions::default())
            .unwrap();
        writer
            .write_all(b"id\tcatalogNumber\n1\tWSDA_1\n2\t\n")
            .unwrap();
        let cursor = writer.finish().unwrap();
        std::fs::write(&zip_path, cursor.into_inner()).unwrap();

        let desc = descriptor(
            &[("id", ColumnType::Int), ("catalogNumber", ColumnType::Text)],
            b'\t',
            Some("occurrences.tab"),
        );
        let table = decode(&StagedPayload::File(zip_path), &desc).unwrap();
        assert_eq!(table.num_rows(), 2);
        assert_eq!(
            table.column("catalogNumber").unwrap().values,
            ColumnValues::Text(vec![Some("WSDA_1".to_string()), None])
        );
    }

    #[test]
    fn test_missing_zip_entry_is_archive_error() {
        let dir = tempfile::tempdir().unwrap();
        let zip_path = dir.path().join("export.zip");

        let mut writer = zip::ZipWriter::new(std::io::Cursor::new(Vec::new()));
        writer
            .start_file("other.tab", zip::write::FileOptions::default())
            .unwrap();
        writer.write_all(b"id\n1\n").unwrap();
        let cursor = writer.finish().unwrap();
        std::fs::write(&zip_path, cursor.into_inner()).unwrap();

        let desc = descriptor(&[("id", ColumnType::Int)], b'\t', Some("occurrences.tab"));
        let err = decode(&StagedPayload::File(zip_path), &desc).unwrap_err();
        assert!(matches!(err, AtlasError::Archive(_)));
    }
}
