//! Table transformations
//!
//! Each source descriptor carries an ordered chain of transforms, resolved to
//! enum variants when the configuration is constructed, so a misspelled
//! transform cannot reach a running pipeline. Every transform is pure: it
//! reads one table and returns a new one together with a human-readable
//! summary of what it removed. Filters are stable; surviving rows keep their
//! relative order.

use atlas_common::{AtlasError, Result};
use tracing::info;

use crate::table::{Column, Table};

/// A single named transformation over a [`Table`].
#[derive(Debug, Clone, PartialEq)]
pub enum Transform {
    /// Remove the named columns if present; absent columns are a no-op.
    DropColumns { columns: Vec<String> },
    /// Same removal semantics, used for columns known to carry no data.
    DropEmptyColumns { columns: Vec<String> },
    /// Keep rows whose column value differs from `exclude`. Null values do
    /// not equal the excluded value and are kept.
    FilterByStatus { column: String, exclude: String },
    /// Keep rows whose column value starts with `prefix`. Null values never
    /// match and are dropped.
    FilterByPrefix { column: String, prefix: String },
    /// Keep rows where every named column is non-null.
    FilterNonNull { columns: Vec<String> },
}

impl Transform {
    pub fn name(&self) -> &'static str {
        match self {
            Transform::DropColumns { .. } => "drop_columns",
            Transform::DropEmptyColumns { .. } => "drop_empty_columns",
            Transform::FilterByStatus { .. } => "filter_by_status",
            Transform::FilterByPrefix { .. } => "filter_by_prefix",
            Transform::FilterNonNull { .. } => "filter_non_null",
        }
    }

    /// Apply this transform, returning the new table and a summary line.
    pub fn apply(&self, table: &Table) -> Result<(Table, String)> {
        match self {
            Transform::DropColumns { columns } => {
                let dropped = present_columns(table, columns);
                let out = table.without_columns(columns);
                Ok((out, format!("Dropped columns: {dropped:?}")))
            },
            Transform::DropEmptyColumns { columns } => {
                let dropped = present_columns(table, columns);
                let out = table.without_columns(columns);
                Ok((out, format!("Dropped empty columns: {dropped:?}")))
            },
            Transform::FilterByStatus { column, exclude } => {
                let values = text_column(table, column)?;
                let mask: Vec<bool> = values
                    .iter()
                    .map(|v| v.as_deref() != Some(exclude.as_str()))
                    .collect();
                let out = table.filter_rows(&mask);
                let removed = table.num_rows() - out.num_rows();
                Ok((
                    out,
                    format!(
                        "Filtered out {removed} rows with {column}='{exclude}' ({:.1}%)",
                        percentage(removed, table.num_rows())
                    ),
                ))
            },
            Transform::FilterByPrefix { column, prefix } => {
                let values = text_column(table, column)?;
                let mask: Vec<bool> = values
                    .iter()
                    .map(|v| v.as_deref().is_some_and(|s| s.starts_with(prefix)))
                    .collect();
                let out = table.filter_rows(&mask);
                let removed = table.num_rows() - out.num_rows();
                let kept = out.num_rows();
                Ok((
                    out,
                    format!(
                        "Filtered to '{prefix}' rows: {kept} kept, {removed} removed ({:.1}%)",
                        percentage(removed, table.num_rows())
                    ),
                ))
            },
            Transform::FilterNonNull { columns } => {
                for name in columns {
                    if !table.has_column(name) {
                        return Err(AtlasError::MissingColumn {
                            column: name.clone(),
                        });
                    }
                }
                let mask: Vec<bool> = (0..table.num_rows())
                    .map(|row| {
                        columns.iter().all(|name| {
                            table
                                .column(name)
                                .is_some_and(|c| !c.values.is_null(row))
                        })
                    })
                    .collect();
                let out = table.filter_rows(&mask);
                let removed = table.num_rows() - out.num_rows();
                Ok((
                    out,
                    format!(
                        "Dropped {removed} rows with nulls in {columns:?} ({:.1}%)",
                        percentage(removed, table.num_rows())
                    ),
                ))
            },
        }
    }
}

/// Apply a transform chain strictly in order, logging row/column counts
/// around every step.
pub fn apply_chain(mut table: Table, transforms: &[Transform]) -> Result<Table> {
    for transform in transforms {
        info!(
            transform = transform.name(),
            rows = table.num_rows(),
            columns = table.num_columns(),
            "Applying transform"
        );
        let (next, summary) = transform.apply(&table)?;
        info!("{summary}");
        info!(
            transform = transform.name(),
            rows = next.num_rows(),
            columns = next.num_columns(),
            "Transform complete"
        );
        table = next;
    }
    Ok(table)
}

fn present_columns(table: &Table, names: &[String]) -> Vec<String> {
    names
        .iter()
        .filter(|n| table.has_column(n))
        .cloned()
        .collect()
}

fn text_column<'a>(table: &'a Table, name: &str) -> Result<&'a [Option<String>]> {
    let column: &Column = table.column(name).ok_or_else(|| AtlasError::MissingColumn {
        column: name.to_string(),
    })?;
    column.text_values().ok_or_else(|| {
        AtlasError::Config(format!(
            "filter column '{name}' does not hold string values"
        ))
    })
}

fn percentage(removed: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        100.0 * removed as f64 / total as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::{ColumnType, ColumnValues};

    fn catalog_table() -> Table {
        Table::new(vec![
            Column::new(
                "id",
                ColumnType::Int,
                ColumnValues::Int(vec![Some(1), Some(2), Some(3)]),
            ),
            Column::new(
                "catalogNumber",
                ColumnType::Text,
                ColumnValues::Text(vec![
                    Some("WSDA_1".to_string()),
                    Some("ABC_2".to_string()),
                    None,
                ]),
            ),
        ])
    }

    #[test]
    fn test_filter_by_prefix_excludes_nulls() {
        let transform = Transform::FilterByPrefix {
            column: "catalogNumber".to_string(),
            prefix: "WSDA_".to_string(),
        };
        let (out, summary) = transform.apply(&catalog_table()).unwrap();
        assert_eq!(out.num_rows(), 1);
        assert_eq!(
            out.column("catalogNumber").unwrap().values,
            ColumnValues::Text(vec![Some("WSDA_1".to_string())])
        );
        assert!(summary.contains("1 kept"));
        assert!(summary.contains("2 removed"));
    }

    #[test]
    fn test_filter_by_status_keeps_nulls() {
        let table = Table::new(vec![Column::new(
            "taxonomicStatus",
            ColumnType::Categorical,
            ColumnValues::Text(vec![
                Some("accepted".to_string()),
                Some("doubtful".to_string()),
                None,
                Some("synonym".to_string()),
            ]),
        )]);
        let transform = Transform::FilterByStatus {
            column: "taxonomicStatus".to_string(),
            exclude: "doubtful".to_string(),
        };
        let (out, _) = transform.apply(&table).unwrap();
        assert_eq!(out.num_rows(), 3);
        // surviving rows keep their relative order
        assert_eq!(
            out.column("taxonomicStatus").unwrap().values,
            ColumnValues::Text(vec![
                Some("accepted".to_string()),
                None,
                Some("synonym".to_string()),
            ])
        );
    }

    #[test]
    fn test_removed_count_matches_row_delta() {
        let table = catalog_table();
        let transform = Transform::FilterByPrefix {
            column: "catalogNumber".to_string(),
            prefix: "WSDA_".to_string(),
        };
        let (out, _) = transform.apply(&table).unwrap();
        assert_eq!(out.num_rows(), table.num_rows() - 2);
    }

    #[test]
    fn test_drop_columns_is_noop_when_absent() {
        let table = catalog_table();
        let transform = Transform::DropColumns {
            columns: vec!["datasetID".to_string()],
        };
        let (out, _) = transform.apply(&table).unwrap();
        assert_eq!(out.num_columns(), 2);
    }

    #[test]
    fn test_drop_columns_removes_present() {
        let table = catalog_table();
        let transform = Transform::DropColumns {
            columns: vec!["catalogNumber".to_string()],
        };
        let (out, summary) = transform.apply(&table).unwrap();
        assert_eq!(out.num_columns(), 1);
        assert!(summary.contains("catalogNumber"));
    }

    #[test]
    fn test_filter_non_null() {
        let table = catalog_table();
        let transform = Transform::FilterNonNull {
            columns: vec!["catalogNumber".to_string()],
        };
        let (out, _) = transform.apply(&table).unwrap();
        assert_eq!(out.num_rows(), 2);
    }

    #[test]
    fn test_filter_on_missing_column_is_error() {
        let transform = Transform::FilterByStatus {
            column: "missing".to_string(),
            exclude: "x".to_string(),
        };
        let err = transform.apply(&catalog_table()).unwrap_err();
        assert!(matches!(
            err,
            AtlasError::MissingColumn { column } if column == "missing"
        ));
    }

    #[test]
    fn test_chain_applies_in_order() {
        // prefix filter first, then drop the column it used
        let chain = vec![
            Transform::FilterByPrefix {
                column: "catalogNumber".to_string(),
                prefix: "WSDA_".to_string(),
            },
            Transform::DropColumns {
                columns: vec!["catalogNumber".to_string()],
            },
        ];
        let out = apply_chain(catalog_table(), &chain).unwrap();
        assert_eq!(out.num_rows(), 1);
        assert!(!out.has_column("catalogNumber"));

        // reversed order fails: the filter's column is already gone
        let reversed: Vec<Transform> = chain.into_iter().rev().collect();
        assert!(apply_chain(catalog_table(), &reversed).is_err());
    }
}
