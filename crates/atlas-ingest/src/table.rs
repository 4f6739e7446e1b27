//! In-memory typed table
//!
//! A decoded dataset is held as ordered named columns with per-column typed
//! storage. Transformations never mutate a table in place; they build a new
//! one, so a transform chain is a sequence of pure table-to-table steps.

/// Semantic type declared for a column in a source schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    /// 64-bit integer, nulls rejected
    Int,
    /// 64-bit integer, nulls allowed
    NullableInt,
    /// 64-bit float, nulls allowed
    Float,
    /// Free-form string
    Text,
    /// String drawn from a small fixed set (taxonomic ranks, statuses)
    Categorical,
}

impl ColumnType {
    /// Whether null values are accepted for this type.
    pub fn is_nullable(self) -> bool {
        !matches!(self, ColumnType::Int)
    }
}

/// Typed column storage. `Categorical` and `Text` share string storage; the
/// declared [`ColumnType`] is kept alongside on [`Column`].
#[derive(Debug, Clone, PartialEq)]
pub enum ColumnValues {
    Int(Vec<Option<i64>>),
    Float(Vec<Option<f64>>),
    Text(Vec<Option<String>>),
}

impl ColumnValues {
    pub fn len(&self) -> usize {
        match self {
            ColumnValues::Int(v) => v.len(),
            ColumnValues::Float(v) => v.len(),
            ColumnValues::Text(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// True when the value at `row` is null.
    pub fn is_null(&self, row: usize) -> bool {
        match self {
            ColumnValues::Int(v) => v[row].is_none(),
            ColumnValues::Float(v) => v[row].is_none(),
            ColumnValues::Text(v) => v[row].is_none(),
        }
    }

    /// New storage containing the rows where `mask` is true, in order.
    fn filter(&self, mask: &[bool]) -> ColumnValues {
        fn keep<T: Clone>(values: &[Option<T>], mask: &[bool]) -> Vec<Option<T>> {
            values
                .iter()
                .zip(mask)
                .filter(|(_, keep)| **keep)
                .map(|(v, _)| v.clone())
                .collect()
        }

        match self {
            ColumnValues::Int(v) => ColumnValues::Int(keep(v, mask)),
            ColumnValues::Float(v) => ColumnValues::Float(keep(v, mask)),
            ColumnValues::Text(v) => ColumnValues::Text(keep(v, mask)),
        }
    }
}

/// One named, typed column.
#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    pub name: String,
    pub ty: ColumnType,
    pub values: ColumnValues,
}

impl Column {
    pub fn new(name: impl Into<String>, ty: ColumnType, values: ColumnValues) -> Self {
        Self {
            name: name.into(),
            ty,
            values,
        }
    }

    /// String values when this column has string storage.
    pub fn text_values(&self) -> Option<&[Option<String>]> {
        match &self.values {
            ColumnValues::Text(v) => Some(v),
            _ => None,
        }
    }
}

/// Ordered set of named columns, one row per record.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    columns: Vec<Column>,
}

impl Table {
    pub fn new(columns: Vec<Column>) -> Self {
        Self { columns }
    }

    pub fn num_rows(&self) -> usize {
        self.columns.first().map_or(0, |c| c.values.len())
    }

    pub fn num_columns(&self) -> usize {
        self.columns.len()
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column(name).is_some()
    }

    /// New table without the named columns; absent names are ignored.
    pub fn without_columns(&self, names: &[String]) -> Table {
        Table {
            columns: self
                .columns
                .iter()
                .filter(|c| !names.contains(&c.name))
                .cloned()
                .collect(),
        }
    }

    /// New table containing the rows where `mask` is true. Surviving rows
    /// keep their relative order (stable filter).
    pub fn filter_rows(&self, mask: &[bool]) -> Table {
        debug_assert_eq!(mask.len(), self.num_rows());
        Table {
            columns: self
                .columns
                .iter()
                .map(|c| Column {
                    name: c.name.clone(),
                    ty: c.ty,
                    values: c.values.filter(mask),
                })
                .collect(),
        }
    }
}
