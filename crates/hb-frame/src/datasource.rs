//! Columnar input data: named `f64` columns of equal length.

use std::collections::HashMap;
use std::fs::File;
use std::path::Path;
use std::sync::Arc;

use arrow::array::AsArray;
use arrow::compute::cast;
use arrow::datatypes::{DataType, Float64Type};
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;

use crate::error::{FrameError, Result};
use crate::lookup::LookupTable;

/// In-memory table the lazy graph reads from.
///
/// Columns keep their insertion (or file) order. Lookup tables registered
/// here are callable from every expression compiled against this source.
#[derive(Debug, Clone, Default)]
pub struct DataSource {
    names: Vec<String>,
    columns: HashMap<String, Arc<Vec<f64>>>,
    n_entries: usize,
    lookups: HashMap<String, Arc<LookupTable>>,
}

impl DataSource {
    /// Build a source from `(name, values)` pairs.
    pub fn from_columns<I, S>(columns: I) -> Result<Self>
    where
        I: IntoIterator<Item = (S, Vec<f64>)>,
        S: Into<String>,
    {
        let mut src = DataSource::default();
        for (name, values) in columns {
            src.push_column(name.into(), values)?;
        }
        Ok(src)
    }

    fn push_column(&mut self, name: String, values: Vec<f64>) -> Result<()> {
        if self.columns.contains_key(&name) {
            return Err(FrameError::InvalidArgument(format!("duplicate column '{name}'")));
        }
        if self.names.is_empty() {
            self.n_entries = values.len();
        } else if values.len() != self.n_entries {
            return Err(FrameError::InvalidArgument(format!(
                "column '{name}' has {} entries, expected {}",
                values.len(),
                self.n_entries
            )));
        }
        self.names.push(name.clone());
        self.columns.insert(name, Arc::new(values));
        Ok(())
    }

    /// Read every numeric or boolean column of a Parquet file.
    ///
    /// Integer, float and boolean columns are widened to `f64` (nulls become
    /// `NaN`); columns of other types are skipped.
    pub fn from_parquet(path: &Path) -> Result<Self> {
        let file = File::open(path)?;
        let builder = ParquetRecordBatchReaderBuilder::try_new(file)?;

        let mut names: Vec<String> = Vec::new();
        let mut keep: Vec<bool> = Vec::new();
        for field in builder.schema().fields() {
            let usable = is_numeric(field.data_type());
            if usable {
                names.push(field.name().clone());
            } else {
                log::debug!(
                    "skipping column '{}' of type {} in {}",
                    field.name(),
                    field.data_type(),
                    path.display()
                );
            }
            keep.push(usable);
        }

        let mut data: Vec<Vec<f64>> = vec![Vec::new(); names.len()];
        for batch in builder.build()? {
            let batch = batch?;
            let kept = batch.columns().iter().zip(&keep).filter(|(_, k)| **k);
            for ((col, _), dst) in kept.zip(data.iter_mut()) {
                let widened = cast(col.as_ref(), &DataType::Float64)?;
                let values = widened.as_primitive::<Float64Type>();
                dst.extend(values.iter().map(|v| v.unwrap_or(f64::NAN)));
            }
        }

        log::info!("loaded {} columns from {}", names.len(), path.display());
        DataSource::from_columns(names.into_iter().zip(data))
    }

    /// Register a lookup table callable as `name(...)` in expressions.
    pub fn with_lookup(mut self, name: impl Into<String>, table: LookupTable) -> Self {
        self.lookups.insert(name.into(), Arc::new(table));
        self
    }

    /// Number of rows.
    pub fn n_entries(&self) -> usize {
        self.n_entries
    }

    /// Column names in order.
    pub fn column_names(&self) -> &[String] {
        &self.names
    }

    /// Whether a column exists.
    pub fn has_column(&self, name: &str) -> bool {
        self.columns.contains_key(name)
    }

    /// Column data.
    pub fn column(&self, name: &str) -> Option<&Arc<Vec<f64>>> {
        self.columns.get(name)
    }

    /// Registered lookup tables.
    pub fn lookups(&self) -> &HashMap<String, Arc<LookupTable>> {
        &self.lookups
    }
}

fn is_numeric(dt: &DataType) -> bool {
    dt.is_numeric() || matches!(dt, DataType::Boolean)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_columns_keeps_order() {
        let src = DataSource::from_columns([("b", vec![1.0, 2.0]), ("a", vec![3.0, 4.0])]).unwrap();
        assert_eq!(src.column_names(), ["b", "a"]);
        assert_eq!(src.n_entries(), 2);
        assert_eq!(src.column("a").unwrap().as_slice(), &[3.0, 4.0]);
    }

    #[test]
    fn length_mismatch_rejected() {
        let err = DataSource::from_columns([("a", vec![1.0]), ("b", vec![1.0, 2.0])]).unwrap_err();
        assert!(err.to_string().contains("expected 1"));
    }

    #[test]
    fn duplicate_column_rejected() {
        assert!(DataSource::from_columns([("a", vec![1.0]), ("a", vec![2.0])]).is_err());
    }
}
