//! Writing the selected rows of a node to a Parquet file.

use std::fs::File;
use std::path::Path;
use std::sync::Arc;

use arrow::array::{ArrayRef, Float64Array};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use parquet::arrow::ArrowWriter;
use parquet::basic::Compression;
use parquet::file::properties::WriterProperties;

use crate::error::{FrameError, Result};
use crate::graph::Node;
use crate::runner::Pass;

/// Run an event loop for `node` and write `columns` of every selected row.
///
/// Returns the number of rows written.
pub(crate) fn write_snapshot(node: &Arc<Node>, path: &Path, columns: &[String]) -> Result<u64> {
    if columns.is_empty() {
        return Err(FrameError::InvalidArgument("snapshot needs at least one column".into()));
    }
    for name in columns {
        if node.resolve(name).is_none() {
            return Err(FrameError::UnknownColumn { column: name.clone(), expr: String::new() });
        }
    }

    let mut pass = Pass::new(&node.graph.source);
    let rows = pass.selection(node)?;
    let mut fields = Vec::with_capacity(columns.len());
    let mut arrays: Vec<ArrayRef> = Vec::with_capacity(columns.len());
    for name in columns {
        let full = pass.column(node, name)?;
        let values = Float64Array::from_iter_values(rows.iter().map(|&r| full[r as usize]));
        fields.push(Field::new(name, DataType::Float64, false));
        arrays.push(Arc::new(values));
    }
    let schema = Arc::new(Schema::new(fields));
    let batch = RecordBatch::try_new(Arc::clone(&schema), arrays)?;

    if let Some(dir) = path.parent()
        && !dir.as_os_str().is_empty()
    {
        std::fs::create_dir_all(dir)?;
    }
    let props = WriterProperties::builder().set_compression(Compression::SNAPPY).build();
    let mut writer = ArrowWriter::try_new(File::create(path)?, schema, Some(props))?;
    writer.write(&batch)?;
    writer.close()?;
    pass.into_filter_counts().commit();

    log::info!("snapshot: wrote {} rows x {} columns to {}", rows.len(), columns.len(), path.display());
    Ok(rows.len() as u64)
}
