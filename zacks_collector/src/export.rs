//! Export writers
//! Raw screener tables as CSV, normalized records as CSV or SNAPPY-compressed Parquet

use arrow_array::{ArrayRef, RecordBatch, StringArray};
use arrow_schema::{DataType, Field, Schema};
use parquet::arrow::ArrowWriter;
use parquet::basic::Compression;
use parquet::file::properties::WriterProperties;
use serde::{Deserialize, Serialize};
use shared::{ParamBlock, Tabular};
use std::{fs::File, path::Path, sync::Arc};
use tracing::debug;

use crate::error::{Result, ScrapeError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    Csv,
    Parquet,
}

impl ExportFormat {
    pub fn extension(self) -> &'static str {
        match self {
            ExportFormat::Csv => "csv",
            ExportFormat::Parquet => "parquet",
        }
    }

    /// A `format` key in any block overrides `default`; the last one wins.
    pub fn from_blocks(blocks: &[ParamBlock], default: ExportFormat) -> Result<Self> {
        let mut format = default;
        for value in blocks.iter().filter_map(|b| b.get("format")) {
            format = match value.as_str().map(str::to_ascii_lowercase).as_deref() {
                Some("csv") => ExportFormat::Csv,
                Some("parquet") => ExportFormat::Parquet,
                _ => {
                    return Err(ScrapeError::InvalidValue {
                        id: "format".into(),
                        value: value.to_string(),
                        reason: "expected csv or parquet".into(),
                    })
                }
            };
        }
        Ok(format)
    }
}

/// Writes a downloaded table exactly as received, no header added.
pub fn write_table(path: &Path, rows: &[Vec<String>]) -> Result<()> {
    let mut writer = csv::WriterBuilder::new().flexible(true).from_path(path)?;
    for row in rows {
        writer.write_record(row)?;
    }
    writer.flush()?;
    debug!("wrote {} table rows to {}", rows.len(), path.display());
    Ok(())
}

pub fn write_records<R: Tabular>(path: &Path, rows: &[R], format: ExportFormat) -> Result<()> {
    match format {
        ExportFormat::Csv => write_csv(path, rows),
        ExportFormat::Parquet => write_parquet(path, rows),
    }
}

/// Header row of column labels, then one line per record.
pub fn write_csv<R: Tabular>(path: &Path, rows: &[R]) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)?;
    writer.write_record(R::headers())?;
    for row in rows {
        writer.write_record(row.cells())?;
    }
    writer.flush()?;
    debug!("wrote {} records to {}", rows.len(), path.display());
    Ok(())
}

/// Arrow schema with one non-null Utf8 column per record field.
pub fn schema_for<R: Tabular>() -> Schema {
    Schema::new(
        R::COLUMNS
            .iter()
            .map(|c| Field::new(c.name, DataType::Utf8, false))
            .collect::<Vec<_>>(),
    )
}

pub fn write_parquet<R: Tabular>(path: &Path, rows: &[R]) -> Result<()> {
    let schema = Arc::new(schema_for::<R>());
    let cells: Vec<Vec<&str>> = rows.iter().map(|r| r.cells()).collect();

    let columns: Vec<ArrayRef> = (0..R::COLUMNS.len())
        .map(|i| {
            let values: Vec<&str> = cells.iter().map(|row| row[i]).collect();
            Arc::new(StringArray::from(values)) as ArrayRef
        })
        .collect();
    let batch = RecordBatch::try_new(schema.clone(), columns)?;

    let props = WriterProperties::builder()
        .set_compression(Compression::SNAPPY)
        .build();
    let file = File::create(path)?;
    let mut writer = ArrowWriter::try_new(file, schema, Some(props))?;
    writer.write(&batch)?;
    writer.close()?;

    debug!("wrote {} records to {}", rows.len(), path.display());
    Ok(())
}
