//! Parquet output
//!
//! Writes assembled tables to Parquet files through the Arrow writer.

use super::batch::to_record_batch;
use super::types::Table;
use crate::error::{Error, Result};
use parquet::arrow::ArrowWriter;
use parquet::basic::Compression;
use parquet::file::properties::WriterProperties;
use std::fs::File;
use std::io::Write;
use std::path::Path;
use tracing::info;

/// Configuration for Parquet output
#[derive(Debug, Clone)]
pub struct ParquetWriterConfig {
    compression: Compression,
    row_group_size: usize,
}

impl Default for ParquetWriterConfig {
    fn default() -> Self {
        Self {
            compression: Compression::SNAPPY,
            row_group_size: 1024 * 1024,
        }
    }
}

impl ParquetWriterConfig {
    /// Create a new config with default settings
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set compression algorithm
    #[must_use]
    pub fn with_compression(mut self, compression: Compression) -> Self {
        self.compression = compression;
        self
    }

    /// Set row group size
    #[must_use]
    pub fn with_row_group_size(mut self, size: usize) -> Self {
        self.row_group_size = size;
        self
    }

    /// Use no compression
    #[must_use]
    pub fn uncompressed(mut self) -> Self {
        self.compression = Compression::UNCOMPRESSED;
        self
    }

    /// Get row group size
    #[must_use]
    pub fn row_group_size(&self) -> usize {
        self.row_group_size
    }

    fn build_properties(&self) -> WriterProperties {
        WriterProperties::builder()
            .set_compression(self.compression)
            .set_max_row_group_size(self.row_group_size)
            .build()
    }
}

/// Write a table as Parquet into any writer
pub fn write_parquet<W: Write + Send>(
    sink: W,
    table: &Table,
    config: &ParquetWriterConfig,
) -> Result<usize> {
    let batch = to_record_batch(table)?;
    let mut writer = ArrowWriter::try_new(sink, batch.schema(), Some(config.build_properties()))
        .map_err(|e| Error::output(format!("Failed to create Parquet writer: {e}")))?;
    writer
        .write(&batch)
        .map_err(|e| Error::output(format!("Failed to write batch: {e}")))?;
    writer
        .close()
        .map_err(|e| Error::output(format!("Failed to close Parquet writer: {e}")))?;
    Ok(batch.num_rows())
}

/// Write a table to a Parquet file
pub fn write_table_to_parquet(
    path: impl AsRef<Path>,
    table: &Table,
    config: Option<&ParquetWriterConfig>,
) -> Result<usize> {
    let path = path.as_ref();
    let file = File::create(path)
        .map_err(|e| Error::output(format!("Failed to create file '{}': {e}", path.display())))?;

    let default_config = ParquetWriterConfig::default();
    let rows = write_parquet(file, table, config.unwrap_or(&default_config))?;
    info!(path = %path.display(), rows, "Wrote Parquet file");
    Ok(rows)
}
