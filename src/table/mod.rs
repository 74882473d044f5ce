//! Tabular assembler
//!
//! Turns resolved query results into a flat table.
//!
//! # Overview
//!
//! The table module provides:
//! - `assemble` - flattening, array expansion and lookup joins
//! - `Table` / `Column` - the materialized result
//! - Arrow `RecordBatch` conversion and Parquet output

mod assembler;
mod batch;
mod types;
mod writer;

pub use assembler::{assemble, VALUE_COLUMN};
pub use batch::{arrow_schema, arrow_type, to_record_batch};
pub use types::{Column, Table};
pub use writer::{write_parquet, write_table_to_parquet, ParquetWriterConfig};
