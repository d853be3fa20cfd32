// ============================================================
// CSV DOMAIN LAYER
// ============================================================
// Core types for equipment CSV ingestion
// No I/O, no async

pub mod columns;
mod csv_table;

pub use columns::{is_missing_marker, NUMERIC_COLUMNS, REQUIRED_COLUMNS};
pub use csv_table::CsvTable;
