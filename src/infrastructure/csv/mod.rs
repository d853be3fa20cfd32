// ============================================================
// CSV INFRASTRUCTURE LAYER
// ============================================================
// Byte decoding and CSV parsing for equipment uploads

mod csv_parser;

pub use csv_parser::CsvParser;
