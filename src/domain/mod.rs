pub mod dataset;
pub mod equipment;
pub mod error;
pub mod user;

// CSV ingestion module
pub mod csv;
