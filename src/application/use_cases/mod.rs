pub mod auth;
pub mod csv_validation;
pub mod datasets;
pub mod report;
pub mod summary;
pub mod upload;
