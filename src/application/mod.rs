pub mod use_cases;

pub use use_cases::auth::AuthUseCase;
pub use use_cases::datasets::DatasetQueryUseCase;
pub use use_cases::report::ReportUseCase;
pub use use_cases::upload::{UploadState, UploadUseCase};
