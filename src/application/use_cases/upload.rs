use crate::application::use_cases::csv_validation::validate_table;
use crate::application::use_cases::summary::aggregate;
use crate::domain::dataset::{DatasetDetail, OwnerKey};
use crate::domain::error::{AppError, Result};
use crate::infrastructure::csv::CsvParser;
use crate::infrastructure::db::datasets::DatasetStore;
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex};
use tracing::{debug, info, warn};

/// Lifecycle of one upload
#[derive(Debug, Clone, PartialEq)]
pub enum UploadState {
    Received,
    Parsed,
    Validated,
    Aggregated,
    Persisted,
    RetentionEnforced,
    Done,
    Failed(String),
}

impl fmt::Display for UploadState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UploadState::Received => write!(f, "received"),
            UploadState::Parsed => write!(f, "parsed"),
            UploadState::Validated => write!(f, "validated"),
            UploadState::Aggregated => write!(f, "aggregated"),
            UploadState::Persisted => write!(f, "persisted"),
            UploadState::RetentionEnforced => write!(f, "retention_enforced"),
            UploadState::Done => write!(f, "done"),
            UploadState::Failed(_) => write!(f, "failed"),
        }
    }
}

/// Per-upload state tracker that logs every transition
struct UploadRun<'a> {
    owner: OwnerKey,
    filename: &'a str,
    state: UploadState,
}

impl<'a> UploadRun<'a> {
    fn start(owner: OwnerKey, filename: &'a str) -> Self {
        debug!(owner = %owner, filename, state = %UploadState::Received, "Upload state");
        Self {
            owner,
            filename,
            state: UploadState::Received,
        }
    }

    fn advance(&mut self, next: UploadState) {
        debug!(
            owner = %self.owner,
            filename = self.filename,
            from = %self.state,
            to = %next,
            "Upload state"
        );
        self.state = next;
    }

    /// Record the failure and hand the original error back
    fn fail(&mut self, error: AppError) -> AppError {
        warn!(
            owner = %self.owner,
            filename = self.filename,
            from = %self.state,
            error = %error,
            "Upload failed"
        );
        self.state = UploadState::Failed(error.message().to_string());
        error
    }
}

/// Parse, validate, summarize and store an uploaded CSV, then apply the
/// owner's retention cap.
pub struct UploadUseCase {
    store: Arc<dyn DatasetStore>,
    parser: CsvParser,
    keep: i64,
    owner_locks: Mutex<HashMap<OwnerKey, Arc<tokio::sync::Mutex<()>>>>,
}

impl UploadUseCase {
    pub fn new(store: Arc<dyn DatasetStore>, keep: i64) -> Self {
        Self {
            store,
            parser: CsvParser::new(),
            keep,
            owner_locks: Mutex::new(HashMap::new()),
        }
    }

    pub async fn execute(
        &self,
        owner: OwnerKey,
        filename: &str,
        bytes: &[u8],
    ) -> Result<DatasetDetail> {
        let mut run = UploadRun::start(owner, filename);

        let table = self
            .parser
            .parse_bytes(bytes)
            .map_err(|e| run.fail(e))?;
        run.advance(UploadState::Parsed);

        let validated = validate_table(table).map_err(|e| run.fail(e))?;
        run.advance(UploadState::Validated);

        let (summary, rows) = aggregate(&validated);
        run.advance(UploadState::Aggregated);

        let lock = self.owner_lock(owner).map_err(|e| run.fail(e))?;
        let stored = {
            let _guard = lock.lock().await;
            self.store
                .create_with_retention(owner, filename, &summary, &rows, self.keep)
                .await
        };
        drop(lock);
        self.release_owner_lock(owner);

        let (detail, removed) = stored.map_err(|e| run.fail(e))?;
        // Both steps commit in one transaction
        run.advance(UploadState::Persisted);
        run.advance(UploadState::RetentionEnforced);
        run.advance(UploadState::Done);

        info!(
            dataset_id = detail.dataset.id,
            owner = %owner,
            filename,
            total_count = detail.dataset.total_count,
            removed,
            "Dataset uploaded"
        );

        Ok(detail)
    }

    fn owner_lock(&self, owner: OwnerKey) -> Result<Arc<tokio::sync::Mutex<()>>> {
        let mut locks = self
            .owner_locks
            .lock()
            .map_err(|_| AppError::Internal("Upload lock table poisoned".to_string()))?;
        Ok(locks.entry(owner).or_default().clone())
    }

    /// Drop the owner's lock entry once no upload holds or awaits it
    fn release_owner_lock(&self, owner: OwnerKey) {
        let Ok(mut locks) = self.owner_locks.lock() else {
            return;
        };
        if locks
            .get(&owner)
            .is_some_and(|lock| Arc::strong_count(lock) == 1)
        {
            locks.remove(&owner);
        }
    }
}
