use crate::domain::dataset::{Dataset, DatasetDetail, DatasetOverview, OwnerKey};
use crate::domain::error::Result;
use crate::infrastructure::db::datasets::DatasetStore;
use std::sync::Arc;

/// Summaries returned by the history listing
pub const HISTORY_LIMIT: i64 = 5;

/// Read and delete operations over stored datasets
pub struct DatasetQueryUseCase {
    store: Arc<dyn DatasetStore>,
}

impl DatasetQueryUseCase {
    pub fn new(store: Arc<dyn DatasetStore>) -> Self {
        Self { store }
    }

    pub async fn overview(&self, id: i64) -> Result<DatasetOverview> {
        self.store.get_overview(id).await
    }

    pub async fn detail(&self, id: i64) -> Result<DatasetDetail> {
        self.store.get_detail(id).await
    }

    /// Newest summaries in the caller's bucket
    pub async fn history(&self, owner: OwnerKey) -> Result<Vec<DatasetOverview>> {
        self.store.list_recent_overviews(owner, HISTORY_LIMIT).await
    }

    pub async fn delete(&self, id: i64) -> Result<Dataset> {
        self.store.delete(id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::dataset::DatasetSummary;
    use crate::domain::equipment::EquipmentRow;
    use crate::domain::error::AppError;
    use crate::infrastructure::db::connection::connect_in_memory;
    use crate::infrastructure::db::datasets::DatasetRepository;

    fn rows() -> Vec<EquipmentRow> {
        vec![EquipmentRow {
            name: "Pump-1".to_string(),
            equipment_type: "Pump".to_string(),
            flowrate: 120.0,
            pressure: 5.2,
            temperature: 110.0,
        }]
    }

    async fn setup() -> (DatasetQueryUseCase, Arc<DatasetRepository>) {
        let pool = connect_in_memory().await.unwrap();
        let repo = Arc::new(DatasetRepository::new(pool));
        (DatasetQueryUseCase::new(repo.clone()), repo)
    }

    #[tokio::test]
    async fn test_overview_counts_records() {
        let (use_case, repo) = setup().await;
        let rows = rows();
        let created = repo
            .create(OwnerKey::Anonymous, "a.csv", &DatasetSummary::default(), &rows)
            .await
            .unwrap();

        let overview = use_case.overview(created.dataset.id).await.unwrap();
        assert_eq!(overview.records_count, 1);
        assert_eq!(overview.dataset.filename, "a.csv");
    }

    #[tokio::test]
    async fn test_history_is_capped_and_newest_first() {
        let (use_case, repo) = setup().await;
        let rows = rows();
        for i in 0..7 {
            repo.create(
                OwnerKey::Anonymous,
                &format!("f{i}.csv"),
                &DatasetSummary::default(),
                &rows,
            )
            .await
            .unwrap();
        }

        let history = use_case.history(OwnerKey::Anonymous).await.unwrap();
        assert_eq!(history.len(), HISTORY_LIMIT as usize);
        assert_eq!(history[0].dataset.filename, "f6.csv");
        assert!(history.iter().all(|o| o.records_count == 1));
    }

    #[tokio::test]
    async fn test_delete_then_missing() {
        let (use_case, repo) = setup().await;
        let created = repo
            .create(OwnerKey::Anonymous, "gone.csv", &DatasetSummary::default(), &rows())
            .await
            .unwrap();

        let removed = use_case.delete(created.dataset.id).await.unwrap();
        assert_eq!(removed.filename, "gone.csv");

        assert!(matches!(
            use_case.detail(created.dataset.id).await,
            Err(AppError::NotFound(_))
        ));
        assert!(matches!(
            use_case.overview(created.dataset.id).await,
            Err(AppError::NotFound(_))
        ));
        assert!(matches!(
            use_case.delete(created.dataset.id).await,
            Err(AppError::NotFound(_))
        ));
    }
}
