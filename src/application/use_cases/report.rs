use crate::domain::error::Result;
use crate::infrastructure::db::datasets::DatasetStore;
use crate::infrastructure::report::{render_pdf, EquipmentReport};
use crate::infrastructure::response::report_filename;
use chrono::Utc;
use std::sync::Arc;
use tracing::info;

/// A rendered report ready to send as an attachment
pub struct RenderedReport {
    pub filename: String,
    pub bytes: Vec<u8>,
}

pub struct ReportUseCase {
    store: Arc<dyn DatasetStore>,
    max_records: usize,
}

impl ReportUseCase {
    pub fn new(store: Arc<dyn DatasetStore>, max_records: usize) -> Self {
        Self { store, max_records }
    }

    pub async fn execute(&self, dataset_id: i64) -> Result<RenderedReport> {
        let detail = self.store.get_detail(dataset_id).await?;
        let shown = detail.records.len().min(self.max_records);

        let report = EquipmentReport {
            dataset: &detail.dataset,
            records: &detail.records[..shown],
            total_records: detail.records.len(),
            generated_at: Utc::now(),
        };
        let bytes = render_pdf(&report)?;

        info!(
            dataset_id,
            records = shown,
            size = bytes.len(),
            "Report rendered"
        );

        Ok(RenderedReport {
            filename: report_filename(dataset_id),
            bytes,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::dataset::{DatasetSummary, OwnerKey};
    use crate::domain::equipment::EquipmentRow;
    use crate::domain::error::AppError;
    use crate::infrastructure::db::connection::connect_in_memory;
    use crate::infrastructure::db::datasets::DatasetRepository;

    #[tokio::test]
    async fn test_renders_named_pdf() {
        let pool = connect_in_memory().await.unwrap();
        let repo = Arc::new(DatasetRepository::new(pool));
        let rows: Vec<EquipmentRow> = (0..60)
            .map(|i| EquipmentRow {
                name: format!("Pump-{i}"),
                equipment_type: "Pump".to_string(),
                flowrate: 100.0,
                pressure: 5.0,
                temperature: 90.0,
            })
            .collect();
        let created = repo
            .create(OwnerKey::Anonymous, "big.csv", &DatasetSummary::default(), &rows)
            .await
            .unwrap();

        let use_case = ReportUseCase::new(repo, 50);
        let report = use_case.execute(created.dataset.id).await.unwrap();

        assert_eq!(
            report.filename,
            format!("equipment_report_{}.pdf", created.dataset.id)
        );
        assert!(report.bytes.starts_with(b"%PDF-"));
    }

    #[tokio::test]
    async fn test_missing_dataset_is_not_found() {
        let pool = connect_in_memory().await.unwrap();
        let use_case = ReportUseCase::new(Arc::new(DatasetRepository::new(pool)), 50);
        assert!(matches!(use_case.execute(99).await, Err(AppError::NotFound(_))));
    }
}
