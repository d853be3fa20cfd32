use crate::domain::dataset::{
    Dataset, DatasetDetail, DatasetOverview, DatasetSummary, OwnerKey, TypeDistribution,
};
use crate::domain::equipment::{EquipmentRecord, EquipmentRow};
use crate::domain::error::{AppError, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnection, SqlitePool};
use tracing::info;

/// Persistence for datasets and their equipment records
#[async_trait]
pub trait DatasetStore: Send + Sync {
    /// Persist a dataset and all of its rows in one transaction
    async fn create(
        &self,
        owner: OwnerKey,
        filename: &str,
        summary: &DatasetSummary,
        rows: &[EquipmentRow],
    ) -> Result<DatasetDetail>;

    /// `create` followed by the owner's retention sweep, committed together.
    /// Returns the new dataset and how many old datasets were removed.
    async fn create_with_retention(
        &self,
        owner: OwnerKey,
        filename: &str,
        summary: &DatasetSummary,
        rows: &[EquipmentRow],
        keep: i64,
    ) -> Result<(DatasetDetail, u64)>;

    /// Delete the owner's datasets beyond the `keep` most recent
    async fn enforce_retention(&self, owner: OwnerKey, keep: i64) -> Result<u64>;

    async fn get(&self, id: i64) -> Result<Dataset>;

    /// Dataset and its records read from one snapshot
    async fn get_detail(&self, id: i64) -> Result<DatasetDetail>;

    async fn record_count(&self, id: i64) -> Result<i64>;

    /// Dataset and its record count from a single statement
    async fn get_overview(&self, id: i64) -> Result<DatasetOverview>;

    /// Newest first, scoped to exactly one owner bucket
    async fn list_recent(&self, owner: OwnerKey, limit: i64) -> Result<Vec<Dataset>>;

    /// `list_recent` with each dataset's record count
    async fn list_recent_overviews(&self, owner: OwnerKey, limit: i64)
        -> Result<Vec<DatasetOverview>>;

    /// Remove a dataset and its records, returning what was removed
    async fn delete(&self, id: i64) -> Result<Dataset>;
}

pub struct DatasetRepository {
    pool: SqlitePool,
}

impl DatasetRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    async fn begin(&self) -> Result<sqlx::Transaction<'static, sqlx::Sqlite>> {
        self.pool
            .begin()
            .await
            .map_err(|e| AppError::DatabaseError(format!("Failed to start dataset tx: {e}")))
    }
}

#[async_trait]
impl DatasetStore for DatasetRepository {
    async fn create(
        &self,
        owner: OwnerKey,
        filename: &str,
        summary: &DatasetSummary,
        rows: &[EquipmentRow],
    ) -> Result<DatasetDetail> {
        let mut tx = self.begin().await?;
        let detail = insert_dataset(&mut tx, owner, filename, summary, rows).await?;
        tx.commit()
            .await
            .map_err(|e| AppError::DatabaseError(format!("Failed to commit dataset tx: {e}")))?;

        Ok(detail)
    }

    async fn create_with_retention(
        &self,
        owner: OwnerKey,
        filename: &str,
        summary: &DatasetSummary,
        rows: &[EquipmentRow],
        keep: i64,
    ) -> Result<(DatasetDetail, u64)> {
        let mut tx = self.begin().await?;
        let detail = insert_dataset(&mut tx, owner, filename, summary, rows).await?;
        let removed = delete_beyond(&mut tx, owner, keep).await?;
        tx.commit()
            .await
            .map_err(|e| AppError::DatabaseError(format!("Failed to commit dataset tx: {e}")))?;

        Ok((detail, removed))
    }

    async fn enforce_retention(&self, owner: OwnerKey, keep: i64) -> Result<u64> {
        let mut tx = self.begin().await?;
        let removed = delete_beyond(&mut tx, owner, keep).await?;
        tx.commit().await.map_err(|e| {
            AppError::DatabaseError(format!("Failed to commit retention tx: {e}"))
        })?;

        Ok(removed)
    }

    async fn get(&self, id: i64) -> Result<Dataset> {
        let mut conn = self
            .pool
            .acquire()
            .await
            .map_err(|e| AppError::DatabaseError(format!("Failed to acquire connection: {e}")))?;
        fetch_dataset(&mut conn, id).await
    }

    async fn get_detail(&self, id: i64) -> Result<DatasetDetail> {
        let mut tx = self.begin().await?;
        let dataset = fetch_dataset(&mut tx, id).await?;
        let records = fetch_records(&mut tx, id).await?;
        tx.commit()
            .await
            .map_err(|e| AppError::DatabaseError(format!("Failed to close dataset read: {e}")))?;

        Ok(DatasetDetail { dataset, records })
    }

    async fn record_count(&self, id: i64) -> Result<i64> {
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM equipment_records WHERE dataset_id = ?")
            .bind(id)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(format!("Failed to count records: {e}")))
    }

    async fn get_overview(&self, id: i64) -> Result<DatasetOverview> {
        let entity = sqlx::query_as::<_, DatasetOverviewEntity>(&format!(
            "{OVERVIEW_SELECT} WHERE d.id = ?"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(format!("Failed to fetch dataset: {e}")))?;

        match entity {
            Some(entity) => entity.try_into(),
            None => Err(AppError::NotFound("Dataset not found".to_string())),
        }
    }

    async fn list_recent(&self, owner: OwnerKey, limit: i64) -> Result<Vec<Dataset>> {
        let entities = sqlx::query_as::<_, DatasetEntity>(
            "SELECT id, owner_id, filename, uploaded_at, total_count, avg_flowrate, avg_pressure,
                    avg_temperature, type_distribution
             FROM datasets WHERE owner_id IS ?
             ORDER BY uploaded_at DESC, id DESC LIMIT ?",
        )
        .bind(owner.user_id())
        .bind(limit.max(0))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(format!("Failed to list datasets: {e}")))?;

        entities.into_iter().map(Dataset::try_from).collect()
    }

    async fn list_recent_overviews(
        &self,
        owner: OwnerKey,
        limit: i64,
    ) -> Result<Vec<DatasetOverview>> {
        let entities = sqlx::query_as::<_, DatasetOverviewEntity>(&format!(
            "{OVERVIEW_SELECT} WHERE d.owner_id IS ?
             ORDER BY d.uploaded_at DESC, d.id DESC LIMIT ?"
        ))
        .bind(owner.user_id())
        .bind(limit.max(0))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(format!("Failed to list datasets: {e}")))?;

        entities.into_iter().map(DatasetOverview::try_from).collect()
    }

    async fn delete(&self, id: i64) -> Result<Dataset> {
        let entity = sqlx::query_as::<_, DatasetEntity>(
            "DELETE FROM datasets WHERE id = ?
             RETURNING id, owner_id, filename, uploaded_at, total_count, avg_flowrate,
                       avg_pressure, avg_temperature, type_distribution",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(format!("Failed to delete dataset: {e}")))?;

        let dataset: Dataset = match entity {
            Some(entity) => entity.try_into()?,
            None => return Err(AppError::NotFound("Dataset not found".to_string())),
        };

        info!(dataset_id = id, filename = %dataset.filename, "Dataset deleted");
        Ok(dataset)
    }
}

async fn insert_dataset(
    conn: &mut SqliteConnection,
    owner: OwnerKey,
    filename: &str,
    summary: &DatasetSummary,
    rows: &[EquipmentRow],
) -> Result<DatasetDetail> {
    // Never older than the owner's newest dataset, so retention keeps this one
    let newest: Option<i64> =
        sqlx::query_scalar("SELECT MAX(uploaded_at) FROM datasets WHERE owner_id IS ?")
            .bind(owner.user_id())
            .fetch_one(&mut *conn)
            .await
            .map_err(|e| AppError::DatabaseError(format!("Failed to read upload times: {e}")))?;
    let now = Utc::now().timestamp_millis();
    let uploaded_at = newest.map_or(now, |newest| now.max(newest));
    let distribution = serde_json::to_string(&summary.type_distribution).map_err(|e| {
        AppError::Internal(format!("Failed to encode type distribution: {e}"))
    })?;

    let dataset_id = sqlx::query_scalar::<_, i64>(
        "INSERT INTO datasets (owner_id, filename, uploaded_at, total_count, avg_flowrate,
                               avg_pressure, avg_temperature, type_distribution)
         VALUES (?, ?, ?, ?, ?, ?, ?, ?) RETURNING id",
    )
    .bind(owner.user_id())
    .bind(filename)
    .bind(uploaded_at)
    .bind(summary.total_count)
    .bind(summary.avg_flowrate)
    .bind(summary.avg_pressure)
    .bind(summary.avg_temperature)
    .bind(&distribution)
    .fetch_one(&mut *conn)
    .await
    .map_err(|e| AppError::DatabaseError(format!("Failed to insert dataset: {e}")))?;

    let mut records = Vec::with_capacity(rows.len());
    for (position, row) in rows.iter().enumerate() {
        let position = position as i64;
        let record_id = sqlx::query_scalar::<_, i64>(
            "INSERT INTO equipment_records (dataset_id, position, equipment_name, equipment_type,
                                            flowrate, pressure, temperature)
             VALUES (?, ?, ?, ?, ?, ?, ?) RETURNING id",
        )
        .bind(dataset_id)
        .bind(position)
        .bind(&row.name)
        .bind(&row.equipment_type)
        .bind(row.flowrate)
        .bind(row.pressure)
        .bind(row.temperature)
        .fetch_one(&mut *conn)
        .await
        .map_err(|e| AppError::DatabaseError(format!("Failed to insert equipment record: {e}")))?;

        records.push(EquipmentRecord {
            id: record_id,
            dataset_id,
            position,
            equipment_name: row.name.clone(),
            equipment_type: row.equipment_type.clone(),
            flowrate: row.flowrate,
            pressure: row.pressure,
            temperature: row.temperature,
        });
    }

    let dataset = Dataset {
        id: dataset_id,
        owner,
        filename: filename.to_string(),
        uploaded_at: millis_to_datetime(uploaded_at)?,
        total_count: summary.total_count,
        avg_flowrate: summary.avg_flowrate,
        avg_pressure: summary.avg_pressure,
        avg_temperature: summary.avg_temperature,
        type_distribution: summary.type_distribution.clone(),
    };

    Ok(DatasetDetail { dataset, records })
}

/// Delete every dataset of `owner` past the `keep` newest. Equal timestamps
/// fall back to id, so the later insert survives.
async fn delete_beyond(conn: &mut SqliteConnection, owner: OwnerKey, keep: i64) -> Result<u64> {
    let removed: Vec<i64> = sqlx::query_scalar(
        "DELETE FROM datasets WHERE id IN (
             SELECT id FROM datasets WHERE owner_id IS ?
             ORDER BY uploaded_at DESC, id DESC LIMIT -1 OFFSET ?
         ) RETURNING id",
    )
    .bind(owner.user_id())
    .bind(keep.max(0))
    .fetch_all(&mut *conn)
    .await
    .map_err(|e| AppError::DatabaseError(format!("Failed to delete stale datasets: {e}")))?;

    if !removed.is_empty() {
        info!(owner = %owner, removed = removed.len(), dataset_ids = ?removed, "Retention removed old datasets");
    }

    Ok(removed.len() as u64)
}

async fn fetch_dataset(conn: &mut SqliteConnection, id: i64) -> Result<Dataset> {
    let entity = sqlx::query_as::<_, DatasetEntity>(
        "SELECT id, owner_id, filename, uploaded_at, total_count, avg_flowrate, avg_pressure,
                avg_temperature, type_distribution
         FROM datasets WHERE id = ?",
    )
    .bind(id)
    .fetch_optional(&mut *conn)
    .await
    .map_err(|e| AppError::DatabaseError(format!("Failed to fetch dataset: {e}")))?;

    match entity {
        Some(entity) => entity.try_into(),
        None => Err(AppError::NotFound("Dataset not found".to_string())),
    }
}

async fn fetch_records(conn: &mut SqliteConnection, dataset_id: i64) -> Result<Vec<EquipmentRecord>> {
    let records = sqlx::query_as::<_, EquipmentRecordEntity>(
        "SELECT id, dataset_id, position, equipment_name, equipment_type, flowrate, pressure, temperature
         FROM equipment_records WHERE dataset_id = ? ORDER BY position ASC",
    )
    .bind(dataset_id)
    .fetch_all(&mut *conn)
    .await
    .map_err(|e| AppError::DatabaseError(format!("Failed to fetch equipment records: {e}")))?;

    Ok(records.into_iter().map(|r| r.into()).collect())
}

fn millis_to_datetime(millis: i64) -> Result<DateTime<Utc>> {
    DateTime::from_timestamp_millis(millis)
        .ok_or_else(|| AppError::DatabaseError(format!("Invalid upload timestamp: {millis}")))
}

const OVERVIEW_SELECT: &str = "SELECT d.id, d.owner_id, d.filename, d.uploaded_at, d.total_count,
        d.avg_flowrate, d.avg_pressure, d.avg_temperature, d.type_distribution,
        (SELECT COUNT(*) FROM equipment_records r WHERE r.dataset_id = d.id) AS records_count
 FROM datasets d";

// Internal entities for database mapping
#[derive(sqlx::FromRow)]
struct DatasetEntity {
    id: i64,
    owner_id: Option<i64>,
    filename: String,
    uploaded_at: i64,
    total_count: i64,
    avg_flowrate: f64,
    avg_pressure: f64,
    avg_temperature: f64,
    type_distribution: String,
}

impl TryFrom<DatasetEntity> for Dataset {
    type Error = AppError;

    fn try_from(e: DatasetEntity) -> Result<Self> {
        let type_distribution: TypeDistribution = serde_json::from_str(&e.type_distribution)
            .map_err(|err| {
                AppError::DatabaseError(format!(
                    "Corrupt type distribution for dataset {}: {err}",
                    e.id
                ))
            })?;

        Ok(Self {
            id: e.id,
            owner: OwnerKey::from_user_id(e.owner_id),
            filename: e.filename,
            uploaded_at: millis_to_datetime(e.uploaded_at)?,
            total_count: e.total_count,
            avg_flowrate: e.avg_flowrate,
            avg_pressure: e.avg_pressure,
            avg_temperature: e.avg_temperature,
            type_distribution,
        })
    }
}

#[derive(sqlx::FromRow)]
struct DatasetOverviewEntity {
    #[sqlx(flatten)]
    dataset: DatasetEntity,
    records_count: i64,
}

impl TryFrom<DatasetOverviewEntity> for DatasetOverview {
    type Error = AppError;

    fn try_from(e: DatasetOverviewEntity) -> Result<Self> {
        Ok(Self {
            dataset: e.dataset.try_into()?,
            records_count: e.records_count,
        })
    }
}

#[derive(sqlx::FromRow)]
struct EquipmentRecordEntity {
    id: i64,
    dataset_id: i64,
    position: i64,
    equipment_name: String,
    equipment_type: String,
    flowrate: f64,
    pressure: f64,
    temperature: f64,
}

impl From<EquipmentRecordEntity> for EquipmentRecord {
    fn from(e: EquipmentRecordEntity) -> Self {
        Self {
            id: e.id,
            dataset_id: e.dataset_id,
            position: e.position,
            equipment_name: e.equipment_name,
            equipment_type: e.equipment_type,
            flowrate: e.flowrate,
            pressure: e.pressure,
            temperature: e.temperature,
        }
    }
}
