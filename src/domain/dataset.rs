use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use super::equipment::EquipmentRecord;

/// Equipment type name to number of rows of that type
pub type TypeDistribution = BTreeMap<String, i64>;

/// Datasets kept per owner by default
pub const DEFAULT_RETENTION: i64 = 5;

/// Retention and listing bucket. Uploads without an authenticated user all
/// share the `Anonymous` bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum OwnerKey {
    #[default]
    Anonymous,
    User(i64),
}

impl OwnerKey {
    pub fn from_user_id(user_id: Option<i64>) -> Self {
        match user_id {
            Some(id) => OwnerKey::User(id),
            None => OwnerKey::Anonymous,
        }
    }

    /// Value stored in `datasets.owner_id`; `NULL` for the anonymous bucket
    pub fn user_id(&self) -> Option<i64> {
        match self {
            OwnerKey::Anonymous => None,
            OwnerKey::User(id) => Some(*id),
        }
    }
}

impl fmt::Display for OwnerKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OwnerKey::Anonymous => write!(f, "anonymous"),
            OwnerKey::User(id) => write!(f, "user:{}", id),
        }
    }
}

/// Aggregated statistics for one upload
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct DatasetSummary {
    pub total_count: i64,
    pub avg_flowrate: f64,
    pub avg_pressure: f64,
    pub avg_temperature: f64,
    pub type_distribution: TypeDistribution,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dataset {
    pub id: i64,
    #[serde(skip)]
    pub owner: OwnerKey,
    pub filename: String,
    pub uploaded_at: DateTime<Utc>,
    pub total_count: i64,
    pub avg_flowrate: f64,
    pub avg_pressure: f64,
    pub avg_temperature: f64,
    pub type_distribution: TypeDistribution,
}

/// Summary view returned by the summary and history endpoints
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetOverview {
    #[serde(flatten)]
    pub dataset: Dataset,
    pub records_count: i64,
}

/// A dataset together with its records in file order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetDetail {
    #[serde(flatten)]
    pub dataset: Dataset,
    pub records: Vec<EquipmentRecord>,
}
