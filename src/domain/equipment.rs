use serde::{Deserialize, Serialize};

/// A validated CSV row. Any field may still be missing; the aggregator's
/// clean step decides which rows survive.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ValidatedRow {
    pub name: Option<String>,
    pub equipment_type: Option<String>,
    pub flowrate: Option<f64>,
    pub pressure: Option<f64>,
    pub temperature: Option<f64>,
}

impl ValidatedRow {
    /// The complete row, or `None` when any field is missing or blank.
    pub fn complete(&self) -> Option<EquipmentRow> {
        let name = non_blank(self.name.as_deref())?;
        let equipment_type = non_blank(self.equipment_type.as_deref())?;

        Some(EquipmentRow {
            name,
            equipment_type,
            flowrate: self.flowrate?,
            pressure: self.pressure?,
            temperature: self.temperature?,
        })
    }
}

fn non_blank(value: Option<&str>) -> Option<String> {
    let trimmed = value?.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// Typed table handed from the validator to the aggregator
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ValidatedTable {
    pub rows: Vec<ValidatedRow>,
}

impl ValidatedTable {
    pub fn new(rows: Vec<ValidatedRow>) -> Self {
        Self { rows }
    }
}

/// One fully populated equipment reading
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EquipmentRow {
    pub name: String,
    pub equipment_type: String,
    pub flowrate: f64,
    pub pressure: f64,
    pub temperature: f64,
}

/// A persisted equipment row belonging to a dataset
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EquipmentRecord {
    pub id: i64,
    #[serde(skip_serializing, default)]
    pub dataset_id: i64,
    #[serde(skip_serializing, default)]
    pub position: i64,
    pub equipment_name: String,
    pub equipment_type: String,
    pub flowrate: f64,
    pub pressure: f64,
    pub temperature: f64,
}
