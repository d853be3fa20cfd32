// ============================================================
// EQUIPMENT CSV COLUMNS
// ============================================================

pub const EQUIPMENT_NAME: &str = "Equipment Name";
pub const EQUIPMENT_TYPE: &str = "Type";
pub const FLOWRATE: &str = "Flowrate";
pub const PRESSURE: &str = "Pressure";
pub const TEMPERATURE: &str = "Temperature";

/// Columns an equipment upload must carry, in reporting order
pub const REQUIRED_COLUMNS: [&str; 5] = [EQUIPMENT_NAME, EQUIPMENT_TYPE, FLOWRATE, PRESSURE, TEMPERATURE];

/// Columns whose values must parse as numbers
pub const NUMERIC_COLUMNS: [&str; 3] = [FLOWRATE, PRESSURE, TEMPERATURE];

/// Cell text read as a missing value in any column
pub const MISSING_MARKERS: [&str; 19] = [
    "", "#N/A", "#N/A N/A", "#NA", "-1.#IND", "-1.#QNAN", "-NaN", "-nan", "1.#IND", "1.#QNAN",
    "<NA>", "N/A", "NA", "NULL", "NaN", "None", "n/a", "nan", "null",
];

/// Whether a cell, once trimmed, is one of the missing-value markers
pub fn is_missing_marker(cell: &str) -> bool {
    MISSING_MARKERS.contains(&cell.trim())
}
