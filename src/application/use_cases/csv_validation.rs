use crate::domain::csv::{
    columns, is_missing_marker, CsvTable, NUMERIC_COLUMNS, REQUIRED_COLUMNS,
};
use crate::domain::equipment::{ValidatedRow, ValidatedTable};
use crate::domain::error::{AppError, Result};

/// Checks an uploaded table's shape and produces typed rows.
///
/// Checks run in a fixed order: required columns, then row presence, then
/// numeric content. The first failing check decides the error.
pub fn validate_table(mut table: CsvTable) -> Result<ValidatedTable> {
    table.trim_headers();

    let missing: Vec<&str> = REQUIRED_COLUMNS
        .iter()
        .copied()
        .filter(|column| !table.has_column(column))
        .collect();
    if !missing.is_empty() {
        return Err(AppError::ValidationError(format!(
            "Missing required columns: {}",
            missing.join(", ")
        )));
    }

    if table.is_empty() {
        return Err(AppError::ValidationError("CSV file is empty".to_string()));
    }

    let mut numeric = Vec::with_capacity(NUMERIC_COLUMNS.len());
    for column in NUMERIC_COLUMNS {
        numeric.push(numeric_column(&table, column)?);
    }
    let [flowrates, pressures, temperatures]: [Vec<Option<f64>>; 3] = numeric
        .try_into()
        .map_err(|_| AppError::Internal("numeric column count mismatch".to_string()))?;

    let name_index = required_index(&table, columns::EQUIPMENT_NAME)?;
    let type_index = required_index(&table, columns::EQUIPMENT_TYPE)?;

    let rows = (0..table.row_count())
        .map(|row| ValidatedRow {
            name: text_cell(&table, row, name_index),
            equipment_type: text_cell(&table, row, type_index),
            flowrate: flowrates[row],
            pressure: pressures[row],
            temperature: temperatures[row],
        })
        .collect();

    Ok(ValidatedTable::new(rows))
}

fn required_index(table: &CsvTable, column: &str) -> Result<usize> {
    table
        .column_index(column)
        .ok_or_else(|| AppError::ValidationError(format!("Missing required columns: {}", column)))
}

fn text_cell(table: &CsvTable, row: usize, index: usize) -> Option<String> {
    table
        .cell(row, index)
        .filter(|cell| !is_missing_marker(cell))
        .map(str::to_string)
}

/// Parse every cell of a numeric column. Missing markers stay missing.
fn numeric_column(table: &CsvTable, column: &str) -> Result<Vec<Option<f64>>> {
    let index = required_index(table, column)?;
    table
        .column_values(index)
        .map(|cell| match cell {
            None => Ok(None),
            Some(raw) => parse_numeric(raw).ok_or_else(|| {
                AppError::ValidationError(format!(
                    "Column '{}' must contain numeric values",
                    column
                ))
            }),
        })
        .collect()
}

/// `Some(None)` for missing markers, `None` when the text is not a finite number
fn parse_numeric(raw: &str) -> Option<Option<f64>> {
    if is_missing_marker(raw) {
        return Some(None);
    }
    match raw.trim().parse::<f64>() {
        Ok(value) if value.is_finite() => Some(Some(value)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(headers: &[&str], rows: &[&[&str]]) -> CsvTable {
        CsvTable::new(
            headers.iter().map(|h| h.to_string()).collect(),
            rows.iter()
                .map(|row| {
                    row.iter()
                        .map(|cell| {
                            if cell.is_empty() {
                                None
                            } else {
                                Some(cell.to_string())
                            }
                        })
                        .collect()
                })
                .collect(),
        )
    }

    const HEADERS: [&str; 5] = ["Equipment Name", "Type", "Flowrate", "Pressure", "Temperature"];

    #[test]
    fn test_valid_table_is_typed() {
        let validated = validate_table(table(
            &HEADERS,
            &[&["Pump-1", "Pump", "120", "5.2", "110"], &["Valve-1", "Valve", " 80 ", "3.1", "95"]],
        ))
        .unwrap();

        assert_eq!(validated.rows.len(), 2);
        assert_eq!(validated.rows[0].name.as_deref(), Some("Pump-1"));
        assert_eq!(validated.rows[1].flowrate, Some(80.0));
        assert_eq!(validated.rows[1].temperature, Some(95.0));
    }

    #[test]
    fn test_headers_are_trimmed_before_checking() {
        let headers = [" Equipment Name ", "Type  ", "Flowrate", " Pressure", "Temperature"];
        let validated =
            validate_table(table(&headers, &[&["Pump-1", "Pump", "120", "5.2", "110"]])).unwrap();
        assert_eq!(validated.rows.len(), 1);
    }

    #[test]
    fn test_missing_columns_are_all_named() {
        let err = validate_table(table(
            &["Equipment Name", "Type", "Flowrate"],
            &[&["Pump-1", "Pump", "120"]],
        ))
        .unwrap_err();

        assert_eq!(
            err,
            AppError::ValidationError("Missing required columns: Pressure, Temperature".to_string())
        );
    }

    #[test]
    fn test_missing_columns_win_over_empty() {
        let err = validate_table(table(&["Type"], &[])).unwrap_err();
        assert!(err.message().starts_with("Missing required columns:"));
    }

    #[test]
    fn test_zero_rows_is_empty_error() {
        let err = validate_table(table(&HEADERS, &[])).unwrap_err();
        assert_eq!(err, AppError::ValidationError("CSV file is empty".to_string()));
    }

    #[test]
    fn test_non_numeric_value_names_column() {
        let err = validate_table(table(
            &HEADERS,
            &[&["Pump-1", "Pump", "120", "high", "110"]],
        ))
        .unwrap_err();

        assert_eq!(
            err,
            AppError::ValidationError("Column 'Pressure' must contain numeric values".to_string())
        );
    }

    #[test]
    fn test_infinite_value_is_not_numeric() {
        let err = validate_table(table(&HEADERS, &[&["Pump-1", "Pump", "inf", "5", "110"]]))
            .unwrap_err();
        assert_eq!(err.message(), "Column 'Flowrate' must contain numeric values");
    }

    #[test]
    fn test_blank_numeric_cells_stay_missing() {
        let validated = validate_table(table(
            &HEADERS,
            &[&["Pump-1", "Pump", "", "5.2", "NaN"]],
        ))
        .unwrap();

        assert_eq!(validated.rows[0].flowrate, None);
        assert_eq!(validated.rows[0].pressure, Some(5.2));
        assert_eq!(validated.rows[0].temperature, None);
    }

    #[test]
    fn test_missing_markers_in_numeric_cells() {
        let validated = validate_table(table(
            &HEADERS,
            &[&["Pump-2", "Pump", "N/A", "1", "1"], &["Pump-3", "Pump", "1", "null", "#N/A"]],
        ))
        .unwrap();

        assert_eq!(validated.rows[0].flowrate, None);
        assert_eq!(validated.rows[0].pressure, Some(1.0));
        assert_eq!(validated.rows[1].pressure, None);
        assert_eq!(validated.rows[1].temperature, None);
    }

    #[test]
    fn test_missing_markers_in_text_cells() {
        let validated = validate_table(table(
            &HEADERS,
            &[&["Pump-2", "NA", "100", "1", "1"], &["None", "Pump", "100", "1", "1"]],
        ))
        .unwrap();

        assert_eq!(validated.rows[0].equipment_type, None);
        assert_eq!(validated.rows[1].name, None);
        assert!(validated.rows.iter().all(|row| row.complete().is_none()));
    }
}
