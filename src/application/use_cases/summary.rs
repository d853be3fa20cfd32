use crate::domain::dataset::{DatasetSummary, TypeDistribution};
use crate::domain::equipment::{EquipmentRow, ValidatedTable};

/// Clean a validated table and compute its summary.
///
/// Rows with any missing field are dropped first; the surviving rows are the
/// ones summarized and persisted.
pub fn aggregate(table: &ValidatedTable) -> (DatasetSummary, Vec<EquipmentRow>) {
    let rows = clean_rows(table);
    let summary = summarize(&rows);
    (summary, rows)
}

pub fn clean_rows(table: &ValidatedTable) -> Vec<EquipmentRow> {
    table.rows.iter().filter_map(|row| row.complete()).collect()
}

pub fn summarize(rows: &[EquipmentRow]) -> DatasetSummary {
    if rows.is_empty() {
        return DatasetSummary::default();
    }

    let count = rows.len() as f64;
    let mut flowrate = 0.0;
    let mut pressure = 0.0;
    let mut temperature = 0.0;
    let mut type_distribution = TypeDistribution::new();

    for row in rows {
        flowrate += row.flowrate;
        pressure += row.pressure;
        temperature += row.temperature;
        *type_distribution
            .entry(row.equipment_type.clone())
            .or_insert(0) += 1;
    }

    DatasetSummary {
        total_count: rows.len() as i64,
        avg_flowrate: round2(flowrate / count),
        avg_pressure: round2(pressure / count),
        avg_temperature: round2(temperature / count),
        type_distribution,
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::equipment::ValidatedRow;

    fn row(name: &str, kind: &str, f: f64, p: f64, t: f64) -> ValidatedRow {
        ValidatedRow {
            name: Some(name.to_string()),
            equipment_type: Some(kind.to_string()),
            flowrate: Some(f),
            pressure: Some(p),
            temperature: Some(t),
        }
    }

    #[test]
    fn test_two_row_example() {
        let table = ValidatedTable::new(vec![
            row("Pump-1", "Pump", 120.0, 5.2, 110.0),
            row("Valve-1", "Valve", 80.0, 3.1, 95.0),
        ]);

        let (summary, rows) = aggregate(&table);

        assert_eq!(rows.len(), 2);
        assert_eq!(summary.total_count, 2);
        assert_eq!(summary.avg_flowrate, 100.0);
        assert_eq!(summary.avg_pressure, 4.15);
        assert_eq!(summary.avg_temperature, 102.5);
        assert_eq!(summary.type_distribution.get("Pump"), Some(&1));
        assert_eq!(summary.type_distribution.get("Valve"), Some(&1));
    }

    #[test]
    fn test_incomplete_rows_are_excluded() {
        let mut no_type = row("HX-1", "", 10.0, 1.0, 50.0);
        no_type.equipment_type = None;
        let mut no_temp = row("Pump-2", "Pump", 1000.0, 1.0, 0.0);
        no_temp.temperature = None;

        let table = ValidatedTable::new(vec![
            row("Pump-1", "Pump", 120.0, 5.0, 100.0),
            no_type,
            no_temp,
            row("   ", "Pump", 1.0, 1.0, 1.0),
        ]);

        let (summary, rows) = aggregate(&table);
        assert_eq!(rows.len(), 1);
        assert_eq!(summary.total_count, 1);
        assert_eq!(summary.avg_flowrate, 120.0);
        assert_eq!(summary.type_distribution.values().sum::<i64>(), 1);
    }

    #[test]
    fn test_no_surviving_rows_gives_zero_summary() {
        let mut partial = row("Pump-1", "Pump", 1.0, 1.0, 1.0);
        partial.flowrate = None;

        let (summary, rows) = aggregate(&ValidatedTable::new(vec![partial]));
        assert!(rows.is_empty());
        assert_eq!(summary.total_count, 0);
        assert_eq!(summary.avg_flowrate, 0.0);
        assert_eq!(summary.avg_pressure, 0.0);
        assert_eq!(summary.avg_temperature, 0.0);
        assert!(summary.type_distribution.is_empty());
    }

    #[test]
    fn test_distribution_sums_to_total() {
        let table = ValidatedTable::new(
            (0..9)
                .map(|i| {
                    let kind = ["Pump", "Valve", "Reactor"][i % 3];
                    row(&format!("E-{i}"), kind, 1.0, 2.0, 3.0)
                })
                .collect(),
        );

        let summary = summarize(&clean_rows(&table));
        assert_eq!(summary.total_count, 9);
        assert_eq!(summary.type_distribution.values().sum::<i64>(), 9);
        assert_eq!(summary.type_distribution["Reactor"], 3);
    }
}
