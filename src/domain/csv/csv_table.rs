// ============================================================
// CSV TABLE TYPES
// ============================================================
// Column-addressable view over parsed CSV content

use serde::{Deserialize, Serialize};

/// Parsed CSV content: a header row plus data rows in file order.
///
/// A cell is `None` when the source field was empty.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CsvTable {
    /// Column headers as they appeared in the file
    pub headers: Vec<String>,

    /// Data rows, each with exactly `headers.len()` cells
    pub rows: Vec<Vec<Option<String>>>,
}

impl CsvTable {
    pub fn new(headers: Vec<String>, rows: Vec<Vec<Option<String>>>) -> Self {
        Self { headers, rows }
    }

    /// Strip surrounding whitespace from every header in place
    pub fn trim_headers(&mut self) {
        for header in &mut self.headers {
            let trimmed = header.trim();
            if trimmed.len() != header.len() {
                *header = trimmed.to_string();
            }
        }
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column_index(name).is_some()
    }

    /// Position of the first header equal to `name`
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|header| header == name)
    }

    /// Cell at (`row`, `column`), `None` when missing or out of range
    pub fn cell(&self, row: usize, column: usize) -> Option<&str> {
        self.rows
            .get(row)
            .and_then(|cells| cells.get(column))
            .and_then(|cell| cell.as_deref())
    }

    /// Iterate one column top to bottom
    pub fn column_values<'a>(&'a self, column: usize) -> impl Iterator<Item = Option<&'a str>> + 'a {
        self.rows
            .iter()
            .map(move |cells| cells.get(column).and_then(|cell| cell.as_deref()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> CsvTable {
        CsvTable::new(
            vec!["  Type ".to_string(), "Flowrate".to_string()],
            vec![
                vec![Some("Pump".to_string()), Some("120".to_string())],
                vec![Some("Valve".to_string()), None],
            ],
        )
    }

    #[test]
    fn test_trim_headers() {
        let mut table = table();
        assert!(!table.has_column("Type"));
        table.trim_headers();
        assert!(table.has_column("Type"));
        assert_eq!(table.column_index("Flowrate"), Some(1));
    }

    #[test]
    fn test_cell_and_column_access() {
        let table = table();
        assert_eq!(table.cell(0, 1), Some("120"));
        assert_eq!(table.cell(1, 1), None);
        assert_eq!(table.cell(5, 0), None);

        let values: Vec<_> = table.column_values(1).collect();
        assert_eq!(values, vec![Some("120"), None]);
    }
}
