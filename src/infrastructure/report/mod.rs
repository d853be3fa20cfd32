// ============================================================
// PDF REPORT RENDERER
// ============================================================
// Paginated A4 equipment report built directly with lopdf

use crate::domain::dataset::Dataset;
use crate::domain::equipment::EquipmentRecord;
use crate::domain::error::{AppError, Result};
use chrono::{DateTime, Utc};
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, Stream, StringFormat};

const PAGE_WIDTH: i64 = 595;
const PAGE_HEIGHT: i64 = 842;
const MARGIN: i64 = 72;

const FONT_REGULAR: &str = "F1";
const FONT_BOLD: &str = "F2";

/// Record table column offsets from the left margin
const RECORD_COLUMNS: [i64; 5] = [0, 110, 200, 270, 340];
const RECORD_NAME_MAX_CHARS: usize = 20;

/// Everything the report shows for one dataset
pub struct EquipmentReport<'a> {
    pub dataset: &'a Dataset,
    /// Records to print, already capped
    pub records: &'a [EquipmentRecord],
    /// Records the dataset holds in total
    pub total_records: usize,
    pub generated_at: DateTime<Utc>,
}

impl<'a> EquipmentReport<'a> {
    pub fn is_truncated(&self) -> bool {
        self.total_records > self.records.len()
    }
}

/// Render the report to PDF bytes
pub fn render_pdf(report: &EquipmentReport<'_>) -> Result<Vec<u8>> {
    let pages = layout_report(report);
    let mut doc = build_document(pages)?;
    doc.compress();

    let mut buffer = Vec::new();
    doc.save_to(&mut buffer)
        .map_err(|e| AppError::Internal(format!("Failed to write PDF report: {}", e)))?;
    Ok(buffer)
}

fn build_document(pages: Vec<Vec<Operation>>) -> Result<Document> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let regular_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
        "Encoding" => "WinAnsiEncoding",
    });
    let bold_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica-Bold",
        "Encoding" => "WinAnsiEncoding",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! {
            FONT_REGULAR => regular_id,
            FONT_BOLD => bold_id,
        },
    });

    let mut kids: Vec<Object> = Vec::with_capacity(pages.len());
    for operations in pages {
        let content = Content { operations };
        let encoded = content
            .encode()
            .map_err(|e| AppError::Internal(format!("Failed to encode PDF page: {}", e)))?;
        let content_id = doc.add_object(Stream::new(dictionary! {}, encoded));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
        });
        kids.push(page_id.into());
    }

    let page_count = kids.len() as i64;
    let pages = dictionary! {
        "Type" => "Pages",
        "Kids" => kids,
        "Count" => page_count,
        "Resources" => resources_id,
        "MediaBox" => vec![int(0), int(0), int(PAGE_WIDTH), int(PAGE_HEIGHT)],
    };
    doc.objects.insert(pages_id, Object::Dictionary(pages));

    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    Ok(doc)
}

/// Lay the report out into per-page content operations
fn layout_report(report: &EquipmentReport<'_>) -> Vec<Vec<Operation>> {
    let dataset = report.dataset;
    let mut page = PageWriter::new();

    page.text_line(FONT_BOLD, 22, "Chemical Equipment Analysis Report", 30);
    page.text_line(FONT_REGULAR, 11, &format!("File: {}", dataset.filename), 4);
    page.text_line(
        FONT_REGULAR,
        11,
        &format!("Generated: {}", report.generated_at.format("%Y-%m-%d %H:%M:%S")),
        4,
    );
    page.text_line(
        FONT_REGULAR,
        11,
        &format!("Upload Date: {}", dataset.uploaded_at.format("%Y-%m-%d %H:%M:%S")),
        20,
    );

    page.heading("Summary Statistics");
    page.table_row(FONT_BOLD, 11, &[(0, "Metric"), (220, "Value")]);
    page.rule();
    let summary_rows = [
        ("Total Equipment Count", dataset.total_count.to_string()),
        ("Average Flowrate", format!("{:.2} L/min", dataset.avg_flowrate)),
        ("Average Pressure", format!("{:.2} bar", dataset.avg_pressure)),
        ("Average Temperature", format!("{:.2} \u{00b0}C", dataset.avg_temperature)),
    ];
    for (metric, value) in &summary_rows {
        page.table_row(FONT_REGULAR, 10, &[(0, *metric), (220, value.as_str())]);
    }
    page.gap(20);

    page.heading("Equipment Type Distribution");
    page.table_row(FONT_BOLD, 11, &[(0, "Equipment Type"), (220, "Count")]);
    page.rule();
    let mut distribution: Vec<(&String, &i64)> = dataset.type_distribution.iter().collect();
    distribution.sort_by(|a, b| b.1.cmp(a.1).then_with(|| a.0.cmp(b.0)));
    for (equipment_type, count) in distribution {
        let count = count.to_string();
        page.table_row(
            FONT_REGULAR,
            10,
            &[(0, equipment_type.as_str()), (220, count.as_str())],
        );
    }
    page.gap(20);

    page.heading("Equipment Records");
    if report.records.is_empty() {
        page.text_line(FONT_REGULAR, 10, "No equipment records.", 4);
        return page.finish();
    }

    if report.is_truncated() {
        page.text_line(
            FONT_REGULAR,
            10,
            &format!(
                "Showing first {} of {} records",
                report.records.len(),
                report.total_records
            ),
            10,
        );
    }

    let header = ["Name", "Type", "Flowrate", "Pressure", "Temperature"];
    record_header(&mut page, &header);
    for record in report.records {
        if page.would_overflow(14) {
            page.new_page();
            record_header(&mut page, &header);
        }
        let cells = [
            truncate_chars(&record.equipment_name, RECORD_NAME_MAX_CHARS),
            truncate_chars(&record.equipment_type, RECORD_NAME_MAX_CHARS),
            format!("{:.1}", record.flowrate),
            format!("{:.1}", record.pressure),
            format!("{:.1}", record.temperature),
        ];
        let row: Vec<(i64, &str)> = RECORD_COLUMNS
            .iter()
            .zip(cells.iter())
            .map(|(x, cell)| (*x, cell.as_str()))
            .collect();
        page.table_row(FONT_REGULAR, 9, &row);
    }

    page.finish()
}

fn record_header(page: &mut PageWriter, header: &[&str; 5]) {
    let row: Vec<(i64, &str)> = RECORD_COLUMNS
        .iter()
        .zip(header.iter())
        .map(|(x, label)| (*x, *label))
        .collect();
    page.table_row(FONT_BOLD, 10, &row);
    page.rule();
}

fn truncate_chars(value: &str, max: usize) -> String {
    if value.chars().count() <= max {
        value.to_string()
    } else {
        let mut cut: String = value.chars().take(max.saturating_sub(3)).collect();
        cut.push_str("...");
        cut
    }
}

/// Cursor-based writer that starts a new page when the bottom margin is hit
struct PageWriter {
    pages: Vec<Vec<Operation>>,
    current: Vec<Operation>,
    y: i64,
}

impl PageWriter {
    fn new() -> Self {
        Self {
            pages: Vec::new(),
            current: Vec::new(),
            y: PAGE_HEIGHT - MARGIN,
        }
    }

    fn would_overflow(&self, height: i64) -> bool {
        self.y - height < MARGIN
    }

    fn new_page(&mut self) {
        let finished = std::mem::take(&mut self.current);
        self.pages.push(finished);
        self.y = PAGE_HEIGHT - MARGIN;
    }

    fn ensure_space(&mut self, height: i64) {
        if self.would_overflow(height) {
            self.new_page();
        }
    }

    fn gap(&mut self, height: i64) {
        self.y -= height;
    }

    fn heading(&mut self, title: &str) {
        // Keep a heading together with at least a couple of rows
        self.ensure_space(60);
        self.text_line(FONT_BOLD, 14, title, 10);
    }

    fn text_line(&mut self, font: &str, size: i64, text: &str, space_after: i64) {
        self.ensure_space(size + space_after);
        self.y -= size;
        self.place_text(font, size, MARGIN, text);
        self.y -= space_after;
    }

    fn table_row(&mut self, font: &str, size: i64, cells: &[(i64, &str)]) {
        let height = size + 5;
        self.ensure_space(height);
        self.y -= size;
        for (offset, text) in cells {
            self.place_text(font, size, MARGIN + offset, text);
        }
        self.y -= 5;
    }

    fn rule(&mut self) {
        let y = self.y + 2;
        self.current.push(Operation::new("w", vec![Object::Real(0.5)]));
        self.current
            .push(Operation::new("m", vec![int(MARGIN), int(y)]));
        self.current
            .push(Operation::new("l", vec![int(PAGE_WIDTH - MARGIN), int(y)]));
        self.current.push(Operation::new("S", vec![]));
        self.y -= 4;
    }

    fn place_text(&mut self, font: &str, size: i64, x: i64, text: &str) {
        self.current.push(Operation::new("BT", vec![]));
        self.current
            .push(Operation::new("Tf", vec![font.into(), int(size)]));
        self.current.push(Operation::new("Td", vec![int(x), int(self.y)]));
        self.current.push(Operation::new("Tj", vec![pdf_text(text)]));
        self.current.push(Operation::new("ET", vec![]));
    }

    fn finish(mut self) -> Vec<Vec<Operation>> {
        if !self.current.is_empty() || self.pages.is_empty() {
            self.new_page();
        }
        self.pages
    }
}

fn int(value: i64) -> Object {
    Object::Integer(value)
}

/// Literal string in WinAnsi (Latin-1 range); other characters become '?'
fn pdf_text(text: &str) -> Object {
    let bytes = text
        .chars()
        .map(|c| match c as u32 {
            0x20..=0x7e | 0xa0..=0xff => c as u32 as u8,
            _ => b'?',
        })
        .collect();
    Object::String(bytes, StringFormat::Literal)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::dataset::{OwnerKey, TypeDistribution};

    fn dataset(total: i64) -> Dataset {
        let mut type_distribution = TypeDistribution::new();
        type_distribution.insert("Pump".to_string(), total);
        Dataset {
            id: 1,
            owner: OwnerKey::Anonymous,
            filename: "plant.csv".to_string(),
            uploaded_at: DateTime::from_timestamp_millis(1_700_000_000_000).unwrap(),
            total_count: total,
            avg_flowrate: 100.0,
            avg_pressure: 4.15,
            avg_temperature: 102.5,
            type_distribution,
        }
    }

    fn records(n: usize) -> Vec<EquipmentRecord> {
        (0..n)
            .map(|i| EquipmentRecord {
                id: i as i64 + 1,
                dataset_id: 1,
                position: i as i64,
                equipment_name: format!("Pump-{i}"),
                equipment_type: "Pump".to_string(),
                flowrate: 120.0,
                pressure: 5.2,
                temperature: 110.0,
            })
            .collect()
    }

    fn shown_strings(pages: &[Vec<Operation>]) -> Vec<Vec<u8>> {
        pages
            .iter()
            .flatten()
            .filter(|op| op.operator == "Tj")
            .filter_map(|op| match op.operands.first() {
                Some(Object::String(bytes, _)) => Some(bytes.clone()),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_small_report_fits_one_page() {
        let dataset = dataset(2);
        let records = records(2);
        let report = EquipmentReport {
            dataset: &dataset,
            records: &records,
            total_records: 2,
            generated_at: Utc::now(),
        };

        let pages = layout_report(&report);
        assert_eq!(pages.len(), 1);

        let strings = shown_strings(&pages);
        assert!(strings.contains(&b"Chemical Equipment Analysis Report".to_vec()));
        assert!(strings.contains(&b"Pump-1".to_vec()));
        assert!(!strings.iter().any(|s| s.starts_with(b"Showing first")));
    }

    #[test]
    fn test_truncated_report_notes_and_paginates() {
        let dataset = dataset(120);
        let all = records(120);
        let report = EquipmentReport {
            dataset: &dataset,
            records: &all[..50],
            total_records: 120,
            generated_at: Utc::now(),
        };

        assert!(report.is_truncated());
        let pages = layout_report(&report);
        assert!(pages.len() >= 2);

        let strings = shown_strings(&pages);
        assert!(strings.contains(&b"Showing first 50 of 120 records".to_vec()));
        assert!(strings.contains(&b"Pump-49".to_vec()));
        assert!(!strings.contains(&b"Pump-50".to_vec()));
    }

    #[test]
    fn test_render_produces_loadable_pdf() {
        let dataset = dataset(2);
        let records = records(2);
        let report = EquipmentReport {
            dataset: &dataset,
            records: &records,
            total_records: 2,
            generated_at: Utc::now(),
        };

        let bytes = render_pdf(&report).unwrap();
        assert!(bytes.starts_with(b"%PDF-1.5"));

        let doc = Document::load_mem(&bytes).unwrap();
        assert_eq!(doc.get_pages().len(), 1);
    }

    #[test]
    fn test_pdf_text_maps_degree_sign() {
        match pdf_text("4.15 \u{00b0}C \u{2603}") {
            Object::String(bytes, _) => assert_eq!(bytes, b"4.15 \xb0C ?".to_vec()),
            other => panic!("unexpected object {other:?}"),
        }
    }

    #[test]
    fn test_truncate_chars() {
        assert_eq!(truncate_chars("short", 20), "short");
        assert_eq!(truncate_chars("abcdefghij", 6), "abc...");
    }
}
