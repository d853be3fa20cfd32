use once_cell::sync::Lazy;
use regex::Regex;

static PATH_PREFIX_PATTERN: Lazy<Regex> = Lazy::new(|| Regex::new(r"^.*[/\\]").unwrap());

static UNSAFE_CHARS_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"[\x00-\x1f\x7f"<>|:*?]"#).unwrap());

static MULTIPLE_SPACES_PATTERN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s{2,}").unwrap());

const MAX_FILENAME_LEN: usize = 255;

/// Cleans a client-supplied upload filename for storage and display
pub fn sanitize_filename(filename: &str) -> String {
    // Browsers on some platforms send the full client path
    let mut cleaned = PATH_PREFIX_PATTERN.replace(filename, "").to_string();

    cleaned = UNSAFE_CHARS_PATTERN.replace_all(&cleaned, "_").to_string();

    cleaned = MULTIPLE_SPACES_PATTERN
        .replace_all(&cleaned, " ")
        .to_string();

    cleaned = cleaned.trim().to_string();

    if cleaned.chars().count() > MAX_FILENAME_LEN {
        cleaned = cleaned.chars().take(MAX_FILENAME_LEN).collect();
    }

    cleaned
}

/// Whether the upload name carries a `.csv` extension
pub fn is_csv_filename(filename: &str) -> bool {
    filename.to_ascii_lowercase().ends_with(".csv")
}

/// Attachment name for a dataset's PDF report
pub fn report_filename(dataset_id: i64) -> String {
    format!("equipment_report_{}.pdf", dataset_id)
}
