//! Terminal output: notes, tables, and scan record rendering.

use parcelscan_core::{ImageReference, ScanRecord, ScanSnapshot};

// ---------------------------------------------------------------------------
// ANSI Color/Style helpers
// ---------------------------------------------------------------------------

pub const RESET: &str = "\x1b[0m";
pub const BOLD: &str = "\x1b[1m";
pub const DIM: &str = "\x1b[2m";

pub const RED: &str = "\x1b[31m";
pub const GREEN: &str = "\x1b[32m";
pub const YELLOW: &str = "\x1b[33m";
pub const CYAN: &str = "\x1b[36m";

pub fn supports_color() -> bool {
    std::env::var("NO_COLOR").is_err()
        && (std::env::var("COLORTERM").is_ok()
            || std::env::var("TERM")
                .map(|t| t != "dumb")
                .unwrap_or(false))
}

fn paint(color: &str, s: &str) -> String {
    if supports_color() {
        format!("{color}{s}{RESET}")
    } else {
        s.to_string()
    }
}

pub fn strip_ansi(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    let mut chars = s.chars();
    while let Some(c) = chars.next() {
        if c == '\x1b' {
            for next in chars.by_ref() {
                if next == 'm' {
                    break;
                }
            }
        } else {
            result.push(c);
        }
    }
    result
}

// ---------------------------------------------------------------------------
// Formatted notes
// ---------------------------------------------------------------------------

pub fn note_info(msg: &str) {
    if supports_color() {
        println!("{CYAN}{BOLD}ℹ{RESET} {msg}");
    } else {
        println!("INFO: {msg}");
    }
}

pub fn note_warn(msg: &str) {
    if supports_color() {
        println!("{YELLOW}{BOLD}⚠{RESET} {msg}");
    } else {
        println!("WARN: {msg}");
    }
}

pub fn note_error(msg: &str) {
    if supports_color() {
        eprintln!("{RED}{BOLD}✗{RESET} {msg}");
    } else {
        eprintln!("ERROR: {msg}");
    }
}

pub fn note_success(msg: &str) {
    if supports_color() {
        println!("{GREEN}{BOLD}✓{RESET} {msg}");
    } else {
        println!("OK: {msg}");
    }
}

// ---------------------------------------------------------------------------
// Table rendering
// ---------------------------------------------------------------------------

pub enum Align {
    Left,
    Right,
}

pub struct Column {
    pub header: String,
    pub align: Align,
    pub max_width: Option<usize>,
}

impl Column {
    pub fn left(header: impl Into<String>) -> Self {
        Self { header: header.into(), align: Align::Left, max_width: None }
    }
    pub fn right(header: impl Into<String>) -> Self {
        Self { header: header.into(), align: Align::Right, max_width: None }
    }
    pub fn max(mut self, width: usize) -> Self {
        self.max_width = Some(width);
        self
    }
}

pub fn render_table(columns: &[Column], rows: &[Vec<String>]) -> String {
    let num_cols = columns.len();
    let mut widths: Vec<usize> = columns
        .iter()
        .map(|c| strip_ansi(&c.header).chars().count())
        .collect();
    for row in rows {
        for (i, cell) in row.iter().enumerate().take(num_cols) {
            let w = strip_ansi(cell).chars().count();
            let w = columns[i].max_width.map_or(w, |max| w.min(max));
            widths[i] = widths[i].max(w);
        }
    }

    let mut out = String::new();

    let header_cells: Vec<String> = columns
        .iter()
        .enumerate()
        .map(|(i, col)| pad_cell(&col.header, widths[i], &col.align))
        .collect();
    out.push_str(&format!("{BOLD}  {}  {RESET}\n", header_cells.join("  ")));

    let sep: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
    out.push_str(&format!("  {}  \n", sep.join("  ")));

    for row in rows {
        let cells: Vec<String> = (0..num_cols)
            .map(|i| {
                let cell = row.get(i).map(String::as_str).unwrap_or("");
                pad_cell(&truncate(cell, widths[i]), widths[i], &columns[i].align)
            })
            .collect();
        out.push_str(&format!("  {}  \n", cells.join("  ")));
    }

    out
}

/// Shorten plain cells that exceed `width`; colored cells are left alone.
fn truncate(s: &str, width: usize) -> String {
    if s.contains('\x1b') || s.chars().count() <= width || width < 2 {
        return s.to_string();
    }
    let mut cut: String = s.chars().take(width - 1).collect();
    cut.push('…');
    cut
}

fn pad_cell(s: &str, width: usize, align: &Align) -> String {
    let pad = width.saturating_sub(strip_ansi(s).chars().count());
    match align {
        Align::Left => format!("{s}{}", " ".repeat(pad)),
        Align::Right => format!("{}{s}", " ".repeat(pad)),
    }
}

// ---------------------------------------------------------------------------
// Scan records
// ---------------------------------------------------------------------------

fn image_location(record: &ScanRecord) -> String {
    match &record.image_reference {
        ImageReference::Remote { url } => url.clone(),
        ImageReference::Local { data_url } => format!("local image ({} chars)", data_url.len()),
    }
}

/// Confidence colored by how much to trust it.
pub fn format_confidence(confidence: u8) -> String {
    let color = match confidence {
        90..=u8::MAX => GREEN,
        75..=89 => YELLOW,
        _ => RED,
    };
    paint(color, &format!("{confidence}%"))
}

pub fn render_record(record: &ScanRecord) -> String {
    let mut out = String::new();
    out.push_str(&format!("  Address     {}\n", paint(BOLD, &record.display_address())));
    out.push_str(&format!("  Confidence  {}\n", format_confidence(record.confidence)));
    out.push_str(&format!(
        "  Captured    {}\n",
        record.captured_at.format("%Y-%m-%d %H:%M:%S UTC")
    ));
    out.push_str(&format!("  Image       {}\n", image_location(record)));
    out.push_str(&format!("  Scan id     {}\n", paint(DIM, record.id.as_str())));
    out
}

pub fn render_history(records: &[ScanRecord]) -> String {
    let columns = [
        Column::left("Address").max(40),
        Column::right("Confidence"),
        Column::left("Captured"),
        Column::left("Stored"),
    ];
    let rows: Vec<Vec<String>> = records
        .iter()
        .map(|r| {
            vec![
                r.display_address(),
                format_confidence(r.confidence),
                r.captured_at.format("%H:%M:%S").to_string(),
                if r.remote_stored { "remote" } else { "local" }.to_string(),
            ]
        })
        .collect();
    render_table(&columns, &rows)
}

pub fn render_snapshot(snapshot: &ScanSnapshot) -> String {
    let mut out = String::new();
    let status = if snapshot.scanning { "scanning" } else { "idle" };
    out.push_str(&format!(
        "  Status      {status} ({} scans total)\n",
        snapshot.total_scans
    ));
    match &snapshot.current {
        Some(record) => out.push_str(&render_record(record)),
        None => out.push_str("  No current result\n"),
    }
    if !snapshot.recent.is_empty() {
        out.push('\n');
        out.push_str(&render_history(&snapshot.recent));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use parcelscan_core::{RecognitionResult, ScanId};

    fn record(address: &str, remote: bool) -> ScanRecord {
        let image = if remote {
            ImageReference::Remote { url: "https://store/parcel_1.jpg".into() }
        } else {
            ImageReference::Local { data_url: "data:image/jpeg;base64,AAAA".into() }
        };
        ScanRecord::merge(
            ScanId::from("1"),
            Utc::now(),
            RecognitionResult::new(address, 88),
            image,
        )
    }

    #[test]
    fn strips_ansi() {
        let colored = format!("{GREEN}hello{RESET}");
        assert_eq!(strip_ansi(&colored), "hello");
    }

    #[test]
    fn renders_table_with_truncation() {
        let cols = vec![Column::left("Name").max(6), Column::right("Count")];
        let rows = vec![
            vec!["Alexandra".to_string(), "42".to_string()],
            vec!["Bob".to_string(), "7".to_string()],
        ];
        let table = render_table(&cols, &rows);
        assert!(table.contains("Alexa…"));
        assert!(table.contains("42"));
    }

    #[test]
    fn record_shows_address_and_image() {
        let text = strip_ansi(&render_record(&record("filled.count.soap", true)));
        assert!(text.contains("///filled.count.soap"));
        assert!(text.contains("88%"));
        assert!(text.contains("https://store/parcel_1.jpg"));
    }

    #[test]
    fn history_marks_local_images() {
        let text = strip_ansi(&render_history(&[record("index.home.raft", false)]));
        assert!(text.contains("local"));
    }
}
