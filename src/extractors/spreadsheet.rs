//! Spreadsheet and CSV extraction.
//!
//! Workbooks are read with calamine (XLSX, XLS, ODS), CSV with the csv crate.
//! Both end up as fixed-width text tables:
//!
//! ```text
//! | Region | Total |
//! +--------+-------+
//! | North  | 1200  |
//! | South  | 950   |
//! +--------+-------+
//! ```

use super::{ExtractedDocument, TextExtractor};
use crate::error::{Error, Result};

/// Cells longer than this are cut and end in `...`.
pub const MAX_CELL_CHARS: usize = 18;

const ELLIPSIS: &str = "...";

/// Extracts every worksheet of a workbook as a table.
#[cfg(feature = "office")]
#[derive(Debug, Clone, Copy, Default)]
pub struct SpreadsheetExtractor;

#[cfg(feature = "office")]
impl TextExtractor for SpreadsheetExtractor {
    fn extract(&self, bytes: &[u8]) -> Result<ExtractedDocument> {
        use calamine::{open_workbook_auto_from_rs, Reader};

        let mut workbook = open_workbook_auto_from_rs(std::io::Cursor::new(bytes))
            .map_err(|e| Error::Format(format!("failed to open workbook: {}", e)))?;

        let sheet_names: Vec<String> = workbook.sheet_names().to_vec();
        if sheet_names.is_empty() {
            return Err(Error::Format("no sheets found in workbook".to_string()));
        }

        let mut sheets = Vec::with_capacity(sheet_names.len());
        for name in &sheet_names {
            match workbook.worksheet_range(name) {
                Ok(range) => {
                    let rows: Vec<Vec<String>> = range
                        .rows()
                        .map(|row| row.iter().map(cell_to_string).collect())
                        .collect();
                    sheets.push((name.clone(), rows));
                },
                Err(e) => log::warn!("skipping unreadable sheet {:?}: {}", name, e),
            }
        }
        if sheets.is_empty() {
            return Err(Error::Format("no readable sheets in workbook".to_string()));
        }

        Ok(table_document(render_workbook(&sheets)))
    }
}

/// Render a calamine cell value as text.
#[cfg(feature = "office")]
fn cell_to_string(cell: &calamine::Data) -> String {
    use calamine::Data;

    match cell {
        Data::Empty => String::new(),
        Data::String(s) => s.clone(),
        Data::Int(i) => i.to_string(),
        Data::Float(f) => {
            if f.fract() == 0.0 && f.abs() < 1e15 {
                format!("{:.0}", f)
            } else {
                let formatted = format!("{:.4}", f);
                formatted.trim_end_matches('0').trim_end_matches('.').to_string()
            }
        },
        Data::Bool(b) => if *b { "TRUE" } else { "FALSE" }.to_string(),
        Data::DateTime(dt) => dt.as_f64().to_string(),
        Data::DateTimeIso(s) => s.clone(),
        Data::DurationIso(s) => s.clone(),
        Data::Error(e) => format!("#ERR:{:?}", e),
    }
}

/// Extracts a CSV file as a single table.
#[derive(Debug, Clone, Copy, Default)]
pub struct CsvExtractor;

impl TextExtractor for CsvExtractor {
    fn extract(&self, bytes: &[u8]) -> Result<ExtractedDocument> {
        let bytes = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes);
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_reader(bytes);

        let mut rows: Vec<Vec<String>> = Vec::new();
        for record in reader.byte_records() {
            let record = record.map_err(|e| Error::Format(format!("invalid CSV: {}", e)))?;
            rows.push(
                record
                    .iter()
                    .map(|field| String::from_utf8_lossy(field).into_owned())
                    .collect(),
            );
        }

        Ok(table_document(render_table(&rows)))
    }
}

fn table_document(lines: Vec<String>) -> ExtractedDocument {
    let width = lines.iter().map(|l| l.chars().count()).max();
    ExtractedDocument {
        lines,
        line_width_hint: width,
        tabular: true,
    }
}

/// Render sheets as tables, with a banner per sheet when there is more than one.
pub fn render_workbook(sheets: &[(String, Vec<Vec<String>>)]) -> Vec<String> {
    if let [(_, rows)] = sheets {
        return render_table(rows);
    }

    let mut lines = Vec::new();
    for (i, (name, rows)) in sheets.iter().enumerate() {
        if i > 0 {
            lines.push(String::new());
        }
        lines.push(format!("=== Sheet: {} ===", name));
        lines.extend(render_table(rows));
    }
    lines
}

/// Render rows as a padded text table.
///
/// The first row is treated as the header. Rows with no visible content are
/// skipped; a table with none left renders as `(empty sheet)`.
pub fn render_table(rows: &[Vec<String>]) -> Vec<String> {
    let rows: Vec<Vec<String>> = rows
        .iter()
        .filter(|row| row.iter().any(|cell| !cell.trim().is_empty()))
        .map(|row| row.iter().map(|cell| clip_cell(cell)).collect())
        .collect();

    let columns = rows.iter().map(Vec::len).max().unwrap_or(0);
    if rows.is_empty() || columns == 0 {
        return vec!["(empty sheet)".to_string()];
    }

    let mut widths = vec![1; columns];
    for row in &rows {
        for (i, cell) in row.iter().enumerate() {
            widths[i] = widths[i].max(cell.chars().count());
        }
    }

    let separator: String = widths
        .iter()
        .fold(String::from("+"), |mut acc, w| {
            acc.push_str(&"-".repeat(w + 2));
            acc.push('+');
            acc
        });

    let mut lines = Vec::with_capacity(rows.len() + 2);
    for (index, row) in rows.iter().enumerate() {
        let mut line = String::from("|");
        for (i, width) in widths.iter().enumerate() {
            let cell = row.get(i).map(String::as_str).unwrap_or("");
            let pad = width - cell.chars().count();
            line.push(' ');
            line.push_str(cell);
            line.push_str(&" ".repeat(pad));
            line.push_str(" |");
        }
        lines.push(line);
        if index == 0 {
            lines.push(separator.clone());
        }
    }
    if rows.len() > 1 {
        lines.push(separator);
    }
    lines
}

/// Flatten a cell to one line and cap it at [`MAX_CELL_CHARS`].
fn clip_cell(cell: &str) -> String {
    let flat = cell.split_whitespace().collect::<Vec<_>>().join(" ");
    if flat.chars().count() <= MAX_CELL_CHARS {
        return flat;
    }
    let keep = MAX_CELL_CHARS - ELLIPSIS.len();
    let mut clipped: String = flat.chars().take(keep).collect();
    clipped.push_str(ELLIPSIS);
    clipped
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rows(data: &[&[&str]]) -> Vec<Vec<String>> {
        data.iter()
            .map(|row| row.iter().map(|c| c.to_string()).collect())
            .collect()
    }

    #[test]
    fn test_render_table() {
        let table = render_table(&rows(&[&["Region", "Total"], &["North", "1200"], &["South", "950"]]));
        assert_eq!(
            table,
            vec![
                "| Region | Total |",
                "+--------+-------+",
                "| North  | 1200  |",
                "| South  | 950   |",
                "+--------+-------+",
            ]
        );
    }

    #[test]
    fn test_ragged_rows_are_padded() {
        let table = render_table(&rows(&[&["a", "b", "c"], &["1"]]));
        assert_eq!(table[2], "| 1 |   |   |");
    }

    #[test]
    fn test_long_cells_are_clipped() {
        let clipped = clip_cell("International Business Machines");
        assert_eq!(clipped, "International B...");
        assert_eq!(clipped.chars().count(), MAX_CELL_CHARS);
        assert_eq!(clip_cell("exactly eighteen c"), "exactly eighteen c");
        assert_eq!(clip_cell("multi\nline"), "multi line");
    }

    #[test]
    fn test_header_only_table() {
        assert_eq!(render_table(&rows(&[&["only"]])), vec!["| only |", "+------+"]);
    }

    #[test]
    fn test_empty_sheet() {
        assert_eq!(render_table(&rows(&[&["", " "]])), vec!["(empty sheet)"]);
        assert_eq!(render_table(&[]), vec!["(empty sheet)"]);
    }

    #[test]
    fn test_workbook_banners() {
        let sheets = vec![
            ("Q1".to_string(), rows(&[&["x"]])),
            ("Empty".to_string(), Vec::new()),
        ];
        let lines = render_workbook(&sheets);
        assert_eq!(lines[0], "=== Sheet: Q1 ===");
        assert!(lines.contains(&"=== Sheet: Empty ===".to_string()));
        assert_eq!(lines.last().map(String::as_str), Some("(empty sheet)"));

        let single = render_workbook(&sheets[..1]);
        assert!(!single[0].starts_with("==="));
    }

    #[test]
    fn test_csv_extraction() {
        let doc = CsvExtractor
            .extract(b"\xEF\xBB\xBFname,qty\n\"Widget, large\",3\nBolt\n")
            .unwrap();
        assert_eq!(
            doc.lines,
            vec![
                "| name          | qty |",
                "+---------------+-----+",
                "| Widget, large | 3   |",
                "| Bolt          |     |",
                "+---------------+-----+",
            ]
        );
        assert_eq!(doc.line_width_hint, Some(23));
    }
}
