//! Upload decoding: bytes + declared format into an [`UploadedTable`].
//!
//! The format is chosen by a case-insensitive substring match on the
//! filename ("csv" / "xlsx"), as permissive as the dashboard has always
//! been — a stricter suffix check would reject uploads it used to accept.

use std::io::Cursor;

use serde_json::json;

use crate::document::{Node, NodeKind};
use crate::error::{ParseError, StateError};

/// Node id of the table presentation written into the upload region.
pub const TABLE_NODE_ID: &str = "uploaded-table";

/// A rectangular dataset with named, order-preserving columns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedTable {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl UploadedTable {
    pub fn new(columns: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        UploadedTable { columns, rows }
    }

    /// Look up a cell by row index and column name.
    pub fn cell(&self, row: usize, column: &str) -> Option<&str> {
        let col = self.columns.iter().position(|c| c == column)?;
        self.rows.get(row)?.get(col).map(String::as_str)
    }

    /// Serialize back to CSV, escaping commas, quotes and newlines. This is
    /// the wire form handed to the compute backend.
    pub fn to_csv(&self) -> String {
        let mut out = String::new();
        write_csv_row(&mut out, &self.columns);
        for row in &self.rows {
            write_csv_row(&mut out, row);
        }
        out
    }

    /// Build the presentation node written into the upload region: the
    /// table title (the uploaded filename) plus the rendered grid.
    pub fn to_node(&self, title: &str) -> Node {
        Node::new(TABLE_NODE_ID, NodeKind::Table)
            .with_prop("title", json!(title))
            .with_prop("columns", json!(self.columns))
            .with_prop("rows", json!(self.rows))
    }

    /// Read a table back out of its presentation node, together with the
    /// display filename it was uploaded under.
    pub fn from_node(node: &Node) -> Result<(UploadedTable, String), StateError> {
        let malformed = |what: &str| StateError::MalformedNode(node.id.clone(), what.to_string());

        let title = node
            .prop_str("title")
            .ok_or_else(|| malformed("missing title"))?
            .to_string();
        let columns: Vec<String> = node
            .prop("columns")
            .and_then(|v| serde_json::from_value(v.clone()).ok())
            .ok_or_else(|| malformed("missing columns"))?;
        let rows: Vec<Vec<String>> = node
            .prop("rows")
            .and_then(|v| serde_json::from_value(v.clone()).ok())
            .ok_or_else(|| malformed("missing rows"))?;

        Ok((UploadedTable { columns, rows }, title))
    }
}

fn write_csv_row(out: &mut String, cells: &[String]) {
    for (i, value) in cells.iter().enumerate() {
        if i > 0 {
            out.push(',');
        }
        if value.contains(',') || value.contains('"') || value.contains('\n') {
            let escaped = value.replace('"', "\"\"");
            out.push('"');
            out.push_str(&escaped);
            out.push('"');
        } else {
            out.push_str(value);
        }
    }
    out.push('\n');
}

/// Decode an uploaded byte blob into a table. The first row is the header.
pub fn parse_upload(bytes: &[u8], filename: &str) -> Result<UploadedTable, ParseError> {
    let fail = |cause: String| ParseError {
        filename: filename.to_string(),
        cause,
    };

    let lower = filename.to_lowercase();
    if lower.contains("csv") {
        from_csv(bytes).map_err(fail)
    } else if lower.contains("xlsx") {
        from_xlsx(bytes).map_err(fail)
    } else {
        Err(fail("unrecognized file format".to_string()))
    }
}

fn from_csv(bytes: &[u8]) -> Result<UploadedTable, String> {
    let text = std::str::from_utf8(bytes).map_err(|e| e.to_string())?;
    let mut lines = text.lines().filter(|l| !l.trim().is_empty());

    let header = lines.next().ok_or("CSV file is empty")?;
    let columns = parse_csv_row(header);
    let width = columns.len();

    let mut rows = Vec::new();
    for line in lines {
        let mut row = parse_csv_row(line);
        // Ragged rows are padded or truncated to the header width.
        row.resize(width, String::new());
        rows.push(row);
    }

    Ok(UploadedTable::new(columns, rows))
}

// Parse one CSV row, honoring quoted fields and doubled quotes.
fn parse_csv_row(line: &str) -> Vec<String> {
    let mut result = Vec::new();
    let mut current_field = String::new();
    let mut in_quotes = false;
    let mut chars = line.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '"' => {
                if in_quotes && chars.peek() == Some(&'"') {
                    current_field.push('"');
                    chars.next();
                } else {
                    in_quotes = !in_quotes;
                }
            }
            ',' if !in_quotes => {
                result.push(std::mem::take(&mut current_field));
            }
            _ => current_field.push(c),
        }
    }
    result.push(current_field);

    result
}

fn from_xlsx(bytes: &[u8]) -> Result<UploadedTable, String> {
    use calamine::{Data, Reader, Xlsx};

    let mut workbook = Xlsx::new(Cursor::new(bytes.to_vec())).map_err(|e| e.to_string())?;

    let sheet_name = workbook
        .sheet_names()
        .first()
        .cloned()
        .ok_or("No sheets found in Excel file")?;
    let range = workbook
        .worksheet_range(&sheet_name)
        .map_err(|e| e.to_string())?;

    let mut rows_iter = range.rows();
    let header = rows_iter.next().ok_or("Excel sheet is empty")?;
    let columns: Vec<String> = header.iter().map(format_cell).collect();

    let rows: Vec<Vec<String>> = rows_iter
        .map(|row| {
            let mut cells: Vec<String> = row.iter().map(format_cell).collect();
            cells.resize(columns.len(), String::new());
            cells
        })
        .collect();

    fn format_cell(cell: &Data) -> String {
        match cell {
            Data::Empty => String::new(),
            Data::String(s) => s.clone(),
            Data::Int(i) => i.to_string(),
            Data::Float(f) => f.to_string(),
            Data::Bool(b) => b.to_string(),
            other => other.to_string(),
        }
    }

    Ok(UploadedTable::new(columns, rows))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn csv_round_trip_preserves_rows_and_columns() {
        let csv = "H1,H2\na,1\nb,2\n";
        let table = parse_upload(csv.as_bytes(), "topo.csv").unwrap();

        assert_eq!(table.columns, vec!["H1", "H2"]);
        assert_eq!(table.rows, vec![vec!["a", "1"], vec!["b", "2"]]);

        let reparsed = parse_upload(table.to_csv().as_bytes(), "topo.csv").unwrap();
        assert_eq!(reparsed, table);
    }

    #[test]
    fn csv_quoted_fields_round_trip() {
        let csv = "name,note\n\"a,b\",\"say \"\"hi\"\"\"\n";
        let table = parse_upload(csv.as_bytes(), "quoted.csv").unwrap();
        assert_eq!(table.rows[0], vec!["a,b", "say \"hi\""]);

        let reparsed = parse_upload(table.to_csv().as_bytes(), "quoted.csv").unwrap();
        assert_eq!(reparsed, table);
    }

    #[test]
    fn format_match_is_permissive_and_case_insensitive() {
        assert!(parse_upload(b"A\n1\n", "TOPO.CSV").is_ok());
        // Substring match, same as the source: "csv" anywhere qualifies.
        assert!(parse_upload(b"A\n1\n", "backup.csv.old").is_ok());
    }

    #[test]
    fn unrecognized_format_is_a_parse_error() {
        let err = parse_upload(b"whatever", "topology.txt").unwrap_err();
        assert_eq!(err.filename, "topology.txt");
    }

    #[test]
    fn empty_csv_is_a_parse_error() {
        assert!(parse_upload(b"", "empty.csv").is_err());
    }

    #[test]
    fn ragged_rows_are_padded_to_the_header() {
        let table = parse_upload(b"A,B,C\n1\n", "r.csv").unwrap();
        assert_eq!(table.rows[0], vec!["1", "", ""]);
    }

    #[test]
    fn cell_lookup_by_column_name() {
        let table = parse_upload(b"ip,port\n10.0.0.1,80\n", "t.csv").unwrap();
        assert_eq!(table.cell(0, "port"), Some("80"));
        assert_eq!(table.cell(0, "missing"), None);
        assert_eq!(table.cell(5, "ip"), None);
    }

    #[test]
    fn presentation_node_round_trip() {
        let table = parse_upload(b"H1,H2\na,1\n", "topo.csv").unwrap();
        let node = table.to_node("topo.csv");
        let (back, title) = UploadedTable::from_node(&node).unwrap();
        assert_eq!(back, table);
        assert_eq!(title, "topo.csv");
    }
}
