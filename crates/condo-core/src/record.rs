//! Header-keyed view over raw sheet rows.
//!
//! Row 1 of every sheet is the header. Later rows may be shorter than the
//! header (trailing blanks are dropped by the Sheets API) and are padded
//! with empty cells here.

use std::collections::HashMap;
use std::sync::Arc;

/// One data row addressed by column name.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    headers: Arc<HashMap<String, usize>>,
    cells: Vec<String>,
    row_number: usize,
}

impl Record {
    /// Split `values` (header row first) into records.
    ///
    /// Header names are trimmed. Rows with no non-blank cell are skipped.
    pub fn from_values(values: Vec<Vec<String>>) -> Vec<Record> {
        let mut rows = values.into_iter();
        let Some(header) = rows.next() else {
            return Vec::new();
        };
        let headers: Arc<HashMap<String, usize>> = Arc::new(
            header
                .iter()
                .enumerate()
                .map(|(i, name)| (name.trim().to_string(), i))
                .collect(),
        );
        rows.enumerate()
            .filter(|(_, cells)| cells.iter().any(|c| !c.trim().is_empty()))
            .map(|(i, cells)| Record {
                headers: Arc::clone(&headers),
                cells,
                // 1-based, header occupies row 1.
                row_number: i + 2,
            })
            .collect()
    }

    /// Build a single record from `(column, value)` pairs. Used by tests
    /// and in-memory stores.
    pub fn from_pairs<'a>(pairs: impl IntoIterator<Item = (&'a str, &'a str)>) -> Record {
        let (names, cells): (Vec<_>, Vec<_>) = pairs
            .into_iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .unzip();
        let headers = names.into_iter().enumerate().map(|(i, n)| (n, i)).collect();
        Record {
            headers: Arc::new(headers),
            cells,
            row_number: 2,
        }
    }

    /// Trimmed cell value, or `None` when the column is missing or blank.
    pub fn get(&self, column: &str) -> Option<&str> {
        let idx = *self.headers.get(column)?;
        let cell = self.cells.get(idx)?.trim();
        (!cell.is_empty()).then_some(cell)
    }

    /// Cell value with blanks as `""`.
    pub fn text(&self, column: &str) -> &str {
        self.get(column).unwrap_or("")
    }

    /// Sheet row number of this record (header is row 1).
    pub fn row_number(&self) -> usize {
        self.row_number
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid(rows: &[&[&str]]) -> Vec<Vec<String>> {
        rows.iter()
            .map(|r| r.iter().map(|c| c.to_string()).collect())
            .collect()
    }

    #[test]
    fn maps_by_header_and_pads_short_rows() {
        let records = Record::from_values(grid(&[
            &["ID_CASA", " NOMBRE ", "EMAIL"],
            &["1", "Ana"],
            &["", "", ""],
            &["3", "Luis", "l@x.com"],
        ]));
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].get("NOMBRE"), Some("Ana"));
        assert_eq!(records[0].get("EMAIL"), None);
        assert_eq!(records[0].row_number(), 2);
        assert_eq!(records[1].text("EMAIL"), "l@x.com");
        assert_eq!(records[1].row_number(), 4);
    }

    #[test]
    fn empty_sheet_has_no_records() {
        assert!(Record::from_values(Vec::new()).is_empty());
        assert!(Record::from_values(grid(&[&["A", "B"]])).is_empty());
    }

    #[test]
    fn missing_column_is_none() {
        let r = Record::from_pairs([("A", "1")]);
        assert_eq!(r.get("B"), None);
        assert_eq!(r.text("B"), "");
    }
}
