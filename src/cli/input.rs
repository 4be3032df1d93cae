//! Barcode list parsing.
//!
//! One row per line: `barcode[,known product name]`. Blank lines and lines
//! starting with `#` are ignored, and a first line whose barcode column has
//! no digits at all is taken as a header.

use std::fs;
use std::path::Path;

use crate::batch::InputRow;
use crate::error::{Error, Result, ResultExt};

/// Read input rows from a text or CSV file.
pub fn read_rows(path: &Path) -> Result<Vec<InputRow>> {
    let contents = fs::read_to_string(path)
        .with_context(format!("reading input file {}", path.display()))?;
    let rows = parse_rows(&contents);
    if rows.is_empty() {
        return Err(Error::input(path, "no barcodes found"));
    }
    Ok(rows)
}

/// Parse input rows from file contents.
pub fn parse_rows(contents: &str) -> Vec<InputRow> {
    let mut rows = Vec::new();

    for (index, line) in contents.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let (barcode, name) = match line.split_once(',') {
            Some((barcode, name)) => (barcode.trim(), Some(unquote(name))),
            None => (line, None),
        };
        let barcode = unquote(barcode);

        if rows.is_empty() && index < 2 && looks_like_header(&barcode) {
            continue;
        }

        rows.push(InputRow {
            barcode,
            known_name: name.filter(|n| !n.is_empty()),
        });
    }

    rows
}

fn looks_like_header(barcode: &str) -> bool {
    !barcode.is_empty() && !barcode.chars().any(|c| c.is_ascii_digit())
}

fn unquote(field: &str) -> String {
    field.trim().trim_matches('"').trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_with_header_and_names() {
        let rows = parse_rows(
            "Barcode,Product Name\n8901030865278,\"Exo Round\"\n\n# comment\n0012345678905\n",
        );
        assert_eq!(
            rows,
            vec![
                InputRow::new("8901030865278").with_name("Exo Round"),
                InputRow::new("0012345678905"),
            ]
        );
    }

    #[test]
    fn test_malformed_rows_are_kept() {
        // Invalid barcodes are reported in the output, not dropped here
        let rows = parse_rows("0012345678905\nabc\n12-34\n");
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[1].barcode, "abc");
    }

    #[test]
    fn test_blank_name_is_none() {
        let rows = parse_rows("0012345678905,  \n");
        assert_eq!(rows[0].known_name, None);
    }

    #[test]
    fn test_read_rows_rejects_empty_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.csv");
        fs::write(&path, "# nothing here\n").unwrap();

        let err = read_rows(&path).unwrap_err();
        assert!(err.to_string().contains("no barcodes"));
    }

    #[test]
    fn test_read_rows_missing_file() {
        let err = read_rows(Path::new("/nonexistent/barcodes.csv")).unwrap_err();
        assert!(err.to_string().contains("reading input file"));
    }
}
