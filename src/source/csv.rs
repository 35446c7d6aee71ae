//! Quoted-field CSV reader for raw sheet exports.
//!
//! A single-pass character tokenizer rather than a line/regex split:
//! exports contain quoted fields with embedded commas and newlines,
//! doubled-quote escapes, mixed CRLF / bare-LF endings, and usually a
//! trailing row with no final newline. Sheets also ship decorative
//! columns with blank headers and fully blank spacer rows; both are
//! filtered before rows are keyed by the (trimmed) header names.
//!
//! Stateless: the same text always tokenizes to the same rows.

use super::RawRow;

/// Parse CSV text into rows keyed by the first record's trimmed headers.
pub fn parse_rows(text: &str) -> Vec<RawRow> {
    let mut records = tokenize(text).into_iter().filter(|record| {
        record
            .iter()
            .any(|cell| !cell.trim().is_empty())
    });

    let Some(header_record) = records.next() else {
        return Vec::new();
    };

    // Keep only columns with a non-blank header.
    let columns: Vec<(usize, String)> = header_record
        .iter()
        .enumerate()
        .filter_map(|(idx, raw)| {
            let name = raw.trim();
            if name.is_empty() {
                None
            } else {
                Some((idx, name.to_string()))
            }
        })
        .collect();

    records
        .map(|record| {
            let mut row = RawRow::new();
            for (idx, name) in &columns {
                let value = record.get(*idx).cloned().unwrap_or_default();
                row.insert(name.clone(), value);
            }
            row
        })
        .collect()
}

fn tokenize(text: &str) -> Vec<Vec<String>> {
    let mut records: Vec<Vec<String>> = Vec::new();
    let mut record: Vec<String> = Vec::new();
    let mut cell = String::new();
    let mut in_quotes = false;
    let mut chars = text.chars().peekable();

    while let Some(ch) = chars.next() {
        if in_quotes {
            if ch == '"' {
                if chars.peek() == Some(&'"') {
                    chars.next();
                    cell.push('"');
                } else {
                    in_quotes = false;
                }
            } else {
                cell.push(ch);
            }
            continue;
        }
        match ch {
            '"' => in_quotes = true,
            ',' => record.push(std::mem::take(&mut cell)),
            '\r' => {
                if chars.peek() == Some(&'\n') {
                    chars.next();
                }
                record.push(std::mem::take(&mut cell));
                records.push(std::mem::take(&mut record));
            }
            '\n' => {
                record.push(std::mem::take(&mut cell));
                records.push(std::mem::take(&mut record));
            }
            _ => cell.push(ch),
        }
    }

    // Trailing row without a final newline.
    if !cell.is_empty() || !record.is_empty() {
        record.push(cell);
        records.push(record);
    }

    records
}
