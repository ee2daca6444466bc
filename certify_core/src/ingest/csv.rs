//! Minimal header-keyed CSV reading for project artifacts.

use std::collections::HashMap;

/// Splits one CSV line, honouring double-quoted fields and `""` escapes.
pub fn split_line(line: &str) -> Vec<String> {
    let mut fields = Vec::new();
    let mut current = String::new();
    let mut quoted = false;
    let mut chars = line.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '"' if quoted && chars.peek() == Some(&'"') => {
                current.push('"');
                chars.next();
            }
            '"' => quoted = !quoted,
            ',' if !quoted => fields.push(std::mem::take(&mut current)),
            _ => current.push(c),
        }
    }
    fields.push(current);
    fields
}

/// Parsed CSV document: a header plus rows keyed by column name.
#[derive(Debug)]
pub struct CsvTable {
    columns: HashMap<String, usize>,
    rows: Vec<Vec<String>>,
}

impl CsvTable {
    /// Parses a document whose first non-empty line is the header.
    ///
    /// Blank lines are skipped.
    pub fn parse(content: &str) -> Self {
        let mut lines = content.lines().map(|l| l.trim_end_matches('\r')).filter(|l| !l.trim().is_empty());

        let columns = lines
            .next()
            .map(|header| {
                split_line(header)
                    .into_iter()
                    .enumerate()
                    .map(|(i, name)| (name.trim().to_string(), i))
                    .collect()
            })
            .unwrap_or_default();

        Self {
            columns,
            rows: lines.map(split_line).collect(),
        }
    }

    /// Names from `required` the header lacks.
    pub fn missing_columns<'a>(&self, required: &[&'a str]) -> Vec<&'a str> {
        required.iter().copied().filter(|c| !self.columns.contains_key(*c)).collect()
    }

    /// Rows as name → trimmed value lookups.
    pub fn records(&self) -> impl Iterator<Item = CsvRecord<'_>> {
        self.rows.iter().map(move |row| CsvRecord {
            columns: &self.columns,
            row,
        })
    }
}

/// One row of a [`CsvTable`].
pub struct CsvRecord<'a> {
    columns: &'a HashMap<String, usize>,
    row: &'a [String],
}

impl<'a> CsvRecord<'a> {
    /// The trimmed value, or `None` if the column is absent or empty.
    pub fn get(&self, column: &str) -> Option<&'a str> {
        let index = *self.columns.get(column)?;
        self.row.get(index).map(|v| v.trim()).filter(|v| !v.is_empty())
    }
}
