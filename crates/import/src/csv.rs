use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use cashline_core::ClassifiedRow;

use crate::rules::{RuleError, RuleRow};

pub const LEDGER_HEADER: [&str; 6] = [
    "dated_on",
    "description",
    "amount",
    "category_name",
    "department",
    "transaction_id",
];

/// Source of raw rule-table rows, read afresh on every sync pass.
pub trait RuleSource {
    fn load_rows(&self) -> Result<Vec<RuleRow>, RuleError>;
}

impl RuleSource for Vec<RuleRow> {
    fn load_rows(&self) -> Result<Vec<RuleRow>, RuleError> {
        Ok(self.clone())
    }
}

/// Two-column CSV rule table: a header row, then `(key, department)` rows.
#[derive(Debug, Clone)]
pub struct CsvRuleTable {
    path: PathBuf,
}

impl CsvRuleTable {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl RuleSource for CsvRuleTable {
    fn load_rows(&self) -> Result<Vec<RuleRow>, RuleError> {
        let file = std::fs::File::open(&self.path)?;
        read_rule_rows(file)
    }
}

pub fn read_rule_rows<R: Read>(data: R) -> Result<Vec<RuleRow>, RuleError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::None)
        .from_reader(data);

    let mut rows = Vec::new();
    for (idx, result) in reader.records().enumerate() {
        let record = result?;
        let row = idx + 1;

        // Rows of empty cells left behind by spreadsheet exports.
        if record.iter().all(|f| f.trim().is_empty()) {
            continue;
        }

        match (record.get(0), record.get(1)) {
            (Some(key), Some(department)) => rows.push(RuleRow::new(row, key, department)),
            _ => {
                return Err(RuleError::Malformed {
                    row,
                    reason: format!("expected 2 columns, found {}", record.len()),
                })
            }
        }
    }

    Ok(rows)
}

/// Writes the ledger as CSV with a header row, preserving row order.
pub fn write_ledger<W: Write>(out: W, rows: &[ClassifiedRow]) -> Result<(), csv::Error> {
    let mut writer = csv::Writer::from_writer(out);
    writer.write_record(LEDGER_HEADER)?;
    for row in rows {
        writer.write_record([
            row.dated_on.to_string(),
            row.description.clone(),
            row.amount.to_string(),
            row.category_name.clone(),
            row.department.clone(),
            row.transaction_id.clone(),
        ])?;
    }
    writer.flush()?;
    Ok(())
}
