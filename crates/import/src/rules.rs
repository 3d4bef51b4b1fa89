use std::collections::HashMap;

use cashline_core::Transaction;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Prefix that turns a rule-table key into a keyword rule.
pub const KEYWORD_MARKER: char = '*';
pub const KEYWORD_LABEL_PREFIX: &str = "Auto: ";
pub const DEFAULT_CATEGORY: &str = "Uncategorised";
pub const DEFAULT_DEPARTMENT: &str = "General Administrative";

#[derive(Debug, Error)]
pub enum RuleError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("rule row {row}: {reason}")]
    Malformed { row: usize, reason: String },
}

/// One untyped `(key, department)` row of the rule table.
///
/// `row` is the 1-based data row number (the header is not counted).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleRow {
    pub row: usize,
    pub key: String,
    pub department: String,
}

impl RuleRow {
    pub fn new(row: usize, key: &str, department: &str) -> Self {
        RuleRow {
            row,
            key: key.to_string(),
            department: department.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum MappingRule {
    /// Literal match against the source-provided category name.
    Exact {
        category_name: String,
        department: String,
    },
    /// Case-insensitive substring match against the description.
    Keyword {
        keyword: String,
        category_label: String,
        department: String,
    },
}

impl MappingRule {
    pub fn parse(row: &RuleRow) -> Result<Self, RuleError> {
        let malformed = |reason: &str| RuleError::Malformed {
            row: row.row,
            reason: reason.to_string(),
        };

        let key = row.key.trim();
        let department = row.department.trim();

        if key.is_empty() {
            return Err(malformed("empty key"));
        }
        if department.is_empty() {
            return Err(malformed("empty department"));
        }

        if key.starts_with(KEYWORD_MARKER) {
            // Inner spacing is kept: "* fee" must not match "coffee".
            let stripped = key.replace(KEYWORD_MARKER, "");
            if stripped.trim().is_empty() {
                return Err(malformed("keyword is empty after removing markers"));
            }
            Ok(MappingRule::Keyword {
                keyword: stripped.to_lowercase(),
                category_label: format!("{KEYWORD_LABEL_PREFIX}{stripped}"),
                department: department.to_string(),
            })
        } else {
            Ok(MappingRule::Exact {
                category_name: key.to_string(),
                department: department.to_string(),
            })
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ClassificationSource {
    Keyword,
    Exact,
    Default,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Classification {
    pub category_name: String,
    pub department: String,
    pub source: ClassificationSource,
}

impl Classification {
    pub fn is_auto(&self) -> bool {
        self.source == ClassificationSource::Keyword
    }
}

/// Keyword rule in authored order.
#[derive(Debug, Clone, PartialEq, Eq)]
struct KeywordRule {
    keyword: String,
    category_label: String,
    department: String,
}

/// Parsed rule table: ordered keyword rules plus an exact-category map.
#[derive(Debug, Clone, Default)]
pub struct RuleSet {
    keywords: Vec<KeywordRule>,
    exact: HashMap<String, String>,
}

impl RuleSet {
    /// Parses every row; rejected rows are returned alongside the rules.
    pub fn from_rows(rows: &[RuleRow]) -> (Self, Vec<RuleError>) {
        let mut set = RuleSet::default();
        let mut rejected = Vec::new();

        for row in rows {
            match MappingRule::parse(row) {
                Ok(rule) => set.push(rule),
                Err(e) => rejected.push(e),
            }
        }

        (set, rejected)
    }

    pub fn push(&mut self, rule: MappingRule) {
        match rule {
            MappingRule::Exact {
                category_name,
                department,
            } => {
                self.exact.insert(category_name, department);
            }
            MappingRule::Keyword {
                keyword,
                category_label,
                department,
            } => self.keywords.push(KeywordRule {
                keyword,
                category_label,
                department,
            }),
        }
    }

    pub fn keyword_count(&self) -> usize {
        self.keywords.len()
    }

    pub fn exact_count(&self) -> usize {
        self.exact.len()
    }

    pub fn classify(&self, tx: &Transaction) -> Classification {
        let text = tx.description.to_lowercase();

        if let Some(rule) = self.keywords.iter().find(|r| text.contains(&r.keyword)) {
            return Classification {
                category_name: rule.category_label.clone(),
                department: rule.department.clone(),
                source: ClassificationSource::Keyword,
            };
        }

        if let Some((category, department)) = tx
            .category_name
            .as_deref()
            .filter(|c| !c.is_empty())
            .and_then(|c| self.exact.get_key_value(c))
        {
            return Classification {
                category_name: category.clone(),
                department: department.clone(),
                source: ClassificationSource::Exact,
            };
        }

        Classification {
            category_name: DEFAULT_CATEGORY.to_string(),
            department: DEFAULT_DEPARTMENT.to_string(),
            source: ClassificationSource::Default,
        }
    }
}
