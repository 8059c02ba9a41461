//! Core entity trait and cell types for normalized dictionary tables.
//!
//! This module provides the fundamental abstractions shared by every table:
//! the row identity, the cell value a column holds, the configuration errors
//! a table can raise, and the [`Entity`] trait that binds a typed row to its
//! table declaration.

use serde::{Deserialize, Serialize};
use std::fmt;

/// 1-based row identity assigned by a table at insertion time.
///
/// Identities are never reused and never reordered for the lifetime of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RowId(u64);

impl RowId {
    /// Build an identity from its numeric value. Zero is not a valid identity.
    pub fn new(value: u64) -> Option<Self> {
        (value > 0).then_some(Self(value))
    }

    /// Numeric value of the identity.
    pub fn get(self) -> u64 {
        self.0
    }

    pub(crate) fn from_index(index: usize) -> Self {
        Self(index as u64 + 1)
    }

    pub(crate) fn index(self) -> usize {
        (self.0 - 1) as usize
    }
}

impl fmt::Display for RowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Represents the value stored in one cell of a table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CellValue {
    Text(String),
    Id(RowId),
    Null,
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Text(s) => write!(f, "{}", s),
            CellValue::Id(id) => write!(f, "{}", id),
            CellValue::Null => write!(f, "NULL"),
        }
    }
}

impl From<String> for CellValue {
    fn from(value: String) -> Self {
        CellValue::Text(value)
    }
}

impl From<&str> for CellValue {
    fn from(value: &str) -> Self {
        CellValue::Text(value.to_string())
    }
}

impl From<RowId> for CellValue {
    fn from(value: RowId) -> Self {
        CellValue::Id(value)
    }
}

impl From<Option<RowId>> for CellValue {
    fn from(value: Option<RowId>) -> Self {
        value.map_or(CellValue::Null, CellValue::Id)
    }
}

/// Configuration errors raised by tables.
///
/// These signal that the caller and the table schema disagree. They are not
/// data errors and a run that hits one cannot produce a meaningful report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntityError {
    ColumnCountMismatch {
        table: String,
        expected: usize,
        actual: usize,
    },
    UnknownUniqueColumn {
        table: String,
        column: String,
    },
    RowOutOfRange {
        table: String,
        row: u64,
        len: usize,
    },
    ColumnOutOfRange {
        table: String,
        column: usize,
        len: usize,
    },
}

impl fmt::Display for EntityError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntityError::ColumnCountMismatch { table, expected, actual } => write!(
                f,
                "Columns count {} in a row does not correspond to the columns count {} of table '{}'",
                actual, expected, table
            ),
            EntityError::UnknownUniqueColumn { table, column } => {
                write!(f, "Unknown unique column '{}' in table '{}'", column, table)
            }
            EntityError::RowOutOfRange { table, row, len } => {
                write!(f, "Row {} is out of range for table '{}' ({} rows)", row, table, len)
            }
            EntityError::ColumnOutOfRange { table, column, len } => write!(
                f,
                "Column {} is out of range for table '{}' ({} columns)",
                column, table, len
            ),
        }
    }
}

impl std::error::Error for EntityError {}

/// Core trait for every row type stored in a table.
///
/// The associated constants are the table declaration: the table name, the
/// ordered column list, and the columns forming the dedup key (empty when the
/// table accepts duplicates).
///
/// # Example
///
/// ```
/// use dsl_normalize::{CellValue, Entity};
///
/// struct Tag {
///     value: String,
/// }
///
/// impl Entity for Tag {
///     const NAME: &'static str = "tags";
///     const COLUMNS: &'static [&'static str] = &["value"];
///     const UNIQUE: &'static [&'static str] = &["value"];
///
///     fn to_row(&self) -> Vec<CellValue> {
///         vec![self.value.as_str().into()]
///     }
/// }
/// ```
pub trait Entity {
    /// Table name, also used as the rendered caption
    const NAME: &'static str;

    /// Declared columns, in order
    const COLUMNS: &'static [&'static str];

    /// Columns forming the dedup key
    const UNIQUE: &'static [&'static str] = &[];

    /// Convert the entity to cell values in column order
    fn to_row(&self) -> Vec<CellValue>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_row_id_rejects_zero() {
        assert_eq!(RowId::new(0), None);
        assert_eq!(RowId::new(3).map(RowId::get), Some(3));
    }

    #[test]
    fn test_row_id_index_is_one_based() {
        let id = RowId::from_index(0);
        assert_eq!(id.get(), 1);
        assert_eq!(id.index(), 0);
    }

    #[test]
    fn test_cell_value_display() {
        assert_eq!(CellValue::from("chat").to_string(), "chat");
        assert_eq!(CellValue::from(RowId::from_index(1)).to_string(), "2");
        assert_eq!(CellValue::from(None::<RowId>).to_string(), "NULL");
    }

    #[test]
    fn test_cell_value_serializes_untagged() {
        let cells = vec![
            CellValue::from("cat"),
            CellValue::from(RowId::from_index(0)),
            CellValue::Null,
        ];

        let json = serde_json::to_string(&cells).unwrap();
        assert_eq!(json, r#"["cat",1,null]"#);
    }

    #[test]
    fn test_error_messages_name_the_table() {
        let err = EntityError::ColumnCountMismatch {
            table: "words".to_string(),
            expected: 3,
            actual: 2,
        };
        assert!(err.to_string().contains("'words'"));

        let err = EntityError::UnknownUniqueColumn {
            table: "languages".to_string(),
            column: "title".to_string(),
        };
        assert_eq!(err.to_string(), "Unknown unique column 'title' in table 'languages'");
    }
}
