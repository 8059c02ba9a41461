//! Rendering of parsed tables.
//!
//! Three output formats: bordered text tables (one per entity table, caption
//! underneath), NDJSON with one object per row, and a single JSON document.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::io::Write;
use std::str::FromStr;

use crate::entity::CellValue;
use crate::parser::{ImportOutcome, ParseError, ParseStats};
use crate::store::{EntityStore, TableView, ID_COLUMN};

/// Error type for report rendering
#[derive(Debug)]
pub enum ReportError {
    JsonError(serde_json::Error),
    IoError(std::io::Error),
}

impl From<serde_json::Error> for ReportError {
    fn from(err: serde_json::Error) -> Self {
        ReportError::JsonError(err)
    }
}

impl From<std::io::Error> for ReportError {
    fn from(err: std::io::Error) -> Self {
        ReportError::IoError(err)
    }
}

impl fmt::Display for ReportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReportError::JsonError(e) => write!(f, "JSON error: {}", e),
            ReportError::IoError(e) => write!(f, "IO error: {}", e),
        }
    }
}

impl std::error::Error for ReportError {}

/// Output format of a report
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Table,
    Ndjson,
    Json,
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "table" | "text" => Ok(OutputFormat::Table),
            "ndjson" | "jsonl" => Ok(OutputFormat::Ndjson),
            "json" => Ok(OutputFormat::Json),
            other => Err(format!(
                "Unsupported output format: '{}'. Supported formats: table, ndjson, json",
                other
            )),
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputFormat::Table => f.write_str("table"),
            OutputFormat::Ndjson => f.write_str("ndjson"),
            OutputFormat::Json => f.write_str("json"),
        }
    }
}

/// Render one table with ASCII borders and its caption underneath.
///
/// # Example
/// ```
/// use dsl_normalize::{report::render_bordered, EntityStore};
///
/// let mut languages = EntityStore::declare("languages", ["name"]);
/// languages.insert(vec!["English".into()]).unwrap();
///
/// let text = render_bordered(&languages.render());
/// assert!(text.contains("| 1  | English |"));
/// assert!(text.ends_with("languages\n"));
/// ```
pub fn render_bordered(view: &TableView<'_>) -> String {
    let header = view.header();
    let mut widths: Vec<usize> = header.iter().map(|h| h.chars().count()).collect();
    for row in view.rows() {
        for (width, cell) in widths.iter_mut().zip(&row) {
            *width = (*width).max(cell.chars().count());
        }
    }

    let separator = {
        let mut line = String::from("+");
        for width in &widths {
            line.push_str(&"-".repeat(width + 2));
            line.push('+');
        }
        line.push('\n');
        line
    };

    let format_row = |cells: &[String]| {
        let mut line = String::from("|");
        for (cell, width) in cells.iter().zip(&widths) {
            let padding = width - cell.chars().count();
            line.push(' ');
            line.push_str(cell);
            line.push_str(&" ".repeat(padding + 1));
            line.push('|');
        }
        line.push('\n');
        line
    };

    let mut out = String::new();
    out.push_str(&separator);
    out.push_str(&format_row(header.as_slice()));
    out.push_str(&separator);
    for row in view.rows() {
        out.push_str(&format_row(row.as_slice()));
    }
    if view.row_count() > 0 {
        out.push_str(&separator);
    }
    out.push_str(view.caption());
    out.push('\n');
    out
}

/// Row as an ordered object: identity first, then declared columns
fn row_object<'a>(
    store: &'a EntityStore,
    id: CellValue,
    cells: &[CellValue],
) -> IndexMap<&'a str, CellValue> {
    std::iter::once((ID_COLUMN, id))
        .chain(
            store
                .columns()
                .iter()
                .map(String::as_str)
                .zip(cells.iter().cloned()),
        )
        .collect()
}

/// NDJSON (Newline Delimited JSON) writer
///
/// Writes every row of a table as one JSON object, tagged with its table.
pub struct NdjsonWriter<W: Write> {
    writer: W,
}

#[derive(Serialize)]
struct NdjsonRow<'a> {
    table: &'a str,
    #[serde(flatten)]
    row: IndexMap<&'a str, CellValue>,
}

impl<W: Write> NdjsonWriter<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    /// Write every row of one table
    pub fn write_table(&mut self, store: &EntityStore) -> Result<(), ReportError> {
        for (id, cells) in store.rows() {
            let line = NdjsonRow {
                table: store.name(),
                row: row_object(store, id.into(), cells),
            };
            serde_json::to_writer(&mut self.writer, &line)?;
            writeln!(self.writer)?;
        }
        Ok(())
    }

    pub fn write_tables(&mut self, tables: &[&EntityStore]) -> Result<(), ReportError> {
        for table in tables {
            self.write_table(table)?;
        }
        Ok(())
    }

    pub fn flush(&mut self) -> Result<(), ReportError> {
        self.writer.flush()?;
        Ok(())
    }
}

#[derive(Serialize)]
struct TableDocument<'a> {
    name: &'a str,
    columns: &'a [String],
    unique: Vec<&'a str>,
    rows: Vec<IndexMap<&'a str, CellValue>>,
}

#[derive(Serialize)]
struct ReportDocument<'a> {
    tables: Vec<TableDocument<'a>>,
    stats: &'a ParseStats,
    rejected: &'a [ParseError],
}

/// Write a parse outcome in the requested format
pub fn write_report<W: Write>(
    mut writer: W,
    outcome: &ImportOutcome,
    format: OutputFormat,
    include_attribute_links: bool,
) -> Result<(), ReportError> {
    let tables = outcome.tables(include_attribute_links);

    match format {
        OutputFormat::Table => {
            for table in &tables {
                writeln!(writer, "{}", render_bordered(&table.render()))?;
            }
        }
        OutputFormat::Ndjson => {
            let mut ndjson = NdjsonWriter::new(&mut writer);
            ndjson.write_tables(&tables)?;
            ndjson.flush()?;
        }
        OutputFormat::Json => {
            let document = ReportDocument {
                tables: tables
                    .iter()
                    .map(|store| TableDocument {
                        name: store.name(),
                        columns: store.columns(),
                        unique: store.unique_columns(),
                        rows: store
                            .rows()
                            .map(|(id, cells)| row_object(store, id.into(), cells))
                            .collect(),
                    })
                    .collect(),
                stats: &outcome.stats,
                rejected: &outcome.rejected,
            };
            serde_json::to_writer_pretty(&mut writer, &document)?;
            writeln!(writer)?;
        }
    }

    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::{parse_lines, ErrorPolicy};

    fn sample() -> ImportOutcome {
        parse_lines(
            [
                r#"#NAME "TestDict""#,
                r#"#INDEX_LANGUAGE "English""#,
                r#"#CONTENTS_LANGUAGE "French""#,
                "cat",
                " [p][c green]n[/p][trn]chat[/trn]",
            ],
            ErrorPolicy::FailFast,
        )
        .unwrap()
    }

    #[test]
    fn test_render_bordered() {
        let mut store = EntityStore::declare("dictionaries", ["name"]);
        store.insert(vec!["TestDict".into()]).unwrap();

        let expected = "\
+----+----------+
| Id | name     |
+----+----------+
| 1  | TestDict |
+----+----------+
dictionaries
";
        assert_eq!(render_bordered(&store.render()), expected);
    }

    #[test]
    fn test_render_bordered_empty_table() {
        let store = EntityStore::declare("grammar_types", ["value"]);

        let expected = "\
+----+-------+
| Id | value |
+----+-------+
grammar_types
";
        assert_eq!(render_bordered(&store.render()), expected);
    }

    #[test]
    fn test_table_report_lists_seven_tables() {
        let mut buf = Vec::new();
        write_report(&mut buf, &sample(), OutputFormat::Table, false).unwrap();

        let output = String::from_utf8(buf).unwrap();
        assert!(output.contains("\nwords\n"));
        assert!(output.contains("\ntranslation_attributes\n"));
        assert!(!output.contains("attribute_translations"));
    }

    #[test]
    fn test_ndjson_writer() {
        let mut buf = Vec::new();
        write_report(&mut buf, &sample(), OutputFormat::Ndjson, true).unwrap();

        let output = String::from_utf8(buf).unwrap();
        let lines: Vec<&str> = output.lines().collect();

        // 2 words, 1 dictionary, 2 languages, 1 translation, 1 grammar type,
        // 1 grammar link, 1 attribute, 1 attribute link
        assert_eq!(lines.len(), 10);
        assert_eq!(
            lines[0],
            r#"{"table":"words","Id":1,"text":"cat","dictionary_id":1,"language_id":1}"#
        );
        assert!(lines[9].starts_with(r#"{"table":"attribute_translations""#));
    }

    #[test]
    fn test_json_document() {
        let mut buf = Vec::new();
        write_report(&mut buf, &sample(), OutputFormat::Json, false).unwrap();

        let value: serde_json::Value = serde_json::from_slice(&buf).unwrap();
        let tables = value["tables"].as_array().unwrap();
        assert_eq!(tables.len(), 7);
        assert_eq!(tables[2]["name"], "languages");
        assert_eq!(tables[2]["unique"][0], "name");
        assert_eq!(tables[2]["rows"][1]["name"], "French");
        assert_eq!(value["stats"]["headwords"], 1);
        assert!(value["rejected"].as_array().unwrap().is_empty());
    }

    #[test]
    fn test_output_format_from_str() {
        assert_eq!("NDJSON".parse::<OutputFormat>(), Ok(OutputFormat::Ndjson));
        assert_eq!("table".parse::<OutputFormat>(), Ok(OutputFormat::Table));
        assert!("xml".parse::<OutputFormat>().is_err());
    }
}
