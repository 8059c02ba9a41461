//! # dsl-normalize: DSL Dictionary to Relational Tables
//!
//! Reads a tag-annotated DSL dictionary source and normalizes it into a set
//! of relational tables: dictionaries, languages, words, translations,
//! grammar types, translation attributes and their join tables.
//!
//! ## Features
//!
//! - **Entity stores**: In-memory tables with 1-based row ids and composite unique keys
//! - **Tag extraction**: Regex-based readers for headers, notes, translations and relations
//! - **Single-pass parser**: Line classifier threading header and headword state
//! - **Error policies**: Abort at the first malformed line, or collect and continue
//! - **Reports**: Bordered text tables, NDJSON rows, or one JSON document
//!
//! ## Example
//!
//! ```
//! use dsl_normalize::{parse_lines, ErrorPolicy};
//!
//! let source = [
//!     "#NAME \"TestDict\"",
//!     "#INDEX_LANGUAGE \"English\"",
//!     "#CONTENTS_LANGUAGE \"French\"",
//!     "cat",
//!     " [p]n[/p][trn]chat[/trn]",
//! ];
//!
//! let outcome = parse_lines(source, ErrorPolicy::FailFast).unwrap();
//! assert_eq!(outcome.schema.words.len(), 2);
//! assert_eq!(outcome.schema.grammar_types.len(), 1);
//! ```

// Core modules
pub mod entity;
pub mod store;
pub mod tags;

// Dictionary schema and parsing
pub mod schema;
pub mod parser;
pub mod inspect;

// Input, output and settings
pub mod source;
pub mod report;
pub mod config;

// Re-export key types
pub use entity::{CellValue, Entity, EntityError, RowId};
pub use store::{EntityStore, Table, TableView};
pub use schema::DictionarySchema;
pub use parser::{
    classify_line, parse_lines, DslParser, ErrorPolicy, ImportError, ImportOutcome, LineKind,
    ParseContext, ParseError, ParseErrorKind, ParseStats,
};
pub use inspect::{inspect_lines, LineReport};
pub use source::{decode_lines, read_source_lines, SourceError};
pub use report::{write_report, OutputFormat, ReportError};
pub use config::{ConfigError, ImportConfig};
