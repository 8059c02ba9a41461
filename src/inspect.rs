//! Per-line diagnostics for dictionary sources.
//!
//! Runs the parser under the collect policy and reports, for every line, how
//! it was classified and which fragments the tag extractor found on it. This
//! surfaces annotations the tables do not keep (relations, styling, sense
//! numbers).

use serde::Serialize;

use crate::parser::{DslParser, ErrorPolicy, ImportError, LineKind, ParseErrorKind};
use crate::tags::{self, Note, Relation, TranslationStyle};

/// What was found on one source line
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LineReport {
    pub line_number: usize,
    pub kind: LineKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<Note>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub translation: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub relation: Option<Relation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub style: Option<TranslationStyle>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sense_index: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ParseErrorKind>,
}

/// Classify every line and extract its fragments.
///
/// Invalid body lines are reported through [`LineReport::error`] rather than
/// aborting.
///
/// # Errors
/// Only configuration errors are returned.
pub fn inspect_lines<I, S>(lines: I) -> Result<Vec<LineReport>, ImportError>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut parser = DslParser::new(ErrorPolicy::Collect)?;
    let mut reports = Vec::new();

    for line in lines {
        let line = line.as_ref();
        let rejected_before = parser.rejected().len();
        let kind = parser.feed_line(line)?;
        let error = parser.rejected().get(rejected_before).map(|e| e.kind);

        let mut report = LineReport {
            line_number: reports.len() + 1,
            kind,
            note: None,
            translation: None,
            relation: None,
            style: None,
            sense_index: None,
            error,
        };
        if kind == LineKind::Body {
            report.note = tags::extract_note(line);
            report.translation = tags::extract_translation(line);
            report.relation = tags::extract_relation(line);
            report.style = tags::extract_translation_style(line);
            report.sense_index = tags::extract_sense_index(line);
        }
        reports.push(report);
    }

    Ok(reports)
}
