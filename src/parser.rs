//! Single-pass line classifier and parse loop.
//!
//! Lines are consumed in order. Each one is classified against the tag
//! grammar and drives inserts into the [`DictionarySchema`]. The only state
//! carried between lines is the [`ParseContext`]: header ids (set once) and
//! the per-headword word, grammar type and attribute ids.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::entity::{EntityError, RowId};
use crate::schema::{
    AttributeTranslation, Dictionary, DictionarySchema, GrammarType, GrammarTypeTranslation,
    Language, Translation, TranslationAttribute, Word,
};
use crate::store::EntityStore;
use crate::tags::{self, BodyLineIssue, HeaderDirective, Note};

/// What to do with a body line that fails validation
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ErrorPolicy {
    /// Abort the run at the first invalid line
    #[default]
    FailFast,
    /// Skip invalid lines, record them, and keep going
    Collect,
}

impl FromStr for ErrorPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "fail-fast" | "fail_fast" | "failfast" => Ok(ErrorPolicy::FailFast),
            "collect" => Ok(ErrorPolicy::Collect),
            other => Err(format!(
                "Unsupported error policy: '{}'. Supported policies: fail-fast, collect",
                other
            )),
        }
    }
}

impl fmt::Display for ErrorPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorPolicy::FailFast => f.write_str("fail-fast"),
            ErrorPolicy::Collect => f.write_str("collect"),
        }
    }
}

/// Session state threaded through the parse loop.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParseContext {
    pub dictionary_id: Option<RowId>,
    pub source_language_id: Option<RowId>,
    pub target_language_id: Option<RowId>,
    pub current_word_id: Option<RowId>,
    pub current_grammar_type_id: Option<RowId>,
    pub current_attribute_id: Option<RowId>,
}

impl ParseContext {
    /// Id recorded for a header directive, if it was already seen
    pub fn header_id(&self, directive: HeaderDirective) -> Option<RowId> {
        match directive {
            HeaderDirective::Name => self.dictionary_id,
            HeaderDirective::IndexLanguage => self.source_language_id,
            HeaderDirective::ContentsLanguage => self.target_language_id,
        }
    }

    fn set_header_id(&mut self, directive: HeaderDirective, id: RowId) {
        match directive {
            HeaderDirective::Name => self.dictionary_id = Some(id),
            HeaderDirective::IndexLanguage => self.source_language_id = Some(id),
            HeaderDirective::ContentsLanguage => self.target_language_id = Some(id),
        }
    }

    fn start_headword(&mut self, word_id: RowId) {
        self.current_word_id = Some(word_id);
        self.current_grammar_type_id = None;
        self.current_attribute_id = None;
    }
}

/// Classification of one source line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "directive", rename_all = "snake_case")]
pub enum LineKind {
    Blank,
    Header(HeaderDirective),
    /// A header whose value was already set; ignored
    RepeatedHeader(HeaderDirective),
    Headword,
    Body,
}

/// Classify a line given the headers seen so far. First match wins.
///
/// An unindented line that carries a body tag is a mis-indented body line,
/// not a headword, so that it fails validation instead of silently becoming
/// a word.
pub fn classify_line(line: &str, context: &ParseContext) -> LineKind {
    if line.trim().is_empty() {
        return LineKind::Blank;
    }

    for directive in HeaderDirective::ALL {
        if directive.scan(line).is_some() {
            return match context.header_id(directive) {
                None => LineKind::Header(directive),
                Some(_) => LineKind::RepeatedHeader(directive),
            };
        }
    }

    if tags::scan_article_title(line).is_some() && !tags::has_body_tag(line) {
        return LineKind::Headword;
    }

    LineKind::Body
}

/// Kind of input validation failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ParseErrorKind {
    /// Body line does not begin with whitespace
    MissingIndent,
    /// Body line carries none of `[p]`, `[trn]`, `[*]`
    MissingTags,
    /// Translation found before any headword
    OrphanTranslation,
}

impl From<BodyLineIssue> for ParseErrorKind {
    fn from(issue: BodyLineIssue) -> Self {
        match issue {
            BodyLineIssue::MissingIndent => ParseErrorKind::MissingIndent,
            BodyLineIssue::MissingTags => ParseErrorKind::MissingTags,
        }
    }
}

/// A malformed source line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParseError {
    /// 1-based line number
    pub line_number: usize,
    pub line: String,
    pub kind: ParseErrorKind,
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            ParseErrorKind::MissingIndent => write!(
                f,
                "Line {} '{}' is not beginning with spaces",
                self.line_number, self.line
            ),
            ParseErrorKind::MissingTags => write!(
                f,
                "Line {} '{}' is not containing one of expected tags: {}",
                self.line_number,
                self.line,
                tags::BODY_TAGS.join(",")
            ),
            ParseErrorKind::OrphanTranslation => write!(
                f,
                "Line {} '{}' has a translation but no headword precedes it",
                self.line_number, self.line
            ),
        }
    }
}

impl std::error::Error for ParseError {}

/// Error aborting a parse run
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImportError {
    /// Schema and caller disagree
    Config(EntityError),
    /// Malformed source line under the fail-fast policy
    Parse(ParseError),
}

impl fmt::Display for ImportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ImportError::Config(e) => write!(f, "Configuration error: {}", e),
            ImportError::Parse(e) => write!(f, "Parse error: {}", e),
        }
    }
}

impl std::error::Error for ImportError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ImportError::Config(e) => Some(e),
            ImportError::Parse(e) => Some(e),
        }
    }
}

impl From<EntityError> for ImportError {
    fn from(err: EntityError) -> Self {
        ImportError::Config(err)
    }
}

impl From<ParseError> for ImportError {
    fn from(err: ParseError) -> Self {
        ImportError::Parse(err)
    }
}

/// Line counters for one run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ParseStats {
    pub lines: usize,
    pub blank_lines: usize,
    pub headers: usize,
    pub ignored_headers: usize,
    pub headwords: usize,
    pub body_lines: usize,
    pub relation_lines: usize,
    pub rejected_lines: usize,
}

/// Result of a completed run
#[derive(Debug, Clone)]
pub struct ImportOutcome {
    pub schema: DictionarySchema,
    pub stats: ParseStats,
    /// Lines skipped under [`ErrorPolicy::Collect`]
    pub rejected: Vec<ParseError>,
}

impl ImportOutcome {
    /// Tables to render, in report order
    pub fn tables(&self, include_attribute_links: bool) -> Vec<&EntityStore> {
        self.schema.rendered_tables(include_attribute_links)
    }
}

/// Fragments extracted from one body line
struct BodyLine {
    note: Note,
    translation: Option<String>,
}

/// Stateful parser consuming one line at a time.
///
/// # Example
/// ```
/// use dsl_normalize::{DslParser, ErrorPolicy};
///
/// let mut parser = DslParser::new(ErrorPolicy::FailFast).unwrap();
/// for line in ["#NAME \"TestDict\"", "cat", " [trn]chat[/trn]"] {
///     parser.feed_line(line).unwrap();
/// }
/// let outcome = parser.finish();
/// assert_eq!(outcome.schema.translations.len(), 1);
/// ```
#[derive(Debug)]
pub struct DslParser {
    schema: DictionarySchema,
    context: ParseContext,
    policy: ErrorPolicy,
    stats: ParseStats,
    rejected: Vec<ParseError>,
}

impl DslParser {
    pub fn new(policy: ErrorPolicy) -> Result<Self, ImportError> {
        Ok(Self {
            schema: DictionarySchema::new()?,
            context: ParseContext::default(),
            policy,
            stats: ParseStats::default(),
            rejected: Vec::new(),
        })
    }

    pub fn context(&self) -> &ParseContext {
        &self.context
    }

    pub fn schema(&self) -> &DictionarySchema {
        &self.schema
    }

    pub fn rejected(&self) -> &[ParseError] {
        &self.rejected
    }

    /// Consume the next source line.
    ///
    /// # Errors
    /// Under [`ErrorPolicy::FailFast`] an invalid body line returns
    /// [`ImportError::Parse`]; the parser must not be used afterwards.
    /// Configuration errors are returned under every policy.
    pub fn feed_line(&mut self, line: &str) -> Result<LineKind, ImportError> {
        self.stats.lines += 1;
        let line_number = self.stats.lines;
        let kind = classify_line(line, &self.context);

        match kind {
            LineKind::Blank => self.stats.blank_lines += 1,
            LineKind::Header(directive) => self.apply_header(directive, line)?,
            LineKind::RepeatedHeader(directive) => {
                self.stats.ignored_headers += 1;
                tracing::debug!(line = line_number, header = %directive, "ignoring repeated header");
            }
            LineKind::Headword => self.apply_headword(line_number, line)?,
            LineKind::Body => match self.validate_body(line) {
                Ok(body) => self.apply_body(line_number, line, body)?,
                Err(error_kind) => self.reject(ParseError {
                    line_number,
                    line: line.to_string(),
                    kind: error_kind,
                })?,
            },
        }

        Ok(kind)
    }

    /// End the run and hand over the populated tables
    pub fn finish(self) -> ImportOutcome {
        tracing::info!(
            lines = self.stats.lines,
            headwords = self.stats.headwords,
            words = self.schema.words.len(),
            translations = self.schema.translations.len(),
            rejected = self.rejected.len(),
            "dictionary parsed"
        );

        ImportOutcome {
            schema: self.schema,
            stats: self.stats,
            rejected: self.rejected,
        }
    }

    fn apply_header(&mut self, directive: HeaderDirective, line: &str) -> Result<(), ImportError> {
        let Some(value) = directive.scan(line) else {
            return Ok(());
        };

        let id = match directive {
            HeaderDirective::Name => self.schema.dictionaries.insert(&Dictionary { name: value })?,
            HeaderDirective::IndexLanguage | HeaderDirective::ContentsLanguage => {
                self.schema.languages.insert(&Language { name: value })?
            }
        };
        self.context.set_header_id(directive, id);
        self.stats.headers += 1;
        tracing::debug!(header = %directive, id = %id, "header recorded");

        Ok(())
    }

    fn apply_headword(&mut self, line_number: usize, line: &str) -> Result<(), ImportError> {
        let word_id = self.schema.words.insert(&Word {
            text: line.to_string(),
            dictionary_id: self.context.dictionary_id,
            language_id: self.context.source_language_id,
        })?;
        self.context.start_headword(word_id);
        self.stats.headwords += 1;
        tracing::debug!(line = line_number, headword = line, id = %word_id, "headword");

        Ok(())
    }

    fn validate_body(&self, line: &str) -> Result<BodyLine, ParseErrorKind> {
        tags::validate_body_line(line)?;

        let body = BodyLine {
            note: tags::extract_note(line).unwrap_or_default(),
            translation: tags::extract_translation(line),
        };
        if body.translation.is_some() && self.context.current_word_id.is_none() {
            return Err(ParseErrorKind::OrphanTranslation);
        }

        Ok(body)
    }

    fn apply_body(
        &mut self,
        line_number: usize,
        line: &str,
        body: BodyLine,
    ) -> Result<(), ImportError> {
        self.stats.body_lines += 1;
        let BodyLine { note, translation } = body;

        if let Some(value) = note.text {
            let grammar_type_id = self.schema.grammar_types.insert(&GrammarType { value })?;
            self.context.current_grammar_type_id = Some(grammar_type_id);
        }

        let Some(text) = translation else {
            if let Some(relation) = tags::extract_relation(line) {
                self.stats.relation_lines += 1;
                tracing::trace!(line = line_number, ?relation, "relation annotation skipped");
            }
            return Ok(());
        };

        // validate_body rejects translations without a headword
        let Some(word_from_id) = self.context.current_word_id else {
            return Ok(());
        };

        let word_to_id = self.schema.words.insert(&Word {
            text,
            dictionary_id: self.context.dictionary_id,
            language_id: self.context.target_language_id,
        })?;
        let translation_id = self.schema.translations.insert(&Translation {
            word_from_id,
            word_to_id,
        })?;

        if let Some(value) = note.qualifier {
            let attribute_id = self
                .schema
                .translation_attributes
                .insert(&TranslationAttribute { value })?;
            self.context.current_attribute_id = Some(attribute_id);
        }
        if let Some(attribute_id) = self.context.current_attribute_id.take() {
            self.schema.attribute_translations.insert(&AttributeTranslation {
                attribute_id,
                translation_id,
            })?;
        }

        if let Some(grammar_type_id) = self.context.current_grammar_type_id {
            self.schema
                .grammar_type_translations
                .insert(&GrammarTypeTranslation {
                    grammar_type_id,
                    translation_id,
                })?;
        }

        tracing::trace!(
            line = line_number,
            translation = %translation_id,
            from = %word_from_id,
            to = %word_to_id,
            "translation linked"
        );

        Ok(())
    }

    fn reject(&mut self, error: ParseError) -> Result<(), ImportError> {
        match self.policy {
            ErrorPolicy::FailFast => Err(ImportError::Parse(error)),
            ErrorPolicy::Collect => {
                tracing::warn!(line = error.line_number, "{}", error);
                self.stats.rejected_lines += 1;
                self.rejected.push(error);
                Ok(())
            }
        }
    }
}

/// Parse a whole sequence of decoded lines.
///
/// # Errors
/// Returns the first [`ImportError`] under [`ErrorPolicy::FailFast`]; no
/// tables are produced in that case.
pub fn parse_lines<I, S>(lines: I, policy: ErrorPolicy) -> Result<ImportOutcome, ImportError>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut parser = DslParser::new(policy)?;
    for line in lines {
        parser.feed_line(line.as_ref())?;
    }
    Ok(parser.finish())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::CellValue;

    fn id(value: u64) -> RowId {
        RowId::new(value).unwrap()
    }

    fn rows(store: &EntityStore) -> Vec<Vec<String>> {
        store.render().rows().collect()
    }

    const SAMPLE: [&str; 5] = [
        r#"#NAME "TestDict""#,
        r#"#INDEX_LANGUAGE "English""#,
        r#"#CONTENTS_LANGUAGE "French""#,
        "cat",
        " [p]n[/p][trn]chat[/trn]",
    ];

    #[test]
    fn test_classify_line() {
        let mut context = ParseContext::default();

        assert_eq!(classify_line("   ", &context), LineKind::Blank);
        assert_eq!(
            classify_line(r#"#NAME "A""#, &context),
            LineKind::Header(HeaderDirective::Name)
        );
        assert_eq!(classify_line("cat", &context), LineKind::Headword);
        assert_eq!(classify_line(" [trn]chat[/trn]", &context), LineKind::Body);
        assert_eq!(classify_line("notindented[trn]x[/trn]", &context), LineKind::Body);
        assert_eq!(classify_line("[m1]cat", &context), LineKind::Body);

        context.dictionary_id = Some(id(1));
        assert_eq!(
            classify_line(r#"#NAME "B""#, &context),
            LineKind::RepeatedHeader(HeaderDirective::Name)
        );
    }

    #[test]
    fn test_end_to_end_sample() {
        let outcome = parse_lines(SAMPLE, ErrorPolicy::FailFast).unwrap();
        let schema = &outcome.schema;

        assert_eq!(rows(&schema.dictionaries), vec![vec!["1", "TestDict"]]);
        assert_eq!(
            rows(&schema.languages),
            vec![vec!["1", "English"], vec!["2", "French"]]
        );
        assert_eq!(
            rows(&schema.words),
            vec![vec!["1", "cat", "1", "1"], vec!["2", "chat", "1", "2"]]
        );
        assert_eq!(rows(&schema.grammar_types), vec![vec!["1", "n"]]);
        assert_eq!(rows(&schema.translations), vec![vec!["1", "1", "2"]]);
        assert_eq!(rows(&schema.grammar_type_translations), vec![vec!["1", "1", "1"]]);
        assert!(schema.translation_attributes.is_empty());
        assert!(schema.attribute_translations.is_empty());
        assert!(outcome.rejected.is_empty());
    }

    #[test]
    fn test_header_first_wins() {
        let outcome = parse_lines(
            [r#"#NAME "A""#, r#"#NAME "B""#, "cat"],
            ErrorPolicy::FailFast,
        )
        .unwrap();

        assert_eq!(rows(&outcome.schema.dictionaries), vec![vec!["1", "A"]]);
        assert_eq!(outcome.schema.words.len(), 1);
        assert_eq!(outcome.stats.ignored_headers, 1);
    }

    #[test]
    fn test_languages_dedupe() {
        let outcome = parse_lines(
            [r#"#INDEX_LANGUAGE "English""#, r#"#CONTENTS_LANGUAGE "English""#],
            ErrorPolicy::FailFast,
        )
        .unwrap();

        assert_eq!(outcome.schema.languages.len(), 1);
    }

    #[test]
    fn test_grammar_type_persists_across_translations() {
        let outcome = parse_lines(
            ["dog", " [p]noun[/p][trn]foo[/trn]", " [trn]bar[/trn]"],
            ErrorPolicy::FailFast,
        )
        .unwrap();
        let schema = &outcome.schema;

        assert_eq!(rows(&schema.grammar_types), vec![vec!["1", "noun"]]);
        assert_eq!(
            rows(&schema.grammar_type_translations),
            vec![vec!["1", "1", "1"], vec!["2", "1", "2"]]
        );
    }

    #[test]
    fn test_grammar_type_from_note_only_line() {
        let outcome = parse_lines(
            ["dog", " [p]noun[/p]", " [trn]chien[/trn]", " [p]verb[/p]", " [trn]suivre[/trn]"],
            ErrorPolicy::FailFast,
        )
        .unwrap();
        let schema = &outcome.schema;

        assert_eq!(rows(&schema.grammar_types), vec![vec!["1", "noun"], vec!["2", "verb"]]);
        assert_eq!(
            rows(&schema.grammar_type_translations),
            vec![vec!["1", "1", "1"], vec!["2", "2", "2"]]
        );
    }

    #[test]
    fn test_headword_resets_grammar_type() {
        let outcome = parse_lines(
            ["dog", " [p]noun[/p]", "run", " [trn]courir[/trn]"],
            ErrorPolicy::FailFast,
        )
        .unwrap();

        assert_eq!(outcome.schema.translations.len(), 1);
        assert!(outcome.schema.grammar_type_translations.is_empty());
    }

    #[test]
    fn test_words_are_not_deduplicated() {
        let outcome = parse_lines(
            ["cat", " [trn]chat[/trn]", "cat", " [trn]chat[/trn]"],
            ErrorPolicy::FailFast,
        )
        .unwrap();
        let schema = &outcome.schema;

        assert_eq!(schema.words.len(), 4);
        assert_eq!(
            rows(&schema.translations),
            vec![vec!["1", "1", "2"], vec!["2", "3", "4"]]
        );
    }

    #[test]
    fn test_qualifier_becomes_attribute_for_one_translation() {
        let outcome = parse_lines(
            [
                "cat",
                " [p][c green]fam.[/p] [trn]matou[/trn]",
                " [trn]chat[/trn]",
            ],
            ErrorPolicy::FailFast,
        )
        .unwrap();
        let schema = &outcome.schema;

        assert_eq!(rows(&schema.translation_attributes), vec![vec!["1", "green"]]);
        assert_eq!(rows(&schema.attribute_translations), vec![vec!["1", "1", "1"]]);
        assert_eq!(rows(&schema.grammar_types), vec![vec!["1", "fam."]]);
        assert_eq!(schema.grammar_type_translations.len(), 2);
    }

    #[test]
    fn test_relation_line_has_no_effect() {
        let outcome = parse_lines(
            ["cat", " [*]Syn: [trn]feline[/trn][/*]", " [*]see [ref]kitten[/ref][/*]"],
            ErrorPolicy::FailFast,
        )
        .unwrap();

        // The first line carries a [trn] block inside the relation and links it
        assert_eq!(outcome.schema.translations.len(), 1);
        assert_eq!(outcome.stats.relation_lines, 1);
    }

    #[test]
    fn test_unindented_body_line_aborts() {
        let err = parse_lines(["cat", "notindented[trn]x[/trn]"], ErrorPolicy::FailFast)
            .unwrap_err();

        assert_eq!(
            err,
            ImportError::Parse(ParseError {
                line_number: 2,
                line: "notindented[trn]x[/trn]".to_string(),
                kind: ParseErrorKind::MissingIndent,
            })
        );
    }

    #[test]
    fn test_body_line_without_tags_aborts() {
        let err = parse_lines(["cat", "  plain text"], ErrorPolicy::FailFast).unwrap_err();

        match err {
            ImportError::Parse(e) => assert_eq!(e.kind, ParseErrorKind::MissingTags),
            other => panic!("unexpected error: {}", other),
        }
    }

    #[test]
    fn test_translation_before_headword_is_rejected() {
        let err = parse_lines([" [trn]chat[/trn]"], ErrorPolicy::FailFast).unwrap_err();

        assert!(matches!(
            err,
            ImportError::Parse(ParseError { kind: ParseErrorKind::OrphanTranslation, .. })
        ));
    }

    #[test]
    fn test_collect_policy_skips_invalid_lines() {
        let outcome = parse_lines(
            ["cat", "  plain text", " [trn]chat[/trn]", "[m1]oops"],
            ErrorPolicy::Collect,
        )
        .unwrap();

        assert_eq!(outcome.rejected.len(), 2);
        assert_eq!(outcome.rejected[0].line_number, 2);
        assert_eq!(outcome.rejected[1].kind, ParseErrorKind::MissingIndent);
        assert_eq!(outcome.stats.rejected_lines, 2);
        assert_eq!(outcome.schema.translations.len(), 1);
    }

    #[test]
    fn test_headword_before_headers_has_null_keys() {
        let outcome = parse_lines(["cat"], ErrorPolicy::FailFast).unwrap();

        assert_eq!(
            outcome.schema.words.row(id(1)).unwrap(),
            &[CellValue::from("cat"), CellValue::Null, CellValue::Null]
        );
    }

    #[test]
    fn test_context_tracks_session_state() {
        let mut parser = DslParser::new(ErrorPolicy::FailFast).unwrap();
        for line in SAMPLE {
            parser.feed_line(line).unwrap();
        }

        let context = parser.context();
        assert_eq!(context.dictionary_id, Some(id(1)));
        assert_eq!(context.source_language_id, Some(id(1)));
        assert_eq!(context.target_language_id, Some(id(2)));
        assert_eq!(context.current_word_id, Some(id(1)));
        assert_eq!(context.current_grammar_type_id, Some(id(1)));
        assert_eq!(context.current_attribute_id, None);
    }

    #[test]
    fn test_error_policy_from_str() {
        assert_eq!("fail-fast".parse::<ErrorPolicy>(), Ok(ErrorPolicy::FailFast));
        assert_eq!("Collect".parse::<ErrorPolicy>(), Ok(ErrorPolicy::Collect));
        assert!("skip".parse::<ErrorPolicy>().is_err());
    }
}
