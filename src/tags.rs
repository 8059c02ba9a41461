//! Tag extraction for DSL dictionary lines.
//!
//! Pure functions over one decoded line. Each returns the extracted fragment
//! or `None`; a line that does not match a pattern is "not found", never an
//! error. Every fragment goes through [`cleanup_line`] before it is returned,
//! so the same source value always yields byte-identical text (the stores
//! dedupe on it).

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use std::fmt;

/// Body tags, at least one of which must appear on a body line
pub const BODY_TAGS: [&str; 3] = ["[p]", "[trn]", "[*]"];

static TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"\[.*?\]").unwrap());
static WHITESPACE_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s{2,}").unwrap());
static TRANSLATION: Lazy<Regex> = Lazy::new(|| Regex::new(r"\[trn\](.*)\[/trn\]").unwrap());
static NOTE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\[p.*?\](\[c\s*(.*?)\])?(.*?)\[/").unwrap());
static RELATION: Lazy<Regex> = Lazy::new(|| Regex::new(r"\[\*\](.*)?\[/\*\]").unwrap());
static STYLE_SPAN: Lazy<Regex> = Lazy::new(|| Regex::new(r".*\[/.*?\](.*)\[trn\]").unwrap());
static COLOR: Lazy<Regex> = Lazy::new(|| Regex::new(r"\[c (.*?)\]").unwrap());
static SENSE_INDEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\s*\[.*?\](\d*)[)|.]").unwrap());

static NAME_HEADER: Lazy<Regex> = Lazy::new(|| header_pattern(HeaderDirective::Name.prefix()));
static INDEX_LANGUAGE_HEADER: Lazy<Regex> =
    Lazy::new(|| header_pattern(HeaderDirective::IndexLanguage.prefix()));
static CONTENTS_LANGUAGE_HEADER: Lazy<Regex> =
    Lazy::new(|| header_pattern(HeaderDirective::ContentsLanguage.prefix()));

fn header_pattern(prefix: &str) -> Regex {
    Regex::new(&format!(r#"{}\s*"(.*)""#, regex::escape(prefix))).unwrap()
}

/// Header declarations recognized at the top of a dictionary source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum HeaderDirective {
    /// `#NAME "<dictionary name>"`
    Name,
    /// `#INDEX_LANGUAGE "<source language>"`
    IndexLanguage,
    /// `#CONTENTS_LANGUAGE "<target language>"`
    ContentsLanguage,
}

impl HeaderDirective {
    pub const ALL: [HeaderDirective; 3] = [
        HeaderDirective::Name,
        HeaderDirective::IndexLanguage,
        HeaderDirective::ContentsLanguage,
    ];

    pub fn prefix(self) -> &'static str {
        match self {
            HeaderDirective::Name => "#NAME",
            HeaderDirective::IndexLanguage => "#INDEX_LANGUAGE",
            HeaderDirective::ContentsLanguage => "#CONTENTS_LANGUAGE",
        }
    }

    /// Quoted value of this header on `line`, if the line declares it
    pub fn scan(self, line: &str) -> Option<String> {
        let pattern = match self {
            HeaderDirective::Name => &*NAME_HEADER,
            HeaderDirective::IndexLanguage => &*INDEX_LANGUAGE_HEADER,
            HeaderDirective::ContentsLanguage => &*CONTENTS_LANGUAGE_HEADER,
        };
        pattern.captures(line).map(|caps| caps[1].to_string())
    }
}

impl fmt::Display for HeaderDirective {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.prefix())
    }
}

/// Grammar note found in a `[p]` block.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Note {
    /// Value of a leading `[c <value>]` sub-tag
    pub qualifier: Option<String>,
    /// Cleaned free text of the block
    pub text: Option<String>,
}

/// A `[*]...[/*]` relation annotation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "text", rename_all = "snake_case")]
pub enum Relation {
    Synonym(String),
    Reference(String),
}

/// Styling applied to a translation, read between the last closing tag and
/// the `[trn]` opener.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TranslationStyle {
    pub color: Option<String>,
    pub italic: bool,
}

/// Why a line failed body-line validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodyLineIssue {
    MissingIndent,
    MissingTags,
}

/// Match `prefix`, optional whitespace and a double-quoted string anywhere on
/// the line; return the quoted content (up to the last quote).
pub fn scan_header_title(prefix: &str, line: &str) -> Option<String> {
    if let Some(directive) = HeaderDirective::ALL.iter().find(|d| d.prefix() == prefix) {
        return directive.scan(line);
    }

    let pattern = Regex::new(&format!(r#"{}\s*"(.*)""#, regex::escape(prefix))).ok()?;
    pattern.captures(line).map(|caps| caps[1].to_string())
}

/// Return the line as a headword when it starts with neither whitespace nor `[`.
pub fn scan_article_title(line: &str) -> Option<&str> {
    match line.chars().next() {
        Some(first) if !first.is_ascii_whitespace() && first != '[' => Some(line),
        _ => None,
    }
}

/// Text between `[trn]` and the last `[/trn]` of the line, cleaned.
pub fn extract_translation(line: &str) -> Option<String> {
    let caps = TRANSLATION.captures(line)?;
    non_empty(cleanup_line(&caps[1]))
}

/// First `[p...]` block: optional `[c <value>]` qualifier, then free text up
/// to the next closing tag.
pub fn extract_note(line: &str) -> Option<Note> {
    let caps = NOTE.captures(line)?;
    Some(Note {
        qualifier: caps.get(2).and_then(|m| non_empty(cleanup_line(m.as_str()))),
        text: caps.get(3).and_then(|m| non_empty(cleanup_line(m.as_str()))),
    })
}

/// `[*]...[/*]` annotation; a `[ref]` inside marks a cross reference.
pub fn extract_relation(line: &str) -> Option<Relation> {
    let caps = RELATION.captures(line)?;
    let inner = caps.get(1)?.as_str();
    let text = non_empty(cleanup_line(inner))?;

    if inner.contains("[ref]") {
        Some(Relation::Reference(text))
    } else {
        Some(Relation::Synonym(text))
    }
}

pub fn extract_translation_style(line: &str) -> Option<TranslationStyle> {
    let caps = STYLE_SPAN.captures(line)?;
    let span = &caps[1];

    Some(TranslationStyle {
        color: COLOR.captures(span).map(|c| c[1].to_string()),
        italic: span.contains("[i]"),
    })
}

/// Numeric sense marker such as the `2` in ` [m1]2) [trn]...`.
pub fn extract_sense_index(line: &str) -> Option<u32> {
    let caps = SENSE_INDEX.captures(line)?;
    caps[1].parse().ok()
}

/// Strip every bracketed tag, collapse whitespace runs, trim.
pub fn cleanup_line(text: &str) -> String {
    let stripped = TAG.replace_all(text, "");
    let collapsed = WHITESPACE_RUN.replace_all(&stripped, " ");
    collapsed.trim().to_string()
}

pub fn has_body_tag(line: &str) -> bool {
    BODY_TAGS.iter().any(|tag| line.contains(tag))
}

/// A body line starts with whitespace and carries at least one body tag.
pub fn validate_body_line(line: &str) -> Result<(), BodyLineIssue> {
    if !line.starts_with(|c: char| c.is_ascii_whitespace()) {
        return Err(BodyLineIssue::MissingIndent);
    }
    if !has_body_tag(line) {
        return Err(BodyLineIssue::MissingTags);
    }
    Ok(())
}

fn non_empty(text: String) -> Option<String> {
    (!text.is_empty()).then_some(text)
}
