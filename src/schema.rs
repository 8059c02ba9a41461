//! The normalized dictionary schema.
//!
//! Eight tables: dictionaries, languages, words, translations, grammar types,
//! translation attributes, and the two join tables linking the latter to
//! translations. Each row type declares its own table through [`Entity`].

use crate::entity::{CellValue, Entity, EntityError, RowId};
use crate::store::{EntityStore, Table};

/// A dictionary declared by `#NAME`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dictionary {
    pub name: String,
}

impl Entity for Dictionary {
    const NAME: &'static str = "dictionaries";
    const COLUMNS: &'static [&'static str] = &["name"];

    fn to_row(&self) -> Vec<CellValue> {
        vec![self.name.as_str().into()]
    }
}

/// A source or target language
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Language {
    pub name: String,
}

impl Entity for Language {
    const NAME: &'static str = "languages";
    const COLUMNS: &'static [&'static str] = &["name"];
    const UNIQUE: &'static [&'static str] = &["name"];

    fn to_row(&self) -> Vec<CellValue> {
        vec![self.name.as_str().into()]
    }
}

/// A headword or a translation target.
///
/// Words are never deduplicated: the same spelling inserted twice is two rows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Word {
    pub text: String,
    pub dictionary_id: Option<RowId>,
    pub language_id: Option<RowId>,
}

impl Entity for Word {
    const NAME: &'static str = "words";
    const COLUMNS: &'static [&'static str] = &["text", "dictionary_id", "language_id"];

    fn to_row(&self) -> Vec<CellValue> {
        vec![
            self.text.as_str().into(),
            self.dictionary_id.into(),
            self.language_id.into(),
        ]
    }
}

/// Directed link from a source word to a target word
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Translation {
    pub word_from_id: RowId,
    pub word_to_id: RowId,
}

impl Entity for Translation {
    const NAME: &'static str = "translations";
    const COLUMNS: &'static [&'static str] = &["word_from_id", "word_to_id"];
    const UNIQUE: &'static [&'static str] = &["word_from_id", "word_to_id"];

    fn to_row(&self) -> Vec<CellValue> {
        vec![self.word_from_id.into(), self.word_to_id.into()]
    }
}

/// Part-of-speech or similar grammar tag
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GrammarType {
    pub value: String,
}

impl Entity for GrammarType {
    const NAME: &'static str = "grammar_types";
    const COLUMNS: &'static [&'static str] = &["value"];
    const UNIQUE: &'static [&'static str] = &["value"];

    fn to_row(&self) -> Vec<CellValue> {
        vec![self.value.as_str().into()]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GrammarTypeTranslation {
    pub grammar_type_id: RowId,
    pub translation_id: RowId,
}

impl Entity for GrammarTypeTranslation {
    const NAME: &'static str = "grammar_types_translations";
    const COLUMNS: &'static [&'static str] = &["grammar_type_id", "translation_id"];
    const UNIQUE: &'static [&'static str] = &["grammar_type_id", "translation_id"];

    fn to_row(&self) -> Vec<CellValue> {
        vec![self.grammar_type_id.into(), self.translation_id.into()]
    }
}

/// Free-text qualifier attached to one translation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranslationAttribute {
    pub value: String,
}

impl Entity for TranslationAttribute {
    const NAME: &'static str = "translation_attributes";
    const COLUMNS: &'static [&'static str] = &["value"];
    const UNIQUE: &'static [&'static str] = &["value"];

    fn to_row(&self) -> Vec<CellValue> {
        vec![self.value.as_str().into()]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttributeTranslation {
    pub attribute_id: RowId,
    pub translation_id: RowId,
}

impl Entity for AttributeTranslation {
    const NAME: &'static str = "attribute_translations";
    const COLUMNS: &'static [&'static str] = &["attribute_id", "translation_id"];
    const UNIQUE: &'static [&'static str] = &["attribute_id", "translation_id"];

    fn to_row(&self) -> Vec<CellValue> {
        vec![self.attribute_id.into(), self.translation_id.into()]
    }
}

/// All tables populated by one parse run.
#[derive(Debug, Clone)]
pub struct DictionarySchema {
    pub words: Table<Word>,
    pub dictionaries: Table<Dictionary>,
    pub languages: Table<Language>,
    pub translations: Table<Translation>,
    pub grammar_types: Table<GrammarType>,
    pub grammar_type_translations: Table<GrammarTypeTranslation>,
    pub translation_attributes: Table<TranslationAttribute>,
    pub attribute_translations: Table<AttributeTranslation>,
}

impl DictionarySchema {
    /// Declare every table with its unique key.
    pub fn new() -> Result<Self, EntityError> {
        Ok(Self {
            words: Table::declare()?,
            dictionaries: Table::declare()?,
            languages: Table::declare()?,
            translations: Table::declare()?,
            grammar_types: Table::declare()?,
            grammar_type_translations: Table::declare()?,
            translation_attributes: Table::declare()?,
            attribute_translations: Table::declare()?,
        })
    }

    /// Tables handed to renderers, in report order.
    ///
    /// The attribute join table is populated on every run but only reported
    /// when `include_attribute_links` is set.
    pub fn rendered_tables(&self, include_attribute_links: bool) -> Vec<&EntityStore> {
        let mut tables = vec![
            self.words.store(),
            self.dictionaries.store(),
            self.languages.store(),
            self.translations.store(),
            self.grammar_types.store(),
            self.grammar_type_translations.store(),
            self.translation_attributes.store(),
        ];
        if include_attribute_links {
            tables.push(self.attribute_translations.store());
        }
        tables
    }

    /// Look up a table by name
    pub fn table(&self, name: &str) -> Option<&EntityStore> {
        self.rendered_tables(true)
            .into_iter()
            .find(|table| table.name() == name)
    }
}
