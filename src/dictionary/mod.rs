pub mod store;

#[cfg(test)]
mod store_tests;

use std::collections::HashMap;

use serde::Deserialize;

use crate::core::{
    models::{KanjiEntry, Tag, TermEntry},
    utils::deserialize_number_or_numeric_string,
    JibikiError,
};

/// index.json metadata shipped with every dictionary archive.
#[derive(Deserialize, Debug, Clone)]
pub struct DictionaryIndex {
    pub title: String,
    pub revision: String,

    pub format: Option<u8>, //Must have one
    pub version: Option<u8>,
}

impl DictionaryIndex {
    pub fn format_version(&self) -> Result<u8, JibikiError> {
        self.format.or(self.version).ok_or(JibikiError::MissingVersion)
    }
}

#[derive(Deserialize, Debug, Clone)]
#[serde(untagged)]
pub enum JsonFrequency {
    #[serde(deserialize_with = "deserialize_number_or_numeric_string")]
    Number(u32),
    Complex {
        #[serde(deserialize_with = "deserialize_number_or_numeric_string")]
        value: u32,

        #[serde(rename = "displayValue")]
        display_value: Option<String>,
    },
}

/// Frequency payloads come in three JSON shapes: a bare number, an object
/// with a display string, or either of those nested under a reading.
#[derive(Deserialize, Debug, Clone)]
#[serde(untagged)]
pub enum JsonFrequencyData {
    Simple(JsonFrequency),
    Nested {
        reading: String,
        frequency: JsonFrequency,
    },
}

/// Owned equivalent of [JsonFrequencyData], detached from serde so results
/// can carry it around freely.
#[derive(Debug, Clone, PartialEq)]
pub enum FrequencyData {
    Simple {
        value: u32,
        display_value: Option<String>,
    },
    Nested {
        reading: String,
        value: u32,
        display_value: Option<String>,
    },
}

impl FrequencyData {
    pub fn value(&self) -> u32 {
        match self {
            FrequencyData::Simple { value, .. } => *value,
            FrequencyData::Nested { value, .. } => *value,
        }
    }

    pub fn display_value(&self) -> Option<&str> {
        match self {
            FrequencyData::Simple { display_value, .. } => display_value.as_deref(),
            FrequencyData::Nested { display_value, .. } => display_value.as_deref(),
        }
    }

    pub fn reading(&self) -> Option<&str> {
        match self {
            FrequencyData::Nested { reading, .. } => Some(reading.as_str()),
            FrequencyData::Simple { .. } => None,
        }
    }
}

impl From<JsonFrequencyData> for FrequencyData {
    fn from(json_data: JsonFrequencyData) -> Self {
        let split = |freq: JsonFrequency| match freq {
            JsonFrequency::Number(value) => (value, None),
            JsonFrequency::Complex { value, display_value } => (value, display_value),
        };
        match json_data {
            JsonFrequencyData::Simple(freq) => {
                let (value, display_value) = split(freq);
                FrequencyData::Simple { value, display_value }
            }
            JsonFrequencyData::Nested { reading, frequency } => {
                let (value, display_value) = split(frequency);
                FrequencyData::Nested { reading, value, display_value }
            }
        }
    }
}

/// Mode discriminant of a term/kanji meta row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetaMode {
    Frequency,
    Pitch,
    Ipa,
}

impl MetaMode {
    pub fn parse(mode: &str) -> Option<MetaMode> {
        match mode {
            "freq" => Some(MetaMode::Frequency),
            "pitch" => Some(MetaMode::Pitch),
            "ipa" => Some(MetaMode::Ipa),
            _ => None,
        }
    }
}

/// Auxiliary per-term record, attached to results as frequency metadata.
#[derive(Debug, Clone)]
pub struct TermMetaRecord {
    pub expression: String,
    pub mode: MetaMode,
    pub data: Option<FrequencyData>, // Only populated for Frequency rows
    pub dictionary: String,
}

#[derive(Debug, Clone)]
pub struct KanjiMetaRecord {
    pub character: String,
    pub mode: MetaMode,
    pub data: Option<FrequencyData>,
    pub dictionary: String,
}

/// Glossary items are usually plain strings; structured-content entries get
/// flattened to their JSON text so every definition stays renderable.
#[derive(Deserialize, Debug, Clone)]
#[serde(untagged)]
pub enum GlossaryItem {
    Text(String),
    Structured(serde_json::Value),
}

impl GlossaryItem {
    fn into_text(self) -> String {
        match self {
            GlossaryItem::Text(text) => text,
            GlossaryItem::Structured(value) => value.to_string(),
        }
    }
}

/// term_bank_v3 row:
/// [expression, reading, definition tags, rules, score, glossary, sequence, term tags]
#[derive(Deserialize, Debug, Clone)]
pub struct TermBankEntryV3(
    String,
    String,
    Option<String>,
    String,
    i32,
    Vec<GlossaryItem>,
    i64,
    String,
);

impl TermBankEntryV3 {
    pub(crate) fn into_entry(self, id: u64, dictionary: &str) -> TermEntry {
        let TermBankEntryV3(expression, reading, definition_tags, rules, score, glossary, sequence, term_tags) =
            self;
        let reading = if reading.is_empty() { expression.clone() } else { reading };
        TermEntry {
            id,
            expression,
            reading,
            definition_tags: split_tag_list(definition_tags.as_deref().unwrap_or("")),
            term_tags: split_tag_list(&term_tags),
            rules: split_tag_list(&rules),
            glossary: glossary.into_iter().map(GlossaryItem::into_text).collect(),
            score,
            sequence,
            dictionary: dictionary.to_string(),
        }
    }
}

#[derive(Deserialize, Debug, Clone)]
#[serde(untagged)]
pub enum StatValue {
    Text(String),
    Number(i64),
}

impl StatValue {
    fn into_text(self) -> String {
        match self {
            StatValue::Text(text) => text,
            StatValue::Number(number) => number.to_string(),
        }
    }
}

/// kanji_bank_v3 row:
/// [character, onyomi, kunyomi, tags, meanings, stats]
#[derive(Deserialize, Debug, Clone)]
pub struct KanjiBankEntryV3(
    String,
    String,
    String,
    String,
    Vec<String>,
    HashMap<String, StatValue>,
);

impl KanjiBankEntryV3 {
    pub(crate) fn into_entry(self, id: u64, dictionary: &str) -> KanjiEntry {
        let KanjiBankEntryV3(character, onyomi, kunyomi, tags, glossary, stats) = self;
        KanjiEntry {
            id,
            character,
            onyomi: split_tag_list(&onyomi),
            kunyomi: split_tag_list(&kunyomi),
            tags: split_tag_list(&tags),
            glossary,
            stats: stats.into_iter().map(|(name, value)| (name, value.into_text())).collect(),
            dictionary: dictionary.to_string(),
        }
    }
}

/// tag_bank_v3 row: [name, category, order, notes, score]
#[derive(Deserialize, Debug, Clone)]
pub struct TagBankEntryV3(String, String, i32, String, i32);

impl TagBankEntryV3 {
    pub(crate) fn into_tag(self, dictionary: &str) -> Tag {
        let TagBankEntryV3(name, category, order, notes, score) = self;
        Tag { name, category, notes, order, score, dictionary: dictionary.to_string() }
    }
}

/// term_meta_bank_v3 / kanji_meta_bank_v3 row: [key, mode, data]. The data
/// shape depends on the mode; only frequency payloads are decoded here.
#[derive(Deserialize, Debug, Clone)]
pub struct MetaBankEntryV3(String, String, serde_json::Value);

impl MetaBankEntryV3 {
    fn decode(self) -> Option<(String, MetaMode, Option<FrequencyData>)> {
        let MetaBankEntryV3(key, mode, data) = self;
        let mode = MetaMode::parse(&mode)?;
        let data = match mode {
            MetaMode::Frequency => {
                serde_json::from_value::<JsonFrequencyData>(data).ok().map(FrequencyData::from)
            }
            _ => None,
        };
        Some((key, mode, data))
    }

    pub(crate) fn into_term_record(self, dictionary: &str) -> Option<TermMetaRecord> {
        let (expression, mode, data) = self.decode()?;
        Some(TermMetaRecord { expression, mode, data, dictionary: dictionary.to_string() })
    }

    pub(crate) fn into_kanji_record(self, dictionary: &str) -> Option<KanjiMetaRecord> {
        let (character, mode, data) = self.decode()?;
        Some(KanjiMetaRecord { character, mode, data, dictionary: dictionary.to_string() })
    }
}

fn split_tag_list(tags: &str) -> Vec<String> {
    tags.split_whitespace().map(str::to_string).collect()
}
