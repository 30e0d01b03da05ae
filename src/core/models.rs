use std::collections::HashMap;

/// One sense row of one dictionary. `id` is a surrogate key assigned by the
/// store at import time and is unique across all dictionaries.
#[derive(Debug, Clone)]
pub struct TermEntry {
    pub id: u64,
    pub expression: String,          // Headword as written (kanji or kana)
    pub reading: String,             // Kana reading, may equal the expression
    pub definition_tags: Vec<String>,
    pub term_tags: Vec<String>,
    pub rules: Vec<String>,          // Deinflection rule classes ("v1", "v5", ...)
    pub glossary: Vec<String>,
    pub score: i32,
    pub sequence: i64,               // Cross-reference key within the dictionary, -1 if absent
    pub dictionary: String,
}

#[derive(Debug, Clone)]
pub struct KanjiEntry {
    pub id: u64,
    pub character: String,
    pub onyomi: Vec<String>,
    pub kunyomi: Vec<String>,
    pub tags: Vec<String>,
    pub glossary: Vec<String>,
    pub stats: HashMap<String, String>, // stat name -> value, categorized via the tag bank
    pub dictionary: String,
}

/// Metadata for a definition/term/stat tag as stored in a dictionary's tag bank.
#[derive(Debug, Clone, PartialEq)]
pub struct Tag {
    pub name: String,
    pub category: String,
    pub notes: String,
    pub order: i32,
    pub score: i32,
    pub dictionary: String,
}

impl Tag {
    /// Fallback for tag names with no tag bank record. A miss never fails a
    /// query, it just renders without metadata.
    pub fn bare(name: &str, dictionary: &str) -> Self {
        Tag {
            name: name.to_string(),
            category: String::new(),
            notes: String::new(),
            order: 0,
            score: 0,
            dictionary: dictionary.to_string(),
        }
    }

    /// Synthetic tag naming the dictionary an entry came from. Appended to
    /// every expanded definition tag list.
    pub fn dictionary_source(title: &str) -> Self {
        Tag {
            name: title.to_string(),
            category: "dictionary".to_string(),
            notes: String::new(),
            order: 100,
            score: 0,
            dictionary: title.to_string(),
        }
    }
}
