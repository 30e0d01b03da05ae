use std::collections::{BTreeMap, HashMap, HashSet};

use rayon::iter::{IndexedParallelIterator, IntoParallelRefIterator, ParallelIterator};

use super::{
    DictionaryIndex, KanjiBankEntryV3, KanjiMetaRecord, MetaBankEntryV3, TagBankEntryV3,
    TermBankEntryV3, TermMetaRecord,
};
use crate::core::{
    models::{KanjiEntry, Tag, TermEntry},
    JibikiError,
};

/// How a term query key is matched against the expression/reading indices.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchType {
    Exact,
    Prefix,
}

#[derive(Debug, Clone)]
pub struct TermSearchHit {
    pub input_index: usize, // Index of the query key that produced this hit
    pub entry: TermEntry,
}

#[derive(Debug, Clone)]
pub struct KanjiSearchHit {
    pub input_index: usize,
    pub entry: KanjiEntry,
}

#[derive(Debug, Clone)]
pub struct TermMetaSearchHit {
    pub input_index: usize,
    pub record: TermMetaRecord,
}

#[derive(Debug, Clone)]
pub struct KanjiMetaSearchHit {
    pub input_index: usize,
    pub record: KanjiMetaRecord,
}

/// Query key for exact (expression, reading) pair lookups.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TermReading {
    pub expression: String,
    pub reading: String,
}

#[derive(Debug, Clone)]
pub struct DeleteProgress {
    pub processed: usize,
    pub total: usize,
    pub stores_processed: usize,
    pub total_stores: usize,
}

/// In-memory indexed storage for every record kind a dictionary import
/// produces. Imports append, deletion is per dictionary and bulk only; there
/// is no update-in-place. All lookups take `&self` and run sub-queries in
/// parallel, so concurrent readers are safe to share a store; insertion and
/// deletion take `&mut self`, which makes them exclusive with reads by
/// construction.
#[derive(Default)]
pub struct DictionaryStore {
    next_id: u64,
    dictionaries: HashMap<String, DictionaryIndex>,

    terms: HashMap<u64, TermEntry>,
    // BTreeMaps so prefix matching is a plain range scan
    expression_index: BTreeMap<String, Vec<u64>>,
    reading_index: BTreeMap<String, Vec<u64>>,
    sequence_index: HashMap<String, HashMap<i64, Vec<u64>>>,

    kanji: HashMap<u64, KanjiEntry>,
    kanji_index: HashMap<String, Vec<u64>>,

    tags: HashMap<String, HashMap<String, Tag>>, // dictionary -> tag name -> tag

    term_meta: HashMap<String, Vec<TermMetaRecord>>,
    kanji_meta: HashMap<String, Vec<KanjiMetaRecord>>,
}

impl DictionaryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a dictionary before inserting its records. The index must
    /// carry a format or version number.
    pub fn add_dictionary(&mut self, index: DictionaryIndex) -> Result<(), JibikiError> {
        index.format_version()?;
        if self.dictionaries.contains_key(&index.title) {
            return Err(JibikiError::DuplicateDictionary(index.title.clone()));
        }
        tracing::info!("Installing dictionary '{}' (revision {})", index.title, index.revision);
        self.dictionaries.insert(index.title.clone(), index);
        Ok(())
    }

    pub fn contains_dictionary(&self, title: &str) -> bool {
        self.dictionaries.contains_key(title)
    }

    pub fn dictionaries(&self) -> impl Iterator<Item = &DictionaryIndex> {
        self.dictionaries.values()
    }

    fn require_dictionary(&self, title: &str) -> Result<(), JibikiError> {
        if self.dictionaries.contains_key(title) {
            Ok(())
        } else {
            Err(JibikiError::UnknownDictionary(title.to_string()))
        }
    }

    pub fn add_terms(
        &mut self,
        dictionary: &str,
        rows: Vec<TermBankEntryV3>,
    ) -> Result<usize, JibikiError> {
        self.require_dictionary(dictionary)?;
        let added = rows.len();
        for row in rows {
            let id = self.next_id;
            self.next_id += 1;
            let entry = row.into_entry(id, dictionary);
            self.expression_index.entry(entry.expression.clone()).or_default().push(id);
            self.reading_index.entry(entry.reading.clone()).or_default().push(id);
            if entry.sequence >= 0 {
                self.sequence_index
                    .entry(entry.dictionary.clone())
                    .or_default()
                    .entry(entry.sequence)
                    .or_default()
                    .push(id);
            }
            self.terms.insert(id, entry);
        }
        Ok(added)
    }

    pub fn add_kanji(
        &mut self,
        dictionary: &str,
        rows: Vec<KanjiBankEntryV3>,
    ) -> Result<usize, JibikiError> {
        self.require_dictionary(dictionary)?;
        let added = rows.len();
        for row in rows {
            let id = self.next_id;
            self.next_id += 1;
            let entry = row.into_entry(id, dictionary);
            self.kanji_index.entry(entry.character.clone()).or_default().push(id);
            self.kanji.insert(id, entry);
        }
        Ok(added)
    }

    pub fn add_tags(
        &mut self,
        dictionary: &str,
        rows: Vec<TagBankEntryV3>,
    ) -> Result<usize, JibikiError> {
        self.require_dictionary(dictionary)?;
        let added = rows.len();
        let by_name = self.tags.entry(dictionary.to_string()).or_default();
        for row in rows {
            let tag = row.into_tag(dictionary);
            by_name.insert(tag.name.clone(), tag);
        }
        Ok(added)
    }

    /// Rows with an unrecognized mode are skipped, not errors; the returned
    /// count is the number actually stored.
    pub fn add_term_meta(
        &mut self,
        dictionary: &str,
        rows: Vec<MetaBankEntryV3>,
    ) -> Result<usize, JibikiError> {
        self.require_dictionary(dictionary)?;
        let mut added = 0;
        for row in rows {
            if let Some(record) = row.into_term_record(dictionary) {
                self.term_meta.entry(record.expression.clone()).or_default().push(record);
                added += 1;
            }
        }
        Ok(added)
    }

    pub fn add_kanji_meta(
        &mut self,
        dictionary: &str,
        rows: Vec<MetaBankEntryV3>,
    ) -> Result<usize, JibikiError> {
        self.require_dictionary(dictionary)?;
        let mut added = 0;
        for row in rows {
            if let Some(record) = row.into_kanji_record(dictionary) {
                self.kanji_meta.entry(record.character.clone()).or_default().push(record);
                added += 1;
            }
        }
        Ok(added)
    }

    /// Match each query key against both the expression index and the reading
    /// index. A record matching one key via both indices is reported once for
    /// that key; the same record may still be reported again for a different
    /// key (fan-out is the caller's concern to collapse).
    pub fn find_terms_bulk(
        &self,
        terms: &[String],
        dictionaries: &HashSet<String>,
        match_type: MatchType,
    ) -> Vec<TermSearchHit> {
        terms
            .par_iter()
            .enumerate()
            .flat_map_iter(|(input_index, term)| {
                let mut seen_ids = HashSet::new();
                let mut hits = Vec::new();
                let ids = Self::ids_matching(&self.expression_index, term, match_type)
                    .into_iter()
                    .chain(Self::ids_matching(&self.reading_index, term, match_type));
                for id in ids {
                    if !seen_ids.insert(id) {
                        continue; // Matched through both indices
                    }
                    if let Some(entry) = self.terms.get(&id) {
                        if dictionaries.contains(&entry.dictionary) {
                            hits.push(TermSearchHit { input_index, entry: entry.clone() });
                        }
                    }
                }
                hits.into_iter()
            })
            .collect()
    }

    /// Exact (expression, reading) pair lookup, used for secondary searches
    /// in merge mode.
    pub fn find_terms_exact_bulk(
        &self,
        pairs: &[TermReading],
        dictionaries: &HashSet<String>,
    ) -> Vec<TermSearchHit> {
        pairs
            .par_iter()
            .enumerate()
            .flat_map_iter(|(input_index, pair)| {
                self.expression_index
                    .get(&pair.expression)
                    .into_iter()
                    .flatten()
                    .filter_map(move |id| {
                        let entry = self.terms.get(id)?;
                        if entry.reading == pair.reading
                            && dictionaries.contains(&entry.dictionary)
                        {
                            Some(TermSearchHit { input_index, entry: entry.clone() })
                        } else {
                            None
                        }
                    })
            })
            .collect()
    }

    /// Sequence lookup restricted to a single dictionary; sequences are only
    /// meaningful within the dictionary that assigned them.
    pub fn find_terms_by_sequence_bulk(
        &self,
        sequences: &[i64],
        dictionary: &str,
    ) -> Vec<TermSearchHit> {
        let Some(by_sequence) = self.sequence_index.get(dictionary) else {
            return Vec::new();
        };
        sequences
            .par_iter()
            .enumerate()
            .flat_map_iter(|(input_index, sequence)| {
                by_sequence
                    .get(sequence)
                    .into_iter()
                    .flatten()
                    .filter_map(move |id| self.terms.get(id))
                    .map(move |entry| TermSearchHit { input_index, entry: entry.clone() })
            })
            .collect()
    }

    pub fn find_term_meta_bulk(
        &self,
        terms: &[String],
        dictionaries: &HashSet<String>,
    ) -> Vec<TermMetaSearchHit> {
        terms
            .par_iter()
            .enumerate()
            .flat_map_iter(|(input_index, term)| {
                self.term_meta
                    .get(term)
                    .into_iter()
                    .flatten()
                    .filter(move |record| dictionaries.contains(&record.dictionary))
                    .map(move |record| TermMetaSearchHit { input_index, record: record.clone() })
            })
            .collect()
    }

    pub fn find_kanji_bulk(
        &self,
        characters: &[String],
        dictionaries: &HashSet<String>,
    ) -> Vec<KanjiSearchHit> {
        characters
            .par_iter()
            .enumerate()
            .flat_map_iter(|(input_index, character)| {
                self.kanji_index
                    .get(character)
                    .into_iter()
                    .flatten()
                    .filter_map(move |id| self.kanji.get(id))
                    .filter(move |entry| dictionaries.contains(&entry.dictionary))
                    .map(move |entry| KanjiSearchHit { input_index, entry: entry.clone() })
            })
            .collect()
    }

    pub fn find_kanji_meta_bulk(
        &self,
        characters: &[String],
        dictionaries: &HashSet<String>,
    ) -> Vec<KanjiMetaSearchHit> {
        characters
            .par_iter()
            .enumerate()
            .flat_map_iter(|(input_index, character)| {
                self.kanji_meta
                    .get(character)
                    .into_iter()
                    .flatten()
                    .filter(move |record| dictionaries.contains(&record.dictionary))
                    .map(move |record| KanjiMetaSearchHit { input_index, record: record.clone() })
            })
            .collect()
    }

    /// Single-record tag lookup. Called once per distinct (name, dictionary)
    /// pair per query; the translator memoizes on top of this.
    pub fn find_tag_for_title(&self, name: &str, dictionary: &str) -> Option<&Tag> {
        self.tags.get(dictionary)?.get(name)
    }

    /// Remove one dictionary's records from every store. `progress_step`
    /// controls how often `on_progress` fires between store boundaries.
    pub fn delete_dictionary<F>(
        &mut self,
        title: &str,
        progress_step: usize,
        mut on_progress: F,
    ) -> Result<(), JibikiError>
    where
        F: FnMut(&DeleteProgress),
    {
        if self.dictionaries.remove(title).is_none() {
            return Err(JibikiError::UnknownDictionary(title.to_string()));
        }
        let step = progress_step.max(1);

        let term_ids: Vec<u64> = self
            .terms
            .iter()
            .filter(|(_, entry)| entry.dictionary == title)
            .map(|(id, _)| *id)
            .collect();
        let kanji_ids: Vec<u64> = self
            .kanji
            .iter()
            .filter(|(_, entry)| entry.dictionary == title)
            .map(|(id, _)| *id)
            .collect();
        let tag_count = self.tags.get(title).map_or(0, |by_name| by_name.len());
        let term_meta_count: usize = self
            .term_meta
            .values()
            .map(|records| records.iter().filter(|r| r.dictionary == title).count())
            .sum();
        let kanji_meta_count: usize = self
            .kanji_meta
            .values()
            .map(|records| records.iter().filter(|r| r.dictionary == title).count())
            .sum();

        let mut progress = DeleteProgress {
            processed: 0,
            total: term_ids.len() + kanji_ids.len() + tag_count + term_meta_count + kanji_meta_count,
            stores_processed: 0,
            total_stores: 5,
        };
        let mut last_reported = 0;
        on_progress(&progress);

        for id in &term_ids {
            if let Some(entry) = self.terms.remove(id) {
                Self::unindex(&mut self.expression_index, &entry.expression, *id);
                Self::unindex(&mut self.reading_index, &entry.reading, *id);
                progress.processed += 1;
                if progress.processed - last_reported >= step {
                    last_reported = progress.processed;
                    on_progress(&progress);
                }
            }
        }
        self.sequence_index.remove(title);
        progress.stores_processed += 1;
        on_progress(&progress);

        for id in &kanji_ids {
            if let Some(entry) = self.kanji.remove(id) {
                if let Some(ids) = self.kanji_index.get_mut(&entry.character) {
                    ids.retain(|candidate| candidate != id);
                    if ids.is_empty() {
                        self.kanji_index.remove(&entry.character);
                    }
                }
                progress.processed += 1;
                if progress.processed - last_reported >= step {
                    last_reported = progress.processed;
                    on_progress(&progress);
                }
            }
        }
        progress.stores_processed += 1;
        on_progress(&progress);

        self.tags.remove(title);
        progress.processed += tag_count;
        progress.stores_processed += 1;
        on_progress(&progress);

        for records in self.term_meta.values_mut() {
            let before = records.len();
            records.retain(|record| record.dictionary != title);
            progress.processed += before - records.len();
        }
        self.term_meta.retain(|_, records| !records.is_empty());
        progress.stores_processed += 1;
        on_progress(&progress);

        for records in self.kanji_meta.values_mut() {
            let before = records.len();
            records.retain(|record| record.dictionary != title);
            progress.processed += before - records.len();
        }
        self.kanji_meta.retain(|_, records| !records.is_empty());
        progress.stores_processed += 1;
        on_progress(&progress);

        tracing::info!("Deleted dictionary '{}' ({} records)", title, progress.total);
        Ok(())
    }

    fn ids_matching(
        index: &BTreeMap<String, Vec<u64>>,
        term: &str,
        match_type: MatchType,
    ) -> Vec<u64> {
        match match_type {
            MatchType::Exact => index.get(term).cloned().unwrap_or_default(),
            MatchType::Prefix => index
                .range(term.to_string()..)
                .take_while(|(key, _)| key.starts_with(term))
                .flat_map(|(_, ids)| ids.iter().copied())
                .collect(),
        }
    }

    fn unindex(index: &mut BTreeMap<String, Vec<u64>>, key: &str, id: u64) {
        if let Some(ids) = index.get_mut(key) {
            ids.retain(|candidate| *candidate != id);
            if ids.is_empty() {
                index.remove(key);
            }
        }
    }
}
