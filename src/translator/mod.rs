use std::collections::{hash_map::Entry, BTreeMap, HashMap, HashSet};

use crate::{
    core::{
        models::{Tag, TermEntry},
        utils::{is_scannable_start, katakana_to_hiragana, tag_base_name},
        JibikiError,
    },
    deinflect::{Deinflector, RuleSet},
    dictionary::{
        store::{DictionaryStore, MatchType, TermReading},
        FrequencyData, MetaMode,
    },
};


/// Which result shape a term lookup produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FindTermsMode {
    Grouped,
    Merged,
    Split,
}

#[derive(Debug, Clone)]
pub struct DictionaryOptions {
    pub priority: i32,
    pub allow_secondary_searches: bool,
}

impl Default for DictionaryOptions {
    fn default() -> Self {
        DictionaryOptions { priority: 0, allow_secondary_searches: false }
    }
}

/// Per-query settings. Dictionaries absent from `enabled_dictionaries` are
/// invisible to the query; an empty map yields an empty result.
#[derive(Debug, Clone, Default)]
pub struct FindTermsOptions {
    pub enabled_dictionaries: HashMap<String, DictionaryOptions>,
    pub main_dictionary: String, // Anchors sequence merging in merged mode
    pub compact_tags: bool,
    pub scan_alphanumeric: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FrequencyInfo {
    pub dictionary: String,
    pub data: FrequencyData,
}

/// Classification of an expression by the summed score of its term tags.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TermFrequencyClass {
    Popular,
    Normal,
    Rare,
}

impl TermFrequencyClass {
    fn classify(score_sum: i32) -> Self {
        if score_sum > 0 {
            TermFrequencyClass::Popular
        } else if score_sum < 0 {
            TermFrequencyClass::Rare
        } else {
            TermFrequencyClass::Normal
        }
    }
}

/// A fully materialized definition: one store entry bound to the source text
/// that reached it, with tag names expanded to full records.
#[derive(Debug, Clone, PartialEq)]
pub struct TermDefinition {
    pub id: u64,
    pub source: String, // The slice of input text this definition matched
    pub reasons: Vec<String>,
    pub expression: String,
    pub reading: String,
    pub definition_tags: Vec<Tag>,
    pub term_tags: Vec<Tag>,
    pub rules: Vec<String>,
    pub glossary: Vec<String>,
    pub score: i32,
    pub sequence: i64,
    pub dictionary: String,
    pub frequencies: Vec<FrequencyInfo>,
}

/// One headword of a grouped or merged entry.
#[derive(Debug, Clone, PartialEq)]
pub struct ExpressionSummary {
    pub expression: String,
    pub reading: String,
    pub term_tags: Vec<Tag>,
    pub frequency_class: TermFrequencyClass,
    pub frequencies: Vec<FrequencyInfo>,
}

/// A grouped (or merged) entry: one or more headwords sharing a list of
/// definitions.
#[derive(Debug, Clone, PartialEq)]
pub struct GroupedDefinition {
    pub source: String,
    pub reasons: Vec<String>,
    pub score: i32,
    pub expressions: Vec<ExpressionSummary>,
    pub definitions: Vec<TermDefinition>,
}

#[derive(Debug, PartialEq)]
pub enum TermResults {
    Split(Vec<TermDefinition>),
    Grouped(Vec<GroupedDefinition>),
    Merged(Vec<GroupedDefinition>),
}

#[derive(Debug, PartialEq)]
pub struct FindTermsResult {
    pub results: TermResults,
    /// Number of input characters consumed by the longest surviving match.
    pub matched_length: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct KanjiStat {
    pub name: String,
    pub value: String,
    pub category: String,
    pub notes: String,
    pub order: i32,
    pub score: i32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct KanjiDefinition {
    pub character: String,
    pub onyomi: Vec<String>,
    pub kunyomi: Vec<String>,
    pub tags: Vec<Tag>,
    pub glossary: Vec<String>,
    pub stats: BTreeMap<String, Vec<KanjiStat>>, // Bucketed by tag category
    pub dictionary: String,
    pub frequencies: Vec<FrequencyInfo>,
}

/// Caches scoped to a single `find_terms`/`find_kanji` invocation. The same
/// tag name recurs across many entries, so resolution is memoized here and
/// thrown away with the query; nothing is shared across invocations.
#[derive(Default)]
struct QueryContext {
    tag_cache: HashMap<(String, String), Option<Tag>>,
    frequency_cache: HashMap<String, Vec<FrequencyInfo>>,
}

/// A deinflection candidate bound to the input slice it came from.
struct SourcedCandidate {
    source: String,
    term: String,
    reasons: Vec<String>,
    rules: RuleSet,
}

/// Finds term and kanji definitions for text, driving the deinflector and
/// the dictionary store. One instance serves one caller at a time; separate
/// concurrent lookups should clone the options and share the translator
/// behind a read lock.
pub struct Translator {
    deinflector: Deinflector,
    store: DictionaryStore,
}

impl Translator {
    /// Build a translator from a rule table resource. A malformed table fails
    /// here and leaves no partially usable engine behind.
    pub fn prepare(rule_table: &str, store: DictionaryStore) -> Result<Self, JibikiError> {
        Ok(Translator { deinflector: Deinflector::new(rule_table)?, store })
    }

    pub fn with_default_rules(store: DictionaryStore) -> Result<Self, JibikiError> {
        Ok(Translator { deinflector: Deinflector::with_default_rules()?, store })
    }

    pub fn store(&self) -> &DictionaryStore {
        &self.store
    }

    /// Write access for the import side. Exclusive with lookups by borrow.
    pub fn store_mut(&mut self) -> &mut DictionaryStore {
        &mut self.store
    }

    pub fn deinflector(&self) -> &Deinflector {
        &self.deinflector
    }

    pub fn find_terms(
        &self,
        mode: FindTermsMode,
        text: &str,
        options: &FindTermsOptions,
    ) -> Result<FindTermsResult, JibikiError> {
        let mut ctx = QueryContext::default();
        let (definitions, matched_length) = self.find_terms_internal(text, options, &mut ctx);

        let results = match mode {
            FindTermsMode::Split => {
                let mut definitions = definitions;
                self.annotate_definition_frequencies(&mut definitions, options, &mut ctx);
                TermResults::Split(definitions)
            }
            FindTermsMode::Grouped => {
                let mut groups = self.group_terms(definitions, options);
                self.annotate_group_frequencies(&mut groups, options, &mut ctx);
                TermResults::Grouped(groups)
            }
            FindTermsMode::Merged => {
                let mut groups = self.merge_terms(definitions, options, &mut ctx);
                self.annotate_group_frequencies(&mut groups, options, &mut ctx);
                TermResults::Merged(groups)
            }
        };

        Ok(FindTermsResult { results, matched_length })
    }

    /// Shared term-finding core: deinflect every prefix of the text (and of
    /// its hiragana-normalized copy), look all candidate surface forms up in
    /// one bulk query, validate rule compatibility, then dedupe and sort.
    fn find_terms_internal(
        &self,
        text: &str,
        options: &FindTermsOptions,
        ctx: &mut QueryContext,
    ) -> (Vec<TermDefinition>, usize) {
        if text.is_empty() || options.enabled_dictionaries.is_empty() {
            return (Vec::new(), 0);
        }
        if !options.scan_alphanumeric {
            match text.chars().next() {
                Some(first) if is_scannable_start(first) => {}
                _ => return (Vec::new(), 0),
            }
        }

        let titles = enabled_titles(options);
        let candidates = self.collect_candidates(text);

        // One store round trip per distinct surface form, no matter how many
        // prefix/script combinations produced it
        let mut unique_terms: Vec<String> = Vec::new();
        let mut term_slots: HashMap<String, usize> = HashMap::new();
        for candidate in &candidates {
            if !term_slots.contains_key(&candidate.term) {
                term_slots.insert(candidate.term.clone(), unique_terms.len());
                unique_terms.push(candidate.term.clone());
            }
        }

        let mut entries_by_slot: Vec<Vec<TermEntry>> = vec![Vec::new(); unique_terms.len()];
        for hit in self.store.find_terms_bulk(&unique_terms, &titles, MatchType::Exact) {
            entries_by_slot[hit.input_index].push(hit.entry);
        }

        let mut definitions = Vec::new();
        for candidate in &candidates {
            let Some(&slot) = term_slots.get(&candidate.term) else {
                continue;
            };
            for entry in &entries_by_slot[slot] {
                let entry_rules = self.deinflector.rule_set(&entry.rules);
                if !candidate.rules.is_empty() && !candidate.rules.intersects(entry_rules) {
                    continue;
                }
                definitions.push(self.build_definition(
                    entry,
                    &candidate.source,
                    candidate.reasons.clone(),
                    ctx,
                ));
            }
        }

        let mut definitions = dedupe_definitions(definitions);
        sort_definitions(&mut definitions, options);
        let matched_length =
            definitions.iter().map(|d| d.source.chars().count()).max().unwrap_or(0);
        (definitions, matched_length)
    }

    /// Deinflect every prefix of the text, longest first, for the original
    /// script and for the hiragana-normalized copy when it differs. Each
    /// candidate remembers the original-text slice it covers.
    fn collect_candidates(&self, text: &str) -> Vec<SourcedCandidate> {
        let source_chars: Vec<char> = text.chars().collect();
        let normalized = katakana_to_hiragana(text);
        let normalized_chars: Vec<char> = normalized.chars().collect();

        let mut scripts: Vec<&[char]> = vec![source_chars.as_slice()];
        if normalized != text {
            scripts.push(normalized_chars.as_slice());
        }

        let mut candidates = Vec::new();
        let mut deinflected: HashSet<String> = HashSet::new();
        for chars in scripts {
            for length in (1..=chars.len()).rev() {
                let slice: String = chars[..length].iter().collect();
                if !deinflected.insert(slice.clone()) {
                    continue; // Same slice in both scripts
                }
                let source: String = source_chars[..length].iter().collect();
                for deinflection in self.deinflector.deinflect(&slice) {
                    candidates.push(SourcedCandidate {
                        source: source.clone(),
                        term: deinflection.term,
                        reasons: deinflection.reasons,
                        rules: deinflection.rules,
                    });
                }
            }
        }
        candidates
    }

    fn build_definition(
        &self,
        entry: &TermEntry,
        source: &str,
        reasons: Vec<String>,
        ctx: &mut QueryContext,
    ) -> TermDefinition {
        let mut definition_tags = self.expand_tags(&entry.definition_tags, &entry.dictionary, ctx);
        definition_tags.push(Tag::dictionary_source(&entry.dictionary));
        sort_tags(&mut definition_tags);
        let mut term_tags = self.expand_tags(&entry.term_tags, &entry.dictionary, ctx);
        sort_tags(&mut term_tags);

        TermDefinition {
            id: entry.id,
            source: source.to_string(),
            reasons,
            expression: entry.expression.clone(),
            reading: entry.reading.clone(),
            definition_tags,
            term_tags,
            rules: entry.rules.clone(),
            glossary: entry.glossary.clone(),
            score: entry.score,
            sequence: entry.sequence,
            dictionary: entry.dictionary.clone(),
            frequencies: Vec::new(),
        }
    }

    fn resolve_tag(&self, name: &str, dictionary: &str, ctx: &mut QueryContext) -> Option<Tag> {
        let base = tag_base_name(name);
        let key = (base.to_string(), dictionary.to_string());
        ctx.tag_cache
            .entry(key)
            .or_insert_with(|| self.store.find_tag_for_title(base, dictionary).cloned())
            .clone()
    }

    /// Expand tag names to full records. A name with no tag bank record gets
    /// a bare tag; that is never an error.
    fn expand_tags(&self, names: &[String], dictionary: &str, ctx: &mut QueryContext) -> Vec<Tag> {
        names
            .iter()
            .map(|name| match self.resolve_tag(name, dictionary, ctx) {
                Some(mut tag) => {
                    tag.name = name.clone();
                    tag
                }
                None => Tag::bare(name, dictionary),
            })
            .collect()
    }

    /// Bucket definitions by (expression, reading) across dictionaries. Used
    /// directly by grouped mode and for stray definitions in merged mode.
    fn group_terms(
        &self,
        definitions: Vec<TermDefinition>,
        options: &FindTermsOptions,
    ) -> Vec<GroupedDefinition> {
        let mut buckets: Vec<((String, String), Vec<TermDefinition>)> = Vec::new();
        let mut slots: HashMap<(String, String), usize> = HashMap::new();
        for definition in definitions {
            let key = (definition.expression.clone(), definition.reading.clone());
            match slots.get(&key) {
                Some(&slot) => buckets[slot].1.push(definition),
                None => {
                    slots.insert(key.clone(), buckets.len());
                    buckets.push((key, vec![definition]));
                }
            }
        }

        let mut groups = Vec::new();
        for ((expression, reading), mut members) in buckets {
            sort_definitions(&mut members, options);

            let mut term_tags: Vec<Tag> = Vec::new();
            for member in &members {
                for tag in &member.term_tags {
                    if !term_tags.iter().any(|t| t.name == tag.name) {
                        term_tags.push(tag.clone());
                    }
                }
            }
            sort_tags(&mut term_tags);
            let frequency_class =
                TermFrequencyClass::classify(term_tags.iter().map(|t| t.score).sum());

            let source = longest_source(&members);
            let reasons = members.first().map(|m| m.reasons.clone()).unwrap_or_default();
            let score = members.iter().map(|m| m.score).max().unwrap_or(0);
            if options.compact_tags {
                compress_definition_tags(&mut members);
            }

            groups.push(GroupedDefinition {
                source,
                reasons,
                score,
                expressions: vec![ExpressionSummary {
                    expression,
                    reading,
                    term_tags,
                    frequency_class,
                    frequencies: Vec::new(),
                }],
                definitions: members,
            });
        }

        sort_grouped(&mut groups, options);
        groups
    }

    /// Merge definitions that share a sequence in the main dictionary into a
    /// single entry, folding in same-headword definitions from the other
    /// dictionaries and, where allowed, secondary exact-match searches.
    /// Definitions no sequence group absorbs fall back to grouped shaping.
    fn merge_terms(
        &self,
        definitions: Vec<TermDefinition>,
        options: &FindTermsOptions,
        ctx: &mut QueryContext,
    ) -> Vec<GroupedDefinition> {
        let main = options.main_dictionary.as_str();
        let secondary_titles: HashSet<String> = options
            .enabled_dictionaries
            .iter()
            .filter(|(_, dictionary)| dictionary.allow_secondary_searches)
            .map(|(title, _)| title.clone())
            .collect();

        let mut sequences: Vec<(i64, Vec<TermDefinition>)> = Vec::new();
        let mut sequence_slots: HashMap<i64, usize> = HashMap::new();
        let mut held_aside: Vec<TermDefinition> = Vec::new();
        for definition in definitions {
            if definition.sequence >= 0 && definition.dictionary == main {
                match sequence_slots.get(&definition.sequence) {
                    Some(&slot) => sequences[slot].1.push(definition),
                    None => {
                        sequence_slots.insert(definition.sequence, sequences.len());
                        sequences.push((definition.sequence, vec![definition]));
                    }
                }
            } else {
                held_aside.push(definition);
            }
        }

        let mut groups: Vec<GroupedDefinition> = Vec::new();
        let mut consumed: HashSet<usize> = HashSet::new();

        for (sequence, members) in &sequences {
            let source = longest_source(members);
            let reasons = members.first().map(|m| m.reasons.clone()).unwrap_or_default();

            // The senses the deinflection step surfaced may be a subset;
            // fetch the authoritative list for this sequence from the main
            // dictionary.
            let mut merge = GlossMerge::default();
            for hit in self.store.find_terms_by_sequence_bulk(&[*sequence], main) {
                merge.absorb(self.build_definition(&hit.entry, &source, reasons.clone(), ctx));
            }

            // Other dictionaries' definitions for a headword this group
            // already covers merge into it instead of standing alone
            for (index, definition) in held_aside.iter().enumerate() {
                if consumed.contains(&index) {
                    continue;
                }
                if merge.contains(&definition.expression, &definition.reading) {
                    merge.absorb(definition.clone());
                    consumed.insert(index);
                }
            }

            // Secondary searches contribute glosses without anchoring the
            // merge themselves
            if !secondary_titles.is_empty() {
                let pairs = merge.pairs();
                for hit in self.store.find_terms_exact_bulk(&pairs, &secondary_titles) {
                    let definition = self.build_definition(&hit.entry, &source, Vec::new(), ctx);
                    merge.absorb(definition);
                }
            }

            let (mut merged_definitions, pair_summaries) = merge.finish();
            sort_definitions(&mut merged_definitions, options);
            let score = merged_definitions.iter().map(|d| d.score).max().unwrap_or(0);

            let expressions = pair_summaries
                .into_iter()
                .map(|(expression, reading, term_tags)| {
                    let frequency_class =
                        TermFrequencyClass::classify(term_tags.iter().map(|t| t.score).sum());
                    ExpressionSummary {
                        expression,
                        reading,
                        term_tags,
                        frequency_class,
                        frequencies: Vec::new(),
                    }
                })
                .collect();

            groups.push(GroupedDefinition {
                source,
                reasons,
                score,
                expressions,
                definitions: merged_definitions,
            });
        }

        let strays: Vec<TermDefinition> = held_aside
            .into_iter()
            .enumerate()
            .filter(|(index, _)| !consumed.contains(index))
            .map(|(_, definition)| definition)
            .collect();
        groups.extend(self.group_terms(strays, options));

        sort_grouped(&mut groups, options);
        groups
    }

    /// Attach "freq"-mode term metadata to each definition (split mode).
    fn annotate_definition_frequencies(
        &self,
        definitions: &mut [TermDefinition],
        options: &FindTermsOptions,
        ctx: &mut QueryContext,
    ) {
        let expressions = definitions.iter().map(|d| d.expression.clone()).collect();
        self.collect_term_frequencies(expressions, options, ctx);
        for definition in definitions {
            if let Some(frequencies) = ctx.frequency_cache.get(&definition.expression) {
                definition.frequencies = frequencies.clone();
            }
        }
    }

    /// Attach "freq"-mode term metadata to every headword of every group.
    /// Always the last shaping step.
    fn annotate_group_frequencies(
        &self,
        groups: &mut [GroupedDefinition],
        options: &FindTermsOptions,
        ctx: &mut QueryContext,
    ) {
        let expressions = groups
            .iter()
            .flat_map(|group| group.expressions.iter().map(|e| e.expression.clone()))
            .collect();
        self.collect_term_frequencies(expressions, options, ctx);
        for group in groups.iter_mut() {
            for summary in &mut group.expressions {
                if let Some(frequencies) = ctx.frequency_cache.get(&summary.expression) {
                    summary.frequencies = frequencies.clone();
                }
            }
        }
    }

    fn collect_term_frequencies(
        &self,
        expressions: Vec<String>,
        options: &FindTermsOptions,
        ctx: &mut QueryContext,
    ) {
        let mut pending: Vec<String> = Vec::new();
        let mut seen: HashSet<String> = HashSet::new();
        for expression in expressions {
            if !ctx.frequency_cache.contains_key(&expression) && seen.insert(expression.clone()) {
                pending.push(expression);
            }
        }
        if pending.is_empty() {
            return;
        }

        let titles = enabled_titles(options);
        let mut found: Vec<Vec<FrequencyInfo>> = vec![Vec::new(); pending.len()];
        for hit in self.store.find_term_meta_bulk(&pending, &titles) {
            if hit.record.mode != MetaMode::Frequency {
                continue;
            }
            if let Some(data) = hit.record.data {
                found[hit.input_index]
                    .push(FrequencyInfo { dictionary: hit.record.dictionary, data });
            }
        }
        for (expression, frequencies) in pending.into_iter().zip(found) {
            ctx.frequency_cache.insert(expression, frequencies);
        }
    }

    /// Find kanji definitions for every distinct character of the input.
    /// Entries are returned per dictionary, never merged across them.
    pub fn find_kanji(
        &self,
        text: &str,
        options: &FindTermsOptions,
    ) -> Result<Vec<KanjiDefinition>, JibikiError> {
        if options.enabled_dictionaries.is_empty() {
            return Ok(Vec::new());
        }
        let mut ctx = QueryContext::default();
        let titles = enabled_titles(options);

        let mut characters: Vec<String> = Vec::new();
        let mut seen: HashSet<char> = HashSet::new();
        for c in text.chars() {
            if seen.insert(c) {
                characters.push(c.to_string());
            }
        }
        if characters.is_empty() {
            return Ok(Vec::new());
        }

        let mut definitions = Vec::new();
        for hit in self.store.find_kanji_bulk(&characters, &titles) {
            let entry = hit.entry;
            let mut tags = self.expand_tags(&entry.tags, &entry.dictionary, &mut ctx);
            tags.push(Tag::dictionary_source(&entry.dictionary));
            sort_tags(&mut tags);
            let stats = self.expand_stats(&entry.stats, &entry.dictionary, &mut ctx);
            definitions.push(KanjiDefinition {
                character: entry.character,
                onyomi: entry.onyomi,
                kunyomi: entry.kunyomi,
                tags,
                glossary: entry.glossary,
                stats,
                dictionary: entry.dictionary,
                frequencies: Vec::new(),
            });
        }

        let mut frequencies_by_character: HashMap<String, Vec<FrequencyInfo>> = HashMap::new();
        for hit in self.store.find_kanji_meta_bulk(&characters, &titles) {
            if hit.record.mode != MetaMode::Frequency {
                continue;
            }
            if let Some(data) = hit.record.data {
                frequencies_by_character
                    .entry(hit.record.character.clone())
                    .or_default()
                    .push(FrequencyInfo { dictionary: hit.record.dictionary, data });
            }
        }
        for definition in &mut definitions {
            if let Some(frequencies) = frequencies_by_character.get(&definition.character) {
                definition.frequencies = frequencies.clone();
            }
        }

        Ok(definitions)
    }

    /// Resolve each stat name through the tag bank and bucket by the tag's
    /// category, each bucket sorted by the tag's notes.
    fn expand_stats(
        &self,
        stats: &HashMap<String, String>,
        dictionary: &str,
        ctx: &mut QueryContext,
    ) -> BTreeMap<String, Vec<KanjiStat>> {
        let mut names: Vec<&String> = stats.keys().collect();
        names.sort();

        let mut buckets: BTreeMap<String, Vec<KanjiStat>> = BTreeMap::new();
        for name in names {
            let value = stats[name].clone();
            let tag = self
                .resolve_tag(name, dictionary, ctx)
                .unwrap_or_else(|| Tag::bare(name, dictionary));
            let category =
                if tag.category.is_empty() { "misc".to_string() } else { tag.category.clone() };
            buckets.entry(category.clone()).or_default().push(KanjiStat {
                name: name.clone(),
                value,
                category,
                notes: tag.notes,
                order: tag.order,
                score: tag.score,
            });
        }
        for stats in buckets.values_mut() {
            stats.sort_by(|a, b| a.notes.cmp(&b.notes).then_with(|| a.name.cmp(&b.name)));
        }
        buckets
    }
}

/// Accumulates a merged entry: definitions keyed by glossary text, headword
/// pairs in first-seen order with their term tags merged.
#[derive(Default)]
struct GlossMerge {
    definitions: Vec<TermDefinition>,
    gloss_slots: HashMap<Vec<String>, usize>,
    pair_order: Vec<(String, String)>,
    pair_tags: HashMap<(String, String), Vec<Tag>>,
    expressions: HashSet<String>,
    readings: HashSet<String>,
}

impl GlossMerge {
    fn absorb(&mut self, definition: TermDefinition) {
        let pair = (definition.expression.clone(), definition.reading.clone());
        self.expressions.insert(pair.0.clone());
        self.readings.insert(pair.1.clone());
        let tags = match self.pair_tags.entry(pair.clone()) {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) => {
                self.pair_order.push(pair);
                entry.insert(Vec::new())
            }
        };
        for tag in &definition.term_tags {
            if !tags.iter().any(|t| t.name == tag.name) {
                tags.push(tag.clone());
            }
        }

        match self.gloss_slots.get(&definition.glossary) {
            Some(&slot) => {
                let existing = &mut self.definitions[slot];
                for tag in definition.definition_tags {
                    if !existing.definition_tags.iter().any(|t| t.name == tag.name) {
                        existing.definition_tags.push(tag);
                    }
                }
                for reason in definition.reasons {
                    if !existing.reasons.contains(&reason) {
                        existing.reasons.push(reason);
                    }
                }
            }
            None => {
                self.gloss_slots.insert(definition.glossary.clone(), self.definitions.len());
                self.definitions.push(definition);
            }
        }
    }

    fn contains(&self, expression: &str, reading: &str) -> bool {
        self.expressions.contains(expression) && self.readings.contains(reading)
    }

    fn pairs(&self) -> Vec<TermReading> {
        self.pair_order
            .iter()
            .map(|(expression, reading)| TermReading {
                expression: expression.clone(),
                reading: reading.clone(),
            })
            .collect()
    }

    fn finish(mut self) -> (Vec<TermDefinition>, Vec<(String, String, Vec<Tag>)>) {
        for definition in &mut self.definitions {
            sort_tags(&mut definition.definition_tags);
        }
        let pair_tags = &mut self.pair_tags;
        let summaries = self
            .pair_order
            .iter()
            .map(|pair| {
                let mut tags = pair_tags.remove(pair).unwrap_or_default();
                sort_tags(&mut tags);
                (pair.0.clone(), pair.1.clone(), tags)
            })
            .collect();
        (self.definitions, summaries)
    }
}

fn enabled_titles(options: &FindTermsOptions) -> HashSet<String> {
    options.enabled_dictionaries.keys().cloned().collect()
}

fn dictionary_priority(options: &FindTermsOptions, dictionary: &str) -> i32 {
    options.enabled_dictionaries.get(dictionary).map(|d| d.priority).unwrap_or(0)
}

fn longest_source(definitions: &[TermDefinition]) -> String {
    definitions
        .iter()
        .max_by_key(|definition| definition.source.chars().count())
        .map(|definition| definition.source.clone())
        .unwrap_or_default()
}

/// Definitions with identical (expression, reading, dictionary, glossary)
/// are one result: multiple deinflection paths reaching the same sense merge
/// by unioning their reasons, keeping the longest source.
fn dedupe_definitions(definitions: Vec<TermDefinition>) -> Vec<TermDefinition> {
    let mut merged: Vec<TermDefinition> = Vec::new();
    let mut slots: HashMap<(String, String, String, Vec<String>), usize> = HashMap::new();
    for definition in definitions {
        let key = (
            definition.expression.clone(),
            definition.reading.clone(),
            definition.dictionary.clone(),
            definition.glossary.clone(),
        );
        match slots.get(&key) {
            Some(&slot) => {
                let existing = &mut merged[slot];
                for reason in definition.reasons {
                    if !existing.reasons.contains(&reason) {
                        existing.reasons.push(reason);
                    }
                }
                if definition.source.chars().count() > existing.source.chars().count() {
                    existing.source = definition.source;
                }
            }
            None => {
                slots.insert(key, merged.len());
                merged.push(definition);
            }
        }
    }
    merged
}

/// Score descending, then dictionary priority descending, then matched
/// source length descending; `sort_by` is stable, so input order breaks the
/// remaining ties.
fn sort_definitions(definitions: &mut [TermDefinition], options: &FindTermsOptions) {
    definitions.sort_by(|a, b| {
        b.score
            .cmp(&a.score)
            .then_with(|| {
                dictionary_priority(options, &b.dictionary)
                    .cmp(&dictionary_priority(options, &a.dictionary))
            })
            .then_with(|| b.source.chars().count().cmp(&a.source.chars().count()))
    });
}

fn sort_grouped(groups: &mut [GroupedDefinition], options: &FindTermsOptions) {
    groups.sort_by(|a, b| {
        b.score
            .cmp(&a.score)
            .then_with(|| group_priority(b, options).cmp(&group_priority(a, options)))
            .then_with(|| b.source.chars().count().cmp(&a.source.chars().count()))
    });
}

fn group_priority(group: &GroupedDefinition, options: &FindTermsOptions) -> i32 {
    group
        .definitions
        .iter()
        .map(|definition| dictionary_priority(options, &definition.dictionary))
        .max()
        .unwrap_or(0)
}

fn sort_tags(tags: &mut [Tag]) {
    tags.sort_by(|a, b| a.order.cmp(&b.order).then_with(|| a.name.cmp(&b.name)));
}

/// With compact tags enabled, runs of definitions repeating the same
/// dictionary-category or part-of-speech-category tag sets drop the repeats.
fn compress_definition_tags(definitions: &mut [TermDefinition]) {
    let mut last_dictionary: Option<Vec<String>> = None;
    let mut last_part_of_speech: Option<Vec<String>> = None;
    for definition in definitions {
        let names_in_category = |category: &str| {
            let mut names: Vec<String> = definition
                .definition_tags
                .iter()
                .filter(|tag| tag.category == category)
                .map(|tag| tag.name.clone())
                .collect();
            names.sort();
            names
        };
        let dictionary_names = names_in_category("dictionary");
        let part_of_speech_names = names_in_category("partOfSpeech");

        let mut strip: Vec<&str> = Vec::new();
        if last_dictionary.as_ref() == Some(&dictionary_names) {
            strip.push("dictionary");
        } else {
            last_dictionary = Some(dictionary_names);
            last_part_of_speech = None;
        }
        if last_part_of_speech.as_ref() == Some(&part_of_speech_names) {
            strip.push("partOfSpeech");
        } else {
            last_part_of_speech = Some(part_of_speech_names);
        }
        if !strip.is_empty() {
            definition.definition_tags.retain(|tag| !strip.contains(&tag.category.as_str()));
        }
    }
}
