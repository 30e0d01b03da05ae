#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use crate::core::JibikiError;
    use crate::dictionary::{
        store::{DictionaryStore, MatchType, TermReading},
        DictionaryIndex, FrequencyData, KanjiBankEntryV3, MetaBankEntryV3, MetaMode,
        TagBankEntryV3, TermBankEntryV3,
    };

    fn index(title: &str) -> DictionaryIndex {
        DictionaryIndex {
            title: title.to_string(),
            revision: "1".to_string(),
            format: Some(3),
            version: None,
        }
    }

    fn term_rows(json: &str) -> Vec<TermBankEntryV3> {
        serde_json::from_str(json).expect("term bank rows should parse")
    }

    fn kanji_rows(json: &str) -> Vec<KanjiBankEntryV3> {
        serde_json::from_str(json).expect("kanji bank rows should parse")
    }

    fn tag_rows(json: &str) -> Vec<TagBankEntryV3> {
        serde_json::from_str(json).expect("tag bank rows should parse")
    }

    fn meta_rows(json: &str) -> Vec<MetaBankEntryV3> {
        serde_json::from_str(json).expect("meta bank rows should parse")
    }

    fn titles(names: &[&str]) -> HashSet<String> {
        names.iter().map(|name| name.to_string()).collect()
    }

    fn sample_store() -> DictionaryStore {
        let mut store = DictionaryStore::new();
        store.add_dictionary(index("D1")).unwrap();
        store
            .add_terms(
                "D1",
                term_rows(
                    r#"[
                        ["見る", "みる", "vt", "v1", 10, ["to see"], 1, "P"],
                        ["食べる", "たべる", "vt", "v1", 8, ["to eat"], 2, ""],
                        ["食べ過ぎる", "たべすぎる", null, "v1", 2, ["to overeat"], 3, ""],
                        ["かき", "かき", null, "", 1, ["persimmon"], -1, ""]
                    ]"#,
                ),
            )
            .unwrap();
        store
    }

    #[test]
    fn test_exact_match_through_either_index() {
        let store = sample_store();
        let enabled = titles(&["D1"]);

        let by_expression =
            store.find_terms_bulk(&["見る".to_string()], &enabled, MatchType::Exact);
        assert_eq!(by_expression.len(), 1);
        assert_eq!(by_expression[0].entry.reading, "みる");

        let by_reading = store.find_terms_bulk(&["みる".to_string()], &enabled, MatchType::Exact);
        assert_eq!(by_reading.len(), 1);
        assert_eq!(by_reading[0].entry.expression, "見る");
    }

    #[test]
    fn test_double_index_match_is_reported_once() {
        let store = sample_store();

        // かき is its own reading, so it matches through both indices
        let hits = store.find_terms_bulk(&["かき".to_string()], &titles(&["D1"]), MatchType::Exact);
        assert_eq!(hits.len(), 1);
    }

    #[test]
    fn test_input_index_is_carried_through() {
        let store = sample_store();
        let queries =
            vec!["ない".to_string(), "食べる".to_string(), "見る".to_string()];
        let hits = store.find_terms_bulk(&queries, &titles(&["D1"]), MatchType::Exact);

        let indices: Vec<usize> = hits.iter().map(|hit| hit.input_index).collect();
        assert_eq!(indices, vec![1, 2]);
        assert_eq!(hits[0].entry.expression, "食べる");
        assert_eq!(hits[1].entry.expression, "見る");
    }

    #[test]
    fn test_prefix_match_is_a_range_scan() {
        let store = sample_store();
        let hits =
            store.find_terms_bulk(&["食べ".to_string()], &titles(&["D1"]), MatchType::Prefix);

        let mut expressions: Vec<&str> =
            hits.iter().map(|hit| hit.entry.expression.as_str()).collect();
        expressions.sort();
        assert_eq!(expressions, vec!["食べる", "食べ過ぎる"]);
    }

    #[test]
    fn test_disabled_dictionaries_are_invisible() {
        let store = sample_store();
        let hits = store.find_terms_bulk(&["見る".to_string()], &titles(&["D2"]), MatchType::Exact);
        assert!(hits.is_empty());
    }

    #[test]
    fn test_exact_pair_lookup() {
        let store = sample_store();
        let enabled = titles(&["D1"]);

        let pair =
            TermReading { expression: "見る".to_string(), reading: "みる".to_string() };
        assert_eq!(store.find_terms_exact_bulk(&[pair], &enabled).len(), 1);

        let wrong_reading =
            TermReading { expression: "見る".to_string(), reading: "けん".to_string() };
        assert!(store.find_terms_exact_bulk(&[wrong_reading], &enabled).is_empty());
    }

    #[test]
    fn test_sequence_lookup_is_scoped_to_one_dictionary() {
        let store = sample_store();

        let hits = store.find_terms_by_sequence_bulk(&[1, 2], "D1");
        let expressions: Vec<&str> =
            hits.iter().map(|hit| hit.entry.expression.as_str()).collect();
        assert_eq!(expressions, vec!["見る", "食べる"]);
        assert_eq!(hits[0].input_index, 0);
        assert_eq!(hits[1].input_index, 1);

        assert!(store.find_terms_by_sequence_bulk(&[1], "D2").is_empty());
    }

    #[test]
    fn test_dictionary_registration_rules() {
        let mut store = sample_store();

        assert!(matches!(
            store.add_dictionary(index("D1")),
            Err(JibikiError::DuplicateDictionary(_))
        ));

        let unversioned = DictionaryIndex {
            title: "bad".to_string(),
            revision: "1".to_string(),
            format: None,
            version: None,
        };
        assert!(matches!(store.add_dictionary(unversioned), Err(JibikiError::MissingVersion)));

        assert!(matches!(
            store.add_terms("missing", Vec::new()),
            Err(JibikiError::UnknownDictionary(_))
        ));
    }

    #[test]
    fn test_tag_lookup() {
        let mut store = sample_store();
        store
            .add_tags(
                "D1",
                tag_rows(r#"[["P", "popular", -10, "popular term", 10]]"#),
            )
            .unwrap();

        let tag = store.find_tag_for_title("P", "D1").expect("tag should resolve");
        assert_eq!(tag.category, "popular");
        assert_eq!(tag.order, -10);
        assert_eq!(tag.score, 10);
        assert!(store.find_tag_for_title("P", "D2").is_none());
        assert!(store.find_tag_for_title("X", "D1").is_none());
    }

    #[test]
    fn test_term_meta_payload_shapes() {
        let mut store = sample_store();
        let added = store
            .add_term_meta(
                "D1",
                meta_rows(
                    r#"[
                        ["見る", "freq", 1024],
                        ["見る", "freq", {"value": "500", "displayValue": "top500"}],
                        ["見る", "freq", {"reading": "みる", "frequency": 42}],
                        ["見る", "pitch", {"position": 1}]
                    ]"#,
                ),
            )
            .unwrap();
        assert_eq!(added, 4);

        let hits = store.find_term_meta_bulk(&["見る".to_string()], &titles(&["D1"]));
        assert_eq!(hits.len(), 4);

        let frequencies: Vec<&FrequencyData> = hits
            .iter()
            .filter(|hit| hit.record.mode == MetaMode::Frequency)
            .filter_map(|hit| hit.record.data.as_ref())
            .collect();
        assert_eq!(frequencies.len(), 3);
        assert_eq!(frequencies[0].value(), 1024);
        assert_eq!(frequencies[1].value(), 500);
        assert_eq!(frequencies[1].display_value(), Some("top500"));
        assert_eq!(frequencies[2].value(), 42);
        assert_eq!(frequencies[2].reading(), Some("みる"));

        // pitch rows are stored mode-tagged but carry no frequency payload
        let pitch = hits.iter().find(|hit| hit.record.mode == MetaMode::Pitch).unwrap();
        assert!(pitch.record.data.is_none());
    }

    #[test]
    fn test_kanji_and_kanji_meta() {
        let mut store = sample_store();
        store
            .add_kanji(
                "D1",
                kanji_rows(
                    r#"[["見", "ケン", "み.る み.える", "jouyou", ["see", "look"], {"strokes": 7, "grade": "1"}]]"#,
                ),
            )
            .unwrap();
        store.add_kanji_meta("D1", meta_rows(r#"[["見", "freq", 22]]"#)).unwrap();

        let hits = store.find_kanji_bulk(&["見".to_string()], &titles(&["D1"]));
        assert_eq!(hits.len(), 1);
        let entry = &hits[0].entry;
        assert_eq!(entry.onyomi, vec!["ケン"]);
        assert_eq!(entry.kunyomi, vec!["み.る", "み.える"]);
        assert_eq!(entry.stats.get("strokes").map(String::as_str), Some("7"));

        let meta = store.find_kanji_meta_bulk(&["見".to_string()], &titles(&["D1"]));
        assert_eq!(meta.len(), 1);
        assert_eq!(meta[0].record.data.as_ref().map(|d| d.value()), Some(22));
    }

    #[test]
    fn test_delete_dictionary_reports_progress_and_spares_others() {
        let mut store = sample_store();
        store.add_dictionary(index("D2")).unwrap();
        store
            .add_terms(
                "D2",
                term_rows(r#"[["見る", "みる", null, "v1", 3, ["to see (other)"], -1, ""]]"#),
            )
            .unwrap();
        store.add_tags("D1", tag_rows(r#"[["P", "popular", -10, "", 10]]"#)).unwrap();
        store.add_term_meta("D1", meta_rows(r#"[["見る", "freq", 1]]"#)).unwrap();

        let mut snapshots = Vec::new();
        store
            .delete_dictionary("D1", 1, |progress| {
                snapshots.push((progress.processed, progress.stores_processed));
            })
            .unwrap();

        let (processed, stores_processed) = *snapshots.last().unwrap();
        assert_eq!(processed, 6); // 4 terms + 1 tag + 1 term meta
        assert_eq!(stores_processed, 5);
        assert!(snapshots.windows(2).all(|pair| pair[0].0 <= pair[1].0));

        assert!(!store.contains_dictionary("D1"));
        assert!(store
            .find_terms_bulk(&["食べる".to_string()], &titles(&["D1"]), MatchType::Exact)
            .is_empty());
        assert!(store.find_tag_for_title("P", "D1").is_none());

        // the other dictionary is untouched
        let survivors =
            store.find_terms_bulk(&["見る".to_string()], &titles(&["D1", "D2"]), MatchType::Exact);
        assert_eq!(survivors.len(), 1);
        assert_eq!(survivors[0].entry.dictionary, "D2");

        assert!(matches!(
            store.delete_dictionary("D1", 1, |_| {}),
            Err(JibikiError::UnknownDictionary(_))
        ));
    }
}
