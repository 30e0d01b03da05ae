#[cfg(test)]
mod tests {
    use crate::core::JibikiError;
    use crate::deinflect::Deinflector;

    fn simple_table() -> Deinflector {
        let table = r#"{
            "past": [
                {"suffixIn": "た", "suffixOut": "る", "rulesIn": [], "rulesOut": ["v1"]}
            ],
            "negative": [
                {"suffixIn": "ない", "suffixOut": "る", "rulesIn": ["adj-i"], "rulesOut": ["v1"]}
            ]
        }"#;
        Deinflector::new(table).expect("table should parse")
    }

    #[test]
    fn test_identity_candidate_comes_first() {
        let deinflector = simple_table();
        let results = deinflector.deinflect("見る");

        let first = &results[0];
        assert_eq!(first.term, "見る");
        assert!(first.reasons.is_empty());
        assert!(first.rules.is_empty());
    }

    #[test]
    fn test_single_step() {
        let deinflector = simple_table();
        let results = deinflector.deinflect("見た");

        let candidate = results
            .iter()
            .find(|c| c.term == "見る")
            .expect("見た should deinflect to 見る");
        assert_eq!(candidate.reasons, vec!["past".to_string()]);
        assert_eq!(candidate.rules, deinflector.rule_set(&["v1".to_string()]));
    }

    #[test]
    fn test_rules_gate_chained_application() {
        let table = r#"{
            "step1": [
                {"suffixIn": "た", "suffixOut": "る", "rulesIn": [], "rulesOut": ["v1"]}
            ],
            "step2": [
                {"suffixIn": "る", "suffixOut": "い", "rulesIn": ["adj-i"], "rulesOut": []}
            ]
        }"#;
        let deinflector = Deinflector::new(table).expect("table should parse");

        // step2 wants an adj-i candidate; the v1-marked intermediate from
        // step1 must not feed it
        let results = deinflector.deinflect("見た");
        assert!(results.iter().any(|c| c.term == "見る"));
        assert!(!results.iter().any(|c| c.term == "見い"));

        // but an unconstrained original passes any rules_in gate
        let results = deinflector.deinflect("見る");
        assert!(results.iter().any(|c| c.term == "見い"));
    }

    #[test]
    fn test_default_rules_past() {
        let deinflector = Deinflector::with_default_rules().expect("bundled table should load");
        let results = deinflector.deinflect("見た");

        let candidate = results.iter().find(|c| c.term == "見る").expect("missing 見る");
        assert_eq!(candidate.reasons, vec!["past".to_string()]);
    }

    #[test]
    fn test_default_rules_chain() {
        let deinflector = Deinflector::with_default_rules().expect("bundled table should load");

        // 食べなかった -> 食べない -> 食べる
        let results = deinflector.deinflect("食べなかった");
        let candidate =
            results.iter().find(|c| c.term == "食べる").expect("missing 食べる");
        assert_eq!(candidate.reasons, vec!["past".to_string(), "negative".to_string()]);

        // 食べている -> 食べて -> 食べる
        let results = deinflector.deinflect("食べている");
        let candidate =
            results.iter().find(|c| c.term == "食べる").expect("missing 食べる");
        assert_eq!(candidate.reasons, vec!["progressive".to_string(), "te-form".to_string()]);
    }

    #[test]
    fn test_default_rules_godan_variants() {
        let deinflector = Deinflector::with_default_rules().expect("bundled table should load");
        let results = deinflector.deinflect("読んだ");

        // んだ fans out to all three godan rows
        for expected in ["読ぬ", "読ぶ", "読む"] {
            assert!(
                results.iter().any(|c| c.term == expected),
                "expected candidate {} in {:?}",
                expected,
                results.iter().map(|c| c.term.as_str()).collect::<Vec<_>>()
            );
        }
    }

    #[test]
    fn test_cyclic_table_terminates() {
        let table = r#"{
            "loop": [
                {"suffixIn": "る", "suffixOut": "る", "rulesIn": ["v1"], "rulesOut": ["v1"]}
            ]
        }"#;
        let deinflector = Deinflector::new(table).expect("table should parse");

        // る -> る forever without the visited set
        let results = deinflector.deinflect("見る");
        assert_eq!(results.len(), 2);
    }

    #[test]
    fn test_growing_table_is_depth_capped() {
        let table = r#"{
            "grow": [
                {"suffixIn": "た", "suffixOut": "たた", "rulesIn": [], "rulesOut": []}
            ]
        }"#;
        let deinflector = Deinflector::new(table).expect("table should parse");

        let results = deinflector.deinflect("た");
        assert!(results.iter().all(|c| c.reasons.len() <= 12));
        assert!(results.len() <= 13);
    }

    #[test]
    fn test_empty_table_is_rejected() {
        assert!(matches!(Deinflector::new("{}"), Err(JibikiError::EmptyRuleTable)));
        assert!(matches!(
            Deinflector::new(r#"{"past": []}"#),
            Err(JibikiError::EmptyRuleTable)
        ));
    }

    #[test]
    fn test_empty_suffix_is_rejected() {
        let table = r#"{
            "bad": [
                {"suffixIn": "", "suffixOut": "る", "rulesIn": [], "rulesOut": []}
            ]
        }"#;
        assert!(matches!(Deinflector::new(table), Err(JibikiError::InvalidRule(_))));
    }

    #[test]
    fn test_unknown_entry_rules_map_to_empty_set() {
        let deinflector = simple_table();
        let set = deinflector.rule_set(&["v5".to_string(), "garbage".to_string()]);
        assert!(set.is_empty());
    }
}
