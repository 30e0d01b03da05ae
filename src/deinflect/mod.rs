use std::collections::{HashMap, HashSet};

use serde::Deserialize;

use crate::core::JibikiError;

#[cfg(test)]
mod deinflector_tests;

/// Chains are data-driven, so a malformed table could grow candidates without
/// ever revisiting a state. Real rule chains stay well under this.
const MAX_CHAIN_LENGTH: usize = 12;

const MAX_RULE_CLASSES: usize = 32;

/// Set of deinflection rule classes ("v1", "v5", "adj-i", ...) encoded as a
/// bitmask over the classes named by the loaded rule table. The empty set
/// means "unconstrained": the candidate is an original form and any entry
/// may match it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct RuleSet(u32);

impl RuleSet {
    pub const EMPTY: RuleSet = RuleSet(0);

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub fn intersects(self, other: RuleSet) -> bool {
        self.0 & other.0 != 0
    }
}

#[derive(Deserialize, Debug)]
struct JsonRule {
    #[serde(rename = "suffixIn")]
    suffix_in: String,
    #[serde(rename = "suffixOut")]
    suffix_out: String,
    #[serde(rename = "rulesIn")]
    rules_in: Vec<String>,
    #[serde(rename = "rulesOut")]
    rules_out: Vec<String>,
}

/// One suffix transformation, flattened from the rule table: replacing
/// `suffix_in` with `suffix_out` undoes the inflection named by `reason`.
/// `rules_in` gates which candidates the rule applies to, `rules_out` is the
/// class set of the produced form.
#[derive(Debug)]
struct DeinflectionRule {
    reason: String,
    suffix_in: String,
    suffix_out: String,
    rules_in: RuleSet,
    rules_out: RuleSet,
}

/// A possible dictionary form recovered from a surface form. Candidates are
/// hypotheses only; the caller decides which are real words by looking
/// `term` up in the store and checking `rules` against the entry.
#[derive(Debug, Clone, PartialEq)]
pub struct Deinflection {
    pub term: String,
    pub reasons: Vec<String>,
    pub rules: RuleSet,
}

pub struct Deinflector {
    rules: Vec<DeinflectionRule>,
    class_bits: HashMap<String, u32>,
}

impl Deinflector {
    /// Parse a rule table. The table is a JSON object mapping a reason name
    /// to its suffix variants; reasons surface verbatim in lookup results.
    pub fn new(table_json: &str) -> Result<Self, JibikiError> {
        let table: HashMap<String, Vec<JsonRule>> = serde_json::from_str(table_json)?;
        if table.values().all(|variants| variants.is_empty()) {
            return Err(JibikiError::EmptyRuleTable);
        }

        fn assign(names: &[String], bits: &mut HashMap<String, u32>) -> Result<(), JibikiError> {
            for name in names {
                if !bits.contains_key(name) {
                    let bit = bits.len();
                    if bit >= MAX_RULE_CLASSES {
                        return Err(JibikiError::RuleClassOverflow(MAX_RULE_CLASSES));
                    }
                    bits.insert(name.clone(), 1u32 << bit);
                }
            }
            Ok(())
        }

        let mut class_bits: HashMap<String, u32> = HashMap::new();

        // Deterministic rule order regardless of JSON object ordering
        let mut reasons: Vec<&String> = table.keys().collect();
        reasons.sort();

        let mut rules = Vec::new();
        for reason in reasons {
            for variant in &table[reason] {
                if variant.suffix_in.is_empty() {
                    return Err(JibikiError::InvalidRule(reason.clone()));
                }
                assign(&variant.rules_in, &mut class_bits)?;
                assign(&variant.rules_out, &mut class_bits)?;
                rules.push(DeinflectionRule {
                    reason: reason.clone(),
                    suffix_in: variant.suffix_in.clone(),
                    suffix_out: variant.suffix_out.clone(),
                    rules_in: Self::mask(&class_bits, &variant.rules_in),
                    rules_out: Self::mask(&class_bits, &variant.rules_out),
                });
            }
        }

        tracing::debug!("Loaded deinflection table: {} rules, {} classes", rules.len(), class_bits.len());
        Ok(Deinflector { rules, class_bits })
    }

    /// Load the rule table bundled with the crate.
    pub fn with_default_rules() -> Result<Self, JibikiError> {
        Self::new(include_str!("../../data/deinflect.json"))
    }

    /// Map an entry's rule class identifiers to a set. Classes the table never
    /// mentions cannot validate any candidate and are dropped.
    pub fn rule_set(&self, names: &[String]) -> RuleSet {
        Self::mask(&self.class_bits, names)
    }

    fn mask(bits: &HashMap<String, u32>, names: &[String]) -> RuleSet {
        let mut set = RuleSet::EMPTY;
        for name in names {
            if let Some(bit) = bits.get(name) {
                set.0 |= bit;
            }
        }
        set
    }

    /// Produce every plausible dictionary form of `text`, breadth-first. The
    /// first candidate is always `text` itself, unconstrained; every
    /// intermediate state of a rule chain is emitted, not only the leaves.
    /// A word may be fully deinflected after one step or several.
    pub fn deinflect(&self, text: &str) -> Vec<Deinflection> {
        let mut results = vec![Deinflection {
            term: text.to_string(),
            reasons: Vec::new(),
            rules: RuleSet::EMPTY,
        }];

        // Revisiting a (term, rules) state would loop forever on a cyclic
        // table; the chain length cap stops tables that grow without cycling.
        let mut seen: HashSet<(String, RuleSet)> = HashSet::new();
        seen.insert((text.to_string(), RuleSet::EMPTY));

        let mut i = 0;
        while i < results.len() {
            let (term, reasons, rules) = {
                let current = &results[i];
                (current.term.clone(), current.reasons.clone(), current.rules)
            };
            i += 1;

            if reasons.len() >= MAX_CHAIN_LENGTH {
                continue;
            }

            for rule in &self.rules {
                if !rules.is_empty() && !rules.intersects(rule.rules_in) {
                    continue;
                }
                let Some(stem) = term.strip_suffix(rule.suffix_in.as_str()) else {
                    continue;
                };
                let candidate = format!("{}{}", stem, rule.suffix_out);
                if candidate.is_empty() {
                    continue;
                }
                if !seen.insert((candidate.clone(), rule.rules_out)) {
                    continue;
                }

                let mut child_reasons = reasons.clone();
                child_reasons.push(rule.reason.clone());
                results.push(Deinflection {
                    term: candidate,
                    reasons: child_reasons,
                    rules: rule.rules_out,
                });
            }
        }

        results
    }
}
