pub mod core;
pub mod deinflect;
pub mod dictionary;
pub mod translator;

pub use crate::core::{JibikiError, KanjiEntry, Tag, TermEntry};
pub use crate::deinflect::{Deinflection, Deinflector, RuleSet};
pub use crate::dictionary::store::{DeleteProgress, DictionaryStore, MatchType, TermReading};
pub use crate::dictionary::{DictionaryIndex, FrequencyData, MetaMode};
pub use crate::translator::{
    DictionaryOptions, ExpressionSummary, FindTermsMode, FindTermsOptions, FindTermsResult,
    FrequencyInfo, GroupedDefinition, KanjiDefinition, KanjiStat, TermDefinition,
    TermFrequencyClass, TermResults, Translator,
};
