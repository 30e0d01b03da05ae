use thiserror::Error;

#[derive(Error, Debug)]
pub enum JibikiError {
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("index data must have either 'format' or 'version'")]
    MissingVersion,

    #[error("dictionary '{0}' is already installed")]
    DuplicateDictionary(String),

    #[error("no installed dictionary named '{0}'")]
    UnknownDictionary(String),

    #[error("deinflection rule table is empty")]
    EmptyRuleTable,

    #[error("bad deinflection rule in '{0}': suffixIn must not be empty")]
    InvalidRule(String),

    #[error("deinflection rule table defines more than {0} rule classes")]
    RuleClassOverflow(usize),

    #[error("JibikiError: {0}")]
    Custom(String),
}
