pub mod errors;
pub mod models;
pub mod utils;

pub use errors::JibikiError;
pub use models::{KanjiEntry, Tag, TermEntry};
