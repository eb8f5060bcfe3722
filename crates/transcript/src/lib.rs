mod types;

pub use types::{TranscriptItem, TranslationItem};
