mod detector;
mod identifier;

pub use detector::LocaleDetector;
pub use identifier::{LanguageIdentifier, WhichLangIdentifier};

use std::fmt;
use std::str::FromStr;

/// A spoken language: lowercase ISO-639 base code plus an optional region,
/// parsed from identifiers like `en`, `en_US` or `en-US`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct Language {
    code: String,
    region: Option<String>,
}

impl Language {
    pub fn new(code: impl Into<String>) -> Self {
        Self {
            code: code.into().to_lowercase(),
            region: None,
        }
    }

    pub fn with_region(code: impl Into<String>, region: impl Into<String>) -> Self {
        Self {
            code: code.into().to_lowercase(),
            region: Some(region.into().to_uppercase()),
        }
    }

    pub fn code(&self) -> &str {
        &self.code
    }

    pub fn region(&self) -> Option<&str> {
        self.region.as_deref()
    }

    /// Region-ignoring key used for arbitration maps and confidence snapshots.
    pub fn key(&self) -> LanguageKey {
        LanguageKey::new(&self.code)
    }

    /// `en_US`-style identifier, also the [`fmt::Display`] form.
    pub fn identifier(&self) -> String {
        match &self.region {
            Some(region) => format!("{}_{}", self.code, region),
            None => self.code.clone(),
        }
    }

    /// English name of the base language, when ISO-639 knows the code.
    pub fn display_name(&self) -> Option<&'static str> {
        isolang::Language::from_639_1(&self.code)
            .or_else(|| isolang::Language::from_639_3(&self.code))
            .map(|lang| lang.to_name())
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.identifier())
    }
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
#[error("invalid language identifier: {0:?}")]
pub struct ParseLanguageError(pub String);

impl FromStr for Language {
    type Err = ParseLanguageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.splitn(2, ['_', '-']);
        let code = parts.next().unwrap_or_default();
        if code.is_empty() || code.len() > 3 || !code.chars().all(|c| c.is_ascii_alphabetic()) {
            return Err(ParseLanguageError(s.to_string()));
        }
        match parts.next() {
            None => Ok(Self::new(code)),
            Some(region) if !region.is_empty() && region.chars().all(|c| c.is_ascii_alphanumeric()) => {
                Ok(Self::with_region(code, region))
            }
            Some(_) => Err(ParseLanguageError(s.to_string())),
        }
    }
}

/// Lowercase base language code (`en`, `ko`, …), ordered and hashable.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize)]
pub struct LanguageKey(String);

impl LanguageKey {
    pub fn new(code: impl Into<String>) -> Self {
        Self(code.into().to_lowercase())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for LanguageKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&Language> for LanguageKey {
    fn from(language: &Language) -> Self {
        language.key()
    }
}
