//! Display locale and bilingual catalog fields
//!
//! The catalog stores every user-facing string twice (English and Hebrew).
//! Resolution picks one side based on the active display locale.

use serde::{Deserialize, Serialize};

/// Display locale supported by the catalog
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Locale {
    En,
    #[default]
    He,
}

impl Locale {
    /// Map a language tag to a catalog locale.
    ///
    /// Only Hebrew selects the Hebrew columns; every other language
    /// (including regional variants such as `en-US` or unknown tags)
    /// reads the English columns.
    pub fn from_language_tag(tag: &str) -> Self {
        let primary = tag
            .split(['-', '_'])
            .next()
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase();
        match primary.as_str() {
            "he" | "iw" => Locale::He,
            _ => Locale::En,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Locale::En => "en",
            Locale::He => "he",
        }
    }
}

impl std::fmt::Display for Locale {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A value stored once per supported locale
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Localized<T> {
    pub en: T,
    pub he: T,
}

impl<T> Localized<T> {
    pub fn new(en: T, he: T) -> Self {
        Self { en, he }
    }

    /// Borrow the value for `locale`
    pub fn get(&self, locale: Locale) -> &T {
        match locale {
            Locale::En => &self.en,
            Locale::He => &self.he,
        }
    }
}

impl<T: Clone> Localized<T> {
    /// Clone out the value for `locale`
    pub fn pick(&self, locale: Locale) -> T {
        self.get(locale).clone()
    }
}

impl<T> Localized<Option<T>> {
    /// True when at least one locale carries a value
    pub fn any(&self) -> bool {
        self.en.is_some() || self.he.is_some()
    }
}
