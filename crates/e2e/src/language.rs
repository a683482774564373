//! Languages served by the reading page

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::E2eError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    Zh,
    En,
    Es,
    Fr,
}

impl Language {
    pub const ALL: [Language; 4] = [Language::Zh, Language::En, Language::Es, Language::Fr];

    pub fn code(&self) -> &'static str {
        match self {
            Language::Zh => "zh",
            Language::En => "en",
            Language::Es => "es",
            Language::Fr => "fr",
        }
    }

    /// Site-relative path of the content file for this language.
    ///
    /// Chinese is the source language and keeps the unsuffixed name.
    pub fn content_path(&self) -> String {
        match self {
            Language::Zh => "assets/json/reading.json".to_string(),
            other => format!("assets/json/reading-{}.json", other.code()),
        }
    }

    /// Playwright route glob matching the content file on any origin.
    pub fn route_glob(&self) -> String {
        format!("**/{}", self.content_path())
    }

    pub fn fixture_file(&self) -> String {
        format!("reading-{}.json", self.code())
    }

    /// Key that switches the reading page to this language. Only French
    /// and Spanish have one; Chinese and English are reached via the menu.
    pub fn shortcut(&self) -> Option<char> {
        match self {
            Language::Es => Some('s'),
            Language::Fr => Some('f'),
            Language::Zh | Language::En => None,
        }
    }

    pub fn from_shortcut(key: &str) -> Option<Self> {
        let mut chars = key.chars();
        let (Some(c), None) = (chars.next(), chars.next()) else {
            return None;
        };
        Self::ALL.into_iter().find(|lang| lang.shortcut() == Some(c))
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Language {
    type Err = E2eError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|lang| lang.code() == s)
            .ok_or_else(|| E2eError::UnknownLanguage(s.to_string()))
    }
}
