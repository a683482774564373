//! Reading fixtures served in place of the live content files
//!
//! A fixture set is the excerpt list of one language. The catalogue holds one
//! set per language and refuses to load unless all sets describe the same
//! excerpts in the same chronological order, so that an `id` means the same
//! passage whatever the language.

use std::collections::{BTreeMap, HashSet};
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{E2eError, E2eResult};
use crate::language::Language;

/// One quoted passage
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Excerpt {
    pub id: String,

    #[serde(alias = "markText")]
    pub quote: String,

    /// Seconds since the epoch; orders the timeline
    #[serde(alias = "createTime")]
    pub timestamp: i64,

    /// Remaining fields (title, author, ...) are served untouched
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// Excerpts of one language, in file order
#[derive(Debug, Clone)]
pub struct FixtureSet {
    pub lang: Language,
    excerpts: Vec<Excerpt>,
    /// Chronological position -> file index
    order: Vec<usize>,
    /// Document as read, so the mock serves exactly the fixture file
    raw: serde_json::Value,
}

impl FixtureSet {
    pub fn from_json(lang: Language, json: &str) -> E2eResult<Self> {
        let raw: serde_json::Value = serde_json::from_str(json)?;
        let excerpts: Vec<Excerpt> = serde_json::from_value(raw.clone())?;
        Self::new(lang, excerpts, raw)
    }

    pub fn from_excerpts(lang: Language, excerpts: Vec<Excerpt>) -> E2eResult<Self> {
        let raw = serde_json::to_value(&excerpts)?;
        Self::new(lang, excerpts, raw)
    }

    fn new(lang: Language, excerpts: Vec<Excerpt>, raw: serde_json::Value) -> E2eResult<Self> {
        if excerpts.is_empty() {
            return Err(E2eError::Fixture(format!("{} fixture set is empty", lang)));
        }

        let mut seen = HashSet::new();
        for excerpt in &excerpts {
            if !seen.insert(excerpt.id.as_str()) {
                return Err(E2eError::Fixture(format!(
                    "{} fixture set repeats id {}",
                    lang, excerpt.id
                )));
            }
        }

        // Stable sort: equal timestamps keep file order
        let mut order: Vec<usize> = (0..excerpts.len()).collect();
        order.sort_by_key(|&i| excerpts[i].timestamp);

        Ok(Self {
            lang,
            excerpts,
            order,
            raw,
        })
    }

    pub fn len(&self) -> usize {
        self.excerpts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.excerpts.is_empty()
    }

    pub fn raw(&self) -> &serde_json::Value {
        &self.raw
    }

    pub fn get(&self, id: &str) -> Option<&Excerpt> {
        self.excerpts.iter().find(|e| e.id == id)
    }

    /// Excerpts oldest first
    pub fn chronological(&self) -> impl Iterator<Item = &Excerpt> + '_ {
        self.order.iter().map(move |&i| &self.excerpts[i])
    }

    /// Position of `id` on the timeline
    pub fn index_of(&self, id: &str) -> Option<usize> {
        self.order.iter().position(|&i| self.excerpts[i].id == id)
    }

    /// The excerpt following `id` on the timeline
    pub fn next(&self, id: &str) -> Option<&Excerpt> {
        let pos = self.index_of(id)?;
        self.order.get(pos + 1).map(|&i| &self.excerpts[i])
    }

    /// The excerpt preceding `id` on the timeline
    pub fn previous(&self, id: &str) -> Option<&Excerpt> {
        let pos = self.index_of(id)?;
        pos.checked_sub(1).map(|p| &self.excerpts[self.order[p]])
    }

    fn chronological_ids(&self) -> Vec<&str> {
        self.chronological().map(|e| e.id.as_str()).collect()
    }
}

/// The aligned fixture sets of every language
#[derive(Debug, Clone)]
pub struct Fixtures {
    sets: BTreeMap<Language, FixtureSet>,
}

impl Fixtures {
    /// Build a catalogue from one set per language, checking alignment
    pub fn new(sets: Vec<FixtureSet>) -> E2eResult<Self> {
        let mut map = BTreeMap::new();
        for set in sets {
            let lang = set.lang;
            if map.insert(lang, set).is_some() {
                return Err(E2eError::Fixture(format!("{} fixture set given twice", lang)));
            }
        }

        for lang in Language::ALL {
            if !map.contains_key(&lang) {
                return Err(E2eError::Fixture(format!("missing fixture set for {}", lang)));
            }
        }

        let fixtures = Self { sets: map };
        fixtures.check_alignment()?;
        Ok(fixtures)
    }

    /// Load `reading-<lang>.json` for every language from `dir`
    pub fn load_dir(dir: &Path) -> E2eResult<Self> {
        let mut sets = Vec::with_capacity(Language::ALL.len());
        for lang in Language::ALL {
            let path = dir.join(lang.fixture_file());
            let content = std::fs::read_to_string(&path).map_err(|e| {
                E2eError::Fixture(format!("cannot read {}: {}", path.display(), e))
            })?;
            let set = FixtureSet::from_json(lang, &content)?;
            debug!("Loaded {} excerpts for {} from {}", set.len(), lang, path.display());
            sets.push(set);
        }
        Self::new(sets)
    }

    /// Every language must list the same ids in the same timeline order
    /// as the source language.
    fn check_alignment(&self) -> E2eResult<()> {
        let source = self.set(Language::Zh);
        let source_ids = source.chronological_ids();
        let source_set: HashSet<&str> = source_ids.iter().copied().collect();

        for (lang, set) in &self.sets {
            if *lang == Language::Zh {
                continue;
            }

            let ids = set.chronological_ids();
            if let Some(missing) = source_ids.iter().find(|id| set.get(id).is_none()) {
                return Err(E2eError::FixtureAlignment {
                    lang: lang.to_string(),
                    reason: format!("is missing id {}", missing),
                });
            }
            if let Some(extra) = ids.iter().find(|id| !source_set.contains(*id)) {
                return Err(E2eError::FixtureAlignment {
                    lang: lang.to_string(),
                    reason: format!("has unknown id {}", extra),
                });
            }
            if let Some((pos, id)) = ids
                .iter()
                .zip(&source_ids)
                .enumerate()
                .find(|(_, (a, b))| a != b)
                .map(|(pos, (a, _))| (pos, *a))
            {
                return Err(E2eError::FixtureAlignment {
                    lang: lang.to_string(),
                    reason: format!("orders id {} at timeline position {}", id, pos),
                });
            }
        }

        Ok(())
    }

    pub fn set(&self, lang: Language) -> &FixtureSet {
        // Every language is present once construction succeeded
        &self.sets[&lang]
    }

    pub fn iter(&self) -> impl Iterator<Item = &FixtureSet> {
        self.sets.values()
    }

    /// Resolve a fixture reference: a language code (`zh`) or a file stem
    /// (`reading-zh`).
    pub fn by_name(&self, name: &str) -> E2eResult<&FixtureSet> {
        let code = name.strip_prefix("reading-").unwrap_or(name);
        let code = code.strip_suffix(".json").unwrap_or(code);
        let lang: Language = code
            .parse()
            .map_err(|_| E2eError::Fixture(format!("unknown fixture: {}", name)))?;
        Ok(self.set(lang))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn excerpt(id: &str, quote: &str, timestamp: i64) -> Excerpt {
        Excerpt {
            id: id.to_string(),
            quote: quote.to_string(),
            timestamp,
            extra: serde_json::Map::new(),
        }
    }

    #[test]
    fn test_timeline_follows_timestamps_not_file_order() {
        let set = FixtureSet::from_excerpts(
            Language::En,
            vec![excerpt("b", "second", 20), excerpt("a", "first", 10), excerpt("c", "third", 30)],
        )
        .unwrap();

        let ids: Vec<&str> = set.chronological().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, ["a", "b", "c"]);
        assert_eq!(set.next("a").unwrap().id, "b");
        assert_eq!(set.previous("b").unwrap().id, "a");
        assert!(set.previous("a").is_none());
        assert!(set.next("c").is_none());
        assert!(set.next("missing").is_none());
    }

    #[test]
    fn test_equal_timestamps_keep_file_order() {
        let set = FixtureSet::from_excerpts(
            Language::Zh,
            vec![excerpt("x", "1", 5), excerpt("y", "2", 5)],
        )
        .unwrap();
        assert_eq!(set.index_of("x"), Some(0));
        assert_eq!(set.index_of("y"), Some(1));
    }

    #[test]
    fn test_empty_and_duplicate_sets_rejected() {
        assert!(FixtureSet::from_excerpts(Language::Zh, vec![]).is_err());
        let dup = vec![excerpt("r1", "a", 1), excerpt("r1", "b", 2)];
        assert!(FixtureSet::from_excerpts(Language::Zh, dup).is_err());
    }

    #[test]
    fn test_live_field_names_accepted() {
        let json = r#"[{"id": "r1", "markText": "摘录", "createTime": 1700000000, "title": "书"}]"#;
        let set = FixtureSet::from_json(Language::Zh, json).unwrap();
        let e = set.get("r1").unwrap();
        assert_eq!(e.quote, "摘录");
        assert_eq!(e.timestamp, 1_700_000_000);
        assert_eq!(e.extra["title"], "书");
        assert_eq!(set.raw()[0]["markText"], "摘录");
    }
}
