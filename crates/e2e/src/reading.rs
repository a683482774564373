//! Model of the reading page state
//!
//! The page is observed only through the DOM and its URL. This model computes
//! what the page should show after a sequence of interactions so that
//! expectations can be derived from fixtures instead of being spelled out.

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{E2eError, E2eResult};
use crate::fixture::Fixtures;
use crate::language::Language;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    /// Later on the timeline (`ArrowDown`)
    Down,
    /// Earlier on the timeline (`ArrowUp`)
    Up,
}

impl Direction {
    pub fn key(&self) -> &'static str {
        match self {
            Direction::Down => "ArrowDown",
            Direction::Up => "ArrowUp",
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        match key {
            "ArrowDown" => Some(Direction::Down),
            "ArrowUp" => Some(Direction::Up),
            _ => None,
        }
    }

    pub fn inverse(&self) -> Self {
        match self {
            Direction::Down => Direction::Up,
            Direction::Up => Direction::Down,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReadingState {
    pub id: String,
    pub lang: Language,
}

impl ReadingState {
    pub fn new(id: impl Into<String>, lang: Language) -> Self {
        Self { id: id.into(), lang }
    }

    /// Parse the state from a reading page URL's query
    pub fn from_url(url: &str) -> E2eResult<Self> {
        let url = Url::parse(url)?;
        let mut id = None;
        let mut lang = None;
        for (key, value) in url.query_pairs() {
            match key.as_ref() {
                "id" => id = Some(value.into_owned()),
                "lang" => lang = Some(value.parse::<Language>()?),
                _ => {}
            }
        }
        match (id, lang) {
            (Some(id), Some(lang)) => Ok(Self { id, lang }),
            _ => Err(E2eError::SpecParse(format!("{} lacks id or lang", url))),
        }
    }

    /// Switch language; the excerpt id is kept
    pub fn switch_language(&mut self, lang: Language) {
        self.lang = lang;
    }

    /// Move along the timeline, staying put at either end
    pub fn step(&mut self, direction: Direction, fixtures: &Fixtures) {
        let set = fixtures.set(self.lang);
        let target = match direction {
            Direction::Down => set.next(&self.id),
            Direction::Up => set.previous(&self.id),
        };
        if let Some(excerpt) = target {
            self.id = excerpt.id.clone();
        }
    }

    /// Apply a key press the way the page does. Returns false for keys the
    /// page ignores.
    pub fn press(&mut self, key: &str, fixtures: &Fixtures) -> bool {
        if let Some(direction) = Direction::from_key(key) {
            self.step(direction, fixtures);
            true
        } else if let Some(lang) = Language::from_shortcut(key) {
            self.switch_language(lang);
            true
        } else {
            false
        }
    }

    pub fn query(&self) -> [(&'static str, String); 2] {
        [("id", self.id.clone()), ("lang", self.lang.code().to_string())]
    }

    /// Path and query of the page showing this state
    pub fn path(&self) -> String {
        let query = url::form_urlencoded::Serializer::new(String::new())
            .extend_pairs(self.query())
            .finish();
        format!("/reading/?{}", query)
    }

    /// Link that reopens the page on this state
    pub fn share_url(&self, base_url: &str) -> E2eResult<String> {
        let mut url = Url::parse(&format!("{}/reading/", base_url.trim_end_matches('/')))?;
        url.query_pairs_mut().extend_pairs(self.query());
        Ok(url.to_string())
    }

    /// Quote the page displays for this state
    pub fn expected_quote<'a>(&self, fixtures: &'a Fixtures) -> E2eResult<&'a str> {
        fixtures
            .set(self.lang)
            .get(&self.id)
            .map(|e| e.quote.as_str())
            .ok_or_else(|| {
                E2eError::Fixture(format!("no excerpt {} in {} fixtures", self.id, self.lang))
            })
    }
}
