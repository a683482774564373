//! Reading-page tests generated from fixtures and the reading model
//!
//! The YAML suites pin a handful of concrete interactions. The tests built
//! here sweep the catalogue instead: every excerpt in every language, the
//! whole timeline down and back up, and every language switch.

use crate::fixture::Fixtures;
use crate::language::Language;
use crate::reading::{Direction, ReadingState};
use crate::route::RouteMock;
use crate::spec::{TestCase, TestStep, TestSuite};

pub const MODEL_SUITE: &str = "reading model";
const QUOTE: &str = ".reading-quote";
const SHARE: &str = "#share-reading";

fn goto(state: &ReadingState) -> TestStep {
    TestStep::Goto {
        url: state.path(),
        wait_for: Some(QUOTE.to_string()),
    }
}

fn expect_reading() -> TestStep {
    TestStep::ExpectReading {
        quote_selector: QUOTE.to_string(),
        share_selector: Some(SHARE.to_string()),
        share_attribute: "data-share-url".to_string(),
    }
}

fn press(key: &str) -> TestStep {
    TestStep::Press {
        selector: None,
        key: key.to_string(),
    }
}

/// States the page passes through while `keys` are pressed from `start`
pub fn walk(start: &ReadingState, keys: &[&str], fixtures: &Fixtures) -> Vec<ReadingState> {
    let mut state = start.clone();
    let mut states = Vec::with_capacity(keys.len());
    for key in keys {
        state.press(key, fixtures);
        states.push(state.clone());
    }
    states
}

/// Open the page on `state` and check what it shows
pub fn initial_load(state: &ReadingState) -> TestCase {
    TestCase {
        name: format!("loads {} in {}", state.id, state.lang),
        tags: vec!["model".to_string()],
        steps: vec![goto(state), expect_reading()],
    }
}

/// Press `directions` and then their inverses in reverse order, checking
/// every intermediate state; the walk ends where it started.
pub fn navigation_roundtrip(start: &ReadingState, directions: &[Direction]) -> TestCase {
    let mut steps = vec![goto(start), expect_reading()];
    let back = directions.iter().rev().map(Direction::inverse);
    for direction in directions.iter().copied().chain(back) {
        steps.push(press(direction.key()));
        steps.push(expect_reading());
    }
    TestCase {
        name: format!("timeline roundtrip of {} keys from {}", directions.len(), start.id),
        tags: vec!["model".to_string()],
        steps,
    }
}

/// Visit the languages that have a shortcut key, then every language by menu
pub fn language_tour(start: &ReadingState) -> TestCase {
    let mut steps = vec![goto(start), expect_reading()];
    for key in Language::ALL.into_iter().rev().filter_map(|lang| lang.shortcut()) {
        steps.push(press(&key.to_string()));
        steps.push(expect_reading());
    }
    for lang in Language::ALL {
        steps.push(TestStep::SelectLanguage {
            lang,
            trigger: "#lang-trigger".to_string(),
            item: ".lang-menu-item".to_string(),
        });
        steps.push(expect_reading());
    }
    TestCase {
        name: format!("language tour keeps {}", start.id),
        tags: vec!["model".to_string()],
        steps,
    }
}

/// Suite covering the catalogue with model-derived expectations
pub fn model_suite(fixtures: &Fixtures) -> TestSuite {
    let mut tests = Vec::new();

    for set in fixtures.iter() {
        for excerpt in set.chronological() {
            tests.push(initial_load(&ReadingState::new(excerpt.id.clone(), set.lang)));
        }
    }

    let source = fixtures.set(Language::Zh);
    if let Some(first) = source.chronological().next() {
        let steps = vec![Direction::Down; source.len().saturating_sub(1)];
        tests.push(navigation_roundtrip(
            &ReadingState::new(first.id.clone(), Language::Zh),
            &steps,
        ));
    }
    if let Some(middle) = source.chronological().nth(source.len() / 2) {
        tests.push(language_tour(&ReadingState::new(middle.id.clone(), Language::Zh)));
    }

    TestSuite {
        name: MODEL_SUITE.to_string(),
        description: "Reading page checked against every fixture excerpt".to_string(),
        tags: vec!["reading".to_string()],
        viewport: None,
        routes: RouteMock::reading_routes(),
        before_each: vec![],
        tests,
        source: None,
    }
}
