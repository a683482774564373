//! Reading model properties over the shipped fixtures

use std::path::Path;

use test_case::test_case;

use homepage_e2e::playwright::{compile, ScriptContext};
use homepage_e2e::scenario::{self, walk};
use homepage_e2e::{
    Direction, E2eError, Excerpt, FixtureSet, Fixtures, Language, ReadingState, RunnerConfig,
};

fn fixtures() -> Fixtures {
    Fixtures::load_dir(&Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures")).unwrap()
}

#[test_case(Language::Zh, "r1", "摘录 zh 1")]
#[test_case(Language::En, "r1", "quote en 1")]
#[test_case(Language::Es, "r2", "cita es 2")]
#[test_case(Language::Fr, "r3", "citation fr 3")]
fn initial_state_shows_matching_excerpt(lang: Language, id: &str, quote: &str) {
    let state = ReadingState::new(id, lang);
    assert_eq!(state.expected_quote(&fixtures()).unwrap(), quote);
}

#[test]
fn arrow_walk_matches_concrete_scenario() {
    let f = fixtures();
    let start = ReadingState::new("r1", Language::Zh);
    let quotes: Vec<String> = walk(&start, &["ArrowDown", "ArrowDown", "ArrowUp"], &f)
        .iter()
        .map(|s| s.expected_quote(&f).unwrap().to_string())
        .collect();
    assert_eq!(quotes, ["摘录 zh 2", "摘录 zh 3", "摘录 zh 2"]);
}

#[test]
fn repeated_presses_move_monotonically() {
    let f = fixtures();
    for lang in Language::ALL {
        let set = f.set(lang);
        let first = set.chronological().next().unwrap();
        let start = ReadingState::new(first.id.clone(), lang);
        let downs = vec!["ArrowDown"; set.len() + 2];
        let positions: Vec<usize> = walk(&start, &downs, &f)
            .iter()
            .map(|s| set.index_of(&s.id).unwrap())
            .collect();
        assert!(positions.windows(2).all(|w| w[0] <= w[1]), "{:?}", positions);
        assert_eq!(*positions.last().unwrap(), set.len() - 1);
    }
}

#[test_case(&[Direction::Down]; "one down")]
#[test_case(&[Direction::Down, Direction::Down]; "two down")]
#[test_case(&[Direction::Down, Direction::Up, Direction::Down]; "zigzag")]
fn inverse_sequence_returns_to_start(directions: &[Direction]) {
    let f = fixtures();
    let start = ReadingState::new("r1", Language::Zh);
    let keys: Vec<&str> = directions
        .iter()
        .map(Direction::key)
        .chain(directions.iter().rev().map(|d| d.inverse().key()))
        .collect();
    let end = walk(&start, &keys, &f).pop().unwrap();
    assert_eq!(end, start);
}

#[test]
fn language_switches_preserve_id_and_share_link() {
    let f = fixtures();
    let start = ReadingState::new("r2", Language::Zh);
    for state in walk(&start, &["f", "s", "z", "e"], &f) {
        assert_eq!(state.id, "r2");
        let share = state.share_url("http://localhost:4000").unwrap();
        assert_eq!(ReadingState::from_url(&share).unwrap(), state);
    }
    // Only French and Spanish have shortcuts
    let last = walk(&start, &["f", "s", "z", "e"], &f).pop().unwrap();
    assert_eq!(last.lang, Language::Es);
    assert_eq!(last.expected_quote(&f).unwrap(), "cita es 2");
}

#[test]
fn model_suite_compiles_for_every_excerpt() {
    let f = fixtures();
    let suite = scenario::model_suite(&f);
    // 3 excerpts x 4 languages, one roundtrip, one language tour
    assert_eq!(suite.tests.len(), 14);

    let config = RunnerConfig::default();
    let ctx = ScriptContext {
        base_url: &config.base_url,
        viewport: config.viewport,
        browser: config.browser,
        headless: true,
        fixtures: Some(&f),
    };

    let roundtrip = suite
        .tests
        .iter()
        .find(|t| t.name.starts_with("timeline roundtrip"))
        .unwrap();
    let script = compile(&ctx, &suite, roundtrip).unwrap().script;
    let order: Vec<usize> = ["摘录 zh 1", "摘录 zh 2", "摘录 zh 3"]
        .iter()
        .map(|q| script.find(&format!("new RegExp(\"{}\")", q)).unwrap())
        .collect();
    assert!(order.windows(2).all(|w| w[0] < w[1]));
    // Walk ends on the excerpt it started from
    assert!(script.rfind("new RegExp(\"摘录 zh 1\")").unwrap() > order[2]);

    let tour = suite
        .tests
        .iter()
        .find(|t| t.name.starts_with("language tour"))
        .unwrap();
    let script = compile(&ctx, &suite, tour).unwrap().script;
    assert!(script.contains(r#"page.keyboard.press("f")"#));
    assert!(script.contains(r#"page.keyboard.press("s")"#));
    assert!(!script.contains(r#"page.keyboard.press("z")"#));
    assert!(!script.contains(r#"page.keyboard.press("e")"#));
    assert!(script.contains(r#"page.click(".lang-menu-item[data-lang=\"zh\"]")"#));

    for case in &suite.tests {
        compile(&ctx, &suite, case).unwrap();
    }
}

fn excerpt(id: &str, timestamp: i64) -> Excerpt {
    Excerpt {
        id: id.to_string(),
        quote: format!("quote {}", id),
        timestamp,
        extra: Default::default(),
    }
}

fn sets_with(fr: Vec<Excerpt>) -> Vec<FixtureSet> {
    let aligned = || vec![excerpt("r1", 1), excerpt("r2", 2)];
    vec![
        FixtureSet::from_excerpts(Language::Zh, aligned()).unwrap(),
        FixtureSet::from_excerpts(Language::En, aligned()).unwrap(),
        FixtureSet::from_excerpts(Language::Es, aligned()).unwrap(),
        FixtureSet::from_excerpts(Language::Fr, fr).unwrap(),
    ]
}

#[test]
fn catalogue_rejects_missing_id() {
    let err = Fixtures::new(sets_with(vec![excerpt("r1", 1)])).unwrap_err();
    match err {
        E2eError::FixtureAlignment { lang, reason } => {
            assert_eq!(lang, "fr");
            assert!(reason.contains("r2"));
        }
        other => panic!("unexpected {:?}", other),
    }
}

#[test]
fn catalogue_rejects_unknown_id() {
    let fr = vec![excerpt("r1", 1), excerpt("r2", 2), excerpt("r9", 3)];
    assert!(matches!(
        Fixtures::new(sets_with(fr)),
        Err(E2eError::FixtureAlignment { .. })
    ));
}

#[test]
fn catalogue_rejects_reordered_timeline() {
    let fr = vec![excerpt("r1", 5), excerpt("r2", 2)];
    let err = Fixtures::new(sets_with(fr)).unwrap_err();
    assert!(err.to_string().contains("timeline position"));
}

#[test]
fn catalogue_requires_every_language() {
    let mut sets = sets_with(vec![excerpt("r1", 1), excerpt("r2", 2)]);
    sets.pop();
    assert!(Fixtures::new(sets).is_err());
}

#[test]
fn catalogue_loads_from_directory() {
    let dir = tempfile::tempdir().unwrap();
    for lang in Language::ALL {
        let body = serde_json::json!([
            {"id": "a", "markText": format!("{} a", lang), "createTime": 10},
            {"id": "b", "markText": format!("{} b", lang), "createTime": 20},
        ]);
        std::fs::write(dir.path().join(lang.fixture_file()), body.to_string()).unwrap();
    }
    let f = Fixtures::load_dir(dir.path()).unwrap();
    assert_eq!(f.by_name("reading-fr").unwrap().get("b").unwrap().quote, "fr b");
    assert_eq!(f.by_name("es").unwrap().len(), 2);
    assert!(f.by_name("reading-de").is_err());

    std::fs::remove_file(dir.path().join("reading-es.json")).unwrap();
    assert!(Fixtures::load_dir(dir.path()).is_err());
}
