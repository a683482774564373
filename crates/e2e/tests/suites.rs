//! Shipped suites and fixtures compile into the scripts the browser runs

use std::path::Path;

use homepage_e2e::playwright::{compile, ScriptContext};
use homepage_e2e::runner::TestFilter;
use homepage_e2e::{Fixtures, RunnerConfig, TestRunner, TestSuite};

fn root() -> &'static Path {
    Path::new(env!("CARGO_MANIFEST_DIR"))
}

fn fixtures() -> Fixtures {
    Fixtures::load_dir(&root().join("tests/fixtures")).unwrap()
}

fn suites() -> Vec<TestSuite> {
    TestSuite::load_all(&root().join("tests/specs")).unwrap()
}

fn suite(name: &str) -> TestSuite {
    suites().into_iter().find(|s| s.name == name).unwrap()
}

fn script(suite: &TestSuite, test: &str, fixtures: &Fixtures) -> String {
    let config = RunnerConfig::default();
    let ctx = ScriptContext {
        base_url: &config.base_url,
        viewport: config.viewport,
        browser: config.browser,
        headless: config.headless,
        fixtures: Some(fixtures),
    };
    let case = suite.tests.iter().find(|t| t.name == test).unwrap();
    compile(&ctx, suite, case).unwrap().script
}

#[test]
fn both_suites_load() {
    let names: Vec<String> = suites().into_iter().map(|s| s.name).collect();
    assert_eq!(names, ["home page mobile layout", "reading page"]);
}

#[test]
fn home_suite_runs_at_phone_viewport() {
    let home = suite("home page mobile layout");
    let s = script(
        &home,
        "avatar centered and bio left-aligned; lucky button right aligned",
        &fixtures(),
    );
    assert!(s.contains("viewport: { width: 390, height: 844 }"));
    assert!(s.contains("toBeLessThanOrEqual(8)"));
    assert!(s.contains(r##"page.locator("#bio p").first()"##));
    assert!(s.contains(r#"{"text-align":"left"}"#));
    assert!(s.contains(r#"{"text-align":"right"}"#));
}

#[test]
fn footer_links_compared_with_body() {
    let home = suite("home page mobile layout");
    let s = script(&home, "footer links render as inline text", &fixtures());
    assert!(s.contains(r#""background-color":"rgba(0, 0, 0, 0)""#));
    assert!(s.contains(r#""border-radius":"0px""#));
    assert!(s.contains(r#""border-style":"none""#));
    assert!(s.contains(r#""display":"inline""#));
    assert!(s.contains(r#"page.locator("body").first().evaluate(readStyles, ["font-family","font-size","font-weight"])"#));
    assert!(s.contains("evaluateAll(readAllStyles"));
}

#[test]
fn reading_suite_mocks_every_language() {
    let fixtures = fixtures();
    let reading = suite("reading page");
    let s = script(&reading, "renders initial excerpt and timeline markers", &fixtures);

    for glob in [
        "**/assets/json/reading.json",
        "**/assets/json/reading-en.json",
        "**/assets/json/reading-es.json",
        "**/assets/json/reading-fr.json",
    ] {
        assert!(s.contains(&format!("page.route(\"{}\"", glob)), "missing route {}", glob);
    }
    assert!(s.contains(r#"contentType: "application/json""#));
    assert!(s.contains("cita es 1"));

    // Routes are registered before the page is opened
    let route = s.find("page.route(").unwrap();
    let goto = s.find("page.goto(").unwrap();
    assert!(route < goto);

    assert!(s.contains(r#"await page.goto(baseURL + "/reading/?id=r1&lang=zh");"#));
    assert!(s.contains(r#"await page.waitForSelector(".reading-quote");"#));
    assert!(s.contains(&format!(
        r#"await expect(page.locator(".timeline-mark")).toHaveCount({});"#,
        fixtures.set(homepage_e2e::Language::Zh).len()
    )));
}

#[test]
fn spanish_shortcut_expectations_come_from_the_model() {
    let reading = suite("reading page");
    let s = script(&reading, "keyboard shortcut selects Spanish and preserves id", &fixtures());

    assert!(s.contains(r#"await page.keyboard.press("s");"#));
    assert!(s.contains(r#"const pattern = new RegExp("cita es 1");"#));
    assert!(s.contains(r#"queryParam(page.url(), "id")).toBe("r1")"#));
    assert!(s.contains(r#"queryParam(page.url(), "lang")).toBe("es")"#));
    assert!(s.contains(r##"const share = page.locator("#share-reading");"##));
    assert!(s.contains(r#"queryParam(await share.getAttribute("data-share-url"), "lang")).toBe("es")"#));
}

#[test]
fn share_test_checks_enabled_before_reading_link() {
    let reading = suite("reading page");
    let s = script(&reading, "share link updates when moving chronologically", &fixtures());
    let enabled = s.find(r#"toBeEnabled()"#).unwrap();
    let first_share = s.find("const share =").unwrap();
    assert!(enabled < first_share);
    assert!(s.contains(r#""id")).toBe("r2")"#));
}

#[test]
fn whole_directory_compiles_with_filter() {
    let dir = root();
    let config = RunnerConfig {
        test_dir: dir.join("tests/specs"),
        fixtures_dir: dir.join("tests/fixtures"),
        ..RunnerConfig::default()
    };
    let runner = TestRunner::with_config(config);
    let suites = runner.load_suites().unwrap();
    let fixtures = runner.load_fixtures().unwrap();
    assert!(fixtures.is_some());

    let all = runner
        .compile_all(&suites, fixtures.as_ref(), &TestFilter::default())
        .unwrap();
    assert_eq!(all.iter().map(|s| s.tests.len()).sum::<usize>(), 8);

    let reading_only = TestFilter {
        tag: Some("reading".into()),
        grep: None,
    };
    let some = runner
        .compile_all(&suites, fixtures.as_ref(), &reading_only)
        .unwrap();
    assert_eq!(some.len(), 1);
    assert_eq!(some[0].tests.len(), 6);
}
