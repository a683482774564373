//! Playwright browser automation
//!
//! Each test case is compiled into a standalone Node script that owns one
//! browser session: it registers the suite's route mocks, runs the
//! `before_each` steps and then the test's steps with `@playwright/test`'s
//! auto-waiting `expect`, and reports a single JSON line on stdout.

use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use serde::Deserialize;
use tokio::process::Command as TokioCommand;
use tracing::debug;

use crate::config::{Browser, Viewport};
use crate::error::{E2eError, E2eResult};
use crate::fixture::Fixtures;
use crate::language::Language;
use crate::reading::ReadingState;
use crate::spec::{Count, TestCase, TestStep, TestSuite};

/// Quote a string as a JavaScript string literal
pub fn js_str(s: &str) -> String {
    serde_json::Value::String(s.to_string()).to_string()
}

/// Everything a script needs besides the steps
#[derive(Debug, Clone, Copy)]
pub struct ScriptContext<'a> {
    pub base_url: &'a str,
    pub viewport: Viewport,
    pub browser: Browser,
    pub headless: bool,
    pub fixtures: Option<&'a Fixtures>,
}

/// A test case ready to run
#[derive(Debug, Clone)]
pub struct CompiledTest {
    pub suite: String,
    pub name: String,
    pub script: String,
    /// Step labels by script step number, `before_each` first
    pub labels: Vec<String>,
}

impl CompiledTest {
    pub fn title(&self) -> String {
        format!("{} › {}", self.suite, self.name)
    }
}

/// Compile one test of a suite into a script
pub fn compile(ctx: &ScriptContext<'_>, suite: &TestSuite, case: &TestCase) -> E2eResult<CompiledTest> {
    let viewport = suite.viewport.unwrap_or(ctx.viewport);
    let mut builder = ScriptBuilder::new(ctx);

    for route in &suite.routes {
        builder.lines.push(route.to_js(ctx.fixtures)?);
    }
    for step in suite.before_each.iter().chain(&case.steps) {
        builder.push_step(step)?;
    }

    Ok(CompiledTest {
        suite: suite.name.clone(),
        name: case.name.clone(),
        script: builder.finish(viewport),
        labels: builder.labels,
    })
}

struct ScriptBuilder<'a> {
    ctx: &'a ScriptContext<'a>,
    lines: Vec<String>,
    labels: Vec<String>,
    /// Reading page state implied by the steps so far
    reading: Option<ReadingState>,
    /// Label of an interaction since the last `goto` whose effect on the
    /// reading page is unknown
    untracked: Option<String>,
}

impl<'a> ScriptBuilder<'a> {
    fn new(ctx: &'a ScriptContext<'a>) -> Self {
        Self {
            ctx,
            lines: Vec::new(),
            labels: Vec::new(),
            reading: None,
            untracked: None,
        }
    }

    fn push_step(&mut self, step: &TestStep) -> E2eResult<()> {
        let index = self.labels.len();
        let label = step.label();
        self.lines.push(format!(
            "\n    // Step {}: {}\n    step = {}; stepLabel = {};",
            index,
            label,
            index,
            js_str(&label)
        ));
        self.labels.push(label);

        self.track(step);

        if let TestStep::ExpectReading {
            quote_selector,
            share_selector,
            share_attribute,
        } = step
        {
            for expanded in self.expand_reading(quote_selector, share_selector.as_deref(), share_attribute)? {
                let js = self.step_to_js(&expanded)?;
                self.lines.push(js);
            }
        } else {
            let js = self.step_to_js(step)?;
            self.lines.push(js);
        }
        Ok(())
    }

    /// Follow the reading page state through navigation, key presses and
    /// language menu clicks
    fn track(&mut self, step: &TestStep) {
        match step {
            TestStep::Goto { url, .. } => {
                let absolute = format!("{}{}", self.ctx.base_url.trim_end_matches('/'), url);
                self.reading = ReadingState::from_url(&absolute).ok();
                self.untracked = None;
            }
            TestStep::Press { selector: None, key } => {
                let known = match (self.reading.as_mut(), self.ctx.fixtures) {
                    (Some(state), Some(fixtures)) => state.press(key, fixtures),
                    _ => false,
                };
                if !known {
                    self.untracked = Some(step.label());
                }
            }
            TestStep::SelectLanguage { lang, .. } => {
                if let Some(state) = self.reading.as_mut() {
                    state.switch_language(*lang);
                }
            }
            TestStep::Click { selector } => match (menu_language(selector), self.reading.as_mut()) {
                (Some(lang), Some(state)) => state.switch_language(lang),
                _ => self.untracked = Some(step.label()),
            },
            TestStep::Press { selector: Some(_), .. } => self.untracked = Some(step.label()),
            _ => {}
        }
    }

    fn expand_reading(
        &self,
        quote_selector: &str,
        share_selector: Option<&str>,
        share_attribute: &str,
    ) -> E2eResult<Vec<TestStep>> {
        let state = self.reading.as_ref().ok_or_else(|| {
            E2eError::SpecParse("expect_reading needs a preceding goto to a reading page URL".to_string())
        })?;
        if let Some(label) = &self.untracked {
            return Err(E2eError::SpecParse(format!(
                "expect_reading cannot follow {}; its effect on the reading page is unknown",
                label
            )));
        }
        let fixtures = self
            .ctx
            .fixtures
            .ok_or_else(|| E2eError::Fixture("expect_reading needs fixtures".to_string()))?;

        let params: std::collections::BTreeMap<String, String> = state
            .query()
            .into_iter()
            .map(|(k, v)| (k.to_string(), v))
            .collect();

        let mut steps = vec![
            TestStep::ExpectText {
                selector: quote_selector.to_string(),
                pattern: regex::escape(state.expected_quote(fixtures)?),
                flags: None,
            },
            TestStep::ExpectUrlParams {
                params: params.clone(),
            },
        ];
        if let Some(selector) = share_selector {
            steps.push(TestStep::ExpectShareParams {
                selector: selector.to_string(),
                attribute: share_attribute.to_string(),
                params,
                match_page: true,
            });
        }
        Ok(steps)
    }

    fn step_to_js(&self, step: &TestStep) -> E2eResult<String> {
        let js = match step {
            TestStep::Goto { url, wait_for } => {
                let mut js = format!("    await page.goto(baseURL + {});", js_str(url));
                if let Some(selector) = wait_for {
                    js.push_str(&format!("\n    await page.waitForSelector({});", js_str(selector)));
                }
                js
            }
            TestStep::WaitFor { selector, state } => format!(
                "    await page.waitForSelector({}, {{ state: {} }});",
                js_str(selector),
                js_str(state.as_str())
            ),
            TestStep::Click { selector } => format!("    await page.click({});", js_str(selector)),
            TestStep::SelectLanguage { lang, trigger, item } => format!(
                "    await page.click({});\n    await page.click({});",
                js_str(trigger),
                js_str(&language_item(item, *lang))
            ),
            TestStep::Press { selector, key } => match selector {
                Some(sel) => format!("    await page.locator({}).press({});", js_str(sel), js_str(key)),
                None => format!("    await page.keyboard.press({});", js_str(key)),
            },
            TestStep::ExpectVisible { selector } => {
                format!("    await expect(page.locator({})).toBeVisible();", js_str(selector))
            }
            TestStep::ExpectEnabled { selector } => {
                format!("    await expect(page.locator({})).toBeEnabled();", js_str(selector))
            }
            TestStep::ExpectText { selector, pattern, flags } => {
                // Built inside the step so an invalid pattern fails that step
                let regexp = match flags {
                    Some(flags) => format!("new RegExp({}, {})", js_str(pattern), js_str(flags)),
                    None => format!("new RegExp({})", js_str(pattern)),
                };
                format!(
                    "    {{\n      const pattern = {};\n      await expect(page.locator({})).toHaveText(pattern);\n    }}",
                    regexp,
                    js_str(selector)
                )
            }
            TestStep::ExpectCount { selector, count } => {
                let n = match count {
                    Count::Exact(n) => *n,
                    Count::Fixture { fixture } => {
                        let fixtures = self.ctx.fixtures.ok_or_else(|| {
                            E2eError::Fixture(format!("count from fixture {} but none are loaded", fixture))
                        })?;
                        fixtures.by_name(fixture)?.len()
                    }
                };
                format!("    await expect(page.locator({})).toHaveCount({});", js_str(selector), n)
            }
            TestStep::ExpectUrlParams { params } => params
                .iter()
                .map(|(k, v)| {
                    format!(
                        "    await expect.poll(() => queryParam(page.url(), {})).toBe({});",
                        js_str(k),
                        js_str(v)
                    )
                })
                .collect::<Vec<_>>()
                .join("\n"),
            TestStep::ExpectShareParams {
                selector,
                attribute,
                params,
                match_page,
            } => {
                let mut js = vec![
                    "    {".to_string(),
                    format!("      const share = page.locator({});", js_str(selector)),
                    format!("      await expect(share).toHaveAttribute({}, /.+/);", js_str(attribute)),
                ];
                for (k, v) in params {
                    js.push(format!(
                        "      await expect.poll(async () => queryParam(await share.getAttribute({}), {})).toBe({});",
                        js_str(attribute),
                        js_str(k),
                        js_str(v)
                    ));
                    if *match_page {
                        js.push(format!(
                            "      expect(queryParam(await share.getAttribute({attr}), {k})).toBe(queryParam(page.url(), {k}));",
                            attr = js_str(attribute),
                            k = js_str(k)
                        ));
                    }
                }
                js.push("    }".to_string());
                js.join("\n")
            }
            TestStep::ExpectCentered { selector, tolerance_px } => format!(
                r#"    {{
      const target = page.locator({sel});
      await expect(target).toBeVisible();
      const box = await target.boundingBox();
      const viewport = page.viewportSize();
      expect(box).not.toBeNull();
      expect(Math.abs(box.x + box.width / 2 - viewport.width / 2)).toBeLessThanOrEqual({tol});
    }}"#,
                sel = js_str(selector),
                tol = tolerance_px
            ),
            TestStep::ExpectStyle { selector, styles, all } => {
                let props: Vec<&String> = styles.keys().collect();
                let expected = serde_json::to_string(styles)?;
                let props = serde_json::to_string(&props)?;
                styles_js(selector, &props, &expected, *all)
            }
            TestStep::ExpectStyleMatches {
                selector,
                reference,
                properties,
                all,
            } => {
                let props = serde_json::to_string(properties)?;
                let lookup = format!(
                    "await page.locator({}).first().evaluate(readStyles, {})",
                    js_str(reference),
                    props
                );
                styles_js(selector, &props, &lookup, *all)
            }
            TestStep::ExpectReading { .. } => {
                return Err(E2eError::SpecParse("expect_reading must be expanded first".to_string()))
            }
            TestStep::Log { message } => {
                format!("    console.error({});", js_str(&format!("[test] {}", message)))
            }
        };
        Ok(js)
    }

    fn finish(&self, viewport: Viewport) -> String {
        let mut script = format!(
            r#"const {{ {browser}, expect }} = require('@playwright/test');

const readStyles = (el, props) =>
  Object.fromEntries(props.map((p) => [p, getComputedStyle(el).getPropertyValue(p)]));
const readAllStyles = (els, props) =>
  els.map((el) => Object.fromEntries(props.map((p) => [p, getComputedStyle(el).getPropertyValue(p)])));

(async () => {{
  const browser = await {browser}.launch({{ headless: {headless} }});
  const context = await browser.newContext({{
    viewport: {{ width: {width}, height: {height} }}
  }});
  const page = await context.newPage();
  const baseURL = {base_url};
  const queryParam = (href, key) => (href ? new URL(href, page.url()).searchParams.get(key) : null);
  let step = -1;
  let stepLabel = 'routes';

  try {{
"#,
            browser = self.ctx.browser.as_str(),
            headless = self.ctx.headless,
            width = viewport.width,
            height = viewport.height,
            base_url = js_str(self.ctx.base_url.trim_end_matches('/')),
        );

        for line in &self.lines {
            script.push_str(line);
            script.push('\n');
        }

        script.push_str(
            r#"
    console.log(JSON.stringify({ success: true }));
  } catch (error) {
    console.log(JSON.stringify({ success: false, step, label: stepLabel, error: String((error && error.message) || error) }));
    process.exitCode = 1;
  } finally {
    await browser.close();
  }
})();
"#,
        );

        script
    }
}

fn language_item(item: &str, lang: Language) -> String {
    format!("{}[data-lang=\"{}\"]", item, lang.code())
}

/// Language picked by a click on a menu item selector such as
/// `.lang-menu-item[data-lang="en"]`
fn menu_language(selector: &str) -> Option<Language> {
    let rest = &selector[selector.find("[data-lang=")? + "[data-lang=".len()..];
    let value = &rest[..rest.find(']')?];
    value.trim_matches(|c| c == '"' || c == '\'').parse().ok()
}

fn styles_js(selector: &str, props: &str, expected: &str, all: bool) -> String {
    if all {
        format!(
            r#"    {{
      const targets = page.locator({sel});
      await expect(targets.first()).toBeAttached();
      const expected = {expected};
      for (const values of await targets.evaluateAll(readAllStyles, {props})) {{
        expect(values).toEqual(expected);
      }}
    }}"#,
            sel = js_str(selector),
            expected = expected,
            props = props
        )
    } else {
        format!(
            r#"    {{
      const expected = {expected};
      expect(await page.locator({sel}).first().evaluate(readStyles, {props})).toEqual(expected);
    }}"#,
            sel = js_str(selector),
            expected = expected,
            props = props
        )
    }
}

/// Line printed by a script when it finishes
#[derive(Debug, Clone, Deserialize)]
pub struct ScriptOutcome {
    pub success: bool,
    #[serde(default)]
    pub step: Option<i64>,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

impl ScriptOutcome {
    /// Find the outcome line in a script's stdout
    pub fn parse(stdout: &str) -> Option<Self> {
        stdout
            .lines()
            .rev()
            .filter(|line| line.trim_start().starts_with('{'))
            .find_map(|line| serde_json::from_str(line).ok())
    }

    pub fn into_result(self) -> E2eResult<()> {
        if self.success {
            return Ok(());
        }
        let reason = self.error.unwrap_or_else(|| "unknown error".to_string());
        match self.step {
            Some(index) if index >= 0 => Err(E2eError::StepFailed {
                index: index as usize,
                step: self.label.unwrap_or_default(),
                reason,
            }),
            _ => Err(E2eError::AssertionFailed(reason)),
        }
    }
}

/// Runs compiled scripts with Node
pub struct PlaywrightHandle {
    script_dir: tempfile::TempDir,
    counter: AtomicUsize,
}

impl PlaywrightHandle {
    /// Scripts are written below `work_dir` so Node resolves the project's
    /// `node_modules`.
    pub fn new(work_dir: &Path) -> E2eResult<Self> {
        Self::check_node_installed()?;

        std::fs::create_dir_all(work_dir)?;
        let script_dir = tempfile::Builder::new().prefix(".scripts-").tempdir_in(work_dir)?;

        Ok(Self {
            script_dir,
            counter: AtomicUsize::new(0),
        })
    }

    fn check_node_installed() -> E2eResult<()> {
        let status = Command::new("node")
            .arg("--version")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status();

        match status {
            Ok(status) if status.success() => Ok(()),
            _ => Err(E2eError::PlaywrightNotFound),
        }
    }

    fn script_path(&self, test: &CompiledTest) -> PathBuf {
        let n = self.counter.fetch_add(1, Ordering::Relaxed);
        let slug: String = test
            .title()
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() { c.to_ascii_lowercase() } else { '-' })
            .collect();
        self.script_dir.path().join(format!("{:04}-{}.js", n, slug))
    }

    /// Run one test; the process is killed when `timeout` elapses
    pub async fn run(&self, test: &CompiledTest, timeout: Duration) -> E2eResult<()> {
        let path = self.script_path(test);
        std::fs::write(&path, &test.script)?;

        debug!("Running Playwright script: {}", path.display());

        let child = TokioCommand::new("node")
            .arg(&path)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()?;

        let output = match tokio::time::timeout(timeout, child.wait_with_output()).await {
            Ok(output) => output?,
            Err(_) => return Err(E2eError::Timeout(timeout.as_millis() as u64)),
        };

        let stdout = String::from_utf8_lossy(&output.stdout);
        match ScriptOutcome::parse(&stdout) {
            Some(outcome) => outcome.into_result(),
            None => {
                let stderr = String::from_utf8_lossy(&output.stderr);
                Err(E2eError::Playwright(format!(
                    "Script produced no result:\nstdout: {}\nstderr: {}",
                    stdout, stderr
                )))
            }
        }
    }
}
