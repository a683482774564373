//! Main test runner that orchestrates the site server, suites and Playwright

use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, error, info};

use crate::config::RunnerConfig;
use crate::error::{E2eError, E2eResult};
use crate::fixture::Fixtures;
use crate::playwright::{compile, CompiledTest, PlaywrightHandle, ScriptContext};
use crate::report::{reporter_for, Reporter, RunSummary, SuiteResult, TestResult};
use crate::server::ServerHandle;
use crate::spec::{TestCase, TestSuite};

/// Which tests to run
#[derive(Debug, Clone, Default)]
pub struct TestFilter {
    /// Suite or test tag
    pub tag: Option<String>,
    /// Substring of `suite › test`
    pub grep: Option<String>,
}

impl TestFilter {
    pub fn matches(&self, suite: &TestSuite, case: &TestCase) -> bool {
        if let Some(tag) = &self.tag {
            if !suite.has_tag(case, tag) {
                return false;
            }
        }
        if let Some(grep) = &self.grep {
            let title = format!("{} › {}", suite.name, case.name);
            if !title.contains(grep.as_str()) {
                return false;
            }
        }
        true
    }
}

/// A suite with its selected tests compiled
#[derive(Debug, Clone)]
pub struct CompiledSuite {
    pub name: String,
    pub file: Option<String>,
    pub tests: Vec<CompiledTest>,
}

/// Main E2E test runner
pub struct TestRunner {
    config: RunnerConfig,
    server: Option<ServerHandle>,
    reporter: Arc<dyn Reporter>,
}

impl TestRunner {
    pub fn with_config(config: RunnerConfig) -> Self {
        let reporter = Arc::from(reporter_for(config.reporter));
        Self {
            config,
            server: None,
            reporter,
        }
    }

    pub fn config(&self) -> &RunnerConfig {
        &self.config
    }

    /// Start the site server if one is configured
    pub async fn start_server(&mut self) -> E2eResult<()> {
        if self.server.is_some() {
            return Ok(());
        }
        if let Some(server_config) = self.config.server.clone() {
            let server = ServerHandle::spawn(server_config, &self.config.base_url).await?;
            self.server = Some(server);
        }
        Ok(())
    }

    pub fn stop_server(&mut self) -> E2eResult<()> {
        if let Some(mut server) = self.server.take() {
            server.stop()?;
        }
        Ok(())
    }

    /// Fixture catalogue, or `None` when the fixtures directory is absent
    pub fn load_fixtures(&self) -> E2eResult<Option<Fixtures>> {
        if !self.config.fixtures_dir.is_dir() {
            debug!("No fixtures at {}", self.config.fixtures_dir.display());
            return Ok(None);
        }
        Fixtures::load_dir(&self.config.fixtures_dir).map(Some)
    }

    pub fn load_suites(&self) -> E2eResult<Vec<TestSuite>> {
        TestSuite::load_all(&self.config.test_dir)
    }

    /// Compile the selected tests of every suite. Suites left without tests
    /// are dropped.
    pub fn compile_all(
        &self,
        suites: &[TestSuite],
        fixtures: Option<&Fixtures>,
        filter: &TestFilter,
    ) -> E2eResult<Vec<CompiledSuite>> {
        let ctx = ScriptContext {
            base_url: &self.config.base_url,
            viewport: self.config.viewport,
            browser: self.config.browser,
            headless: self.config.headless,
            fixtures,
        };

        let mut compiled = Vec::new();
        for suite in suites {
            let tests = suite
                .tests
                .iter()
                .filter(|case| filter.matches(suite, case))
                .map(|case| compile(&ctx, suite, case))
                .collect::<E2eResult<Vec<_>>>()?;
            if tests.is_empty() {
                continue;
            }
            compiled.push(CompiledSuite {
                name: suite.name.clone(),
                file: suite.source.as_ref().map(|p| p.display().to_string()),
                tests,
            });
        }
        Ok(compiled)
    }

    /// Run suites. Suite files run concurrently up to the worker limit; the
    /// tests of one suite run one after another, each in a fresh browser.
    pub async fn run(
        &mut self,
        suites: &[TestSuite],
        fixtures: Option<&Fixtures>,
        filter: &TestFilter,
    ) -> E2eResult<RunSummary> {
        let compiled = self.compile_all(suites, fixtures, filter)?;
        let total: usize = compiled.iter().map(|s| s.tests.len()).sum();
        let workers = if self.config.fully_parallel {
            self.config.workers.max(1)
        } else {
            1
        };

        self.start_server().await?;
        let playwright = Arc::new(PlaywrightHandle::new(&self.config.output_dir)?);

        let start = Instant::now();
        self.reporter
            .on_begin(total, workers.min(compiled.len()).max(1));
        info!("Running {} test(s) from {} suite(s) against {}", total, compiled.len(), self.config.base_url);

        let semaphore = Arc::new(Semaphore::new(workers));
        let mut tasks = JoinSet::new();

        for (order, suite) in compiled.into_iter().enumerate() {
            let semaphore = semaphore.clone();
            let playwright = playwright.clone();
            let reporter = self.reporter.clone();
            let timeout = self.config.timeout;

            tasks.spawn(async move {
                let _permit = semaphore.acquire_owned().await.ok();
                let result = run_suite(&playwright, suite, timeout, reporter.as_ref()).await;
                (order, result)
            });
        }

        let mut results = Vec::new();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(result) => results.push(result),
                Err(e) => return Err(E2eError::Playwright(format!("suite task failed: {}", e))),
            }
        }
        results.sort_by_key(|(order, _)| *order);

        let duration_ms = start.elapsed().as_millis() as u64;
        let summary = RunSummary::from_suites(results.into_iter().map(|(_, r)| r).collect(), duration_ms);

        info!(
            "Test Results: {} passed, {} failed ({} ms)",
            summary.passed, summary.failed, summary.duration_ms
        );
        self.reporter.on_end(&summary);

        Ok(summary)
    }

    /// Write the summary as JSON
    pub fn write_results(&self, summary: &RunSummary) -> E2eResult<PathBuf> {
        std::fs::create_dir_all(&self.config.output_dir)?;

        let path = self.config.output_dir.join("results.json");
        let json = serde_json::to_string_pretty(summary)?;
        std::fs::write(&path, json)?;

        info!("Results written to: {}", path.display());
        Ok(path)
    }
}

impl Drop for TestRunner {
    fn drop(&mut self) {
        let _ = self.stop_server();
    }
}

/// Run the tests of one suite in order. A failing test never stops the rest.
async fn run_suite(
    playwright: &PlaywrightHandle,
    suite: CompiledSuite,
    timeout: Duration,
    reporter: &dyn Reporter,
) -> SuiteResult {
    let mut results = Vec::with_capacity(suite.tests.len());

    for test in &suite.tests {
        let start = Instant::now();
        debug!("Running test: {}", test.title());

        let outcome = playwright.run(test, timeout).await;
        let duration_ms = start.elapsed().as_millis() as u64;

        let error = match outcome {
            Ok(()) => None,
            Err(e) => {
                error!("✗ {} - {}", test.title(), e);
                Some(e.to_string())
            }
        };

        let result = TestResult {
            suite: test.suite.clone(),
            name: test.name.clone(),
            success: error.is_none(),
            duration_ms,
            error,
        };
        reporter.on_test_end(&result);
        results.push(result);
    }

    SuiteResult {
        name: suite.name,
        file: suite.file,
        results,
    }
}
