//! Test result types and reporters

use serde::{Deserialize, Serialize};

use crate::config::ReporterKind;

/// Result of running a single test
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestResult {
    pub suite: String,
    pub name: String,
    pub success: bool,
    pub duration_ms: u64,
    pub error: Option<String>,
}

impl TestResult {
    pub fn title(&self) -> String {
        format!("{} › {}", self.suite, self.name)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuiteResult {
    pub name: String,
    pub file: Option<String>,
    pub results: Vec<TestResult>,
}

/// Result of running all suites
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunSummary {
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub duration_ms: u64,
    pub suites: Vec<SuiteResult>,
}

impl RunSummary {
    pub fn from_suites(suites: Vec<SuiteResult>, duration_ms: u64) -> Self {
        let total = suites.iter().map(|s| s.results.len()).sum();
        let passed = suites
            .iter()
            .flat_map(|s| &s.results)
            .filter(|r| r.success)
            .count();
        Self {
            total,
            passed,
            failed: total - passed,
            duration_ms,
            suites,
        }
    }

    pub fn success(&self) -> bool {
        self.failed == 0
    }

    pub fn failures(&self) -> impl Iterator<Item = &TestResult> {
        self.suites
            .iter()
            .flat_map(|s| &s.results)
            .filter(|r| !r.success)
    }
}

/// Receives progress while suites run. Called from concurrent tasks.
pub trait Reporter: Send + Sync {
    fn on_begin(&self, _total: usize, _workers: usize) {}
    fn on_test_end(&self, _result: &TestResult) {}
    fn on_end(&self, _summary: &RunSummary) {}
}

/// One line per finished test, then failures and totals
#[derive(Debug, Default)]
pub struct ListReporter;

impl Reporter for ListReporter {
    fn on_begin(&self, total: usize, workers: usize) {
        println!();
        println!("Running {} test(s) using {} worker(s)", total, workers);
        println!();
    }

    fn on_test_end(&self, result: &TestResult) {
        let mark = if result.success { "✓" } else { "✘" };
        println!("  {} {} ({}ms)", mark, result.title(), result.duration_ms);
    }

    fn on_end(&self, summary: &RunSummary) {
        print_footer(summary);
    }
}

/// Footer only
#[derive(Debug, Default)]
pub struct QuietReporter;

impl Reporter for QuietReporter {
    fn on_end(&self, summary: &RunSummary) {
        print_footer(summary);
    }
}

fn print_footer(summary: &RunSummary) {
    let failures: Vec<&TestResult> = summary.failures().collect();
    if !failures.is_empty() {
        println!();
        for (i, result) in failures.iter().enumerate() {
            println!("  {}) {}", i + 1, result.title());
            println!();
            println!("    {}", result.error.as_deref().unwrap_or("unknown error"));
            println!();
        }
    }

    println!();
    if summary.failed > 0 {
        println!("  {} failed", summary.failed);
    }
    println!("  {} passed ({}ms)", summary.passed, summary.duration_ms);
}

pub fn reporter_for(kind: ReporterKind) -> Box<dyn Reporter> {
    match kind {
        ReporterKind::List => Box::new(ListReporter),
        ReporterKind::Quiet => Box::new(QuietReporter),
    }
}
