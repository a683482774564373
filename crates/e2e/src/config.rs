//! Runner configuration

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::server::ServerConfig;

/// Environment variable overriding the site under test
pub const BASE_URL_ENV: &str = "BASE_URL";

/// Local site address used when `BASE_URL` is unset
pub const DEFAULT_BASE_URL: &str = "http://localhost:4000";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            width: 1280,
            height: 720,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Browser {
    #[default]
    Chromium,
    Firefox,
    Webkit,
}

impl Browser {
    pub fn as_str(&self) -> &'static str {
        match self {
            Browser::Chromium => "chromium",
            Browser::Firefox => "firefox",
            Browser::Webkit => "webkit",
        }
    }
}

impl std::str::FromStr for Browser {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "chromium" => Ok(Browser::Chromium),
            "firefox" => Ok(Browser::Firefox),
            "webkit" => Ok(Browser::Webkit),
            other => Err(format!("unknown browser: {}", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ReporterKind {
    /// One line per test plus a summary
    #[default]
    List,
    /// Summary only
    Quiet,
}

/// Configuration for the test runner
#[derive(Debug, Clone)]
pub struct RunnerConfig {
    /// Directory holding suite YAML files
    pub test_dir: PathBuf,

    /// Directory holding `reading-<lang>.json` fixtures
    pub fixtures_dir: PathBuf,

    /// Budget for a single test, browser launch included
    pub timeout: Duration,

    pub base_url: String,
    pub headless: bool,
    pub viewport: Viewport,
    pub browser: Browser,

    /// Run suite files concurrently
    pub fully_parallel: bool,

    /// Upper bound on concurrently running suites
    pub workers: usize,

    pub reporter: ReporterKind,

    /// Where `results.json` is written
    pub output_dir: PathBuf,

    /// Site server to launch before testing, if any
    pub server: Option<ServerConfig>,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            test_dir: PathBuf::from("tests/specs"),
            fixtures_dir: PathBuf::from("tests/fixtures"),
            timeout: Duration::from_secs(30),
            base_url: DEFAULT_BASE_URL.to_string(),
            headless: true,
            viewport: Viewport::default(),
            browser: Browser::Chromium,
            fully_parallel: true,
            workers: default_workers(),
            reporter: ReporterKind::List,
            output_dir: PathBuf::from("test-results"),
            server: None,
        }
    }
}

impl RunnerConfig {
    /// Defaults with `BASE_URL` applied
    pub fn from_env() -> Self {
        Self {
            base_url: base_url_from(std::env::var(BASE_URL_ENV).ok()),
            ..Default::default()
        }
    }
}

/// Resolve the base URL from an optional override, falling back silently
pub fn base_url_from(value: Option<String>) -> String {
    value
        .map(|v| v.trim().trim_end_matches('/').to_string())
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| DEFAULT_BASE_URL.to_string())
}

/// libtest switches cargo may forward to every test target
const LIBTEST_FLAGS: &[&str] = &[
    "--nocapture",
    "--show-output",
    "--ignored",
    "--include-ignored",
    "--exact",
    "--bench",
    "--test",
    "--report-time",
    "--ensure-time",
    "--shuffle",
    "--force-run-in-process",
];

/// libtest options that take a value
const LIBTEST_OPTIONS: &[&str] = &[
    "--test-threads",
    "--format",
    "--color",
    "--skip",
    "--logfile",
    "--shuffle-seed",
    "-Z",
];

/// Arguments of a `harness = false` target with libtest's own switches
/// removed, and whether `--list` was asked for
pub fn strip_libtest_args<I>(args: I) -> (Vec<String>, bool)
where
    I: IntoIterator<Item = String>,
{
    let mut kept = Vec::new();
    let mut list = false;
    let mut args = args.into_iter();

    while let Some(arg) = args.next() {
        let name = arg.split_once('=').map_or(arg.as_str(), |(name, _)| name);
        if arg == "--list" {
            list = true;
        } else if LIBTEST_FLAGS.contains(&arg.as_str()) {
            continue;
        } else if LIBTEST_OPTIONS.contains(&name) {
            if name == arg {
                args.next();
            }
        } else {
            kept.push(arg);
        }
    }
    (kept, list)
}

fn default_workers() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = RunnerConfig::default();
        assert_eq!(config.timeout, Duration::from_secs(30));
        assert_eq!(config.viewport, Viewport { width: 1280, height: 720 });
        assert!(config.headless);
        assert!(config.fully_parallel);
        assert!(config.workers >= 1);
        assert_eq!(config.reporter, ReporterKind::List);
        assert_eq!(config.test_dir, PathBuf::from("tests/specs"));
    }

    #[test]
    fn test_base_url_fallback() {
        assert_eq!(base_url_from(None), "http://localhost:4000");
        assert_eq!(base_url_from(Some("  ".into())), "http://localhost:4000");
        assert_eq!(
            base_url_from(Some("https://example.org/".into())),
            "https://example.org"
        );
    }

    fn args(raw: &[&str]) -> Vec<String> {
        raw.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_libtest_args_removed() {
        let (kept, list) = strip_libtest_args(args(&[
            "e2e",
            "--nocapture",
            "--tag",
            "reading",
            "--test-threads",
            "4",
            "--format=pretty",
            "some_filter",
            "-q",
        ]));
        assert_eq!(kept, ["e2e", "--tag", "reading", "some_filter", "-q"]);
        assert!(!list);

        let (kept, list) = strip_libtest_args(args(&["e2e", "--list", "--format", "terse"]));
        assert_eq!(kept, ["e2e"]);
        assert!(list);
    }

    #[test]
    fn test_browser_parse() {
        assert_eq!("webkit".parse::<Browser>().unwrap(), Browser::Webkit);
        assert!("lynx".parse::<Browser>().is_err());
    }
}
