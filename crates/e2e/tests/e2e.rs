//! E2E test harness entry point
//!
//! Runs the YAML suites under `tests/specs` in a real browser.
//! Run with: cargo test --package homepage-e2e --test e2e -- [OPTIONS]
//!
//! libtest switches and name filters that cargo forwards to every test
//! target are accepted and ignored.

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

use homepage_e2e::config::{base_url_from, strip_libtest_args, Browser, ReporterKind, Viewport};
use homepage_e2e::server::{is_reachable, ServerConfig};
use homepage_e2e::{scenario, E2eError, E2eResult, RunnerConfig, TestFilter, TestRunner};

#[derive(Parser, Debug)]
#[command(name = "homepage-e2e")]
#[command(about = "Browser end-to-end tests for the homepage")]
struct Args {
    /// Directory holding suite YAML files
    #[arg(long, default_value = "tests/specs")]
    test_dir: PathBuf,

    /// Directory holding reading fixtures
    #[arg(long, default_value = "tests/fixtures")]
    fixtures_dir: PathBuf,

    /// Site under test [default: $BASE_URL or http://localhost:4000]
    #[arg(long)]
    base_url: Option<String>,

    /// Run only tests carrying this tag
    #[arg(short, long)]
    tag: Option<String>,

    /// Run only tests whose "suite › test" title contains this text
    #[arg(short, long)]
    grep: Option<String>,

    /// Also run tests generated from the fixtures and the reading model
    #[arg(long)]
    scenarios: bool,

    /// Command that serves the site locally, e.g. "bundle exec jekyll serve"
    #[arg(long)]
    serve: Option<String>,

    /// Directory to run the serve command in
    #[arg(long)]
    site_dir: Option<PathBuf>,

    /// Browser to use (chromium, firefox, webkit)
    #[arg(long, default_value = "chromium")]
    browser: Browser,

    /// Show the browser window
    #[arg(long)]
    headed: bool,

    #[arg(long, default_value = "1280")]
    viewport_width: u32,

    #[arg(long, default_value = "720")]
    viewport_height: u32,

    /// Per-test timeout in seconds
    #[arg(long, default_value = "30")]
    timeout: u64,

    /// Concurrent suite files (0 = one per CPU)
    #[arg(short, long, default_value = "0")]
    workers: usize,

    /// Run suite files one at a time
    #[arg(long)]
    serial: bool,

    /// Print the summary only
    #[arg(short, long)]
    quiet: bool,

    /// Fail instead of skipping when Node or the site is unavailable
    #[arg(long, env = "E2E_STRICT")]
    strict: bool,

    /// Output directory for results
    #[arg(short, long, default_value = "test-results")]
    output: PathBuf,

    /// Test name filters forwarded by `cargo test`
    #[arg(hide = true)]
    filters: Vec<String>,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_target(false)
        .init();

    let (argv, list_only) = strip_libtest_args(std::env::args());
    if list_only {
        // Nothing to list for libtest; the suites are not Rust tests
        std::process::exit(0);
    }
    let args = Args::parse_from(argv);
    if !args.filters.is_empty() {
        debug!("Ignoring test name filters {:?}", args.filters);
    }

    let rt = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("Error: failed to create tokio runtime: {}", e);
            std::process::exit(2);
        }
    };

    match rt.block_on(async_main(args)) {
        Ok(true) => std::process::exit(0),
        Ok(false) => std::process::exit(1),
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(2);
        }
    }
}

async fn async_main(args: Args) -> E2eResult<bool> {
    let defaults = RunnerConfig::from_env();
    let server = args.serve.as_deref().map(|line| ServerConfig {
        working_dir: args.site_dir.clone(),
        ..ServerConfig::from_command_line(line)
    });

    let config = RunnerConfig {
        test_dir: args.test_dir,
        fixtures_dir: args.fixtures_dir,
        timeout: Duration::from_secs(args.timeout),
        base_url: match args.base_url {
            Some(url) => base_url_from(Some(url)),
            None => defaults.base_url.clone(),
        },
        headless: !args.headed,
        viewport: Viewport {
            width: args.viewport_width,
            height: args.viewport_height,
        },
        browser: args.browser,
        fully_parallel: !args.serial,
        workers: if args.workers == 0 { defaults.workers } else { args.workers },
        reporter: if args.quiet { ReporterKind::Quiet } else { ReporterKind::List },
        output_dir: args.output,
        server,
    };

    if !args.strict && config.server.is_none() && !is_reachable(&config.base_url).await {
        warn!("{} is not reachable; skipping browser tests (use --strict to fail)", config.base_url);
        return Ok(true);
    }

    let mut runner = TestRunner::with_config(config);
    info!(
        "Testing {} with {} worker(s)",
        runner.config().base_url,
        runner.config().workers
    );

    let mut suites = runner.load_suites()?;
    let fixtures = runner.load_fixtures()?;
    if args.scenarios {
        match &fixtures {
            Some(fixtures) => suites.push(scenario::model_suite(fixtures)),
            None => warn!("--scenarios given but no fixtures were found"),
        }
    }

    let filter = TestFilter {
        tag: args.tag,
        grep: args.grep,
    };

    let summary = match runner.run(&suites, fixtures.as_ref(), &filter).await {
        Err(E2eError::PlaywrightNotFound) if !args.strict => {
            warn!("Node.js is not installed; skipping browser tests (use --strict to fail)");
            return Ok(true);
        }
        other => other?,
    };

    runner.write_results(&summary)?;

    Ok(summary.success())
}
