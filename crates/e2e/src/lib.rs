//! Homepage E2E Test Framework
//!
//! Browser end-to-end checks for the homepage, controlled from Rust:
//! - Loads declarative YAML suites and the reading fixtures
//! - Serves fixtures in place of the live content files via route mocks
//! - Compiles every test into a Playwright script and runs it with Node
//! - Optionally launches the site locally and waits for it to answer
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    E2E Test Runner (Rust)                   │
//! ├─────────────────────────────────────────────────────────────┤
//! │  TestRunner                                                 │
//! │    ├── start_server() -> ServerHandle (optional)            │
//! │    ├── compile_all(suites, fixtures) -> [CompiledTest]      │
//! │    ├── run() -> suites in parallel, tests in order          │
//! │    └── write_results(summary)                               │
//! ├─────────────────────────────────────────────────────────────┤
//! │  TestSuite (YAML)                                           │
//! │    ├── name, tags, viewport?                                │
//! │    ├── routes: [RouteMock { url, fixture | body }]          │
//! │    ├── before_each: [TestStep]                              │
//! │    └── tests: [TestCase { name, steps }]                    │
//! ├─────────────────────────────────────────────────────────────┤
//! │  Fixtures (zh/en/es/fr, aligned by id) + ReadingState model │
//! └─────────────────────────────────────────────────────────────┘
//! ```

pub mod config;
pub mod error;
pub mod fixture;
pub mod language;
pub mod playwright;
pub mod reading;
pub mod report;
pub mod route;
pub mod runner;
pub mod scenario;
pub mod server;
pub mod spec;

pub use config::RunnerConfig;
pub use error::{E2eError, E2eResult};
pub use fixture::{Excerpt, FixtureSet, Fixtures};
pub use language::Language;
pub use reading::{Direction, ReadingState};
pub use runner::{TestFilter, TestRunner};
pub use spec::{TestCase, TestStep, TestSuite};
