//! Notably E2E Test Framework
//!
//! A Rust-controlled acceptance harness that:
//! - Runs the web server in-process or as a subprocess
//! - Loads the served page and runs its scripts in an embedded script runtime
//! - Drives the live page with UI events, checking every event against the
//!   note list controller
//! - Parses declarative YAML scenarios
//! - Snapshots the live note list markup against baselines
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    E2E Test Runner (Rust)                   │
//! ├─────────────────────────────────────────────────────────────┤
//! │  TestRunner                                                 │
//! │    ├── start_server() -> ServerHandle                       │
//! │    ├── HeadlessBrowser::navigate() -> HeadlessPage          │
//! │    │     └── ScriptRuntime (dom_shim.js + page scripts)     │
//! │    ├── run_spec(spec: ScenarioSpec) -> TestResult           │
//! │    └── SnapshotTester::record(name, markup) -> SnapshotDiff │
//! ├─────────────────────────────────────────────────────────────┤
//! │  ScenarioSpec (YAML)                                        │
//! │    ├── name, description, tags, seed_notes                  │
//! │    └── steps: [TestStep]                                    │
//! │          ├── navigate { url }                               │
//! │          ├── type / fill / press { selector, ... }          │
//! │          ├── click { selector, index? }                     │
//! │          ├── assert { selector, count?, text?, hidden? .. } │
//! │          └── snapshot { name }                              │
//! └─────────────────────────────────────────────────────────────┘
//! ```

pub mod browser;
pub mod dom;
pub mod error;
pub mod page;
pub mod runner;
pub mod script;
pub mod server;
pub mod snapshot;
pub mod spec;

pub use error::{E2eError, E2eResult};
pub use page::HeadlessPage;
pub use runner::TestRunner;
pub use spec::{ScenarioSpec, TestStep};
