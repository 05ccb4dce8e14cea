//! Main test runner that orchestrates the server, the headless browser and
//! markup snapshots

use std::path::PathBuf;
use std::time::Instant;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info};

use crate::browser::{BrowserConfig, HeadlessBrowser, StepResult};
use crate::error::{E2eError, E2eResult};
use crate::server::{ServerConfig, ServerHandle};
use crate::snapshot::{SnapshotConfig, SnapshotTester};
use crate::spec::ScenarioSpec;

/// Result of running a single scenario
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestResult {
    pub name: String,
    pub success: bool,
    pub duration_ms: u64,
    pub steps: Vec<StepResult>,
    pub error: Option<String>,
}

/// Result of running all scenarios
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestSuiteResult {
    pub started_at: DateTime<Utc>,
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub duration_ms: u64,
    pub results: Vec<TestResult>,
}

impl TestSuiteResult {
    pub fn single(result: TestResult) -> Self {
        Self {
            started_at: Utc::now(),
            total: 1,
            passed: usize::from(result.success),
            failed: usize::from(!result.success),
            duration_ms: result.duration_ms,
            results: vec![result],
        }
    }

    pub fn is_success(&self) -> bool {
        self.failed == 0
    }
}

/// Main E2E test runner
pub struct TestRunner {
    /// Server configuration
    server_config: ServerConfig,

    /// Browser configuration
    browser_config: BrowserConfig,

    /// Snapshot configuration
    snapshot_config: SnapshotConfig,

    /// Running server handle (if any)
    server: Option<ServerHandle>,

    /// Scenario directory
    specs_dir: PathBuf,

    /// Output directory for results
    output_dir: PathBuf,
}

impl TestRunner {
    /// Create a new test runner with default configuration
    pub fn new() -> Self {
        Self::with_config(RunnerConfig::default())
    }

    /// Create a test runner with custom configuration
    pub fn with_config(config: RunnerConfig) -> Self {
        Self {
            server_config: config.server,
            browser_config: config.browser,
            snapshot_config: config.snapshots,
            server: None,
            specs_dir: config.specs_dir,
            output_dir: config.output_dir,
        }
    }

    /// Start the server
    pub async fn start_server(&mut self) -> E2eResult<()> {
        if self.server.is_some() {
            return Ok(()); // Already running
        }

        let server = ServerHandle::start(self.server_config.clone()).await?;

        // Point the browser at the actual server URL
        self.browser_config.base_url = server.base_url().to_string();

        self.server = Some(server);
        Ok(())
    }

    /// Stop the server
    pub fn stop_server(&mut self) -> E2eResult<()> {
        if let Some(mut server) = self.server.take() {
            server.stop()?;
        }
        Ok(())
    }

    /// Run all scenarios in the specs directory
    pub async fn run_all(&mut self) -> E2eResult<TestSuiteResult> {
        let specs = ScenarioSpec::load_all(&self.specs_dir)?;
        self.run_specs(&specs).await
    }

    /// Run scenarios matching a tag
    pub async fn run_tagged(&mut self, tag: &str) -> E2eResult<TestSuiteResult> {
        let specs = ScenarioSpec::load_all(&self.specs_dir)?;
        let filtered: Vec<ScenarioSpec> = ScenarioSpec::filter_by_tag(&specs, tag)
            .into_iter()
            .cloned()
            .collect();
        self.run_specs(&filtered).await
    }

    /// Run a specific scenario by name
    pub async fn run_test(&mut self, name: &str) -> E2eResult<TestResult> {
        let specs = ScenarioSpec::load_all(&self.specs_dir)?;
        let spec = specs
            .into_iter()
            .find(|s| s.name == name)
            .ok_or_else(|| E2eError::SpecParse(format!("Test not found: {}", name)))?;

        self.start_server().await?;
        self.run_spec(&spec).await
    }

    /// Run a list of scenarios
    pub async fn run_specs(&mut self, specs: &[ScenarioSpec]) -> E2eResult<TestSuiteResult> {
        let started_at = Utc::now();
        let start = Instant::now();
        let mut results = Vec::new();
        let mut passed = 0;
        let mut failed = 0;

        // Ensure server is running
        self.start_server().await?;

        info!("Running {} scenario(s)...", specs.len());

        for spec in specs {
            match self.run_spec(spec).await {
                Ok(result) => {
                    if result.success {
                        passed += 1;
                        info!("✓ {} ({} ms)", result.name, result.duration_ms);
                    } else {
                        failed += 1;
                        error!("✗ {} - {}", result.name, result.error.as_deref().unwrap_or("unknown error"));
                    }
                    results.push(result);
                }
                Err(e) => {
                    failed += 1;
                    error!("✗ {} - {}", spec.name, e);
                    results.push(TestResult {
                        name: spec.name.clone(),
                        success: false,
                        duration_ms: 0,
                        steps: vec![],
                        error: Some(e.to_string()),
                    });
                }
            }
        }

        let duration_ms = start.elapsed().as_millis() as u64;

        info!("Test Results: {} passed, {} failed ({} ms)", passed, failed, duration_ms);

        Ok(TestSuiteResult {
            started_at,
            total: specs.len(),
            passed,
            failed,
            duration_ms,
            results,
        })
    }

    /// Run a single scenario in a fresh browser
    pub async fn run_spec(&mut self, spec: &ScenarioSpec) -> E2eResult<TestResult> {
        let start = Instant::now();
        debug!("Running scenario: {}", spec.name);

        let snapshots = SnapshotTester::new(self.snapshot_config.clone())?;
        let mut browser = HeadlessBrowser::new(self.browser_config.clone())?.with_snapshots(snapshots);

        let mut step_results = Vec::new();
        let mut test_error: Option<String> = None;

        for step in spec.expanded_steps() {
            let result = browser.execute_step(&step).await?;

            if !result.success {
                test_error = result.error.clone();
                step_results.push(result);
                break; // Stop on first failure
            }

            step_results.push(result);
        }

        Ok(TestResult {
            name: spec.name.clone(),
            success: test_error.is_none(),
            duration_ms: start.elapsed().as_millis() as u64,
            steps: step_results,
            error: test_error,
        })
    }

    /// Promote every recorded snapshot to baseline
    pub fn update_baselines(&self) -> E2eResult<()> {
        let snapshots = SnapshotTester::new(self.snapshot_config.clone())?;
        for name in snapshots.recorded()? {
            snapshots.update_baseline(&name)?;
        }
        Ok(())
    }

    /// Write results to a JSON file
    pub fn write_results(&self, results: &TestSuiteResult) -> E2eResult<PathBuf> {
        std::fs::create_dir_all(&self.output_dir)?;

        let path = self.output_dir.join("test-results.json");
        let json = serde_json::to_string_pretty(results)?;
        std::fs::write(&path, json)?;

        info!("Results written to: {}", path.display());
        Ok(path)
    }
}

impl Default for TestRunner {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for TestRunner {
    fn drop(&mut self) {
        let _ = self.stop_server();
    }
}

/// Configuration for the test runner
#[derive(Debug, Clone)]
pub struct RunnerConfig {
    pub server: ServerConfig,
    pub browser: BrowserConfig,
    pub snapshots: SnapshotConfig,
    pub specs_dir: PathBuf,
    pub output_dir: PathBuf,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            browser: BrowserConfig::default(),
            snapshots: SnapshotConfig::default(),
            specs_dir: PathBuf::from(concat!(env!("CARGO_MANIFEST_DIR"), "/specs")),
            output_dir: PathBuf::from("test-results"),
        }
    }
}
