//! Headless browser: loads pages and their scripts over HTTP and executes
//! scenario steps

use std::path::PathBuf;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::dom::{Document, PageScript};
use crate::error::{E2eError, E2eResult};
use crate::page::HeadlessPage;
use crate::snapshot::SnapshotTester;
use crate::spec::{AttributeAssertion, TestStep};

/// Result of executing a test step
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepResult {
    pub success: bool,
    pub step_name: String,
    pub duration_ms: u64,
    pub error: Option<String>,
    pub snapshot_path: Option<PathBuf>,
}

/// Browser configuration
#[derive(Debug, Clone)]
pub struct BrowserConfig {
    pub base_url: String,
    pub request_timeout: Duration,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:4000".to_string(),
            request_timeout: Duration::from_secs(10),
        }
    }
}

/// One browser tab: at most one loaded page
pub struct HeadlessBrowser {
    base_url: String,
    client: reqwest::Client,
    page: Option<HeadlessPage>,
    snapshots: Option<SnapshotTester>,
}

impl HeadlessBrowser {
    pub fn new(config: BrowserConfig) -> E2eResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()?;

        Ok(Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            client,
            page: None,
            snapshots: None,
        })
    }

    /// Enable `snapshot` steps
    pub fn with_snapshots(mut self, snapshots: SnapshotTester) -> Self {
        self.snapshots = Some(snapshots);
        self
    }

    pub fn page(&self) -> Option<&HeadlessPage> {
        self.page.as_ref()
    }

    /// Load `url` (relative to the base URL), fetch its scripts and run them.
    ///
    /// A page missing one of the required controls is fatal.
    pub async fn navigate(&mut self, url: &str) -> E2eResult<()> {
        let full = format!("{}/{}", self.base_url, url.trim_start_matches('/'));
        debug!("Navigating to {}", full);

        let html = self.fetch(&full).await?;
        let document = Document::parse(&html);

        let mut scripts = Vec::new();
        for script in document.scripts() {
            match script {
                PageScript::Inline(code) => scripts.push(code),
                PageScript::External(src) => {
                    let script_url = resolve_url(&full, &src)?;
                    debug!("Fetching script {}", script_url);
                    scripts.push(self.fetch(&script_url).await?);
                }
            }
        }

        self.page = Some(HeadlessPage::attach(document, &scripts)?);
        Ok(())
    }

    async fn fetch(&self, url: &str) -> E2eResult<String> {
        Ok(self
            .client
            .get(url)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?)
    }

    /// Execute a single test step.
    ///
    /// Step-level failures are reported in the returned result; only
    /// infrastructure faults (HTTP, fatal page wiring) are errors.
    pub async fn execute_step(&mut self, step: &TestStep) -> E2eResult<StepResult> {
        let start = Instant::now();
        let step_name = step.name();

        debug!("Executing step: {}", step_name);

        let result = match step {
            TestStep::Navigate { url } => {
                self.navigate(url).await?;
                Ok(None)
            }
            TestStep::Type { selector, text } => {
                self.page_mut().and_then(|p| p.type_text(selector, text)).map(|_| None)
            }
            TestStep::Fill { selector, value } => {
                self.page_mut().and_then(|p| p.fill(selector, value)).map(|_| None)
            }
            TestStep::Press { selector, key } => {
                self.page_mut().and_then(|p| p.press(selector, key)).map(|_| None)
            }
            TestStep::Click { selector, index } => {
                self.page_mut().and_then(|p| p.click(selector, *index)).map(|_| None)
            }
            TestStep::Assert {
                selector,
                index,
                count,
                visible_count,
                text,
                text_contains,
                texts,
                value,
                attribute,
                hidden,
            } => self
                .page_ref()
                .and_then(|p| {
                    Assertion {
                        selector,
                        index: *index,
                        count: *count,
                        visible_count: *visible_count,
                        text: text.as_deref(),
                        text_contains: text_contains.as_deref(),
                        texts: texts.as_deref(),
                        value: value.as_deref(),
                        attribute: attribute.as_ref(),
                        hidden: *hidden,
                    }
                    .check(p)
                })
                .map(|_| None),
            TestStep::Snapshot { name } => self.snapshot(name).map(Some),
            TestStep::Log { message } => {
                info!("[TEST LOG] {}", message);
                Ok(None)
            }
        };

        let duration_ms = start.elapsed().as_millis() as u64;

        match result {
            Ok(snapshot_path) => Ok(StepResult {
                success: true,
                step_name,
                duration_ms,
                error: None,
                snapshot_path,
            }),
            Err(e) => Ok(StepResult {
                success: false,
                step_name,
                duration_ms,
                error: Some(e.to_string()),
                snapshot_path: None,
            }),
        }
    }

    fn page_ref(&self) -> E2eResult<&HeadlessPage> {
        self.page.as_ref().ok_or(E2eError::NoPage)
    }

    fn page_mut(&mut self) -> E2eResult<&mut HeadlessPage> {
        self.page.as_mut().ok_or(E2eError::NoPage)
    }

    /// Record the live markup of the note container
    fn snapshot(&mut self, name: &str) -> E2eResult<PathBuf> {
        let page = self.page.as_mut().ok_or(E2eError::NoPage)?;
        let snapshots = self.snapshots.as_ref().ok_or_else(|| E2eError::StepFailed {
            step: format!("snapshot:{}", name),
            reason: "snapshots are not enabled".to_string(),
        })?;

        let markup = page.note_list_markup()?;
        match snapshots.record(name, &markup) {
            Ok(diff) if diff.matches => Ok(diff.actual_path),
            Ok(diff) => Err(E2eError::SnapshotMismatch {
                name: name.to_string(),
                baseline_hash: diff.baseline_hash,
                actual_hash: diff.actual_hash,
            }),
            Err(E2eError::BaselineNotFound(_)) => {
                // First run - no baseline yet
                info!("No baseline for '{}' - will be created on next run with --update-baselines", name);
                Ok(snapshots.actual_path(name))
            }
            Err(e) => Err(e),
        }
    }
}

/// Resolve a script `src` against the page URL
fn resolve_url(page_url: &str, src: &str) -> E2eResult<String> {
    let invalid = |reason: String| E2eError::StepFailed {
        step: format!("script:{}", src),
        reason,
    };
    let base = reqwest::Url::parse(page_url).map_err(|e| invalid(e.to_string()))?;
    let url = base.join(src).map_err(|e| invalid(e.to_string()))?;
    Ok(url.to_string())
}

/// Borrowed view of an `assert` step
struct Assertion<'a> {
    selector: &'a str,
    index: usize,
    count: Option<usize>,
    visible_count: Option<usize>,
    text: Option<&'a str>,
    text_contains: Option<&'a str>,
    texts: Option<&'a [String]>,
    value: Option<&'a str>,
    attribute: Option<&'a AttributeAssertion>,
    hidden: Option<bool>,
}

impl Assertion<'_> {
    fn check(&self, page: &HeadlessPage) -> E2eResult<()> {
        let matches = page.query_all(self.selector)?;

        if let Some(expected) = self.count {
            if matches.len() != expected {
                return self.fail(format!("expected {} match(es), found {}", expected, matches.len()));
            }
        }

        if let Some(expected) = self.visible_count {
            let visible = matches.iter().filter(|t| page.is_rendered(**t)).count();
            if visible != expected {
                return self.fail(format!("expected {} visible, found {}", expected, visible));
            }
        }

        if let Some(expected) = self.texts {
            let actual: Vec<String> = matches.iter().map(|t| page.text_of(*t)).collect();
            if actual != expected {
                return self.fail(format!("expected texts {:?}, found {:?}", expected, actual));
            }
        }

        if !self.needs_target() {
            return Ok(());
        }

        let target = matches.get(self.index).copied().ok_or_else(|| {
            E2eError::ElementNotFound(format!("{} [{}]", self.selector, self.index))
        })?;
        self.check_target(page, target)
    }

    fn needs_target(&self) -> bool {
        self.text.is_some()
            || self.text_contains.is_some()
            || self.value.is_some()
            || self.attribute.is_some()
            || self.hidden.is_some()
    }

    fn check_target(&self, page: &HeadlessPage, target: usize) -> E2eResult<()> {
        let text = page.text_of(target);

        if let Some(expected) = self.text {
            if text != expected {
                return self.fail(format!("expected text {:?}, found {:?}", expected, text));
            }
        }

        if let Some(needle) = self.text_contains {
            if !text.contains(needle) {
                return self.fail(format!("text {:?} does not contain {:?}", text, needle));
            }
        }

        if let Some(expected) = self.value {
            let actual = page.value_of(target);
            if actual.as_deref() != Some(expected) {
                return self.fail(format!("expected value {:?}, found {:?}", expected, actual));
            }
        }

        if let Some(attr) = self.attribute {
            let actual = page.attribute(target, &attr.name);
            let Some(actual) = actual else {
                return self.fail(format!("attribute '{}' is absent", attr.name));
            };
            if let Some(expected) = &attr.value {
                if &actual != expected {
                    return self.fail(format!(
                        "attribute '{}' is {:?}, expected {:?}",
                        attr.name, actual, expected
                    ));
                }
            }
            if let Some(needle) = &attr.contains {
                if !actual.contains(needle.as_str()) {
                    return self.fail(format!(
                        "attribute '{}' is {:?}, expected to contain {:?}",
                        attr.name, actual, needle
                    ));
                }
            }
        }

        if let Some(expected) = self.hidden {
            let actual = page.is_hidden(target);
            if actual != expected {
                return self.fail(format!("expected hidden={}, found hidden={}", expected, actual));
            }
        }

        Ok(())
    }

    fn fail(&self, reason: String) -> E2eResult<()> {
        Err(E2eError::AssertionFailed(format!("{}: {}", self.selector, reason)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::page::tests::{shipped_script, PAGE};
    use crate::snapshot::{SnapshotConfig, SnapshotTester};

    fn browser_with(html: &str) -> HeadlessBrowser {
        let mut browser = HeadlessBrowser::new(BrowserConfig::default()).unwrap();
        browser.page = Some(HeadlessPage::load(html, &[shipped_script()]).unwrap());
        browser
    }

    fn step(yaml: &str) -> TestStep {
        serde_yaml::from_str(yaml).unwrap()
    }

    #[tokio::test]
    async fn failed_assertion_is_reported_not_raised() {
        let mut browser = browser_with(PAGE);
        let result = browser
            .execute_step(&step("action: assert\nselector: .note\ncount: 1\n"))
            .await
            .unwrap();

        assert!(!result.success);
        assert!(result.error.unwrap().contains("expected 1 match(es), found 0"));
    }

    #[tokio::test]
    async fn steps_drive_the_note_list() {
        let mut browser = browser_with(PAGE);
        for yaml in [
            "action: type\nselector: .new-note-input\ntext: Walk the dog\n",
            "action: click\nselector: .submit-note\n",
            "action: assert\nselector: .note\ntexts: [Walk the dog]\n",
            "action: assert\nselector: .new-note-input\nvalue: ''\n",
            "action: assert\nselector: .filter\nattribute:\n  name: placeholder\n  value: search\n",
            "action: fill\nselector: .filter\nvalue: cat\n",
            "action: assert\nselector: .note\nvisible_count: 0\nhidden: true\n",
        ] {
            let result = browser.execute_step(&step(yaml)).await.unwrap();
            assert!(result.success, "{}: {:?}", result.step_name, result.error);
        }
    }

    #[tokio::test]
    async fn steps_without_page_fail() {
        let mut browser = HeadlessBrowser::new(BrowserConfig::default()).unwrap();
        let result = browser
            .execute_step(&step("action: click\nselector: .submit-note\n"))
            .await
            .unwrap();
        assert!(!result.success);
    }

    #[tokio::test]
    async fn snapshot_requires_configuration() {
        let mut browser = browser_with(PAGE);
        let result = browser
            .execute_step(&step("action: snapshot\nname: empty\n"))
            .await
            .unwrap();
        assert!(!result.success);
        assert!(result.error.unwrap().contains("snapshots are not enabled"));
    }

    #[tokio::test]
    async fn snapshot_records_the_live_note_list() {
        let dir = tempfile::tempdir().unwrap();
        let snapshots = SnapshotTester::new(SnapshotConfig {
            baseline_dir: dir.path().join("baselines"),
            actual_dir: dir.path().join("actual"),
            auto_update: false,
        })
        .unwrap();
        let mut browser = browser_with(PAGE).with_snapshots(snapshots);

        for yaml in [
            "action: type\nselector: .new-note-input\ntext: a < b\n",
            "action: click\nselector: .submit-note\n",
            "action: fill\nselector: .filter\nvalue: zzz\n",
            "action: snapshot\nname: live\n",
        ] {
            let result = browser.execute_step(&step(yaml)).await.unwrap();
            assert!(result.success, "{}: {:?}", result.step_name, result.error);
        }

        let recorded = std::fs::read_to_string(dir.path().join("actual/live.html")).unwrap();
        assert_eq!(
            recorded,
            r#"<li class="note" hidden="">a &lt; b<input type="button" value="X"></li>"#
        );
    }

    #[test]
    fn script_urls_resolve_against_the_page() {
        assert_eq!(
            resolve_url("http://127.0.0.1:4000/", "index.js").unwrap(),
            "http://127.0.0.1:4000/index.js"
        );
        assert_eq!(
            resolve_url("http://127.0.0.1:4000/notes/index.html", "app.js").unwrap(),
            "http://127.0.0.1:4000/notes/app.js"
        );
        assert_eq!(
            resolve_url("http://127.0.0.1:4000/notes/index.html", "/index.js").unwrap(),
            "http://127.0.0.1:4000/index.js"
        );
    }
}
