//! Markup snapshots of the live note list

use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};
use tracing::{debug, info};

use crate::error::{E2eError, E2eResult};

/// Result of a snapshot comparison
#[derive(Debug, Clone)]
pub struct SnapshotDiff {
    /// Whether actual and baseline are byte-identical
    pub matches: bool,

    /// Hash of the actual markup
    pub actual_hash: String,

    /// Hash of the baseline markup
    pub baseline_hash: String,

    /// Where the actual markup was written
    pub actual_path: PathBuf,
}

/// Snapshot configuration
#[derive(Debug, Clone)]
pub struct SnapshotConfig {
    pub baseline_dir: PathBuf,
    pub actual_dir: PathBuf,
    /// Create missing baselines from the actual markup
    pub auto_update: bool,
}

impl Default for SnapshotConfig {
    fn default() -> Self {
        Self {
            baseline_dir: PathBuf::from(concat!(env!("CARGO_MANIFEST_DIR"), "/specs/baselines")),
            actual_dir: PathBuf::from("test-results/snapshots"),
            auto_update: false,
        }
    }
}

/// Records markup and compares it to stored baselines
pub struct SnapshotTester {
    baseline_dir: PathBuf,
    actual_dir: PathBuf,
    auto_update: bool,
}

impl SnapshotTester {
    pub fn new(config: SnapshotConfig) -> E2eResult<Self> {
        std::fs::create_dir_all(&config.actual_dir)?;
        if config.auto_update {
            std::fs::create_dir_all(&config.baseline_dir)?;
        }

        Ok(Self {
            baseline_dir: config.baseline_dir,
            actual_dir: config.actual_dir,
            auto_update: config.auto_update,
        })
    }

    pub fn actual_path(&self, name: &str) -> PathBuf {
        self.actual_dir.join(format!("{}.html", name))
    }

    pub fn baseline_path(&self, name: &str) -> PathBuf {
        self.baseline_dir.join(format!("{}.html", name))
    }

    /// Write `markup` as the actual snapshot `name` and compare it.
    ///
    /// A missing baseline is an error unless auto-update is enabled, in which
    /// case the baseline is created and the snapshot matches.
    pub fn record(&self, name: &str, markup: &str) -> E2eResult<SnapshotDiff> {
        let actual_path = self.actual_path(name);
        std::fs::write(&actual_path, markup)?;
        let actual_hash = hash_bytes(markup.as_bytes());

        let baseline_path = self.baseline_path(name);
        if !baseline_path.exists() {
            if !self.auto_update {
                return Err(E2eError::BaselineNotFound(baseline_path.display().to_string()));
            }
            info!("Creating baseline for '{}' (auto-update enabled)", name);
            std::fs::copy(&actual_path, &baseline_path)?;
            return Ok(SnapshotDiff {
                matches: true,
                baseline_hash: actual_hash.clone(),
                actual_hash,
                actual_path,
            });
        }

        let baseline_hash = hash_file(&baseline_path)?;
        let matches = baseline_hash == actual_hash;
        debug!("Snapshot '{}': baseline {} actual {}", name, baseline_hash, actual_hash);

        Ok(SnapshotDiff {
            matches,
            actual_hash,
            baseline_hash,
            actual_path,
        })
    }

    /// Promote the actual snapshot `name` to baseline
    pub fn update_baseline(&self, name: &str) -> E2eResult<()> {
        let actual_path = self.actual_path(name);
        if !actual_path.exists() {
            return Err(E2eError::StepFailed {
                step: format!("update-baseline:{}", name),
                reason: format!("no actual snapshot at {}", actual_path.display()),
            });
        }
        std::fs::create_dir_all(&self.baseline_dir)?;
        std::fs::copy(&actual_path, self.baseline_path(name))?;
        info!("Updated baseline: {}", name);
        Ok(())
    }

    /// Names of all recorded actual snapshots
    pub fn recorded(&self) -> E2eResult<Vec<String>> {
        let mut names = Vec::new();
        for entry in std::fs::read_dir(&self.actual_dir)? {
            let path = entry?.path();
            if path.extension().map(|e| e == "html").unwrap_or(false) {
                if let Some(stem) = path.file_stem() {
                    names.push(stem.to_string_lossy().into_owned());
                }
            }
        }
        names.sort();
        Ok(names)
    }
}

fn hash_bytes(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}

fn hash_file(path: &Path) -> E2eResult<String> {
    Ok(hash_bytes(&std::fs::read(path)?))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tester(root: &Path, auto_update: bool) -> SnapshotTester {
        SnapshotTester::new(SnapshotConfig {
            baseline_dir: root.join("baselines"),
            actual_dir: root.join("actual"),
            auto_update,
        })
        .unwrap()
    }

    #[test]
    fn missing_baseline_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let err = tester(dir.path(), false).record("empty", "").unwrap_err();
        assert!(matches!(err, E2eError::BaselineNotFound(_)));
    }

    #[test]
    fn auto_update_creates_then_compares() {
        let dir = tempfile::tempdir().unwrap();
        let snapshots = tester(dir.path(), true);

        assert!(snapshots.record("list", "<li>a</li>").unwrap().matches);
        assert!(snapshots.record("list", "<li>a</li>").unwrap().matches);

        let diff = snapshots.record("list", "<li>b</li>").unwrap();
        assert!(!diff.matches);
        assert_ne!(diff.actual_hash, diff.baseline_hash);
    }

    #[test]
    fn update_baseline_promotes_actual() {
        let dir = tempfile::tempdir().unwrap();
        let snapshots = tester(dir.path(), true);
        snapshots.record("list", "old").unwrap();
        snapshots.record("list", "new").unwrap();

        snapshots.update_baseline("list").unwrap();

        assert!(snapshots.record("list", "new").unwrap().matches);
        assert_eq!(snapshots.recorded().unwrap(), vec!["list".to_string()]);
    }
}
