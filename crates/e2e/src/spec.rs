//! Declarative YAML scenario specification

use serde::{Deserialize, Serialize};
use std::path::Path;

use notably_common::ui;

use crate::error::{E2eError, E2eResult};

/// A complete scenario parsed from YAML
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioSpec {
    /// Unique name for this scenario
    pub name: String,

    /// Human-readable description
    #[serde(default)]
    pub description: String,

    /// Tags for filtering scenarios
    #[serde(default)]
    pub tags: Vec<String>,

    /// Notes typed and submitted right after every navigation
    #[serde(default)]
    pub seed_notes: Vec<String>,

    /// Steps to execute in order
    pub steps: Vec<TestStep>,
}

/// A single step in a scenario
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum TestStep {
    /// Load a page (relative to base)
    Navigate {
        url: String,
    },

    /// Type text one key at a time, firing key-up after each key
    Type {
        selector: String,
        text: String,
    },

    /// Replace a field's value, firing a single key-up
    Fill {
        selector: String,
        value: String,
    },

    /// Press a key in a field
    Press {
        selector: String,
        key: String,
    },

    /// Click an element
    Click {
        selector: String,
        #[serde(default)]
        index: usize,
    },

    /// Assert something about the elements matching a selector
    Assert {
        selector: String,
        #[serde(default)]
        index: usize,
        #[serde(default)]
        count: Option<usize>,
        #[serde(default)]
        visible_count: Option<usize>,
        #[serde(default)]
        text: Option<String>,
        #[serde(default)]
        text_contains: Option<String>,
        #[serde(default)]
        texts: Option<Vec<String>>,
        #[serde(default)]
        value: Option<String>,
        #[serde(default)]
        attribute: Option<AttributeAssertion>,
        #[serde(default)]
        hidden: Option<bool>,
    },

    /// Record the rendered note list markup
    Snapshot {
        name: String,
    },

    /// Log a message (for debugging)
    Log {
        message: String,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttributeAssertion {
    pub name: String,
    pub value: Option<String>,
    #[serde(default)]
    pub contains: Option<String>,
}

impl TestStep {
    /// Short label used in results and logs
    pub fn name(&self) -> String {
        match self {
            TestStep::Navigate { url } => format!("navigate:{}", url),
            TestStep::Type { selector, .. } => format!("type:{}", selector),
            TestStep::Fill { selector, .. } => format!("fill:{}", selector),
            TestStep::Press { key, .. } => format!("press:{}", key),
            TestStep::Click { selector, index } => format!("click:{}[{}]", selector, index),
            TestStep::Assert { selector, .. } => format!("assert:{}", selector),
            TestStep::Snapshot { name } => format!("snapshot:{}", name),
            TestStep::Log { message } => {
                format!("log:{}", message.chars().take(30).collect::<String>())
            }
        }
    }
}

impl ScenarioSpec {
    /// Parse a scenario from YAML string
    pub fn from_yaml(yaml: &str) -> E2eResult<Self> {
        let spec: Self = serde_yaml::from_str(yaml)?;
        if spec.steps.is_empty() {
            return Err(E2eError::SpecParse(format!("scenario '{}' has no steps", spec.name)));
        }
        Ok(spec)
    }

    /// Parse a scenario from a YAML file
    pub fn from_file(path: &Path) -> E2eResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
            .map_err(|e| E2eError::SpecParse(format!("{}: {}", path.display(), e)))
    }

    /// Load all scenarios from a directory, sorted by name
    pub fn load_all(dir: &Path) -> E2eResult<Vec<Self>> {
        let mut specs = Vec::new();

        for entry in walkdir::WalkDir::new(dir)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| {
                e.path()
                    .extension()
                    .map(|ext| ext == "yaml" || ext == "yml")
                    .unwrap_or(false)
            })
        {
            let spec = Self::from_file(entry.path())?;
            specs.push(spec);
        }

        specs.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(specs)
    }

    /// Filter scenarios by tag
    pub fn filter_by_tag<'a>(specs: &'a [Self], tag: &str) -> Vec<&'a Self> {
        specs.iter().filter(|s| s.tags.iter().any(|t| t == tag)).collect()
    }

    /// Steps with the seed notes typed and submitted after each navigation
    pub fn expanded_steps(&self) -> Vec<TestStep> {
        let mut steps = Vec::with_capacity(self.steps.len() + self.seed_notes.len() * 2);

        for step in &self.steps {
            let is_navigate = matches!(step, TestStep::Navigate { .. });
            steps.push(step.clone());
            if !is_navigate {
                continue;
            }
            for note in &self.seed_notes {
                steps.push(TestStep::Type {
                    selector: ui::NEW_NOTE_INPUT.to_string(),
                    text: note.clone(),
                });
                steps.push(TestStep::Click {
                    selector: ui::SUBMIT_NOTE.to_string(),
                    index: 0,
                });
            }
        }

        steps
    }
}
