//! Embedded script runtime for the headless page
//!
//! Page scripts run in a `boa_engine` context preloaded with a small DOM
//! (`dom_shim.js`). The harness drives it with generated calls and reads
//! results back as JSON.

use std::fmt;

use boa_engine::{Context, JsError, Source};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::dom::TreeNode;
use crate::error::{E2eError, E2eResult};

const DOM_SHIM: &str = include_str!("dom_shim.js");

/// A console line written by a page script
#[derive(Debug, Clone, Deserialize)]
pub struct ConsoleLine {
    pub level: String,
    pub message: String,
}

/// Live page state: the node tree and the current value of every form field
#[derive(Debug, Clone, Deserialize)]
pub struct LiveState {
    pub tree: Vec<TreeNode>,
    /// (element index in document order, value)
    pub values: Vec<(usize, String)>,
}

pub struct ScriptRuntime {
    context: Context,
}

impl fmt::Debug for ScriptRuntime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScriptRuntime").finish_non_exhaustive()
    }
}

impl ScriptRuntime {
    /// Create a runtime with an empty document
    pub fn new() -> E2eResult<Self> {
        let mut runtime = Self {
            context: Context::default(),
        };
        runtime.exec(DOM_SHIM)?;
        Ok(runtime)
    }

    /// Replace the document with `tree`
    pub fn load(&mut self, tree: &[TreeNode]) -> E2eResult<()> {
        self.exec(&format!("__harness.load({})", serde_json::to_string(tree)?))
    }

    /// Run a script for its side effects
    pub fn exec(&mut self, code: &str) -> E2eResult<()> {
        self.context
            .eval(Source::from_bytes(code))
            .map(|_| ())
            .map_err(script_error)
    }

    /// Evaluate `expr` and decode its value
    pub fn call<T: DeserializeOwned>(&mut self, expr: &str) -> E2eResult<T> {
        let code = format!("JSON.stringify({})", expr);
        let value = self
            .context
            .eval(Source::from_bytes(&code))
            .map_err(script_error)?;
        let json = value
            .to_string(&mut self.context)
            .map_err(script_error)?
            .to_std_string_escaped();
        Ok(serde_json::from_str(&json)?)
    }

    pub fn state(&mut self) -> E2eResult<LiveState> {
        self.call("__harness.state()")
    }

    pub fn inner_html(&mut self, idx: usize) -> E2eResult<String> {
        self.call(&format!("__harness.innerHTML({})", idx))
    }

    pub fn click(&mut self, idx: usize) -> E2eResult<()> {
        self.exec(&format!("__harness.click({})", idx))
    }

    /// Append `text` one character at a time, with a key-up per character
    pub fn type_text(&mut self, idx: usize, text: &str) -> E2eResult<()> {
        self.exec(&format!("__harness.type({}, {})", idx, js_string(text)?))
    }

    /// Replace the value, then a single key-up
    pub fn fill(&mut self, idx: usize, value: &str) -> E2eResult<()> {
        self.exec(&format!("__harness.fill({}, {})", idx, js_string(value)?))
    }

    pub fn press(&mut self, idx: usize, key: &str) -> E2eResult<()> {
        self.exec(&format!("__harness.press({}, {})", idx, js_string(key)?))
    }

    /// Forward console output written since the last call to tracing
    pub fn forward_console(&mut self) -> E2eResult<Vec<ConsoleLine>> {
        let lines: Vec<ConsoleLine> = self.call("__harness.drainConsole()")?;
        for line in &lines {
            match line.level.as_str() {
                "error" | "warn" => warn!("page console.{}: {}", line.level, line.message),
                _ => debug!("page console.{}: {}", line.level, line.message),
            }
        }
        Ok(lines)
    }
}

fn js_string<T: Serialize + ?Sized>(value: &T) -> E2eResult<String> {
    Ok(serde_json::to_string(value)?)
}

fn script_error(err: JsError) -> E2eError {
    E2eError::Script(err.to_string())
}
