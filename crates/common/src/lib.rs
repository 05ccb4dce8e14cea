//! Notably Common Library
//!
//! The note model, the note list controller and the page control contract
//! shared by the web server and the acceptance harness.

pub mod controller;
pub mod error;
pub mod note;
pub mod render;
pub mod ui;

// Re-export commonly used types
pub use controller::{NoteList, SubmitOutcome};
pub use error::{Error, Result};
pub use note::{Note, NoteId, Visibility};
pub use ui::{ControlBindings, ControlRole};

/// Notably version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
