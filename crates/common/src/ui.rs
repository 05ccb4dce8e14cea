//! Page control contract
//!
//! Selectors and fixed labels the page markup must provide for the note list
//! controller to be wired up. The browser script, the shipped `index.html`
//! and the headless page all agree on these.

use crate::error::{Error, Result};

/// Filter text input; key-up applies the filter
pub const FILTER_INPUT: &str = ".filter";

/// Container the note entries are appended to
pub const NOTE_LIST: &str = ".note-list";

/// Multi-line new-note input
pub const NEW_NOTE_INPUT: &str = ".new-note-input";

/// Submit control for the new-note input
pub const SUBMIT_NOTE: &str = ".submit-note";

/// Class carried by every rendered note entry
pub const NOTE_CLASS: &str = "note";

/// Label of each note's delete control
pub const DELETE_LABEL: &str = "X";

/// Placeholder shown in the filter input
pub const FILTER_PLACEHOLDER: &str = "search";

/// A control the controller cannot work without
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlRole {
    FilterInput,
    NoteList,
    NewNoteInput,
    SubmitNote,
}

impl ControlRole {
    pub fn selector(&self) -> &'static str {
        match self {
            ControlRole::FilterInput => FILTER_INPUT,
            ControlRole::NoteList => NOTE_LIST,
            ControlRole::NewNoteInput => NEW_NOTE_INPUT,
            ControlRole::SubmitNote => SUBMIT_NOTE,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            ControlRole::FilterInput => "filter input",
            ControlRole::NoteList => "note list",
            ControlRole::NewNoteInput => "new note input",
            ControlRole::SubmitNote => "submit control",
        }
    }

    pub fn missing(&self) -> Error {
        Error::MissingControl {
            role: self.name(),
            selector: self.selector(),
        }
    }
}

/// All controls that must exist before the controller starts
pub const REQUIRED_CONTROLS: [ControlRole; 4] = [
    ControlRole::FilterInput,
    ControlRole::NoteList,
    ControlRole::NewNoteInput,
    ControlRole::SubmitNote,
];

/// Resolved handles for the four required controls
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ControlBindings<H> {
    pub filter_input: H,
    pub note_list: H,
    pub new_note_input: H,
    pub submit_note: H,
}

impl<H: Copy> ControlBindings<H> {
    /// Resolve every required control with `lookup`, failing on the first
    /// one that is absent.
    pub fn resolve(mut lookup: impl FnMut(&'static str) -> Option<H>) -> Result<Self> {
        let mut find = |role: ControlRole| lookup(role.selector()).ok_or_else(|| role.missing());

        Ok(Self {
            filter_input: find(ControlRole::FilterInput)?,
            note_list: find(ControlRole::NoteList)?,
            new_note_input: find(ControlRole::NewNoteInput)?,
            submit_note: find(ControlRole::SubmitNote)?,
        })
    }

    pub fn role_of(&self, handle: H) -> Option<ControlRole>
    where
        H: PartialEq,
    {
        REQUIRED_CONTROLS
            .into_iter()
            .find(|role| self.get(*role) == handle)
    }

    pub fn get(&self, role: ControlRole) -> H {
        match role {
            ControlRole::FilterInput => self.filter_input,
            ControlRole::NoteList => self.note_list,
            ControlRole::NewNoteInput => self.new_note_input,
            ControlRole::SubmitNote => self.submit_note,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_all_controls() {
        let bindings = ControlBindings::resolve(|sel| {
            REQUIRED_CONTROLS
                .iter()
                .position(|r| r.selector() == sel)
        })
        .unwrap();

        assert_eq!(bindings.filter_input, 0);
        assert_eq!(bindings.submit_note, 3);
        assert_eq!(bindings.role_of(1), Some(ControlRole::NoteList));
        assert_eq!(bindings.role_of(7), None);
    }

    #[test]
    fn reports_first_missing_control() {
        let err = ControlBindings::<usize>::resolve(|sel| (sel != NEW_NOTE_INPUT).then_some(0))
            .unwrap_err();

        match err {
            Error::MissingControl { selector, .. } => assert_eq!(selector, NEW_NOTE_INPUT),
            other => panic!("unexpected error: {other}"),
        }
    }
}
