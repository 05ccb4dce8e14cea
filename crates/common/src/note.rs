//! Note records

use std::fmt;

/// Session-local handle binding a delete control to one note instance.
///
/// Handles are allocated in increasing order by a single [`NoteList`] and are
/// never reused, so a stale handle can never delete a different note.
///
/// [`NoteList`]: crate::controller::NoteList
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NoteId(u64);

impl NoteId {
    pub(crate) fn new(raw: u64) -> Self {
        Self(raw)
    }
}

impl fmt::Display for NoteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "note-{}", self.0)
    }
}

/// Whether a note is currently shown
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Visibility {
    #[default]
    Visible,
    Hidden,
}

impl Visibility {
    /// Visibility of a note whose text is tested against `query`.
    pub fn for_match(text: &str, query: &str) -> Self {
        if text.contains(query) {
            Visibility::Visible
        } else {
            Visibility::Hidden
        }
    }
}

/// A single note: literal user text plus its view state
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Note {
    id: NoteId,
    text: String,
    visibility: Visibility,
}

impl Note {
    pub(crate) fn new(id: NoteId, text: String) -> Self {
        Self {
            id,
            text,
            visibility: Visibility::Visible,
        }
    }

    pub fn id(&self) -> NoteId {
        self.id
    }

    /// The text exactly as it was submitted
    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn visibility(&self) -> Visibility {
        self.visibility
    }

    pub fn is_visible(&self) -> bool {
        self.visibility == Visibility::Visible
    }

    pub(crate) fn set_visibility(&mut self, visibility: Visibility) {
        self.visibility = visibility;
    }
}
