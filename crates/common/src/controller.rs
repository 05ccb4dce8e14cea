//! Note list controller
//!
//! Owns the ordered list of notes for one session and handles the three
//! user events the page produces:
//!
//! - submit: [`NoteList::submit_note`]
//! - delete: [`NoteList::delete_note`]
//! - filter key-up: [`NoteList::apply_filter`]
//!
//! Every handler runs to completion synchronously and none of them can fail.
//! The list is a plain owned value; each page owns its own instance.

use tracing::debug;

use crate::note::{Note, NoteId, Visibility};

/// Result of a submit event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// A note was appended and the draft field cleared
    Created(NoteId),
    /// The draft was empty; nothing changed
    IgnoredEmpty,
}

impl SubmitOutcome {
    pub fn created(&self) -> Option<NoteId> {
        match self {
            SubmitOutcome::Created(id) => Some(*id),
            SubmitOutcome::IgnoredEmpty => None,
        }
    }
}

/// Ordered, in-memory list of notes (newest last)
#[derive(Debug, Default, Clone)]
pub struct NoteList {
    notes: Vec<Note>,
    next_id: u64,
}

impl NoteList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Handle the submit control.
    ///
    /// `draft` is the new-note field. An empty draft is left untouched; any
    /// other value becomes a new visible note at the end of the list, taken
    /// verbatim, and the field is cleared.
    pub fn submit_note(&mut self, draft: &mut String) -> SubmitOutcome {
        if draft.is_empty() {
            debug!("Ignoring submit of empty note");
            return SubmitOutcome::IgnoredEmpty;
        }

        let id = self.allocate_id();
        let text = std::mem::take(draft);
        debug!(note = %id, len = text.len(), "Created note");
        self.notes.push(Note::new(id, text));

        SubmitOutcome::Created(id)
    }

    /// Handle a delete control.
    ///
    /// Returns the removed note, or `None` if `id` no longer refers to a note
    /// in this list.
    pub fn delete_note(&mut self, id: NoteId) -> Option<Note> {
        let Some(pos) = self.position(id) else {
            debug!(note = %id, "Delete for unknown note ignored");
            return None;
        };

        let removed = self.notes.remove(pos);
        debug!(note = %id, position = pos, remaining = self.notes.len(), "Deleted note");
        Some(removed)
    }

    /// Handle a filter key-up with the full current filter text.
    ///
    /// Recomputes visibility of every note from scratch and returns how many
    /// are visible afterwards. Membership and order are never touched.
    pub fn apply_filter(&mut self, query: &str) -> usize {
        let mut visible = 0;
        for note in &mut self.notes {
            let visibility = Visibility::for_match(note.text(), query);
            if visibility == Visibility::Visible {
                visible += 1;
            }
            note.set_visibility(visibility);
        }
        debug!(query, visible, total = self.notes.len(), "Applied filter");
        visible
    }

    pub fn len(&self) -> usize {
        self.notes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.notes.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Note> {
        self.notes.iter()
    }

    pub fn get(&self, id: NoteId) -> Option<&Note> {
        self.notes.iter().find(|n| n.id() == id)
    }

    /// Current zero-based display position of a note
    pub fn position(&self, id: NoteId) -> Option<usize> {
        self.notes.iter().position(|n| n.id() == id)
    }

    /// Note at a display position
    pub fn nth(&self, index: usize) -> Option<&Note> {
        self.notes.get(index)
    }

    pub fn visible(&self) -> impl Iterator<Item = &Note> {
        self.notes.iter().filter(|n| n.is_visible())
    }

    pub fn visible_count(&self) -> usize {
        self.visible().count()
    }

    /// Texts of all notes in display order
    pub fn texts(&self) -> Vec<&str> {
        self.notes.iter().map(Note::text).collect()
    }

    fn allocate_id(&mut self) -> NoteId {
        self.next_id += 1;
        NoteId::new(self.next_id)
    }
}

impl<'a> IntoIterator for &'a NoteList {
    type Item = &'a Note;
    type IntoIter = std::slice::Iter<'a, Note>;

    fn into_iter(self) -> Self::IntoIter {
        self.notes.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use test_case::test_case;

    const SEED_1: &str = "Go to the store";
    const SEED_2: &str = "Go to the store again";

    fn seeded() -> NoteList {
        let mut list = NoteList::new();
        for text in [SEED_1, SEED_2] {
            let mut draft = text.to_string();
            list.submit_note(&mut draft);
        }
        list
    }

    #[test]
    fn submit_appends_and_clears_draft() {
        let mut list = seeded();
        let mut draft = "Walk the dog".to_string();

        let outcome = list.submit_note(&mut draft);

        let id = outcome.created().expect("note should be created");
        assert!(draft.is_empty());
        assert_eq!(list.len(), 3);
        assert_eq!(list.position(id), Some(2));
        assert_eq!(list.nth(2).map(Note::text), Some("Walk the dog"));
    }

    #[test]
    fn submit_empty_is_a_noop() {
        let mut list = seeded();
        let mut draft = String::new();

        assert_eq!(list.submit_note(&mut draft), SubmitOutcome::IgnoredEmpty);
        assert_eq!(list.len(), 2);
        assert!(draft.is_empty());
    }

    #[test]
    fn submit_keeps_text_verbatim() {
        let mut list = NoteList::new();
        let mut draft = "  <b>bold</b>\nsecond line ".to_string();
        list.submit_note(&mut draft);
        assert_eq!(list.texts(), vec!["  <b>bold</b>\nsecond line "]);
    }

    #[test]
    fn whitespace_only_draft_is_a_note() {
        let mut list = NoteList::new();
        let mut draft = "   ".to_string();
        assert!(list.submit_note(&mut draft).created().is_some());
        assert_eq!(list.len(), 1);
    }

    #[test]
    fn duplicates_are_kept() {
        let mut list = NoteList::new();
        for _ in 0..2 {
            let mut draft = "same".to_string();
            list.submit_note(&mut draft);
        }
        assert_eq!(list.texts(), vec!["same", "same"]);
    }

    #[test]
    fn delete_first_shifts_next_up() {
        let mut list = seeded();
        let first = list.nth(0).map(Note::id).unwrap();

        let removed = list.delete_note(first).unwrap();

        assert_eq!(removed.text(), SEED_1);
        assert_eq!(list.len(), 1);
        assert_eq!(list.nth(0).map(Note::text), Some(SEED_2));
    }

    #[test]
    fn delete_removes_only_the_bound_duplicate() {
        let mut list = NoteList::new();
        let mut ids = Vec::new();
        for _ in 0..3 {
            let mut draft = "dup".to_string();
            ids.push(list.submit_note(&mut draft).created().unwrap());
        }

        list.delete_note(ids[1]);

        assert_eq!(list.len(), 2);
        assert!(list.get(ids[0]).is_some());
        assert!(list.get(ids[1]).is_none());
        assert!(list.get(ids[2]).is_some());
    }

    #[test]
    fn repeated_delete_is_a_noop() {
        let mut list = seeded();
        let first = list.nth(0).map(Note::id).unwrap();

        assert!(list.delete_note(first).is_some());
        assert!(list.delete_note(first).is_none());
        assert_eq!(list.len(), 1);
    }

    #[test]
    fn ids_are_not_reused_after_delete() {
        let mut list = NoteList::new();
        let mut draft = "a".to_string();
        let first = list.submit_note(&mut draft).created().unwrap();
        list.delete_note(first);

        let mut draft = "b".to_string();
        let second = list.submit_note(&mut draft).created().unwrap();

        assert_ne!(first, second);
        assert!(list.delete_note(first).is_none());
        assert_eq!(list.len(), 1);
    }

    #[test_case("store", 2 ; "both seeds contain store")]
    #[test_case("again", 1 ; "only second seed contains again")]
    #[test_case("bird", 0 ; "no seed contains bird")]
    #[test_case("", 2 ; "empty query shows all")]
    #[test_case("Store", 0 ; "match is case sensitive")]
    fn filter_seeded_notes(query: &str, expected: usize) {
        let mut list = seeded();
        assert_eq!(list.apply_filter(query), expected);
        assert_eq!(list.visible_count(), expected);
    }

    #[test]
    fn filter_hides_without_removing() {
        let mut list = seeded();
        list.apply_filter("again");

        assert_eq!(list.texts(), vec![SEED_1, SEED_2]);
        assert!(!list.nth(0).unwrap().is_visible());
        assert!(list.nth(1).unwrap().is_visible());
    }

    #[test]
    fn clearing_filter_restores_all() {
        let mut list = seeded();
        list.apply_filter("bird");
        assert_eq!(list.visible_count(), 0);

        list.apply_filter("");
        assert_eq!(list.visible_count(), 2);
    }

    #[test]
    fn new_note_is_visible_under_active_filter() {
        let mut list = seeded();
        list.apply_filter("bird");

        let mut draft = "Walk the dog".to_string();
        let id = list.submit_note(&mut draft).created().unwrap();

        assert!(list.get(id).unwrap().is_visible());
        assert_eq!(list.visible_count(), 1);
    }

    proptest! {
        #[test]
        fn visible_iff_text_contains_query(
            texts in proptest::collection::vec("[a-cA-C ]{1,8}", 0..8),
            query in "[a-cA-C ]{0,3}",
        ) {
            let mut list = NoteList::new();
            for text in &texts {
                let mut draft = text.clone();
                list.submit_note(&mut draft);
            }

            let visible = list.apply_filter(&query);

            prop_assert_eq!(list.texts(), texts.iter().map(String::as_str).collect::<Vec<_>>());
            for note in &list {
                prop_assert_eq!(note.is_visible(), note.text().contains(query.as_str()));
            }
            prop_assert_eq!(visible, texts.iter().filter(|t| t.contains(query.as_str())).count());
        }

        #[test]
        fn delete_removes_exactly_one(
            texts in proptest::collection::vec("[a-z]{1,4}", 1..8),
            pick in any::<prop::sample::Index>(),
        ) {
            let mut list = NoteList::new();
            for text in &texts {
                let mut draft = text.clone();
                list.submit_note(&mut draft);
            }
            let index = pick.index(texts.len());
            let target = list.nth(index).map(Note::id).unwrap();

            list.delete_note(target);

            let mut expected: Vec<&str> = texts.iter().map(String::as_str).collect();
            expected.remove(index);
            prop_assert_eq!(list.len(), texts.len() - 1);
            prop_assert!(list.get(target).is_none());
            prop_assert_eq!(list.texts(), expected);
        }
    }
}
