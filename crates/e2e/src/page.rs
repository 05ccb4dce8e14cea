//! Headless page
//!
//! Runs the page's own scripts against the served document in an embedded
//! [`ScriptRuntime`] and drives them with UI events. Every selector, text
//! and value read comes from the live document as the scripts left it.
//!
//! A [`NoteList`] follows the same events the way the controller defines
//! them: key-up on the filter input applies the filter, a click on the
//! submit control submits the new-note field, a click on a note's delete
//! control deletes that note. After every event the note container's
//! markup must equal the controller's rendering and the new-note field
//! must hold what the controller left in it, or the event fails with
//! [`E2eError::PageDiverged`].

use std::collections::HashMap;

use tracing::debug;

use notably_common::render::render_note_list;
use notably_common::ui::{ControlRole, NOTE_CLASS};
use notably_common::{ControlBindings, NoteList};

use crate::dom::{Document, Selector};
use crate::error::{E2eError, E2eResult};
use crate::script::ScriptRuntime;

/// What the controller expects a click to do
enum ClickEffect {
    /// Submit, with the new-note field as it was before the click
    Submit(String),
    /// Delete the note at this display position
    Delete(usize),
    None,
}

/// A loaded page with its scripts running
#[derive(Debug)]
pub struct HeadlessPage {
    runtime: ScriptRuntime,
    document: Document,
    values: HashMap<usize, String>,
    controls: ControlBindings<usize>,
    notes: NoteList,
}

impl HeadlessPage {
    /// Load a document into a fresh runtime and run `scripts` in order.
    ///
    /// Fails with [`notably_common::Error::MissingControl`] when any of the
    /// four required controls is absent, before any script runs.
    pub fn attach(document: Document, scripts: &[String]) -> E2eResult<Self> {
        let controls = bind_controls(&document)?;

        let mut runtime = ScriptRuntime::new()?;
        runtime.load(document.tree())?;
        for script in scripts {
            runtime.exec(script)?;
        }

        let mut page = Self {
            runtime,
            document,
            values: HashMap::new(),
            controls,
            notes: NoteList::new(),
        };
        page.refresh()?;
        page.check_note_list()?;

        debug!(
            "Loaded page with {} elements and {} script(s)",
            page.document.len(),
            scripts.len()
        );
        Ok(page)
    }

    /// Parse `html` and attach
    pub fn load(html: &str, scripts: &[String]) -> E2eResult<Self> {
        Self::attach(Document::parse(html), scripts)
    }

    /// The controller state the page is checked against
    pub fn notes(&self) -> &NoteList {
        &self.notes
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    /// Live markup of the note container
    pub fn note_list_markup(&mut self) -> E2eResult<String> {
        self.runtime.inner_html(self.controls.note_list)
    }

    /// All elements matching `selector`, in document order
    pub fn query_all(&self, selector: &str) -> E2eResult<Vec<usize>> {
        let selector = Selector::parse(selector)?;
        Ok(self.document.query_all(&selector))
    }

    /// The `index`-th match of `selector`
    pub fn query(&self, selector: &str, index: usize) -> E2eResult<usize> {
        self.query_all(selector)?
            .get(index)
            .copied()
            .ok_or_else(|| E2eError::ElementNotFound(format!("{} [{}]", selector, index)))
    }

    /// Type `text` into a field one key at a time
    pub fn type_text(&mut self, selector: &str, text: &str) -> E2eResult<()> {
        let idx = self.field(selector)?;
        self.runtime.type_text(idx, text)?;
        self.after_key_up(idx)
    }

    /// Replace a field's value and fire one key-up
    pub fn fill(&mut self, selector: &str, value: &str) -> E2eResult<()> {
        let idx = self.field(selector)?;
        self.runtime.fill(idx, value)?;
        self.after_key_up(idx)
    }

    /// Press a named key in a field. `Backspace` deletes the last character;
    /// single characters are typed; other keys only fire key-up.
    pub fn press(&mut self, selector: &str, key: &str) -> E2eResult<()> {
        let idx = self.field(selector)?;
        self.runtime.press(idx, key)?;
        self.after_key_up(idx)
    }

    /// Click the `index`-th match of `selector`
    pub fn click(&mut self, selector: &str, index: usize) -> E2eResult<()> {
        let idx = self.query(selector, index)?;
        let effect = self.click_effect(idx);

        self.runtime.click(idx)?;
        self.refresh()?;

        match effect {
            ClickEffect::Submit(mut draft) => {
                let outcome = self.notes.submit_note(&mut draft);
                debug!("Submit clicked: {:?}", outcome);
                let field = self.value_of(self.controls.new_note_input).unwrap_or_default();
                if field != draft {
                    return Err(E2eError::PageDiverged(format!(
                        "new-note field holds {:?} after submit, controller left {:?}",
                        field, draft
                    )));
                }
            }
            ClickEffect::Delete(position) => {
                if let Some(id) = self.notes.nth(position).map(|n| n.id()) {
                    self.notes.delete_note(id);
                    debug!("Deleted {}", id);
                }
            }
            ClickEffect::None => {}
        }

        self.check_note_list()
    }

    fn click_effect(&self, idx: usize) -> ClickEffect {
        if idx == self.controls.submit_note {
            let draft = self.value_of(self.controls.new_note_input).unwrap_or_default();
            return ClickEffect::Submit(draft);
        }
        match self.delete_control_position(idx) {
            Some(position) => ClickEffect::Delete(position),
            None => ClickEffect::None,
        }
    }

    /// Display position of the note whose delete control is `idx`
    fn delete_control_position(&self, idx: usize) -> Option<usize> {
        let el = self.document.get(idx)?;
        if el.tag() != "input" || el.attr("type") != Some("button") {
            return None;
        }
        let entry = el.parent()?;
        self.note_entries().iter().position(|&e| e == entry)
    }

    /// `li.note` children of the note container, in display order
    fn note_entries(&self) -> Vec<usize> {
        let list = self.controls.note_list;
        self.document
            .elements()
            .iter()
            .enumerate()
            .filter(|(_, el)| {
                el.parent() == Some(list) && el.tag() == "li" && el.has_class(NOTE_CLASS)
            })
            .map(|(idx, _)| idx)
            .collect()
    }

    fn after_key_up(&mut self, idx: usize) -> E2eResult<()> {
        let on_filter = idx == self.controls.filter_input;
        self.refresh()?;
        if on_filter {
            let query = self.value_of(self.controls.filter_input).unwrap_or_default();
            let visible = self.notes.apply_filter(&query);
            debug!("Filter {:?} leaves {} note(s) visible", query, visible);
        }
        self.check_note_list()
    }

    /// Re-read the live document after scripts ran
    fn refresh(&mut self) -> E2eResult<()> {
        let state = self.runtime.state()?;
        self.document = Document::from_tree(state.tree);
        self.values = state.values.into_iter().collect();
        self.controls = bind_controls(&self.document)?;
        self.runtime.forward_console()?;
        Ok(())
    }

    fn check_note_list(&mut self) -> E2eResult<()> {
        let actual = self.note_list_markup()?;
        let expected = render_note_list(&self.notes);
        if actual != expected {
            return Err(E2eError::PageDiverged(format!(
                "note list is {:?}, controller renders {:?}",
                actual, expected
            )));
        }
        Ok(())
    }

    fn field(&self, selector: &str) -> E2eResult<usize> {
        let idx = self.query(selector, 0)?;
        if self.values.contains_key(&idx) {
            Ok(idx)
        } else {
            Err(E2eError::StepFailed {
                step: format!("input:{}", selector),
                reason: "element is not a text field".to_string(),
            })
        }
    }

    /// Current value of a form field, or the `value` attribute otherwise
    pub fn value_of(&self, idx: usize) -> Option<String> {
        self.values
            .get(&idx)
            .cloned()
            .or_else(|| self.document.get(idx)?.attr("value").map(str::to_string))
    }

    /// Text as the user sees it
    pub fn text_of(&self, idx: usize) -> String {
        self.document.get(idx).map(|e| e.text()).unwrap_or_default()
    }

    pub fn attribute(&self, idx: usize, name: &str) -> Option<String> {
        if name == "value" {
            return self.value_of(idx);
        }
        self.document.get(idx)?.attr(name).map(str::to_string)
    }

    /// The element's own `hidden` state
    pub fn is_hidden(&self, idx: usize) -> bool {
        self.document
            .get(idx)
            .map(|e| e.attr("hidden").is_some())
            .unwrap_or(true)
    }

    /// Whether neither the element nor any ancestor is hidden
    pub fn is_rendered(&self, idx: usize) -> bool {
        self.document
            .chain(idx)
            .into_iter()
            .all(|i| !self.is_hidden(i))
    }

    pub fn role_of(&self, idx: usize) -> Option<ControlRole> {
        self.controls.role_of(idx)
    }
}

fn bind_controls(document: &Document) -> notably_common::Result<ControlBindings<usize>> {
    ControlBindings::resolve(|selector| {
        let selector = Selector::parse(selector).ok()?;
        document.query(&selector)
    })
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    use std::path::Path;

    pub(crate) const PAGE: &str = r#"
<header><h1 id="app-title">Notably</h1><input class="filter" placeholder="search"></header>
<ul class="note-list"></ul>
<div class="container new-note-container">
  <h2>Add new note:</h2>
  <textarea class="new-note-input"></textarea>
  <button class="submit-note">Add</button>
</div>
<footer>end</footer>"#;

    /// The browser script the server ships
    pub(crate) fn shipped_script() -> String {
        let path = Path::new(notably_web::config::DEFAULT_STATIC_DIR).join("index.js");
        std::fs::read_to_string(path).unwrap()
    }

    /// The shipped script with `from` replaced, failing if `from` is absent
    fn altered_script(from: &str, to: &str) -> String {
        let script = shipped_script();
        assert!(script.contains(from), "shipped script no longer contains {:?}", from);
        script.replace(from, to)
    }

    fn seed(page: &mut HeadlessPage) {
        for note in ["Go to the store", "Go to the store again"] {
            page.type_text(".new-note-input", note).unwrap();
            page.click(".submit-note", 0).unwrap();
        }
    }

    fn seeded() -> HeadlessPage {
        let mut page = HeadlessPage::load(PAGE, &[shipped_script()]).unwrap();
        seed(&mut page);
        page
    }

    #[test]
    fn missing_control_is_fatal() {
        let err = HeadlessPage::load("<ul class=\"note-list\"></ul>", &[shipped_script()]).unwrap_err();
        assert!(matches!(
            err,
            E2eError::Page(notably_common::Error::MissingControl { .. })
        ));
    }

    #[test]
    fn script_builds_note_entries_inside_the_note_list() {
        let mut page = seeded();
        let notes = page.query_all(".note-list .note").unwrap();
        assert_eq!(notes.len(), 2);
        assert_eq!(page.text_of(notes[0]), "Go to the store");

        let delete = page.query(".note input[type=button]", 1).unwrap();
        assert_eq!(page.value_of(delete).as_deref(), Some("X"));
        assert_eq!(
            page.note_list_markup().unwrap(),
            render_note_list(page.notes())
        );
    }

    #[test]
    fn submit_clears_field_and_blank_submit_is_ignored() {
        let mut page = seeded();
        let field = page.query(".new-note-input", 0).unwrap();
        assert_eq!(page.value_of(field).as_deref(), Some(""));

        page.click(".submit-note", 0).unwrap();
        assert_eq!(page.notes().len(), 2);
        assert_eq!(page.query_all(".note").unwrap().len(), 2);
    }

    #[test]
    fn delete_control_removes_its_note() {
        let mut page = seeded();
        page.click(".note input[type=button]", 0).unwrap();

        let notes = page.query_all(".note").unwrap();
        assert_eq!(notes.len(), 1);
        assert_eq!(page.text_of(notes[0]), "Go to the store again");
        assert_eq!(page.notes().len(), 1);
    }

    #[test]
    fn typing_in_filter_hides_per_keystroke() {
        let mut page = seeded();
        page.type_text(".filter", "again").unwrap();

        let visible: Vec<_> = page
            .query_all(".note")
            .unwrap()
            .into_iter()
            .filter(|&idx| page.is_rendered(idx))
            .collect();
        assert_eq!(visible.len(), 1);

        for _ in 0.."again".len() {
            page.press(".filter", "Backspace").unwrap();
        }
        assert_eq!(page.notes().visible_count(), 2);
        assert!(page.query(".note[hidden]", 0).is_err());
    }

    #[test]
    fn note_hidden_attribute_follows_filter() {
        let mut page = seeded();
        page.fill(".filter", "bird").unwrap();

        let first = page.query(".note", 0).unwrap();
        assert!(page.is_hidden(first));
        assert_eq!(page.attribute(first, "hidden").as_deref(), Some(""));
        assert!(page.query(".note[hidden]", 1).is_ok());
    }

    #[test]
    fn typing_into_non_field_fails() {
        let mut page = seeded();
        assert!(page.type_text("h2", "x").is_err());
        assert!(matches!(
            page.click(".missing", 0),
            Err(E2eError::ElementNotFound(_))
        ));
    }

    #[test]
    fn inverted_filter_in_script_is_caught() {
        let script = altered_script(
            "note.hidden = !note.firstChild.nodeValue.includes(query);",
            "note.hidden = note.firstChild.nodeValue.includes(query);",
        );
        let mut page = HeadlessPage::load(PAGE, &[script]).unwrap();
        seed(&mut page);

        let err = page.fill(".filter", "again").unwrap_err();
        assert!(matches!(err, E2eError::PageDiverged(_)), "{}", err);
    }

    #[test]
    fn script_that_keeps_the_draft_is_caught() {
        let script = altered_script("controls.newNoteInput.value = '';", "");
        let mut page = HeadlessPage::load(PAGE, &[script]).unwrap();
        page.type_text(".new-note-input", "Walk the dog").unwrap();

        let err = page.click(".submit-note", 0).unwrap_err();
        assert!(matches!(err, E2eError::PageDiverged(_)), "{}", err);
    }

    #[test]
    fn script_that_deletes_the_wrong_note_is_caught() {
        let script = altered_script(
            "deleteButton.addEventListener('click', () => li.remove());",
            "deleteButton.addEventListener('click', () => controls.noteList.lastChild.remove());",
        );
        let mut page = HeadlessPage::load(PAGE, &[script]).unwrap();
        seed(&mut page);

        let err = page.click(".note input[type=button]", 0).unwrap_err();
        assert!(matches!(err, E2eError::PageDiverged(_)), "{}", err);
    }

    #[test]
    fn page_without_scripts_diverges_on_submit() {
        let mut page = HeadlessPage::load(PAGE, &[]).unwrap();
        page.type_text(".new-note-input", "Walk the dog").unwrap();
        assert!(matches!(
            page.click(".submit-note", 0),
            Err(E2eError::PageDiverged(_))
        ));
    }
}
