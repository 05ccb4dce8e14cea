//! The headless page against the markup and script the server ships

use std::path::Path;

use notably_common::render::render_note_list;
use notably_common::ui::ControlRole;
use notably_e2e::dom::Selector;
use notably_e2e::{E2eError, HeadlessPage};

fn shipped(file: &str) -> String {
    let path = Path::new(notably_web::config::DEFAULT_STATIC_DIR).join(file);
    std::fs::read_to_string(path).unwrap()
}

fn shipped_page() -> HeadlessPage {
    HeadlessPage::load(&shipped("index.html"), &[shipped("index.js")]).unwrap()
}

#[test]
fn shipped_page_binds_every_control() {
    let page = shipped_page();

    for (selector, role) in [
        (".filter", ControlRole::FilterInput),
        (".note-list", ControlRole::NoteList),
        (".new-note-input", ControlRole::NewNoteInput),
        (".submit-note", ControlRole::SubmitNote),
    ] {
        let target = page.query(selector, 0).unwrap();
        assert_eq!(page.role_of(target), Some(role), "{}", selector);
    }
}

#[test]
fn page_without_submit_control_is_rejected() {
    let html = r#"<input class="filter"><ul class="note-list"></ul><textarea class="new-note-input"></textarea>"#;

    let err = HeadlessPage::load(html, &[shipped("index.js")]).unwrap_err();
    assert!(matches!(
        err,
        E2eError::Page(notably_common::Error::MissingControl { .. })
    ));
    assert!(err.to_string().contains(".submit-note"));
}

#[test]
fn notes_render_inside_the_note_list() {
    let mut page = shipped_page();
    page.type_text(".new-note-input", "<b>bold</b>").unwrap();
    page.click(".submit-note", 0).unwrap();

    let note = page.query(".note-list li.note", 0).unwrap();
    assert_eq!(page.text_of(note), "<b>bold</b>");
    assert!(page.query("main .note input[value=X]", 0).is_ok());
    assert!(page.query("header .note", 0).is_err());
    assert!(page.document().query_all(&Selector::parse("b").unwrap()).is_empty());
}

#[test]
fn shipped_script_agrees_with_the_controller() {
    let mut page = shipped_page();
    for text in ["Go to the store", "Walk the dog", "Go to the store again"] {
        page.type_text(".new-note-input", text).unwrap();
        page.click(".submit-note", 0).unwrap();
    }
    page.type_text(".filter", "store").unwrap();
    page.click(".note input[type=button]", 1).unwrap();
    page.press(".filter", "Backspace").unwrap();

    assert_eq!(page.notes().texts(), vec!["Go to the store", "Go to the store again"]);
    let markup = page.note_list_markup().unwrap();
    assert_eq!(markup, render_note_list(page.notes()));
    assert!(!markup.contains("hidden"));
}
