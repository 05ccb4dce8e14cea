//! Note markup rendering
//!
//! Produces the children of the note container exactly as a browser
//! serializes what the page script builds, so the live page can be checked
//! against the controller and snapshotted.

use std::fmt::Write;

use crate::controller::NoteList;
use crate::note::Note;
use crate::ui::{DELETE_LABEL, NOTE_CLASS};

/// Render every note entry, in display order, with nothing between entries.
pub fn render_note_list(list: &NoteList) -> String {
    let mut out = String::new();
    for note in list {
        render_note_into(&mut out, note);
    }
    out
}

fn render_note_into(out: &mut String, note: &Note) {
    let hidden = if note.is_visible() { "" } else { r#" hidden="""# };
    // Writing into a String cannot fail.
    let _ = write!(
        out,
        r#"<li class="{NOTE_CLASS}"{hidden}>{}<input type="button" value="{DELETE_LABEL}"></li>"#,
        escape_text(note.text())
    );
}

/// Escape element content the way HTML serialization does: `&`, `<`, `>`
/// and no-break space. Quotes stay literal.
pub fn escape_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '\u{a0}' => out.push_str("&nbsp;"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn list_of(texts: &[&str]) -> NoteList {
        let mut list = NoteList::new();
        for text in texts {
            let mut draft = text.to_string();
            list.submit_note(&mut draft);
        }
        list
    }

    #[test]
    fn renders_text_then_delete_control() {
        let list = list_of(&["Walk the dog", "Feed the cat"]);
        assert_eq!(
            render_note_list(&list),
            concat!(
                r#"<li class="note">Walk the dog<input type="button" value="X"></li>"#,
                r#"<li class="note">Feed the cat<input type="button" value="X"></li>"#,
            )
        );
    }

    #[test]
    fn markup_in_text_is_escaped() {
        let list = list_of(&["<script>alert('x')</script> & \"co\"\u{a0}"]);
        let html = render_note_list(&list);
        assert!(!html.contains("<script>"));
        assert!(html.contains(r#"&lt;script&gt;alert('x')&lt;/script&gt; &amp; "co"&nbsp;"#));
    }

    #[test]
    fn hidden_notes_carry_hidden_attribute() {
        let mut list = list_of(&["Go to the store", "Go to the store again"]);
        list.apply_filter("again");

        let html = render_note_list(&list);
        let entries: Vec<&str> = html.split_inclusive("</li>").collect();
        assert_eq!(entries.len(), 2);
        assert!(entries[0].starts_with(r#"<li class="note" hidden="">"#));
        assert!(entries[1].starts_with(r#"<li class="note">"#));
    }

    #[test]
    fn empty_list_renders_nothing() {
        assert_eq!(render_note_list(&NoteList::new()), "");
    }
}
