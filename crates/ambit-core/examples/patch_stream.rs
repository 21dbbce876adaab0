//! Render-collaborator protocol demo.
//!
//! A renderer never re-reads the whole scene. It keeps its own row
//! list and applies every [`RowPatch`] splice a subscription hands it,
//! which is enough to stay pixel-identical with the projection.

use std::sync::{Arc, Mutex};

use ambit_core::{Change, EditorState, PureRow, RowPatch};

fn splice(rows: &mut Vec<PureRow>, patch: &RowPatch) {
    rows.splice(patch.span.range(), patch.rows.iter().cloned());
}

fn main() {
    let mut state = EditorState::new("notes.amb", "Notes\n\tErrands\n\t\tPost office\n\tIdeas");

    let shadow: Arc<Mutex<Vec<PureRow>>> = Arc::new(Mutex::new(state.scene().pure_rows()));
    let sink = Arc::clone(&shadow);
    state.subscribe(move |change| {
        let mut rows = sink.lock().unwrap();
        for patch in &change.patches {
            println!(
                "  patch v{} -> v{}: rows {:?} replaced by {} row(s)",
                change.old_version,
                change.new_version,
                patch.span.range(),
                patch.rows.len()
            );
            splice(&mut rows, patch);
        }
    });

    println!("editing:");
    let errands = state.doc().line(state.doc().root()).children()[0];
    let change = Change::insert_after(state.doc(), errands, vec!["Groceries".to_string()]);
    state.apply(&change).unwrap();

    let change = Change::line_text(state.doc(), errands, "Errands (today)".to_string());
    state.apply(&change).unwrap();

    state.toggle_fold(state.site().row_for_line(errands));

    let in_sync = *shadow.lock().unwrap() == state.scene().pure_rows();
    println!("shadow in sync with scene: {in_sync}");
    println!("\nfinal document:\n{}", state.to_text());
}
