//! Keyboard-driven outline session.
//!
//! Drives an `EditorState` the way a UI shell would: place the caret,
//! feed key combos, and print the visible rows after each step.

use ambit_core::{CellTextSelection, EditorState, Selection};

fn render(state: &EditorState) {
    for index in 0..state.scene().len() {
        let row = state.scene().row(state.scene().row_at(index));
        let indent = row.cells().indent().max(0) as usize;
        let mark = state.site().fold_indicator(row.site());
        println!("  {}{} {}", "    ".repeat(indent), mark, row.content());
    }
}

fn main() {
    let mut state = EditorState::new(
        "plan.amb",
        "Release plan\n\tBacklog\n\t\tShip beta\n\t\tWrite docs\n\tDone",
    );

    println!("fresh document:");
    render(&state);

    // Caret at the end of "Ship beta", then split off a new item.
    let line = state.doc().line(state.doc().root()).children()[0];
    let beta = state.doc().line(line).children()[0];
    let row = state.site().row_for_line(beta);
    let caret = CellTextSelection::caret(row, 1, "Ship beta".len()).unwrap();
    state.set_selection(Selection::Caret(caret));

    state.handle_key("Enter").unwrap();
    state.insert_text("Fix login bug").unwrap();
    println!("\nafter Enter + typing:");
    render(&state);

    // Collapse the backlog.
    let backlog = state.site().row_for_line(line);
    state.toggle_fold(backlog);
    println!("\nbacklog folded:");
    render(&state);

    // Zoom into it; the fold no longer hides its children from us.
    state.toggle_fold(backlog);
    state.zoom_in(backlog);
    println!("\nzoomed into backlog:");
    render(&state);

    state.zoom_out();
    println!("\nback at the top, version {}", state.version());
    println!("\nserialized:\n{}", state.to_text());
}
