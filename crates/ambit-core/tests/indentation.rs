use ambit_core::{CellTextSelection, DocLineId, EditorState, Selection, SiteRowId};

fn state(text: &str) -> EditorState {
    EditorState::new("notes", text)
}

fn line(state: &EditorState, content: &str) -> DocLineId {
    let doc = state.doc();
    doc.subtree(doc.root())
        .find(|&id| doc.line(id).content() == content)
        .unwrap()
}

fn row(state: &EditorState, content: &str) -> SiteRowId {
    state.site().row_for_line(line(state, content))
}

fn caret_on(state: &mut EditorState, content: &str) {
    let row = row(state, content);
    let caret = CellTextSelection::caret(row, 1, 0).unwrap();
    state.set_selection(Selection::Caret(caret));
}

#[test]
fn test_indent_appends_after_existing_children() {
    let mut state = state("Root\n\tA\n\t\tX\n\tB");
    caret_on(&mut state, "B");

    state.tab().unwrap();

    assert_eq!(state.to_text(), "Root\n\tA\n\t\tX\n\t\tB");
}

#[test]
fn test_indent_round_trips_with_outdent() {
    let mut state = state("Root\n\tA\n\tB");
    caret_on(&mut state, "B");

    state.tab().unwrap();
    assert_eq!(state.to_text(), "Root\n\tA\n\t\tB");

    state.shift_tab().unwrap();
    assert_eq!(state.to_text(), "Root\n\tA\n\tB");
}

#[test]
fn test_indent_under_folded_sibling_unfolds_it() {
    let mut state = state("Root\n\tA\n\t\tX\n\tB");
    state.toggle_fold(row(&state, "A"));
    assert_eq!(state.scene().len(), 3);
    caret_on(&mut state, "B");

    let record = state.tab().unwrap();

    // Unfold and reparent arrive as one observable change.
    assert_eq!(record.new_version, record.old_version + 1);
    assert_eq!(state.to_text(), "Root\n\tA\n\t\tX\n\t\tB");
    assert!(!state.site().row(row(&state, "A")).folded());
    assert_eq!(state.scene().len(), 4);
}

#[test]
fn test_indent_first_sibling_is_noop() {
    let mut state = state("Root\n\tA\n\tB");
    caret_on(&mut state, "A");
    let version = state.version();

    state.tab().unwrap();

    assert_eq!(state.to_text(), "Root\n\tA\n\tB");
    assert_eq!(state.version(), version);
}

#[test]
fn test_outdent_top_level_row_is_noop() {
    let mut state = state("Root\n\tA\n\tB");
    caret_on(&mut state, "A");
    let version = state.version();

    state.shift_tab().unwrap();

    assert_eq!(state.to_text(), "Root\n\tA\n\tB");
    assert_eq!(state.version(), version);
}

#[test]
fn test_outdent_middle_child_leaves_later_siblings() {
    let mut state = state("Root\n\tP\n\t\tA\n\t\tB\n\t\tC");
    caret_on(&mut state, "B");

    state.shift_tab().unwrap();

    assert_eq!(state.to_text(), "Root\n\tP\n\t\tA\n\t\tC\n\tB");
}

#[test]
fn test_indent_carries_subtree() {
    let mut state = state("Root\n\tA\n\tB\n\t\tK");
    caret_on(&mut state, "B");

    state.tab().unwrap();

    assert_eq!(state.to_text(), "Root\n\tA\n\t\tB\n\t\t\tK");
}

#[test]
fn test_swap_up_carries_subtree() {
    let mut state = state("Root\n\tA\n\tB\n\t\tK");
    caret_on(&mut state, "B");

    state.swap_up().unwrap();

    assert_eq!(state.to_text(), "Root\n\tB\n\t\tK\n\tA");
}

#[test]
fn test_swap_preserves_fold_state() {
    let mut state = state("Root\n\tA\n\tB\n\t\tK");
    let b = row(&state, "B");
    state.toggle_fold(b);
    caret_on(&mut state, "B");

    state.swap_up().unwrap();

    assert_eq!(state.to_text(), "Root\n\tB\n\t\tK\n\tA");
    assert!(state.site().row(b).folded());
    assert_eq!(state.scene().len(), 3);
}

#[test]
fn test_swap_at_edges_is_noop() {
    let mut state = state("Root\n\tA\n\tB");
    caret_on(&mut state, "A");
    let version = state.version();

    state.swap_up().unwrap();
    assert_eq!(state.version(), version);

    caret_on(&mut state, "B");
    let version = state.version();
    state.swap_down().unwrap();

    assert_eq!(state.version(), version);
    assert_eq!(state.to_text(), "Root\n\tA\n\tB");
}
