use ambit_core::{
    CellTextSelection, Change, DocLineId, EditorState, Selection, SiteRowId, StateChangeType,
};

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

fn contents(state: &EditorState) -> Vec<String> {
    (0..state.scene().len())
        .map(|i| {
            state
                .scene()
                .row(state.scene().row_at(i))
                .content()
                .to_string()
        })
        .collect()
}

#[test]
fn test_fold_hides_subtree_and_unfold_restores() {
    let mut state = state("Root\n\tA\n\tB\n\t\tC\n\tD");
    let b = row(&state, "B");

    let record = state.toggle_fold(b);
    assert_eq!(record.change_type, StateChangeType::FoldingChanged);
    assert_eq!(contents(&state), ["Root", "A", "B", "D"]);
    assert!(state.site().row(b).folded());
    assert_eq!(state.site().fold_indicator(b), '+');

    state.toggle_fold(b);
    assert_eq!(contents(&state), ["Root", "A", "B", "C", "D"]);
    assert_eq!(state.site().fold_indicator(b), '-');

    // Leaves carry no indicator at all.
    assert_eq!(state.site().fold_indicator(row(&state, "A")), ' ');
}

#[test]
fn test_fold_survives_reparent() {
    let mut state = state("Root\n\tA\n\tB\n\t\tC\n\tD");
    let b = row(&state, "B");
    state.toggle_fold(b);

    let change = Change::move_below(line(&state, "B"), line(&state, "A"));
    state.apply(&change).unwrap();

    assert_eq!(state.to_text(), "Root\n\tA\n\t\tB\n\t\t\tC\n\tD");
    assert_eq!(contents(&state), ["Root", "A", "B", "D"]);
    assert!(state.site().row(b).folded());

    state.toggle_fold(b);
    assert_eq!(contents(&state), ["Root", "A", "B", "C", "D"]);
}

#[test]
fn test_fold_survives_text_edit() {
    let mut state = state("Root\n\tA\n\tB\n\t\tC\n\tD");
    let b = row(&state, "B");
    state.toggle_fold(b);

    let change = Change::line_text(state.doc(), line(&state, "B"), "B2".to_string());
    state.apply(&change).unwrap();

    assert_eq!(contents(&state), ["Root", "A", "B2", "D"]);
    assert!(state.site().row(b).folded());
}

#[test]
fn test_nested_folds_restore_independently() {
    let mut state = state("Root\n\tA\n\t\tB\n\t\t\tC");
    let a = row(&state, "A");
    let b = row(&state, "B");

    state.toggle_fold(b);
    assert_eq!(contents(&state), ["Root", "A", "B"]);

    state.toggle_fold(a);
    assert_eq!(contents(&state), ["Root", "A"]);

    // Unfolding the parent does not disturb the inner fold.
    state.toggle_fold(a);
    assert_eq!(contents(&state), ["Root", "A", "B"]);
    assert!(state.site().row(b).folded());
}

#[test]
fn test_fold_of_removed_subtree_disappears() {
    let mut state = state("Root\n\tA\n\tB\n\t\tC\n\tD");
    let b = row(&state, "B");
    state.toggle_fold(b);

    let change = Change::remove(state.doc(), line(&state, "B"), 1);
    state.apply(&change).unwrap();

    assert_eq!(contents(&state), ["Root", "A", "D"]);
    assert!(!state.site().contains(b));
}

#[test]
fn test_zoom_into_folded_row_shows_it_alone() {
    let mut state = state("Root\n\tA\n\tB\n\t\tC\n\tD");
    let b = row(&state, "B");
    state.toggle_fold(b);

    state.zoom_in(b);
    assert_eq!(state.scene().view_root(), b);
    assert_eq!(contents(&state), ["B"]);

    state.toggle_fold(b);
    assert_eq!(contents(&state), ["B", "C"]);

    state.zoom_out();
    assert_eq!(contents(&state), ["Root", "A", "B", "C", "D"]);
}

#[test]
fn test_fold_addresses_row_identity_not_position() {
    let mut state = state("Root\n\tA\n\tB\n\t\tC\n\tD");
    let b = row(&state, "B");
    state.toggle_fold(b);

    let change = Change::insert_before(state.doc(), line(&state, "B"), vec!["X".to_string()]);
    state.apply(&change).unwrap();

    // "B" moved down one slot yet stays the folded row.
    assert_eq!(contents(&state), ["Root", "A", "X", "B", "D"]);
    assert!(state.site().row(b).folded());
}

#[test]
fn test_fold_key_toggles_at_caret() {
    let mut state = state("Root\n\tA\n\tB\n\t\tC\n\tD");
    let b = row(&state, "B");
    let caret = CellTextSelection::caret(b, 1, 0).unwrap();
    state.set_selection(Selection::Caret(caret));

    assert!(state.handle_key("C-.").unwrap());
    assert_eq!(contents(&state), ["Root", "A", "B", "D"]);

    assert!(state.handle_key("C-.").unwrap());
    assert_eq!(contents(&state), ["Root", "A", "B", "C", "D"]);
}
