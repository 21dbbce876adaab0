use ambit_core::{Change, DocLineId, EditorState};

fn state(text: &str) -> EditorState {
    EditorState::new("notes", text)
}

fn line(state: &EditorState, content: &str) -> DocLineId {
    let doc = state.doc();
    doc.subtree(doc.root())
        .find(|&id| doc.line(id).content() == content)
        .unwrap()
}

#[test]
fn test_insert_after_lands_between_siblings() {
    let mut state = state("Root\n\tA\n\tB\n\t\tC");
    let a = line(&state, "A");

    let change = Change::insert_after(state.doc(), a, vec!["X".to_string()]);
    let record = state.apply(&change).unwrap();

    assert!(record.is_effective());
    assert_eq!(state.to_text(), "Root\n\tA\n\tX\n\tB\n\t\tC");

    // One insertion patch at the visible position below "A".
    assert_eq!(record.patches.len(), 1);
    assert!(record.patches[0].span.is_empty());
    assert_eq!(record.patches[0].span.begin(), 2);
    assert_eq!(record.patches[0].rows.len(), 1);
}

#[test]
fn test_insert_before_with_nested_payload() {
    let mut state = state("Root\n\tA\n\tB\n\t\tC");
    let b = line(&state, "B");

    let change = Change::insert_before(
        state.doc(),
        b,
        vec!["X".to_string(), "\tY".to_string()],
    );
    state.apply(&change).unwrap();

    assert_eq!(state.to_text(), "Root\n\tA\n\tX\n\t\tY\n\tB\n\t\tC");
    assert_eq!(state.scene().len(), 6);

    let x = line(&state, "X");
    let y = line(&state, "Y");
    assert_eq!(state.doc().line(y).parent(), x);
}

#[test]
fn test_insert_below_prepends_to_children() {
    let mut state = state("Root\n\tA\n\tB\n\t\tC");
    let b = line(&state, "B");

    let change = Change::insert_below(b, vec!["X".to_string()]);
    state.apply(&change).unwrap();

    assert_eq!(state.to_text(), "Root\n\tA\n\tB\n\t\tX\n\t\tC");
}

#[test]
fn test_move_below_appends_to_children() {
    let mut state = state("Root\n\tA\n\tB\n\t\tC");
    let a = line(&state, "A");
    let b = line(&state, "B");

    let change = Change::move_below(a, b);
    let record = state.apply(&change).unwrap();

    assert!(record.is_effective());
    assert_eq!(state.to_text(), "Root\n\tB\n\t\tC\n\tA");
}

#[test]
fn test_move_into_own_subtree_is_rejected() {
    let mut state = state("Root\n\tA\n\tB\n\t\tC");
    let b = line(&state, "B");
    let c = line(&state, "C");

    let before = state.version();
    let record = state.apply(&Change::move_below(b, c)).unwrap();

    assert!(!record.is_effective());
    assert_eq!(state.version(), before);
    assert_eq!(state.to_text(), "Root\n\tA\n\tB\n\t\tC");
}

#[test]
fn test_move_to_current_slot_is_not_effective() {
    let mut state = state("Root\n\tA\n\tB\n\t\tC");
    let a = line(&state, "A");

    let change = Change::move_before(state.doc(), a, a);
    let record = state.apply(&change).unwrap();

    assert!(!record.is_effective());
    assert!(record.patches.is_empty());
    assert_eq!(state.to_text(), "Root\n\tA\n\tB\n\t\tC");
}

#[test]
fn test_remove_then_reinsert_round_trip() {
    let mut state = state("Root\n\tA\n\tB\n\t\tC");
    let root = state.doc().root();
    let a = line(&state, "A");
    let b = line(&state, "B");

    let record = state
        .apply(&Change::remove(state.doc(), b, 1))
        .unwrap();
    assert!(record.is_effective());
    assert_eq!(state.to_text(), "Root\n\tA");
    assert_eq!(state.scene().len(), 2);

    // The detached subtree keeps its identity and comes back whole.
    let change = Change::reinsert(state.doc(), root, a, vec![b]);
    state.apply(&change).unwrap();

    assert_eq!(state.to_text(), "Root\n\tB\n\t\tC\n\tA");
    assert_eq!(state.doc().line(b).content(), "B");
}

#[test]
fn test_stale_remove_is_rejected_quietly() {
    let mut state = state("Root\n\tA\n\tB\n\t\tC");
    let b = line(&state, "B");

    let change = Change::remove(state.doc(), b, 1);
    assert!(state.apply(&change).unwrap().is_effective());

    // The tree no longer matches the recorded run.
    let record = state.apply(&change).unwrap();
    assert!(!record.is_effective());
    assert_eq!(state.to_text(), "Root\n\tA");
}

#[test]
fn test_line_text_change_rewrites_content() {
    let mut state = state("Root\n\tA\n\tB\n\t\tC");
    let b = line(&state, "B");

    let change = Change::line_text(state.doc(), b, "B revised".to_string());
    state.apply(&change).unwrap();

    assert_eq!(state.to_text(), "Root\n\tA\n\tB revised\n\t\tC");
    assert_eq!(state.doc().line(b).content(), "B revised");
}

#[test]
fn test_effective_changes_bump_version_once() {
    let mut state = state("Root\n\tA\n\tB\n\t\tC");
    let a = line(&state, "A");
    assert_eq!(state.version(), 0);

    let insert = Change::insert_after(state.doc(), a, vec!["X".to_string()]);
    state.apply(&insert).unwrap();
    assert_eq!(state.version(), 1);

    // Ineffective moves leave the version alone.
    let noop = Change::move_before(state.doc(), a, a);
    state.apply(&noop).unwrap();
    assert_eq!(state.version(), 1);

    let x = line(&state, "X");
    state.apply(&Change::remove(state.doc(), x, 1)).unwrap();
    assert_eq!(state.version(), 2);
}

#[test]
fn test_serialization_round_trips_well_formed_text() {
    // Blank lines survive as long as their tab depth matches the tree.
    let text = "Root\n\tA\n\t\n\tB\n\t\tC";
    let state = state(text);
    assert_eq!(state.to_text(), text);
}

#[test]
fn test_serialization_normalizes_skipped_levels() {
    let state = state("Root\n\t\t\tA\n\tB");
    assert_eq!(state.to_text(), "Root\n\tA\n\tB");
}
