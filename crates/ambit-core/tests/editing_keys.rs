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

fn caret_on(state: &mut EditorState, content: &str, cell: usize, offset: usize) {
    let row = row(state, content);
    let caret = CellTextSelection::caret(row, cell, offset).unwrap();
    state.set_selection(Selection::Caret(caret));
}

fn caret(state: &EditorState) -> (usize, usize) {
    let sel = state.site().selection().as_caret().unwrap();
    (sel.cell_index(), sel.focus())
}

fn caret_row(state: &EditorState) -> SiteRowId {
    state.site().selection().as_caret().unwrap().row()
}

#[test]
fn test_typing_inserts_at_caret() {
    let mut state = state("Root\n\tab");
    caret_on(&mut state, "ab", 1, 1);

    assert!(state.handle_key("x").unwrap());
    assert!(state.handle_key("y").unwrap());

    assert_eq!(state.to_text(), "Root\n\taxyb");
    assert_eq!(caret(&state), (1, 3));
}

#[test]
fn test_unbound_and_bare_modifier_keys_pass_through() {
    let mut state = state("Root\n\tab");
    caret_on(&mut state, "ab", 1, 1);
    let version = state.version();

    assert!(!state.handle_key("Control").unwrap());
    assert!(!state.handle_key("C-z").unwrap());
    assert!(!state.handle_key("F7").unwrap());

    assert_eq!(state.version(), version);
    assert_eq!(state.to_text(), "Root\n\tab");
}

#[test]
fn test_bound_key_consumed_without_selection() {
    let mut state = state("Root\n\tab");

    // No caret to act on, but the key still belongs to the editor.
    assert!(state.handle_key("x").unwrap());
    assert_eq!(state.to_text(), "Root\n\tab");
}

#[test]
fn test_enter_then_backspace_round_trip() {
    let mut state = state("Root\n\thello");
    caret_on(&mut state, "hello", 1, 2);

    assert!(state.handle_key("Enter").unwrap());
    assert_eq!(state.to_text(), "Root\n\the\n\tllo");

    assert!(state.handle_key("Backspace").unwrap());
    assert_eq!(state.to_text(), "Root\n\thello");

    state.insert_text("X").unwrap();
    assert_eq!(state.to_text(), "Root\n\theXllo");
}

#[test]
fn test_word_jump_keys() {
    let mut state = state("Root\n\talpha beta");
    caret_on(&mut state, "alpha beta", 1, 0);

    assert!(state.handle_key("C-ArrowRight").unwrap());
    assert_eq!(caret(&state), (1, 6));

    assert!(state.handle_key("C-ArrowRight").unwrap());
    assert_eq!(caret(&state), (1, 10));

    // Already at the end, nowhere further to jump.
    assert!(state.handle_key("C-ArrowRight").unwrap());
    assert_eq!(caret(&state), (1, 10));

    assert!(state.handle_key("C-ArrowLeft").unwrap());
    assert_eq!(caret(&state), (1, 6));

    assert!(state.handle_key("C-ArrowLeft").unwrap());
    assert_eq!(caret(&state), (1, 0));
}

#[test]
fn test_shift_word_selection_replaced_by_typing() {
    let mut state = state("Root\n\talpha beta");
    caret_on(&mut state, "alpha beta", 1, 0);

    assert!(state.handle_key("C-S-ArrowRight").unwrap());
    let sel = state.site().selection().as_caret().unwrap().clone();
    assert!(sel.has_range());
    assert_eq!(sel.anchor(), 0);
    assert_eq!(sel.focus(), 6);

    assert!(state.handle_key("X").unwrap());
    assert_eq!(state.to_text(), "Root\n\tXbeta");
    assert_eq!(caret(&state), (1, 1));
}

#[test]
fn test_tab_splits_cell_and_shift_tab_merges() {
    let mut state = state("Root\n\tabcd");
    caret_on(&mut state, "abcd", 1, 2);

    assert!(state.handle_key("Tab").unwrap());
    assert_eq!(state.to_text(), "Root\n\tab\tcd");
    assert_eq!(caret(&state), (2, 0));

    assert!(state.handle_key("S-Tab").unwrap());
    assert_eq!(state.to_text(), "Root\n\tabcd");
    assert_eq!(caret(&state), (1, 2));
}

#[test]
fn test_tab_at_line_start_indents() {
    let mut state = state("Root\n\tA\n\tB");
    caret_on(&mut state, "B", 1, 0);

    assert!(state.handle_key("Tab").unwrap());
    assert_eq!(state.to_text(), "Root\n\tA\n\t\tB");

    assert!(state.handle_key("S-Tab").unwrap());
    assert_eq!(state.to_text(), "Root\n\tA\n\tB");
    assert_eq!(caret_row(&state), row(&state, "B"));
}

#[test]
fn test_home_and_end_walk_the_row() {
    let mut state = state("Root\n\tname\tvalue");
    caret_on(&mut state, "name\tvalue", 2, 3);

    assert!(state.handle_key("Home").unwrap());
    assert_eq!(caret(&state), (2, 0));

    assert!(state.handle_key("Home").unwrap());
    assert_eq!(caret(&state), (1, 0));

    assert!(state.handle_key("End").unwrap());
    assert_eq!(caret(&state), (1, 4));

    assert!(state.handle_key("End").unwrap());
    assert_eq!(caret(&state), (2, 5));
}

#[test]
fn test_arrow_keys_hop_between_cells() {
    let mut state = state("Root\n\tab\tcd");
    caret_on(&mut state, "ab\tcd", 1, 1);

    assert!(state.handle_key("ArrowRight").unwrap());
    assert_eq!(caret(&state), (1, 2));

    assert!(state.handle_key("ArrowRight").unwrap());
    assert_eq!(caret(&state), (2, 0));

    assert!(state.handle_key("ArrowLeft").unwrap());
    assert_eq!(caret(&state), (1, 2));
}

#[test]
fn test_vertical_navigation_follows_visible_rows() {
    let mut state = state("Root\n\tA\n\tB\n\t\tC");
    caret_on(&mut state, "A", 1, 0);

    assert!(state.handle_key("ArrowDown").unwrap());
    assert_eq!(caret_row(&state), row(&state, "B"));

    assert!(state.handle_key("ArrowDown").unwrap());
    assert_eq!(caret_row(&state), row(&state, "C"));

    // Last visible row, the caret stays put.
    assert!(state.handle_key("ArrowDown").unwrap());
    assert_eq!(caret_row(&state), row(&state, "C"));

    assert!(state.handle_key("ArrowUp").unwrap());
    assert_eq!(caret_row(&state), row(&state, "B"));
}

#[test]
fn test_vertical_navigation_skips_folded_rows() {
    let mut state = state("Root\n\tA\n\tB\n\t\tC");
    state.toggle_fold(row(&state, "B"));
    caret_on(&mut state, "A", 1, 0);

    assert!(state.handle_key("ArrowDown").unwrap());
    assert_eq!(caret_row(&state), row(&state, "B"));

    // "C" is hidden, so "B" is the bottom of the view.
    assert!(state.handle_key("ArrowDown").unwrap());
    assert_eq!(caret_row(&state), row(&state, "B"));
}

#[test]
fn test_swap_keys_reorder_siblings() {
    let mut state = state("Root\n\tA\n\tB\n\t\tC");
    caret_on(&mut state, "B", 1, 0);

    assert!(state.handle_key("C-ArrowUp").unwrap());
    assert_eq!(state.to_text(), "Root\n\tB\n\t\tC\n\tA");

    assert!(state.handle_key("C-ArrowDown").unwrap());
    assert_eq!(state.to_text(), "Root\n\tA\n\tB\n\t\tC");
}

#[test]
fn test_zoom_keys_narrow_and_widen_the_view() {
    let mut state = state("Root\n\tA\n\tB\n\t\tC");
    caret_on(&mut state, "B", 1, 0);

    assert!(state.handle_key("C-]").unwrap());
    assert_eq!(state.scene().view_root(), row(&state, "B"));
    assert_eq!(state.scene().len(), 2);

    assert!(state.handle_key("C-[").unwrap());
    assert_eq!(state.scene().view_root(), row(&state, "Root"));
    assert_eq!(state.scene().len(), 4);
}

#[test]
fn test_select_row_key_enters_block_mode() {
    let mut state = state("Root\n\tA\n\tB");
    caret_on(&mut state, "B", 1, 0);

    assert!(state.handle_key("S-ArrowDown").unwrap());
    assert!(state.site().selection().as_block().is_some());

    // Escape collapses back to a caret on the focus row.
    assert!(state.handle_key("Escape").unwrap());
    assert_eq!(caret_row(&state), row(&state, "B"));
}
