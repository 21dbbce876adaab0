//! Edit a document living in a directory of plain-text files.

use ambit_core::Workspace;
use ambit_store::{DocStore, FileStore, load_document, save_document};

fn main() {
    let root = std::env::temp_dir().join("ambit-vault-demo");
    let mut store = FileStore::new(&root);
    let mut ws = Workspace::new();

    // Nothing there yet.
    println!("{}", load_document(&store, &mut ws, "garden.amb"));

    store
        .post("garden.amb", "Garden\n\tSpring\n\t\tPlant peas")
        .unwrap();
    println!("{}", load_document(&store, &mut ws, "garden.amb"));

    // Type a new item at the end of "Plant peas".
    let state = ws.active_mut().unwrap();
    let spring = state.doc().line(state.doc().root()).children()[0];
    let peas = state.doc().line(spring).children()[0];
    let row = state.site().row_for_line(peas);
    let caret = ambit_core::CellTextSelection::caret(row, 1, "Plant peas".len()).unwrap();
    state.set_selection(ambit_core::Selection::Caret(caret));
    state.handle_key("Enter").unwrap();
    state.insert_text("Stake tomatoes").unwrap();

    println!("{}", save_document(&mut store, &mut ws, "garden.amb"));
    println!("on disk:\n{}", store.fetch("garden.amb").unwrap());

    let _ = std::fs::remove_dir_all(&root);
}
