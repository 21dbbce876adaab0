//! Several open documents, one active at a time.

use ambit_core::{Change, Workspace};

fn main() {
    let mut ws = Workspace::new();

    ws.open(
        "home.amb",
        "Home\n\tSee [[projects]] for current work\n\tWeekly review",
    );
    ws.open("projects.amb", "Projects\n\tambit rewrite\n\tgarden shed");

    println!("open: {:?}", ws.paths());
    println!("active: {:?}", ws.active_path());

    // Wiki-style links let a shell offer jump targets.
    let links = ws.get("home.amb").unwrap().doc_links();
    println!("links out of home.amb: {links:?}");

    // Edit the active document.
    let state = ws.active_mut().unwrap();
    let root = state.doc().root();
    let change = Change::insert_below(root, vec!["write up notes".to_string()]);
    state.apply(&change).unwrap();
    println!("\nprojects.amb now:\n{}", state.to_text());
    println!("modified: {}", state.is_modified());

    // Reopening a path reloads it in place instead of duplicating it.
    ws.open("projects.amb", "Projects\n\tambit rewrite");
    println!(
        "\nafter reopen, version {} and modified: {}",
        ws.active().unwrap().version(),
        ws.active().unwrap().is_modified()
    );

    ws.set_active("home.amb").unwrap();
    ws.close("projects.amb").unwrap();
    println!("\nopen: {:?}, active: {:?}", ws.paths(), ws.active_path());
}
