//! Load/save wiring between a store and a workspace.
//!
//! Both helpers return the status line a shell shows the user. A
//! failed load or save never mutates editor state.

use ambit_core::Workspace;

use crate::store::DocStore;

/// Fetches `path` from the store and opens it as the active document.
pub fn load_document(store: &impl DocStore, workspace: &mut Workspace, path: &str) -> String {
    match store.fetch(path) {
        Ok(text) => {
            workspace.open(path, &text);
            "Loaded".to_string()
        }
        Err(_) => "Error loading file".to_string(),
    }
}

/// Posts the document under `path` back to the store and clears its
/// modified flag.
pub fn save_document(store: &mut impl DocStore, workspace: &mut Workspace, path: &str) -> String {
    let Some(state) = workspace.get_mut(path) else {
        return format!("No document open under {path:?}");
    };
    match store.post(path, &state.to_text()) {
        Ok(ack) => {
            state.mark_saved();
            format!("Saved - {ack}")
        }
        Err(err) => err.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemStore;
    use ambit_core::Change;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_load_opens_and_activates() {
        let mut store = MemStore::new();
        store.post("todo.amb", "Todo\n\tWater plants").unwrap();
        let mut ws = Workspace::new();

        assert_eq!(load_document(&store, &mut ws, "todo.amb"), "Loaded");

        assert_eq!(ws.active_path(), Some("todo.amb"));
        assert_eq!(ws.active().unwrap().to_text(), "Todo\n\tWater plants");
    }

    #[test]
    fn test_load_failure_leaves_workspace_alone() {
        let store = MemStore::new();
        let mut ws = Workspace::new();
        ws.open("other.amb", "Other");

        let message = load_document(&store, &mut ws, "ghost.amb");

        assert_eq!(message, "Error loading file");
        assert!(!ws.is_open("ghost.amb"));
        assert_eq!(ws.active_path(), Some("other.amb"));
    }

    #[test]
    fn test_load_reuses_open_document_slot() {
        let mut store = MemStore::new();
        store.post("todo.amb", "Todo\n\tOld").unwrap();
        let mut ws = Workspace::new();
        load_document(&store, &mut ws, "todo.amb");

        store.post("todo.amb", "Todo\n\tNew").unwrap();
        assert_eq!(load_document(&store, &mut ws, "todo.amb"), "Loaded");

        assert_eq!(ws.len(), 1);
        assert_eq!(ws.active().unwrap().to_text(), "Todo\n\tNew");
    }

    #[test]
    fn test_save_round_trip_clears_modified() {
        let mut store = MemStore::new();
        store.post("todo.amb", "Todo\n\tOne").unwrap();
        let mut ws = Workspace::new();
        load_document(&store, &mut ws, "todo.amb");

        let state = ws.active_mut().unwrap();
        let root = state.doc().root();
        state
            .apply(&Change::insert_below(root, vec!["Two".to_string()]))
            .unwrap();
        assert!(state.is_modified());

        let message = save_document(&mut store, &mut ws, "todo.amb");

        assert_eq!(message, "Saved - Saved Doc");
        assert_eq!(store.fetch("todo.amb").unwrap(), "Todo\n\tTwo\n\tOne");
        assert!(!ws.get("todo.amb").unwrap().is_modified());
    }

    #[test]
    fn test_save_of_unopened_document_reports() {
        let mut store = MemStore::new();
        let mut ws = Workspace::new();

        let message = save_document(&mut store, &mut ws, "ghost.amb");

        assert_eq!(message, "No document open under \"ghost.amb\"");
        assert!(!store.contains("ghost.amb"));
    }
}
