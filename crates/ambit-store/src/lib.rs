#![warn(missing_docs)]
//! `ambit-store` - plain-text persistence for `ambit-core` documents.
//!
//! The editing kernel never touches storage itself; it serializes to
//! tab-indented text and leaves the rest to a [`DocStore`]. This crate
//! supplies the two obvious stores, a directory of files and an
//! in-memory map, plus the load/save wiring that turns store results
//! into the status line a shell shows the user.
//!
//! ```rust
//! use ambit_core::Workspace;
//! use ambit_store::{DocStore, MemStore, load_document, save_document};
//!
//! let mut store = MemStore::new();
//! store.post("todo.amb", "Todo\n\tWater plants").unwrap();
//!
//! let mut ws = Workspace::new();
//! assert_eq!(load_document(&store, &mut ws, "todo.amb"), "Loaded");
//! assert_eq!(ws.active().unwrap().to_text(), "Todo\n\tWater plants");
//!
//! assert_eq!(save_document(&mut store, &mut ws, "todo.amb"), "Saved - Saved Doc");
//! ```

mod error;
mod loadsave;
mod store;

pub use error::StoreError;
pub use loadsave::{load_document, save_document};
pub use store::{DocStore, FileStore, MemStore};
