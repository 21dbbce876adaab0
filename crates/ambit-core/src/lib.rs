#![warn(missing_docs)]
//! Ambit Core - Headless Structured-Text Outline Editor Kernel
//!
//! # Overview
//!
//! `ambit-core` is a headless editing kernel for tab-indented outline
//! documents. It owns the document tree, fold state, selection, and
//! the visible-row projection, and assumes the upper layer provides a
//! cell-grid view renderer. Rendering, I/O, and the event loop stay
//! outside.
//!
//! # Core Features
//!
//! - **Line Tree**: tab-indented text parsed into an arena-backed
//!   tree of lines and serialized back from tree depths
//! - **Immutable Changes**: every mutation is a self-contained
//!   [`Change`] command, validated atomically before it touches the
//!   tree
//! - **Fold Overlay**: per-view fold state layered over the tree
//!   without touching document content
//! - **Incremental Projection**: the visible-row list is maintained
//!   by splicing, and renderers receive minimal [`RowPatch`] updates
//! - **Zoom**: any row can become the temporary view root
//! - **State Tracking**: version number mechanism and change
//!   notifications per document
//!
//! # Architecture Layers
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │  Workspace & EditorState (versions, keys)   │  ← Public API
//! ├─────────────────────────────────────────────┤
//! │  Scene (visible rows, RowPatch splices)     │  ← Rendering Data
//! ├─────────────────────────────────────────────┤
//! │  Site (fold overlay, zoom, selection)       │  ← View State
//! ├─────────────────────────────────────────────┤
//! │  Doc (line tree, Change application)        │  ← Document Model
//! └─────────────────────────────────────────────┘
//! ```
//!
//! Each layer communicates downward only through typed events: the
//! document emits [`DocEvent`]s, the overlay translates them into
//! [`SiteEvent`]s, and the projection turns those into render
//! patches.
//!
//! # Quick Start
//!
//! ## Applying Changes
//!
//! ```rust
//! use ambit_core::{Change, EditorState};
//!
//! let mut state = EditorState::new("notes", "Project\n\tTasks\n\t\tShip it\n\tNotes");
//!
//! // Insert a sibling after "Tasks"
//! let tasks = state.doc().line(state.doc().root()).children()[0];
//! let change = Change::insert_after(state.doc(), tasks, vec!["Ideas".to_string()]);
//! let record = state.apply(&change).unwrap();
//!
//! assert!(record.is_effective());
//! assert_eq!(state.to_text(), "Project\n\tTasks\n\t\tShip it\n\tIdeas\n\tNotes");
//! ```
//!
//! ## Folding and Subscriptions
//!
//! ```rust
//! use ambit_core::{EditorState, StateChangeType};
//!
//! let mut state = EditorState::new("notes", "Project\n\tTasks\n\t\tShip it");
//! state.subscribe(|change| {
//!     println!("changed: {:?}", change.change_type);
//! });
//!
//! let tasks = state.doc().line(state.doc().root()).children()[0];
//! let record = state.toggle_fold(state.site().row_for_line(tasks));
//!
//! assert_eq!(record.change_type, StateChangeType::FoldingChanged);
//! assert_eq!(state.scene().len(), 2);
//! ```
//!
//! # Module Description
//!
//! - [`pool`] - Arena pools and typed handles for lines and rows
//! - [`span`] - Byte ranges for cell-local edits
//! - [`cells`] - Tab-delimited cell decomposition of row text
//! - [`doc`] - The document tree and [`Change`] application
//! - [`change`] - Change commands and their maker functions
//! - [`site`] - Fold overlay, zoom, and selection state
//! - [`selection`] - Caret and block selection shapes
//! - [`scene`] - Visible-row projection and render patches
//! - [`state`] - Per-document pipeline, versions, and callbacks
//! - [`keymap`] - Key combo parsing and dispatch
//! - [`workspace`] - Multiple open documents
//!
//! # Unicode Support
//!
//! - UTF-8 internal encoding, byte offsets on character boundaries
//! - Caret movement and deletion by grapheme cluster
//! - CJK double-width aware column metrics for renderers

pub mod cells;
pub mod change;
pub mod doc;
mod editing;
pub mod keymap;
pub mod pool;
pub mod scene;
pub mod selection;
pub mod site;
pub mod span;
pub mod state;
pub mod workspace;

pub use cells::{Cell, CellKind, RowCells};
pub use change::{Change, ChangeError};
pub use doc::{Doc, DocEvent, DocLine, Subtree};
pub use keymap::KeyCombo;
pub use pool::{DocLineId, IdParseError, Pool, PoolId, SceneRowId, SiteRowId};
pub use scene::{PureCell, PureRow, RowPatch, Scene, SceneRow};
pub use selection::{
    CellBlock, CellTextSelection, PureCellSelection, Selection, SelectionError,
};
pub use site::{Site, SiteEvent, SiteRow};
pub use span::{Span, SpanError};
pub use state::{EditorState, StateChange, StateChangeCallback, StateChangeType};
pub use workspace::{Workspace, WorkspaceError};
