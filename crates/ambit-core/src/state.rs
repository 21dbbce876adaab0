//! Per-document editor state.
//!
//! [`EditorState`] owns one document's full pipeline: the line tree,
//! the fold overlay, and the visible projection, plus a state version
//! and a change-callback list. Every mutation flows through here so
//! the three layers are pumped in order and observers always see a
//! settled state:
//!
//! 1. A [`Change`] (or compound document operation) mutates the tree
//!    and queues document events.
//! 2. The overlay consumes them and queues row events.
//! 3. The projection consumes those and queues render patches.
//! 4. The version bumps once and callbacks fire with the patches.
//!
//! Operations that change nothing observable leave the version alone
//! and fire no callbacks.

use crate::change::{Change, ChangeError};
use crate::doc::Doc;
use crate::pool::{DocLineId, SiteRowId};
use crate::scene::{RowPatch, Scene};
use crate::selection::{PureCellSelection, Selection};
use crate::site::Site;

/// State change type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StateChangeType {
    /// Document content or structure modified.
    DocumentModified,
    /// Fold state changed.
    FoldingChanged,
    /// Selection changed.
    SelectionChanged,
    /// View root changed (zoom).
    ViewChanged,
    /// Document replaced wholesale (open or reload).
    DocumentLoaded,
}

/// State change record handed to subscribers.
#[derive(Debug, Clone)]
pub struct StateChange {
    /// Change type.
    pub change_type: StateChangeType,
    /// Old version number.
    pub old_version: u64,
    /// New version number. Equal to `old_version` when the operation
    /// turned out to be a no-op.
    pub new_version: u64,
    /// Render splices produced by this change, in apply order.
    pub patches: Vec<RowPatch>,
}

impl StateChange {
    /// Create a new state change record without patches.
    pub fn new(change_type: StateChangeType, old_version: u64, new_version: u64) -> Self {
        Self {
            change_type,
            old_version,
            new_version,
            patches: Vec::new(),
        }
    }

    /// Attach render patches to this change record.
    pub fn with_patches(mut self, patches: Vec<RowPatch>) -> Self {
        self.patches = patches;
        self
    }

    /// True when the operation changed anything.
    pub fn is_effective(&self) -> bool {
        self.new_version > self.old_version
    }
}

/// State change callback function type.
pub type StateChangeCallback = Box<dyn FnMut(&StateChange) + Send>;

/// One open document and its projection pipeline.
pub struct EditorState {
    pub(crate) doc: Doc,
    pub(crate) site: Site,
    pub(crate) scene: Scene,
    version: u64,
    is_modified: bool,
    callbacks: Vec<StateChangeCallback>,
}

impl EditorState {
    /// Builds the pipeline for one document. The initial projection
    /// is pulled, not patched: renderers read
    /// [`Scene::pure_rows`](crate::scene::Scene::pure_rows) once and
    /// splice patches from then on.
    pub fn new(name: &str, text: &str) -> Self {
        let doc = Doc::from_text(name, text);
        let site = Site::new(&doc);
        let mut scene = Scene::new();
        scene.load_from_site(&site, &doc);
        scene.take_patches();
        Self {
            doc,
            site,
            scene,
            version: 0,
            is_modified: false,
            callbacks: Vec::new(),
        }
    }

    /// The line tree.
    pub fn doc(&self) -> &Doc {
        &self.doc
    }

    /// The fold overlay.
    pub fn site(&self) -> &Site {
        &self.site
    }

    /// The visible projection.
    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    /// Current state version.
    pub fn version(&self) -> u64 {
        self.version
    }

    /// True when the document changed since the last save or load.
    pub fn is_modified(&self) -> bool {
        self.is_modified
    }

    /// Check if state has changed since a version.
    pub fn has_changed_since(&self, version: u64) -> bool {
        self.version > version
    }

    /// Mark the document as unmodified, after saving.
    pub fn mark_saved(&mut self) {
        self.is_modified = false;
    }

    /// Subscribe to state changes.
    pub fn subscribe<F>(&mut self, callback: F)
    where
        F: FnMut(&StateChange) + Send + 'static,
    {
        self.callbacks.push(Box::new(callback));
    }

    /// Applies one change through the whole pipeline. The version
    /// bumps and callbacks fire only when the document actually
    /// mutated; a rejected change leaves everything untouched.
    pub fn apply(&mut self, change: &Change) -> Result<StateChange, ChangeError> {
        let (mutated, patches) = self.apply_quiet(change)?;
        if !mutated {
            return Ok(self.unchanged(StateChangeType::DocumentModified));
        }
        Ok(self.bump(StateChangeType::DocumentModified, patches))
    }

    /// Replaces the document text wholesale, rebuilding overlay and
    /// projection. Fold state, zoom, and selection reset.
    pub fn reload(&mut self, text: &str) -> StateChange {
        self.doc = Doc::from_text(self.doc.name(), text);
        self.site = Site::new(&self.doc);
        self.scene.load_from_site(&self.site, &self.doc);
        let patches = self.scene.take_patches();
        let change = self.bump(StateChangeType::DocumentLoaded, patches);
        self.is_modified = false;
        change
    }

    /// Toggles the fold state of one row. A childless row is a no-op.
    pub fn toggle_fold(&mut self, row: SiteRowId) -> StateChange {
        if !self.site.toggle_fold(row) {
            return self.unchanged(StateChangeType::FoldingChanged);
        }
        let patches = self.pump_site();
        self.bump(StateChangeType::FoldingChanged, patches)
    }

    /// Re-roots the view at `row` and reprojects.
    pub fn zoom_in(&mut self, row: SiteRowId) -> StateChange {
        if !self.site.zoom_in(row) {
            return self.unchanged(StateChangeType::ViewChanged);
        }
        self.scene.load_from_site(&self.site, &self.doc);
        let patches = self.scene.take_patches();
        self.bump(StateChangeType::ViewChanged, patches)
    }

    /// Walks the view root one level back toward the real root and
    /// reprojects.
    pub fn zoom_out(&mut self) -> StateChange {
        if !self.site.zoom_out() {
            return self.unchanged(StateChangeType::ViewChanged);
        }
        self.scene.load_from_site(&self.site, &self.doc);
        let patches = self.scene.take_patches();
        self.bump(StateChangeType::ViewChanged, patches)
    }

    /// Replaces the selection. Setting an equal selection is a no-op.
    pub fn set_selection(&mut self, selection: Selection) -> StateChange {
        if *self.site.selection() == selection {
            return self.unchanged(StateChangeType::SelectionChanged);
        }
        self.site.set_selection(selection);
        self.bump(StateChangeType::SelectionChanged, Vec::new())
    }

    /// Wiki-link targets in document order.
    pub fn doc_links(&self) -> Vec<String> {
        self.doc.doc_links()
    }

    /// Serialized document text.
    pub fn to_text(&self) -> String {
        self.doc.to_text()
    }

    /// Selection styling records for every selected visible cell.
    pub fn selection_overlay(&self) -> Vec<PureCellSelection> {
        let mut overlay = Vec::new();
        match self.site.selection() {
            Selection::None => {}
            Selection::Caret(caret) => {
                if self.scene.position_of(caret.row()).is_some() {
                    overlay.push(PureCellSelection {
                        row: self.scene.find_row(caret.row()),
                        cell_index: caret.cell_index(),
                        selected: caret.has_range(),
                        active: true,
                    });
                }
            }
            Selection::Block(block) => {
                for &scene_id in self.scene.rows() {
                    let site_row = self.scene.row(scene_id).site();
                    if !block.includes_site_row(&self.site, site_row) {
                        continue;
                    }
                    // Direct children honor the column range; rows
                    // riding along inside a selected subtree are
                    // styled whole.
                    let direct = self.site.row(site_row).parent() == block.parent();
                    let cell_count = self.scene.row(scene_id).cells().len();
                    for index in 0..cell_count {
                        if !direct || block.includes_cell(&self.site, site_row, index) {
                            overlay.push(PureCellSelection {
                                row: scene_id,
                                cell_index: index,
                                selected: true,
                                active: block.is_active_cell(site_row, index),
                            });
                        }
                    }
                }
            }
        }
        overlay
    }

    /// Applies a change and pumps the pipeline without touching the
    /// version, so compound operations can bundle selection updates
    /// into one observable change.
    pub(crate) fn apply_quiet(
        &mut self,
        change: &Change,
    ) -> Result<(bool, Vec<RowPatch>), ChangeError> {
        let mutated = self.doc.apply(change)?;
        if !mutated {
            return Ok((false, Vec::new()));
        }
        Ok((true, self.pump()))
    }

    /// Splits a line at a byte offset, quietly. Returns the new
    /// suffix line (the sentinel when the line was not attached).
    pub(crate) fn split_quiet(
        &mut self,
        line: DocLineId,
        offset: usize,
    ) -> Result<(DocLineId, Vec<RowPatch>), ChangeError> {
        let new_line = self.doc.split_line(line, offset)?;
        if new_line.is_end() {
            return Ok((new_line, Vec::new()));
        }
        Ok((new_line, self.pump()))
    }

    /// Drains document events through overlay and projection.
    pub(crate) fn pump(&mut self) -> Vec<RowPatch> {
        let events = self.doc.take_events();
        let old_view = self.site.view_root();
        self.site.apply_doc_events(&self.doc, &events);
        let site_events = self.site.take_events();
        if self.site.view_root() == old_view {
            self.scene.apply_site_events(&self.site, &self.doc, &site_events);
        } else {
            self.scene.load_from_site(&self.site, &self.doc);
        }
        self.scene.take_patches()
    }

    /// Drains overlay events (fold toggles) through the projection.
    pub(crate) fn pump_site(&mut self) -> Vec<RowPatch> {
        let site_events = self.site.take_events();
        self.scene.apply_site_events(&self.site, &self.doc, &site_events);
        self.scene.take_patches()
    }

    pub(crate) fn bump(
        &mut self,
        change_type: StateChangeType,
        patches: Vec<RowPatch>,
    ) -> StateChange {
        let old_version = self.version;
        self.version += 1;
        if matches!(change_type, StateChangeType::DocumentModified) {
            self.is_modified = true;
        }
        let change =
            StateChange::new(change_type, old_version, self.version).with_patches(patches);
        self.notify_callbacks(&change);
        change
    }

    pub(crate) fn unchanged(&self, change_type: StateChangeType) -> StateChange {
        StateChange::new(change_type, self.version, self.version)
    }

    fn notify_callbacks(&mut self, change: &StateChange) {
        for callback in &mut self.callbacks {
            callback(change);
        }
    }
}
