//! Visible-row projection.
//!
//! A [`Scene`] flattens the overlay tree into the ordered list of
//! rows a renderer actually shows: the pre-order walk from the view
//! root, skipping the subtree of every folded row. Each visible row
//! caches its cell decomposition and a `tree_length`, the number of
//! contiguous scene entries its visible subtree occupies. That cache
//! is what lets fold, unfold, insert, remove, and move all splice an
//! exact contiguous range instead of re-flattening the document, and
//! every splice is mirrored to the render collaborator as one
//! [`RowPatch`].
//!
//! Scene rows for hidden subtrees stay pooled, so unfolding or moving
//! a row back into view reuses the same row ids and cell caches.

use crate::cells::{CellKind, RowCells};
use crate::doc::Doc;
use crate::pool::{DocLineId, Pool, SceneRowId, SiteRowId};
use crate::site::{Site, SiteEvent};
use crate::span::Span;

/// One cell of a render row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PureCell {
    /// Indent or text.
    pub kind: CellKind,
    /// Cell text, empty for non-text cells.
    pub text: String,
    /// Display width in columns.
    pub width: i32,
}

/// Full redraw data for one visible row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PureRow {
    /// Stable row id.
    pub id: SceneRowId,
    /// Indent relative to the view root.
    pub indent: i32,
    /// Cell decomposition in display order.
    pub cells: Vec<PureCell>,
}

/// One replace-range instruction for the render collaborator: the
/// rows at `span` are replaced by `rows` in place.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowPatch {
    /// Row range to replace, in visible positions.
    pub span: Span,
    /// Replacement rows, empty for a pure removal.
    pub rows: Vec<PureRow>,
}

/// One visible row and its caches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SceneRow {
    id: SceneRowId,
    site: SiteRowId,
    line: DocLineId,
    cells: RowCells,
    tree_length: usize,
}

impl SceneRow {
    /// Row id.
    pub fn id(&self) -> SceneRowId {
        self.id
    }

    /// Overlay row this scene row projects.
    pub fn site(&self) -> SiteRowId {
        self.site
    }

    /// Document line behind the row.
    pub fn line(&self) -> DocLineId {
        self.line
    }

    /// Cached cell decomposition.
    pub fn cells(&self) -> &RowCells {
        &self.cells
    }

    /// Indent relative to the view root (the view root shows as -1).
    pub fn indent(&self) -> i32 {
        self.cells.indent()
    }

    /// Line content the cells were built from.
    pub fn content(&self) -> &str {
        self.cells.source()
    }

    /// Number of contiguous scene entries this row's visible subtree
    /// occupies, itself included.
    pub fn tree_length(&self) -> usize {
        self.tree_length
    }
}

/// Flattened, fold-aware projection of one overlay.
#[derive(Debug)]
pub struct Scene {
    rows: Vec<SceneRowId>,
    pool: Pool<SceneRowId, SceneRow>,
    view_root: SiteRowId,
    patches: Vec<RowPatch>,
}

impl Scene {
    /// Empty projection. Call [`Scene::load_from_site`] to populate.
    pub fn new() -> Scene {
        Scene {
            rows: Vec::new(),
            pool: Pool::new(SceneRow {
                id: SceneRowId::END,
                site: SiteRowId::END,
                line: DocLineId::END,
                cells: RowCells::new("", -1),
                tree_length: 0,
            }),
            view_root: SiteRowId::END,
            patches: Vec::new(),
        }
    }

    /// Full flatten from the overlay's current view root. Pooled rows
    /// are reused by overlay identity, so repeated loads keep row ids
    /// stable. Emits one patch replacing the whole previous row
    /// range.
    pub fn load_from_site(&mut self, site: &Site, doc: &Doc) {
        let old_len = self.rows.len();
        self.view_root = site.view_root();
        let mut flat = Vec::new();
        self.flatten_into(site, doc, self.view_root, &mut flat);
        self.rows = flat;
        self.sweep_dead(site);
        let rows = self.pure_rows_of(&self.rows);
        self.patches.clear();
        self.patches.push(RowPatch {
            span: Span::at(0, old_len),
            rows,
        });
    }

    /// Visible rows in order.
    pub fn rows(&self) -> &[SceneRowId] {
        &self.rows
    }

    /// Number of visible rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// True when nothing is visible.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Overlay row the projection is rooted at.
    pub fn view_root(&self) -> SiteRowId {
        self.view_root
    }

    /// Looks up a row, resolving dead ids to the sentinel end row.
    pub fn row(&self, id: SceneRowId) -> &SceneRow {
        self.pool.get(id)
    }

    /// Row at a visible position, the sentinel out of range.
    pub fn row_at(&self, index: usize) -> SceneRowId {
        self.rows.get(index).copied().unwrap_or(SceneRowId::END)
    }

    /// Scene row projecting `site_row`, the sentinel when that row
    /// was never shown.
    pub fn find_row(&self, site_row: SiteRowId) -> SceneRowId {
        self.pool.search(|row| row.site == site_row)
    }

    /// Visible position of the row projecting `site_row`.
    pub fn position_of(&self, site_row: SiteRowId) -> Option<usize> {
        self.rows
            .iter()
            .position(|&id| self.pool.get(id).site == site_row)
    }

    /// Overlay row one visible position up, the sentinel at the top.
    pub fn row_up(&self, site_row: SiteRowId) -> SiteRowId {
        match self.position_of(site_row) {
            Some(index) if index > 0 => self.pool.get(self.rows[index - 1]).site,
            _ => SiteRowId::END,
        }
    }

    /// Overlay row one visible position down, the sentinel at the
    /// bottom.
    pub fn row_down(&self, site_row: SiteRowId) -> SiteRowId {
        match self.position_of(site_row) {
            Some(index) => match self.rows.get(index + 1) {
                Some(&id) => self.pool.get(id).site,
                None => SiteRowId::END,
            },
            None => SiteRowId::END,
        }
    }

    /// Render projection of one row.
    pub fn pure_row(&self, id: SceneRowId) -> PureRow {
        let row = self.pool.get(id);
        PureRow {
            id: row.id,
            indent: row.cells.indent(),
            cells: row
                .cells
                .cells()
                .iter()
                .map(|cell| PureCell {
                    kind: cell.kind(),
                    text: cell.text().to_string(),
                    width: cell.width(),
                })
                .collect(),
        }
    }

    /// Render projection of every visible row in order.
    pub fn pure_rows(&self) -> Vec<PureRow> {
        self.pure_rows_of(&self.rows)
    }

    /// Drains the render patch outbox.
    pub fn take_patches(&mut self) -> Vec<RowPatch> {
        std::mem::take(&mut self.patches)
    }

    /// Applies drained overlay events as exact contiguous splices.
    pub fn apply_site_events(&mut self, site: &Site, doc: &Doc, events: &[SiteEvent]) {
        for event in events {
            match event {
                SiteEvent::RowFolded { row } => self.fold_row(site, *row),
                SiteEvent::RowUnfolded { row } => self.unfold_row(site, doc, *row),
                SiteEvent::RowsInserted {
                    owner,
                    offset,
                    rows,
                } => self.insert_rows(site, doc, *owner, *offset, rows),
                SiteEvent::RowsRemoved { owner, rows } => self.remove_rows(site, *owner, rows),
                SiteEvent::RowMoved {
                    old_owner,
                    new_owner,
                    new_offset,
                    row,
                } => self.move_row(site, doc, *old_owner, *new_owner, *new_offset, *row),
                SiteEvent::RowTextChanged { row } => self.text_changed(site, doc, *row),
            }
        }
    }

    fn fold_row(&mut self, site: &Site, row: SiteRowId) {
        let Some(index) = self.position_of(row) else {
            return;
        };
        let scene_row = self.rows[index];
        let extent = self.pool.get(scene_row).tree_length;
        let removed = extent - 1;
        if removed == 0 {
            return;
        }
        self.rows.drain(index + 1..index + extent);
        if let Some(entry) = self.pool.get_mut(scene_row) {
            entry.tree_length = 1;
        }
        self.bump_ancestors(site, site.row(row).parent(), -(removed as isize));
        self.patches.push(RowPatch {
            span: Span::at(index + 1, removed),
            rows: Vec::new(),
        });
    }

    fn unfold_row(&mut self, site: &Site, doc: &Doc, row: SiteRowId) {
        let Some(index) = self.position_of(row) else {
            return;
        };
        let children: Vec<SiteRowId> = site.row(row).children().to_vec();
        let mut revealed = Vec::new();
        for child in children {
            self.flatten_into(site, doc, child, &mut revealed);
        }
        let added = revealed.len();
        self.rows.splice(index + 1..index + 1, revealed.iter().copied());
        let scene_row = self.rows[index];
        if let Some(entry) = self.pool.get_mut(scene_row) {
            entry.tree_length = 1 + added;
        }
        self.bump_ancestors(site, site.row(row).parent(), added as isize);
        let rows = self.pure_rows_of(&revealed);
        self.patches.push(RowPatch {
            span: Span::empty_at(index + 1),
            rows,
        });
    }

    fn insert_rows(
        &mut self,
        site: &Site,
        doc: &Doc,
        owner: SiteRowId,
        offset: usize,
        rows: &[SiteRowId],
    ) {
        let Some(at) = self.insert_position(site, owner, offset) else {
            return;
        };
        let mut revealed = Vec::new();
        for &row in rows {
            self.flatten_into(site, doc, row, &mut revealed);
        }
        self.rows.splice(at..at, revealed.iter().copied());
        self.bump_ancestors(site, owner, revealed.len() as isize);
        let rows = self.pure_rows_of(&revealed);
        self.patches.push(RowPatch {
            span: Span::empty_at(at),
            rows,
        });
    }

    fn remove_rows(&mut self, site: &Site, owner: SiteRowId, rows: &[SiteRowId]) {
        for &row in rows {
            let Some(index) = self.position_of(row) else {
                continue;
            };
            let extent = self.pool.get(self.rows[index]).tree_length;
            self.rows.drain(index..index + extent);
            self.bump_ancestors(site, owner, -(extent as isize));
            self.patches.push(RowPatch {
                span: Span::at(index, extent),
                rows: Vec::new(),
            });
        }
        self.sweep_dead(site);
    }

    fn move_row(
        &mut self,
        site: &Site,
        doc: &Doc,
        old_owner: SiteRowId,
        new_owner: SiteRowId,
        new_offset: usize,
        row: SiteRowId,
    ) {
        if let Some(index) = self.position_of(row) {
            let extent = self.pool.get(self.rows[index]).tree_length;
            self.rows.drain(index..index + extent);
            self.bump_ancestors(site, old_owner, -(extent as isize));
            self.patches.push(RowPatch {
                span: Span::at(index, extent),
                rows: Vec::new(),
            });
        }
        if let Some(at) = self.insert_position(site, new_owner, new_offset) {
            let mut revealed = Vec::new();
            self.flatten_into(site, doc, row, &mut revealed);
            self.rows.splice(at..at, revealed.iter().copied());
            self.bump_ancestors(site, new_owner, revealed.len() as isize);
            let rows = self.pure_rows_of(&revealed);
            self.patches.push(RowPatch {
                span: Span::empty_at(at),
                rows,
            });
        }
    }

    fn text_changed(&mut self, site: &Site, doc: &Doc, row: SiteRowId) {
        let scene_row = self.find_row(row);
        if scene_row.is_end() {
            return;
        }
        self.refresh(site, doc, scene_row);
        if let Some(index) = self.rows.iter().position(|&id| id == scene_row) {
            let rows = vec![self.pure_row(scene_row)];
            self.patches.push(RowPatch {
                span: Span::at(index, 1),
                rows,
            });
        }
    }

    /// Scene position new children of `owner` at `offset` land at, or
    /// `None` when they are not visible. An insertion below a folded
    /// or hidden owner shows nothing.
    fn insert_position(&self, site: &Site, owner: SiteRowId, offset: usize) -> Option<usize> {
        let base = self.position_of(owner)?;
        if site.row(owner).folded() {
            return None;
        }
        let mut at = base + 1;
        for &sibling in &site.row(owner).children()[..offset] {
            at += self.pool.get(self.find_row(sibling)).tree_length;
        }
        Some(at)
    }

    fn flatten_into(
        &mut self,
        site: &Site,
        doc: &Doc,
        row: SiteRowId,
        out: &mut Vec<SceneRowId>,
    ) -> usize {
        let scene_row = self.adopt(site, doc, row);
        out.push(scene_row);
        let mut extent = 1;
        if !site.row(row).folded() {
            let children: Vec<SiteRowId> = site.row(row).children().to_vec();
            for child in children {
                extent += self.flatten_into(site, doc, child, out);
            }
        }
        if let Some(entry) = self.pool.get_mut(scene_row) {
            entry.tree_length = extent;
        }
        extent
    }

    fn adopt(&mut self, site: &Site, doc: &Doc, row: SiteRowId) -> SceneRowId {
        let existing = self.pool.search(|entry| entry.site == row);
        let scene_row = if existing.is_end() {
            let line = site.row(row).line();
            self.pool.create(|id| SceneRow {
                id,
                site: row,
                line,
                cells: RowCells::new("", -1),
                tree_length: 1,
            })
        } else {
            existing
        };
        self.refresh(site, doc, scene_row);
        scene_row
    }

    fn refresh(&mut self, site: &Site, doc: &Doc, scene_row: SceneRowId) {
        let entry = self.pool.get(scene_row);
        let (site_row, line) = (entry.site, entry.line);
        let indent = self.indent_for(site, site_row);
        let content = doc.line(line).content();
        let entry = self.pool.get(scene_row);
        if entry.cells.source() != content || entry.cells.indent() != indent {
            let cells = RowCells::new(content, indent);
            if let Some(entry) = self.pool.get_mut(scene_row) {
                entry.cells = cells;
            }
        }
    }

    /// Indent of an overlay row relative to the view root.
    fn indent_for(&self, site: &Site, row: SiteRowId) -> i32 {
        if row == self.view_root {
            return -1;
        }
        let mut depth = 0;
        let mut current = row;
        while current != self.view_root && !current.is_end() {
            depth += 1;
            current = site.row(current).parent();
        }
        depth
    }

    /// Adds `delta` to the cached extent of every ancestor from
    /// `from` up to the view root. Ancestors hidden or outside the
    /// view pick up a stale value that is rebuilt when they are next
    /// flattened.
    fn bump_ancestors(&mut self, site: &Site, from: SiteRowId, delta: isize) {
        let mut current = from;
        while !current.is_end() {
            let scene_row = self.find_row(current);
            if let Some(entry) = self.pool.get_mut(scene_row) {
                entry.tree_length = (entry.tree_length as isize + delta) as usize;
            }
            if current == self.view_root {
                break;
            }
            current = site.row(current).parent();
        }
    }

    /// Drops pooled rows whose overlay rows no longer exist.
    fn sweep_dead(&mut self, site: &Site) {
        let dead: Vec<SceneRowId> = self
            .pool
            .iter()
            .filter(|(_, row)| !site.contains(row.site))
            .map(|(id, _)| id)
            .collect();
        for id in dead {
            self.pool.remove(id);
        }
    }

    fn pure_rows_of(&self, ids: &[SceneRowId]) -> Vec<PureRow> {
        ids.iter().map(|&id| self.pure_row(id)).collect()
    }
}

impl Default for Scene {
    fn default() -> Self {
        Scene::new()
    }
}
