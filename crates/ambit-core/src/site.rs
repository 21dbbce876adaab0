//! Fold-state overlay.
//!
//! A [`Site`] mirrors the document tree one row per line, identical
//! in shape, and adds the one thing the document does not know about:
//! whether a row is folded. Folding is a visibility flag, never a
//! structural removal, so the mirror only changes shape when the
//! document does. Document events are translated here into row-level
//! events for the visible projection downstream.

use std::collections::HashMap;

use crate::doc::{Doc, DocEvent};
use crate::pool::{DocLineId, Pool, SiteRowId};
use crate::selection::Selection;

/// One row of the fold overlay.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SiteRow {
    id: SiteRowId,
    line: DocLineId,
    parent: SiteRowId,
    children: Vec<SiteRowId>,
    folded: bool,
}

impl SiteRow {
    fn new(id: SiteRowId, line: DocLineId) -> Self {
        SiteRow {
            id,
            line,
            parent: SiteRowId::END,
            children: Vec::new(),
            folded: false,
        }
    }

    /// Row id.
    pub fn id(&self) -> SiteRowId {
        self.id
    }

    /// Document line this row mirrors.
    pub fn line(&self) -> DocLineId {
        self.line
    }

    /// Parent row, the sentinel for the root.
    pub fn parent(&self) -> SiteRowId {
        self.parent
    }

    /// Child rows in order.
    pub fn children(&self) -> &[SiteRowId] {
        &self.children
    }

    /// True when the row's children are hidden.
    pub fn folded(&self) -> bool {
        self.folded
    }

    /// True when the row has no children.
    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    /// True when the row has children.
    pub fn has_children(&self) -> bool {
        !self.children.is_empty()
    }
}

/// Row-level structural event dispatched to the visible projection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SiteEvent {
    /// New rows spliced in under `owner` at child `offset`.
    RowsInserted {
        /// Parent the rows were attached under.
        owner: SiteRowId,
        /// Child index of the first inserted row.
        offset: usize,
        /// Top-level inserted rows in order.
        rows: Vec<SiteRowId>,
    },
    /// Rows detached from `owner`. Their overlay entries are gone by
    /// the time this event is consumed.
    RowsRemoved {
        /// Parent the rows were detached from.
        owner: SiteRowId,
        /// The detached rows.
        rows: Vec<SiteRowId>,
    },
    /// One row relocated, keeping its identity and fold state.
    RowMoved {
        /// Parent before the move.
        old_owner: SiteRowId,
        /// Parent after the move.
        new_owner: SiteRowId,
        /// Child index after the move.
        new_offset: usize,
        /// The relocated row.
        row: SiteRowId,
    },
    /// The text behind `row` changed.
    RowTextChanged {
        /// Row whose line content changed.
        row: SiteRowId,
    },
    /// `row` folded; its subtree became invisible.
    RowFolded {
        /// The folded row.
        row: SiteRowId,
    },
    /// `row` unfolded; its subtree became visible again.
    RowUnfolded {
        /// The unfolded row.
        row: SiteRowId,
    },
}

/// Shape-identical overlay over one document.
///
/// Besides fold state the overlay owns the two pieces of view state
/// addressed in overlay coordinates: the zoom root and the current
/// selection.
#[derive(Debug)]
pub struct Site {
    root: SiteRowId,
    rows: Pool<SiteRowId, SiteRow>,
    by_line: HashMap<DocLineId, SiteRowId>,
    view_root: SiteRowId,
    selection: Selection,
    events: Vec<SiteEvent>,
}

impl Site {
    /// Builds the overlay by deep pre-order mirroring of the document
    /// tree, every row unfolded.
    pub fn new(doc: &Doc) -> Site {
        let mut site = Site {
            root: SiteRowId::END,
            rows: Pool::new(SiteRow::new(SiteRowId::END, DocLineId::END)),
            by_line: HashMap::new(),
            view_root: SiteRowId::END,
            selection: Selection::None,
            events: Vec::new(),
        };
        site.root = site.build_mirror(doc, doc.root());
        site.view_root = site.root;
        site
    }

    /// Root row id.
    pub fn root(&self) -> SiteRowId {
        self.root
    }

    /// Row the visible projection is currently rooted at.
    pub fn view_root(&self) -> SiteRowId {
        self.view_root
    }

    /// Current selection, addressed in overlay rows.
    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    /// Replaces the selection without validation.
    pub fn set_selection(&mut self, selection: Selection) {
        self.selection = selection;
    }

    /// Re-roots the view at `row`. False when the row is dead or
    /// already the view root.
    pub fn zoom_in(&mut self, row: SiteRowId) -> bool {
        if !self.rows.contains(row) || row == self.view_root {
            return false;
        }
        self.view_root = row;
        true
    }

    /// Walks the view root one level back toward the real root.
    pub fn zoom_out(&mut self) -> bool {
        if self.view_root == self.root {
            return false;
        }
        let parent = self.rows.get(self.view_root).parent();
        self.view_root = if parent.is_end() { self.root } else { parent };
        true
    }

    /// Looks up a row, resolving dead ids to the sentinel end row.
    pub fn row(&self, id: SiteRowId) -> &SiteRow {
        self.rows.get(id)
    }

    /// True when `id` addresses a live row.
    pub fn contains(&self, id: SiteRowId) -> bool {
        self.rows.contains(id)
    }

    /// Row mirroring `line`, the sentinel when none does.
    pub fn row_for_line(&self, line: DocLineId) -> SiteRowId {
        self.by_line.get(&line).copied().unwrap_or(SiteRowId::END)
    }

    /// Number of rows in `id`'s subtree, itself included, regardless
    /// of fold state.
    pub fn tree_length(&self, id: SiteRowId) -> usize {
        if !self.rows.contains(id) {
            return 0;
        }
        let mut total = 0;
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            total += 1;
            stack.extend(self.rows.get(current).children().iter().copied());
        }
        total
    }

    /// Child index of `child` under `owner`.
    pub fn index_of(&self, owner: SiteRowId, child: SiteRowId) -> Option<usize> {
        self.rows
            .get(owner)
            .children()
            .iter()
            .position(|&c| c == child)
    }

    /// Sibling directly before `id`, the sentinel at the boundary.
    pub fn prev_sibling(&self, id: SiteRowId) -> SiteRowId {
        let parent = self.rows.get(id).parent();
        let siblings = self.rows.get(parent).children();
        match siblings.iter().position(|&c| c == id) {
            Some(index) if index > 0 => siblings[index - 1],
            _ => SiteRowId::END,
        }
    }

    /// Sibling directly after `id`, the sentinel at the boundary.
    pub fn next_sibling(&self, id: SiteRowId) -> SiteRowId {
        let parent = self.rows.get(id).parent();
        let siblings = self.rows.get(parent).children();
        match siblings.iter().position(|&c| c == id) {
            Some(index) => siblings.get(index + 1).copied().unwrap_or(SiteRowId::END),
            None => SiteRowId::END,
        }
    }

    /// True when `ancestor` is `descendant` or lies on its parent
    /// chain.
    pub fn is_ancestor_of(&self, ancestor: SiteRowId, descendant: SiteRowId) -> bool {
        let mut current = descendant;
        while !current.is_end() {
            if current == ancestor {
                return true;
            }
            current = self.rows.get(current).parent();
        }
        false
    }

    /// Indicator character for a row: `' '` leaf, `'+'` folded,
    /// `'-'` unfolded with children.
    pub fn fold_indicator(&self, id: SiteRowId) -> char {
        let row = self.rows.get(id);
        if !row.has_children() {
            ' '
        } else if row.folded() {
            '+'
        } else {
            '-'
        }
    }

    /// Flips the fold state of `id`. A row without children has
    /// nothing to hide and is left alone.
    pub fn toggle_fold(&mut self, id: SiteRowId) -> bool {
        let folded = match self.rows.get_mut(id) {
            Some(row) if row.has_children() => {
                row.folded = !row.folded;
                row.folded
            }
            _ => return false,
        };
        if folded {
            self.events.push(SiteEvent::RowFolded { row: id });
        } else {
            self.events.push(SiteEvent::RowUnfolded { row: id });
        }
        true
    }

    /// Drains the event outbox.
    pub fn take_events(&mut self) -> Vec<SiteEvent> {
        std::mem::take(&mut self.events)
    }

    /// Translates drained document events into overlay mutations and
    /// row events, keeping the mirror shape-identical to the tree.
    pub fn apply_doc_events(&mut self, doc: &Doc, events: &[DocEvent]) {
        for event in events {
            match event {
                DocEvent::LinesInserted {
                    owner,
                    offset,
                    lines,
                } => self.mirror_insert(doc, *owner, *offset, lines),
                DocEvent::LinesRemoved { owner, lines, .. } => self.mirror_remove(*owner, lines),
                DocEvent::LineMoved {
                    old_owner,
                    new_owner,
                    new_offset,
                    line,
                    ..
                } => self.mirror_move(*old_owner, *new_owner, *new_offset, *line),
                DocEvent::TextChanged { line } => {
                    let row = self.row_for_line(*line);
                    if !row.is_end() {
                        self.events.push(SiteEvent::RowTextChanged { row });
                    }
                }
                DocEvent::LineSplit {
                    owner,
                    line,
                    new_line,
                    index,
                } => {
                    let row = self.row_for_line(*line);
                    if !row.is_end() {
                        self.events.push(SiteEvent::RowTextChanged { row });
                    }
                    self.mirror_insert(doc, *owner, *index, &[*new_line]);
                }
                DocEvent::LineJoined {
                    owner,
                    line,
                    removed,
                    ..
                } => {
                    let row = self.row_for_line(*line);
                    if !row.is_end() {
                        self.events.push(SiteEvent::RowTextChanged { row });
                    }
                    self.mirror_remove(*owner, &[*removed]);
                }
            }
        }
        if !self.selection_alive() {
            self.selection = Selection::None;
        }
    }

    fn selection_alive(&self) -> bool {
        match &self.selection {
            Selection::None => true,
            Selection::Caret(caret) => self.rows.contains(caret.row()),
            Selection::Block(block) => {
                self.rows.contains(block.parent()) && self.rows.contains(block.focus_row())
            }
        }
    }

    fn mirror_insert(&mut self, doc: &Doc, owner: DocLineId, offset: usize, lines: &[DocLineId]) {
        let owner_row = self.row_for_line(owner);
        if owner_row.is_end() {
            return;
        }
        let mut new_rows = Vec::with_capacity(lines.len());
        for &line in lines {
            new_rows.push(self.build_mirror(doc, line));
        }
        let at = self.attach(owner_row, offset, &new_rows);
        self.events.push(SiteEvent::RowsInserted {
            owner: owner_row,
            offset: at,
            rows: new_rows,
        });
    }

    fn mirror_remove(&mut self, owner: DocLineId, lines: &[DocLineId]) {
        let owner_row = self.row_for_line(owner);
        if owner_row.is_end() {
            return;
        }
        let mut removed = Vec::with_capacity(lines.len());
        for &line in lines {
            let row = self.row_for_line(line);
            if row.is_end() {
                continue;
            }
            if let Some(index) = self.index_of(owner_row, row) {
                if let Some(owner_entry) = self.rows.get_mut(owner_row) {
                    owner_entry.children.remove(index);
                }
                removed.push(row);
            }
        }
        if removed.is_empty() {
            return;
        }
        self.events.push(SiteEvent::RowsRemoved {
            owner: owner_row,
            rows: removed.clone(),
        });
        for row in removed {
            self.purge_subtree(row);
        }
        if !self.rows.contains(self.view_root) {
            self.view_root = owner_row;
        }
    }

    fn mirror_move(
        &mut self,
        old_owner: DocLineId,
        new_owner: DocLineId,
        new_offset: usize,
        line: DocLineId,
    ) {
        let row = self.row_for_line(line);
        let old_owner_row = self.row_for_line(old_owner);
        let new_owner_row = self.row_for_line(new_owner);
        if row.is_end() || old_owner_row.is_end() || new_owner_row.is_end() {
            return;
        }
        let Some(index) = self.index_of(old_owner_row, row) else {
            return;
        };
        if let Some(owner_entry) = self.rows.get_mut(old_owner_row) {
            owner_entry.children.remove(index);
        }
        let at = self.attach(new_owner_row, new_offset, &[row]);
        self.events.push(SiteEvent::RowMoved {
            old_owner: old_owner_row,
            new_owner: new_owner_row,
            new_offset: at,
            row,
        });
    }

    fn attach(&mut self, owner: SiteRowId, offset: usize, rows: &[SiteRowId]) -> usize {
        for &row in rows {
            if let Some(entry) = self.rows.get_mut(row) {
                entry.parent = owner;
            }
        }
        match self.rows.get_mut(owner) {
            Some(entry) => {
                let at = offset.min(entry.children.len());
                entry.children.splice(at..at, rows.iter().copied());
                at
            }
            None => offset,
        }
    }

    fn build_mirror(&mut self, doc: &Doc, line: DocLineId) -> SiteRowId {
        let row = self.rows.create(|id| SiteRow::new(id, line));
        self.by_line.insert(line, row);
        let children: Vec<DocLineId> = doc.line(line).children().to_vec();
        let mut mirrored = Vec::with_capacity(children.len());
        for child in children {
            mirrored.push(self.build_mirror(doc, child));
        }
        for &child_row in &mirrored {
            if let Some(entry) = self.rows.get_mut(child_row) {
                entry.parent = row;
            }
        }
        if let Some(entry) = self.rows.get_mut(row) {
            entry.children = mirrored;
        }
        row
    }

    fn purge_subtree(&mut self, row: SiteRowId) {
        let children: Vec<SiteRowId> = self.rows.get(row).children().to_vec();
        for child in children {
            self.purge_subtree(child);
        }
        let line = self.rows.get(row).line();
        self.by_line.remove(&line);
        self.rows.remove(row);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::change::Change;

    fn pipeline(text: &str) -> (Doc, Site) {
        let doc = Doc::from_text("notes", text);
        let site = Site::new(&doc);
        (doc, site)
    }

    fn assert_mirrors(doc: &Doc, site: &Site) {
        for line in doc.subtree(doc.root()).collect::<Vec<_>>() {
            let row = site.row_for_line(line);
            assert!(!row.is_end(), "line {} has no row", line);
            let line_children = doc.line(line).children();
            let row_children = site.row(row).children();
            assert_eq!(line_children.len(), row_children.len());
            for (child_line, &child_row) in line_children.iter().zip(row_children) {
                assert_eq!(site.row(child_row).line(), *child_line);
                assert_eq!(site.row(child_row).parent(), row);
            }
        }
    }

    #[test]
    fn test_mirror_matches_doc_shape() {
        let (doc, site) = pipeline("Root\n\tA\n\tB\n\t\tC");
        assert_mirrors(&doc, &site);
        assert_eq!(site.tree_length(site.root()), 4);
        let b = site.row(site.root()).children()[1];
        assert_eq!(site.tree_length(b), 2);
    }

    #[test]
    fn test_toggle_fold_requires_children() {
        let (_, mut site) = pipeline("Root\n\tA\n\tB\n\t\tC");
        let a = site.row(site.root()).children()[0];
        let b = site.row(site.root()).children()[1];

        assert!(!site.toggle_fold(a));
        assert!(!site.row(a).folded());
        assert!(site.take_events().is_empty());

        assert!(site.toggle_fold(b));
        assert!(site.row(b).folded());
        assert!(site.toggle_fold(b));
        assert!(!site.row(b).folded());
        assert_eq!(
            site.take_events(),
            vec![
                SiteEvent::RowFolded { row: b },
                SiteEvent::RowUnfolded { row: b }
            ]
        );
    }

    #[test]
    fn test_insert_keeps_mirror_identical() {
        let (mut doc, mut site) = pipeline("Root\n\tA\n\tB\n\t\tC");
        let root = doc.root();
        let b = doc.line(root).children()[1];

        let change = Change::insert_before(&doc, b, vec!["X".to_string(), "\tY".to_string()]);
        doc.apply(&change).expect("change must apply");
        let events = doc.take_events();
        site.apply_doc_events(&doc, &events);

        assert_mirrors(&doc, &site);
        let site_events = site.take_events();
        assert_eq!(site_events.len(), 1);
        assert!(matches!(
            site_events[0],
            SiteEvent::RowsInserted { offset: 1, .. }
        ));
    }

    #[test]
    fn test_move_reuses_row_and_keeps_fold_state() {
        let (mut doc, mut site) = pipeline("Root\n\tA\n\tB\n\t\tC");
        let root = doc.root();
        let a = doc.line(root).children()[0];
        let b = doc.line(root).children()[1];
        let b_row = site.row_for_line(b);

        site.toggle_fold(b_row);
        site.take_events();

        doc.apply(&Change::move_below(b, a)).expect("change must apply");
        let events = doc.take_events();
        site.apply_doc_events(&doc, &events);

        assert_mirrors(&doc, &site);
        assert_eq!(site.row_for_line(b), b_row);
        assert!(site.row(b_row).folded());
        assert!(matches!(
            site.take_events()[..],
            [SiteEvent::RowMoved { row, .. }] if row == b_row
        ));
    }

    #[test]
    fn test_remove_purges_overlay_rows() {
        let (mut doc, mut site) = pipeline("Root\n\tA\n\tB\n\t\tC");
        let b = doc.line(doc.root()).children()[1];
        let c = doc.line(b).children()[0];
        let b_row = site.row_for_line(b);
        let c_row = site.row_for_line(c);

        let change = Change::remove(&doc, b, 1);
        doc.apply(&change).expect("change must apply");
        let events = doc.take_events();
        site.apply_doc_events(&doc, &events);

        assert!(!site.contains(b_row));
        assert!(!site.contains(c_row));
        assert!(site.row_for_line(b).is_end());
        assert_eq!(site.tree_length(site.root()), 2);
        assert!(matches!(
            site.take_events()[..],
            [SiteEvent::RowsRemoved { .. }]
        ));
    }

    #[test]
    fn test_split_emits_text_change_then_insert() {
        let (mut doc, mut site) = pipeline("Root\n\tAB");
        let line = doc.line(doc.root()).children()[0];
        let line_row = site.row_for_line(line);

        doc.split_line(line, 1).expect("split must succeed");
        let events = doc.take_events();
        site.apply_doc_events(&doc, &events);

        assert_mirrors(&doc, &site);
        let events = site.take_events();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0], SiteEvent::RowTextChanged { row: line_row });
        assert!(matches!(events[1], SiteEvent::RowsInserted { offset: 1, .. }));
    }

    #[test]
    fn test_sibling_navigation() {
        let (_, site) = pipeline("Root\n\tA\n\tB\n\t\tC");
        let a = site.row(site.root()).children()[0];
        let b = site.row(site.root()).children()[1];

        assert_eq!(site.next_sibling(a), b);
        assert_eq!(site.prev_sibling(b), a);
        assert!(site.prev_sibling(a).is_end());
        assert!(site.next_sibling(b).is_end());
        assert!(site.is_ancestor_of(site.root(), b));
        assert!(!site.is_ancestor_of(b, a));
    }

    #[test]
    fn test_fold_indicator_chars() {
        let (_, mut site) = pipeline("Root\n\tA\n\tB\n\t\tC");
        let a = site.row(site.root()).children()[0];
        let b = site.row(site.root()).children()[1];

        assert_eq!(site.fold_indicator(a), ' ');
        assert_eq!(site.fold_indicator(b), '-');
        site.toggle_fold(b);
        assert_eq!(site.fold_indicator(b), '+');
    }

    #[test]
    fn test_zoom_walks_back_to_root() {
        let (_, mut site) = pipeline("Root\n\tA\n\tB\n\t\tC");
        let b = site.row(site.root()).children()[1];
        let c = site.row(b).children()[0];

        assert_eq!(site.view_root(), site.root());
        assert!(site.zoom_in(c));
        assert!(!site.zoom_in(c));
        assert_eq!(site.view_root(), c);
        assert!(site.zoom_out());
        assert_eq!(site.view_root(), b);
        assert!(site.zoom_out());
        assert_eq!(site.view_root(), site.root());
        assert!(!site.zoom_out());
    }

    #[test]
    fn test_removal_resets_dead_view_root_and_selection() {
        let (mut doc, mut site) = pipeline("Root\n\tA\n\tB\n\t\tC");
        let b = doc.line(doc.root()).children()[1];
        let b_row = site.row_for_line(b);
        let c_row = site.row(b_row).children()[0];

        site.zoom_in(c_row);
        site.set_selection(Selection::Caret(
            crate::selection::CellTextSelection::caret(c_row, 1, 0).expect("row is live"),
        ));

        let change = Change::remove(&doc, b, 1);
        doc.apply(&change).expect("change must apply");
        let events = doc.take_events();
        site.apply_doc_events(&doc, &events);

        assert_eq!(site.view_root(), site.root());
        assert!(site.selection().is_none());
    }
}
