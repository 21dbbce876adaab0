//! Selection model.
//!
//! Selection is addressed through overlay rows, never through render
//! rows, so it survives folding and incremental re-projection. Two
//! shapes exist: a text caret inside one cell
//! ([`CellTextSelection`]) and a rectangular block of sibling rows
//! under one parent ([`CellBlock`]). Both are immutable values,
//! replaced wholesale on every selection change, which makes "did the
//! selection change" a plain equality check.

use std::error::Error;
use std::fmt;

use crate::pool::{SceneRowId, SiteRowId};
use crate::site::Site;
use crate::span::Span;

/// Error building a selection value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectionError {
    /// The addressed row was the sentinel end row.
    EndRow,
}

impl fmt::Display for SelectionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SelectionError::EndRow => write!(f, "selection cannot address the end row"),
        }
    }
}

impl Error for SelectionError {}

/// Text caret (or range) inside one cell of one row.
///
/// `focus` and `anchor` are byte offsets local to the cell text.
/// `focus` is the moving end, `anchor` the fixed end; a caret has the
/// two equal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CellTextSelection {
    row: SiteRowId,
    cell_index: usize,
    focus: usize,
    anchor: usize,
}

impl CellTextSelection {
    /// Selection with distinct focus and anchor offsets.
    pub fn new(
        row: SiteRowId,
        cell_index: usize,
        focus: usize,
        anchor: usize,
    ) -> Result<Self, SelectionError> {
        if row.is_end() {
            return Err(SelectionError::EndRow);
        }
        Ok(CellTextSelection {
            row,
            cell_index,
            focus,
            anchor,
        })
    }

    /// Collapsed selection at one offset.
    pub fn caret(row: SiteRowId, cell_index: usize, offset: usize) -> Result<Self, SelectionError> {
        CellTextSelection::new(row, cell_index, offset, offset)
    }

    /// Overlay row holding the caret.
    pub fn row(&self) -> SiteRowId {
        self.row
    }

    /// Cell index within the row.
    pub fn cell_index(&self) -> usize {
        self.cell_index
    }

    /// Moving end, a byte offset into the cell text.
    pub fn focus(&self) -> usize {
        self.focus
    }

    /// Fixed end, a byte offset into the cell text.
    pub fn anchor(&self) -> usize {
        self.anchor
    }

    /// True when focus and anchor differ.
    pub fn has_range(&self) -> bool {
        self.focus != self.anchor
    }

    /// Selected byte range in cell-local coordinates, ordered.
    pub fn range(&self) -> Span {
        let begin = self.focus.min(self.anchor);
        let end = self.focus.max(self.anchor);
        Span::at(begin, end - begin)
    }
}

/// Rectangular selection: a contiguous run of sibling rows under one
/// parent, crossed with a column range. Descendants of a selected
/// sibling are implicitly included and never enumerated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CellBlock {
    parent: SiteRowId,
    start_child: usize,
    end_child: usize,
    start_column: usize,
    end_column: Option<usize>,
    focus_row: SiteRowId,
    focus_cell: usize,
}

impl CellBlock {
    /// Block over children `start_child..=end_child` of `parent`,
    /// restricted to the given column range.
    pub fn new(
        parent: SiteRowId,
        start_child: usize,
        end_child: usize,
        start_column: usize,
        end_column: Option<usize>,
        focus_row: SiteRowId,
        focus_cell: usize,
    ) -> Self {
        CellBlock {
            parent,
            start_child,
            end_child,
            start_column,
            end_column,
            focus_row,
            focus_cell,
        }
    }

    /// Full-width block over the sibling range between `focus_index`
    /// and `anchor_index`, in either order. `focus_row` must be the
    /// row at `focus_index` under `parent` (the sentinel when the
    /// index is out of range).
    pub fn spanning(
        parent: SiteRowId,
        focus_row: SiteRowId,
        focus_index: usize,
        anchor_index: usize,
    ) -> Self {
        CellBlock {
            parent,
            start_child: focus_index.min(anchor_index),
            end_child: focus_index.max(anchor_index),
            start_column: 0,
            end_column: None,
            focus_row,
            focus_cell: 0,
        }
    }

    /// Common parent of the selected siblings.
    pub fn parent(&self) -> SiteRowId {
        self.parent
    }

    /// First selected child index.
    pub fn start_child(&self) -> usize {
        self.start_child
    }

    /// Last selected child index, inclusive.
    pub fn end_child(&self) -> usize {
        self.end_child
    }

    /// First selected column.
    pub fn start_column(&self) -> usize {
        self.start_column
    }

    /// Last selected column, `None` for unbounded.
    pub fn end_column(&self) -> Option<usize> {
        self.end_column
    }

    /// Row carrying the block focus.
    pub fn focus_row(&self) -> SiteRowId {
        self.focus_row
    }

    /// Cell index of the block focus.
    pub fn focus_cell(&self) -> usize {
        self.focus_cell
    }

    /// True when `row` falls inside the block: either a selected
    /// sibling itself or any descendant of one. The walk climbs to the
    /// first direct child of the block parent and tests its sibling
    /// index against the selected range.
    pub fn includes_site_row(&self, site: &Site, row: SiteRowId) -> bool {
        if self.parent.is_end() {
            return false;
        }
        let mut current = row;
        while !current.is_end() {
            let parent = site.row(current).parent();
            if parent == self.parent {
                return match site.index_of(parent, current) {
                    Some(index) => index >= self.start_child && index <= self.end_child,
                    None => false,
                };
            }
            current = parent;
        }
        false
    }

    /// True when the cell at (`row`, `cell_index`) falls inside the
    /// block's row range and column range. Unlike row inclusion this
    /// is exact: `row` must be a direct child of the block parent, so
    /// cells of implicitly included descendants report false.
    pub fn includes_cell(&self, site: &Site, row: SiteRowId, cell_index: usize) -> bool {
        if self.parent.is_end() || site.row(row).parent() != self.parent {
            return false;
        }
        let in_range = match site.index_of(self.parent, row) {
            Some(index) => index >= self.start_child && index <= self.end_child,
            None => false,
        };
        if !in_range || cell_index < self.start_column {
            return false;
        }
        match self.end_column {
            Some(end) => cell_index <= end,
            None => true,
        }
    }

    /// True only for the exact focus cell.
    pub fn is_active_cell(&self, row: SiteRowId, cell_index: usize) -> bool {
        !self.parent.is_end() && row == self.focus_row && cell_index == self.focus_cell
    }
}

/// Current selection state of one document view.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Selection {
    /// Nothing selected.
    #[default]
    None,
    /// Text caret or range inside one cell.
    Caret(CellTextSelection),
    /// Rectangular block of sibling rows.
    Block(CellBlock),
}

impl Selection {
    /// True when nothing is selected.
    pub fn is_none(&self) -> bool {
        matches!(self, Selection::None)
    }

    /// The caret, when the selection is one.
    pub fn as_caret(&self) -> Option<&CellTextSelection> {
        match self {
            Selection::Caret(caret) => Some(caret),
            _ => None,
        }
    }

    /// The block, when the selection is one.
    pub fn as_block(&self) -> Option<&CellBlock> {
        match self {
            Selection::Block(block) => Some(block),
            _ => None,
        }
    }
}

/// Per-cell selection styling record for the render collaborator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PureCellSelection {
    /// Render row the cell sits on.
    pub row: SceneRowId,
    /// Cell index within the row.
    pub cell_index: usize,
    /// True when the cell falls inside the selection.
    pub selected: bool,
    /// True only for the focus cell.
    pub active: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::doc::Doc;

    fn site_fixture() -> Site {
        let doc = Doc::from_text("notes", "Root\n\tA\n\tB\n\t\tC");
        Site::new(&doc)
    }

    #[test]
    fn test_caret_rejects_end_row() {
        assert_eq!(
            CellTextSelection::caret(SiteRowId::END, 0, 0),
            Err(SelectionError::EndRow)
        );
    }

    #[test]
    fn test_range_orders_focus_and_anchor() {
        let site = site_fixture();
        let a = site.row(site.root()).children()[0];
        let sel = CellTextSelection::new(a, 1, 5, 2).expect("row is live");
        assert!(sel.has_range());
        assert_eq!(sel.range(), Span::at(2, 3));

        let caret = CellTextSelection::caret(a, 1, 4).expect("row is live");
        assert!(!caret.has_range());
        assert!(caret.range().is_empty());
    }

    #[test]
    fn test_block_includes_descendants_implicitly() {
        let site = site_fixture();
        let root = site.root();
        let a = site.row(root).children()[0];
        let b = site.row(root).children()[1];
        let c = site.row(b).children()[0];

        let block = CellBlock::spanning(root, a, 0, 1);
        assert!(block.includes_site_row(&site, a));
        assert!(block.includes_site_row(&site, b));
        assert!(block.includes_site_row(&site, c));
        assert!(!block.includes_site_row(&site, root));
    }

    #[test]
    fn test_block_sibling_range_excludes_outsiders() {
        let site = site_fixture();
        let root = site.root();
        let a = site.row(root).children()[0];
        let b = site.row(root).children()[1];
        let c = site.row(b).children()[0];

        let block = CellBlock::spanning(b, c, 0, 0);
        assert!(block.includes_site_row(&site, c));
        assert!(!block.includes_site_row(&site, a));
        assert!(!block.includes_site_row(&site, b));
    }

    #[test]
    fn test_grandchild_cell_outside_sibling_block() {
        let site = site_fixture();
        let root = site.root();
        let a = site.row(root).children()[0];
        let b = site.row(root).children()[1];
        let c = site.row(b).children()[0];

        // The grandchild rides along as a row but never as a cell.
        let block = CellBlock::spanning(root, a, 0, 1);
        assert!(block.includes_site_row(&site, c));
        assert!(!block.includes_cell(&site, c, 0));
        assert!(!block.includes_cell(&site, c, 3));
        assert!(block.includes_cell(&site, a, 2));
        assert!(block.includes_cell(&site, b, 0));
    }

    #[test]
    fn test_column_range_bounds_cells() {
        let site = site_fixture();
        let root = site.root();
        let a = site.row(root).children()[0];

        let block = CellBlock::new(root, 0, 1, 1, Some(2), a, 1);
        assert!(!block.includes_cell(&site, a, 0));
        assert!(block.includes_cell(&site, a, 1));
        assert!(block.includes_cell(&site, a, 2));
        assert!(!block.includes_cell(&site, a, 3));
    }

    #[test]
    fn test_active_cell_is_exact() {
        let site = site_fixture();
        let root = site.root();
        let a = site.row(root).children()[0];
        let b = site.row(root).children()[1];

        let block = CellBlock::spanning(root, a, 0, 1);
        assert!(block.is_active_cell(a, 0));
        assert!(!block.is_active_cell(a, 1));
        assert!(!block.is_active_cell(b, 0));
    }

    #[test]
    fn test_spanning_normalizes_order() {
        let site = site_fixture();
        let root = site.root();
        let b = site.row(root).children()[1];

        let block = CellBlock::spanning(root, b, 1, 0);
        assert_eq!(block.start_child(), 0);
        assert_eq!(block.end_child(), 1);
        assert_eq!(block.focus_row(), b);
        assert_eq!(block.end_column(), None);
    }
}
