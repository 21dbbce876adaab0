//! Structural change commands.
//!
//! Every mutation of a document is described by one [`Change`] value:
//! an immutable command capturing exactly the lines and positions it
//! affects. Maker functions snapshot anchors (owner and child offset)
//! at construction time; [`crate::doc::Doc::apply`] validates the
//! whole command against the current tree before touching anything,
//! so a change either fully applies or leaves the tree untouched.
//!
//! Moves carry exactly one line. Relocating several lines at once is
//! deliberately not expressible, so concurrent projections can never
//! observe a half-moved sibling range.

use crate::doc::Doc;
use crate::pool::DocLineId;
use crate::span::{Span, SpanError};

/// Error raised when a change is rejected before application.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChangeError {
    /// The change's text snapshot no longer matches the document.
    StaleText {
        /// Line being edited.
        line: DocLineId,
        /// Text the change expected to replace.
        expected: String,
        /// Text actually stored.
        found: String,
    },
    /// The addressed cell index is not a text cell of the line.
    BadCell {
        /// Line being edited.
        line: DocLineId,
        /// Offending cell index.
        index: usize,
    },
    /// A byte range is malformed or reaches outside its cell.
    Span(SpanError),
    /// A byte offset does not lie on a character boundary.
    NotCharBoundary {
        /// Offending byte offset.
        offset: usize,
    },
}

impl std::fmt::Display for ChangeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ChangeError::StaleText {
                line,
                expected,
                found,
            } => {
                write!(
                    f,
                    "Stale text for {}: expected {:?}, found {:?}",
                    line, expected, found
                )
            }
            ChangeError::BadCell { line, index } => {
                write!(f, "Cell {} is not a text cell of {}", index, line)
            }
            ChangeError::Span(err) => write!(f, "{}", err),
            ChangeError::NotCharBoundary { offset } => {
                write!(f, "Offset {} is not a character boundary", offset)
            }
        }
    }
}

impl std::error::Error for ChangeError {}

impl From<SpanError> for ChangeError {
    fn from(err: SpanError) -> Self {
        ChangeError::Span(err)
    }
}

/// One atomic structural or textual edit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Change {
    /// Insert new lines, parsed from text with tab depths relative to
    /// the owner, at a child offset of `owner`.
    InsertBefore {
        /// Parent to attach under.
        owner: DocLineId,
        /// Child index to splice at.
        offset: usize,
        /// Raw line texts, tabs giving relative depth.
        lines: Vec<String>,
    },
    /// Insert new lines as the first children of `parent`.
    InsertBelow {
        /// Parent to attach under.
        parent: DocLineId,
        /// Raw line texts, tabs giving relative depth.
        lines: Vec<String>,
    },
    /// Relocate one line, with its subtree, to a child offset of
    /// `owner`.
    MoveBefore {
        /// Line to relocate.
        line: DocLineId,
        /// Parent to attach under.
        owner: DocLineId,
        /// Child index to land at.
        offset: usize,
    },
    /// Relocate one line, with its subtree, to become the last child
    /// of `parent`.
    MoveBelow {
        /// Line to relocate.
        line: DocLineId,
        /// Parent to attach under.
        parent: DocLineId,
    },
    /// Detach a run of sibling lines. The lines stay pooled so a
    /// `Reinsert` can bring them back.
    Remove {
        /// Parent to detach from.
        owner: DocLineId,
        /// Child index of the first line in the run.
        offset: usize,
        /// The expected run, checked against the tree at apply time.
        lines: Vec<DocLineId>,
    },
    /// Replace a line's whole content. `old_text` is the snapshot the
    /// change was built against; a mismatch at apply time is a stale
    /// reference and rejects the change.
    LineTextChange {
        /// Line to rewrite.
        line: DocLineId,
        /// Content the change was built against.
        old_text: String,
        /// Replacement content.
        new_text: String,
    },
    /// Replace a byte range local to one cell of the line.
    CellTextChange {
        /// Line to rewrite.
        line: DocLineId,
        /// Index of the cell within the line's row cells.
        cell_index: usize,
        /// Byte range within the cell text.
        span: Span,
        /// Replacement text.
        text: String,
    },
    /// Re-attach previously removed lines under `owner`.
    Reinsert {
        /// Parent to attach under.
        owner: DocLineId,
        /// Child index to splice at.
        offset: usize,
        /// Previously detached lines, still pooled.
        lines: Vec<DocLineId>,
    },
    /// Does nothing. Makers return this when an anchor has already
    /// gone away.
    NoOp,
}

impl Change {
    /// Insert `lines` directly before `before`, under its parent.
    pub fn insert_before(doc: &Doc, before: DocLineId, lines: Vec<String>) -> Change {
        let owner = doc.line(before).parent();
        if owner.is_end() {
            return Change::NoOp;
        }
        let offset = doc.index_or_last(owner, before);
        Change::InsertBefore {
            owner,
            offset,
            lines,
        }
    }

    /// Insert `lines` directly after `after`, under its parent.
    pub fn insert_after(doc: &Doc, after: DocLineId, lines: Vec<String>) -> Change {
        let owner = doc.line(after).parent();
        if owner.is_end() {
            return Change::NoOp;
        }
        match doc.index_of(owner, after) {
            Some(index) => Change::InsertBefore {
                owner,
                offset: index + 1,
                lines,
            },
            None => Change::NoOp,
        }
    }

    /// Insert `lines` as the first children of `parent`.
    pub fn insert_below(parent: DocLineId, lines: Vec<String>) -> Change {
        Change::InsertBelow { parent, lines }
    }

    /// Move `line` directly before `before`, under `before`'s parent.
    /// Moving a line into its own subtree degrades to a no-op.
    pub fn move_before(doc: &Doc, line: DocLineId, before: DocLineId) -> Change {
        let owner = doc.line(before).parent();
        if owner.is_end() {
            return Change::NoOp;
        }
        if doc.is_ancestor_of(line, owner) {
            return Change::NoOp;
        }
        let offset = doc.index_or_last(owner, before);
        Change::MoveBefore {
            line,
            owner,
            offset,
        }
    }

    /// Move `line` directly after `after`, under `after`'s parent.
    pub fn move_after(doc: &Doc, line: DocLineId, after: DocLineId) -> Change {
        let owner = doc.line(after).parent();
        if owner.is_end() {
            return Change::NoOp;
        }
        if doc.is_ancestor_of(line, owner) {
            return Change::NoOp;
        }
        match doc.index_of(owner, after) {
            Some(index) => Change::MoveBefore {
                line,
                owner,
                offset: index + 1,
            },
            None => Change::NoOp,
        }
    }

    /// Move `line` to become the last child of `parent`.
    pub fn move_below(line: DocLineId, parent: DocLineId) -> Change {
        Change::MoveBelow { line, parent }
    }

    /// Remove `count` siblings starting at `first`, clamped to the
    /// end of the sibling list.
    pub fn remove(doc: &Doc, first: DocLineId, count: usize) -> Change {
        let owner = doc.line(first).parent();
        if owner.is_end() {
            return Change::NoOp;
        }
        let Some(offset) = doc.index_of(owner, first) else {
            return Change::NoOp;
        };
        let children = doc.line(owner).children();
        let end = (offset + count).min(children.len());
        let lines = children[offset..end].to_vec();
        if lines.is_empty() {
            return Change::NoOp;
        }
        Change::Remove {
            owner,
            offset,
            lines,
        }
    }

    /// Replace the whole content of `line`, snapshotting the current
    /// content for staleness detection.
    pub fn line_text(doc: &Doc, line: DocLineId, new_text: String) -> Change {
        if !doc.contains(line) {
            return Change::NoOp;
        }
        let old_text = doc.line(line).content().to_string();
        Change::LineTextChange {
            line,
            old_text,
            new_text,
        }
    }

    /// Replace `span` of the cell at `cell_index` of `line` with
    /// `text`.
    pub fn cell_text(line: DocLineId, cell_index: usize, span: Span, text: String) -> Change {
        Change::CellTextChange {
            line,
            cell_index,
            span,
            text,
        }
    }

    /// Re-attach previously removed `lines` under `owner`, before
    /// `before` or appended when `before` is not a child.
    pub fn reinsert(
        doc: &Doc,
        owner: DocLineId,
        before: DocLineId,
        lines: Vec<DocLineId>,
    ) -> Change {
        let offset = doc.index_or_last(owner, before);
        Change::Reinsert {
            owner,
            offset,
            lines,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Doc {
        Doc::from_text("notes", "Root\n\tA\n\tB\n\t\tC")
    }

    #[test]
    fn test_insert_before_captures_owner_and_offset() {
        let doc = sample();
        let root = doc.root();
        let b = doc.line(root).children()[1];

        let change = Change::insert_before(&doc, b, vec!["X".to_string()]);
        assert_eq!(
            change,
            Change::InsertBefore {
                owner: root,
                offset: 1,
                lines: vec!["X".to_string()],
            }
        );
    }

    #[test]
    fn test_insert_after_last_child_appends() {
        let doc = sample();
        let root = doc.root();
        let b = doc.line(root).children()[1];

        let change = Change::insert_after(&doc, b, vec!["X".to_string()]);
        assert_eq!(
            change,
            Change::InsertBefore {
                owner: root,
                offset: 2,
                lines: vec!["X".to_string()],
            }
        );
    }

    #[test]
    fn test_makers_degrade_to_noop_at_the_root() {
        let doc = sample();
        let root = doc.root();
        let a = doc.line(root).children()[0];

        assert_eq!(
            Change::insert_before(&doc, root, vec!["X".to_string()]),
            Change::NoOp
        );
        assert_eq!(Change::move_before(&doc, a, root), Change::NoOp);
        assert_eq!(Change::remove(&doc, root, 1), Change::NoOp);
    }

    #[test]
    fn test_move_maker_rejects_own_subtree() {
        let doc = sample();
        let root = doc.root();
        let b = doc.line(root).children()[1];
        let c = doc.line(b).children()[0];

        assert_eq!(Change::move_before(&doc, b, c), Change::NoOp);
        assert_eq!(Change::move_after(&doc, b, c), Change::NoOp);
    }

    #[test]
    fn test_remove_clamps_count() {
        let doc = sample();
        let root = doc.root();
        let a = doc.line(root).children()[0];
        let b = doc.line(root).children()[1];

        let change = Change::remove(&doc, a, 99);
        assert_eq!(
            change,
            Change::Remove {
                owner: root,
                offset: 0,
                lines: vec![a, b],
            }
        );
    }

    #[test]
    fn test_line_text_snapshots_current_content() {
        let doc = sample();
        let a = doc.line(doc.root()).children()[0];

        let change = Change::line_text(&doc, a, "A2".to_string());
        assert_eq!(
            change,
            Change::LineTextChange {
                line: a,
                old_text: "A".to_string(),
                new_text: "A2".to_string(),
            }
        );
    }
}
