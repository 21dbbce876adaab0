//! Key-level editing operations.
//!
//! Every handler reads the current selection, builds the matching
//! [`Change`] (or compound document operation), pumps it through the
//! pipeline, and repositions the selection, all under a single version
//! bump. Handlers on an absent or wrong-kind selection degrade to
//! no-ops rather than failing.
//!
//! Caret offsets move by grapheme cluster. Word jumps use the ASCII
//! word class `[A-Za-z0-9_]`.

use unicode_segmentation::UnicodeSegmentation;

use crate::cells::RowCells;
use crate::change::{Change, ChangeError};
use crate::pool::SiteRowId;
use crate::scene::RowPatch;
use crate::selection::{CellBlock, CellTextSelection, Selection};
use crate::span::Span;
use crate::state::{EditorState, StateChange, StateChangeType};

fn is_word_char(ch: char) -> bool {
    ch.is_ascii_alphanumeric() || ch == '_'
}

/// Start of the word at or before `offset`, or `None` at the start of
/// the text. Skips trailing separators first, then the word itself.
fn find_word_left(text: &str, offset: usize) -> Option<usize> {
    if offset == 0 {
        return None;
    }
    let chars: Vec<(usize, char)> = text.char_indices().collect();
    let mut pos = chars.iter().take_while(|(index, _)| *index < offset).count();
    while pos > 0 && !is_word_char(chars[pos - 1].1) {
        pos -= 1;
    }
    while pos > 0 && is_word_char(chars[pos - 1].1) {
        pos -= 1;
    }
    Some(byte_at(&chars, text, pos))
}

/// Start of the next word after `offset`, or `None` at the end of the
/// text. Skips the rest of the current word, then the separators.
fn find_word_right(text: &str, offset: usize) -> Option<usize> {
    if offset >= text.len() {
        return None;
    }
    let chars: Vec<(usize, char)> = text.char_indices().collect();
    let mut pos = chars.iter().take_while(|(index, _)| *index < offset).count();
    while pos < chars.len() && is_word_char(chars[pos].1) {
        pos += 1;
    }
    while pos < chars.len() && !is_word_char(chars[pos].1) {
        pos += 1;
    }
    Some(byte_at(&chars, text, pos))
}

fn byte_at(chars: &[(usize, char)], text: &str, pos: usize) -> usize {
    if pos == chars.len() {
        text.len()
    } else {
        chars[pos].0
    }
}

/// Byte offset of the grapheme boundary before `offset`, `None` at 0.
fn prev_grapheme(text: &str, offset: usize) -> Option<usize> {
    text[..offset].grapheme_indices(true).last().map(|(index, _)| index)
}

/// Byte offset of the grapheme boundary after `offset`, `None` at the
/// end.
fn next_grapheme(text: &str, offset: usize) -> Option<usize> {
    text[offset..].graphemes(true).next().map(|g| offset + g.len())
}

/// Locates the cell containing the source byte `offset`. An offset on
/// a tab boundary resolves to the end of the preceding cell.
fn cell_at_offset(cells: &RowCells, offset: usize) -> (usize, usize) {
    let first = cells.first_text_index();
    let mut position = 0;
    for index in first..=cells.last_index() {
        let len = cells.at(index).text().len();
        if offset <= position + len {
            return (index, offset - position);
        }
        position += len + 1;
    }
    (cells.last_index(), cells.at(cells.last_index()).text().len())
}

impl EditorState {
    /// Inserts `text` at the caret, replacing the selected range if
    /// there is one. The caret lands after the inserted text.
    pub fn insert_text(&mut self, text: &str) -> Result<StateChange, ChangeError> {
        let Some(sel) = self.caret_selection() else {
            return Ok(self.unchanged(StateChangeType::DocumentModified));
        };
        let cells = self.cells_for(sel.row());
        let range = sel.range();
        let line = self.site.row(sel.row()).line();
        let cell_index = self.doc_cell_index(sel.row(), &cells, sel.cell_index());
        let change = Change::cell_text(line, cell_index, range, text.to_string());
        let (mutated, patches) = self.apply_quiet(&change)?;
        if !mutated {
            return Ok(self.unchanged(StateChangeType::DocumentModified));
        }
        let target = cells.text_position(sel.cell_index()) + range.begin() + text.len();
        self.place_caret_at_offset(sel.row(), target);
        Ok(self.bump(StateChangeType::DocumentModified, patches))
    }

    /// Inserts one typed character at the caret.
    pub fn insert_char(&mut self, ch: char) -> Result<StateChange, ChangeError> {
        let mut buffer = [0u8; 4];
        self.insert_text(ch.encode_utf8(&mut buffer))
    }

    /// Splits the caret line. The line keeps the text before the
    /// caret and its children; the tail becomes a new following
    /// sibling carrying the caret. With a range selected the range is
    /// deleted instead.
    pub fn enter(&mut self) -> Result<StateChange, ChangeError> {
        let Some(sel) = self.caret_selection() else {
            return Ok(self.unchanged(StateChangeType::DocumentModified));
        };
        if sel.has_range() {
            return self.insert_text("");
        }
        let cells = self.cells_for(sel.row());
        let offset = cells.text_position(sel.cell_index()) + sel.focus();
        let line = self.site.row(sel.row()).line();
        let (new_line, patches) = self.split_quiet(line, offset)?;
        if new_line.is_end() {
            return Ok(self.unchanged(StateChangeType::DocumentModified));
        }
        let new_row = self.site.row_for_line(new_line);
        let target = self.cells_for(new_row);
        self.place_caret(new_row, target.first_text_index(), 0);
        Ok(self.bump(StateChangeType::DocumentModified, patches))
    }

    /// Deletes leftward: the range, one grapheme, the tab before the
    /// caret cell, or joins the line into its previous sibling.
    pub fn backspace(&mut self) -> Result<StateChange, ChangeError> {
        let Some(sel) = self.caret_selection() else {
            return Ok(self.unchanged(StateChangeType::DocumentModified));
        };
        if sel.has_range() {
            return self.insert_text("");
        }
        if sel.focus() > 0 {
            let cells = self.cells_for(sel.row());
            let text = cells.at(sel.cell_index()).text();
            let Some(begin) = prev_grapheme(text, sel.focus()) else {
                return Ok(self.unchanged(StateChangeType::DocumentModified));
            };
            let line = self.site.row(sel.row()).line();
            let cell_index = self.doc_cell_index(sel.row(), &cells, sel.cell_index());
            let span = Span::at(begin, sel.focus() - begin);
            let change = Change::cell_text(line, cell_index, span, String::new());
            let (mutated, patches) = self.apply_quiet(&change)?;
            if !mutated {
                return Ok(self.unchanged(StateChangeType::DocumentModified));
            }
            self.place_caret(sel.row(), sel.cell_index(), begin);
            return Ok(self.bump(StateChangeType::DocumentModified, patches));
        }
        let cells = self.cells_for(sel.row());
        if sel.cell_index() <= cells.first_text_index() {
            return self.join_to_previous_row(&sel);
        }
        self.join_cell_left(sel.row(), cells.text_position(sel.cell_index()))
    }

    /// Deletes rightward: the range, one grapheme, the tab after the
    /// caret cell, or joins the next sibling into this line.
    pub fn delete_forward(&mut self) -> Result<StateChange, ChangeError> {
        let Some(sel) = self.caret_selection() else {
            return Ok(self.unchanged(StateChangeType::DocumentModified));
        };
        if sel.has_range() {
            return self.insert_text("");
        }
        let cells = self.cells_for(sel.row());
        let text = cells.at(sel.cell_index()).text();
        if let Some(end) = next_grapheme(text, sel.focus()) {
            let line = self.site.row(sel.row()).line();
            let cell_index = self.doc_cell_index(sel.row(), &cells, sel.cell_index());
            let span = Span::at(sel.focus(), end - sel.focus());
            let change = Change::cell_text(line, cell_index, span, String::new());
            let (mutated, patches) = self.apply_quiet(&change)?;
            if !mutated {
                return Ok(self.unchanged(StateChangeType::DocumentModified));
            }
            return Ok(self.bump(StateChangeType::DocumentModified, patches));
        }
        if sel.cell_index() < cells.last_index() {
            let position = cells.text_position(sel.cell_index() + 1);
            return self.join_cell_left(sel.row(), position);
        }
        self.join_to_next_row(&sel)
    }

    /// Tab at the start of the line indents it under the previous
    /// sibling. Inside a cell it splits the cell at the caret. At the
    /// start of a later cell it does nothing.
    pub fn tab(&mut self) -> Result<StateChange, ChangeError> {
        let Some(sel) = self.caret_selection() else {
            return Ok(self.unchanged(StateChangeType::DocumentModified));
        };
        let cells = self.cells_for(sel.row());
        let offset = cells.text_position(sel.cell_index()) + sel.focus();
        if offset == 0 {
            return self.indent_row(&sel);
        }
        if sel.focus() == 0 {
            return Ok(self.unchanged(StateChangeType::DocumentModified));
        }
        let line = self.site.row(sel.row()).line();
        let content = self.doc.line(line).content();
        let merged = format!("{}\t{}", &content[..offset], &content[offset..]);
        let change = Change::line_text(&self.doc, line, merged);
        let (mutated, patches) = self.apply_quiet(&change)?;
        if !mutated {
            return Ok(self.unchanged(StateChangeType::DocumentModified));
        }
        self.place_caret_at_offset(sel.row(), offset + 1);
        Ok(self.bump(StateChangeType::DocumentModified, patches))
    }

    /// Shift-tab at the start of the line outdents it to sit after
    /// its parent. At the start of a later cell it removes the tab
    /// before the cell.
    pub fn shift_tab(&mut self) -> Result<StateChange, ChangeError> {
        let Some(sel) = self.caret_selection() else {
            return Ok(self.unchanged(StateChangeType::DocumentModified));
        };
        let cells = self.cells_for(sel.row());
        let offset = cells.text_position(sel.cell_index()) + sel.focus();
        if offset == 0 {
            return self.outdent_row(&sel);
        }
        if sel.focus() == 0 && sel.cell_index() > cells.first_text_index() {
            return self.join_cell_left(sel.row(), cells.text_position(sel.cell_index()));
        }
        Ok(self.unchanged(StateChangeType::DocumentModified))
    }

    /// Moves the previous sibling below the caret row, so the caret
    /// row slides up one place.
    pub fn swap_up(&mut self) -> Result<StateChange, ChangeError> {
        let Some(sel) = self.caret_selection() else {
            return Ok(self.unchanged(StateChangeType::DocumentModified));
        };
        let prev = self.site.prev_sibling(sel.row());
        if prev.is_end() {
            return Ok(self.unchanged(StateChangeType::DocumentModified));
        }
        let prev_line = self.site.row(prev).line();
        let line = self.site.row(sel.row()).line();
        let change = Change::move_after(&self.doc, prev_line, line);
        let (mutated, patches) = self.apply_quiet(&change)?;
        if !mutated {
            return Ok(self.unchanged(StateChangeType::DocumentModified));
        }
        Ok(self.bump(StateChangeType::DocumentModified, patches))
    }

    /// Moves the next sibling above the caret row.
    pub fn swap_down(&mut self) -> Result<StateChange, ChangeError> {
        let Some(sel) = self.caret_selection() else {
            return Ok(self.unchanged(StateChangeType::DocumentModified));
        };
        let next = self.site.next_sibling(sel.row());
        if next.is_end() {
            return Ok(self.unchanged(StateChangeType::DocumentModified));
        }
        let next_line = self.site.row(next).line();
        let line = self.site.row(sel.row()).line();
        let change = Change::move_before(&self.doc, next_line, line);
        let (mutated, patches) = self.apply_quiet(&change)?;
        if !mutated {
            return Ok(self.unchanged(StateChangeType::DocumentModified));
        }
        Ok(self.bump(StateChangeType::DocumentModified, patches))
    }

    /// One grapheme left, hopping to the end of the previous text
    /// cell at a cell start. A range collapses to its start.
    pub fn arrow_left(&mut self) -> Result<StateChange, ChangeError> {
        let Some(sel) = self.caret_selection() else {
            return Ok(self.unchanged(StateChangeType::SelectionChanged));
        };
        if sel.has_range() {
            return Ok(self.caret_to(sel.row(), sel.cell_index(), sel.range().begin()));
        }
        let cells = self.cells_for(sel.row());
        let text = cells.at(sel.cell_index()).text();
        if let Some(prev) = prev_grapheme(text, sel.focus()) {
            return Ok(self.caret_to(sel.row(), sel.cell_index(), prev));
        }
        if sel.cell_index() > cells.first_text_index() {
            let len = cells.at(sel.cell_index() - 1).text().len();
            return Ok(self.caret_to(sel.row(), sel.cell_index() - 1, len));
        }
        Ok(self.unchanged(StateChangeType::SelectionChanged))
    }

    /// One grapheme right, hopping to the start of the next cell at a
    /// cell end. A range collapses to its end.
    pub fn arrow_right(&mut self) -> Result<StateChange, ChangeError> {
        let Some(sel) = self.caret_selection() else {
            return Ok(self.unchanged(StateChangeType::SelectionChanged));
        };
        if sel.has_range() {
            return Ok(self.caret_to(sel.row(), sel.cell_index(), sel.range().end()));
        }
        let cells = self.cells_for(sel.row());
        let text = cells.at(sel.cell_index()).text();
        if let Some(next) = next_grapheme(text, sel.focus()) {
            return Ok(self.caret_to(sel.row(), sel.cell_index(), next));
        }
        if sel.cell_index() < cells.last_index() {
            return Ok(self.caret_to(sel.row(), sel.cell_index() + 1, 0));
        }
        Ok(self.unchanged(StateChangeType::SelectionChanged))
    }

    /// Caret to the first text cell of the visible row above.
    pub fn arrow_up(&mut self) -> Result<StateChange, ChangeError> {
        self.caret_vertical(|state, row| state.scene.row_up(row))
    }

    /// Caret to the first text cell of the visible row below.
    pub fn arrow_down(&mut self) -> Result<StateChange, ChangeError> {
        self.caret_vertical(|state, row| state.scene.row_down(row))
    }

    /// Caret to the start of the cell, then to the first text cell.
    pub fn home(&mut self) -> Result<StateChange, ChangeError> {
        let Some(sel) = self.caret_selection() else {
            return Ok(self.unchanged(StateChangeType::SelectionChanged));
        };
        if sel.focus() != 0 || sel.anchor() != 0 {
            return Ok(self.caret_to(sel.row(), sel.cell_index(), 0));
        }
        let cells = self.cells_for(sel.row());
        Ok(self.caret_to(sel.row(), cells.first_text_index(), 0))
    }

    /// Caret to the end of the cell, then to the end of the last one.
    pub fn end(&mut self) -> Result<StateChange, ChangeError> {
        let Some(sel) = self.caret_selection() else {
            return Ok(self.unchanged(StateChangeType::SelectionChanged));
        };
        let cells = self.cells_for(sel.row());
        let len = cells.at(sel.cell_index()).text().len();
        if sel.focus() != len || sel.has_range() {
            return Ok(self.caret_to(sel.row(), sel.cell_index(), len));
        }
        let last = cells.last_index();
        Ok(self.caret_to(sel.row(), last, cells.at(last).text().len()))
    }

    /// Extends the selection one grapheme left.
    pub fn shift_arrow_left(&mut self) -> Result<StateChange, ChangeError> {
        self.extend_caret(|sel, text| prev_grapheme(text, sel.focus()))
    }

    /// Extends the selection one grapheme right.
    pub fn shift_arrow_right(&mut self) -> Result<StateChange, ChangeError> {
        self.extend_caret(|sel, text| next_grapheme(text, sel.focus()))
    }

    /// Extends the selection to the start of the cell.
    pub fn shift_home(&mut self) -> Result<StateChange, ChangeError> {
        self.extend_caret(|_, _| Some(0))
    }

    /// Extends the selection to the end of the cell.
    pub fn shift_end(&mut self) -> Result<StateChange, ChangeError> {
        self.extend_caret(|_, text| Some(text.len()))
    }

    /// Caret to the previous word start, crossing into the previous
    /// cell at the cell boundary.
    pub fn word_left(&mut self) -> Result<StateChange, ChangeError> {
        let Some(sel) = self.caret_selection() else {
            return Ok(self.unchanged(StateChangeType::SelectionChanged));
        };
        let cells = self.cells_for(sel.row());
        let text = cells.at(sel.cell_index()).text();
        if let Some(pos) = find_word_left(text, sel.focus()) {
            return Ok(self.caret_to(sel.row(), sel.cell_index(), pos));
        }
        if sel.cell_index() > cells.first_text_index() {
            let prev_text = cells.at(sel.cell_index() - 1).text();
            let pos = find_word_left(prev_text, prev_text.len()).unwrap_or(0);
            return Ok(self.caret_to(sel.row(), sel.cell_index() - 1, pos));
        }
        Ok(self.unchanged(StateChangeType::SelectionChanged))
    }

    /// Caret to the next word start, crossing into the next cell at
    /// the cell boundary.
    pub fn word_right(&mut self) -> Result<StateChange, ChangeError> {
        let Some(sel) = self.caret_selection() else {
            return Ok(self.unchanged(StateChangeType::SelectionChanged));
        };
        let cells = self.cells_for(sel.row());
        let text = cells.at(sel.cell_index()).text();
        if let Some(pos) = find_word_right(text, sel.focus()) {
            return Ok(self.caret_to(sel.row(), sel.cell_index(), pos));
        }
        if sel.cell_index() < cells.last_index() {
            return Ok(self.caret_to(sel.row(), sel.cell_index() + 1, 0));
        }
        Ok(self.unchanged(StateChangeType::SelectionChanged))
    }

    /// Extends the selection to the previous word start, clamped to
    /// the cell.
    pub fn shift_word_left(&mut self) -> Result<StateChange, ChangeError> {
        self.extend_caret(|sel, text| Some(find_word_left(text, sel.focus()).unwrap_or(0)))
    }

    /// Extends the selection to the next word start, clamped to the
    /// cell.
    pub fn shift_word_right(&mut self) -> Result<StateChange, ChangeError> {
        self.extend_caret(|sel, text| {
            Some(find_word_right(text, sel.focus()).unwrap_or(text.len()))
        })
    }

    /// Converts the caret into a one-row block selection, the entry
    /// point into block mode.
    pub fn select_row(&mut self) -> Result<StateChange, ChangeError> {
        let Some(sel) = self.caret_selection() else {
            return Ok(self.unchanged(StateChangeType::SelectionChanged));
        };
        let row = sel.row();
        if row == self.site.view_root() {
            return Ok(self.unchanged(StateChangeType::SelectionChanged));
        }
        let parent = self.site.row(row).parent();
        let Some(index) = self.site.index_of(parent, row) else {
            return Ok(self.unchanged(StateChangeType::SelectionChanged));
        };
        let block = CellBlock::spanning(parent, row, index, index);
        Ok(self.set_selection(Selection::Block(block)))
    }

    /// Collapses the block back to a caret on its focus row.
    pub fn block_escape(&mut self) -> Result<StateChange, ChangeError> {
        let Some(block) = self.block_selection() else {
            return Ok(self.unchanged(StateChangeType::SelectionChanged));
        };
        let row = block.focus_row();
        let cells = self.cells_for(row);
        Ok(self.caret_to(row, cells.first_text_index(), 0))
    }

    /// Moves the block focus to the top edge, then slides the whole
    /// block up one sibling.
    pub fn block_arrow_up(&mut self) -> Result<StateChange, ChangeError> {
        let Some(block) = self.block_selection() else {
            return Ok(self.unchanged(StateChangeType::SelectionChanged));
        };
        let parent = block.parent();
        let children = self.site.row(parent).children().to_vec();
        let Some(focus_index) = self.site.index_of(parent, block.focus_row()) else {
            return Ok(self.unchanged(StateChangeType::SelectionChanged));
        };
        let start = block.start_child();
        let end = block.end_child();
        if focus_index > start {
            let moved = CellBlock::new(
                parent,
                start,
                end,
                block.start_column(),
                block.end_column(),
                children[start],
                0,
            );
            return Ok(self.set_selection(Selection::Block(moved)));
        }
        if start == 0 {
            return Ok(self.unchanged(StateChangeType::SelectionChanged));
        }
        let moved = CellBlock::new(
            parent,
            start - 1,
            end - 1,
            block.start_column(),
            block.end_column(),
            children[start - 1],
            0,
        );
        Ok(self.set_selection(Selection::Block(moved)))
    }

    /// Moves the block focus to the bottom edge, then slides the
    /// whole block down one sibling.
    pub fn block_arrow_down(&mut self) -> Result<StateChange, ChangeError> {
        let Some(block) = self.block_selection() else {
            return Ok(self.unchanged(StateChangeType::SelectionChanged));
        };
        let parent = block.parent();
        let children = self.site.row(parent).children().to_vec();
        let Some(focus_index) = self.site.index_of(parent, block.focus_row()) else {
            return Ok(self.unchanged(StateChangeType::SelectionChanged));
        };
        let start = block.start_child();
        let end = block.end_child();
        if focus_index < end {
            let moved = CellBlock::new(
                parent,
                start,
                end,
                block.start_column(),
                block.end_column(),
                children[end],
                0,
            );
            return Ok(self.set_selection(Selection::Block(moved)));
        }
        if end + 1 >= children.len() {
            return Ok(self.unchanged(StateChangeType::SelectionChanged));
        }
        let moved = CellBlock::new(
            parent,
            start + 1,
            end + 1,
            block.start_column(),
            block.end_column(),
            children[end + 1],
            0,
        );
        Ok(self.set_selection(Selection::Block(moved)))
    }

    /// Grows or shrinks the block one sibling upward; at the first
    /// sibling the selection climbs to the parent row.
    pub fn block_shift_arrow_up(&mut self) -> Result<StateChange, ChangeError> {
        let Some(block) = self.block_selection() else {
            return Ok(self.unchanged(StateChangeType::SelectionChanged));
        };
        let parent = block.parent();
        let children = self.site.row(parent).children().to_vec();
        let Some(focus_index) = self.site.index_of(parent, block.focus_row()) else {
            return Ok(self.unchanged(StateChangeType::SelectionChanged));
        };
        if focus_index > 0 {
            let anchor = if focus_index == block.start_child() {
                block.end_child()
            } else {
                block.start_child()
            };
            let moved =
                CellBlock::spanning(parent, children[focus_index - 1], focus_index - 1, anchor);
            return Ok(self.set_selection(Selection::Block(moved)));
        }
        self.select_parent_of(parent)
    }

    /// Grows or shrinks the block one sibling downward; at the last
    /// sibling the selection climbs to the parent row.
    pub fn block_shift_arrow_down(&mut self) -> Result<StateChange, ChangeError> {
        let Some(block) = self.block_selection() else {
            return Ok(self.unchanged(StateChangeType::SelectionChanged));
        };
        let parent = block.parent();
        let children = self.site.row(parent).children().to_vec();
        let Some(focus_index) = self.site.index_of(parent, block.focus_row()) else {
            return Ok(self.unchanged(StateChangeType::SelectionChanged));
        };
        if focus_index + 1 < children.len() {
            let anchor = if focus_index == block.end_child() {
                block.start_child()
            } else {
                block.end_child()
            };
            let moved =
                CellBlock::spanning(parent, children[focus_index + 1], focus_index + 1, anchor);
            return Ok(self.set_selection(Selection::Block(moved)));
        }
        self.select_parent_of(parent)
    }

    /// Moves the sibling above the block below it, sliding the block
    /// up while preserving its size.
    pub fn block_swap_up(&mut self) -> Result<StateChange, ChangeError> {
        let Some(block) = self.block_selection() else {
            return Ok(self.unchanged(StateChangeType::DocumentModified));
        };
        let parent = block.parent();
        let start = block.start_child();
        let end = block.end_child();
        if start == 0 {
            return Ok(self.unchanged(StateChangeType::DocumentModified));
        }
        let children = self.site.row(parent).children().to_vec();
        if end >= children.len() {
            return Ok(self.unchanged(StateChangeType::DocumentModified));
        }
        let prev_line = self.site.row(children[start - 1]).line();
        let end_line = self.site.row(children[end]).line();
        let change = Change::move_after(&self.doc, prev_line, end_line);
        let (mutated, patches) = self.apply_quiet(&change)?;
        if !mutated {
            return Ok(self.unchanged(StateChangeType::DocumentModified));
        }
        let moved = CellBlock::new(
            parent,
            start - 1,
            end - 1,
            block.start_column(),
            block.end_column(),
            block.focus_row(),
            block.focus_cell(),
        );
        self.site.set_selection(Selection::Block(moved));
        Ok(self.bump(StateChangeType::DocumentModified, patches))
    }

    /// Moves the sibling below the block above it, sliding the block
    /// down while preserving its size.
    pub fn block_swap_down(&mut self) -> Result<StateChange, ChangeError> {
        let Some(block) = self.block_selection() else {
            return Ok(self.unchanged(StateChangeType::DocumentModified));
        };
        let parent = block.parent();
        let start = block.start_child();
        let end = block.end_child();
        let children = self.site.row(parent).children().to_vec();
        if end + 1 >= children.len() {
            return Ok(self.unchanged(StateChangeType::DocumentModified));
        }
        let next_line = self.site.row(children[end + 1]).line();
        let start_line = self.site.row(children[start]).line();
        let change = Change::move_before(&self.doc, next_line, start_line);
        let (mutated, patches) = self.apply_quiet(&change)?;
        if !mutated {
            return Ok(self.unchanged(StateChangeType::DocumentModified));
        }
        let moved = CellBlock::new(
            parent,
            start + 1,
            end + 1,
            block.start_column(),
            block.end_column(),
            block.focus_row(),
            block.focus_cell(),
        );
        self.site.set_selection(Selection::Block(moved));
        Ok(self.bump(StateChangeType::DocumentModified, patches))
    }

    /// Indents every selected sibling under the sibling above the
    /// block, unfolding it first so the rows stay visible.
    pub fn block_tab(&mut self) -> Result<StateChange, ChangeError> {
        let Some(block) = self.block_selection() else {
            return Ok(self.unchanged(StateChangeType::DocumentModified));
        };
        let parent = block.parent();
        let start = block.start_child();
        let end = block.end_child();
        if start == 0 {
            return Ok(self.unchanged(StateChangeType::DocumentModified));
        }
        let children = self.site.row(parent).children().to_vec();
        if end >= children.len() {
            return Ok(self.unchanged(StateChangeType::DocumentModified));
        }
        let target = children[start - 1];
        let mut patches = self.unfold_target(target);
        let target_line = self.site.row(target).line();
        let base = self.site.row(target).children().len();
        for &row in &children[start..=end] {
            let line = self.site.row(row).line();
            let change = Change::move_below(line, target_line);
            let (_, more) = self.apply_quiet(&change)?;
            patches.extend(more);
        }
        let moved = CellBlock::new(
            target,
            base,
            base + (end - start),
            block.start_column(),
            block.end_column(),
            block.focus_row(),
            block.focus_cell(),
        );
        self.site.set_selection(Selection::Block(moved));
        Ok(self.bump(StateChangeType::DocumentModified, patches))
    }

    /// Outdents every selected sibling to sit after the common
    /// parent, preserving their order.
    pub fn block_shift_tab(&mut self) -> Result<StateChange, ChangeError> {
        let Some(block) = self.block_selection() else {
            return Ok(self.unchanged(StateChangeType::DocumentModified));
        };
        let parent = block.parent();
        let start = block.start_child();
        let end = block.end_child();
        let parent_line = self.site.row(parent).line();
        if self.doc.line(parent_line).parent().is_end() {
            return Ok(self.unchanged(StateChangeType::DocumentModified));
        }
        let grandparent = self.site.row(parent).parent();
        let Some(parent_index) = self.site.index_of(grandparent, parent) else {
            return Ok(self.unchanged(StateChangeType::DocumentModified));
        };
        let children = self.site.row(parent).children().to_vec();
        if end >= children.len() {
            return Ok(self.unchanged(StateChangeType::DocumentModified));
        }
        let mut patches = Vec::new();
        for &row in children[start..=end].iter().rev() {
            let line = self.site.row(row).line();
            let change = Change::move_after(&self.doc, line, parent_line);
            let (_, more) = self.apply_quiet(&change)?;
            patches.extend(more);
        }
        let moved = CellBlock::new(
            grandparent,
            parent_index + 1,
            parent_index + 1 + (end - start),
            block.start_column(),
            block.end_column(),
            block.focus_row(),
            block.focus_cell(),
        );
        self.site.set_selection(Selection::Block(moved));
        Ok(self.bump(StateChangeType::DocumentModified, patches))
    }

    /// Removes every selected sibling with its subtree. The caret
    /// lands on the sibling that slides into the gap, or the parent
    /// when none is left.
    pub fn block_delete(&mut self) -> Result<StateChange, ChangeError> {
        let Some(block) = self.block_selection() else {
            return Ok(self.unchanged(StateChangeType::DocumentModified));
        };
        let parent = block.parent();
        let start = block.start_child();
        let end = block.end_child();
        let children = self.site.row(parent).children().to_vec();
        if start >= children.len() {
            return Ok(self.unchanged(StateChangeType::DocumentModified));
        }
        let first_line = self.site.row(children[start]).line();
        let count = end.min(children.len() - 1) - start + 1;
        let change = Change::remove(&self.doc, first_line, count);
        let (mutated, patches) = self.apply_quiet(&change)?;
        if !mutated {
            return Ok(self.unchanged(StateChangeType::DocumentModified));
        }
        let survivors = self.site.row(parent).children();
        let target = if survivors.is_empty() {
            parent
        } else {
            survivors[start.min(survivors.len() - 1)]
        };
        let cells = self.cells_for(target);
        self.place_caret(target, cells.first_text_index(), 0);
        Ok(self.bump(StateChangeType::DocumentModified, patches))
    }

    /// Toggles folding at the selection: the caret row, or every
    /// selected sibling of a block.
    pub fn fold_at_selection(&mut self) -> Result<StateChange, ChangeError> {
        match self.site.selection().clone() {
            Selection::None => Ok(self.unchanged(StateChangeType::FoldingChanged)),
            Selection::Caret(sel) => Ok(self.toggle_fold(sel.row())),
            Selection::Block(block) => {
                let parent = block.parent();
                let children = self.site.row(parent).children().to_vec();
                let end = block.end_child().min(children.len().saturating_sub(1));
                let mut any = false;
                for &row in children.get(block.start_child()..=end).unwrap_or(&[]) {
                    any |= self.site.toggle_fold(row);
                }
                if !any {
                    return Ok(self.unchanged(StateChangeType::FoldingChanged));
                }
                let patches = self.pump_site();
                Ok(self.bump(StateChangeType::FoldingChanged, patches))
            }
        }
    }

    /// Zooms the view into the selected row.
    pub fn zoom_at_selection(&mut self) -> Result<StateChange, ChangeError> {
        let row = match self.site.selection() {
            Selection::None => SiteRowId::END,
            Selection::Caret(sel) => sel.row(),
            Selection::Block(block) => block.focus_row(),
        };
        if row.is_end() {
            return Ok(self.unchanged(StateChangeType::ViewChanged));
        }
        Ok(self.zoom_in(row))
    }

    fn caret_selection(&self) -> Option<CellTextSelection> {
        self.site.selection().as_caret().cloned()
    }

    fn block_selection(&self) -> Option<CellBlock> {
        self.site.selection().as_block().cloned()
    }

    /// Cell decomposition for a row: the projection's cache when the
    /// row is visible, rebuilt from the document otherwise.
    fn cells_for(&self, row: SiteRowId) -> RowCells {
        if let Some(position) = self.scene.position_of(row) {
            return self.scene.row(self.scene.row_at(position)).cells().clone();
        }
        let line = self.site.row(row).line();
        RowCells::new(self.doc.line(line).content(), self.doc.indent_of(line))
    }

    /// Translates a projected cell index into the document's own
    /// decomposition. Under a zoomed view the two differ by the
    /// number of hidden indent levels.
    fn doc_cell_index(&self, row: SiteRowId, cells: &RowCells, index: usize) -> usize {
        let line = self.site.row(row).line();
        let doc_first = self.doc.indent_of(line).max(0) as usize;
        doc_first + index.saturating_sub(cells.first_text_index())
    }

    /// Sets the caret without a version bump, for use inside document
    /// operations.
    fn place_caret(&mut self, row: SiteRowId, cell: usize, offset: usize) {
        match CellTextSelection::caret(row, cell, offset) {
            Ok(caret) => self.site.set_selection(Selection::Caret(caret)),
            Err(_) => self.site.set_selection(Selection::None),
        }
    }

    fn place_caret_at_offset(&mut self, row: SiteRowId, offset: usize) {
        let cells = self.cells_for(row);
        let (cell, focus) = cell_at_offset(&cells, offset);
        self.place_caret(row, cell, focus);
    }

    /// Sets the caret through the versioned selection path.
    fn caret_to(&mut self, row: SiteRowId, cell: usize, offset: usize) -> StateChange {
        match CellTextSelection::caret(row, cell, offset) {
            Ok(caret) => self.set_selection(Selection::Caret(caret)),
            Err(_) => self.unchanged(StateChangeType::SelectionChanged),
        }
    }

    fn caret_vertical(
        &mut self,
        step: impl Fn(&Self, SiteRowId) -> SiteRowId,
    ) -> Result<StateChange, ChangeError> {
        let Some(sel) = self.caret_selection() else {
            return Ok(self.unchanged(StateChangeType::SelectionChanged));
        };
        let target = step(self, sel.row());
        if target.is_end() {
            return Ok(self.unchanged(StateChangeType::SelectionChanged));
        }
        let cells = self.cells_for(target);
        Ok(self.caret_to(target, cells.first_text_index(), 0))
    }

    fn extend_caret(
        &mut self,
        to: impl Fn(&CellTextSelection, &str) -> Option<usize>,
    ) -> Result<StateChange, ChangeError> {
        let Some(sel) = self.caret_selection() else {
            return Ok(self.unchanged(StateChangeType::SelectionChanged));
        };
        let cells = self.cells_for(sel.row());
        let text = cells.at(sel.cell_index()).text();
        let Some(focus) = to(&sel, text) else {
            return Ok(self.unchanged(StateChangeType::SelectionChanged));
        };
        match CellTextSelection::new(sel.row(), sel.cell_index(), focus, sel.anchor()) {
            Ok(extended) => Ok(self.set_selection(Selection::Caret(extended))),
            Err(_) => Ok(self.unchanged(StateChangeType::SelectionChanged)),
        }
    }

    /// Merges the caret line into its previous sibling: the sibling's
    /// text becomes the head of this line and the sibling goes away.
    /// Refused when the sibling has children.
    fn join_to_previous_row(
        &mut self,
        sel: &CellTextSelection,
    ) -> Result<StateChange, ChangeError> {
        let prev = self.site.prev_sibling(sel.row());
        if prev.is_end() || self.site.row(prev).has_children() {
            return Ok(self.unchanged(StateChangeType::DocumentModified));
        }
        let prev_line = self.site.row(prev).line();
        let line = self.site.row(sel.row()).line();
        let prev_text = self.doc.line(prev_line).content().to_string();
        let merged = format!("{}{}", prev_text, self.doc.line(line).content());
        let text_change = Change::line_text(&self.doc, line, merged);
        let remove = Change::remove(&self.doc, prev_line, 1);
        let (_, mut patches) = self.apply_quiet(&text_change)?;
        let (_, more) = self.apply_quiet(&remove)?;
        patches.extend(more);
        self.place_caret_at_offset(sel.row(), prev_text.len());
        Ok(self.bump(StateChangeType::DocumentModified, patches))
    }

    /// Merges the next sibling into the caret line, the next sibling
    /// surviving with the merged text. Refused when the caret line
    /// has children.
    fn join_to_next_row(&mut self, sel: &CellTextSelection) -> Result<StateChange, ChangeError> {
        if self.site.row(sel.row()).has_children() {
            return Ok(self.unchanged(StateChangeType::DocumentModified));
        }
        let next = self.site.next_sibling(sel.row());
        if next.is_end() {
            return Ok(self.unchanged(StateChangeType::DocumentModified));
        }
        let next_line = self.site.row(next).line();
        let line = self.site.row(sel.row()).line();
        let prefix = self.doc.line(line).content().to_string();
        let merged = format!("{}{}", prefix, self.doc.line(next_line).content());
        let text_change = Change::line_text(&self.doc, next_line, merged);
        let remove = Change::remove(&self.doc, line, 1);
        let (_, mut patches) = self.apply_quiet(&text_change)?;
        let (_, more) = self.apply_quiet(&remove)?;
        patches.extend(more);
        self.place_caret_at_offset(next, prefix.len());
        Ok(self.bump(StateChangeType::DocumentModified, patches))
    }

    /// Removes the tab ending at source byte `position`, merging the
    /// cell it opened into the one before.
    fn join_cell_left(
        &mut self,
        row: SiteRowId,
        position: usize,
    ) -> Result<StateChange, ChangeError> {
        if position == 0 {
            return Ok(self.unchanged(StateChangeType::DocumentModified));
        }
        let line = self.site.row(row).line();
        let content = self.doc.line(line).content();
        let merged = format!("{}{}", &content[..position - 1], &content[position..]);
        let change = Change::line_text(&self.doc, line, merged);
        let (mutated, patches) = self.apply_quiet(&change)?;
        if !mutated {
            return Ok(self.unchanged(StateChangeType::DocumentModified));
        }
        self.place_caret_at_offset(row, position - 1);
        Ok(self.bump(StateChangeType::DocumentModified, patches))
    }

    /// Moves the caret row below its previous sibling, unfolding the
    /// sibling first so the row stays visible.
    fn indent_row(&mut self, sel: &CellTextSelection) -> Result<StateChange, ChangeError> {
        let target = self.site.prev_sibling(sel.row());
        if target.is_end() {
            return Ok(self.unchanged(StateChangeType::DocumentModified));
        }
        let mut patches = self.unfold_target(target);
        let line = self.site.row(sel.row()).line();
        let target_line = self.site.row(target).line();
        let change = Change::move_below(line, target_line);
        let (mutated, more) = self.apply_quiet(&change)?;
        patches.extend(more);
        if !mutated && patches.is_empty() {
            return Ok(self.unchanged(StateChangeType::DocumentModified));
        }
        let cells = self.cells_for(sel.row());
        self.place_caret(sel.row(), cells.first_text_index(), 0);
        Ok(self.bump(StateChangeType::DocumentModified, patches))
    }

    /// Moves the caret row out of its parent, to sit directly after
    /// it.
    fn outdent_row(&mut self, sel: &CellTextSelection) -> Result<StateChange, ChangeError> {
        let line = self.site.row(sel.row()).line();
        let parent_line = self.doc.line(line).parent();
        if parent_line.is_end() {
            return Ok(self.unchanged(StateChangeType::DocumentModified));
        }
        let change = Change::move_after(&self.doc, line, parent_line);
        let (mutated, patches) = self.apply_quiet(&change)?;
        if !mutated {
            return Ok(self.unchanged(StateChangeType::DocumentModified));
        }
        let cells = self.cells_for(sel.row());
        self.place_caret(sel.row(), cells.first_text_index(), 0);
        Ok(self.bump(StateChangeType::DocumentModified, patches))
    }

    fn unfold_target(&mut self, target: SiteRowId) -> Vec<RowPatch> {
        if self.site.contains(target) && self.site.row(target).folded() {
            self.site.toggle_fold(target);
            return self.pump_site();
        }
        Vec::new()
    }

    fn select_parent_of(&mut self, parent: SiteRowId) -> Result<StateChange, ChangeError> {
        if parent == self.site.view_root() || parent.is_end() {
            return Ok(self.unchanged(StateChangeType::SelectionChanged));
        }
        let grandparent = self.site.row(parent).parent();
        let Some(parent_index) = self.site.index_of(grandparent, parent) else {
            return Ok(self.unchanged(StateChangeType::SelectionChanged));
        };
        let block = CellBlock::spanning(grandparent, parent, parent_index, parent_index);
        Ok(self.set_selection(Selection::Block(block)))
    }
}
