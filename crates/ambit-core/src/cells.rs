//! Tab-delimited cell decomposition of row text.
//!
//! A visible row is rendered as a grid: one synthetic indent cell per
//! indent level, then the line's text split at tab characters into
//! text cells. [`RowCells`] performs that split once and caches it on
//! the scene row; selections and text edits address cells by index
//! through it.

use unicode_width::UnicodeWidthChar;

/// Visual width of one character, following UAX #11.
fn char_width(ch: char) -> usize {
    UnicodeWidthChar::width(ch).unwrap_or(1)
}

/// Kind of a rendered cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CellKind {
    /// Synthetic leading cell marking one indent level.
    Indent,
    /// One tab-delimited field of the line's text.
    Text,
}

/// One cell of a decomposed row.
///
/// `width` is in ems: every cell is fixed at 1 except the last text
/// cell, whose `-1` means it expands to fill the row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cell {
    kind: CellKind,
    text: String,
    column: usize,
    width: i32,
}

impl Cell {
    /// Cell kind.
    pub fn kind(&self) -> CellKind {
        self.kind
    }

    /// Cell text. Indent cells hold the tab character they stand for.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Grid column of this cell.
    pub fn column(&self) -> usize {
        self.column
    }

    /// Width in ems, `-1` for the expanding last cell.
    pub fn width(&self) -> i32 {
        self.width
    }

    /// Column the next cell starts at, `None` after the expanding
    /// cell.
    pub fn next_column(&self) -> Option<usize> {
        if self.width == -1 {
            None
        } else {
            Some(self.column + self.width as usize)
        }
    }

    /// Visual width of the cell text.
    pub fn display_width(&self) -> usize {
        self.text.chars().map(char_width).sum()
    }
}

/// Cached cell decomposition of one row.
///
/// Construction always yields at least one text cell, so index
/// clamping in [`RowCells::at`] never has to handle an empty row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowCells {
    source: String,
    indent: i32,
    cells: Vec<Cell>,
}

impl RowCells {
    /// Decomposes `source` under `indent` levels. A negative indent
    /// (the view root) produces no indent cells.
    pub fn new(source: &str, indent: i32) -> Self {
        let levels = indent.max(0) as usize;
        let mut cells = Vec::with_capacity(levels + 1);
        for column in 0..levels {
            cells.push(Cell {
                kind: CellKind::Indent,
                text: "\t".to_string(),
                column,
                width: 1,
            });
        }
        let fields: Vec<&str> = source.split('\t').collect();
        let last = fields.len() - 1;
        for (index, field) in fields.iter().enumerate() {
            cells.push(Cell {
                kind: CellKind::Text,
                text: (*field).to_string(),
                column: levels + index,
                width: if index == last { -1 } else { 1 },
            });
        }
        RowCells {
            source: source.to_string(),
            indent,
            cells,
        }
    }

    /// The text the decomposition was built from.
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Indent level the decomposition was built under.
    pub fn indent(&self) -> i32 {
        self.indent
    }

    /// All cells, indent cells first.
    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }

    /// Number of cells.
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    /// Always false; a row decomposes to at least one text cell.
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Cell at `index`, clamped to the last cell when out of range.
    pub fn at(&self, index: usize) -> &Cell {
        &self.cells[index.min(self.cells.len() - 1)]
    }

    /// Cell at `index` without clamping.
    pub fn get(&self, index: usize) -> Option<&Cell> {
        self.cells.get(index)
    }

    /// Index of the last cell.
    pub fn last_index(&self) -> usize {
        self.cells.len() - 1
    }

    /// Index of the first text cell.
    pub fn first_text_index(&self) -> usize {
        self.indent.max(0) as usize
    }

    /// Number of text cells.
    pub fn text_cell_count(&self) -> usize {
        self.cells.len() - self.first_text_index()
    }

    /// Rejoins the text cells with tabs, reconstructing the source
    /// exactly.
    pub fn text(&self) -> String {
        let fields: Vec<&str> = self.cells[self.first_text_index()..]
            .iter()
            .map(|cell| cell.text.as_str())
            .collect();
        fields.join("\t")
    }

    /// Byte offset in the source of the first character of the cell
    /// at `index`. Indent cells precede all text and report 0.
    pub fn text_position(&self, index: usize) -> usize {
        let first = self.first_text_index();
        if index <= first {
            return 0;
        }
        let clamped = index.min(self.last_index());
        let mut position = 0;
        for cell in &self.cells[first..clamped] {
            position += cell.text.len() + 1;
        }
        position
    }

    /// Visual column of the caret sitting at byte `offset` inside the
    /// cell at `index`. Columns before the cell follow the rendered
    /// grid widths; inside the cell the text is measured as displayed
    /// while editing.
    pub fn display_column(&self, index: usize, offset: usize) -> usize {
        let clamped = index.min(self.last_index());
        let mut column = 0;
        for cell in &self.cells[..clamped] {
            column += if cell.width >= 0 {
                cell.width as usize
            } else {
                cell.display_width()
            };
        }
        let cell = &self.cells[clamped];
        let mut end = offset.min(cell.text.len());
        while end > 0 && !cell.text.is_char_boundary(end) {
            end -= 1;
        }
        let head = &cell.text[..end];
        column + head.chars().map(char_width).sum::<usize>()
    }
}
