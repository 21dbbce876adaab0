//! Canonical line tree.
//!
//! A document is a rooted tree of lines. The first line of the text
//! becomes the root; every other line nests under the nearest
//! preceding line with a smaller tab depth. The tree is mutated only
//! through [`Doc::apply`] and the split/join compound operations, and
//! every mutation leaves a typed [`DocEvent`] in the outbox for the
//! fold overlay to consume.
//!
//! Stored line content never carries leading tabs; a line's indent is
//! derived from its depth, with the root at -1.

use std::sync::LazyLock;

use regex::Regex;

use crate::cells::RowCells;
use crate::change::{Change, ChangeError};
use crate::pool::{DocLineId, Pool, PoolId};
use crate::span::SpanError;

/// Wiki-style link target: `[[Name]]`.
static LINK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[\[([A-Za-z0-9 _.-]+)\]\]").expect("pattern is valid"));

fn strip_indent(raw: &str) -> (usize, &str) {
    let bytes = raw.as_bytes();
    let mut count = 0;
    while count < bytes.len() && bytes[count] == b'\t' {
        count += 1;
    }
    (count, &raw[count..])
}

/// One line of a document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocLine {
    id: DocLineId,
    content: String,
    parent: DocLineId,
    children: Vec<DocLineId>,
    subtree_size: usize,
}

impl DocLine {
    fn new(id: DocLineId, content: String) -> Self {
        DocLine {
            id,
            content,
            parent: DocLineId::END,
            children: Vec::new(),
            subtree_size: 1,
        }
    }

    /// Line id.
    pub fn id(&self) -> DocLineId {
        self.id
    }

    /// Line text, leading indent tabs stripped.
    pub fn content(&self) -> &str {
        &self.content
    }

    /// Parent line, the sentinel for the root and detached lines.
    pub fn parent(&self) -> DocLineId {
        self.parent
    }

    /// Child lines in order.
    pub fn children(&self) -> &[DocLineId] {
        &self.children
    }

    /// This line plus all descendants, regardless of fold state
    /// anywhere downstream.
    pub fn subtree_size(&self) -> usize {
        self.subtree_size
    }

    /// True when the line has no children.
    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }
}

/// Structural event left in the outbox by a document mutation.
///
/// Compound operations suppress the granular events of their steps
/// and leave a single summary instead, so a consumer never observes a
/// torn intermediate state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DocEvent {
    /// Lines spliced into `owner`'s children at `offset`. Only the
    /// top-level ids are listed; nested lines are reachable through
    /// them.
    LinesInserted {
        /// Parent the lines were attached under.
        owner: DocLineId,
        /// Child index of the first inserted line.
        offset: usize,
        /// Top-level inserted lines in order.
        lines: Vec<DocLineId>,
    },
    /// Lines spliced out of `owner`'s children at `offset`. The
    /// detached subtrees stay pooled and traversable, which is what
    /// allows a later `Reinsert`.
    LinesRemoved {
        /// Parent the lines were detached from.
        owner: DocLineId,
        /// Child index the run occupied before removal.
        offset: usize,
        /// Detached lines in their old order.
        lines: Vec<DocLineId>,
    },
    /// One line relocated with its whole subtree.
    LineMoved {
        /// Parent before the move.
        old_owner: DocLineId,
        /// Child index before the move.
        old_offset: usize,
        /// Parent after the move.
        new_owner: DocLineId,
        /// Child index after the move.
        new_offset: usize,
        /// The relocated line.
        line: DocLineId,
    },
    /// A line's content replaced.
    TextChanged {
        /// The rewritten line.
        line: DocLineId,
    },
    /// `line` was split; `new_line` holds the suffix and sits at
    /// child `index` of `owner`, directly after `line`.
    LineSplit {
        /// Parent of both halves.
        owner: DocLineId,
        /// The line that kept the prefix and the children.
        line: DocLineId,
        /// The new line holding the suffix.
        new_line: DocLineId,
        /// Child index of `new_line` under `owner`.
        index: usize,
    },
    /// `removed` was absorbed into `line` and left `owner`'s children
    /// at `index`.
    LineJoined {
        /// Parent `removed` was detached from.
        owner: DocLineId,
        /// The surviving line holding the merged text.
        line: DocLineId,
        /// The absorbed line.
        removed: DocLineId,
        /// Child index `removed` occupied before the join.
        index: usize,
    },
}

/// Canonical line tree for one document.
#[derive(Debug)]
pub struct Doc {
    name: String,
    root: DocLineId,
    lines: Pool<DocLineId, DocLine>,
    events: Vec<DocEvent>,
    deferring: bool,
}

impl Doc {
    /// Creates a document holding only a root line named after the
    /// document.
    pub fn new(name: &str) -> Doc {
        let mut lines = Pool::new(DocLine::new(DocLineId::END, String::new()));
        let root_content = strip_indent(name).1.to_string();
        let root = lines.create(|id| DocLine::new(id, root_content));
        Doc {
            name: name.to_string(),
            root,
            lines,
            events: Vec::new(),
            deferring: false,
        }
    }

    /// Parses a document from tab-indented text. The first line
    /// becomes the root; later lines nest under the nearest preceding
    /// line with a smaller tab depth, tolerating skipped levels.
    pub fn from_text(name: &str, text: &str) -> Doc {
        let cleaned = text.replace('\r', "");
        if cleaned.is_empty() {
            return Doc::new(name);
        }
        let items: Vec<(usize, String)> = cleaned
            .split('\n')
            .map(|line| {
                let (count, rest) = strip_indent(line);
                (count, rest.to_string())
            })
            .collect();
        let mut doc = Doc::new(name);
        if let Some(root_line) = doc.lines.get_mut(doc.root) {
            root_line.content = items[0].1.clone();
        }
        doc.build_subtree(doc.root, -1, &items, 1, 0);
        doc
    }

    /// Serializes the tree back to tab-indented text. On a tree whose
    /// tab depths match line depths this is the exact inverse of
    /// [`Doc::from_text`].
    pub fn to_text(&self) -> String {
        let mut out: Vec<String> = Vec::with_capacity(self.line_count());
        for id in self.subtree(self.root) {
            let line = self.lines.get(id);
            let indent = self.indent_of(id).max(0) as usize;
            out.push(format!("{}{}", "\t".repeat(indent), line.content()));
        }
        out.join("\n")
    }

    /// Document name, the workspace key.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Root line id.
    pub fn root(&self) -> DocLineId {
        self.root
    }

    /// Looks up a line, resolving dead ids to the sentinel end line.
    pub fn line(&self, id: DocLineId) -> &DocLine {
        self.lines.get(id)
    }

    /// True when `id` addresses a live line.
    pub fn contains(&self, id: DocLineId) -> bool {
        self.lines.contains(id)
    }

    /// Total number of lines in the tree, root included.
    pub fn line_count(&self) -> usize {
        self.lines.get(self.root).subtree_size()
    }

    /// Indent of a line: depth below the root, with the root itself
    /// at -1.
    pub fn indent_of(&self, id: DocLineId) -> i32 {
        if id == self.root || id.is_end() {
            return -1;
        }
        let mut depth = 0;
        let mut current = id;
        while current != self.root && !current.is_end() {
            current = self.lines.get(current).parent();
            depth += 1;
        }
        depth
    }

    /// True when `ancestor` is `descendant` or lies on its parent
    /// chain.
    pub fn is_ancestor_of(&self, ancestor: DocLineId, descendant: DocLineId) -> bool {
        let mut current = descendant;
        while !current.is_end() {
            if current == ancestor {
                return true;
            }
            current = self.lines.get(current).parent();
        }
        false
    }

    /// True when `id` is reachable from the root.
    pub fn is_attached(&self, id: DocLineId) -> bool {
        self.lines.contains(id) && self.is_ancestor_of(self.root, id)
    }

    /// Child index of `child` under `owner`.
    pub fn index_of(&self, owner: DocLineId, child: DocLineId) -> Option<usize> {
        self.lines
            .get(owner)
            .children()
            .iter()
            .position(|&c| c == child)
    }

    /// Child index of `child` under `owner`, or the append position
    /// when `child` is not a direct child.
    pub fn index_or_last(&self, owner: DocLineId, child: DocLineId) -> usize {
        let children = self.lines.get(owner).children();
        children
            .iter()
            .position(|&c| c == child)
            .unwrap_or(children.len())
    }

    /// Sibling directly after `id`, the sentinel at the boundary.
    pub fn next_sibling(&self, id: DocLineId) -> DocLineId {
        let parent = self.lines.get(id).parent();
        let siblings = self.lines.get(parent).children();
        match siblings.iter().position(|&c| c == id) {
            Some(index) => siblings.get(index + 1).copied().unwrap_or(DocLineId::END),
            None => DocLineId::END,
        }
    }

    /// Sibling directly before `id`, the sentinel at the boundary.
    pub fn prev_sibling(&self, id: DocLineId) -> DocLineId {
        let parent = self.lines.get(id).parent();
        let siblings = self.lines.get(parent).children();
        match siblings.iter().position(|&c| c == id) {
            Some(index) if index > 0 => siblings[index - 1],
            _ => DocLineId::END,
        }
    }

    /// Pre-order traversal of `id`'s subtree, `id` first.
    pub fn subtree(&self, id: DocLineId) -> Subtree<'_> {
        let stack = if self.lines.contains(id) {
            vec![id]
        } else {
            Vec::new()
        };
        Subtree { doc: self, stack }
    }

    /// Wiki-link targets (`[[Name]]`) collected over the whole
    /// document in document order.
    pub fn doc_links(&self) -> Vec<String> {
        let mut links = Vec::new();
        for id in self.subtree(self.root) {
            for capture in LINK.captures_iter(self.lines.get(id).content()) {
                if let Some(name) = capture.get(1) {
                    links.push(name.as_str().to_string());
                }
            }
        }
        links
    }

    /// Drains the event outbox.
    pub fn take_events(&mut self) -> Vec<DocEvent> {
        std::mem::take(&mut self.events)
    }

    /// Applies one change. Returns whether the tree was mutated;
    /// stale or sentinel references resolve to `Ok(false)` rather
    /// than failing, while range and staleness violations are
    /// rejected before any mutation happens.
    pub fn apply(&mut self, change: &Change) -> Result<bool, ChangeError> {
        match change {
            Change::NoOp => Ok(false),
            Change::InsertBefore {
                owner,
                offset,
                lines,
            } => self.apply_insert(*owner, *offset, lines),
            Change::InsertBelow { parent, lines } => self.apply_insert(*parent, 0, lines),
            Change::MoveBefore {
                line,
                owner,
                offset,
            } => self.apply_move(*line, *owner, Some(*offset)),
            Change::MoveBelow { line, parent } => self.apply_move(*line, *parent, None),
            Change::Remove {
                owner,
                offset,
                lines,
            } => self.apply_remove(*owner, *offset, lines),
            Change::LineTextChange {
                line,
                old_text,
                new_text,
            } => self.apply_line_text(*line, old_text, new_text),
            Change::CellTextChange {
                line,
                cell_index,
                span,
                text,
            } => self.apply_cell_text(*line, *cell_index, *span, text),
            Change::Reinsert {
                owner,
                offset,
                lines,
            } => self.apply_reinsert(*owner, *offset, lines),
        }
    }

    /// Splits the line at byte `offset`: the line keeps the prefix
    /// and its children, a new line holding the suffix is inserted as
    /// the following sibling. Emits one summary event covering the
    /// whole compound edit. Returns the new line, or the sentinel
    /// when `id` does not address an attached non-root line.
    pub fn split_line(&mut self, id: DocLineId, offset: usize) -> Result<DocLineId, ChangeError> {
        if !self.is_attached(id) {
            return Ok(DocLineId::END);
        }
        let content = self.lines.get(id).content().to_string();
        if offset > content.len() {
            return Err(ChangeError::Span(SpanError::OutOfBounds {
                end: offset,
                len: content.len(),
            }));
        }
        if !content.is_char_boundary(offset) {
            return Err(ChangeError::NotCharBoundary { offset });
        }
        let owner = self.lines.get(id).parent();
        let Some(index) = self.index_of(owner, id) else {
            return Ok(DocLineId::END);
        };
        self.begin_compound();
        let suffix = content[offset..].to_string();
        self.set_content_raw(id, &content[..offset]);
        let new_line = self.lines.create(|line_id| DocLine::new(line_id, suffix));
        self.attach_children(owner, index + 1, &[new_line]);
        self.end_compound(DocEvent::LineSplit {
            owner,
            line: id,
            new_line,
            index: index + 1,
        });
        Ok(new_line)
    }

    /// Absorbs the next sibling's content into `id` and removes it.
    /// The inverse of [`Doc::split_line`]. Refuses when the next
    /// sibling has children of its own.
    pub fn join_next(&mut self, id: DocLineId) -> Result<bool, ChangeError> {
        if !self.is_attached(id) {
            return Ok(false);
        }
        let next = self.next_sibling(id);
        if next.is_end() || !self.lines.get(next).is_leaf() {
            return Ok(false);
        }
        let owner = self.lines.get(id).parent();
        let Some(index) = self.index_of(owner, next) else {
            return Ok(false);
        };
        let merged = format!(
            "{}{}",
            self.lines.get(id).content(),
            self.lines.get(next).content()
        );
        self.begin_compound();
        self.set_content_raw(id, &merged);
        self.detach_at(owner, index);
        self.lines.remove(next);
        self.end_compound(DocEvent::LineJoined {
            owner,
            line: id,
            removed: next,
            index,
        });
        Ok(true)
    }

    fn apply_insert(
        &mut self,
        owner: DocLineId,
        offset: usize,
        lines: &[String],
    ) -> Result<bool, ChangeError> {
        if !self.is_attached(owner) || lines.is_empty() {
            return Ok(false);
        }
        let items: Vec<(usize, String)> = lines
            .iter()
            .map(|raw| {
                let (count, rest) = strip_indent(raw);
                (count, rest.to_string())
            })
            .collect();
        let before = self.lines.get(owner).children().len();
        let at = offset.min(before);
        self.build_subtree(owner, -1, &items, 0, at);
        let after = self.lines.get(owner).children().len();
        let added = after - before;
        if added == 0 {
            return Ok(false);
        }
        let ids = self.lines.get(owner).children()[at..at + added].to_vec();
        self.emit(DocEvent::LinesInserted {
            owner,
            offset: at,
            lines: ids,
        });
        Ok(true)
    }

    fn apply_move(
        &mut self,
        line: DocLineId,
        owner: DocLineId,
        offset: Option<usize>,
    ) -> Result<bool, ChangeError> {
        if !self.is_attached(line) || !self.is_attached(owner) {
            return Ok(false);
        }
        if self.is_ancestor_of(line, owner) {
            return Ok(false);
        }
        let old_owner = self.lines.get(line).parent();
        if old_owner.is_end() {
            return Ok(false);
        }
        let Some(old_offset) = self.index_of(old_owner, line) else {
            return Ok(false);
        };
        if old_owner == owner {
            // A move landing back on the same slot is not a change.
            let same = match offset {
                Some(index) => index == old_offset || index == old_offset + 1,
                None => old_offset + 1 == self.lines.get(owner).children().len(),
            };
            if same {
                return Ok(false);
            }
        }
        self.detach_at(old_owner, old_offset);
        let at = match offset {
            Some(mut index) => {
                // Removal shifted later siblings left.
                if old_owner == owner && old_offset < index {
                    index -= 1;
                }
                index.min(self.lines.get(owner).children().len())
            }
            None => self.lines.get(owner).children().len(),
        };
        self.attach_children(owner, at, &[line]);
        self.emit(DocEvent::LineMoved {
            old_owner,
            old_offset,
            new_owner: owner,
            new_offset: at,
            line,
        });
        Ok(true)
    }

    fn apply_remove(
        &mut self,
        owner: DocLineId,
        offset: usize,
        lines: &[DocLineId],
    ) -> Result<bool, ChangeError> {
        if !self.is_attached(owner) || lines.is_empty() {
            return Ok(false);
        }
        let children = self.lines.get(owner).children();
        if offset + lines.len() > children.len() {
            return Ok(false);
        }
        if children[offset..offset + lines.len()] != lines[..] {
            return Ok(false);
        }
        for _ in 0..lines.len() {
            self.detach_at(owner, offset);
        }
        self.emit(DocEvent::LinesRemoved {
            owner,
            offset,
            lines: lines.to_vec(),
        });
        Ok(true)
    }

    fn apply_line_text(
        &mut self,
        line: DocLineId,
        old_text: &str,
        new_text: &str,
    ) -> Result<bool, ChangeError> {
        if !self.lines.contains(line) {
            return Ok(false);
        }
        let current = self.lines.get(line).content();
        if current != old_text {
            return Err(ChangeError::StaleText {
                line,
                expected: old_text.to_string(),
                found: current.to_string(),
            });
        }
        let stripped = strip_indent(new_text).1.to_string();
        Ok(self.set_content_raw(line, &stripped))
    }

    fn apply_cell_text(
        &mut self,
        line: DocLineId,
        cell_index: usize,
        span: crate::span::Span,
        text: &str,
    ) -> Result<bool, ChangeError> {
        if !self.lines.contains(line) {
            return Ok(false);
        }
        let indent = self.indent_of(line);
        let content = self.lines.get(line).content().to_string();
        let cells = RowCells::new(&content, indent);
        if cell_index < cells.first_text_index() || cell_index > cells.last_index() {
            return Err(ChangeError::BadCell {
                line,
                index: cell_index,
            });
        }
        let base = cells.text_position(cell_index);
        let cell_len = cells.at(cell_index).text().len();
        if span.end() > cell_len {
            return Err(ChangeError::Span(SpanError::OutOfBounds {
                end: span.end(),
                len: cell_len,
            }));
        }
        let begin = base + span.begin();
        let end = base + span.end();
        if !content.is_char_boundary(begin) {
            return Err(ChangeError::NotCharBoundary { offset: begin });
        }
        if !content.is_char_boundary(end) {
            return Err(ChangeError::NotCharBoundary { offset: end });
        }
        if &content[begin..end] == text {
            return Ok(false);
        }
        let new_content = format!("{}{}{}", &content[..begin], text, &content[end..]);
        Ok(self.set_content_raw(line, &new_content))
    }

    fn apply_reinsert(
        &mut self,
        owner: DocLineId,
        offset: usize,
        lines: &[DocLineId],
    ) -> Result<bool, ChangeError> {
        if !self.is_attached(owner) || lines.is_empty() {
            return Ok(false);
        }
        for (position, &line) in lines.iter().enumerate() {
            if !self.lines.contains(line) {
                return Ok(false);
            }
            if !self.lines.get(line).parent().is_end() {
                return Ok(false);
            }
            if self.is_ancestor_of(line, owner) {
                return Ok(false);
            }
            if lines[..position].contains(&line) {
                return Ok(false);
            }
        }
        let at = offset.min(self.lines.get(owner).children().len());
        self.attach_children(owner, at, lines);
        self.emit(DocEvent::LinesInserted {
            owner,
            offset: at,
            lines: lines.to_vec(),
        });
        Ok(true)
    }

    fn build_subtree(
        &mut self,
        parent: DocLineId,
        depth: i32,
        items: &[(usize, String)],
        mut offset: usize,
        parent_offset: usize,
    ) -> usize {
        let mut new_lines: Vec<DocLineId> = Vec::new();
        while offset < items.len() {
            let (item_indent, text) = &items[offset];
            if (*item_indent as i32) <= depth {
                break;
            }
            let content = text.clone();
            let child = self.lines.create(|id| DocLine::new(id, content));
            new_lines.push(child);
            offset = self.build_subtree(child, *item_indent as i32, items, offset + 1, 0);
        }
        self.attach_children(parent, parent_offset, &new_lines);
        offset
    }

    fn attach_children(&mut self, owner: DocLineId, index: usize, children: &[DocLineId]) {
        for &child in children {
            if let Some(line) = self.lines.get_mut(child) {
                line.parent = owner;
            }
        }
        if let Some(line) = self.lines.get_mut(owner) {
            let at = index.min(line.children.len());
            line.children.splice(at..at, children.iter().copied());
        }
        self.update_length_upward(owner);
    }

    fn detach_at(&mut self, owner: DocLineId, index: usize) -> DocLineId {
        let child = match self.lines.get_mut(owner) {
            Some(line) if index < line.children.len() => line.children.remove(index),
            _ => return DocLineId::END,
        };
        if let Some(line) = self.lines.get_mut(child) {
            line.parent = DocLineId::END;
        }
        self.update_length_upward(owner);
        child
    }

    fn set_content_raw(&mut self, id: DocLineId, text: &str) -> bool {
        let changed = match self.lines.get_mut(id) {
            Some(line) if line.content != text => {
                line.content = text.to_string();
                true
            }
            _ => false,
        };
        if changed {
            self.emit(DocEvent::TextChanged { line: id });
        }
        changed
    }

    fn update_length_upward(&mut self, start: DocLineId) {
        let mut current = start;
        while !current.is_end() {
            let sum: usize = self
                .lines
                .get(current)
                .children()
                .iter()
                .map(|&child| self.lines.get(child).subtree_size())
                .sum();
            if let Some(line) = self.lines.get_mut(current) {
                line.subtree_size = 1 + sum;
            }
            current = self.lines.get(current).parent();
        }
    }

    fn begin_compound(&mut self) {
        self.deferring = true;
    }

    fn end_compound(&mut self, summary: DocEvent) {
        self.deferring = false;
        self.events.push(summary);
    }

    fn emit(&mut self, event: DocEvent) {
        if !self.deferring {
            self.events.push(event);
        }
    }
}

/// Pre-order iterator over a subtree.
pub struct Subtree<'a> {
    doc: &'a Doc,
    stack: Vec<DocLineId>,
}

impl Iterator for Subtree<'_> {
    type Item = DocLineId;

    fn next(&mut self) -> Option<DocLineId> {
        let id = self.stack.pop()?;
        for &child in self.doc.lines.get(id).children().iter().rev() {
            self.stack.push(child);
        }
        Some(id)
    }
}
