//! Key combo parsing and dispatch.
//!
//! Shells deliver keystrokes as combo strings in the form
//! `[C-][A-][S-][M-]key`, modifiers always in that order: `C-S-ArrowUp`,
//! `Tab`, `S-x`. A combo naming only a modifier is ignored. Unmodified
//! (or shift-only) single characters insert themselves; everything
//! else dispatches through one of two binding tables depending on
//! whether the selection is a caret or a block.

use crate::change::ChangeError;
use crate::state::EditorState;

/// A parsed key combo.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyCombo {
    ctrl: bool,
    alt: bool,
    shift: bool,
    meta: bool,
    key: String,
}

impl KeyCombo {
    /// Parses a combo string. Returns `None` for an empty key or a
    /// bare modifier press.
    pub fn parse(combo: &str) -> Option<KeyCombo> {
        let mut rest = combo;
        let mut ctrl = false;
        let mut alt = false;
        let mut shift = false;
        let mut meta = false;
        if let Some(tail) = rest.strip_prefix("C-") {
            ctrl = true;
            rest = tail;
        }
        if let Some(tail) = rest.strip_prefix("A-") {
            alt = true;
            rest = tail;
        }
        if let Some(tail) = rest.strip_prefix("S-") {
            shift = true;
            rest = tail;
        }
        if let Some(tail) = rest.strip_prefix("M-") {
            meta = true;
            rest = tail;
        }
        if rest.is_empty() {
            return None;
        }
        if matches!(rest, "Control" | "Alt" | "Shift" | "Meta") {
            return None;
        }
        Some(KeyCombo {
            ctrl,
            alt,
            shift,
            meta,
            key: rest.to_string(),
        })
    }

    /// Key name without modifiers.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// True when Control is held.
    pub fn ctrl(&self) -> bool {
        self.ctrl
    }

    /// True when Alt is held.
    pub fn alt(&self) -> bool {
        self.alt
    }

    /// True when Shift is held.
    pub fn shift(&self) -> bool {
        self.shift
    }

    /// True when Meta is held.
    pub fn meta(&self) -> bool {
        self.meta
    }

    /// The combo in its canonical string form, modifiers in `C- A- S-
    /// M-` order.
    pub fn canonical(&self) -> String {
        let mut combo = String::new();
        if self.ctrl {
            combo.push_str("C-");
        }
        if self.alt {
            combo.push_str("A-");
        }
        if self.shift {
            combo.push_str("S-");
        }
        if self.meta {
            combo.push_str("M-");
        }
        combo.push_str(&self.key);
        combo
    }

    /// The character this combo types, when it is a plain or
    /// shift-only single character.
    pub fn printable(&self) -> Option<char> {
        if self.ctrl || self.alt || self.meta {
            return None;
        }
        let mut chars = self.key.chars();
        match (chars.next(), chars.next()) {
            (Some(ch), None) => Some(ch),
            _ => None,
        }
    }
}

impl std::fmt::Display for KeyCombo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.canonical())
    }
}

impl EditorState {
    /// Routes one keystroke to the operation bound to it. Returns
    /// whether the combo was consumed; an unbound combo leaves the
    /// state untouched.
    pub fn handle_key(&mut self, combo: &str) -> Result<bool, ChangeError> {
        let Some(key) = KeyCombo::parse(combo) else {
            return Ok(false);
        };
        if self.site().selection().as_block().is_some() {
            self.handle_block_key(&key)
        } else {
            self.handle_text_key(&key)
        }
    }

    fn handle_text_key(&mut self, key: &KeyCombo) -> Result<bool, ChangeError> {
        match key.canonical().as_str() {
            "Enter" => self.enter()?,
            "Backspace" => self.backspace()?,
            "Delete" => self.delete_forward()?,
            "Tab" => self.tab()?,
            "S-Tab" => self.shift_tab()?,
            "ArrowLeft" => self.arrow_left()?,
            "ArrowRight" => self.arrow_right()?,
            "ArrowUp" => self.arrow_up()?,
            "ArrowDown" => self.arrow_down()?,
            "S-ArrowLeft" => self.shift_arrow_left()?,
            "S-ArrowRight" => self.shift_arrow_right()?,
            "S-ArrowUp" | "S-ArrowDown" => self.select_row()?,
            "C-ArrowLeft" => self.word_left()?,
            "C-ArrowRight" => self.word_right()?,
            "C-S-ArrowLeft" => self.shift_word_left()?,
            "C-S-ArrowRight" => self.shift_word_right()?,
            "C-ArrowUp" => self.swap_up()?,
            "C-ArrowDown" => self.swap_down()?,
            "Home" => self.home()?,
            "End" => self.end()?,
            "S-Home" => self.shift_home()?,
            "S-End" => self.shift_end()?,
            "C-." => self.fold_at_selection()?,
            "C-]" => self.zoom_at_selection()?,
            "C-[" => self.zoom_out(),
            _ => {
                let Some(ch) = key.printable() else {
                    return Ok(false);
                };
                self.insert_char(ch)?
            }
        };
        Ok(true)
    }

    fn handle_block_key(&mut self, key: &KeyCombo) -> Result<bool, ChangeError> {
        match key.canonical().as_str() {
            "ArrowUp" => self.block_arrow_up()?,
            "ArrowDown" => self.block_arrow_down()?,
            "S-ArrowUp" => self.block_shift_arrow_up()?,
            "S-ArrowDown" => self.block_shift_arrow_down()?,
            "Tab" => self.block_tab()?,
            "S-Tab" => self.block_shift_tab()?,
            "C-ArrowUp" => self.block_swap_up()?,
            "C-ArrowDown" => self.block_swap_down()?,
            "Backspace" | "Delete" => self.block_delete()?,
            "Enter" | "Escape" => self.block_escape()?,
            "C-." => self.fold_at_selection()?,
            "C-]" => self.zoom_at_selection()?,
            "C-[" => self.zoom_out(),
            _ => return Ok(false),
        };
        Ok(true)
    }
}
