use std::mem;

use ratatui::text::Line;

use crate::markdown;
use crate::text_layout::wrap_with_carets;

/// Where a view's content stream stands. `Replaced` allows the same
/// transitions as `Streaming`; it records that the last update was a full
/// clear-and-rerender rather than a delta.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewPhase {
    Empty,
    Streaming,
    Replaced,
}

/// One process's display unit: streamed output rendered incrementally, a
/// follow flag driven by scroll gestures, and an editable input region
/// whose submissions are forwarded to a caller-supplied handler.
pub struct StreamingProcessView {
    process_id: String,
    last_rendered_text: String,
    phase: ViewPhase,
    auto_scroll: bool,
    display: Vec<Line<'static>>,
    scroll: u16,
    input_text: String,
    input_cursor: usize,
    input_goal_col: Option<u16>,
}

impl StreamingProcessView {
    pub fn new(process_id: impl Into<String>) -> Self {
        Self {
            process_id: process_id.into(),
            last_rendered_text: String::new(),
            phase: ViewPhase::Empty,
            auto_scroll: true,
            display: Vec::new(),
            scroll: 0,
            input_text: String::new(),
            input_cursor: 0,
            input_goal_col: None,
        }
    }

    pub fn process_id(&self) -> &str {
        &self.process_id
    }

    pub fn phase(&self) -> ViewPhase {
        self.phase
    }

    pub fn auto_scroll(&self) -> bool {
        self.auto_scroll
    }

    pub fn scroll(&self) -> u16 {
        self.scroll
    }

    pub fn display(&self) -> &[Line<'static>] {
        &self.display
    }

    pub fn last_rendered_text(&self) -> &str {
        &self.last_rendered_text
    }

    /// Applies the full current output of the process. Equal text is a
    /// no-op; strict growth formats and appends only the new suffix; any
    /// other change clears the display and re-renders from scratch.
    pub fn update_content(&mut self, new_full_text: &str) {
        if new_full_text == self.last_rendered_text {
            return;
        }
        if new_full_text.starts_with(&self.last_rendered_text) {
            let delta = &new_full_text[self.last_rendered_text.len()..];
            self.display.extend(markdown::format_fragment(delta));
            self.phase = ViewPhase::Streaming;
        } else {
            self.display = markdown::format_fragment(new_full_text);
            self.phase = ViewPhase::Replaced;
        }
        self.last_rendered_text = new_full_text.to_string();
    }

    pub fn display_line_count(&self) -> u16 {
        self.display.len().min(u16::MAX as usize) as u16
    }

    pub fn max_scroll(&self, viewport_height: u16) -> u16 {
        self.display_line_count().saturating_sub(viewport_height)
    }

    /// A backward gesture unpins the view from the end of content.
    pub fn scroll_backward(&mut self, step: u16) {
        self.scroll = self.scroll.saturating_sub(step);
        self.auto_scroll = false;
    }

    /// A forward gesture re-pins only when it lands at the end.
    pub fn scroll_forward(&mut self, step: u16, max_scroll: u16) {
        self.scroll = self.scroll.saturating_add(step).min(max_scroll);
        self.auto_scroll = self.scroll >= max_scroll;
    }

    /// Re-applies follow behavior for the current viewport. Called after
    /// every content change and before drawing.
    pub fn apply_follow(&mut self, viewport_height: u16) {
        if self.auto_scroll {
            self.scroll = self.max_scroll(viewport_height);
        }
    }

    pub fn input_text(&self) -> &str {
        &self.input_text
    }

    pub fn input_cursor(&self) -> usize {
        self.input_cursor
    }

    pub fn input_cursor_line_col(&self, width: u16) -> (u16, u16) {
        let carets = wrap_with_carets(&self.input_text, width.max(1)).carets;
        carets[self.input_cursor]
    }

    pub fn input_char(&mut self, ch: char) {
        let byte_idx = char_to_byte_idx(&self.input_text, self.input_cursor);
        self.input_text.insert(byte_idx, ch);
        self.input_cursor = self.input_cursor.saturating_add(1);
        self.input_goal_col = None;
    }

    pub fn insert_newline(&mut self) {
        self.input_char('\n');
    }

    pub fn backspace(&mut self) {
        if self.input_cursor == 0 {
            return;
        }
        let start = char_to_byte_idx(&self.input_text, self.input_cursor.saturating_sub(1));
        let end = char_to_byte_idx(&self.input_text, self.input_cursor);
        self.input_text.drain(start..end);
        self.input_cursor = self.input_cursor.saturating_sub(1);
        self.input_goal_col = None;
    }

    pub fn move_cursor_left(&mut self) {
        self.input_cursor = self.input_cursor.saturating_sub(1);
        self.input_goal_col = None;
    }

    pub fn move_cursor_right(&mut self) {
        let char_len = self.input_text.chars().count();
        self.input_cursor = (self.input_cursor + 1).min(char_len);
        self.input_goal_col = None;
    }

    pub fn move_cursor_up(&mut self, width: u16) {
        let width = width.max(1);
        let carets = wrap_with_carets(&self.input_text, width).carets;
        let (row, col) = carets[self.input_cursor];
        if row == 0 {
            return;
        }
        let goal_col = self.input_goal_col.unwrap_or(col);
        self.input_cursor = nearest_index_for_row_col(&carets, row - 1, goal_col);
        self.input_goal_col = Some(goal_col);
    }

    pub fn move_cursor_down(&mut self, width: u16) {
        let width = width.max(1);
        let carets = wrap_with_carets(&self.input_text, width).carets;
        let (row, col) = carets[self.input_cursor];
        let max_row = carets.iter().map(|(r, _)| *r).max().unwrap_or(0);
        if row >= max_row {
            return;
        }
        let goal_col = self.input_goal_col.unwrap_or(col);
        self.input_cursor = nearest_index_for_row_col(&carets, row + 1, goal_col);
        self.input_goal_col = Some(goal_col);
    }

    /// Forwards the input region to `handler` as `(process_id, text)` and
    /// reports whether it fired. The region is cleared before the handler
    /// runs, so it is empty afterwards no matter what the handler does. An
    /// empty region does not fire.
    pub fn submit_to<F>(&mut self, handler: F) -> bool
    where
        F: FnOnce(&str, &str),
    {
        if self.input_text.is_empty() {
            return false;
        }
        let text = mem::take(&mut self.input_text);
        self.input_cursor = 0;
        self.input_goal_col = None;
        handler(&self.process_id, &text);
        true
    }
}

fn char_to_byte_idx(s: &str, char_idx: usize) -> usize {
    s.char_indices()
        .nth(char_idx)
        .map(|(byte_idx, _)| byte_idx)
        .unwrap_or_else(|| s.len())
}

fn nearest_index_for_row_col(carets: &[(u16, u16)], target_row: u16, goal_col: u16) -> usize {
    let mut best: Option<(usize, u16)> = None;
    let mut fallback: Option<usize> = None;

    for (idx, (row, col)) in carets.iter().copied().enumerate() {
        if row != target_row {
            continue;
        }
        if fallback.is_none() {
            fallback = Some(idx);
        }
        if col <= goal_col {
            best = match best {
                Some((_, best_col)) if best_col >= col => best,
                _ => Some((idx, col)),
            };
        }
    }

    if let Some((idx, _)) = best {
        idx
    } else {
        fallback.unwrap_or(carets.len().saturating_sub(1))
    }
}

#[cfg(test)]
#[path = "../tests/unit/view_tests.rs"]
mod tests;
