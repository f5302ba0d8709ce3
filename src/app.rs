use std::collections::HashSet;
use std::time::{Duration, Instant};

use crate::view::StreamingProcessView;

/// Second Esc within this window quits; the first press arms a status
/// hint that expires with the window.
pub const DOUBLE_ESCAPE_WINDOW: Duration = Duration::from_secs(2);

/// UI state around the process views: creation-ordered registry, focus,
/// the set of process ids with a tool run in flight, and quit arming.
/// Process ids are unique; the vector doubles as the id-keyed mapping.
pub struct App {
    views: Vec<StreamingProcessView>,
    focus: usize,
    busy: HashSet<String>,
    escape_armed_at: Option<Instant>,
    running: bool,
    ticks: u64,
}

impl Default for App {
    fn default() -> Self {
        Self {
            views: Vec::new(),
            focus: 0,
            busy: HashSet::new(),
            escape_armed_at: None,
            running: true,
            ticks: 0,
        }
    }
}

impl App {
    pub fn register_view(&mut self, view: StreamingProcessView) {
        self.views.push(view);
    }

    pub fn views(&self) -> &[StreamingProcessView] {
        &self.views
    }

    pub fn view_count(&self) -> usize {
        self.views.len()
    }

    pub fn focused_index(&self) -> usize {
        self.focus
    }

    pub fn focused_view(&self) -> Option<&StreamingProcessView> {
        self.views.get(self.focus)
    }

    pub fn focused_view_mut(&mut self) -> Option<&mut StreamingProcessView> {
        self.views.get_mut(self.focus)
    }

    pub fn view_mut_by_id(&mut self, process_id: &str) -> Option<&mut StreamingProcessView> {
        self.views
            .iter_mut()
            .find(|view| view.process_id() == process_id)
    }

    pub fn focus_next(&mut self) {
        if self.views.is_empty() {
            return;
        }
        self.focus = (self.focus + 1) % self.views.len();
    }

    pub fn focus_prev(&mut self) {
        if self.views.is_empty() {
            return;
        }
        self.focus = (self.focus + self.views.len() - 1) % self.views.len();
    }

    pub fn focus_index(&mut self, index: usize) {
        if index < self.views.len() {
            self.focus = index;
        }
    }

    pub fn mark_busy(&mut self, process_id: &str) {
        self.busy.insert(process_id.to_string());
    }

    pub fn clear_busy(&mut self, process_id: &str) {
        self.busy.remove(process_id);
    }

    pub fn is_busy(&self, process_id: &str) -> bool {
        self.busy.contains(process_id)
    }

    pub fn any_busy(&self) -> bool {
        !self.busy.is_empty()
    }

    /// First press arms, a second within the window quits. A press after
    /// the window expired re-arms instead of quitting.
    pub fn handle_escape(&mut self, now: Instant) {
        match self.escape_armed_at {
            Some(armed) if now.duration_since(armed) <= DOUBLE_ESCAPE_WINDOW => {
                self.running = false;
            }
            _ => self.escape_armed_at = Some(now),
        }
    }

    pub fn escape_armed(&self, now: Instant) -> bool {
        self.escape_armed_at
            .is_some_and(|armed| now.duration_since(armed) <= DOUBLE_ESCAPE_WINDOW)
    }

    pub fn quit(&mut self) {
        self.running = false;
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn on_tick(&mut self) {
        self.ticks = self.ticks.saturating_add(1);
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }
}

#[cfg(test)]
#[path = "../tests/unit/app_tests.rs"]
mod tests;
