//! Bounded scrollback buffer with independent producer/consumer write paths
//! and its own scroll cursor.

use std::collections::VecDeque;

/// ARGB display tint used by the render hook to mark queue focus.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Color(pub u32);

impl Color {
    /// Tint of the currently selected queue.
    pub const ACTIVE: Color = Color(0xFF00_FF00);
    /// Tint of the unselected queues.
    pub const INACTIVE: Color = Color(0xFFFF_FF00);
}

/// Who wrote a line. Remote lines arrived from the game or backend and are
/// displayed only; local lines were typed by the user and forwarded outward.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineOrigin {
    Remote,
    Local,
}

/// A single stored scrollback line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueLine {
    pub text: String,
    pub origin: LineOrigin,
}

/// Bounded scrollback buffer. The scroll offset counts lines back from the
/// newest entry, so eviction at the head leaves the user's view stable.
#[derive(Debug)]
pub struct LineQueue {
    lines: VecDeque<QueueLine>,
    capacity: usize,
    visible_rows: usize,
    scroll_offset: usize,
    color: Color,
}

impl LineQueue {
    pub fn new(capacity: usize, visible_rows: usize, color: Color) -> Self {
        let capacity = capacity.max(1);
        Self {
            lines: VecDeque::with_capacity(capacity),
            capacity,
            visible_rows: visible_rows.clamp(1, capacity),
            scroll_offset: 0,
            color,
        }
    }

    /// Append a line arriving from the game or backend side.
    pub fn push_from_producer(&mut self, text: impl Into<String>) {
        self.push(text.into(), LineOrigin::Remote);
    }

    /// Append a line typed by the user. Outbound transmission is routed by
    /// the session; the queue only records the echo.
    pub fn push_from_consumer(&mut self, text: impl Into<String>) {
        self.push(text.into(), LineOrigin::Local);
    }

    fn push(&mut self, text: String, origin: LineOrigin) {
        if self.lines.len() >= self.capacity {
            self.lines.pop_front();
        }
        self.lines.push_back(QueueLine { text, origin });
    }

    /// Scroll one line toward older entries, saturating at the oldest window.
    pub fn scroll_older(&mut self) {
        if self.scroll_offset < self.max_scroll() {
            self.scroll_offset += 1;
        }
    }

    /// Scroll one line toward newer entries, saturating at the live view.
    pub fn scroll_newer(&mut self) {
        self.scroll_offset = self.scroll_offset.saturating_sub(1);
    }

    /// Jump back to the live view. Called when the queue becomes selected.
    pub fn reset_scroll(&mut self) {
        self.scroll_offset = 0;
    }

    fn max_scroll(&self) -> usize {
        self.capacity - self.visible_rows
    }

    pub fn scroll_offset(&self) -> usize {
        self.scroll_offset
    }

    pub fn visible_rows(&self) -> usize {
        self.visible_rows
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn color(&self) -> Color {
        self.color
    }

    pub fn set_color(&mut self, color: Color) {
        self.color = color;
    }

    /// Iterate all stored lines, oldest first.
    pub fn lines(&self) -> impl Iterator<Item = &QueueLine> {
        self.lines.iter()
    }

    /// The window of lines the render hook should draw: up to `visible_rows`
    /// lines ending `scroll_offset` lines before the newest.
    pub fn visible_window(&self) -> impl Iterator<Item = &QueueLine> {
        let end = self.lines.len().saturating_sub(self.scroll_offset);
        let start = end.saturating_sub(self.visible_rows);
        self.lines.iter().skip(start).take(end - start)
    }
}
