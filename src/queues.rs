//! The three fixed scrollback queues and the shared handle that lets the
//! input thread, the backend producer, and the render hook interleave safely.

use std::sync::{Arc, Mutex};

use crate::config::OverlayConfig;
use crate::line_queue::{Color, LineQueue, QueueLine};

/// Selector over the three fixed queues. Stored instead of a queue reference
/// so the session never holds a pointer that could dangle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueueKind {
    Console,
    GlobalChat,
    GameChat,
}

impl QueueKind {
    pub const ALL: [QueueKind; 3] = [
        QueueKind::Console,
        QueueKind::GlobalChat,
        QueueKind::GameChat,
    ];

    pub fn label(self) -> &'static str {
        match self {
            QueueKind::Console => "console",
            QueueKind::GlobalChat => "global chat",
            QueueKind::GameChat => "game chat",
        }
    }
}

/// Read-only view of one queue for the render hook.
#[derive(Debug, Clone)]
pub struct QueueSnapshot {
    pub lines: Vec<QueueLine>,
    pub color: Color,
    pub scroll_offset: usize,
    pub visible_rows: usize,
}

/// The console, global-chat, and game-chat queues behind one mutex each.
/// Lives for the process lifetime of the overlay.
#[derive(Debug)]
pub struct ChatQueues {
    console: Mutex<LineQueue>,
    global_chat: Mutex<LineQueue>,
    game_chat: Mutex<LineQueue>,
    active_color: Color,
    inactive_color: Color,
}

impl ChatQueues {
    /// Build the three queues. The console queue starts selected.
    pub fn new(config: &OverlayConfig) -> Arc<Self> {
        let active = config.active_color();
        let inactive = config.inactive_color();
        let queue = |color| {
            Mutex::new(LineQueue::new(
                config.lines_buffer,
                config.lines_to_show,
                color,
            ))
        };
        Arc::new(Self {
            console: queue(active),
            global_chat: queue(inactive),
            game_chat: queue(inactive),
            active_color: active,
            inactive_color: inactive,
        })
    }

    fn slot(&self, kind: QueueKind) -> &Mutex<LineQueue> {
        match kind {
            QueueKind::Console => &self.console,
            QueueKind::GlobalChat => &self.global_chat,
            QueueKind::GameChat => &self.game_chat,
        }
    }

    /// Run `f` with exclusive access to one queue. Poisoning is recovered
    /// because a panicked writer must not soft-lock the host's render path.
    pub fn with<T>(&self, kind: QueueKind, f: impl FnOnce(&mut LineQueue) -> T) -> T {
        let mut guard = self
            .slot(kind)
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        f(&mut guard)
    }

    /// Producer push from any writer thread.
    pub fn push_from_producer(&self, kind: QueueKind, text: impl Into<String>) {
        let text = text.into();
        self.with(kind, move |q| q.push_from_producer(text));
    }

    /// Recolor so exactly `selected` carries the active tint.
    pub fn recolor(&self, selected: QueueKind) {
        for kind in QueueKind::ALL {
            let color = if kind == selected {
                self.active_color
            } else {
                self.inactive_color
            };
            self.with(kind, |q| q.set_color(color));
        }
    }

    /// Clone the visible window for rendering. Non-blocking apart from the
    /// per-queue lock.
    pub fn snapshot(&self, kind: QueueKind) -> QueueSnapshot {
        self.with(kind, |q| QueueSnapshot {
            lines: q.visible_window().cloned().collect(),
            color: q.color(),
            scroll_offset: q.scroll_offset(),
            visible_rows: q.visible_rows(),
        })
    }
}
