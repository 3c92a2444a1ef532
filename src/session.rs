//! Console visibility, queue selection, and the key-event dispatch table.
//!
//! One session exists per process. The host's input hook calls
//! [`ConsoleSession::check_for_open_key`] every poll tick while the console is
//! hidden and [`ConsoleSession::virtual_key_callback`] for every raw key while
//! it is shown. The render hook reads visibility, queue snapshots, and the
//! pending edit buffer between ticks.

use std::sync::Arc;
use std::time::{Duration, Instant};

use crossbeam_channel::Sender;

use crate::capture::InputCapture;
use crate::config::OverlayConfig;
use crate::keys::VirtualKey;
use crate::layout::{KeyStateProbe, KeyboardLayout, ModifierState};
use crate::logging::log_debug;
use crate::queues::{ChatQueues, QueueKind};

/// Remote channel a submitted chat line is bound for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatChannel {
    Global,
    Game,
}

/// A submitted line leaving the overlay. Console submissions go to the
/// external command interpreter; chat submissions to the transmission path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outbound {
    Command(String),
    Chat { channel: ChatChannel, text: String },
}

/// The overlay's input-routing state machine.
pub struct ConsoleSession {
    queues: Arc<ChatQueues>,
    capture: Box<dyn InputCapture>,
    layout: Box<dyn KeyboardLayout>,
    key_state: Box<dyn KeyStateProbe>,
    outbound: Sender<Outbound>,
    visible: bool,
    selected: QueueKind,
    edit_buffer: String,
    caps_lock_toggled: bool,
    open_debounce: Duration,
    last_visibility_change: Option<Instant>,
    last_submit: Option<Instant>,
}

impl ConsoleSession {
    pub fn new(
        queues: Arc<ChatQueues>,
        config: &OverlayConfig,
        capture: Box<dyn InputCapture>,
        layout: Box<dyn KeyboardLayout>,
        key_state: Box<dyn KeyStateProbe>,
        outbound: Sender<Outbound>,
    ) -> Self {
        queues.push_from_producer(
            QueueKind::Console,
            format!("dewterm version {}", env!("CARGO_PKG_VERSION")),
        );
        queues.push_from_producer(
            QueueKind::Console,
            "Enter help or help <command> to get started!",
        );
        queues.push_from_producer(
            QueueKind::Console,
            "Press page-up or page-down while chat is open to scroll.",
        );

        Self {
            queues,
            capture,
            layout,
            key_state,
            outbound,
            visible: false,
            selected: QueueKind::Console,
            edit_buffer: String::new(),
            caps_lock_toggled: false,
            open_debounce: config.open_debounce(),
            last_visibility_change: None,
            last_submit: None,
        }
    }

    pub fn is_console_shown(&self) -> bool {
        self.visible
    }

    pub fn selected_queue(&self) -> QueueKind {
        self.selected
    }

    pub fn edit_buffer(&self) -> &str {
        &self.edit_buffer
    }

    pub fn caps_lock_toggled(&self) -> bool {
        self.caps_lock_toggled
    }

    pub fn queues(&self) -> &Arc<ChatQueues> {
        &self.queues
    }

    pub fn last_submit_at(&self) -> Option<Instant> {
        self.last_submit
    }

    /// Hidden-side poll tick: open the console when the Return key is down
    /// and the debounce window since the last show/hide has elapsed.
    pub fn check_for_open_key(&mut self, now: Instant) {
        if self.visible {
            return;
        }
        if self.key_state.return_down() && self.debounce_elapsed(now) {
            self.show(now);
        }
    }

    pub fn check_for_open_key_now(&mut self) {
        self.check_for_open_key(Instant::now());
    }

    /// Dispatch one raw virtual-key event.
    pub fn virtual_key_callback(&mut self, code: u16, now: Instant) {
        if !self.visible {
            if VirtualKey::from_code(code) == VirtualKey::Return && self.debounce_elapsed(now) {
                self.show(now);
            }
            return;
        }

        match VirtualKey::from_code(code) {
            VirtualKey::Return => {
                if !self.edit_buffer.is_empty() {
                    let line = std::mem::take(&mut self.edit_buffer);
                    self.forward_line(line);
                    self.last_submit = Some(now);
                }
                self.hide(now);
            }
            VirtualKey::Escape => self.hide(now),
            VirtualKey::Backspace => {
                self.edit_buffer.pop();
            }
            VirtualKey::F1 => self.select_queue(QueueKind::Console),
            VirtualKey::F2 => self.select_queue(QueueKind::GlobalChat),
            VirtualKey::F3 => self.select_queue(QueueKind::GameChat),
            VirtualKey::CapsLock => self.caps_lock_toggled = !self.caps_lock_toggled,
            VirtualKey::PageUp => self.queues.with(self.selected, |q| q.scroll_older()),
            VirtualKey::PageDown => self.queues.with(self.selected, |q| q.scroll_newer()),
            VirtualKey::Other(code) => {
                let mods = ModifierState {
                    shift: self.key_state.shift_down(),
                    caps_lock: self.caps_lock_toggled,
                };
                self.layout
                    .translate(code, mods)
                    .append_to(&mut self.edit_buffer);
            }
        }
    }

    pub fn virtual_key_callback_now(&mut self, code: u16) {
        self.virtual_key_callback(code, Instant::now());
    }

    fn select_queue(&mut self, kind: QueueKind) {
        self.selected = kind;
        self.queues.with(kind, |q| q.reset_scroll());
        self.queues.recolor(kind);
        tracing::debug!(queue = kind.label(), "queue selected");
    }

    fn forward_line(&mut self, line: String) {
        self.queues
            .with(self.selected, |q| q.push_from_consumer(line.clone()));
        let message = match self.selected {
            QueueKind::Console => Outbound::Command(line),
            QueueKind::GlobalChat => Outbound::Chat {
                channel: ChatChannel::Global,
                text: line,
            },
            QueueKind::GameChat => Outbound::Chat {
                channel: ChatChannel::Game,
                text: line,
            },
        };
        if self.outbound.send(message).is_err() {
            log_debug("outbound receiver disconnected; dropping submitted line");
        }
    }

    fn show(&mut self, now: Instant) {
        self.visible = true;
        // Seed our software caps indicator from the OS once per show; after
        // that only the caps-lock key event flips it.
        self.caps_lock_toggled = self.key_state.caps_lock_on();
        self.last_visibility_change = Some(now);
        tracing::debug!("console shown");
        if let Err(err) = self.capture.acquire() {
            self.report_capture_failure("Registering keyboard failed", &err);
        }
    }

    fn hide(&mut self, now: Instant) {
        self.last_visibility_change = Some(now);
        self.visible = false;
        self.edit_buffer.clear();
        tracing::debug!("console hidden");
        if let Err(err) = self.capture.release() {
            self.report_capture_failure("Unregistering keyboard failed", &err);
        }
    }

    fn report_capture_failure(&self, what: &str, err: &anyhow::Error) {
        self.queues
            .push_from_producer(QueueKind::Console, format!("{what}: {err:#}"));
        log_debug(&format!("{what}: {err:#}"));
    }

    fn debounce_elapsed(&self, now: Instant) -> bool {
        match self.last_visibility_change {
            Some(at) => now.duration_since(at) >= self.open_debounce,
            None => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::NoopCapture;
    use crate::keys::{VK_BACK, VK_CAPITAL, VK_ESCAPE, VK_F1, VK_F2, VK_F3, VK_NEXT, VK_PRIOR, VK_RETURN};
    use crate::layout::{StaticKeyState, Translation, UsLayout};
    use crate::line_queue::{Color, LineOrigin};
    use anyhow::anyhow;
    use crossbeam_channel::{unbounded, Receiver};
    use rstest::rstest;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    struct RecordingCapture {
        acquires: Arc<AtomicUsize>,
        releases: Arc<AtomicUsize>,
        fail_acquire: bool,
        fail_release: bool,
    }

    impl InputCapture for RecordingCapture {
        fn acquire(&mut self) -> anyhow::Result<()> {
            self.acquires.fetch_add(1, Ordering::SeqCst);
            if self.fail_acquire {
                return Err(anyhow!("raw input registration rejected"));
            }
            Ok(())
        }

        fn release(&mut self) -> anyhow::Result<()> {
            self.releases.fetch_add(1, Ordering::SeqCst);
            if self.fail_release {
                return Err(anyhow!("raw input removal rejected"));
            }
            Ok(())
        }
    }

    #[derive(Clone, Default)]
    struct SharedKeyState(Arc<Mutex<StaticKeyState>>);

    impl SharedKeyState {
        fn set(&self, f: impl FnOnce(&mut StaticKeyState)) {
            let mut state = self.0.lock().expect("key state lock");
            f(&mut state);
        }
    }

    impl KeyStateProbe for SharedKeyState {
        fn key_down(&self, code: u16) -> bool {
            self.0.lock().expect("key state lock").key_down(code)
        }

        fn caps_lock_on(&self) -> bool {
            self.0.lock().expect("key state lock").caps_lock_on()
        }
    }

    /// Stub layout that models a dead-key composition for every key.
    struct DeadKeyLayout;

    impl KeyboardLayout for DeadKeyLayout {
        fn translate(&self, _code: u16, _mods: ModifierState) -> Translation {
            Translation::Two('\u{0301}', 'e')
        }
    }

    struct Harness {
        session: ConsoleSession,
        outbound: Receiver<Outbound>,
        key_state: SharedKeyState,
    }

    fn harness() -> Harness {
        harness_with(Box::new(NoopCapture), Box::new(UsLayout))
    }

    fn harness_with(
        capture: Box<dyn InputCapture>,
        layout: Box<dyn KeyboardLayout>,
    ) -> Harness {
        let config = OverlayConfig::default();
        let queues = ChatQueues::new(&config);
        let (tx, rx) = unbounded();
        let key_state = SharedKeyState::default();
        let session = ConsoleSession::new(
            queues,
            &config,
            capture,
            layout,
            Box::new(key_state.clone()),
            tx,
        );
        Harness {
            session,
            outbound: rx,
            key_state,
        }
    }

    fn open(harness: &mut Harness, now: Instant) {
        harness.session.virtual_key_callback(VK_RETURN, now);
        assert!(harness.session.is_console_shown());
    }

    fn type_str(harness: &mut Harness, text: &str, now: Instant) {
        for ch in text.chars() {
            let code = ch.to_ascii_uppercase() as u16;
            harness.key_state.set(|s| s.shift = ch.is_ascii_uppercase());
            harness.session.virtual_key_callback(code, now);
        }
        harness.key_state.set(|s| s.shift = false);
    }

    #[test]
    fn construction_pushes_banner_lines() {
        let harness = harness();
        let snapshot = harness.session.queues().snapshot(QueueKind::Console);
        let texts: Vec<&str> = snapshot.lines.iter().map(|l| l.text.as_str()).collect();
        assert!(texts[0].starts_with("dewterm version "));
        assert!(texts.iter().any(|t| t.contains("help <command>")));
        assert!(texts.iter().any(|t| t.contains("page-up or page-down")));
    }

    #[test]
    fn starts_hidden_with_console_selected_and_empty_buffer() {
        let harness = harness();
        assert!(!harness.session.is_console_shown());
        assert_eq!(harness.session.selected_queue(), QueueKind::Console);
        assert_eq!(harness.session.edit_buffer(), "");
    }

    #[test]
    fn poll_opens_only_while_return_is_down() {
        let mut harness = harness();
        let now = Instant::now();
        harness.session.check_for_open_key(now);
        assert!(!harness.session.is_console_shown());

        harness.key_state.set(|s| s.return_key = true);
        harness.session.check_for_open_key(now);
        assert!(harness.session.is_console_shown());
    }

    #[test]
    fn reopen_within_debounce_window_is_suppressed() {
        let mut harness = harness();
        let t0 = Instant::now();
        open(&mut harness, t0);
        harness
            .session
            .virtual_key_callback(VK_ESCAPE, t0 + Duration::from_millis(10));
        assert!(!harness.session.is_console_shown());

        harness.key_state.set(|s| s.return_key = true);
        harness
            .session
            .check_for_open_key(t0 + Duration::from_millis(50));
        assert!(!harness.session.is_console_shown());

        harness
            .session
            .check_for_open_key(t0 + Duration::from_millis(200));
        assert!(harness.session.is_console_shown());
    }

    #[test]
    fn reopen_after_submit_respects_debounce() {
        let mut harness = harness();
        let t0 = Instant::now();
        open(&mut harness, t0);
        type_str(&mut harness, "hi", t0);
        let submit_at = t0 + Duration::from_millis(500);
        harness.session.virtual_key_callback(VK_RETURN, submit_at);
        assert!(!harness.session.is_console_shown());

        // The same physical Return press must not reopen immediately.
        harness
            .session
            .virtual_key_callback(VK_RETURN, submit_at + Duration::from_millis(20));
        assert!(!harness.session.is_console_shown());

        harness
            .session
            .virtual_key_callback(VK_RETURN, submit_at + Duration::from_millis(150));
        assert!(harness.session.is_console_shown());
    }

    #[test]
    fn submit_forwards_once_clears_buffer_and_hides() {
        let mut harness = harness();
        let t0 = Instant::now();
        open(&mut harness, t0);
        type_str(&mut harness, "help", t0);
        assert_eq!(harness.session.edit_buffer(), "help");

        let submit_at = t0 + Duration::from_millis(500);
        harness.session.virtual_key_callback(VK_RETURN, submit_at);

        assert_eq!(
            harness.outbound.try_recv(),
            Ok(Outbound::Command("help".to_string()))
        );
        assert!(harness.outbound.try_recv().is_err(), "exactly one forward");
        assert_eq!(harness.session.edit_buffer(), "");
        assert!(!harness.session.is_console_shown());
        assert_eq!(harness.session.last_submit_at(), Some(submit_at));

        let snapshot = harness.session.queues().snapshot(QueueKind::Console);
        let echoed = snapshot
            .lines
            .iter()
            .find(|l| l.text == "help")
            .expect("submitted line echoed to queue");
        assert_eq!(echoed.origin, LineOrigin::Local);
    }

    #[test]
    fn empty_submit_hides_without_forwarding() {
        let mut harness = harness();
        let t0 = Instant::now();
        open(&mut harness, t0);
        harness
            .session
            .virtual_key_callback(VK_RETURN, t0 + Duration::from_millis(500));
        assert!(!harness.session.is_console_shown());
        assert!(harness.outbound.try_recv().is_err());
        assert!(harness.session.last_submit_at().is_none());
    }

    #[rstest]
    #[case(QueueKind::GlobalChat, ChatChannel::Global)]
    #[case(QueueKind::GameChat, ChatChannel::Game)]
    fn chat_submissions_carry_their_channel(
        #[case] kind: QueueKind,
        #[case] channel: ChatChannel,
    ) {
        let mut harness = harness();
        let t0 = Instant::now();
        open(&mut harness, t0);
        let select = match kind {
            QueueKind::GlobalChat => VK_F2,
            _ => VK_F3,
        };
        harness.session.virtual_key_callback(select, t0);
        type_str(&mut harness, "gg", t0);
        harness
            .session
            .virtual_key_callback(VK_RETURN, t0 + Duration::from_millis(500));

        assert_eq!(
            harness.outbound.try_recv(),
            Ok(Outbound::Chat {
                channel,
                text: "gg".to_string()
            })
        );
        let snapshot = harness.session.queues().snapshot(kind);
        assert!(snapshot.lines.iter().any(|l| l.text == "gg"));
    }

    #[test]
    fn escape_clears_buffer_and_hides() {
        let mut harness = harness();
        let t0 = Instant::now();
        open(&mut harness, t0);
        type_str(&mut harness, "half typed", t0);
        harness
            .session
            .virtual_key_callback(VK_ESCAPE, t0 + Duration::from_millis(5));
        assert!(!harness.session.is_console_shown());
        assert_eq!(harness.session.edit_buffer(), "");
        assert!(harness.outbound.try_recv().is_err());
    }

    #[test]
    fn backspace_pops_and_is_noop_when_empty() {
        let mut harness = harness();
        let t0 = Instant::now();
        open(&mut harness, t0);
        harness.session.virtual_key_callback(VK_BACK, t0);
        assert_eq!(harness.session.edit_buffer(), "");

        type_str(&mut harness, "ab", t0);
        harness.session.virtual_key_callback(VK_BACK, t0);
        assert_eq!(harness.session.edit_buffer(), "a");
    }

    #[rstest]
    #[case(VK_F1, QueueKind::Console)]
    #[case(VK_F2, QueueKind::GlobalChat)]
    #[case(VK_F3, QueueKind::GameChat)]
    fn function_keys_select_queue_reset_scroll_and_recolor(
        #[case] key: u16,
        #[case] expected: QueueKind,
    ) {
        let mut harness = harness();
        let t0 = Instant::now();
        open(&mut harness, t0);

        // Scroll every queue away from the live view, then select.
        for kind in QueueKind::ALL {
            harness.session.queues().with(kind, |q| {
                for _ in 0..3 {
                    q.scroll_older();
                }
            });
        }
        harness.session.virtual_key_callback(key, t0);

        assert_eq!(harness.session.selected_queue(), expected);
        for kind in QueueKind::ALL {
            let snapshot = harness.session.queues().snapshot(kind);
            if kind == expected {
                assert_eq!(snapshot.scroll_offset, 0);
                assert_eq!(snapshot.color, Color::ACTIVE);
            } else {
                assert_eq!(snapshot.scroll_offset, 3, "other queues keep scroll");
                assert_eq!(snapshot.color, Color::INACTIVE);
            }
        }
    }

    #[test]
    fn caps_lock_key_flips_toggle_and_casing() {
        let mut harness = harness();
        let t0 = Instant::now();
        open(&mut harness, t0);
        assert!(!harness.session.caps_lock_toggled());

        harness.session.virtual_key_callback(VK_CAPITAL, t0);
        assert!(harness.session.caps_lock_toggled());
        harness.session.virtual_key_callback(0x41, t0);
        assert_eq!(harness.session.edit_buffer(), "A");

        harness.session.virtual_key_callback(VK_CAPITAL, t0);
        harness.session.virtual_key_callback(0x41, t0);
        assert_eq!(harness.session.edit_buffer(), "Aa");
    }

    #[test]
    fn show_seeds_caps_toggle_from_os_state() {
        let mut harness = harness();
        harness.key_state.set(|s| s.caps_lock = true);
        open(&mut harness, Instant::now());
        assert!(harness.session.caps_lock_toggled());
    }

    #[test]
    fn page_keys_scroll_the_selected_queue_only() {
        let mut harness = harness();
        let t0 = Instant::now();
        open(&mut harness, t0);
        harness.session.virtual_key_callback(VK_F2, t0);

        harness.session.virtual_key_callback(VK_PRIOR, t0);
        harness.session.virtual_key_callback(VK_PRIOR, t0);
        assert_eq!(
            harness
                .session
                .queues()
                .snapshot(QueueKind::GlobalChat)
                .scroll_offset,
            2
        );
        assert_eq!(
            harness
                .session
                .queues()
                .snapshot(QueueKind::Console)
                .scroll_offset,
            0
        );

        harness.session.virtual_key_callback(VK_NEXT, t0);
        assert_eq!(
            harness
                .session
                .queues()
                .snapshot(QueueKind::GlobalChat)
                .scroll_offset,
            1
        );
    }

    #[test]
    fn printable_keys_append_shifted_translations() {
        let mut harness = harness();
        let t0 = Instant::now();
        open(&mut harness, t0);
        type_str(&mut harness, "Hi", t0);
        harness.key_state.set(|s| s.shift = true);
        harness.session.virtual_key_callback(0x31, t0);
        assert_eq!(harness.session.edit_buffer(), "Hi!");
    }

    #[test]
    fn dead_key_translations_append_both_chars_in_order() {
        let mut harness = harness_with(Box::new(NoopCapture), Box::new(DeadKeyLayout));
        let t0 = Instant::now();
        open(&mut harness, t0);
        harness.session.virtual_key_callback(0x45, t0);
        assert_eq!(harness.session.edit_buffer(), "\u{0301}e");
    }

    #[test]
    fn non_printable_keys_leave_buffer_untouched() {
        let mut harness = harness();
        let t0 = Instant::now();
        open(&mut harness, t0);
        // VK_F5 and a modifier-only key translate to nothing.
        harness.session.virtual_key_callback(0x74, t0);
        harness.session.virtual_key_callback(0x10, t0);
        assert_eq!(harness.session.edit_buffer(), "");
    }

    #[test]
    fn hidden_dispatch_ignores_everything_but_return() {
        let mut harness = harness();
        let t0 = Instant::now();
        harness.session.virtual_key_callback(0x41, t0);
        harness.session.virtual_key_callback(VK_F2, t0);
        harness.session.virtual_key_callback(VK_PRIOR, t0);
        assert!(!harness.session.is_console_shown());
        assert_eq!(harness.session.edit_buffer(), "");
        assert_eq!(harness.session.selected_queue(), QueueKind::Console);
    }

    #[test]
    fn capture_toggles_on_show_and_hide() {
        let acquires = Arc::new(AtomicUsize::new(0));
        let releases = Arc::new(AtomicUsize::new(0));
        let capture = RecordingCapture {
            acquires: Arc::clone(&acquires),
            releases: Arc::clone(&releases),
            fail_acquire: false,
            fail_release: false,
        };
        let mut harness = harness_with(Box::new(capture), Box::new(UsLayout));
        let t0 = Instant::now();
        open(&mut harness, t0);
        assert_eq!(acquires.load(Ordering::SeqCst), 1);
        harness
            .session
            .virtual_key_callback(VK_ESCAPE, t0 + Duration::from_millis(5));
        assert_eq!(releases.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn capture_failures_are_fail_open_and_reported() {
        let capture = RecordingCapture {
            acquires: Arc::new(AtomicUsize::new(0)),
            releases: Arc::new(AtomicUsize::new(0)),
            fail_acquire: true,
            fail_release: true,
        };
        let mut harness = harness_with(Box::new(capture), Box::new(UsLayout));
        let t0 = Instant::now();
        open(&mut harness, t0);

        harness
            .session
            .virtual_key_callback(VK_ESCAPE, t0 + Duration::from_millis(5));
        assert!(!harness.session.is_console_shown());

        let snapshot = harness.session.queues().snapshot(QueueKind::Console);
        let texts: Vec<&str> = snapshot.lines.iter().map(|l| l.text.as_str()).collect();
        assert!(texts.iter().any(|t| t.starts_with("Registering keyboard failed")));
        assert!(texts.iter().any(|t| t.starts_with("Unregistering keyboard failed")));
    }

    #[test]
    fn disconnected_outbound_receiver_does_not_break_submit() {
        let mut harness = harness();
        let t0 = Instant::now();
        drop(std::mem::replace(&mut harness.outbound, {
            let (_tx, rx) = unbounded();
            rx
        }));
        open(&mut harness, t0);
        type_str(&mut harness, "lost", t0);
        harness
            .session
            .virtual_key_callback(VK_RETURN, t0 + Duration::from_millis(500));
        assert!(!harness.session.is_console_shown());
        assert_eq!(harness.session.edit_buffer(), "");
    }
}
