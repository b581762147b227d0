//! Root object tying the pipeline together.
//!
//! A `Reef` owns one element tree, one scheduler, one output writer, and
//! one backend. There is no shared or global state: applications hold the
//! `Reef` they constructed and thread it explicitly, and two roots on the
//! same process never interfere.
//!
//! Mutations never draw. They update the tree, mark dirt, and ask the
//! scheduler for a render; the host drives `tick`/`pump` and the scheduler
//! decides when a frame actually happens.

use std::time::{Duration, Instant};

use crate::compose;
use crate::error::ReefError;
use crate::events;
use crate::grid::Frame;
use crate::layout;
use crate::scheduler::RenderScheduler;
use crate::style::{self, StyleOutcome};
use crate::terminal::Backend;
use crate::tree::Tree;
use crate::types::{InputEvent, NodeKind, PointerEvent, PointerHandler, PointerKind};
use crate::writer::{OutputWriter, WriteStrategy};

/// Construction-time options. The write strategy is fixed for the life of
/// the root.
#[derive(Debug, Clone, Copy)]
pub struct ReefConfig {
    pub debounce: Duration,
    pub strategy: WriteStrategy,
    pub debug: bool,
}

impl Default for ReefConfig {
    fn default() -> Self {
        Self {
            debounce: Duration::from_millis(16),
            strategy: WriteStrategy::Precise,
            debug: false,
        }
    }
}

pub struct Reef {
    tree: Tree,
    scheduler: RenderScheduler,
    writer: OutputWriter,
    backend: Box<dyn Backend>,
    log_buffer: String,
    debug: bool,
    perf_layout_us: u64,
    perf_compose_us: u64,
    perf_write_us: u64,
}

impl Reef {
    pub fn new(mut backend: Box<dyn Backend>, config: ReefConfig) -> Result<Self, ReefError> {
        backend.init()?;
        Ok(Self {
            tree: Tree::new(),
            scheduler: RenderScheduler::new(config.debounce),
            writer: OutputWriter::new(config.strategy),
            backend,
            log_buffer: String::new(),
            debug: config.debug,
            perf_layout_us: 0,
            perf_compose_us: 0,
            perf_write_us: 0,
        })
    }

    // ------------------------------------------------------------------
    // Tree surface
    // ------------------------------------------------------------------

    pub fn create_node(&mut self, kind: NodeKind) -> Result<u32, ReefError> {
        match self.tree.create_node(kind) {
            Ok(h) => Ok(h),
            Err(e) => Err(self.fail(e)),
        }
    }

    pub fn set_root(&mut self, handle: u32) -> Result<(), ReefError> {
        let r = self.tree.set_root(handle);
        self.after_mutation(r)
    }

    pub fn append_child(&mut self, parent: u32, child: u32) -> Result<(), ReefError> {
        let r = self.tree.append_child(parent, child);
        self.after_mutation(r)
    }

    pub fn remove_child(&mut self, parent: u32, child: u32) -> Result<(), ReefError> {
        let r = self.tree.remove_child(parent, child);
        self.after_mutation(r)
    }

    pub fn destroy_node(&mut self, handle: u32) -> Result<(), ReefError> {
        let r = self.tree.destroy_node(handle);
        self.after_mutation(r)
    }

    /// Write one style property. Unknown names and unparseable values are
    /// dropped (logged in debug mode); equal values schedule nothing.
    pub fn set_style(&mut self, handle: u32, name: &str, value: &str) -> Result<(), ReefError> {
        let node = match self.tree.get_mut(handle) {
            Ok(n) => n,
            Err(e) => return Err(self.fail(e)),
        };
        match style::apply_style(node, name, value) {
            StyleOutcome::Ignored => {
                self.debug_log(&format!("dropped style write {name}={value}"));
                Ok(())
            }
            StyleOutcome::Unchanged => Ok(()),
            StyleOutcome::Changed { .. } => {
                self.tree.mark_dirty(handle)?;
                self.scheduler.request();
                Ok(())
            }
        }
    }

    pub fn set_text(&mut self, handle: u32, text: &str) -> Result<(), ReefError> {
        match self.tree.set_text(handle, text) {
            Ok(true) => {
                self.scheduler.request();
                Ok(())
            }
            Ok(false) => Ok(()),
            Err(e) => Err(self.fail(e)),
        }
    }

    pub fn on(
        &mut self,
        handle: u32,
        kind: PointerKind,
        handler: PointerHandler,
    ) -> Result<(), ReefError> {
        match self.tree.on(handle, kind, handler) {
            Ok(()) => Ok(()),
            Err(e) => Err(self.fail(e)),
        }
    }

    /// Queue side-channel text. It rides ahead of the next refresh-mode
    /// frame; the precise writer has no scrollback to put it in and drops
    /// it at emit time.
    pub fn log(&mut self, text: &str) {
        self.log_buffer.push_str(text);
        if !text.ends_with('\n') {
            self.log_buffer.push('\n');
        }
        self.scheduler.request();
    }

    // ------------------------------------------------------------------
    // Scheduling surface
    // ------------------------------------------------------------------

    /// Drive the scheduler once: render if a tick is due or a cooldown has
    /// elapsed with changes pending. Returns whether a frame was written.
    pub fn tick_at(&mut self, now: Instant) -> Result<bool, ReefError> {
        if self.scheduler.take_tick(now) || self.scheduler.poll(now) {
            if self.render_pass()? {
                self.scheduler.mark_rendered(now);
                return Ok(true);
            }
            // Aborted pass: the mutation is still outstanding, so re-arm
            // the scheduler and retry on the next tick.
            self.scheduler.request();
        }
        Ok(false)
    }

    pub fn tick(&mut self) -> Result<bool, ReefError> {
        self.tick_at(Instant::now())
    }

    /// When the host must next call tick() even without new input.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.scheduler.next_deadline()
    }

    /// Read backend input, route pointer events, fold resizes back into
    /// the scheduler, and return key events to the caller. Drives one tick
    /// afterwards.
    pub fn pump(&mut self, timeout: Duration) -> Result<Vec<InputEvent>, ReefError> {
        let events = self.backend.read_events(timeout);
        let mut unhandled = Vec::new();
        for ev in events {
            match ev {
                InputEvent::Pointer(p) => {
                    self.dispatch(&p);
                }
                InputEvent::Resize { .. } => {
                    // Old screen content is unreliable after a resize.
                    self.writer.reset();
                    if let Some(root) = self.tree.root() {
                        self.tree.mark_dirty(root)?;
                    }
                    self.scheduler.request();
                }
                other => unhandled.push(other),
            }
        }
        self.tick()?;
        Ok(unhandled)
    }

    /// Route a pointer event through the tree. Returns the number of
    /// handlers that ran.
    pub fn dispatch(&mut self, event: &PointerEvent) -> usize {
        events::dispatch(&self.tree, event)
    }

    /// Render unconditionally, bypassing the debounce. The scheduler still
    /// learns about the frame so the cooldown stays honest.
    pub fn render_now(&mut self) -> Result<(), ReefError> {
        if self.render_pass()? {
            self.scheduler.mark_rendered(Instant::now());
        } else {
            self.scheduler.request();
        }
        Ok(())
    }

    /// Restore the host terminal. Safe to call more than once.
    pub fn teardown(&mut self) -> Result<(), ReefError> {
        self.backend.shutdown()?;
        Ok(())
    }

    // ------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------

    /// Run one full render pass. Returns false when the pass aborted
    /// (failed solve or failed write) and the frame is still owed.
    fn render_pass(&mut self) -> Result<bool, ReefError> {
        if self.tree.root().is_none() {
            return Ok(true);
        }
        let (w, h) = self.backend.size();

        let start = Instant::now();
        // A failed solve aborts this pass only; the tree stays dirty and
        // the next tick retries.
        if let Err(e) = layout::solve(&mut self.tree, w, h) {
            self.debug_log(&format!("render pass aborted: {e}"));
            return Ok(false);
        }
        self.perf_layout_us = start.elapsed().as_micros() as u64;

        let start = Instant::now();
        let grid = compose::compose(&self.tree, w, h);
        self.perf_compose_us = start.elapsed().as_micros() as u64;

        let mut frame = Frame::new(grid);
        frame.side_text = std::mem::take(&mut self.log_buffer);

        let start = Instant::now();
        let bytes = self.writer.emit(&frame);
        if !bytes.is_empty() {
            if let Err(e) = self.backend.write(&bytes).and_then(|_| self.backend.flush()) {
                self.debug_log(&format!("write failed: {e}"));
                // Force a clean repaint once the sink recovers.
                self.writer.reset();
                return Ok(false);
            }
        }
        self.perf_write_us = start.elapsed().as_micros() as u64;

        self.tree.clear_dirty();
        self.debug_log(&format!(
            "frame: layout {}us, compose {}us, write {}us, {} bytes",
            self.perf_layout_us,
            self.perf_compose_us,
            self.perf_write_us,
            bytes.len()
        ));
        Ok(true)
    }

    /// Tree-structure failures poison the root: restore the terminal
    /// before handing the error up.
    fn fail(&mut self, e: ReefError) -> ReefError {
        if e.is_fatal() {
            let _ = self.backend.shutdown();
        }
        e
    }

    fn after_mutation(&mut self, r: Result<(), ReefError>) -> Result<(), ReefError> {
        match r {
            Ok(()) => {
                self.scheduler.request();
                Ok(())
            }
            Err(e) => Err(self.fail(e)),
        }
    }

    fn debug_log(&self, msg: &str) {
        if self.debug {
            eprintln!("[reef-tui] {msg}");
        }
    }

    #[cfg(test)]
    pub(crate) fn backend_any(&mut self) -> &mut dyn std::any::Any {
        self.backend.as_any_mut()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::terminal::MockBackend;
    use crate::types::{EventFlow, Rect};
    use std::cell::RefCell;
    use std::rc::Rc;

    const DEBOUNCE: Duration = Duration::from_millis(16);

    fn test_reef(width: u16, height: u16, strategy: WriteStrategy) -> Reef {
        Reef::new(
            Box::new(MockBackend::new(width, height)),
            ReefConfig {
                strategy,
                ..Default::default()
            },
        )
        .unwrap()
    }

    fn mock(reef: &mut Reef) -> &mut MockBackend {
        reef.backend_any().downcast_mut::<MockBackend>().unwrap()
    }

    fn simple_root(reef: &mut Reef) -> u32 {
        let root = reef.create_node(NodeKind::Text).unwrap();
        reef.set_style(root, "width", "100%").unwrap();
        reef.set_style(root, "height", "100%").unwrap();
        reef.set_root(root).unwrap();
        root
    }

    #[test]
    fn test_mutations_do_not_draw_until_tick() {
        let mut reef = test_reef(10, 2, WriteStrategy::Precise);
        let root = simple_root(&mut reef);
        reef.set_text(root, "hello").unwrap();
        assert!(mock(&mut reef).written.is_empty());
        assert!(reef.tick().unwrap());
        assert!(!mock(&mut reef).written.is_empty());
    }

    #[test]
    fn test_burst_of_mutations_renders_once() {
        let mut reef = test_reef(10, 2, WriteStrategy::Precise);
        let root = simple_root(&mut reef);
        for i in 0..50 {
            reef.set_text(root, &format!("v{i}")).unwrap();
        }
        let t0 = Instant::now();
        assert!(reef.tick_at(t0).unwrap());
        let writes = mock(&mut reef).write_calls;
        assert_eq!(writes, 1);
        // Nothing further pending.
        assert!(!reef.tick_at(t0 + Duration::from_millis(1)).unwrap());
    }

    #[test]
    fn test_identical_frame_writes_zero_bytes() {
        let mut reef = test_reef(10, 2, WriteStrategy::Precise);
        let root = simple_root(&mut reef);
        reef.set_text(root, "stable").unwrap();
        let t0 = Instant::now();
        assert!(reef.tick_at(t0).unwrap());
        let baseline_calls = mock(&mut reef).write_calls;

        // Change away and back between frames; the composed grid matches
        // the baseline, so the writer emits nothing and the backend sees
        // no new write.
        reef.set_text(root, "other").unwrap();
        reef.set_text(root, "stable").unwrap();
        assert!(reef.tick_at(t0 + DEBOUNCE * 2).unwrap());
        assert_eq!(mock(&mut reef).write_calls, baseline_calls);
    }

    #[test]
    fn test_debounce_floor_between_frames() {
        let mut reef = test_reef(10, 2, WriteStrategy::Precise);
        let root = simple_root(&mut reef);
        reef.set_text(root, "one").unwrap();
        let t0 = Instant::now();
        assert!(reef.tick_at(t0).unwrap());

        reef.set_text(root, "two").unwrap();
        // Inside the cooldown nothing renders.
        assert!(!reef.tick_at(t0 + Duration::from_millis(5)).unwrap());
        assert!(!reef.tick_at(t0 + Duration::from_millis(15)).unwrap());
        // The trailing edge carries the final state out.
        assert!(reef.tick_at(t0 + DEBOUNCE).unwrap());
        let s = String::from_utf8(mock(&mut reef).written.clone()).unwrap();
        assert!(s.contains("two"));
    }

    #[test]
    fn test_unchanged_style_schedules_nothing() {
        let mut reef = test_reef(10, 2, WriteStrategy::Precise);
        let root = simple_root(&mut reef);
        reef.set_text(root, "x").unwrap();
        let t0 = Instant::now();
        reef.tick_at(t0).unwrap();

        reef.set_style(root, "color", "red").unwrap();
        reef.tick_at(t0 + DEBOUNCE).unwrap();
        // Same value again: no request, no render.
        reef.set_style(root, "color", "red").unwrap();
        assert!(!reef.tick_at(t0 + DEBOUNCE * 3).unwrap());
    }

    #[test]
    fn test_fatal_tree_error_propagates() {
        let mut reef = test_reef(10, 2, WriteStrategy::Precise);
        let text = reef.create_node(NodeKind::Text).unwrap();
        let child = reef.create_node(NodeKind::Box).unwrap();
        let err = reef.append_child(text, child).unwrap_err();
        assert!(err.is_fatal());
    }

    #[test]
    fn test_pointer_events_route_through_pump() {
        let mut reef = test_reef(10, 2, WriteStrategy::Precise);
        let root = simple_root(&mut reef);
        let hits = Rc::new(RefCell::new(0));
        let hits2 = Rc::clone(&hits);
        reef.on(
            root,
            PointerKind::Click,
            Rc::new(RefCell::new(move |_: &PointerEvent| {
                *hits2.borrow_mut() += 1;
                EventFlow::Stop
            })),
        )
        .unwrap();
        reef.render_now().unwrap();

        mock(&mut reef)
            .injected_events
            .push(InputEvent::Pointer(PointerEvent {
                kind: PointerKind::Click,
                x: 1,
                y: 0,
            }));
        reef.pump(Duration::ZERO).unwrap();
        assert_eq!(*hits.borrow(), 1);
    }

    #[test]
    fn test_key_events_pass_through_pump() {
        let mut reef = test_reef(10, 2, WriteStrategy::Precise);
        simple_root(&mut reef);
        mock(&mut reef).injected_events.push(InputEvent::Key {
            code: 'q' as u32,
            modifiers: 0,
            character: 'q',
        });
        let keys = reef.pump(Duration::ZERO).unwrap();
        assert_eq!(keys.len(), 1);
    }

    #[test]
    fn test_resize_forces_full_repaint() {
        // Zero debounce keeps the pump's internal tick clock-independent.
        let mut reef = Reef::new(
            Box::new(MockBackend::new(10, 2)),
            ReefConfig {
                debounce: Duration::ZERO,
                ..Default::default()
            },
        )
        .unwrap();
        let root = simple_root(&mut reef);
        reef.set_text(root, "hi").unwrap();
        reef.render_now().unwrap();
        mock(&mut reef).written.clear();

        let m = mock(&mut reef);
        m.width = 12;
        m.injected_events.push(InputEvent::Resize {
            width: 12,
            height: 2,
        });
        reef.pump(Duration::ZERO).unwrap();
        let s = String::from_utf8(mock(&mut reef).written.clone()).unwrap();
        // Full repaint addresses row 1 from column 1.
        assert!(s.contains("\x1b[1;1H"));
        assert!(s.contains("hi"));
    }

    #[test]
    fn test_failed_write_retries_on_next_tick() {
        let mut reef = test_reef(10, 2, WriteStrategy::Precise);
        let root = simple_root(&mut reef);
        reef.set_text(root, "hold").unwrap();
        mock(&mut reef).fail_writes = true;

        let t0 = Instant::now();
        // The write fails; the pass aborts without claiming the frame.
        assert!(!reef.tick_at(t0).unwrap());
        assert!(mock(&mut reef).written.is_empty());

        // Once the sink recovers, the pending state goes out untouched.
        mock(&mut reef).fail_writes = false;
        assert!(reef.tick_at(t0 + Duration::from_millis(1)).unwrap());
        let s = String::from_utf8(mock(&mut reef).written.clone()).unwrap();
        assert!(s.contains("hold"));
    }

    #[test]
    fn test_refresh_mode_carries_log_text() {
        let mut reef = test_reef(10, 2, WriteStrategy::Refresh);
        let root = simple_root(&mut reef);
        reef.set_text(root, "frame").unwrap();
        reef.render_now().unwrap();

        reef.log("note");
        reef.render_now().unwrap();
        let s = String::from_utf8(mock(&mut reef).written.clone()).unwrap();
        assert!(s.contains("note\r\n"));
    }

    #[test]
    fn test_two_roots_are_independent() {
        let mut a = test_reef(10, 2, WriteStrategy::Precise);
        let mut b = test_reef(10, 2, WriteStrategy::Precise);
        let ra = simple_root(&mut a);
        simple_root(&mut b);
        a.set_text(ra, "only a").unwrap();
        a.tick().unwrap();
        b.tick().unwrap();
        assert!(!mock(&mut a).written.is_empty());
        // b never saw a's mutation; its first frame is the blank root.
        let sb = String::from_utf8(mock(&mut b).written.clone()).unwrap();
        assert!(!sb.contains("only a"));
    }

    #[test]
    fn test_render_without_root_is_a_noop() {
        let mut reef = test_reef(10, 2, WriteStrategy::Precise);
        reef.render_now().unwrap();
        assert!(mock(&mut reef).written.is_empty());
    }

    #[test]
    fn test_handle_zero_rejected_everywhere() {
        let mut reef = test_reef(10, 2, WriteStrategy::Precise);
        assert!(matches!(
            reef.set_style(0, "width", "1"),
            Err(ReefError::InvalidHandle(0))
        ));
        assert!(matches!(
            reef.set_root(0),
            Err(ReefError::InvalidHandle(0))
        ));
    }

    #[test]
    fn test_rect_after_layout_matches_terminal() {
        let mut reef = test_reef(20, 5, WriteStrategy::Precise);
        let root = simple_root(&mut reef);
        reef.render_now().unwrap();
        assert_eq!(
            reef.tree.get(root).unwrap().screen_rect,
            Rect::new(0, 0, 20, 5)
        );
    }
}
