//! Terminal backend trait + crossterm implementation.
//!
//! The render and event paths depend on this trait, not on crossterm
//! directly, so tests run against a mock and the backend stays swappable.
//! Output crosses the boundary as opaque pre-encoded byte batches; the
//! backend never interprets them.

use std::io::Write;
use std::time::Duration;

use crate::types::{key, modifier, InputEvent, PointerEvent, PointerKind};

// ============================================================================
// Backend Trait
// ============================================================================

pub trait Backend {
    fn init(&mut self) -> std::io::Result<()>;
    fn shutdown(&mut self) -> std::io::Result<()>;
    fn size(&self) -> (u16, u16);
    fn write(&mut self, bytes: &[u8]) -> std::io::Result<()>;
    fn flush(&mut self) -> std::io::Result<()>;
    fn read_events(&mut self, timeout: Duration) -> Vec<InputEvent>;

    /// Downcast support for test code.
    #[cfg(test)]
    fn as_any_mut(&mut self) -> &mut dyn std::any::Any;
}

// ============================================================================
// CrosstermBackend
// ============================================================================

pub struct CrosstermBackend {
    width: u16,
    height: u16,
}

impl CrosstermBackend {
    pub fn new() -> Self {
        let (w, h) = crossterm::terminal::size().unwrap_or((80, 24));
        Self {
            width: w,
            height: h,
        }
    }
}

impl Default for CrosstermBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl Backend for CrosstermBackend {
    fn init(&mut self) -> std::io::Result<()> {
        use crossterm::{
            cursor,
            event::EnableMouseCapture,
            terminal::{enable_raw_mode, EnterAlternateScreen},
            ExecutableCommand,
        };

        enable_raw_mode()?;
        let mut stdout = std::io::stdout();
        stdout.execute(EnterAlternateScreen)?;
        stdout.execute(EnableMouseCapture)?;
        // The OS cursor would land on the last written cell after every
        // batch; hide it for the whole session.
        stdout.execute(cursor::Hide)?;

        let (w, h) = crossterm::terminal::size().unwrap_or((80, 24));
        self.width = w;
        self.height = h;
        Ok(())
    }

    fn shutdown(&mut self) -> std::io::Result<()> {
        use crossterm::{
            cursor,
            event::DisableMouseCapture,
            terminal::{disable_raw_mode, LeaveAlternateScreen},
            ExecutableCommand,
        };

        let mut stdout = std::io::stdout();
        stdout.execute(cursor::Show)?;
        stdout.execute(DisableMouseCapture)?;
        stdout.execute(LeaveAlternateScreen)?;
        disable_raw_mode()?;
        Ok(())
    }

    fn size(&self) -> (u16, u16) {
        crossterm::terminal::size().unwrap_or((self.width, self.height))
    }

    fn write(&mut self, bytes: &[u8]) -> std::io::Result<()> {
        std::io::stdout().write_all(bytes)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        std::io::stdout().flush()
    }

    fn read_events(&mut self, timeout: Duration) -> Vec<InputEvent> {
        use crossterm::event::{self, Event, KeyCode, KeyEventKind, MouseEventKind};

        let mut events = Vec::new();

        if event::poll(timeout).unwrap_or(false) {
            while event::poll(Duration::ZERO).unwrap_or(false) {
                match event::read() {
                    Ok(Event::Key(key_event)) => {
                        if key_event.kind != KeyEventKind::Press {
                            continue;
                        }

                        let mut mods: u32 = 0;
                        if key_event
                            .modifiers
                            .contains(crossterm::event::KeyModifiers::SHIFT)
                        {
                            mods |= modifier::SHIFT;
                        }
                        if key_event
                            .modifiers
                            .contains(crossterm::event::KeyModifiers::CONTROL)
                        {
                            mods |= modifier::CTRL;
                        }
                        if key_event
                            .modifiers
                            .contains(crossterm::event::KeyModifiers::ALT)
                        {
                            mods |= modifier::ALT;
                        }

                        let (code, ch) = match key_event.code {
                            KeyCode::Char(c) => (c as u32, c),
                            KeyCode::Backspace => (key::BACKSPACE, '\0'),
                            KeyCode::Enter => (key::ENTER, '\0'),
                            KeyCode::Left => (key::LEFT, '\0'),
                            KeyCode::Right => (key::RIGHT, '\0'),
                            KeyCode::Up => (key::UP, '\0'),
                            KeyCode::Down => (key::DOWN, '\0'),
                            KeyCode::Tab => (key::TAB, '\0'),
                            KeyCode::Esc => (key::ESCAPE, '\0'),
                            _ => continue,
                        };

                        events.push(InputEvent::Key {
                            code,
                            modifiers: mods,
                            character: ch,
                        });
                    }
                    Ok(Event::Mouse(mouse)) => {
                        let (x, y) = (mouse.column, mouse.row);
                        let mut push = |kind| {
                            events.push(InputEvent::Pointer(PointerEvent { kind, x, y }))
                        };
                        match mouse.kind {
                            MouseEventKind::Down(_) => push(PointerKind::MouseDown),
                            MouseEventKind::Up(_) => {
                                // A release is also a click at that cell.
                                push(PointerKind::MouseUp);
                                push(PointerKind::Click);
                            }
                            MouseEventKind::Moved | MouseEventKind::Drag(_) => {
                                push(PointerKind::Move)
                            }
                            MouseEventKind::ScrollUp => push(PointerKind::ScrollUp),
                            MouseEventKind::ScrollDown => push(PointerKind::ScrollDown),
                            _ => continue,
                        }
                    }
                    Ok(Event::Resize(w, h)) => {
                        self.width = w;
                        self.height = h;
                        events.push(InputEvent::Resize {
                            width: w,
                            height: h,
                        });
                    }
                    _ => break,
                }
            }
        }

        events
    }

    #[cfg(test)]
    fn as_any_mut(&mut self) -> &mut dyn std::any::Any {
        self
    }
}

// ============================================================================
// MockBackend (unit tests only)
// ============================================================================

#[cfg(test)]
pub struct MockBackend {
    pub width: u16,
    pub height: u16,
    pub written: Vec<u8>,
    pub write_calls: usize,
    pub flushes: usize,
    pub injected_events: Vec<InputEvent>,
    /// When set, write() fails, simulating a closed or blocked sink.
    pub fail_writes: bool,
}

#[cfg(test)]
impl MockBackend {
    pub fn new(width: u16, height: u16) -> Self {
        Self {
            width,
            height,
            written: Vec::new(),
            write_calls: 0,
            flushes: 0,
            injected_events: Vec::new(),
            fail_writes: false,
        }
    }
}

#[cfg(test)]
impl Backend for MockBackend {
    fn init(&mut self) -> std::io::Result<()> {
        Ok(())
    }

    fn shutdown(&mut self) -> std::io::Result<()> {
        Ok(())
    }

    fn size(&self) -> (u16, u16) {
        (self.width, self.height)
    }

    fn write(&mut self, bytes: &[u8]) -> std::io::Result<()> {
        if self.fail_writes {
            return Err(std::io::Error::other("sink closed"));
        }
        self.write_calls += 1;
        self.written.extend_from_slice(bytes);
        Ok(())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.flushes += 1;
        Ok(())
    }

    fn read_events(&mut self, _timeout: Duration) -> Vec<InputEvent> {
        std::mem::take(&mut self.injected_events)
    }

    fn as_any_mut(&mut self) -> &mut dyn std::any::Any {
        self
    }
}
