//! Single-choice terminal menu.
//!
//! The prompt is printed once. The option list is then repainted in place
//! after every input event: the cursor moves back up to the first option line
//! and each line is overwritten, so the prompt is never duplicated. The loop
//! blocks on input and only ends on a confirm event.
use std::io::{self, Read, Write};

use crossterm::{
    cursor::{MoveToColumn, MoveUp},
    event::{self, Event, KeyCode, KeyEventKind},
    queue,
    style::{Attribute, Print, SetAttribute},
    terminal::{self, Clear, ClearType},
};
use terminal_size::{Width, terminal_size};
use tracing::debug;

use crate::error::{Result, ScriptKitError};

const ESC: u8 = 0x1b;

/// Options plus the highlighted index, which wraps in both directions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MenuModel {
    options: Vec<String>,
    cursor: usize,
}

impl MenuModel {
    /// Creates a model with the cursor on the first option.
    ///
    /// The list must be non-empty and short enough for the repaint to move
    /// back over it in one cursor motion.
    pub fn new(options: Vec<String>) -> Result<Self> {
        if options.is_empty() {
            return Err(ScriptKitError::InvalidArgument(
                "menu requires at least one option".into(),
            ));
        }
        if u16::try_from(options.len()).is_err() {
            return Err(ScriptKitError::InvalidArgument(format!(
                "menu supports at most {} options, got {}",
                u16::MAX,
                options.len()
            )));
        }
        Ok(Self { options, cursor: 0 })
    }

    /// Index of the highlighted option.
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// All options in display order.
    pub fn options(&self) -> &[String] {
        &self.options
    }

    /// The highlighted option.
    pub fn selected(&self) -> &str {
        &self.options[self.cursor]
    }

    /// Moves up, wrapping from the first option to the last.
    pub fn move_up(&mut self) {
        let len = self.options.len();
        self.cursor = (self.cursor + len - 1) % len;
    }

    /// Moves down, wrapping from the last option to the first.
    pub fn move_down(&mut self) {
        self.cursor = (self.cursor + 1) % self.options.len();
    }
}

/// One decoded input event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuEvent {
    /// Cursor up.
    Up,
    /// Cursor down.
    Down,
    /// Accept the highlighted option.
    Confirm,
    /// Anything else; ignored.
    Other,
}

/// Blocking source of menu events.
pub trait EventSource {
    /// Waits for the next event.
    fn next_event(&mut self) -> io::Result<MenuEvent>;
}

/// Key events read through crossterm. Requires raw mode.
#[derive(Debug, Default)]
pub struct TerminalEvents;

impl EventSource for TerminalEvents {
    fn next_event(&mut self) -> io::Result<MenuEvent> {
        loop {
            let Event::Key(key) = event::read()? else {
                continue;
            };
            if key.kind != KeyEventKind::Press {
                continue;
            }

            return Ok(match key.code {
                KeyCode::Up => MenuEvent::Up,
                KeyCode::Down => MenuEvent::Down,
                KeyCode::Enter => MenuEvent::Confirm,
                _ => MenuEvent::Other,
            });
        }
    }
}

/// Decodes a raw byte stream: `ESC [ A` is up, `ESC [ B` is down, and an
/// empty line (CR or LF) confirms.
#[derive(Debug)]
pub struct ByteEvents<R> {
    reader: R,
}

impl<R: Read> ByteEvents<R> {
    /// Wraps a reader.
    pub fn new(reader: R) -> Self {
        Self { reader }
    }

    fn next_byte(&mut self) -> io::Result<u8> {
        let mut buf = [0u8; 1];
        self.reader.read_exact(&mut buf)?;
        Ok(buf[0])
    }
}

impl<R: Read> EventSource for ByteEvents<R> {
    fn next_event(&mut self) -> io::Result<MenuEvent> {
        Ok(match self.next_byte()? {
            b'\r' | b'\n' => MenuEvent::Confirm,
            ESC => {
                if self.next_byte()? != b'[' {
                    return Ok(MenuEvent::Other);
                }
                match self.next_byte()? {
                    b'A' => MenuEvent::Up,
                    b'B' => MenuEvent::Down,
                    _ => MenuEvent::Other,
                }
            }
            _ => MenuEvent::Other,
        })
    }
}

/// Writes the prompt and repaints the option list in place.
#[derive(Debug)]
pub struct MenuRenderer<W> {
    out: W,
    width: Option<usize>,
    painted: bool,
}

impl<W: Write> MenuRenderer<W> {
    /// Renderer without label truncation.
    pub fn new(out: W) -> Self {
        Self {
            out,
            width: None,
            painted: false,
        }
    }

    /// Truncates labels so each option occupies exactly one terminal line.
    pub fn with_width(mut self, width: Option<usize>) -> Self {
        self.width = width;
        self
    }

    /// Writes the prompt line.
    pub fn prompt(&mut self, prompt: &str) -> io::Result<()> {
        queue!(self.out, Print(prompt), Print("\r\n"))?;
        self.out.flush()
    }

    /// Paints the option list, moving back over the previous paint first.
    pub fn options(&mut self, model: &MenuModel) -> io::Result<()> {
        if self.painted {
            let lines = u16::try_from(model.options().len())
                .map_err(|err| io::Error::new(io::ErrorKind::InvalidInput, err))?;
            queue!(self.out, MoveUp(lines))?;
        }

        for (index, option) in model.options().iter().enumerate() {
            let label = self.fit(option);
            queue!(self.out, MoveToColumn(0), Clear(ClearType::CurrentLine))?;
            if index == model.cursor() {
                queue!(
                    self.out,
                    SetAttribute(Attribute::Reverse),
                    Print("> "),
                    Print(label),
                    SetAttribute(Attribute::Reset)
                )?;
            } else {
                queue!(self.out, Print("  "), Print(label))?;
            }
            queue!(self.out, Print("\r\n"))?;
        }

        self.painted = true;
        self.out.flush()
    }

    fn fit<'a>(&self, label: &'a str) -> std::borrow::Cow<'a, str> {
        let Some(width) = self.width else {
            return label.into();
        };
        // two columns for the marker, one so the line never wraps
        let room = width.saturating_sub(3).max(1);
        if label.chars().count() <= room {
            label.into()
        } else {
            label.chars().take(room).collect::<String>().into()
        }
    }

    /// Consumes the renderer and returns the sink.
    pub fn into_inner(self) -> W {
        self.out
    }
}

/// Enables raw terminal input for its lifetime.
#[derive(Debug)]
pub struct RawModeGuard {
    _private: (),
}

impl RawModeGuard {
    /// Switches the terminal into raw mode.
    pub fn acquire() -> io::Result<Self> {
        terminal::enable_raw_mode()?;
        Ok(Self { _private: () })
    }
}

impl Drop for RawModeGuard {
    fn drop(&mut self) {
        if let Err(err) = terminal::disable_raw_mode() {
            debug!("failed to restore terminal mode: {err}");
        }
    }
}

/// Drives the selection loop over any event source and renderer.
pub fn run_selection<E, W>(
    prompt: &str,
    options: &[String],
    events: &mut E,
    renderer: &mut MenuRenderer<W>,
) -> Result<String>
where
    E: EventSource + ?Sized,
    W: Write,
{
    let mut model = MenuModel::new(options.to_vec())?;
    renderer.prompt(prompt)?;

    loop {
        renderer.options(&model)?;
        let event = events.next_event()?;
        debug!(cursor = model.cursor(), ?event, "menu input");
        match event {
            MenuEvent::Up => model.move_up(),
            MenuEvent::Down => model.move_down(),
            MenuEvent::Confirm => return Ok(model.selected().to_string()),
            MenuEvent::Other => {}
        }
    }
}

/// Interactive selection on the controlling terminal, rendering to stdout.
pub fn select(prompt: &str, options: &[String]) -> Result<String> {
    select_to(prompt, options, io::stdout())
}

/// Interactive selection rendering to `out`, e.g. stderr when stdout is
/// captured by the caller.
pub fn select_to<W: Write>(prompt: &str, options: &[String], out: W) -> Result<String> {
    // reject bad option lists before touching the terminal mode
    MenuModel::new(options.to_vec())?;

    let width = terminal_size().map(|(Width(width), _)| width as usize);
    let mut renderer = MenuRenderer::new(out).with_width(width);
    let _raw = RawModeGuard::acquire()?;
    run_selection(prompt, options, &mut TerminalEvents, &mut renderer)
}
