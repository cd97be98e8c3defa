//! Terminal seam for the line editor
//!
//! The editor only talks to a `Terminal`: raw mode on and off, one key at a
//! time, and whole-frame redraws of the prompt region. `CrosstermTerminal`
//! drives the real tty; `MockTerminal` replays a script so prompt cycles can
//! be tested without one.
//!
//! The prompt region is drawn inline (no alternate screen). R's output is
//! printed between reads, outside raw mode, and scrolls up normally. Output
//! that arrives while a prompt is up (R event handlers run from the inputhook)
//! is queued in `PendingOutput` and printed above the prompt, which is then
//! redrawn.

use crossterm::cursor::{MoveTo, MoveToColumn, MoveUp};
use crossterm::event::{Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::style::{Attribute, Color, Print, PrintStyledContent, Stylize};
use crossterm::terminal::{Clear, ClearType};
use crossterm::QueueableCommand;
use rhost_runtime::{InputReadiness, OutputType};
use std::cell::RefCell;
use std::collections::VecDeque;
use std::io::{self, Write};
use std::rc::Rc;
use std::time::Duration;

/// Width used when the terminal cannot report one
const FALLBACK_WIDTH: usize = 80;

#[derive(Debug, thiserror::Error)]
pub enum TerminalError {
    #[error("terminal I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("terminal input closed")]
    InputClosed,
}

/// Output queued while a prompt cycle holds the terminal
///
/// Clones share the queue: the printer pushes, the editor drains.
#[derive(Debug, Clone, Default)]
pub struct PendingOutput {
    queue: Rc<RefCell<VecDeque<(String, OutputType)>>>,
}

impl PendingOutput {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, text: &str, stream: OutputType) {
        self.queue.borrow_mut().push_back((text.to_string(), stream));
    }

    pub fn is_empty(&self) -> bool {
        self.queue.borrow().is_empty()
    }

    /// Everything queued so far, oldest first
    pub fn drain(&self) -> Vec<(String, OutputType)> {
        self.queue.borrow_mut().drain(..).collect()
    }
}

/// `text` with bare `\n` turned into `\r\n`, ending at the start of a line
///
/// Raw mode turns off the tty's own newline translation.
pub fn raw_mode_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 8);
    let mut previous = None;
    for c in text.chars() {
        if c == '\n' && previous != Some('\r') {
            out.push('\r');
        }
        out.push(c);
        previous = Some(c);
    }
    if !out.is_empty() && !out.ends_with('\n') {
        out.push_str("\r\n");
    }
    out
}

/// Everything needed to draw the prompt region once
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub prompt: String,
    pub prompt_color: Option<Color>,
    /// Buffer contents, one entry per logical line
    pub lines: Vec<String>,
    /// (line, column) in chars
    pub cursor: (usize, usize),
    pub status: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Row {
    pub text: String,
    /// Leading chars drawn in the prompt color
    pub prompt_chars: usize,
    pub dim: bool,
}

/// A frame cut into screen rows
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Layout {
    pub rows: Vec<Row>,
    /// (row, column) of the cursor within `rows`
    pub cursor: (usize, usize),
}

/// Lay `frame` out for a terminal `width` columns wide
///
/// Continuation lines are indented to the prompt's width. Long lines wrap
/// explicitly so the renderer always knows how many rows it drew.
pub fn layout(frame: &Frame, width: usize) -> Layout {
    let width = width.max(1);
    let prompt_width = frame.prompt.chars().count();
    let indent = " ".repeat(prompt_width);
    let mut rows = Vec::new();
    let mut cursor = (0, 0);

    let empty = [String::new()];
    let lines: &[String] = if frame.lines.is_empty() {
        &empty
    } else {
        &frame.lines
    };

    for (index, line) in lines.iter().enumerate() {
        let prefix = if index == 0 { &frame.prompt } else { &indent };
        let chars: Vec<char> = prefix.chars().chain(line.chars()).collect();
        let first_row = rows.len();

        let mut start = 0;
        loop {
            let end = (start + width).min(chars.len());
            rows.push(Row {
                text: chars[start..end].iter().collect(),
                prompt_chars: if index == 0 && start == 0 {
                    prompt_width.min(end)
                } else {
                    0
                },
                dim: false,
            });
            start = end;
            if start >= chars.len() {
                break;
            }
        }

        if index == frame.cursor.0 {
            let column = prompt_width + frame.cursor.1;
            cursor = (first_row + column / width, column % width);
            // Cursor just past a full row sits at the start of a fresh one.
            while cursor.0 >= rows.len() {
                rows.push(Row {
                    text: String::new(),
                    prompt_chars: 0,
                    dim: false,
                });
            }
        }
    }

    if let Some(status) = &frame.status {
        rows.push(Row {
            text: status.chars().take(width).collect(),
            prompt_chars: 0,
            dim: true,
        });
    }

    Layout { rows, cursor }
}

/// What the line editor needs from a terminal
pub trait Terminal: InputReadiness {
    /// Enter raw mode for one prompt cycle
    fn begin(&mut self) -> Result<(), TerminalError>;

    /// Leave raw mode
    fn end(&mut self) -> Result<(), TerminalError>;

    /// Next key press; `None` for events the editor should only redraw on
    fn read_key(&mut self) -> Result<Option<KeyEvent>, TerminalError>;

    /// Redraw the prompt region
    fn render(&mut self, frame: &Frame) -> Result<(), TerminalError>;

    /// Draw the final state of the region and move below it
    fn finish(&mut self, frame: &Frame) -> Result<(), TerminalError>;

    /// Ctrl-L; the next `render` draws at the top
    fn clear_screen(&mut self) -> Result<(), TerminalError>;

    /// Text printed by R
    fn write_output(&mut self, text: &str, stream: OutputType) -> io::Result<()>;

    /// Text printed by R while `frame` is on screen: print it above the
    /// prompt region, then redraw the region below it
    fn interleave_output(&mut self, text: &str, stream: OutputType, frame: &Frame)
    -> io::Result<()>;

    /// Ctrl-Z: give the terminal back, stop the process, retake raw mode on
    /// resume. The next `render` redraws from scratch.
    fn suspend(&mut self) -> Result<(), TerminalError>;
}

/// The real terminal on stdin/stdout
#[derive(Debug, Default)]
pub struct CrosstermTerminal {
    raw: bool,
    /// Row of the cursor inside the last drawn region
    cursor_row: usize,
}

impl CrosstermTerminal {
    pub fn new() -> Self {
        Self::default()
    }

    fn width() -> usize {
        match crossterm::terminal::size() {
            Ok((columns, _)) if columns > 0 => usize::from(columns),
            _ => FALLBACK_WIDTH,
        }
    }

    fn draw(&mut self, frame: &Frame) -> Result<Layout, TerminalError> {
        let layout = layout(frame, Self::width());
        let mut out = io::stdout().lock();

        out.queue(MoveToColumn(0))?;
        if self.cursor_row > 0 {
            out.queue(MoveUp(to_u16(self.cursor_row)))?;
        }
        out.queue(Clear(ClearType::FromCursorDown))?;

        for (index, row) in layout.rows.iter().enumerate() {
            if index > 0 {
                out.queue(Print("\r\n"))?;
            }
            let split = row
                .text
                .char_indices()
                .nth(row.prompt_chars)
                .map_or(row.text.len(), |(at, _)| at);
            let (prompt, rest) = row.text.split_at(split);
            if !prompt.is_empty() {
                let styled = match frame.prompt_color {
                    Some(color) => prompt.with(color).attribute(Attribute::Bold),
                    None => prompt.stylize(),
                };
                out.queue(PrintStyledContent(styled))?;
            }
            if row.dim {
                out.queue(PrintStyledContent(rest.attribute(Attribute::Dim)))?;
            } else {
                out.queue(Print(rest))?;
            }
        }

        let last = layout.rows.len().saturating_sub(1);
        let up = last.saturating_sub(layout.cursor.0);
        if up > 0 {
            out.queue(MoveUp(to_u16(up)))?;
        }
        out.queue(MoveToColumn(to_u16(layout.cursor.1)))?;
        out.flush()?;

        self.cursor_row = layout.cursor.0;
        Ok(layout)
    }
}

fn to_u16(value: usize) -> u16 {
    u16::try_from(value).unwrap_or(u16::MAX)
}

impl InputReadiness for CrosstermTerminal {
    fn input_ready(&mut self) -> io::Result<bool> {
        crossterm::event::poll(Duration::ZERO)
    }
}

impl Terminal for CrosstermTerminal {
    fn begin(&mut self) -> Result<(), TerminalError> {
        crossterm::terminal::enable_raw_mode()?;
        self.raw = true;
        self.cursor_row = 0;
        Ok(())
    }

    fn end(&mut self) -> Result<(), TerminalError> {
        if self.raw {
            crossterm::terminal::disable_raw_mode()?;
            self.raw = false;
        }
        Ok(())
    }

    fn read_key(&mut self) -> Result<Option<KeyEvent>, TerminalError> {
        match crossterm::event::read()? {
            Event::Key(key) if key.kind != KeyEventKind::Release => Ok(Some(key)),
            _ => Ok(None),
        }
    }

    fn render(&mut self, frame: &Frame) -> Result<(), TerminalError> {
        self.draw(frame).map(|_| ())
    }

    fn finish(&mut self, frame: &Frame) -> Result<(), TerminalError> {
        let layout = self.draw(frame)?;
        let below = layout.rows.len().saturating_sub(1).saturating_sub(layout.cursor.0);
        let mut out = io::stdout().lock();
        // Past the last row, then onto a fresh line for R's output.
        for _ in 0..=below {
            out.queue(Print("\r\n"))?;
        }
        out.flush()?;
        self.cursor_row = 0;
        Ok(())
    }

    fn clear_screen(&mut self) -> Result<(), TerminalError> {
        let mut out = io::stdout().lock();
        out.queue(Clear(ClearType::All))?;
        out.queue(MoveTo(0, 0))?;
        out.flush()?;
        self.cursor_row = 0;
        Ok(())
    }

    fn write_output(&mut self, text: &str, stream: OutputType) -> io::Result<()> {
        match stream {
            OutputType::Standard => {
                let mut out = io::stdout().lock();
                out.write_all(text.as_bytes())?;
                out.flush()
            }
            OutputType::Error => {
                let mut err = io::stderr().lock();
                err.write_all(text.as_bytes())?;
                err.flush()
            }
        }
    }

    fn interleave_output(
        &mut self,
        text: &str,
        stream: OutputType,
        frame: &Frame,
    ) -> io::Result<()> {
        {
            let mut out = io::stdout().lock();
            out.queue(MoveToColumn(0))?;
            if self.cursor_row > 0 {
                out.queue(MoveUp(to_u16(self.cursor_row)))?;
            }
            out.queue(Clear(ClearType::FromCursorDown))?;
            out.flush()?;
        }
        self.cursor_row = 0;
        self.write_output(&raw_mode_text(text), stream)?;
        self.draw(frame).map(|_| ()).map_err(|err| match err {
            TerminalError::Io(err) => err,
            other => io::Error::other(other),
        })
    }

    fn suspend(&mut self) -> Result<(), TerminalError> {
        #[cfg(unix)]
        {
            let mut out = io::stdout().lock();
            out.queue(Print("\r\n"))?;
            out.flush()?;
            drop(out);
            // The resumed prompt is drawn below the old one.
            self.cursor_row = 0;
            self.end()?;
            // Stops here until the shell resumes us with SIGCONT.
            if unsafe { libc::raise(libc::SIGTSTP) } != 0 {
                tracing::warn!(err = %io::Error::last_os_error(), "suspend failed");
            }
            self.begin()?;
        }
        #[cfg(not(unix))]
        {
            tracing::debug!("suspend is not supported on this platform");
        }
        Ok(())
    }
}

impl Drop for CrosstermTerminal {
    fn drop(&mut self) {
        if self.raw {
            let _ = crossterm::terminal::disable_raw_mode();
        }
    }
}

/// One scripted input step
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    Key(KeyEvent),
    /// Report "not ready" this many times before the next step
    Idle(usize),
}

#[derive(Debug, Default)]
pub struct MockState {
    pub script: VecDeque<Step>,
    /// Every frame passed to `render`
    pub frames: Vec<Frame>,
    /// Every frame passed to `finish`
    pub finished: Vec<Frame>,
    pub output: Vec<(String, OutputType)>,
    pub readiness_checks: usize,
    pub clears: usize,
    /// Output printed above a live prompt, with the frame redrawn after it
    pub interleaved: Vec<(String, Frame)>,
    pub suspends: usize,
    pub raw: bool,
}

/// Scripted terminal for tests
///
/// Clones share state, so a test can keep a handle while the session owns
/// the terminal. An exhausted script reads as `InputClosed`.
#[derive(Debug, Clone, Default)]
pub struct MockTerminal {
    state: Rc<RefCell<MockState>>,
}

impl MockTerminal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, step: Step) -> &Self {
        self.state.borrow_mut().script.push_back(step);
        self
    }

    pub fn key(&self, code: KeyCode) -> &Self {
        self.push(Step::Key(KeyEvent::new(code, KeyModifiers::NONE)))
    }

    pub fn ctrl(&self, c: char) -> &Self {
        self.push(Step::Key(KeyEvent::new(KeyCode::Char(c), KeyModifiers::CONTROL)))
    }

    pub fn alt(&self, code: KeyCode) -> &Self {
        self.push(Step::Key(KeyEvent::new(code, KeyModifiers::ALT)))
    }

    pub fn type_text(&self, text: &str) -> &Self {
        for c in text.chars() {
            self.key(KeyCode::Char(c));
        }
        self
    }

    pub fn enter(&self) -> &Self {
        self.key(KeyCode::Enter)
    }

    pub fn idle(&self, checks: usize) -> &Self {
        self.push(Step::Idle(checks))
    }

    pub fn state(&self) -> std::cell::Ref<'_, MockState> {
        self.state.borrow()
    }

    /// Prompt text of every finished cycle
    pub fn finished_prompts(&self) -> Vec<String> {
        self.state
            .borrow()
            .finished
            .iter()
            .map(|f| f.prompt.clone())
            .collect()
    }

    pub fn output_text(&self) -> String {
        self.state
            .borrow()
            .output
            .iter()
            .map(|(text, _)| text.as_str())
            .collect()
    }
}

impl InputReadiness for MockTerminal {
    fn input_ready(&mut self) -> io::Result<bool> {
        let mut state = self.state.borrow_mut();
        state.readiness_checks += 1;
        loop {
            match state.script.pop_front() {
                Some(Step::Idle(0)) => continue,
                Some(Step::Idle(n)) => {
                    state.script.push_front(Step::Idle(n - 1));
                    return Ok(false);
                }
                Some(step) => {
                    state.script.push_front(step);
                    return Ok(true);
                }
                None => return Ok(true),
            }
        }
    }
}

impl Terminal for MockTerminal {
    fn begin(&mut self) -> Result<(), TerminalError> {
        self.state.borrow_mut().raw = true;
        Ok(())
    }

    fn end(&mut self) -> Result<(), TerminalError> {
        self.state.borrow_mut().raw = false;
        Ok(())
    }

    fn read_key(&mut self) -> Result<Option<KeyEvent>, TerminalError> {
        let mut state = self.state.borrow_mut();
        loop {
            match state.script.pop_front() {
                Some(Step::Key(key)) => return Ok(Some(key)),
                Some(Step::Idle(_)) => continue,
                None => return Err(TerminalError::InputClosed),
            }
        }
    }

    fn render(&mut self, frame: &Frame) -> Result<(), TerminalError> {
        self.state.borrow_mut().frames.push(frame.clone());
        Ok(())
    }

    fn finish(&mut self, frame: &Frame) -> Result<(), TerminalError> {
        self.state.borrow_mut().finished.push(frame.clone());
        Ok(())
    }

    fn clear_screen(&mut self) -> Result<(), TerminalError> {
        self.state.borrow_mut().clears += 1;
        Ok(())
    }

    fn write_output(&mut self, text: &str, stream: OutputType) -> io::Result<()> {
        self.state
            .borrow_mut()
            .output
            .push((text.to_string(), stream));
        Ok(())
    }

    fn interleave_output(
        &mut self,
        text: &str,
        stream: OutputType,
        frame: &Frame,
    ) -> io::Result<()> {
        let mut state = self.state.borrow_mut();
        state.output.push((text.to_string(), stream));
        state.interleaved.push((text.to_string(), frame.clone()));
        Ok(())
    }

    fn suspend(&mut self) -> Result<(), TerminalError> {
        let mut state = self.state.borrow_mut();
        state.suspends += 1;
        // Back in raw mode once resumed.
        state.raw = true;
        Ok(())
    }
}
