//! Line editor
//!
//! Runs one prompt cycle against a `Terminal`: draw, wait for a key through
//! the event pump so R keeps servicing its events, apply the key, repeat
//! until the cycle ends. Whatever R prints from its event handlers during the
//! wait is printed above the prompt on the next readiness check.

mod buffer;
mod complete;
mod keymap;

pub use buffer::LineBuffer;
pub use complete::{candidates, complete};
pub use keymap::{EditCommand, Keymap, ViState};

use crate::config::{EditingMode, Settings};
use crate::mode::{ModeKey, PromptMode, PromptSpec, PromptStyle, mode_key_target};
use crate::terminal::{Frame, PendingOutput, Terminal, TerminalError};
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use crossterm::style::Color;
use rhost_runtime::{EventPump, EventSource, InputReadiness};
use std::io;

/// How one prompt cycle ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditOutcome {
    Submitted(String),
    /// Ctrl-C
    Interrupted,
    /// Ctrl-D on an empty buffer
    EndOfInput,
    /// A mode key was pressed on an empty buffer
    ModeKey(PromptMode),
}

/// Inputs to one cycle besides the terminal
#[derive(Debug, Clone, Copy)]
pub struct CycleContext<'a> {
    pub spec: &'a PromptSpec,
    pub settings: &'a Settings,
    /// Status line text, shown when the settings and mode allow it
    pub status: Option<&'a str>,
    pub history: &'a [String],
    /// Output R produced while this cycle holds the terminal
    pub pending: &'a PendingOutput,
}

/// The terminal as the event pump sees it during a wait
///
/// Flushes queued output above `frame` before every readiness check.
struct Waiting<'t, T: ?Sized> {
    terminal: &'t mut T,
    pending: &'t PendingOutput,
    frame: &'t Frame,
}

impl<T: Terminal + ?Sized> InputReadiness for Waiting<'_, T> {
    fn input_ready(&mut self) -> io::Result<bool> {
        for (text, stream) in self.pending.drain() {
            self.terminal.interleave_output(&text, stream, self.frame)?;
        }
        self.terminal.input_ready()
    }
}

/// Prompt color for `style` under `scheme`
pub fn prompt_color(style: PromptStyle, scheme: &str) -> Option<Color> {
    if matches!(scheme, "none" | "monochrome") {
        return None;
    }
    match style {
        PromptStyle::Normal => Some(Color::Blue),
        PromptStyle::Help => Some(Color::Yellow),
        PromptStyle::Debug => Some(Color::Red),
        PromptStyle::Plain => None,
    }
}

fn mode_key(key: &KeyEvent) -> Option<ModeKey> {
    if key
        .modifiers
        .intersects(KeyModifiers::CONTROL | KeyModifiers::ALT)
    {
        return None;
    }
    match key.code {
        KeyCode::Char('?') => Some(ModeKey::Question),
        KeyCode::Backspace => Some(ModeKey::Erase),
        _ => None,
    }
}

/// Walks history with Up/Down, keeping the unsent draft
#[derive(Debug)]
struct HistoryNav<'a> {
    entries: &'a [String],
    /// `entries.len()` means "the draft"
    index: usize,
    draft: String,
}

impl<'a> HistoryNav<'a> {
    fn new(entries: &'a [String]) -> Self {
        HistoryNav {
            entries,
            index: entries.len(),
            draft: String::new(),
        }
    }

    fn previous(&mut self, current: &str) -> Option<&str> {
        if self.index == 0 {
            return None;
        }
        if self.index == self.entries.len() {
            self.draft = current.to_string();
        }
        self.index -= 1;
        Some(&self.entries[self.index])
    }

    fn next(&mut self) -> Option<&str> {
        if self.index >= self.entries.len() {
            return None;
        }
        self.index += 1;
        Some(
            self.entries
                .get(self.index)
                .map_or(self.draft.as_str(), String::as_str),
        )
    }
}

#[derive(Debug, Clone)]
pub struct LineEditor {
    keymap: Keymap,
}

impl Default for LineEditor {
    fn default() -> Self {
        Self::new()
    }
}

impl LineEditor {
    pub fn new() -> Self {
        LineEditor {
            keymap: Keymap::new(EditingMode::Emacs),
        }
    }

    /// Run one prompt cycle
    ///
    /// Raw mode is held only for the duration of the cycle.
    pub fn read_line<T, E>(
        &mut self,
        terminal: &mut T,
        pump: &EventPump,
        events: &mut E,
        cx: CycleContext<'_>,
    ) -> Result<EditOutcome, TerminalError>
    where
        T: Terminal + ?Sized,
        E: EventSource + ?Sized,
    {
        terminal.begin()?;
        let outcome = self.edit(terminal, pump, events, cx);
        let ended = terminal.end();
        let outcome = outcome?;
        ended?;
        tracing::trace!(mode = ?cx.spec.mode, ?outcome, "prompt cycle ended");
        Ok(outcome)
    }

    fn edit<T, E>(
        &mut self,
        terminal: &mut T,
        pump: &EventPump,
        events: &mut E,
        cx: CycleContext<'_>,
    ) -> Result<EditOutcome, TerminalError>
    where
        T: Terminal + ?Sized,
        E: EventSource + ?Sized,
    {
        let spec = cx.spec;
        let history: &[String] = if spec.history { cx.history } else { &[] };
        let mut nav = HistoryNav::new(history);
        let mut buffer = LineBuffer::new();
        self.keymap.reset(cx.settings.editing_mode);

        let show_status =
            cx.settings.show_statusbar && spec.mode == PromptMode::Normal && !spec.sub_prompt;
        let status = if show_status { cx.status } else { None };
        let color = prompt_color(spec.style, &cx.settings.color_scheme);

        let frame = |buffer: &LineBuffer, status: Option<&str>| Frame {
            prompt: spec.text.clone(),
            prompt_color: color,
            lines: buffer.lines(),
            cursor: buffer.position(),
            status: status.map(str::to_string),
        };

        loop {
            let shown = frame(&buffer, status);
            terminal.render(&shown)?;
            let mut waiting = Waiting {
                terminal: &mut *terminal,
                pending: cx.pending,
                frame: &shown,
            };
            pump.wait_for_input(&mut waiting, events)?;
            let Some(key) = terminal.read_key()? else {
                continue;
            };

            let accepts_mode_keys = buffer.is_empty()
                && !spec.sub_prompt
                && self.keymap.vi_state() != Some(ViState::Command);
            if accepts_mode_keys {
                if let Some(target) = mode_key(&key).and_then(|k| mode_key_target(spec.mode, k)) {
                    return Ok(EditOutcome::ModeKey(target));
                }
            }

            match self.keymap.map(&key) {
                EditCommand::Insert(c) => buffer.insert(c),
                EditCommand::Newline if spec.multiline => buffer.insert('\n'),
                EditCommand::Newline => {}
                EditCommand::Submit => {
                    terminal.finish(&frame(&buffer, None))?;
                    return Ok(EditOutcome::Submitted(buffer.text()));
                }
                EditCommand::Cancel => {
                    terminal.finish(&frame(&buffer, None))?;
                    return Ok(EditOutcome::Interrupted);
                }
                EditCommand::DeleteOrEof if buffer.is_empty() => {
                    terminal.finish(&frame(&buffer, None))?;
                    return Ok(EditOutcome::EndOfInput);
                }
                EditCommand::DeleteOrEof | EditCommand::Delete => {
                    buffer.delete();
                }
                EditCommand::Backspace => {
                    buffer.backspace();
                }
                EditCommand::Left => buffer.move_left(),
                EditCommand::Right => buffer.move_right(),
                EditCommand::LineStart => buffer.move_line_start(),
                EditCommand::LineEnd => buffer.move_line_end(),
                EditCommand::KillToEnd => {
                    buffer.kill_to_line_end();
                }
                EditCommand::KillToStart => {
                    buffer.kill_to_line_start();
                }
                EditCommand::KillWordBack => {
                    buffer.kill_word_back();
                }
                EditCommand::Up => {
                    if !buffer.move_up() {
                        let current = buffer.text();
                        if let Some(entry) = nav.previous(&current) {
                            buffer.set_text(entry);
                        }
                    }
                }
                EditCommand::Down => {
                    if !buffer.move_down() {
                        if let Some(entry) = nav.next() {
                            buffer.set_text(entry);
                        }
                    }
                }
                EditCommand::Complete if spec.completion => {
                    let prefix = buffer.word_before_cursor();
                    if let Some(suffix) = complete(&prefix, cx.history) {
                        buffer.insert_str(&suffix);
                    }
                }
                EditCommand::Complete => {}
                EditCommand::ClearScreen => terminal.clear_screen()?,
                EditCommand::Suspend => terminal.suspend()?,
                EditCommand::Noop => {}
            }
        }
    }
}
