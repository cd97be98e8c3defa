//! Key bindings
//!
//! Maps key events to editor commands for the emacs bindings and a small vi
//! subset. Vi keeps its insert/command state across keys within one cycle.

use crate::config::EditingMode;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditCommand {
    Insert(char),
    /// Literal newline (multi-line editing)
    Newline,
    Submit,
    Backspace,
    /// Delete under the cursor, or end of input on an empty buffer
    DeleteOrEof,
    Delete,
    Left,
    Right,
    LineStart,
    LineEnd,
    KillToEnd,
    KillToStart,
    KillWordBack,
    Up,
    Down,
    Complete,
    ClearScreen,
    /// Ctrl-Z: stop the process until the shell resumes it
    Suspend,
    Cancel,
    Noop,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViState {
    Insert,
    Command,
}

#[derive(Debug, Clone)]
pub struct Keymap {
    mode: EditingMode,
    vi: ViState,
}

impl Keymap {
    pub fn new(mode: EditingMode) -> Self {
        Keymap {
            mode,
            vi: ViState::Insert,
        }
    }

    /// Start a new prompt cycle; vi always starts in insert state
    pub fn reset(&mut self, mode: EditingMode) {
        self.mode = mode;
        self.vi = ViState::Insert;
    }

    pub fn vi_state(&self) -> Option<ViState> {
        (self.mode == EditingMode::Vi).then_some(self.vi)
    }

    pub fn map(&mut self, key: &KeyEvent) -> EditCommand {
        if let Some(command) = common(key) {
            return command;
        }
        match (self.mode, self.vi) {
            (EditingMode::Emacs, _) => emacs(key),
            (EditingMode::Vi, ViState::Insert) => {
                if key.code == KeyCode::Esc {
                    self.vi = ViState::Command;
                    EditCommand::Left
                } else {
                    emacs(key)
                }
            }
            (EditingMode::Vi, ViState::Command) => self.vi_command(key),
        }
    }

    fn vi_command(&mut self, key: &KeyEvent) -> EditCommand {
        let KeyCode::Char(c) = key.code else {
            return match key.code {
                KeyCode::Left => EditCommand::Left,
                KeyCode::Right => EditCommand::Right,
                KeyCode::Up => EditCommand::Up,
                KeyCode::Down => EditCommand::Down,
                KeyCode::Home => EditCommand::LineStart,
                KeyCode::End => EditCommand::LineEnd,
                _ => EditCommand::Noop,
            };
        };
        match c {
            'h' => EditCommand::Left,
            'l' => EditCommand::Right,
            '0' => EditCommand::LineStart,
            '$' => EditCommand::LineEnd,
            'x' => EditCommand::Delete,
            'k' => EditCommand::Up,
            'j' => EditCommand::Down,
            'i' => {
                self.vi = ViState::Insert;
                EditCommand::Noop
            }
            'a' => {
                self.vi = ViState::Insert;
                EditCommand::Right
            }
            'I' => {
                self.vi = ViState::Insert;
                EditCommand::LineStart
            }
            'A' => {
                self.vi = ViState::Insert;
                EditCommand::LineEnd
            }
            _ => EditCommand::Noop,
        }
    }
}

/// Bindings shared by every mode and state
fn common(key: &KeyEvent) -> Option<EditCommand> {
    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
    let alt = key.modifiers.contains(KeyModifiers::ALT);
    match key.code {
        KeyCode::Enter if alt => Some(EditCommand::Newline),
        KeyCode::Enter => Some(EditCommand::Submit),
        KeyCode::Char('c') if ctrl => Some(EditCommand::Cancel),
        KeyCode::Char('d') if ctrl => Some(EditCommand::DeleteOrEof),
        KeyCode::Char('l') if ctrl => Some(EditCommand::ClearScreen),
        KeyCode::Char('z') if ctrl => Some(EditCommand::Suspend),
        _ => None,
    }
}

fn emacs(key: &KeyEvent) -> EditCommand {
    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
    match key.code {
        KeyCode::Char(c) if ctrl => match c {
            'a' => EditCommand::LineStart,
            'e' => EditCommand::LineEnd,
            'b' => EditCommand::Left,
            'f' => EditCommand::Right,
            'k' => EditCommand::KillToEnd,
            'u' => EditCommand::KillToStart,
            'w' => EditCommand::KillWordBack,
            'p' => EditCommand::Up,
            'n' => EditCommand::Down,
            'h' => EditCommand::Backspace,
            _ => EditCommand::Noop,
        },
        KeyCode::Char(c) if !key.modifiers.contains(KeyModifiers::ALT) => EditCommand::Insert(c),
        KeyCode::Backspace => EditCommand::Backspace,
        KeyCode::Delete => EditCommand::Delete,
        KeyCode::Left => EditCommand::Left,
        KeyCode::Right => EditCommand::Right,
        KeyCode::Home => EditCommand::LineStart,
        KeyCode::End => EditCommand::LineEnd,
        KeyCode::Up => EditCommand::Up,
        KeyCode::Down => EditCommand::Down,
        KeyCode::Tab => EditCommand::Complete,
        _ => EditCommand::Noop,
    }
}
