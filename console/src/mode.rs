//! Prompt mode state machine
//!
//! One mode is active at a time. Requests (from mode keys, or after a help
//! lookup) are queued and only committed when the next prompt cycle begins,
//! so a prompt that is already on screen never changes under the user.
//!
//! ```text
//!          ?            ?
//! Normal ─────▶ Help ─────▶ HelpSearch
//!   ▲            │ ⌫             │ ⌫ / line submitted
//!   └────────────┴───────────────┘
//!
//! "Browse[N]> " hint ──▶ Debug ── "> " hint ──▶ Normal
//! ```

use std::cell::RefCell;
use std::rc::Rc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PromptMode {
    Normal,
    Help,
    HelpSearch,
    Debug,
}

/// Style tag the renderer maps to a color
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptStyle {
    Normal,
    Help,
    Debug,
    Plain,
}

/// Everything one prompt cycle needs to know about its mode
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptSpec {
    pub mode: PromptMode,
    pub text: String,
    pub style: PromptStyle,
    pub multiline: bool,
    pub completion: bool,
    pub history: bool,
    /// A `readline()`-style query rather than a top-level or browser read
    pub sub_prompt: bool,
}

impl PromptSpec {
    /// The fixed rendering and feature set of `mode`
    pub fn for_mode(mode: PromptMode) -> Self {
        let (text, style, multiline, completion) = match mode {
            PromptMode::Normal => ("r$> ", PromptStyle::Normal, true, true),
            PromptMode::Help => ("help?> ", PromptStyle::Help, false, true),
            PromptMode::HelpSearch => ("help??> ", PromptStyle::Help, false, false),
            PromptMode::Debug => ("debug%> ", PromptStyle::Debug, true, true),
        };
        PromptSpec {
            mode,
            text: text.to_string(),
            style,
            multiline,
            completion,
            history: true,
            sub_prompt: false,
        }
    }

    /// A single-line query showing R's own prompt text
    pub fn sub_prompt(mode: PromptMode, hint: &str) -> Self {
        PromptSpec {
            mode,
            text: hint.to_string(),
            style: PromptStyle::Plain,
            multiline: false,
            completion: false,
            history: false,
            sub_prompt: true,
        }
    }
}

/// What kind of read R is asking for, judged from its prompt hint
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptHint<'a> {
    TopLevel,
    Browser,
    Other(&'a str),
}

pub fn classify_hint(hint: &str) -> PromptHint<'_> {
    if hint == "> " {
        PromptHint::TopLevel
    } else if hint.starts_with("Browse[") && hint.ends_with("]> ") {
        PromptHint::Browser
    } else {
        PromptHint::Other(hint)
    }
}

/// Keys that ask for a mode change when pressed on an empty buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModeKey {
    Question,
    Erase,
}

/// Where `key` leads from `mode`, if anywhere
pub fn mode_key_target(mode: PromptMode, key: ModeKey) -> Option<PromptMode> {
    match (mode, key) {
        (PromptMode::Normal | PromptMode::Debug, ModeKey::Question) => Some(PromptMode::Help),
        (PromptMode::Help, ModeKey::Question) => Some(PromptMode::HelpSearch),
        (PromptMode::Help | PromptMode::HelpSearch, ModeKey::Erase) => Some(PromptMode::Normal),
        _ => None,
    }
}

#[derive(Debug, Clone)]
pub struct PromptModeMachine {
    current: PromptMode,
    pending: Option<PromptMode>,
}

/// The one mode machine shared by the session and the UI
pub type SharedModeMachine = Rc<RefCell<PromptModeMachine>>;

impl Default for PromptModeMachine {
    fn default() -> Self {
        Self::new()
    }
}

impl PromptModeMachine {
    pub fn new() -> Self {
        PromptModeMachine {
            current: PromptMode::Normal,
            pending: None,
        }
    }

    pub fn shared() -> SharedModeMachine {
        Rc::new(RefCell::new(Self::new()))
    }

    pub fn current(&self) -> PromptMode {
        self.current
    }

    pub fn pending(&self) -> Option<PromptMode> {
        self.pending
    }

    /// Ask for `mode` on the next cycle; a later request replaces an earlier one
    pub fn request(&mut self, mode: PromptMode) {
        tracing::trace!(?mode, "mode requested");
        self.pending = Some(mode);
    }

    /// Commit pending requests for a new cycle and describe it
    pub fn begin_cycle(&mut self, hint: &str) -> PromptSpec {
        let next = match classify_hint(hint) {
            PromptHint::TopLevel => match self.pending.take() {
                Some(mode) => mode,
                None if self.current == PromptMode::Debug => PromptMode::Normal,
                None => self.current,
            },
            // Help lookups are allowed from the browser; "normal" there is debug.
            PromptHint::Browser => match self.pending.take() {
                Some(mode @ (PromptMode::Help | PromptMode::HelpSearch)) => mode,
                _ => PromptMode::Debug,
            },
            PromptHint::Other(text) => return PromptSpec::sub_prompt(self.current, text),
        };

        if next != self.current {
            tracing::debug!(from = ?self.current, to = ?next, "prompt mode changed");
        }
        self.current = next;
        PromptSpec::for_mode(next)
    }

    /// A line was submitted in the current mode
    ///
    /// Help lookups are one-shot: the next cycle goes back to normal unless
    /// something else was already requested.
    pub fn line_submitted(&mut self) {
        if matches!(self.current, PromptMode::Help | PromptMode::HelpSearch)
            && self.pending.is_none()
        {
            self.pending = Some(PromptMode::Normal);
        }
    }
}
