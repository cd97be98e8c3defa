//! rhost - a terminal console for an embedded R
//!
//! The runtime crate loads libR and hands it console callbacks; this crate
//! provides what sits behind them: a modal prompt (normal, help, help
//! search, debug) with a line editor, history and status bar.

pub mod config;
pub mod editor;
pub mod history;
pub mod logging;
pub mod mode;
pub mod session;
pub mod terminal;

pub use config::{Config, ConfigError, EditingMode, Settings, SettingsSource};
pub use editor::{EditOutcome, LineEditor};
pub use history::{FileHistory, HistoryError};
pub use logging::{LogConfig, LogError, init_logging};
pub use mode::{PromptMode, PromptModeMachine, PromptSpec, PromptStyle};
pub use session::ConsoleSession;
pub use terminal::{CrosstermTerminal, MockTerminal, Terminal, TerminalError};
