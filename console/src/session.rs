//! Console session - the host side of R's console
//!
//! Owns everything one interactive session needs (terminal, line editor,
//! history, prompt mode machine, settings) and turns it into the callback
//! registry R is run with:
//!
//! - read console: one or more prompt cycles until a line is produced
//! - write console: R's output, routed by stream to the terminal
//! - clean up: flush and record the exit status
//! - show message: printed like standard output
//!
//! The mode machine is shared through `mode_handle()`: the session is the
//! only writer while a cycle runs, other code may queue requests between
//! reads.
//!
//! Output R writes while a prompt is up (event handlers, timers) finds the
//! terminal borrowed by the editor. It is queued in a `PendingOutput` and
//! printed above the prompt at the next input check.

use crate::config::Settings;
use crate::editor::{CycleContext, EditOutcome, LineEditor};
use crate::history::FileHistory;
use crate::mode::{PromptModeMachine, SharedModeMachine};
use crate::terminal::{PendingOutput, Terminal, TerminalError};
use rhost_runtime::{
    CallbackRegistry, CycleOutcome, EventPump, EventSource, NoEvents, OutputType,
    create_read_console, create_write_console_ex, prompt_loop,
};
use std::cell::{Cell, OnceCell, RefCell};
use std::path::Path;
use std::rc::Rc;

type SettingsLoader = Box<dyn FnOnce() -> Settings>;
type BannerLoader = Box<dyn FnOnce() -> Option<String>>;

/// `path` with a leading `home` replaced by `~`
pub fn abbreviate_home(path: &Path, home: Option<&Path>) -> String {
    match home.and_then(|home| path.strip_prefix(home).ok()) {
        Some(rest) if rest.as_os_str().is_empty() => "~".to_string(),
        Some(rest) => format!("~/{}", rest.display()),
        None => path.display().to_string(),
    }
}

/// Status bar text: the working directory
pub fn status_line() -> Option<String> {
    let cwd = std::env::current_dir().ok()?;
    Some(abbreviate_home(&cwd, dirs::home_dir().as_deref()))
}

pub struct ConsoleSession<T: Terminal + 'static> {
    terminal: Rc<RefCell<T>>,
    events: Box<dyn EventSource>,
    pump: EventPump,
    modes: SharedModeMachine,
    editor: LineEditor,
    history: FileHistory,
    settings: OnceCell<Settings>,
    settings_loader: Option<SettingsLoader>,
    banner: Option<BannerLoader>,
    pending: PendingOutput,
    blank_line_before_prompt: bool,
    status: Box<dyn Fn() -> Option<String>>,
    exit_status: Rc<Cell<Option<i32>>>,
}

impl<T: Terminal + 'static> ConsoleSession<T> {
    pub fn new(terminal: T, history: FileHistory) -> Self {
        ConsoleSession {
            terminal: Rc::new(RefCell::new(terminal)),
            events: Box::new(NoEvents),
            pump: EventPump::default(),
            modes: PromptModeMachine::shared(),
            editor: LineEditor::new(),
            history,
            settings: OnceCell::new(),
            settings_loader: None,
            banner: None,
            pending: PendingOutput::new(),
            blank_line_before_prompt: true,
            status: Box::new(status_line),
            exit_status: Rc::new(Cell::new(None)),
        }
    }

    /// R's event step, run while the prompt waits
    pub fn with_events(mut self, events: impl EventSource + 'static) -> Self {
        self.events = Box::new(events);
        self
    }

    pub fn with_pump(mut self, pump: EventPump) -> Self {
        self.pump = pump;
        self
    }

    /// Resolve the settings on the first read rather than now
    pub fn with_settings_loader(mut self, loader: impl FnOnce() -> Settings + 'static) -> Self {
        self.settings_loader = Some(Box::new(loader));
        self
    }

    /// Text printed once, before the first prompt (the R version line)
    pub fn with_banner(mut self, banner: impl FnOnce() -> Option<String> + 'static) -> Self {
        self.banner = Some(Box::new(banner));
        self
    }

    pub fn with_blank_line_before_prompt(mut self, enabled: bool) -> Self {
        self.blank_line_before_prompt = enabled;
        self
    }

    pub fn with_status(mut self, status: impl Fn() -> Option<String> + 'static) -> Self {
        self.status = Box::new(status);
        self
    }

    pub fn mode_handle(&self) -> SharedModeMachine {
        Rc::clone(&self.modes)
    }

    /// Exit status R reported to the clean-up hook, once it has run
    pub fn exit_status(&self) -> Rc<Cell<Option<i32>>> {
        Rc::clone(&self.exit_status)
    }

    pub fn history(&self) -> &FileHistory {
        &self.history
    }

    /// The settings snapshot, resolving it on first use
    pub fn settings(&mut self) -> &Settings {
        let loader = &mut self.settings_loader;
        self.settings.get_or_init(|| match loader.take() {
            Some(load) => load(),
            None => Settings::default(),
        })
    }

    /// Produce the line for one read-console call
    pub fn next_line(&mut self, hint: &str) -> Option<String> {
        self.settings();
        if let Some(load) = self.banner.take() {
            if let Some(banner) = load() {
                self.print(&banner, OutputType::Standard);
                if !banner.ends_with('\n') {
                    self.print("\n", OutputType::Standard);
                }
            }
        }
        if self.blank_line_before_prompt {
            self.print("\n", OutputType::Standard);
        }
        let mut produce = prompt_loop(|hint| self.cycle(hint));
        produce(hint)
    }

    /// Run one prompt cycle for `hint`
    pub fn cycle(&mut self, hint: &str) -> CycleOutcome {
        let spec = self.modes.borrow_mut().begin_cycle(hint);
        let settings = self.settings().clone();
        let status = (self.status)();

        let Ok(mut terminal) = self.terminal.try_borrow_mut() else {
            tracing::error!("terminal busy, ending input");
            return CycleOutcome::EndOfInput;
        };
        let cx = CycleContext {
            spec: &spec,
            settings: &settings,
            status: status.as_deref(),
            history: self.history.entries(),
            pending: &self.pending,
        };
        let outcome = self
            .editor
            .read_line(&mut *terminal, &self.pump, &mut *self.events, cx);
        // Queued after the last input check.
        for (text, stream) in self.pending.drain() {
            if let Err(err) = terminal.write_output(&text, stream) {
                tracing::warn!(%err, otype = ?stream, "console output lost");
            }
        }
        drop(terminal);

        match outcome {
            Ok(EditOutcome::Submitted(line)) => {
                if !spec.sub_prompt {
                    if spec.history {
                        if let Err(err) = self.history.append(&line) {
                            tracing::warn!(%err, "history not saved");
                        }
                    }
                    self.modes.borrow_mut().line_submitted();
                }
                CycleOutcome::Line(line)
            }
            Ok(EditOutcome::Interrupted) => CycleOutcome::Interrupted,
            Ok(EditOutcome::EndOfInput) => CycleOutcome::EndOfInput,
            Ok(EditOutcome::ModeKey(mode)) => {
                self.modes.borrow_mut().request(mode);
                CycleOutcome::Restart
            }
            Err(TerminalError::InputClosed) => {
                tracing::debug!("terminal input closed");
                CycleOutcome::EndOfInput
            }
            Err(err) => {
                tracing::error!(%err, "prompt failed, ending input");
                CycleOutcome::EndOfInput
            }
        }
    }

    fn print(&self, text: &str, stream: OutputType) {
        print_to(&self.terminal, &self.pending, text, stream);
    }

    /// Hand the session to the callback registry
    pub fn into_callbacks(mut self) -> CallbackRegistry {
        let printer = Rc::clone(&self.terminal);
        let messages = Rc::clone(&self.terminal);
        let queue = self.pending.clone();
        let message_queue = self.pending.clone();
        let exit_status = Rc::clone(&self.exit_status);

        CallbackRegistry::new()
            .with_read_console(create_read_console(move |hint| self.next_line(hint)))
            .with_write_console_ex(create_write_console_ex(move |text, stream| {
                print_to(&printer, &queue, text, stream);
            }))
            .with_clean_up(move |save, status, _run_last| {
                use std::io::Write;
                let _ = std::io::stdout().flush();
                let _ = std::io::stderr().flush();
                exit_status.set(Some(status));
                tracing::info!(?save, status, "session ended");
            })
            .with_show_message(move |message| {
                print_to(&messages, &message_queue, message, OutputType::Standard);
                if !message.ends_with('\n') {
                    print_to(&messages, &message_queue, "\n", OutputType::Standard);
                }
            })
    }
}

fn print_to<T: Terminal>(
    terminal: &RefCell<T>,
    pending: &PendingOutput,
    text: &str,
    stream: OutputType,
) {
    match terminal.try_borrow_mut() {
        Ok(mut terminal) => {
            if let Err(err) = terminal.write_output(text, stream) {
                tracing::warn!(%err, otype = ?stream, "console output lost");
            }
        }
        // A prompt is up: an R event handler printing.
        Err(_) => pending.push(text, stream),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_abbreviate_home() {
        let home = PathBuf::from("/home/ana");
        assert_eq!(
            abbreviate_home(Path::new("/home/ana/src/r"), Some(&home)),
            "~/src/r"
        );
        assert_eq!(abbreviate_home(Path::new("/home/ana"), Some(&home)), "~");
        assert_eq!(abbreviate_home(Path::new("/tmp"), Some(&home)), "/tmp");
        assert_eq!(
            abbreviate_home(Path::new("/home/anabel"), Some(&home)),
            "/home/anabel"
        );
        assert_eq!(abbreviate_home(Path::new("/tmp"), None), "/tmp");
    }
}
