//! End-to-end prompt cycles through the registered console callbacks
//!
//! Each test installs a session's registry on a fresh thread and drives it
//! the way R does: through the raw read/write function pointers.

use crossterm::event::KeyCode;
use rhost::config::{EditingMode, Settings};
use rhost::history::FileHistory;
use rhost::mode::PromptMode;
use rhost::session::ConsoleSession;
use rhost::terminal::MockTerminal;
use rhost_runtime::{CallbackRegistry, EventPump, EventSource, EventStepFailed, OutputType};
use std::cell::Cell;
use std::ffi::{CString, c_int};
use std::rc::Rc;
use std::time::Duration;

fn on_fresh_thread<F: FnOnce() + Send + 'static>(f: F) {
    std::thread::spawn(f).join().unwrap();
}

fn session(term: &MockTerminal) -> ConsoleSession<MockTerminal> {
    ConsoleSession::new(term.clone(), FileHistory::in_memory())
        .with_pump(EventPump::new(Duration::ZERO))
        .with_status(|| Some("~/work".to_string()))
}

/// Calls R would make, against an installed registry
struct Native {
    registry: &'static CallbackRegistry,
}

impl Native {
    fn install(registry: CallbackRegistry) -> Self {
        Native {
            registry: registry.install().unwrap(),
        }
    }

    /// `R_ReadConsole(hint, buf, len, 1)`: (status, text before the NUL)
    fn read(&self, hint: &str, len: usize) -> (c_int, Vec<u8>) {
        let read = self.registry.read_console_fn().unwrap();
        let hint = CString::new(hint).unwrap();
        let mut buf = vec![0xAAu8; len];
        let status = unsafe { read(hint.as_ptr(), buf.as_mut_ptr(), len as c_int, 1) };
        let end = buf.iter().position(|&b| b == 0).unwrap_or(0);
        buf.truncate(end);
        (status, buf)
    }

    fn write(&self, text: &str, otype: c_int) {
        let write = self.registry.write_console_ex_fn().unwrap();
        unsafe { write(text.as_ptr().cast(), text.len() as c_int, otype) };
    }
}

#[test]
fn test_help_search_line_is_delivered_verbatim() {
    on_fresh_thread(|| {
        let term = MockTerminal::new();
        term.type_text("??regex").enter();
        term.type_text("x").enter();
        let native = Native::install(session(&term).into_callbacks());

        let (status, line) = native.read("> ", 4096);
        assert_eq!(status, 1);
        assert_eq!(line, b"regex\n");
        assert_eq!(term.finished_prompts(), ["help??> "]);

        // The lookup is one-shot; the next cycle is back to normal.
        let (status, line) = native.read("> ", 4096);
        assert_eq!(status, 1);
        assert_eq!(line, b"x\n");
        assert_eq!(term.finished_prompts(), ["help??> ", "r$> "]);

        let prompts: Vec<String> = term
            .state()
            .frames
            .iter()
            .map(|f| f.prompt.clone())
            .collect();
        assert_eq!(prompts[0], "r$> ");
        assert!(prompts.contains(&"help?> ".to_string()));
    });
}

#[test]
fn test_interrupt_reprompts_within_one_read() {
    on_fresh_thread(|| {
        let term = MockTerminal::new();
        term.type_text("abc").ctrl('c');
        term.type_text("1 + 1").enter();
        let native = Native::install(session(&term).into_callbacks());

        let (status, line) = native.read("> ", 1024);
        assert_eq!(status, 1);
        assert_eq!(line, b"1 + 1\n");
        assert_eq!(term.finished_prompts(), ["r$> ", "r$> "]);
    });
}

#[test]
fn test_end_of_input() {
    on_fresh_thread(|| {
        let term = MockTerminal::new();
        term.ctrl('d');
        let native = Native::install(session(&term).into_callbacks());

        let (status, line) = native.read("> ", 64);
        assert_eq!(status, 0);
        // Nothing was written; the first byte is still the fill pattern.
        assert!(line.is_empty() || line.iter().all(|&b| b == 0xAA));

        // An exhausted terminal reads as end of input too.
        let (status, _) = native.read("> ", 64);
        assert_eq!(status, 0);
    });
}

#[test]
fn test_browser_prompt_selects_debug_mode() {
    on_fresh_thread(|| {
        let term = MockTerminal::new();
        term.type_text("n").enter();
        term.type_text("ls()").enter();
        let native = Native::install(session(&term).into_callbacks());

        assert_eq!(native.read("Browse[1]> ", 256).1, b"n\n");
        assert_eq!(native.read("> ", 256).1, b"ls()\n");
        assert_eq!(term.finished_prompts(), ["debug%> ", "r$> "]);
        // The status bar only shows in normal mode.
        let state = term.state();
        assert_eq!(state.finished[0].prompt_color, Some(crossterm::style::Color::Red));
        assert!(state.frames[0].status.is_none());
        assert!(state.frames.last().unwrap().status.is_some());
    });
}

#[test]
fn test_sub_prompt_uses_hint_and_keeps_mode() {
    on_fresh_thread(|| {
        let term = MockTerminal::new();
        term.type_text("42").enter();
        let native = Native::install(session(&term).into_callbacks());

        assert_eq!(native.read("Enter a number: ", 256).1, b"42\n");
        assert_eq!(term.finished_prompts(), ["Enter a number: "]);
    });
}

#[test]
fn test_long_line_is_truncated_to_buffer() {
    on_fresh_thread(|| {
        let term = MockTerminal::new();
        term.type_text(&"x".repeat(40)).enter();
        let native = Native::install(session(&term).into_callbacks());

        let (status, line) = native.read("> ", 16);
        assert_eq!(status, 1);
        assert_eq!(line, "x".repeat(15).as_bytes());
    });
}

#[test]
fn test_output_is_routed_by_stream() {
    on_fresh_thread(|| {
        let term = MockTerminal::new();
        let native = Native::install(
            session(&term)
                .with_blank_line_before_prompt(false)
                .into_callbacks(),
        );

        native.write("[1] 2\n", 0);
        native.write("Error: boom\n", 1);
        let output = term.state().output.clone();
        assert_eq!(
            output,
            vec![
                ("[1] 2\n".to_string(), OutputType::Standard),
                ("Error: boom\n".to_string(), OutputType::Error),
            ]
        );
    });
}

#[test]
fn test_blank_line_before_each_read() {
    on_fresh_thread(|| {
        let term = MockTerminal::new();
        term.type_text("a").enter();
        let native = Native::install(session(&term).into_callbacks());
        native.read("> ", 64);
        assert_eq!(term.output_text(), "\n");
    });
}

#[test]
fn test_settings_resolved_once_on_first_read() {
    on_fresh_thread(|| {
        let calls = Rc::new(Cell::new(0));
        let counter = calls.clone();
        let term = MockTerminal::new();
        term.type_text("a").enter();
        term.type_text("b").enter();
        let session = session(&term).with_settings_loader(move || {
            counter.set(counter.get() + 1);
            Settings {
                editing_mode: EditingMode::Vi,
                show_statusbar: false,
                ..Settings::default()
            }
        });
        let native = Native::install(session.into_callbacks());
        assert_eq!(calls.get(), 0);

        native.read("> ", 64);
        native.read("> ", 64);
        assert_eq!(calls.get(), 1);
        assert!(term.state().frames.iter().all(|f| f.status.is_none()));
    });
}

#[test]
fn test_mode_handle_requests_apply_next_cycle() {
    on_fresh_thread(|| {
        let term = MockTerminal::new();
        term.type_text("a").enter();
        let session = session(&term);
        let modes = session.mode_handle();
        modes.borrow_mut().request(PromptMode::Debug);
        let native = Native::install(session.into_callbacks());

        native.read("> ", 64);
        assert_eq!(term.finished_prompts(), ["debug%> "]);
    });
}

#[test]
fn test_history_is_appended_and_offered() {
    on_fresh_thread(|| {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("history");
        let term = MockTerminal::new();
        term.type_text("summary(cars)").enter();
        term.key(KeyCode::Up).enter();

        let history = FileHistory::load(&path).unwrap();
        let session = ConsoleSession::new(term.clone(), history)
            .with_pump(EventPump::new(Duration::ZERO));
        let native = Native::install(session.into_callbacks());

        native.read("> ", 256);
        assert_eq!(native.read("> ", 256).1, b"summary(cars)\n");

        let reloaded = FileHistory::load(&path).unwrap();
        assert_eq!(reloaded.entries(), ["summary(cars)"]);
    });
}

/// An R event handler that always errors
struct BrokenHandler {
    steps: Rc<Cell<usize>>,
}

impl EventSource for BrokenHandler {
    fn process_events(&mut self) -> Result<(), EventStepFailed> {
        self.steps.set(self.steps.get() + 1);
        Err(EventStepFailed)
    }
}

#[test]
fn test_failing_event_handler_does_not_end_input() {
    on_fresh_thread(|| {
        let steps = Rc::new(Cell::new(0));
        let term = MockTerminal::new();
        term.type_text("a").idle(2).type_text("b").enter();
        term.idle(1).type_text("c").enter();
        let session = session(&term).with_events(BrokenHandler {
            steps: Rc::clone(&steps),
        });
        let native = Native::install(session.into_callbacks());

        assert_eq!(native.read("> ", 64), (1, b"ab\n".to_vec()));
        assert_eq!(native.read("> ", 64), (1, b"c\n".to_vec()));
        assert_eq!(steps.get(), 3);
    });
}

/// An R event handler that prints through the console callback, the way a
/// `later` task or a Shiny log line does
struct PrintingHandler {
    printed: bool,
}

impl EventSource for PrintingHandler {
    fn process_events(&mut self) -> Result<(), EventStepFailed> {
        if !self.printed {
            self.printed = true;
            let registry = rhost_runtime::callbacks::installed().unwrap();
            let write = registry.write_console_ex_fn().unwrap();
            let text = "Listening on http://127.0.0.1:4321\n";
            unsafe { write(text.as_ptr().cast(), text.len() as c_int, 0) };
        }
        Ok(())
    }
}

#[test]
fn test_output_during_prompt_is_printed_above_it() {
    on_fresh_thread(|| {
        let term = MockTerminal::new();
        term.type_text("run").idle(2).type_text("App()").enter();
        let session = session(&term)
            .with_blank_line_before_prompt(false)
            .with_events(PrintingHandler { printed: false });
        let native = Native::install(session.into_callbacks());

        assert_eq!(native.read("> ", 64).1, b"runApp()\n");
        let state = term.state();
        assert_eq!(state.interleaved.len(), 1);
        let (text, frame) = &state.interleaved[0];
        assert_eq!(text, "Listening on http://127.0.0.1:4321\n");
        assert_eq!(frame.prompt, "r$> ");
        assert_eq!(frame.lines, ["run"]);
        assert_eq!(
            state.output,
            vec![(text.clone(), OutputType::Standard)]
        );
    });
}

#[test]
fn test_banner_printed_once_before_first_prompt() {
    on_fresh_thread(|| {
        let calls = Rc::new(Cell::new(0));
        let counter = Rc::clone(&calls);
        let term = MockTerminal::new();
        term.type_text("a").enter();
        term.type_text("b").enter();
        let session = session(&term).with_banner(move || {
            counter.set(counter.get() + 1);
            Some("R version 4.4.1 (2024-06-14)".to_string())
        });
        let native = Native::install(session.into_callbacks());

        native.read("> ", 64);
        native.read("> ", 64);
        assert_eq!(calls.get(), 1);
        assert_eq!(
            term.output_text(),
            "R version 4.4.1 (2024-06-14)\n\n\n"
        );
    });
}

#[test]
fn test_missing_banner_prints_nothing() {
    on_fresh_thread(|| {
        let term = MockTerminal::new();
        term.type_text("a").enter();
        let session = session(&term)
            .with_blank_line_before_prompt(false)
            .with_banner(|| None);
        let native = Native::install(session.into_callbacks());

        native.read("> ", 64);
        assert_eq!(term.output_text(), "");
    });
}
