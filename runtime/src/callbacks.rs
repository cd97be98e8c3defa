/*!
Console callback registry and adapters

R calls its console hooks through raw function pointers. A C function pointer
cannot carry a closure, so the host closures live in a `CallbackRegistry`
that is leaked into a thread-local keeper on `install()`: it is never moved,
replaced or dropped while R holds the trampoline addresses. The trampolines
below look the registry up, translate R's buffer conventions and call the
host closures.

Nothing may unwind across the boundary. Every trampoline body runs under
`catch_unwind` and maps a panic to the "no input" / no-op result.
*/

use crate::error::{RuntimeError, RuntimeResult};
use crate::ffi::{CleanUpFn, ReadConsoleFn, ShowMessageFn, Slots, WriteConsoleExFn};
use std::borrow::Cow;
use std::cell::{Cell, RefCell};
use std::ffi::{CStr, c_char, c_int, c_uchar};
use std::io::Write;
use std::panic::{AssertUnwindSafe, catch_unwind};

/// Which stream R wants text written to (`otype` of WriteConsoleEx)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputType {
    Standard,
    Error,
}

impl OutputType {
    pub fn from_raw(otype: c_int) -> Self {
        if otype == 0 {
            OutputType::Standard
        } else {
            OutputType::Error
        }
    }
}

/// R's `SA_TYPE` as passed to the clean-up hook
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveAction {
    NoRestore,
    Restore,
    Default,
    NoSave,
    Save,
    SaveAsk,
    Suicide,
    Unknown(i32),
}

impl SaveAction {
    pub fn from_raw(value: c_int) -> Self {
        match value {
            0 => SaveAction::NoRestore,
            1 => SaveAction::Restore,
            2 => SaveAction::Default,
            3 => SaveAction::NoSave,
            4 => SaveAction::Save,
            5 => SaveAction::SaveAsk,
            6 => SaveAction::Suicide,
            other => SaveAction::Unknown(other),
        }
    }
}

/// Result of one prompt cycle on the host side
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CycleOutcome {
    /// The user submitted a line
    Line(String),
    /// The user cancelled the line being edited (Ctrl-C)
    Interrupted,
    /// The cycle ended without a line and should be re-issued (mode change)
    Restart,
    /// No more input can be produced
    EndOfInput,
}

/// Turn a prompt cycle into a line producer
///
/// Interrupts and restarts are absorbed here by re-running the cycle, so R
/// only ever sees a line or end-of-input.
pub fn prompt_loop<F>(mut cycle: F) -> impl FnMut(&str) -> Option<String>
where
    F: FnMut(&str) -> CycleOutcome,
{
    move |hint| loop {
        match cycle(hint) {
            CycleOutcome::Line(line) => return Some(line),
            CycleOutcome::EndOfInput => return None,
            CycleOutcome::Interrupted => {
                tracing::debug!(hint, "prompt interrupted, re-prompting");
            }
            CycleOutcome::Restart => {
                tracing::trace!(hint, "prompt cycle restarted");
            }
        }
    }
}

/// Copy `line` plus a trailing newline into `buf`, NUL-terminated
///
/// At most `buf.len() - 1` bytes of payload are written, cut back to a UTF-8
/// character boundary, followed by the terminator. Returns the payload length.
pub fn encode_line(line: &str, buf: &mut [u8]) -> usize {
    let Some(capacity) = buf.len().checked_sub(1) else {
        return 0;
    };

    let mut payload = String::with_capacity(line.len() + 1);
    payload.push_str(line);
    payload.push('\n');

    let mut n = capacity.min(payload.len());
    while !payload.is_char_boundary(n) {
        n -= 1;
    }

    buf[..n].copy_from_slice(&payload.as_bytes()[..n]);
    buf[n] = 0;
    n
}

/// Host side of `ptr_R_ReadConsole`
pub struct ReadConsole {
    producer: RefCell<Box<dyn FnMut(&str) -> Option<String>>>,
}

/// Wrap a line producer as a read-console adapter
///
/// `producer(prompt_hint)` blocks until the user submits a line (`Some`) or
/// input is exhausted (`None`).
pub fn create_read_console<F>(producer: F) -> ReadConsole
where
    F: FnMut(&str) -> Option<String> + 'static,
{
    ReadConsole {
        producer: RefCell::new(Box::new(producer)),
    }
}

impl ReadConsole {
    /// Produce a line for `hint` and encode it into `buf`
    ///
    /// Returns 1 when a line was written and 0 on end-of-input, in which case
    /// `buf` is untouched.
    pub fn read_into(&self, hint: &str, buf: &mut [u8]) -> c_int {
        let Ok(mut producer) = self.producer.try_borrow_mut() else {
            tracing::warn!(hint, "nested console read refused");
            return 0;
        };

        match producer(hint) {
            Some(line) => {
                let written = encode_line(&line, buf);
                tracing::trace!(slot = "read_console", len = written, "line delivered");
                1
            }
            None => {
                tracing::debug!(slot = "read_console", "end of input");
                0
            }
        }
    }
}

/// Host side of `ptr_R_WriteConsoleEx`
pub struct WriteConsoleEx {
    printer: RefCell<Box<dyn FnMut(&str, OutputType)>>,
}

/// Wrap a printer as a write-console adapter
pub fn create_write_console_ex<F>(printer: F) -> WriteConsoleEx
where
    F: FnMut(&str, OutputType) + 'static,
{
    WriteConsoleEx {
        printer: RefCell::new(Box::new(printer)),
    }
}

impl WriteConsoleEx {
    /// Decode `bytes` lossily and forward them to the printer
    pub fn write(&self, bytes: &[u8], otype: c_int) {
        let text = String::from_utf8_lossy(bytes);
        let stream = OutputType::from_raw(otype);
        match self.printer.try_borrow_mut() {
            Ok(mut printer) => printer(&text, stream),
            // The printer itself made R print; bypass it rather than drop text.
            Err(_) => write_direct(&text, stream),
        }
    }
}

fn write_direct(text: &str, stream: OutputType) {
    let result = match stream {
        OutputType::Standard => std::io::stdout().write_all(text.as_bytes()),
        OutputType::Error => std::io::stderr().write_all(text.as_bytes()),
    };
    if let Err(err) = result {
        tracing::warn!(%err, "console write failed");
    }
}

type CleanUpHandler = RefCell<Box<dyn FnMut(SaveAction, i32, bool)>>;
type MessageHandler = RefCell<Box<dyn FnMut(&str)>>;

/// Owner of every host closure R can call into
#[derive(Default)]
pub struct CallbackRegistry {
    read_console: Option<ReadConsole>,
    write_console_ex: Option<WriteConsoleEx>,
    clean_up: Option<CleanUpHandler>,
    show_message: Option<MessageHandler>,
    /// R's own clean-up, run after the host handler
    previous_clean_up: Cell<Option<CleanUpFn>>,
}

thread_local! {
    static INSTALLED: Cell<Option<&'static CallbackRegistry>> = const { Cell::new(None) };
}

/// The registry installed on this thread, if any
pub fn installed() -> Option<&'static CallbackRegistry> {
    INSTALLED.with(|slot| slot.get())
}

impl CallbackRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_read_console(mut self, adapter: ReadConsole) -> Self {
        self.read_console = Some(adapter);
        self
    }

    pub fn with_write_console_ex(mut self, adapter: WriteConsoleEx) -> Self {
        self.write_console_ex = Some(adapter);
        self
    }

    pub fn with_clean_up<F>(mut self, handler: F) -> Self
    where
        F: FnMut(SaveAction, i32, bool) + 'static,
    {
        self.clean_up = Some(RefCell::new(Box::new(handler)));
        self
    }

    pub fn with_show_message<F>(mut self, handler: F) -> Self
    where
        F: FnMut(&str) + 'static,
    {
        self.show_message = Some(RefCell::new(Box::new(handler)));
        self
    }

    /// Take ownership of the registry for the rest of the process
    ///
    /// The registry is leaked so its address is stable and it can never be
    /// dropped while R holds the trampolines. Only one registry per thread.
    pub fn install(self) -> RuntimeResult<&'static CallbackRegistry> {
        INSTALLED.with(|slot| {
            if slot.get().is_some() {
                return Err(RuntimeError::RegistryInstalled);
            }
            let registry: &'static CallbackRegistry = Box::leak(Box::new(self));
            slot.set(Some(registry));
            Ok(registry)
        })
    }

    /// Trampoline for `ptr_R_ReadConsole`, if a reader is registered
    pub fn read_console_fn(&self) -> Option<ReadConsoleFn> {
        self.read_console
            .as_ref()
            .map(|_| read_console_trampoline as ReadConsoleFn)
    }

    /// Trampoline for `ptr_R_WriteConsoleEx`, if a printer is registered
    pub fn write_console_ex_fn(&self) -> Option<WriteConsoleExFn> {
        self.write_console_ex
            .as_ref()
            .map(|_| write_console_ex_trampoline as WriteConsoleExFn)
    }

    pub fn clean_up_fn(&self) -> Option<CleanUpFn> {
        self.clean_up
            .as_ref()
            .map(|_| clean_up_trampoline as CleanUpFn)
    }

    pub fn show_message_fn(&self) -> Option<ShowMessageFn> {
        self.show_message
            .as_ref()
            .map(|_| show_message_trampoline as ShowMessageFn)
    }

    /// Write the trampolines into R's hook slots
    ///
    /// Clearing `ptr_R_WriteConsole` makes R route output through
    /// WriteConsoleEx so the stream flag is preserved.
    ///
    /// # Safety
    /// `slots` must point at a loaded libR's hook globals, and R must not be
    /// running on another thread.
    pub unsafe fn bind(&'static self, slots: &Slots) {
        unsafe {
            if let Some(read) = self.read_console_fn() {
                *slots.read_console = Some(read);
            }
            if let Some(write) = self.write_console_ex_fn() {
                *slots.write_console = None;
                *slots.write_console_ex = Some(write);
            }
            if let Some(clean_up) = self.clean_up_fn() {
                let previous = slots.clean_up.replace(Some(clean_up));
                self.previous_clean_up.set(previous);
            }
            if let Some(show) = self.show_message_fn() {
                *slots.show_message = Some(show);
            }
        }
        tracing::debug!(
            read = self.read_console.is_some(),
            write = self.write_console_ex.is_some(),
            clean_up = self.clean_up.is_some(),
            show_message = self.show_message.is_some(),
            "console callbacks bound"
        );
    }
}

fn guarded<T>(slot: &'static str, fallback: T, body: impl FnOnce() -> T) -> T {
    match catch_unwind(AssertUnwindSafe(body)) {
        Ok(value) => value,
        Err(_) => {
            tracing::error!(slot, "panic inside console callback");
            fallback
        }
    }
}

fn decode_c_str<'a>(ptr: *const c_char) -> Cow<'a, str> {
    if ptr.is_null() {
        Cow::Borrowed("")
    } else {
        unsafe { CStr::from_ptr(ptr) }.to_string_lossy()
    }
}

/// # Safety
/// Called by R with a NUL-terminated prompt and a writable buffer of `len` bytes.
pub(crate) unsafe extern "C" fn read_console_trampoline(
    prompt: *const c_char,
    buf: *mut c_uchar,
    len: c_int,
    _add_to_history: c_int,
) -> c_int {
    guarded("read_console", 0, || {
        let Some(adapter) = installed().and_then(|r| r.read_console.as_ref()) else {
            return 0;
        };
        let Ok(len) = usize::try_from(len) else {
            tracing::error!(len, "negative console buffer length");
            return 0;
        };
        if buf.is_null() || len == 0 {
            tracing::error!(len, "unusable console buffer");
            return 0;
        }
        let hint = decode_c_str(prompt);
        let buf = unsafe { std::slice::from_raw_parts_mut(buf, len) };
        adapter.read_into(&hint, buf)
    })
}

/// # Safety
/// Called by R with `len` readable bytes at `buf`; no terminator is assumed.
pub(crate) unsafe extern "C" fn write_console_ex_trampoline(
    buf: *const c_char,
    len: c_int,
    otype: c_int,
) {
    guarded("write_console_ex", (), || {
        let Some(adapter) = installed().and_then(|r| r.write_console_ex.as_ref()) else {
            return;
        };
        let len = match usize::try_from(len) {
            Ok(len) if len > 0 && !buf.is_null() => len,
            _ => return,
        };
        let bytes = unsafe { std::slice::from_raw_parts(buf.cast::<u8>(), len) };
        adapter.write(bytes, otype);
    })
}

/// # Safety
/// Called by R when the session ends.
///
/// The previous slot value (R's default, which removes the session temp dir,
/// runs `.Last` and exits with `status`) is chained after the host handler
/// and may not return.
pub(crate) unsafe extern "C" fn clean_up_trampoline(save: c_int, status: c_int, run_last: c_int) {
    let previous = guarded("clean_up", None, || {
        let registry = installed()?;
        let handler = registry.clean_up.as_ref()?;
        let action = SaveAction::from_raw(save);
        tracing::info!(save = ?action, status, "R session cleaning up");
        match handler.try_borrow_mut() {
            Ok(mut handler) => handler(action, status, run_last != 0),
            Err(_) => tracing::warn!("re-entrant clean-up ignored"),
        }
        registry.previous_clean_up.get()
    });

    // Outside the guard: R's clean-up may longjmp or exit.
    if let Some(previous) = previous {
        unsafe { previous(save, status, run_last) };
    }
}

/// # Safety
/// Called by R with a NUL-terminated message.
pub(crate) unsafe extern "C" fn show_message_trampoline(message: *const c_char) {
    guarded("show_message", (), || {
        let Some(handler) = installed().and_then(|r| r.show_message.as_ref()) else {
            return;
        };
        let message = decode_c_str(message);
        match handler.try_borrow_mut() {
            Ok(mut handler) => handler(&message),
            Err(_) => write_direct(&message, OutputType::Standard),
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::ffi::CString;
    use std::rc::Rc;

    /// Run `f` on a fresh thread so it gets its own registry slot
    fn on_fresh_thread<F: FnOnce() + Send + 'static>(f: F) {
        std::thread::spawn(f).join().unwrap();
    }

    const SENTINEL: u8 = 0xAA;

    fn call_read(max: usize, line: Option<&str>) -> (c_int, Vec<u8>) {
        let line = line.map(str::to_string);
        let adapter = create_read_console(move |_| line.clone());
        // Extra guard bytes past the declared bound must stay untouched.
        let mut backing = vec![SENTINEL; max + 16];
        let status = adapter.read_into("> ", &mut backing[..max]);
        (status, backing)
    }

    #[test]
    fn test_short_line_gets_newline_and_terminator() {
        let max = 32;
        for len in 0..=max - 2 {
            let input = "x".repeat(len);
            let (status, backing) = call_read(max, Some(&input));
            assert_eq!(status, 1);
            let mut expected = input.clone().into_bytes();
            expected.push(b'\n');
            expected.push(0);
            assert_eq!(&backing[..expected.len()], &expected[..], "len {}", len);
            assert!(expected.len() <= max);
        }
    }

    #[test]
    fn test_long_lines_truncate_within_bound() {
        let max = 16;
        for len in max - 1..=4 * max {
            let input = "y".repeat(len);
            let (status, backing) = call_read(max, Some(&input));
            assert_eq!(status, 1);
            assert!(backing[..max - 1].iter().all(|&b| b == b'y'), "len {}", len);
            assert_eq!(backing[max - 1], 0);
            assert!(backing[max..].iter().all(|&b| b == SENTINEL));
        }
    }

    #[test]
    fn test_truncation_respects_char_boundaries() {
        let mut buf = [SENTINEL; 6];
        // "ééé" is 6 bytes; 5 bytes of payload room leaves two full chars.
        let n = encode_line("ééé", &mut buf);
        assert_eq!(n, 4);
        assert_eq!(&buf[..5], "éé\0".as_bytes());
    }

    #[test]
    fn test_end_of_input_leaves_buffer_alone() {
        let (status, backing) = call_read(8, None);
        assert_eq!(status, 0);
        assert!(backing.iter().all(|&b| b == SENTINEL));
    }

    #[test]
    fn test_one_byte_buffer_only_terminates() {
        let mut buf = [SENTINEL; 1];
        assert_eq!(encode_line("abc", &mut buf), 0);
        assert_eq!(buf[0], 0);
        assert_eq!(encode_line("abc", &mut []), 0);
    }

    #[test]
    fn test_interrupt_reprompts_instead_of_returning() {
        let mut script = vec![
            CycleOutcome::Interrupted,
            CycleOutcome::Restart,
            CycleOutcome::Interrupted,
            CycleOutcome::Line("1 + 1".to_string()),
        ]
        .into_iter();
        let calls = Rc::new(Cell::new(0));
        let counter = calls.clone();
        let mut produce = prompt_loop(move |_| {
            counter.set(counter.get() + 1);
            script.next().unwrap_or(CycleOutcome::EndOfInput)
        });

        assert_eq!(produce("> "), Some("1 + 1".to_string()));
        assert_eq!(calls.get(), 4);
        assert_eq!(produce("> "), None);
    }

    #[test]
    fn test_trampolines_round_trip_through_registry() {
        on_fresh_thread(|| {
            let printed = Rc::new(RefCell::new(Vec::new()));
            let sink = printed.clone();
            let registry = CallbackRegistry::new()
                .with_read_console(create_read_console(|hint| Some(format!("hint={}", hint))))
                .with_write_console_ex(create_write_console_ex(move |text, stream| {
                    sink.borrow_mut().push((text.to_string(), stream));
                }));
            registry.install().unwrap();

            let prompt = CString::new("> ").unwrap();
            let mut buf = [0u8; 64];
            let status = unsafe {
                read_console_trampoline(prompt.as_ptr(), buf.as_mut_ptr(), buf.len() as c_int, 1)
            };
            assert_eq!(status, 1);
            assert_eq!(&buf[..10], b"hint=> \n\0\0");

            unsafe {
                write_console_ex_trampoline(b"hello".as_ptr().cast(), 5, 0);
                write_console_ex_trampoline(b"err".as_ptr().cast(), 3, 1);
            }
            assert_eq!(
                *printed.borrow(),
                vec![
                    ("hello".to_string(), OutputType::Standard),
                    ("err".to_string(), OutputType::Error),
                ]
            );
        });
    }

    #[test]
    fn test_write_respects_length_not_terminator() {
        on_fresh_thread(|| {
            let printed = Rc::new(RefCell::new(String::new()));
            let sink = printed.clone();
            CallbackRegistry::new()
                .with_write_console_ex(create_write_console_ex(move |text, _| {
                    sink.borrow_mut().push_str(text);
                }))
                .install()
                .unwrap();

            let bytes = b"abcdef";
            unsafe { write_console_ex_trampoline(bytes.as_ptr().cast(), 3, 0) };
            unsafe { write_console_ex_trampoline(bytes.as_ptr().cast(), 0, 0) };
            unsafe { write_console_ex_trampoline(std::ptr::null(), 4, 0) };
            assert_eq!(*printed.borrow(), "abc");
        });
    }

    #[test]
    fn test_invalid_utf8_is_decoded_lossily() {
        let printed = Rc::new(RefCell::new(String::new()));
        let sink = printed.clone();
        let adapter = create_write_console_ex(move |text, _| sink.borrow_mut().push_str(text));
        adapter.write(&[b'o', 0xFF, b'k'], 0);
        assert_eq!(*printed.borrow(), "o\u{FFFD}k");
    }

    #[test]
    fn test_second_install_is_refused() {
        on_fresh_thread(|| {
            CallbackRegistry::new().install().unwrap();
            assert!(matches!(
                CallbackRegistry::new().install(),
                Err(RuntimeError::RegistryInstalled)
            ));
        });
    }

    #[test]
    fn test_panicking_producer_reads_as_end_of_input() {
        on_fresh_thread(|| {
            CallbackRegistry::new()
                .with_read_console(create_read_console(|_| panic!("producer blew up")))
                .install()
                .unwrap();
            let mut buf = [SENTINEL; 8];
            let status = unsafe {
                read_console_trampoline(std::ptr::null(), buf.as_mut_ptr(), 8, 0)
            };
            assert_eq!(status, 0);
        });
    }

    #[test]
    fn test_nested_read_is_refused() {
        on_fresh_thread(|| {
            let inner_status = Rc::new(Cell::new(-1));
            let seen = inner_status.clone();
            CallbackRegistry::new()
                .with_read_console(create_read_console(move |_| {
                    let mut inner = [0u8; 8];
                    let status = unsafe {
                        read_console_trampoline(std::ptr::null(), inner.as_mut_ptr(), 8, 0)
                    };
                    seen.set(status);
                    Some("outer".to_string())
                }))
                .install()
                .unwrap();

            let mut buf = [0u8; 16];
            let status =
                unsafe { read_console_trampoline(std::ptr::null(), buf.as_mut_ptr(), 16, 0) };
            assert_eq!(status, 1);
            assert_eq!(inner_status.get(), 0);
            assert_eq!(&buf[..7], b"outer\n\0");
        });
    }

    #[test]
    fn test_clean_up_and_show_message() {
        on_fresh_thread(|| {
            let events = Rc::new(RefCell::new(Vec::new()));
            let clean = events.clone();
            let shown = events.clone();
            CallbackRegistry::new()
                .with_clean_up(move |save, status, run_last| {
                    clean
                        .borrow_mut()
                        .push(format!("{:?} {} {}", save, status, run_last));
                })
                .with_show_message(move |message| shown.borrow_mut().push(message.to_string()))
                .install()
                .unwrap();

            let message = CString::new("note").unwrap();
            unsafe {
                show_message_trampoline(message.as_ptr());
                clean_up_trampoline(3, 0, 1);
            }
            assert_eq!(*events.borrow(), vec!["note", "NoSave 0 true"]);
        });
    }

    #[test]
    fn test_clean_up_chains_to_previous_handler() {
        thread_local! {
            static CHAINED: Cell<Option<(c_int, c_int, c_int)>> = const { Cell::new(None) };
        }
        unsafe extern "C" fn default_clean_up(save: c_int, status: c_int, run_last: c_int) {
            CHAINED.with(|c| c.set(Some((save, status, run_last))));
        }

        on_fresh_thread(|| {
            let order = Rc::new(RefCell::new(Vec::new()));
            let host = order.clone();
            let registry = CallbackRegistry::new()
                .with_clean_up(move |_, _, _| {
                    host.borrow_mut().push("host");
                    // The default has not run yet.
                    assert!(CHAINED.with(|c| c.get()).is_none());
                })
                .install()
                .unwrap();

            let mut read: Option<ReadConsoleFn> = None;
            let mut write: Option<crate::ffi::WriteConsoleFn> = None;
            let mut write_ex: Option<WriteConsoleExFn> = None;
            let mut clean_up: Option<CleanUpFn> = Some(default_clean_up);
            let mut show: Option<ShowMessageFn> = None;
            let slots = Slots {
                read_console: &mut read,
                write_console: &mut write,
                write_console_ex: &mut write_ex,
                clean_up: &mut clean_up,
                show_message: &mut show,
            };
            unsafe { registry.bind(&slots) };
            let bound = clean_up.expect("clean-up slot bound");
            unsafe { bound(4, 2, 1) };

            assert_eq!(*order.borrow(), vec!["host"]);
            assert_eq!(CHAINED.with(|c| c.get()), Some((4, 2, 1)));
        });
    }

    #[test]
    fn test_output_type_and_save_action_decoding() {
        assert_eq!(OutputType::from_raw(0), OutputType::Standard);
        assert_eq!(OutputType::from_raw(1), OutputType::Error);
        assert_eq!(OutputType::from_raw(-2), OutputType::Error);
        assert_eq!(SaveAction::from_raw(2), SaveAction::Default);
        assert_eq!(SaveAction::from_raw(42), SaveAction::Unknown(42));
    }

    #[test]
    fn test_bind_writes_slots() {
        on_fresh_thread(|| {
            let registry = CallbackRegistry::new()
                .with_read_console(create_read_console(|_| None))
                .with_write_console_ex(create_write_console_ex(|_, _| {}))
                .install()
                .unwrap();

            unsafe extern "C" fn stale_writer(_: *const c_char, _: c_int) {}

            let mut read: Option<ReadConsoleFn> = None;
            let mut write: Option<crate::ffi::WriteConsoleFn> = Some(stale_writer);
            let mut write_ex: Option<WriteConsoleExFn> = None;
            let mut clean_up: Option<CleanUpFn> = None;
            let mut show: Option<ShowMessageFn> = None;
            let slots = Slots {
                read_console: &mut read,
                write_console: &mut write,
                write_console_ex: &mut write_ex,
                clean_up: &mut clean_up,
                show_message: &mut show,
            };
            unsafe { registry.bind(&slots) };

            assert!(read.is_some());
            assert!(write.is_none());
            assert!(write_ex.is_some());
            assert!(clean_up.is_none());
            assert!(show.is_none());
        });
    }
}
