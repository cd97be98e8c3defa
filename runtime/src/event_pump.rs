/*!
Inputhook - lets R service its own events while the prompt waits for a key

Cooperative polling on the single thread both sides share: check whether
terminal input is ready, and if not run one R event step and sleep. There is
no timeout; the loop ends the moment input is ready. A slow R event handler
delays keystrokes, which is accepted.

An R error raised by an event handler must not longjmp through the prompt:
the native step runs under `R_ToplevelExec`, and a failed step is logged and
the wait goes on.
*/

use crate::ffi::{Symbols, ToplevelFn};
use std::ffi::{c_int, c_void};
use std::io;
use std::time::Duration;

/// Default polling interval (1/30 s)
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_nanos(1_000_000_000 / 30);

/// Something that can say whether a keypress is waiting
pub trait InputReadiness {
    fn input_ready(&mut self) -> io::Result<bool>;
}

/// A native event step ended in an R error
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("R event handler raised an error")]
pub struct EventStepFailed;

/// One step of the embedded runtime's pending-event processing
pub trait EventSource {
    fn process_events(&mut self) -> Result<(), EventStepFailed>;
}

/// Event source for use before R is loaded, or in tests
#[derive(Debug, Default, Clone, Copy)]
pub struct NoEvents;

impl EventSource for NoEvents {
    fn process_events(&mut self) -> Result<(), EventStepFailed> {
        Ok(())
    }
}

/// What one wait did
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PumpStats {
    /// Readiness checks performed, including the one that succeeded
    pub checks: usize,
    /// Native event steps run
    pub native_steps: usize,
    /// Steps that ended in an R error
    pub failed_steps: usize,
}

#[derive(Debug, Clone, Copy)]
pub struct EventPump {
    interval: Duration,
}

impl Default for EventPump {
    fn default() -> Self {
        Self::new(DEFAULT_POLL_INTERVAL)
    }
}

impl EventPump {
    pub fn new(interval: Duration) -> Self {
        EventPump { interval }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Block until `input` is ready, running `events` between checks
    pub fn wait_for_input<I, E>(&self, input: &mut I, events: &mut E) -> io::Result<PumpStats>
    where
        I: InputReadiness + ?Sized,
        E: EventSource + ?Sized,
    {
        let mut stats = PumpStats::default();
        loop {
            stats.checks += 1;
            if input.input_ready()? {
                return Ok(stats);
            }
            if let Err(err) = events.process_events() {
                stats.failed_steps += 1;
                tracing::warn!(%err, "event step failed, still waiting for input");
            }
            stats.native_steps += 1;
            if !self.interval.is_zero() {
                std::thread::sleep(self.interval);
            }
        }
    }
}

/// R's event step: `R_ProcessEvents` plus the fd input handlers
#[derive(Debug, Clone, Copy)]
pub struct NativeEvents {
    process_events: unsafe extern "C" fn(),
    check_activity: Option<unsafe extern "C" fn(c_int, c_int) -> *mut c_void>,
    run_handlers: Option<unsafe extern "C" fn(*mut c_void, *mut c_void)>,
    input_handlers: Option<*mut *mut c_void>,
    toplevel_exec: unsafe extern "C" fn(Option<ToplevelFn>, *mut c_void) -> c_int,
}

impl NativeEvents {
    pub(crate) fn from_symbols(symbols: &Symbols) -> Self {
        NativeEvents {
            process_events: symbols.process_events,
            check_activity: symbols.check_activity,
            run_handlers: symbols.run_handlers,
            input_handlers: symbols.input_handlers,
            toplevel_exec: symbols.toplevel_exec,
        }
    }
}

/// Body of one event step; `data` is the `NativeEvents` running it
///
/// Nothing here owns a destructor, so an R error unwinding out of it to
/// `R_ToplevelExec` skips no Rust cleanup.
unsafe extern "C" fn event_step(data: *mut c_void) {
    let events = unsafe { &*data.cast::<NativeEvents>() };
    unsafe { (events.process_events)() };

    if let (Some(check), Some(run), Some(handlers)) =
        (events.check_activity, events.run_handlers, events.input_handlers)
    {
        // Zero timeout, ignore stdin: the terminal owns stdin.
        unsafe {
            let ready = check(0, 1);
            run(*handlers, ready);
        }
    }
}

impl EventSource for NativeEvents {
    fn process_events(&mut self) -> Result<(), EventStepFailed> {
        let data = (self as *mut NativeEvents).cast::<c_void>();
        let completed = unsafe { (self.toplevel_exec)(Some(event_step as ToplevelFn), data) };
        if completed == 0 {
            Err(EventStepFailed)
        } else {
            Ok(())
        }
    }
}
