/*!
rhost runtime - embeds libR and bridges its console to the host

R is loaded in-process and driven through its own blocking main loop. The
host only regains control when R calls one of the console hooks registered
through `CallbackRegistry`; while the prompt waits for a key, the
`EventPump` hands R short slices of time to service its own events.

Edition 2024 compliant with proper unsafe annotations.
*/

pub mod callbacks;
pub mod discovery;
pub mod error;
pub mod event_pump;
pub mod ffi;
pub mod handle;
pub mod library;
pub mod options;
pub mod platform;

// Re-export main types
pub use callbacks::{
    CallbackRegistry, CycleOutcome, OutputType, ReadConsole, SaveAction, WriteConsoleEx,
    create_read_console, create_write_console_ex, prompt_loop,
};
pub use error::{DiscoveryError, InitError, RuntimeError, RuntimeResult};
pub use event_pump::{
    DEFAULT_POLL_INTERVAL, EventPump, EventSource, EventStepFailed, InputReadiness, NativeEvents,
    NoEvents, PumpStats,
};
pub use handle::{InitOptions, RuntimeHandle};
pub use options::{OptionValue, RuntimeOptions};
pub use platform::{Capabilities, Platform};
