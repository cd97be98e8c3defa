/*!
RuntimeHandle - the loaded, initialized R library

Lifecycle, once per process:
1. `initialize`: locate R, export its environment, dlopen libR, set
   `R_running_as_main_program`, call `Rf_initialize_R`.
2. `run`: install and bind the console callbacks, enter `Rf_mainloop`. This
   only returns when R ends the session.
3. `post_setup` (lazy, from inside a callback): measure the integer payload
   offset. R's heap only exists once the main loop has started.
*/

use crate::callbacks::CallbackRegistry;
use crate::discovery;
use crate::error::{InitError, RuntimeError, RuntimeResult};
use crate::event_pump::NativeEvents;
use crate::ffi::Symbols;
use crate::library::Library;
use crate::options::{RuntimeOptions, read_integer};
use crate::platform::Platform;
use std::cell::OnceCell;
use std::ffi::{CString, c_char, c_int};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};

static INITIALIZED: AtomicBool = AtomicBool::new(false);
static RUNNING: AtomicBool = AtomicBool::new(false);

/// Probe value used to verify the measured payload offset
const OFFSET_SENTINEL: c_int = 0x5eed;

/// Largest header size the offset validation accepts
const MAX_HEADER_BYTES: isize = 256;

#[derive(Debug, Clone)]
pub struct InitOptions {
    /// Install root; falls back to `R_HOME`, then `R RHOME`
    pub r_home: Option<PathBuf>,
    /// `argv[0]` handed to R
    pub program_name: String,
}

impl Default for InitOptions {
    fn default() -> Self {
        InitOptions {
            r_home: None,
            program_name: "rhost".to_string(),
        }
    }
}

/// The fixed argument vector R is initialized with
pub fn startup_args(program_name: &str) -> Vec<String> {
    vec![
        program_name.to_string(),
        "--no-save".to_string(),
        "--quiet".to_string(),
    ]
}

/// Byte distance from an object's address to its payload
pub fn payload_offset(object: usize, payload: usize) -> isize {
    (payload as isize).wrapping_sub(object as isize)
}

/// Reject offsets that cannot be a vector header on any R build we know
pub fn validate_offset(offset: isize) -> RuntimeResult<isize> {
    let align = std::mem::align_of::<c_int>() as isize;
    if offset <= 0 || offset >= MAX_HEADER_BYTES || offset % align != 0 {
        return Err(RuntimeError::LayoutMismatch { offset });
    }
    Ok(offset)
}

#[derive(Debug)]
pub struct RuntimeHandle {
    library: Library,
    symbols: Symbols,
    platform: Platform,
    int_offset: OnceCell<isize>,
}

impl RuntimeHandle {
    /// Load and initialize R. Succeeds at most once per process.
    pub fn initialize(options: &InitOptions) -> RuntimeResult<Self> {
        let platform = Platform::current();
        platform.require_dynamic_loading()?;

        let installation = discovery::locate(options.r_home.as_deref(), platform)?;
        if INITIALIZED.load(Ordering::SeqCst) {
            return Err(InitError::AlreadyInitialized.into());
        }

        // SAFETY: called during startup before any other thread exists.
        unsafe { discovery::export_environment(&installation) };

        let library = Library::open(&installation.library)?;
        let symbols = Symbols::resolve(&library)?;

        let args = startup_args(&options.program_name)
            .into_iter()
            .map(|arg| CString::new(arg.clone()).map_err(|_| InitError::InvalidArgument(arg)))
            .collect::<Result<Vec<_>, _>>()?;
        let mut argv: Vec<*mut c_char> = args.iter().map(|a| a.as_ptr().cast_mut()).collect();

        // Only a call that reaches R uses up the one initialization.
        if INITIALIZED
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Err(InitError::AlreadyInitialized.into());
        }
        let code = unsafe {
            *symbols.running_as_main_program = 1;
            (symbols.initialize_r)(argv.len() as c_int, argv.as_mut_ptr())
        };
        if code != 0 {
            return Err(InitError::InitFailed { code }.into());
        }

        tracing::info!(
            root = %installation.root.display(),
            library = %library.path().display(),
            "R initialized"
        );

        Ok(RuntimeHandle {
            library,
            symbols,
            platform,
            int_offset: OnceCell::new(),
        })
    }

    /// Measure and validate the integer payload offset (cached)
    ///
    /// Allocates a scalar integer and diffs its address against `INTEGER()`.
    /// The result is an artifact of this R build's object layout and is
    /// checked by reading back a second sentinel scalar through it.
    ///
    /// Allocates, so it must not run before `run` has entered the main loop.
    pub fn post_setup(&self) -> RuntimeResult<isize> {
        if let Some(offset) = self.int_offset.get() {
            return Ok(*offset);
        }

        let s = &self.symbols;
        let offset = unsafe {
            let zero = (s.scalar_integer)(0);
            let offset = payload_offset(zero.0 as usize, (s.integer)(zero) as usize);
            validate_offset(offset)?;

            let sentinel = (s.protect)((s.scalar_integer)(OFFSET_SENTINEL));
            let read_back = read_integer(sentinel, offset);
            (s.unprotect)(1);
            if read_back != OFFSET_SENTINEL {
                return Err(RuntimeError::LayoutMismatch { offset });
            }
            offset
        };

        tracing::debug!(offset, "integer payload offset");
        Ok(*self.int_offset.get_or_init(|| offset))
    }

    /// R's pending-event step, for the inputhook
    pub fn events(&self) -> NativeEvents {
        NativeEvents::from_symbols(&self.symbols)
    }

    /// Typed access to R's options; runs `post_setup` if needed
    pub fn options(&self) -> RuntimeResult<RuntimeOptions> {
        let offset = self.post_setup()?;
        Ok(RuntimeOptions::new(self.symbols, offset))
    }

    /// `R.version.string`, e.g. "R version 4.4.1 (2024-06-14)"
    ///
    /// Evaluates R code, so like `post_setup` it must run inside the main loop.
    pub fn version(&self) -> Option<String> {
        let version = self.options().ok()?.variable("R.version.string")?;
        version.as_str().map(str::to_string)
    }

    /// Bind `callbacks` and enter R's main loop
    ///
    /// Blocks until R ends the session (end of input or `q()`). The registry
    /// is owned by the process from here on.
    pub fn run(&self, callbacks: CallbackRegistry) -> RuntimeResult<()> {
        self.platform.require_console_callbacks()?;

        if RUNNING
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Err(RuntimeError::AlreadyRunning);
        }

        let registry = callbacks.install()?;
        unsafe {
            registry.bind(&self.symbols.slots);
            // With these set R writes straight to the FILE* and the hooks
            // never see the text.
            if let Some(output) = self.symbols.output_file {
                *output = std::ptr::null_mut();
            }
            if let Some(console) = self.symbols.console_file {
                *console = std::ptr::null_mut();
            }
        }

        tracing::info!(library = %self.library.path().display(), "entering R main loop");
        unsafe { (self.symbols.mainloop)() };
        tracing::info!("R main loop returned");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_startup_args() {
        assert_eq!(startup_args("rhost"), ["rhost", "--no-save", "--quiet"]);
    }

    #[test]
    fn test_payload_offset() {
        assert_eq!(payload_offset(0x1000, 0x1030), 0x30);
        assert_eq!(payload_offset(0x1030, 0x1000), -0x30);
    }

    #[test]
    fn test_validate_offset() {
        assert_eq!(validate_offset(48).unwrap(), 48);
        assert_eq!(validate_offset(40).unwrap(), 40);
        for bad in [0, -8, 6, 256, 4096] {
            match validate_offset(bad) {
                Err(RuntimeError::LayoutMismatch { offset }) => assert_eq!(offset, bad),
                other => panic!("Expected LayoutMismatch for {}, got {:?}", bad, other),
            }
        }
    }

    #[test]
    fn test_layout_error_message_is_descriptive() {
        let message = validate_offset(3).unwrap_err().to_string();
        assert!(message.contains("offset 3"));
        assert!(message.contains("R version"));
    }

    #[test]
    fn test_missing_install_fails_before_loading() {
        let options = InitOptions {
            r_home: Some(PathBuf::from("/nonexistent/rhost/R")),
            ..InitOptions::default()
        };
        let err = RuntimeHandle::initialize(&options).unwrap_err();
        assert!(matches!(err, RuntimeError::Discovery(_)));
        // Discovery failures do not consume the one-shot initialization.
        assert!(!INITIALIZED.load(Ordering::SeqCst));
    }

    #[cfg(unix)]
    #[test]
    fn test_failed_load_can_be_retried() {
        let dir = tempfile::tempdir().unwrap();
        let library = discovery::library_path(dir.path(), Platform::current());
        std::fs::create_dir_all(library.parent().unwrap()).unwrap();
        std::fs::write(&library, b"not a shared object").unwrap();

        let options = InitOptions {
            r_home: Some(dir.path().to_path_buf()),
            ..InitOptions::default()
        };
        // The second attempt reports the real cause again, not AlreadyInitialized.
        for _ in 0..2 {
            match RuntimeHandle::initialize(&options) {
                Err(RuntimeError::Init(InitError::LoadFailed { path, .. })) => {
                    assert_eq!(path, library);
                }
                Err(other) => panic!("Expected LoadFailed, got {:?}", other),
                Ok(_) => panic!("Expected LoadFailed, got a handle"),
            }
        }
        assert!(!INITIALIZED.load(Ordering::SeqCst));
    }
}
