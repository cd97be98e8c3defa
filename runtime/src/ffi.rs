/*!
Native types and the resolved libR symbol table

Signatures follow R's `Rinterface.h` / `Rinternals.h` / `R_ext/eventloop.h`.
Anything that can raise an R error while a Rust frame is live goes through
`R_ToplevelExec` or `R_tryEvalSilent`; an R error is a longjmp and would skip
Rust destructors.
The console hook slots are global function pointers inside libR:

- ptr_R_ReadConsole:    int  (*)(const char *prompt, unsigned char *buf, int len, int addtohistory)
- ptr_R_WriteConsole:   void (*)(const char *buf, int len)
- ptr_R_WriteConsoleEx: void (*)(const char *buf, int len, int otype)
- ptr_R_CleanUp:        void (*)(SA_TYPE saveact, int status, int runLast)
- ptr_R_ShowMessage:    void (*)(const char *msg)

`Option<extern "C" fn>` has the same layout as a nullable function pointer,
so each slot is addressed as `*mut Option<F>`.
*/

use crate::error::InitError;
use crate::library::Library;
use std::ffi::{c_char, c_int, c_uchar, c_void};

/// An R object pointer (`SEXP`)
#[repr(transparent)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Sexp(pub *mut c_void);

impl Sexp {
    pub fn is_null(self) -> bool {
        self.0.is_null()
    }
}

pub type ReadConsoleFn = unsafe extern "C" fn(*const c_char, *mut c_uchar, c_int, c_int) -> c_int;
pub type WriteConsoleFn = unsafe extern "C" fn(*const c_char, c_int);
pub type WriteConsoleExFn = unsafe extern "C" fn(*const c_char, c_int, c_int);
pub type CleanUpFn = unsafe extern "C" fn(c_int, c_int, c_int);
pub type ShowMessageFn = unsafe extern "C" fn(*const c_char);

/// Body run by `R_ToplevelExec`; an R error inside it unwinds only to there
pub type ToplevelFn = unsafe extern "C" fn(*mut c_void);

/// SEXPTYPE codes the option decoder understands
pub mod sexptype {
    pub const LGLSXP: i32 = 10;
    pub const INTSXP: i32 = 13;
    pub const REALSXP: i32 = 14;
    pub const STRSXP: i32 = 16;
}

/// R's integer (and logical) missing value
pub const NA_INTEGER: i32 = i32::MIN;

/// Addresses of the console hook slots
#[derive(Debug, Clone, Copy)]
pub struct Slots {
    pub read_console: *mut Option<ReadConsoleFn>,
    pub write_console: *mut Option<WriteConsoleFn>,
    pub write_console_ex: *mut Option<WriteConsoleExFn>,
    pub clean_up: *mut Option<CleanUpFn>,
    pub show_message: *mut Option<ShowMessageFn>,
}

/// Every libR entry point and global the bridge touches
#[derive(Debug, Clone, Copy)]
pub struct Symbols {
    pub initialize_r: unsafe extern "C" fn(c_int, *mut *mut c_char) -> c_int,
    pub mainloop: unsafe extern "C" fn(),
    pub running_as_main_program: *mut c_int,
    pub slots: Slots,

    // Event loop
    pub process_events: unsafe extern "C" fn(),
    pub check_activity: Option<unsafe extern "C" fn(c_int, c_int) -> *mut c_void>,
    pub run_handlers: Option<unsafe extern "C" fn(*mut c_void, *mut c_void)>,
    pub input_handlers: Option<*mut *mut c_void>,

    // Error containment: both return with R's error state reset
    pub toplevel_exec: unsafe extern "C" fn(Option<ToplevelFn>, *mut c_void) -> c_int,
    pub try_eval_silent: unsafe extern "C" fn(Sexp, Sexp, *mut c_int) -> Sexp,
    pub global_env: *mut Sexp,

    // FILE* globals that bypass the console hooks when set
    pub output_file: Option<*mut *mut c_void>,
    pub console_file: Option<*mut *mut c_void>,

    // Object introspection
    pub scalar_integer: unsafe extern "C" fn(c_int) -> Sexp,
    pub integer: unsafe extern "C" fn(Sexp) -> *mut c_int,
    pub real: unsafe extern "C" fn(Sexp) -> *mut f64,
    pub protect: unsafe extern "C" fn(Sexp) -> Sexp,
    pub unprotect: unsafe extern "C" fn(c_int),
    pub install: unsafe extern "C" fn(*const c_char) -> Sexp,
    pub get_option1: unsafe extern "C" fn(Sexp) -> Sexp,
    pub type_of: unsafe extern "C" fn(Sexp) -> c_int,
    pub length: unsafe extern "C" fn(Sexp) -> c_int,
    pub string_elt: unsafe extern "C" fn(Sexp, isize) -> Sexp,
    pub r_char: unsafe extern "C" fn(Sexp) -> *const c_char,
    pub nil_value: *mut Sexp,
}

macro_rules! function {
    ($lib:expr, $name:literal) => {{
        let address = $lib.symbol($name)?;
        unsafe { std::mem::transmute::<*mut c_void, _>(address) }
    }};
}

macro_rules! optional_function {
    ($lib:expr, $name:literal) => {
        $lib.optional($name)
            .map(|address| unsafe { std::mem::transmute::<*mut c_void, _>(address) })
    };
}

impl Symbols {
    /// Resolve the symbol table from a loaded libR
    pub fn resolve(lib: &Library) -> Result<Self, InitError> {
        let slots = Slots {
            read_console: lib.symbol("ptr_R_ReadConsole")?.cast(),
            write_console: lib.symbol("ptr_R_WriteConsole")?.cast(),
            write_console_ex: lib.symbol("ptr_R_WriteConsoleEx")?.cast(),
            clean_up: lib.symbol("ptr_R_CleanUp")?.cast(),
            show_message: lib.symbol("ptr_R_ShowMessage")?.cast(),
        };

        Ok(Symbols {
            initialize_r: function!(lib, "Rf_initialize_R"),
            mainloop: function!(lib, "Rf_mainloop"),
            running_as_main_program: lib.symbol("R_running_as_main_program")?.cast(),
            slots,

            process_events: function!(lib, "R_ProcessEvents"),
            check_activity: optional_function!(lib, "R_checkActivity"),
            run_handlers: optional_function!(lib, "R_runHandlers"),
            input_handlers: lib.optional("R_InputHandlers").map(|a| a.cast()),

            toplevel_exec: function!(lib, "R_ToplevelExec"),
            try_eval_silent: function!(lib, "R_tryEvalSilent"),
            global_env: lib.symbol("R_GlobalEnv")?.cast(),

            output_file: lib.optional("R_Outputfile").map(|a| a.cast()),
            console_file: lib.optional("R_Consolefile").map(|a| a.cast()),

            scalar_integer: function!(lib, "Rf_ScalarInteger"),
            integer: function!(lib, "INTEGER"),
            real: function!(lib, "REAL"),
            protect: function!(lib, "Rf_protect"),
            unprotect: function!(lib, "Rf_unprotect"),
            install: function!(lib, "Rf_install"),
            get_option1: function!(lib, "Rf_GetOption1"),
            type_of: function!(lib, "TYPEOF"),
            length: function!(lib, "Rf_length"),
            string_elt: function!(lib, "STRING_ELT"),
            r_char: function!(lib, "R_CHAR"),
            nil_value: lib.symbol("R_NilValue")?.cast(),
        })
    }
}
