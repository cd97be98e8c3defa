/*!
Error types for the R bridge

Everything here is fatal at startup. Errors raised inside a console callback
never reach these types; the adapters recover locally.
*/

use crate::platform::Platform;
use std::path::PathBuf;

/// The R install root or its shared library could not be located
#[derive(Debug, thiserror::Error)]
pub enum DiscoveryError {
    #[error("R_HOME is not set and `{command} RHOME` could not be run: {source}")]
    CommandFailed {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("`{command} RHOME` exited with {status}")]
    CommandStatus { command: String, status: String },

    #[error("`{command} RHOME` printed an empty install root")]
    EmptyRoot { command: String },

    #[error("R install root {path} does not exist")]
    RootNotFound { path: PathBuf },

    #[error("cannot locate R shared library at {path}")]
    LibraryNotFound { path: PathBuf },
}

/// Loading or initializing the R library failed
#[derive(Debug, thiserror::Error)]
pub enum InitError {
    #[error("failed to load {path}: {reason}")]
    LoadFailed { path: PathBuf, reason: String },

    #[error("R library does not export `{name}`")]
    MissingSymbol { name: &'static str },

    #[error("Rf_initialize_R returned {code}")]
    InitFailed { code: i32 },

    #[error("the R runtime has already been initialized in this process")]
    AlreadyInitialized,

    #[error("argument {0:?} contains an interior NUL byte")]
    InvalidArgument(String),
}

#[derive(Debug, thiserror::Error)]
pub enum RuntimeError {
    #[error(transparent)]
    Discovery(#[from] DiscoveryError),

    #[error(transparent)]
    Init(#[from] InitError),

    #[error("embedding R is not supported on {platform}")]
    Unsupported { platform: Platform },

    #[error("an R main loop is already running in this process")]
    AlreadyRunning,

    #[error("console callbacks are already installed on this thread")]
    RegistryInstalled,

    #[error(
        "unexpected R object layout: integer payload offset {offset} bytes; \
         this R version stores scalars differently than the bridge assumes"
    )]
    LayoutMismatch { offset: isize },
}

pub type RuntimeResult<T> = Result<T, RuntimeError>;
