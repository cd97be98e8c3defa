/*!
Platform capability table

The bridge only knows how to load R and rebind its console hooks on unix
hosts. Everything else fails closed with `RuntimeError::Unsupported`.
*/

use crate::error::RuntimeError;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    Linux,
    MacOs,
    Windows,
    Other,
}

/// What the bridge can do on a given platform
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Capabilities {
    /// Can load the R shared library and resolve its symbols
    pub dynamic_loading: bool,
    /// Can write the console callback slots before entering the main loop
    pub console_callbacks: bool,
}

impl Platform {
    /// The platform this binary was compiled for
    pub fn current() -> Self {
        if cfg!(target_os = "linux") {
            Platform::Linux
        } else if cfg!(target_os = "macos") {
            Platform::MacOs
        } else if cfg!(windows) {
            Platform::Windows
        } else {
            Platform::Other
        }
    }

    pub fn capabilities(self) -> Capabilities {
        match self {
            Platform::Linux | Platform::MacOs => Capabilities {
                dynamic_loading: true,
                console_callbacks: true,
            },
            // R.dll exposes its console hooks through the Rstart structure
            // rather than global pointer slots; not implemented.
            Platform::Windows => Capabilities {
                dynamic_loading: false,
                console_callbacks: false,
            },
            Platform::Other => Capabilities {
                dynamic_loading: false,
                console_callbacks: false,
            },
        }
    }

    /// Fail with `Unsupported` unless dynamic loading is available
    pub fn require_dynamic_loading(self) -> Result<(), RuntimeError> {
        if self.capabilities().dynamic_loading {
            Ok(())
        } else {
            Err(RuntimeError::Unsupported { platform: self })
        }
    }

    /// Fail with `Unsupported` unless console callbacks can be registered
    pub fn require_console_callbacks(self) -> Result<(), RuntimeError> {
        if self.capabilities().console_callbacks {
            Ok(())
        } else {
            Err(RuntimeError::Unsupported { platform: self })
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Platform::Linux => "linux",
            Platform::MacOs => "macos",
            Platform::Windows => "windows",
            Platform::Other => "unknown",
        };
        write!(f, "{}", name)
    }
}
