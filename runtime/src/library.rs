/*!
Shared library loading via dlopen/dlsym

The library is opened RTLD_GLOBAL so that R's own packages can resolve
symbols from it, and it is never closed: R keeps pointers into itself and
into our callbacks for the life of the process.
*/

use crate::error::InitError;
use std::ffi::c_void;
use std::path::{Path, PathBuf};

#[derive(Debug)]
pub struct Library {
    handle: *mut c_void,
    path: PathBuf,
}

impl Library {
    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[cfg(unix)]
mod imp {
    use super::Library;
    use crate::error::InitError;
    use std::ffi::{CStr, CString, c_void};
    use std::os::unix::ffi::OsStrExt;
    use std::path::Path;

    fn last_error() -> String {
        let message = unsafe { libc::dlerror() };
        if message.is_null() {
            "unknown dlopen error".to_string()
        } else {
            unsafe { CStr::from_ptr(message) }
                .to_string_lossy()
                .into_owned()
        }
    }

    impl Library {
        /// Open the library at `path`
        pub fn open(path: &Path) -> Result<Self, InitError> {
            let c_path =
                CString::new(path.as_os_str().as_bytes()).map_err(|_| InitError::LoadFailed {
                    path: path.to_path_buf(),
                    reason: "path contains a NUL byte".to_string(),
                })?;

            let handle =
                unsafe { libc::dlopen(c_path.as_ptr(), libc::RTLD_NOW | libc::RTLD_GLOBAL) };
            if handle.is_null() {
                return Err(InitError::LoadFailed {
                    path: path.to_path_buf(),
                    reason: last_error(),
                });
            }

            tracing::debug!(path = %path.display(), "opened shared library");
            Ok(Library {
                handle,
                path: path.to_path_buf(),
            })
        }

        /// Address of an exported function or variable, if present
        pub fn optional(&self, name: &'static str) -> Option<*mut c_void> {
            let c_name = CString::new(name).ok()?;
            let address = unsafe { libc::dlsym(self.handle, c_name.as_ptr()) };
            if address.is_null() {
                tracing::debug!(symbol = name, "optional symbol not exported");
                None
            } else {
                Some(address)
            }
        }
    }
}

#[cfg(not(unix))]
impl Library {
    pub fn open(path: &Path) -> Result<Self, InitError> {
        Err(InitError::LoadFailed {
            path: path.to_path_buf(),
            reason: "dynamic loading is not implemented on this platform".to_string(),
        })
    }

    pub fn optional(&self, _name: &'static str) -> Option<*mut c_void> {
        None
    }
}

impl Library {
    /// Address of an exported function or variable R is required to provide
    pub fn symbol(&self, name: &'static str) -> Result<*mut c_void, InitError> {
        self.optional(name).ok_or(InitError::MissingSymbol { name })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_missing_library() {
        let err = Library::open(Path::new("/nonexistent/libR.so")).unwrap_err();
        match err {
            InitError::LoadFailed { path, reason } => {
                assert_eq!(path, PathBuf::from("/nonexistent/libR.so"));
                assert!(!reason.is_empty());
            }
            other => panic!("Expected LoadFailed, got {:?}", other),
        }
    }

    #[cfg(all(target_os = "linux", target_env = "gnu"))]
    #[test]
    fn test_resolve_from_libc() {
        let lib = Library::open(Path::new("libc.so.6")).unwrap();
        assert!(lib.symbol("getpid").is_ok());
        assert!(!lib.handle.is_null());
        let err = lib.symbol("rhost_no_such_symbol").unwrap_err();
        assert!(matches!(
            err,
            InitError::MissingSymbol {
                name: "rhost_no_such_symbol"
            }
        ));
    }
}
