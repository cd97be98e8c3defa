/*!
Locating the R installation

R finds its own resources through `R_HOME` and three derived variables. They
have to be in the process environment before `libR` is loaded.
*/

use crate::error::DiscoveryError;
use crate::platform::Platform;
use std::path::{Path, PathBuf};
use std::process::Command;

pub const R_HOME: &str = "R_HOME";

/// Command used to ask R for its install root when `R_HOME` is unset
pub const R_COMMAND: &str = "R";

/// A located R installation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Installation {
    pub root: PathBuf,
    pub library: PathBuf,
}

impl Installation {
    /// Variables R consults internally, in the order they are exported
    pub fn environment(&self) -> Vec<(&'static str, PathBuf)> {
        resource_env(&self.root)
    }
}

/// Locate R: explicit root first, then `R_HOME`, then `R RHOME`
pub fn locate(explicit: Option<&Path>, platform: Platform) -> Result<Installation, DiscoveryError> {
    let root = match explicit {
        Some(path) => path.to_path_buf(),
        None => match std::env::var_os(R_HOME).filter(|v| !v.is_empty()) {
            Some(home) => PathBuf::from(home),
            None => query_root(R_COMMAND)?,
        },
    };
    from_root(root, platform)
}

/// Validate an install root and derive its shared library path
pub fn from_root(root: PathBuf, platform: Platform) -> Result<Installation, DiscoveryError> {
    if !root.is_dir() {
        return Err(DiscoveryError::RootNotFound { path: root });
    }

    let library = library_path(&root, platform);
    if !library.exists() {
        return Err(DiscoveryError::LibraryNotFound { path: library });
    }

    tracing::debug!(root = %root.display(), library = %library.display(), "located R");
    Ok(Installation { root, library })
}

/// Run `<command> RHOME` and return the trimmed output
pub fn query_root(command: &str) -> Result<PathBuf, DiscoveryError> {
    let output = Command::new(command)
        .arg("RHOME")
        .output()
        .map_err(|source| DiscoveryError::CommandFailed {
            command: command.to_string(),
            source,
        })?;

    if !output.status.success() {
        return Err(DiscoveryError::CommandStatus {
            command: command.to_string(),
            status: output.status.to_string(),
        });
    }

    let root = String::from_utf8_lossy(&output.stdout).trim().to_string();
    if root.is_empty() {
        return Err(DiscoveryError::EmptyRoot {
            command: command.to_string(),
        });
    }
    Ok(PathBuf::from(root))
}

/// Platform-specific location of the R shared library under `root`
pub fn library_path(root: &Path, platform: Platform) -> PathBuf {
    match platform {
        Platform::MacOs => root.join("lib").join("libR.dylib"),
        Platform::Windows => {
            let arch = if cfg!(target_pointer_width = "64") {
                "x64"
            } else {
                "i386"
            };
            root.join("bin").join(arch).join("R.dll")
        }
        Platform::Linux | Platform::Other => root.join("lib").join("libR.so"),
    }
}

/// `R_HOME` plus the doc, include and share directories derived from it
pub fn resource_env(root: &Path) -> Vec<(&'static str, PathBuf)> {
    vec![
        (R_HOME, root.to_path_buf()),
        ("R_DOC_DIR", root.join("doc")),
        ("R_INCLUDE_DIR", root.join("include")),
        ("R_SHARE_DIR", root.join("share")),
    ]
}

/// Export the installation's resource variables into the process environment
///
/// # Safety
/// Mutates the process environment. Must run before any other thread could
/// read it, i.e. during single-threaded startup.
pub unsafe fn export_environment(installation: &Installation) {
    for (name, value) in installation.environment() {
        tracing::trace!(name, value = %value.display(), "export");
        unsafe { std::env::set_var(name, value) };
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn fake_root(platform: Platform) -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        let lib = library_path(dir.path(), platform);
        fs::create_dir_all(lib.parent().unwrap()).unwrap();
        fs::write(&lib, b"").unwrap();
        dir
    }

    #[test]
    fn test_library_path_per_platform() {
        let root = Path::new("/opt/R");
        assert_eq!(
            library_path(root, Platform::Linux),
            PathBuf::from("/opt/R/lib/libR.so")
        );
        assert_eq!(
            library_path(root, Platform::MacOs),
            PathBuf::from("/opt/R/lib/libR.dylib")
        );
        let dll = library_path(root, Platform::Windows);
        assert!(dll.ends_with("R.dll"));
        assert!(dll.starts_with("/opt/R/bin"));
    }

    #[test]
    fn test_from_root_finds_library() {
        let dir = fake_root(Platform::Linux);
        let found = from_root(dir.path().to_path_buf(), Platform::Linux).unwrap();
        assert_eq!(found.root, dir.path());
        assert!(found.library.ends_with("lib/libR.so"));
    }

    #[test]
    fn test_missing_library() {
        let dir = tempfile::tempdir().unwrap();
        let err = from_root(dir.path().to_path_buf(), Platform::Linux).unwrap_err();
        match err {
            DiscoveryError::LibraryNotFound { path } => {
                assert!(path.ends_with("lib/libR.so"));
            }
            other => panic!("Expected LibraryNotFound, got {:?}", other),
        }
    }

    #[test]
    fn test_missing_root() {
        let err = from_root(PathBuf::from("/nonexistent/rhost/R"), Platform::Linux).unwrap_err();
        assert!(matches!(err, DiscoveryError::RootNotFound { .. }));
    }

    #[test]
    fn test_explicit_root_wins() {
        let dir = fake_root(Platform::MacOs);
        let found = locate(Some(dir.path()), Platform::MacOs).unwrap();
        assert!(found.library.ends_with("libR.dylib"));
    }

    #[test]
    fn test_resource_env() {
        let env = resource_env(Path::new("/usr/lib/R"));
        let names: Vec<_> = env.iter().map(|(name, _)| *name).collect();
        assert_eq!(names, ["R_HOME", "R_DOC_DIR", "R_INCLUDE_DIR", "R_SHARE_DIR"]);
        assert_eq!(env[3].1, PathBuf::from("/usr/lib/R/share"));
    }

    #[test]
    fn test_query_root_missing_command() {
        let err = query_root("rhost-no-such-command").unwrap_err();
        assert!(matches!(err, DiscoveryError::CommandFailed { .. }));
    }
}
