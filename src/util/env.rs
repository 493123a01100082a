//! Host interpreter detection.
//!
//! Development dependencies may be gated on the interpreter version of
//! the active environment. The MarkerEnvironment captures that version,
//! either probed from a `python` on PATH or injected directly.

use std::path::{Path, PathBuf};
use std::process::Command;

use miette::Diagnostic;
use semver::{Version, VersionReq};
use thiserror::Error;

use crate::util::version::parse_lenient;

const VERSION_PROBE: &str = "import sys; print('.'.join(str(v) for v in sys.version_info[:3]))";

/// Error while detecting the host interpreter.
#[derive(Debug, Error, Diagnostic)]
pub enum EnvError {
    #[error("no python interpreter found on PATH")]
    #[diagnostic(
        code(stanza::env::python_not_found),
        help("install python or add it to PATH")
    )]
    PythonNotFound,

    #[error("failed to run `{}`", .interpreter.display())]
    #[diagnostic(code(stanza::env::probe))]
    Probe {
        interpreter: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("`{}` could not report its version: {stderr}", .interpreter.display())]
    #[diagnostic(code(stanza::env::probe_failed))]
    ProbeFailed { interpreter: PathBuf, stderr: String },

    #[error("could not parse interpreter version `{output}`")]
    #[diagnostic(code(stanza::env::invalid_version))]
    InvalidVersion { output: String },
}

/// The environment dependency markers are evaluated against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarkerEnvironment {
    python_version: Version,
}

impl MarkerEnvironment {
    /// Build an environment with a known interpreter version.
    pub fn with_python_version(python_version: Version) -> Self {
        MarkerEnvironment { python_version }
    }

    /// Probe the interpreter found on PATH (`python3`, then `python`).
    pub fn detect() -> Result<Self, EnvError> {
        let interpreter = find_python().ok_or(EnvError::PythonNotFound)?;
        let python_version = probe_version(&interpreter)?;
        tracing::debug!(
            "detected python {} at {}",
            python_version,
            interpreter.display()
        );

        Ok(MarkerEnvironment { python_version })
    }

    /// The interpreter version of this environment.
    pub fn python_version(&self) -> &Version {
        &self.python_version
    }

    /// Check the interpreter against a constraint.
    pub fn satisfies(&self, req: &VersionReq) -> bool {
        req.matches(&self.python_version)
    }
}

/// Find a python interpreter on PATH.
pub fn find_python() -> Option<PathBuf> {
    for candidate in ["python3", "python"] {
        if let Ok(path) = which::which(candidate) {
            return Some(path);
        }
    }

    None
}

fn probe_version(interpreter: &Path) -> Result<Version, EnvError> {
    let output = Command::new(interpreter)
        .arg("-c")
        .arg(VERSION_PROBE)
        .output()
        .map_err(|source| EnvError::Probe {
            interpreter: interpreter.to_path_buf(),
            source,
        })?;

    if !output.status.success() {
        return Err(EnvError::ProbeFailed {
            interpreter: interpreter.to_path_buf(),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }

    let stdout = String::from_utf8_lossy(&output.stdout);
    let raw = stdout.trim();
    parse_lenient(raw).ok_or_else(|| EnvError::InvalidVersion {
        output: raw.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_environment() {
        let env = MarkerEnvironment::with_python_version(Version::new(3, 9, 7));

        assert_eq!(env.python_version(), &Version::new(3, 9, 7));
        assert!(env.satisfies(&"^3.8".parse().unwrap()));
        assert!(!env.satisfies(&"<3.6".parse().unwrap()));
    }

    #[test]
    fn test_probe_missing_interpreter() {
        let err = probe_version(Path::new("/nonexistent/python")).unwrap_err();
        assert!(matches!(err, EnvError::Probe { .. }));
    }

    #[cfg(unix)]
    #[test]
    fn test_probe_fake_interpreter() {
        use std::os::unix::fs::PermissionsExt;

        let tmp = tempfile::TempDir::new().unwrap();
        let fake = tmp.path().join("python");
        std::fs::write(&fake, "#!/bin/sh\necho 3.9.7\n").unwrap();
        std::fs::set_permissions(&fake, std::fs::Permissions::from_mode(0o755)).unwrap();

        let version = probe_version(&fake).unwrap();
        assert_eq!(version, Version::new(3, 9, 7));
    }

    #[cfg(unix)]
    #[test]
    fn test_probe_broken_interpreter() {
        use std::os::unix::fs::PermissionsExt;

        let tmp = tempfile::TempDir::new().unwrap();
        let fake = tmp.path().join("python");
        std::fs::write(&fake, "#!/bin/sh\necho boom >&2\nexit 1\n").unwrap();
        std::fs::set_permissions(&fake, std::fs::Permissions::from_mode(0o755)).unwrap();

        let err = probe_version(&fake).unwrap_err();
        match err {
            EnvError::ProbeFailed { stderr, .. } => assert_eq!(stderr, "boom"),
            other => panic!("expected probe failure, got {:?}", other),
        }
    }
}
