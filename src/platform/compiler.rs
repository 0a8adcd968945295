// src/platform/compiler.rs

//! C compiler identity and subprocess queries
//!
//! Flag composition needs two facts only the compiler itself can answer:
//! its version, and where its bundled include directories live. Both are
//! short-lived subprocess queries. A query that cannot run, exits non-zero,
//! or prints something unparsable is an error; there is no silent default.

use crate::error::{Error, Result};
use crate::version::Version;
use serde::{Deserialize, Serialize};
use std::ffi::OsStr;
use std::fmt;
use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::debug;

/// Compiler family
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CompilerKind {
    Gcc,
    Clang,
    Unknown,
}

impl CompilerKind {
    /// Classify a `--version` banner
    fn from_banner(banner: &str) -> Self {
        let lower = banner.to_lowercase();
        if lower.contains("clang") {
            Self::Clang
        } else if lower.contains("gcc") || lower.contains("free software foundation") {
            Self::Gcc
        } else {
            Self::Unknown
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Gcc => "gcc",
            Self::Clang => "clang",
            Self::Unknown => "cc",
        }
    }
}

/// Identity of the compiler a build will use
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ToolchainId {
    pub kind: CompilerKind,
    pub path: PathBuf,
    pub version: Version,
}

impl fmt::Display for ToolchainId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} ({})",
            self.kind.name(),
            self.version,
            self.path.display()
        )
    }
}

/// Questions asked of the active compiler during flag composition
pub trait CompilerProbe {
    /// The compiler's version
    fn version(&self) -> Result<Version>;

    /// Resolve a file the compiler ships with (`--print-file-name=<name>`)
    fn print_file_name(&self, name: &str) -> Result<PathBuf>;
}

/// A compiler executable on the host
#[derive(Debug, Clone)]
pub struct HostCompiler {
    path: PathBuf,
}

impl HostCompiler {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    /// The compiler named by `$CC`, falling back to `cc`, resolved on `PATH`
    pub fn from_env() -> Result<Self> {
        let cc = std::env::var("CC").unwrap_or_else(|_| "cc".to_string());
        let path = which::which(&cc)
            .map_err(|e| Error::query(format!("which {}", cc), e.to_string()))?;
        Ok(Self::new(path))
    }

    /// Query the compiler's family and version
    pub fn identify(&self) -> Result<ToolchainId> {
        let banner = run_query(self.path.as_os_str(), &["--version"])?;
        let version = Version::find_in(&banner).ok_or_else(|| {
            Error::query(
                format!("{} --version", self.path.display()),
                format!("no version in output: {}", banner),
            )
        })?;

        Ok(ToolchainId {
            kind: CompilerKind::from_banner(&banner),
            path: self.path.clone(),
            version,
        })
    }
}

impl CompilerProbe for HostCompiler {
    fn version(&self) -> Result<Version> {
        self.identify().map(|id| id.version)
    }

    fn print_file_name(&self, name: &str) -> Result<PathBuf> {
        let arg = format!("--print-file-name={}", name);
        let output = run_query(self.path.as_os_str(), &[&arg])?;

        // gcc echoes the bare name back when it cannot find the file
        if output.is_empty() || output == name {
            return Err(Error::query(
                format!("{} {}", self.path.display(), arg),
                format!("compiler does not provide '{}'", name),
            ));
        }

        Ok(PathBuf::from(output))
    }
}

/// Run a host query and return its trimmed stdout
pub(crate) fn run_query(program: &OsStr, args: &[&str]) -> Result<String> {
    let command_line = format!("{} {}", program.to_string_lossy(), args.join(" "));
    debug!("Querying host: {}", command_line);

    let output = Command::new(program)
        .args(args)
        .output()
        .map_err(|e| Error::query(&command_line, e.to_string()))?;

    if !output.status.success() {
        return Err(Error::query(
            &command_line,
            format!(
                "exited with {}: {}",
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            ),
        ));
    }

    let stdout = String::from_utf8(output.stdout)
        .map_err(|e| Error::query(&command_line, format!("non-UTF-8 output: {}", e)))?;

    Ok(stdout.trim().to_string())
}
