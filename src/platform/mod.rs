// src/platform/mod.rs

//! Host platform facts
//!
//! A [`PlatformProfile`] is an immutable snapshot of the host: OS family,
//! CPU architecture, OS and kernel versions, and the default C compiler.
//! Everything downstream (target resolution, flag composition, environment
//! sanitizing, dependency planning) is a function of the profile.
//!
//! The live profile is detected once per process through
//! [`PlatformProfile::current`]. Profiles for other hosts can be built
//! directly, which is how the resolution logic is tested.

mod compiler;

pub use compiler::{CompilerKind, CompilerProbe, HostCompiler, ToolchainId};
pub(crate) use compiler::run_query as run_host_query;

use crate::error::{Error, Result};
use crate::version::Version;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;
use strum_macros::{Display, EnumString};
use tracing::debug;

/// Operating system family
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(ascii_case_insensitive)]
pub enum OsFamily {
    #[strum(to_string = "macos", serialize = "darwin", serialize = "mac")]
    Macos,
    #[strum(to_string = "linux")]
    Linux,
}

impl OsFamily {
    /// Map a `std::env::consts::OS` value to a supported family
    pub fn from_consts(os: &str) -> Result<Self> {
        os.parse()
            .map_err(|_| Error::ConfigError(format!("Unsupported host operating system: {}", os)))
    }
}

/// CPU architecture
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(ascii_case_insensitive)]
pub enum CpuArch {
    /// x86_64 / AMD64
    #[strum(to_string = "x86_64", serialize = "amd64", serialize = "x64")]
    X86_64,
    /// AArch64 / ARM64
    #[strum(to_string = "aarch64", serialize = "arm64")]
    Aarch64,
}

impl CpuArch {
    /// Map a `std::env::consts::ARCH` value to a supported architecture
    pub fn from_consts(arch: &str) -> Result<Self> {
        arch.parse()
            .map_err(|_| Error::ConfigError(format!("Unsupported host architecture: {}", arch)))
    }

    /// Whether this is an ARM architecture
    pub fn is_arm(&self) -> bool {
        matches!(self, Self::Aarch64)
    }
}

/// Immutable snapshot of the build host
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PlatformProfile {
    pub os_family: OsFamily,
    pub cpu_arch: CpuArch,
    /// Marketing OS release on macOS, kernel release on Linux
    pub os_version: Version,
    /// Kernel release (`uname -r`)
    pub kernel_version: Version,
    pub default_compiler: ToolchainId,
}

impl PlatformProfile {
    /// Build a profile from explicit facts
    pub fn new(
        os_family: OsFamily,
        cpu_arch: CpuArch,
        os_version: Version,
        kernel_version: Version,
        default_compiler: ToolchainId,
    ) -> Self {
        Self {
            os_family,
            cpu_arch,
            os_version,
            kernel_version,
            default_compiler,
        }
    }

    /// The live host profile, detected on first use
    pub fn current() -> Result<&'static PlatformProfile> {
        static CURRENT: OnceLock<PlatformProfile> = OnceLock::new();

        if let Some(profile) = CURRENT.get() {
            return Ok(profile);
        }

        let detected = Self::detect()?;
        Ok(CURRENT.get_or_init(|| detected))
    }

    /// Introspect the host
    ///
    /// Prefer [`PlatformProfile::current`]; this runs the subprocess
    /// queries every time it is called.
    pub fn detect() -> Result<Self> {
        let os_family = OsFamily::from_consts(std::env::consts::OS)?;
        let cpu_arch = CpuArch::from_consts(std::env::consts::ARCH)?;

        let uname = nix::sys::utsname::uname()
            .map_err(|e| Error::query("uname", e.to_string()))?;
        let release = uname.release().to_string_lossy();
        let kernel_version = Version::parse(&release)
            .map_err(|e| Error::query("uname", e.to_string()))?;

        let os_version = match os_family {
            OsFamily::Macos => {
                let output = run_host_query("sw_vers".as_ref(), &["-productVersion"])?;
                Version::parse(&output)
                    .map_err(|e| Error::query("sw_vers -productVersion", e.to_string()))?
            }
            OsFamily::Linux => kernel_version,
        };

        let default_compiler = HostCompiler::from_env()?.identify()?;

        debug!(
            "Detected host: {} {} (os {}, kernel {}, {})",
            os_family, cpu_arch, os_version, kernel_version, default_compiler
        );

        Ok(Self::new(
            os_family,
            cpu_arch,
            os_version,
            kernel_version,
            default_compiler,
        ))
    }

    pub fn is_linux(&self) -> bool {
        self.os_family == OsFamily::Linux
    }

    pub fn is_macos(&self) -> bool {
        self.os_family == OsFamily::Macos
    }

    /// A compiler probe for this profile's default compiler
    pub fn compiler(&self) -> HostCompiler {
        HostCompiler::new(&self.default_compiler.path)
    }
}
