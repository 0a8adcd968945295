// src/portable/target.rs

//! Target triples and native/cross resolution
//!
//! On macOS a portable artifact is built for a pinned Darwin release. When
//! the running kernel's major release differs from the pin, configure must
//! be told explicitly that it builds on one release and produces code for
//! another. Linux has no pinned release and always resolves natively.

use crate::config::PinnedTarget;
use crate::platform::{CpuArch, OsFamily, PlatformProfile};
use crate::version::Version;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::warn;

/// `<arch>-<vendor>-<os><version>` target descriptor
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TargetTriple {
    pub arch: CpuArch,
    pub vendor: String,
    pub os: String,
    pub os_version: Version,
}

impl TargetTriple {
    /// A Darwin triple for the given release
    pub fn darwin(arch: CpuArch, os_version: Version) -> Self {
        Self {
            arch,
            vendor: "apple".to_string(),
            os: "darwin".to_string(),
            os_version,
        }
    }

    /// Whether the two triples straddle an OS major release
    pub fn is_cross(&self, other: &TargetTriple) -> bool {
        !self.os_version.same_major(&other.os_version)
    }
}

impl fmt::Display for TargetTriple {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}-{}-{}{}",
            self.arch, self.vendor, self.os, self.os_version
        )
    }
}

/// Outcome of target resolution
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Resolution {
    /// Build and host are the same release
    Native,
    /// Build on `build`, produce code for `host`
    Cross {
        build: TargetTriple,
        host: TargetTriple,
    },
}

impl Resolution {
    pub fn is_cross(&self) -> bool {
        matches!(self, Self::Cross { .. })
    }

    /// Configure arguments for this resolution
    pub fn configure_args(&self) -> Vec<String> {
        match self {
            Self::Native => Vec::new(),
            Self::Cross { build, host } => {
                vec![format!("--build={}", build), format!("--host={}", host)]
            }
        }
    }
}

/// Decide between a native and a cross-release build
pub fn resolve(profile: &PlatformProfile, pin: &PinnedTarget) -> Resolution {
    if profile.os_family != OsFamily::Macos {
        return Resolution::Native;
    }

    let build = TargetTriple::darwin(profile.cpu_arch, profile.kernel_version);
    let host = TargetTriple::darwin(profile.cpu_arch, pin.darwin);

    if build.is_cross(&host) {
        Resolution::Cross { build, host }
    } else {
        Resolution::Native
    }
}

/// Warning text when a macOS host is newer than the pinned release
///
/// Artifacts built on a newer macOS may not run on anything older than the
/// build host, whatever the configure arguments claim.
pub fn baseline_warning(profile: &PlatformProfile, pin: &PinnedTarget) -> Option<String> {
    if !profile.is_macos() || profile.kernel_version.major <= pin.darwin.major {
        return None;
    }

    Some(format!(
        "Building a portable artifact on a host newer than {} (Darwin {}); \
         it may not run on macOS releases older than this host ({}). \
         Build on {} for the widest compatibility.",
        pin.name, pin.darwin, profile.os_version, pin.name
    ))
}

/// Log [`baseline_warning`] if it applies
pub fn warn_if_newer_than_baseline(profile: &PlatformProfile, pin: &PinnedTarget) {
    if let Some(message) = baseline_warning(profile, pin) {
        warn!("{}", message);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::{CompilerKind, ToolchainId};
    use std::path::PathBuf;

    fn profile(os: OsFamily, arch: CpuArch, kernel: Version) -> PlatformProfile {
        PlatformProfile::new(
            os,
            arch,
            Version::new(14, 4, 1),
            kernel,
            ToolchainId {
                kind: CompilerKind::Clang,
                path: PathBuf::from("/usr/bin/cc"),
                version: Version::new(15, 0, 0),
            },
        )
    }

    fn big_sur() -> PinnedTarget {
        PinnedTarget::new(Version::new(20, 1, 0), "Big Sur")
    }

    #[test]
    fn test_triple_display() {
        let triple = TargetTriple::darwin(CpuArch::Aarch64, Version::new(20, 1, 0));
        assert_eq!(triple.to_string(), "aarch64-apple-darwin20.1.0");
    }

    #[test]
    fn test_linux_is_always_native() {
        for kernel in [Version::new(3, 10, 0), Version::new(20, 1, 0), Version::new(6, 8, 0)] {
            let resolution = resolve(&profile(OsFamily::Linux, CpuArch::Aarch64, kernel), &big_sur());
            assert_eq!(resolution, Resolution::Native);
            assert!(resolution.configure_args().is_empty());
        }
    }

    #[test]
    fn test_same_major_is_native_despite_minor() {
        let host = profile(OsFamily::Macos, CpuArch::Aarch64, Version::new(20, 6, 0));
        assert_eq!(resolve(&host, &big_sur()), Resolution::Native);
    }

    #[test]
    fn test_newer_major_is_cross() {
        let host = profile(OsFamily::Macos, CpuArch::Aarch64, Version::new(23, 4, 0));
        let resolution = resolve(&host, &big_sur());

        match &resolution {
            Resolution::Cross { build, host } => {
                assert_eq!(build.os_version, Version::new(23, 4, 0));
                assert_eq!(host.os_version, Version::new(20, 1, 0));
            }
            Resolution::Native => panic!("expected cross resolution"),
        }

        assert_eq!(
            resolution.configure_args(),
            vec![
                "--build=aarch64-apple-darwin23.4.0".to_string(),
                "--host=aarch64-apple-darwin20.1.0".to_string(),
            ]
        );
    }

    #[test]
    fn test_older_major_is_cross_without_warning() {
        let el_capitan = PinnedTarget::new(Version::new(15, 0, 0), "El Capitan");
        let host = profile(OsFamily::Macos, CpuArch::X86_64, Version::new(14, 5, 0));
        assert!(resolve(&host, &el_capitan).is_cross());
        assert!(baseline_warning(&host, &el_capitan).is_none());
    }

    #[test]
    fn test_baseline_warning_names_pin() {
        let host = profile(OsFamily::Macos, CpuArch::Aarch64, Version::new(23, 4, 0));
        let message = baseline_warning(&host, &big_sur()).unwrap();
        assert!(message.contains("Big Sur"));
        assert!(message.contains("14.4.1"));

        let linux = profile(OsFamily::Linux, CpuArch::Aarch64, Version::new(23, 4, 0));
        assert!(baseline_warning(&linux, &big_sur()).is_none());
    }
}
