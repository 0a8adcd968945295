// src/portable/flags.rs

//! Compiler and linker flag composition
//!
//! Flags come in two groups. The base group (`-fPIC` on Linux,
//! `-Wl,-search_paths_first` on macOS) stays in the installed artifact's
//! recorded configuration. The portable group only makes sense on the build
//! machine: it pins include directories to the active compiler's own and
//! points the linker at the pinned C library, so it is stripped again after
//! installation.
//!
//! Composition is deterministic for a given profile, resolution, policy and
//! compiler. [`portable_flags`] memoizes it per process.

use super::target::Resolution;
use crate::error::Result;
use crate::platform::{CompilerProbe, OsFamily, PlatformProfile};
use crate::version::Version;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Mutex, OnceLock};
use tracing::debug;

/// Ordered compiler and linker flags
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FlagSet {
    pub cflags: Vec<String>,
    pub ldflags: Vec<String>,
}

impl FlagSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.cflags.is_empty() && self.ldflags.is_empty()
    }

    /// Append another set, preserving order
    pub fn extend(&mut self, other: &FlagSet) {
        self.cflags.extend(other.cflags.iter().cloned());
        self.ldflags.extend(other.ldflags.iter().cloned());
    }

    /// Compiler flags as they appear in `CFLAGS`
    pub fn cflags_string(&self) -> String {
        self.cflags.join(" ")
    }

    /// Linker flags as they appear in `LDFLAGS`
    pub fn ldflags_string(&self) -> String {
        self.ldflags.join(" ")
    }
}

/// Configurable inputs to flag composition
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FlagPolicy {
    /// Compilers at or above this version get `-mno-outline-atomics`
    pub outline_atomics_floor: Version,
    /// Library directory of the pinned C library build
    pub runtime_library_dir: PathBuf,
}

/// Everything flag composition hands to a portable build
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortableFlags {
    /// `--build`/`--host` when cross-building, otherwise empty
    pub configure_args: Vec<String>,
    /// Flags that stay in the installed configuration
    pub base: FlagSet,
    /// Build-machine-only flags, stripped after install
    pub portable: FlagSet,
}

impl PortableFlags {
    /// Base flags followed by portable flags
    pub fn combined(&self) -> FlagSet {
        let mut all = self.base.clone();
        all.extend(&self.portable);
        all
    }
}

/// Compose the flags for a portable build
///
/// The compiler is only queried on Linux ARM64, where include directories
/// and the outline-atomics decision depend on it. A failed query aborts.
pub fn compose(
    profile: &PlatformProfile,
    resolution: &Resolution,
    policy: &FlagPolicy,
    compiler: &dyn CompilerProbe,
) -> Result<PortableFlags> {
    let mut flags = PortableFlags {
        configure_args: resolution.configure_args(),
        ..Default::default()
    };

    match profile.os_family {
        OsFamily::Macos => {
            flags.base.ldflags.push("-Wl,-search_paths_first".to_string());
        }
        OsFamily::Linux => {
            flags.base.cflags.push("-fPIC".to_string());
        }
    }

    if profile.is_linux() && profile.cpu_arch.is_arm() {
        flags.portable.cflags = arm_include_flags(policy, compiler)?;
        flags.portable.ldflags = runtime_library_hints(policy);
    }

    debug!(
        "Composed flags for {} {}: base [{}] portable [{}] [{}]",
        profile.os_family,
        profile.cpu_arch,
        flags.base.cflags_string(),
        flags.portable.cflags_string(),
        flags.portable.ldflags_string()
    );

    Ok(flags)
}

/// Replace the default include search with the compiler's bundled headers
fn arm_include_flags(policy: &FlagPolicy, compiler: &dyn CompilerProbe) -> Result<Vec<String>> {
    let include = compiler.print_file_name("include")?;
    let include_fixed = compiler.print_file_name("include-fixed")?;

    let mut cflags = vec![
        "-nostdinc".to_string(),
        format!("-isystem{}", include.display()),
        format!("-isystem{}", include_fixed.display()),
    ];

    let version = compiler.version()?;
    if version >= policy.outline_atomics_floor {
        cflags.push("-mno-outline-atomics".to_string());
    }

    Ok(cflags)
}

/// Point the linker at the pinned C library before the host's
fn runtime_library_hints(policy: &FlagPolicy) -> Vec<String> {
    let dir = policy.runtime_library_dir.display();
    vec![format!("-B{}", dir), format!("-Wl,-rpath-link={}", dir)]
}

type FlagCacheKey = (PlatformProfile, Resolution, FlagPolicy);

fn flag_cache() -> &'static Mutex<HashMap<FlagCacheKey, PortableFlags>> {
    static CACHE: OnceLock<Mutex<HashMap<FlagCacheKey, PortableFlags>>> = OnceLock::new();
    CACHE.get_or_init(|| Mutex::new(HashMap::new()))
}

/// Memoized [`compose`] using the profile's own compiler
///
/// Errors are not cached; a failed query is retried on the next call.
pub fn portable_flags(
    profile: &PlatformProfile,
    resolution: &Resolution,
    policy: &FlagPolicy,
) -> Result<PortableFlags> {
    let key = (profile.clone(), resolution.clone(), policy.clone());

    {
        let cache = flag_cache().lock().unwrap_or_else(|e| e.into_inner());
        if let Some(flags) = cache.get(&key) {
            return Ok(flags.clone());
        }
    }

    let flags = compose(profile, resolution, policy, &profile.compiler())?;

    let mut cache = flag_cache().lock().unwrap_or_else(|e| e.into_inner());
    Ok(cache.entry(key).or_insert(flags).clone())
}
