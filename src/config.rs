// src/config.rs

//! Portable build configuration
//!
//! Every policy constant the resolver uses (pinned Darwin releases, the
//! pinned C library, the outline-atomics compiler floor, the baseline
//! dependency set) lives here with a built-in default, so a config file
//! can move a baseline without code changes.

use crate::error::{Error, Result};
use crate::platform::{CpuArch, OsFamily};
use crate::portable::{EnvironmentPolicy, FlagPolicy};
use crate::recipe::DependencySpec;
use crate::version::Version;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Environment variable naming a config file
pub const CONFIG_ENV_VAR: &str = "PORTABLE_CONFIG";

/// A value chosen per CPU architecture
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArchTable<T> {
    pub aarch64: T,
    pub x86_64: T,
}

impl<T> ArchTable<T> {
    pub fn get(&self, arch: CpuArch) -> &T {
        match arch {
            CpuArch::Aarch64 => &self.aarch64,
            CpuArch::X86_64 => &self.x86_64,
        }
    }
}

/// Darwin release portable macOS artifacts are built for
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PinnedTarget {
    /// Darwin kernel release, e.g. `20.1.0`
    pub darwin: Version,
    /// Marketing name used in messages, e.g. `Big Sur`
    pub name: String,
}

impl PinnedTarget {
    pub fn new(darwin: Version, name: impl Into<String>) -> Self {
        Self {
            darwin,
            name: name.into(),
        }
    }
}

/// Top-level configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PortableConfig {
    /// Keg-only install root; recipe `X` installs into `<prefix>/opt/X`
    pub prefix: PathBuf,

    /// Extra recipe directories layered over the built-in catalogue
    pub recipe_dirs: Vec<PathBuf>,

    /// Parallel make jobs
    pub jobs: usize,

    /// Compiler version at or above which outline atomics are disabled
    pub outline_atomics_floor: Version,

    /// Pinned Darwin release per architecture
    pub pinned_targets: ArchTable<PinnedTarget>,

    /// Pinned C library recipe per architecture
    pub runtime_library: ArchTable<String>,

    /// Dependencies injected into every portable recipe
    pub baseline: Vec<DependencySpec>,

    /// Prefixes installed portable artifacts must not reference (defaults to `prefix`)
    pub forbidden_link_prefixes: Vec<PathBuf>,

    /// This tool's own dynamic-linker override variable
    pub dynamic_linker_var: String,

    /// This tool's own rpath list variable
    pub rpath_list_var: String,
}

impl Default for PortableConfig {
    fn default() -> Self {
        Self {
            prefix: PathBuf::from("/opt/portable"),
            recipe_dirs: Vec::new(),
            jobs: num_cpus(),
            outline_atomics_floor: Version::new(9, 3, 1),
            pinned_targets: ArchTable {
                aarch64: PinnedTarget::new(Version::new(20, 1, 0), "Big Sur"),
                x86_64: PinnedTarget::new(Version::new(15, 0, 0), "El Capitan"),
            },
            runtime_library: ArchTable {
                aarch64: "glibc@2.17".to_string(),
                x86_64: "glibc@2.13".to_string(),
            },
            baseline: default_baseline(),
            forbidden_link_prefixes: Vec::new(),
            dynamic_linker_var: "PORTABLE_DYNAMIC_LINKER".to_string(),
            rpath_list_var: "PORTABLE_RPATH_PATHS".to_string(),
        }
    }
}

fn default_baseline() -> Vec<DependencySpec> {
    let linux = Some(OsFamily::Linux);
    vec![
        DependencySpec::build("glibc@2.17", linux, Some(CpuArch::Aarch64)),
        DependencySpec::build("glibc@2.13", linux, Some(CpuArch::X86_64)),
        DependencySpec::build("linux-headers@4.4", linux, None),
    ]
}

impl PortableConfig {
    /// Create a new config with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Load configuration
    ///
    /// Lookup order: `explicit`, then `$PORTABLE_CONFIG`, then
    /// `<config dir>/portable/config.toml`, then the built-in defaults.
    /// A file that exists but cannot be parsed is an error.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::from_file(path);
        }

        if let Ok(path) = std::env::var(CONFIG_ENV_VAR)
            && !path.is_empty()
        {
            return Self::from_file(Path::new(&path));
        }

        if let Some(dir) = dirs::config_dir() {
            let path = dir.join("portable").join("config.toml");
            if path.exists() {
                return Self::from_file(&path);
            }
        }

        debug!("No configuration file found, using defaults");
        Ok(Self::default())
    }

    /// Parse a configuration file
    pub fn from_file(path: &Path) -> Result<Self> {
        debug!("Loading configuration from {}", path.display());
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::ConfigError(format!("Failed to read {}: {}", path.display(), e))
        })?;
        Self::from_toml(&content)
            .map_err(|e| Error::ConfigError(format!("{}: {}", path.display(), e)))
    }

    /// Parse configuration from TOML text
    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Self =
            toml::from_str(content).map_err(|e| Error::ConfigError(e.to_string()))?;
        if config.jobs == 0 {
            return Err(Error::ConfigError("jobs must be at least 1".to_string()));
        }
        Ok(config)
    }

    /// Set the install prefix
    pub fn with_prefix(mut self, prefix: impl Into<PathBuf>) -> Self {
        self.prefix = prefix.into();
        self
    }

    /// Set number of parallel jobs
    pub fn with_jobs(mut self, jobs: usize) -> Self {
        self.jobs = jobs;
        self
    }

    /// Replace the baseline dependency set
    pub fn with_baseline(mut self, baseline: Vec<DependencySpec>) -> Self {
        self.baseline = baseline;
        self
    }

    /// Keg-only install directory for a recipe
    pub fn opt_dir(&self, recipe: &str) -> PathBuf {
        self.prefix.join("opt").join(recipe)
    }

    /// Pinned Darwin release for an architecture
    pub fn pinned_target(&self, arch: CpuArch) -> &PinnedTarget {
        self.pinned_targets.get(arch)
    }

    /// Library directory of the pinned C library for an architecture
    pub fn runtime_library_dir(&self, arch: CpuArch) -> PathBuf {
        self.opt_dir(self.runtime_library.get(arch)).join("lib")
    }

    /// Flag composition policy for an architecture
    pub fn flag_policy(&self, arch: CpuArch) -> FlagPolicy {
        FlagPolicy {
            outline_atomics_floor: self.outline_atomics_floor,
            runtime_library_dir: self.runtime_library_dir(arch),
        }
    }

    /// Variable names the sanitizer strips besides the fixed Linux set
    pub fn environment_policy(&self) -> EnvironmentPolicy {
        EnvironmentPolicy {
            dynamic_linker_var: self.dynamic_linker_var.clone(),
            rpath_list_var: self.rpath_list_var.clone(),
        }
    }

    /// Prefixes installed portable artifacts must not reference
    pub fn forbidden_prefixes(&self) -> Vec<PathBuf> {
        if self.forbidden_link_prefixes.is_empty() {
            vec![self.prefix.clone()]
        } else {
            self.forbidden_link_prefixes.clone()
        }
    }
}

/// Get number of CPUs for parallel builds
fn num_cpus() -> usize {
    std::thread::available_parallelism()
        .map(|p| p.get())
        .unwrap_or(4)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults() {
        let config = PortableConfig::default();
        assert_eq!(config.prefix, PathBuf::from("/opt/portable"));
        assert!(config.jobs > 0);
        assert_eq!(config.outline_atomics_floor, Version::new(9, 3, 1));
        assert_eq!(
            config.pinned_target(CpuArch::Aarch64).darwin,
            Version::new(20, 1, 0)
        );
        assert_eq!(config.pinned_target(CpuArch::X86_64).name, "El Capitan");
        assert_eq!(config.baseline.len(), 3);
    }

    #[test]
    fn test_runtime_library_dir() {
        let config = PortableConfig::new().with_prefix("/tmp/kegs");
        assert_eq!(
            config.runtime_library_dir(CpuArch::Aarch64),
            PathBuf::from("/tmp/kegs/opt/glibc@2.17/lib")
        );
        assert_eq!(
            config.flag_policy(CpuArch::X86_64).runtime_library_dir,
            PathBuf::from("/tmp/kegs/opt/glibc@2.13/lib")
        );
    }

    #[test]
    fn test_forbidden_prefixes_default_to_prefix() {
        let config = PortableConfig::new().with_prefix("/srv/kegs");
        assert_eq!(config.forbidden_prefixes(), vec![PathBuf::from("/srv/kegs")]);
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = PortableConfig::from_toml(
            r#"
prefix = "/home/build/portable"
jobs = 2
outline_atomics_floor = "10.1"

[pinned_targets.aarch64]
darwin = "21.0.0"
name = "Monterey"

[pinned_targets.x86_64]
darwin = "15.0.0"
name = "El Capitan"
"#,
        )
        .unwrap();

        assert_eq!(config.prefix, PathBuf::from("/home/build/portable"));
        assert_eq!(config.jobs, 2);
        assert_eq!(config.outline_atomics_floor, Version::new(10, 1, 0));
        assert_eq!(config.pinned_target(CpuArch::Aarch64).name, "Monterey");
        assert_eq!(config.runtime_library.aarch64, "glibc@2.17");
        assert_eq!(config.rpath_list_var, "PORTABLE_RPATH_PATHS");
    }

    #[test]
    fn test_invalid_toml_is_config_error() {
        let err = PortableConfig::from_toml("jobs = \"many\"").unwrap_err();
        assert!(matches!(err, Error::ConfigError(_)));

        let err = PortableConfig::from_toml("jobs = 0").unwrap_err();
        assert!(err.to_string().contains("jobs"));
    }

    #[test]
    fn test_load_explicit_file() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("config.toml");
        std::fs::write(&path, "prefix = \"/x\"\n").unwrap();

        let config = PortableConfig::load(Some(&path)).unwrap();
        assert_eq!(config.prefix, PathBuf::from("/x"));

        let missing = temp.path().join("nope.toml");
        assert!(PortableConfig::load(Some(&missing)).is_err());
    }
}
