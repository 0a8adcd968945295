// tests/common/mod.rs

//! Shared test utilities and helpers for integration tests.

#![allow(dead_code)]

use portable_toolchain::platform::{CompilerKind, CompilerProbe, ToolchainId};
use portable_toolchain::requirement::HostProbe;
use portable_toolchain::{CpuArch, OsFamily, PlatformProfile, PortableConfig, Result, Version};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Host with a fixed set of tools and kernel release
pub struct FakeHost {
    tools: HashMap<String, Version>,
    kernel: Version,
}

impl FakeHost {
    pub fn new(kernel: Version) -> Self {
        Self {
            tools: HashMap::new(),
            kernel,
        }
    }

    pub fn with_tool(mut self, name: &str, version: Version) -> Self {
        self.tools.insert(name.to_string(), version);
        self
    }

    /// A Linux host that satisfies every glibc@2.17 requirement
    pub fn glibc_ready() -> Self {
        Self::new(Version::new(5, 15, 0))
            .with_tool("gawk", Version::new(5, 1, 0))
            .with_tool("make", Version::new(4, 3, 0))
            .with_tool("sed", Version::new(4, 8, 0))
    }
}

impl HostProbe for FakeHost {
    fn find_tool(&self, name: &str) -> Option<PathBuf> {
        self.tools
            .contains_key(name)
            .then(|| PathBuf::from("/usr/bin").join(name))
    }

    fn tool_version(&self, path: &Path) -> Result<Version> {
        let name = path.file_name().unwrap().to_string_lossy();
        Ok(self.tools[&*name])
    }

    fn kernel_version(&self) -> Version {
        self.kernel
    }
}

/// GCC that ships its headers under `/usr/lib/gcc/aarch64-linux-gnu/11`
pub struct FakeCompiler {
    pub version: Version,
}

impl FakeCompiler {
    pub fn gcc(version: Version) -> Self {
        Self { version }
    }
}

impl CompilerProbe for FakeCompiler {
    fn version(&self) -> Result<Version> {
        Ok(self.version)
    }

    fn print_file_name(&self, name: &str) -> Result<PathBuf> {
        Ok(PathBuf::from(GCC_LIB_DIR).join(name))
    }
}

pub const GCC_LIB_DIR: &str = "/usr/lib/gcc/aarch64-linux-gnu/11";

/// A Linux host profile with the given architecture
pub fn linux(arch: CpuArch) -> PlatformProfile {
    PlatformProfile::new(
        OsFamily::Linux,
        arch,
        Version::new(5, 15, 0),
        Version::new(5, 15, 0),
        gcc_id(),
    )
}

/// A macOS host profile; `darwin` is the kernel release
pub fn macos(arch: CpuArch, marketing: Version, darwin: Version) -> PlatformProfile {
    PlatformProfile::new(
        OsFamily::Macos,
        arch,
        marketing,
        darwin,
        ToolchainId {
            kind: CompilerKind::Clang,
            path: PathBuf::from("/usr/bin/clang"),
            version: Version::new(15, 0, 0),
        },
    )
}

fn gcc_id() -> ToolchainId {
    ToolchainId {
        kind: CompilerKind::Gcc,
        path: PathBuf::from("/usr/bin/cc"),
        version: Version::new(11, 4, 0),
    }
}

/// Default configuration with a fixed job count
pub fn config() -> PortableConfig {
    PortableConfig::default().with_jobs(4)
}
