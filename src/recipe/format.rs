// src/recipe/format.rs

//! Recipe declaration format
//!
//! Recipes are TOML files describing one toolchain component: its identity,
//! platform-conditioned dependencies, host requirements, and the shell steps
//! the build executor runs. Declarations are pure data; nothing here mutates
//! another recipe or inspects the host.

use crate::platform::{CpuArch, OsFamily, PlatformProfile};
use crate::requirement::RequirementSpec;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A complete recipe declaration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecipeDeclaration {
    /// Package metadata
    pub package: PackageSection,

    /// Source archive (fetched by an external collaborator)
    #[serde(default)]
    pub source: Option<SourceSection>,

    /// Platform-conditioned dependencies
    #[serde(default)]
    pub depends: Vec<DependencySpec>,

    /// Host requirements checked before any build step
    #[serde(default)]
    pub requires: Vec<RequirementSpec>,

    /// Shell steps handed to the build executor
    #[serde(default)]
    pub build: BuildSection,

    /// Conditional compiler/linker/make additions
    #[serde(default)]
    pub flags: Vec<ConditionalFlags>,

    /// Recipe-specific environment adjustments
    #[serde(default)]
    pub environment: EnvironmentSection,

    /// Post-install cleanup of an embedded configuration record
    #[serde(default)]
    pub rewrite: Option<RewriteSection>,
}

impl RecipeDeclaration {
    /// Recipe identifier (e.g. `glibc@2.17`)
    pub fn id(&self) -> &str {
        &self.package.name
    }

    /// Whether the recipe can be built on this host at all
    pub fn supports(&self, profile: &PlatformProfile) -> bool {
        self.package.os.is_none_or(|os| os == profile.os_family)
    }

    /// Declared dependencies that apply to this host
    pub fn dependencies_for<'a>(
        &'a self,
        profile: &'a PlatformProfile,
    ) -> impl Iterator<Item = &'a DependencySpec> + 'a {
        self.depends.iter().filter(move |d| d.when.matches(profile))
    }

    /// Conditional flags that apply to this host, in declaration order
    pub fn flags_for<'a>(
        &'a self,
        profile: &'a PlatformProfile,
    ) -> impl Iterator<Item = &'a ConditionalFlags> + 'a {
        self.flags.iter().filter(move |f| f.when.matches(profile))
    }

    /// Substitute `%(name)s` style variables in a build step
    pub fn substitute(&self, template: &str, vars: &BTreeMap<&str, String>) -> String {
        let mut result = template.to_string();

        result = result.replace("%(name)s", &self.package.name);
        result = result.replace("%(version)s", &self.package.version);

        for (key, value) in vars {
            result = result.replace(&format!("%({})s", key), value);
        }

        result
    }
}

/// Package metadata section
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PackageSection {
    /// Recipe identifier, including any version suffix (`bison@3.0`)
    pub name: String,

    /// Upstream version
    pub version: String,

    #[serde(default)]
    pub summary: Option<String>,

    #[serde(default)]
    pub license: Option<String>,

    #[serde(default)]
    pub homepage: Option<String>,

    /// Restrict the recipe to one OS family
    #[serde(default)]
    pub os: Option<OsFamily>,

    /// Receives the portability treatment: baseline dependencies, sanitized
    /// environment, portable flags, and cross-release configure arguments
    #[serde(default)]
    pub portable: bool,

    /// Needed to build consumers but never linked by them at runtime
    #[serde(default)]
    pub build_only: bool,
}

/// Source archive section
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceSection {
    /// Archive URL
    pub archive: String,

    /// Checksum (sha256:...)
    pub checksum: String,

    #[serde(default)]
    pub mirror: Option<String>,
}

/// When a dependency edge is needed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default)]
pub enum DependencyPhase {
    /// Only while building the dependent
    #[serde(rename = "build")]
    BuildTime,
    /// Also needed when the dependent runs
    #[default]
    #[serde(rename = "run")]
    RunTime,
}

impl DependencyPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::BuildTime => "build",
            Self::RunTime => "run",
        }
    }
}

/// Host condition on a declaration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub struct Condition {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub os: Option<OsFamily>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub arch: Option<CpuArch>,
}

impl Condition {
    pub fn matches(&self, profile: &PlatformProfile) -> bool {
        self.os.is_none_or(|os| os == profile.os_family)
            && self.arch.is_none_or(|arch| arch == profile.cpu_arch)
    }
}

/// A declared dependency edge
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DependencySpec {
    /// Recipe id depended upon
    pub name: String,

    #[serde(default)]
    pub phase: DependencyPhase,

    #[serde(flatten)]
    pub when: Condition,
}

impl DependencySpec {
    /// Build-time dependency, optionally conditioned on host
    pub fn build(name: impl Into<String>, os: Option<OsFamily>, arch: Option<CpuArch>) -> Self {
        Self {
            name: name.into(),
            phase: DependencyPhase::BuildTime,
            when: Condition { os, arch },
        }
    }
}

/// Build instructions section
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct BuildSection {
    /// Configure command; cross-release arguments are appended for
    /// portable recipes
    #[serde(default)]
    pub configure: Option<String>,

    /// Make command
    #[serde(default)]
    pub make: Option<String>,

    /// Install command, must install to `%(prefix)s`
    #[serde(default)]
    pub install: Option<String>,

    /// Post-install command
    #[serde(default)]
    pub post_install: Option<String>,

    /// Subdirectory of the source tree to run the steps in
    #[serde(default)]
    pub workdir: Option<String>,
}

/// Flags contributed when a condition holds
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ConditionalFlags {
    #[serde(flatten)]
    pub when: Condition,

    #[serde(default)]
    pub cflags: Vec<String>,

    #[serde(default)]
    pub ldflags: Vec<String>,

    /// Extra arguments for the make and install steps
    #[serde(default)]
    pub make_args: Vec<String>,
}

/// Recipe-specific environment adjustments
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct EnvironmentSection {
    /// Additional variables to strip before building
    #[serde(default)]
    pub remove: Vec<String>,

    /// Variables to set explicitly
    #[serde(default)]
    pub set: BTreeMap<String, String>,
}

/// Installed configuration record that embeds build flags
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RewriteSection {
    /// Glob relative to the install prefix
    pub config_record: String,
}
