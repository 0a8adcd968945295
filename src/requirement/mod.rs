// src/requirement/mod.rs

//! Host prerequisites that must hold before any build step runs
//!
//! Recipes declare requirements such as "gawk 3.1.2 or later" or "Linux
//! kernel 2.6.16 or later". Each declaration becomes a [`RequirementCheck`]
//! that inspects the host through a [`HostProbe`] and either passes or
//! fails with a remediation message. Checks never mutate anything.
//!
//! [`evaluate`] runs checks eagerly, in declaration order, and stops at the
//! first fatal failure. Non-fatal failures are logged and collected.

use crate::error::{Error, Result};
use crate::platform::PlatformProfile;
use crate::version::Version;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Default remediation text for a missing tool
pub const DEFAULT_TOOL_MESSAGE: &str = "{requirement} is required to build {recipe}.
Install {tool} with your host package manager if you have sudo access:
  sudo apt-get install {tool}
  sudo yum install {tool}";

/// Read-only view of the host used by requirement checks
pub trait HostProbe {
    /// Locate an executable on the search path
    fn find_tool(&self, name: &str) -> Option<PathBuf>;

    /// Version reported by `<tool> --version`
    fn tool_version(&self, path: &Path) -> Result<Version>;

    /// Running kernel release
    fn kernel_version(&self) -> Version;
}

/// The live host, backed by `which` and subprocess queries
pub struct LiveHost<'a> {
    profile: &'a PlatformProfile,
}

impl<'a> LiveHost<'a> {
    pub fn new(profile: &'a PlatformProfile) -> Self {
        Self { profile }
    }
}

impl HostProbe for LiveHost<'_> {
    fn find_tool(&self, name: &str) -> Option<PathBuf> {
        which::which(name).ok()
    }

    fn tool_version(&self, path: &Path) -> Result<Version> {
        let banner = crate::platform::run_host_query(path.as_os_str(), &["--version"])?;
        Version::find_in(&banner).ok_or_else(|| {
            Error::query(
                format!("{} --version", path.display()),
                "no version in output",
            )
        })
    }

    fn kernel_version(&self) -> Version {
        self.profile.kernel_version
    }
}

/// A single validator for an external prerequisite
pub trait RequirementCheck {
    /// Short human-readable name, e.g. `make 3.79 (or later)`
    fn display_name(&self) -> String;

    /// Fatal checks abort the build; others only warn
    fn fatal(&self) -> bool {
        true
    }

    /// Inspect the host; `Err(UnmetRequirement)` when not satisfied
    fn check(&self, host: &dyn HostProbe) -> Result<()>;
}

/// Declarative requirement as written in a recipe
///
/// Exactly one of `tool` or `kernel` must be set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequirementSpec {
    /// Executable that must be on the search path
    #[serde(default)]
    pub tool: Option<String>,

    /// Minimum tool version
    #[serde(default)]
    pub minimum: Option<Version>,

    /// Minimum kernel release
    #[serde(default)]
    pub kernel: Option<Version>,

    /// Compare the tool's reported version against `minimum`
    ///
    /// Off by default: many build tools print banners that cannot be
    /// parsed reliably, so presence is the default check.
    #[serde(default)]
    pub probe_version: bool,

    /// Failure message template (`{tool}`, `{version}`, `{requirement}`, `{recipe}`)
    #[serde(default)]
    pub message: Option<String>,

    #[serde(default = "default_fatal")]
    pub fatal: bool,
}

fn default_fatal() -> bool {
    true
}

impl RequirementSpec {
    /// Requirement on a tool being present
    pub fn tool(name: impl Into<String>, minimum: Option<Version>) -> Self {
        Self {
            tool: Some(name.into()),
            minimum,
            kernel: None,
            probe_version: false,
            message: None,
            fatal: true,
        }
    }

    /// Requirement on the running kernel
    pub fn kernel(minimum: Version) -> Self {
        Self {
            tool: None,
            minimum: None,
            kernel: Some(minimum),
            probe_version: false,
            message: None,
            fatal: true,
        }
    }

    /// Turn the declaration into an evaluable check for `recipe`
    pub fn to_check(&self, recipe: &str) -> Result<Box<dyn RequirementCheck>> {
        match (&self.tool, &self.kernel) {
            (Some(tool), None) => Ok(Box::new(ToolRequirement {
                recipe: recipe.to_string(),
                tool: tool.clone(),
                minimum: self.minimum,
                probe_version: self.probe_version,
                template: self
                    .message
                    .clone()
                    .unwrap_or_else(|| DEFAULT_TOOL_MESSAGE.to_string()),
                fatal: self.fatal,
            })),
            (None, Some(minimum)) => Ok(Box::new(KernelRequirement {
                recipe: recipe.to_string(),
                minimum: *minimum,
                template: self.message.clone(),
                fatal: self.fatal,
            })),
            _ => Err(Error::ParseError(format!(
                "Requirement in {} must name exactly one of `tool` or `kernel`",
                recipe
            ))),
        }
    }
}

/// A tool that must be installed, optionally at a minimum version
#[derive(Debug, Clone)]
pub struct ToolRequirement {
    recipe: String,
    tool: String,
    minimum: Option<Version>,
    probe_version: bool,
    template: String,
    fatal: bool,
}

impl ToolRequirement {
    fn version_text(&self) -> String {
        self.minimum
            .map(|v| format!("{} (or later)", v))
            .unwrap_or_default()
    }

    fn message(&self, extra: Option<String>) -> String {
        let mut message = self
            .template
            .replace("{requirement}", &self.display_name())
            .replace("{tool}", &self.tool)
            .replace("{version}", &self.version_text())
            .replace("{recipe}", &self.recipe);
        if let Some(extra) = extra {
            message.push('\n');
            message.push_str(&extra);
        }
        message
    }

    fn unmet(&self, extra: Option<String>) -> Error {
        Error::UnmetRequirement {
            requirement: self.display_name(),
            message: self.message(extra),
        }
    }
}

impl RequirementCheck for ToolRequirement {
    fn display_name(&self) -> String {
        [self.tool.clone(), self.version_text()]
            .into_iter()
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join(" ")
    }

    fn fatal(&self) -> bool {
        self.fatal
    }

    fn check(&self, host: &dyn HostProbe) -> Result<()> {
        let path = host.find_tool(&self.tool).ok_or_else(|| self.unmet(None))?;
        debug!("Found {} at {}", self.tool, path.display());

        if let (true, Some(minimum)) = (self.probe_version, self.minimum) {
            let found = host.tool_version(&path)?;
            if found < minimum {
                return Err(self.unmet(Some(format!(
                    "Found {} {} at {}.",
                    self.tool,
                    found,
                    path.display()
                ))));
            }
        }

        Ok(())
    }
}

/// Minimum running kernel release
#[derive(Debug, Clone)]
pub struct KernelRequirement {
    recipe: String,
    minimum: Version,
    template: Option<String>,
    fatal: bool,
}

impl RequirementCheck for KernelRequirement {
    fn display_name(&self) -> String {
        format!("Linux kernel {} (or later)", self.minimum)
    }

    fn fatal(&self) -> bool {
        self.fatal
    }

    fn check(&self, host: &dyn HostProbe) -> Result<()> {
        let running = host.kernel_version();
        if running >= self.minimum {
            return Ok(());
        }

        let message = match &self.template {
            Some(template) => template
                .replace("{requirement}", &self.display_name())
                .replace("{version}", &self.minimum.to_string())
                .replace("{recipe}", &self.recipe),
            None => format!(
                "Linux kernel version {} or later is required by {}.\nYour system has Linux kernel version {}.",
                self.minimum, self.recipe, running
            ),
        };

        Err(Error::UnmetRequirement {
            requirement: self.display_name(),
            message,
        })
    }
}

/// Run checks in order, stopping at the first fatal failure
///
/// Returns the messages of non-fatal failures.
pub fn evaluate(checks: &[Box<dyn RequirementCheck>], host: &dyn HostProbe) -> Result<Vec<String>> {
    let mut warnings = Vec::new();

    for check in checks {
        match check.check(host) {
            Ok(()) => debug!("Requirement satisfied: {}", check.display_name()),
            Err(Error::UnmetRequirement { requirement, message }) if !check.fatal() => {
                warn!("Requirement {} not met: {}", requirement, message);
                warnings.push(message);
            }
            Err(e) => return Err(e),
        }
    }

    Ok(warnings)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[derive(Default)]
    struct FakeHost {
        tools: HashMap<String, Version>,
        kernel: Version,
    }

    impl FakeHost {
        fn with_tool(mut self, name: &str, version: Version) -> Self {
            self.tools.insert(name.to_string(), version);
            self
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

    #[test]
    fn test_missing_tool_names_tool_and_version() {
        let check = RequirementSpec::tool("make", Some(Version::new(3, 79, 0)))
            .to_check("glibc@2.17")
            .unwrap();

        let err = check.check(&FakeHost::default()).unwrap_err();
        match err {
            Error::UnmetRequirement { requirement, message } => {
                assert_eq!(requirement, "make 3.79.0 (or later)");
                assert!(message.contains("make"));
                assert!(message.contains("3.79.0"));
                assert!(message.contains("glibc@2.17"));
                assert!(message.contains("sudo apt-get install make"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_present_tool_passes_without_probe() {
        let host = FakeHost::default().with_tool("gawk", Version::new(1, 0, 0));
        let check = RequirementSpec::tool("gawk", Some(Version::new(3, 1, 2)))
            .to_check("glibc@2.17")
            .unwrap();
        // Presence only: the old version is not inspected
        assert!(check.check(&host).is_ok());
    }

    #[test]
    fn test_probed_version_below_floor() {
        let host = FakeHost::default().with_tool("make", Version::new(3, 78, 1));
        let mut spec = RequirementSpec::tool("make", Some(Version::new(3, 79, 0)));
        spec.probe_version = true;

        let err = spec.to_check("glibc@2.17").unwrap().check(&host).unwrap_err();
        assert!(err.to_string().contains("Found make 3.78.1"));

        let host = FakeHost::default().with_tool("make", Version::new(4, 3, 0));
        assert!(spec.to_check("glibc@2.17").unwrap().check(&host).is_ok());
    }

    #[test]
    fn test_kernel_floor() {
        let check = RequirementSpec::kernel(Version::new(2, 6, 16))
            .to_check("glibc@2.17")
            .unwrap();
        assert_eq!(check.display_name(), "Linux kernel 2.6.16 (or later)");

        let old = FakeHost {
            kernel: Version::new(2, 6, 9),
            ..Default::default()
        };
        let err = check.check(&old).unwrap_err();
        assert!(err.to_string().contains("2.6.9"));

        let new = FakeHost {
            kernel: Version::new(5, 15, 0),
            ..Default::default()
        };
        assert!(check.check(&new).is_ok());
    }

    #[test]
    fn test_custom_template() {
        let mut spec = RequirementSpec::tool("sed", Some(Version::new(3, 2, 0)));
        spec.message = Some("install {tool} {version} via your OS package manager".to_string());
        let err = spec
            .to_check("glibc@2.17")
            .unwrap()
            .check(&FakeHost::default())
            .unwrap_err();
        assert!(
            err.to_string()
                .contains("install sed 3.2.0 (or later) via your OS package manager")
        );
    }

    #[test]
    fn test_invalid_spec() {
        let mut spec = RequirementSpec::kernel(Version::new(2, 6, 16));
        spec.tool = Some("make".to_string());
        assert!(spec.to_check("x").is_err());
    }

    #[test]
    fn test_evaluate_fails_fast_in_order() {
        let host = FakeHost::default().with_tool("sed", Version::new(4, 8, 0));
        let checks = vec![
            RequirementSpec::tool("gawk", None).to_check("x").unwrap(),
            RequirementSpec::tool("make", None).to_check("x").unwrap(),
            RequirementSpec::tool("sed", None).to_check("x").unwrap(),
        ];

        let err = evaluate(&checks, &host).unwrap_err();
        // First failure only, not a list
        match err {
            Error::UnmetRequirement { requirement, message } => {
                assert_eq!(requirement, "gawk");
                assert!(!message.contains("make"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_evaluate_non_fatal_warns() {
        let mut spec = RequirementSpec::tool("texinfo", None);
        spec.fatal = false;
        let checks = vec![spec.to_check("x").unwrap()];

        let warnings = evaluate(&checks, &FakeHost::default()).unwrap();
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].contains("texinfo"));
    }

    #[test]
    fn test_spec_from_toml() {
        let spec: RequirementSpec = toml::from_str(
            r#"
tool = "gawk"
minimum = "3.1.2"
"#,
        )
        .unwrap();
        assert_eq!(spec.tool.as_deref(), Some("gawk"));
        assert_eq!(spec.minimum, Some(Version::new(3, 1, 2)));
        assert!(spec.fatal);
        assert!(!spec.probe_version);
    }
}
