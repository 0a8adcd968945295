// src/portable/environment.rs

//! Build environment sanitizing
//!
//! The sanitizer only computes which ambient variables must go. The
//! composed [`SanitizedEnvironment`] records removals and the values the
//! pipeline sets or appends, and is turned into a concrete
//! [`BuildEnvironment`] exactly once, when the build command is spawned.

use super::flags::FlagSet;
use crate::platform::OsFamily;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::process::Command;

/// Linker and library search variables stripped on Linux
pub const LINUX_REMOVALS: &[&str] = &[
    "LDFLAGS",
    "LIBRARY_PATH",
    "LD_RUN_PATH",
    "LD_LIBRARY_PATH",
    "TERMINFO_DIRS",
];

/// Names of this tool's own override variables
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvironmentPolicy {
    pub dynamic_linker_var: String,
    pub rpath_list_var: String,
}

/// Variables to strip before a build on the given OS family
///
/// Depends on nothing but the OS family.
pub fn removal_set(os: OsFamily, policy: &EnvironmentPolicy) -> BTreeSet<String> {
    match os {
        OsFamily::Macos => BTreeSet::new(),
        OsFamily::Linux => LINUX_REMOVALS
            .iter()
            .map(|name| name.to_string())
            .chain([
                policy.rpath_list_var.clone(),
                policy.dynamic_linker_var.clone(),
            ])
            .collect(),
    }
}

/// What happens to one variable
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", content = "value", rename_all = "lowercase")]
pub enum EnvAction {
    Remove,
    Set(String),
    Append(String),
}

/// Pending environment changes for a build
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SanitizedEnvironment {
    actions: BTreeMap<String, EnvAction>,
    removed: BTreeSet<String>,
}

impl SanitizedEnvironment {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from a removal set
    pub fn from_removals(names: impl IntoIterator<Item = String>) -> Self {
        let mut env = Self::new();
        for name in names {
            env.remove(name);
        }
        env
    }

    /// Drop the ambient value of `name`
    pub fn remove(&mut self, name: impl Into<String>) {
        let name = name.into();
        self.removed.insert(name.clone());
        self.actions.insert(name, EnvAction::Remove);
    }

    /// Set `name`, replacing any ambient or composed value
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.actions.insert(name.into(), EnvAction::Set(value.into()));
    }

    /// Append to `name` with a space separator
    ///
    /// Appending to a removed variable sets it to the composed value only.
    pub fn append(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let value = value.into();
        if value.is_empty() {
            return;
        }

        let name = name.into();
        let action = match self.actions.remove(&name) {
            None => EnvAction::Append(value),
            Some(EnvAction::Remove) => EnvAction::Set(value),
            Some(EnvAction::Set(old)) => EnvAction::Set(join(&old, &value)),
            Some(EnvAction::Append(old)) => EnvAction::Append(join(&old, &value)),
        };
        self.actions.insert(name, action);
    }

    /// Append a flag set to `CFLAGS` and `LDFLAGS`
    pub fn append_flags(&mut self, flags: &FlagSet) {
        self.append("CFLAGS", flags.cflags_string());
        self.append("LDFLAGS", flags.ldflags_string());
    }

    /// Whether the ambient value of `name` is discarded
    pub fn is_removed(&self, name: &str) -> bool {
        self.removed.contains(name)
    }

    pub fn action(&self, name: &str) -> Option<&EnvAction> {
        self.actions.get(name)
    }

    /// All actions in name order
    pub fn actions(&self) -> impl Iterator<Item = (&str, &EnvAction)> {
        self.actions.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Resolve against an ambient environment
    pub fn apply<I, K, V>(&self, ambient: I) -> BuildEnvironment
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let mut vars: BTreeMap<String, String> = ambient
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();

        for name in &self.removed {
            vars.remove(name);
        }

        for (name, action) in &self.actions {
            match action {
                EnvAction::Remove => {
                    vars.remove(name);
                }
                EnvAction::Set(value) => {
                    vars.insert(name.clone(), value.clone());
                }
                EnvAction::Append(value) => {
                    let combined = match vars.get(name) {
                        Some(old) if !old.is_empty() => join(old, value),
                        _ => value.clone(),
                    };
                    vars.insert(name.clone(), combined);
                }
            }
        }

        BuildEnvironment {
            vars,
            removed: self.removed.clone(),
        }
    }

    /// Resolve against this process's environment
    pub fn apply_current(&self) -> BuildEnvironment {
        self.apply(std::env::vars())
    }
}

fn join(a: &str, b: &str) -> String {
    if a.is_empty() {
        b.to_string()
    } else {
        format!("{} {}", a, b)
    }
}

/// Concrete environment a build step runs with
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildEnvironment {
    vars: BTreeMap<String, String>,
    removed: BTreeSet<String>,
}

impl BuildEnvironment {
    pub fn get(&self, name: &str) -> Option<&str> {
        self.vars.get(name).map(String::as_str)
    }

    pub fn vars(&self) -> &BTreeMap<String, String> {
        &self.vars
    }

    /// Names whose ambient values were discarded
    pub fn removed(&self) -> &BTreeSet<String> {
        &self.removed
    }

    /// Install this environment on a command, replacing the inherited one
    pub fn configure(&self, command: &mut Command) {
        command.env_clear().envs(&self.vars);
    }
}
