// src/lib.rs

//! Portable toolchain builds
//!
//! Resolves, for a recipe and the detected host, the configuration needed to
//! build a toolchain component whose output runs on older releases than the
//! build host: cross-release configure arguments, compiler and linker flags,
//! a sanitized build environment, and an ordered dependency plan.
//!
//! # Data flow
//!
//! - [`platform::PlatformProfile`]: immutable host facts, detected once
//! - [`requirement`]: fail-fast gate on host tools and kernel
//! - [`portable::target`]: native or cross-release resolution
//! - [`portable::flags`]: compiler/linker flags, memoized per process
//! - [`portable::environment`]: variables to strip before building
//! - [`plan`]: ordered, platform-filtered dependency list
//! - [`build`]: executor boundary where the environment is applied
//! - [`rewrite`]: strips build-only flags from installed config records

pub mod build;
pub mod config;
mod error;
pub mod linkage;
pub mod pipeline;
pub mod plan;
pub mod platform;
pub mod portable;
pub mod recipe;
pub mod requirement;
pub mod rewrite;
pub mod version;

pub use build::{BuildExecutor, BuildJob, DryRunExecutor, ShellExecutor};
pub use config::PortableConfig;
pub use error::{Error, Result};
pub use pipeline::{Pipeline, PreparedBuild};
pub use plan::{BuildPlan, PlanEntry};
pub use platform::{CpuArch, OsFamily, PlatformProfile};
pub use portable::{FlagSet, PortableFlags, Resolution, SanitizedEnvironment, TargetTriple};
pub use recipe::{RecipeCatalog, RecipeDeclaration};
pub use version::Version;
