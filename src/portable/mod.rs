// src/portable/mod.rs

//! Portability resolution
//!
//! Turns a [`PlatformProfile`](crate::platform::PlatformProfile) into the
//! three things a portable build needs: configure arguments for a
//! cross-release build, compiler/linker flags, and a sanitized environment.

pub mod environment;
pub mod flags;
pub mod target;

pub use environment::{
    removal_set, BuildEnvironment, EnvAction, EnvironmentPolicy, SanitizedEnvironment,
};
pub use flags::{compose, portable_flags, FlagPolicy, FlagSet, PortableFlags};
pub use target::{baseline_warning, resolve, Resolution, TargetTriple};
