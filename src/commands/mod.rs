// src/commands/mod.rs
//! Command handlers for the portable CLI

mod build;
mod inspect;

pub use build::{cmd_build, cmd_linkage, cmd_rewrite};
pub use inspect::{cmd_check, cmd_env, cmd_plan, cmd_profile, cmd_recipes};

use anyhow::{Context, Result};
use portable_toolchain::{PortableConfig, RecipeCatalog};
use std::path::{Path, PathBuf};

/// Configuration and catalogue shared by every command
pub struct Session {
    pub config: PortableConfig,
    pub catalog: RecipeCatalog,
}

impl Session {
    /// Load configuration, then the catalogue with configured and extra recipe directories
    pub fn load(config_path: Option<&Path>, extra_dirs: &[PathBuf]) -> Result<Self> {
        let config = PortableConfig::load(config_path).context("Failed to load configuration")?;

        let dirs: Vec<&PathBuf> = config.recipe_dirs.iter().chain(extra_dirs).collect();
        let catalog = RecipeCatalog::with_dirs(&dirs).context("Failed to load recipes")?;

        Ok(Self { config, catalog })
    }
}
