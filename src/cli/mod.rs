// src/cli/mod.rs
//! CLI definitions for the portable toolchain builder
//!
//! This module contains the command-line interface definitions using clap.
//! The command implementations are in the `commands` module.
//!
//! Inspection:
//! - `profile` - Detected host profile, target resolution and flags
//! - `recipes` - Recipes in the catalogue
//! - `check` - Host requirements for a recipe and its dependencies
//! - `plan` - Ordered dependency plan for a recipe
//! - `env` - Environment a recipe's build steps would see
//!
//! Building:
//! - `build` - Build a recipe (and optionally its dependencies)
//! - `rewrite` - Strip portable flags from an installed config record
//! - `linkage` - Verify an installed tree does not reference forbidden prefixes

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "portable")]
#[command(author = "Portable Toolchain Contributors")]
#[command(version)]
#[command(about = "Build toolchain components that run on older OS releases", long_about = None)]
pub struct Cli {
    /// Configuration file (default: $PORTABLE_CONFIG, then the user config directory)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Extra recipe directory layered over the catalogue (repeatable)
    #[arg(short = 'R', long = "recipe-dir", global = true)]
    pub recipe_dirs: Vec<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Show the detected host profile and its portable resolution
    Profile {
        /// Print JSON instead of text
        #[arg(long)]
        json: bool,
    },

    /// List recipes in the catalogue
    Recipes,

    /// Check host requirements for a recipe and everything it depends on
    Check {
        /// Recipe id, e.g. glibc@2.17
        recipe: String,
    },

    /// Show the ordered dependency plan for a recipe
    Plan {
        /// Recipe id
        recipe: String,

        /// Print JSON instead of text
        #[arg(long)]
        json: bool,
    },

    /// Show the sanitized environment a recipe's build steps would see
    Env {
        /// Recipe id
        recipe: String,

        /// Print JSON instead of text
        #[arg(long)]
        json: bool,
    },

    /// Build a recipe from an unpacked source tree
    Build {
        /// Recipe id
        recipe: String,

        /// Unpacked source tree (with --with-deps, holds one directory per recipe id)
        #[arg(short, long)]
        source_dir: PathBuf,

        /// Also build every declared dependency, in plan order
        #[arg(long)]
        with_deps: bool,

        /// Show the build steps without running them
        #[arg(long)]
        dry_run: bool,

        /// Parallel make jobs (overrides the configuration)
        #[arg(short, long)]
        jobs: Option<usize>,
    },

    /// Strip this host's portable flags from an installed config record
    Rewrite {
        /// Config record to rewrite in place
        file: PathBuf,
    },

    /// Verify an installed tree does not link against forbidden prefixes
    Linkage {
        /// Installed keg to scan
        dir: PathBuf,

        /// Additional forbidden prefix (repeatable)
        #[arg(long = "forbid")]
        forbid: Vec<PathBuf>,
    },
}
