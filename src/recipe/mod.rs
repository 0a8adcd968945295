// src/recipe/mod.rs

//! Recipe declarations
//!
//! A recipe is plain data: identity, platform-conditioned dependencies,
//! host requirements, build steps, and optional environment and flag
//! adjustments. Nothing about one recipe is changed by declaring another;
//! the planner reads the declarations and decides what applies to the host.
//!
//! # Example Recipe
//!
//! ```toml
//! [package]
//! name = "bison@3.0"
//! version = "3.0.5"
//! build_only = true
//!
//! [[depends]]
//! name = "m4@1.4"
//!
//! [build]
//! configure = "./configure --prefix=%(prefix)s"
//! install = "make install"
//! ```

mod builtin;
mod format;
pub mod graph;
pub mod parser;

pub use builtin::RecipeCatalog;
pub use format::{
    BuildSection, Condition, ConditionalFlags, DependencyPhase, DependencySpec,
    EnvironmentSection, PackageSection, RecipeDeclaration, RewriteSection, SourceSection,
};
pub use graph::RecipeGraph;
pub use parser::{parse_recipe, parse_recipe_file, validate_recipe};
