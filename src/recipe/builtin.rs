// src/recipe/builtin.rs

//! Recipe catalogue
//!
//! The built-in declarations ship inside the binary. Directories listed in
//! the configuration are layered on top; a later declaration of the same
//! id replaces an earlier one.

use crate::error::{Error, Result};
use crate::recipe::format::RecipeDeclaration;
use crate::recipe::parser::{parse_recipe, parse_recipe_file, validate_recipe};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::{debug, info};

const BUILTIN_RECIPES: &[(&str, &str)] = &[
    ("m4@1.4", include_str!("../../recipes/m4@1.4.toml")),
    ("bison@3.0", include_str!("../../recipes/bison@3.0.toml")),
    ("binutils@2.26", include_str!("../../recipes/binutils@2.26.toml")),
    ("linux-headers@4.4", include_str!("../../recipes/linux-headers@4.4.toml")),
    ("glibc@2.17", include_str!("../../recipes/glibc@2.17.toml")),
    ("portable-ruby", include_str!("../../recipes/portable-ruby.toml")),
];

/// Recipe declarations by id
#[derive(Debug, Clone, Default)]
pub struct RecipeCatalog {
    recipes: BTreeMap<String, RecipeDeclaration>,
}

impl RecipeCatalog {
    /// An empty catalogue
    pub fn new() -> Self {
        Self::default()
    }

    /// The declarations compiled into this binary
    pub fn builtin() -> Result<Self> {
        let mut catalog = Self::new();
        for (id, content) in BUILTIN_RECIPES {
            let recipe = parse_recipe(content)
                .map_err(|e| Error::ParseError(format!("built-in recipe {}: {}", id, e)))?;
            catalog.insert(recipe)?;
        }
        Ok(catalog)
    }

    /// Built-in declarations overlaid with each directory in order
    pub fn with_dirs<P: AsRef<Path>>(dirs: &[P]) -> Result<Self> {
        let mut catalog = Self::builtin()?;
        for dir in dirs {
            catalog.load_dir(dir.as_ref())?;
        }
        Ok(catalog)
    }

    /// Add every `*.toml` declaration in `dir`
    ///
    /// Returns the number of recipes loaded.
    pub fn load_dir(&mut self, dir: &Path) -> Result<usize> {
        if !dir.is_dir() {
            return Err(Error::ConfigError(format!(
                "Recipe directory not found: {}",
                dir.display()
            )));
        }

        let pattern = dir.join("*.toml");
        let paths = glob::glob(&pattern.to_string_lossy())
            .map_err(|e| Error::ConfigError(format!("Invalid recipe directory pattern: {}", e)))?;

        let mut count = 0;
        for entry in paths {
            let path = entry.map_err(|e| Error::Io(e.into_error()))?;
            let recipe = parse_recipe_file(&path)?;
            let replaced = self
                .insert(recipe)
                .map_err(|e| Error::ParseError(format!("{}: {}", path.display(), e)))?;
            if let Some(previous) = replaced {
                info!("{} replaces the earlier {} declaration", path.display(), previous.id());
            }
            count += 1;
        }

        debug!("Loaded {} recipes from {}", count, dir.display());
        Ok(count)
    }

    /// Add a validated declaration, returning the one it replaced
    pub fn insert(&mut self, recipe: RecipeDeclaration) -> Result<Option<RecipeDeclaration>> {
        for warning in validate_recipe(&recipe)? {
            debug!("{}: {}", recipe.id(), warning);
        }
        Ok(self.recipes.insert(recipe.id().to_string(), recipe))
    }

    pub fn get(&self, id: &str) -> Option<&RecipeDeclaration> {
        self.recipes.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.recipes.contains_key(id)
    }

    /// All declarations in id order
    pub fn iter(&self) -> impl Iterator<Item = &RecipeDeclaration> {
        self.recipes.values()
    }

    pub fn len(&self) -> usize {
        self.recipes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.recipes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::OsFamily;
    use crate::recipe::DependencyPhase;

    #[test]
    fn test_builtin_catalogue_parses() {
        let catalog = RecipeCatalog::builtin().unwrap();
        assert_eq!(catalog.len(), BUILTIN_RECIPES.len());
        for (id, _) in BUILTIN_RECIPES {
            assert!(catalog.contains(id), "missing {}", id);
        }
    }

    #[test]
    fn test_builtin_glibc() {
        let catalog = RecipeCatalog::builtin().unwrap();
        let glibc = catalog.get("glibc@2.17").unwrap();

        assert_eq!(glibc.package.os, Some(OsFamily::Linux));
        assert!(glibc.package.build_only);
        assert_eq!(glibc.requires.len(), 4);
        assert_eq!(glibc.requires[3].kernel.map(|v| v.to_string()).as_deref(), Some("2.6.16"));
        assert_eq!(glibc.depends[0].phase, DependencyPhase::BuildTime);
    }

    #[test]
    fn test_builtin_portable_ruby() {
        let catalog = RecipeCatalog::builtin().unwrap();
        let ruby = catalog.get("portable-ruby").unwrap();
        assert!(ruby.package.portable);
        assert_eq!(
            ruby.rewrite.as_ref().unwrap().config_record,
            "lib/ruby/*/*/rbconfig.rb"
        );
    }

    #[test]
    fn test_load_dir_overrides() {
        let temp = tempfile::tempdir().unwrap();
        std::fs::write(
            temp.path().join("m4.toml"),
            r#"
[package]
name = "m4@1.4"
version = "1.4.20"
"#,
        )
        .unwrap();
        std::fs::write(
            temp.path().join("zlib.toml"),
            r#"
[package]
name = "zlib"
version = "1.3.1"
portable = true
"#,
        )
        .unwrap();
        std::fs::write(temp.path().join("README.md"), "not a recipe").unwrap();

        let catalog = RecipeCatalog::with_dirs(&[temp.path()]).unwrap();
        assert_eq!(catalog.get("m4@1.4").unwrap().package.version, "1.4.20");
        assert!(catalog.get("zlib").unwrap().package.portable);
        assert_eq!(catalog.len(), BUILTIN_RECIPES.len() + 1);
    }

    #[test]
    fn test_load_missing_dir() {
        let mut catalog = RecipeCatalog::new();
        assert!(catalog.load_dir(Path::new("/nonexistent/recipes")).is_err());
    }
}
