// src/recipe/parser.rs

//! Recipe file parsing

use crate::error::{Error, Result};
use crate::recipe::format::RecipeDeclaration;
use std::path::Path;

/// Parse a recipe from a TOML string
pub fn parse_recipe(content: &str) -> Result<RecipeDeclaration> {
    toml::from_str(content).map_err(|e| Error::ParseError(format!("Invalid recipe: {}", e)))
}

/// Parse a recipe from a file
pub fn parse_recipe_file(path: &Path) -> Result<RecipeDeclaration> {
    let content = std::fs::read_to_string(path)?;

    parse_recipe(&content)
        .map_err(|e| Error::ParseError(format!("{}: {}", path.display(), e)))
}

/// Validate a recipe for completeness and correctness
///
/// Hard errors abort; the returned strings are warnings.
pub fn validate_recipe(recipe: &RecipeDeclaration) -> Result<Vec<String>> {
    let mut warnings = Vec::new();
    let id = recipe.id();

    if id.is_empty() {
        return Err(Error::ParseError("Recipe package name cannot be empty".to_string()));
    }
    if recipe.package.version.is_empty() {
        return Err(Error::ParseError(format!(
            "Recipe {} has an empty version",
            id
        )));
    }

    if let Some(source) = &recipe.source
        && !source.checksum.starts_with("sha256:")
        && !source.checksum.starts_with("sha512:")
    {
        return Err(Error::ParseError(format!(
            "Invalid checksum format in {}: {}. Expected sha256:... or sha512:...",
            id, source.checksum
        )));
    }

    if let Some(dep) = recipe.depends.iter().find(|d| d.name == id) {
        return Err(Error::DependencyCycle {
            participants: vec![dep.name.clone()],
        });
    }

    // Each requirement must be evaluable
    for requirement in &recipe.requires {
        requirement.to_check(id)?;
    }

    if let Some(rewrite) = &recipe.rewrite {
        glob::Pattern::new(&rewrite.config_record).map_err(|e| {
            Error::ParseError(format!(
                "Invalid config_record pattern in {}: {}",
                id, e
            ))
        })?;
        if !recipe.package.portable {
            warnings.push("Config-record rewrite declared on a non-portable recipe".to_string());
        }
    }

    if recipe.package.summary.is_none() {
        warnings.push("Missing package summary".to_string());
    }
    if recipe.package.license.is_none() {
        warnings.push("Missing package license".to_string());
    }
    if recipe.build.install.is_none() {
        warnings.push("No install command specified".to_string());
    }

    Ok(warnings)
}
