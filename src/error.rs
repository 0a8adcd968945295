// src/error.rs

//! Error types for platform resolution and build planning

use thiserror::Error;

/// Result type used throughout the library
pub type Result<T> = std::result::Result<T, Error>;

/// Errors produced while resolving, planning, or running a portable build
#[derive(Error, Debug)]
pub enum Error {
    /// A declared tool, version, or kernel floor is not satisfied
    #[error("Unmet requirement {requirement}: {message}")]
    UnmetRequirement { requirement: String, message: String },

    /// The dependency graph for the current platform is not a DAG
    #[error("Circular dependency detected: {}", format_cycle(.participants))]
    DependencyCycle { participants: Vec<String> },

    /// A host introspection subprocess failed or produced unparsable output
    #[error("Host query `{command}` failed: {reason}")]
    SubprocessQuery { command: String, reason: String },

    /// A recipe id was requested that no declaration provides
    #[error("Unknown recipe: {0}")]
    UnknownRecipe(String),

    /// A recipe cannot be built on this host
    #[error("{recipe} is not supported on this host: {reason}")]
    UnsupportedPlatform { recipe: String, reason: String },

    /// Malformed recipe declaration or version string
    #[error("Parse error: {0}")]
    ParseError(String),

    /// Invalid or unreadable configuration
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// A step handed to the build executor failed
    #[error("Build of {recipe} failed during {step}: {reason}")]
    BuildFailed {
        recipe: String,
        step: String,
        reason: String,
    },

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Render a cycle as `a -> b -> a`
fn format_cycle(participants: &[String]) -> String {
    match participants.first() {
        Some(first) => format!("{} -> {}", participants.join(" -> "), first),
        None => "(empty cycle)".to_string(),
    }
}

impl Error {
    /// Shorthand for a failed subprocess query
    pub(crate) fn query(command: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::SubprocessQuery {
            command: command.into(),
            reason: reason.into(),
        }
    }
}
