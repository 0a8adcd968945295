// src/commands/build.rs

//! Build, post-install rewrite, and linkage verification commands

use super::Session;
use anyhow::{Context, Result};
use portable_toolchain::build::BuildExecutor;
use portable_toolchain::linkage::verify_linkage;
use portable_toolchain::platform::PlatformProfile;
use portable_toolchain::requirement::LiveHost;
use portable_toolchain::rewrite::{rewrite_file, RewriteOutcome};
use portable_toolchain::{DryRunExecutor, Pipeline, ShellExecutor};
use std::path::{Path, PathBuf};
use tracing::info;

/// Build a recipe from an unpacked source tree
pub fn cmd_build(
    session: &Session,
    recipe_id: &str,
    source_dir: &Path,
    with_deps: bool,
    dry_run: bool,
    jobs: Option<usize>,
) -> Result<()> {
    let config = match jobs {
        Some(0) => anyhow::bail!("--jobs must be at least 1"),
        Some(j) => session.config.clone().with_jobs(j),
        None => session.config.clone(),
    };

    if !dry_run && !source_dir.is_dir() {
        anyhow::bail!("Source directory not found: {}", source_dir.display());
    }

    let profile = PlatformProfile::current().context("Failed to detect host platform")?;
    let host = LiveHost::new(profile);
    let pipeline = Pipeline::new(&config, &session.catalog, profile, &host);

    println!("Preparing {}...", recipe_id);
    let prepared = pipeline
        .prepare(recipe_id)
        .with_context(|| format!("Failed to prepare {}", recipe_id))?;

    for warning in &prepared.warnings {
        println!("  [WARN] {}", warning);
    }
    if prepared.resolution.is_cross() {
        println!("  Cross-release: {}", prepared.resolution.configure_args().join(" "));
    }
    println!("  Jobs: {}", config.jobs);

    let mut dry_runner = DryRunExecutor::new();
    let mut shell = ShellExecutor::new();
    let executor: &mut dyn BuildExecutor = if dry_run { &mut dry_runner } else { &mut shell };

    let report = pipeline
        .execute(&prepared, executor, source_dir, with_deps)
        .with_context(|| format!("Failed to build {}", recipe_id))?;

    if dry_run {
        for job in dry_runner.jobs() {
            println!("\n{} -> {}", job.recipe, job.prefix.display());
            for step in &job.steps {
                println!("  [{}] {}", step.kind, step.command);
            }
        }
        println!("\nDry run complete, nothing was built.");
        return Ok(());
    }

    for (path, outcome) in &report.rewrites {
        match outcome {
            RewriteOutcome::Rewritten { removed } => {
                println!("  [OK] Stripped {} flag strings from {}", removed, path.display())
            }
            RewriteOutcome::Unchanged => println!("  [OK] {} needed no rewrite", path.display()),
        }
    }
    println!("\nBuilt: {}", report.built.join(", "));

    Ok(())
}

/// Strip this host's portable flags from an installed config record
pub fn cmd_rewrite(session: &Session, file: &Path) -> Result<()> {
    let profile = PlatformProfile::current().context("Failed to detect host platform")?;
    let host = LiveHost::new(profile);
    let pipeline = Pipeline::new(&session.config, &session.catalog, profile, &host);

    let flags = pipeline
        .flags(&pipeline.resolution())
        .context("Failed to compose portable flags")?;

    if flags.portable.is_empty() {
        println!("No portable flags apply on this host, nothing to strip.");
        return Ok(());
    }

    let outcome = rewrite_file(file, &flags.portable)
        .with_context(|| format!("Failed to rewrite {}", file.display()))?;
    match outcome {
        RewriteOutcome::Rewritten { removed } => {
            println!("Removed {} flag strings from {}", removed, file.display())
        }
        RewriteOutcome::Unchanged => println!("{} contains no portable flags", file.display()),
    }

    Ok(())
}

/// Verify an installed tree against the forbidden link prefixes
pub fn cmd_linkage(session: &Session, dir: &Path, extra: &[PathBuf]) -> Result<()> {
    let mut forbidden = session.config.forbidden_prefixes();
    forbidden.extend(extra.iter().cloned());
    info!("Scanning {} for references under {:?}", dir.display(), forbidden);

    let report = verify_linkage(dir, &forbidden)
        .with_context(|| format!("Failed to scan {}", dir.display()))?;

    println!("Scanned {} objects under {}", report.scanned, dir.display());
    if report.is_clean() {
        println!("  [OK] no forbidden references");
        return Ok(());
    }

    for violation in &report.violations {
        println!(
            "  [FORBIDDEN] {}: {} {}",
            violation.file.display(),
            violation.kind,
            violation.reference
        );
    }
    anyhow::bail!("{} forbidden references found", report.violations.len())
}
