// src/commands/inspect.rs

//! Read-only inspection commands
//!
//! None of these run a build step. `check` and `env` may query the host
//! compiler and installed tools.

use super::Session;
use anyhow::{Context, Result};
use portable_toolchain::build::StepKind;
use portable_toolchain::platform::PlatformProfile;
use portable_toolchain::portable::EnvAction;
use portable_toolchain::requirement::LiveHost;
use portable_toolchain::{Error, Pipeline};

/// Show the detected host profile and what portable builds resolve to
pub fn cmd_profile(session: &Session, json: bool) -> Result<()> {
    let profile = PlatformProfile::current().context("Failed to detect host platform")?;
    let host = LiveHost::new(profile);
    let pipeline = Pipeline::new(&session.config, &session.catalog, profile, &host);

    let pin = session.config.pinned_target(profile.cpu_arch);
    let resolution = pipeline.resolution();
    let flags = pipeline
        .flags(&resolution)
        .context("Failed to compose portable flags")?;

    if json {
        let value = serde_json::json!({
            "profile": profile,
            "pinned_target": pin,
            "resolution": resolution,
            "flags": flags,
        });
        println!("{}", serde_json::to_string_pretty(&value)?);
        return Ok(());
    }

    println!("Host platform:");
    println!("  OS:       {} {}", profile.os_family, profile.os_version);
    println!("  Arch:     {}", profile.cpu_arch);
    println!("  Kernel:   {}", profile.kernel_version);
    println!("  Compiler: {}", profile.default_compiler);

    println!("\nPortable target:");
    if profile.is_macos() {
        println!("  Pinned:   Darwin {} ({})", pin.darwin, pin.name);
    }
    if resolution.is_cross() {
        println!("  Mode:     cross-release");
        for arg in resolution.configure_args() {
            println!("            {}", arg);
        }
    } else {
        println!("  Mode:     native");
    }

    let combined = flags.combined();
    println!("\nFlags:");
    println!("  CFLAGS:   {}", combined.cflags_string());
    println!("  LDFLAGS:  {}", combined.ldflags_string());

    Ok(())
}

/// List every recipe in the catalogue
pub fn cmd_recipes(session: &Session) -> Result<()> {
    if session.catalog.is_empty() {
        println!("No recipes found.");
        return Ok(());
    }

    println!("Recipes ({}):", session.catalog.len());
    for recipe in session.catalog.iter() {
        let mut tags = Vec::new();
        if recipe.package.portable {
            tags.push("portable".to_string());
        }
        if recipe.package.build_only {
            tags.push("build-only".to_string());
        }
        if let Some(os) = recipe.package.os {
            tags.push(format!("{} only", os));
        }

        let tags = if tags.is_empty() {
            String::new()
        } else {
            format!(" [{}]", tags.join(", "))
        };
        println!(
            "  {} {}{}",
            recipe.id(),
            recipe.package.version,
            tags
        );
        if let Some(summary) = &recipe.package.summary {
            println!("      {}", summary);
        }
    }

    Ok(())
}

/// Report every host requirement of a recipe's plan
///
/// Unlike a build, which stops at the first fatal failure, this reports all
/// of them before failing.
pub fn cmd_check(session: &Session, recipe_id: &str) -> Result<()> {
    let profile = PlatformProfile::current().context("Failed to detect host platform")?;
    let host = LiveHost::new(profile);
    let pipeline = Pipeline::new(&session.config, &session.catalog, profile, &host);

    let plan = pipeline.plan(recipe_id)?;
    println!("Checking requirements for {}...\n", recipe_id);

    let mut missing = Vec::new();
    let mut total = 0;
    for entry in plan.entries().iter().filter(|e| !e.external) {
        let Some(recipe) = session.catalog.get(&entry.id) else {
            continue;
        };
        for spec in &recipe.requires {
            let check = spec.to_check(recipe.id())?;
            total += 1;
            match check.check(&host) {
                Ok(()) => println!("  [OK] {} ({})", check.display_name(), recipe.id()),
                Err(Error::UnmetRequirement { message, .. }) if !check.fatal() => {
                    println!("  [WARN] {} ({})", check.display_name(), recipe.id());
                    println!("         {}", message.replace('\n', "\n         "));
                }
                Err(Error::UnmetRequirement { message, .. }) => {
                    println!("  [MISSING] {} ({})", check.display_name(), recipe.id());
                    println!("         {}", message.replace('\n', "\n         "));
                    missing.push(check.display_name());
                }
                Err(e) => return Err(e).context(format!("Failed to check {}", check.display_name())),
            }
        }
    }

    println!();
    if total == 0 {
        println!("No host requirements.");
    }
    if !missing.is_empty() {
        anyhow::bail!("Missing requirements: {}", missing.join(", "));
    }
    println!("All requirements satisfied.");
    Ok(())
}

/// Show the ordered dependency plan
pub fn cmd_plan(session: &Session, recipe_id: &str, json: bool) -> Result<()> {
    let profile = PlatformProfile::current().context("Failed to detect host platform")?;
    let host = LiveHost::new(profile);
    let pipeline = Pipeline::new(&session.config, &session.catalog, profile, &host);

    let plan = pipeline.plan(recipe_id)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&plan)?);
        return Ok(());
    }

    println!("Build plan for {} on {} {}:", recipe_id, profile.os_family, profile.cpu_arch);
    for (i, entry) in plan.entries().iter().enumerate() {
        let mut notes = vec![entry.phase.as_str()];
        if entry.build_only {
            notes.push("build-only");
        }
        if entry.external {
            notes.push("external");
        }
        println!("  {:>2}. {} ({})", i + 1, entry.id, notes.join(", "));
    }

    Ok(())
}

/// Show the environment the requested recipe's build steps would see
pub fn cmd_env(session: &Session, recipe_id: &str, json: bool) -> Result<()> {
    let profile = PlatformProfile::current().context("Failed to detect host platform")?;
    let host = LiveHost::new(profile);
    let pipeline = Pipeline::new(&session.config, &session.catalog, profile, &host);

    let prepared = pipeline
        .prepare(recipe_id)
        .with_context(|| format!("Failed to prepare {}", recipe_id))?;
    let job = prepared
        .requested_job()
        .with_context(|| format!("No build job for {}", recipe_id))?;

    if json {
        println!("{}", serde_json::to_string_pretty(&job.environment)?);
        return Ok(());
    }

    for warning in &prepared.warnings {
        println!("[WARN] {}", warning);
    }

    if let Some(configure) = job.steps.iter().find(|s| s.kind == StepKind::Configure) {
        println!("Configure:\n  {}\n", configure.command);
    }

    println!("Environment changes for {}:", recipe_id);
    for (name, action) in job.environment.actions() {
        match action {
            EnvAction::Remove => println!("  unset  {}", name),
            EnvAction::Set(value) => println!("  set    {}={}", name, value),
            EnvAction::Append(value) => println!("  append {}+= {}", name, value),
        }
    }

    let resolved = job.environment.apply_current();
    println!("\nResolved build variables:");
    for name in ["CFLAGS", "CXXFLAGS", "LDFLAGS", "MAKEFLAGS"] {
        if let Some(value) = resolved.get(name) {
            println!("  {}={}", name, value);
        }
    }

    Ok(())
}
