// src/main.rs

use anyhow::Result;
use clap::{CommandFactory, Parser};
use tracing_subscriber::EnvFilter;

mod cli;
mod commands;

use cli::{Cli, Commands};
use commands::Session;

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing subscriber for logging; build output stays on stdout
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let Some(command) = cli.command else {
        Cli::command().print_help()?;
        return Ok(());
    };

    let session = Session::load(cli.config.as_deref(), &cli.recipe_dirs)?;

    match command {
        Commands::Profile { json } => commands::cmd_profile(&session, json),
        Commands::Recipes => commands::cmd_recipes(&session),
        Commands::Check { recipe } => commands::cmd_check(&session, &recipe),
        Commands::Plan { recipe, json } => commands::cmd_plan(&session, &recipe, json),
        Commands::Env { recipe, json } => commands::cmd_env(&session, &recipe, json),
        Commands::Build {
            recipe,
            source_dir,
            with_deps,
            dry_run,
            jobs,
        } => commands::cmd_build(&session, &recipe, &source_dir, with_deps, dry_run, jobs),
        Commands::Rewrite { file } => commands::cmd_rewrite(&session, &file),
        Commands::Linkage { dir, forbid } => commands::cmd_linkage(&session, &dir, &forbid),
    }
}
