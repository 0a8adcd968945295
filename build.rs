// build.rs

use clap::{Arg, ArgAction, Command};
use clap_mangen::Man;
use std::env;
use std::fs;
use std::path::PathBuf;

/// Common argument: recipe id
fn recipe_arg() -> Arg {
    Arg::new("recipe").required(true).help("Recipe id, e.g. glibc@2.17")
}

/// Common argument: JSON output
fn json_arg() -> Arg {
    Arg::new("json")
        .long("json")
        .action(ArgAction::SetTrue)
        .help("Print JSON instead of text")
}

fn build_cli() -> Command {
    Command::new("portable")
        .version(env!("CARGO_PKG_VERSION"))
        .author("Portable Toolchain Contributors")
        .about("Build toolchain components that run on older OS releases")
        .subcommand_required(false)
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("PATH")
                .global(true)
                .help("Configuration file (default: $PORTABLE_CONFIG, then the user config directory)"),
        )
        .arg(
            Arg::new("recipe_dir")
                .short('R')
                .long("recipe-dir")
                .value_name("DIR")
                .action(ArgAction::Append)
                .global(true)
                .help("Extra recipe directory layered over the catalogue"),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .action(ArgAction::SetTrue)
                .global(true)
                .help("Enable debug logging"),
        )
        .subcommand(
            Command::new("profile")
                .about("Show the detected host profile and its portable resolution")
                .arg(json_arg()),
        )
        .subcommand(Command::new("recipes").about("List recipes in the catalogue"))
        .subcommand(
            Command::new("check")
                .about("Check host requirements for a recipe and everything it depends on")
                .arg(recipe_arg()),
        )
        .subcommand(
            Command::new("plan")
                .about("Show the ordered dependency plan for a recipe")
                .arg(recipe_arg())
                .arg(json_arg()),
        )
        .subcommand(
            Command::new("env")
                .about("Show the sanitized environment a recipe's build steps would see")
                .arg(recipe_arg())
                .arg(json_arg()),
        )
        .subcommand(
            Command::new("build")
                .about("Build a recipe from an unpacked source tree")
                .arg(recipe_arg())
                .arg(
                    Arg::new("source_dir")
                        .short('s')
                        .long("source-dir")
                        .required(true)
                        .help("Unpacked source tree"),
                )
                .arg(
                    Arg::new("with_deps")
                        .long("with-deps")
                        .action(ArgAction::SetTrue)
                        .help("Also build every declared dependency, in plan order"),
                )
                .arg(
                    Arg::new("dry_run")
                        .long("dry-run")
                        .action(ArgAction::SetTrue)
                        .help("Show the build steps without running them"),
                )
                .arg(
                    Arg::new("jobs")
                        .short('j')
                        .long("jobs")
                        .help("Parallel make jobs"),
                ),
        )
        .subcommand(
            Command::new("rewrite")
                .about("Strip this host's portable flags from an installed config record")
                .arg(Arg::new("file").required(true).help("Config record to rewrite in place")),
        )
        .subcommand(
            Command::new("linkage")
                .about("Verify an installed tree does not link against forbidden prefixes")
                .arg(Arg::new("dir").required(true).help("Installed keg to scan"))
                .arg(
                    Arg::new("forbid")
                        .long("forbid")
                        .action(ArgAction::Append)
                        .help("Additional forbidden prefix"),
                ),
        )
}

fn main() {
    println!("cargo:rerun-if-changed=build.rs");

    let manifest_dir = match env::var("CARGO_MANIFEST_DIR") {
        Ok(dir) => PathBuf::from(dir),
        Err(e) => {
            println!("cargo:warning=CARGO_MANIFEST_DIR not set: {}", e);
            return;
        }
    };
    let man_dir = manifest_dir.join("man");

    if let Err(e) = fs::create_dir_all(&man_dir) {
        println!("cargo:warning=Failed to create man directory: {}", e);
        return;
    }

    let man = Man::new(build_cli());
    let mut buffer = Vec::new();

    if let Err(e) = man.render(&mut buffer) {
        println!("cargo:warning=Failed to render man page: {}", e);
        return;
    }

    let man_path = man_dir.join("portable.1");
    if let Err(e) = fs::write(&man_path, buffer) {
        println!("cargo:warning=Failed to write man page: {}", e);
    }
}
