// src/build/mod.rs

//! Build execution boundary
//!
//! A [`BuildJob`] is everything the pipeline decided about one recipe:
//! substituted shell steps, the install prefix, and the pending environment.
//! A [`BuildExecutor`] runs it. The environment is resolved and installed
//! on each spawned command exactly here, never earlier.

use crate::error::{Error, Result};
use crate::portable::{BuildEnvironment, FlagSet, SanitizedEnvironment};
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::process::Command;
use strum_macros::Display;
use tracing::{debug, info};

/// Build phase a step belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum StepKind {
    Configure,
    Make,
    Install,
    PostInstall,
}

/// One shell command
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BuildStep {
    pub kind: StepKind,
    pub command: String,
}

/// A recipe ready to build
#[derive(Debug, Clone, Serialize)]
pub struct BuildJob {
    pub recipe: String,
    /// Keg-only install prefix
    pub prefix: PathBuf,
    /// Subdirectory of the source tree the steps run in
    pub workdir: Option<String>,
    pub steps: Vec<BuildStep>,
    pub environment: SanitizedEnvironment,
    /// Flags to strip from the installed configuration record
    pub strip_flags: Option<FlagSet>,
    /// Glob for the configuration record, relative to `prefix`
    pub config_record: Option<String>,
}

impl BuildJob {
    /// Directory the steps run in
    pub fn working_dir(&self, source_dir: &Path) -> PathBuf {
        match &self.workdir {
            Some(sub) => source_dir.join(sub),
            None => source_dir.to_path_buf(),
        }
    }
}

/// Runs build jobs
pub trait BuildExecutor {
    fn execute(&mut self, job: &BuildJob, source_dir: &Path) -> Result<()>;

    /// Whether executed jobs actually land in their install prefix
    fn installs(&self) -> bool {
        true
    }
}

/// Runs each step with `sh -c`
#[derive(Debug, Default)]
pub struct ShellExecutor {
    ambient: Option<BTreeMap<String, String>>,
}

impl ShellExecutor {
    /// Executor that starts from this process's environment
    pub fn new() -> Self {
        Self::default()
    }

    /// Executor that starts from a fixed ambient environment
    pub fn with_ambient(ambient: BTreeMap<String, String>) -> Self {
        Self {
            ambient: Some(ambient),
        }
    }

    fn environment(&self, job: &BuildJob) -> BuildEnvironment {
        match &self.ambient {
            Some(vars) => job.environment.apply(vars.clone()),
            None => job.environment.apply_current(),
        }
    }

    fn run_step(
        &self,
        recipe: &str,
        step: &BuildStep,
        workdir: &Path,
        env: &BuildEnvironment,
    ) -> Result<()> {
        info!("[{}] {}: {}", recipe, step.kind, step.command);

        let mut command = Command::new("sh");
        command.arg("-c").arg(&step.command).current_dir(workdir);
        env.configure(&mut command);

        let output = command.output().map_err(|e| Error::BuildFailed {
            recipe: recipe.to_string(),
            step: step.kind.to_string(),
            reason: format!("failed to spawn shell: {}", e),
        })?;

        let stdout = String::from_utf8_lossy(&output.stdout);
        let stderr = String::from_utf8_lossy(&output.stderr);
        if !stdout.is_empty() {
            debug!("[{}] {} stdout:\n{}", recipe, step.kind, stdout.trim_end());
        }

        if !output.status.success() {
            return Err(Error::BuildFailed {
                recipe: recipe.to_string(),
                step: step.kind.to_string(),
                reason: format!(
                    "exit code {:?}\nstderr: {}",
                    output.status.code(),
                    stderr.trim_end()
                ),
            });
        }

        Ok(())
    }
}

impl BuildExecutor for ShellExecutor {
    fn execute(&mut self, job: &BuildJob, source_dir: &Path) -> Result<()> {
        let workdir = job.working_dir(source_dir);
        std::fs::create_dir_all(&workdir)?;

        let env = self.environment(job);
        for step in &job.steps {
            self.run_step(&job.recipe, step, &workdir, &env)?;
        }

        Ok(())
    }
}

/// Records jobs instead of running them
#[derive(Debug, Default)]
pub struct DryRunExecutor {
    jobs: Vec<BuildJob>,
}

impl DryRunExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Jobs seen so far, in execution order
    pub fn jobs(&self) -> &[BuildJob] {
        &self.jobs
    }
}

impl BuildExecutor for DryRunExecutor {
    fn execute(&mut self, job: &BuildJob, source_dir: &Path) -> Result<()> {
        info!(
            "[dry-run] would build {} in {}",
            job.recipe,
            job.working_dir(source_dir).display()
        );
        for step in &job.steps {
            info!("[dry-run]   {}: {}", step.kind, step.command);
        }
        self.jobs.push(job.clone());
        Ok(())
    }

    fn installs(&self) -> bool {
        false
    }
}
