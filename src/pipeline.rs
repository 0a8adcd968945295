// src/pipeline.rs

//! End-to-end preparation and execution of a portable build
//!
//! [`Pipeline::prepare`] is pure apart from the host queries it makes: it
//! plans the recipe, gates on every requirement in the plan, resolves the
//! target, composes flags, and builds one [`BuildJob`] per recipe with its
//! own pending environment. [`Pipeline::execute`] hands those jobs to a
//! [`BuildExecutor`] and cleans up configuration records afterwards.

use crate::build::{BuildExecutor, BuildJob, BuildStep, StepKind};
use crate::config::PortableConfig;
use crate::error::{Error, Result};
use crate::plan::{plan, BuildPlan};
use crate::platform::{CompilerProbe, PlatformProfile};
use crate::portable::{
    compose, portable_flags, removal_set, resolve, target, FlagSet, PortableFlags, Resolution,
    SanitizedEnvironment,
};
use crate::recipe::{RecipeCatalog, RecipeDeclaration};
use crate::requirement::{evaluate, HostProbe, RequirementCheck};
use crate::rewrite::{rewrite_installed, RewriteOutcome};
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Everything decided before the first build step runs
#[derive(Debug, Clone, Serialize)]
pub struct PreparedBuild {
    pub resolution: Resolution,
    pub flags: PortableFlags,
    pub plan: BuildPlan,
    /// One job per non-external plan entry, in build order
    pub jobs: Vec<BuildJob>,
    /// Messages from non-fatal requirement failures
    pub warnings: Vec<String>,
}

impl PreparedBuild {
    /// The job for the requested recipe
    pub fn requested_job(&self) -> Option<&BuildJob> {
        self.jobs.iter().find(|j| j.recipe == self.plan.requested())
    }
}

/// What [`Pipeline::execute`] did
#[derive(Debug, Clone, Default)]
pub struct BuildReport {
    pub built: Vec<String>,
    pub rewrites: Vec<(PathBuf, RewriteOutcome)>,
}

/// Portable build driver for one host
pub struct Pipeline<'a> {
    config: &'a PortableConfig,
    catalog: &'a RecipeCatalog,
    profile: &'a PlatformProfile,
    host: &'a dyn HostProbe,
    compiler: Option<&'a dyn CompilerProbe>,
}

impl<'a> Pipeline<'a> {
    pub fn new(
        config: &'a PortableConfig,
        catalog: &'a RecipeCatalog,
        profile: &'a PlatformProfile,
        host: &'a dyn HostProbe,
    ) -> Self {
        Self {
            config,
            catalog,
            profile,
            host,
            compiler: None,
        }
    }

    /// Query this compiler instead of the profile's, bypassing the flag cache
    pub fn with_compiler(mut self, compiler: &'a dyn CompilerProbe) -> Self {
        self.compiler = Some(compiler);
        self
    }

    pub fn profile(&self) -> &PlatformProfile {
        self.profile
    }

    /// Plan `recipe_id` for this host
    pub fn plan(&self, recipe_id: &str) -> Result<BuildPlan> {
        plan(self.catalog, self.profile, &self.config.baseline, recipe_id)
    }

    /// Native or cross-release resolution for this host
    pub fn resolution(&self) -> Resolution {
        resolve(self.profile, self.config.pinned_target(self.profile.cpu_arch))
    }

    /// Portable flags for this host
    pub fn flags(&self, resolution: &Resolution) -> Result<PortableFlags> {
        let policy = self.config.flag_policy(self.profile.cpu_arch);
        match self.compiler {
            Some(compiler) => compose(self.profile, resolution, &policy, compiler),
            None => portable_flags(self.profile, resolution, &policy),
        }
    }

    /// Evaluate every requirement of every declared recipe in the plan
    ///
    /// Plan order, requested recipe last; stops at the first fatal failure.
    pub fn check(&self, plan: &BuildPlan) -> Result<Vec<String>> {
        let mut checks: Vec<Box<dyn RequirementCheck>> = Vec::new();
        for recipe in self.declared(plan) {
            for requirement in &recipe.requires {
                checks.push(requirement.to_check(recipe.id())?);
            }
        }
        debug!("Evaluating {} requirements for {}", checks.len(), plan.requested());
        evaluate(&checks, self.host)
    }

    /// Decide everything about building `recipe_id`
    pub fn prepare(&self, recipe_id: &str) -> Result<PreparedBuild> {
        let plan = self.plan(recipe_id)?;
        let warnings = self.check(&plan)?;

        let resolution = self.resolution();
        let flags = self.flags(&resolution)?;

        let declared: Vec<&RecipeDeclaration> = self.declared(&plan).collect();
        if declared.iter().any(|r| r.package.portable) {
            target::warn_if_newer_than_baseline(
                self.profile,
                self.config.pinned_target(self.profile.cpu_arch),
            );
        }

        let jobs = declared
            .into_iter()
            .map(|recipe| self.job(recipe, &flags))
            .collect();

        Ok(PreparedBuild {
            resolution,
            flags,
            plan,
            jobs,
            warnings,
        })
    }

    /// Run prepared jobs
    ///
    /// Without `with_deps` only the requested recipe is built, from
    /// `source_dir`. With it, every job is built from
    /// `source_dir/<recipe id>`.
    pub fn execute(
        &self,
        prepared: &PreparedBuild,
        executor: &mut dyn BuildExecutor,
        source_dir: &Path,
        with_deps: bool,
    ) -> Result<BuildReport> {
        let mut report = BuildReport::default();

        let jobs: Vec<&BuildJob> = if with_deps {
            prepared.jobs.iter().collect()
        } else {
            let job = prepared
                .requested_job()
                .ok_or_else(|| Error::UnknownRecipe(prepared.plan.requested().to_string()))?;
            vec![job]
        };

        for job in jobs {
            let dir = if with_deps {
                source_dir.join(&job.recipe)
            } else {
                source_dir.to_path_buf()
            };

            info!("Building {} into {}", job.recipe, job.prefix.display());
            executor.execute(job, &dir)?;
            report.built.push(job.recipe.clone());

            if let (Some(pattern), Some(strip)) = (&job.config_record, &job.strip_flags) {
                if executor.installs() {
                    report
                        .rewrites
                        .extend(rewrite_installed(&job.prefix, pattern, strip)?);
                } else {
                    debug!("Not rewriting {} under {}, nothing was installed", pattern, job.prefix.display());
                }
            }
        }

        Ok(report)
    }

    fn declared<'p>(&'p self, plan: &'p BuildPlan) -> impl Iterator<Item = &'a RecipeDeclaration> + 'p {
        plan.entries()
            .iter()
            .filter(|e| !e.external)
            .filter_map(|e| self.catalog.get(&e.id))
    }

    fn job(&self, recipe: &RecipeDeclaration, flags: &PortableFlags) -> BuildJob {
        let id = recipe.id();
        let portable = recipe.package.portable;
        let prefix = self.config.opt_dir(id);

        let mut vars = BTreeMap::new();
        vars.insert("prefix", prefix.display().to_string());
        vars.insert("opt_prefix", self.config.prefix.join("opt").display().to_string());
        vars.insert("jobs", self.config.jobs.to_string());

        let mut recipe_flags = FlagSet::new();
        let mut make_args = Vec::new();
        for conditional in recipe.flags_for(self.profile) {
            recipe_flags.cflags.extend(conditional.cflags.iter().cloned());
            recipe_flags.ldflags.extend(conditional.ldflags.iter().cloned());
            make_args.extend(conditional.make_args.iter().cloned());
        }

        let mut environment = if portable {
            SanitizedEnvironment::from_removals(removal_set(
                self.profile.os_family,
                &self.config.environment_policy(),
            ))
        } else {
            SanitizedEnvironment::new()
        };
        for name in &recipe.environment.remove {
            environment.remove(name.as_str());
        }

        let mut all_flags = if portable { flags.combined() } else { FlagSet::new() };
        all_flags.extend(&recipe_flags);
        environment.append_flags(&all_flags);
        environment.set("MAKEFLAGS", format!("-j{}", self.config.jobs));
        for (name, value) in &recipe.environment.set {
            environment.set(name.as_str(), recipe.substitute(value, &vars));
        }

        let configure_args: &[String] = if portable {
            flags.configure_args.as_slice()
        } else {
            &[]
        };

        let mut steps = Vec::new();
        let build = &recipe.build;
        let mut push = |kind: StepKind, template: &Option<String>, extra: &[String]| {
            if let Some(template) = template {
                let mut command = recipe.substitute(template, &vars);
                for arg in extra {
                    command.push(' ');
                    command.push_str(arg);
                }
                steps.push(BuildStep { kind, command });
            }
        };
        push(StepKind::Configure, &build.configure, configure_args);
        push(StepKind::Make, &build.make, &make_args);
        push(StepKind::Install, &build.install, &make_args);
        push(StepKind::PostInstall, &build.post_install, &[]);

        BuildJob {
            recipe: id.to_string(),
            prefix,
            workdir: build.workdir.clone(),
            steps,
            environment,
            strip_flags: (portable && !flags.portable.is_empty()).then(|| flags.portable.clone()),
            config_record: recipe.rewrite.as_ref().map(|r| r.config_record.clone()),
        }
    }
}
