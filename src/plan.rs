// src/plan.rs

//! Dependency planning
//!
//! Flattens the declarations reachable from a requested recipe into an
//! ordered build list for one host. Only dependencies whose conditions
//! match the profile are followed; portable recipes additionally receive
//! the configured baseline. Ids with no declaration are kept as external
//! leaves, to be provided by something outside this tool.

use crate::error::{Error, Result};
use crate::platform::PlatformProfile;
use crate::recipe::{DependencyPhase, DependencySpec, RecipeCatalog, RecipeDeclaration, RecipeGraph};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet, VecDeque};
use tracing::debug;

/// One recipe in a build plan
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlanEntry {
    pub id: String,
    /// `RunTime` if reachable from the requested recipe through runtime edges only
    pub phase: DependencyPhase,
    /// Never linked by consumers at runtime
    pub build_only: bool,
    /// No declaration in the catalogue
    pub external: bool,
}

/// Ordered build list, requested recipe last
#[derive(Debug, Clone, Serialize)]
pub struct BuildPlan {
    requested: String,
    entries: Vec<PlanEntry>,
}

impl BuildPlan {
    pub fn requested(&self) -> &str {
        &self.requested
    }

    /// Every entry in build order, including the requested recipe
    pub fn entries(&self) -> &[PlanEntry] {
        &self.entries
    }

    /// Entries to build before the requested recipe
    pub fn dependencies(&self) -> &[PlanEntry] {
        &self.entries[..self.entries.len().saturating_sub(1)]
    }

    /// Dependencies that may be exposed as dependencies of the installed artifact
    pub fn public_dependencies(&self) -> impl Iterator<Item = &PlanEntry> {
        self.dependencies()
            .iter()
            .filter(|e| e.phase == DependencyPhase::RunTime && !e.build_only)
    }

    /// Ids in build order
    pub fn ids(&self) -> Vec<&str> {
        self.entries.iter().map(|e| e.id.as_str()).collect()
    }
}

/// Dependencies of `recipe` that apply on this host, baseline included
pub fn applicable_dependencies(
    recipe: &RecipeDeclaration,
    profile: &PlatformProfile,
    baseline: &[DependencySpec],
) -> Vec<DependencySpec> {
    let mut deps: Vec<DependencySpec> = recipe.dependencies_for(profile).cloned().collect();

    if recipe.package.portable {
        for dep in baseline.iter().filter(|d| d.when.matches(profile)) {
            if !deps.iter().any(|d| d.name == dep.name) {
                deps.push(dep.clone());
            }
        }
    }

    deps
}

fn ensure_supported(recipe: &RecipeDeclaration, profile: &PlatformProfile) -> Result<()> {
    if recipe.supports(profile) {
        return Ok(());
    }
    Err(Error::UnsupportedPlatform {
        recipe: recipe.id().to_string(),
        reason: format!(
            "requires {}, host is {}",
            recipe.package.os.map(|os| os.to_string()).unwrap_or_default(),
            profile.os_family
        ),
    })
}

/// Plan the build of `requested` on `profile`
pub fn plan(
    catalog: &RecipeCatalog,
    profile: &PlatformProfile,
    baseline: &[DependencySpec],
    requested: &str,
) -> Result<BuildPlan> {
    let root = catalog
        .get(requested)
        .ok_or_else(|| Error::UnknownRecipe(requested.to_string()))?;
    ensure_supported(root, profile)?;

    let mut graph = RecipeGraph::new();
    let mut runtime_edges: BTreeMap<String, Vec<String>> = BTreeMap::new();
    let mut seen = BTreeSet::from([requested.to_string()]);
    let mut queue = VecDeque::from([requested.to_string()]);

    graph.add_node(requested);

    while let Some(id) = queue.pop_front() {
        let Some(recipe) = catalog.get(&id) else {
            debug!("{} has no declaration, planning it as external", id);
            continue;
        };
        ensure_supported(recipe, profile)?;

        for dep in applicable_dependencies(recipe, profile, baseline) {
            graph.add_edge(&id, &dep.name);
            if dep.phase == DependencyPhase::RunTime {
                runtime_edges.entry(id.clone()).or_default().push(dep.name.clone());
            }
            if seen.insert(dep.name.clone()) {
                queue.push_back(dep.name);
            }
        }
    }

    let order = graph.topological_sort()?;

    let runtime = reachable(requested, &runtime_edges);
    let entries = order
        .into_iter()
        .map(|id| {
            let recipe = catalog.get(&id);
            PlanEntry {
                phase: if runtime.contains(&id) {
                    DependencyPhase::RunTime
                } else {
                    DependencyPhase::BuildTime
                },
                build_only: recipe.is_some_and(|r| r.package.build_only),
                external: recipe.is_none(),
                id,
            }
        })
        .collect();

    Ok(BuildPlan {
        requested: requested.to_string(),
        entries,
    })
}

fn reachable(start: &str, edges: &BTreeMap<String, Vec<String>>) -> BTreeSet<String> {
    let mut found = BTreeSet::from([start.to_string()]);
    let mut queue = VecDeque::from([start.to_string()]);

    while let Some(id) = queue.pop_front() {
        for next in edges.get(&id).into_iter().flatten() {
            if found.insert(next.clone()) {
                queue.push_back(next.clone());
            }
        }
    }

    found
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::{CompilerKind, CpuArch, OsFamily, ToolchainId};
    use crate::recipe::parse_recipe;
    use crate::version::Version;
    use std::path::PathBuf;

    fn profile(os: OsFamily, arch: CpuArch) -> PlatformProfile {
        PlatformProfile::new(
            os,
            arch,
            Version::new(5, 15, 0),
            Version::new(5, 15, 0),
            ToolchainId {
                kind: CompilerKind::Gcc,
                path: PathBuf::from("/usr/bin/cc"),
                version: Version::new(11, 4, 0),
            },
        )
    }

    fn recipe(name: &str, extra: &str) -> RecipeDeclaration {
        parse_recipe(&format!(
            "[package]\nname = \"{}\"\nversion = \"1.0\"\n{}",
            name, extra
        ))
        .unwrap()
    }

    fn catalog(recipes: Vec<RecipeDeclaration>) -> RecipeCatalog {
        let mut catalog = RecipeCatalog::new();
        for r in recipes {
            catalog.insert(r).unwrap();
        }
        catalog
    }

    fn baseline() -> Vec<DependencySpec> {
        crate::config::PortableConfig::default().baseline
    }

    #[test]
    fn test_chain_with_shortcut_order() {
        let catalog = catalog(vec![
            recipe("a", "[[depends]]\nname = \"b\"\n[[depends]]\nname = \"c\"\n"),
            recipe("b", "[[depends]]\nname = \"c\"\n"),
            recipe("c", ""),
        ]);

        let plan = plan(&catalog, &profile(OsFamily::Linux, CpuArch::X86_64), &[], "a").unwrap();
        assert_eq!(plan.ids(), vec!["c", "b", "a"]);
        assert_eq!(plan.dependencies().len(), 2);
        assert_eq!(plan.requested(), "a");
    }

    #[test]
    fn test_cycle_is_fatal() {
        let catalog = catalog(vec![
            recipe("a", "[[depends]]\nname = \"b\"\n"),
            recipe("b", "[[depends]]\nname = \"a\"\n"),
        ]);

        let err = plan(&catalog, &profile(OsFamily::Linux, CpuArch::X86_64), &[], "a").unwrap_err();
        match err {
            Error::DependencyCycle { participants } => {
                assert!(participants.contains(&"a".to_string()));
                assert!(participants.contains(&"b".to_string()));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_arch_conditioned_dependencies() {
        let catalog = catalog(vec![recipe(
            "app",
            "[[depends]]\nname = \"arm-lib\"\narch = \"aarch64\"\n\
             [[depends]]\nname = \"intel-lib\"\narch = \"x86_64\"\n",
        )]);

        let arm = plan(&catalog, &profile(OsFamily::Linux, CpuArch::Aarch64), &[], "app").unwrap();
        assert_eq!(arm.ids(), vec!["arm-lib", "app"]);
        assert!(arm.entries()[0].external);

        let intel = plan(&catalog, &profile(OsFamily::Linux, CpuArch::X86_64), &[], "app").unwrap();
        assert_eq!(intel.ids(), vec!["intel-lib", "app"]);
    }

    #[test]
    fn test_baseline_only_for_portable_recipes() {
        let builtin = RecipeCatalog::builtin().unwrap();
        let arm = profile(OsFamily::Linux, CpuArch::Aarch64);

        let ruby = plan(&builtin, &arm, &baseline(), "portable-ruby").unwrap();
        assert_eq!(
            ruby.ids(),
            vec!["linux-headers@4.4", "glibc@2.17", "portable-ruby"]
        );

        let bison = plan(&builtin, &arm, &baseline(), "bison@3.0").unwrap();
        assert_eq!(bison.ids(), vec!["m4@1.4", "bison@3.0"]);
    }

    #[test]
    fn test_baseline_intel_runtime_library_is_external() {
        let builtin = RecipeCatalog::builtin().unwrap();
        let plan = plan(
            &builtin,
            &profile(OsFamily::Linux, CpuArch::X86_64),
            &baseline(),
            "portable-ruby",
        )
        .unwrap();

        let glibc = plan.entries().iter().find(|e| e.id == "glibc@2.13").unwrap();
        assert!(glibc.external);
        assert_eq!(glibc.phase, DependencyPhase::BuildTime);
    }

    #[test]
    fn test_macos_has_no_baseline() {
        let builtin = RecipeCatalog::builtin().unwrap();
        let plan = plan(
            &builtin,
            &profile(OsFamily::Macos, CpuArch::Aarch64),
            &baseline(),
            "portable-ruby",
        )
        .unwrap();
        assert_eq!(plan.ids(), vec!["portable-ruby"]);
    }

    #[test]
    fn test_phase_and_public_dependencies() {
        let builtin = RecipeCatalog::builtin().unwrap();
        let plan = plan(
            &builtin,
            &profile(OsFamily::Linux, CpuArch::X86_64),
            &[],
            "binutils@2.26",
        )
        .unwrap();

        assert_eq!(plan.ids(), vec!["m4@1.4", "bison@3.0", "binutils@2.26"]);
        // bison is a build dependency, so m4 behind it is build-time too
        assert!(plan.dependencies().iter().all(|e| e.phase == DependencyPhase::BuildTime));
        assert_eq!(plan.public_dependencies().count(), 0);
    }

    #[test]
    fn test_runtime_build_only_not_public() {
        let catalog = catalog(vec![
            recipe("app", "[[depends]]\nname = \"lib\"\n[[depends]]\nname = \"tool\"\n"),
            recipe("lib", ""),
            parse_recipe("[package]\nname = \"tool\"\nversion = \"1\"\nbuild_only = true\n").unwrap(),
        ]);

        let plan = plan(&catalog, &profile(OsFamily::Linux, CpuArch::X86_64), &[], "app").unwrap();
        let public: Vec<_> = plan.public_dependencies().map(|e| e.id.as_str()).collect();
        assert_eq!(public, vec!["lib"]);
    }

    #[test]
    fn test_unknown_and_unsupported() {
        let builtin = RecipeCatalog::builtin().unwrap();
        let mac = profile(OsFamily::Macos, CpuArch::Aarch64);

        assert!(matches!(
            plan(&builtin, &mac, &[], "nope").unwrap_err(),
            Error::UnknownRecipe(_)
        ));
        assert!(matches!(
            plan(&builtin, &mac, &[], "glibc@2.17").unwrap_err(),
            Error::UnsupportedPlatform { .. }
        ));
    }
}
