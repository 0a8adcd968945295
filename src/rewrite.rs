// src/rewrite.rs

//! Post-install configuration record cleanup
//!
//! Some installed artifacts record the exact `CFLAGS`/`LDFLAGS` they were
//! built with (Ruby's `rbconfig.rb`, for one). The portable flags only make
//! sense on the build machine, so their exact strings are removed from the
//! record after install. A record that does not contain them is left alone;
//! that is logged, not treated as an error.

use crate::error::Result;
use crate::portable::FlagSet;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Result of rewriting one record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RewriteOutcome {
    /// Number of flag occurrences removed
    Rewritten { removed: usize },
    /// No flag string was present
    Unchanged,
}

/// Remove the exact flag strings from a record
pub fn rewrite(record: &str, flags: &FlagSet) -> (String, RewriteOutcome) {
    let mut updated = record.to_string();
    let mut removed = 0;

    for needle in [flags.cflags_string(), flags.ldflags_string()] {
        if needle.is_empty() {
            continue;
        }
        let count = updated.matches(needle.as_str()).count();
        if count > 0 {
            updated = updated.replace(needle.as_str(), "");
            removed += count;
        }
    }

    if removed == 0 {
        (record.to_string(), RewriteOutcome::Unchanged)
    } else {
        (updated, RewriteOutcome::Rewritten { removed })
    }
}

/// Rewrite a record file in place
///
/// The file is only written when something changed.
pub fn rewrite_file(path: &Path, flags: &FlagSet) -> Result<RewriteOutcome> {
    let record = std::fs::read_to_string(path)?;
    let (updated, outcome) = rewrite(&record, flags);

    match outcome {
        RewriteOutcome::Rewritten { removed } => {
            std::fs::write(path, updated)?;
            debug!("Removed {} portable flag strings from {}", removed, path.display());
        }
        RewriteOutcome::Unchanged => {
            info!("No portable flags found in {}, leaving it unchanged", path.display());
        }
    }

    Ok(outcome)
}

/// Rewrite every record matching `pattern` under `prefix`
pub fn rewrite_installed(
    prefix: &Path,
    pattern: &str,
    flags: &FlagSet,
) -> Result<Vec<(PathBuf, RewriteOutcome)>> {
    if flags.is_empty() {
        debug!("No portable flags to strip under {}", prefix.display());
        return Ok(Vec::new());
    }

    let full = prefix.join(pattern);
    let paths: Vec<PathBuf> = match glob::glob(&full.to_string_lossy()) {
        Ok(paths) => paths.filter_map(|p| p.ok()).filter(|p| p.is_file()).collect(),
        Err(e) => {
            info!("Invalid config record pattern {}: {}", full.display(), e);
            return Ok(Vec::new());
        }
    };

    if paths.is_empty() {
        info!("No config record matches {}", full.display());
        return Ok(Vec::new());
    }

    paths
        .into_iter()
        .map(|path| {
            let outcome = rewrite_file(&path, flags)?;
            Ok((path, outcome))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn arm_flags() -> FlagSet {
        FlagSet {
            cflags: vec![
                "-nostdinc".to_string(),
                "-isystem/usr/lib/gcc/aarch64-linux-gnu/11/include".to_string(),
                "-isystem/usr/lib/gcc/aarch64-linux-gnu/11/include-fixed".to_string(),
                "-mno-outline-atomics".to_string(),
            ],
            ldflags: vec![
                "-B/opt/portable/opt/glibc@2.17/lib".to_string(),
                "-Wl,-rpath-link=/opt/portable/opt/glibc@2.17/lib".to_string(),
            ],
        }
    }

    #[test]
    fn test_rewrite_removes_exact_substrings() {
        let flags = arm_flags();
        let record = format!(
            "  CONFIG[\"CFLAGS\"] = \"-O3 -fPIC {}\"\n  CONFIG[\"LDFLAGS\"] = \"-L. {}\"\n",
            flags.cflags_string(),
            flags.ldflags_string()
        );

        let (updated, outcome) = rewrite(&record, &flags);
        assert_eq!(outcome, RewriteOutcome::Rewritten { removed: 2 });
        assert_eq!(
            updated,
            "  CONFIG[\"CFLAGS\"] = \"-O3 -fPIC \"\n  CONFIG[\"LDFLAGS\"] = \"-L. \"\n"
        );
        // -fPIC is a base flag and stays
        assert!(updated.contains("-fPIC"));
    }

    #[test]
    fn test_rewrite_absent_is_noop() {
        let record = "CONFIG[\"CFLAGS\"] = \"-O3 -nostdinc\"\n";
        let (updated, outcome) = rewrite(record, &arm_flags());
        assert_eq!(outcome, RewriteOutcome::Unchanged);
        assert_eq!(updated, record);
    }

    #[test]
    fn test_rewrite_file_untouched_when_absent() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("rbconfig.rb");
        std::fs::write(&path, "unchanged\n").unwrap();

        assert_eq!(rewrite_file(&path, &arm_flags()).unwrap(), RewriteOutcome::Unchanged);
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "unchanged\n");
    }

    #[test]
    fn test_rewrite_installed_glob() {
        let temp = tempfile::tempdir().unwrap();
        let flags = arm_flags();
        let dir = temp.path().join("lib/ruby/3.3.0/aarch64-linux");
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(
            dir.join("rbconfig.rb"),
            format!("CFLAGS = \"{}\"\n", flags.cflags_string()),
        )
        .unwrap();

        let results = rewrite_installed(temp.path(), "lib/ruby/*/*/rbconfig.rb", &flags).unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].1, RewriteOutcome::Rewritten { removed: 1 });
        assert_eq!(
            std::fs::read_to_string(dir.join("rbconfig.rb")).unwrap(),
            "CFLAGS = \"\"\n"
        );
    }

    #[test]
    fn test_rewrite_installed_no_match_is_ok() {
        let temp = tempfile::tempdir().unwrap();
        let results = rewrite_installed(temp.path(), "lib/ruby/*/*/rbconfig.rb", &arm_flags()).unwrap();
        assert!(results.is_empty());
    }
}
