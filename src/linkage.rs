// src/linkage.rs

//! Installed artifact linkage verification
//!
//! A portable artifact must not load anything from the build machine's
//! private library locations once installed elsewhere. This walks an
//! installed tree, parses every ELF and Mach-O file with goblin, and reports
//! each library, rpath, runpath, or interpreter reference that points under
//! a forbidden prefix. References into the scanned tree itself are allowed.

use crate::error::Result;
use goblin::Object;
use goblin::mach::{Mach, MachO, SingleArch};
use serde::Serialize;
use std::io::Read;
use std::path::{Path, PathBuf};
use strum_macros::Display;
use tracing::debug;
use walkdir::WalkDir;

const ELF_MAGIC: [u8; 4] = [0x7f, b'E', b'L', b'F'];
const MACHO_MAGICS: [[u8; 4]; 5] = [
    [0xfe, 0xed, 0xfa, 0xce],
    [0xfe, 0xed, 0xfa, 0xcf],
    [0xce, 0xfa, 0xed, 0xfe],
    [0xcf, 0xfa, 0xed, 0xfe],
    [0xca, 0xfe, 0xba, 0xbe],
];

/// Where a reference was found in the binary
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ReferenceKind {
    Library,
    Rpath,
    Runpath,
    Interpreter,
}

/// A forbidden reference
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LinkageViolation {
    pub file: PathBuf,
    pub kind: ReferenceKind,
    pub reference: String,
}

/// Result of scanning an installed tree
#[derive(Debug, Clone, Default, Serialize)]
pub struct LinkageReport {
    /// Object files parsed
    pub scanned: usize,
    pub violations: Vec<LinkageViolation>,
}

impl LinkageReport {
    pub fn is_clean(&self) -> bool {
        self.violations.is_empty()
    }
}

/// Scan `root` for references under any of `forbidden`
pub fn verify_linkage(root: &Path, forbidden: &[PathBuf]) -> Result<LinkageReport> {
    let mut report = LinkageReport::default();

    for entry in WalkDir::new(root).follow_links(false) {
        let entry = entry.map_err(std::io::Error::from)?;
        if !entry.file_type().is_file() || !has_object_magic(entry.path())? {
            continue;
        }

        let bytes = std::fs::read(entry.path())?;
        let Some(references) = references(&bytes) else {
            debug!("Skipping unparsable object {}", entry.path().display());
            continue;
        };
        report.scanned += 1;

        for (kind, reference) in references {
            if is_forbidden(&reference, root, forbidden) {
                report.violations.push(LinkageViolation {
                    file: entry.path().to_path_buf(),
                    kind,
                    reference,
                });
            }
        }
    }

    debug!(
        "Scanned {} objects under {}, {} violations",
        report.scanned,
        root.display(),
        report.violations.len()
    );
    Ok(report)
}

fn has_object_magic(path: &Path) -> Result<bool> {
    let mut magic = [0u8; 4];
    let mut file = std::fs::File::open(path)?;
    if file.read_exact(&mut magic).is_err() {
        return Ok(false);
    }
    Ok(magic == ELF_MAGIC || MACHO_MAGICS.contains(&magic))
}

/// Dynamic references recorded in an object file
fn references(bytes: &[u8]) -> Option<Vec<(ReferenceKind, String)>> {
    let mut refs = Vec::new();

    match Object::parse(bytes).ok()? {
        Object::Elf(elf) => {
            refs.extend(elf.libraries.iter().map(|l| (ReferenceKind::Library, l.to_string())));
            for rpath in &elf.rpaths {
                refs.extend(rpath.split(':').map(|p| (ReferenceKind::Rpath, p.to_string())));
            }
            for runpath in &elf.runpaths {
                refs.extend(runpath.split(':').map(|p| (ReferenceKind::Runpath, p.to_string())));
            }
            if let Some(interp) = elf.interpreter {
                refs.push((ReferenceKind::Interpreter, interp.to_string()));
            }
        }
        Object::Mach(Mach::Binary(macho)) => macho_references(&macho, &mut refs),
        Object::Mach(Mach::Fat(multi)) => {
            for arch in &multi {
                match arch.ok()? {
                    SingleArch::MachO(macho) => macho_references(&macho, &mut refs),
                    SingleArch::Archive(_) => debug!("Skipping static archive slice"),
                }
            }
        }
        _ => return None,
    }

    Some(refs)
}

/// Slices of a universal binary usually repeat the same references
fn macho_references(macho: &MachO, refs: &mut Vec<(ReferenceKind, String)>) {
    let found = macho
        .libs
        .iter()
        .map(|l| (ReferenceKind::Library, l.to_string()))
        .chain(macho.rpaths.iter().map(|r| (ReferenceKind::Rpath, r.to_string())));
    for reference in found {
        if !refs.contains(&reference) {
            refs.push(reference);
        }
    }
}

fn is_forbidden(reference: &str, root: &Path, forbidden: &[PathBuf]) -> bool {
    let path = Path::new(reference);
    if !path.is_absolute() || path.starts_with(root) {
        return false;
    }
    forbidden.iter().any(|prefix| path.starts_with(prefix))
}
