//! Capability-driven flag resolution for vendor library builds.
//!
//! A consumer declares the handful of capabilities it needs; a vendor catalog
//! lists every toggle the library exposes. `resolve` derives a decision for
//! every toggle, defaulting to disabled, so the build layer can apply a total
//! assignment. Catalog loading, declarations, overrides and reporting live in
//! their own modules; the engine itself is a pure function in `resolve`.

use anyhow::{Result, bail};
use std::{
    env, fs,
    path::{Path, PathBuf},
};

pub mod catalog;
pub mod config;
pub mod declaration;
pub mod error;
pub mod logging;
pub mod overrides;
pub mod report;
pub mod resolve;
mod schema_loader;

pub use catalog::{
    CapabilityName, CatalogKey, CatalogRepository, Derivation, FlagCatalog, FlagCategory,
    FlagDescriptor, FlagIndex, FlagName, Polarity, load_catalog_from_path,
};
pub use declaration::{CapabilityDeclaration, CapabilitySet};
pub use error::ResolveError;
pub use overrides::{OverrideTable, effective_overrides, parse_override};
pub use report::{ResolutionReport, build_report, validate_totality};
pub use resolve::{Decision, DecisionSource, PolicyConflict, Resolution, resolve};

/// Directory of vendor catalogs under the data root.
pub const CATALOG_DIR: &str = "catalogs";
const ROOT_SENTINEL: &str = catalog::CATALOG_SCHEMA_FILE;

/// Returns true when `candidate` holds the shipped schema and catalogs.
fn is_data_root(candidate: &Path) -> bool {
    candidate.join(ROOT_SENTINEL).is_file() && candidate.join(CATALOG_DIR).is_dir()
}

fn data_root_from_hint(hint: &str) -> Option<PathBuf> {
    if hint.is_empty() {
        return None;
    }
    let hint_path = PathBuf::from(hint);
    if !hint_path.exists() || !is_data_root(&hint_path) {
        return None;
    }
    fs::canonicalize(hint_path).ok()
}

fn search_upwards(start: &Path) -> Option<PathBuf> {
    let mut dir = fs::canonicalize(start).ok()?;
    loop {
        if is_data_root(&dir) {
            return Some(dir);
        }
        if !dir.pop() {
            break;
        }
    }
    None
}

/// Locate the directory holding `schema/` and `catalogs/`.
///
/// Honors `FEATUREFENCE_ROOT` when it points at a valid root, then climbs up
/// from the current executable, then falls back to the build-time hint.
pub fn find_data_root() -> Result<PathBuf> {
    if let Ok(env_root) = env::var("FEATUREFENCE_ROOT") {
        if let Some(root) = data_root_from_hint(&env_root) {
            return Ok(root);
        }
    }

    if let Ok(exe_path) = env::current_exe() {
        if let Some(exe_dir) = exe_path.parent() {
            if let Some(root) = search_upwards(exe_dir) {
                return Ok(root);
            }
        }
    }

    if let Some(hint) = option_env!("FEATUREFENCE_ROOT_HINT") {
        if let Some(root) = data_root_from_hint(hint) {
            return Ok(root);
        }
    }

    bail!("Unable to locate the featurefence data root. Set FEATUREFENCE_ROOT to a directory containing schema/ and catalogs/.");
}

/// Split comma- or whitespace-delimited capability lists into tokens.
pub fn split_list(value: &str) -> Vec<String> {
    value
        .replace(',', " ")
        .split_whitespace()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}
