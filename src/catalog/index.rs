//! Indexed view of a flag catalog instance.
//!
//! The index enforces the expected catalog schema version and provides fast
//! lookup by flag name. It is strict about duplicates, pins and table entries
//! that point at flags the catalog does not contain, so a drifting catalog is
//! caught at load time instead of at resolution time.

use crate::catalog::load_catalog_from_path;
use crate::catalog::{
    CATALOG_SCHEMA_VERSION, CatalogKey, CatalogMetadata, Derivation, FlagCatalog,
    FlagDescriptor, FlagName,
};
use crate::find_data_root;
use crate::schema_loader::{SchemaLoadOptions, load_json_schema};
use anyhow::{Context, Result, bail};
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Schema file shipped next to the crate's catalogs.
pub const CATALOG_SCHEMA_FILE: &str = "schema/flag_catalog.schema.json";

#[derive(Debug)]
/// Flag catalog plus a derived index keyed by flag name.
pub struct FlagIndex {
    catalog_key: CatalogKey,
    catalog: FlagCatalog,
    by_name: BTreeMap<FlagName, FlagDescriptor>,
}

impl FlagIndex {
    /// Load and validate a catalog from disk.
    ///
    /// Validates the JSON against the catalog schema, checks the key, and
    /// builds a deterministic BTreeMap for lookups.
    pub fn load(path: &Path) -> Result<Self> {
        validate_against_schema(path)?;

        let catalog =
            load_catalog_from_path(path).with_context(|| format!("loading {}", path.display()))?;
        let index = Self::from_catalog(catalog)
            .with_context(|| format!("validating {}", path.display()))?;
        debug!(
            catalog = %index.key(),
            flags = index.by_name.len(),
            path = %path.display(),
            "loaded flag catalog"
        );
        Ok(index)
    }

    /// Index an in-memory catalog, applying the same semantic checks as
    /// `load` minus the JSON Schema pass.
    pub fn from_catalog(catalog: FlagCatalog) -> Result<Self> {
        validate_schema_version(&catalog.schema_version)?;
        validate_catalog_metadata(&catalog.catalog)?;
        let by_name = build_index(&catalog)?;
        Ok(Self {
            catalog_key: catalog.catalog.key.clone(),
            catalog,
            by_name,
        })
    }

    /// The catalog key declared in the loaded file.
    pub fn key(&self) -> &CatalogKey {
        &self.catalog_key
    }

    /// Resolve a flag by name.
    pub fn flag(&self, name: &FlagName) -> Option<&FlagDescriptor> {
        self.by_name.get(name)
    }

    /// Iterates flag names in stable order.
    pub fn names(&self) -> impl Iterator<Item = &FlagName> {
        self.by_name.keys()
    }

    pub fn len(&self) -> usize {
        self.by_name.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }

    /// Access the underlying catalog in its original order.
    pub fn catalog(&self) -> &FlagCatalog {
        &self.catalog
    }

    pub fn into_catalog(self) -> FlagCatalog {
        self.catalog
    }
}

fn validate_schema_version(schema_version: &str) -> Result<()> {
    if schema_version.is_empty() {
        bail!("schema_version must not be empty");
    }
    if !is_identifier(schema_version) {
        bail!(
            "schema_version must match ^[A-Za-z0-9_.-]+$, got {}",
            schema_version
        );
    }

    let allowed = allowed_schema_versions();
    if !allowed.contains(schema_version) {
        bail!(
            "schema_version '{}' not in allowed set {:?}",
            schema_version,
            allowed
        );
    }

    Ok(())
}

fn allowed_schema_versions() -> BTreeSet<String> {
    BTreeSet::from_iter([CATALOG_SCHEMA_VERSION.to_string()])
}

fn validate_catalog_metadata(meta: &CatalogMetadata) -> Result<()> {
    if meta.key.0.is_empty() {
        bail!("catalog.key must not be empty");
    }
    if !is_identifier(&meta.key.0) {
        bail!("catalog.key must match ^[A-Za-z0-9_.-]+$, got {}", meta.key.0);
    }
    if meta.vendor.trim().is_empty() {
        bail!("catalog.vendor must not be empty");
    }
    Ok(())
}

fn is_identifier(value: &str) -> bool {
    value
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-'))
}

fn build_index(catalog: &FlagCatalog) -> Result<BTreeMap<FlagName, FlagDescriptor>> {
    if catalog.flags.is_empty() {
        bail!("catalog contains no flags");
    }

    if let Derivation::Prefix { prefix } = &catalog.derivation {
        if prefix.is_empty() {
            bail!("derivation prefix must not be empty");
        }
    }

    let mut map = BTreeMap::new();
    for flag in &catalog.flags {
        if flag.name.0.trim().is_empty() {
            bail!("encountered flag with no name");
        }
        if map.contains_key(&flag.name) {
            bail!("duplicate flag {}", flag.name);
        }
        map.insert(flag.name.clone(), flag.clone());
    }

    for pinned in catalog.pins.keys() {
        if !map.contains_key(pinned) {
            bail!("pin references unknown flag {}", pinned);
        }
    }

    if let Derivation::Table { entries } = &catalog.derivation {
        for flag in entries.keys() {
            if !map.contains_key(flag) {
                bail!("capability table references unknown flag {}", flag);
            }
        }
    }

    Ok(map)
}

fn validate_against_schema(catalog_path: &Path) -> Result<()> {
    let catalog_file = File::open(catalog_path)
        .with_context(|| format!("opening catalog {}", catalog_path.display()))?;
    let catalog_value: Value = serde_json::from_reader(BufReader::new(catalog_file))
        .with_context(|| format!("parsing catalog {}", catalog_path.display()))?;

    let catalog_version = catalog_value
        .get("schema_version")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();

    let schema_path = resolve_catalog_schema_path(catalog_path)?;
    let allowed = allowed_schema_versions();
    let schema = load_json_schema(
        &schema_path,
        SchemaLoadOptions {
            allowed_versions: Some(&allowed),
            expected_version: Some(&catalog_version),
            patch_schema_version_const: true,
            ..Default::default()
        },
    )
    .with_context(|| format!("loading catalog schema {}", schema_path.display()))?;

    if let Err(errors) = schema.compiled.validate(&catalog_value) {
        let details = errors
            .map(|err| err.to_string())
            .collect::<Vec<_>>()
            .join("\n");
        bail!(
            "flag catalog {} failed schema validation:\n{}",
            catalog_path.display(),
            details
        );
    }
    debug!(
        schema_version = %schema.schema_version,
        catalog = %catalog_path.display(),
        "catalog passed schema validation"
    );
    Ok(())
}

/// Prefer a schema shipped beside the catalog directory, then the data root's.
fn resolve_catalog_schema_path(catalog_path: &Path) -> Result<PathBuf> {
    if let Some(base) = catalog_path.parent().and_then(|p| p.parent()) {
        let candidate = base.join(CATALOG_SCHEMA_FILE);
        if candidate.is_file() {
            return Ok(candidate);
        }
    }

    let root = find_data_root()
        .with_context(|| format!("no schema beside {}", catalog_path.display()))?;
    Ok(root.join(CATALOG_SCHEMA_FILE))
}
