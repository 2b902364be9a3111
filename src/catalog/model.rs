//! Deserializable representation of a vendor flag catalog.
//!
//! The types mirror `schema/flag_catalog.schema.json` so the engine and tests
//! can reason about flags without ad-hoc JSON handling. Use `FlagIndex` when
//! a catalog read from disk needs validation; use these structs directly when
//! building catalogs in memory.

use crate::catalog::identity::{CapabilityName, CatalogKey, FlagCategory, FlagName, Polarity};
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

/// Prefix shared by per-module toggles in `without_<module>` catalogs.
pub const DEFAULT_FLAG_PREFIX: &str = "without_";

/// Schema version written by this crate and accepted by `FlagIndex`.
pub const CATALOG_SCHEMA_VERSION: &str = "flag_catalog_v1";

#[derive(Clone, Debug, Serialize, Deserialize)]
/// Full flag catalog as stored on disk.
pub struct FlagCatalog {
    pub schema_version: String,
    pub catalog: CatalogMetadata,
    #[serde(default)]
    pub polarity: Polarity,
    #[serde(default)]
    pub derivation: Derivation,
    pub flags: Vec<FlagDescriptor>,
    /// Forced values for meta flags the vendor ships in the same namespace.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub pins: BTreeMap<FlagName, bool>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
/// Identifies which vendor release a catalog describes.
pub struct CatalogMetadata {
    pub key: CatalogKey,
    pub vendor: String,
    pub version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
/// One toggle exposed by the vendor library.
pub struct FlagDescriptor {
    pub name: FlagName,
    /// Value the catalog currently holds; passthrough flags keep it.
    pub value: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<FlagCategory>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
/// Rule that maps a flag name to the capability it governs.
pub enum Derivation {
    /// Strip a fixed prefix; names without it are structural flags.
    Prefix { prefix: String },
    /// Explicit `flag -> capability` table. `null` marks a structural flag.
    Table {
        entries: BTreeMap<FlagName, Option<CapabilityName>>,
    },
}

/// Outcome of looking a flag up through a `Derivation`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ModuleLookup {
    Module(CapabilityName),
    Structural,
    /// Table derivation only: the flag has no entry at all.
    Missing,
}

impl Default for Derivation {
    fn default() -> Self {
        Derivation::Prefix {
            prefix: DEFAULT_FLAG_PREFIX.to_string(),
        }
    }
}

impl Derivation {
    /// Derive the module name governed by `flag`.
    pub fn lookup(&self, flag: &FlagName) -> ModuleLookup {
        match self {
            Derivation::Prefix { prefix } => match flag.as_str().strip_prefix(prefix.as_str()) {
                Some(module) if !module.is_empty() => {
                    ModuleLookup::Module(CapabilityName(module.to_string()))
                }
                _ => ModuleLookup::Structural,
            },
            Derivation::Table { entries } => match entries.get(flag) {
                Some(Some(module)) => ModuleLookup::Module(module.clone()),
                Some(None) => ModuleLookup::Structural,
                None => ModuleLookup::Missing,
            },
        }
    }
}

impl FlagDescriptor {
    pub fn new(name: impl Into<String>, value: bool) -> Self {
        Self {
            name: FlagName(name.into()),
            value,
            category: None,
            description: None,
        }
    }
}

impl FlagCatalog {
    /// Build an in-memory `without_<module>` catalog with no pins.
    pub fn new(key: impl Into<String>, flags: Vec<FlagDescriptor>) -> Self {
        let key = key.into();
        Self {
            schema_version: CATALOG_SCHEMA_VERSION.to_string(),
            catalog: CatalogMetadata {
                vendor: key.clone(),
                version: String::new(),
                key: CatalogKey(key),
                notes: None,
            },
            polarity: Polarity::default(),
            derivation: Derivation::default(),
            flags,
            pins: BTreeMap::new(),
        }
    }

    pub fn with_derivation(mut self, derivation: Derivation) -> Self {
        self.derivation = derivation;
        self
    }

    pub fn with_polarity(mut self, polarity: Polarity) -> Self {
        self.polarity = polarity;
        self
    }

    pub fn with_pin(mut self, flag: impl Into<String>, value: bool) -> Self {
        self.pins.insert(FlagName(flag.into()), value);
        self
    }

    pub fn key(&self) -> &CatalogKey {
        &self.catalog.key
    }

    /// Find a descriptor by exact name.
    pub fn flag(&self, name: &FlagName) -> Option<&FlagDescriptor> {
        self.flags.iter().find(|flag| &flag.name == name)
    }
}

/// Read and parse a flag catalog from disk without additional validation.
pub fn load_catalog_from_path(path: &Path) -> Result<FlagCatalog> {
    let data = fs::read_to_string(path)?;
    let catalog: FlagCatalog = serde_json::from_str(&data)?;
    Ok(catalog)
}
