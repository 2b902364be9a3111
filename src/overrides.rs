//! Forced flag values that bypass capability derivation.
//!
//! Two sources feed the table the engine sees: pins shipped with a catalog
//! (meta flags the vendor keeps in the toggle namespace) and overrides written
//! by the consumer. Consumer entries win.

use crate::catalog::{FlagCatalog, FlagName};
use anyhow::{Result, bail};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
/// Exact flag name to forced value.
pub struct OverrideTable(BTreeMap<FlagName, bool>);

impl OverrideTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert; a later value for the same flag replaces the
    /// earlier one.
    pub fn with(mut self, flag: impl Into<String>, value: bool) -> Self {
        self.insert(FlagName(flag.into()), value);
        self
    }

    pub fn insert(&mut self, flag: FlagName, value: bool) -> Option<bool> {
        self.0.insert(flag, value)
    }

    pub fn get(&self, flag: &FlagName) -> Option<bool> {
        self.0.get(flag).copied()
    }

    pub fn contains(&self, flag: &FlagName) -> bool {
        self.0.contains_key(flag)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&FlagName, bool)> {
        self.0.iter().map(|(flag, value)| (flag, *value))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<BTreeMap<FlagName, bool>> for OverrideTable {
    fn from(value: BTreeMap<FlagName, bool>) -> Self {
        Self(value)
    }
}

impl FromIterator<(FlagName, bool)> for OverrideTable {
    fn from_iter<I: IntoIterator<Item = (FlagName, bool)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Overlay consumer overrides on top of the catalog's pins.
pub fn effective_overrides(catalog: &FlagCatalog, consumer: &OverrideTable) -> OverrideTable {
    let mut merged: OverrideTable = catalog
        .pins
        .iter()
        .map(|(flag, value)| (flag.clone(), *value))
        .collect();
    for (flag, value) in consumer.iter() {
        if let Some(pinned) = merged.insert(flag.clone(), value) {
            if pinned != value {
                debug!(flag = %flag, pinned, value, "consumer override replaces catalog pin");
            }
        }
    }
    merged
}

/// Parse a `flag=value` override from the command line or environment.
///
/// Accepts `true/false`, `1/0`, `yes/no` and `on/off` (case-insensitive).
pub fn parse_override(raw: &str) -> Result<(FlagName, bool)> {
    let Some((flag, value)) = raw.split_once('=') else {
        bail!("override '{raw}' must look like <flag>=<bool>");
    };
    let flag = flag.trim();
    if flag.is_empty() {
        bail!("override '{raw}' is missing a flag name");
    }
    let value = match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => true,
        "false" | "0" | "no" | "off" => false,
        other => bail!("override '{raw}' has non-boolean value '{other}'"),
    };
    Ok((FlagName(flag.to_string()), value))
}
