//! Consumer-side capability declaration.
//!
//! A declaration is the small piece of intent a project writes down: which
//! capabilities it needs from the vendor library and which flags it wants
//! pinned regardless. Everything else in the catalog gets decided for it.

use crate::catalog::{CapabilityName, CatalogKey};
use crate::overrides::OverrideTable;
use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fs;
use std::path::Path;

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
/// Unordered, de-duplicated set of requested capabilities.
pub struct CapabilitySet(BTreeSet<CapabilityName>);

impl CapabilitySet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Collect names into a set; repeated names collapse.
    pub fn from_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        names
            .into_iter()
            .map(|name| CapabilityName(name.into()))
            .collect()
    }

    pub fn contains(&self, capability: &CapabilityName) -> bool {
        self.0.contains(capability)
    }

    pub fn iter(&self) -> impl Iterator<Item = &CapabilityName> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<CapabilityName> for CapabilitySet {
    fn from_iter<I: IntoIterator<Item = CapabilityName>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
/// Build-description input: `{ "catalog", "capabilities", "overrides" }`.
pub struct CapabilityDeclaration {
    /// Catalog the declaration was written against, when more than one is
    /// registered.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub catalog: Option<CatalogKey>,
    #[serde(default)]
    pub capabilities: Vec<CapabilityName>,
    #[serde(default)]
    pub overrides: OverrideTable,
}

impl CapabilityDeclaration {
    /// Read a declaration from disk and reject blank or padded names.
    pub fn load(path: &Path) -> Result<Self> {
        let data =
            fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
        let declaration: CapabilityDeclaration = serde_json::from_str(&data)
            .with_context(|| format!("parsing declaration {}", path.display()))?;
        declaration
            .validate()
            .with_context(|| format!("validating declaration {}", path.display()))?;
        Ok(declaration)
    }

    pub fn validate(&self) -> Result<()> {
        if let Some(key) = &self.catalog {
            if key.0.trim().is_empty() {
                bail!("catalog key must not be empty");
            }
        }
        for capability in &self.capabilities {
            if capability.0.trim().is_empty() {
                bail!("capabilities must not contain empty entries");
            }
            if capability.0.trim() != capability.0 {
                bail!("capability '{}' has surrounding whitespace", capability);
            }
        }
        for (flag, _) in self.overrides.iter() {
            if flag.0.trim().is_empty() {
                bail!("overrides must not contain empty flag names");
            }
            if flag.0.trim() != flag.0 {
                bail!("override '{}' has surrounding whitespace", flag);
            }
        }
        Ok(())
    }

    pub fn capability_set(&self) -> CapabilitySet {
        self.capabilities.iter().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::FlagName;
    use serde_json::json;
    use tempfile::NamedTempFile;

    #[test]
    fn capability_set_ignores_order_and_duplicates() {
        let a = CapabilitySet::from_names(["coroutine", "container", "coroutine"]);
        let b = CapabilitySet::from_names(["container", "coroutine"]);
        assert_eq!(a, b);
        assert_eq!(a.len(), 2);
        assert!(a.contains(&CapabilityName::from("container")));
        assert!(!a.contains(&CapabilityName::from("log")));
    }

    #[test]
    fn load_reads_capabilities_and_overrides() -> Result<()> {
        let mut file = NamedTempFile::new()?;
        serde_json::to_writer(
            &mut file,
            &json!({
                "catalog": "boost_1.84.0",
                "capabilities": ["container", "system"],
                "overrides": {"without_headers": true}
            }),
        )?;
        let declaration = CapabilityDeclaration::load(file.path())?;
        assert_eq!(
            declaration.catalog,
            Some(CatalogKey("boost_1.84.0".to_string()))
        );
        assert_eq!(declaration.capability_set().len(), 2);
        assert_eq!(
            declaration
                .overrides
                .get(&FlagName::from("without_headers")),
            Some(true)
        );
        Ok(())
    }

    #[test]
    fn load_rejects_blank_capability() -> Result<()> {
        let mut file = NamedTempFile::new()?;
        serde_json::to_writer(&mut file, &json!({"capabilities": ["container", " "]}))?;
        let err = CapabilityDeclaration::load(file.path()).expect_err("blank name should fail");
        assert!(format!("{err:#}").contains("empty entries"));
        Ok(())
    }

    #[test]
    fn empty_declaration_is_legal() -> Result<()> {
        let mut file = NamedTempFile::new()?;
        serde_json::to_writer(&mut file, &json!({}))?;
        let declaration = CapabilityDeclaration::load(file.path())?;
        assert!(declaration.capability_set().is_empty());
        assert!(declaration.overrides.is_empty());
        Ok(())
    }

    #[test]
    fn load_rejects_padded_names() -> Result<()> {
        let mut file = NamedTempFile::new()?;
        serde_json::to_writer(&mut file, &json!({"capabilities": [" container"]}))?;
        let err = CapabilityDeclaration::load(file.path()).expect_err("padded name should fail");
        assert!(format!("{err:#}").contains("' container' has surrounding whitespace"));

        let mut file = NamedTempFile::new()?;
        serde_json::to_writer(
            &mut file,
            &json!({"capabilities": ["container"], "overrides": {"without_log ": true}}),
        )?;
        let err = CapabilityDeclaration::load(file.path()).expect_err("padded flag should fail");
        assert!(format!("{err:#}").contains("surrounding whitespace"));
        Ok(())
    }
}
