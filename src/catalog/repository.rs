//! Holds one or more flag catalogs for lookup by key.
//!
//! A host may ship catalogs for several vendor releases side by side; the
//! declaration's `catalog` key picks one explicitly.

use crate::catalog::identity::{CatalogKey, FlagName};
use crate::catalog::index::FlagIndex;
use crate::catalog::model::{FlagCatalog, FlagDescriptor};
use anyhow::{Context, Result, bail};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

#[derive(Default)]
/// In-memory store for flag catalogs keyed by `CatalogKey`.
pub struct CatalogRepository {
    catalogs: BTreeMap<CatalogKey, FlagCatalog>,
}

impl CatalogRepository {
    /// Load every `*.json` catalog in `dir` through `FlagIndex`.
    ///
    /// Two files declaring the same key are an error rather than a silent
    /// last-one-wins.
    pub fn load_dir(dir: &Path) -> Result<Self> {
        let mut paths = Vec::new();
        for entry in
            fs::read_dir(dir).with_context(|| format!("reading catalog dir {}", dir.display()))?
        {
            let path = entry?.path();
            if path.is_file() && path.extension().and_then(|ext| ext.to_str()) == Some("json") {
                paths.push(path);
            }
        }
        paths.sort();

        let mut repository = Self::default();
        for path in paths {
            let index = FlagIndex::load(&path)?;
            if repository.get(index.key()).is_some() {
                bail!(
                    "catalog key {} declared twice (second copy in {})",
                    index.key(),
                    path.display()
                );
            }
            repository.register(index.into_catalog());
        }
        if repository.catalogs.is_empty() {
            bail!("no catalogs found under {}", dir.display());
        }
        Ok(repository)
    }

    /// Register a catalog for later lookup.
    pub fn register(&mut self, catalog: FlagCatalog) {
        self.catalogs.insert(catalog.key().clone(), catalog);
    }

    /// Fetch a catalog by key, if present.
    pub fn get(&self, key: &CatalogKey) -> Option<&FlagCatalog> {
        self.catalogs.get(key)
    }

    /// Registered keys in stable order.
    pub fn keys(&self) -> impl Iterator<Item = &CatalogKey> {
        self.catalogs.keys()
    }

    /// Pick a catalog: the requested key, or the only one registered.
    pub fn select(&self, key: Option<&CatalogKey>) -> Result<&FlagCatalog> {
        match key {
            Some(key) => self.get(key).with_context(|| {
                format!(
                    "catalog {} not registered (known: {})",
                    key,
                    self.known_keys()
                )
            }),
            None => match self.catalogs.values().next() {
                Some(only) if self.catalogs.len() == 1 => Ok(only),
                _ => bail!(
                    "declaration does not name a catalog; registered: [{}]",
                    self.known_keys()
                ),
            },
        }
    }

    /// Resolve a flag entry inside a registered catalog.
    pub fn find_flag(&self, key: &CatalogKey, name: &FlagName) -> Option<&FlagDescriptor> {
        self.get(key)?.flag(name)
    }

    fn known_keys(&self) -> String {
        self.catalogs
            .keys()
            .map(|key| key.0.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn repository() -> CatalogRepository {
        let mut repo = CatalogRepository::default();
        repo.register(FlagCatalog::new(
            "vendor_1",
            vec![FlagDescriptor::new("without_log", false)],
        ));
        repo.register(FlagCatalog::new(
            "vendor_2",
            vec![FlagDescriptor::new("without_url", false)],
        ));
        repo
    }

    #[test]
    fn select_by_key() {
        let repo = repository();
        let catalog = repo
            .select(Some(&CatalogKey("vendor_2".to_string())))
            .unwrap();
        assert_eq!(catalog.flags[0].name.as_str(), "without_url");
        assert!(
            repo.find_flag(&CatalogKey("vendor_1".into()), &FlagName::from("without_log"))
                .is_some()
        );
        assert!(
            repo.find_flag(&CatalogKey("vendor_1".into()), &FlagName::from("without_url"))
                .is_none()
        );
    }

    #[test]
    fn select_without_key_requires_single_catalog() {
        let repo = repository();
        let err = repo.select(None).expect_err("ambiguous selection");
        assert!(err.to_string().contains("vendor_1, vendor_2"));

        let mut single = CatalogRepository::default();
        single.register(FlagCatalog::new(
            "only",
            vec![FlagDescriptor::new("without_log", false)],
        ));
        assert_eq!(single.select(None).unwrap().key().0, "only");
    }

    #[test]
    fn select_unknown_key_lists_known_keys() {
        let err = repository()
            .select(Some(&CatalogKey("vendor_9".to_string())))
            .expect_err("unknown key");
        assert!(err.to_string().contains("vendor_9"));
        assert!(err.to_string().contains("vendor_1"));
    }
}
