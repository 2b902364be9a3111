//! Input discovery for the resolver binary.
//!
//! Resolution order: CLI arguments, then environment variables, then the
//! catalogs shipped under the data root. Each path remembers where it came
//! from so error messages can say which knob to turn.

use crate::{CATALOG_DIR, find_data_root};
use anyhow::{Result, bail};
use std::env;
use std::fmt;
use std::path::PathBuf;

pub const ENV_CATALOG: &str = "FEATUREFENCE_CATALOG";
pub const ENV_CATALOG_DIR: &str = "FEATUREFENCE_CATALOG_DIR";
pub const ENV_DECLARATION: &str = "FEATUREFENCE_DECLARATION";
pub const ENV_DENY_CONFLICTS: &str = "FEATUREFENCE_DENY_CONFLICTS";

/// Where a configuration path was found.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigSource {
    CliArgument,
    Environment,
    DataRoot,
}

impl fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigSource::CliArgument => write!(f, "CLI argument"),
            ConfigSource::Environment => write!(f, "environment variable"),
            ConfigSource::DataRoot => write!(f, "shipped data root"),
        }
    }
}

/// A single catalog file, or a directory of them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CatalogLocation {
    File(PathBuf),
    Dir(PathBuf),
}

/// Paths explicitly passed on the command line.
#[derive(Debug, Clone, Default)]
pub struct CliPaths {
    pub catalog: Option<PathBuf>,
    pub catalog_dir: Option<PathBuf>,
    pub declaration: Option<PathBuf>,
}

/// Discovered input locations.
#[derive(Debug, Clone)]
pub struct ConfigPaths {
    pub catalog: CatalogLocation,
    pub catalog_source: ConfigSource,
    pub declaration: Option<PathBuf>,
    pub declaration_source: Option<ConfigSource>,
}

impl ConfigPaths {
    /// Discover inputs using the process environment.
    pub fn discover(cli: &CliPaths) -> Result<Self> {
        Self::discover_with(cli, |name| env::var(name).ok(), || {
            find_data_root().map(|root| root.join(CATALOG_DIR))
        })
    }

    /// Discovery with injectable environment and data-root lookups.
    pub fn discover_with<E, D>(cli: &CliPaths, env_lookup: E, data_catalogs: D) -> Result<Self>
    where
        E: Fn(&str) -> Option<String>,
        D: FnOnce() -> Result<PathBuf>,
    {
        let non_empty = |name: &str| env_lookup(name).filter(|v| !v.trim().is_empty());

        if cli.catalog.is_some() && cli.catalog_dir.is_some() {
            bail!("--catalog and --catalog-dir are mutually exclusive");
        }

        let (catalog, catalog_source) = if let Some(path) = &cli.catalog {
            (CatalogLocation::File(path.clone()), ConfigSource::CliArgument)
        } else if let Some(dir) = &cli.catalog_dir {
            (CatalogLocation::Dir(dir.clone()), ConfigSource::CliArgument)
        } else if let Some(path) = non_empty(ENV_CATALOG) {
            (
                CatalogLocation::File(PathBuf::from(path)),
                ConfigSource::Environment,
            )
        } else if let Some(dir) = non_empty(ENV_CATALOG_DIR) {
            (
                CatalogLocation::Dir(PathBuf::from(dir)),
                ConfigSource::Environment,
            )
        } else {
            (CatalogLocation::Dir(data_catalogs()?), ConfigSource::DataRoot)
        };

        let (declaration, declaration_source) = if let Some(path) = &cli.declaration {
            (Some(path.clone()), Some(ConfigSource::CliArgument))
        } else if let Some(path) = non_empty(ENV_DECLARATION) {
            (Some(PathBuf::from(path)), Some(ConfigSource::Environment))
        } else {
            (None, None)
        };

        Ok(Self {
            catalog,
            catalog_source,
            declaration,
            declaration_source,
        })
    }
}

/// Interpret a boolean-ish environment value: set, non-blank and not `0`.
pub fn env_flag(value: Option<String>) -> bool {
    value
        .map(|v| !v.trim().is_empty() && v.trim() != "0")
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;
    use std::collections::BTreeMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: BTreeMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    fn no_data_root() -> Result<PathBuf> {
        Err(anyhow!("no data root in tests"))
    }

    #[test]
    fn cli_beats_environment() {
        let cli = CliPaths {
            catalog: Some(PathBuf::from("/cli/catalog.json")),
            declaration: Some(PathBuf::from("/cli/decl.json")),
            ..Default::default()
        };
        let env = lookup(&[
            (ENV_CATALOG, "/env/catalog.json"),
            (ENV_DECLARATION, "/env/decl.json"),
        ]);
        let paths = ConfigPaths::discover_with(&cli, env, no_data_root).unwrap();
        assert_eq!(
            paths.catalog,
            CatalogLocation::File(PathBuf::from("/cli/catalog.json"))
        );
        assert_eq!(paths.catalog_source, ConfigSource::CliArgument);
        assert_eq!(paths.declaration, Some(PathBuf::from("/cli/decl.json")));
    }

    #[test]
    fn environment_beats_data_root() {
        let env = lookup(&[(ENV_CATALOG_DIR, "/env/catalogs"), (ENV_CATALOG, " ")]);
        let paths = ConfigPaths::discover_with(&CliPaths::default(), env, no_data_root).unwrap();
        assert_eq!(
            paths.catalog,
            CatalogLocation::Dir(PathBuf::from("/env/catalogs"))
        );
        assert_eq!(paths.catalog_source, ConfigSource::Environment);
        assert_eq!(paths.declaration, None);
        assert_eq!(paths.declaration_source, None);
    }

    #[test]
    fn data_root_is_last_resort() {
        let paths = ConfigPaths::discover_with(&CliPaths::default(), lookup(&[]), || {
            Ok(PathBuf::from("/data/catalogs"))
        })
        .unwrap();
        assert_eq!(
            paths.catalog,
            CatalogLocation::Dir(PathBuf::from("/data/catalogs"))
        );
        assert_eq!(paths.catalog_source.to_string(), "shipped data root");

        let err = ConfigPaths::discover_with(&CliPaths::default(), lookup(&[]), no_data_root)
            .unwrap_err();
        assert!(err.to_string().contains("no data root"));
    }

    #[test]
    fn catalog_and_dir_conflict() {
        let cli = CliPaths {
            catalog: Some(PathBuf::from("a.json")),
            catalog_dir: Some(PathBuf::from("dir")),
            declaration: None,
        };
        assert!(ConfigPaths::discover_with(&cli, lookup(&[]), no_data_root).is_err());
    }

    #[test]
    fn env_flag_semantics() {
        assert!(env_flag(Some("1".into())));
        assert!(env_flag(Some("yes".into())));
        assert!(!env_flag(Some("0".into())));
        assert!(!env_flag(Some("".into())));
        assert!(!env_flag(None));
    }
}
