//! Flag resolution engine.
//!
//! `resolve` turns a capability set, a vendor catalog and an override table
//! into one decision per catalog entry. It borrows every input immutably and
//! returns a freshly allocated `Resolution`; applying the result to a build is
//! the caller's job.
//!
//! Per flag, in catalog order:
//! 1. an override, if present, wins outright;
//! 2. otherwise the catalog's `Derivation` names the governed module;
//!    structural flags keep their pre-existing value;
//! 3. otherwise the module is enabled iff it was requested (default-deny).

use crate::catalog::{
    CapabilityName, CatalogKey, Derivation, FlagCatalog, FlagName, ModuleLookup,
};
use crate::declaration::CapabilitySet;
use crate::error::{ResolveError, Result};
use crate::overrides::OverrideTable;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, warn};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
/// Which rule produced a decision.
pub enum DecisionSource {
    Override,
    Requested,
    DefaultDeny,
    Passthrough,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
/// Final value for one catalog flag.
pub struct Decision {
    pub flag: FlagName,
    /// Module the flag governs, when it is a per-module toggle.
    pub capability: Option<CapabilityName>,
    /// Value the catalog held before resolution.
    pub previous: bool,
    /// Value to write into the vendor build option.
    pub value: bool,
    /// Whether the governed component ends up built; `None` for structural
    /// flags.
    pub enabled: Option<bool>,
    pub source: DecisionSource,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
/// An override disabled a flag whose capability was explicitly requested.
pub struct PolicyConflict {
    pub flag: FlagName,
    pub capability: CapabilityName,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
/// Total assignment over a catalog plus the diagnostics gathered on the way.
pub struct Resolution {
    pub catalog: CatalogKey,
    /// One entry per catalog flag, in catalog order.
    pub decisions: Vec<Decision>,
    pub conflicts: Vec<PolicyConflict>,
    /// Requested capabilities that no catalog flag derives to.
    pub unused_capabilities: Vec<CapabilityName>,
    /// Overrides naming flags the catalog does not contain.
    pub unmatched_overrides: Vec<FlagName>,
}

/// Resolve every flag in `catalog`.
///
/// Fails only on a malformed catalog: empty or duplicate flag names, an empty
/// derivation prefix, or a flag missing from a derivation table.
pub fn resolve(
    capabilities: &CapabilitySet,
    catalog: &FlagCatalog,
    overrides: &OverrideTable,
) -> Result<Resolution> {
    validate_catalog(catalog)?;

    let polarity = catalog.polarity;
    let mut decisions = Vec::with_capacity(catalog.flags.len());
    let mut conflicts = Vec::new();
    let mut derived_modules: BTreeSet<&CapabilityName> = BTreeSet::new();
    let mut lookups = Vec::with_capacity(catalog.flags.len());

    for descriptor in &catalog.flags {
        lookups.push(catalog.derivation.lookup(&descriptor.name));
    }

    for (descriptor, lookup) in catalog.flags.iter().zip(&lookups) {
        let capability = match lookup {
            ModuleLookup::Module(module) => {
                derived_modules.insert(module);
                Some(module.clone())
            }
            ModuleLookup::Structural | ModuleLookup::Missing => None,
        };

        let decision = if let Some(value) = overrides.get(&descriptor.name) {
            let enabled = capability.as_ref().map(|_| polarity.is_enabled(value));
            if let Some(module) = &capability {
                if enabled == Some(false) && capabilities.contains(module) {
                    warn!(
                        flag = %descriptor.name,
                        capability = %module,
                        "override disables a requested capability"
                    );
                    conflicts.push(PolicyConflict {
                        flag: descriptor.name.clone(),
                        capability: module.clone(),
                    });
                }
            }
            Decision {
                flag: descriptor.name.clone(),
                capability,
                previous: descriptor.value,
                value,
                enabled,
                source: DecisionSource::Override,
            }
        } else {
            match capability {
                Some(module) => {
                    let enabled = capabilities.contains(&module);
                    Decision {
                        flag: descriptor.name.clone(),
                        capability: Some(module),
                        previous: descriptor.value,
                        value: polarity.flag_value(enabled),
                        enabled: Some(enabled),
                        source: if enabled {
                            DecisionSource::Requested
                        } else {
                            DecisionSource::DefaultDeny
                        },
                    }
                }
                None if *lookup == ModuleLookup::Missing => {
                    return Err(ResolveError::MissingTableEntry(descriptor.name.clone()));
                }
                None => Decision {
                    flag: descriptor.name.clone(),
                    capability: None,
                    previous: descriptor.value,
                    value: descriptor.value,
                    enabled: None,
                    source: DecisionSource::Passthrough,
                },
            }
        };
        decisions.push(decision);
    }

    let unused_capabilities: Vec<CapabilityName> = capabilities
        .iter()
        .filter(|capability| !derived_modules.contains(capability))
        .cloned()
        .collect();
    for capability in &unused_capabilities {
        debug!(capability = %capability, "requested capability matches no catalog flag");
    }

    let catalog_names: BTreeSet<&FlagName> = catalog.flags.iter().map(|f| &f.name).collect();
    let unmatched_overrides: Vec<FlagName> = overrides
        .iter()
        .filter(|(flag, _)| !catalog_names.contains(flag))
        .map(|(flag, _)| flag.clone())
        .collect();
    for flag in &unmatched_overrides {
        warn!(flag = %flag, catalog = %catalog.key(), "override names a flag missing from the catalog");
    }

    debug!(
        catalog = %catalog.key(),
        flags = decisions.len(),
        conflicts = conflicts.len(),
        "resolved flag catalog"
    );

    Ok(Resolution {
        catalog: catalog.key().clone(),
        decisions,
        conflicts,
        unused_capabilities,
        unmatched_overrides,
    })
}

fn validate_catalog(catalog: &FlagCatalog) -> Result<()> {
    if let Derivation::Prefix { prefix } = &catalog.derivation {
        if prefix.is_empty() {
            return Err(ResolveError::EmptyPrefix);
        }
    }
    let mut seen = BTreeSet::new();
    for (index, descriptor) in catalog.flags.iter().enumerate() {
        if descriptor.name.0.trim().is_empty() {
            return Err(ResolveError::EmptyFlagName { index });
        }
        if !seen.insert(&descriptor.name) {
            return Err(ResolveError::DuplicateFlag(descriptor.name.clone()));
        }
    }
    Ok(())
}

impl Resolution {
    pub fn decision(&self, flag: &str) -> Option<&Decision> {
        self.decisions.iter().find(|d| d.flag.as_str() == flag)
    }

    /// Resolved value for `flag`, if the catalog contains it.
    pub fn value(&self, flag: &str) -> Option<bool> {
        self.decision(flag).map(|d| d.value)
    }

    /// Flat `flag -> value` view for the build layer.
    pub fn assignments(&self) -> BTreeMap<FlagName, bool> {
        self.decisions
            .iter()
            .map(|d| (d.flag.clone(), d.value))
            .collect()
    }

    /// Decision per governed module.
    ///
    /// When several flags derive to the same module, the one appearing later
    /// in catalog order wins.
    pub fn by_capability(&self) -> BTreeMap<&CapabilityName, &Decision> {
        let mut map = BTreeMap::new();
        for decision in &self.decisions {
            if let Some(capability) = &decision.capability {
                map.insert(capability, decision);
            }
        }
        map
    }

    pub fn has_conflicts(&self) -> bool {
        !self.conflicts.is_empty()
    }

    /// Copy `catalog` with each resolved value written in.
    ///
    /// Flags the resolution does not cover keep their value; `catalog` itself
    /// is left untouched.
    pub fn apply(&self, catalog: &FlagCatalog) -> FlagCatalog {
        let values = self.assignments();
        let mut applied = catalog.clone();
        for descriptor in &mut applied.flags {
            if let Some(value) = values.get(&descriptor.name) {
                descriptor.value = *value;
            }
        }
        applied
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{FlagDescriptor, Polarity};

    fn catalog(names: &[(&str, bool)]) -> FlagCatalog {
        FlagCatalog::new(
            "fixture",
            names
                .iter()
                .map(|(name, value)| FlagDescriptor::new(*name, *value))
                .collect(),
        )
    }

    fn four_flags() -> FlagCatalog {
        catalog(&[
            ("without_container", true),
            ("without_coroutine", true),
            ("without_log", false),
            ("without_thread", false),
        ])
    }

    #[test]
    fn requested_modules_enabled_rest_denied() {
        let caps = CapabilitySet::from_names(["container", "coroutine"]);
        let resolution = resolve(&caps, &four_flags(), &OverrideTable::new()).unwrap();

        assert_eq!(resolution.value("without_container"), Some(false));
        assert_eq!(resolution.value("without_coroutine"), Some(false));
        assert_eq!(resolution.value("without_log"), Some(true));
        assert_eq!(resolution.value("without_thread"), Some(true));
        assert_eq!(
            resolution.decision("without_log").unwrap().source,
            DecisionSource::DefaultDeny
        );
        assert_eq!(
            resolution.decision("without_container").unwrap().source,
            DecisionSource::Requested
        );
        assert!(!resolution.has_conflicts());
    }

    #[test]
    fn empty_set_with_override_keeps_only_the_override_enabled() {
        let overrides = OverrideTable::new().with("without_log", false);
        let resolution = resolve(&CapabilitySet::new(), &four_flags(), &overrides).unwrap();

        assert_eq!(resolution.value("without_log"), Some(false));
        assert_eq!(resolution.value("without_container"), Some(true));
        assert_eq!(resolution.value("without_coroutine"), Some(true));
        assert_eq!(resolution.value("without_thread"), Some(true));
        let log = resolution.decision("without_log").unwrap();
        assert_eq!(log.source, DecisionSource::Override);
        assert_eq!(log.enabled, Some(true));
    }

    #[test]
    fn non_prefixed_flag_keeps_previous_value() {
        let flags = catalog(&[("dynamic_linking_enabled", true), ("without_log", false)]);
        let resolution = resolve(&CapabilitySet::new(), &flags, &OverrideTable::new()).unwrap();

        let decision = resolution.decision("dynamic_linking_enabled").unwrap();
        assert!(decision.value);
        assert_eq!(decision.source, DecisionSource::Passthrough);
        assert_eq!(decision.capability, None);
        assert_eq!(decision.enabled, None);
    }

    #[test]
    fn override_disabling_requested_capability_is_flagged() {
        let caps = CapabilitySet::from_names(["log"]);
        let overrides = OverrideTable::new().with("without_log", true);
        let resolution = resolve(&caps, &four_flags(), &overrides).unwrap();

        assert_eq!(resolution.value("without_log"), Some(true));
        assert_eq!(
            resolution.conflicts,
            vec![PolicyConflict {
                flag: FlagName::from("without_log"),
                capability: CapabilityName::from("log"),
            }]
        );
    }

    #[test]
    fn override_on_structural_flag_is_not_a_conflict() {
        let flags = catalog(&[("shared", false)]);
        let caps = CapabilitySet::from_names(["shared"]);
        let overrides = OverrideTable::new().with("shared", true);
        let resolution = resolve(&caps, &flags, &overrides).unwrap();
        assert_eq!(resolution.value("shared"), Some(true));
        assert!(resolution.conflicts.is_empty());
        assert_eq!(resolution.decision("shared").unwrap().enabled, None);
    }

    #[test]
    fn unknown_capability_is_reported_not_rejected() {
        let caps = CapabilitySet::from_names(["container", "quantum"]);
        let resolution = resolve(&caps, &four_flags(), &OverrideTable::new()).unwrap();
        assert_eq!(
            resolution.unused_capabilities,
            vec![CapabilityName::from("quantum")]
        );
        assert_eq!(resolution.decisions.len(), 4);
    }

    #[test]
    fn capability_reached_only_through_override_still_counts_as_used() {
        let caps = CapabilitySet::from_names(["log"]);
        let overrides = OverrideTable::new().with("without_log", false);
        let resolution = resolve(&caps, &four_flags(), &overrides).unwrap();
        assert!(resolution.unused_capabilities.is_empty());
    }

    #[test]
    fn unmatched_override_is_reported() {
        let overrides = OverrideTable::new().with("without_wave", true);
        let resolution = resolve(&CapabilitySet::new(), &four_flags(), &overrides).unwrap();
        assert_eq!(
            resolution.unmatched_overrides,
            vec![FlagName::from("without_wave")]
        );
        assert_eq!(resolution.decisions.len(), 4);
    }

    #[test]
    fn duplicate_flag_names_abort() {
        let flags = catalog(&[("without_log", false), ("without_log", true)]);
        let err = resolve(&CapabilitySet::new(), &flags, &OverrideTable::new()).unwrap_err();
        assert_eq!(err, ResolveError::DuplicateFlag(FlagName::from("without_log")));
    }

    #[test]
    fn empty_flag_name_aborts() {
        let flags = catalog(&[("without_log", false), ("  ", true)]);
        let err = resolve(&CapabilitySet::new(), &flags, &OverrideTable::new()).unwrap_err();
        assert_eq!(err, ResolveError::EmptyFlagName { index: 1 });
    }

    #[test]
    fn empty_prefix_aborts() {
        let flags = four_flags().with_derivation(Derivation::Prefix {
            prefix: String::new(),
        });
        let err = resolve(&CapabilitySet::new(), &flags, &OverrideTable::new()).unwrap_err();
        assert_eq!(err, ResolveError::EmptyPrefix);
    }

    #[test]
    fn include_polarity_writes_true_for_enabled() {
        let flags = FlagCatalog::new(
            "fixture",
            vec![
                FlagDescriptor::new("with_json", false),
                FlagDescriptor::new("with_regex", true),
            ],
        )
        .with_polarity(Polarity::Include)
        .with_derivation(Derivation::Prefix {
            prefix: "with_".to_string(),
        });
        let caps = CapabilitySet::from_names(["json"]);
        let resolution = resolve(&caps, &flags, &OverrideTable::new()).unwrap();
        assert_eq!(resolution.value("with_json"), Some(true));
        assert_eq!(resolution.value("with_regex"), Some(false));
    }

    #[test]
    fn table_derivation_catches_missing_entries() {
        let flags = four_flags().with_derivation(Derivation::Table {
            entries: BTreeMap::from([
                (FlagName::from("without_container"), Some(CapabilityName::from("container"))),
                (FlagName::from("without_coroutine"), Some(CapabilityName::from("coroutine"))),
                (FlagName::from("without_log"), Some(CapabilityName::from("log"))),
            ]),
        });
        let err = resolve(&CapabilitySet::new(), &flags, &OverrideTable::new()).unwrap_err();
        assert_eq!(
            err,
            ResolveError::MissingTableEntry(FlagName::from("without_thread"))
        );

        // Pinning the unmapped flag is enough to get past the table.
        let overrides = OverrideTable::new().with("without_thread", true);
        let resolution = resolve(&CapabilitySet::new(), &flags, &overrides).unwrap();
        assert_eq!(resolution.value("without_thread"), Some(true));
    }

    #[test]
    fn later_flag_wins_for_shared_module() {
        let flags = catalog(&[("without_log", false), ("without_log_setup", false)])
            .with_derivation(Derivation::Table {
                entries: BTreeMap::from([
                    (FlagName::from("without_log"), Some(CapabilityName::from("log"))),
                    (FlagName::from("without_log_setup"), Some(CapabilityName::from("log"))),
                ]),
            });
        let overrides = OverrideTable::new().with("without_log_setup", true);
        let caps = CapabilitySet::from_names(["log"]);
        let resolution = resolve(&caps, &flags, &overrides).unwrap();

        let by_cap = resolution.by_capability();
        let log = by_cap[&CapabilityName::from("log")];
        assert_eq!(log.flag, FlagName::from("without_log_setup"));
        assert!(log.value);
        // Both flags are still decided individually.
        assert_eq!(resolution.value("without_log"), Some(false));
    }

    #[test]
    fn apply_returns_updated_copy() {
        let original = four_flags();
        let caps = CapabilitySet::from_names(["thread"]);
        let resolution = resolve(&caps, &original, &OverrideTable::new()).unwrap();

        let applied = resolution.apply(&original);
        assert!(original.flag(&FlagName::from("without_container")).unwrap().value);
        assert!(!applied.flag(&FlagName::from("without_thread")).unwrap().value);
        assert!(applied.flag(&FlagName::from("without_container")).unwrap().value);
        assert_eq!(applied.flags.len(), original.flags.len());
    }

    #[test]
    fn resolving_twice_is_identical() {
        let caps = CapabilitySet::from_names(["container"]);
        let overrides = OverrideTable::new().with("without_thread", false);
        let flags = four_flags();
        let first = resolve(&caps, &flags, &overrides).unwrap();
        let second = resolve(&caps, &flags, &overrides).unwrap();
        assert_eq!(first, second);
    }
}
