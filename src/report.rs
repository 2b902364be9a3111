//! Summaries of a resolution for the host build layer.
//!
//! The report flattens a `Resolution` into what a build script wants to print
//! or persist: the flag assignments, which modules ended up built, and every
//! diagnostic worth surfacing as a warning.

use crate::catalog::{CapabilityName, CatalogKey, FlagCatalog, FlagName};
use crate::resolve::{DecisionSource, PolicyConflict, Resolution};
use anyhow::{Result, bail};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
/// How many decisions each rule produced.
pub struct SourceCounts {
    pub overridden: usize,
    pub requested: usize,
    pub default_deny: usize,
    pub passthrough: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct ResolutionReport {
    pub catalog: CatalogKey,
    pub total_flags: usize,
    pub counts: SourceCounts,
    pub enabled_modules: Vec<CapabilityName>,
    pub disabled_modules: Vec<CapabilityName>,
    pub assignments: BTreeMap<FlagName, bool>,
    pub conflicts: Vec<PolicyConflict>,
    pub unused_capabilities: Vec<CapabilityName>,
    pub unmatched_overrides: Vec<FlagName>,
}

/// Build the report; module lists use the per-capability view, so the later
/// flag wins when two derive to the same module.
pub fn build_report(resolution: &Resolution) -> ResolutionReport {
    let mut counts = SourceCounts::default();
    for decision in &resolution.decisions {
        match decision.source {
            DecisionSource::Override => counts.overridden += 1,
            DecisionSource::Requested => counts.requested += 1,
            DecisionSource::DefaultDeny => counts.default_deny += 1,
            DecisionSource::Passthrough => counts.passthrough += 1,
        }
    }

    let mut enabled_modules = Vec::new();
    let mut disabled_modules = Vec::new();
    for (capability, decision) in resolution.by_capability() {
        match decision.enabled {
            Some(true) => enabled_modules.push(capability.clone()),
            Some(false) => disabled_modules.push(capability.clone()),
            None => {}
        }
    }

    ResolutionReport {
        catalog: resolution.catalog.clone(),
        total_flags: resolution.decisions.len(),
        counts,
        enabled_modules,
        disabled_modules,
        assignments: resolution.assignments(),
        conflicts: resolution.conflicts.clone(),
        unused_capabilities: resolution.unused_capabilities.clone(),
        unmatched_overrides: resolution.unmatched_overrides.clone(),
    }
}

/// Sanity-check that a resolution decides every catalog flag exactly once.
pub fn validate_totality(resolution: &Resolution, catalog: &FlagCatalog) -> Result<()> {
    if resolution.decisions.len() != catalog.flags.len() {
        bail!(
            "resolution has {} decisions for {} catalog flags",
            resolution.decisions.len(),
            catalog.flags.len()
        );
    }
    let mut seen = BTreeSet::new();
    for decision in &resolution.decisions {
        if !seen.insert(&decision.flag) {
            bail!("flag '{}' decided more than once", decision.flag);
        }
    }
    for descriptor in &catalog.flags {
        if !seen.contains(&descriptor.name) {
            bail!("resolution missing decision for '{}'", descriptor.name);
        }
    }
    Ok(())
}

/// Human-facing warning lines for diagnostics the caller should surface.
pub fn warning_lines(report: &ResolutionReport) -> Vec<String> {
    let mut lines = Vec::new();
    for conflict in &report.conflicts {
        lines.push(format!(
            "override on '{}' disables requested capability '{}'",
            conflict.flag, conflict.capability
        ));
    }
    for flag in &report.unmatched_overrides {
        lines.push(format!("override '{flag}' matches no flag in {}", report.catalog));
    }
    lines
}
