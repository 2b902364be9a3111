//! Resolve a vendor flag catalog from a capability declaration.
//!
//! The host build layer shells out to this binary while evaluating its build
//! description: it reads the declaration and catalog, runs the resolver, and
//! prints either a JSON report, `flag=value` lines, or the catalog with the
//! decided values written in. Diagnostics go to stderr through `tracing`.

use anyhow::{Context, Result, bail};
use featurefence::config::{CatalogLocation, CliPaths, ConfigPaths, ENV_DENY_CONFLICTS, env_flag};
use featurefence::report::warning_lines;
use featurefence::{
    CapabilityDeclaration, CapabilityName, CatalogKey, CatalogRepository, FlagCatalog, FlagIndex,
    OverrideTable, build_report, effective_overrides, logging, parse_override, resolve,
    split_list, validate_totality,
};
use std::env;
use std::ffi::OsString;
use std::path::PathBuf;
use tracing::{debug, info};

fn main() {
    if let Err(err) = run() {
        eprintln!("{err:#}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let args = CliArgs::parse()?;
    logging::init_logging(&args.log_level)?;

    let paths = ConfigPaths::discover(&args.paths)?;
    debug!(
        catalog = ?paths.catalog,
        source = %paths.catalog_source,
        "catalog location"
    );
    if let (Some(path), Some(source)) = (&paths.declaration, &paths.declaration_source) {
        debug!(declaration = %path.display(), %source, "declaration location");
    }

    let mut declaration = match &paths.declaration {
        Some(path) => CapabilityDeclaration::load(path)?,
        None => CapabilityDeclaration::default(),
    };
    declaration
        .capabilities
        .extend(args.capabilities.iter().cloned().map(CapabilityName));
    for (flag, value) in args.overrides.iter() {
        declaration.overrides.insert(flag.clone(), value);
    }
    if args.catalog_key.is_some() {
        declaration.catalog = args.catalog_key.clone();
    }

    let catalog = load_catalog(&paths.catalog, declaration.catalog.as_ref())?;
    let overrides = effective_overrides(&catalog, &declaration.overrides);
    let capabilities = declaration.capability_set();

    let resolution = resolve(&capabilities, &catalog, &overrides)
        .with_context(|| format!("resolving catalog {}", catalog.key()))?;
    validate_totality(&resolution, &catalog)?;
    let report = build_report(&resolution);
    info!(
        catalog = %report.catalog,
        flags = report.total_flags,
        enabled = report.enabled_modules.len(),
        "resolution complete"
    );

    if args.deny_conflicts && resolution.has_conflicts() {
        bail!(
            "resolution has policy conflicts:\n{}",
            warning_lines(&report).join("\n")
        );
    }

    match args.format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
        OutputFormat::Assignments => {
            for decision in &resolution.decisions {
                println!("{}={}", decision.flag, decision.value);
            }
        }
        OutputFormat::Catalog => {
            println!(
                "{}",
                serde_json::to_string_pretty(&resolution.apply(&catalog))?
            )
        }
    }
    Ok(())
}

fn load_catalog(location: &CatalogLocation, key: Option<&CatalogKey>) -> Result<FlagCatalog> {
    match location {
        CatalogLocation::File(path) => {
            let index = FlagIndex::load(path)?;
            if let Some(key) = key {
                if index.key() != key {
                    bail!(
                        "declaration targets catalog {} but {} holds {}",
                        key,
                        path.display(),
                        index.key()
                    );
                }
            }
            Ok(index.into_catalog())
        }
        CatalogLocation::Dir(dir) => {
            let repository = CatalogRepository::load_dir(dir)?;
            Ok(repository.select(key)?.clone())
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OutputFormat {
    Json,
    Assignments,
    Catalog,
}

impl OutputFormat {
    fn from_str(raw: &str) -> Result<Self> {
        match raw {
            "json" => Ok(Self::Json),
            "assignments" => Ok(Self::Assignments),
            "catalog" => Ok(Self::Catalog),
            other => bail!("unknown format '{other}' (expected json|assignments|catalog)"),
        }
    }
}

struct CliArgs {
    paths: CliPaths,
    catalog_key: Option<CatalogKey>,
    capabilities: Vec<String>,
    overrides: OverrideTable,
    format: OutputFormat,
    deny_conflicts: bool,
    log_level: String,
}

impl CliArgs {
    fn parse() -> Result<Self> {
        Self::parse_from(env::args_os().skip(1))
    }

    fn parse_from(args: impl IntoIterator<Item = OsString>) -> Result<Self> {
        let mut args = args.into_iter();
        let mut paths = CliPaths::default();
        let mut catalog_key = None;
        let mut capabilities = Vec::new();
        let mut overrides = OverrideTable::new();
        let mut format = OutputFormat::Json;
        let mut deny_conflicts = env_flag(env::var(ENV_DENY_CONFLICTS).ok());
        let mut log_level = "warn".to_string();

        while let Some(arg_os) = args.next() {
            let arg = arg_os
                .into_string()
                .map_err(|_| anyhow::anyhow!("argument is not valid UTF-8"))?;
            match arg.as_str() {
                "--declaration" => {
                    paths.declaration =
                        Some(PathBuf::from(next_value(&mut args, "--declaration")?));
                }
                "--catalog" => {
                    paths.catalog = Some(PathBuf::from(next_value(&mut args, "--catalog")?));
                }
                "--catalog-dir" => {
                    paths.catalog_dir =
                        Some(PathBuf::from(next_value(&mut args, "--catalog-dir")?));
                }
                "--catalog-key" => {
                    catalog_key = Some(CatalogKey(next_value(&mut args, "--catalog-key")?));
                }
                "--capability" => {
                    let raw = next_value(&mut args, "--capability")?;
                    capabilities.extend(split_list(&raw));
                }
                "--override" => {
                    let raw = next_value(&mut args, "--override")?;
                    let (flag, value) = parse_override(&raw)?;
                    overrides.insert(flag, value);
                }
                "--format" => {
                    format = OutputFormat::from_str(&next_value(&mut args, "--format")?)?;
                }
                "--deny-conflicts" => deny_conflicts = true,
                "--log-level" => log_level = next_value(&mut args, "--log-level")?,
                "--help" | "-h" => {
                    print!("{}", usage());
                    std::process::exit(0);
                }
                other => bail!("unknown flag: {other}\n{}", usage()),
            }
        }

        Ok(CliArgs {
            paths,
            catalog_key,
            capabilities,
            overrides,
            format,
            deny_conflicts,
            log_level,
        })
    }
}

fn next_value(args: &mut impl Iterator<Item = OsString>, flag: &str) -> Result<String> {
    args.next()
        .map(|os| {
            os.into_string()
                .map_err(|_| anyhow::anyhow!("value for {flag} is not valid UTF-8"))
        })
        .transpose()?
        .ok_or_else(|| anyhow::anyhow!("missing value for {flag}"))
}

fn usage() -> &'static str {
    "Usage: resolve-flags [--declaration PATH] [--catalog PATH | --catalog-dir DIR] [--catalog-key KEY]\n\
                     [--capability NAME[,NAME...]]... [--override FLAG=BOOL]...\n\
                     [--format json|assignments|catalog] [--deny-conflicts] [--log-level LEVEL]\n\
Resolves every flag in a vendor catalog from the declared capabilities and prints the result.\n"
}
