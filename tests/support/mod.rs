#![allow(dead_code)]

use anyhow::{Context, Result, bail};
use serde_json::Value;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use tempfile::NamedTempFile;

pub fn repo_root() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
}

pub fn boost_catalog_path() -> PathBuf {
    repo_root().join("catalogs").join("boost_1.84.0.json")
}

pub fn udp_declaration_path() -> PathBuf {
    repo_root().join("declarations").join("udp_service.json")
}

pub fn resolve_flags_binary() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_resolve-flags"))
}

/// Base command with logging pinned so stderr stays predictable.
pub fn resolve_flags_command() -> Command {
    let mut cmd = Command::new(resolve_flags_binary());
    cmd.env_remove("FEATUREFENCE_ROOT")
        .env_remove("FEATUREFENCE_CATALOG")
        .env_remove("FEATUREFENCE_CATALOG_DIR")
        .env_remove("FEATUREFENCE_DECLARATION")
        .env_remove("FEATUREFENCE_DENY_CONFLICTS")
        .env("FEATUREFENCE_LOG", "featurefence=warn");
    cmd
}

pub fn run_command(mut cmd: Command) -> Result<Output> {
    let output = cmd
        .output()
        .with_context(|| format!("failed to run command: {:?}", cmd))?;
    if output.status.success() {
        Ok(output)
    } else {
        bail!(
            "command {:?} failed: status {:?}\nstdout: {}\nstderr: {}",
            cmd,
            output.status.code(),
            String::from_utf8_lossy(&output.stdout),
            String::from_utf8_lossy(&output.stderr)
        )
    }
}

pub fn write_json(value: &Value) -> Result<NamedTempFile> {
    let mut file = NamedTempFile::new().context("failed to allocate temp file")?;
    serde_json::to_writer(&mut file, value)?;
    file.flush()?;
    Ok(file)
}

pub fn write_json_at(path: &Path, value: &Value) -> Result<()> {
    std::fs::write(path, serde_json::to_vec_pretty(value)?)
        .with_context(|| format!("writing {}", path.display()))
}
