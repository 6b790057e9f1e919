//! Config commands

use anyhow::{bail, Result};
use std::io::Write;

use dockyard_protocol::{Backend, ConfigPatch, User};

/// `dockyard env -a <app>`
pub async fn execute_env(
    backend: &dyn Backend,
    out: &mut (dyn Write + Send),
    app: &str,
) -> Result<()> {
    let config = backend.config(app).await?;
    for (name, value) in config {
        writeln!(out, "{}={}", name, value)?;
    }
    Ok(())
}

/// `dockyard get -a <app> <NAME>`
pub async fn execute_get(
    backend: &dyn Backend,
    out: &mut (dyn Write + Send),
    app: &str,
    name: &str,
) -> Result<()> {
    let config = backend.config(app).await?;
    match config.get(name) {
        Some(value) => writeln!(out, "{}", value)?,
        None => bail!("{} is not set on {}", name, app),
    }
    Ok(())
}

/// `dockyard set -a <app> NAME=value...`
pub async fn execute_set(
    backend: &dyn Backend,
    actor: &User,
    out: &mut (dyn Write + Send),
    app: &str,
    vars: &[String],
) -> Result<()> {
    let patch = parse_assignments(vars)?;
    let names: Vec<String> = patch.keys().cloned().collect();
    backend.update_config(actor, app, patch).await?;
    writeln!(out, "Set {} on {}.", names.join(", "), app)?;
    Ok(())
}

/// `dockyard unset -a <app> NAME...`
pub async fn execute_unset(
    backend: &dyn Backend,
    actor: &User,
    out: &mut (dyn Write + Send),
    app: &str,
    names: &[String],
) -> Result<()> {
    let patch: ConfigPatch = names.iter().map(|name| (name.clone(), None)).collect();
    backend.update_config(actor, app, patch).await?;
    writeln!(out, "Unset {} on {}.", names.join(", "), app)?;
    Ok(())
}

/// Parse `NAME=value` pairs. Values may contain `=`.
pub fn parse_assignments(vars: &[String]) -> Result<ConfigPatch> {
    let mut patch = ConfigPatch::new();
    for var in vars {
        match var.split_once('=') {
            Some((name, value)) if !name.is_empty() => {
                patch.insert(name.to_string(), Some(value.to_string()));
            }
            _ => bail!("Invalid config var '{}'. Expected NAME=value", var),
        }
    }
    Ok(patch)
}
