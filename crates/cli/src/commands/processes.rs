//! Process commands

use anyhow::{bail, Context, Result};
use std::io::Write;

use dockyard_protocol::{Backend, FormationUpdate, User};

/// `dockyard dynos -a <app>`
pub async fn execute_dynos(
    backend: &dyn Backend,
    out: &mut (dyn Write + Send),
    app: &str,
) -> Result<()> {
    let dynos = backend.dynos(app).await?;
    for dyno in dynos {
        writeln!(
            out,
            "{:<12} {:<4} {:<5} {}",
            dyno.name,
            dyno.size,
            dyno.release.version.to_string(),
            dyno.state
        )?;
    }
    Ok(())
}

/// `dockyard scale -a <app> web=2 worker=1:2X`
pub async fn execute_scale(
    backend: &dyn Backend,
    actor: &User,
    out: &mut (dyn Write + Send),
    app: &str,
    changes: &[String],
) -> Result<()> {
    let updates = changes
        .iter()
        .map(|change| parse_scale(change))
        .collect::<Result<Vec<_>>>()?;

    let formation = backend.scale(actor, app, updates).await?;
    let summary: Vec<String> = formation
        .iter()
        .map(|f| format!("{}={}:{}", f.process_type, f.quantity, f.size))
        .collect();
    writeln!(out, "Scaled {} to {}.", app, summary.join(", "))?;
    Ok(())
}

/// Parse `TYPE=QUANTITY[:SIZE]`
pub fn parse_scale(change: &str) -> Result<FormationUpdate> {
    let Some((process, rest)) = change.split_once('=') else {
        bail!("Invalid scale argument '{}'. Expected TYPE=QUANTITY[:SIZE]", change);
    };
    if process.is_empty() {
        bail!("Invalid scale argument '{}': missing process type", change);
    }

    let (quantity, size) = match rest.split_once(':') {
        Some((quantity, size)) => (quantity, Some(size.to_string())),
        None => (rest, None),
    };
    let quantity = quantity
        .parse()
        .with_context(|| format!("Invalid quantity in '{}'", change))?;

    Ok(FormationUpdate {
        process: process.to_string(),
        quantity,
        size,
    })
}
