//! App commands

use anyhow::Result;
use std::io::Write;

use dockyard_protocol::{Backend, User};

/// `dockyard apps`
pub async fn execute_apps(backend: &dyn Backend, out: &mut (dyn Write + Send)) -> Result<()> {
    let apps = backend.apps().await?;
    for app in apps {
        writeln!(
            out,
            "{:<30} {}",
            app.name,
            app.created_at.format("%b %e %H:%M")
        )?;
    }
    Ok(())
}

/// `dockyard create <name>`
pub async fn execute_create(
    backend: &dyn Backend,
    actor: &User,
    out: &mut (dyn Write + Send),
    name: &str,
) -> Result<()> {
    let app = backend.create_app(actor, name).await?;
    writeln!(out, "Created {}.", app.name)?;
    Ok(())
}

/// `dockyard destroy <app>`
pub async fn execute_destroy(
    backend: &dyn Backend,
    actor: &User,
    out: &mut (dyn Write + Send),
    name: &str,
) -> Result<()> {
    backend.destroy_app(actor, name).await?;
    writeln!(out, "Destroyed {}.", name)?;
    Ok(())
}
