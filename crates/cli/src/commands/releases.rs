//! Release and deploy commands

use anyhow::{Context, Result};
use std::io::Write;

use dockyard_protocol::{Backend, Release, User, Version};

/// `dockyard releases -a <app>`
pub async fn execute_releases(
    backend: &dyn Backend,
    out: &mut (dyn Write + Send),
    app: &str,
) -> Result<()> {
    let releases = backend.releases(app).await?;
    for release in releases.iter().rev() {
        write_release_line(out, release)?;
    }
    Ok(())
}

/// `dockyard release-info -a <app> <version>`
pub async fn execute_release_info(
    backend: &dyn Backend,
    out: &mut (dyn Write + Send),
    app: &str,
    version: &str,
) -> Result<()> {
    let release = backend.release(app, parse_version(version)?).await?;
    writeln!(out, "Version:  {}", release.version)?;
    writeln!(out, "By:       {}", release.user.email)?;
    writeln!(out, "Change:   {}", release.description)?;
    writeln!(out, "When:     {}", release.created_at.to_rfc3339())?;
    writeln!(out, "Id:       {}", release.id)?;
    writeln!(out, "Slug id:  {}", release.slug.id)?;
    Ok(())
}

/// `dockyard rollback -a <app> <version>`
pub async fn execute_rollback(
    backend: &dyn Backend,
    actor: &User,
    out: &mut (dyn Write + Send),
    app: &str,
    version: &str,
) -> Result<()> {
    let target = parse_version(version)?;
    let release = backend.rollback(actor, app, target).await?;
    writeln!(out, "Rolled back {} to {} as {}.", app, target, release.version)?;
    Ok(())
}

/// `dockyard deploy <image>`
pub async fn execute_deploy(
    backend: &dyn Backend,
    actor: &User,
    out: &mut (dyn Write + Send),
    image: &str,
) -> Result<()> {
    let deploy = backend.deploy(actor, image).await?;
    writeln!(
        out,
        "Deployed {} to {} as {}.",
        deploy.image, deploy.app, deploy.release.version
    )?;
    Ok(())
}

fn parse_version(version: &str) -> Result<Version> {
    version
        .parse()
        .with_context(|| format!("Invalid release version '{}'. Expected e.g. v3", version))
}

fn write_release_line(out: &mut (dyn Write + Send), release: &Release) -> Result<()> {
    writeln!(
        out,
        "{:<5} {:<40} {:<24} {}",
        release.version.to_string(),
        release.description,
        release.user.email,
        release.created_at.format("%b %e %H:%M")
    )?;
    Ok(())
}
