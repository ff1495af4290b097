//! Imperative permission commands: list, set, clear

use anyhow::{Context as AnyhowContext, Result, bail};
use colored::Colorize;
use rabbitkit::{DesiredPermission, PermissionKind, PermissionProvider, PermissionRecord, Session};

use super::{load_config, open_session};
use crate::Context;
use crate::ui;

/// All permissions of `user`, sorted by vhost
pub fn user_permissions(session: &mut Session, user: &str) -> Result<Vec<PermissionRecord>> {
    let mut records: Vec<PermissionRecord> = session
        .lookup(user)
        .with_context(|| format!("Failed to list permissions of {user}"))?
        .map(|permissions| permissions.values().cloned().collect())
        .unwrap_or_default();
    records.sort_by(|a, b| a.vhost.cmp(&b.vhost));
    Ok(records)
}

pub fn list(ctx: &Context, user: &str) -> Result<()> {
    let config = load_config(ctx)?;
    let mut session = open_session(ctx, &config)?;
    let records = user_permissions(&mut session, user)?;

    ui::header(&format!("Permissions of {user}"));

    if records.is_empty() {
        ui::dim("(no permissions)");
        return Ok(());
    }

    println!(
        "  {:<20} {:<20} {:<20} {}",
        "vhost".dimmed(),
        "configure".dimmed(),
        "write".dimmed(),
        "read".dimmed()
    );
    for record in &records {
        println!(
            "  {:<20} {:<20} {:<20} {}",
            record.vhost.bold(),
            ui::permission(&record.configure),
            ui::permission(&record.write),
            ui::permission(&record.read)
        );
    }

    Ok(())
}

/// Stage the given values and send them as one `set_permissions`.
///
/// Columns not given keep their current value. Returns false if nothing
/// was sent.
pub fn set_permissions(
    session: &mut Session,
    name: &str,
    values: &[(PermissionKind, Option<String>)],
) -> Result<bool> {
    let desired = DesiredPermission::from_name(name)?;
    let mut provider = PermissionProvider::new(desired);

    for (kind, value) in values {
        if let Some(value) = value {
            provider.set(*kind, value.as_str());
        }
    }

    if provider.pending().is_empty() {
        bail!("Nothing to set: pass --configure, --write or --read");
    }

    provider
        .flush(session)
        .with_context(|| format!("Failed to set permissions of {name}"))
}

pub fn set(
    ctx: &Context,
    name: &str,
    configure: Option<String>,
    write: Option<String>,
    read: Option<String>,
) -> Result<()> {
    let config = load_config(ctx)?;
    let mut session = open_session(ctx, &config)?;

    let values = [
        (PermissionKind::Configure, configure),
        (PermissionKind::Write, write),
        (PermissionKind::Read, read),
    ];
    set_permissions(&mut session, name, &values)?;

    ui::success(&format!("Set permissions of {name}"));
    Ok(())
}

/// Clear the permissions of `name`; returns false if there were none
pub fn clear_permissions(session: &mut Session, name: &str) -> Result<bool> {
    let mut provider = PermissionProvider::new(DesiredPermission::from_name(name)?);

    if provider.exists(session)?.is_none() {
        return Ok(false);
    }

    provider
        .destroy(session)
        .with_context(|| format!("Failed to clear permissions of {name}"))?;
    Ok(true)
}

pub fn clear(ctx: &Context, name: &str) -> Result<()> {
    let config = load_config(ctx)?;
    let mut session = open_session(ctx, &config)?;

    if clear_permissions(&mut session, name)? {
        ui::success(&format!("Cleared permissions of {name}"));
    } else {
        ui::info(&format!("{name} has no permissions"));
    }

    Ok(())
}
