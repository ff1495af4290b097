// Declarative commands (status, diff, apply)
pub mod declarative;

// Imperative commands (list, set, clear)
pub mod permissions;

use anyhow::Result;
use rabbitkit::Session;
use rabbitkit::backend::rabbitmqctl::RabbitmqctlBackend;
use std::path::PathBuf;

use crate::Context;
use crate::config::WarrenConfig;

/// Load the config named on the command line, or the default one
pub fn load_config(ctx: &Context) -> Result<WarrenConfig> {
    WarrenConfig::load(ctx.config.as_deref())
}

/// Resolve rabbitmqctl: --rabbitmqctl / $RABBITMQCTL, then the config, then discovery
pub fn resolve_rabbitmqctl(ctx: &Context, config: &WarrenConfig) -> Result<Option<PathBuf>> {
    if let Some(path) = &ctx.rabbitmqctl {
        return Ok(Some(path.clone()));
    }
    config.rabbitmqctl_path()
}

/// Build the rabbitmqctl backend
pub fn open_backend(ctx: &Context, config: &WarrenConfig) -> Result<RabbitmqctlBackend> {
    let backend = match resolve_rabbitmqctl(ctx, config)? {
        Some(path) => {
            if !path.exists() {
                log::error!("Configured rabbitmqctl does not exist: {}", path.display());
                return Err(rabbitkit::Error::RabbitmqctlNotFound.into());
            }
            RabbitmqctlBackend::with_path(path)
        }
        None => RabbitmqctlBackend::new()?,
    };

    log::debug!("Using {}", backend.path().display());
    Ok(backend)
}

/// A fresh session: one listing per user for the rest of this run
pub fn open_session(ctx: &Context, config: &WarrenConfig) -> Result<Session> {
    Ok(Session::new(Box::new(open_backend(ctx, config)?)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx(rabbitmqctl: Option<&str>) -> Context {
        Context {
            verbose: 0,
            quiet: false,
            config: None,
            rabbitmqctl: rabbitmqctl.map(PathBuf::from),
        }
    }

    #[test]
    fn test_cli_path_wins_over_config() {
        let config = WarrenConfig::parse("[rabbitmqctl]\npath = \"/opt/rmq/rabbitmqctl\"\n").unwrap();
        assert_eq!(
            resolve_rabbitmqctl(&ctx(Some("/usr/sbin/rabbitmqctl")), &config).unwrap(),
            Some(PathBuf::from("/usr/sbin/rabbitmqctl"))
        );
        assert_eq!(
            resolve_rabbitmqctl(&ctx(None), &config).unwrap(),
            Some(PathBuf::from("/opt/rmq/rabbitmqctl"))
        );
        assert_eq!(
            resolve_rabbitmqctl(&ctx(None), &WarrenConfig::default()).unwrap(),
            None
        );
    }

    #[test]
    fn test_missing_explicit_path() {
        let tmp = tempfile::TempDir::new().unwrap();
        let missing = tmp.path().join("rabbitmqctl");
        let err = open_backend(&ctx(missing.to_str()), &WarrenConfig::default()).unwrap_err();
        let err = err.downcast::<rabbitkit::Error>().unwrap();
        assert_eq!(err.category(), rabbitkit::ErrorCategory::NotFound);
    }
}
