use anyhow::{Context, Result};
use rabbitkit::{DesiredPermission, Ensure, PermissionKind};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Get the config directory path
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir().context("Could not determine home directory")?;
    Ok(home.join(".config").join("warren"))
}

/// Get the default config file path
pub fn default_config_path() -> Result<PathBuf> {
    Ok(config_dir()?.join("config.toml"))
}

/// Expand `~` and environment variables in a configured path
pub fn expand_path(path: &str) -> Result<PathBuf> {
    let expanded = shellexpand::full(path).with_context(|| format!("Could not expand {path}"))?;
    Ok(PathBuf::from(expanded.as_ref()))
}

// ============================================================================
// Config Schema
// ============================================================================

/// The warren configuration file
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct WarrenConfig {
    /// How to reach rabbitmqctl
    #[serde(default)]
    pub rabbitmqctl: RabbitmqctlConfig,

    /// Declared permissions
    #[serde(default)]
    pub permissions: Vec<PermissionDecl>,
}

#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct RabbitmqctlConfig {
    /// Explicit path to the rabbitmqctl executable
    #[serde(default)]
    pub path: Option<String>,
}

/// One `[[permissions]]` entry
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct PermissionDecl {
    /// `user@vhost`; alternative to `user` + `vhost`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vhost: Option<String>,
    #[serde(default, alias = "configure_permission", skip_serializing_if = "Option::is_none")]
    pub configure: Option<String>,
    #[serde(default, alias = "write_permission", skip_serializing_if = "Option::is_none")]
    pub write: Option<String>,
    #[serde(default, alias = "read_permission", skip_serializing_if = "Option::is_none")]
    pub read: Option<String>,
    #[serde(default)]
    pub ensure: Ensure,
}

/// A validated declaration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Declaration {
    pub desired: DesiredPermission,
    pub ensure: Ensure,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("permissions[{index}]: set either name or user + vhost")]
    MissingIdentity { index: usize },

    #[error("permissions[{index}]: name and user/vhost are mutually exclusive")]
    AmbiguousIdentity { index: usize },

    #[error("permissions[{index}]: invalid name '{name}', expected user@vhost")]
    InvalidName { index: usize, name: String },

    #[error("permissions[{index}]: {name} is declared more than once")]
    Duplicate { index: usize, name: String },
}

impl PermissionDecl {
    /// Build the declared state for entry `index`
    pub fn desired(&self, index: usize) -> std::result::Result<DesiredPermission, ConfigError> {
        let mut desired = match (&self.name, &self.user, &self.vhost) {
            (Some(name), None, None) => DesiredPermission::from_name(name).map_err(|_| {
                ConfigError::InvalidName {
                    index,
                    name: name.clone(),
                }
            })?,
            (None, Some(user), Some(vhost)) if !user.is_empty() && !vhost.is_empty() => {
                DesiredPermission::new(user.as_str(), vhost.as_str())
            }
            (Some(_), _, _) => return Err(ConfigError::AmbiguousIdentity { index }),
            _ => return Err(ConfigError::MissingIdentity { index }),
        };

        for (kind, value) in [
            (PermissionKind::Configure, &self.configure),
            (PermissionKind::Write, &self.write),
            (PermissionKind::Read, &self.read),
        ] {
            if let Some(value) = value {
                desired.set(kind, value.as_str());
            }
        }

        Ok(desired)
    }
}

impl WarrenConfig {
    /// Load the config from `path`, or from ~/.config/warren/config.toml
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config_path = match path {
            Some(p) => p.to_path_buf(),
            None => default_config_path()?,
        };

        if !config_path.exists() {
            if path.is_some() {
                anyhow::bail!("Config file not found: {}", config_path.display());
            }
            log::info!("No config at {}, using empty config", config_path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(&config_path)
            .with_context(|| format!("Could not read config file: {}", config_path.display()))?;

        Self::parse(&content)
            .with_context(|| format!("Invalid warren config: {}", config_path.display()))
    }

    /// Parse config from TOML text
    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).context("Invalid TOML format in warren config")
    }

    /// Validate every entry and return the declarations in file order
    pub fn declarations(&self) -> std::result::Result<Vec<Declaration>, ConfigError> {
        let mut seen = HashSet::new();
        let mut declarations = Vec::with_capacity(self.permissions.len());

        for (index, decl) in self.permissions.iter().enumerate() {
            let desired = decl.desired(index)?;
            if !seen.insert((desired.user.clone(), desired.vhost.clone())) {
                return Err(ConfigError::Duplicate {
                    index,
                    name: desired.name(),
                });
            }
            declarations.push(Declaration {
                desired,
                ensure: decl.ensure,
            });
        }

        Ok(declarations)
    }

    /// Configured rabbitmqctl path, expanded
    pub fn rabbitmqctl_path(&self) -> Result<Option<PathBuf>> {
        self.rabbitmqctl
            .path
            .as_deref()
            .map(expand_path)
            .transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
[rabbitmqctl]
path = "/usr/sbin/rabbitmqctl"

[[permissions]]
name = "app@/"
configure = "^app\\..*"
write = ".*"
read = ".*"

[[permissions]]
user = "monitor"
vhost = "staging"
read_permission = ".*"

[[permissions]]
name = "legacy@/"
ensure = "absent"
"#;

    #[test]
    fn test_parse_sample() {
        let config = WarrenConfig::parse(SAMPLE).unwrap();
        assert_eq!(config.permissions.len(), 3);

        let declarations = config.declarations().unwrap();
        assert_eq!(declarations[0].desired.name(), "app@/");
        assert_eq!(
            declarations[0].desired.get(PermissionKind::Configure),
            Some("^app\\..*")
        );
        assert_eq!(declarations[0].ensure, Ensure::Present);

        assert_eq!(declarations[1].desired.user, "monitor");
        assert_eq!(declarations[1].desired.vhost, "staging");
        assert_eq!(declarations[1].desired.get(PermissionKind::Read), Some(".*"));
        assert_eq!(declarations[1].desired.get(PermissionKind::Write), None);

        assert_eq!(declarations[2].ensure, Ensure::Absent);
    }

    #[test]
    fn test_empty_config() {
        let config = WarrenConfig::parse("").unwrap();
        assert!(config.permissions.is_empty());
        assert!(config.rabbitmqctl.path.is_none());
        assert!(config.declarations().unwrap().is_empty());
    }

    #[test]
    fn test_missing_identity() {
        let config = WarrenConfig::parse("[[permissions]]\nuser = \"app\"\n").unwrap();
        assert_eq!(
            config.declarations().unwrap_err(),
            ConfigError::MissingIdentity { index: 0 }
        );
    }

    #[test]
    fn test_ambiguous_identity() {
        let config =
            WarrenConfig::parse("[[permissions]]\nname = \"a@/\"\nuser = \"a\"\n").unwrap();
        assert_eq!(
            config.declarations().unwrap_err(),
            ConfigError::AmbiguousIdentity { index: 0 }
        );
    }

    #[test]
    fn test_invalid_name() {
        let config = WarrenConfig::parse("[[permissions]]\nname = \"app\"\n").unwrap();
        assert!(matches!(
            config.declarations().unwrap_err(),
            ConfigError::InvalidName { index: 0, .. }
        ));
    }

    #[test]
    fn test_duplicate_declaration() {
        let content = r#"
[[permissions]]
name = "app@/"

[[permissions]]
user = "app"
vhost = "/"
"#;
        let config = WarrenConfig::parse(content).unwrap();
        assert_eq!(
            config.declarations().unwrap_err(),
            ConfigError::Duplicate {
                index: 1,
                name: "app@/".to_string()
            }
        );
    }

    #[test]
    fn test_invalid_ensure() {
        assert!(WarrenConfig::parse("[[permissions]]\nname = \"a@/\"\nensure = \"gone\"\n").is_err());
    }

    #[test]
    fn test_load_from_file() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("config.toml");
        std::fs::write(&path, SAMPLE).unwrap();

        let config = WarrenConfig::load(Some(&path)).unwrap();
        assert_eq!(config.permissions.len(), 3);
        assert_eq!(
            config.rabbitmqctl_path().unwrap(),
            Some(PathBuf::from("/usr/sbin/rabbitmqctl"))
        );
    }

    #[test]
    fn test_load_missing_explicit_file() {
        let tmp = tempfile::TempDir::new().unwrap();
        assert!(WarrenConfig::load(Some(&tmp.path().join("nope.toml"))).is_err());
    }

    #[test]
    fn test_expand_tilde() {
        let home = dirs::home_dir().unwrap();
        assert_eq!(expand_path("~/bin/rabbitmqctl").unwrap(), home.join("bin/rabbitmqctl"));
    }
}
