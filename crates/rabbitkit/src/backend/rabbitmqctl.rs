//! Real backend using `rabbitmqctl` commands.

use crate::backend::Backend;
use crate::error::{Error, Result};
use crate::types::Invocation;
use crate::version::{self, Version};
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use std::sync::OnceLock;

/// Backend that executes real `rabbitmqctl` commands.
#[derive(Debug)]
pub struct RabbitmqctlBackend {
    /// Path to the rabbitmqctl executable
    path: PathBuf,
    /// Broker version, detected on first list call
    version: OnceLock<Option<Version>>,
}

impl RabbitmqctlBackend {
    /// Create a backend using the rabbitmqctl found on this machine.
    ///
    /// Returns an error if rabbitmqctl is not installed.
    pub fn new() -> Result<Self> {
        Ok(Self::with_path(find_rabbitmqctl()?))
    }

    /// Create a backend for an explicit rabbitmqctl path.
    pub fn with_path(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            version: OnceLock::new(),
        }
    }

    /// Path of the executable this backend runs.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Broker version, or `None` if it could not be detected.
    pub fn version(&self) -> Option<&Version> {
        self.version
            .get_or_init(|| {
                let detected = self
                    .run_checked("status", &["-q", "status"])
                    .ok()
                    .and_then(|status| version::parse_status_version(&status));
                match &detected {
                    Some(v) => log::debug!("Detected RabbitMQ {v}"),
                    None => log::warn!(
                        "Could not detect RabbitMQ version; list output may include headers"
                    ),
                }
                detected
            })
            .as_ref()
    }

    fn run_raw(&self, args: &[&str]) -> Result<Output> {
        log::debug!("Running {} {}", self.path.display(), args.join(" "));
        Command::new(&self.path)
            .args(args)
            .output()
            .map_err(|e| Error::CommandFailed {
                command: args.first().copied().unwrap_or("rabbitmqctl").to_string(),
                stderr: format!("failed to execute {}: {e}", self.path.display()),
            })
    }

    fn run_checked(&self, command: &str, args: &[&str]) -> Result<String> {
        let output = self.run_raw(args)?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(Error::from_rabbitmqctl_output(command, &stderr));
        }

        Ok(String::from_utf8_lossy(&output.stdout).to_string())
    }
}

impl Backend for RabbitmqctlBackend {
    fn is_available(&self) -> bool {
        self.run_raw(&["-q", "status"])
            .map(|o| o.status.success())
            .unwrap_or(false)
    }

    fn list(&self, entity: &str, args: &[&str]) -> Result<String> {
        let command = format!("list_{entity}");
        let mut full: Vec<&str> = vec![command.as_str()];
        full.extend_from_slice(args);
        full.push("-q");
        if self.version().is_some_and(version::supports_no_table_headers) {
            full.push("--no-table-headers");
        }

        let stdout = self.run_checked(&command, &full)?;
        Ok(strip_banners(&stdout))
    }

    fn run(&self, invocation: &Invocation) -> Result<()> {
        log::info!("rabbitmqctl {invocation}");
        let mut args: Vec<&str> = vec![invocation.subcommand.as_str()];
        args.extend(invocation.args.iter().map(String::as_str));

        self.run_checked(&invocation.subcommand, &args)?;
        Ok(())
    }
}

/// Drop the banner lines that rabbitmqctl prints even with `-q` on some
/// releases ("Listing permissions for user ...", "...done.").
fn strip_banners(output: &str) -> String {
    output
        .lines()
        .filter(|line| !line.starts_with("Listing ") && line.trim() != "...done.")
        .collect::<Vec<_>>()
        .join("\n")
}

/// Find the rabbitmqctl executable path.
fn find_rabbitmqctl() -> Result<PathBuf> {
    // Check common locations
    let paths = [
        "/usr/sbin/rabbitmqctl",           // Debian/RPM packages
        "/usr/local/sbin/rabbitmqctl",     // Generic-unix / Homebrew Intel
        "/opt/homebrew/sbin/rabbitmqctl",  // Homebrew Apple Silicon
        "/usr/lib/rabbitmq/bin/rabbitmqctl",
    ];

    for path in &paths {
        if Path::new(path).exists() {
            return Ok(PathBuf::from(path));
        }
    }

    // Try which
    let output = Command::new("which")
        .arg("rabbitmqctl")
        .output()
        .map_err(|_| Error::RabbitmqctlNotFound)?;

    if output.status.success() {
        let path = String::from_utf8_lossy(&output.stdout).trim().to_string();
        if !path.is_empty() {
            return Ok(PathBuf::from(path));
        }
    }

    Err(Error::RabbitmqctlNotFound)
}
