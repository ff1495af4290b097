//! Error types for rabbitmqctl operations.
//!
//! Errors are categorized so the CLI can print useful advice. Nothing in
//! this crate retries: every error is terminal for the current step.

use thiserror::Error;

/// Categories of rabbitmqctl errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// The broker node is down or unreachable
    NodeDown,
    /// The user does not exist
    NoSuchUser,
    /// The vhost does not exist
    NoSuchVhost,
    /// Permission denied (erlang cookie, file access)
    Permission,
    /// Listing output could not be parsed
    Parse,
    /// rabbitmqctl not found or not configured
    NotFound,
    /// Other/unknown errors
    Other,
}

impl ErrorCategory {
    /// Get a user-friendly description of this error category.
    pub fn description(&self) -> &'static str {
        match self {
            Self::NodeDown => "RabbitMQ node unreachable",
            Self::NoSuchUser => "User does not exist",
            Self::NoSuchVhost => "Virtual host does not exist",
            Self::Permission => "Permission denied",
            Self::Parse => "Unexpected rabbitmqctl output",
            Self::NotFound => "rabbitmqctl not installed",
            Self::Other => "Unexpected error",
        }
    }

    /// Get actionable advice for resolving this error category.
    pub fn advice(&self) -> &'static str {
        match self {
            Self::NodeDown => "Check that the broker is running and the node name is correct",
            Self::NoSuchUser => "Create the user before granting permissions",
            Self::NoSuchVhost => "Create the virtual host before granting permissions",
            Self::Permission => "Run as a user that can read the Erlang cookie",
            Self::Parse => "Check the rabbitmqctl version and its list output format",
            Self::NotFound => "Install RabbitMQ or pass --rabbitmqctl <path>",
            Self::Other => "Check the error details for more information",
        }
    }
}

/// Errors that can occur while listing or changing permissions.
#[derive(Debug, Error)]
pub enum Error {
    /// A listing line did not have exactly four fields
    #[error("cannot parse line from list_user_permissions: {line}")]
    Parse {
        /// The offending line, verbatim
        line: String,
    },

    /// A resource name could not be split into user and vhost
    #[error("invalid permission name '{name}': expected user@vhost")]
    InvalidName {
        /// The name as given
        name: String,
    },

    /// rabbitmqctl exited unsuccessfully
    #[error("{command} failed: {stderr}")]
    CommandFailed {
        /// Subcommand that was run (e.g. "set_permissions")
        command: String,
        /// Standard error output from the failed command
        stderr: String,
    },

    /// rabbitmqctl is not installed or not found in PATH
    #[error("rabbitmqctl not found. Install RabbitMQ or pass an explicit path")]
    RabbitmqctlNotFound,
}

impl Error {
    /// Get the error category.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Error::Parse { .. } => ErrorCategory::Parse,
            Error::RabbitmqctlNotFound => ErrorCategory::NotFound,
            Error::CommandFailed { stderr, .. } => classify_stderr(stderr),
            Error::InvalidName { .. } => ErrorCategory::Other,
        }
    }

    /// Create an error from rabbitmqctl output.
    pub fn from_rabbitmqctl_output(command: &str, stderr: &str) -> Self {
        Error::CommandFailed {
            command: command.to_string(),
            stderr: stderr.trim().to_string(),
        }
    }
}

fn classify_stderr(stderr: &str) -> ErrorCategory {
    let stderr_lower = stderr.to_lowercase();

    if stderr_lower.contains("nodedown")
        || stderr_lower.contains("unable to connect to node")
        || stderr_lower.contains("unable to perform an operation on node")
        || stderr_lower.contains("econnrefused")
    {
        return ErrorCategory::NodeDown;
    }

    if stderr_lower.contains("no_such_user") || stderr_lower.contains("user does not exist") {
        return ErrorCategory::NoSuchUser;
    }

    if stderr_lower.contains("no_such_vhost")
        || (stderr_lower.contains("virtual host") && stderr_lower.contains("does not exist"))
    {
        return ErrorCategory::NoSuchVhost;
    }

    if stderr_lower.contains("permission denied")
        || stderr_lower.contains("eacces")
        || stderr_lower.contains("erlang.cookie")
    {
        return ErrorCategory::Permission;
    }

    ErrorCategory::Other
}

/// Result type for rabbitmqctl operations.
pub type Result<T> = std::result::Result<T, Error>;
