use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Result type alias using the library's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for the render-drawio library.
#[derive(Error, Debug, Clone)]
#[non_exhaustive]
pub enum Error {
    /// IO error with context about the file path.
    #[error("IO error accessing '{path}': {message}")]
    Io {
        /// Path where the error occurred
        path: PathBuf,
        /// Error message
        message: String,
    },

    /// Configuration validation error.
    #[error("Invalid configuration: {message}")]
    Config {
        /// Detailed error message
        message: String,
    },

    /// A format token is not part of the allowed set.
    #[error("{field} {format:?} is not valid: {valid}")]
    InvalidFormat {
        /// Configuration field holding the format
        field: String,
        /// Offending format token
        format: String,
        /// Rendering of the allowed set
        valid: String,
    },

    /// A configured path is malformed.
    #[error("{field} contains invalid path {path:?}: {reason}")]
    InvalidPath {
        /// Configuration field holding the path
        field: String,
        /// Offending path
        path: String,
        /// Why the path was rejected
        reason: String,
    },

    /// A configured path does not exist on disk.
    #[error("{field} item must exist: {path}")]
    MissingPath {
        /// Configuration field holding the path
        field: String,
        /// Absolute path that was checked
        path: PathBuf,
    },

    /// The same destination was produced with two different sources.
    #[error("Destination {dest:?} is declared for {explicit:?} but the scan found {scanned:?}")]
    DuplicateDestination {
        /// Destination path, root-relative
        dest: String,
        /// Source from the explicit file list
        explicit: String,
        /// Source found while scanning
        scanned: String,
    },

    /// An external command exited unsuccessfully or could not start.
    #[error("external command {command:?} exited with code {}, error: {message} and output: {output}", describe_exit_code(.exit_code))]
    Command {
        /// Full command line
        command: String,
        /// Exit code, when the process ran to completion
        exit_code: Option<i32>,
        /// Error message
        message: String,
        /// Combined stdout and stderr
        output: String,
    },

    /// An external command ran past its deadline and was killed.
    #[error("external command {command:?} timed out after {timeout:?}, output: {output}")]
    Timeout {
        /// Full command line
        command: String,
        /// Deadline that was exceeded
        timeout: Duration,
        /// Output captured before the process was killed
        output: String,
    },

    /// Rendering a single file failed.
    #[error("failed to render src={src:?} and dest={dest:?}: {message}")]
    Render {
        /// Absolute source path
        src: PathBuf,
        /// Absolute destination path
        dest: PathBuf,
        /// Underlying failure
        message: String,
    },

    /// An output path could not be expressed relative to the root directory.
    #[error("Output path '{path}' is not under root directory '{root}'")]
    Report {
        /// Path that was reported
        path: PathBuf,
        /// Root directory
        root: PathBuf,
    },
}

#[allow(clippy::ref_option)]
fn describe_exit_code(code: &Option<i32>) -> String {
    code.map_or_else(|| "'unknown'".to_string(), |c| c.to_string())
}

impl Error {
    /// Creates an IO error with path context.
    #[must_use]
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            message: source.to_string(),
        }
    }

    /// Creates a configuration error.
    #[must_use]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Creates an invalid format error.
    #[must_use]
    pub fn invalid_format(
        field: impl Into<String>,
        format: impl Into<String>,
        valid: impl std::fmt::Display,
    ) -> Self {
        Self::InvalidFormat {
            field: field.into(),
            format: format.into(),
            valid: valid.to_string(),
        }
    }

    /// Creates an invalid path error.
    #[must_use]
    pub fn invalid_path(
        field: impl Into<String>,
        path: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::InvalidPath {
            field: field.into(),
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Creates a missing path error.
    #[must_use]
    pub fn missing_path(field: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self::MissingPath {
            field: field.into(),
            path: path.into(),
        }
    }

    /// Wraps a renderer failure with the paths it was working on.
    #[must_use]
    pub fn render(src: impl Into<PathBuf>, dest: impl Into<PathBuf>, source: &Self) -> Self {
        Self::Render {
            src: src.into(),
            dest: dest.into(),
            message: source.to_string(),
        }
    }

    /// Returns true if this is an IO error.
    #[must_use]
    pub const fn is_io(&self) -> bool {
        matches!(self, Self::Io { .. })
    }

    /// Returns true if this error was raised while validating configuration.
    #[must_use]
    pub const fn is_config(&self) -> bool {
        matches!(
            self,
            Self::Config { .. }
                | Self::InvalidFormat { .. }
                | Self::InvalidPath { .. }
                | Self::MissingPath { .. }
                | Self::DuplicateDestination { .. }
        )
    }

    /// Returns true if this error came from running an external command.
    #[must_use]
    pub const fn is_command(&self) -> bool {
        matches!(self, Self::Command { .. } | Self::Timeout { .. })
    }

    /// Returns true if this is a render error.
    #[must_use]
    pub const fn is_render(&self) -> bool {
        matches!(self, Self::Render { .. })
    }
}
