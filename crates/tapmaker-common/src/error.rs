//! Unified error type for the tap-maker workspace.
//!
//! Variants follow the failure classes an operator can hit: bad input,
//! an unresolvable namespace, a failed namespace switch, and a failed
//! device creation. None of them is retried.

use std::path::PathBuf;

use thiserror::Error;

/// Step of the TAP creation sequence that failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TapStep {
    /// Opening the TUN/TAP clone device.
    Open,
    /// Binding the descriptor to a named TAP interface (`TUNSETIFF`).
    Attach,
    /// Setting the owning user (`TUNSETOWNER`).
    Owner,
    /// Setting the owning group (`TUNSETGROUP`).
    Group,
    /// Marking the interface persistent (`TUNSETPERSIST`).
    Persist,
}

impl std::fmt::Display for TapStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Open => write!(f, "open"),
            Self::Attach => write!(f, "attach"),
            Self::Owner => write!(f, "owner"),
            Self::Group => write!(f, "group"),
            Self::Persist => write!(f, "persist"),
        }
    }
}

/// Top-level error type shared across the workspace.
#[derive(Debug, Error)]
pub enum TapMakerError {
    /// A value supplied by the operator could not be accepted.
    #[error("invalid {field} {value:?}: {reason}")]
    InvalidInput {
        /// Name of the offending input.
        field: &'static str,
        /// Raw text that was rejected.
        value: String,
        /// Why it was rejected.
        reason: String,
    },

    /// The namespace file of the target process could not be opened.
    #[error("could not load netns {path}: {source}")]
    NamespaceNotFound {
        /// Namespace file that was opened.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// The opened file is not a network namespace reference.
    #[error("{path} is not a network namespace: {reason}")]
    InvalidNamespace {
        /// Namespace file that was opened.
        path: PathBuf,
        /// What the check found instead.
        reason: String,
    },

    /// Switching the calling thread into a namespace failed.
    #[error("could not enter netns {path}: {source}")]
    NamespaceSwitch {
        /// Namespace file that was being entered.
        path: PathBuf,
        /// Underlying OS error.
        source: std::io::Error,
    },

    /// Switching the calling thread back to its original namespace failed.
    #[error("could not restore original netns: {source}")]
    NamespaceRestore {
        /// Underlying OS error.
        source: std::io::Error,
    },

    /// An interface with the requested name already exists.
    #[error("network interface {name} already exists")]
    DeviceExists {
        /// Requested interface name.
        name: String,
    },

    /// The TAP creation sequence failed.
    #[error("error creating tap device {name} ({step}): {source}")]
    DeviceCreation {
        /// Requested interface name.
        name: String,
        /// Request that failed.
        step: TapStep,
        /// Underlying OS error.
        source: std::io::Error,
    },

    /// An I/O operation failed.
    #[error("I/O error at {path}: {source}")]
    Io {
        /// Path where the I/O error occurred.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// The operation is not available on this platform.
    #[error("unsupported: {message}")]
    Unsupported {
        /// Description of the missing capability.
        message: String,
    },
}

impl TapMakerError {
    /// Builds an [`TapMakerError::InvalidInput`] for a rejected value.
    pub fn invalid_input(
        field: &'static str,
        value: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::InvalidInput {
            field,
            value: value.into(),
            reason: reason.into(),
        }
    }

    /// Returns `true` for errors caused by operator input rather than by
    /// the system.
    #[must_use]
    pub const fn is_user_error(&self) -> bool {
        matches!(self, Self::InvalidInput { .. })
    }
}

/// Convenience alias used throughout the workspace.
pub type Result<T> = std::result::Result<T, TapMakerError>;
