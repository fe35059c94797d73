//! Registry error kinds.

use std::fmt;

use keyward_core::{Accelerator, AcceleratorError};
use thiserror::Error;

/// How a refused update left the binding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rollback {
    /// The old accelerator was claimed again; the binding is active as before.
    Restored,
    /// The old accelerator could not be claimed again; the binding is kept on
    /// it but disabled.
    Disabled,
}

impl fmt::Display for Rollback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Restored => f.write_str("previous shortcut restored"),
            Self::Disabled => {
                f.write_str("previous shortcut could not be restored and is disabled")
            }
        }
    }
}

/// Errors returned by registry operations. None of them leave the registry
/// in an inconsistent state.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("Invalid accelerator `{accelerator}`: {source}")]
    InvalidAccelerator {
        accelerator: String,
        source: AcceleratorError,
    },

    #[error("Shortcut already registered")]
    DuplicateAccelerator {
        accelerator: Accelerator,
        /// Id of the binding holding the accelerator
        holder: String,
    },

    #[error("Shortcut {accelerator} is in use by another application or reserved by the system")]
    SystemConflict {
        accelerator: Accelerator,
        /// Set when a previous claim had to be given up and re-taken
        rollback: Option<Rollback>,
    },

    /// No binding under `id`; for unregister, no enabled one.
    #[error("Shortcut `{id}` not found")]
    NotFound { id: String },
}

impl RegistryError {
    /// True for the two kinds of accelerator conflict.
    pub fn is_conflict(&self) -> bool {
        matches!(
            self,
            Self::DuplicateAccelerator { .. } | Self::SystemConflict { .. }
        )
    }

    /// Who holds the accelerator: a binding id, or `"system"`.
    pub fn conflict_with(&self) -> Option<&str> {
        match self {
            Self::DuplicateAccelerator { holder, .. } => Some(holder),
            Self::SystemConflict { .. } => Some("system"),
            _ => None,
        }
    }
}

/// Result type for registry operations.
pub type Result<T> = std::result::Result<T, RegistryError>;

pub(crate) fn parse_accelerator(accelerator: &str) -> Result<Accelerator> {
    accelerator
        .parse()
        .map_err(|source| RegistryError::InvalidAccelerator {
            accelerator: accelerator.to_string(),
            source,
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duplicate_message() {
        let err = RegistryError::DuplicateAccelerator {
            accelerator: "Mod+Alt+E".parse().unwrap(),
            holder: "showHide".into(),
        };
        assert_eq!(err.to_string(), "Shortcut already registered");
        assert!(err.is_conflict());
        assert_eq!(err.conflict_with(), Some("showHide"));
    }

    #[test]
    fn test_invalid_is_not_conflict() {
        let err = parse_accelerator("Q").unwrap_err();
        assert!(!err.is_conflict());
        assert_eq!(err.conflict_with(), None);
        assert!(err.to_string().contains("at least one modifier"));
    }
}
