//! Copy specification models and top-level error types.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

////////////////////////////////////////////////////////////////////////////////
// #region EnumsInit

/// Answer to a file-name collision, and the sticky batch state built from it.
///
/// `Unset` is only ever a state value: a decision provider must answer with
/// one of the four concrete variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EnumConflictDecision {
    /// No sticky decision recorded yet.
    #[default]
    Unset,
    /// Replace this destination file only.
    OverwriteOnce,
    /// Keep this destination file only.
    SkipOnce,
    /// Replace this and every later colliding file of the batch.
    OverwriteAll,
    /// Keep this and every later colliding file of the batch.
    SkipAll,
}

impl EnumConflictDecision {
    /// Options offered to a decision provider.
    pub fn offered(if_allow_all: bool) -> &'static [EnumConflictDecision] {
        if if_allow_all {
            &[
                Self::OverwriteOnce,
                Self::SkipOnce,
                Self::OverwriteAll,
                Self::SkipAll,
            ]
        } else {
            &[Self::OverwriteOnce, Self::SkipOnce]
        }
    }

    /// `true` for the "for all" variants.
    pub fn is_sticky(self) -> bool {
        matches!(self, Self::OverwriteAll | Self::SkipAll)
    }

    /// `true` when the destination file gets replaced.
    pub fn is_overwrite(self) -> bool {
        matches!(self, Self::OverwriteOnce | Self::OverwriteAll)
    }

    /// Same answer restricted to the current collision.
    pub fn to_once(self) -> Self {
        match self {
            Self::OverwriteAll => Self::OverwriteOnce,
            Self::SkipAll => Self::SkipOnce,
            other => other,
        }
    }

    /// Button-style label.
    pub fn label(self) -> &'static str {
        match self {
            Self::Unset => "",
            Self::OverwriteOnce => "Overwrite",
            Self::SkipOnce => "Skip",
            Self::OverwriteAll => "Overwrite for all",
            Self::SkipAll => "Skip for all",
        }
    }
}

/// Content representation of a file node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EnumFileKind {
    /// Plain text, may be opened in an editor after copying.
    #[default]
    Text,
    /// Opaque bytes. Copyable, never opened in an editor.
    Binary,
    /// Compiled/read-only representation. Not copyable.
    Compiled,
}

impl EnumFileKind {
    pub fn is_copyable(self) -> bool {
        self != Self::Compiled
    }
}

/// Pattern matching mode for file classification lists.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnumCopyPatternMode {
    /// Shell-like wildcards (`*`, `?`, character classes).
    Glob,
    /// Regular expression pattern.
    Regex,
    /// Substring match.
    Literal,
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region StructsAndErrors

/// Input options for [`crate::StoreDisk`].
#[derive(Debug, Clone)]
pub struct SpecStoreOptions {
    /// Basename patterns classifying files as [`EnumFileKind::Compiled`].
    pub patterns_compiled: Option<Vec<String>>,
    /// Basename patterns classifying files as [`EnumFileKind::Binary`].
    pub patterns_binary: Option<Vec<String>>,
    /// Pattern interpretation mode.
    pub rule_pattern: EnumCopyPatternMode,
    /// Classify files containing a NUL byte in their head as binary.
    pub if_sniff_binary: bool,
}

impl Default for SpecStoreOptions {
    fn default() -> Self {
        Self {
            patterns_compiled: Some(
                ["*.class", "*.pyc", "*.o", "*.obj"]
                    .iter()
                    .map(|v| v.to_string())
                    .collect(),
            ),
            patterns_binary: None,
            rule_pattern: EnumCopyPatternMode::Glob,
            if_sniff_binary: true,
        }
    }
}

/// "Batch failed" errors. Items copied before the failure stay copied.
#[derive(Debug, Error)]
pub enum CopyBatchError {
    /// Malformed call; nothing was written.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
    /// A selected directory is an ancestor of the target directory.
    #[error(
        "Cannot copy directory {} into its own subdirectory {}",
        .directory.display(),
        .destination.display()
    )]
    SelfContainment {
        /// Normalized source directory.
        directory: PathBuf,
        /// Normalized destination directory.
        destination: PathBuf,
    },
    /// Storage layer failed while duplicating content or creating a directory.
    #[error("Failed to copy {}: {source}", .path.display())]
    IoFailure {
        /// Path the failed operation was addressing.
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    /// Decision provider aborted the batch.
    #[error("Copy cancelled: {0}")]
    Cancelled(String),
    /// Invalid classification pattern.
    #[error("Invalid pattern: {0}")]
    InvalidPattern(String),
}

impl CopyBatchError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::IoFailure {
            path: path.into(),
            source,
        }
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::{CopyBatchError, EnumConflictDecision};

    #[test]
    fn offered_options_depend_on_allow_all() {
        assert_eq!(EnumConflictDecision::offered(false).len(), 2);
        assert_eq!(EnumConflictDecision::offered(true).len(), 4);
        assert!(
            !EnumConflictDecision::offered(false)
                .iter()
                .any(|d| d.is_sticky())
        );
    }

    #[test]
    fn sticky_variants_reduce_to_once() {
        assert_eq!(
            EnumConflictDecision::OverwriteAll.to_once(),
            EnumConflictDecision::OverwriteOnce
        );
        assert_eq!(
            EnumConflictDecision::SkipAll.to_once(),
            EnumConflictDecision::SkipOnce
        );
        assert!(EnumConflictDecision::OverwriteAll.is_overwrite());
        assert!(!EnumConflictDecision::SkipAll.is_overwrite());
        assert!(!EnumConflictDecision::Unset.is_sticky());
    }

    #[test]
    fn error_display_names_paths() {
        let err = CopyBatchError::SelfContainment {
            directory: PathBuf::from("/p/a"),
            destination: PathBuf::from("/p/a/b"),
        };
        assert_eq!(
            err.to_string(),
            "Cannot copy directory /p/a into its own subdirectory /p/a/b"
        );

        let err = CopyBatchError::io(
            "/p/x.txt",
            std::io::Error::other("disk full"),
        );
        assert_eq!(err.to_string(), "Failed to copy /p/x.txt: disk full");
    }
}
