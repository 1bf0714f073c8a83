//! The one error family shared by every layer of the SONATA front-end.
//!
//! Per the component design, `sonata-storage`, `sonata-model`, and
//! `sonata-cli` all propagate the same [`SonataError`] rather than wrapping
//! each other's errors in nested newtypes. A query that fails stops the
//! recipe call it is part of; nothing here is retried.

use std::path::PathBuf;
use thiserror::Error;

/// Result type used across the SONATA crates.
pub type Result<T> = std::result::Result<T, SonataError>;

/// The index or range that a failed dataset access was attempted at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IndexKind {
    /// A single out-of-range or unreadable element index.
    Single(usize),
    /// An out-of-range or unreadable half-open range `[i, j)`.
    Range(usize, usize),
}

impl std::fmt::Display for IndexKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IndexKind::Single(i) => write!(f, "{i}"),
            IndexKind::Range(i, j) => write!(f, "[{i}, {j})"),
        }
    }
}

/// Errors raised by the network description layer.
#[derive(Error, Debug)]
pub enum SonataError {
    /// A dataset read was out of range, missing, or of the wrong type.
    #[error("dataset access failed for '{name}' at {index}")]
    DatasetAccess {
        /// Dataset name (not necessarily a filesystem path).
        name: String,
        /// Offending index or range.
        index: IndexKind,
    },

    /// A configuration, morphology, parameter, or table file could not be
    /// opened.
    #[error("could not open {path}: {source}")]
    FileOpen {
        /// Path that failed to open.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// A required column, dataset, or document shape is missing or
    /// malformed. Also covers a non-virtual node missing morphology, an
    /// edge population missing `indicies`/`indices`, a forbidden explicit
    /// id column, a multi-entry point-mechanism document, or a point
    /// mechanism whose name disagrees with `model_template`.
    #[error("schema violation: {message}")]
    SchemaViolation {
        /// Description of the violation.
        message: String,
    },

    /// A source/target lookup during connection assembly failed against
    /// the map built in `build_local_maps`. This indicates the maps were
    /// built incorrectly — a programmer error, not bad input.
    #[error("map consistency error: {message}")]
    MapConsistency {
        /// Description of the inconsistency.
        message: String,
    },
}

impl SonataError {
    /// Build a [`SonataError::DatasetAccess`] for a single-index read.
    pub fn dataset_index(name: impl Into<String>, index: usize) -> Self {
        Self::DatasetAccess {
            name: name.into(),
            index: IndexKind::Single(index),
        }
    }

    /// Build a [`SonataError::DatasetAccess`] for a range read.
    pub fn dataset_range(name: impl Into<String>, start: usize, end: usize) -> Self {
        Self::DatasetAccess {
            name: name.into(),
            index: IndexKind::Range(start, end),
        }
    }

    /// Build a [`SonataError::FileOpen`] from a path and the I/O error that
    /// occurred while opening it.
    pub fn file_open(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::FileOpen {
            path: path.into(),
            source,
        }
    }

    /// Build a [`SonataError::SchemaViolation`].
    pub fn schema(message: impl Into<String>) -> Self {
        Self::SchemaViolation {
            message: message.into(),
        }
    }

    /// Build a [`SonataError::MapConsistency`].
    pub fn map_consistency(message: impl Into<String>) -> Self {
        Self::MapConsistency {
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dataset_access_display() {
        let err = SonataError::dataset_index("node_type_id", 42);
        assert!(format!("{err}").contains("node_type_id"));
        assert!(format!("{err}").contains('42'));
    }

    #[test]
    fn range_display() {
        let err = SonataError::dataset_range("range_to_edge_id", 3, 7);
        let msg = format!("{err}");
        assert!(msg.contains("[3, 7)"));
    }

    #[test]
    fn schema_violation_helper() {
        let err = SonataError::schema("morphology missing for non-virtual node");
        assert!(matches!(err, SonataError::SchemaViolation { .. }));
    }
}
