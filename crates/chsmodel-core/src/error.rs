//! Unified error handling for the ChsModel exporter
//!
//! This module provides a single error type shared by the export pipeline,
//! the container reader and the in-memory scene.

use std::path::PathBuf;
use thiserror::Error;

/// Unified error type for all ChsModel operations
#[derive(Error, Debug)]
pub enum Error {
    // ==================== I/O Errors ====================

    /// Standard I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Output destination could not be opened or written
    #[error("Output sink unavailable{}: {source}", sink_label(.path))]
    SinkUnavailable {
        /// `None` for caller-supplied writers
        path: Option<PathBuf>,
        #[source]
        source: std::io::Error,
    },

    /// File not found
    #[error("File not found: {0}")]
    FileNotFound(PathBuf),

    // ==================== Export Errors ====================

    /// No eligible meshes were collected
    #[error("Nothing to export: no visible meshes found")]
    EmptyExportSet,

    /// A mesh references a vertex, normal, uv or color id that does not exist
    #[error("Malformed mesh topology in {mesh}: {message}")]
    MalformedMeshTopology {
        mesh: String,
        message: String,
    },

    /// Neither a shader connection nor a readable channel value exists
    #[error("Unresolvable material channel '{channel}' on {mesh}")]
    UnresolvableMaterial {
        mesh: String,
        channel: String,
    },

    /// Animation curve does not map to a known channel
    #[error("Unknown animation channel: {name}")]
    UnknownAnimationChannel {
        name: String,
    },

    // ==================== Container Errors ====================

    /// Invalid magic bytes at file start
    #[error("Invalid magic bytes: expected {expected:?}, found {found:?}")]
    InvalidMagic {
        expected: Vec<u8>,
        found: Vec<u8>,
    },

    /// Unexpected end of file
    #[error("Unexpected end of file at offset {offset}")]
    UnexpectedEof {
        offset: u64,
    },

    /// Invalid data structure
    #[error("Invalid data: {message}")]
    InvalidData {
        message: String,
    },

    /// Metadata document could not be written or parsed
    #[error("Metadata error: {message}")]
    Metadata {
        message: String,
    },

    // ==================== Configuration Errors ====================

    /// Invalid configuration
    #[error("Invalid configuration: {message}")]
    InvalidConfig {
        message: String,
    },

    // ==================== General Errors ====================

    /// Internal error (should not happen)
    #[error("Internal error: {message}")]
    Internal {
        message: String,
    },

    /// Custom error with context
    #[error("{context}: {source}")]
    WithContext {
        context: String,
        #[source]
        source: Box<Error>,
    },
}

fn sink_label(path: &Option<PathBuf>) -> String {
    path.as_ref()
        .map(|p| format!(" ({})", p.display()))
        .unwrap_or_default()
}

/// Result type using the unified Error
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Create an error with additional context
    pub fn with_context(self, context: impl Into<String>) -> Self {
        Error::WithContext {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// Create an internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Error::Internal {
            message: message.into(),
        }
    }

    /// Create an invalid data error
    pub fn invalid_data(message: impl Into<String>) -> Self {
        Error::InvalidData {
            message: message.into(),
        }
    }

    /// Create a malformed topology error for a mesh
    pub fn malformed(mesh: impl Into<String>, message: impl Into<String>) -> Self {
        Error::MalformedMeshTopology {
            mesh: mesh.into(),
            message: message.into(),
        }
    }

    /// Create a sink error for a writer that has no path
    pub fn sink(source: std::io::Error) -> Self {
        Error::SinkUnavailable { path: None, source }
    }

    /// Create a metadata error
    pub fn metadata(message: impl ToString) -> Self {
        Error::Metadata {
            message: message.to_string(),
        }
    }

    /// Create an invalid configuration error
    pub fn invalid_config(message: impl ToString) -> Self {
        Error::InvalidConfig {
            message: message.to_string(),
        }
    }

    /// Strip any context wrappers and return the underlying error
    pub fn root(&self) -> &Error {
        let mut current = self;
        while let Error::WithContext { source, .. } = current {
            current = source;
        }
        current
    }

    /// Check if this condition is handled inside the pipeline without failing anything
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self.root(),
            Error::UnresolvableMaterial { .. } | Error::UnknownAnimationChannel { .. }
        )
    }

    /// Check if this condition only excludes a single mesh from the document
    pub fn is_mesh_local(&self) -> bool {
        matches!(self.root(), Error::MalformedMeshTopology { .. })
    }

    /// Check if this is a container parse/format error
    pub fn is_parse_error(&self) -> bool {
        matches!(
            self.root(),
            Error::InvalidMagic { .. }
                | Error::UnexpectedEof { .. }
                | Error::InvalidData { .. }
                | Error::Metadata { .. }
        )
    }
}

/// Extension trait for adding context to Results
pub trait ResultExt<T> {
    /// Add context to an error
    fn context(self, context: impl Into<String>) -> Result<T>;

    /// Add context with a closure (lazy evaluation)
    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String;
}

impl<T> ResultExt<T> for Result<T> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.with_context(context))
    }

    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| e.with_context(f()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_with_context() {
        let err = Error::EmptyExportSet;
        let contextualized = err.with_context("while exporting scene");

        assert!(contextualized.to_string().contains("while exporting scene"));
        assert!(matches!(contextualized.root(), Error::EmptyExportSet));
    }

    #[test]
    fn test_recoverable_kinds() {
        assert!(Error::UnknownAnimationChannel { name: "foo".into() }.is_recoverable());
        assert!(Error::UnresolvableMaterial {
            mesh: "m".into(),
            channel: "color".into(),
        }
        .is_recoverable());
        assert!(!Error::EmptyExportSet.is_recoverable());
    }

    #[test]
    fn test_mesh_local_through_context() {
        let err = Error::malformed("pCube1", "vertex 9 out of range").with_context("encoding");
        assert!(err.is_mesh_local());
        assert!(!err.is_parse_error());
    }

    #[test]
    fn test_sink_error_display() {
        let denied = || std::io::Error::new(std::io::ErrorKind::PermissionDenied, "read-only");

        let with_path = Error::SinkUnavailable {
            path: Some(PathBuf::from("/out/ship.chsmodel")),
            source: denied(),
        };
        assert_eq!(
            with_path.to_string(),
            "Output sink unavailable (/out/ship.chsmodel): read-only"
        );
        assert_eq!(Error::sink(denied()).to_string(), "Output sink unavailable: read-only");
    }

    #[test]
    fn test_is_parse_error() {
        assert!(Error::InvalidMagic {
            expected: b"chmo".to_vec(),
            found: vec![0, 0, 0, 0],
        }
        .is_parse_error());

        assert!(!Error::FileNotFound(PathBuf::from("/test")).is_parse_error());
    }

    #[test]
    fn test_result_context() {
        let result: Result<()> = Err(Error::FileNotFound(PathBuf::from("/test")));
        let with_context = result.context("loading scene");

        assert!(with_context.is_err());
        assert!(with_context.unwrap_err().to_string().contains("loading scene"));
    }
}
