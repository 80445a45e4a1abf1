//! Error types for catalog and override file I/O.
//!
//! Resolution itself never fails; these only surface from loading and saving.

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while loading or persisting overrides.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("read overrides {}: {}", .path.display(), .source)]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("write overrides {}: {}", .path.display(), .source)]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("parse overrides {}: {}", .path.display(), .source)]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("serialize overrides: {0}")]
    Serialize(#[from] serde_json::Error),

    /// Schema newer than this build understands.
    #[error("unsupported overrides schema version {found} (max {supported})")]
    UnsupportedSchema { found: u32, supported: u32 },
}

/// Errors raised while loading a catalog document.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("read catalog {}: {}", .path.display(), .source)]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("parse catalog {}: {}", .path.display(), .source)]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}
