use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Fatal failure while reading a product catalog.
///
/// Index building never retries; the caller decides whether to try another source.
#[derive(Debug, Error)]
pub enum CatalogLoadError {
    #[error("failed to read catalog {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to parse catalog {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to parse CSV catalog {}: {source}", .path.display())]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("catalog {} is not a JSON array, object, JSON Lines stream or CSV table", .path.display())]
    UnsupportedFormat { path: PathBuf },

    #[error("catalog {} contains no usable documents", .path.display())]
    Empty { path: PathBuf },
}

impl CatalogLoadError {
    pub fn path(&self) -> &PathBuf {
        match self {
            CatalogLoadError::Io { path, .. }
            | CatalogLoadError::Parse { path, .. }
            | CatalogLoadError::Csv { path, .. }
            | CatalogLoadError::UnsupportedFormat { path }
            | CatalogLoadError::Empty { path } => path,
        }
    }
}
