use miette::Diagnostic;
use thiserror::Error;

/// Unified error type for all resolver operations.
#[derive(Debug, Error, Diagnostic)]
pub enum PfrError {
    /// I/O operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The Puppetfile could not be read or interpreted.
    #[error("Puppetfile error: {message}")]
    #[diagnostic(help("Check your Puppetfile for syntax errors"))]
    Manifest { message: String },

    /// A module title is neither `name` nor `owner/name` / `owner-name`.
    #[error("Invalid module title '{title}'")]
    #[diagnostic(help("Module titles look like 'stdlib', 'puppetlabs/stdlib' or 'puppetlabs-stdlib'"))]
    TitleFormat { title: String },

    /// Module metadata could not be fetched from its origin.
    #[error("Metadata fetch failed: {message}")]
    MetadataFetch { message: String },

    /// Network request failed.
    #[error("Network error: {message}")]
    Network { message: String },

    /// The persistent cache tier could not be initialised.
    #[error("Cache unavailable: {message}")]
    CacheUnavailable { message: String },

    /// A persisted cache entry failed to deserialize.
    #[error("Corrupt cache entry '{key}': {message}")]
    #[diagnostic(help("Delete the cache directory to force a re-fetch"))]
    CacheCorruption { key: String, message: String },

    /// Configuration file could not be read or parsed.
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// Catch-all for miscellaneous errors.
    #[error("{message}")]
    Generic { message: String },
}

impl PfrError {
    /// Shorthand for a [`PfrError::MetadataFetch`] error.
    pub fn fetch(message: impl Into<String>) -> Self {
        Self::MetadataFetch {
            message: message.into(),
        }
    }
}

/// Convenience alias for `miette::Result<T>`.
pub type PfrResult<T> = miette::Result<T>;
