//! Error types for the registry engine.

/// Registry resolution errors.
///
/// Nothing here is retried internally; `is_retryable` tells the caller which
/// failures are safe to retry with backoff.
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    /// The registry host has no descriptor in the provider directory.
    #[error("unrecognized registry: {registry}")]
    UnrecognizedRegistry { registry: String },

    /// Token exchange failed, or the registry rejected the token.
    #[error("authentication failed for {registry}/{repository}: {message}")]
    Auth {
        registry: String,
        repository: String,
        message: String,
    },

    /// The reference does not exist in the repository.
    #[error("manifest not found: {repository}@{reference}")]
    ManifestNotFound {
        repository: String,
        reference: String,
    },

    /// Network failure or timeout; safe for the caller to retry.
    #[error("transient network error: {message}")]
    Transient { message: String },

    /// Computed digest disagrees with the expected or advertised digest.
    ///
    /// Always fatal: either the transfer was corrupted or the registry has an
    /// integrity problem.
    #[error("digest mismatch for {repository}@{reference}: expected {expected}, computed {computed}")]
    DigestMismatch {
        repository: String,
        reference: String,
        expected: String,
        computed: String,
    },

    /// Image reference string could not be parsed.
    #[error("invalid image reference: {reference} - {reason}")]
    InvalidReference { reference: String, reason: String },

    /// Registry returned a well-formed HTTP response we cannot interpret.
    #[error("invalid response: {message}")]
    InvalidResponse { message: String },

    /// Media type has no defined digest computation (schema 1, unknown types).
    #[error("unsupported manifest media type: {media_type}")]
    UnsupportedMediaType { media_type: String },
}

impl RegistryError {
    /// Whether the caller may retry the operation with backoff.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Transient { .. })
    }
}

impl From<reqwest::Error> for RegistryError {
    fn from(err: reqwest::Error) -> Self {
        Self::Transient {
            message: err.to_string(),
        }
    }
}

/// Result type for registry operations.
pub type RegistryResult<T> = Result<T, RegistryError>;
