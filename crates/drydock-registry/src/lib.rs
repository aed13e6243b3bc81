//! Multi-registry container-manifest resolution and digest verification.
//!
//! Given a registry host, a repository path, and a reference (tag or digest),
//! this crate obtains a pull token, fetches the image manifest over the Docker
//! Registry HTTP API v2 / OCI Distribution Spec, and computes a content digest
//! that must match the registry-advertised digest. Docker Hub, Quay, GitLab,
//! GitHub Container Registry, and Amazon ECR Public are normalized behind one
//! provider table.
//!
//! # Quick start
//!
//! ```no_run
//! use drydock_registry::{RegistryResolver, ResolverConfig};
//!
//! # async fn example() -> drydock_registry::RegistryResult<()> {
//! let resolver = RegistryResolver::new(ResolverConfig::default())?;
//!
//! let resolved = resolver
//!     .resolve_and_verify("ghcr.io", "helm/tiller", "v2.17.0", None)
//!     .await?;
//! println!("digest: {}", resolved.digest);
//! # Ok(())
//! # }
//! ```
//!
//! # Design notes
//!
//! - The digest is always computed over the manifest bytes exactly as
//!   received; the `Docker-Content-Digest` header is cross-checked, never
//!   trusted.
//! - A manifest list is returned as-is; descending into a platform's
//!   sub-manifest is an explicit second call.
//! - No error is retried internally. [`RegistryError::is_retryable`] tells
//!   callers which failures are worth retrying with backoff.

pub mod digest;
pub mod error;
pub mod manifest;
pub mod media_type;
pub mod provider;
pub mod reference;
pub mod resolver;
pub mod token;
pub mod types;

pub use digest::{digest_of, Algorithm, Digest};
pub use error::{RegistryError, RegistryResult};
pub use manifest::{fetch_blob, fetch_manifest};
pub use provider::{AuthMode, ProviderDescriptor, ProviderDirectory};
pub use reference::{ImageRef, Reference};
pub use resolver::{RegistryResolver, Resolution};
pub use token::resolve_token;
pub use types::{
    ConfigBlob, ContentDescriptor, ImageIndex, ImageManifest, IndexEntry, ManifestResponse,
    Platform, ResolverConfig, Token,
};
