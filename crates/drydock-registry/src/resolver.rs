//! Resolution engine: the `token → manifest → digest → verify` pipeline.
//!
//! The only component the rest of the system calls. Safe to share across
//! tasks: the directory is read-only after construction and everything else
//! is call-local.

use std::str::FromStr;
use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use tracing::debug;

use crate::digest::{digest_of, Digest};
use crate::error::{RegistryError, RegistryResult};
use crate::manifest::{fetch_blob, fetch_manifest};
use crate::provider::ProviderDirectory;
use crate::reference::{ImageRef, Reference};
use crate::token::resolve_token;
use crate::types::{ConfigBlob, ImageManifest, ManifestResponse, Platform, ResolverConfig};

/// A verified manifest and its computed content digest.
#[derive(Debug, Clone)]
pub struct Resolution {
    pub manifest: ManifestResponse,
    pub digest: Digest,
}

/// Multi-registry manifest resolver.
#[derive(Debug, Clone)]
pub struct RegistryResolver {
    client: reqwest::Client,
    directory: ProviderDirectory,
}

impl RegistryResolver {
    /// Resolver over the built-in provider table.
    pub fn new(config: ResolverConfig) -> RegistryResult<Self> {
        Self::with_directory(config, ProviderDirectory::builtin())
    }

    /// Resolver over a custom provider table (tests, private registries).
    pub fn with_directory(
        config: ResolverConfig,
        directory: ProviderDirectory,
    ) -> RegistryResult<Self> {
        let mut default_headers = HeaderMap::new();
        let agent = HeaderValue::from_str(&config.user_agent).map_err(|e| {
            RegistryError::InvalidResponse {
                message: format!("invalid user agent {:?}: {e}", config.user_agent),
            }
        })?;
        default_headers.insert(USER_AGENT, agent);

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .default_headers(default_headers)
            .build()
            .map_err(|e| RegistryError::Transient {
                message: format!("failed to create HTTP client: {e}"),
            })?;

        Ok(Self { client, directory })
    }

    pub fn from_env() -> RegistryResult<Self> {
        Self::new(ResolverConfig::from_env())
    }

    pub fn directory(&self) -> &ProviderDirectory {
        &self.directory
    }

    /// Full pipeline: directory lookup, token resolve, manifest fetch, digest
    /// compute, equality check.
    ///
    /// The computed digest is checked against the registry-advertised
    /// `Docker-Content-Digest` header (when present) and against
    /// `expected` (when supplied); either disagreement is a
    /// [`RegistryError::DigestMismatch`]. A manifest list is returned as-is
    /// with the list digest; use [`resolve_platform`](Self::resolve_platform)
    /// to descend.
    pub async fn resolve_and_verify(
        &self,
        registry: &str,
        repository: &str,
        reference: &str,
        expected: Option<&Digest>,
    ) -> RegistryResult<Resolution> {
        let descriptor = self.directory.lookup(registry)?;
        let token = resolve_token(&self.client, descriptor, repository).await?;
        let manifest = fetch_manifest(&self.client, &token, descriptor, repository, reference).await?;

        let digest = digest_of(&manifest.bytes, &manifest.content_type)?;

        if let Some(advertised) = &manifest.advertised_digest {
            if *advertised != digest {
                return Err(mismatch(repository, reference, advertised, &digest));
            }
        }
        if let Some(expected) = expected {
            if *expected != digest {
                return Err(mismatch(repository, reference, expected, &digest));
            }
        }

        debug!(
            registry,
            repository,
            reference,
            digest = %digest,
            media_type = %manifest.content_type,
            "manifest resolved and verified"
        );

        Ok(Resolution { manifest, digest })
    }

    /// Run the full pipeline under a caller-supplied deadline.
    ///
    /// The deadline bounds the token and manifest calls together; exceeding
    /// it aborts the in-flight call and surfaces a transient error.
    pub async fn resolve_within(
        &self,
        deadline: Duration,
        registry: &str,
        repository: &str,
        reference: &str,
        expected: Option<&Digest>,
    ) -> RegistryResult<Resolution> {
        tokio::time::timeout(
            deadline,
            self.resolve_and_verify(registry, repository, reference, expected),
        )
        .await
        .map_err(|_| RegistryError::Transient {
            message: format!(
                "deadline of {deadline:?} exceeded resolving {repository}@{reference}"
            ),
        })?
    }

    /// Resolve a specific platform out of a multi-arch image.
    ///
    /// When the reference resolves to a manifest list, the matching entry's
    /// digest is used as the reference of an explicit second fetch, and the
    /// sub-manifest is verified against that digest. A single-platform
    /// manifest is returned unchanged.
    pub async fn resolve_platform(
        &self,
        registry: &str,
        repository: &str,
        reference: &str,
        platform: &Platform,
    ) -> RegistryResult<Resolution> {
        let resolved = self
            .resolve_and_verify(registry, repository, reference, None)
            .await?;
        if !resolved.manifest.is_index() {
            return Ok(resolved);
        }

        let index = resolved.manifest.parse_index()?;
        let entry = index
            .manifests
            .iter()
            .find(|entry| {
                entry
                    .platform
                    .as_ref()
                    .is_some_and(|candidate| candidate.matches(platform))
            })
            .ok_or_else(|| RegistryError::ManifestNotFound {
                repository: repository.to_string(),
                reference: format!("{reference} (platform {platform})"),
            })?;

        let sub_digest = Digest::from_str(&entry.digest)?;
        self.resolve_and_verify(registry, repository, &sub_digest.to_string(), Some(&sub_digest))
            .await
    }

    /// Resolve a parsed [`ImageRef`]. Digest-pinned references are verified
    /// against their pin.
    pub async fn inspect(&self, image: &ImageRef) -> RegistryResult<Resolution> {
        let expected = match &image.reference {
            Reference::Digest(digest) => Some(digest.clone()),
            Reference::Tag(_) => None,
        };
        self.resolve_and_verify(
            &image.registry,
            &image.repository,
            &image.reference.to_string(),
            expected.as_ref(),
        )
        .await
    }

    /// Read the platform tuple off a single-platform image's config blob.
    pub async fn config_platform(
        &self,
        registry: &str,
        repository: &str,
        manifest: &ImageManifest,
    ) -> RegistryResult<Option<Platform>> {
        let descriptor = self.directory.lookup(registry)?;
        let token = resolve_token(&self.client, descriptor, repository).await?;

        let config_digest = Digest::from_str(&manifest.config.digest)?;
        let blob = fetch_blob(&self.client, &token, descriptor, repository, &config_digest).await?;

        let config: ConfigBlob =
            serde_json::from_slice(&blob).map_err(|e| RegistryError::InvalidResponse {
                message: format!("failed to parse config blob: {e}"),
            })?;

        Ok(match (config.os, config.architecture) {
            (Some(os), Some(architecture)) => Some(Platform::new(os, architecture)),
            _ => None,
        })
    }
}

fn mismatch(
    repository: &str,
    reference: &str,
    expected: &Digest,
    computed: &Digest,
) -> RegistryError {
    RegistryError::DigestMismatch {
        repository: repository.to_string(),
        reference: reference.to_string(),
        expected: expected.to_string(),
        computed: computed.to_string(),
    }
}
