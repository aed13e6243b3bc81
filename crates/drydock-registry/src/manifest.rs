//! Manifest fetching over `GET /v2/<repo>/manifests/<reference>`.
//!
//! The fetcher never descends into manifest lists on its own: an index is
//! returned as-is, and resolving a platform's sub-manifest is a separate call
//! keyed by that sub-manifest's own digest. Policy lives in the resolver.

use std::str::FromStr;

use reqwest::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE};
use tracing::{debug, warn};

use crate::digest::Digest;
use crate::error::{RegistryError, RegistryResult};
use crate::provider::ProviderDescriptor;
use crate::types::{api_error_message, ManifestResponse, Token};

/// Registry-supplied digest header, cross-checked but never trusted.
const DOCKER_CONTENT_DIGEST: &str = "docker-content-digest";

/// Fetch a manifest by tag or digest.
///
/// Status mapping: 401/403 is an auth failure, 404 a missing reference,
/// anything else non-2xx (and any network failure) is transient. Schema-1
/// responses are surfaced with their content type intact, not rejected here.
pub async fn fetch_manifest(
    client: &reqwest::Client,
    token: &Token,
    descriptor: &ProviderDescriptor,
    repository: &str,
    reference: &str,
) -> RegistryResult<ManifestResponse> {
    let url = format!(
        "{}/v2/{}/manifests/{}",
        descriptor.registry_base.trim_end_matches('/'),
        repository,
        reference
    );
    debug!(url = %url, "fetching manifest");

    let mut request = client.get(&url).header(ACCEPT, descriptor.accept_header());
    if !token.is_anonymous() {
        request = request.header(AUTHORIZATION, format!("Bearer {}", token.value));
    }

    let response = request.send().await?;
    let status = response.status();

    match status.as_u16() {
        200..=299 => {}
        401 | 403 => {
            let body = response.text().await.unwrap_or_default();
            return Err(RegistryError::Auth {
                registry: descriptor.registry.clone(),
                repository: repository.to_string(),
                message: api_error_message(status.as_u16(), &body),
            });
        }
        404 => {
            return Err(RegistryError::ManifestNotFound {
                repository: repository.to_string(),
                reference: reference.to_string(),
            });
        }
        _ => {
            let body = response.text().await.unwrap_or_default();
            return Err(RegistryError::Transient {
                message: api_error_message(status.as_u16(), &body),
            });
        }
    }

    let content_type = response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
        .ok_or_else(|| RegistryError::InvalidResponse {
            message: format!("manifest response for {repository}@{reference} has no Content-Type"),
        })?;

    let advertised_digest = response
        .headers()
        .get(DOCKER_CONTENT_DIGEST)
        .and_then(|v| v.to_str().ok())
        .and_then(|raw| match Digest::from_str(raw) {
            Ok(digest) => Some(digest),
            Err(_) => {
                warn!(header = raw, "ignoring malformed Docker-Content-Digest header");
                None
            }
        });

    let bytes = response.bytes().await?.to_vec();

    Ok(ManifestResponse {
        bytes,
        content_type,
        status: status.as_u16(),
        advertised_digest,
    })
}

/// Fetch a blob by digest, e.g. the image configuration.
///
/// Registries commonly answer with a 307 to a storage backend; the client
/// follows it.
pub async fn fetch_blob(
    client: &reqwest::Client,
    token: &Token,
    descriptor: &ProviderDescriptor,
    repository: &str,
    digest: &Digest,
) -> RegistryResult<Vec<u8>> {
    let url = format!(
        "{}/v2/{}/blobs/{}",
        descriptor.registry_base.trim_end_matches('/'),
        repository,
        digest
    );
    debug!(url = %url, "fetching blob");

    let mut request = client.get(&url);
    if !token.is_anonymous() {
        request = request.header(AUTHORIZATION, format!("Bearer {}", token.value));
    }

    let response = request.send().await?;
    let status = response.status();

    match status.as_u16() {
        200..=299 => Ok(response.bytes().await?.to_vec()),
        401 | 403 => {
            let body = response.text().await.unwrap_or_default();
            Err(RegistryError::Auth {
                registry: descriptor.registry.clone(),
                repository: repository.to_string(),
                message: api_error_message(status.as_u16(), &body),
            })
        }
        404 => Err(RegistryError::ManifestNotFound {
            repository: repository.to_string(),
            reference: digest.to_string(),
        }),
        _ => {
            let body = response.text().await.unwrap_or_default();
            Err(RegistryError::Transient {
                message: api_error_message(status.as_u16(), &body),
            })
        }
    }
}
