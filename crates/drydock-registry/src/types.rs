//! Wire types for the registry protocol, plus resolver configuration.

use serde::{Deserialize, Serialize};

use crate::digest::Digest;
use crate::error::{RegistryError, RegistryResult};
use crate::media_type;

/// A pull-scoped bearer token.
///
/// Lives for a single resolution call; never persisted or cached across calls.
#[derive(Debug, Clone)]
pub struct Token {
    /// Opaque token value. Empty for anonymous access.
    pub value: String,

    /// Repository path the token was issued for.
    pub scope: String,
}

impl Token {
    /// Token for registries that accept anonymous manifest GETs directly.
    pub fn anonymous(repository: &str) -> Self {
        Self {
            value: String::new(),
            scope: repository.to_string(),
        }
    }

    /// Whether the manifest request should skip the Authorization header.
    pub fn is_anonymous(&self) -> bool {
        self.value.is_empty()
    }
}

/// A fetched manifest, owned by the call that fetched it.
#[derive(Debug, Clone)]
pub struct ManifestResponse {
    /// Manifest body exactly as transmitted. Source of truth for the digest.
    pub bytes: Vec<u8>,

    /// Content-Type the registry selected from the Accept list.
    pub content_type: String,

    /// HTTP status of the manifest GET (always 2xx here).
    pub status: u16,

    /// `Docker-Content-Digest` response header, when the registry sent one.
    /// Cross-checked against the computed digest, never trusted on its own.
    pub advertised_digest: Option<Digest>,
}

impl ManifestResponse {
    /// Whether this is a manifest list / image index.
    pub fn is_index(&self) -> bool {
        media_type::is_index(&self.content_type)
    }

    /// Whether the registry served a deprecated schema-1 manifest.
    pub fn is_schema1(&self) -> bool {
        media_type::is_schema1(&self.content_type)
    }

    /// Parse the body as a single-platform image manifest.
    pub fn parse_manifest(&self) -> RegistryResult<ImageManifest> {
        serde_json::from_slice(&self.bytes).map_err(|e| RegistryError::InvalidResponse {
            message: format!("failed to parse image manifest: {e}"),
        })
    }

    /// Parse the body as a manifest list / image index.
    pub fn parse_index(&self) -> RegistryResult<ImageIndex> {
        serde_json::from_slice(&self.bytes).map_err(|e| RegistryError::InvalidResponse {
            message: format!("failed to parse image index: {e}"),
        })
    }
}

/// Docker v2 schema 2 / OCI image manifest.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageManifest {
    /// Schema version; must be 2. Schema 1 bodies are shaped differently and
    /// never parsed into this type.
    pub schema_version: u32,

    #[serde(default)]
    pub media_type: Option<String>,

    /// Image configuration descriptor.
    pub config: ContentDescriptor,

    /// Layer descriptors.
    #[serde(default)]
    pub layers: Vec<ContentDescriptor>,
}

impl ImageManifest {
    /// Image size: the sum of the layer sizes.
    pub fn total_size(&self) -> u64 {
        self.layers.iter().map(|layer| layer.size).sum()
    }
}

/// A content descriptor (config or layer reference).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentDescriptor {
    #[serde(default)]
    pub media_type: Option<String>,

    #[serde(default)]
    pub size: u64,

    /// Digest string, e.g. `sha256:4c43eb38...`.
    pub digest: String,
}

/// Docker manifest list v2 / OCI image index.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageIndex {
    pub schema_version: u32,

    #[serde(default)]
    pub media_type: Option<String>,

    /// Platform-specific sub-manifest references.
    pub manifests: Vec<IndexEntry>,
}

/// One entry of a manifest list: a platform and its sub-manifest digest.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexEntry {
    #[serde(default)]
    pub media_type: Option<String>,

    #[serde(default)]
    pub size: u64,

    /// The sub-manifest's own digest; used as the reference of a follow-up
    /// manifest fetch.
    pub digest: String,

    #[serde(default)]
    pub platform: Option<Platform>,
}

/// Platform tuple carried by index entries and config blobs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Platform {
    pub os: String,
    pub architecture: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variant: Option<String>,
}

impl Platform {
    pub fn new(os: impl Into<String>, architecture: impl Into<String>) -> Self {
        Self {
            os: os.into(),
            architecture: architecture.into(),
            variant: None,
        }
    }

    /// Match os and architecture; variant only when the caller pins one.
    pub fn matches(&self, wanted: &Platform) -> bool {
        self.os == wanted.os
            && self.architecture == wanted.architecture
            && match &wanted.variant {
                Some(variant) => self.variant.as_deref() == Some(variant),
                None => true,
            }
    }
}

impl std::fmt::Display for Platform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.variant {
            Some(variant) => write!(f, "{}/{}/{}", self.os, self.architecture, variant),
            None => write!(f, "{}/{}", self.os, self.architecture),
        }
    }
}

/// Image configuration blob (the subset the engine reads).
#[derive(Debug, Clone, Deserialize)]
pub struct ConfigBlob {
    #[serde(default)]
    pub architecture: Option<String>,

    #[serde(default)]
    pub os: Option<String>,
}

/// Error body of a 4xx Distribution Spec response:
/// `{"errors": [{"code": ..., "message": ...}]}`.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiErrors {
    #[serde(default)]
    pub errors: Vec<ApiError>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiError {
    #[serde(default)]
    pub code: String,

    #[serde(default)]
    pub message: String,
}

/// Fold a Distribution Spec error body into a one-line message, falling back
/// to a body excerpt when the body is not the standard error shape.
pub(crate) fn api_error_message(status: u16, body: &str) -> String {
    if let Ok(parsed) = serde_json::from_str::<ApiErrors>(body) {
        if let Some(first) = parsed.errors.first() {
            return format!("HTTP {status}: {} - {}", first.code, first.message);
        }
    }

    let excerpt: String = body.chars().take(200).collect();
    if excerpt.is_empty() {
        format!("HTTP {status}")
    } else {
        format!("HTTP {status}: {excerpt}")
    }
}

/// Resolver configuration.
#[derive(Debug, Clone)]
pub struct ResolverConfig {
    /// Upper bound for every outbound call, in seconds. Exceeding it surfaces
    /// a transient error; nothing is retried internally.
    pub timeout_secs: u64,

    /// User-Agent for all registry traffic.
    pub user_agent: String,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 30,
            user_agent: concat!("drydock-registry/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

impl ResolverConfig {
    /// Read configuration from `DRYDOCK_HTTP_TIMEOUT` and
    /// `DRYDOCK_USER_AGENT`, falling back to defaults.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(timeout) = std::env::var("DRYDOCK_HTTP_TIMEOUT") {
            if let Ok(secs) = timeout.parse::<u64>() {
                config.timeout_secs = secs;
            }
        }
        if let Ok(agent) = std::env::var("DRYDOCK_USER_AGENT") {
            if !agent.is_empty() {
                config.user_agent = agent;
            }
        }

        config
    }

    pub fn with_timeout_secs(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }

    pub fn with_user_agent(mut self, agent: impl Into<String>) -> Self {
        self.user_agent = agent.into();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::media_type::{DOCKER_MANIFEST_V2, OCI_IMAGE_INDEX};

    fn response(content_type: &str, body: &[u8]) -> ManifestResponse {
        ManifestResponse {
            bytes: body.to_vec(),
            content_type: content_type.to_string(),
            status: 200,
            advertised_digest: None,
        }
    }

    #[test]
    fn parses_image_manifest_and_sums_layers() {
        let body = br#"{
            "schemaVersion": 2,
            "mediaType": "application/vnd.docker.distribution.manifest.v2+json",
            "config": {"mediaType": "application/vnd.docker.container.image.v1+json",
                       "size": 7023,
                       "digest": "sha256:b5b2b2c507a0944348e0303114d8d93aaaa081732b86451d9bce1f432a537bc7"},
            "layers": [
                {"size": 100, "digest": "sha256:aa"},
                {"size": 250, "digest": "sha256:bb"}
            ]
        }"#;

        let manifest = response(DOCKER_MANIFEST_V2, body).parse_manifest().unwrap();
        assert_eq!(manifest.schema_version, 2);
        assert_eq!(manifest.total_size(), 350);
        assert_eq!(manifest.config.size, 7023);
    }

    #[test]
    fn parses_image_index() {
        let body = br#"{
            "schemaVersion": 2,
            "manifests": [
                {"digest": "sha256:aa", "size": 10,
                 "platform": {"os": "linux", "architecture": "amd64"}},
                {"digest": "sha256:bb", "size": 12,
                 "platform": {"os": "linux", "architecture": "arm64", "variant": "v8"}}
            ]
        }"#;

        let index = response(OCI_IMAGE_INDEX, body).parse_index().unwrap();
        assert_eq!(index.manifests.len(), 2);
        assert_eq!(
            index.manifests[1].platform.as_ref().unwrap().to_string(),
            "linux/arm64/v8"
        );
    }

    #[test]
    fn parse_error_is_invalid_response() {
        let err = response(DOCKER_MANIFEST_V2, b"not json")
            .parse_manifest()
            .unwrap_err();
        assert!(matches!(err, RegistryError::InvalidResponse { .. }));
    }

    #[test]
    fn platform_matching_respects_variant_pin() {
        let arm = Platform {
            os: "linux".into(),
            architecture: "arm64".into(),
            variant: Some("v8".into()),
        };

        assert!(arm.matches(&Platform::new("linux", "arm64")));
        assert!(!arm.matches(&Platform {
            os: "linux".into(),
            architecture: "arm64".into(),
            variant: Some("v7".into()),
        }));
        assert!(!arm.matches(&Platform::new("linux", "amd64")));
    }

    #[test]
    fn api_error_message_reads_standard_error_body() {
        let body = r#"{"errors":[{"code":"DENIED","message":"requested access is denied"}]}"#;
        assert_eq!(
            api_error_message(403, body),
            "HTTP 403: DENIED - requested access is denied"
        );
    }

    #[test]
    fn api_error_message_falls_back_to_excerpt() {
        assert_eq!(api_error_message(502, "bad gateway"), "HTTP 502: bad gateway");
        assert_eq!(api_error_message(500, ""), "HTTP 500");
    }

    #[test]
    fn anonymous_token_skips_authorization() {
        assert!(Token::anonymous("org/app").is_anonymous());
        assert!(!Token {
            value: "tok".into(),
            scope: "org/app".into()
        }
        .is_anonymous());
    }
}
