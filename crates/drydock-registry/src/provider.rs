//! Provider directory: per-registry authentication and endpoint quirks.
//!
//! Divergence between providers is a closed set of tagged variants, not a type
//! hierarchy. Adding a registry means adding one table row.

use crate::error::{RegistryError, RegistryResult};
use crate::media_type;

/// How a provider hands out pull credentials.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthMode {
    /// Standard WWW-Authenticate flow: unauthenticated GET on the token
    /// endpoint with `service` and `scope` query parameters.
    AnonymousBearer,

    /// Pre-issued opaque token, sent as-is (private registries).
    StaticToken(String),

    /// Amazon ECR Public Gallery: token endpoint takes no query parameters
    /// and the API host differs from the registry host.
    AwsPublicEcr,

    /// The manifest endpoint accepts anonymous GETs directly.
    NoAuth,
}

/// One registry's deviation from the standard flow.
#[derive(Debug, Clone)]
pub struct ProviderDescriptor {
    /// Registry path used as the lookup key, e.g. `quay.io`.
    pub registry: String,

    pub auth_mode: AuthMode,

    /// Token endpoint URL. Unused for `StaticToken` and `NoAuth`.
    pub auth_endpoint: String,

    /// `service` query parameter of the token request.
    pub service: String,

    /// Base URL of the `/v2/` manifest API.
    pub registry_base: String,

    /// Supported manifest media types, descending preference.
    pub media_types: Vec<String>,
}

impl ProviderDescriptor {
    /// Descriptor with the standard bearer flow and default media types.
    pub fn bearer(
        registry: impl Into<String>,
        auth_endpoint: impl Into<String>,
        service: impl Into<String>,
        registry_base: impl Into<String>,
    ) -> Self {
        Self {
            registry: registry.into(),
            auth_mode: AuthMode::AnonymousBearer,
            auth_endpoint: auth_endpoint.into(),
            service: service.into(),
            registry_base: registry_base.into(),
            media_types: default_media_types(),
        }
    }

    /// Accept header value: all supported media types, best first.
    pub fn accept_header(&self) -> String {
        self.media_types.join(",")
    }
}

fn default_media_types() -> Vec<String> {
    media_type::DEFAULT_ACCEPT_ORDER
        .iter()
        .map(|mt| (*mt).to_string())
        .collect()
}

/// Immutable table of provider descriptors, loaded at process start.
///
/// Lookup is exact-match only: a malformed or hostile registry path must fail
/// loudly instead of silently mapping to the wrong provider.
#[derive(Debug, Clone)]
pub struct ProviderDirectory {
    descriptors: Vec<ProviderDescriptor>,
}

impl Default for ProviderDirectory {
    fn default() -> Self {
        Self::builtin()
    }
}

impl ProviderDirectory {
    /// The built-in table of public registries.
    pub fn builtin() -> Self {
        let docker_hub = |registry: &str| {
            ProviderDescriptor::bearer(
                registry,
                "https://auth.docker.io/token",
                "registry.docker.io",
                "https://registry-1.docker.io",
            )
        };

        let descriptors = vec![
            docker_hub("docker.io"),
            docker_hub("registry.hub.docker.com"),
            ProviderDescriptor::bearer(
                "quay.io",
                "https://quay.io/v2/auth",
                "quay.io",
                "https://quay.io",
            ),
            ProviderDescriptor::bearer(
                "ghcr.io",
                "https://ghcr.io/token",
                "ghcr.io",
                "https://ghcr.io",
            ),
            ProviderDescriptor::bearer(
                "registry.gitlab.com",
                "https://gitlab.com/jwt/auth",
                "container_registry",
                "https://registry.gitlab.com",
            ),
            ProviderDescriptor {
                registry: "public.ecr.aws".to_string(),
                auth_mode: AuthMode::AwsPublicEcr,
                auth_endpoint: "https://public.ecr.aws/token/".to_string(),
                service: "public.ecr.aws".to_string(),
                registry_base: "https://public.ecr.aws".to_string(),
                media_types: default_media_types(),
            },
        ];

        Self { descriptors }
    }

    /// Directory with only the given descriptors (tests, private registries).
    pub fn from_descriptors(descriptors: Vec<ProviderDescriptor>) -> Self {
        Self { descriptors }
    }

    /// Add a descriptor, e.g. a private registry with a static token.
    pub fn with_descriptor(mut self, descriptor: ProviderDescriptor) -> Self {
        self.descriptors.push(descriptor);
        self
    }

    /// Exact-match lookup. Unknown hosts fail with `UnrecognizedRegistry`,
    /// never with a fallback guess.
    pub fn lookup(&self, registry: &str) -> RegistryResult<&ProviderDescriptor> {
        self.descriptors
            .iter()
            .find(|d| d.registry == registry)
            .ok_or_else(|| RegistryError::UnrecognizedRegistry {
                registry: registry.to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::media_type::{DOCKER_MANIFEST_V1_SIGNED, OCI_IMAGE_INDEX};

    #[test]
    fn builtin_lookup_known_registries() {
        let directory = ProviderDirectory::builtin();
        for registry in [
            "docker.io",
            "registry.hub.docker.com",
            "quay.io",
            "ghcr.io",
            "registry.gitlab.com",
            "public.ecr.aws",
        ] {
            assert!(directory.lookup(registry).is_ok(), "missing {registry}");
        }
    }

    #[test]
    fn lookup_unknown_registry_fails_explicitly() {
        let directory = ProviderDirectory::builtin();
        let err = directory.lookup("fakeDockerRegistry").unwrap_err();
        assert!(matches!(
            err,
            RegistryError::UnrecognizedRegistry { registry } if registry == "fakeDockerRegistry"
        ));
    }

    #[test]
    fn lookup_is_exact_match_only() {
        let directory = ProviderDirectory::builtin();
        assert!(directory.lookup("evil-quay.io").is_err());
        assert!(directory.lookup("quay.io.attacker.example").is_err());
    }

    #[test]
    fn builtin_keys_are_unique() {
        let directory = ProviderDirectory::builtin();
        let mut keys: Vec<_> = directory
            .descriptors
            .iter()
            .map(|d| d.registry.as_str())
            .collect();
        keys.sort_unstable();
        let before = keys.len();
        keys.dedup();
        assert_eq!(before, keys.len());
    }

    #[test]
    fn ecr_public_splits_api_and_registry_hosts() {
        let directory = ProviderDirectory::builtin();
        let ecr = directory.lookup("public.ecr.aws").unwrap();
        assert_eq!(ecr.auth_mode, AuthMode::AwsPublicEcr);
        assert_ne!(ecr.auth_endpoint, ecr.registry_base);
    }

    #[test]
    fn accept_header_preserves_preference_order() {
        let quay = ProviderDirectory::builtin();
        let header = quay.lookup("quay.io").unwrap().accept_header();
        assert!(header.starts_with(OCI_IMAGE_INDEX));
        assert!(header.ends_with(DOCKER_MANIFEST_V1_SIGNED));
    }
}
