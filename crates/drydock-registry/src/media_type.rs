//! Manifest media types from the Docker Registry HTTP API v2 and the OCI
//! Distribution Spec.

/// OCI image index (multi-arch).
pub const OCI_IMAGE_INDEX: &str = "application/vnd.oci.image.index.v1+json";

/// OCI image manifest.
pub const OCI_IMAGE_MANIFEST: &str = "application/vnd.oci.image.manifest.v1+json";

/// Docker manifest list v2 (multi-arch).
pub const DOCKER_MANIFEST_LIST_V2: &str =
    "application/vnd.docker.distribution.manifest.list.v2+json";

/// Docker image manifest v2 schema 2.
pub const DOCKER_MANIFEST_V2: &str = "application/vnd.docker.distribution.manifest.v2+json";

/// Docker image manifest schema 1 (deprecated).
pub const DOCKER_MANIFEST_V1: &str = "application/vnd.docker.distribution.manifest.v1+json";

/// Docker image manifest schema 1, signed variant.
pub const DOCKER_MANIFEST_V1_SIGNED: &str =
    "application/vnd.docker.distribution.manifest.v1+prettyjws";

/// Accept-header preference order, best first. Schema 1 is last: still
/// accepted and surfaced so callers can detect deprecated-schema pulls.
pub const DEFAULT_ACCEPT_ORDER: &[&str] = &[
    OCI_IMAGE_INDEX,
    OCI_IMAGE_MANIFEST,
    DOCKER_MANIFEST_LIST_V2,
    DOCKER_MANIFEST_V2,
    DOCKER_MANIFEST_V1_SIGNED,
];

/// Whether the media type is a manifest list / image index.
pub fn is_index(media_type: &str) -> bool {
    matches!(
        essence(media_type),
        OCI_IMAGE_INDEX | DOCKER_MANIFEST_LIST_V2
    )
}

/// Whether the media type is a single-platform schema-2/OCI manifest.
pub fn is_image_manifest(media_type: &str) -> bool {
    matches!(essence(media_type), OCI_IMAGE_MANIFEST | DOCKER_MANIFEST_V2)
}

/// Whether the media type is a deprecated schema-1 manifest.
pub fn is_schema1(media_type: &str) -> bool {
    matches!(
        essence(media_type),
        DOCKER_MANIFEST_V1 | DOCKER_MANIFEST_V1_SIGNED
    )
}

/// Strip `;charset=...` style parameters from a Content-Type value.
fn essence(media_type: &str) -> &str {
    media_type
        .split(';')
        .next()
        .unwrap_or(media_type)
        .trim()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_indexes() {
        assert!(is_index(OCI_IMAGE_INDEX));
        assert!(is_index(DOCKER_MANIFEST_LIST_V2));
        assert!(!is_index(DOCKER_MANIFEST_V2));
    }

    #[test]
    fn classifies_schema1() {
        assert!(is_schema1(DOCKER_MANIFEST_V1));
        assert!(is_schema1(DOCKER_MANIFEST_V1_SIGNED));
        assert!(!is_schema1(OCI_IMAGE_MANIFEST));
    }

    #[test]
    fn ignores_content_type_parameters() {
        assert!(is_image_manifest(
            "application/vnd.docker.distribution.manifest.v2+json; charset=utf-8"
        ));
    }

    #[test]
    fn accept_order_prefers_indexes_and_ends_with_schema1() {
        assert_eq!(DEFAULT_ACCEPT_ORDER[0], OCI_IMAGE_INDEX);
        assert!(is_schema1(DEFAULT_ACCEPT_ORDER[DEFAULT_ACCEPT_ORDER.len() - 1]));
    }
}
