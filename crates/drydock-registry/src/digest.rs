//! Content digest computation and comparison.
//!
//! The digest is computed over the manifest body exactly as received from the
//! wire. JSON re-serialization is not byte-stable, so re-encoding the parsed
//! manifest would silently produce a wrong digest.

use std::fmt;
use std::str::FromStr;

use sha2::{Digest as _, Sha256};

use crate::error::{RegistryError, RegistryResult};
use crate::media_type;

/// Hash algorithm families defined by the Distribution Spec.
///
/// Closed set: the algorithm is read from the `sha256:` prefix convention,
/// never inferred from the payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Algorithm {
    Sha256,
}

impl Algorithm {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sha256 => "sha256",
        }
    }

    /// Hex length for a digest of this algorithm.
    fn hex_len(&self) -> usize {
        match self {
            Self::Sha256 => 64,
        }
    }
}

/// A content digest in `<algorithm>:<hex>` form.
///
/// The hex is normalized to lowercase on construction, so derived equality is
/// the case-insensitive comparison the Distribution Spec asks for.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Digest {
    algorithm: Algorithm,
    hex: String,
}

impl Digest {
    pub fn algorithm(&self) -> Algorithm {
        self.algorithm
    }

    pub fn hex(&self) -> &str {
        &self.hex
    }

    /// SHA-256 over raw bytes, as the Distribution Spec defines content
    /// digests for schema-2 and OCI manifests.
    pub fn sha256_of(bytes: &[u8]) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(bytes);
        Self {
            algorithm: Algorithm::Sha256,
            hex: format!("{:x}", hasher.finalize()),
        }
    }
}

impl fmt::Display for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.algorithm.as_str(), self.hex)
    }
}

impl FromStr for Digest {
    type Err = RegistryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (alg, hex) = s.split_once(':').ok_or_else(|| invalid(s, "missing ':'"))?;

        let algorithm = match alg {
            "sha256" => Algorithm::Sha256,
            _ => return Err(invalid(s, "unknown algorithm")),
        };

        if hex.len() != algorithm.hex_len() {
            return Err(invalid(s, "wrong hex length"));
        }
        if ::hex::decode(hex).is_err() {
            return Err(invalid(s, "non-hex characters"));
        }

        Ok(Self {
            algorithm,
            hex: hex.to_ascii_lowercase(),
        })
    }
}

fn invalid(digest: &str, reason: &str) -> RegistryError {
    RegistryError::InvalidReference {
        reference: digest.to_string(),
        reason: format!("malformed digest: {reason}"),
    }
}

/// Compute the content digest of a manifest body.
///
/// Fails with [`RegistryError::UnsupportedMediaType`] for schema-1 manifests
/// (their digest requires pre-processing this engine does not do) and for
/// media types the Distribution Spec does not define a digest for.
pub fn digest_of(bytes: &[u8], media_type: &str) -> RegistryResult<Digest> {
    if media_type::is_index(media_type) || media_type::is_image_manifest(media_type) {
        Ok(Digest::sha256_of(bytes))
    } else {
        Err(RegistryError::UnsupportedMediaType {
            media_type: media_type.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::media_type::{DOCKER_MANIFEST_V1_SIGNED, DOCKER_MANIFEST_V2, OCI_IMAGE_INDEX};

    #[test]
    fn sha256_known_vector() {
        // Empty input has a fixed, well-known SHA-256.
        let digest = Digest::sha256_of(b"");
        assert_eq!(
            digest.to_string(),
            "sha256:e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn digest_of_is_deterministic() {
        let body = br#"{"schemaVersion":2,"layers":[]}"#;
        let a = digest_of(body, DOCKER_MANIFEST_V2).unwrap();
        let b = digest_of(body, OCI_IMAGE_INDEX).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn digest_of_rejects_schema1() {
        let err = digest_of(b"{}", DOCKER_MANIFEST_V1_SIGNED).unwrap_err();
        assert!(matches!(err, RegistryError::UnsupportedMediaType { .. }));
    }

    #[test]
    fn digest_of_rejects_unknown_media_type() {
        let err = digest_of(b"{}", "text/plain").unwrap_err();
        assert!(matches!(err, RegistryError::UnsupportedMediaType { .. }));
    }

    #[test]
    fn equality_is_case_insensitive() {
        let lower: Digest = "sha256:4c43eb38f6bc92c0222ca93b8b8c6b61b625b1f9df0e1b70fc50d11004f76803"
            .parse()
            .unwrap();
        let upper: Digest = "sha256:4C43EB38F6BC92C0222CA93B8B8C6B61B625B1F9DF0E1B70FC50D11004F76803"
            .parse()
            .unwrap();
        assert_eq!(lower, upper);
    }

    #[test]
    fn parse_rejects_unknown_algorithm() {
        let err = "md5:d41d8cd98f00b204e9800998ecf8427e".parse::<Digest>().unwrap_err();
        assert!(matches!(err, RegistryError::InvalidReference { .. }));
    }

    #[test]
    fn parse_rejects_bad_hex() {
        assert!("sha256:abc".parse::<Digest>().is_err());
        assert!(
            "sha256:zz43eb38f6bc92c0222ca93b8b8c6b61b625b1f9df0e1b70fc50d11004f76803"
                .parse::<Digest>()
                .is_err()
        );
    }

    #[test]
    fn display_round_trips() {
        let digest = Digest::sha256_of(b"manifest");
        let reparsed: Digest = digest.to_string().parse().unwrap();
        assert_eq!(digest, reparsed);
    }
}
