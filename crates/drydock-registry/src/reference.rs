//! Image reference parsing.
//!
//! Accepts the forms seen in workflow descriptors:
//! - `quay.io/org/app:1.0` → explicit registry, tag
//! - `ghcr.io/helm/tiller@sha256:...` → explicit registry, pinned digest
//! - `public.ecr.aws/ubuntu/ubuntu:18.04` → ECR public gallery
//! - `broadinstitute/gatk:4.0.1.1` → Docker Hub namespace
//! - `python:2.7` → Docker Hub official image (`library/python`)

use std::fmt;
use std::str::FromStr;

use crate::digest::Digest;
use crate::error::{RegistryError, RegistryResult};

/// A tag or a pinned digest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reference {
    Tag(String),
    Digest(Digest),
}

impl fmt::Display for Reference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Tag(tag) => write!(f, "{tag}"),
            Self::Digest(digest) => write!(f, "{digest}"),
        }
    }
}

/// A fully qualified image: registry, repository, and reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageRef {
    pub registry: String,
    pub repository: String,
    pub reference: Reference,
}

impl ImageRef {
    /// Parse an image string. A tag or digest is required: a bare name would
    /// make the resolution ambiguous, and `latest` is never assumed.
    pub fn parse(image: &str) -> RegistryResult<Self> {
        let image = image.trim();
        if image.is_empty() {
            return Err(invalid(image, "empty image reference"));
        }

        // Digest pin takes precedence: everything after '@' must be a digest.
        let (name, reference) = if let Some((name, digest)) = image.split_once('@') {
            let digest = Digest::from_str(digest)?;
            (name, Reference::Digest(digest))
        } else {
            let (name, tag) = split_tag(image).ok_or_else(|| {
                invalid(image, "a tag or digest is required")
            })?;
            validate_tag(image, tag)?;
            (name, Reference::Tag(tag.to_string()))
        };

        let (registry, repository) = split_registry(name);
        if repository.is_empty() {
            return Err(invalid(image, "empty repository path"));
        }
        validate_repository(image, &repository)?;

        Ok(Self {
            registry,
            repository,
            reference,
        })
    }
}

impl fmt::Display for ImageRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let separator = match self.reference {
            Reference::Tag(_) => ":",
            Reference::Digest(_) => "@",
        };
        write!(
            f,
            "{}/{}{}{}",
            self.registry, self.repository, separator, self.reference
        )
    }
}

impl FromStr for ImageRef {
    type Err = RegistryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// Split off the tag: the last ':' after the last '/'.
fn split_tag(image: &str) -> Option<(&str, &str)> {
    let colon = image.rfind(':')?;
    if image[colon..].contains('/') {
        return None;
    }
    Some((&image[..colon], &image[colon + 1..]))
}

/// Decide whether the first path component names a registry.
///
/// Docker convention: a component with a dot or port, or `localhost`, is a
/// host; everything else lives on Docker Hub. Official images get the
/// implicit `library/` namespace.
fn split_registry(name: &str) -> (String, String) {
    match name.split_once('/') {
        Some((first, rest))
            if first.contains('.') || first.contains(':') || first == "localhost" =>
        {
            (first.to_string(), rest.to_string())
        }
        Some(_) => ("docker.io".to_string(), name.to_string()),
        None => ("docker.io".to_string(), format!("library/{name}")),
    }
}

fn validate_tag(image: &str, tag: &str) -> RegistryResult<()> {
    if tag.is_empty() {
        return Err(invalid(image, "empty tag"));
    }
    if tag.len() > 128 {
        return Err(invalid(image, "tag longer than 128 characters"));
    }
    if !tag
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'))
    {
        return Err(invalid(image, "tag contains invalid characters"));
    }
    Ok(())
}

fn validate_repository(image: &str, repository: &str) -> RegistryResult<()> {
    let valid = repository.split('/').all(|component| {
        !component.is_empty()
            && component
                .chars()
                .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || matches!(c, '.' | '_' | '-'))
    });
    if !valid {
        return Err(invalid(image, "invalid repository path"));
    }
    Ok(())
}

fn invalid(image: &str, reason: &str) -> RegistryError {
    RegistryError::InvalidReference {
        reference: image.to_string(),
        reason: reason.to_string(),
    }
}
