//! Token resolution: the bearer or provider-specific credential exchange.

use serde::Deserialize;
use tracing::debug;
use url::Url;

use crate::error::{RegistryError, RegistryResult};
use crate::provider::{AuthMode, ProviderDescriptor};
use crate::types::Token;

/// Standard token endpoint body. Some providers answer with `token`, some
/// with `access_token`, Docker Hub with both.
#[derive(Debug, Deserialize)]
struct TokenResponse {
    #[serde(default)]
    token: Option<String>,

    #[serde(default)]
    access_token: Option<String>,
}

/// ECR Public Gallery authorization body.
#[derive(Debug, Deserialize)]
struct EcrPublicTokenResponse {
    token: String,
}

/// Obtain a pull token for `repository` according to the provider's auth mode.
///
/// 4xx from the token endpoint is an auth failure; timeouts and connection
/// errors surface as transient so the caller can decide whether to retry.
pub async fn resolve_token(
    client: &reqwest::Client,
    descriptor: &ProviderDescriptor,
    repository: &str,
) -> RegistryResult<Token> {
    match &descriptor.auth_mode {
        AuthMode::NoAuth => Ok(Token::anonymous(repository)),

        AuthMode::StaticToken(value) => Ok(Token {
            value: value.clone(),
            scope: repository.to_string(),
        }),

        AuthMode::AnonymousBearer => {
            let mut url = parse_auth_endpoint(descriptor)?;
            url.query_pairs_mut()
                .append_pair("service", &descriptor.service)
                .append_pair("scope", &format!("repository:{repository}:pull"));

            debug!(registry = %descriptor.registry, repository, "requesting pull token");
            let response = client.get(url).send().await?;
            let status = response.status();
            if !status.is_success() {
                return Err(auth_failure(descriptor, repository, status, response).await);
            }

            let body: TokenResponse =
                response
                    .json()
                    .await
                    .map_err(|e| RegistryError::InvalidResponse {
                        message: format!("failed to parse token response: {e}"),
                    })?;

            let value = body.token.or(body.access_token).ok_or_else(|| {
                RegistryError::InvalidResponse {
                    message: format!(
                        "token endpoint for {} returned neither `token` nor `access_token`",
                        descriptor.registry
                    ),
                }
            })?;

            Ok(Token {
                value,
                scope: repository.to_string(),
            })
        }

        AuthMode::AwsPublicEcr => {
            // Public gallery authorization: no user credentials, no
            // service/scope parameters.
            let url = parse_auth_endpoint(descriptor)?;

            debug!(registry = %descriptor.registry, repository, "requesting ECR public token");
            let response = client.get(url).send().await?;
            let status = response.status();
            if !status.is_success() {
                return Err(auth_failure(descriptor, repository, status, response).await);
            }

            let body: EcrPublicTokenResponse =
                response
                    .json()
                    .await
                    .map_err(|e| RegistryError::InvalidResponse {
                        message: format!("failed to parse ECR authorization response: {e}"),
                    })?;

            Ok(Token {
                value: body.token,
                scope: repository.to_string(),
            })
        }
    }
}

fn parse_auth_endpoint(descriptor: &ProviderDescriptor) -> RegistryResult<Url> {
    Url::parse(&descriptor.auth_endpoint).map_err(|e| RegistryError::InvalidResponse {
        message: format!(
            "malformed auth endpoint for {}: {e}",
            descriptor.registry
        ),
    })
}

async fn auth_failure(
    descriptor: &ProviderDescriptor,
    repository: &str,
    status: reqwest::StatusCode,
    response: reqwest::Response,
) -> RegistryError {
    let body = response.text().await.unwrap_or_default();
    RegistryError::Auth {
        registry: descriptor.registry.clone(),
        repository: repository.to_string(),
        message: crate::types::api_error_message(status.as_u16(), &body),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_response_prefers_token_field() {
        let body: TokenResponse =
            serde_json::from_str(r#"{"token": "a", "access_token": "b"}"#).unwrap();
        assert_eq!(body.token.or(body.access_token).unwrap(), "a");
    }

    #[test]
    fn token_response_falls_back_to_access_token() {
        let body: TokenResponse = serde_json::from_str(r#"{"access_token": "b"}"#).unwrap();
        assert_eq!(body.token.or(body.access_token).unwrap(), "b");
    }

    #[tokio::test]
    async fn no_auth_short_circuits_without_network() {
        let descriptor = ProviderDescriptor {
            registry: "registry.test".into(),
            auth_mode: AuthMode::NoAuth,
            auth_endpoint: "http://127.0.0.1:1/token".into(),
            service: "registry.test".into(),
            registry_base: "http://127.0.0.1:1".into(),
            media_types: vec![],
        };

        // The endpoint is unreachable; NoAuth must never touch it.
        let token = resolve_token(&reqwest::Client::new(), &descriptor, "org/app")
            .await
            .unwrap();
        assert!(token.is_anonymous());
        assert_eq!(token.scope, "org/app");
    }

    #[tokio::test]
    async fn static_token_is_returned_verbatim() {
        let descriptor = ProviderDescriptor {
            registry: "registry.internal".into(),
            auth_mode: AuthMode::StaticToken("s3cr3t".into()),
            auth_endpoint: String::new(),
            service: String::new(),
            registry_base: "https://registry.internal".into(),
            media_types: vec![],
        };

        let token = resolve_token(&reqwest::Client::new(), &descriptor, "org/app")
            .await
            .unwrap();
        assert_eq!(token.value, "s3cr3t");
        assert!(!token.is_anonymous());
    }
}
