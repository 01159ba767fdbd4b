use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::jwk::JwkSet;
use jsonwebtoken::{Algorithm, DecodingKey, Header, Validation};
use serde::Deserialize;
use std::fmt::{self, Debug, Formatter};
use std::fs;

use super::AuthError;
use crate::config;

#[derive(Debug, Deserialize)]
struct Claims {
    #[serde(default)]
    permissions: Option<Vec<String>>,
}

enum Keys {
    Shared(DecodingKey),
    Jwks(JwkSet),
}

/// Verifies bearer tokens against either a shared HS256 secret or an RS256
/// key set, then checks the `permissions` claim.
pub struct TokenValidator {
    keys: Keys,
    validation: Validation,
}

impl Debug for TokenValidator {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let keys = match &self.keys {
            Keys::Shared(_) => "shared",
            Keys::Jwks(set) if set.keys.is_empty() => "jwks(empty)",
            Keys::Jwks(_) => "jwks",
        };
        f.debug_struct("TokenValidator").field("keys", &keys).finish()
    }
}

fn validation(algorithm: Algorithm, issuer: Option<&str>, audience: Option<&str>) -> Validation {
    let mut validation = Validation::new(algorithm);
    validation.validate_exp = true;
    match audience {
        Some(audience) => validation.set_audience(&[audience]),
        None => validation.validate_aud = false,
    }
    if let Some(issuer) = issuer {
        validation.set_issuer(&[issuer]);
    }
    validation
}

impl TokenValidator {
    pub fn from_secret(secret: &str, issuer: Option<&str>, audience: Option<&str>) -> Self {
        Self {
            keys: Keys::Shared(DecodingKey::from_secret(secret.as_bytes())),
            validation: validation(Algorithm::HS256, issuer, audience),
        }
    }

    pub fn from_jwks(jwks: JwkSet, issuer: Option<&str>, audience: Option<&str>) -> Self {
        Self {
            keys: Keys::Jwks(jwks),
            validation: validation(Algorithm::RS256, issuer, audience),
        }
    }

    pub fn from_config(cfg: &config::Auth) -> anyhow::Result<Self> {
        if let Some(path) = cfg.jwks_path() {
            let raw = fs::read_to_string(path)
                .map_err(|e| anyhow::anyhow!("failed to read jwks file {path}: {e}"))?;
            let jwks: JwkSet = serde_json::from_str(&raw)
                .map_err(|e| anyhow::anyhow!("failed to parse jwks file {path}: {e}"))?;
            tracing::info!(keys = jwks.keys.len(), "[auth] validating RS256 tokens against jwks");
            return Ok(Self::from_jwks(jwks, cfg.issuer(), cfg.audience()));
        }

        if let Some(secret) = cfg.secret() {
            tracing::info!("[auth] validating HS256 tokens against shared secret");
            return Ok(Self::from_secret(secret, cfg.issuer(), cfg.audience()));
        }

        anyhow::bail!("auth config needs either jwks_path or secret")
    }

    /// Checks the raw `Authorization` header value and the required permission.
    pub fn verify(&self, authorization: Option<&str>, permission: &str) -> Result<(), AuthError> {
        let token = bearer_token(authorization)?;
        let header = jsonwebtoken::decode_header(token)
            .map_err(|_| AuthError::invalid_header("Unable to parse authentication token."))?;
        let key = self.key_for(&header)?;

        let claims = jsonwebtoken::decode::<Claims>(token, &key, &self.validation)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => AuthError::token_expired(),
                ErrorKind::InvalidAudience | ErrorKind::InvalidIssuer => {
                    AuthError::invalid_claims()
                }
                _ => AuthError::invalid_header("Unable to parse authentication token."),
            })?
            .claims;

        let permissions = claims.permissions.ok_or_else(AuthError::permissions_missing)?;
        if !permissions.iter().any(|p| p == permission) {
            return Err(AuthError::permission_not_found());
        }
        Ok(())
    }

    fn key_for(&self, header: &Header) -> Result<DecodingKey, AuthError> {
        match &self.keys {
            Keys::Shared(key) => Ok(key.clone()),
            Keys::Jwks(set) => {
                let not_found = || AuthError::invalid_header("Unable to find the appropriate key.");
                let kid = header.kid.as_deref().ok_or_else(not_found)?;
                let jwk = set.find(kid).ok_or_else(not_found)?;
                DecodingKey::from_jwk(jwk).map_err(|_| not_found())
            }
        }
    }
}

fn bearer_token(authorization: Option<&str>) -> Result<&str, AuthError> {
    let authorization = authorization.ok_or_else(AuthError::header_missing)?;
    let parts: Vec<&str> = authorization.split_whitespace().collect();

    match parts.as_slice() {
        [] => Err(AuthError::header_missing()),
        [scheme, ..] if !scheme.eq_ignore_ascii_case("bearer") => Err(AuthError::invalid_header(
            "Authorization header must start with \"Bearer\".",
        )),
        [_] => Err(AuthError::invalid_header("Token not found.")),
        [_, token] => Ok(*token),
        _ => Err(AuthError::invalid_header(
            "Authorization header must be bearer token.",
        )),
    }
}
