// Access-token plumbing.

use std::collections::HashMap;

use chrono::Utc;
use serde_json::{json, Map, Value};
use uuid::Uuid;

use crate::options::JwtOptions;
use crate::session::SessionError;

#[cfg(any(feature = "jwt-aws-lc-rs", feature = "jwt-rust-crypto"))]
use crate::options::JwtAlgorithm;

pub fn extract_bearer_token(headers: &HashMap<String, String>) -> Option<String> {
    let v = headers
        .get("authorization")
        .or_else(|| headers.get("Authorization"))?;
    parse_bearer(v)
}

/// Same as [`extract_bearer_token`] for an `http` header map.
pub fn bearer_from_header_map(headers: &http::HeaderMap) -> Option<String> {
    let v = headers.get(http::header::AUTHORIZATION)?.to_str().ok()?;
    parse_bearer(v)
}

fn parse_bearer(v: &str) -> Option<String> {
    let v = v.trim();
    let (scheme, token) = v.split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = token.trim();
    (!token.is_empty()).then(|| token.to_string())
}

pub trait JwtProvider: Send + Sync {
    fn sign(&self, jwt: &JwtOptions, claims: Map<String, Value>) -> Result<String, SessionError>;

    fn verify(&self, jwt: &JwtOptions, token: &str) -> Result<Value, SessionError>;
}

/// Fill in `iss`, `aud`, `iat`, `exp` and `jti`, then sign.
pub fn issue_access_token(
    provider: &dyn JwtProvider,
    jwt: &JwtOptions,
    subject: &str,
    email: &str,
) -> Result<String, SessionError> {
    let now = Utc::now().timestamp();
    let exp = now + jwt.access_token_expires_in.as_secs() as i64;

    let mut claims = Map::new();
    claims.insert("sub".to_string(), Value::String(subject.to_string()));
    claims.insert("email".to_string(), Value::String(email.to_string()));
    claims.insert("iss".to_string(), Value::String(jwt.issuer.clone()));
    claims.insert("aud".to_string(), json!(jwt.audience));
    claims.insert("iat".to_string(), Value::Number(now.into()));
    claims.insert("exp".to_string(), Value::Number(exp.into()));
    claims.insert("jti".to_string(), Value::String(Uuid::new_v4().to_string()));

    provider.sign(jwt, claims)
}

#[cfg(not(any(feature = "jwt-aws-lc-rs", feature = "jwt-rust-crypto")))]
struct NoJwtProvider;

#[cfg(not(any(feature = "jwt-aws-lc-rs", feature = "jwt-rust-crypto")))]
impl JwtProvider for NoJwtProvider {
    fn sign(&self, _jwt: &JwtOptions, _claims: Map<String, Value>) -> Result<String, SessionError> {
        Err(SessionError::NotConfigured(
            "JWT support is disabled (enable one of: jwt-aws-lc-rs, jwt-rust-crypto)".to_string(),
        ))
    }

    fn verify(&self, _jwt: &JwtOptions, _token: &str) -> Result<Value, SessionError> {
        Err(SessionError::NotConfigured(
            "JWT support is disabled (enable one of: jwt-aws-lc-rs, jwt-rust-crypto)".to_string(),
        ))
    }
}

#[cfg(any(feature = "jwt-aws-lc-rs", feature = "jwt-rust-crypto"))]
struct JsonwebtokenProvider;

#[cfg(any(feature = "jwt-aws-lc-rs", feature = "jwt-rust-crypto"))]
impl JsonwebtokenProvider {
    fn algorithm(alg: JwtAlgorithm) -> jsonwebtoken::Algorithm {
        match alg {
            JwtAlgorithm::HS256 => jsonwebtoken::Algorithm::HS256,
            JwtAlgorithm::HS384 => jsonwebtoken::Algorithm::HS384,
            JwtAlgorithm::HS512 => jsonwebtoken::Algorithm::HS512,
        }
    }

    fn secret(jwt: &JwtOptions) -> Result<&[u8], SessionError> {
        jwt.secret
            .as_deref()
            .map(str::as_bytes)
            .ok_or_else(|| SessionError::NotConfigured("JWT secret is not configured".to_string()))
    }
}

#[cfg(any(feature = "jwt-aws-lc-rs", feature = "jwt-rust-crypto"))]
impl JwtProvider for JsonwebtokenProvider {
    fn sign(&self, jwt: &JwtOptions, claims: Map<String, Value>) -> Result<String, SessionError> {
        use jsonwebtoken::{encode, EncodingKey, Header};

        let header = Header::new(Self::algorithm(jwt.algorithm));
        encode(&header, &claims, &EncodingKey::from_secret(Self::secret(jwt)?))
            .map_err(|e| SessionError::InvalidToken(e.to_string()))
    }

    fn verify(&self, jwt: &JwtOptions, token: &str) -> Result<Value, SessionError> {
        use jsonwebtoken::errors::ErrorKind;
        use jsonwebtoken::{decode, DecodingKey, Validation};

        let mut validation = Validation::new(Self::algorithm(jwt.algorithm));
        validation.set_issuer(&[jwt.issuer.as_str()]);
        validation.set_audience(&jwt.audience.iter().map(|s| s.as_str()).collect::<Vec<_>>());
        validation.set_required_spec_claims(&["exp", "sub", "iss", "aud"]);
        validation.leeway = jwt.leeway.as_secs();

        let decoded = decode::<Value>(token, &DecodingKey::from_secret(Self::secret(jwt)?), &validation)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => SessionError::Expired,
                _ => SessionError::InvalidToken(e.to_string()),
            })?;

        Ok(decoded.claims)
    }
}

/// The provider compiled in for the selected crypto backend.
pub fn default_jwt_provider() -> std::sync::Arc<dyn JwtProvider> {
    #[cfg(any(feature = "jwt-aws-lc-rs", feature = "jwt-rust-crypto"))]
    {
        std::sync::Arc::new(JsonwebtokenProvider)
    }
    #[cfg(not(any(feature = "jwt-aws-lc-rs", feature = "jwt-rust-crypto")))]
    {
        std::sync::Arc::new(NoJwtProvider)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bearer_parsing() {
        let mut h = HashMap::new();
        h.insert("Authorization".to_string(), "Bearer abc.def ".to_string());
        assert_eq!(extract_bearer_token(&h).as_deref(), Some("abc.def"));

        h.insert("Authorization".to_string(), "Basic xyz".to_string());
        assert_eq!(extract_bearer_token(&h), None);

        h.insert("Authorization".to_string(), "Bearer ".to_string());
        assert_eq!(extract_bearer_token(&h), None);

        let mut map = http::HeaderMap::new();
        map.insert(http::header::AUTHORIZATION, http::HeaderValue::from_static("bearer t0k"));
        assert_eq!(bearer_from_header_map(&map).as_deref(), Some("t0k"));
    }

    #[cfg(any(feature = "jwt-aws-lc-rs", feature = "jwt-rust-crypto"))]
    #[test]
    fn signed_tokens_verify_against_the_same_options() {
        let jwt = JwtOptions {
            secret: Some("0123456789abcdef0123".to_string()),
            ..JwtOptions::default()
        };
        let provider = default_jwt_provider();
        let token = issue_access_token(provider.as_ref(), &jwt, "user-1", "a@example.com").unwrap();
        let claims = provider.verify(&jwt, &token).unwrap();
        assert_eq!(claims["sub"], "user-1");

        let other = JwtOptions {
            issuer: "someone-else".to_string(),
            ..jwt.clone()
        };
        assert!(matches!(provider.verify(&other, &token), Err(SessionError::InvalidToken(_))));
    }
}
