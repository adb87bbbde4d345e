// Session verification options.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use grc_core::GrcConfigSnapshot;

/// JWT signing algorithms accepted for access tokens
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub enum JwtAlgorithm {
    /// HMAC using SHA-256
    #[default]
    HS256,
    /// HMAC using SHA-384
    HS384,
    /// HMAC using SHA-512
    HS512,
}

impl JwtAlgorithm {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "HS256" => Some(Self::HS256),
            "HS384" => Some(Self::HS384),
            "HS512" => Some(Self::HS512),
            _ => None,
        }
    }
}

/// JWT-specific configuration options
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct JwtOptions {
    pub algorithm: JwtAlgorithm,
    /// Expected `iss` claim
    pub issuer: String,
    /// Accepted `aud` values
    pub audience: Vec<String>,
    /// Shared HMAC secret
    pub secret: Option<String>,
    /// Lifetime of tokens issued by [`crate::JwtProvider::sign`]
    pub access_token_expires_in: Duration,
    /// Clock skew tolerated when checking `exp`
    pub leeway: Duration,
}

impl Default for JwtOptions {
    fn default() -> Self {
        Self {
            algorithm: JwtAlgorithm::default(),
            issuer: "grc-identity".to_string(),
            audience: vec!["grc-workspace".to_string()],
            secret: None,
            access_token_expires_in: Duration::from_secs(3600),
            leeway: Duration::from_secs(30),
        }
    }
}

impl JwtOptions {
    pub fn validate(&self) -> Result<(), String> {
        if self.issuer.is_empty() {
            return Err("JWT issuer cannot be empty".to_string());
        }

        if self.audience.is_empty() || self.audience.iter().any(|a| a.trim().is_empty()) {
            return Err("JWT audience cannot be empty".to_string());
        }

        match self.secret.as_deref() {
            None => return Err("HMAC algorithms require a secret".to_string()),
            Some(s) if s.len() < 16 => return Err("JWT secret must be at least 16 bytes".to_string()),
            Some(_) => {}
        }

        if self.access_token_expires_in.as_secs() == 0 {
            return Err("Access token expiration must be greater than 0".to_string());
        }

        Ok(())
    }
}

/// Authentication configuration for the shell
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct AuthOptions {
    pub jwt: JwtOptions,
}

impl AuthOptions {
    pub fn validate(&self) -> Result<(), String> {
        self.jwt.validate().map_err(|e| format!("JWT validation failed: {}", e))
    }

    pub fn builder() -> AuthOptionsBuilder {
        AuthOptionsBuilder::new()
    }

    /// Read `auth.jwt.*` keys. Missing or unparsable values keep defaults.
    pub fn from_snapshot(cfg: &GrcConfigSnapshot) -> Self {
        let mut jwt = JwtOptions::default();

        if let Some(alg) = cfg.get("auth.jwt.algorithm").and_then(JwtAlgorithm::parse) {
            jwt.algorithm = alg;
        }
        if let Some(iss) = cfg.get_string("auth.jwt.issuer").filter(|s| !s.is_empty()) {
            jwt.issuer = iss;
        }
        if let Some(aud) = cfg.get("auth.jwt.audience") {
            let aud: Vec<String> = aud
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(String::from)
                .collect();
            if !aud.is_empty() {
                jwt.audience = aud;
            }
        }
        jwt.secret = cfg.get_string("auth.jwt.secret").filter(|s| !s.is_empty());
        if let Some(secs) = cfg.get_usize("auth.jwt.expires_in_secs") {
            jwt.access_token_expires_in = Duration::from_secs(secs as u64);
        }
        if let Some(secs) = cfg.get_usize("auth.jwt.leeway_secs") {
            jwt.leeway = Duration::from_secs(secs as u64);
        }

        Self { jwt }
    }
}

/// Builder pattern for AuthOptions configuration
#[derive(Clone, Debug, Default)]
pub struct AuthOptionsBuilder {
    jwt: JwtOptions,
}

impl AuthOptionsBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn algorithm(mut self, algorithm: JwtAlgorithm) -> Self {
        self.jwt.algorithm = algorithm;
        self
    }

    pub fn issuer(mut self, issuer: impl Into<String>) -> Self {
        self.jwt.issuer = issuer.into();
        self
    }

    pub fn audience(mut self, audience: impl Into<String>) -> Self {
        self.jwt.audience = vec![audience.into()];
        self
    }

    pub fn secret(mut self, secret: impl Into<String>) -> Self {
        self.jwt.secret = Some(secret.into());
        self
    }

    pub fn expires_in(mut self, ttl: Duration) -> Self {
        self.jwt.access_token_expires_in = ttl;
        self
    }

    pub fn leeway(mut self, leeway: Duration) -> Self {
        self.jwt.leeway = leeway;
        self
    }

    pub fn build(self) -> AuthOptions {
        AuthOptions { jwt: self.jwt }
    }

    pub fn build_validated(self) -> Result<AuthOptions, String> {
        let options = self.build();
        options.validate()?;
        Ok(options)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use grc_core::GrcConfig;

    #[test]
    fn secret_is_required() {
        let err = AuthOptions::builder().build_validated().unwrap_err();
        assert!(err.contains("secret"), "{err}");
        assert!(AuthOptions::builder()
            .secret("0123456789abcdef0123")
            .build_validated()
            .is_ok());
        assert!(AuthOptions::builder().secret("short").build_validated().is_err());
    }

    #[test]
    fn reads_auth_keys_from_config() {
        let mut cfg = GrcConfig::new();
        cfg.set("auth.jwt.algorithm", "hs512");
        cfg.set("auth.jwt.audience", "grc-workspace, grc-admin");
        cfg.set("auth.jwt.secret", "0123456789abcdef0123");
        cfg.set("auth.jwt.expires_in_secs", "600");
        let opts = AuthOptions::from_snapshot(&cfg.snapshot());

        assert_eq!(opts.jwt.algorithm, JwtAlgorithm::HS512);
        assert_eq!(opts.jwt.audience, vec!["grc-workspace", "grc-admin"]);
        assert_eq!(opts.jwt.issuer, "grc-identity");
        assert_eq!(opts.jwt.access_token_expires_in, Duration::from_secs(600));
        assert!(opts.validate().is_ok());
    }
}
