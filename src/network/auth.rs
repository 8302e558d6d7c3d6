//! Access Guard
//!
//! Stateless admin sessions over HS256 JWTs.
//! The server issues a token on login and verifies signature, expiry and
//! identity on every mutation. Nothing is stored server side, so a token
//! stays valid until it expires even after logout.

use std::time::Duration;

use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use crate::core::digest::{digests_match, hash_with_domain, token_fingerprint, Digest256, IDENTITY_DOMAIN, SECRET_DOMAIN};

/// Default admin identity.
pub const DEFAULT_ADMIN_USER: &str = "admin";

/// Default admin secret.
pub const DEFAULT_ADMIN_PASS: &str = "password";

/// Default signing key.
pub const DEFAULT_AUTH_SECRET: &str = "change_this_secret";

/// Default token lifetime (24 hours).
pub const DEFAULT_TOKEN_MAX_AGE: Duration = Duration::from_secs(24 * 60 * 60);

/// Authentication configuration.
#[derive(Clone, Debug)]
pub struct AuthConfig {
    /// The single admin identity.
    pub identity: String,
    /// The admin secret.
    pub secret: String,
    /// HS256 signing key.
    pub signing_key: String,
    /// Lifetime of issued tokens.
    pub token_max_age: Duration,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            identity: DEFAULT_ADMIN_USER.into(),
            secret: DEFAULT_ADMIN_PASS.into(),
            signing_key: DEFAULT_AUTH_SECRET.into(),
            token_max_age: DEFAULT_TOKEN_MAX_AGE,
        }
    }
}

impl AuthConfig {
    /// Create config from environment variables.
    ///
    /// `TOKEN_MAX_AGE` is in milliseconds.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            identity: std::env::var("ADMIN_USER").unwrap_or(defaults.identity),
            secret: std::env::var("ADMIN_PASS").unwrap_or(defaults.secret),
            signing_key: std::env::var("AUTH_SECRET").unwrap_or(defaults.signing_key),
            token_max_age: std::env::var("TOKEN_MAX_AGE")
                .ok()
                .and_then(|v| v.trim().parse::<u64>().ok())
                .map(Duration::from_millis)
                .unwrap_or(defaults.token_max_age),
        }
    }

    /// Check if any built-in default credential is still in use.
    pub fn uses_defaults(&self) -> bool {
        self.secret == DEFAULT_ADMIN_PASS || self.signing_key == DEFAULT_AUTH_SECRET
    }
}

/// Claims carried by an admin token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenClaims {
    /// Admin identity.
    pub sub: String,
    /// Expiry timestamp (Unix seconds).
    pub exp: u64,
    /// Issued at timestamp.
    #[serde(default)]
    pub iat: u64,
    /// Token id, for correlating log lines.
    #[serde(default)]
    pub jti: String,
}

/// A freshly issued token.
#[derive(Debug, Clone)]
pub struct IssuedToken {
    /// Encoded JWT.
    pub token: String,
    /// Claims inside it.
    pub claims: TokenClaims,
}

/// Authentication errors.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Identity or secret did not match.
    #[error("invalid credentials")]
    InvalidCredentials,
    /// No token presented.
    #[error("missing token")]
    MissingToken,
    /// Token format is invalid.
    #[error("invalid token format")]
    InvalidFormat,
    /// Token signature verification failed.
    #[error("invalid signature")]
    InvalidSignature,
    /// Token has expired.
    #[error("token expired")]
    Expired,
    /// Token was issued for someone other than the admin.
    #[error("token identity mismatch")]
    WrongIdentity,
    /// Signing failed.
    #[error("encode error: {0}")]
    EncodeError(String),
    /// JWT decoding error.
    #[error("decode error: {0}")]
    DecodeError(String),
}

/// Issues and verifies admin tokens.
pub struct AccessGuard {
    config: AuthConfig,
    identity_digest: Digest256,
    secret_digest: Digest256,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
}

impl AccessGuard {
    /// Create a guard for the configured admin.
    pub fn new(config: AuthConfig) -> Self {
        Self {
            identity_digest: hash_with_domain(IDENTITY_DOMAIN, config.identity.as_bytes()),
            secret_digest: hash_with_domain(SECRET_DOMAIN, config.secret.as_bytes()),
            encoding_key: EncodingKey::from_secret(config.signing_key.as_bytes()),
            decoding_key: DecodingKey::from_secret(config.signing_key.as_bytes()),
            config,
        }
    }

    /// Configured admin identity.
    pub fn identity(&self) -> &str {
        &self.config.identity
    }

    /// Check credentials and issue a token.
    pub fn login(&self, identity: &str, secret: &str) -> Result<IssuedToken, AuthError> {
        self.login_at(identity, secret, unix_now())
    }

    /// [`login`](Self::login) with an explicit clock.
    pub fn login_at(&self, identity: &str, secret: &str, now: u64) -> Result<IssuedToken, AuthError> {
        // Evaluate both so a wrong identity costs the same as a wrong secret
        let identity_ok = digests_match(
            &hash_with_domain(IDENTITY_DOMAIN, identity.as_bytes()),
            &self.identity_digest,
        );
        let secret_ok = digests_match(
            &hash_with_domain(SECRET_DOMAIN, secret.as_bytes()),
            &self.secret_digest,
        );
        if !(identity_ok && secret_ok) {
            warn!("Rejected login attempt");
            return Err(AuthError::InvalidCredentials);
        }

        let claims = TokenClaims {
            sub: self.config.identity.clone(),
            exp: now.saturating_add(self.max_age_secs()),
            iat: now,
            jti: uuid::Uuid::new_v4().to_string(),
        };
        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| AuthError::EncodeError(e.to_string()))?;

        debug!(jti = %claims.jti, fingerprint = %token_fingerprint(&token), "Issued admin token");
        Ok(IssuedToken { token, claims })
    }

    /// Token lifetime in whole seconds. `exp` has one-second resolution,
    /// so a sub-second remainder rounds up.
    fn max_age_secs(&self) -> u64 {
        let secs = self.config.token_max_age.as_millis().div_ceil(1000);
        u64::try_from(secs).unwrap_or(u64::MAX)
    }

    /// Validate a token and extract claims.
    pub fn verify(&self, token: &str) -> Result<TokenClaims, AuthError> {
        self.verify_at(token, unix_now())
    }

    /// [`verify`](Self::verify) with an explicit clock.
    pub fn verify_at(&self, token: &str, now: u64) -> Result<TokenClaims, AuthError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_required_spec_claims(&["exp", "sub"]);
        validation.validate_aud = false;
        // Expiry is checked below against `now`, with zero leeway
        validation.validate_exp = false;

        let claims = decode::<TokenClaims>(token, &self.decoding_key, &validation)
            .map_err(map_jwt_error)?
            .claims;

        if now > claims.exp {
            return Err(AuthError::Expired);
        }

        let identity_ok = digests_match(
            &hash_with_domain(IDENTITY_DOMAIN, claims.sub.as_bytes()),
            &self.identity_digest,
        );
        if !identity_ok {
            return Err(AuthError::WrongIdentity);
        }

        Ok(claims)
    }

    /// Gate for mutation requests: a token must be present and valid.
    pub fn authorize(&self, token: Option<&str>) -> Result<TokenClaims, AuthError> {
        let token = token.ok_or(AuthError::MissingToken)?;
        self.verify(token).map_err(|e| {
            debug!(fingerprint = %token_fingerprint(token), "Token rejected: {}", e);
            e
        })
    }
}

/// Current Unix time in seconds.
pub fn unix_now() -> u64 {
    u64::try_from(chrono::Utc::now().timestamp()).unwrap_or(0)
}

/// Map JWT library errors to our error type.
fn map_jwt_error(err: jsonwebtoken::errors::Error) -> AuthError {
    use jsonwebtoken::errors::ErrorKind;
    match err.kind() {
        ErrorKind::ExpiredSignature => AuthError::Expired,
        ErrorKind::InvalidSignature => AuthError::InvalidSignature,
        ErrorKind::InvalidToken | ErrorKind::Base64(_) | ErrorKind::Json(_) | ErrorKind::Utf8(_) => {
            AuthError::InvalidFormat
        }
        _ => AuthError::DecodeError(err.to_string()),
    }
}

// =============================================================================
// TESTS
// =============================================================================
