//! JWT token generation and verification.
//!
//! Every token is HS256 with `sub`, `type`, `iat` and `exp` claims. Expiry is
//! checked here against the verifier's own clock with no leeway, so
//! `jsonwebtoken`'s own `exp` validation is switched off.

use std::fmt;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{DateTime, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use rand::distr::Alphanumeric;
use rand::{Rng, rng};
use thiserror::Error;
use tracing::{info, warn};

use crate::models::auth::{TokenClaims, TokenKind, VerifiedToken};

/// Token codec failures.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TokenError {
    #[error("token is malformed")]
    Malformed,

    #[error("token signature is invalid")]
    SignatureInvalid,

    #[error("token has expired")]
    Expired,

    #[error("token has the wrong type")]
    WrongKind,

    #[error("token encode: {0}")]
    Encode(String),
}

/// Signs and verifies access and refresh tokens.
#[derive(Clone)]
pub struct TokenCodec {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
}

impl fmt::Debug for TokenCodec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenCodec").finish_non_exhaustive()
    }
}

impl TokenCodec {
    pub fn new(secret: &[u8]) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false;
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp", "sub"]);
        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            validation,
        }
    }

    /// Issue a token for `subject` that expires `ttl` from now.
    pub fn issue(&self, subject: i64, kind: TokenKind, ttl: Duration) -> Result<String, TokenError> {
        self.issue_at(subject, kind, ttl, Utc::now())
    }

    /// Issue a token as if the current time were `now`.
    pub fn issue_at(
        &self,
        subject: i64,
        kind: TokenKind,
        ttl: Duration,
        now: DateTime<Utc>,
    ) -> Result<String, TokenError> {
        let ttl = chrono::Duration::from_std(ttl)
            .map_err(|e| TokenError::Encode(format!("ttl out of range: {e}")))?;
        let exp = now
            .checked_add_signed(ttl)
            .ok_or_else(|| TokenError::Encode("ttl overflows the expiry timestamp".into()))?;
        let claims = TokenClaims {
            sub: subject.to_string(),
            kind,
            iat: now.timestamp(),
            exp: exp.timestamp(),
        };
        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| TokenError::Encode(format!("jwt encode: {e}")))
    }

    /// Verify signature, shape and expiry. All-or-nothing.
    pub fn verify(&self, token: &str) -> Result<VerifiedToken, TokenError> {
        self.verify_at(token, Utc::now())
    }

    /// Verify as if the current time were `now`.
    pub fn verify_at(&self, token: &str, now: DateTime<Utc>) -> Result<VerifiedToken, TokenError> {
        let claims = decode::<TokenClaims>(token, &self.decoding, &self.validation)
            .map_err(|e| match e.kind() {
                ErrorKind::InvalidSignature => TokenError::SignatureInvalid,
                ErrorKind::ExpiredSignature => TokenError::Expired,
                _ => TokenError::Malformed,
            })?
            .claims;

        if now.timestamp() > claims.exp {
            return Err(TokenError::Expired);
        }

        let subject = claims.sub.parse::<i64>().map_err(|_| TokenError::Malformed)?;
        Ok(VerifiedToken {
            subject,
            kind: claims.kind,
        })
    }

    /// Verify and require a specific kind, returning the subject.
    pub fn verify_as(&self, token: &str, expected: TokenKind) -> Result<i64, TokenError> {
        let verified = self.verify(token)?;
        if verified.kind != expected {
            return Err(TokenError::WrongKind);
        }
        Ok(verified.subject)
    }
}

/// Resolve the JWT secret: env var `JWT_SECRET`, then `AUTH_SECRET`, then
/// the secret persisted under the data directory (generated on first use).
pub fn resolve_jwt_secret() -> String {
    ["JWT_SECRET", "AUTH_SECRET"]
        .into_iter()
        .find_map(|name| std::env::var(name).ok().filter(|secret| !secret.is_empty()))
        .unwrap_or_else(|| load_or_generate_secret(&jwt_secret_path()))
}

fn jwt_secret_path() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("keyhole")
        .join("jwt-secret")
}

/// Read the secret at `path`, or generate one and try to store it there.
///
/// A secret that cannot be stored is still returned, but tokens signed with
/// it stop verifying after a restart.
fn load_or_generate_secret(path: &Path) -> String {
    if let Ok(existing) = fs::read_to_string(path) {
        let trimmed = existing.trim();
        if !trimmed.is_empty() {
            return trimmed.to_string();
        }
    }

    let secret: String = rng()
        .sample_iter(&Alphanumeric)
        .take(64)
        .map(char::from)
        .collect();
    match persist_secret(path, &secret) {
        Ok(()) => info!(path = %path.display(), "generated new JWT secret"),
        Err(e) => warn!(
            path = %path.display(),
            error = %e,
            "generated JWT secret could not be saved, issued tokens will not survive a restart"
        ),
    }
    secret
}

fn persist_secret(path: &Path, secret: &str) -> io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let mut options = fs::OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }
    options.open(path)?.write_all(secret.as_bytes())
}
