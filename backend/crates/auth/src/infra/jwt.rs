//! RS256 Token Codec
//!
//! Issues and verifies signed session tokens. Only RS256 is accepted;
//! `none` and HMAC tokens fail verification even if otherwise well formed.
//! Expiry is checked by the JWT library with zero leeway and again against
//! an explicit clock reading after decode.

use std::path::Path;
use std::time::Duration;

use chrono::{DateTime, Utc};
use jsonwebtoken::errors::ErrorKind as JwtErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use rsa::pkcs1::{DecodeRsaPrivateKey, DecodeRsaPublicKey};
use rsa::pkcs8::{DecodePrivateKey, DecodePublicKey};
use rsa::traits::PublicKeyParts;
use rsa::{RsaPrivateKey, RsaPublicKey};
use thiserror::Error;

use crate::domain::entity::claims::{Claims, TokenPayload};

/// Smallest accepted RSA modulus
pub const MIN_RSA_KEY_BITS: usize = 2048;

/// Default lifetime for session tokens
pub const DEFAULT_TOKEN_TTL: Duration = Duration::from_secs(15 * 60);

#[derive(Debug, Error)]
pub enum TokenError {
    #[error("Failed to read key file {path}: {source}")]
    KeyRead {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid RSA key: {0}")]
    KeyParse(String),

    #[error("RSA key is {bits} bits; at least {min} required")]
    KeyTooSmall { bits: usize, min: usize },

    #[error("Private and public keys do not form a pair")]
    KeyMismatch,

    #[error("Failed to sign token: {0}")]
    Signing(String),

    #[error("Token is malformed")]
    Malformed,

    #[error("Token signature is invalid")]
    InvalidSignature,

    #[error("Token has expired")]
    Expired,

    #[error("Token is missing required claim: {0}")]
    MissingClaim(String),
}

impl TokenError {
    /// Errors that mean the codec itself is unusable
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            TokenError::KeyRead { .. }
                | TokenError::KeyParse(_)
                | TokenError::KeyTooSmall { .. }
                | TokenError::KeyMismatch
                | TokenError::Signing(_)
        )
    }
}

impl From<jsonwebtoken::errors::Error> for TokenError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        match err.kind() {
            JwtErrorKind::InvalidSignature | JwtErrorKind::InvalidAlgorithm => {
                TokenError::InvalidSignature
            }
            JwtErrorKind::ExpiredSignature => TokenError::Expired,
            JwtErrorKind::MissingRequiredClaim(claim) => TokenError::MissingClaim(claim.clone()),
            _ => TokenError::Malformed,
        }
    }
}

/// A freshly signed token
#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

pub struct TokenCodec {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    default_ttl: Duration,
}

impl TokenCodec {
    /// Build a codec from PEM-encoded keys (PKCS#8 or PKCS#1).
    ///
    /// Fails unless both keys parse, form a pair, and the modulus is at
    /// least [`MIN_RSA_KEY_BITS`].
    pub fn from_pem(
        private_pem: &[u8],
        public_pem: &[u8],
        default_ttl: Duration,
    ) -> Result<Self, TokenError> {
        let public = parse_public_key(public_pem)?;
        let bits = public.size() * 8;
        if bits < MIN_RSA_KEY_BITS {
            return Err(TokenError::KeyTooSmall {
                bits,
                min: MIN_RSA_KEY_BITS,
            });
        }

        let private = parse_private_key(private_pem)?;
        if RsaPublicKey::from(&private) != public {
            return Err(TokenError::KeyMismatch);
        }

        let encoding_key = EncodingKey::from_rsa_pem(private_pem)
            .map_err(|e| TokenError::KeyParse(e.to_string()))?;
        let decoding_key = DecodingKey::from_rsa_pem(public_pem)
            .map_err(|e| TokenError::KeyParse(e.to_string()))?;

        let mut validation = Validation::new(Algorithm::RS256);
        validation.leeway = 0;
        validation.validate_exp = true;
        validation.validate_aud = false;
        validation.set_required_spec_claims(&["exp"]);

        Ok(Self {
            encoding_key,
            decoding_key,
            validation,
            default_ttl,
        })
    }

    /// Load PEM keys from disk
    pub async fn load(
        private_key_path: impl AsRef<Path>,
        public_key_path: impl AsRef<Path>,
        default_ttl: Duration,
    ) -> Result<Self, TokenError> {
        let private_pem = read_key(private_key_path.as_ref()).await?;
        let public_pem = read_key(public_key_path.as_ref()).await?;
        Self::from_pem(&private_pem, &public_pem, default_ttl)
    }

    pub fn default_ttl(&self) -> Duration {
        self.default_ttl
    }

    /// Sign `claims` with the default lifetime
    pub fn issue_default(&self, claims: &Claims) -> Result<IssuedToken, TokenError> {
        self.issue(claims, self.default_ttl)
    }

    pub fn issue(&self, claims: &Claims, ttl: Duration) -> Result<IssuedToken, TokenError> {
        self.issue_at(claims, ttl, Utc::now())
    }

    /// Sign `claims` as if issued at `now`
    pub fn issue_at(
        &self,
        claims: &Claims,
        ttl: Duration,
        now: DateTime<Utc>,
    ) -> Result<IssuedToken, TokenError> {
        let ttl = chrono::Duration::from_std(ttl)
            .map_err(|e| TokenError::Signing(format!("token lifetime out of range: {e}")))?;

        // JWT timestamps have whole-second precision
        let issued_at = DateTime::from_timestamp(now.timestamp(), 0).unwrap_or(now);
        let expires_at = issued_at
            .checked_add_signed(ttl)
            .ok_or_else(|| TokenError::Signing("token lifetime out of range".to_string()))?;

        let payload = TokenPayload {
            claims: claims.clone(),
            expires_at,
            issued_at,
        };

        let token = encode(&Header::new(Algorithm::RS256), &payload, &self.encoding_key)
            .map_err(|e| TokenError::Signing(e.to_string()))?;

        Ok(IssuedToken { token, expires_at })
    }

    pub fn verify(&self, token: &str) -> Result<TokenPayload, TokenError> {
        self.verify_at(token, Utc::now())
    }

    /// Verify signature and claims, treating `now` as the current time
    pub fn verify_at(&self, token: &str, now: DateTime<Utc>) -> Result<TokenPayload, TokenError> {
        let data = decode::<TokenPayload>(token, &self.decoding_key, &self.validation)?;
        let payload = data.claims;

        if payload.expires_at <= now {
            return Err(TokenError::Expired);
        }

        Ok(payload)
    }
}

impl std::fmt::Debug for TokenCodec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenCodec")
            .field("algorithm", &Algorithm::RS256)
            .field("default_ttl", &self.default_ttl)
            .finish_non_exhaustive()
    }
}

async fn read_key(path: &Path) -> Result<Vec<u8>, TokenError> {
    tokio::fs::read(path).await.map_err(|source| TokenError::KeyRead {
        path: path.display().to_string(),
        source,
    })
}

fn pem_text(pem: &[u8]) -> Result<&str, TokenError> {
    std::str::from_utf8(pem).map_err(|_| TokenError::KeyParse("PEM is not valid UTF-8".into()))
}

fn parse_public_key(pem: &[u8]) -> Result<RsaPublicKey, TokenError> {
    let text = pem_text(pem)?;
    RsaPublicKey::from_public_key_pem(text)
        .or_else(|_| RsaPublicKey::from_pkcs1_pem(text))
        .map_err(|e| TokenError::KeyParse(format!("public key: {e}")))
}

fn parse_private_key(pem: &[u8]) -> Result<RsaPrivateKey, TokenError> {
    let text = pem_text(pem)?;
    RsaPrivateKey::from_pkcs8_pem(text)
        .or_else(|_| RsaPrivateKey::from_pkcs1_pem(text))
        .map_err(|e| TokenError::KeyParse(format!("private key: {e}")))
}
