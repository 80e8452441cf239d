//! Password Hashing and Verification
//!
//! Credential hashing for account passwords:
//! - Argon2id hashing with a configurable work factor
//! - Server-side pepper appended to the plaintext before hashing
//! - Zeroization of plaintext and peppered buffers
//! - Strength assessment (length and character classes)
//!
//! Verification fails closed: a malformed digest or any error from the
//! primitive is reported as "does not match", never as a panic.

use std::fmt;

use argon2::{
    Algorithm, Argon2, Params, PasswordHash, PasswordHasher, PasswordVerifier, Version,
    password_hash::SaltString,
};
use rand::rngs::OsRng;
use thiserror::Error;
use unicode_normalization::UnicodeNormalization;
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

// ============================================================================
// Constants
// ============================================================================

/// Minimum password length, counted in characters
pub const MIN_PASSWORD_LENGTH: usize = 12;

// ============================================================================
// Error Types
// ============================================================================

/// Password strength rule violations, in the order they are checked
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PasswordPolicyError {
    #[error("Password must be at least {min} characters long (got {actual})")]
    TooShort { min: usize, actual: usize },

    #[error("Password must contain at least one uppercase letter")]
    MissingUppercase,

    #[error("Password must contain at least one lowercase letter")]
    MissingLowercase,

    #[error("Password must contain at least one digit")]
    MissingDigit,

    #[error("Password must contain at least one symbol or punctuation character")]
    MissingSymbol,
}

/// Password hashing errors
#[derive(Debug, Error)]
pub enum PasswordHashError {
    /// Work factor rejected by Argon2
    #[error("Invalid hash cost: {0}")]
    InvalidCost(String),

    #[error("Password hashing failed: {0}")]
    HashingFailed(String),
}

// ============================================================================
// Strength assessment
// ============================================================================

/// Outcome of [`assess_strength`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StrengthAssessment {
    pub ok: bool,
    /// Explanation of the first failing rule
    pub reason: Option<String>,
}

/// Check a candidate password against the strength rules
///
/// Rules, first failure wins: length, uppercase, lowercase, digit, symbol.
pub fn check_policy(plaintext: &str) -> Result<(), PasswordPolicyError> {
    let actual = plaintext.chars().count();
    if actual < MIN_PASSWORD_LENGTH {
        return Err(PasswordPolicyError::TooShort {
            min: MIN_PASSWORD_LENGTH,
            actual,
        });
    }
    if !plaintext.chars().any(char::is_uppercase) {
        return Err(PasswordPolicyError::MissingUppercase);
    }
    if !plaintext.chars().any(char::is_lowercase) {
        return Err(PasswordPolicyError::MissingLowercase);
    }
    if !plaintext.chars().any(|c| c.is_ascii_digit()) {
        return Err(PasswordPolicyError::MissingDigit);
    }
    if !plaintext.chars().any(is_symbol) {
        return Err(PasswordPolicyError::MissingSymbol);
    }
    Ok(())
}

/// [`check_policy`] flattened into an `(ok, reason)` pair
pub fn assess_strength(plaintext: &str) -> StrengthAssessment {
    match check_policy(plaintext) {
        Ok(()) => StrengthAssessment {
            ok: true,
            reason: None,
        },
        Err(e) => StrengthAssessment {
            ok: false,
            reason: Some(e.to_string()),
        },
    }
}

fn is_symbol(c: char) -> bool {
    !c.is_alphanumeric() && !c.is_whitespace()
}

// ============================================================================
// Clear Text Password (Zeroized on drop)
// ============================================================================

/// Clear text password with automatic memory zeroization
///
/// Input is NFKC-normalized so visually identical passwords typed on
/// different keyboards hash the same. Not `Clone`, and `Debug` is redacted.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct ClearTextPassword(String);

impl ClearTextPassword {
    pub fn new(raw: impl Into<String>) -> Self {
        let mut raw = raw.into();
        let normalized: String = raw.nfkc().collect();
        raw.zeroize();
        Self(normalized)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub(crate) fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }

    pub fn assess_strength(&self) -> StrengthAssessment {
        assess_strength(&self.0)
    }
}

impl fmt::Debug for ClearTextPassword {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ClearTextPassword")
            .field(&"[REDACTED]")
            .finish()
    }
}

// ============================================================================
// Hashed Password (Safe to store)
// ============================================================================

/// Argon2id digest in PHC string format (algorithm, version, params, salt, hash)
#[derive(Clone, PartialEq, Eq)]
pub struct HashedPassword {
    hash: String,
}

impl HashedPassword {
    /// Wrap a stored value without parsing it.
    /// A malformed value simply never verifies.
    pub fn from_db(s: impl Into<String>) -> Self {
        Self { hash: s.into() }
    }

    pub fn as_phc_string(&self) -> &str {
        &self.hash
    }
}

impl fmt::Debug for HashedPassword {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HashedPassword")
            .field("hash", &"[HASH]")
            .finish()
    }
}

// ============================================================================
// Hasher
// ============================================================================

/// Argon2id work factor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HashCost {
    /// Memory in KiB
    pub memory_kib: u32,
    pub iterations: u32,
    pub parallelism: u32,
}

impl Default for HashCost {
    /// 64 MiB, t=3, p=1: several hundred milliseconds on commodity hardware,
    /// comparable to bcrypt at cost 14.
    fn default() -> Self {
        Self {
            memory_kib: 64 * 1024,
            iterations: 3,
            parallelism: 1,
        }
    }
}

impl HashCost {
    /// Smallest parameters Argon2 accepts. Tests only.
    pub fn minimal() -> Self {
        Self {
            memory_kib: Params::MIN_M_COST,
            iterations: Params::MIN_T_COST,
            parallelism: Params::MIN_P_COST,
        }
    }

    fn params(&self) -> Result<Params, PasswordHashError> {
        Params::new(self.memory_kib, self.iterations, self.parallelism, None)
            .map_err(|e| PasswordHashError::InvalidCost(e.to_string()))
    }
}

/// Peppered Argon2id credential hasher
///
/// ```rust
/// use platform::password::{ClearTextPassword, CredentialHasher, HashCost};
///
/// let hasher = CredentialHasher::new(b"server-pepper".to_vec(), HashCost::minimal()).unwrap();
/// let password = ClearTextPassword::new("Valid123Pass!");
/// let digest = hasher.hash(&password).unwrap();
/// assert!(hasher.verify(&password, &digest));
/// ```
#[derive(Clone)]
pub struct CredentialHasher {
    pepper: Zeroizing<Vec<u8>>,
    cost: HashCost,
    params: Params,
}

impl CredentialHasher {
    /// Fails only if the cost is outside what Argon2 accepts.
    pub fn new(pepper: Vec<u8>, cost: HashCost) -> Result<Self, PasswordHashError> {
        let params = cost.params()?;
        Ok(Self {
            pepper: Zeroizing::new(pepper),
            cost,
            params,
        })
    }

    pub fn cost(&self) -> HashCost {
        self.cost
    }

    fn argon2(&self) -> Argon2<'static> {
        Argon2::new(Algorithm::Argon2id, Version::V0x13, self.params.clone())
    }

    /// plaintext || pepper
    fn peppered(&self, password: &ClearTextPassword) -> Zeroizing<Vec<u8>> {
        let mut combined = Zeroizing::new(Vec::with_capacity(
            password.as_bytes().len() + self.pepper.len(),
        ));
        combined.extend_from_slice(password.as_bytes());
        combined.extend_from_slice(&self.pepper);
        combined
    }

    /// Hash a password with a fresh 16-byte random salt
    pub fn hash(&self, password: &ClearTextPassword) -> Result<HashedPassword, PasswordHashError> {
        let salt = SaltString::generate(&mut OsRng);
        let combined = self.peppered(password);

        let hash = self
            .argon2()
            .hash_password(&combined, &salt)
            .map_err(|e| PasswordHashError::HashingFailed(e.to_string()))?;

        Ok(HashedPassword {
            hash: hash.to_string(),
        })
    }

    /// Check a password against a stored digest.
    ///
    /// Parameters are read from the digest itself, so digests produced under
    /// an older cost still verify.
    pub fn verify(&self, password: &ClearTextPassword, digest: &HashedPassword) -> bool {
        let parsed_hash = match PasswordHash::new(&digest.hash) {
            Ok(h) => h,
            Err(_) => {
                tracing::warn!("Stored password hash is not a valid PHC string");
                return false;
            }
        };

        if parsed_hash.algorithm != Algorithm::Argon2id.ident() {
            return false;
        }

        let combined = self.peppered(password);

        // constant-time comparison happens inside argon2
        self.argon2()
            .verify_password(&combined, &parsed_hash)
            .is_ok()
    }

    /// True if the digest was produced with another algorithm or a weaker cost
    pub fn needs_rehash(&self, digest: &HashedPassword) -> bool {
        let parsed_hash = match PasswordHash::new(&digest.hash) {
            Ok(h) => h,
            Err(_) => return true,
        };

        if parsed_hash.algorithm != Algorithm::Argon2id.ident() {
            return true;
        }

        match Params::try_from(&parsed_hash) {
            Ok(stored) => {
                stored.m_cost() < self.params.m_cost()
                    || stored.t_cost() < self.params.t_cost()
                    || stored.p_cost() < self.params.p_cost()
            }
            Err(_) => true,
        }
    }
}

impl fmt::Debug for CredentialHasher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialHasher")
            .field("pepper", &"[REDACTED]")
            .field("cost", &self.cost)
            .finish()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn hasher(pepper: &[u8]) -> CredentialHasher {
        CredentialHasher::new(pepper.to_vec(), HashCost::minimal()).unwrap()
    }

    #[test]
    fn test_strength_too_short() {
        let result = assess_strength("short1!");
        assert!(!result.ok);
        assert!(result.reason.unwrap().contains("at least 12"));
        assert!(matches!(
            check_policy("short1!"),
            Err(PasswordPolicyError::TooShort { min: 12, actual: 7 })
        ));
    }

    #[test]
    fn test_strength_missing_digit() {
        let result = assess_strength("NoDigits!!!!");
        assert!(!result.ok);
        assert_eq!(
            check_policy("NoDigits!!!!"),
            Err(PasswordPolicyError::MissingDigit)
        );
    }

    #[test]
    fn test_strength_valid() {
        let result = assess_strength("Valid123Pass!");
        assert!(result.ok);
        assert!(result.reason.is_none());
    }

    #[test]
    fn test_strength_rule_order() {
        assert_eq!(
            check_policy("alllowercase1!"),
            Err(PasswordPolicyError::MissingUppercase)
        );
        assert_eq!(
            check_policy("ALLUPPERCASE1!"),
            Err(PasswordPolicyError::MissingLowercase)
        );
        assert_eq!(
            check_policy("NoSymbolsHere123"),
            Err(PasswordPolicyError::MissingSymbol)
        );
        // too short wins even when every class is missing
        assert!(matches!(
            check_policy("aaaa"),
            Err(PasswordPolicyError::TooShort { .. })
        ));
    }

    #[test]
    fn test_strength_counts_characters_not_bytes() {
        // 11 characters, more than 12 bytes
        assert!(matches!(
            check_policy("Ääääää123!x"),
            Err(PasswordPolicyError::TooShort { actual: 11, .. })
        ));
    }

    #[test]
    fn test_hash_and_verify() {
        let hasher = hasher(b"pepper");
        let password = ClearTextPassword::new("Valid123Pass!");
        let digest = hasher.hash(&password).unwrap();

        assert!(digest.as_phc_string().starts_with("$argon2id$"));
        assert!(hasher.verify(&password, &digest));
        assert!(!hasher.verify(&ClearTextPassword::new("Wrong123Pass!"), &digest));
    }

    #[test]
    fn test_pepper_is_part_of_the_digest() {
        let password = ClearTextPassword::new("Valid123Pass!");
        let digest = hasher(b"pepper-a").hash(&password).unwrap();

        assert!(hasher(b"pepper-a").verify(&password, &digest));
        assert!(!hasher(b"pepper-b").verify(&password, &digest));
        assert!(!hasher(b"").verify(&password, &digest));
    }

    #[test]
    fn test_salts_differ() {
        let hasher = hasher(b"pepper");
        let password = ClearTextPassword::new("Valid123Pass!");
        let a = hasher.hash(&password).unwrap();
        let b = hasher.hash(&password).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_malformed_digest_fails_closed() {
        let hasher = hasher(b"pepper");
        let password = ClearTextPassword::new("Valid123Pass!");
        assert!(!hasher.verify(&password, &HashedPassword::from_db("not_a_hash")));
        assert!(!hasher.verify(&password, &HashedPassword::from_db("")));
    }

    #[test]
    fn test_needs_rehash() {
        let password = ClearTextPassword::new("Valid123Pass!");
        let weak = hasher(b"pepper").hash(&password).unwrap();

        let strong = CredentialHasher::new(
            b"pepper".to_vec(),
            HashCost {
                memory_kib: 1024,
                iterations: 2,
                parallelism: 1,
            },
        )
        .unwrap();

        assert!(strong.needs_rehash(&weak));
        assert!(!hasher(b"pepper").needs_rehash(&weak));
        assert!(strong.needs_rehash(&HashedPassword::from_db("garbage")));
        // older digests keep verifying after the cost is raised
        assert!(strong.verify(&password, &weak));
    }

    #[test]
    fn test_invalid_cost_rejected() {
        let cost = HashCost {
            memory_kib: 1,
            iterations: 0,
            parallelism: 0,
        };
        assert!(matches!(
            CredentialHasher::new(b"p".to_vec(), cost),
            Err(PasswordHashError::InvalidCost(_))
        ));
    }

    #[test]
    fn test_debug_redaction() {
        let password = ClearTextPassword::new("Valid123Pass!");
        let debug_output = format!("{:?}", password);
        assert!(debug_output.contains("REDACTED"));
        assert!(!debug_output.contains("Valid123"));

        let hasher = hasher(b"super-secret-pepper");
        assert!(!format!("{:?}", hasher).contains("super-secret"));
    }

    #[test]
    fn test_nfkc_normalization() {
        // fullwidth letters normalize to ASCII
        let a = ClearTextPassword::new("Ｖａｌｉｄ123Pass!");
        assert_eq!(a.as_str(), "Valid123Pass!");
    }
}
