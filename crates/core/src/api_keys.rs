//! API key generation, hashing, and permission names.
//!
//! A key is `pbr_` followed by random alphanumerics. Only two derived values
//! are stored: a short display prefix (used to find the row) and an Argon2id
//! hash of the full key (used to verify it). The prefix alone never
//! authenticates anything.

use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use rand::Rng;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Literal prefix every issued key starts with.
pub const KEY_PREFIX: &str = "pbr_";

/// Number of random alphanumeric characters after [`KEY_PREFIX`].
pub const KEY_RANDOM_LENGTH: usize = 40;

/// Number of leading characters stored as the lookup/display prefix.
pub const KEY_DISPLAY_PREFIX_LENGTH: usize = 12;

/// Known permission names. Keys can only be issued with these.
pub mod permissions {
    pub const LEADS_CREATE: &str = "leads:create";
    pub const CONTACTS_READ: &str = "contacts:read";
    pub const EMAILS_LOG: &str = "emails:log";

    pub const ALL: &[&str] = &[LEADS_CREATE, CONTACTS_READ, EMAILS_LOG];
}

/// Check whether `permission` is a known permission name.
pub fn is_known_permission(permission: &str) -> bool {
    permissions::ALL.contains(&permission)
}

/// Check whether a granted permission list includes `required`.
pub fn has_permission(granted: &[String], required: &str) -> bool {
    granted.iter().any(|p| p == required)
}

// ---------------------------------------------------------------------------
// Generation
// ---------------------------------------------------------------------------

/// The result of generating a new API key.
pub struct GeneratedApiKey {
    /// The plaintext key (shown to the user exactly once, never stored).
    pub plaintext: String,
    /// The first [`KEY_DISPLAY_PREFIX_LENGTH`] characters of the key.
    pub prefix: String,
    /// Argon2id PHC string of the full key.
    pub hash: String,
}

/// Generate a new random API key with its display prefix and hash.
pub fn generate_api_key() -> Result<GeneratedApiKey, argon2::password_hash::Error> {
    let random: String = rand::rng()
        .sample_iter(&rand::distr::Alphanumeric)
        .take(KEY_RANDOM_LENGTH)
        .map(char::from)
        .collect();
    let plaintext = format!("{KEY_PREFIX}{random}");

    let prefix = plaintext[..KEY_DISPLAY_PREFIX_LENGTH].to_string();
    let hash = hash_api_key(&plaintext)?;

    Ok(GeneratedApiKey {
        plaintext,
        prefix,
        hash,
    })
}

// ---------------------------------------------------------------------------
// Hashing / verification
// ---------------------------------------------------------------------------

/// Hash a full API key with Argon2id and a random salt.
pub fn hash_api_key(key: &str) -> Result<String, argon2::password_hash::Error> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default().hash_password(key.as_bytes(), &salt)?;
    Ok(hash.to_string())
}

/// Verify a presented key against a stored hash.
///
/// Argon2 compares digests in constant time. A malformed stored hash counts
/// as a mismatch.
pub fn verify_api_key(key: &str, stored_hash: &str) -> bool {
    match PasswordHash::new(stored_hash) {
        Ok(parsed) => Argon2::default()
            .verify_password(key.as_bytes(), &parsed)
            .is_ok(),
        Err(_) => false,
    }
}

/// Return the lookup prefix of a presented key, or `None` when the key does
/// not start with [`KEY_PREFIX`] or is too short to carry a full prefix.
pub fn lookup_prefix(key: &str) -> Option<&str> {
    if !key.starts_with(KEY_PREFIX) || key.len() < KEY_DISPLAY_PREFIX_LENGTH {
        return None;
    }
    key.get(..KEY_DISPLAY_PREFIX_LENGTH)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
