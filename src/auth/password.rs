use anyhow::{Context, Result};
use argon2::{
    Algorithm, Argon2, Params, Version,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use tokio::task;

use crate::config::SecurityConfig;

/// Hash a secret with Argon2id using the configured cost parameters.
/// Note: This uses `spawn_blocking` because Argon2 hashing is CPU-intensive
/// and would block the async runtime if run directly.
pub async fn hash(secret: String, config: SecurityConfig) -> Result<String> {
    task::spawn_blocking(move || hash_sync(&secret, &config))
        .await
        .context("Password hashing task panicked")?
}

/// Verify a secret against a stored hash on the blocking pool.
pub async fn verify(secret: String, stored_hash: String) -> Result<bool> {
    let matches = task::spawn_blocking(move || verify_sync(&secret, &stored_hash))
        .await
        .context("Password verification task panicked")?;

    Ok(matches)
}

pub fn hash_sync(secret: &str, config: &SecurityConfig) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);

    let params = Params::new(
        config.argon2_memory_cost_kib,
        config.argon2_time_cost,
        config.argon2_parallelism,
        None, // output length (use default)
    )
    .map_err(|e| anyhow::anyhow!("Invalid Argon2 params: {e}"))?;

    let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, params);

    let hash = argon2
        .hash_password(secret.as_bytes(), &salt)
        .map_err(|e| anyhow::anyhow!("Failed to hash password: {e}"))?;

    Ok(hash.to_string())
}

/// A malformed stored hash verifies as false rather than erroring, so
/// the caller cannot tell it apart from a wrong secret.
#[must_use]
pub fn verify_sync(secret: &str, stored_hash: &str) -> bool {
    let Ok(parsed_hash) = PasswordHash::new(stored_hash) else {
        return false;
    };

    // Cost params come from the hash string itself.
    Argon2::default()
        .verify_password(secret.as_bytes(), &parsed_hash)
        .is_ok()
}
