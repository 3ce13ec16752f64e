use anyhow::Context;
use argon2::{
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use rand::rngs::OsRng;
use tokio::sync::OnceCell;
use tracing::error;

static DUMMY_HASH: OnceCell<String> = OnceCell::const_new();

/// Argon2id PHC string for `plain` with a fresh random salt.
/// Runs on the blocking pool so request workers are not stalled by the KDF.
pub async fn hash_password(plain: String) -> anyhow::Result<String> {
    tokio::task::spawn_blocking(move || {
        let salt = SaltString::generate(&mut OsRng);
        Argon2::default()
            .hash_password(plain.as_bytes(), &salt)
            .map(|h| h.to_string())
            .map_err(|e| {
                error!(error = %e, "argon2 hash_password error");
                anyhow::anyhow!("hash password: {e}")
            })
    })
    .await
    .context("password hashing task")?
}

/// `Ok(false)` on mismatch; `Err` only when the stored hash itself is unreadable.
pub async fn verify_password(plain: String, stored: String) -> anyhow::Result<bool> {
    tokio::task::spawn_blocking(move || {
        let parsed = PasswordHash::new(&stored).map_err(|e| {
            error!(error = %e, "argon2 parse hash error");
            anyhow::anyhow!("parse stored hash: {e}")
        })?;
        Ok(Argon2::default()
            .verify_password(plain.as_bytes(), &parsed)
            .is_ok())
    })
    .await
    .context("password verification task")?
}

/// Spend one verification's worth of Argon2 work against a throwaway hash, so a
/// login for an unknown username costs the same as a wrong password.
pub async fn verify_dummy(plain: String) -> anyhow::Result<()> {
    let hash = DUMMY_HASH
        .get_or_try_init(|| hash_password("no-such-user-placeholder".into()))
        .await?;
    verify_password(plain, hash.clone()).await?;
    Ok(())
}
