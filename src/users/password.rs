use argon2::{
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use rand::rngs::OsRng;
use tracing::error;

/// Hash a plaintext password into a PHC-encoded argon2 digest.
///
/// Runs on the blocking pool so a burst of registrations cannot stall
/// request scheduling.
pub async fn hash_password(plain: &str) -> anyhow::Result<String> {
    let plain = plain.to_owned();
    tokio::task::spawn_blocking(move || hash_blocking(&plain)).await?
}

/// Check a plaintext password against a stored digest. A digest that does
/// not parse is an error, never a failed verification.
pub async fn verify_password(plain: &str, digest: &str) -> anyhow::Result<bool> {
    let plain = plain.to_owned();
    let digest = digest.to_owned();
    tokio::task::spawn_blocking(move || verify_blocking(&plain, &digest)).await?
}

fn hash_blocking(plain: &str) -> anyhow::Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();
    let hash = argon2
        .hash_password(plain.as_bytes(), &salt)
        .map_err(|e| {
            error!(error = %e, "argon2 hash_password error");
            anyhow::anyhow!(e.to_string())
        })?
        .to_string();
    Ok(hash)
}

fn verify_blocking(plain: &str, digest: &str) -> anyhow::Result<bool> {
    let parsed = PasswordHash::new(digest).map_err(|e| {
        error!(error = %e, "argon2 parse hash error");
        anyhow::anyhow!(e.to_string())
    })?;
    Ok(Argon2::default()
        .verify_password(plain.as_bytes(), &parsed)
        .is_ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn hash_and_verify_roundtrip() {
        let password = "Secur3P@ssw0rd!";
        let hash = hash_password(password).await.expect("hashing should succeed");
        assert!(verify_password(password, &hash)
            .await
            .expect("verify should succeed"));
    }

    #[tokio::test]
    async fn verify_rejects_wrong_password() {
        let password = "correct-horse-battery-staple";
        let hash = hash_password(password).await.expect("hashing should succeed");
        assert!(!verify_password("wrong-password", &hash)
            .await
            .expect("verify should not error"));
    }

    #[tokio::test]
    async fn verify_errors_on_malformed_hash() {
        let err = verify_password("anything", "not-a-valid-hash")
            .await
            .unwrap_err();
        assert!(!err.to_string().is_empty());
    }
}
