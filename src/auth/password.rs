use argon2::{
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use rand::rngs::OsRng;
use tracing::error;

pub fn hash_password(plain: &str) -> anyhow::Result<String> {
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

pub fn verify_password(plain: &str, hash: &str) -> anyhow::Result<bool> {
    let parsed = PasswordHash::new(hash).map_err(|e| {
        error!(error = %e, "argon2 parse hash error");
        anyhow::anyhow!(e.to_string())
    })?;
    Ok(Argon2::default()
        .verify_password(plain.as_bytes(), &parsed)
        .is_ok())
}

/// Registration password policy: at least 8 characters, with one uppercase,
/// one lowercase and one digit. Returns the message to surface on failure.
pub fn check_password_policy(plain: &str) -> Result<(), &'static str> {
    if plain.len() < 8 {
        return Err("password must be at least 8 characters long");
    }
    let has_upper = plain.chars().any(|c| c.is_ascii_uppercase());
    let has_lower = plain.chars().any(|c| c.is_ascii_lowercase());
    let has_digit = plain.chars().any(|c| c.is_ascii_digit());
    if !(has_upper && has_lower && has_digit) {
        return Err("password must contain an uppercase letter, a lowercase letter and a digit");
    }
    Ok(())
}
