use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use cja::Result;
use color_eyre::eyre::eyre;
use rand::{distributions::Alphanumeric, Rng as _};

pub(crate) const TOKEN_LENGTH: usize = 40;

pub(crate) fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();

    let hash = argon2
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| eyre!("Failed to hash password: {e}"))?;

    Ok(hash.to_string())
}

pub(crate) fn verify_password(password: &str, password_hash: &str) -> Result<bool> {
    let argon2 = Argon2::default();
    let parsed_hash =
        PasswordHash::new(password_hash).map_err(|e| eyre!("Stored password hash is invalid: {e}"))?;

    Ok(argon2
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok())
}

pub(crate) fn generate_token() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(TOKEN_LENGTH)
        .map(char::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_and_verify() {
        let hash = hash_password("correct horse").unwrap();

        assert_ne!(hash, "correct horse");
        assert!(verify_password("correct horse", &hash).unwrap());
        assert!(!verify_password("battery staple", &hash).unwrap());
    }

    #[test]
    fn test_hashes_are_salted() {
        assert_ne!(
            hash_password("secret").unwrap(),
            hash_password("secret").unwrap()
        );
    }

    #[test]
    fn test_garbage_hash_is_an_error() {
        assert!(verify_password("secret", "not-a-hash").is_err());
    }

    #[test]
    fn test_tokens_are_alphanumeric() {
        let token = generate_token();

        assert_eq!(token.len(), TOKEN_LENGTH);
        assert!(token.chars().all(|c| c.is_ascii_alphanumeric()));
        assert_ne!(token, generate_token());
    }
}
