use argon2::password_hash;
use argon2::{Argon2, PasswordHash, PasswordVerifier};
use secrecy::{ExposeSecret, Secret};

#[derive(thiserror::Error, Debug)]
pub enum PasswordError {
    #[error("the stored password hash is not a valid PHC string")]
    InvalidHash(#[source] password_hash::Error),
    #[error("failed to verify the password")]
    Verification(#[source] password_hash::Error),
}

/// Checks `candidate` against the Argon2 PHC string configured for the blog owner.
///
/// A mismatch is `Ok(false)`; only a broken hash or a hashing failure is an error.
pub fn verify_password(
    candidate: &Secret<String>,
    expected_hash: &Secret<String>,
) -> Result<bool, PasswordError> {
    let expected_hash =
        PasswordHash::new(expected_hash.expose_secret()).map_err(PasswordError::InvalidHash)?;

    match Argon2::default().verify_password(candidate.expose_secret().as_bytes(), &expected_hash) {
        Ok(()) => Ok(true),
        Err(password_hash::Error::Password) => Ok(false),
        Err(err) => Err(PasswordError::Verification(err)),
    }
}
