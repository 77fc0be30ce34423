/// Password hashing for login credentials
///
/// Hashes are Argon2id PHC strings (64 MB, 3 passes, 4 lanes) stored in the
/// `credentials` table next to the login email.
///
/// # Example
///
/// ```
/// use postal_shared::auth::password::{hash_password, verify_password};
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let hash = hash_password("Parcel#2024")?;
/// assert!(verify_password("Parcel#2024", &hash)?);
/// assert!(!verify_password("parcel#2024", &hash)?);
/// # Ok(())
/// # }
/// ```

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2, ParamsBuilder, Version,
};

#[derive(Debug, thiserror::Error)]
pub enum PasswordError {
    #[error("Failed to hash password: {0}")]
    HashError(String),

    #[error("Failed to verify password: {0}")]
    VerifyError(String),

    #[error("Invalid password hash format: {0}")]
    InvalidHash(String),
}

/// Reasons a new password is refused
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum WeakPassword {
    #[error("Password must be at least {} characters", MIN_PASSWORD_LENGTH)]
    TooShort,

    #[error("Password must be at most {} characters", MAX_PASSWORD_LENGTH)]
    TooLong,

    #[error("Password must contain a letter and a digit")]
    MissingCharacterClass,
}

pub const MIN_PASSWORD_LENGTH: usize = 8;
pub const MAX_PASSWORD_LENGTH: usize = 128;

fn argon2() -> Result<Argon2<'static>, PasswordError> {
    let params = ParamsBuilder::new()
        .m_cost(65536)
        .t_cost(3)
        .p_cost(4)
        .output_len(32)
        .build()
        .map_err(|e| PasswordError::HashError(format!("Invalid parameters: {}", e)))?;

    Ok(Argon2::new(argon2::Algorithm::Argon2id, Version::V0x13, params))
}

pub fn hash_password(password: &str) -> Result<String, PasswordError> {
    let salt = SaltString::generate(&mut OsRng);

    argon2()?
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| PasswordError::HashError(format!("Hash generation failed: {}", e)))
}

/// Constant-time check of `password` against a stored PHC hash
pub fn verify_password(password: &str, hash: &str) -> Result<bool, PasswordError> {
    let parsed = PasswordHash::new(hash).map_err(|e| PasswordError::InvalidHash(e.to_string()))?;

    match Argon2::default().verify_password(password.as_bytes(), &parsed) {
        Ok(()) => Ok(true),
        Err(argon2::password_hash::Error::Password) => Ok(false),
        Err(e) => Err(PasswordError::VerifyError(e.to_string())),
    }
}

/// Length bounds plus at least one letter and one digit
pub fn validate_password_strength(password: &str) -> Result<(), WeakPassword> {
    let length = password.chars().count();
    if length < MIN_PASSWORD_LENGTH {
        return Err(WeakPassword::TooShort);
    }
    if length > MAX_PASSWORD_LENGTH {
        return Err(WeakPassword::TooLong);
    }

    let has_letter = password.chars().any(char::is_alphabetic);
    let has_digit = password.chars().any(|c| c.is_ascii_digit());
    if !(has_letter && has_digit) {
        return Err(WeakPassword::MissingCharacterClass);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_password() {
        let hash = hash_password("Parcel#2024").expect("Should hash password");

        assert!(hash.starts_with("$argon2id$"));
        assert!(hash.contains("m=65536,t=3,p=4"));
    }

    #[test]
    fn test_hash_uses_fresh_salt() {
        let a = hash_password("same-password-1").unwrap();
        let b = hash_password("same-password-1").unwrap();
        assert_ne!(a, b);
        assert!(verify_password("same-password-1", &a).unwrap());
        assert!(verify_password("same-password-1", &b).unwrap());
    }

    #[test]
    fn test_verify_password_incorrect() {
        let hash = hash_password("Parcel#2024").unwrap();
        assert!(!verify_password("Parcel#2025", &hash).unwrap());
        assert!(!verify_password("", &hash).unwrap());
    }

    #[test]
    fn test_verify_password_invalid_hash() {
        assert!(matches!(
            verify_password("anything", "not-a-phc-string"),
            Err(PasswordError::InvalidHash(_))
        ));
    }

    #[test]
    fn test_validate_password_strength() {
        assert!(validate_password_strength("harbour42").is_ok());
        assert!(validate_password_strength("Ünïcødé9x").is_ok());

        assert_eq!(validate_password_strength("ab1"), Err(WeakPassword::TooShort));
        assert_eq!(
            validate_password_strength(&"a1".repeat(65)),
            Err(WeakPassword::TooLong)
        );
        assert_eq!(
            validate_password_strength("onlyletters"),
            Err(WeakPassword::MissingCharacterClass)
        );
        assert_eq!(
            validate_password_strength("1234567890"),
            Err(WeakPassword::MissingCharacterClass)
        );
    }

    #[test]
    fn test_weak_password_message() {
        assert_eq!(
            WeakPassword::TooShort.to_string(),
            "Password must be at least 8 characters"
        );
    }
}
