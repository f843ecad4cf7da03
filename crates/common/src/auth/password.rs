//! Password hashing and the registration password policy.

use crate::config::PasswordPolicyConfig;
use crate::errors::{AppError, Result};
use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Algorithm, Argon2, Params, Version,
};
use std::sync::OnceLock;

static ABSENT_ACCOUNT_HASH: OnceLock<String> = OnceLock::new();

/// Argon2id with memory = 19456 KiB, iterations = 2, parallelism = 1
fn argon2_instance() -> Result<Argon2<'static>> {
    let params = Params::new(19456, 2, 1, None).map_err(|e| AppError::Internal {
        message: format!("Invalid argon2 parameters: {}", e),
    })?;
    Ok(Argon2::new(Algorithm::Argon2id, Version::V0x13, params))
}

/// Hash a password into a PHC string
pub fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = argon2_instance()?
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| AppError::Internal {
            message: format!("Failed to hash password: {}", e),
        })?;
    Ok(hash.to_string())
}

/// Verify a password against a PHC string
pub fn verify_password(password: &str, hash: &str) -> Result<bool> {
    let parsed = PasswordHash::new(hash).map_err(|e| AppError::Internal {
        message: format!("Stored password hash is malformed: {}", e),
    })?;
    Ok(argon2_instance()?
        .verify_password(password.as_bytes(), &parsed)
        .is_ok())
}

/// Stand-in hash for logins whose email matches no account
fn absent_account_hash() -> Result<&'static str> {
    if let Some(hash) = ABSENT_ACCOUNT_HASH.get() {
        return Ok(hash.as_str());
    }
    let hash = hash_password("casebook-absent-account")?;
    Ok(ABSENT_ACCOUNT_HASH.get_or_init(|| hash).as_str())
}

/// Run a full verification for an unknown email so it costs the same as a
/// wrong password. Always `false`.
pub fn verify_absent_account(password: &str) -> Result<bool> {
    verify_password(password, absent_account_hash()?)?;
    Ok(false)
}

/// Runs CPU-bound hashing on the blocking pool.
pub async fn blocking<T, F>(f: F) -> Result<T>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T> + Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| AppError::Internal {
            message: format!("Password hashing task failed: {}", e),
        })?
}

/// Strength rules applied when an account is created
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PasswordPolicy {
    pub required_length: usize,
    pub require_digit: bool,
    pub require_lowercase: bool,
    pub require_uppercase: bool,
    pub require_non_alphanumeric: bool,
}

impl Default for PasswordPolicy {
    fn default() -> Self {
        Self::from(&PasswordPolicyConfig::default())
    }
}

impl From<&PasswordPolicyConfig> for PasswordPolicy {
    fn from(config: &PasswordPolicyConfig) -> Self {
        Self {
            required_length: config.required_length,
            require_digit: config.require_digit,
            require_lowercase: config.require_lowercase,
            require_uppercase: config.require_uppercase,
            require_non_alphanumeric: config.require_non_alphanumeric,
        }
    }
}

impl PasswordPolicy {
    /// Every rule the password fails, in a stable order
    pub fn violations(&self, password: &str) -> Vec<String> {
        let mut violations = Vec::new();

        if password.chars().count() < self.required_length {
            violations.push(format!(
                "Passwords must be at least {} characters.",
                self.required_length
            ));
        }
        if self.require_non_alphanumeric && password.chars().all(|c| c.is_ascii_alphanumeric()) {
            violations.push("Passwords must have at least one non alphanumeric character.".to_string());
        }
        if self.require_digit && !password.chars().any(|c| c.is_ascii_digit()) {
            violations.push("Passwords must have at least one digit ('0'-'9').".to_string());
        }
        if self.require_lowercase && !password.chars().any(|c| c.is_ascii_lowercase()) {
            violations.push("Passwords must have at least one lowercase ('a'-'z').".to_string());
        }
        if self.require_uppercase && !password.chars().any(|c| c.is_ascii_uppercase()) {
            violations.push("Passwords must have at least one uppercase ('A'-'Z').".to_string());
        }

        violations
    }

    pub fn check(&self, password: &str) -> Result<()> {
        let violations = self.violations(password);
        if violations.is_empty() {
            Ok(())
        } else {
            Err(AppError::PasswordPolicy { violations })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_and_verify() {
        let hashed = hash_password("Str0ng!pw").unwrap();
        assert!(hashed.starts_with("$argon2id$"));
        assert!(verify_password("Str0ng!pw", &hashed).unwrap());
        assert!(!verify_password("Str0ng!px", &hashed).unwrap());
    }

    #[test]
    fn test_hashes_are_salted() {
        assert_ne!(hash_password("same").unwrap(), hash_password("same").unwrap());
    }

    #[test]
    fn test_malformed_hash_is_an_error() {
        assert!(verify_password("x", "not-a-phc-string").is_err());
    }

    #[test]
    fn test_absent_account_never_verifies() {
        assert!(!verify_absent_account("casebook-absent-account").unwrap());
        assert!(!verify_absent_account("Str0ng!pw").unwrap());

        let hash = absent_account_hash().unwrap();
        assert!(hash.starts_with("$argon2id$v=19$m=19456,t=2,p=1$"));
        assert_eq!(absent_account_hash().unwrap(), hash);
    }

    #[tokio::test]
    async fn test_blocking_runs_off_the_runtime() {
        let verified = blocking(|| verify_absent_account("x")).await.unwrap();
        assert!(!verified);
    }

    #[test]
    fn test_strong_password_passes() {
        assert!(PasswordPolicy::default().check("Str0ng!pw").is_ok());
    }

    #[test]
    fn test_each_rule_reported() {
        let policy = PasswordPolicy::default();
        assert_eq!(policy.violations("Weak1!").len(), 1);
        assert_eq!(policy.violations("").len(), 5);
        assert_eq!(
            policy.violations("alllowercase"),
            vec![
                "Passwords must have at least one non alphanumeric character.".to_string(),
                "Passwords must have at least one digit ('0'-'9').".to_string(),
                "Passwords must have at least one uppercase ('A'-'Z').".to_string(),
            ]
        );
    }

    #[test]
    fn test_relaxed_policy() {
        let policy = PasswordPolicy {
            required_length: 4,
            require_digit: false,
            require_lowercase: true,
            require_uppercase: false,
            require_non_alphanumeric: false,
        };
        assert!(policy.check("abcd").is_ok());
        assert!(policy.check("ABCD").is_err());
    }
}
