//! Vault-specific error types for credential storage operations.
//!
//! Errors are granular enough that the CLI and the interactive shell can
//! show a precise message and pick the right follow-up (re-prompt for the
//! Master Password, point at `init`, and so on).

use thiserror::Error;

/// Errors that can occur during vault operations.
#[derive(Error, Debug)]
pub enum VaultError {
    /// The Master Password does not match the stored verifier.
    #[error("Incorrect Master Password")]
    InvalidPassword,

    /// No Master Password has been created yet.
    /// User needs to run first-time setup.
    #[error("Vault not set up")]
    NotSetup,

    /// The vault is locked and requires the Master Password.
    #[error("Vault is locked")]
    Locked,

    /// Setup was requested but a Master Password already exists.
    #[error("Vault already exists")]
    AlreadyExists,

    #[error("Please enter a password")]
    EmptyPassword,

    #[error("Passwords do not match")]
    PasswordMismatch,

    /// The chosen Master Password fails the strength policy.
    #[error("{0}")]
    WeakPassword(String),

    /// A required credential field is missing or malformed.
    #[error("{0}")]
    InvalidInput(String),

    #[error("Credential {0} not found")]
    CredentialNotFound(i64),

    /// Stored data could not be interpreted.
    #[error("Vault data is corrupted: {0}")]
    Corrupted(String),

    #[error("Encryption error: {0}")]
    Encryption(String),

    #[error("Decryption failed: {0}")]
    Decryption(String),

    /// Key derivation failed (Argon2 error).
    #[error("Key derivation failed: {0}")]
    KeyDerivation(String),

    /// The salt file is missing or invalid.
    #[error("Salt error: {0}")]
    Salt(String),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl VaultError {
    /// Stable machine-readable code, used by `--json` output.
    pub fn code(&self) -> &'static str {
        match self {
            VaultError::InvalidPassword => "INVALID_PASSWORD",
            VaultError::NotSetup => "NOT_SETUP",
            VaultError::Locked => "LOCKED",
            VaultError::AlreadyExists => "ALREADY_EXISTS",
            VaultError::EmptyPassword => "EMPTY_PASSWORD",
            VaultError::PasswordMismatch => "PASSWORD_MISMATCH",
            VaultError::WeakPassword(_) => "WEAK_PASSWORD",
            VaultError::InvalidInput(_) => "INVALID_INPUT",
            VaultError::CredentialNotFound(_) => "NOT_FOUND",
            VaultError::Corrupted(_) => "CORRUPTED",
            VaultError::Encryption(_) => "ENCRYPTION_ERROR",
            VaultError::Decryption(_) => "DECRYPTION_ERROR",
            VaultError::KeyDerivation(_) => "KEY_DERIVATION_ERROR",
            VaultError::Salt(_) => "SALT_ERROR",
            VaultError::Database(_) => "DATABASE_ERROR",
            VaultError::Io(_) => "IO_ERROR",
            VaultError::Serialization(_) => "SERIALIZATION_ERROR",
        }
    }
}

/// Result type alias for vault operations.
pub type VaultResult<T> = std::result::Result<T, VaultError>;

// ============================================================================
// Serialization for JSON output
// ============================================================================

impl serde::Serialize for VaultError {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        use serde::ser::SerializeStruct;

        let mut state = serializer.serialize_struct("VaultError", 2)?;
        state.serialize_field("code", self.code())?;
        state.serialize_field("message", &self.to_string())?;
        state.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PassVaultError;

    #[test]
    fn test_vault_error_into_app_error() {
        let app_err: PassVaultError = VaultError::InvalidPassword.into();
        assert!(matches!(
            app_err,
            PassVaultError::Vault(VaultError::InvalidPassword)
        ));
        assert_eq!(app_err.to_string(), "Incorrect Master Password");
    }

    #[test]
    fn test_vault_error_serialization() {
        let err = VaultError::Locked;
        let json = serde_json::to_string(&err).unwrap();
        assert!(json.contains("LOCKED"));
        assert!(json.contains("Vault is locked"));
    }

    #[test]
    fn test_app_error_serializes_vault_code() {
        let err = PassVaultError::from(VaultError::CredentialNotFound(7));
        let json = serde_json::to_string(&err).unwrap();
        assert!(json.contains("NOT_FOUND"));
        assert!(json.contains("Credential 7 not found"));
    }
}
