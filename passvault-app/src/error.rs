use thiserror::Error;

use crate::vault::VaultError;

#[derive(Error, Debug)]
pub enum PassVaultError {
    #[error(transparent)]
    Vault(#[from] VaultError),

    #[error("Generator error: {0}")]
    Generator(String),

    #[error("Clipboard error: {0}")]
    Clipboard(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl serde::Serialize for PassVaultError {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        match self {
            // Vault errors carry their own code for callers
            PassVaultError::Vault(err) => err.serialize(serializer),
            other => serializer.serialize_str(&other.to_string()),
        }
    }
}

pub type Result<T> = std::result::Result<T, PassVaultError>;
