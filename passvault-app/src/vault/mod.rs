//! Encrypted credential vault.
//!
//! Credentials live in a local SQLite database (`vault.db`). Each password
//! is sealed with AES-256-GCM under a key derived from the Master Password
//! via Argon2id and the per-vault salt in `salt.key`.

pub mod auth;
pub mod credential;
pub mod database;
pub mod error;
pub mod manager;
pub mod salt;

pub use auth::VaultStatus;
pub use credential::{Credential, CredentialInput, CredentialPatch, CredentialSummary};
pub use error::{VaultError, VaultResult};
pub use manager::VaultManager;
