//! Vault lock state.

use serde::{Deserialize, Serialize};

/// Represents the current state of the vault.
///
/// The vault transitions between these states:
/// - `NotSetup` → `Unlocked` (after creating the Master Password)
/// - `Unlocked` → `Locked` (manual lock or inactivity timeout)
/// - `Locked` → `Unlocked` (after entering the Master Password)
#[derive(Default, Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub enum VaultStatus {
    /// No Master Password has been created yet (first run)
    #[default]
    NotSetup,
    /// Vault exists but is locked (requires the Master Password)
    Locked,
    /// Vault is open and passwords can be decrypted
    Unlocked,
}

impl std::fmt::Display for VaultStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotSetup => write!(f, "NotSetup"),
            Self::Locked => write!(f, "Locked"),
            Self::Unlocked => write!(f, "Unlocked"),
        }
    }
}
