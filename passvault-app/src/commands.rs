//! User-facing operations shared by the one-shot CLI and the interactive
//! shell. Every successful call counts as activity for the auto-lock timer.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::Result;
use crate::security::{self, GeneratorOptions, StrengthEstimate};
use crate::state::AppState;
use crate::storage::{save_settings, AppSettings};
use crate::vault::{Credential, CredentialInput, CredentialPatch, CredentialSummary, VaultStatus};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneratedPassword {
    pub password: String,
    pub strength: StrengthEstimate,
}

// Vault lifecycle

pub async fn get_status(state: &AppState) -> Result<VaultStatus> {
    Ok(state.status().await?)
}

pub async fn setup_vault(state: &AppState, password: &str, confirm: &str) -> Result<()> {
    state.vault.lock().await.setup(password, confirm)?;
    state.touch().await;
    Ok(())
}

pub async fn unlock_vault(state: &AppState, password: &str) -> Result<()> {
    state.vault.lock().await.unlock(password)?;
    state.touch().await;
    Ok(())
}

pub async fn lock_vault(state: &AppState) -> Result<()> {
    state.lock().await;
    Ok(())
}

// Credentials

pub async fn add_credential(state: &AppState, input: CredentialInput) -> Result<i64> {
    let id = state.vault.lock().await.add_credential(input)?;
    state.touch().await;
    info!("Credential {} added", id);
    Ok(id)
}

pub async fn list_credentials(state: &AppState) -> Result<Vec<CredentialSummary>> {
    let credentials = state.vault.lock().await.list_credentials()?;
    state.touch().await;
    Ok(credentials)
}

pub async fn search_credentials(state: &AppState, query: &str) -> Result<Vec<CredentialSummary>> {
    let credentials = state.vault.lock().await.search_credentials(query)?;
    state.touch().await;
    Ok(credentials)
}

pub async fn get_credential(state: &AppState, id: i64) -> Result<Credential> {
    let credential = state.vault.lock().await.get_credential(id)?;
    state.touch().await;
    Ok(credential)
}

/// Copy a stored password; it is wiped after the configured delay.
/// Returns that delay.
pub async fn copy_password(state: &AppState, id: i64) -> Result<Duration> {
    let password = state.vault.lock().await.reveal_password(id)?;
    state.clipboard.copy_secret(&password)?;
    state.touch().await;
    Ok(state.clipboard.clear_after())
}

pub async fn copy_username(state: &AppState, id: i64) -> Result<String> {
    let username = state.vault.lock().await.get_credential(id)?.summary.username;
    state.clipboard.copy_text(&username)?;
    state.touch().await;
    Ok(username)
}

pub async fn update_credential(state: &AppState, id: i64, patch: CredentialPatch) -> Result<()> {
    state.vault.lock().await.update_credential(id, patch)?;
    state.touch().await;
    info!("Credential {} updated", id);
    Ok(())
}

pub async fn delete_credential(state: &AppState, id: i64) -> Result<()> {
    state.vault.lock().await.delete_credential(id)?;
    state.touch().await;
    info!("Credential {} deleted", id);
    Ok(())
}

// Generator

/// Generate a password with `options`, or the configured defaults.
pub async fn generate_password(
    state: &AppState,
    options: Option<GeneratorOptions>,
) -> Result<GeneratedPassword> {
    let options = match options {
        Some(options) => options,
        None => state.settings.read().await.default_generator,
    };
    let password = security::generate_password(&options)?;
    let strength = security::estimate_password_strength(&password);
    state.touch().await;
    Ok(GeneratedPassword { password, strength })
}

/// Copy a generated password with the same auto-clear as stored ones.
pub async fn copy_generated(state: &AppState, password: &str) -> Result<Duration> {
    state.clipboard.copy_secret(password)?;
    state.touch().await;
    Ok(state.clipboard.clear_after())
}

pub fn check_strength(password: &str) -> StrengthEstimate {
    security::estimate_password_strength(password)
}

// Maintenance

pub async fn change_master_password(
    state: &AppState,
    current: &str,
    new_password: &str,
    confirm: &str,
) -> Result<()> {
    state
        .vault
        .lock()
        .await
        .change_master_password(current, new_password, confirm)?;
    state.touch().await;
    Ok(())
}

pub async fn backup_vault(state: &AppState, dest_dir: &Path) -> Result<Vec<PathBuf>> {
    let written = state.vault.lock().await.backup(dest_dir)?;
    state.touch().await;
    Ok(written)
}

/// Factory reset: deletes every credential, the salt and the Master Password.
pub async fn reset_vault(state: &AppState) -> Result<()> {
    state.lock().await;
    state.vault.lock().await.destroy()?;
    Ok(())
}

pub async fn get_settings(state: &AppState) -> Result<AppSettings> {
    Ok(state.settings.read().await.clone())
}

pub async fn update_settings(state: &AppState, settings: AppSettings) -> Result<()> {
    save_settings(&state.paths, &settings)?;
    state.apply_settings(settings).await;
    state.touch().await;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::clipboard::{ClipboardBackend, MemoryClipboard};
    use crate::error::PassVaultError;
    use crate::security::KdfParams;
    use crate::storage::{load_settings, VaultPaths};
    use crate::vault::{VaultError, VaultManager};

    const MASTER: &str = "Correct-Horse-42";

    fn new_state(dir: &Path) -> (AppState, Arc<MemoryClipboard>) {
        let vault = VaultManager::open(VaultPaths::new(dir))
            .unwrap()
            .with_kdf_params(KdfParams::light());
        let clipboard = Arc::new(MemoryClipboard::new());
        let state = AppState::new(vault, AppSettings::default(), clipboard.clone());
        (state, clipboard)
    }

    fn bank() -> CredentialInput {
        CredentialInput {
            website: "Bank".into(),
            username: "me@example.com".into(),
            password: "Xy9!long-enough".into(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_full_session() {
        let tmp = tempfile::tempdir().unwrap();
        let (state, clipboard) = new_state(tmp.path());

        assert_eq!(get_status(&state).await.unwrap(), VaultStatus::NotSetup);
        setup_vault(&state, MASTER, MASTER).await.unwrap();

        let id = add_credential(&state, bank()).await.unwrap();
        assert_eq!(list_credentials(&state).await.unwrap().len(), 1);
        assert_eq!(search_credentials(&state, "bank").await.unwrap().len(), 1);

        let delay = copy_password(&state, id).await.unwrap();
        assert_eq!(delay, Duration::from_secs(30));
        assert_eq!(clipboard.get_text().unwrap().as_deref(), Some("Xy9!long-enough"));

        assert_eq!(copy_username(&state, id).await.unwrap(), "me@example.com");

        lock_vault(&state).await.unwrap();
        assert_eq!(clipboard.get_text().unwrap(), None);
        assert!(matches!(
            get_credential(&state, id).await,
            Err(PassVaultError::Vault(VaultError::Locked))
        ));

        unlock_vault(&state, MASTER).await.unwrap();
        assert_eq!(
            get_credential(&state, id).await.unwrap().password,
            "Xy9!long-enough"
        );
    }

    #[tokio::test]
    async fn test_edit_and_delete() {
        let tmp = tempfile::tempdir().unwrap();
        let (state, _) = new_state(tmp.path());
        setup_vault(&state, MASTER, MASTER).await.unwrap();
        let id = add_credential(&state, bank()).await.unwrap();

        update_credential(
            &state,
            id,
            CredentialPatch {
                website: Some("Savings Bank".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        assert_eq!(
            get_credential(&state, id).await.unwrap().summary.website,
            "Savings Bank"
        );

        delete_credential(&state, id).await.unwrap();
        assert!(list_credentials(&state).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_generate_uses_settings_defaults() {
        let tmp = tempfile::tempdir().unwrap();
        let (state, clipboard) = new_state(tmp.path());

        let mut settings = AppSettings::default();
        settings.default_generator.length = 40;
        update_settings(&state, settings.clone()).await.unwrap();
        assert_eq!(load_settings(&state.paths).unwrap(), settings);

        let generated = generate_password(&state, None).await.unwrap();
        assert_eq!(generated.password.len(), 40);
        assert!(generated.strength.entropy_bits > 200.0);

        let custom = GeneratorOptions {
            length: 12,
            symbols: false,
            ..Default::default()
        };
        let generated = generate_password(&state, Some(custom)).await.unwrap();
        assert_eq!(generated.password.len(), 12);

        copy_generated(&state, &generated.password).await.unwrap();
        assert_eq!(
            clipboard.get_text().unwrap().as_deref(),
            Some(generated.password.as_str())
        );
    }

    #[tokio::test]
    async fn test_reset_vault() {
        let tmp = tempfile::tempdir().unwrap();
        let (state, _) = new_state(tmp.path());
        setup_vault(&state, MASTER, MASTER).await.unwrap();
        add_credential(&state, bank()).await.unwrap();

        reset_vault(&state).await.unwrap();
        assert_eq!(get_status(&state).await.unwrap(), VaultStatus::NotSetup);
    }

    #[test]
    fn test_check_strength() {
        let estimate = check_strength("password");
        assert_eq!(estimate.label, security::StrengthLabel::Weak);
    }
}
