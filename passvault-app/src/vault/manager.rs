//! VaultManager - credential vault lifecycle and encrypted record access.
//!
//! This module provides the VaultManager struct that handles:
//! - First-run setup of the Master Password
//! - Unlocking (verifier check + key derivation) and locking
//! - Credential CRUD with per-field AES-256-GCM encryption
//! - Master Password rotation, backup and factory reset
//!
//! The field key only exists in memory while the vault is unlocked. It is
//! derived from the Master Password with Argon2id and the vault's salt.

use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use super::auth::VaultStatus;
use super::credential::{Credential, CredentialInput, CredentialPatch, CredentialSummary};
use super::database::{CredentialChanges, Database, NewCredentialRecord};
use super::error::{VaultError, VaultResult};
use super::salt::{
    delete_salt, generate_salt, get_or_create_salt, load_salt, pending_salt_path, write_salt,
};
use crate::security::{
    hash_master_password, validate_master_password, verify_master_password, CryptoManager,
    KdfParams,
};
use crate::storage::VaultPaths;

/// Settings-table key holding the Argon2 parameters used by this vault.
const KDF_PARAMS_KEY: &str = "kdf_params";

/// VaultManager owns the database and, while unlocked, the field key.
pub struct VaultManager {
    paths: VaultPaths,
    db: Database,
    /// Present only while the vault is unlocked
    crypto: Option<CryptoManager>,
    /// Parameters applied to newly created or re-keyed vaults
    kdf_params: KdfParams,
}

impl VaultManager {
    /// Open the vault files under `paths`, creating the database if needed.
    ///
    /// The vault starts out locked (or not set up).
    pub fn open(paths: VaultPaths) -> VaultResult<Self> {
        paths.ensure_data_dir()?;
        let db = Database::open(&paths.database())?;
        Ok(Self {
            paths,
            db,
            crypto: None,
            kdf_params: KdfParams::default(),
        })
    }

    /// Override the Argon2 parameters used for setup and re-keying.
    pub fn with_kdf_params(mut self, params: KdfParams) -> Self {
        self.kdf_params = params;
        self
    }

    pub fn paths(&self) -> &VaultPaths {
        &self.paths
    }

    pub fn status(&self) -> VaultResult<VaultStatus> {
        if self.crypto.is_some() {
            Ok(VaultStatus::Unlocked)
        } else if self.db.is_first_run()? {
            Ok(VaultStatus::NotSetup)
        } else {
            Ok(VaultStatus::Locked)
        }
    }

    pub fn is_unlocked(&self) -> bool {
        self.crypto.is_some()
    }

    fn crypto(&self) -> VaultResult<&CryptoManager> {
        self.crypto.as_ref().ok_or(VaultError::Locked)
    }

    /// Parameters recorded at setup; vaults without a record use the defaults.
    fn stored_kdf_params(&self) -> VaultResult<KdfParams> {
        match self.db.get_setting(KDF_PARAMS_KEY)? {
            Some(raw) => serde_json::from_str(&raw)
                .map_err(|e| VaultError::Corrupted(format!("Invalid KDF parameters: {}", e))),
            None => Ok(KdfParams::default()),
        }
    }

    fn check_new_password(password: &str, confirm: &str) -> VaultResult<()> {
        if password.is_empty() {
            return Err(VaultError::EmptyPassword);
        }
        if password != confirm {
            return Err(VaultError::PasswordMismatch);
        }
        validate_master_password(password)
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    /// Create the Master Password and leave the vault unlocked.
    ///
    /// # Errors
    /// `AlreadyExists` if a Master Password is already stored, otherwise the
    /// first failing check of: empty, mismatch, strength policy.
    pub fn setup(&mut self, password: &str, confirm: &str) -> VaultResult<()> {
        if !self.db.is_first_run()? {
            return Err(VaultError::AlreadyExists);
        }
        Self::check_new_password(password, confirm)?;

        info!("Creating new vault in {:?}", self.paths.data_dir());

        let salt = get_or_create_salt(&self.paths.salt())?;
        let crypto = CryptoManager::from_password(password, &salt, &self.kdf_params)?;

        self.db
            .set_setting(KDF_PARAMS_KEY, &serde_json::to_string(&self.kdf_params)?)?;
        // Written last: until the hash exists the vault still counts as first-run
        self.db
            .set_master_password_hash(&hash_master_password(password)?)?;

        self.crypto = Some(crypto);
        info!("Vault created successfully");
        Ok(())
    }

    /// Verify the Master Password and derive the field key.
    pub fn unlock(&mut self, password: &str) -> VaultResult<()> {
        let stored_hash = self
            .db
            .get_master_password_hash()?
            .ok_or(VaultError::NotSetup)?;

        if password.is_empty() {
            return Err(VaultError::EmptyPassword);
        }
        if !verify_master_password(password, &stored_hash) {
            warn!("Unlock attempt with incorrect Master Password");
            return Err(VaultError::InvalidPassword);
        }

        let params = self.stored_kdf_params()?;
        self.crypto = Some(self.unlock_key(password, &params)?);

        info!("Vault unlocked");
        Ok(())
    }

    /// Derive the field key, first finishing a Master Password change that
    /// was interrupted between the database commit and the salt swap.
    fn unlock_key(&self, password: &str, params: &KdfParams) -> VaultResult<CryptoManager> {
        let salt_path = self.paths.salt();
        let pending = pending_salt_path(&salt_path);

        if pending.exists() {
            let staged = CryptoManager::from_password(password, &load_salt(&pending)?, params)?;
            if self.opens_stored_tokens(&staged)? {
                std::fs::rename(&pending, &salt_path)?;
                warn!("Completed an interrupted Master Password change");
                return Ok(staged);
            }
            delete_salt(&pending)?;
            warn!("Discarded salt from an unfinished Master Password change");
        }

        let salt = load_salt(&salt_path)?;
        CryptoManager::from_password(password, &salt, params)
    }

    /// True if `crypto` decrypts the first stored password, or none exist.
    fn opens_stored_tokens(&self, crypto: &CryptoManager) -> VaultResult<bool> {
        Ok(match self.db.get_all_credentials()?.first() {
            Some(record) => crypto.decrypt(&record.encrypted_password).is_ok(),
            None => true,
        })
    }

    /// Drop the field key. Calling this on a locked vault is a no-op.
    pub fn lock(&mut self) {
        if self.crypto.take().is_some() {
            // CryptoManager's key is ZeroizeOnDrop
            info!("Vault locked");
        }
    }

    // =========================================================================
    // Credentials
    // =========================================================================

    pub fn add_credential(&self, input: CredentialInput) -> VaultResult<i64> {
        let crypto = self.crypto()?;
        let input = input.normalized()?;

        let id = self.db.add_credential(&NewCredentialRecord {
            encrypted_password: crypto.encrypt(&input.password)?,
            website: input.website,
            username: input.username,
            url: input.url,
            notes: input.notes,
        })?;

        debug!("Added credential {}", id);
        Ok(id)
    }

    pub fn list_credentials(&self) -> VaultResult<Vec<CredentialSummary>> {
        self.crypto()?;
        Ok(self
            .db
            .get_all_credentials()?
            .into_iter()
            .map(CredentialSummary::from)
            .collect())
    }

    /// Case-insensitive substring search on website and username. An empty
    /// query lists everything.
    pub fn search_credentials(&self, query: &str) -> VaultResult<Vec<CredentialSummary>> {
        self.crypto()?;
        if query.trim().is_empty() {
            return self.list_credentials();
        }
        Ok(self
            .db
            .search_credentials(query)?
            .into_iter()
            .map(CredentialSummary::from)
            .collect())
    }

    pub fn get_credential(&self, id: i64) -> VaultResult<Credential> {
        let crypto = self.crypto()?;
        let record = self
            .db
            .get_credential(id)?
            .ok_or(VaultError::CredentialNotFound(id))?;

        let password = crypto.decrypt(&record.encrypted_password)?;
        Ok(Credential {
            summary: record.into(),
            password,
        })
    }

    pub fn reveal_password(&self, id: i64) -> VaultResult<String> {
        Ok(self.get_credential(id)?.password)
    }

    pub fn update_credential(&self, id: i64, patch: CredentialPatch) -> VaultResult<()> {
        let crypto = self.crypto()?;
        let patch = patch.normalized()?;

        if self.db.get_credential(id)?.is_none() {
            return Err(VaultError::CredentialNotFound(id));
        }

        let encrypted_password = patch
            .password
            .as_deref()
            .map(|password| crypto.encrypt(password))
            .transpose()?;

        self.db.update_credential(
            id,
            &CredentialChanges {
                website: patch.website,
                username: patch.username,
                encrypted_password,
                url: patch.url,
                notes: patch.notes,
            },
        )?;

        debug!("Updated credential {}", id);
        Ok(())
    }

    pub fn delete_credential(&self, id: i64) -> VaultResult<()> {
        self.crypto()?;
        if !self.db.delete_credential(id)? {
            return Err(VaultError::CredentialNotFound(id));
        }
        debug!("Deleted credential {}", id);
        Ok(())
    }

    // =========================================================================
    // Maintenance
    // =========================================================================

    /// Replace the Master Password, re-encrypting every stored password
    /// under a key derived from a fresh salt.
    ///
    /// The new salt is staged next to `salt.key`, the database changes are
    /// committed in one transaction, then the staged salt replaces the old
    /// one. If the process dies in between, the next unlock finishes the
    /// swap. The vault stays unlocked under the new key.
    pub fn change_master_password(
        &mut self,
        current: &str,
        new_password: &str,
        confirm: &str,
    ) -> VaultResult<()> {
        let old_crypto = self.crypto()?;

        let stored_hash = self
            .db
            .get_master_password_hash()?
            .ok_or(VaultError::NotSetup)?;
        if !verify_master_password(current, &stored_hash) {
            return Err(VaultError::InvalidPassword);
        }
        Self::check_new_password(new_password, confirm)?;

        let new_salt = generate_salt();
        let new_crypto = CryptoManager::from_password(new_password, &new_salt, &self.kdf_params)?;

        let mut tokens = Vec::new();
        for record in self.db.get_all_credentials()? {
            let plaintext = old_crypto.decrypt(&record.encrypted_password)?;
            tokens.push((record.id, new_crypto.encrypt(&plaintext)?));
        }

        let new_hash = hash_master_password(new_password)?;
        let params = serde_json::to_string(&self.kdf_params)?;
        let salt_path = self.paths.salt();
        let pending = pending_salt_path(&salt_path);
        write_salt(&pending, &new_salt)?;

        if let Err(e) =
            self.db
                .replace_all_passwords(&tokens, &new_hash, &[(KDF_PARAMS_KEY, params)])
        {
            if let Err(cleanup) = delete_salt(&pending) {
                warn!("Failed to remove staged salt {:?}: {}", pending, cleanup);
            }
            return Err(e);
        }

        // Committed: only the new key opens the stored passwords now
        self.crypto = Some(new_crypto);
        if let Err(e) = std::fs::rename(&pending, &salt_path) {
            warn!(
                "New salt left at {:?} ({}); it is applied at the next unlock",
                pending, e
            );
            return Err(e.into());
        }

        info!("Master Password changed, {} credentials re-encrypted", tokens.len());
        Ok(())
    }

    /// Copy `vault.db` and `salt.key` into `dest_dir`.
    ///
    /// Both files are needed to restore a vault; neither is useful alone.
    pub fn backup(&self, dest_dir: &Path) -> VaultResult<Vec<PathBuf>> {
        if self.db.is_first_run()? {
            return Err(VaultError::NotSetup);
        }
        std::fs::create_dir_all(dest_dir)?;
        if same_path(dest_dir, self.paths.data_dir()) {
            return Err(VaultError::InvalidInput(
                "Backup directory must not be the vault directory".into(),
            ));
        }

        let mut written = Vec::new();
        for source in [self.paths.database(), self.paths.salt()] {
            let file_name = source
                .file_name()
                .ok_or_else(|| VaultError::Corrupted(format!("Bad vault path {:?}", source)))?;
            let target = dest_dir.join(file_name);
            if same_path(&target, &source) {
                return Err(VaultError::InvalidInput(format!(
                    "Backup target {:?} is the vault file itself",
                    target
                )));
            }
            std::fs::copy(&source, &target)?;
            written.push(target);
        }

        info!("Backed up vault to {:?}", dest_dir);
        Ok(written)
    }

    /// Delete the vault and salt files and start over with an empty database.
    ///
    /// # Warning
    /// All stored credentials are permanently lost.
    pub fn destroy(&mut self) -> VaultResult<()> {
        info!("Destroying vault - all data will be lost!");
        self.crypto = None;

        // Release the file handle before deleting the database
        self.db = Database::open_in_memory()?;

        let removed = self.remove_vault_files();
        // Back on disk even if a file could not be deleted
        self.db = Database::open(&self.paths.database())?;
        removed?;

        info!("Vault destroyed successfully");
        Ok(())
    }

    fn remove_vault_files(&self) -> VaultResult<()> {
        let db_path = self.paths.database();
        if db_path.exists() {
            std::fs::remove_file(&db_path)?;
        }
        let salt_path = self.paths.salt();
        delete_salt(&pending_salt_path(&salt_path))?;
        delete_salt(&salt_path)
    }
}

/// Whether both paths resolve to the same existing file or directory.
fn same_path(a: &Path, b: &Path) -> bool {
    match (a.canonicalize(), b.canonicalize()) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MASTER: &str = "Correct-Horse-42";

    fn open_vault(dir: &Path) -> VaultManager {
        VaultManager::open(VaultPaths::new(dir))
            .unwrap()
            .with_kdf_params(KdfParams::light())
    }

    fn unlocked_vault(dir: &Path) -> VaultManager {
        let mut vault = open_vault(dir);
        vault.setup(MASTER, MASTER).unwrap();
        vault
    }

    fn github() -> CredentialInput {
        CredentialInput {
            website: "GitHub".into(),
            username: "octocat".into(),
            password: "s3cret-Pa55".into(),
            url: "https://github.com".into(),
            notes: "work account".into(),
        }
    }

    #[test]
    fn test_status_transitions() {
        let tmp = tempfile::tempdir().unwrap();
        let mut vault = open_vault(tmp.path());
        assert_eq!(vault.status().unwrap(), VaultStatus::NotSetup);

        vault.setup(MASTER, MASTER).unwrap();
        assert_eq!(vault.status().unwrap(), VaultStatus::Unlocked);
        assert!(tmp.path().join("salt.key").exists());
        assert!(tmp.path().join("vault.db").exists());

        vault.lock();
        assert_eq!(vault.status().unwrap(), VaultStatus::Locked);
        vault.lock();

        vault.unlock(MASTER).unwrap();
        assert!(vault.is_unlocked());
    }

    #[test]
    fn test_setup_validation_order() {
        let tmp = tempfile::tempdir().unwrap();
        let mut vault = open_vault(tmp.path());

        assert!(matches!(vault.setup("", ""), Err(VaultError::EmptyPassword)));
        assert!(matches!(
            vault.setup(MASTER, "other"),
            Err(VaultError::PasswordMismatch)
        ));
        assert!(matches!(
            vault.setup("short", "short"),
            Err(VaultError::WeakPassword(_))
        ));
        assert_eq!(vault.status().unwrap(), VaultStatus::NotSetup);

        vault.setup(MASTER, MASTER).unwrap();
        assert!(matches!(
            vault.setup(MASTER, MASTER),
            Err(VaultError::AlreadyExists)
        ));
    }

    #[test]
    fn test_unlock_errors() {
        let tmp = tempfile::tempdir().unwrap();
        let mut vault = open_vault(tmp.path());
        assert!(matches!(vault.unlock(MASTER), Err(VaultError::NotSetup)));

        vault.setup(MASTER, MASTER).unwrap();
        vault.lock();
        assert!(matches!(
            vault.unlock("Wrong-Horse-42"),
            Err(VaultError::InvalidPassword)
        ));
        assert!(matches!(vault.unlock(""), Err(VaultError::EmptyPassword)));
        assert!(!vault.is_unlocked());
    }

    #[test]
    fn test_locked_vault_refuses_credential_access() {
        let tmp = tempfile::tempdir().unwrap();
        let mut vault = unlocked_vault(tmp.path());
        let id = vault.add_credential(github()).unwrap();
        vault.lock();

        assert!(matches!(vault.list_credentials(), Err(VaultError::Locked)));
        assert!(matches!(vault.reveal_password(id), Err(VaultError::Locked)));
        assert!(matches!(vault.add_credential(github()), Err(VaultError::Locked)));
        assert!(matches!(vault.delete_credential(id), Err(VaultError::Locked)));
    }

    #[test]
    fn test_credential_crud() {
        let tmp = tempfile::tempdir().unwrap();
        let vault = unlocked_vault(tmp.path());

        let id = vault.add_credential(github()).unwrap();
        let credential = vault.get_credential(id).unwrap();
        assert_eq!(credential.summary.website, "GitHub");
        assert_eq!(credential.password, "s3cret-Pa55");

        vault
            .update_credential(
                id,
                CredentialPatch {
                    password: Some("n3w-Pa55".into()),
                    notes: Some("rotated".into()),
                    ..Default::default()
                },
            )
            .unwrap();
        let credential = vault.get_credential(id).unwrap();
        assert_eq!(credential.password, "n3w-Pa55");
        assert_eq!(credential.summary.notes, "rotated");
        assert_eq!(credential.summary.username, "octocat");

        vault.delete_credential(id).unwrap();
        assert!(matches!(
            vault.get_credential(id),
            Err(VaultError::CredentialNotFound(_))
        ));
        assert!(matches!(
            vault.delete_credential(id),
            Err(VaultError::CredentialNotFound(_))
        ));
        assert!(matches!(
            vault.update_credential(id, CredentialPatch::default()),
            Err(VaultError::CredentialNotFound(_))
        ));
    }

    #[test]
    fn test_password_is_not_stored_in_clear() {
        let tmp = tempfile::tempdir().unwrap();
        let vault = unlocked_vault(tmp.path());
        vault.add_credential(github()).unwrap();

        let raw = Database::open(&tmp.path().join("vault.db"))
            .unwrap()
            .get_all_credentials()
            .unwrap();
        assert_eq!(raw.len(), 1);
        assert_ne!(raw[0].encrypted_password, "s3cret-Pa55");
        assert!(!raw[0].encrypted_password.is_empty());
    }

    #[test]
    fn test_search_and_list() {
        let tmp = tempfile::tempdir().unwrap();
        let vault = unlocked_vault(tmp.path());
        vault.add_credential(github()).unwrap();
        vault
            .add_credential(CredentialInput {
                website: "Bank".into(),
                username: "me@example.com".into(),
                password: "pw".into(),
                ..Default::default()
            })
            .unwrap();

        let all = vault.list_credentials().unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].website, "Bank");

        let hits = vault.search_credentials("OCTO").unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].website, "GitHub");

        assert_eq!(vault.search_credentials("  ").unwrap().len(), 2);
    }

    #[test]
    fn test_search_keeps_surrounding_spaces() {
        let tmp = tempfile::tempdir().unwrap();
        let vault = unlocked_vault(tmp.path());
        for website in ["My Bank", "Bankers Club"] {
            vault
                .add_credential(CredentialInput {
                    website: website.into(),
                    username: "me".into(),
                    password: "pw".into(),
                    ..Default::default()
                })
                .unwrap();
        }

        let hits = vault.search_credentials(" bank").unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].website, "My Bank");
        assert_eq!(vault.search_credentials("bank").unwrap().len(), 2);
    }

    #[test]
    fn test_data_survives_reopen() {
        let tmp = tempfile::tempdir().unwrap();
        let id = {
            let vault = unlocked_vault(tmp.path());
            vault.add_credential(github()).unwrap()
        };

        let mut vault = open_vault(tmp.path());
        assert_eq!(vault.status().unwrap(), VaultStatus::Locked);
        vault.unlock(MASTER).unwrap();
        assert_eq!(vault.reveal_password(id).unwrap(), "s3cret-Pa55");
    }

    #[test]
    fn test_change_master_password() {
        let tmp = tempfile::tempdir().unwrap();
        let mut vault = unlocked_vault(tmp.path());
        let id = vault.add_credential(github()).unwrap();
        let old_salt = std::fs::read(tmp.path().join("salt.key")).unwrap();

        assert!(matches!(
            vault.change_master_password("nope", "New-Horse-99", "New-Horse-99"),
            Err(VaultError::InvalidPassword)
        ));

        vault
            .change_master_password(MASTER, "New-Horse-99", "New-Horse-99")
            .unwrap();
        assert_eq!(vault.reveal_password(id).unwrap(), "s3cret-Pa55");
        assert_ne!(std::fs::read(tmp.path().join("salt.key")).unwrap(), old_salt);

        vault.lock();
        assert!(matches!(vault.unlock(MASTER), Err(VaultError::InvalidPassword)));
        vault.unlock("New-Horse-99").unwrap();
        assert_eq!(vault.reveal_password(id).unwrap(), "s3cret-Pa55");
    }

    #[test]
    fn test_backup_copies_both_files() {
        let tmp = tempfile::tempdir().unwrap();
        let backup_dir = tempfile::tempdir().unwrap();
        let vault = unlocked_vault(tmp.path());
        vault.add_credential(github()).unwrap();

        let written = vault.backup(backup_dir.path()).unwrap();
        assert_eq!(written.len(), 2);
        assert!(backup_dir.path().join("vault.db").exists());
        assert_eq!(
            std::fs::read(backup_dir.path().join("salt.key")).unwrap(),
            std::fs::read(tmp.path().join("salt.key")).unwrap()
        );

        // The copy opens with the same Master Password
        let mut restored = open_vault(backup_dir.path());
        restored.unlock(MASTER).unwrap();
        assert_eq!(restored.list_credentials().unwrap().len(), 1);
    }

    #[test]
    fn test_backup_refuses_vault_directory() {
        let tmp = tempfile::tempdir().unwrap();
        let vault = unlocked_vault(tmp.path());
        let id = vault.add_credential(github()).unwrap();
        let salt_before = std::fs::read(tmp.path().join("salt.key")).unwrap();
        let db_len = std::fs::metadata(tmp.path().join("vault.db")).unwrap().len();

        for dest in [tmp.path().to_path_buf(), tmp.path().join(".")] {
            assert!(matches!(
                vault.backup(&dest),
                Err(VaultError::InvalidInput(_))
            ));
        }

        assert_eq!(std::fs::read(tmp.path().join("salt.key")).unwrap(), salt_before);
        assert_eq!(
            std::fs::metadata(tmp.path().join("vault.db")).unwrap().len(),
            db_len
        );

        drop(vault);
        let mut vault = open_vault(tmp.path());
        vault.unlock(MASTER).unwrap();
        assert_eq!(vault.reveal_password(id).unwrap(), "s3cret-Pa55");
    }

    #[cfg(unix)]
    #[test]
    fn test_backup_refuses_target_linked_to_vault_file() {
        let tmp = tempfile::tempdir().unwrap();
        let backup_dir = tempfile::tempdir().unwrap();
        let vault = unlocked_vault(tmp.path());
        let salt_before = std::fs::read(tmp.path().join("salt.key")).unwrap();

        std::os::unix::fs::symlink(
            tmp.path().join("salt.key"),
            backup_dir.path().join("salt.key"),
        )
        .unwrap();

        assert!(matches!(
            vault.backup(backup_dir.path()),
            Err(VaultError::InvalidInput(_))
        ));
        assert_eq!(std::fs::read(tmp.path().join("salt.key")).unwrap(), salt_before);
    }

    #[test]
    fn test_interrupted_password_change_finishes_on_unlock() {
        let tmp = tempfile::tempdir().unwrap();
        let mut vault = unlocked_vault(tmp.path());
        let id = vault.add_credential(github()).unwrap();

        // Database re-keyed and committed, salt swap never happened
        let new_salt = generate_salt();
        let new_crypto =
            CryptoManager::from_password("New-Horse-99", &new_salt, &KdfParams::light()).unwrap();
        let token = new_crypto.encrypt("s3cret-Pa55").unwrap();
        write_salt(&pending_salt_path(&vault.paths.salt()), &new_salt).unwrap();
        let new_hash = hash_master_password("New-Horse-99").unwrap();
        vault
            .db
            .replace_all_passwords(&[(id, token)], &new_hash, &[])
            .unwrap();
        drop(vault);

        let mut vault = open_vault(tmp.path());
        vault.unlock("New-Horse-99").unwrap();
        assert_eq!(vault.reveal_password(id).unwrap(), "s3cret-Pa55");
        assert_eq!(
            std::fs::read(tmp.path().join("salt.key")).unwrap(),
            new_salt.to_vec()
        );
        assert!(!tmp.path().join("salt.key.new").exists());
    }

    #[test]
    fn test_unfinished_password_change_is_discarded() {
        let tmp = tempfile::tempdir().unwrap();
        let vault = unlocked_vault(tmp.path());
        let id = vault.add_credential(github()).unwrap();
        let old_salt = std::fs::read(tmp.path().join("salt.key")).unwrap();

        // Salt staged but the database was never committed
        write_salt(&pending_salt_path(&vault.paths.salt()), &generate_salt()).unwrap();
        drop(vault);

        let mut vault = open_vault(tmp.path());
        vault.unlock(MASTER).unwrap();
        assert_eq!(vault.reveal_password(id).unwrap(), "s3cret-Pa55");
        assert_eq!(std::fs::read(tmp.path().join("salt.key")).unwrap(), old_salt);
        assert!(!tmp.path().join("salt.key.new").exists());
    }

    #[test]
    fn test_completed_password_change_leaves_no_staged_salt() {
        let tmp = tempfile::tempdir().unwrap();
        let mut vault = unlocked_vault(tmp.path());
        vault
            .change_master_password(MASTER, "New-Horse-99", "New-Horse-99")
            .unwrap();
        assert!(!tmp.path().join("salt.key.new").exists());
    }

    #[test]
    fn test_failed_destroy_keeps_database_on_disk() {
        let tmp = tempfile::tempdir().unwrap();
        let mut vault = unlocked_vault(tmp.path());
        vault.add_credential(github()).unwrap();

        // A directory in place of the salt file cannot be removed as a file
        let salt_path = tmp.path().join("salt.key");
        std::fs::remove_file(&salt_path).unwrap();
        std::fs::create_dir(&salt_path).unwrap();

        assert!(vault.destroy().is_err());
        assert!(tmp.path().join("vault.db").exists());
        assert_eq!(vault.status().unwrap(), VaultStatus::NotSetup);
    }

    #[test]
    fn test_destroy_resets_to_first_run() {
        let tmp = tempfile::tempdir().unwrap();
        let mut vault = unlocked_vault(tmp.path());
        vault.add_credential(github()).unwrap();

        vault.destroy().unwrap();
        assert_eq!(vault.status().unwrap(), VaultStatus::NotSetup);
        assert!(!tmp.path().join("salt.key").exists());

        vault.setup("Other-Horse-7", "Other-Horse-7").unwrap();
        assert!(vault.list_credentials().unwrap().is_empty());
    }
}
