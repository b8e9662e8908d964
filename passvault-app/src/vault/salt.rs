//! Salt file management for vault key derivation.
//!
//! Each vault has a unique 16-byte salt stored raw in `salt.key`. Losing the
//! file makes every stored password unrecoverable, so it is backed up
//! together with `vault.db`.

use rand::RngCore;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use super::error::{VaultError, VaultResult};

/// Salt size in bytes (128 bits)
pub const SALT_SIZE: usize = 16;

pub type Salt = [u8; SALT_SIZE];

/// Fresh cryptographically random salt.
pub fn generate_salt() -> Salt {
    let mut salt = [0u8; SALT_SIZE];
    rand::rng().fill_bytes(&mut salt);
    salt
}

/// Load the salt at `path`.
///
/// # Errors
/// `VaultError::Salt` if the file is missing or has the wrong size.
pub fn load_salt(path: &Path) -> VaultResult<Salt> {
    if !path.exists() {
        return Err(VaultError::Salt(format!("Salt file {:?} is missing", path)));
    }

    let bytes = std::fs::read(path)?;
    if bytes.len() != SALT_SIZE {
        return Err(VaultError::Salt(format!(
            "Invalid salt file size: expected {} bytes, got {}",
            SALT_SIZE,
            bytes.len()
        )));
    }

    let mut salt = [0u8; SALT_SIZE];
    salt.copy_from_slice(&bytes);
    Ok(salt)
}

/// Get the existing salt or create a new one.
pub fn get_or_create_salt(path: &Path) -> VaultResult<Salt> {
    if path.exists() {
        return load_salt(path);
    }

    let salt = generate_salt();
    write_salt(path, &salt)?;
    info!("Created new salt file at {:?}", path);
    Ok(salt)
}

/// Write `salt` to `path` atomically, replacing any existing file.
pub fn write_salt(path: &Path, salt: &Salt) -> VaultResult<()> {
    let temp_path = path.with_extension("key.tmp");
    std::fs::write(&temp_path, salt)?;
    std::fs::rename(&temp_path, path)?;

    // Set restrictive permissions on Unix (salt is sensitive)
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let mut perms = std::fs::metadata(path)?.permissions();
        perms.set_mode(0o600);
        std::fs::set_permissions(path, perms)?;
    }

    debug!("Wrote salt file {:?}", path);
    Ok(())
}

/// Where a replacement salt is staged while the database is re-keyed.
pub fn pending_salt_path(path: &Path) -> PathBuf {
    path.with_extension("key.new")
}

/// Delete the salt file. Returns Ok(()) if it doesn't exist.
pub fn delete_salt(path: &Path) -> VaultResult<()> {
    if path.exists() {
        std::fs::remove_file(path)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_then_reload() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("salt.key");

        let first = get_or_create_salt(&path).unwrap();
        let second = get_or_create_salt(&path).unwrap();
        assert_eq!(first, second);
        assert_eq!(std::fs::read(&path).unwrap().len(), SALT_SIZE);
    }

    #[test]
    fn test_wrong_size_rejected() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("salt.key");
        std::fs::write(&path, [0u8; 5]).unwrap();

        assert!(matches!(
            get_or_create_salt(&path).unwrap_err(),
            VaultError::Salt(_)
        ));
    }

    #[test]
    fn test_missing_salt_is_error_on_load() {
        let tmp = tempfile::tempdir().unwrap();
        assert!(matches!(
            load_salt(&tmp.path().join("salt.key")).unwrap_err(),
            VaultError::Salt(_)
        ));
    }

    #[test]
    fn test_delete_is_idempotent() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("salt.key");
        get_or_create_salt(&path).unwrap();

        delete_salt(&path).unwrap();
        assert!(!path.exists());
        delete_salt(&path).unwrap();
    }

    #[cfg(unix)]
    #[test]
    fn test_salt_permissions() {
        use std::os::unix::fs::PermissionsExt;

        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("salt.key");
        get_or_create_salt(&path).unwrap();

        let mode = std::fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }
}
