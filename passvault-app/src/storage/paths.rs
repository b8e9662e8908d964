use std::path::{Path, PathBuf};

use tracing::debug;

/// Environment variable that overrides the default data directory.
pub const DATA_DIR_ENV: &str = "PASSVAULT_DATA_DIR";

const APP_DIR_NAME: &str = "passvault";
const DATABASE_FILE_NAME: &str = "vault.db";
const SALT_FILE_NAME: &str = "salt.key";
const SETTINGS_FILE_NAME: &str = "settings.json";

/// Locations of every file the vault keeps on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VaultPaths {
    data_dir: PathBuf,
}

impl VaultPaths {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
        }
    }

    /// Create the data directory if needed (0700 on Unix).
    pub fn ensure_data_dir(&self) -> std::io::Result<()> {
        if !self.data_dir.exists() {
            debug!("Creating data directory {:?}", self.data_dir);
            std::fs::create_dir_all(&self.data_dir)?;

            #[cfg(unix)]
            {
                use std::os::unix::fs::PermissionsExt;
                let mut perms = std::fs::metadata(&self.data_dir)?.permissions();
                perms.set_mode(0o700);
                std::fs::set_permissions(&self.data_dir, perms)?;
            }
        }
        Ok(())
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn database(&self) -> PathBuf {
        self.data_dir.join(DATABASE_FILE_NAME)
    }

    pub fn salt(&self) -> PathBuf {
        self.data_dir.join(SALT_FILE_NAME)
    }

    pub fn settings(&self) -> PathBuf {
        self.data_dir.join(SETTINGS_FILE_NAME)
    }
}

/// Pick the data directory: explicit flag, then `PASSVAULT_DATA_DIR`, then
/// the platform data dir, then `./passvault`.
pub fn resolve_data_dir(explicit: Option<PathBuf>) -> PathBuf {
    if let Some(dir) = explicit {
        return dir;
    }

    if let Some(dir) = std::env::var_os(DATA_DIR_ENV).filter(|v| !v.is_empty()) {
        return PathBuf::from(dir);
    }

    dirs::data_dir()
        .map(|dir| dir.join(APP_DIR_NAME))
        .unwrap_or_else(|| PathBuf::from(APP_DIR_NAME))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_layout() {
        let paths = VaultPaths::new("/tmp/pv");
        assert_eq!(paths.database(), PathBuf::from("/tmp/pv/vault.db"));
        assert_eq!(paths.salt(), PathBuf::from("/tmp/pv/salt.key"));
        assert_eq!(paths.settings(), PathBuf::from("/tmp/pv/settings.json"));
    }

    #[test]
    fn test_explicit_dir_wins() {
        let dir = resolve_data_dir(Some(PathBuf::from("/somewhere")));
        assert_eq!(dir, PathBuf::from("/somewhere"));
    }

    #[test]
    fn test_ensure_data_dir_creates_nested() {
        let tmp = tempfile::tempdir().unwrap();
        let paths = VaultPaths::new(tmp.path().join("a").join("b"));
        paths.ensure_data_dir().unwrap();
        assert!(paths.data_dir().is_dir());
        // second call is a no-op
        paths.ensure_data_dir().unwrap();
    }
}
