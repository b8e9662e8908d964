//! Field encryption, key derivation and Master Password handling.
//!
//! Each stored password is sealed individually with AES-256-GCM under a key
//! derived from the Master Password via Argon2id and the installation salt.
//! The Master Password itself is never stored, only a slow verifier hash.

use aes_gcm::{
    aead::{Aead, KeyInit},
    Aes256Gcm, Nonce,
};
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::{Algorithm, Argon2, Params, Version};
use data_encoding::BASE64URL_NOPAD;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::debug;
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::vault::{VaultError, VaultResult};

/// Nonce size for AES-GCM (96 bits = 12 bytes)
const NONCE_SIZE: usize = 12;

/// 256-bit key for AES-256
const KEY_LEN: usize = 32;

/// Characters counted as "special" by the strength rules and the generator.
pub const SPECIAL_CHARACTERS: &str = "!@#$%^&*()_+-=[]{}|;:,.<>?";

const MIN_MASTER_PASSWORD_LEN: usize = 8;

/// Argon2id cost parameters for the vault key.
///
/// Persisted next to the credentials at setup so a vault keeps opening even
/// if the defaults change in a later release.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct KdfParams {
    /// Memory cost in KiB
    pub memory_kib: u32,
    /// Number of passes
    pub time_cost: u32,
    /// Lanes
    pub parallelism: u32,
}

impl Default for KdfParams {
    fn default() -> Self {
        Self {
            memory_kib: 65536, // 64 MB
            time_cost: 3,
            parallelism: 4,
        }
    }
}

#[cfg(test)]
impl KdfParams {
    /// Cheap parameters so unit tests don't spend seconds per derivation.
    pub(crate) fn light() -> Self {
        Self {
            memory_kib: 1024,
            time_cost: 1,
            parallelism: 1,
        }
    }
}

/// A 256-bit encryption key with automatic zeroization on drop.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct VaultKey {
    key: [u8; KEY_LEN],
}

impl VaultKey {
    pub fn from_bytes(key: [u8; KEY_LEN]) -> Self {
        Self { key }
    }

    pub fn as_bytes(&self) -> &[u8; KEY_LEN] {
        &self.key
    }
}

impl std::fmt::Debug for VaultKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Never log the actual key material
        f.debug_struct("VaultKey")
            .field("key", &"[REDACTED]")
            .finish()
    }
}

/// Derive the vault key from the Master Password using Argon2id.
///
/// Deterministic for a given password, salt and parameter set. The
/// derivation is intentionally slow to resist brute-force attacks.
pub fn derive_key(password: &str, salt: &[u8], params: &KdfParams) -> VaultResult<VaultKey> {
    let params = Params::new(
        params.memory_kib,
        params.time_cost,
        params.parallelism,
        Some(KEY_LEN),
    )
    .map_err(|e| VaultError::KeyDerivation(format!("Invalid Argon2 params: {}", e)))?;

    let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, params);

    let mut key_bytes = [0u8; KEY_LEN];
    argon2
        .hash_password_into(password.as_bytes(), salt, &mut key_bytes)
        .map_err(|e| VaultError::KeyDerivation(e.to_string()))?;

    debug!("Derived {}-byte key from Master Password", key_bytes.len());
    let key = VaultKey::from_bytes(key_bytes);
    key_bytes.zeroize();
    Ok(key)
}

/// Encrypts and decrypts individual credential fields.
///
/// Only exists while the vault is unlocked. Dropping it wipes the key.
#[derive(Debug)]
pub struct CryptoManager {
    key: VaultKey,
}

impl CryptoManager {
    pub fn new(key: VaultKey) -> Self {
        Self { key }
    }

    /// Derive the key and build a manager in one step.
    pub fn from_password(password: &str, salt: &[u8], params: &KdfParams) -> VaultResult<Self> {
        Ok(Self::new(derive_key(password, salt, params)?))
    }

    fn cipher(&self) -> VaultResult<Aes256Gcm> {
        Aes256Gcm::new_from_slice(self.key.as_bytes())
            .map_err(|e| VaultError::Encryption(format!("Invalid key: {}", e)))
    }

    /// Encrypt a plaintext string into a text token.
    ///
    /// Token format: `base64url([12-byte nonce][ciphertext with 16-byte tag])`.
    /// The empty string maps to the empty token.
    pub fn encrypt(&self, plaintext: &str) -> VaultResult<String> {
        if plaintext.is_empty() {
            return Ok(String::new());
        }

        let cipher = self.cipher()?;

        let mut nonce_bytes = [0u8; NONCE_SIZE];
        rand::rng().fill_bytes(&mut nonce_bytes);
        let nonce = Nonce::from_slice(&nonce_bytes);

        let ciphertext = cipher
            .encrypt(nonce, plaintext.as_bytes())
            .map_err(|e| VaultError::Encryption(format!("Encryption failed: {}", e)))?;

        let mut output = nonce_bytes.to_vec();
        output.extend(ciphertext);
        Ok(BASE64URL_NOPAD.encode(&output))
    }

    /// Decrypt a token produced by [`CryptoManager::encrypt`].
    pub fn decrypt(&self, token: &str) -> VaultResult<String> {
        if token.is_empty() {
            return Ok(String::new());
        }

        let encrypted = BASE64URL_NOPAD
            .decode(token.as_bytes())
            .map_err(|e| VaultError::Decryption(format!("Malformed token: {}", e)))?;

        if encrypted.len() < NONCE_SIZE {
            return Err(VaultError::Decryption("Token too short".into()));
        }

        let (nonce_bytes, ciphertext) = encrypted.split_at(NONCE_SIZE);
        let nonce = Nonce::from_slice(nonce_bytes);

        let plaintext = self
            .cipher()?
            .decrypt(nonce, ciphertext)
            // Wrong key or tampered token
            .map_err(|_| VaultError::Decryption("Authentication failed".into()))?;

        String::from_utf8(plaintext)
            .map_err(|e| VaultError::Decryption(format!("Invalid UTF-8: {}", e)))
    }
}

/// Create the verifier hash stored for the Master Password (Argon2 PHC string).
pub fn hash_master_password(password: &str) -> VaultResult<String> {
    let mut salt_bytes = [0u8; 16];
    rand::rng().fill_bytes(&mut salt_bytes);
    let salt = SaltString::encode_b64(&salt_bytes)
        .map_err(|e| VaultError::KeyDerivation(format!("Invalid salt: {}", e)))?;

    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| VaultError::KeyDerivation(e.to_string()))?;
    Ok(hash.to_string())
}

/// Check a Master Password against its stored hash.
///
/// A malformed hash counts as a mismatch.
pub fn verify_master_password(password: &str, hashed: &str) -> bool {
    match PasswordHash::new(hashed) {
        Ok(parsed) => Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok(),
        Err(_) => false,
    }
}

/// Enforce the Master Password policy: at least 8 characters and at least
/// 3 of uppercase, lowercase, digit and special character.
pub fn validate_master_password(password: &str) -> VaultResult<()> {
    if password.chars().count() < MIN_MASTER_PASSWORD_LEN {
        return Err(VaultError::WeakPassword(
            "Password must be at least 8 characters long".into(),
        ));
    }

    let has_upper = password.chars().any(char::is_uppercase);
    let has_lower = password.chars().any(char::is_lowercase);
    let has_digit = password.chars().any(char::is_numeric);
    let has_special = password.chars().any(|c| SPECIAL_CHARACTERS.contains(c));

    let classes = [has_upper, has_lower, has_digit, has_special]
        .iter()
        .filter(|present| **present)
        .count();

    if classes < 3 {
        return Err(VaultError::WeakPassword(
            "Password must contain at least 3 of: uppercase, lowercase, digit, special character"
                .into(),
        ));
    }

    Ok(())
}

/// SHA-256 fingerprint of some text, hex encoded.
pub fn hash_content(content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    hex::encode(hasher.finalize())
}
