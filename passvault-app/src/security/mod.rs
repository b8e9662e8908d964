mod crypto;
mod generator;
mod strength;

pub use crypto::{
    derive_key, hash_content, hash_master_password, validate_master_password,
    verify_master_password, CryptoManager, KdfParams, VaultKey, SPECIAL_CHARACTERS,
};
pub use generator::{generate_password, GeneratorOptions, MAX_LENGTH, MIN_LENGTH};
pub use strength::{estimate_password_strength, StrengthEstimate, StrengthLabel};
