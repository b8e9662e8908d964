//! Cryptographically secure password generation.

use rand::Rng;
use serde::{Deserialize, Serialize};

use super::crypto::SPECIAL_CHARACTERS;
use crate::error::{PassVaultError, Result};

pub const MIN_LENGTH: usize = 12;
pub const MAX_LENGTH: usize = 64;

const UPPERCASE: &str = "ABCDEFGHIJKLMNOPQRSTUVWXYZ";
const LOWERCASE: &str = "abcdefghijklmnopqrstuvwxyz";
const DIGITS: &str = "0123456789";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorOptions {
    pub length: usize,
    pub uppercase: bool,
    pub lowercase: bool,
    pub digits: bool,
    pub symbols: bool,
}

impl Default for GeneratorOptions {
    fn default() -> Self {
        Self {
            length: 16,
            uppercase: true,
            lowercase: true,
            digits: true,
            symbols: true,
        }
    }
}

impl GeneratorOptions {
    /// Reason these options cannot produce a password, if any.
    pub fn validate(&self) -> std::result::Result<(), String> {
        if !(MIN_LENGTH..=MAX_LENGTH).contains(&self.length) {
            return Err(format!(
                "Password length must be between {} and {} characters",
                MIN_LENGTH, MAX_LENGTH
            ));
        }
        if !(self.uppercase || self.lowercase || self.digits || self.symbols) {
            return Err("At least one character type must be selected".into());
        }
        Ok(())
    }

    fn classes(&self) -> Vec<&'static [u8]> {
        [
            (self.uppercase, UPPERCASE),
            (self.lowercase, LOWERCASE),
            (self.digits, DIGITS),
            (self.symbols, SPECIAL_CHARACTERS),
        ]
        .into_iter()
        .filter(|(enabled, _)| *enabled)
        .map(|(_, set)| set.as_bytes())
        .collect()
    }
}

fn pick<R: Rng>(rng: &mut R, set: &[u8]) -> u8 {
    set[rng.random_range(0..set.len())]
}

/// Generate a random password.
///
/// Every selected character class appears at least once; the remaining
/// characters come uniformly from the union of the selected classes, and the
/// result is shuffled so the guaranteed characters have no fixed position.
pub fn generate_password(options: &GeneratorOptions) -> Result<String> {
    options.validate().map_err(PassVaultError::Generator)?;

    let classes = options.classes();
    let pool: Vec<u8> = classes.concat();
    let mut rng = rand::rng();

    let mut chars: Vec<u8> = classes.iter().map(|set| pick(&mut rng, set)).collect();
    while chars.len() < options.length {
        chars.push(pick(&mut rng, &pool));
    }

    // Fisher-Yates
    for i in (1..chars.len()).rev() {
        let j = rng.random_range(0..=i);
        chars.swap(i, j);
    }

    // Every pool character is ASCII
    Ok(chars.into_iter().map(char::from).collect())
}
