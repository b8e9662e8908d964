use std::path::PathBuf;
use std::time::Duration;

use serde::Serialize;
use serde_json::json;

use crate::commands::GeneratedPassword;
use crate::error::{PassVaultError, Result};
use crate::security::StrengthEstimate;
use crate::storage::AppSettings;
use crate::vault::{Credential, CredentialSummary, VaultError, VaultStatus};

const TIME_FORMAT: &str = "%Y-%m-%d %H:%M";

/// Renders command results either as text or as JSON on stdout.
#[derive(Debug, Clone, Copy)]
pub struct Output {
    json: bool,
}

impl Output {
    pub fn new(json: bool) -> Self {
        Self { json }
    }

    fn print_json<T: Serialize>(&self, value: &T) -> Result<()> {
        println!("{}", serde_json::to_string_pretty(value)?);
        Ok(())
    }

    pub fn message(&self, text: &str) -> Result<()> {
        if self.json {
            return self.print_json(&json!({ "message": text }));
        }
        println!("{}", text);
        Ok(())
    }

    pub fn status(&self, status: VaultStatus) -> Result<()> {
        if self.json {
            return self.print_json(&json!({ "status": status }));
        }
        match status {
            VaultStatus::NotSetup => println!("No vault yet. Run `passvault init` to create one."),
            other => println!("Vault is {}", other.to_string().to_lowercase()),
        }
        Ok(())
    }

    pub fn credentials(&self, credentials: &[CredentialSummary]) -> Result<()> {
        if self.json {
            return self.print_json(&credentials);
        }
        if credentials.is_empty() {
            println!("No credentials found");
            return Ok(());
        }

        let id_width = credentials
            .iter()
            .map(|c| c.id.to_string().len())
            .max()
            .unwrap_or(0)
            .max(2);
        let website_width = column_width(credentials.iter().map(|c| c.website.as_str()), "Website");
        let username_width =
            column_width(credentials.iter().map(|c| c.username.as_str()), "Username");

        println!(
            "{:<id_width$}  {:<website_width$}  {:<username_width$}  URL",
            "ID", "Website", "Username"
        );
        for credential in credentials {
            println!(
                "{:<id_width$}  {:<website_width$}  {:<username_width$}  {}",
                credential.id, credential.website, credential.username, credential.url
            );
        }
        Ok(())
    }

    pub fn credential(&self, credential: &Credential, reveal: bool) -> Result<()> {
        let password = if reveal {
            credential.password.clone()
        } else {
            "*".repeat(8)
        };

        if self.json {
            let mut value = serde_json::to_value(&credential.summary)?;
            value["password"] = json!(password);
            return self.print_json(&value);
        }

        let summary = &credential.summary;
        println!("ID:        {}", summary.id);
        println!("Website:   {}", summary.website);
        println!("Username:  {}", summary.username);
        println!("Password:  {}", password);
        if !summary.url.is_empty() {
            println!("URL:       {}", summary.url);
        }
        if !summary.notes.is_empty() {
            println!("Notes:     {}", summary.notes);
        }
        println!("Created:   {}", summary.created_at.format(TIME_FORMAT));
        println!("Modified:  {}", summary.modified_at.format(TIME_FORMAT));
        Ok(())
    }

    pub fn added(&self, id: i64) -> Result<()> {
        if self.json {
            return self.print_json(&json!({ "id": id }));
        }
        println!("Credential {} saved", id);
        Ok(())
    }

    pub fn copied(&self, what: &str, clear_after: Duration) -> Result<()> {
        if self.json {
            return self.print_json(&json!({
                "copied": what,
                "clear_after_secs": clear_after.as_secs(),
            }));
        }
        println!(
            "{} copied. Clipboard will be cleared in {}s",
            what,
            clear_after.as_secs()
        );
        Ok(())
    }

    pub fn generated(&self, generated: &GeneratedPassword) -> Result<()> {
        if self.json {
            return self.print_json(generated);
        }
        println!("{}", generated.password);
        println!(
            "Strength: {} ({:.0} bits)",
            generated.strength.label, generated.strength.entropy_bits
        );
        Ok(())
    }

    pub fn strength(&self, estimate: &StrengthEstimate) -> Result<()> {
        if self.json {
            return self.print_json(estimate);
        }
        println!(
            "Strength: {} ({:.0} bits)",
            estimate.label, estimate.entropy_bits
        );
        Ok(())
    }

    pub fn backup(&self, written: &[PathBuf]) -> Result<()> {
        if self.json {
            return self.print_json(&json!({ "files": written }));
        }
        for path in written {
            println!("Backed up {}", path.display());
        }
        Ok(())
    }

    pub fn settings(&self, settings: &AppSettings) -> Result<()> {
        if self.json {
            return self.print_json(settings);
        }
        let generator = &settings.default_generator;
        println!("Auto-lock after:       {}s", settings.auto_lock_secs);
        println!("Clear clipboard after: {}s", settings.clipboard_clear_secs);
        println!("Generator length:      {}", generator.length);
        println!(
            "Generator classes:     uppercase={} lowercase={} digits={} symbols={}",
            generator.uppercase, generator.lowercase, generator.digits, generator.symbols
        );
        Ok(())
    }

    /// Report a failed command. JSON goes to stdout, text to stderr.
    pub fn error(&self, err: &PassVaultError) -> Result<()> {
        if self.json {
            return self.print_json(&json!({ "error": err }));
        }
        eprintln!("Error: {}", err);
        if matches!(err, PassVaultError::Vault(VaultError::NotSetup)) {
            eprintln!("Run `passvault init` to create a vault.");
        }
        Ok(())
    }
}

fn column_width<'a>(values: impl Iterator<Item = &'a str>, header: &str) -> usize {
    values
        .map(|value| value.chars().count())
        .max()
        .unwrap_or(0)
        .max(header.len())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_column_width_uses_header_minimum() {
        assert_eq!(column_width(["ab", "c"].into_iter(), "Website"), 7);
        assert_eq!(column_width(["a-much-longer-site"].into_iter(), "Website"), 18);
        assert_eq!(column_width(std::iter::empty(), "ID"), 2);
    }
}
