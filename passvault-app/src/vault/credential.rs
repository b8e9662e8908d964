use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::database::CredentialRecord;
use super::error::{VaultError, VaultResult};

const REQUIRED_FIELDS_MESSAGE: &str = "Website, username, and password are required";

/// User-supplied fields for a new credential.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CredentialInput {
    pub website: String,
    pub username: String,
    pub password: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub notes: String,
}

impl CredentialInput {
    /// Trim text fields and enforce the required ones. The password is
    /// kept verbatim since whitespace may be part of it.
    pub(crate) fn normalized(self) -> VaultResult<Self> {
        let input = Self {
            website: self.website.trim().to_string(),
            username: self.username.trim().to_string(),
            password: self.password,
            url: self.url.trim().to_string(),
            notes: self.notes.trim().to_string(),
        };

        if input.website.is_empty() || input.username.is_empty() || input.password.is_empty() {
            return Err(VaultError::InvalidInput(REQUIRED_FIELDS_MESSAGE.into()));
        }
        Ok(input)
    }
}

/// Edit of an existing credential; `None` keeps the stored value.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CredentialPatch {
    pub website: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub url: Option<String>,
    pub notes: Option<String>,
}

impl CredentialPatch {
    pub fn is_empty(&self) -> bool {
        self.website.is_none()
            && self.username.is_none()
            && self.password.is_none()
            && self.url.is_none()
            && self.notes.is_none()
    }

    pub(crate) fn normalized(self) -> VaultResult<Self> {
        let trim = |value: Option<String>| value.map(|v| v.trim().to_string());
        let patch = Self {
            website: trim(self.website),
            username: trim(self.username),
            password: self.password,
            url: trim(self.url),
            notes: trim(self.notes),
        };

        let blank = |value: &Option<String>| value.as_deref().is_some_and(str::is_empty);
        if blank(&patch.website) || blank(&patch.username) || blank(&patch.password) {
            return Err(VaultError::InvalidInput(REQUIRED_FIELDS_MESSAGE.into()));
        }
        Ok(patch)
    }
}

/// Listing entry. Carries no secret material.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialSummary {
    pub id: i64,
    pub website: String,
    pub username: String,
    pub url: String,
    pub notes: String,
    pub created_at: DateTime<Utc>,
    pub modified_at: DateTime<Utc>,
}

impl From<CredentialRecord> for CredentialSummary {
    fn from(record: CredentialRecord) -> Self {
        Self {
            id: record.id,
            website: record.website,
            username: record.username,
            url: record.url,
            notes: record.notes,
            created_at: record.created_at,
            modified_at: record.modified_at,
        }
    }
}

/// A credential with its password decrypted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Credential {
    #[serde(flatten)]
    pub summary: CredentialSummary,
    pub password: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_input_trims_and_requires_fields() {
        let input = CredentialInput {
            website: "  GitHub ".into(),
            username: " octocat".into(),
            password: " pass with spaces ".into(),
            url: " https://github.com ".into(),
            notes: String::new(),
        }
        .normalized()
        .unwrap();

        assert_eq!(input.website, "GitHub");
        assert_eq!(input.username, "octocat");
        assert_eq!(input.password, " pass with spaces ");
        assert_eq!(input.url, "https://github.com");

        let missing = CredentialInput {
            website: "   ".into(),
            username: "u".into(),
            password: "p".into(),
            ..Default::default()
        }
        .normalized()
        .unwrap_err();
        assert_eq!(missing.to_string(), REQUIRED_FIELDS_MESSAGE);
    }

    #[test]
    fn test_patch_rejects_blank_required_field() {
        let patch = CredentialPatch {
            username: Some("  ".into()),
            ..Default::default()
        };
        assert!(matches!(
            patch.normalized().unwrap_err(),
            VaultError::InvalidInput(_)
        ));

        // Optional fields may be cleared
        let patch = CredentialPatch {
            notes: Some("   ".into()),
            ..Default::default()
        }
        .normalized()
        .unwrap();
        assert_eq!(patch.notes.as_deref(), Some(""));
    }
}
