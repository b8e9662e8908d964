//! SQLite storage for credentials and vault settings.
//!
//! The database never sees a plaintext password: `encrypted_password` holds
//! the token produced by the crypto layer. Website, username, URL and notes
//! are stored in the clear so listing and searching never touch the key.

use std::path::Path;

use chrono::{DateTime, Utc};
use rusqlite::types::{Type, Value};
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::error::VaultResult;

const MASTER_PASSWORD_HASH_KEY: &str = "master_password_hash";

const SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS credentials (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        website TEXT NOT NULL,
        username TEXT NOT NULL,
        encrypted_password TEXT NOT NULL,
        url TEXT,
        notes TEXT,
        created_at TEXT NOT NULL,
        modified_at TEXT NOT NULL
    );
    CREATE TABLE IF NOT EXISTS settings (
        key TEXT PRIMARY KEY,
        value TEXT NOT NULL
    );
";

const CREDENTIAL_COLUMNS: &str =
    "id, website, username, encrypted_password, url, notes, created_at, modified_at";

/// A credential row as stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialRecord {
    pub id: i64,
    pub website: String,
    pub username: String,
    pub encrypted_password: String,
    pub url: String,
    pub notes: String,
    pub created_at: DateTime<Utc>,
    pub modified_at: DateTime<Utc>,
}

/// Fields for a new row.
#[derive(Debug, Clone, Default)]
pub struct NewCredentialRecord {
    pub website: String,
    pub username: String,
    pub encrypted_password: String,
    pub url: String,
    pub notes: String,
}

/// Partial update. `None` leaves a column untouched.
#[derive(Debug, Clone, Default)]
pub struct CredentialChanges {
    pub website: Option<String>,
    pub username: Option<String>,
    pub encrypted_password: Option<String>,
    pub url: Option<String>,
    pub notes: Option<String>,
}

impl CredentialChanges {
    pub fn is_empty(&self) -> bool {
        self.website.is_none()
            && self.username.is_none()
            && self.encrypted_password.is_none()
            && self.url.is_none()
            && self.notes.is_none()
    }
}

fn parse_timestamp(row: &Row<'_>, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let raw: String = row.get(idx)?;
    DateTime::parse_from_rfc3339(&raw)
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn credential_from_row(row: &Row<'_>) -> rusqlite::Result<CredentialRecord> {
    Ok(CredentialRecord {
        id: row.get(0)?,
        website: row.get(1)?,
        username: row.get(2)?,
        encrypted_password: row.get(3)?,
        url: row.get::<_, Option<String>>(4)?.unwrap_or_default(),
        notes: row.get::<_, Option<String>>(5)?.unwrap_or_default(),
        created_at: parse_timestamp(row, 6)?,
        modified_at: parse_timestamp(row, 7)?,
    })
}

/// Escape LIKE wildcards so the query matches literally.
fn like_pattern(query: &str) -> String {
    let mut escaped = String::with_capacity(query.len() + 2);
    escaped.push('%');
    for c in query.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped.push('%');
    escaped
}

pub struct Database {
    conn: Connection,
}

impl Database {
    /// Open or create the database at `path`.
    pub fn open(path: &Path) -> VaultResult<Self> {
        debug!("Opening database at {:?}", path);
        let conn = Connection::open(path)?;
        Self::init(conn)
    }

    pub fn open_in_memory() -> VaultResult<Self> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> VaultResult<Self> {
        conn.execute_batch(SCHEMA)?;
        Ok(Self { conn })
    }

    // =========================================================================
    // Settings
    // =========================================================================

    pub fn get_setting(&self, key: &str) -> VaultResult<Option<String>> {
        let value = self
            .conn
            .query_row(
                "SELECT value FROM settings WHERE key = ?1",
                params![key],
                |row| row.get(0),
            )
            .optional()?;
        Ok(value)
    }

    pub fn set_setting(&self, key: &str, value: &str) -> VaultResult<()> {
        self.conn.execute(
            "INSERT OR REPLACE INTO settings (key, value) VALUES (?1, ?2)",
            params![key, value],
        )?;
        Ok(())
    }

    pub fn set_master_password_hash(&self, password_hash: &str) -> VaultResult<()> {
        self.set_setting(MASTER_PASSWORD_HASH_KEY, password_hash)
    }

    pub fn get_master_password_hash(&self) -> VaultResult<Option<String>> {
        self.get_setting(MASTER_PASSWORD_HASH_KEY)
    }

    /// True until a Master Password has been stored.
    pub fn is_first_run(&self) -> VaultResult<bool> {
        Ok(self.get_master_password_hash()?.is_none())
    }

    // =========================================================================
    // Credentials
    // =========================================================================

    pub fn add_credential(&self, credential: &NewCredentialRecord) -> VaultResult<i64> {
        let now = Utc::now().to_rfc3339();
        self.conn.execute(
            "INSERT INTO credentials
                (website, username, encrypted_password, url, notes, created_at, modified_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6)",
            params![
                credential.website,
                credential.username,
                credential.encrypted_password,
                credential.url,
                credential.notes,
                now
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    pub fn get_credential(&self, id: i64) -> VaultResult<Option<CredentialRecord>> {
        let record = self
            .conn
            .query_row(
                &format!("SELECT {} FROM credentials WHERE id = ?1", CREDENTIAL_COLUMNS),
                params![id],
                credential_from_row,
            )
            .optional()?;
        Ok(record)
    }

    /// All credentials ordered by website, then username.
    pub fn get_all_credentials(&self) -> VaultResult<Vec<CredentialRecord>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {} FROM credentials ORDER BY website, username",
            CREDENTIAL_COLUMNS
        ))?;
        let records = stmt
            .query_map([], credential_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(records)
    }

    /// Substring match on website or username (case-insensitive for ASCII).
    pub fn search_credentials(&self, query: &str) -> VaultResult<Vec<CredentialRecord>> {
        let pattern = like_pattern(query);
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {} FROM credentials
             WHERE website LIKE ?1 ESCAPE '\\' OR username LIKE ?1 ESCAPE '\\'
             ORDER BY website, username",
            CREDENTIAL_COLUMNS
        ))?;
        let records = stmt
            .query_map(params![pattern], credential_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(records)
    }

    /// Apply `changes` to a row. Returns whether a row was modified; an
    /// empty change set touches nothing and returns `false`.
    pub fn update_credential(&self, id: i64, changes: &CredentialChanges) -> VaultResult<bool> {
        if changes.is_empty() {
            return Ok(false);
        }

        let mut columns: Vec<&str> = Vec::new();
        let mut values: Vec<Value> = Vec::new();

        let fields = [
            ("website", &changes.website),
            ("username", &changes.username),
            ("encrypted_password", &changes.encrypted_password),
            ("url", &changes.url),
            ("notes", &changes.notes),
        ];
        for (column, value) in fields {
            if let Some(value) = value {
                columns.push(column);
                values.push(Value::Text(value.clone()));
            }
        }

        columns.push("modified_at");
        values.push(Value::Text(Utc::now().to_rfc3339()));

        let assignments = columns
            .iter()
            .enumerate()
            .map(|(i, column)| format!("{} = ?{}", column, i + 1))
            .collect::<Vec<_>>()
            .join(", ");
        let sql = format!(
            "UPDATE credentials SET {} WHERE id = ?{}",
            assignments,
            columns.len() + 1
        );
        values.push(Value::Integer(id));

        let updated = self.conn.execute(&sql, params_from_iter(values.iter()))?;
        Ok(updated > 0)
    }

    pub fn delete_credential(&self, id: i64) -> VaultResult<bool> {
        let deleted = self
            .conn
            .execute("DELETE FROM credentials WHERE id = ?1", params![id])?;
        Ok(deleted > 0)
    }

    /// Swap every password token and the Master Password hash in a single
    /// transaction. Used when the Master Password changes.
    pub fn replace_all_passwords(
        &mut self,
        tokens: &[(i64, String)],
        master_password_hash: &str,
        extra_settings: &[(&str, String)],
    ) -> VaultResult<()> {
        let tx = self.conn.transaction()?;
        {
            let mut stmt =
                tx.prepare("UPDATE credentials SET encrypted_password = ?1 WHERE id = ?2")?;
            for (id, token) in tokens {
                stmt.execute(params![token, id])?;
            }

            let mut settings =
                tx.prepare("INSERT OR REPLACE INTO settings (key, value) VALUES (?1, ?2)")?;
            settings.execute(params![MASTER_PASSWORD_HASH_KEY, master_password_hash])?;
            for (key, value) in extra_settings {
                settings.execute(params![key, value])?;
            }
        }
        tx.commit()?;
        debug!("Re-keyed {} credentials", tokens.len());
        Ok(())
    }
}
