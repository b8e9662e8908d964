use std::io::{IsTerminal, Write};

use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};

use crate::error::{PassVaultError, Result};

/// Supplies the Master Password without a prompt, for scripts.
pub const MASTER_PASSWORD_ENV: &str = "PASSVAULT_MASTER_PASSWORD";

/// Line-based input from stdin with prompts on stderr, so stdout stays
/// clean for `--json` output. Secrets typed at a terminal are not echoed.
pub struct Prompter {
    lines: Lines<BufReader<Stdin>>,
    master_password: Option<String>,
}

impl Prompter {
    pub fn new() -> Self {
        let master_password = std::env::var(MASTER_PASSWORD_ENV)
            .ok()
            .filter(|password| !password.is_empty());

        Self {
            lines: BufReader::new(tokio::io::stdin()).lines(),
            master_password,
        }
    }

    /// Next raw line, `None` at end of input. Cancel safe.
    pub async fn next_line(&mut self) -> Result<Option<String>> {
        let line = self.lines.next_line().await?;
        Ok(line.map(|line| line.trim_end_matches('\r').to_string()))
    }

    /// Show `label` and read one line. Surrounding whitespace is kept since
    /// it may be part of a password.
    pub async fn ask(&mut self, label: &str) -> Result<String> {
        eprint!("{}", label);
        std::io::stderr().flush()?;

        self.next_line()
            .await?
            .ok_or_else(|| PassVaultError::InvalidInput("Unexpected end of input".into()))
    }

    /// Read a secret without echo when stdin is a terminal. Piped input is
    /// read as a plain line.
    pub async fn secret(&mut self, label: &str) -> Result<String> {
        if !std::io::stdin().is_terminal() {
            return self.ask(label).await;
        }

        let label = label.to_string();
        let secret = tokio::task::spawn_blocking(move || rpassword::prompt_password(label))
            .await
            .map_err(std::io::Error::other)??;
        Ok(secret)
    }

    pub async fn confirm(&mut self, question: &str) -> Result<bool> {
        let answer = self.ask(&format!("{} [y/N] ", question)).await?;
        Ok(matches!(
            answer.trim().to_ascii_lowercase().as_str(),
            "y" | "yes"
        ))
    }

    /// The Master Password from the environment, if provided there.
    pub fn env_master_password(&self) -> Option<&str> {
        self.master_password.as_deref()
    }

    pub async fn master_password(&mut self, label: &str) -> Result<String> {
        match &self.master_password {
            Some(password) => Ok(password.clone()),
            None => self.secret(label).await,
        }
    }

    /// Keep the environment-supplied password in step after a change.
    pub fn replace_master_password(&mut self, password: &str) {
        if self.master_password.is_some() {
            self.master_password = Some(password.to_string());
        }
    }
}

impl Default for Prompter {
    fn default() -> Self {
        Self::new()
    }
}
