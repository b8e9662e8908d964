//! Command-line front end: one-shot subcommands and the interactive shell.

mod output;
mod prompt;
mod shell;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};
use tracing::{debug, info};

use crate::clipboard::SystemClipboard;
use crate::commands;
use crate::error::{PassVaultError, Result};
use crate::security::GeneratorOptions;
use crate::state::AppState;
use crate::storage::{load_settings, resolve_data_dir, VaultPaths};
use crate::vault::{CredentialInput, CredentialPatch, VaultError, VaultManager, VaultStatus};

use output::Output;
pub use prompt::{Prompter, MASTER_PASSWORD_ENV};

/// Offline, zero-knowledge password vault
#[derive(Parser, Debug)]
#[command(name = "passvault", author, version, about)]
pub struct Cli {
    /// Directory holding vault.db, salt.key and settings.json
    #[arg(long, global = true, env = "PASSVAULT_DATA_DIR")]
    pub data_dir: Option<PathBuf>,

    /// Print results as JSON
    #[arg(long, global = true)]
    pub json: bool,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Create the vault and choose a Master Password
    Init,
    /// Show whether the vault is set up, locked or unlocked
    Status,
    /// Store a new credential
    Add(AddArgs),
    /// List stored credentials
    List,
    /// Find credentials by website or username
    Search { query: String },
    /// Show one credential
    Show {
        id: i64,
        /// Print the password instead of a mask
        #[arg(long)]
        reveal: bool,
    },
    /// Copy a password to the clipboard
    Copy {
        id: i64,
        /// Copy the username instead
        #[arg(long)]
        username: bool,
    },
    /// Change fields of a credential; omitted fields are kept
    Edit(EditArgs),
    /// Delete a credential
    Delete {
        id: i64,
        /// Skip the confirmation
        #[arg(short, long)]
        yes: bool,
    },
    /// Generate a random password
    Generate(GenerateArgs),
    /// Estimate the strength of a password
    Strength {
        /// Prompted for when omitted
        password: Option<String>,
    },
    /// Change the Master Password and re-encrypt all credentials
    ChangePassword,
    /// Copy vault.db and salt.key into a directory
    Backup { dir: PathBuf },
    /// Delete the vault, its salt and every credential
    Reset {
        /// Skip the confirmation
        #[arg(long)]
        yes: bool,
    },
    /// Show or change settings
    Config(ConfigArgs),
    /// Interactive session with auto-lock
    Shell,
}

#[derive(Args, Debug)]
pub struct AddArgs {
    #[arg(short, long)]
    pub website: String,
    #[arg(short, long)]
    pub username: String,
    #[arg(long)]
    pub url: Option<String>,
    #[arg(long)]
    pub notes: Option<String>,
    /// Use a generated password instead of prompting for one
    #[arg(short, long)]
    pub generate: bool,
}

#[derive(Args, Debug)]
pub struct EditArgs {
    pub id: i64,
    #[arg(short, long)]
    pub website: Option<String>,
    #[arg(short, long)]
    pub username: Option<String>,
    #[arg(long)]
    pub url: Option<String>,
    #[arg(long)]
    pub notes: Option<String>,
    /// Prompt for a new password
    #[arg(short, long)]
    pub password: bool,
    /// Replace the password with a generated one
    #[arg(short, long, conflicts_with = "password")]
    pub generate: bool,
}

#[derive(Args, Debug)]
pub struct GenerateArgs {
    #[arg(short, long)]
    pub length: Option<usize>,
    #[arg(long)]
    pub no_uppercase: bool,
    #[arg(long)]
    pub no_lowercase: bool,
    #[arg(long)]
    pub no_digits: bool,
    #[arg(long)]
    pub no_symbols: bool,
    /// Copy the password to the clipboard
    #[arg(short, long)]
    pub copy: bool,
}

impl GenerateArgs {
    /// Options with the flags applied over `defaults`, or `None` when no
    /// flag was given.
    fn options(&self, defaults: GeneratorOptions) -> Option<GeneratorOptions> {
        if self.length.is_none()
            && !self.no_uppercase
            && !self.no_lowercase
            && !self.no_digits
            && !self.no_symbols
        {
            return None;
        }

        Some(GeneratorOptions {
            length: self.length.unwrap_or(defaults.length),
            uppercase: defaults.uppercase && !self.no_uppercase,
            lowercase: defaults.lowercase && !self.no_lowercase,
            digits: defaults.digits && !self.no_digits,
            symbols: defaults.symbols && !self.no_symbols,
        })
    }
}

#[derive(Args, Debug)]
pub struct ConfigArgs {
    /// Seconds of inactivity before the vault locks
    #[arg(long)]
    pub auto_lock: Option<u64>,
    /// Seconds before a copied password is wiped
    #[arg(long)]
    pub clipboard_clear: Option<u64>,
    /// Default generated password length
    #[arg(long)]
    pub length: Option<usize>,
}

/// Run a parsed command line against the vault in the selected data dir.
pub async fn execute(cli: Cli) -> Result<()> {
    let paths = VaultPaths::new(resolve_data_dir(cli.data_dir));
    paths.ensure_data_dir()?;
    debug!("Data directory: {:?}", paths.data_dir());

    let settings = load_settings(&paths)?;
    let vault = VaultManager::open(paths)?;
    let state = AppState::new(vault, settings, Arc::new(SystemClipboard::new()));

    let output = Output::new(cli.json);
    let mut session = Session {
        state: &state,
        prompter: Prompter::new(),
        output,
        wait_for_clear: true,
    };

    let result = match cli.command {
        Command::Shell => {
            session.wait_for_clear = false;
            shell::run(&mut session).await
        }
        command => session.dispatch(command).await,
    };

    if let Err(e) = &result {
        if cli.json {
            output.error(e)?;
        }
    }
    result
}

/// One user session: the shared state plus terminal input and output.
struct Session<'a> {
    state: &'a AppState,
    prompter: Prompter,
    output: Output,
    /// A one-shot process must stay alive until the copied secret is wiped.
    wait_for_clear: bool,
}

impl Session<'_> {
    async fn dispatch(&mut self, command: Command) -> Result<()> {
        match command {
            Command::Init => self.init().await,
            Command::Status => {
                let status = commands::get_status(self.state).await?;
                self.output.status(status)
            }
            Command::Add(args) => self.add(args).await,
            Command::List => {
                self.ensure_unlocked().await?;
                let credentials = commands::list_credentials(self.state).await?;
                self.output.credentials(&credentials)
            }
            Command::Search { query } => {
                self.ensure_unlocked().await?;
                let credentials = commands::search_credentials(self.state, &query).await?;
                self.output.credentials(&credentials)
            }
            Command::Show { id, reveal } => {
                self.ensure_unlocked().await?;
                let credential = commands::get_credential(self.state, id).await?;
                self.output.credential(&credential, reveal)
            }
            Command::Copy { id, username } => self.copy(id, username).await,
            Command::Edit(args) => self.edit(args).await,
            Command::Delete { id, yes } => self.delete(id, yes).await,
            Command::Generate(args) => self.generate(args).await,
            Command::Strength { password } => {
                let password = match password {
                    Some(password) => password,
                    None => self.prompter.secret("Password: ").await?,
                };
                self.output.strength(&commands::check_strength(&password))
            }
            Command::ChangePassword => self.change_password().await,
            Command::Backup { dir } => {
                let written = commands::backup_vault(self.state, &dir).await?;
                self.output.backup(&written)
            }
            Command::Reset { yes } => self.reset(yes).await,
            Command::Config(args) => self.config(args).await,
            Command::Shell => Err(PassVaultError::InvalidInput(
                "Already in the shell".into(),
            )),
        }
    }

    /// Prompt for the Master Password if the vault is locked.
    async fn ensure_unlocked(&mut self) -> Result<()> {
        match commands::get_status(self.state).await? {
            VaultStatus::Unlocked => Ok(()),
            VaultStatus::NotSetup => Err(VaultError::NotSetup.into()),
            VaultStatus::Locked => {
                let password = self.prompter.master_password("Master Password: ").await?;
                commands::unlock_vault(self.state, &password).await?;
                info!("Vault unlocked");
                Ok(())
            }
        }
    }

    async fn init(&mut self) -> Result<()> {
        if commands::get_status(self.state).await? != VaultStatus::NotSetup {
            return Err(VaultError::AlreadyExists.into());
        }

        let (password, confirm) = match self.prompter.env_master_password() {
            Some(password) => (password.to_string(), password.to_string()),
            None => {
                let password = self.prompter.secret("Create Master Password: ").await?;
                let confirm = self.prompter.secret("Confirm Master Password: ").await?;
                (password, confirm)
            }
        };

        commands::setup_vault(self.state, &password, &confirm).await?;
        self.output
            .message("Vault created. The Master Password cannot be recovered, keep it safe.")
    }

    async fn add(&mut self, args: AddArgs) -> Result<()> {
        self.ensure_unlocked().await?;

        let password = if args.generate {
            commands::generate_password(self.state, None).await?.password
        } else {
            self.prompter.secret("Password: ").await?
        };

        let input = CredentialInput {
            website: args.website,
            username: args.username,
            password,
            url: args.url.unwrap_or_default(),
            notes: args.notes.unwrap_or_default(),
        };
        let id = commands::add_credential(self.state, input).await?;
        self.output.added(id)
    }

    async fn copy(&mut self, id: i64, username: bool) -> Result<()> {
        self.ensure_unlocked().await?;

        if username {
            commands::copy_username(self.state, id).await?;
            return self.output.message("Username copied");
        }

        let clear_after = commands::copy_password(self.state, id).await?;
        self.output.copied("Password", clear_after)?;
        self.wait_for_clipboard_clear(clear_after).await
    }

    async fn edit(&mut self, args: EditArgs) -> Result<()> {
        self.ensure_unlocked().await?;

        let password = if args.generate {
            Some(commands::generate_password(self.state, None).await?.password)
        } else if args.password {
            Some(self.prompter.secret("New password: ").await?)
        } else {
            None
        };

        let patch = CredentialPatch {
            website: args.website,
            username: args.username,
            password,
            url: args.url,
            notes: args.notes,
        };
        if patch.is_empty() {
            return Err(PassVaultError::InvalidInput("Nothing to change".into()));
        }

        commands::update_credential(self.state, args.id, patch).await?;
        self.output
            .message(&format!("Credential {} updated", args.id))
    }

    async fn delete(&mut self, id: i64, yes: bool) -> Result<()> {
        self.ensure_unlocked().await?;

        if !yes {
            let summary = commands::get_credential(self.state, id).await?.summary;
            let question = format!("Delete {} ({})?", summary.website, summary.username);
            if !self.prompter.confirm(&question).await? {
                return self.output.message("Cancelled");
            }
        }

        commands::delete_credential(self.state, id).await?;
        self.output.message(&format!("Credential {} deleted", id))
    }

    async fn generate(&mut self, args: GenerateArgs) -> Result<()> {
        let defaults = commands::get_settings(self.state).await?.default_generator;
        let generated = commands::generate_password(self.state, args.options(defaults)).await?;
        self.output.generated(&generated)?;

        if args.copy {
            let clear_after = commands::copy_generated(self.state, &generated.password).await?;
            self.output.copied("Password", clear_after)?;
            self.wait_for_clipboard_clear(clear_after).await?;
        }
        Ok(())
    }

    async fn change_password(&mut self) -> Result<()> {
        self.ensure_unlocked().await?;

        let current = self
            .prompter
            .master_password("Current Master Password: ")
            .await?;
        let new_password = self.prompter.secret("New Master Password: ").await?;
        let confirm = self.prompter.secret("Confirm New Master Password: ").await?;

        commands::change_master_password(self.state, &current, &new_password, &confirm).await?;
        self.prompter.replace_master_password(&new_password);
        self.output.message("Master Password changed")
    }

    async fn reset(&mut self, yes: bool) -> Result<()> {
        if !yes
            && !self
                .prompter
                .confirm("This permanently deletes every stored credential. Continue?")
                .await?
        {
            return self.output.message("Cancelled");
        }

        commands::reset_vault(self.state).await?;
        self.output.message("Vault reset")
    }

    async fn config(&mut self, args: ConfigArgs) -> Result<()> {
        let mut settings = commands::get_settings(self.state).await?;

        if args.auto_lock.is_none() && args.clipboard_clear.is_none() && args.length.is_none() {
            return self.output.settings(&settings);
        }

        if let Some(secs) = args.auto_lock {
            settings.auto_lock_secs = secs;
        }
        if let Some(secs) = args.clipboard_clear {
            settings.clipboard_clear_secs = secs;
        }
        if let Some(length) = args.length {
            settings.default_generator.length = length;
        }

        commands::update_settings(self.state, settings.clone()).await?;
        self.output.settings(&settings)
    }

    /// Block a one-shot command until the clipboard has been wiped. Ctrl-C
    /// wipes it immediately.
    async fn wait_for_clipboard_clear(&self, clear_after: Duration) -> Result<()> {
        if !self.wait_for_clear {
            return Ok(());
        }

        eprintln!("Waiting to clear the clipboard (Ctrl-C to clear now)...");
        tokio::select! {
            _ = tokio::time::sleep(clear_after) => {
                // Let the scheduled clear run first
                while self.state.clipboard.has_pending_clear() {
                    tokio::time::sleep(Duration::from_millis(50)).await;
                }
            }
            _ = tokio::signal::ctrl_c() => {
                self.state.clipboard.clear_now()?;
            }
        }
        Ok(())
    }
}
