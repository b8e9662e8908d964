use std::io::Write;

use clap::{Parser, Subcommand};
use tracing::debug;

use super::{Command, Session};
use crate::commands;
use crate::error::{PassVaultError, Result};
use crate::state::LockReason;
use crate::vault::VaultStatus;

/// One line typed into the shell.
#[derive(Parser, Debug)]
#[command(name = "passvault", no_binary_name = true, disable_version_flag = true)]
struct ShellLine {
    #[command(subcommand)]
    command: ShellCommand,
}

#[derive(Subcommand, Debug)]
enum ShellCommand {
    #[command(flatten)]
    Vault(Command),
    /// Lock the vault now
    Lock,
    /// Leave the shell (locks the vault)
    #[command(alias = "quit")]
    Exit,
}

pub(super) async fn run(session: &mut Session<'_>) -> Result<()> {
    let mut lock_events = session.state.subscribe_lock_events();

    eprintln!("PassVault {}", env!("CARGO_PKG_VERSION"));
    eprintln!("Type `help` for commands, `exit` to leave.");

    match commands::get_status(session.state).await? {
        VaultStatus::NotSetup => eprintln!("No vault yet. Run `init` to create one."),
        VaultStatus::Locked => {
            if let Err(e) = session.ensure_unlocked().await {
                session.output.error(&e)?;
            }
        }
        VaultStatus::Unlocked => {}
    }

    loop {
        eprint!("passvault> ");
        std::io::stderr().flush()?;

        let line = tokio::select! {
            line = session.prompter.next_line() => line?,
            Ok(reason) = lock_events.recv() => {
                if reason == LockReason::Inactivity {
                    eprintln!();
                    eprintln!("Vault locked after inactivity. Clipboard cleared.");
                }
                continue;
            }
        };
        let Some(line) = line else {
            eprintln!();
            break;
        };

        let words = match split_words(&line) {
            Ok(words) => words,
            Err(e) => {
                session.output.error(&e)?;
                continue;
            }
        };
        if words.is_empty() {
            continue;
        }

        let parsed = match ShellLine::try_parse_from(words) {
            Ok(parsed) => parsed,
            Err(e) => {
                // Also covers `help`
                let _ = e.print();
                continue;
            }
        };

        match parsed.command {
            ShellCommand::Exit => break,
            ShellCommand::Lock => {
                commands::lock_vault(session.state).await?;
                session.output.message("Vault locked")?;
            }
            ShellCommand::Vault(command) => {
                debug!("Shell command: {:?}", command);
                if let Err(e) = session.dispatch(command).await {
                    session.output.error(&e)?;
                }
            }
        }
    }

    commands::lock_vault(session.state).await
}

/// Split a shell line into words. Single and double quotes group words and
/// a backslash escapes the next character outside single quotes.
fn split_words(line: &str) -> Result<Vec<String>> {
    let mut words = Vec::new();
    let mut current = String::new();
    let mut in_word = false;
    let mut quote: Option<char> = None;
    let mut chars = line.chars();

    while let Some(c) = chars.next() {
        match (quote, c) {
            (Some(q), c) if c == q => quote = None,
            (Some('\''), c) => current.push(c),
            (_, '\\') => {
                let escaped = chars
                    .next()
                    .ok_or_else(|| PassVaultError::InvalidInput("Trailing backslash".into()))?;
                current.push(escaped);
                in_word = true;
            }
            (Some(_), c) => current.push(c),
            (None, '\'' | '"') => {
                quote = Some(c);
                in_word = true;
            }
            (None, c) if c.is_whitespace() => {
                if in_word {
                    words.push(std::mem::take(&mut current));
                    in_word = false;
                }
            }
            (None, c) => {
                current.push(c);
                in_word = true;
            }
        }
    }

    if quote.is_some() {
        return Err(PassVaultError::InvalidInput("Unterminated quote".into()));
    }
    if in_word {
        words.push(current);
    }
    Ok(words)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_plain_words() {
        assert_eq!(
            split_words("  show   3 --reveal ").unwrap(),
            vec!["show", "3", "--reveal"]
        );
        assert!(split_words("   ").unwrap().is_empty());
    }

    #[test]
    fn test_split_quotes_and_escapes() {
        assert_eq!(
            split_words(r#"add -w "My Bank" -u 'me "quoted"' --notes a\ b"#).unwrap(),
            vec!["add", "-w", "My Bank", "-u", "me \"quoted\"", "--notes", "a b"]
        );
        assert_eq!(split_words(r#"search """#).unwrap(), vec!["search", ""]);
    }

    #[test]
    fn test_split_rejects_unbalanced_input() {
        assert!(split_words("search \"open").is_err());
        assert!(split_words("search trailing\\").is_err());
    }

    #[test]
    fn test_shell_line_parses_vault_and_shell_commands() {
        let parsed = ShellLine::try_parse_from(["list"]).unwrap();
        assert!(matches!(parsed.command, ShellCommand::Vault(Command::List)));

        let parsed = ShellLine::try_parse_from(["quit"]).unwrap();
        assert!(matches!(parsed.command, ShellCommand::Exit));

        let parsed = ShellLine::try_parse_from(["lock"]).unwrap();
        assert!(matches!(parsed.command, ShellCommand::Lock));

        assert!(ShellLine::try_parse_from(["bogus"]).is_err());
    }
}
