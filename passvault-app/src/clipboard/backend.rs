use std::sync::Mutex;

use tracing::debug;

use crate::error::{PassVaultError, Result};

/// Minimal text clipboard.
pub trait ClipboardBackend: Send + Sync {
    /// Current text, or `None` if the clipboard is empty or holds non-text.
    fn get_text(&self) -> Result<Option<String>>;

    fn set_text(&self, text: &str) -> Result<()>;

    fn clear(&self) -> Result<()> {
        self.set_text("")
    }
}

fn clipboard_error(e: arboard::Error) -> PassVaultError {
    PassVaultError::Clipboard(e.to_string())
}

/// The OS clipboard.
///
/// The handle is created on first use and kept alive: on X11/Wayland the
/// owning process serves the contents, so dropping it early loses them.
#[derive(Default)]
pub struct SystemClipboard {
    inner: Mutex<Option<arboard::Clipboard>>,
}

impl SystemClipboard {
    pub fn new() -> Self {
        Self::default()
    }

    fn with_clipboard<T>(
        &self,
        f: impl FnOnce(&mut arboard::Clipboard) -> std::result::Result<T, arboard::Error>,
    ) -> Result<T> {
        let mut guard = self
            .inner
            .lock()
            .map_err(|_| PassVaultError::Clipboard("Clipboard lock poisoned".into()))?;

        if guard.is_none() {
            *guard = Some(arboard::Clipboard::new().map_err(clipboard_error)?);
        }
        match guard.as_mut() {
            Some(clipboard) => f(clipboard).map_err(clipboard_error),
            None => Err(PassVaultError::Clipboard("Clipboard unavailable".into())),
        }
    }
}

impl ClipboardBackend for SystemClipboard {
    fn get_text(&self) -> Result<Option<String>> {
        match self.with_clipboard(|c| c.get_text()) {
            Ok(text) if text.is_empty() => Ok(None),
            Ok(text) => Ok(Some(text)),
            Err(e) => {
                // Empty clipboard or non-text content
                debug!("Could not read clipboard: {}", e);
                Ok(None)
            }
        }
    }

    fn set_text(&self, text: &str) -> Result<()> {
        self.with_clipboard(|c| c.set_text(text.to_owned()))
    }

    fn clear(&self) -> Result<()> {
        self.with_clipboard(|c| c.clear())
    }
}

/// In-process clipboard for tests and headless sessions.
#[derive(Debug, Default)]
pub struct MemoryClipboard {
    content: Mutex<String>,
}

impl MemoryClipboard {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ClipboardBackend for MemoryClipboard {
    fn get_text(&self) -> Result<Option<String>> {
        let content = self
            .content
            .lock()
            .map_err(|_| PassVaultError::Clipboard("Clipboard lock poisoned".into()))?;
        Ok((!content.is_empty()).then(|| content.clone()))
    }

    fn set_text(&self, text: &str) -> Result<()> {
        let mut content = self
            .content
            .lock()
            .map_err(|_| PassVaultError::Clipboard("Clipboard lock poisoned".into()))?;
        *content = text.to_owned();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_clipboard() {
        let clipboard = MemoryClipboard::new();
        assert_eq!(clipboard.get_text().unwrap(), None);

        clipboard.set_text("hello").unwrap();
        assert_eq!(clipboard.get_text().unwrap().as_deref(), Some("hello"));

        clipboard.clear().unwrap();
        assert_eq!(clipboard.get_text().unwrap(), None);
    }
}
