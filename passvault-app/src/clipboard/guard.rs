//! Timed clearing of secrets copied to the clipboard.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use subtle::ConstantTimeEq;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::backend::ClipboardBackend;
use crate::error::{PassVaultError, Result};
use crate::security::hash_content;

fn same_fingerprint(a: &str, b: &str) -> bool {
    a.as_bytes().ct_eq(b.as_bytes()).into()
}

/// Copies secrets and wipes them again after a delay.
///
/// Only one clear is pending at a time: a new copy replaces the previous
/// timer. The timed clear leaves the clipboard alone if the user has copied
/// something else since.
pub struct ClipboardGuard {
    backend: Arc<dyn ClipboardBackend>,
    clear_after: Mutex<Duration>,
    pending: Mutex<Option<JoinHandle<()>>>,
}

impl ClipboardGuard {
    pub fn new(backend: Arc<dyn ClipboardBackend>, clear_after: Duration) -> Self {
        Self {
            backend,
            clear_after: Mutex::new(clear_after),
            pending: Mutex::new(None),
        }
    }

    pub fn backend(&self) -> &Arc<dyn ClipboardBackend> {
        &self.backend
    }

    pub fn clear_after(&self) -> Duration {
        self.clear_after
            .lock()
            .map(|d| *d)
            .unwrap_or(Duration::ZERO)
    }

    pub fn set_clear_after(&self, clear_after: Duration) {
        if let Ok(mut current) = self.clear_after.lock() {
            *current = clear_after;
        }
    }

    fn replace_pending(&self, handle: Option<JoinHandle<()>>) -> Result<()> {
        let mut pending = self
            .pending
            .lock()
            .map_err(|_| PassVaultError::Clipboard("Clipboard timer lock poisoned".into()))?;
        if let Some(previous) = std::mem::replace(&mut *pending, handle) {
            previous.abort();
        }
        Ok(())
    }

    /// Copy `secret` and schedule its removal.
    ///
    /// Must be called from within a tokio runtime.
    pub fn copy_secret(&self, secret: &str) -> Result<()> {
        self.backend.set_text(secret)?;

        let fingerprint = hash_content(secret);
        let backend = self.backend.clone();
        let delay = self.clear_after();

        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            match backend.get_text() {
                Ok(Some(current)) if same_fingerprint(&hash_content(&current), &fingerprint) => {
                    match backend.clear() {
                        Ok(()) => info!("Clipboard cleared after {:?}", delay),
                        Err(e) => warn!("Failed to clear clipboard: {}", e),
                    }
                }
                Ok(_) => debug!("Clipboard changed since copy, leaving it alone"),
                Err(e) => warn!("Could not read clipboard before clearing: {}", e),
            }
        });

        self.replace_pending(Some(handle))?;
        debug!("Secret copied, clearing in {:?}", delay);
        Ok(())
    }

    /// Copy non-secret text (usernames). No timer is scheduled.
    pub fn copy_text(&self, text: &str) -> Result<()> {
        self.backend.set_text(text)
    }

    /// Cancel any pending timer and wipe the clipboard unconditionally.
    pub fn clear_now(&self) -> Result<()> {
        self.replace_pending(None)?;
        self.backend.clear()
    }

    pub fn has_pending_clear(&self) -> bool {
        self.pending
            .lock()
            .map(|pending| pending.as_ref().is_some_and(|h| !h.is_finished()))
            .unwrap_or(false)
    }
}

impl Drop for ClipboardGuard {
    fn drop(&mut self) {
        if let Ok(mut pending) = self.pending.lock() {
            if let Some(handle) = pending.take() {
                handle.abort();
            }
        }
    }
}
