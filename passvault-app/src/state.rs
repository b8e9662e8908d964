use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{broadcast, Mutex, RwLock};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::clipboard::{ClipboardBackend, ClipboardGuard};
use crate::storage::{AppSettings, VaultPaths};
use crate::vault::{VaultManager, VaultStatus};

/// Why the vault was locked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockReason {
    Manual,
    Inactivity,
}

pub struct AppState {
    pub paths: VaultPaths,
    pub settings: Arc<RwLock<AppSettings>>,
    pub vault: Arc<Mutex<VaultManager>>,
    pub clipboard: Arc<ClipboardGuard>,
    /// Pending inactivity lock (only while unlocked)
    auto_lock_timer: Mutex<Option<JoinHandle<()>>>,
    /// Fired whenever the vault locks, so front ends can react
    lock_events: broadcast::Sender<LockReason>,
}

/// Lock the vault and, if it was open, wipe the clipboard. Shared by manual
/// lock and the inactivity timer.
async fn lock_vault(
    vault: &Mutex<VaultManager>,
    clipboard: &ClipboardGuard,
    lock_events: &broadcast::Sender<LockReason>,
    reason: LockReason,
) {
    let was_unlocked = {
        let mut vault = vault.lock().await;
        let was_unlocked = vault.is_unlocked();
        vault.lock();
        was_unlocked
    };

    if was_unlocked {
        if let Err(e) = clipboard.clear_now() {
            warn!("Failed to clear clipboard on lock: {}", e);
        }
        info!("Vault locked ({:?})", reason);
        // No receivers is fine
        let _ = lock_events.send(reason);
    }
}

impl AppState {
    pub fn new(
        vault: VaultManager,
        settings: AppSettings,
        clipboard_backend: Arc<dyn ClipboardBackend>,
    ) -> Self {
        let (lock_events, _) = broadcast::channel(16);
        let clipboard = ClipboardGuard::new(
            clipboard_backend,
            Duration::from_secs(settings.clipboard_clear_secs),
        );

        Self {
            paths: vault.paths().clone(),
            settings: Arc::new(RwLock::new(settings)),
            vault: Arc::new(Mutex::new(vault)),
            clipboard: Arc::new(clipboard),
            auto_lock_timer: Mutex::new(None),
            lock_events,
        }
    }

    pub fn subscribe_lock_events(&self) -> broadcast::Receiver<LockReason> {
        self.lock_events.subscribe()
    }

    pub async fn status(&self) -> crate::vault::VaultResult<VaultStatus> {
        self.vault.lock().await.status()
    }

    /// Record user activity: restarts the inactivity timer while unlocked.
    pub async fn touch(&self) {
        let unlocked = self.vault.lock().await.is_unlocked();

        let mut timer = self.auto_lock_timer.lock().await;
        if let Some(previous) = timer.take() {
            previous.abort();
        }
        if !unlocked {
            return;
        }

        let timeout = Duration::from_secs(self.settings.read().await.auto_lock_secs);
        let vault = self.vault.clone();
        let clipboard = self.clipboard.clone();
        let lock_events = self.lock_events.clone();

        *timer = Some(tokio::spawn(async move {
            tokio::time::sleep(timeout).await;
            lock_vault(&vault, &clipboard, &lock_events, LockReason::Inactivity).await;
        }));
        debug!("Auto-lock in {:?}", timeout);
    }

    /// Lock now, cancel the inactivity timer and clear the clipboard.
    pub async fn lock(&self) {
        if let Some(timer) = self.auto_lock_timer.lock().await.take() {
            timer.abort();
        }
        lock_vault(
            &self.vault,
            &self.clipboard,
            &self.lock_events,
            LockReason::Manual,
        )
        .await;
    }

    /// Replace the active settings. Timer lengths apply from the next
    /// activity or copy.
    pub async fn apply_settings(&self, settings: AppSettings) {
        self.clipboard
            .set_clear_after(Duration::from_secs(settings.clipboard_clear_secs));
        *self.settings.write().await = settings;
    }
}

impl Drop for AppState {
    fn drop(&mut self) {
        if let Ok(mut timer) = self.auto_lock_timer.try_lock() {
            if let Some(handle) = timer.take() {
                handle.abort();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clipboard::MemoryClipboard;
    use crate::security::KdfParams;

    const MASTER: &str = "Correct-Horse-42";

    fn state(dir: &std::path::Path, clipboard: Arc<MemoryClipboard>) -> AppState {
        let mut vault = VaultManager::open(VaultPaths::new(dir))
            .unwrap()
            .with_kdf_params(KdfParams::light());
        vault.setup(MASTER, MASTER).unwrap();
        AppState::new(vault, AppSettings::default(), clipboard)
    }

    async fn advance(secs: u64) {
        tokio::time::sleep(Duration::from_secs(secs)).await;
        tokio::task::yield_now().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_auto_lock_after_inactivity() {
        let tmp = tempfile::tempdir().unwrap();
        let clipboard = Arc::new(MemoryClipboard::new());
        let state = state(tmp.path(), clipboard.clone());
        let mut events = state.subscribe_lock_events();

        state.touch().await;
        state.clipboard.copy_secret("hunter2").unwrap();

        advance(299).await;
        assert_eq!(state.status().await.unwrap(), VaultStatus::Unlocked);

        advance(2).await;
        assert_eq!(state.status().await.unwrap(), VaultStatus::Locked);
        assert_eq!(clipboard.get_text().unwrap(), None);
        assert_eq!(events.recv().await.unwrap(), LockReason::Inactivity);
    }

    #[tokio::test(start_paused = true)]
    async fn test_activity_postpones_lock() {
        let tmp = tempfile::tempdir().unwrap();
        let state = state(tmp.path(), Arc::new(MemoryClipboard::new()));

        state.touch().await;
        advance(200).await;
        state.touch().await;
        advance(250).await;
        assert_eq!(state.status().await.unwrap(), VaultStatus::Unlocked);

        advance(51).await;
        assert_eq!(state.status().await.unwrap(), VaultStatus::Locked);
    }

    #[tokio::test(start_paused = true)]
    async fn test_manual_lock_clears_clipboard_and_notifies() {
        let tmp = tempfile::tempdir().unwrap();
        let clipboard = Arc::new(MemoryClipboard::new());
        let state = state(tmp.path(), clipboard.clone());
        let mut events = state.subscribe_lock_events();

        state.touch().await;
        clipboard.set_text("anything").unwrap();
        state.lock().await;

        assert_eq!(state.status().await.unwrap(), VaultStatus::Locked);
        assert_eq!(clipboard.get_text().unwrap(), None);
        assert_eq!(events.recv().await.unwrap(), LockReason::Manual);

        // Locking again sends nothing new
        state.lock().await;
        assert!(events.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_touch_while_locked_schedules_nothing() {
        let tmp = tempfile::tempdir().unwrap();
        let state = state(tmp.path(), Arc::new(MemoryClipboard::new()));
        state.lock().await;
        let mut events = state.subscribe_lock_events();

        state.touch().await;
        advance(1000).await;
        assert!(events.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_apply_settings() {
        let tmp = tempfile::tempdir().unwrap();
        let state = state(tmp.path(), Arc::new(MemoryClipboard::new()));

        let settings = AppSettings {
            clipboard_clear_secs: 5,
            auto_lock_secs: 60,
            ..Default::default()
        };
        state.apply_settings(settings.clone()).await;

        assert_eq!(state.clipboard.clear_after(), Duration::from_secs(5));
        assert_eq!(*state.settings.read().await, settings);
    }
}
