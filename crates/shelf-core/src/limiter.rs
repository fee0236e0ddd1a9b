//! Sliding-window download rate limiter with a persisted lockout.
//!
//! Two states: Open (downloads permitted) and Locked (rejected until the
//! expiry instant). Expiry is checked lazily on every call — correctness
//! never depends on a timer firing. Only the Locked transition is persisted;
//! individual allowed downloads do not survive a restart.
//!
//! Persisted blob (`download_limit.json` in the data dir):
//! `{"timestamps": [..epoch ms..], "expiryTime": <epoch ms>}`

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

pub const DEFAULT_MAX_PER_WINDOW: usize = 10;
pub const DEFAULT_COOLDOWN_WINDOW_MS: i64 = 180_000; // 3 minutes

pub const STORE_FILE_NAME: &str = "download_limit.json";

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LimiterConfig {
    pub max_per_window: usize,
    pub cooldown_window_ms: i64,
}

impl Default for LimiterConfig {
    fn default() -> Self {
        Self {
            max_per_window: DEFAULT_MAX_PER_WINDOW,
            cooldown_window_ms: DEFAULT_COOLDOWN_WINDOW_MS,
        }
    }
}

/// Why a download was rejected. A normal control-flow value, not an error.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DenyReason {
    /// A lockout from an earlier burst is still active.
    LimitActive,
    /// This request tipped the window over the cap and triggered the lockout.
    LimitExceeded,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Decision {
    Allowed {
        /// Downloads recorded in the current window, including this one.
        count_in_window: usize,
    },
    Denied(DenyReason),
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
struct PersistedLockout {
    timestamps: Vec<i64>,
    #[serde(rename = "expiryTime")]
    expiry_time: i64,
}

pub struct DownloadLimiter {
    config: LimiterConfig,
    /// Epoch-ms of downloads recorded within the current window.
    timestamps: Vec<i64>,
    /// Set while Locked; cleared on expiry.
    locked_until: Option<i64>,
    /// When set, the lockout is persisted here across restarts.
    store_path: Option<PathBuf>,
}

impl DownloadLimiter {
    /// In-memory limiter with no persistence (tests, ephemeral sessions).
    pub fn new(config: LimiterConfig) -> Self {
        Self {
            config,
            timestamps: Vec::new(),
            locked_until: None,
            store_path: None,
        }
    }

    /// Restore from the persisted blob at `store_path`, if any. A future
    /// expiry re-enters Locked for the remaining duration; a past expiry is
    /// discarded and the limiter starts Open.
    pub fn restore(config: LimiterConfig, store_path: PathBuf, now_ms: i64) -> Self {
        let mut limiter = Self {
            config,
            timestamps: Vec::new(),
            locked_until: None,
            store_path: Some(store_path),
        };

        if let Some(persisted) = limiter.read_store() {
            if persisted.expiry_time > now_ms {
                info!(
                    "download lockout restored, {}s remaining",
                    (persisted.expiry_time - now_ms) / 1000
                );
                limiter.timestamps = persisted.timestamps;
                limiter.locked_until = Some(persisted.expiry_time);
            } else {
                debug!("stale download lockout discarded");
                limiter.clear_store();
            }
        }
        limiter
    }

    pub fn config(&self) -> LimiterConfig {
        self.config
    }

    pub fn is_locked(&self) -> bool {
        self.locked_until.is_some()
    }

    /// Milliseconds until the lockout clears, when Locked.
    pub fn remaining_ms(&self, now_ms: i64) -> Option<i64> {
        self.locked_until.map(|t| (t - now_ms).max(0))
    }

    /// Downloads still counted in the window as of `now_ms`.
    pub fn count_in_window(&self, now_ms: i64) -> usize {
        self.timestamps
            .iter()
            .filter(|&&t| now_ms - t < self.config.cooldown_window_ms)
            .count()
    }

    /// Lazy expiry check. Returns true when a lockout lapsed on this call,
    /// so the UI can show its "downloads available again" notice. Safe to
    /// call from a periodic tick; state is already correct without it.
    pub fn poll_expiry(&mut self, now_ms: i64) -> bool {
        match self.locked_until {
            Some(expiry) if now_ms >= expiry => {
                info!("download lockout expired");
                self.locked_until = None;
                self.timestamps.clear();
                self.clear_store();
                true
            }
            _ => false,
        }
    }

    /// Gate one download attempt at `now_ms`.
    pub fn try_record_download(&mut self, now_ms: i64) -> Decision {
        self.poll_expiry(now_ms);

        if self.is_locked() {
            return Decision::Denied(DenyReason::LimitActive);
        }

        // Sliding-window eviction.
        let window = self.config.cooldown_window_ms;
        self.timestamps.retain(|&t| now_ms - t < window);

        if self.timestamps.len() >= self.config.max_per_window {
            let expiry = now_ms + window;
            self.locked_until = Some(expiry);
            warn!(
                "download limit hit ({} in window), locked for {}s",
                self.timestamps.len(),
                window / 1000
            );
            self.write_store(expiry);
            return Decision::Denied(DenyReason::LimitExceeded);
        }

        self.timestamps.push(now_ms);
        Decision::Allowed {
            count_in_window: self.timestamps.len(),
        }
    }

    // ── Persistence ──────────────────────────────────────────────────────────
    //
    // Storage failures are logged and swallowed: the limiter never raises,
    // it just degrades to in-memory behavior.

    fn read_store(&self) -> Option<PersistedLockout> {
        let path = self.store_path.as_deref()?;
        let content = std::fs::read_to_string(path).ok()?;
        match serde_json::from_str(&content) {
            Ok(persisted) => Some(persisted),
            Err(e) => {
                warn!("malformed limiter blob at {}: {}", path.display(), e);
                None
            }
        }
    }

    fn write_store(&self, expiry_time: i64) {
        let Some(path) = self.store_path.as_deref() else {
            return;
        };
        let blob = PersistedLockout {
            timestamps: self.timestamps.clone(),
            expiry_time,
        };
        if let Err(e) = write_blob(path, &blob) {
            warn!("failed to persist lockout to {}: {}", path.display(), e);
        }
    }

    fn clear_store(&self) {
        if let Some(path) = self.store_path.as_deref() {
            if path.exists() {
                if let Err(e) = std::fs::remove_file(path) {
                    warn!("failed to remove limiter blob {}: {}", path.display(), e);
                }
            }
        }
    }
}

fn write_blob(path: &Path, blob: &PersistedLockout) -> anyhow::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, serde_json::to_string(blob)?)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const T0: i64 = 1_700_000_000_000;

    #[test]
    fn test_cap_allows_then_locks() {
        let mut limiter = DownloadLimiter::new(LimiterConfig::default());
        for i in 0..10 {
            let decision = limiter.try_record_download(T0 + i * 1000);
            assert_eq!(
                decision,
                Decision::Allowed {
                    count_in_window: i as usize + 1
                }
            );
        }
        let eleventh = limiter.try_record_download(T0 + 10_000);
        assert_eq!(eleventh, Decision::Denied(DenyReason::LimitExceeded));
        assert!(limiter.is_locked());
    }

    #[test]
    fn test_locked_denies_with_limit_active() {
        let mut limiter = DownloadLimiter::new(LimiterConfig::default());
        for i in 0..11 {
            limiter.try_record_download(T0 + i);
        }
        assert_eq!(
            limiter.try_record_download(T0 + 20),
            Decision::Denied(DenyReason::LimitActive)
        );
    }

    #[test]
    fn test_lockout_expires_lazily() {
        let mut limiter = DownloadLimiter::new(LimiterConfig::default());
        for i in 0..11 {
            limiter.try_record_download(T0 + i);
        }
        assert!(limiter.is_locked());
        // expiry = (T0 + 10) + 180000; one call after that is enough, no timer
        let decision = limiter.try_record_download(T0 + 10 + 180_000);
        assert_eq!(decision, Decision::Allowed { count_in_window: 1 });
        assert!(!limiter.is_locked());
    }

    #[test]
    fn test_window_eviction_keeps_slow_pace_open() {
        let config = LimiterConfig {
            max_per_window: 3,
            cooldown_window_ms: 1000,
        };
        let mut limiter = DownloadLimiter::new(config);
        // One download per window-length: never accumulates.
        for i in 0..20 {
            let decision = limiter.try_record_download(T0 + i * 1000);
            assert_eq!(decision, Decision::Allowed { count_in_window: 1 });
        }
    }

    #[test]
    fn test_poll_expiry_reports_lapse_once() {
        let mut limiter = DownloadLimiter::new(LimiterConfig::default());
        for i in 0..11 {
            limiter.try_record_download(T0 + i);
        }
        let expiry = T0 + 10 + 180_000;
        assert!(!limiter.poll_expiry(expiry - 1));
        assert!(limiter.poll_expiry(expiry));
        assert!(!limiter.poll_expiry(expiry + 1));
    }

    #[test]
    fn test_remaining_ms() {
        let mut limiter = DownloadLimiter::new(LimiterConfig::default());
        assert_eq!(limiter.remaining_ms(T0), None);
        for i in 0..11 {
            limiter.try_record_download(T0 + i);
        }
        let expiry = T0 + 10 + 180_000;
        assert_eq!(limiter.remaining_ms(expiry - 5000), Some(5000));
        assert_eq!(limiter.remaining_ms(expiry + 5000), Some(0));
    }

    // ── Persistence ──────────────────────────────────────────────────────────

    fn store_path(dir: &tempfile::TempDir) -> PathBuf {
        dir.path().join(STORE_FILE_NAME)
    }

    fn lock_at(path: PathBuf, t0: i64) {
        let mut limiter = DownloadLimiter::restore(LimiterConfig::default(), path, t0);
        for i in 0..11 {
            limiter.try_record_download(t0 + i);
        }
        assert!(limiter.is_locked());
    }

    #[test]
    fn test_allowed_downloads_are_not_persisted() {
        let dir = tempfile::tempdir().unwrap();
        let path = store_path(&dir);
        let mut limiter = DownloadLimiter::restore(LimiterConfig::default(), path.clone(), T0);
        limiter.try_record_download(T0);
        limiter.try_record_download(T0 + 1);
        assert!(!path.exists());
    }

    #[test]
    fn test_lockout_survives_restart() {
        let dir = tempfile::tempdir().unwrap();
        let path = store_path(&dir);
        lock_at(path.clone(), T0);
        assert!(path.exists());

        // Reinitialize 100s in: still locked for the remainder.
        let restored = DownloadLimiter::restore(LimiterConfig::default(), path, T0 + 100_000);
        assert!(restored.is_locked());
        let remaining = restored.remaining_ms(T0 + 100_000).unwrap();
        assert!(remaining > 0 && remaining <= 180_000);
    }

    #[test]
    fn test_stale_lockout_discarded_on_restart() {
        let dir = tempfile::tempdir().unwrap();
        let path = store_path(&dir);
        lock_at(path.clone(), T0);

        // Reinitialize 200s in: lockout lapsed, blob discarded, window empty.
        let mut restored =
            DownloadLimiter::restore(LimiterConfig::default(), path.clone(), T0 + 200_000);
        assert!(!restored.is_locked());
        assert_eq!(restored.count_in_window(T0 + 200_000), 0);
        assert!(!path.exists());
        assert_eq!(
            restored.try_record_download(T0 + 200_000),
            Decision::Allowed { count_in_window: 1 }
        );
    }

    #[test]
    fn test_expiry_during_session_removes_blob() {
        let dir = tempfile::tempdir().unwrap();
        let path = store_path(&dir);
        let mut limiter = DownloadLimiter::restore(LimiterConfig::default(), path.clone(), T0);
        for i in 0..11 {
            limiter.try_record_download(T0 + i);
        }
        assert!(path.exists());
        limiter.try_record_download(T0 + 10 + 180_000);
        assert!(!path.exists());
    }

    #[test]
    fn test_malformed_blob_starts_open() {
        let dir = tempfile::tempdir().unwrap();
        let path = store_path(&dir);
        std::fs::write(&path, "not json").unwrap();
        let limiter = DownloadLimiter::restore(LimiterConfig::default(), path, T0);
        assert!(!limiter.is_locked());
    }

    #[test]
    fn test_blob_field_names() {
        let dir = tempfile::tempdir().unwrap();
        let path = store_path(&dir);
        lock_at(path.clone(), T0);
        let raw = std::fs::read_to_string(&path).unwrap();
        let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert!(value.get("timestamps").is_some());
        assert_eq!(
            value.get("expiryTime").and_then(|v| v.as_i64()),
            Some(T0 + 10 + 180_000)
        );
    }
}
