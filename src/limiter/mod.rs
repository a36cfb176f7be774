//! Per-(IP, tracking id) click rate limiting.
//!
//! A burst-then-cooldown policy: at most [`BURST_MAX_CLICKS`] clicks inside a
//! [`BURST_WINDOW_SECS`] burst, with the whole entry resetting once
//! [`RESET_WINDOW_SECS`] has elapsed since the last request. State is
//! in-memory only and swept lazily; nothing here is persisted.

use dashmap::DashMap;
use std::time::{SystemTime, UNIX_EPOCH};

pub const BURST_WINDOW_SECS: u64 = 60;
pub const BURST_MAX_CLICKS: u32 = 5;
pub const RESET_WINDOW_SECS: u64 = 3600;

#[derive(Debug, Clone, Copy)]
struct IpActivity {
    last_seen: u64,
    count: u32,
}

/// Tracks recent click activity per (IP, tracking id) pair.
#[derive(Debug, Default)]
pub struct ClickLimiter {
    entries: DashMap<String, IpActivity>,
}

fn now_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

impl ClickLimiter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Check whether this (ip, tracking id) pair is clicking too fast,
    /// updating the tracked window as a side effect. A limited request does
    /// not advance the entry.
    pub fn is_rate_limited(&self, ip: &str, tracking_id: &str) -> bool {
        self.is_rate_limited_at(ip, tracking_id, now_secs())
    }

    pub fn is_rate_limited_at(&self, ip: &str, tracking_id: &str, now: u64) -> bool {
        let key = format!("{ip}_{tracking_id}");

        let mut entry = self.entries.entry(key).or_insert(IpActivity {
            last_seen: now,
            count: 0,
        });

        let age = now.saturating_sub(entry.last_seen);

        if age > RESET_WINDOW_SECS {
            // Cooldown elapsed since the last request: fresh window.
            entry.last_seen = now;
            entry.count = 1;
            return false;
        }

        if entry.count >= BURST_MAX_CLICKS && age < BURST_WINDOW_SECS {
            return true;
        }

        entry.last_seen = now;
        entry.count += 1;
        false
    }

    /// Evict entries not seen within the reset window. Called
    /// opportunistically before each classification to bound memory.
    pub fn sweep(&self) {
        self.sweep_at(now_secs());
    }

    pub fn sweep_at(&self, now: u64) {
        self.entries
            .retain(|_, activity| now.saturating_sub(activity.last_seen) <= RESET_WINDOW_SECS);
    }

    /// Drop all tracked activity (full reset).
    pub fn clear(&self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
