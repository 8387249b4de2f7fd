//! Seen-story ledger: persistent fingerprint → last-seen-unix map.
//!
//! Bounded by age and by count, consulted by the story selector for
//! anti-repeat filtering. Persistence is best-effort: a corrupt or missing
//! file degrades to an empty ledger, a failed write is logged and the
//! pipeline carries on.

use std::collections::HashMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::{Context, Result};
use tracing::warn;

pub const DEFAULT_MAX_AGE_DAYS: u64 = 7;
pub const DEFAULT_MAX_ITEMS: usize = 1000;

#[derive(Debug)]
pub struct SeenLedger {
    path: PathBuf,
    inner: Mutex<HashMap<String, u64>>,
    max_age_days: u64,
    max_items: usize,
}

impl SeenLedger {
    /// Open a ledger backed by `path` with default retention limits.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        Self::with_limits(path, DEFAULT_MAX_AGE_DAYS, DEFAULT_MAX_ITEMS)
    }

    pub fn with_limits(path: impl Into<PathBuf>, max_age_days: u64, max_items: usize) -> Self {
        let path = path.into();
        let map = match load_map(&path) {
            Ok(m) => m,
            Err(e) => {
                warn!(error = ?e, path = %path.display(), "seen ledger degraded to default");
                HashMap::new()
            }
        };
        Self {
            path,
            inner: Mutex::new(map),
            max_age_days,
            max_items,
        }
    }

    pub fn is_seen(&self, id: &str) -> bool {
        let g = self.inner.lock().expect("ledger mutex poisoned");
        g.contains_key(id)
    }

    /// Record `id` as seen now, prune, and persist.
    pub fn mark_seen(&self, id: &str) {
        self.mark_seen_at(id, now_unix());
    }

    /// Clock-injectable variant of [`mark_seen`](Self::mark_seen).
    pub fn mark_seen_at(&self, id: &str, now: u64) {
        let mut g = self.inner.lock().expect("ledger mutex poisoned");
        g.insert(id.to_string(), now);
        prune_map(&mut g, now, self.max_age_days, self.max_items);
        if let Err(e) = save_map(&self.path, &g) {
            warn!(error = ?e, "seen ledger write failed");
        }
    }

    /// Drop entries older than the retention window, then cap to
    /// `max_items` keeping the most recently seen.
    pub fn prune(&self) {
        self.prune_at(now_unix());
    }

    pub fn prune_at(&self, now: u64) {
        let mut g = self.inner.lock().expect("ledger mutex poisoned");
        prune_map(&mut g, now, self.max_age_days, self.max_items);
        if let Err(e) = save_map(&self.path, &g) {
            warn!(error = ?e, "seen ledger write failed");
        }
    }

    pub fn len(&self) -> usize {
        self.inner.lock().expect("ledger mutex poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn prune_map(map: &mut HashMap<String, u64>, now: u64, max_age_days: u64, max_items: usize) {
    let cutoff = now.saturating_sub(max_age_days * 86_400);
    map.retain(|_, ts| *ts >= cutoff);

    if map.len() > max_items {
        let mut by_age: Vec<(String, u64)> = map.iter().map(|(k, v)| (k.clone(), *v)).collect();
        // Most recently seen first; everything past the cap is evicted.
        by_age.sort_by(|a, b| b.1.cmp(&a.1));
        for (k, _) in by_age.into_iter().skip(max_items) {
            map.remove(&k);
        }
    }
}

fn load_map(path: &Path) -> Result<HashMap<String, u64>> {
    if !path.exists() {
        return Ok(HashMap::new());
    }
    let s = fs::read_to_string(path)
        .with_context(|| format!("reading seen ledger {}", path.display()))?;
    serde_json::from_str(&s).context("parsing seen ledger json")
}

fn save_map(path: &Path, map: &HashMap<String, u64>) -> Result<()> {
    if let Some(dir) = path.parent() {
        let _ = fs::create_dir_all(dir); // best-effort
    }
    let tmp = path.with_extension("json.tmp");
    let json = serde_json::to_string(map).context("serializing seen ledger")?;
    let mut f = fs::File::create(&tmp).context("creating ledger temp file")?;
    f.write_all(json.as_bytes()).context("writing ledger temp file")?;
    fs::rename(&tmp, path).context("replacing ledger file")?;
    Ok(())
}

fn now_unix() -> u64 {
    chrono::Utc::now().timestamp().max(0) as u64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mark_then_seen() {
        let dir = tempfile::tempdir().unwrap();
        let l = SeenLedger::open(dir.path().join("seen.json"));
        assert!(!l.is_seen("abc"));
        l.mark_seen("abc");
        assert!(l.is_seen("abc"));
    }

    #[test]
    fn corrupt_file_degrades_to_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("seen.json");
        fs::write(&path, "not json at all {{").unwrap();
        let l = SeenLedger::open(&path);
        assert!(l.is_empty());
    }
}
