//! Rotation state store: two independent cyclic indices (rubric, news theme)
//! persisted across restarts.
//!
//! `next_index` is the only mutation: read current, advance modulo the list
//! length, persist, return the pre-advance value — all inside one critical
//! section so concurrent callers never consume the same slot or skip one.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::warn;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RotationKind {
    Rubric,
    News,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct RotationState {
    rubric_index: usize,
    news_index: usize,
}

#[derive(Debug)]
pub struct RotationStore {
    path: PathBuf,
    inner: Mutex<RotationState>,
}

impl RotationStore {
    /// Open a store backed by `path`. Missing or corrupt state resets both
    /// indices to 0 rather than failing.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let state = match load_state(&path) {
            Ok(s) => s,
            Err(e) => {
                warn!(error = ?e, path = %path.display(), "rotation state degraded to default");
                RotationState::default()
            }
        };
        Self {
            path,
            inner: Mutex::new(state),
        }
    }

    /// Return the index to use for this call and durably advance the stored
    /// index by one modulo `total`.
    pub fn next_index(&self, kind: RotationKind, total: usize) -> usize {
        assert!(total > 0, "rotation over an empty list");
        let mut g = self.inner.lock().expect("rotation mutex poisoned");
        let slot = match kind {
            RotationKind::Rubric => &mut g.rubric_index,
            RotationKind::News => &mut g.news_index,
        };
        // The list may have shrunk since the state was written.
        let current = *slot % total;
        *slot = (current + 1) % total;
        if let Err(e) = save_state(&self.path, &g) {
            warn!(error = ?e, "rotation state write failed");
        }
        current
    }
}

fn load_state(path: &Path) -> Result<RotationState> {
    if !path.exists() {
        return Ok(RotationState::default());
    }
    let s = fs::read_to_string(path)
        .with_context(|| format!("reading rotation state {}", path.display()))?;
    serde_json::from_str(&s).context("parsing rotation state json")
}

fn save_state(path: &Path, state: &RotationState) -> Result<()> {
    if let Some(dir) = path.parent() {
        let _ = fs::create_dir_all(dir); // best-effort
    }
    let tmp = path.with_extension("json.tmp");
    let json = serde_json::to_string(state).context("serializing rotation state")?;
    let mut f = fs::File::create(&tmp).context("creating rotation temp file")?;
    f.write_all(json.as_bytes()).context("writing rotation temp file")?;
    fs::rename(&tmp, path).context("replacing rotation file")?;
    Ok(())
}
