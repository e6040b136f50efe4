//! seen.rs — persisted set of token identities that were already announced.
//!
//! The file is a JSON array of sorted `symbol:issuer` strings. It is rewritten
//! whole on every insert (temp file + rename), so a crash never leaves a
//! half-written file behind. A read-only store (`load_read_only`) starts from
//! the same file but keeps later inserts in memory.

use anyhow::{Context, Result};
use metrics::{counter, gauge};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use tokio::{fs, sync::Mutex};

pub const SEEN_FILE_NAME: &str = "seen_tokens.json";

#[derive(Debug)]
pub struct SeenStore {
    path: PathBuf,
    inner: Mutex<BTreeSet<String>>,
    persist: bool,
}

impl SeenStore {
    /// Load from `path`. A missing or unreadable file yields an empty set.
    pub async fn load(path: impl Into<PathBuf>) -> Self {
        Self::open(path.into(), true).await
    }

    /// Load from `path` but never write back; for dry runs against a live
    /// data directory.
    pub async fn load_read_only(path: impl Into<PathBuf>) -> Self {
        Self::open(path.into(), false).await
    }

    async fn open(path: PathBuf, persist: bool) -> Self {
        let set = match read_set(&path).await {
            Ok(Some(set)) => {
                tracing::info!(target: "seen", path = %path.display(), count = set.len(), "seen set loaded");
                set
            }
            Ok(None) => {
                tracing::info!(target: "seen", path = %path.display(), "no seen set yet, starting empty");
                BTreeSet::new()
            }
            Err(e) => {
                tracing::warn!(target: "seen", path = %path.display(), error = ?e, "seen set unreadable, starting empty");
                BTreeSet::new()
            }
        };
        gauge!("seen_tokens").set(set.len() as f64);
        Self {
            path,
            inner: Mutex::new(set),
            persist,
        }
    }

    /// Store rooted in a data directory (`<dir>/seen_tokens.json`).
    pub async fn in_dir(dir: &Path) -> Self {
        Self::load(dir.join(SEEN_FILE_NAME)).await
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub async fn contains(&self, key: &str) -> bool {
        self.inner.lock().await.contains(key)
    }

    pub async fn len(&self) -> usize {
        self.inner.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.inner.lock().await.is_empty()
    }

    /// Sorted copy of the current set.
    pub async fn snapshot(&self) -> Vec<String> {
        self.inner.lock().await.iter().cloned().collect()
    }

    /// Atomic test-and-insert. Returns `true` only for the caller that added
    /// `key`; unless read-only, the whole set is on disk before this returns.
    ///
    /// A failed write is logged and the in-memory insert is kept: a missed
    /// save risks a repeat alert after restart, a rollback would repeat it now.
    pub async fn insert(&self, key: &str) -> bool {
        let mut set = self.inner.lock().await;
        if !set.insert(key.to_string()) {
            return false;
        }
        gauge!("seen_tokens").set(set.len() as f64);
        if !self.persist {
            return true;
        }
        if let Err(e) = write_set(&self.path, &set).await {
            counter!("seen_persist_errors_total").increment(1);
            tracing::error!(target: "seen", path = %self.path.display(), key, error = ?e, "persisting seen set failed");
        }
        true
    }
}

async fn read_set(path: &Path) -> Result<Option<BTreeSet<String>>> {
    let content = match fs::read_to_string(path).await {
        Ok(s) => s,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e).with_context(|| format!("reading {}", path.display())),
    };
    if content.trim().is_empty() {
        return Ok(None);
    }
    let items: Vec<String> =
        serde_json::from_str(&content).with_context(|| format!("parsing {}", path.display()))?;
    Ok(Some(
        items
            .into_iter()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect(),
    ))
}

/// Overwrite `path` with the sorted set.
pub async fn write_set(path: &Path, set: &BTreeSet<String>) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .await
            .with_context(|| format!("creating {}", parent.display()))?;
    }
    let body = serde_json::to_vec_pretty(set).context("serializing seen set")?;
    let tmp = path.with_extension("json.tmp");
    fs::write(&tmp, body)
        .await
        .with_context(|| format!("writing {}", tmp.display()))?;
    fs::rename(&tmp, path)
        .await
        .with_context(|| format!("renaming {} -> {}", tmp.display(), path.display()))?;
    Ok(())
}
