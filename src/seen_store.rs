use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;

use crate::utils::error::{AppError, Result};

/// Persistent set of offer identifiers that were already delivered.
///
/// The whole set lives in memory; `save` rewrites the backing file in one go
/// through a temporary sibling that is renamed over the target.
pub struct SeenStore {
    path: PathBuf,
    ids: Mutex<HashSet<String>>,
}

impl SeenStore {
    /// Loads the set from `path`. A missing or corrupt file yields an empty
    /// store; corruption is logged and never fatal.
    pub async fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let ids = match load_all(&path).await {
            Ok(ids) => {
                tracing::info!(path = %path.display(), count = ids.len(), "Loaded seen offers");
                ids
            }
            Err(e) => {
                tracing::warn!(error = %e, "Starting with an empty seen set");
                HashSet::new()
            }
        };

        Self {
            path,
            ids: Mutex::new(ids),
        }
    }

    pub fn with_ids(path: impl Into<PathBuf>, ids: HashSet<String>) -> Self {
        Self {
            path: path.into(),
            ids: Mutex::new(ids),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub async fn contains(&self, id: &str) -> bool {
        self.ids.lock().await.contains(id)
    }

    /// Adds `id`, returning `true` if it was not present before.
    pub async fn insert(&self, id: &str) -> bool {
        let mut ids = self.ids.lock().await;
        if ids.contains(id) {
            return false;
        }
        ids.insert(id.to_string())
    }

    pub async fn len(&self) -> usize {
        self.ids.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.ids.lock().await.is_empty()
    }

    pub async fn snapshot(&self) -> HashSet<String> {
        self.ids.lock().await.clone()
    }

    pub async fn save(&self) -> Result<()> {
        let ids = self.snapshot().await;
        save_all(&self.path, &ids).await?;
        tracing::debug!(path = %self.path.display(), count = ids.len(), "Saved seen offers");
        Ok(())
    }
}

/// Reads the persisted identifier list. A missing file is an empty set.
pub async fn load_all(path: &Path) -> Result<HashSet<String>> {
    let contents = match tokio::fs::read_to_string(path).await {
        Ok(contents) => contents,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(HashSet::new()),
        Err(e) => {
            return Err(AppError::PersistenceCorrupt {
                path: path.display().to_string(),
                reason: e.to_string(),
            });
        }
    };

    if contents.trim().is_empty() {
        return Ok(HashSet::new());
    }

    let ids: Vec<String> =
        serde_json::from_str(&contents).map_err(|e| AppError::PersistenceCorrupt {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;

    Ok(ids.into_iter().collect())
}

/// Overwrites `path` with the full set as a sorted JSON array.
pub async fn save_all(path: &Path, ids: &HashSet<String>) -> Result<()> {
    let mut sorted: Vec<&String> = ids.iter().collect();
    sorted.sort();
    let json = serde_json::to_string_pretty(&sorted)?;

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await?;
    }

    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);

    tokio::fs::write(&tmp, json).await?;
    tokio::fs::rename(&tmp, path).await?;
    Ok(())
}
