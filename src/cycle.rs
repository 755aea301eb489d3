//! Persisted display/mode cycling state.
//!
//! One small TOML file per (scope key, cycle kind) pair under the user
//! state directory keeps the last used index, so repeated invocations
//! advance deterministically through a fixed candidate list. A missing or
//! corrupt file self-heals to index 0 instead of erroring.

use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result, ensure};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

#[derive(Debug, Serialize, Deserialize)]
struct PersistedIndex {
    index: usize,
}

/// Durable key→index storage addressed by (scope key, cycle kind).
///
/// Scope key is typically the active profile's name; kinds in use are
/// `"geometry"` for the display cycle and one kind per simulated mode.
/// Distinct pairs never share state.
pub struct CycleStore {
    dir: PathBuf,
}

impl CycleStore {
    /// Opens the store in the user state directory, creating it if needed.
    pub fn open() -> Result<Self> {
        let dir = dirs::state_dir()
            .or_else(dirs::cache_dir)
            .context("Could not find state directory")?
            .join("wacomlinux");
        fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create state directory {dir:?}"))?;
        Ok(Self::with_dir(dir))
    }

    /// Opens the store rooted at an explicit directory.
    pub fn with_dir(dir: PathBuf) -> Self {
        Self { dir }
    }

    fn path(&self, scope: &str, kind: &str) -> PathBuf {
        self.dir
            .join(format!("{}.{}.toml", sanitize(scope), sanitize(kind)))
    }

    /// Returns the last persisted index for (scope, kind).
    ///
    /// On the first run or an unreadable file the default 0 is written
    /// back and returned.
    pub fn current(&self, scope: &str, kind: &str) -> Result<usize> {
        let path = self.path(scope, kind);
        match fs::read_to_string(&path)
            .map_err(anyhow::Error::from)
            .and_then(|content| Ok(toml::from_str::<PersistedIndex>(&content)?))
        {
            Ok(persisted) => {
                debug!("read last '{kind}' index {} from {path:?}", persisted.index);
                Ok(persisted.index)
            }
            Err(e) => {
                warn!("no usable '{kind}' state in {path:?} ({e:#}), resetting to 0");
                self.persist(scope, kind, 0)?;
                Ok(0)
            }
        }
    }

    /// Advances the (scope, kind) cycle over `count` candidates and
    /// persists the new index before returning it.
    ///
    /// `count` must be at least 1; starting from fresh state with
    /// `count = 3`, successive calls return 1, 2, 0, 1, 2, 0, …
    pub fn advance(&self, scope: &str, kind: &str, count: usize) -> Result<usize> {
        ensure!(count >= 1, "cycle '{kind}' needs at least one candidate");
        let last = self.current(scope, kind)?;
        let next = (last + 1) % count;
        self.persist(scope, kind, next)?;
        info!("cycle '{kind}' for '{scope}': {last} -> {next}");
        Ok(next)
    }

    fn persist(&self, scope: &str, kind: &str, index: usize) -> Result<()> {
        let path = self.path(scope, kind);
        let content = toml::to_string(&PersistedIndex { index })?;
        fs::write(&path, content)
            .with_context(|| format!("Failed to write cycle state {path:?}"))
    }
}

/// Keeps scope keys and kinds usable as file name parts.
fn sanitize(name: &str) -> String {
    name.chars()
        .map(|c| {
            if c.is_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> (tempfile::TempDir, CycleStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = CycleStore::with_dir(dir.path().to_path_buf());
        (dir, store)
    }

    #[test]
    fn test_fresh_state_defaults_to_zero() {
        let (_dir, store) = store();
        assert_eq!(store.current("profile", "geometry").unwrap(), 0);
    }

    #[test]
    fn test_advance_cycles_in_increasing_order() {
        let (_dir, store) = store();
        let indices: Vec<usize> = (0..6)
            .map(|_| store.advance("profile", "geometry", 3).unwrap())
            .collect();
        assert_eq!(indices, vec![1, 2, 0, 1, 2, 0]);
    }

    #[test]
    fn test_advance_with_single_candidate_stays_at_zero() {
        let (_dir, store) = store();
        assert_eq!(store.advance("profile", "geometry", 1).unwrap(), 0);
        assert_eq!(store.advance("profile", "geometry", 1).unwrap(), 0);
    }

    #[test]
    fn test_advance_rejects_zero_candidates() {
        let (_dir, store) = store();
        assert!(store.advance("profile", "geometry", 0).is_err());
    }

    #[test]
    fn test_corrupt_state_self_heals() {
        let (dir, store) = store();
        store.advance("profile", "geometry", 4).unwrap();
        fs::write(dir.path().join("profile.geometry.toml"), "not toml at all").unwrap();
        assert_eq!(store.current("profile", "geometry").unwrap(), 0);
        assert_eq!(store.advance("profile", "geometry", 4).unwrap(), 1);
    }

    #[test]
    fn test_scopes_and_kinds_are_isolated() {
        let (_dir, store) = store();
        store.advance("first", "geometry", 5).unwrap();
        store.advance("first", "geometry", 5).unwrap();
        assert_eq!(store.current("first", "geometry").unwrap(), 2);
        assert_eq!(store.current("second", "geometry").unwrap(), 0);
        assert_eq!(store.current("first", "touch").unwrap(), 0);
    }

    #[test]
    fn test_current_persists_healed_default() {
        let (dir, store) = store();
        assert_eq!(store.current("profile", "wheel").unwrap(), 0);
        let content = fs::read_to_string(dir.path().join("profile.wheel.toml")).unwrap();
        assert!(content.contains("index = 0"));
    }
}
