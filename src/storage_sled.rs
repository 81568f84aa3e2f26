use sled::Db;
use std::path::Path;
use tracing::{debug, info};

use crate::errors::{LifeLogError, LifeLogResult};
use crate::storage_backend::StorageBackend;

const TREE_NAME: &str = "lifelog";

/// A sled-backed implementation of StorageBackend. Each named record is one
/// key in a dedicated tree, flushed after every write.
pub struct SledBackend {
    db: Db,
}

impl SledBackend {
    /// Opens (or creates) the sled database at `path`.
    pub fn open(path: impl AsRef<Path>) -> LifeLogResult<Self> {
        let path = path.as_ref();
        let db = sled::open(path).map_err(|e| {
            LifeLogError::storage("open", format!("failed to open sled DB at {}: {e}", path.display()))
        })?;
        info!(path = %path.display(), "opened sled backend");
        Ok(SledBackend { db })
    }

    /// Temporary database removed on drop. Handy for tests and dry runs.
    pub fn temporary() -> LifeLogResult<Self> {
        let db = sled::Config::new().temporary(true).open()?;
        Ok(SledBackend { db })
    }

    fn tree(&self) -> LifeLogResult<sled::Tree> {
        self.db
            .open_tree(TREE_NAME)
            .map_err(|e| LifeLogError::storage("open_tree", e))
    }
}

impl StorageBackend for SledBackend {
    fn get(&self, key: &str) -> LifeLogResult<Option<Vec<u8>>> {
        let tree = self.tree()?;
        let value = tree.get(key.as_bytes())?;
        Ok(value.map(|v| v.to_vec()))
    }

    fn set(&self, key: &str, value: &[u8]) -> LifeLogResult<()> {
        let tree = self.tree()?;
        tree.insert(key.as_bytes(), value)?;
        tree.flush()?;
        debug!(key, bytes = value.len(), "sled record written");
        Ok(())
    }

    fn remove(&self, key: &str) -> LifeLogResult<()> {
        let tree = self.tree()?;
        tree.remove(key.as_bytes())?;
        tree.flush()?;
        debug!(key, "sled record removed");
        Ok(())
    }

    fn name(&self) -> &'static str {
        "sled"
    }
}
