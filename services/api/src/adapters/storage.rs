//! services/api/src/adapters/storage.rs
//!
//! Stores uploaded contract files on the local filesystem.

use std::path::PathBuf;

use async_trait::async_trait;
use contract_core::ports::{DocumentStorage, PortError, PortResult};
use tracing::debug;

/// Writes uploads into a single directory, creating it on first use.
#[derive(Clone, Debug)]
pub struct LocalFileStorage {
    root: PathBuf,
}

impl LocalFileStorage {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }
}

#[async_trait]
impl DocumentStorage for LocalFileStorage {
    async fn store(&self, stored_name: &str, data: &[u8]) -> PortResult<String> {
        tokio::fs::create_dir_all(&self.root)
            .await
            .map_err(|e| PortError::Unexpected(format!("cannot create upload directory: {e}")))?;

        let path = self.root.join(stored_name);
        tokio::fs::write(&path, data)
            .await
            .map_err(|e| PortError::Unexpected(format!("cannot write {}: {e}", path.display())))?;

        debug!("Wrote {} bytes to {}", data.len(), path.display());
        Ok(path.to_string_lossy().into_owned())
    }

    async fn remove(&self, stored_path: &str) -> PortResult<()> {
        match tokio::fs::remove_file(stored_path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(PortError::Unexpected(format!("cannot remove {stored_path}: {e}"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn store_creates_the_directory_and_writes_bytes() {
        let dir = tempfile::tempdir().unwrap();
        let storage = LocalFileStorage::new(dir.path().join("nested"));

        let path = storage.store("1_contract.pdf", b"%PDF-1.4").await.unwrap();

        assert!(path.ends_with("1_contract.pdf"));
        assert_eq!(tokio::fs::read(&path).await.unwrap(), b"%PDF-1.4");
    }

    #[tokio::test]
    async fn remove_deletes_the_file_and_tolerates_missing_ones() {
        let dir = tempfile::tempdir().unwrap();
        let storage = LocalFileStorage::new(dir.path().to_path_buf());
        let path = storage.store("2_lease.pdf", b"bytes").await.unwrap();

        storage.remove(&path).await.unwrap();
        assert!(!std::path::Path::new(&path).exists());

        storage.remove(&path).await.unwrap();
    }
}
