use std::path::PathBuf;

use anyhow::Context;
use axum::async_trait;
use bytes::Bytes;

/// Where processed avatar files end up. The filesystem impl is the real
/// one; tests swap in an in-memory fake via `AppState::fake`.
#[async_trait]
pub trait AvatarStore: Send + Sync {
    async fn write(&self, filename: &str, body: Bytes) -> anyhow::Result<()>;
    async fn remove(&self, filename: &str) -> anyhow::Result<()>;
}

#[derive(Clone)]
pub struct FsStore {
    root: PathBuf,
}

impl FsStore {
    pub async fn new(root: PathBuf) -> anyhow::Result<Self> {
        tokio::fs::create_dir_all(&root)
            .await
            .with_context(|| format!("create upload dir {}", root.display()))?;
        Ok(Self { root })
    }
}

#[async_trait]
impl AvatarStore for FsStore {
    async fn write(&self, filename: &str, body: Bytes) -> anyhow::Result<()> {
        let path = self.root.join(filename);
        tokio::fs::write(&path, &body)
            .await
            .with_context(|| format!("write avatar {}", path.display()))?;
        Ok(())
    }

    async fn remove(&self, filename: &str) -> anyhow::Result<()> {
        let path = self.root.join(filename);
        tokio::fs::remove_file(&path)
            .await
            .with_context(|| format!("remove avatar {}", path.display()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn write_then_remove_roundtrip() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = FsStore::new(dir.path().to_path_buf())
            .await
            .expect("create store");

        store
            .write("abc123.png", Bytes::from_static(b"png-bytes"))
            .await
            .expect("write");
        let on_disk = std::fs::read(dir.path().join("abc123.png")).expect("read back");
        assert_eq!(on_disk, b"png-bytes");

        store.remove("abc123.png").await.expect("remove");
        assert!(!dir.path().join("abc123.png").exists());
    }

    #[tokio::test]
    async fn new_creates_missing_directories() {
        let dir = tempfile::tempdir().expect("tempdir");
        let nested = dir.path().join("static").join("profile_pictures");
        FsStore::new(nested.clone()).await.expect("create store");
        assert!(nested.is_dir());
    }
}
