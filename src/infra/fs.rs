//! Concrete, real-filesystem implementation of [`crate::core::fs_port::Filesystem`].
//! Ground-truthed on the teacher's `utils::fs::move_file` (rename, fall back
//! to copy+delete across filesystems) and `core::scanner::scan_directory`
//! (WalkDir-based), wrapped behind `tokio::fs`/`spawn_blocking` since every
//! filesystem metadata read is a suspension point (spec §5).

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use sha2::{Digest, Sha256};
use walkdir::WalkDir;

use crate::core::fs_port::{DirEntry, Filesystem};
use crate::error::{Error, Result};

const HASH_PREFIX_BYTES: usize = 10 * 1024 * 1024;

pub struct StdFilesystem;

impl StdFilesystem {
    pub fn new() -> Self {
        Self
    }
}

impl Default for StdFilesystem {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Filesystem for StdFilesystem {
    async fn exists(&self, path: &Path) -> bool {
        tokio::fs::metadata(path).await.is_ok()
    }

    async fn is_symlink(&self, path: &Path) -> bool {
        tokio::fs::symlink_metadata(path)
            .await
            .map(|m| m.file_type().is_symlink())
            .unwrap_or(false)
    }

    async fn size(&self, path: &Path) -> Result<u64> {
        let meta = tokio::fs::metadata(path).await?;
        Ok(meta.len())
    }

    async fn hash_prefix(&self, path: &Path) -> Result<String> {
        let path = path.to_path_buf();
        tokio::task::spawn_blocking(move || sha256_prefix(&path))
            .await
            .map_err(|e| Error::other(format!("hashing task panicked: {e}")))?
    }

    async fn create_dir_all(&self, path: &Path) -> Result<()> {
        tokio::fs::create_dir_all(path).await?;
        Ok(())
    }

    async fn move_file(&self, from: &Path, to: &Path) -> Result<()> {
        if let Some(parent) = to.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        if tokio::fs::rename(from, to).await.is_ok() {
            return Ok(());
        }
        tokio::fs::copy(from, to).await.map_err(|e| {
            Error::MoveFailed(from.to_path_buf(), to.to_path_buf(), e.to_string())
        })?;
        tokio::fs::remove_file(from).await?;
        Ok(())
    }

    async fn remove_file(&self, path: &Path) -> Result<()> {
        tokio::fs::remove_file(path).await?;
        Ok(())
    }

    async fn remove_dir(&self, path: &Path) -> Result<()> {
        tokio::fs::remove_dir(path).await?;
        Ok(())
    }

    async fn list_children(&self, dir: &Path) -> Result<Vec<PathBuf>> {
        let mut children = Vec::new();
        let mut entries = tokio::fs::read_dir(dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            children.push(entry.path());
        }
        Ok(children)
    }

    async fn list_video_files(&self, root: &Path, video_extensions: &[&str]) -> Result<Vec<DirEntry>> {
        let root = root.to_path_buf();
        let extensions: Vec<String> = video_extensions.iter().map(|s| s.to_lowercase()).collect();
        tokio::task::spawn_blocking(move || Ok(walk_video_files(&root, &extensions)))
            .await
            .map_err(|e| Error::other(format!("scan task panicked: {e}")))?
    }

    async fn create_symlink(&self, target: &Path, link: &Path) -> Result<()> {
        if let Some(parent) = link.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        if tokio::fs::symlink_metadata(link).await.is_ok() {
            tokio::fs::remove_file(link).await?;
        }
        #[cfg(unix)]
        tokio::fs::symlink(target, link)
            .await
            .map_err(|e| Error::SymlinkFailed(link.to_path_buf(), e.to_string()))?;
        #[cfg(not(unix))]
        tokio::fs::symlink_file(target, link)
            .await
            .map_err(|e| Error::SymlinkFailed(link.to_path_buf(), e.to_string()))?;
        Ok(())
    }

    async fn read_symlink(&self, link: &Path) -> Result<PathBuf> {
        Ok(tokio::fs::read_link(link).await?)
    }
}

fn sha256_prefix(path: &Path) -> Result<String> {
    use std::io::Read;

    let mut file = std::fs::File::open(path)?;
    let mut buf = vec![0u8; HASH_PREFIX_BYTES];
    let mut total = 0;
    loop {
        let n = file.read(&mut buf[total..])?;
        if n == 0 {
            break;
        }
        total += n;
        if total == buf.len() {
            break;
        }
    }
    let mut hasher = Sha256::new();
    hasher.update(&buf[..total]);
    Ok(format!("{:x}", hasher.finalize()))
}

fn walk_video_files(root: &Path, extensions: &[String]) -> Vec<DirEntry> {
    let mut files = Vec::new();
    for entry in WalkDir::new(root).into_iter().filter_map(|e| e.ok()) {
        if !entry.file_type().is_file() {
            continue;
        }
        let path = entry.path();
        let ext_ok = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| extensions.contains(&e.to_lowercase()))
            .unwrap_or(false);
        if !ext_ok {
            continue;
        }
        let Ok(meta) = entry.metadata() else { continue };
        if meta.file_type().is_symlink() {
            continue;
        }
        files.push(DirEntry {
            path: path.to_path_buf(),
            size_bytes: meta.len(),
        });
    }
    files
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn walk_video_files_filters_by_extension() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.mkv"), b"x").unwrap();
        std::fs::write(dir.path().join("b.txt"), b"x").unwrap();
        let found = walk_video_files(dir.path(), &["mkv".to_string()]);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].path.file_name().unwrap(), "a.mkv");
    }
}
