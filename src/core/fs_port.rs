//! The Filesystem Port (spec §2, §4.9): existence, size, hash, move, copy,
//! delete, list video files, symlink ops, behind a trait so the core stays
//! testable against an in-memory fake and the concrete adapter
//! (`infra::fs::StdFilesystem`) can be swapped. Ground-truthed on the
//! teacher's `utils::fs` (`move_file`, `ensure_directory`) generalized into
//! an async trait per spec §5 (every filesystem metadata read on
//! potentially remote paths is a suspension point).

use std::path::{Path, PathBuf};

use async_trait::async_trait;

use crate::error::Result;

/// A video file discovered while walking a directory tree.
#[derive(Debug, Clone)]
pub struct DirEntry {
    pub path: PathBuf,
    pub size_bytes: u64,
}

#[async_trait]
pub trait Filesystem: Send + Sync {
    async fn exists(&self, path: &Path) -> bool;
    async fn is_symlink(&self, path: &Path) -> bool;
    async fn size(&self, path: &Path) -> Result<u64>;

    /// SHA-256 of the first 10 MiB of `path` (spec §4.9 conflict check),
    /// hex-encoded.
    async fn hash_prefix(&self, path: &Path) -> Result<String>;

    async fn create_dir_all(&self, path: &Path) -> Result<()>;

    /// Atomic move: rename within the same filesystem, falling back to
    /// copy-then-delete across filesystems (spec §4.9 step 2).
    async fn move_file(&self, from: &Path, to: &Path) -> Result<()>;

    async fn remove_file(&self, path: &Path) -> Result<()>;
    async fn remove_dir(&self, path: &Path) -> Result<()>;

    /// List immediate children of a directory (files and subdirectories),
    /// used by the Cleanup Engine's oversized-directory check.
    async fn list_children(&self, dir: &Path) -> Result<Vec<PathBuf>>;

    /// Recursively list files with an extension in the given video set,
    /// skipping symlinks and ignored-substring names (the Scanner's walk).
    async fn list_video_files(&self, root: &Path, video_extensions: &[&str]) -> Result<Vec<DirEntry>>;

    /// Create a symlink at `link` pointing at `target` (already expressed
    /// relative to `link`'s parent). Unlinks any existing entry at `link`
    /// first (spec §4.9 step 3).
    async fn create_symlink(&self, target: &Path, link: &Path) -> Result<()>;

    /// Raw (unresolved) target of a symlink.
    async fn read_symlink(&self, link: &Path) -> Result<PathBuf>;
}
