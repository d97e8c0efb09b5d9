//! Relative path computation for portable symlinks (spec §4.9: "compute a
//! target path relative to the symlink's parent ... so the mirror is
//! portable"). Ground-truthed on `original_source`'s
//! `src/services/transferer.py`, which uses `os.path.relpath`. No crate in
//! this stack provides that directly, so it is implemented here.

use std::path::{Component, Path, PathBuf};

/// Compute `target` relative to `from` (a directory), the way
/// `os.path.relpath(target, from)` does: walk up from `from` with `..`
/// until reaching the common ancestor, then descend into `target`.
///
/// Both paths are expected to be absolute (or both relative to the same
/// base); this does not touch the filesystem.
pub fn relative_to(target: &Path, from: &Path) -> PathBuf {
    let target_components: Vec<Component> = target.components().collect();
    let from_components: Vec<Component> = from.components().collect();

    let common_len = target_components
        .iter()
        .zip(from_components.iter())
        .take_while(|(a, b)| a == b)
        .count();

    let mut result = PathBuf::new();
    for _ in common_len..from_components.len() {
        result.push("..");
    }
    for component in &target_components[common_len..] {
        result.push(component.as_os_str());
    }

    if result.as_os_str().is_empty() {
        PathBuf::from(".")
    } else {
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn relative_to_sibling_directory() {
        let target = Path::new("/storage/Films/Action/M/Mad Max (2015).mkv");
        let from = Path::new("/video/Films/Action/M");
        let rel = relative_to(target, from);
        assert_eq!(
            rel,
            PathBuf::from("../../../../storage/Films/Action/M/Mad Max (2015).mkv")
        );
    }

    #[test]
    fn relative_to_same_directory() {
        let target = Path::new("/a/b/file.mkv");
        let from = Path::new("/a/b");
        assert_eq!(relative_to(target, from), PathBuf::from("file.mkv"));
    }
}
