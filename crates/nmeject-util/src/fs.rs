use std::fs;
use std::io;
use std::path::Path;
use walkdir::WalkDir;

/// Read a file to string, replacing invalid UTF-8 sequences with the replacement character.
///
/// # Errors
/// Returns an error if the file cannot be read.
pub fn read_to_string_lossy(path: &Path) -> io::Result<String> {
    let bytes = fs::read(path)?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

/// Counts produced by [`copy_tree`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CopyStats {
    /// Directories created under the destination.
    pub dirs: usize,
    /// Regular files copied.
    pub files: usize,
}

/// Recursively copy `src` into `dst`, dereferencing symlinks.
///
/// `exclude` receives each entry's path relative to `src`; returning `true`
/// skips that entry and, for directories, everything below it. The root
/// itself is never passed to `exclude`.
///
/// Existing files under `dst` are overwritten. Symlinked files are copied as
/// the files they point to, and symlinked directories are descended into.
///
/// # Errors
/// Returns an error if any entry cannot be read, created or copied, including
/// dangling symlinks and symlink loops.
pub fn copy_tree<F>(src: &Path, dst: &Path, exclude: F) -> io::Result<CopyStats>
where
    F: Fn(&Path) -> bool,
{
    let mut stats = CopyStats::default();

    let walker = WalkDir::new(src)
        .follow_links(true)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| {
            entry.depth() == 0
                || entry
                    .path()
                    .strip_prefix(src)
                    .map_or(true, |rel| !exclude(rel))
        });

    for entry in walker {
        let entry = entry?;
        let rel = entry
            .path()
            .strip_prefix(src)
            .map_err(|e| io::Error::new(io::ErrorKind::Other, e))?;
        let target = dst.join(rel);

        if entry.file_type().is_dir() {
            fs::create_dir_all(&target)?;
            stats.dirs += 1;
        } else {
            if let Some(parent) = target.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::copy(entry.path(), &target)?;
            stats.files += 1;
        }
    }

    Ok(stats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::{tempdir, NamedTempFile};

    #[test]
    fn test_read_to_string_lossy_valid_utf8() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(br#"{"name":"a"}"#).unwrap();
        file.flush().unwrap();

        let content = read_to_string_lossy(file.path()).unwrap();
        assert_eq!(content, r#"{"name":"a"}"#);
    }

    #[test]
    fn test_read_to_string_lossy_invalid_utf8() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(&[0x7b, 0x7d, 0x80]).unwrap();
        file.flush().unwrap();

        let content = read_to_string_lossy(file.path()).unwrap();
        assert!(content.starts_with("{}"));
        assert!(content.contains('\u{FFFD}'));
    }

    #[test]
    fn test_copy_tree_copies_nested_files() {
        let src = tempdir().unwrap();
        let dst = tempdir().unwrap();
        fs::create_dir_all(src.path().join("lib/util")).unwrap();
        fs::write(src.path().join("index.js"), "module.exports = 1;").unwrap();
        fs::write(src.path().join("lib/util/a.js"), "a").unwrap();

        let out = dst.path().join("pkg");
        let stats = copy_tree(src.path(), &out, |_| false).unwrap();

        assert_eq!(stats.files, 2);
        assert_eq!(
            fs::read_to_string(out.join("index.js")).unwrap(),
            "module.exports = 1;"
        );
        assert_eq!(fs::read_to_string(out.join("lib/util/a.js")).unwrap(), "a");
    }

    #[test]
    fn test_copy_tree_exclude_prunes_subtree() {
        let src = tempdir().unwrap();
        let dst = tempdir().unwrap();
        fs::create_dir_all(src.path().join("skip/deep")).unwrap();
        fs::write(src.path().join("skip/deep/x"), "x").unwrap();
        fs::write(src.path().join("keep"), "k").unwrap();

        let out = dst.path().join("pkg");
        copy_tree(src.path(), &out, |rel| rel == Path::new("skip")).unwrap();

        assert!(out.join("keep").exists());
        assert!(!out.join("skip").exists());
    }

    #[cfg(unix)]
    #[test]
    fn test_copy_tree_dereferences_symlinks() {
        let src = tempdir().unwrap();
        let dst = tempdir().unwrap();
        let real = tempdir().unwrap();
        fs::write(real.path().join("target.js"), "real").unwrap();
        std::os::unix::fs::symlink(real.path().join("target.js"), src.path().join("link.js"))
            .unwrap();

        let out = dst.path().join("pkg");
        copy_tree(src.path(), &out, |_| false).unwrap();

        let meta = fs::symlink_metadata(out.join("link.js")).unwrap();
        assert!(meta.file_type().is_file());
        assert_eq!(fs::read_to_string(out.join("link.js")).unwrap(), "real");
    }

    #[cfg(unix)]
    #[test]
    fn test_copy_tree_dangling_symlink_is_error() {
        let src = tempdir().unwrap();
        let dst = tempdir().unwrap();
        std::os::unix::fs::symlink(src.path().join("missing"), src.path().join("broken"))
            .unwrap();

        let result = copy_tree(src.path(), &dst.path().join("pkg"), |_| false);
        assert!(result.is_err());
    }
}
