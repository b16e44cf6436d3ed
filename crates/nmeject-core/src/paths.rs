use crate::pkg::PACKAGE_JSON;
use std::path::{Path, PathBuf};

/// Find the nearest `package.json` by walking up from `cwd`.
///
/// Returns the path of the manifest file itself, or `None` if no ancestor
/// holds one.
#[must_use]
pub fn find_manifest(cwd: &Path) -> Option<PathBuf> {
    let mut current = cwd.to_path_buf();

    loop {
        let candidate = current.join(PACKAGE_JSON);
        if candidate.is_file() {
            return Some(candidate);
        }

        if !current.pop() {
            return None;
        }
    }
}

/// Resolve `path` against `base` unless it is already absolute.
#[must_use]
pub fn absolutize(base: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_find_manifest_in_cwd() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("package.json"), "{}").unwrap();

        assert_eq!(
            find_manifest(dir.path()),
            Some(dir.path().join("package.json"))
        );
    }

    #[test]
    fn test_find_manifest_walks_up() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("package.json"), "{}").unwrap();
        let nested = dir.path().join("src/lib");
        fs::create_dir_all(&nested).unwrap();

        assert_eq!(find_manifest(&nested), Some(dir.path().join("package.json")));
    }

    #[test]
    fn test_find_manifest_ignores_directories() {
        let dir = tempdir().unwrap();
        let nested = dir.path().join("a");
        fs::create_dir_all(nested.join("package.json")).unwrap();
        fs::write(dir.path().join("package.json"), "{}").unwrap();

        assert_eq!(find_manifest(&nested), Some(dir.path().join("package.json")));
    }

    #[test]
    fn test_absolutize() {
        assert_eq!(
            absolutize(Path::new("/work"), Path::new("out")),
            PathBuf::from("/work/out")
        );
        assert_eq!(
            absolutize(Path::new("/work"), Path::new("/tmp/out")),
            PathBuf::from("/tmp/out")
        );
    }
}
