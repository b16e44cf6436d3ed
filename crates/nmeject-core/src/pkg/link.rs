//! Symlink creation for the shared `.bin` directory.

use super::bin::AliasEntry;
use nmeject_util::path::normalize;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Create `<alias_dir>/<entry.name>` pointing at `entry.target`.
///
/// The link target is stored relative so the output tree can be moved as a
/// whole. Any existing entry at the link path is replaced. The script the
/// link points at is made executable.
///
/// # Errors
/// Returns an error if the alias directory cannot be created, an existing
/// entry cannot be removed, the link cannot be created, or the target
/// script does not exist.
pub fn link_alias(alias_dir: &Path, entry: &AliasEntry) -> io::Result<PathBuf> {
    fs::create_dir_all(alias_dir)?;

    let link_path = alias_dir.join(&entry.name);
    let target = normalize(&alias_dir.join(&entry.target));

    if link_path.symlink_metadata().is_ok() {
        remove_existing(&link_path)?;
    }

    create_file_link(&entry.target, &link_path)?;
    make_executable(&target)?;

    Ok(link_path)
}

/// Remove a symlink, file, or directory occupying a link path.
fn remove_existing(path: &Path) -> io::Result<()> {
    let metadata = fs::symlink_metadata(path)?;

    if metadata.file_type().is_symlink() {
        #[cfg(windows)]
        {
            // Directory symlinks must be removed with remove_dir on Windows.
            if fs::remove_file(path).is_err() {
                return fs::remove_dir(path);
            }
            return Ok(());
        }
        #[cfg(not(windows))]
        return fs::remove_file(path);
    }

    if metadata.is_dir() {
        fs::remove_dir_all(path)
    } else {
        fs::remove_file(path)
    }
}

/// Create a file symlink at `link` pointing to `target`.
fn create_file_link(target: &Path, link: &Path) -> io::Result<()> {
    #[cfg(unix)]
    {
        std::os::unix::fs::symlink(target, link)
    }

    #[cfg(windows)]
    {
        std::os::windows::fs::symlink_file(target, link)
    }

    #[cfg(not(any(unix, windows)))]
    {
        // Fallback: copy the script
        let parent = link.parent().unwrap_or(Path::new("."));
        fs::copy(parent.join(target), link).map(|_| ())
    }
}

/// Add execute permission for user, group and others.
fn make_executable(path: &Path) -> io::Result<()> {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;

        let mut perms = fs::metadata(path)?.permissions();
        perms.set_mode(perms.mode() | 0o755);
        fs::set_permissions(path, perms)
    }

    #[cfg(not(unix))]
    {
        fs::metadata(path).map(|_| ())
    }
}
