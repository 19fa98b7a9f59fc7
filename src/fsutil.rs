//! Filesystem helpers shared by staging and the packaging backends.

use anyhow::{bail, Context, Result};
use std::fs;
use std::os::unix::fs::{symlink, PermissionsExt};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Remove `parent/name` if present and create it fresh.
///
/// Every run starts from an empty directory, so nothing from a previous run
/// can leak into the next one.
pub fn prepare_work_dir(parent: &Path, name: &str) -> Result<PathBuf> {
    let work_dir = parent.join(name);
    reset_dir(&work_dir)?;
    Ok(work_dir)
}

/// Remove `dir` if present and create it empty.
pub fn reset_dir(dir: &Path) -> Result<()> {
    if dir.exists() {
        fs::remove_dir_all(dir).with_context(|| format!("cannot remove {}", dir.display()))?;
    }
    fs::create_dir_all(dir).with_context(|| format!("cannot create {}", dir.display()))?;
    Ok(())
}

/// Copy the contents of `src` into `dst`, preserving relative paths,
/// permissions and symlinks.
///
/// Entries are visited in sorted order. A file that already exists in `dst`
/// is overwritten (last writer wins). Returns the number of files copied.
pub fn copy_tree(src: &Path, dst: &Path) -> Result<usize> {
    if !src.is_dir() {
        bail!("{} is not a directory", src.display());
    }
    fs::create_dir_all(dst).with_context(|| format!("cannot create {}", dst.display()))?;

    let mut copied = 0;
    for entry in WalkDir::new(src)
        .min_depth(1)
        .follow_links(false)
        .sort_by_file_name()
    {
        let entry = entry.with_context(|| format!("cannot walk {}", src.display()))?;
        let rel = entry.path().strip_prefix(src)?;
        let target = dst.join(rel);
        let file_type = entry.file_type();

        if file_type.is_dir() {
            fs::create_dir_all(&target)
                .with_context(|| format!("cannot create {}", target.display()))?;
            continue;
        }

        if target.symlink_metadata().is_ok() {
            if target.is_dir() && !target.is_symlink() {
                bail!(
                    "cannot overwrite directory {} with file {}",
                    target.display(),
                    entry.path().display()
                );
            }
            tracing::debug!(path = %rel.display(), from = %src.display(), "overwriting staged file");
            fs::remove_file(&target)
                .with_context(|| format!("cannot replace {}", target.display()))?;
        }

        if file_type.is_symlink() {
            let link = fs::read_link(entry.path())?;
            symlink(&link, &target)
                .with_context(|| format!("cannot create symlink {}", target.display()))?;
        } else {
            fs::copy(entry.path(), &target).with_context(|| {
                format!(
                    "cannot copy {} to {}",
                    entry.path().display(),
                    target.display()
                )
            })?;
        }
        copied += 1;
    }

    Ok(copied)
}

/// Copy a single file to `dst` with mode 0755, creating parent directories.
pub fn install_executable(src: &Path, dst: &Path) -> Result<()> {
    if !src.is_file() {
        bail!("{} not found", src.display());
    }
    if let Some(parent) = dst.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::copy(src, dst)
        .with_context(|| format!("cannot copy {} to {}", src.display(), dst.display()))?;
    fs::set_permissions(dst, fs::Permissions::from_mode(0o755))?;
    Ok(())
}

/// Write a file, creating parent directories as needed.
pub fn write_file_with_dirs<P: AsRef<Path>, C: AsRef<[u8]>>(path: P, content: C) -> Result<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, content).with_context(|| format!("cannot write {}", path.display()))?;
    Ok(())
}

/// Atomically move a finished artifact into place.
pub fn commit_artifact(tmp: &Path, dst: &Path) -> Result<()> {
    fs::rename(tmp, dst)
        .with_context(|| format!("cannot move {} to {}", tmp.display(), dst.display()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prepare_work_dir_is_fresh() {
        let dir = tempfile::tempdir().unwrap();
        let work = prepare_work_dir(dir.path(), "rpmbuild").unwrap();
        fs::write(work.join("stale"), "x").unwrap();

        let work = prepare_work_dir(dir.path(), "rpmbuild").unwrap();
        assert!(work.is_dir());
        assert_eq!(fs::read_dir(&work).unwrap().count(), 0);
    }

    #[test]
    fn test_copy_tree_preserves_layout_and_modes() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("src");
        fs::create_dir_all(src.join("bin")).unwrap();
        fs::create_dir_all(src.join("empty")).unwrap();
        fs::write(src.join("bin/pxf"), "#!/bin/sh\n").unwrap();
        fs::set_permissions(src.join("bin/pxf"), fs::Permissions::from_mode(0o755)).unwrap();
        symlink("pxf", src.join("bin/pxf-cli")).unwrap();

        let dst = dir.path().join("dst");
        let copied = copy_tree(&src, &dst).unwrap();

        assert_eq!(copied, 2);
        assert!(dst.join("empty").is_dir());
        let mode = fs::metadata(dst.join("bin/pxf")).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o755);
        assert_eq!(fs::read_link(dst.join("bin/pxf-cli")).unwrap(), PathBuf::from("pxf"));
    }

    #[test]
    fn test_copy_tree_last_writer_wins() {
        let dir = tempfile::tempdir().unwrap();
        let first = dir.path().join("first");
        let second = dir.path().join("second");
        fs::create_dir_all(first.join("conf")).unwrap();
        fs::create_dir_all(second.join("conf")).unwrap();
        fs::write(first.join("conf/pxf-env.sh"), "first").unwrap();
        fs::write(second.join("conf/pxf-env.sh"), "second").unwrap();

        let dst = dir.path().join("dst");
        copy_tree(&first, &dst).unwrap();
        copy_tree(&second, &dst).unwrap();

        assert_eq!(fs::read_to_string(dst.join("conf/pxf-env.sh")).unwrap(), "second");
    }

    #[test]
    fn test_copy_tree_missing_source() {
        let dir = tempfile::tempdir().unwrap();
        assert!(copy_tree(&dir.path().join("missing"), &dir.path().join("dst")).is_err());
    }

    #[test]
    fn test_install_executable() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("install_binary");
        fs::write(&src, "#!/bin/sh\n").unwrap();
        let dst = dir.path().join("out/install_component");

        install_executable(&src, &dst).unwrap();
        let mode = fs::metadata(&dst).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o755);
    }
}
