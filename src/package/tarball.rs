//! Compressed-archive backend.
//!
//! Produces `build/dist/<release>.tar.gz` whose single top-level entry is the
//! release name. Archives are written deterministically: entries sorted,
//! fixed header metadata, zero gzip mtime.

use anyhow::{Context, Result as AnyResult};
use flate2::write::GzEncoder;
use flate2::Compression;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::error::{Error, Format, Result};
use crate::fsutil;
use crate::layout::BuildLayout;
use crate::stage::StagedTree;

/// A written `.tar.gz` artifact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TarArtifact {
    pub path: PathBuf,
}

/// Compress the staged tree into the dist directory.
///
/// The dist directory is cleared first. Fails with [`Error::Packaging`] if
/// the staged tree is absent.
pub fn pack(layout: &BuildLayout, tree: &StagedTree) -> Result<TarArtifact> {
    if !tree.root.is_dir() {
        return Err(Error::Packaging {
            format: Format::Tar,
            message: format!(
                "staged tree {} not found. Run 'pxfbuild stage' first.",
                tree.root.display()
            ),
        });
    }

    let dist = layout.dist_dir();
    fsutil::reset_dir(&dist).map_err(|e| Error::packaging(Format::Tar, e))?;

    let path = dist.join(format!("{}.tar.gz", tree.release_name));
    println!("Creating {}...", path.display());
    write_tar_gz(&tree.root, &tree.release_name, &path)
        .map_err(|e| Error::packaging(Format::Tar, e))?;

    print_size(&path);
    Ok(TarArtifact { path })
}

/// Archive the contents of `src_dir` under the top-level entry `top`.
///
/// Written to a temporary file first and renamed into place.
pub fn write_tar_gz(src_dir: &Path, top: &str, dest: &Path) -> AnyResult<()> {
    let tmp = dest.with_extension("gz.tmp");
    let file = File::create(&tmp).with_context(|| format!("cannot create {}", tmp.display()))?;

    let encoder = GzEncoder::new(BufWriter::new(file), Compression::default());
    let mut builder = tar::Builder::new(encoder);
    builder.mode(tar::HeaderMode::Deterministic);
    // Keep symlinks as links rather than duplicating their targets
    builder.follow_symlinks(false);

    builder.append_dir(top, src_dir)?;
    for entry in WalkDir::new(src_dir)
        .min_depth(1)
        .follow_links(false)
        .sort_by_file_name()
    {
        let entry = entry?;
        let name = Path::new(top).join(entry.path().strip_prefix(src_dir)?);
        if entry.file_type().is_dir() {
            builder.append_dir(&name, entry.path())?;
        } else {
            builder
                .append_path_with_name(entry.path(), &name)
                .with_context(|| format!("cannot archive {}", entry.path().display()))?;
        }
    }

    let encoder = builder.into_inner()?;
    let mut writer = encoder.finish()?;
    writer.flush()?;
    drop(writer);

    fsutil::commit_artifact(&tmp, dest)
}

fn print_size(path: &Path) {
    if let Ok(meta) = std::fs::metadata(path) {
        let size_mb = meta.len() as f64 / 1024.0 / 1024.0;
        println!("  Archive size: {:.2} MB", size_mb);
    }
}
