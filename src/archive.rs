//! Zip extraction for downloaded driver bundles

use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::debug;
use zip::ZipArchive;

#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Invalid zip archive: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("Archive entry {entry:?} would be written outside {}", dest.display())]
    PathTraversal { entry: String, dest: PathBuf },
}

/// Whether `path` names an archive this module can expand
pub fn is_archive(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("zip"))
}

/// Directory an archive expands into: its base name, next to the archive.
///
/// `downloads/AWSNVMe.zip` -> `downloads/AWSNVMe`
pub fn extraction_dir(archive: &Path) -> PathBuf {
    let stem = archive.file_stem().unwrap_or(archive.as_os_str());
    archive.with_file_name(stem)
}

/// Expand `archive` into `dest`, returning the number of files written.
///
/// Every entry name is checked before anything is written; a single entry
/// resolving outside `dest` fails the whole extraction.
pub fn extract_zip(archive: &Path, dest: &Path) -> Result<usize, ArchiveError> {
    let mut zip = ZipArchive::new(File::open(archive)?)?;

    let mut targets = Vec::with_capacity(zip.len());
    for i in 0..zip.len() {
        let entry = zip.by_index(i)?;
        let relative = entry
            .enclosed_name()
            .filter(|path| path.components().next().is_some())
            .ok_or_else(|| ArchiveError::PathTraversal {
                entry: entry.name().to_string(),
                dest: dest.to_path_buf(),
            })?;
        targets.push((dest.join(relative), entry.is_dir()));
    }

    fs::create_dir_all(dest)?;

    let mut written = 0;
    for (i, (target, is_dir)) in targets.into_iter().enumerate() {
        if is_dir {
            fs::create_dir_all(&target)?;
            continue;
        }
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut entry = zip.by_index(i)?;
        let mut out = File::create(&target)?;
        io::copy(&mut entry, &mut out)?;
        written += 1;
    }

    debug!(
        "Extracted {} files from {} into {}",
        written,
        archive.display(),
        dest.display()
    );
    Ok(written)
}
