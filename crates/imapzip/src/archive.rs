//! Zip attachment extraction into the output directory.

use std::fs::{self, File};
use std::io::{self, Cursor, Read, Write};
use std::path::{Path, PathBuf};

use log::{debug, warn};
use walkdir::WalkDir;

use crate::digest::MessageDigestId;
use crate::error::{ExtractorError, Result};
use crate::observer::ExtractionObserver;

const COPY_BUFFER_SIZE: usize = 8 * 1024;

/// A regular file written from a zip entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedFile {
    /// `<output dir>/<digest>_<entry name>`.
    pub path: PathBuf,
    pub digest: MessageDigestId,
    /// Entry name as stored in the archive.
    pub entry_name: String,
    /// Bytes written.
    pub size: u64,
}

/// Central-directory metadata of one zip entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ZipEntryInfo {
    pub name: String,
    pub size: u64,
    pub compressed_size: u64,
}

/// Writes zip attachments and their entries under a single output directory.
#[derive(Debug, Clone)]
pub struct ZipExtractor {
    output_dir: PathBuf,
}

impl ZipExtractor {
    pub fn new<P: AsRef<Path>>(output_dir: P) -> Self {
        Self {
            output_dir: output_dir.as_ref().to_path_buf(),
        }
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Path of the temporary copy of an attachment: `<output dir>/<digest>_<filename>`.
    pub fn spool_path(&self, digest: &MessageDigestId, filename: &str) -> PathBuf {
        self.output_dir
            .join(digest.prefixed(&sanitize_filename(filename)))
    }

    /// Spools a zip attachment to disk, extracts every entry and removes the
    /// temporary archive again.
    ///
    /// Returns the regular files written, in archive order. Directory entries
    /// are created but not returned.
    pub fn extract_attachment(
        &self,
        digest: &MessageDigestId,
        filename: &str,
        content: &[u8],
        observer: &dyn ExtractionObserver,
    ) -> Result<Vec<ExtractedFile>> {
        fs::create_dir_all(&self.output_dir)
            .map_err(|e| ExtractorError::extraction(&self.output_dir, e))?;

        let zip_path = self.spool_path(digest, filename);
        debug!("Spooling attachment to {}", zip_path.display());

        let result = self
            .spool(&zip_path, content)
            .and_then(|()| self.extract_archive(content, &zip_path, digest, observer));

        // An entry may share the spooled archive's name and has replaced it
        let spool_overwritten = result
            .as_ref()
            .is_ok_and(|files| files.iter().any(|f| f.path == zip_path));
        if !spool_overwritten {
            if let Err(e) = fs::remove_file(&zip_path) {
                debug!(
                    "Could not remove temporary archive {}: {}",
                    zip_path.display(),
                    e
                );
            }
        }

        result
    }

    fn spool(&self, zip_path: &Path, mut content: &[u8]) -> Result<()> {
        let mut file =
            File::create(zip_path).map_err(|e| ExtractorError::extraction(zip_path, e))?;
        copy_stream(&mut content, &mut file).map_err(|e| ExtractorError::extraction(zip_path, e))?;
        Ok(())
    }

    /// Entries are read from `content` so that writing an entry named like the
    /// spooled archive cannot truncate the archive being read.
    fn extract_archive(
        &self,
        content: &[u8],
        zip_path: &Path,
        digest: &MessageDigestId,
        observer: &dyn ExtractionObserver,
    ) -> Result<Vec<ExtractedFile>> {
        let mut archive = zip::ZipArchive::new(Cursor::new(content))
            .map_err(|e| ExtractorError::extraction(zip_path, e))?;

        let mut extracted = Vec::new();

        for index in 0..archive.len() {
            let mut entry = archive
                .by_index(index)
                .map_err(|e| ExtractorError::extraction(zip_path, e))?;

            let info = ZipEntryInfo {
                name: entry.name().to_string(),
                size: entry.size(),
                compressed_size: entry.compressed_size(),
            };
            observer.entry_found(digest, &info);

            if entry.enclosed_name().is_none() {
                observer.entry_rejected(digest, &info.name);
                continue;
            }

            let target = self.output_dir.join(digest.prefixed(&info.name));

            if is_directory_marker(&info.name) {
                fs::create_dir_all(&target).map_err(|e| ExtractorError::extraction(&target, e))?;
                continue;
            }

            if let Some(parent) = target.parent() {
                fs::create_dir_all(parent).map_err(|e| ExtractorError::extraction(parent, e))?;
            }

            let mut out =
                File::create(&target).map_err(|e| ExtractorError::extraction(&target, e))?;
            let size =
                copy_stream(&mut entry, &mut out).map_err(|e| ExtractorError::extraction(&target, e))?;

            let file = ExtractedFile {
                path: target,
                digest: digest.clone(),
                entry_name: info.name,
                size,
            };
            observer.file_extracted(&file);
            extracted.push(file);
        }

        Ok(extracted)
    }

    /// Deletes every regular file directly inside the output directory.
    ///
    /// Subdirectories and their contents are left untouched. Files that cannot
    /// be removed are logged and skipped. Returns the number of files deleted.
    pub fn cleanup_working_directory(&self) -> Result<usize> {
        if !self.output_dir.exists() {
            return Ok(0);
        }

        let mut removed = 0;
        for entry in WalkDir::new(&self.output_dir).min_depth(1).max_depth(1) {
            let entry = entry.map_err(|e| ExtractorError::extraction(&self.output_dir, e))?;
            if entry.file_type().is_dir() {
                continue;
            }

            match fs::remove_file(entry.path()) {
                Ok(()) => removed += 1,
                Err(e) => warn!("Failed to remove {}: {}", entry.path().display(), e),
            }
        }

        debug!(
            "Removed {} files from {}",
            removed,
            self.output_dir.display()
        );
        Ok(removed)
    }
}

/// Zip directory entries are marked by a trailing separator.
pub fn is_directory_marker(name: &str) -> bool {
    name.ends_with('/')
}

fn copy_stream<R: Read, W: Write>(reader: &mut R, writer: &mut W) -> io::Result<u64> {
    let mut buf = [0u8; COPY_BUFFER_SIZE];
    let mut total = 0u64;
    loop {
        let n = match reader.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        };
        writer.write_all(&buf[..n])?;
        total += n as u64;
    }
    writer.flush()?;
    Ok(total)
}

/// Keeps an attachment filename to a single path component.
fn sanitize_filename(filename: &str) -> String {
    let cleaned: String = filename
        .chars()
        .map(|c| {
            if c == '/' || c == '\\' || c.is_control() {
                '_'
            } else {
                c
            }
        })
        .collect();

    let cleaned = cleaned.trim_matches(|c| c == '.' || c == ' ');
    if cleaned.is_empty() {
        "attachment.zip".to_string()
    } else {
        cleaned.to_string()
    }
}
