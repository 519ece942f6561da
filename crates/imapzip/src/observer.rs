//! Observability hooks for the extraction run.
//!
//! The extractor reports what it does through an [`ExtractionObserver`]
//! instead of calling a global logger directly. [`TracingObserver`] is the
//! default and turns every hook into a structured `tracing` event.

use tracing::{info, warn};

use crate::archive::{ExtractedFile, ZipEntryInfo};
use crate::digest::MessageDigestId;
use crate::message::MessageSummary;

/// Receives progress notifications from a [`MailAttachmentExtractor`](crate::MailAttachmentExtractor).
///
/// All methods have empty default bodies so implementations only override what they need.
pub trait ExtractionObserver: Send + Sync {
    /// An unread message is about to be processed.
    fn message_started(&self, _uid: u32, _digest: &MessageDigestId, _summary: &MessageSummary) {}

    /// An attachment part was skipped because it is not a zip archive.
    fn attachment_ignored(&self, _digest: &MessageDigestId, _filename: Option<&str>) {}

    /// A zip entry was read from the archive's central directory.
    fn entry_found(&self, _digest: &MessageDigestId, _entry: &ZipEntryInfo) {}

    /// A zip entry was not extracted because its name escapes the output directory.
    fn entry_rejected(&self, _digest: &MessageDigestId, _entry_name: &str) {}

    /// A regular zip entry was written to disk.
    fn file_extracted(&self, _file: &ExtractedFile) {}

    /// The message was fully processed and flagged as seen.
    fn message_completed(&self, _uid: u32, _digest: &MessageDigestId, _extracted: usize) {}
}

/// Observer that emits `tracing` events with structured fields.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingObserver;

impl ExtractionObserver for TracingObserver {
    fn message_started(&self, uid: u32, digest: &MessageDigestId, summary: &MessageSummary) {
        for from in &summary.from {
            info!(uid, from = %from, "FROM {}", from);
        }
        info!(
            uid,
            sent_date = summary.sent_date.as_deref().unwrap_or("(unknown)"),
            subject = summary.subject.as_deref().unwrap_or("(no subject)"),
            digest = %digest,
            "Processing message"
        );
    }

    fn attachment_ignored(&self, digest: &MessageDigestId, filename: Option<&str>) {
        info!(
            digest = %digest,
            filename = filename.unwrap_or("(unnamed)"),
            "Ignoring attachment, no .zip file found"
        );
    }

    fn entry_found(&self, digest: &MessageDigestId, entry: &ZipEntryInfo) {
        info!(
            digest = %digest,
            entry = %entry.name,
            size = entry.size,
            compressed_size = entry.compressed_size,
            "name: {:<20} | size: {:>6} | compressed size: {:>6}",
            entry.name,
            entry.size,
            entry.compressed_size
        );
    }

    fn entry_rejected(&self, digest: &MessageDigestId, entry_name: &str) {
        warn!(
            digest = %digest,
            entry = %entry_name,
            "Skipping zip entry with a path outside the output directory"
        );
    }

    fn file_extracted(&self, file: &ExtractedFile) {
        info!(
            digest = %file.digest,
            entry = %file.entry_name,
            size = file.size,
            path = %file.path.display(),
            "Extracted file"
        );
    }

    fn message_completed(&self, uid: u32, digest: &MessageDigestId, extracted: usize) {
        info!(uid, digest = %digest, extracted, "Message marked as seen");
    }
}
