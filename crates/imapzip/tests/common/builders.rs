//! Builders for zip archives and MIME messages.

#![allow(dead_code)]

use std::io::{Cursor, Write};

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use zip::write::SimpleFileOptions;
use zip::ZipWriter;

/// Builds a zip archive in memory. Names ending in `/` become directory entries.
pub fn build_zip(entries: &[(&str, &str)]) -> Vec<u8> {
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default();
    for (name, content) in entries {
        if name.ends_with('/') {
            writer.add_directory(*name, options).expect("add directory");
        } else {
            writer.start_file(*name, options).expect("start file");
            writer.write_all(content.as_bytes()).expect("write entry");
        }
    }
    writer.finish().expect("finish zip").into_inner()
}

struct Attachment {
    filename: String,
    content_type: String,
    content: Vec<u8>,
}

/// Builder for `multipart/mixed` messages with base64 attachments.
pub struct MessageBuilder {
    from: String,
    subject: String,
    date: String,
    body: String,
    attachments: Vec<Attachment>,
}

impl MessageBuilder {
    pub fn new() -> Self {
        Self {
            from: "Reports <reports@example.com>".to_string(),
            subject: "Daily export".to_string(),
            date: "Mon, 14 Sep 2015 10:00:00 +0200".to_string(),
            body: "See attached.".to_string(),
            attachments: Vec::new(),
        }
    }

    pub fn from(mut self, from: &str) -> Self {
        self.from = from.to_string();
        self
    }

    pub fn subject(mut self, subject: &str) -> Self {
        self.subject = subject.to_string();
        self
    }

    pub fn date(mut self, date: &str) -> Self {
        self.date = date.to_string();
        self
    }

    /// Attaches a zip archive built from `entries`.
    pub fn zip_attachment(self, filename: &str, entries: &[(&str, &str)]) -> Self {
        self.attachment(filename, "application/zip", build_zip(entries))
    }

    pub fn attachment(mut self, filename: &str, content_type: &str, content: Vec<u8>) -> Self {
        self.attachments.push(Attachment {
            filename: filename.to_string(),
            content_type: content_type.to_string(),
            content,
        });
        self
    }

    pub fn build(self) -> Vec<u8> {
        let boundary = "=_imapzip_test_boundary";
        let mut out = String::new();
        out.push_str(&format!("From: {}\r\n", self.from));
        out.push_str("To: robot@example.com\r\n");
        out.push_str(&format!("Subject: {}\r\n", self.subject));
        out.push_str(&format!("Date: {}\r\n", self.date));
        out.push_str("MIME-Version: 1.0\r\n");
        out.push_str(&format!(
            "Content-Type: multipart/mixed; boundary=\"{}\"\r\n\r\n",
            boundary
        ));

        out.push_str(&format!("--{}\r\n", boundary));
        out.push_str("Content-Type: text/plain; charset=utf-8\r\n\r\n");
        out.push_str(&self.body);
        out.push_str("\r\n");

        for attachment in &self.attachments {
            out.push_str(&format!("--{}\r\n", boundary));
            out.push_str(&format!(
                "Content-Type: {}; name=\"{}\"\r\n",
                attachment.content_type, attachment.filename
            ));
            out.push_str(&format!(
                "Content-Disposition: attachment; filename=\"{}\"\r\n",
                attachment.filename
            ));
            out.push_str("Content-Transfer-Encoding: base64\r\n\r\n");
            let encoded = STANDARD.encode(&attachment.content);
            for line in encoded.as_bytes().chunks(76) {
                out.push_str(std::str::from_utf8(line).expect("base64 is ascii"));
                out.push_str("\r\n");
            }
        }

        out.push_str(&format!("--{}--\r\n", boundary));
        out.into_bytes()
    }
}

/// A plain text message without attachments.
pub fn plain_message(subject: &str) -> Vec<u8> {
    format!(
        "From: alice@example.com\r\nTo: robot@example.com\r\nSubject: {}\r\n\
         Date: Tue, 15 Sep 2015 08:30:00 +0000\r\n\r\nNothing attached.\r\n",
        subject
    )
    .into_bytes()
}
