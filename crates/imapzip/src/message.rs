//! Message parsing and attachment-part selection.

use base64::alphabet;
use base64::engine::general_purpose::{GeneralPurpose, GeneralPurposeConfig};
use base64::engine::DecodePaddingMode;
use base64::Engine;
use log::debug;
use mail_parser::{Address, Message, MessageParser, MessagePart, MimeHeaders, PartType};

use crate::error::{ExtractorError, Result};

/// File extension recognised as a zip archive, compared case-insensitively.
pub const ZIP_FILE_EXT: &str = ".zip";

/// MIME base64 bodies are line-wrapped and not always padded.
const MIME_BASE64: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new()
        .with_decode_padding_mode(DecodePaddingMode::Indifferent)
        .with_decode_allow_trailing_bits(true),
);

/// Header fields reported for every processed message.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MessageSummary {
    /// Every sender address, formatted as "Name <addr>" when a display name exists.
    pub from: Vec<String>,
    /// The Date header, RFC 3339.
    pub sent_date: Option<String>,
    pub subject: Option<String>,
}

/// A body part carrying an attachment disposition or a filename.
#[derive(Debug, Clone)]
pub struct AttachmentPart {
    pub filename: Option<String>,
    pub disposition: Option<String>,
    /// Transfer-decoded content.
    pub content: Vec<u8>,
}

impl AttachmentPart {
    pub fn is_zip(&self) -> bool {
        self.filename.as_deref().is_some_and(has_zip_extension)
    }
}

/// A parsed message reduced to what extraction needs.
#[derive(Debug, Clone)]
pub struct ParsedMessage {
    pub summary: MessageSummary,
    pub attachments: Vec<AttachmentPart>,
}

/// Parses a raw RFC 5322 message and collects its attachment parts in body order.
pub fn parse_message(raw: &[u8], uid: u32) -> Result<ParsedMessage> {
    let message = MessageParser::default().parse(raw).ok_or_else(|| {
        ExtractorError::Extraction(format!("message UID {} could not be parsed", uid))
    })?;

    let summary = summarize(&message);
    let mut attachments = Vec::new();

    for part in message.parts.iter() {
        let filename = attachment_filename(part);
        let disposition = part
            .content_disposition()
            .map(|cd| cd.ctype().to_ascii_lowercase());

        if !is_attachment(disposition.as_deref(), filename.as_deref()) {
            continue;
        }

        let content = match &part.body {
            PartType::Binary(data) | PartType::InlineBinary(data) => data.to_vec(),
            // Text parts come back charset-decoded; attachments need their bytes
            PartType::Text(_) | PartType::Html(_) => raw_body(&message, part, uid)?,
            _ => continue,
        };

        debug!(
            "UID {}: attachment part {:?} ({:?}, {} bytes)",
            uid,
            filename,
            disposition,
            content.len()
        );

        attachments.push(AttachmentPart {
            filename,
            disposition,
            content,
        });
    }

    Ok(ParsedMessage {
        summary,
        attachments,
    })
}

/// Body of `part` as transferred, with only its Content-Transfer-Encoding undone.
fn raw_body(message: &Message, part: &MessagePart, uid: u32) -> Result<Vec<u8>> {
    let start = part.offset_body as usize;
    let end = part.offset_end as usize;
    let body = message.raw_message().get(start..end).ok_or_else(|| {
        ExtractorError::Extraction(format!("message UID {}: part body out of range", uid))
    })?;

    let encoding = part
        .content_transfer_encoding()
        .map(|e| e.trim().to_ascii_lowercase());
    match encoding.as_deref() {
        Some("base64") => decode_base64(body).map_err(|e| {
            ExtractorError::Extraction(format!("message UID {}: invalid base64 body: {}", uid, e))
        }),
        Some("quoted-printable") => Ok(decode_quoted_printable(body)),
        _ => Ok(body.to_vec()),
    }
}

fn decode_base64(body: &[u8]) -> std::result::Result<Vec<u8>, base64::DecodeError> {
    let compact: Vec<u8> = body
        .iter()
        .copied()
        .filter(|b| !b.is_ascii_whitespace())
        .collect();
    MIME_BASE64.decode(compact)
}

/// Lenient RFC 2045 decoding: malformed escapes are kept literally.
fn decode_quoted_printable(body: &[u8]) -> Vec<u8> {
    let mut result = Vec::with_capacity(body.len());
    let mut i = 0;
    while i < body.len() {
        if body[i] != b'=' {
            result.push(body[i]);
            i += 1;
            continue;
        }

        // Soft line break
        match body.get(i + 1..) {
            Some([b'\r', b'\n', ..]) => {
                i += 3;
                continue;
            }
            Some([b'\n', ..]) => {
                i += 2;
                continue;
            }
            _ => {}
        }

        let byte = body
            .get(i + 1..i + 3)
            .and_then(|hex| std::str::from_utf8(hex).ok())
            .and_then(|hex| u8::from_str_radix(hex, 16).ok());
        match byte {
            Some(byte) => {
                result.push(byte);
                i += 3;
            }
            None => {
                result.push(b'=');
                i += 1;
            }
        }
    }
    result
}

/// A part is an attachment candidate when its disposition is `attachment` or
/// it has a non-empty filename.
pub fn is_attachment(disposition: Option<&str>, filename: Option<&str>) -> bool {
    disposition.is_some_and(|d| d.eq_ignore_ascii_case("attachment"))
        || filename.is_some_and(|f| !f.is_empty())
}

pub fn has_zip_extension(filename: &str) -> bool {
    filename.len() >= ZIP_FILE_EXT.len()
        && filename
            .get(filename.len() - ZIP_FILE_EXT.len()..)
            .is_some_and(|ext| ext.eq_ignore_ascii_case(ZIP_FILE_EXT))
}

fn summarize(message: &Message) -> MessageSummary {
    MessageSummary {
        from: message.from().map(format_addresses).unwrap_or_default(),
        sent_date: message.date().map(|d| d.to_rfc3339()),
        subject: message.subject().map(|s| s.to_string()),
    }
}

fn attachment_filename(part: &MessagePart) -> Option<String> {
    part.attachment_name()
        .or_else(|| part.content_type().and_then(|ct| ct.attribute("name")))
        .map(|s| s.to_string())
}

fn format_addresses(address: &Address) -> Vec<String> {
    match address {
        Address::List(list) => list.iter().map(format_address).collect(),
        Address::Group(groups) => groups
            .iter()
            .flat_map(|g| g.addresses.iter())
            .map(format_address)
            .collect(),
    }
}

fn format_address(addr: &mail_parser::Addr) -> String {
    if let Some(name) = addr.name() {
        format!("{} <{}>", name, addr.address().unwrap_or_default())
    } else {
        addr.address().unwrap_or_default().to_string()
    }
}
