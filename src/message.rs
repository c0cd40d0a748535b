//! MIME multipart message assembly for the Gmail raw-message interface
//!
//! Builds a multipart/mixed RFC 2822 message with one plain-text body part
//! and one base64 binary part per attachment, then encodes the serialized
//! message with URL-safe base64 into the single `raw` payload the Gmail
//! send endpoint accepts.

use base64::engine::general_purpose::{STANDARD, URL_SAFE};
use base64::Engine as _;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;
use uuid::Uuid;

use crate::error::{CourierError, Result};

/// RFC 2045 line length limit for base64 bodies
const BASE64_LINE_LENGTH: usize = 76;

/// Extensions that denote an encoding wrapper rather than a content type;
/// these always get the generic binary content type
const ENCODED_EXTENSIONS: &[&str] = &["gz", "bz2", "xz"];

/// A message ready to be assembled: addresses, subject, body text and
/// the ordered list of attachment paths. Attachments are read fully into
/// memory at assembly time; e-book files are small enough for that.
#[derive(Debug, Clone)]
pub struct OutgoingMessage {
    pub sender: String,
    pub to: String,
    pub subject: String,
    pub body: String,
    pub attachments: Vec<PathBuf>,
}

/// The encoded payload submitted to the provider as one atomic unit
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EncodedMessage {
    pub raw: String,
}

impl EncodedMessage {
    /// Decode back to the RFC 2822 wire representation
    pub fn to_rfc822(&self) -> Result<Vec<u8>> {
        URL_SAFE
            .decode(&self.raw)
            .map_err(|e| CourierError::InvalidMessageFormat(format!("Invalid raw payload: {}", e)))
    }
}

impl OutgoingMessage {
    pub fn new(
        sender: impl Into<String>,
        to: impl Into<String>,
        subject: impl Into<String>,
        body: impl Into<String>,
        attachments: Vec<PathBuf>,
    ) -> Self {
        Self {
            sender: sender.into(),
            to: to.into(),
            subject: subject.into(),
            body: body.into(),
            attachments,
        }
    }

    /// Serialize to the RFC 2822 wire representation.
    ///
    /// An unreadable attachment fails the whole message; no partial
    /// message is ever produced.
    pub fn to_mime(&self) -> Result<Vec<u8>> {
        let boundary = format!("courier_{}", Uuid::new_v4().simple());
        let mut out = String::new();

        out.push_str(&format!("To: {}\r\n", self.to));
        out.push_str(&format!("From: {}\r\n", self.sender));
        out.push_str(&format!("Subject: {}\r\n", self.subject));
        out.push_str("MIME-Version: 1.0\r\n");
        out.push_str(&format!(
            "Content-Type: multipart/mixed; boundary=\"{}\"\r\n\r\n",
            boundary
        ));

        // Body text part
        out.push_str(&format!("--{}\r\n", boundary));
        out.push_str("Content-Type: text/plain; charset=\"utf-8\"\r\n\r\n");
        out.push_str(&self.body);
        out.push_str("\r\n");

        for path in &self.attachments {
            let data = std::fs::read(path).map_err(|e| CourierError::AttachmentError {
                path: path.display().to_string(),
                message: e.to_string(),
            })?;

            let filename = path
                .file_name()
                .and_then(|n| n.to_str())
                .ok_or_else(|| CourierError::AttachmentError {
                    path: path.display().to_string(),
                    message: "attachment has no usable file name".to_string(),
                })?;

            let content_type = content_type_for(path);
            debug!(
                "Attaching {} ({}, {} bytes)",
                filename,
                content_type,
                data.len()
            );

            out.push_str(&format!("--{}\r\n", boundary));
            out.push_str(&format!("Content-Type: {}\r\n", content_type));
            out.push_str("Content-Transfer-Encoding: base64\r\n");
            out.push_str(&format!(
                "Content-Disposition: attachment; filename=\"{}\"\r\n\r\n",
                filename
            ));
            out.push_str(&encode_base64_wrapped(&data));
            out.push_str("\r\n");
        }

        out.push_str(&format!("--{}--\r\n", boundary));
        Ok(out.into_bytes())
    }

    /// Assemble and encode into the single `raw` payload.
    pub fn encode(&self) -> Result<EncodedMessage> {
        let mime = self.to_mime()?;
        Ok(EncodedMessage {
            raw: URL_SAFE.encode(mime),
        })
    }
}

/// Guess a content type from the file name, falling back to the generic
/// binary type when guessing is inconclusive or the file is itself an
/// encoding wrapper (compressed).
fn content_type_for(path: &Path) -> String {
    let is_encoded = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|ext| ENCODED_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
        .unwrap_or(false);

    if is_encoded {
        return "application/octet-stream".to_string();
    }

    mime_guess::from_path(path)
        .first()
        .map(|m| m.to_string())
        .unwrap_or_else(|| "application/octet-stream".to_string())
}

/// Base64 with CRLF line wrapping at 76 characters
fn encode_base64_wrapped(data: &[u8]) -> String {
    let encoded = STANDARD.encode(data);
    let mut wrapped = String::with_capacity(encoded.len() + encoded.len() / BASE64_LINE_LENGTH * 2);
    for chunk in encoded.as_bytes().chunks(BASE64_LINE_LENGTH) {
        // chunks of an ASCII string are valid UTF-8
        wrapped.push_str(std::str::from_utf8(chunk).unwrap_or_default());
        wrapped.push_str("\r\n");
    }
    wrapped
}

/// List the attachment paths in a flat output directory.
///
/// Only direct children that are regular files qualify; entries are sorted
/// by name so the attachment order is stable across platforms.
pub fn attachments_in(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut paths = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        if entry.file_type()?.is_file() {
            paths.push(entry.path());
        }
    }
    paths.sort();
    Ok(paths)
}
