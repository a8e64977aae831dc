//! Allowed binary formats: which file extensions are uploaded as binaries.
//!
//! The list is read once at startup from a plain text file (one extension per
//! line) and handed to the finder as an immutable value. Order matters: when a
//! directory holds several `_.<ext>` files, the first listed format wins.

use std::fs;
use std::path::Path;

use tracing::{debug, info, warn};

/// Used when the formats file cannot be read.
pub const FALLBACK_EXTENSION: &str = "jpg";


/// An extension (without leading dot) and the MIME type sent for it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BinaryFormat {
    pub extension: String,
    pub mime_type: String,
}

impl BinaryFormat {
    /// A format with the MIME type looked up from its extension.
    pub fn new(extension: &str) -> Self {
        let extension = normalise_extension(extension);
        let mime_type = mime_type_for(&extension);
        BinaryFormat {
            extension,
            mime_type,
        }
    }

    pub fn with_mime_type(extension: &str, mime_type: &str) -> Self {
        BinaryFormat {
            extension: normalise_extension(extension),
            mime_type: mime_type.to_string(),
        }
    }

    /// Name of the file that gives a directory this binary representation.
    pub fn directory_filename(&self) -> String {
        format!("_.{}", self.extension)
    }
}

/// Ordered, duplicate-free list of binary formats.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AllowedBinaryFormats {
    formats: Vec<BinaryFormat>,
}

impl AllowedBinaryFormats {
    pub fn new(formats: impl IntoIterator<Item = BinaryFormat>) -> Self {
        let mut unique: Vec<BinaryFormat> = Vec::new();
        for format in formats {
            if format.extension.is_empty() {
                continue;
            }
            if unique.iter().any(|f| f.extension == format.extension) {
                debug!(extension = %format.extension, "Ignoring duplicate binary format");
                continue;
            }
            unique.push(format);
        }
        AllowedBinaryFormats { formats: unique }
    }

    pub fn fallback() -> Self {
        AllowedBinaryFormats::new([BinaryFormat::new(FALLBACK_EXTENSION)])
    }

    /// Parses the formats file layout.
    ///
    /// Each line holds an extension with an optional leading dot and an
    /// optional MIME type after whitespace. Blank lines and `#` comments are
    /// skipped.
    pub fn parse(contents: &str) -> Self {
        let formats = contents
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty() && !line.starts_with('#'))
            .map(|line| {
                let mut tokens = line.split_whitespace();
                let extension = tokens.next().unwrap_or_default();
                match tokens.next() {
                    Some(mime_type) => BinaryFormat::with_mime_type(extension, mime_type),
                    None => BinaryFormat::new(extension),
                }
            });
        AllowedBinaryFormats::new(formats)
    }

    /// Reads the formats file, falling back to [`FALLBACK_EXTENSION`] when it
    /// cannot be read.
    pub fn load(path: &Path) -> Self {
        match fs::read_to_string(path) {
            Ok(contents) => {
                let formats = AllowedBinaryFormats::parse(&contents);
                info!(
                    path = %path.display(),
                    count = formats.len(),
                    "Loaded allowed binary formats"
                );
                formats
            }
            Err(e) => {
                warn!(
                    path = %path.display(),
                    "Exception while reading allowed-binary-formats file! Defaulting to {FALLBACK_EXTENSION} as the only allowed binary format!"
                );
                debug!(error = ?e, "Allowed binary formats read error");
                AllowedBinaryFormats::fallback()
            }
        }
    }

    /// Looks up a format by extension (with or without leading dot).
    pub fn find(&self, extension: &str) -> Option<&BinaryFormat> {
        let extension = extension.strip_prefix('.').unwrap_or(extension);
        self.formats.iter().find(|f| f.extension == extension)
    }

    pub fn iter(&self) -> impl Iterator<Item = &BinaryFormat> {
        self.formats.iter()
    }

    pub fn len(&self) -> usize {
        self.formats.len()
    }

    pub fn is_empty(&self) -> bool {
        self.formats.is_empty()
    }
}

fn normalise_extension(extension: &str) -> String {
    let extension = extension.trim();
    extension.strip_prefix('.').unwrap_or(extension).to_string()
}

/// MIME type for a file extension, `application/octet-stream` when unknown.
pub fn mime_type_for(extension: &str) -> String {
    let extension = extension.strip_prefix('.').unwrap_or(extension);
    mime_guess::from_ext(&extension.to_ascii_lowercase())
        .first_or_octet_stream()
        .essence_str()
        .to_string()
}
