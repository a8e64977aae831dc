//! Identifiers and request bodies produced by the finder.

use std::fmt;
use std::io::Read;
use std::path::{Component, Path};
use std::sync::Arc;

use crate::error::ImportError;

/// Content type of a create request when the payload carries none.
pub const DEFAULT_CONTENT_TYPE: &str = "text/turtle";

/// Content type of every patch request.
pub const SPARQL_UPDATE_CONTENT_TYPE: &str = "application/sparql-update";

const DEFAULT_PREFIXES: &str = include_str!("../resources/default-prefixes.ttl");

/// Repository-relative URI of a resource, always `/`-separated.
///
/// The root directory maps to the empty identifier, i.e. the base URL itself.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ResourceIdentifier(String);

impl ResourceIdentifier {
    pub fn new(value: impl Into<String>) -> Self {
        ResourceIdentifier(value.into())
    }

    /// A directory maps to its path relative to `root`.
    pub fn for_directory(root: &Path, dir: &Path) -> Self {
        ResourceIdentifier(relative_uri(root, dir))
    }

    /// A file maps to its path relative to `root` with `extension` removed.
    /// `extension` may be given with or without its leading dot.
    pub fn for_file(root: &Path, file: &Path, extension: &str) -> Self {
        let relative = relative_uri(root, file);
        let suffix = if extension.starts_with('.') {
            extension.to_string()
        } else {
            format!(".{extension}")
        };
        match relative.strip_suffix(&suffix) {
            Some(stripped) => ResourceIdentifier(stripped.to_string()),
            None => ResourceIdentifier(relative),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for ResourceIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

fn relative_uri(root: &Path, path: &Path) -> String {
    let relative = path.strip_prefix(root).unwrap_or(path);
    relative
        .components()
        .filter_map(|component| match component {
            Component::Normal(segment) => Some(segment.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}

/// Namespace declarations prepended to every Turtle and SPARQL upload.
///
/// The bytes are immutable and shared; every payload copies them from the
/// start, so sequential uploads always see the whole preamble.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrefixPreamble {
    bytes: Arc<[u8]>,
}

impl PrefixPreamble {
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        let bytes: Vec<u8> = bytes.into();
        PrefixPreamble {
            bytes: Arc::from(bytes),
        }
    }

    /// The built-in prefix block.
    pub fn default_prefixes() -> Self {
        PrefixPreamble::new(DEFAULT_PREFIXES)
    }

    pub fn load(path: &Path) -> Result<Self, ImportError> {
        let bytes = std::fs::read(path).map_err(|source| ImportError::Prefix {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(PrefixPreamble::new(bytes))
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

impl Default for PrefixPreamble {
    fn default() -> Self {
        PrefixPreamble::default_prefixes()
    }
}

/// A fully materialised request body with an optional content type.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UploadPayload {
    body: Vec<u8>,
    content_type: Option<String>,
}

impl UploadPayload {
    /// Empty body, used to force creation of a container.
    pub fn empty() -> Self {
        UploadPayload::default()
    }

    /// The preamble followed by everything `content` yields.
    pub fn prefixed<R: Read>(prefix: &PrefixPreamble, content: R) -> std::io::Result<Self> {
        let mut body = Vec::with_capacity(prefix.len());
        prefix.as_bytes().chain(content).read_to_end(&mut body)?;
        Ok(UploadPayload {
            body,
            content_type: None,
        })
    }

    /// Raw bytes of a binary file, sent with `mime_type`.
    pub fn binary<R: Read>(mut content: R, mime_type: &str) -> std::io::Result<Self> {
        let mut body = Vec::new();
        content.read_to_end(&mut body)?;
        Ok(UploadPayload {
            body,
            content_type: Some(mime_type.to_string()),
        })
    }

    pub fn from_bytes(body: impl Into<Vec<u8>>, content_type: Option<&str>) -> Self {
        UploadPayload {
            body: body.into(),
            content_type: content_type.map(str::to_string),
        }
    }

    pub fn body(&self) -> &[u8] {
        &self.body
    }

    pub fn into_body(self) -> Vec<u8> {
        self.body
    }

    pub fn content_type(&self) -> Option<&str> {
        self.content_type.as_deref()
    }

    pub fn len(&self) -> usize {
        self.body.len()
    }

    pub fn is_empty(&self) -> bool {
        self.body.is_empty()
    }
}
