//! Content type detection from magic bytes
//!
//! The image host serves every image under a `.png` suffix regardless of the
//! real encoding, so the stored file's extension is decided here from the
//! bytes themselves.

/// A file type recognized from its leading bytes
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct FileKind {
    extension: &'static str,
    mime_type: &'static str,
}

impl FileKind {
    /// Canonical extension without the leading dot (e.g. "gif", "jpg")
    pub fn extension(&self) -> &'static str {
        self.extension
    }

    /// MIME type (e.g. "image/gif")
    pub fn mime_type(&self) -> &'static str {
        self.mime_type
    }

    /// Whether this kind matches the given extension, ignoring case
    pub fn matches_extension(&self, extension: &str) -> bool {
        self.extension.eq_ignore_ascii_case(extension)
    }
}

/// Detect the file kind of a byte buffer, `None` if unrecognized
pub fn sniff(bytes: &[u8]) -> Option<FileKind> {
    infer::get(bytes).map(|kind| FileKind {
        extension: kind.extension(),
        mime_type: kind.mime_type(),
    })
}
