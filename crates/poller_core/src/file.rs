use std::fmt;
use std::sync::Arc;

use crate::PollerError;

pub const PDF_CONTENT_TYPE: &str = "application/pdf";

const PDF_MAGIC: &[u8] = b"%PDF-";

/// A file picked by the user, held in memory until it is uploaded.
#[derive(Clone, PartialEq, Eq)]
pub struct SelectedFile {
    pub name: String,
    pub content_type: Option<String>,
    pub bytes: Arc<[u8]>,
}

impl SelectedFile {
    pub fn new(name: impl Into<String>, content_type: Option<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            content_type,
            bytes: Arc::from(bytes),
        }
    }

    /// Builds a file whose content type is guessed from its name.
    pub fn from_name(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        let name = name.into();
        let content_type = guess_content_type(&name).to_string();
        Self::new(name, Some(content_type), bytes)
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

impl fmt::Debug for SelectedFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SelectedFile")
            .field("name", &self.name)
            .field("content_type", &self.content_type)
            .field("len", &self.bytes.len())
            .finish()
    }
}

/// Maps a file name to a MIME type by extension.
pub fn guess_content_type(name: &str) -> &'static str {
    let ext = name
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "pdf" => PDF_CONTENT_TYPE,
        "txt" => "text/plain",
        "doc" => "application/msword",
        "docx" => "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        _ => "application/octet-stream",
    }
}

/// Accepts only PDF documents: a declared type (if any) of `application/pdf`
/// and content starting with the `%PDF-` header.
pub fn validate_document(file: &SelectedFile) -> Result<(), PollerError> {
    if file.is_empty() {
        return Err(PollerError::InvalidFileKind {
            reason: "file is empty".to_string(),
        });
    }
    if let Some(ct) = file.content_type.as_deref() {
        let base = ct.split(';').next().unwrap_or(ct).trim();
        if !base.eq_ignore_ascii_case(PDF_CONTENT_TYPE) {
            return Err(PollerError::InvalidFileKind {
                reason: format!("unsupported content type {base}"),
            });
        }
    }
    if !file.bytes.starts_with(PDF_MAGIC) {
        return Err(PollerError::InvalidFileKind {
            reason: "missing PDF header".to_string(),
        });
    }
    Ok(())
}
