//! Document and chunk types with source tracking

use serde::{Deserialize, Serialize};
use std::path::Path;
use uuid::Uuid;

/// Supported file types
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum FileType {
    /// Plain text file
    Txt,
    /// PDF document (loaded page by page)
    Pdf,
    /// Microsoft Word document (.docx)
    Docx,
}

impl FileType {
    /// Every supported type, in the order they are advertised to users
    const ALL: [FileType; 3] = [FileType::Txt, FileType::Pdf, FileType::Docx];

    /// Detect file type from an extension (without the leading dot, any case)
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "txt" => Some(Self::Txt),
            "pdf" => Some(Self::Pdf),
            "docx" => Some(Self::Docx),
            _ => None,
        }
    }

    /// Detect file type from a path's extension
    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|e| e.to_str())
            .and_then(Self::from_extension)
    }

    /// Canonical extension including the dot
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Txt => ".txt",
            Self::Pdf => ".pdf",
            Self::Docx => ".docx",
        }
    }

    /// Comma separated list of supported extensions, for error messages
    pub fn supported_list() -> String {
        Self::ALL
            .iter()
            .map(|t| t.extension())
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// Get display name
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Txt => "Text File",
            Self::Pdf => "PDF",
            Self::Docx => "Word Document (.docx)",
        }
    }
}

/// Where a piece of text came from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceMetadata {
    /// Path of the loaded file, as given to the loader
    pub source: String,
    /// Page number (1-indexed, PDFs only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
}

impl SourceMetadata {
    /// Metadata for a whole-file document
    pub fn file(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            page: None,
        }
    }

    /// Metadata for a single page of a paginated document
    pub fn page(source: impl Into<String>, page: u32) -> Self {
        Self {
            source: source.into(),
            page: Some(page),
        }
    }

    /// Final path component of the source, used when reporting sources to users
    pub fn source_name(&self) -> String {
        Path::new(&self.source)
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| self.source.clone())
    }
}

/// A loaded document: one per file, or one per page for PDFs
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    /// Extracted text
    pub content: String,
    /// Source information
    pub metadata: SourceMetadata,
}

impl Document {
    /// Create a new document
    pub fn new(content: impl Into<String>, metadata: SourceMetadata) -> Self {
        Self {
            content: content.into(),
            metadata,
        }
    }
}

/// A bounded slice of a document, ready to be embedded
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    /// Unique chunk ID
    pub id: Uuid,
    /// Text content (an exact substring of the parent document)
    pub content: String,
    /// Source information inherited from the parent document
    pub metadata: SourceMetadata,
    /// Chunk index within the parent document
    pub chunk_index: u32,
    /// Character offset of `content` within the parent document
    pub char_start: usize,
}

impl Chunk {
    /// Create a new chunk
    pub fn new(
        content: String,
        metadata: SourceMetadata,
        chunk_index: u32,
        char_start: usize,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            content,
            metadata,
            chunk_index,
            char_start,
        }
    }

    /// Length of the content in characters
    pub fn char_len(&self) -> usize {
        self.content.chars().count()
    }
}
