//! Document loader for plain text, PDF and Word files

use std::path::Path;

use crate::error::{Error, Result};
use crate::types::{Document, FileType, SourceMetadata};

/// Reads a file from disk and turns it into documents
///
/// Text and Word files yield a single document. PDFs yield one document per
/// page, each tagged with its 1-indexed page number.
pub struct DocumentLoader;

impl DocumentLoader {
    /// Load a file, dispatching on its extension
    pub fn load(path: &Path) -> Result<Vec<Document>> {
        let file_type = Self::detect(path)?;
        let data = std::fs::read(path)?;
        let source = path.to_string_lossy().to_string();

        tracing::debug!(
            "Loading {} as {} ({} bytes)",
            source,
            file_type.display_name(),
            data.len()
        );

        Self::load_bytes(&source, file_type, &data)
    }

    /// Resolve the file type for a path or fail with `UnsupportedFormat`
    pub fn detect(path: &Path) -> Result<FileType> {
        FileType::from_path(path).ok_or_else(|| {
            let extension = path
                .extension()
                .map(|e| format!(".{}", e.to_string_lossy().to_lowercase()))
                .unwrap_or_default();
            Error::unsupported_format(extension)
        })
    }

    /// Parse already-read bytes
    pub fn load_bytes(source: &str, file_type: FileType, data: &[u8]) -> Result<Vec<Document>> {
        match file_type {
            FileType::Txt => Ok(Self::load_text(source, data)),
            FileType::Pdf => Self::load_pdf(source, data),
            FileType::Docx => Self::load_docx(source, data),
        }
    }

    fn load_text(source: &str, data: &[u8]) -> Vec<Document> {
        let content = String::from_utf8_lossy(data).to_string();
        vec![Document::new(content, SourceMetadata::file(source))]
    }

    /// One document per page; falls back to whole-document extraction when
    /// per-page extraction finds no text
    fn load_pdf(source: &str, data: &[u8]) -> Result<Vec<Document>> {
        let pdf = lopdf::Document::load_mem(data)
            .map_err(|e| Error::file_parse(source, e.to_string()))?;

        let mut documents = Vec::new();
        for page_number in pdf.get_pages().keys() {
            match pdf.extract_text(&[*page_number]) {
                Ok(text) => documents.push(Document::new(
                    text,
                    SourceMetadata::page(source, *page_number),
                )),
                Err(e) => {
                    tracing::warn!("Failed to extract page {} of {}: {}", page_number, source, e);
                }
            }
        }

        if documents.iter().all(|d| d.content.trim().is_empty()) {
            tracing::debug!("No per-page text in {}, using whole-document extraction", source);
            let content = pdf_extract::extract_text_from_mem(data)
                .map_err(|e| Error::file_parse(source, e.to_string()))?;
            return Ok(vec![Document::new(content, SourceMetadata::page(source, 1))]);
        }

        Ok(documents)
    }

    fn load_docx(source: &str, data: &[u8]) -> Result<Vec<Document>> {
        let doc = docx_rs::read_docx(data).map_err(|e| Error::file_parse(source, e.to_string()))?;

        let mut content = String::new();
        for child in doc.document.children {
            if let docx_rs::DocumentChild::Paragraph(p) = child {
                for child in p.children {
                    if let docx_rs::ParagraphChild::Run(run) = child {
                        for child in run.children {
                            if let docx_rs::RunChild::Text(t) = child {
                                content.push_str(&t.text);
                            }
                        }
                    }
                }
                content.push('\n');
            }
        }

        Ok(vec![Document::new(content, SourceMetadata::file(source))])
    }
}
