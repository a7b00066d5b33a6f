//! Deterministic stand-ins for the external services, shared by unit tests

use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use crate::error::{Error, Result};
use crate::providers::{EmbeddingProvider, EmbeddingTask, LlmProvider, Providers};

const DIMENSIONS: usize = 64;

/// Hashes lowercase words into a fixed number of buckets
#[derive(Default)]
pub struct BagOfWordsEmbedder {
    calls: AtomicUsize,
    failing: AtomicBool,
}

impl BagOfWordsEmbedder {
    /// Number of `embed`/`embed_batch` calls so far
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Make every following call fail like an unavailable service
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    fn record_call(&self) -> Result<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.failing.load(Ordering::SeqCst) {
            return Err(Error::embedding("HTTP 503 Service Unavailable: model overloaded"));
        }
        Ok(())
    }

    fn vectorize(text: &str) -> Vec<f32> {
        let mut vector = vec![0.0; DIMENSIONS];
        for word in text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| !w.is_empty())
        {
            // FNV-1a
            let hash = word
                .to_lowercase()
                .bytes()
                .fold(0xcbf29ce484222325u64, |h, b| (h ^ b as u64).wrapping_mul(0x100000001b3));
            vector[(hash % DIMENSIONS as u64) as usize] += 1.0;
        }
        vector
    }
}

#[async_trait]
impl EmbeddingProvider for BagOfWordsEmbedder {
    async fn embed(&self, text: &str, _task: EmbeddingTask) -> Result<Vec<f32>> {
        self.record_call()?;
        Ok(Self::vectorize(text))
    }

    async fn embed_batch(&self, texts: &[String], _task: EmbeddingTask) -> Result<Vec<Vec<f32>>> {
        self.record_call()?;
        Ok(texts.iter().map(|t| Self::vectorize(t)).collect())
    }

    fn name(&self) -> &str {
        "bag-of-words"
    }
}

/// Answers with the whole prompt followed by the sign-off
#[derive(Default)]
pub struct EchoLlm {
    calls: AtomicUsize,
    failing: AtomicBool,
    last_prompt: Mutex<Option<String>>,
}

impl EchoLlm {
    /// Number of `generate` calls so far
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Make every following call fail like an exhausted quota
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// The most recent prompt received
    pub fn last_prompt(&self) -> Option<String> {
        self.last_prompt.lock().clone()
    }
}

#[async_trait]
impl LlmProvider for EchoLlm {
    async fn generate(&self, prompt: &str) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.failing.load(Ordering::SeqCst) {
            return Err(Error::llm("HTTP 429 Too Many Requests: quota exceeded"));
        }
        *self.last_prompt.lock() = Some(prompt.to_string());
        Ok(format!("\n  {}\nthanks for asking!  \n", prompt))
    }

    fn name(&self) -> &str {
        "echo"
    }

    fn model(&self) -> &str {
        "echo-1"
    }
}

/// Stub providers plus handles to inspect them
pub struct StubProviders {
    pub embedder: Arc<BagOfWordsEmbedder>,
    pub llm: Arc<EchoLlm>,
}

impl StubProviders {
    pub fn new() -> Self {
        Self {
            embedder: Arc::new(BagOfWordsEmbedder::default()),
            llm: Arc::new(EchoLlm::default()),
        }
    }

    pub fn providers(&self) -> Providers {
        Providers {
            embedder: self.embedder.clone(),
            llm: self.llm.clone(),
        }
    }

    /// Total calls made to either external service
    pub fn external_calls(&self) -> usize {
        self.embedder.calls() + self.llm.calls()
    }
}

/// Write a `.docx` file with one paragraph per entry
pub fn write_docx(path: &std::path::Path, paragraphs: &[&str]) {
    use docx_rs::{Docx, Paragraph, Run};

    let docx = paragraphs.iter().fold(Docx::new(), |docx, text| {
        docx.add_paragraph(Paragraph::new().add_run(Run::new().add_text(*text)))
    });
    let file = std::fs::File::create(path).unwrap();
    docx.build().pack(file).unwrap();
}

/// Build a PDF with one page of Courier text per entry
pub fn pdf_bytes(pages: &[&str]) -> Vec<u8> {
    use lopdf::content::{Content, Operation};
    use lopdf::{dictionary, Object, Stream};

    let mut pdf = lopdf::Document::with_version("1.5");
    let pages_id = pdf.new_object_id();
    let font_id = pdf.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Courier",
    });
    let resources_id = pdf.add_object(dictionary! {
        "Font" => dictionary! { "F1" => font_id },
    });

    let mut kids = Vec::new();
    for text in pages {
        let content = Content {
            operations: vec![
                Operation::new("BT", vec![]),
                Operation::new("Tf", vec!["F1".into(), 24.into()]),
                Operation::new("Td", vec![100.into(), 600.into()]),
                Operation::new("Tj", vec![Object::string_literal(*text)]),
                Operation::new("ET", vec![]),
            ],
        };
        let content_id = pdf.add_object(Stream::new(dictionary! {}, content.encode().unwrap()));
        let page_id = pdf.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
        });
        kids.push(Object::from(page_id));
    }

    let pages = dictionary! {
        "Type" => "Pages",
        "Kids" => kids,
        "Count" => pages.len() as i64,
        "Resources" => resources_id,
        "MediaBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
    };
    pdf.objects.insert(pages_id, Object::Dictionary(pages));
    let catalog_id = pdf.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    pdf.trailer.set("Root", catalog_id);

    let mut bytes = Vec::new();
    pdf.save_to(&mut bytes).unwrap();
    bytes
}
