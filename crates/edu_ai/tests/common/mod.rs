#![allow(dead_code)]

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use edu_ai::llm::{Availability, GenerationBackend, GenerationRequest};
use edu_core::config::{EmbeddingProviderKind, PipelineConfig};
use edu_core::error::AppError;

pub const EMBED_MODEL: &str = "hash-test";

/// Minimal DOCX: one `<w:p>` per paragraph.
pub fn write_docx(dir: &Path, name: &str, paragraphs: &[&str]) -> PathBuf {
    let body: String = paragraphs
        .iter()
        .map(|p| {
            let escaped = p.replace('&', "&amp;").replace('<', "&lt;").replace('>', "&gt;");
            format!("<w:p><w:r><w:t xml:space=\"preserve\">{escaped}</w:t></w:r></w:p>")
        })
        .collect();
    let xml = format!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\
<w:document xmlns:w=\"http://schemas.openxmlformats.org/wordprocessingml/2006/main\"><w:body>{body}</w:body></w:document>"
    );

    let path = dir.join(name);
    let file = std::fs::File::create(&path).expect("create docx");
    let mut zip = zip::ZipWriter::new(file);
    let opts = zip::write::SimpleFileOptions::default();
    zip.start_file("[Content_Types].xml", opts).expect("start");
    zip.write_all(b"<?xml version=\"1.0\"?><Types/>").expect("write");
    zip.start_file("word/document.xml", opts).expect("start");
    zip.write_all(xml.as_bytes()).expect("write");
    zip.finish().expect("finish");
    path
}

fn pdf_escape(text: &str) -> String {
    text.replace('\\', "\\\\").replace('(', "\\(").replace(')', "\\)")
}

/// Minimal PDF: one page per entry of `pages`, one Helvetica text line per string.
pub fn write_pdf(dir: &Path, name: &str, pages: &[&[&str]]) -> PathBuf {
    let font_id = 3;
    let mut objects: Vec<String> = vec![
        "<< /Type /Catalog /Pages 2 0 R >>".to_string(),
        String::new(),
        "<< /Type /Font /Subtype /Type1 /BaseFont /Helvetica /Encoding /WinAnsiEncoding >>"
            .to_string(),
    ];
    let mut kids = Vec::new();
    for lines in pages {
        let content: String = lines
            .iter()
            .enumerate()
            .map(|(i, line)| {
                let y = 720 - 18 * i;
                format!("BT /F1 12 Tf 72 {y} Td ({}) Tj ET\n", pdf_escape(line))
            })
            .collect();
        let page_id = objects.len() + 1;
        let content_id = page_id + 1;
        objects.push(format!(
            "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 612 792] \
/Resources << /Font << /F1 {font_id} 0 R >> >> /Contents {content_id} 0 R >>"
        ));
        objects.push(format!(
            "<< /Length {} >>\nstream\n{content}endstream",
            content.len()
        ));
        kids.push(format!("{page_id} 0 R"));
    }
    objects[1] = format!(
        "<< /Type /Pages /Kids [{}] /Count {} >>",
        kids.join(" "),
        kids.len()
    );

    let mut pdf = String::from("%PDF-1.4\n");
    let mut offsets = Vec::new();
    for (i, body) in objects.iter().enumerate() {
        offsets.push(pdf.len());
        pdf.push_str(&format!("{} 0 obj\n{body}\nendobj\n", i + 1));
    }
    let xref_at = pdf.len();
    pdf.push_str(&format!("xref\n0 {}\n0000000000 65535 f \n", objects.len() + 1));
    for off in offsets {
        pdf.push_str(&format!("{off:010} 00000 n \n"));
    }
    pdf.push_str(&format!(
        "trailer\n<< /Size {} /Root 1 0 R >>\nstartxref\n{xref_at}\n%%EOF\n",
        objects.len() + 1
    ));

    let path = dir.join(name);
    std::fs::write(&path, pdf).expect("write pdf");
    path
}

pub fn hashing_config() -> PipelineConfig {
    PipelineConfig {
        embedding_model: EMBED_MODEL.to_string(),
        embedding_provider: EmbeddingProviderKind::Hashing,
        batch_size: 4,
        chunk_size: 200,
        chunk_overlap: 20,
        ..PipelineConfig::default()
    }
}

/// Course corpus used across scenarios: one lecture on ML, one on regression.
pub fn write_course_corpus(dir: &Path) {
    write_docx(
        dir,
        "lecture1.docx",
        &[
            "Machine learning is a subfield of AI.",
            "Supervised learning fits a model to labelled examples and is evaluated on held-out data.",
        ],
    );
    write_docx(
        dir,
        "lecture2.docx",
        &[
            "Linear regression predicts a continuous target as a weighted sum of features.",
            "The least squares method minimises the sum of squared residuals.",
        ],
    );
}

type Script = dyn Fn(&GenerationRequest) -> Result<String, AppError> + Send + Sync;

/// Backend stand-in driven by a closure; records every request it receives.
pub struct ScriptedBackend {
    script: Box<Script>,
    calls: AtomicUsize,
    last: Mutex<Option<GenerationRequest>>,
}

impl ScriptedBackend {
    pub fn new<F>(script: F) -> Self
    where
        F: Fn(&GenerationRequest) -> Result<String, AppError> + Send + Sync + 'static,
    {
        Self {
            script: Box::new(script),
            calls: AtomicUsize::new(0),
            last: Mutex::new(None),
        }
    }

    pub fn replying(text: &str) -> Self {
        let text = text.to_string();
        Self::new(move |_| Ok(text.clone()))
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_request(&self) -> Option<GenerationRequest> {
        self.last.lock().expect("lock").clone()
    }
}

impl GenerationBackend for ScriptedBackend {
    fn descriptor(&self) -> String {
        "scripted:test".to_string()
    }

    fn health_check(&self) -> Availability {
        Availability::Available
    }

    fn generate(&self, request: &GenerationRequest) -> Result<String, AppError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last.lock().expect("lock") = Some(request.clone());
        (self.script)(request)
    }
}
