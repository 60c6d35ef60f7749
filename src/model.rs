use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PdfEntry {
    pub filename: String,
    pub path: String,
    pub benchmark: String,
    pub version: String,
    pub sha256: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PdfInventoryManifest {
    pub manifest_version: u32,
    pub generated_at: String,
    pub source_directory: String,
    pub pdf_count: usize,
    pub pdfs: Vec<PdfEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolVersions {
    pub pdftotext: String,
    pub pdftohtml: Option<String>,
    pub pdfinfo: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractPaths {
    pub cache_root: String,
    pub manifest_dir: String,
    pub output_dir: String,
    pub db_path: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExtractCounts {
    pub pdf_count: usize,
    pub processed_pdf_count: usize,
    pub pages_total: usize,
    pub lines_total: usize,
    pub records_found: usize,
    pub records_kept: usize,
    pub records_discarded: usize,
    pub toc_entries: usize,
    pub toc_outline_docs: usize,
    pub toc_fallback_docs: usize,
    pub markdown_files_written: usize,
}

/// Per-document outcome recorded in the run manifest.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentSummary {
    pub doc_id: String,
    pub filename: String,
    pub total_pages: u32,
    pub line_count: usize,
    pub records_found: usize,
    pub records_kept: usize,
    pub records_discarded: usize,
    pub toc_source: String,
    pub toc_entries: usize,
    pub output_dir: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractRunManifest {
    pub manifest_version: u32,
    pub run_id: String,
    pub db_schema_version: String,
    pub status: String,
    pub started_at: String,
    pub updated_at: String,
    pub command: String,
    pub tool_versions: ToolVersions,
    pub paths: ExtractPaths,
    pub counts: ExtractCounts,
    pub documents: Vec<DocumentSummary>,
    pub source_hashes: Vec<PdfEntry>,
    pub warnings: Vec<String>,
}
