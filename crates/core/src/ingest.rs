use crate::extractor::PdfExtractor;
use crate::{IngestError, SourceDocument};
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use walkdir::WalkDir;

pub fn discover_pdf_files(folder: &Path) -> Vec<PathBuf> {
    let mut files = Vec::new();

    for entry in WalkDir::new(folder)
        .min_depth(1)
        .max_depth(1)
        .into_iter()
        .filter_map(|item| item.ok())
    {
        if !entry.file_type().is_file() {
            continue;
        }

        let is_pdf = entry
            .path()
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("pdf"));

        if is_pdf {
            files.push(entry.path().to_path_buf());
        }
    }

    files.sort_unstable();
    files
}

pub struct SkippedPdf {
    pub path: PathBuf,
    pub reason: String,
}

pub struct IngestionReport {
    pub discovered: usize,
    pub documents: Vec<SourceDocument>,
    pub skipped_files: Vec<SkippedPdf>,
}

pub fn ingest_pdfs(
    folder: &Path,
    extractor: &dyn PdfExtractor,
    max_pages: u32,
) -> Result<IngestionReport, IngestError> {
    let files = discover_pdf_files(folder);
    let mut documents = Vec::new();
    let mut skipped_files = Vec::new();

    for path in &files {
        let (base_id, title) = match source_identity(path) {
            Ok(identity) => identity,
            Err(error) => {
                warn!(pdf = %path.display(), %error, "skipping pdf");
                skipped_files.push(SkippedPdf {
                    path: path.clone(),
                    reason: error.to_string(),
                });
                continue;
            }
        };
        info!(pdf = %path.display(), "ingesting");

        let pages = extractor.extract_pages(path, max_pages);
        if pages.is_empty() {
            warn!(pdf = %path.display(), "no text extracted");
            skipped_files.push(SkippedPdf {
                path: path.clone(),
                reason: "no text extracted".to_string(),
            });
            continue;
        }

        info!(pdf = %path.display(), pages = pages.len(), "extracted");
        documents.push(SourceDocument {
            base_id,
            title,
            pages: pages.into_iter().map(|page| page.text).collect(),
        });
    }

    Ok(IngestionReport {
        discovered: files.len(),
        documents,
        skipped_files,
    })
}

pub fn source_identity(path: &Path) -> Result<(String, String), IngestError> {
    let stem = path
        .file_stem()
        .and_then(|stem| stem.to_str())
        .ok_or_else(|| IngestError::MissingFileStem(path.display().to_string()))?;

    Ok((stem.to_string(), stem.replace('_', " ")))
}
