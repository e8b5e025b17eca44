use crate::error::IngestError;
use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::debug;

#[derive(Debug, Clone)]
pub struct PageText {
    pub number: u32,
    pub text: String,
}

pub trait PdfExtractor {
    fn extract_page(&self, path: &Path, page: u32) -> Result<String, IngestError>;

    fn extract_pages(&self, path: &Path, max_pages: u32) -> Vec<PageText> {
        let mut pages = Vec::new();

        for number in 1..=max_pages {
            // no page count is available; a failing page marks the end
            let text = match self.extract_page(path, number) {
                Ok(text) => text,
                Err(error) => {
                    debug!(path = %path.display(), page = number, %error, "extraction stopped");
                    break;
                }
            };

            if text.trim().is_empty() {
                break;
            }
            pages.push(PageText { number, text });
        }

        pages
    }
}

#[derive(Debug, Clone)]
pub struct PdftotextExtractor {
    program: PathBuf,
}

impl Default for PdftotextExtractor {
    fn default() -> Self {
        Self::new("pdftotext")
    }
}

impl PdftotextExtractor {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

impl PdfExtractor for PdftotextExtractor {
    fn extract_page(&self, path: &Path, page: u32) -> Result<String, IngestError> {
        let page = page.to_string();
        let output = Command::new(&self.program)
            .arg("-layout")
            .args(["-f", &page, "-l", &page])
            .arg(path)
            .arg("-")
            .output()?;

        if !output.status.success() {
            return Err(IngestError::Extraction(format!(
                "{} exited with {} on page {page} of {}: {}",
                self.program.display(),
                output.status,
                path.display(),
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}
