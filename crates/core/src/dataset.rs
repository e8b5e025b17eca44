use crate::chunking::{Chunker, ChunkingConfig};
use crate::cleaning::TextCleaner;
use crate::{DocumentRecord, IngestError, PreprocessOptions, SourceDocument};
use serde::Serialize;
use std::collections::HashSet;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

pub struct Preprocessor {
    options: PreprocessOptions,
    cleaner: TextCleaner,
    chunker: Chunker,
}

impl Preprocessor {
    pub fn new(options: PreprocessOptions) -> Result<Self, IngestError> {
        Ok(Self {
            cleaner: TextCleaner::new(options.min_line_chars)?,
            chunker: Chunker::new(ChunkingConfig::from(&options))?,
            options,
        })
    }

    pub fn clean_pages(&self, pages: &[String]) -> Vec<String> {
        pages
            .iter()
            .map(|page| {
                let cleaned = self.cleaner.clean(page);
                if self.options.correct_ocr_typos {
                    self.cleaner.correct_typos(&cleaned)
                } else {
                    cleaned
                }
            })
            .collect()
    }

    pub fn records_for(&self, document: &SourceDocument) -> Vec<DocumentRecord> {
        let cleaned = self.clean_pages(&document.pages);
        let chunks = self.chunker.chunk_pages(&cleaned);
        assemble_records(
            chunks,
            &document.base_id,
            &document.title,
            self.options.min_words,
        )
    }
}

pub fn assemble_records(
    chunks: Vec<String>,
    base_id: &str,
    title: &str,
    min_words: usize,
) -> Vec<DocumentRecord> {
    let mut seen = HashSet::new();
    let mut records = Vec::new();

    for chunk in chunks {
        if chunk.split_whitespace().count() < min_words || seen.contains(&chunk) {
            continue;
        }
        seen.insert(chunk.clone());

        let ordinal = records.len() as u32 + 1;
        records.push(DocumentRecord {
            id: format!("{base_id}_p{ordinal:03}"),
            document: base_id.to_string(),
            chunk_ordinal: ordinal,
            title: title.to_string(),
            length: chunk.chars().count(),
            text: chunk,
        });
    }

    records
}

pub fn write_json_pretty<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<(), IngestError> {
    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    let mut file = fs::File::create(path)?;
    serde_json::to_writer_pretty(&mut file, value)?;
    file.write_all(b"\n")?;
    Ok(())
}

pub fn write_document_records(
    dir: &Path,
    base_id: &str,
    records: &[DocumentRecord],
) -> Result<PathBuf, IngestError> {
    let path = dir.join(format!("{base_id}.json"));
    write_json_pretty(&path, records)?;
    info!(file = %path.display(), records = records.len(), "wrote document records");
    Ok(path)
}

pub fn load_records(path: &Path) -> Result<Vec<DocumentRecord>, IngestError> {
    let bytes = fs::read(path)?;
    Ok(serde_json::from_slice(&bytes)?)
}

#[derive(Debug)]
pub struct MergeReport {
    pub merged_file: PathBuf,
    pub records: usize,
    pub skipped_files: Vec<PathBuf>,
}

pub fn merge_processed(processed_dir: &Path, merged_file: &Path) -> Result<MergeReport, IngestError> {
    let mut inputs = fs::read_dir(processed_dir)?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.is_file())
        .filter(|path| path.extension().and_then(|ext| ext.to_str()) == Some("json"))
        .filter(|path| !same_file(path, merged_file))
        .collect::<Vec<_>>();
    inputs.sort();

    let mut all = Vec::new();
    let mut skipped_files = Vec::new();

    for path in inputs {
        match load_records(&path) {
            Ok(records) => all.extend(records),
            Err(error) => {
                warn!(file = %path.display(), %error, "skipped invalid json");
                skipped_files.push(path);
            }
        }
    }

    write_json_pretty(merged_file, &all)?;
    info!(records = all.len(), file = %merged_file.display(), "merged dataset");

    Ok(MergeReport {
        merged_file: merged_file.to_path_buf(),
        records: all.len(),
        skipped_files,
    })
}

fn same_file(left: &Path, right: &Path) -> bool {
    match (left.canonicalize(), right.canonicalize()) {
        (Ok(left), Ok(right)) => left == right,
        _ => left == right,
    }
}
