use crate::{EmbedderSettings, IndexSettings, PreprocessOptions, SyncOptions};
use std::path::{Path, PathBuf};

pub fn is_truthy(value: &str) -> bool {
    matches!(
        value.to_ascii_lowercase().as_str(),
        "1" | "true" | "yes"
    )
}

#[derive(Debug, Clone)]
pub struct DataPaths {
    pub raw_dir: PathBuf,
    pub processed_dir: PathBuf,
    pub merged_file: PathBuf,
    pub ledger_file: PathBuf,
}

impl DataPaths {
    pub fn under(root: &Path, ledger_file: impl Into<PathBuf>) -> Self {
        Self {
            raw_dir: root.join("1-raw"),
            processed_dir: root.join("2-processed"),
            merged_file: root.join("3-out").join("dataset_all.json"),
            ledger_file: ledger_file.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StageFlags {
    pub skip_dataset: bool,
    pub skip_index: bool,
    pub skip_upsert: bool,
    pub skip_settings: bool,
    pub skip_embeddings: bool,
    pub skip_sanity: bool,
}

#[derive(Debug, Clone)]
pub struct SanityQuery {
    pub text: String,
    pub limit: usize,
    pub hybrid: bool,
}

pub fn default_sanity_queries() -> Vec<SanityQuery> {
    vec![
        SanityQuery {
            text: "infiltração comunista UnB".to_string(),
            limit: 3,
            hybrid: false,
        },
        SanityQuery {
            text: "documentos sobre vigilância de estudantes em Brasília".to_string(),
            limit: 1,
            hybrid: true,
        },
    ]
}

#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub paths: DataPaths,
    pub preprocess: PreprocessOptions,
    pub sync: SyncOptions,
    pub index_settings: IndexSettings,
    pub embedder: EmbedderSettings,
    pub llm_api_key: Option<String>,
    pub semantic_ratio: f32,
    pub sanity_queries: Vec<SanityQuery>,
    pub stages: StageFlags,
}

impl PipelineConfig {
    pub fn new(paths: DataPaths) -> Self {
        Self {
            paths,
            preprocess: PreprocessOptions::default(),
            sync: SyncOptions::default(),
            index_settings: IndexSettings::default(),
            embedder: EmbedderSettings::default(),
            llm_api_key: None,
            semantic_ratio: 0.7,
            sanity_queries: default_sanity_queries(),
            stages: StageFlags::default(),
        }
    }
}
