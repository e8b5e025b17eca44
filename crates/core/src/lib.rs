pub mod chunking;
pub mod cleaning;
pub mod config;
pub mod dataset;
pub mod embeddings;
pub mod error;
pub mod extractor;
pub mod ingest;
pub mod ledger;
pub mod llm;
pub mod models;
pub mod orchestrator;
pub mod pipeline;
pub mod settings;
pub mod stores;
pub mod sync;
pub mod traits;

pub use chunking::{Chunker, ChunkingConfig};
pub use cleaning::TextCleaner;
pub use config::{is_truthy, DataPaths, PipelineConfig, SanityQuery, StageFlags};
pub use dataset::{assemble_records, merge_processed, MergeReport, Preprocessor};
pub use embeddings::{EmbedderSettings, DEFAULT_EMBEDDER_NAME, DEFAULT_EMBEDDING_MODEL};
pub use error::{IngestError, PipelineError, SearchError};
pub use extractor::{PageText, PdfExtractor, PdftotextExtractor};
pub use ingest::{discover_pdf_files, ingest_pdfs, IngestionReport, SkippedPdf};
pub use ledger::{filter_changed, ChangeLedger};
pub use llm::{OpenAiChat, OpenAiChatConfig, DEFAULT_CHAT_MODEL};
pub use models::{
    ChatMessage, ChatRole, DocumentRecord, HybridSearch, PreprocessOptions, SearchHit,
    SearchRequest, SourceDocument, Task, TaskInfo, TaskStatus,
};
pub use orchestrator::{Answer, QueryOptions, SearchCoordinator};
pub use pipeline::{build_dataset, DatasetOutcome, Pipeline, PipelineReport};
pub use settings::{IndexSetting, IndexSettings};
pub use stores::MeiliClient;
pub use sync::{EmbedderOutcome, IndexSynchronizer, PollPolicy, SyncOptions};
pub use traits::{ChatModel, SearchEngine};
