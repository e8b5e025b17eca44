use crate::dataset::{load_records, merge_processed, write_document_records, MergeReport, Preprocessor};
use crate::extractor::PdfExtractor;
use crate::ingest::ingest_pdfs;
use crate::ledger::ChangeLedger;
use crate::orchestrator::{QueryOptions, SearchCoordinator};
use crate::sync::{EmbedderOutcome, IndexSynchronizer};
use crate::traits::SearchEngine;
use crate::{IngestError, PipelineConfig, PipelineError};
use chrono::{DateTime, Utc};
use std::path::PathBuf;
use tracing::{info, warn};

#[derive(Debug)]
pub enum DatasetOutcome {
    NoSources { folder: PathBuf },
    Built {
        documents: usize,
        skipped_pdfs: usize,
        merge: MergeReport,
    },
}

pub fn build_dataset(
    config: &PipelineConfig,
    extractor: &dyn PdfExtractor,
) -> Result<DatasetOutcome, IngestError> {
    let paths = &config.paths;
    let report = ingest_pdfs(&paths.raw_dir, extractor, config.preprocess.max_pages)?;

    if report.discovered == 0 {
        warn!(folder = %paths.raw_dir.display(), "no PDFs found");
        return Ok(DatasetOutcome::NoSources {
            folder: paths.raw_dir.clone(),
        });
    }

    let preprocessor = Preprocessor::new(config.preprocess.clone())?;
    std::fs::create_dir_all(&paths.processed_dir)?;
    for document in &report.documents {
        let records = preprocessor.records_for(document);
        write_document_records(&paths.processed_dir, &document.base_id, &records)?;
    }

    let merge = merge_processed(&paths.processed_dir, &paths.merged_file)?;

    Ok(DatasetOutcome::Built {
        documents: report.documents.len(),
        skipped_pdfs: report.skipped_files.len(),
        merge,
    })
}

#[derive(Debug, Clone)]
pub struct SanityResult {
    pub query: String,
    pub citations: Vec<String>,
}

#[derive(Debug)]
pub struct PipelineReport {
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub no_sources: bool,
    pub merged_records: Option<usize>,
    pub index_created: Option<bool>,
    pub upserted: Option<usize>,
    pub settings_applied: bool,
    pub embedder: Option<EmbedderOutcome>,
    pub sanity: Vec<SanityResult>,
}

impl PipelineReport {
    fn start() -> Self {
        Self {
            started_at: Utc::now(),
            finished_at: None,
            no_sources: false,
            merged_records: None,
            index_created: None,
            upserted: None,
            settings_applied: false,
            embedder: None,
            sanity: Vec::new(),
        }
    }
}

pub struct Pipeline<'a, E: SearchEngine + ?Sized> {
    config: &'a PipelineConfig,
    engine: &'a E,
    extractor: &'a dyn PdfExtractor,
}

impl<'a, E: SearchEngine + ?Sized> Pipeline<'a, E> {
    pub fn new(config: &'a PipelineConfig, engine: &'a E, extractor: &'a dyn PdfExtractor) -> Self {
        Self {
            config,
            engine,
            extractor,
        }
    }

    pub async fn run(&self) -> Result<PipelineReport, PipelineError> {
        let stages = self.config.stages;
        let sync = IndexSynchronizer::new(self.engine, self.config.sync.clone());
        let mut report = PipelineReport::start();

        if stages.skip_dataset {
            info!("skipping dataset stage");
        } else {
            match tokio::task::block_in_place(|| build_dataset(self.config, self.extractor))? {
                DatasetOutcome::NoSources { folder } => {
                    info!(folder = %folder.display(), "nothing to ingest, stopping");
                    report.no_sources = true;
                    report.finished_at = Some(Utc::now());
                    return Ok(report);
                }
                DatasetOutcome::Built {
                    documents,
                    skipped_pdfs,
                    merge,
                } => {
                    info!(
                        documents,
                        skipped_pdfs,
                        records = merge.records,
                        merged = %merge.merged_file.display(),
                        "dataset built"
                    );
                    report.merged_records = Some(merge.records);
                }
            }
        }

        if stages.skip_index {
            info!("skipping index creation");
        } else {
            report.index_created = Some(sync.ensure_index().await?);
        }

        if stages.skip_upsert {
            info!("skipping upsert");
        } else {
            report.upserted = Some(self.upsert_changed(&sync).await?);
        }

        if stages.skip_settings {
            info!("skipping settings");
        } else {
            sync.apply_settings(&self.config.index_settings).await?;
            report.settings_applied = true;
        }

        if stages.skip_embeddings {
            info!("skipping embedder and embedding wait");
        } else {
            let outcome = sync
                .configure_embedder(&self.config.embedder, self.config.llm_api_key.as_deref())
                .await?;
            report.embedder = Some(outcome);
            sync.wait_for_embeddings().await?;
        }

        if stages.skip_sanity {
            info!("skipping sanity queries");
        } else {
            report.sanity = self.sanity_queries().await;
        }

        report.finished_at = Some(Utc::now());
        Ok(report)
    }

    async fn upsert_changed(
        &self,
        sync: &IndexSynchronizer<'_, E>,
    ) -> Result<usize, PipelineError> {
        let records = load_records(&self.config.paths.merged_file)?;
        let mut ledger = ChangeLedger::load(&self.config.paths.ledger_file)?;
        let changed = ledger.detect_changes(&records);
        info!(
            total = records.len(),
            changed = changed.len(),
            ledger = %ledger.path().display(),
            "change detection"
        );

        let sent = sync.upsert(&changed).await?;
        // only after the engine accepted every batch
        ledger.save()?;
        Ok(sent)
    }

    async fn sanity_queries(&self) -> Vec<SanityResult> {
        let options = QueryOptions {
            semantic_ratio: self.config.semantic_ratio,
            embedder: self.config.embedder.name.clone(),
            rewrite_query: false,
            summarize: false,
            ..QueryOptions::default()
        };
        let coordinator = SearchCoordinator::new(self.engine, None, options);
        let mut results = Vec::new();

        for query in &self.config.sanity_queries {
            match coordinator.search(&query.text, query.limit, query.hybrid).await {
                Ok(hits) => {
                    let citations = hits.iter().map(|hit| hit.citation()).collect::<Vec<_>>();
                    info!(query = %query.text, hybrid = query.hybrid, hits = ?citations, "sanity query");
                    results.push(SanityResult {
                        query: query.text.clone(),
                        citations,
                    });
                }
                Err(error) => {
                    warn!(query = %query.text, %error, "sanity query failed");
                }
            }
        }

        results
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{DataPaths, StageFlags};
    use crate::sync::tests::FakeEngine;
    use crate::sync::{PollPolicy, SyncOptions};
    use crate::SearchHit;
    use std::fs;
    use std::path::Path;
    use std::time::Duration;
    use tempfile::tempdir;

    struct FixtureExtractor;

    impl PdfExtractor for FixtureExtractor {
        fn extract_page(&self, path: &Path, page: u32) -> Result<String, IngestError> {
            if page > 1 {
                return Err(IngestError::Extraction("past the end".to_string()));
            }
            let name = path.file_stem().and_then(|stem| stem.to_str()).unwrap_or_default();
            let line = format!("O documento {name} relata a vigilância sobre o movimento estudantil");
            Ok(std::iter::repeat(line).take(5).collect::<Vec<_>>().join("\n"))
        }
    }

    fn config(root: &Path) -> PipelineConfig {
        let quick = PollPolicy {
            initial_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(2),
            timeout: Duration::from_millis(20),
        };
        let mut config = PipelineConfig::new(DataPaths::under(root, root.join("4-sync").join("ledger.json")));
        config.sync = SyncOptions {
            task_poll: quick,
            embedding_poll: quick,
            ..SyncOptions::default()
        };
        config
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn empty_raw_folder_writes_nothing() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        let config = config(dir.path());
        fs::create_dir_all(&config.paths.raw_dir)?;
        let engine = FakeEngine::default();

        let report = Pipeline::new(&config, &engine, &FixtureExtractor).run().await?;

        assert!(report.no_sources);
        assert!(!config.paths.processed_dir.exists());
        assert!(!config.paths.merged_file.exists());
        assert!(!config.paths.ledger_file.exists());
        assert!(engine.calls().is_empty());
        Ok(())
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn rerun_without_changes_uploads_nothing() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        let mut config = config(dir.path());
        config.stages = StageFlags {
            skip_settings: true,
            skip_sanity: true,
            ..StageFlags::default()
        };
        fs::create_dir_all(&config.paths.raw_dir)?;
        fs::write(config.paths.raw_dir.join("informe_a.pdf"), b"%PDF-1.4")?;
        fs::write(config.paths.raw_dir.join("informe_b.pdf"), b"%PDF-1.4")?;
        let engine = FakeEngine::default();

        let first = Pipeline::new(&config, &engine, &FixtureExtractor).run().await?;
        assert_eq!(first.merged_records, Some(2));
        assert_eq!(first.index_created, Some(true));
        assert_eq!(first.upserted, Some(2));
        assert_eq!(first.embedder, Some(EmbedderOutcome::SkippedMissingApiKey));
        assert!(config.paths.processed_dir.join("informe_a.json").exists());

        let second = Pipeline::new(&config, &engine, &FixtureExtractor).run().await?;
        assert_eq!(second.upserted, Some(0));

        let uploads = engine.uploaded.lock().map(|u| u.clone()).unwrap_or_default();
        assert_eq!(uploads.len(), 1);
        assert_eq!(uploads[0][0].id, "informe_a_p001");
        assert_eq!(uploads[0][1].title, "informe b");
        Ok(())
    }

    #[tokio::test]
    async fn skipping_the_dataset_reuses_the_merged_file() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        let mut config = config(dir.path());
        config.stages = StageFlags {
            skip_dataset: true,
            skip_index: true,
            skip_settings: true,
            skip_embeddings: true,
            skip_sanity: true,
            ..StageFlags::default()
        };
        fs::create_dir_all(config.paths.merged_file.parent().ok_or("no parent")?)?;
        fs::write(&config.paths.merged_file, "[]")?;
        let engine = FakeEngine::default();

        let report = Pipeline::new(&config, &engine, &FixtureExtractor).run().await?;

        assert_eq!(report.merged_records, None);
        assert_eq!(report.upserted, Some(0));
        assert!(config.paths.ledger_file.exists());
        Ok(())
    }

    #[tokio::test]
    async fn sanity_queries_report_citations() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        let mut config = config(dir.path());
        config.stages = StageFlags {
            skip_dataset: true,
            skip_index: true,
            skip_upsert: true,
            skip_settings: true,
            skip_embeddings: true,
            skip_sanity: false,
        };
        let engine = FakeEngine {
            hits: vec![SearchHit {
                title: "Informe DSI".to_string(),
                chunk_ordinal: Some(2),
                ..SearchHit::default()
            }],
            ..FakeEngine::default()
        };

        let report = Pipeline::new(&config, &engine, &FixtureExtractor).run().await?;

        assert_eq!(report.sanity.len(), 2);
        assert_eq!(report.sanity[0].citations, vec!["Informe DSI (p.2)"]);
        let searches = engine.searches.lock().map(|s| s.clone()).unwrap_or_default();
        assert!(searches[0].hybrid.is_none());
        assert!(searches[1].hybrid.is_some());
        Ok(())
    }
}
