use crate::traits::SearchEngine;
use crate::{
    DocumentRecord, EmbedderSettings, IndexSettings, SearchError, Task, TaskInfo, TaskStatus,
};
use std::time::Duration;
use tracing::{info, warn};

pub const DEFAULT_BATCH_SIZE: usize = 1_000;
pub const EMBEDDING_TASK_TYPE: &str = "indexEmbeddingGeneration";

#[derive(Debug, Clone, Copy)]
pub struct PollPolicy {
    pub initial_delay: Duration,
    pub max_delay: Duration,
    pub timeout: Duration,
}

impl PollPolicy {
    pub fn for_tasks() -> Self {
        Self {
            initial_delay: Duration::from_millis(300),
            max_delay: Duration::from_secs(5),
            timeout: Duration::from_secs(10 * 60),
        }
    }

    pub fn for_embeddings() -> Self {
        Self {
            initial_delay: Duration::from_secs(5),
            max_delay: Duration::from_secs(60),
            timeout: Duration::from_secs(2 * 60 * 60),
        }
    }
}

struct Backoff {
    policy: PollPolicy,
    delay: Duration,
    waited: Duration,
}

impl Backoff {
    fn new(policy: PollPolicy) -> Self {
        Self {
            policy,
            delay: policy.initial_delay,
            waited: Duration::ZERO,
        }
    }

    async fn wait(&mut self, what: impl FnOnce() -> String) -> Result<(), SearchError> {
        if self.waited >= self.policy.timeout {
            return Err(SearchError::Timeout {
                what: what(),
                waited_ms: self.waited.as_millis(),
            });
        }
        let delay = self.delay.min(self.policy.timeout - self.waited);
        tokio::time::sleep(delay).await;
        self.waited += delay;
        self.delay = (self.delay * 2).min(self.policy.max_delay);
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmbedderOutcome {
    Created,
    AlreadyConfigured,
    SkippedMissingApiKey,
}

#[derive(Debug, Clone)]
pub struct SyncOptions {
    pub primary_key: String,
    pub batch_size: usize,
    pub task_poll: PollPolicy,
    pub embedding_poll: PollPolicy,
    pub embedding_task_types: Vec<String>,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            primary_key: "id".to_string(),
            batch_size: DEFAULT_BATCH_SIZE,
            task_poll: PollPolicy::for_tasks(),
            embedding_poll: PollPolicy::for_embeddings(),
            embedding_task_types: vec![EMBEDDING_TASK_TYPE.to_string()],
        }
    }
}

pub struct IndexSynchronizer<'a, E: SearchEngine + ?Sized> {
    engine: &'a E,
    options: SyncOptions,
}

impl<'a, E: SearchEngine + ?Sized> IndexSynchronizer<'a, E> {
    pub fn new(engine: &'a E, options: SyncOptions) -> Self {
        Self { engine, options }
    }

    pub async fn wait_task(&self, info: &TaskInfo) -> Result<Task, SearchError> {
        let mut backoff = Backoff::new(self.options.task_poll);

        loop {
            let task = self.engine.get_task(info.task_uid).await?;
            if task.status.is_terminal() {
                if task.status != TaskStatus::Succeeded {
                    return Err(SearchError::TaskFailed {
                        uid: task.uid,
                        status: task.status.to_string(),
                        details: task
                            .error
                            .as_ref()
                            .map(|error| error.to_string())
                            .unwrap_or_else(|| format!("{} task", task.kind)),
                    });
                }
                return Ok(task);
            }
            backoff
                .wait(|| format!("task {}", info.task_uid))
                .await?;
        }
    }

    pub async fn ensure_index(&self) -> Result<bool, SearchError> {
        let uid = self.engine.index_uid();
        if self.engine.index_exists().await? {
            info!(index = uid, "index already exists");
            return Ok(false);
        }

        let task = self.engine.create_index(&self.options.primary_key).await?;
        self.wait_task(&task).await?;
        info!(index = uid, primary_key = %self.options.primary_key, "index created");
        Ok(true)
    }

    pub async fn upsert(&self, records: &[DocumentRecord]) -> Result<usize, SearchError> {
        if records.is_empty() {
            info!("no new or changed documents, nothing to upsert");
            return Ok(0);
        }

        let batch_size = self.options.batch_size.max(1);
        info!(documents = records.len(), batch_size, "upserting documents");

        for (number, batch) in records.chunks(batch_size).enumerate() {
            let task = self
                .engine
                .add_documents(batch, &self.options.primary_key)
                .await?;
            self.wait_task(&task).await?;
            info!(batch = number + 1, documents = batch.len(), "batch indexed");
        }

        Ok(records.len())
    }

    pub async fn apply_settings(&self, settings: &IndexSettings) -> Result<(), SearchError> {
        for setting in settings.updates() {
            let task = self.engine.update_setting(&setting).await?;
            self.wait_task(&task).await?;
            info!(setting = setting.route(), "setting applied");
        }
        Ok(())
    }

    pub async fn configure_embedder(
        &self,
        settings: &EmbedderSettings,
        api_key: Option<&str>,
    ) -> Result<EmbedderOutcome, SearchError> {
        let Some(api_key) = api_key.filter(|key| !key.trim().is_empty()) else {
            warn!(embedder = %settings.name, "no LLM API key configured, skipping embedder");
            return Ok(EmbedderOutcome::SkippedMissingApiKey);
        };

        let existing = self.engine.embedders().await?;
        if existing.contains_key(&settings.name) {
            info!(embedder = %settings.name, "embedder already configured");
            return Ok(EmbedderOutcome::AlreadyConfigured);
        }

        let task = self
            .engine
            .update_embedders(&settings.payload(api_key))
            .await?;
        self.wait_task(&task).await?;
        info!(embedder = %settings.name, model = %settings.model, "embedder configured");
        Ok(EmbedderOutcome::Created)
    }

    pub async fn wait_for_embeddings(&self) -> Result<(), SearchError> {
        let uid = self.engine.index_uid();
        let mut backoff = Backoff::new(self.options.embedding_poll);

        loop {
            let pending = self
                .engine
                .list_tasks(&self.options.embedding_task_types)
                .await?
                .into_iter()
                .filter(|task| self.options.embedding_task_types.contains(&task.kind))
                .filter(|task| task.index_uid.as_deref() == Some(uid))
                .filter(|task| !task.status.is_terminal())
                .count();

            if pending == 0 {
                info!(index = uid, "embeddings ready");
                return Ok(());
            }

            info!(index = uid, pending, "waiting for embedding tasks");
            backoff.wait(|| "embedding generation".to_string()).await?;
        }
    }
}
