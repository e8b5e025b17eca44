use crate::{
    ChatMessage, DocumentRecord, IndexSetting, SearchError, SearchHit, SearchRequest, Task,
    TaskInfo,
};
use async_trait::async_trait;
use serde_json::{Map, Value};

#[async_trait]
pub trait SearchEngine: Send + Sync {
    fn index_uid(&self) -> &str;

    async fn index_exists(&self) -> Result<bool, SearchError>;

    async fn create_index(&self, primary_key: &str) -> Result<TaskInfo, SearchError>;

    async fn add_documents(
        &self,
        documents: &[DocumentRecord],
        primary_key: &str,
    ) -> Result<TaskInfo, SearchError>;

    async fn update_setting(&self, setting: &IndexSetting) -> Result<TaskInfo, SearchError>;

    async fn embedders(&self) -> Result<Map<String, Value>, SearchError>;

    async fn update_embedders(&self, embedders: &Value) -> Result<TaskInfo, SearchError>;

    async fn get_task(&self, uid: u64) -> Result<Task, SearchError>;

    async fn list_tasks(&self, types: &[String]) -> Result<Vec<Task>, SearchError>;

    async fn search(&self, request: &SearchRequest) -> Result<Vec<SearchHit>, SearchError>;
}

#[async_trait]
pub trait ChatModel: Send + Sync {
    async fn complete(&self, messages: &[ChatMessage]) -> Result<String, SearchError>;
}
