use crate::traits::SearchEngine;
use crate::{
    DocumentRecord, IndexSetting, SearchError, SearchHit, SearchRequest, Task, TaskInfo,
};
use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Map, Value};
use std::time::Duration;
use url::Url;

const BACKEND: &str = "meilisearch";

pub struct MeiliClient {
    client: Client,
    base: Url,
    api_key: Option<String>,
    index_uid: String,
}

#[derive(Debug, Deserialize)]
struct TaskList {
    #[serde(default)]
    results: Vec<Task>,
    #[serde(default)]
    next: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    hits: Vec<SearchHit>,
}

impl MeiliClient {
    pub fn new(
        endpoint: &str,
        api_key: Option<String>,
        index_uid: impl Into<String>,
    ) -> Result<Self, SearchError> {
        let mut base = Url::parse(endpoint)?;
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }

        let client = Client::builder().timeout(Duration::from_secs(60)).build()?;

        Ok(Self {
            client,
            base,
            api_key: api_key.filter(|key| !key.trim().is_empty()),
            index_uid: index_uid.into(),
        })
    }

    fn url(&self, path: &str) -> Result<Url, SearchError> {
        Ok(self.base.join(path)?)
    }

    fn index_url(&self, suffix: &str) -> Result<Url, SearchError> {
        if suffix.is_empty() {
            self.url(&format!("indexes/{}", self.index_uid))
        } else {
            self.url(&format!("indexes/{}/{suffix}", self.index_uid))
        }
    }

    fn pending_tasks_url(&self, types: &[String], from: Option<u64>) -> Result<Url, SearchError> {
        let mut url = self.url("tasks")?;
        {
            let mut query = url.query_pairs_mut();
            query
                .append_pair("indexUids", &self.index_uid)
                .append_pair("statuses", "enqueued,processing");
            if !types.is_empty() {
                query.append_pair("types", &types.join(","));
            }
            if let Some(from) = from {
                query.append_pair("from", &from.to_string());
            }
        }
        Ok(url)
    }

    fn request(&self, method: Method, url: Url) -> RequestBuilder {
        let request = self.client.request(method, url);
        match &self.api_key {
            Some(key) => request.bearer_auth(key),
            None => request,
        }
    }

    async fn read_json<T: DeserializeOwned>(response: Response) -> Result<T, SearchError> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SearchError::BackendResponse {
                backend: BACKEND.to_string(),
                details: format!("{status}: {body}"),
            });
        }
        Ok(response.json().await?)
    }

    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, SearchError> {
        let response = request.send().await?;
        Self::read_json(response).await
    }
}

#[async_trait]
impl SearchEngine for MeiliClient {
    fn index_uid(&self) -> &str {
        &self.index_uid
    }

    async fn index_exists(&self) -> Result<bool, SearchError> {
        let response = self
            .request(Method::GET, self.index_url("")?)
            .send()
            .await?;

        match response.status() {
            StatusCode::OK => Ok(true),
            StatusCode::NOT_FOUND => Ok(false),
            status => Err(SearchError::BackendResponse {
                backend: BACKEND.to_string(),
                details: format!("index lookup returned {status}"),
            }),
        }
    }

    async fn create_index(&self, primary_key: &str) -> Result<TaskInfo, SearchError> {
        let request = self
            .request(Method::POST, self.url("indexes")?)
            .json(&json!({ "uid": self.index_uid, "primaryKey": primary_key }));
        self.send(request).await
    }

    async fn add_documents(
        &self,
        documents: &[DocumentRecord],
        primary_key: &str,
    ) -> Result<TaskInfo, SearchError> {
        let mut url = self.index_url("documents")?;
        url.query_pairs_mut().append_pair("primaryKey", primary_key);
        let request = self.request(Method::POST, url).json(documents);
        self.send(request).await
    }

    async fn update_setting(&self, setting: &IndexSetting) -> Result<TaskInfo, SearchError> {
        let url = self.index_url(&format!("settings/{}", setting.route()))?;
        let request = self.request(Method::PUT, url).json(&setting.body());
        self.send(request).await
    }

    async fn embedders(&self) -> Result<Map<String, Value>, SearchError> {
        let request = self.request(Method::GET, self.index_url("settings/embedders")?);
        let value: Value = self.send(request).await?;
        match value {
            Value::Object(embedders) => Ok(embedders),
            Value::Null => Ok(Map::new()),
            other => Err(SearchError::BackendResponse {
                backend: BACKEND.to_string(),
                details: format!("unexpected embedders payload: {other}"),
            }),
        }
    }

    async fn update_embedders(&self, embedders: &Value) -> Result<TaskInfo, SearchError> {
        let request = self
            .request(Method::PATCH, self.index_url("settings/embedders")?)
            .json(embedders);
        self.send(request).await
    }

    async fn get_task(&self, uid: u64) -> Result<Task, SearchError> {
        let request = self.request(Method::GET, self.url(&format!("tasks/{uid}"))?);
        self.send(request).await
    }

    async fn list_tasks(&self, types: &[String]) -> Result<Vec<Task>, SearchError> {
        let mut tasks = Vec::new();
        let mut from = None;

        loop {
            let url = self.pending_tasks_url(types, from)?;
            let page: TaskList = self.send(self.request(Method::GET, url)).await?;
            tasks.extend(page.results);
            match page.next {
                Some(next) => from = Some(next),
                None => return Ok(tasks),
            }
        }
    }

    async fn search(&self, request: &SearchRequest) -> Result<Vec<SearchHit>, SearchError> {
        let url = self.index_url("search")?;
        let response: SearchResponse = self.send(self.request(Method::POST, url).json(request)).await?;
        Ok(response.hits)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn urls_keep_a_path_prefix() -> Result<(), SearchError> {
        let client = MeiliClient::new("http://search.local/meili", None, "documentos")?;
        assert_eq!(
            client.index_url("settings/ranking-rules")?.as_str(),
            "http://search.local/meili/indexes/documentos/settings/ranking-rules"
        );
        assert_eq!(client.url("tasks/7")?.as_str(), "http://search.local/meili/tasks/7");
        Ok(())
    }

    #[test]
    fn bare_host_resolves_from_root() -> Result<(), SearchError> {
        let client = MeiliClient::new("http://127.0.0.1:7700", None, "documentos")?;
        assert_eq!(
            client.index_url("")?.as_str(),
            "http://127.0.0.1:7700/indexes/documentos"
        );
        Ok(())
    }

    #[test]
    fn blank_key_means_no_auth() -> Result<(), SearchError> {
        let client = MeiliClient::new("http://127.0.0.1:7700", Some("  ".to_string()), "x")?;
        assert!(client.api_key.is_none());
        Ok(())
    }

    #[test]
    fn invalid_endpoint_is_rejected() {
        assert!(matches!(
            MeiliClient::new("not a url", None, "x"),
            Err(SearchError::Url(_))
        ));
    }

    #[test]
    fn task_list_tolerates_missing_results() -> Result<(), serde_json::Error> {
        let parsed: TaskList = serde_json::from_str(r#"{"limit": 20, "from": null}"#)?;
        assert!(parsed.results.is_empty());
        assert_eq!(parsed.next, None);
        Ok(())
    }

    #[test]
    fn task_list_exposes_the_next_page() -> Result<(), serde_json::Error> {
        let parsed: TaskList =
            serde_json::from_str(r#"{"results": [], "limit": 20, "from": 90, "next": 70}"#)?;
        assert_eq!(parsed.next, Some(70));
        Ok(())
    }

    #[test]
    fn pending_task_query_filters_by_type_and_pages() -> Result<(), SearchError> {
        let client = MeiliClient::new("http://127.0.0.1:7700", None, "documentos")?;
        let types = vec!["indexEmbeddingGeneration".to_string()];

        let first = client.pending_tasks_url(&types, None)?;
        assert_eq!(
            first.query(),
            Some("indexUids=documentos&statuses=enqueued%2Cprocessing&types=indexEmbeddingGeneration")
        );

        let later = client.pending_tasks_url(&types, Some(70))?;
        assert!(later.query().is_some_and(|query| query.ends_with("&from=70")));
        Ok(())
    }
}
