use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DocumentRecord {
    pub id: String,
    #[serde(rename = "documento")]
    pub document: String,
    // chunk ordinal within the document, not a physical page
    #[serde(rename = "pagina")]
    pub chunk_ordinal: u32,
    #[serde(rename = "titulo")]
    pub title: String,
    #[serde(rename = "texto")]
    pub text: String,
    pub length: usize,
}

#[derive(Debug, Clone)]
pub struct SourceDocument {
    pub base_id: String,
    pub title: String,
    pub pages: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct PreprocessOptions {
    pub min_line_chars: usize,
    pub section_threshold_chars: usize,
    pub short_chunk_chars: usize,
    pub overlap_chars: usize,
    pub min_words: usize,
    pub max_pages: u32,
    pub correct_ocr_typos: bool,
}

impl Default for PreprocessOptions {
    fn default() -> Self {
        Self {
            min_line_chars: 20,
            section_threshold_chars: 800,
            short_chunk_chars: 400,
            overlap_chars: 200,
            min_words: 30,
            max_pages: 9_999,
            correct_ocr_typos: false,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum TaskStatus {
    Enqueued,
    Processing,
    Succeeded,
    Failed,
    Canceled,
    #[serde(other)]
    Unknown,
}

impl TaskStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed | Self::Canceled)
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Enqueued => "enqueued",
            Self::Processing => "processing",
            Self::Succeeded => "succeeded",
            Self::Failed => "failed",
            Self::Canceled => "canceled",
            Self::Unknown => "unknown",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskInfo {
    pub task_uid: u64,
    #[serde(default)]
    pub index_uid: Option<String>,
    pub status: TaskStatus,
    #[serde(rename = "type", default)]
    pub kind: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub uid: u64,
    #[serde(default)]
    pub index_uid: Option<String>,
    pub status: TaskStatus,
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub error: Option<Value>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct HybridSearch {
    pub semantic_ratio: f32,
    pub embedder: String,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct SearchRequest {
    pub q: String,
    pub limit: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hybrid: Option<HybridSearch>,
}

impl SearchRequest {
    pub fn full_text(q: impl Into<String>, limit: usize) -> Self {
        Self {
            q: q.into(),
            limit,
            hybrid: None,
        }
    }

    pub fn hybrid(
        q: impl Into<String>,
        limit: usize,
        semantic_ratio: f32,
        embedder: impl Into<String>,
    ) -> Self {
        Self {
            q: q.into(),
            limit,
            hybrid: Some(HybridSearch {
                semantic_ratio,
                embedder: embedder.into(),
            }),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct SearchHit {
    #[serde(rename = "titulo", default)]
    pub title: String,
    #[serde(rename = "documento", default)]
    pub document: String,
    #[serde(rename = "pagina", default)]
    pub chunk_ordinal: Option<u32>,
    #[serde(rename = "texto", default)]
    pub text: String,
}

impl SearchHit {
    pub fn citation(&self) -> String {
        match self.chunk_ordinal {
            Some(ordinal) => format!("{} (p.{ordinal})", self.title),
            None => self.title.clone(),
        }
    }

    pub fn snippet(&self, max_chars: usize) -> String {
        self.text.chars().take(max_chars).collect()
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    System,
    User,
    Assistant,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
        }
    }
}
