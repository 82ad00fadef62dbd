use crate::domain::model::{Operator, Record, SelectQuery, Table};
use crate::utils::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub trait Storage: Send + Sync {
    fn read_file(&self, path: &str) -> impl std::future::Future<Output = Result<Vec<u8>>> + Send;
}

pub trait ConfigProvider: Send + Sync {
    fn backend_url(&self) -> &str;
    fn anon_key(&self) -> &str;
    fn access_token(&self) -> Option<&str>;
    fn timeout_seconds(&self) -> u64;
    fn assistant_endpoint(&self) -> Option<&str>;
    fn assistant_context(&self) -> &str;
}

/// Table-scoped CRUD against the managed data store.
#[async_trait]
pub trait RecordStore: Send + Sync {
    async fn insert(&self, table: Table, row: serde_json::Value) -> Result<()>;
    async fn select(&self, table: Table, query: &SelectQuery) -> Result<Vec<Record>>;
    async fn update(&self, table: Table, id: &str, patch: serde_json::Value) -> Result<()>;
    async fn delete(&self, table: Table, ids: &[String]) -> Result<()>;
}

#[async_trait]
pub trait SessionProvider: Send + Sync {
    /// Fails with `HsseError::SessionError` when there is no valid session.
    async fn current_operator(&self) -> Result<Operator>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

/// Body accepted by the hosted chat endpoint.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ChatRequest {
    Single { message: String },
    Conversation { messages: Vec<ChatMessage>, context: String },
}

#[async_trait]
pub trait ChatClient: Send + Sync {
    async fn send(&self, request: &ChatRequest) -> Result<String>;
}
