#![allow(dead_code)]

use async_trait::async_trait;
use hsse_etl::core::{Operator, Record, RecordStore, SelectQuery, SessionProvider, Storage, Table};
use hsse_etl::utils::error::{HsseError, Result};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;

type RejectFn = dyn Fn(Table, &Value) -> bool + Send + Sync;

/// In-memory record store. Clones share the same tables.
#[derive(Clone, Default)]
pub struct MemoryStore {
    tables: Arc<Mutex<HashMap<Table, Vec<Record>>>>,
    reject: Option<Arc<RejectFn>>,
    fail_selects: bool,
    next_id: Arc<AtomicUsize>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts matching the predicate fail like a constraint violation would.
    pub fn rejecting(predicate: impl Fn(Table, &Value) -> bool + Send + Sync + 'static) -> Self {
        Self {
            reject: Some(Arc::new(predicate)),
            ..Self::default()
        }
    }

    pub fn failing_selects() -> Self {
        Self {
            fail_selects: true,
            ..Self::default()
        }
    }

    pub async fn seed(&self, table: Table, rows: Vec<Value>) {
        let mut tables = self.tables.lock().await;
        let entries = tables.entry(table).or_default();
        for row in rows {
            entries.push(Record::from(row.as_object().cloned().unwrap_or_default()));
        }
    }

    pub async fn rows(&self, table: Table) -> Vec<Record> {
        self.tables.lock().await.get(&table).cloned().unwrap_or_default()
    }
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn insert(&self, table: Table, row: Value) -> Result<()> {
        if self.reject.as_ref().is_some_and(|reject| reject(table, &row)) {
            return Err(HsseError::StoreError {
                table: table.to_string(),
                status: 400,
                message: "violates check constraint".to_string(),
            });
        }
        let mut data = row.as_object().cloned().unwrap_or_default();
        let id = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        data.entry("id").or_insert_with(|| Value::String(format!("rec-{}", id)));
        self.tables.lock().await.entry(table).or_default().push(Record::from(data));
        Ok(())
    }

    async fn select(&self, table: Table, query: &SelectQuery) -> Result<Vec<Record>> {
        if self.fail_selects {
            return Err(HsseError::StoreError {
                table: table.to_string(),
                status: 500,
                message: "database unavailable".to_string(),
            });
        }
        let mut rows: Vec<Record> = self
            .rows(table)
            .await
            .into_iter()
            .filter(|r| query.filters.iter().all(|f| f.matches(r)))
            .collect();
        if let Some(order) = &query.order {
            let key = |r: &Record| r.data.get(&order.column).map(|v| v.to_string()).unwrap_or_default();
            rows.sort_by_key(key);
            if !order.ascending {
                rows.reverse();
            }
        }
        Ok(rows)
    }

    async fn update(&self, table: Table, id: &str, patch: Value) -> Result<()> {
        let mut tables = self.tables.lock().await;
        if let Some(record) = tables
            .entry(table)
            .or_default()
            .iter_mut()
            .find(|r| r.id().as_deref() == Some(id))
        {
            if let Some(patch) = patch.as_object() {
                for (key, value) in patch {
                    record.data.insert(key.clone(), value.clone());
                }
            }
        }
        Ok(())
    }

    async fn delete(&self, table: Table, ids: &[String]) -> Result<()> {
        let mut tables = self.tables.lock().await;
        tables
            .entry(table)
            .or_default()
            .retain(|r| !r.id().is_some_and(|id| ids.contains(&id)));
        Ok(())
    }
}

pub struct FixedSession(pub Option<Operator>);

impl FixedSession {
    pub fn logged_in(id: &str) -> Self {
        Self(Some(Operator {
            id: id.to_string(),
            email: Some(format!("{}@example.com", id)),
        }))
    }

    pub fn logged_out() -> Self {
        Self(None)
    }
}

#[async_trait]
impl SessionProvider for FixedSession {
    async fn current_operator(&self) -> Result<Operator> {
        self.0.clone().ok_or_else(|| HsseError::SessionError {
            message: "not logged in".to_string(),
        })
    }
}

#[derive(Default)]
pub struct MemoryStorage {
    files: HashMap<String, Vec<u8>>,
    pub reads: AtomicUsize,
}

impl MemoryStorage {
    pub fn with_file(path: &str, bytes: Vec<u8>) -> Self {
        let mut storage = Self::default();
        storage.files.insert(path.to_string(), bytes);
        storage
    }
}

impl Storage for MemoryStorage {
    async fn read_file(&self, path: &str) -> Result<Vec<u8>> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        self.files.get(path).cloned().ok_or_else(|| {
            HsseError::IoError(std::io::Error::new(std::io::ErrorKind::NotFound, path.to_string()))
        })
    }
}

pub fn operator(id: &str) -> Operator {
    Operator {
        id: id.to_string(),
        email: None,
    }
}
