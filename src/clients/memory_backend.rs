//! 内存文档后端
//!
//! 离线运行和测试使用，支持注入失败和模拟网络延迟。

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use futures::future::BoxFuture;
use futures::FutureExt;
use tracing::debug;

use crate::clients::backend_client::DocumentBackend;
use crate::error::{AppError, AppResult};
use crate::models::document::Document;

#[derive(Default)]
pub struct InMemoryBackend {
    documents: Mutex<HashMap<String, Document>>,
    next_id: AtomicU64,
    /// 接下来需要失败的请求数
    failures: AtomicUsize,
    latency: Mutex<Option<Duration>>,
    creates: AtomicUsize,
    updates: AtomicUsize,
}

impl InMemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// 接下来的 `count` 个请求返回 `PersistenceError`
    pub fn fail_next(&self, count: usize) {
        self.failures.store(count, Ordering::SeqCst);
    }

    /// 每个请求在返回前等待 `latency`
    pub fn set_latency(&self, latency: Option<Duration>) {
        *lock(&self.latency) = latency;
    }

    /// 直接写入一条记录（模拟已有数据）
    pub fn insert(&self, document_id: impl Into<String>, document: Document) {
        lock(&self.documents).insert(document_id.into(), document);
    }

    pub fn stored(&self, document_id: &str) -> Option<Document> {
        lock(&self.documents).get(document_id).cloned()
    }

    pub fn len(&self) -> usize {
        lock(&self.documents).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn create_calls(&self) -> usize {
        self.creates.load(Ordering::SeqCst)
    }

    pub fn update_calls(&self) -> usize {
        self.updates.load(Ordering::SeqCst)
    }

    async fn simulate_network(&self, operation: &str) -> AppResult<()> {
        let latency = *lock(&self.latency);
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }
        let injected = self
            .failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if injected {
            debug!("内存后端: 注入 {} 失败", operation);
            return Err(AppError::bad_response(operation, 503, "injected failure"));
        }
        Ok(())
    }

    async fn create_impl(&self, document: &Document) -> AppResult<String> {
        self.creates.fetch_add(1, Ordering::SeqCst);
        self.simulate_network("create").await?;

        let document_id = format!("doc-{}", self.next_id.fetch_add(1, Ordering::SeqCst) + 1);
        let mut stored = document.clone();
        stored.meta.document_id = Some(document_id.clone());
        lock(&self.documents).insert(document_id.clone(), stored);
        Ok(document_id)
    }

    async fn update_impl(&self, document_id: &str, document: &Document) -> AppResult<()> {
        self.updates.fetch_add(1, Ordering::SeqCst);
        self.simulate_network("update").await?;

        let mut documents = lock(&self.documents);
        let Some(slot) = documents.get_mut(document_id) else {
            return Err(AppError::not_found(document_id));
        };
        *slot = document.clone();
        Ok(())
    }

    async fn get_impl(&self, document_id: &str) -> AppResult<Document> {
        self.simulate_network("get").await?;
        self.stored(document_id)
            .ok_or_else(|| AppError::not_found(document_id))
    }
}

impl DocumentBackend for InMemoryBackend {
    fn create<'a>(&'a self, document: &'a Document) -> BoxFuture<'a, AppResult<String>> {
        self.create_impl(document).boxed()
    }

    fn update<'a>(&'a self, document_id: &'a str, document: &'a Document) -> BoxFuture<'a, AppResult<()>> {
        self.update_impl(document_id, document).boxed()
    }

    fn get<'a>(&'a self, document_id: &'a str) -> BoxFuture<'a, AppResult<Document>> {
        self.get_impl(document_id).boxed()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
