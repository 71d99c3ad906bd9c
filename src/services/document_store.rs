//! 文档存储 - 业务能力层
//!
//! 会话内唯一的规范文档持有者。
//!
//! ## 职责
//! - 持有当前文档和初始快照（原始快照只在 `initialize` / `load` 时写入）
//! - 对外只交出深拷贝或只读视图，其他组件不会拿到可变别名
//! - 每次规范文档变化都在事件总线上发出 `DocumentChanged`
//! - `save` / `load` 是唯一需要等待网络的操作
//!
//! ## 保存的单飞约束
//!
//! 同一个存储上的 `save` 通过 `save_gate` 串行执行：后发起的保存等前一个完成，
//! 然后保存那一刻的最新状态。如果最新版本已经被前一次保存写入，则直接返回。
//! 请求在途期间如果又发生了编辑，保存成功后脏标记仍然保留。

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::Utc;
use regex::Regex;
use tracing::{debug, info, warn};

use crate::clients::DocumentBackend;
use crate::error::{AppError, AppResult, StateError};
use crate::infrastructure::EventBus;
use crate::models::document::{
    ContentPatch, Document, DocumentMeta, DocumentView, ExportArtifact, ExtractedContent, Snapshot,
    UploadType, CURRENT_SCHEMA_VERSION,
};
use crate::models::event::Notice;

#[derive(Default)]
struct StoreState {
    current: Option<Document>,
    original: Option<Snapshot>,
    dirty: bool,
    /// 已经写入后端的 edit_count
    saved_revision: Option<u64>,
    /// 每次 initialize / load / reset 递增，用来识别在途保存是否仍属于当前文档
    generation: u64,
}

/// 文档存储
pub struct DocumentStore {
    state: Mutex<StoreState>,
    backend: Arc<dyn DocumentBackend>,
    bus: Option<Arc<EventBus>>,
    save_gate: tokio::sync::Mutex<()>,
}

impl DocumentStore {
    pub fn new(backend: Arc<dyn DocumentBackend>) -> Self {
        Self {
            state: Mutex::new(StoreState::default()),
            backend,
            bus: None,
            save_gate: tokio::sync::Mutex::new(()),
        }
    }

    /// 文档变化时通过 `bus` 发出通知
    pub fn with_bus(mut self, bus: Arc<EventBus>) -> Self {
        self.bus = Some(bus);
        self
    }

    // ========== 读取 ==========

    /// 当前文档的深拷贝
    pub fn current(&self) -> Option<Document> {
        self.lock().current.clone()
    }

    /// 当前文档的只读视图
    pub fn view(&self) -> Option<DocumentView> {
        self.lock().current.clone().map(Arc::new)
    }

    /// 初始快照
    pub fn original(&self) -> Option<Snapshot> {
        self.lock().original.clone()
    }

    pub fn has_document(&self) -> bool {
        self.lock().current.is_some()
    }

    pub fn is_dirty(&self) -> bool {
        self.lock().dirty
    }

    pub fn document_id(&self) -> Option<String> {
        self.lock()
            .current
            .as_ref()
            .and_then(|doc| doc.meta.document_id.clone())
    }

    /// 当前文档的快照
    pub fn snapshot(&self) -> Option<Snapshot> {
        self.lock().current.as_ref().map(Snapshot::capture)
    }

    // ========== 同步修改 ==========

    /// 用提取结果建立新文档，完全替换之前的文档
    ///
    /// # 参数
    /// - `extracted`: 提取出的内容（可携带处理状态、置信度等）
    /// - `upload_type`: 上传类型
    /// - `source_file`: 源文件名
    pub fn initialize(
        &self,
        extracted: ExtractedContent,
        upload_type: UploadType,
        source_file: Option<&str>,
    ) -> DocumentView {
        let now = Utc::now();
        let document = Document {
            meta: DocumentMeta {
                document_id: None,
                filename: source_file.map(str::to_string),
                upload_type,
                created_at: now,
                updated_at: now,
                processing_status: extracted.processing_status.unwrap_or_default(),
                confidence_score: extracted.confidence_score,
                edit_count: 0,
                extraction_method: extracted.extraction_method,
                custom_instructions: extracted.custom_instructions,
                original_content: Some(extracted.content.clone()),
                schema_version: CURRENT_SCHEMA_VERSION,
            },
            content: extracted.content,
        };

        let view = Arc::new(document.clone());
        {
            let mut state = self.lock();
            if state.current.is_some() {
                debug!("[文档存储] 重新初始化，丢弃之前的文档");
            }
            state.original = Some(Snapshot::capture(&document));
            state.current = Some(document);
            state.dirty = false;
            state.saved_revision = None;
            state.generation += 1;
        }

        info!(
            "[文档存储] 初始化文档: {} ({})",
            source_file.unwrap_or("<未命名>"),
            upload_type
        );
        self.notify(view.clone(), false);
        view
    }

    /// 把部分内容合并进当前文档；元数据保留，只递增 edit_count 并刷新 updated_at
    pub fn update(&self, patch: &ContentPatch) -> AppResult<DocumentView> {
        self.mutate("update", |doc| patch.apply_to(&mut doc.content))
    }

    /// 用快照内容替换当前内容（撤销 / 重做用），同样计为一次编辑
    pub fn install(&self, snapshot: &Snapshot) -> AppResult<DocumentView> {
        let content = snapshot.content().clone();
        self.mutate("install", move |doc| doc.content = content)
    }

    /// 恢复为初始快照的内容，计为一次编辑
    pub fn restore(&self) -> AppResult<DocumentView> {
        let original = self.original().ok_or(StateError::NoDocument)?;
        self.install(&original)
    }

    /// 清空存储（开始新会话）
    pub fn reset(&self) {
        let mut state = self.lock();
        let generation = state.generation + 1;
        *state = StoreState {
            generation,
            ..Default::default()
        };
        info!("[文档存储] 已清空");
    }

    fn mutate<F>(&self, operation: &str, apply: F) -> AppResult<DocumentView>
    where
        F: FnOnce(&mut Document),
    {
        let view = {
            let mut state = self.lock();
            let doc = state.current.as_mut().ok_or(StateError::NoDocument)?;
            apply(doc);
            doc.meta.edit_count += 1;
            doc.meta.updated_at = Utc::now();
            let view = Arc::new(doc.clone());
            state.dirty = true;
            view
        };

        debug!(
            "[文档存储] {} → edit_count={}",
            operation, view.meta.edit_count
        );
        self.notify(view.clone(), true);
        Ok(view)
    }

    // ========== 持久化 ==========

    /// 保存当前文档，返回文档 ID
    ///
    /// 没有 ID 时调用后端 create 并采用返回的 ID，否则调用 update。
    /// 失败时脏标记保持不变，重试总是安全的。
    /// 请求期间文档被重置或加载替换时返回 `AppError::Superseded`。
    pub async fn save(&self) -> AppResult<String> {
        let _flight = self.save_gate.lock().await;

        let (document, revision, generation) = {
            let state = self.lock();
            let doc = state.current.clone().ok_or(StateError::NoDocument)?;
            if let Some(id) = &doc.meta.document_id {
                if state.saved_revision == Some(doc.meta.edit_count) {
                    debug!("[文档 {}] 当前版本已保存，跳过", id);
                    return Ok(id.clone());
                }
            }
            let revision = doc.meta.edit_count;
            (doc, revision, state.generation)
        };

        let result = match &document.meta.document_id {
            None => self.backend.create(&document).await,
            Some(id) => self
                .backend
                .update(id, &document)
                .await
                .map(|()| id.clone()),
        };

        let document_id = match result {
            Ok(id) => id,
            Err(e) => {
                warn!("[文档存储] 保存失败，保留未保存标记: {}", e);
                return Err(into_persistence(e));
            }
        };

        let mut guard = self.lock();
        let state = &mut *guard;
        if state.generation != generation {
            warn!("[文档 {}] 保存完成时文档已被替换，后端记录成为孤立记录", document_id);
            return Err(AppError::Superseded { document_id });
        }
        if let Some(doc) = state.current.as_mut() {
            doc.meta.document_id = Some(document_id.clone());
            if doc.meta.edit_count == revision {
                state.dirty = false;
            } else {
                debug!("[文档 {}] 保存期间有新的编辑，保留未保存标记", document_id);
            }
        }
        state.saved_revision = Some(revision);
        info!("[文档 {}] ✓ 已保存 (edit_count={})", document_id, revision);

        Ok(document_id)
    }

    /// 从后端加载文档并替换当前文档
    ///
    /// 原始快照优先取文档内嵌的备份字段，旧数据没有备份时退回到加载到的文档本身。
    /// 失败时存储保持不变。
    pub async fn load(&self, document_id: &str) -> AppResult<DocumentView> {
        let _flight = self.save_gate.lock().await;

        let mut document = self.backend.get(document_id).await.map_err(|e| {
            warn!("[文档 {}] 加载失败: {}", document_id, e);
            e
        })?;

        if document.meta.document_id.is_none() {
            document.meta.document_id = Some(document_id.to_string());
        }

        let original = match &document.meta.original_content {
            Some(content) => {
                let mut backup = document.clone();
                backup.content = content.clone();
                Snapshot::capture(&backup)
            }
            None => {
                debug!("[文档 {}] 没有备份字段，以加载内容作为原始快照", document_id);
                Snapshot::capture(&document)
            }
        };

        let view = Arc::new(document.clone());
        {
            let mut state = self.lock();
            state.saved_revision = Some(document.meta.edit_count);
            state.original = Some(original);
            state.current = Some(document);
            state.dirty = false;
            state.generation += 1;
        }

        info!("[文档 {}] ✓ 已加载", document_id);
        self.notify(view.clone(), false);
        Ok(view)
    }

    /// 把当前文档序列化为可下载文件，不访问网络也不影响脏标记
    pub fn export(&self, name: &str) -> AppResult<ExportArtifact> {
        let document = self.current().ok_or(StateError::NoDocument)?;

        let base = if name.trim().is_empty() {
            if document.content.exam_name.trim().is_empty() {
                "document".to_string()
            } else {
                document.content.exam_name.clone()
            }
        } else {
            name.to_string()
        };

        let bytes = serde_json::to_vec_pretty(&document)?;
        let artifact = ExportArtifact {
            file_name: format!("{}.json", sanitize_file_name(&base)),
            content_type: "application/json",
            bytes,
        };
        debug!("[文档存储] 导出 {} ({} 字节)", artifact.file_name, artifact.bytes.len());
        Ok(artifact)
    }

    fn notify(&self, document: DocumentView, dirty: bool) {
        if let Some(bus) = &self.bus {
            if let Err(e) = bus.emit(Notice::DocumentChanged { document, dirty }) {
                warn!("[文档存储] 变更通知未能分发: {}", e);
            }
        }
    }

    fn lock(&self) -> MutexGuard<'_, StoreState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// 保存失败一律以 `PersistenceError` 报告
fn into_persistence(error: AppError) -> AppError {
    match error {
        AppError::Persistence(_) => error,
        AppError::NotFound { document_id } => {
            AppError::bad_response("update", 404, format!("文档 {} 在后端不存在", document_id))
        }
        other => AppError::bad_response("save", 500, other.to_string()),
    }
}

/// 去掉文件名中不安全的字符
fn sanitize_file_name(name: &str) -> String {
    let cleaned = match Regex::new(r"[^\p{L}\p{N}_\-. ]+") {
        Ok(re) => re.replace_all(name, "_").into_owned(),
        Err(_) => name.to_string(),
    };
    let cleaned = cleaned.trim().trim_matches('.').to_string();
    if cleaned.is_empty() {
        "document".to_string()
    } else {
        cleaned
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clients::InMemoryBackend;
    use crate::models::document::{DocumentContent, ProcessingStatus, Question};
    use std::collections::BTreeMap;
    use std::time::Duration;
    use tokio_test::assert_err;

    fn rubric_content() -> ExtractedContent {
        ExtractedContent {
            content: DocumentContent {
                exam_name: "Midterm".to_string(),
                general_instructions: "Show work".to_string(),
                questions: vec![Question::new("Q1", "Define entropy", 5.0).with_criterion("definition", 5.0)],
                ..Default::default()
            },
            confidence_score: Some(0.82),
            ..Default::default()
        }
    }

    fn store_with(backend: Arc<InMemoryBackend>) -> Arc<DocumentStore> {
        Arc::new(DocumentStore::new(backend))
    }

    #[test]
    fn test_initialize_separates_original_and_current() {
        let store = store_with(Arc::new(InMemoryBackend::new()));
        store.initialize(rubric_content(), UploadType::Rubric, Some("rubric.pdf"));

        let original = store.original().unwrap();
        let mut current = store.current().unwrap();
        assert!(original.document().content_eq(&current));

        current.content.exam_name = "changed".to_string();
        assert_eq!(store.original().unwrap().content().exam_name, "Midterm");
        assert_eq!(store.current().unwrap().content.exam_name, "Midterm");

        let doc = store.current().unwrap();
        assert_eq!(doc.meta.edit_count, 0);
        assert_eq!(doc.meta.processing_status, ProcessingStatus::Completed);
        assert_eq!(doc.meta.filename.as_deref(), Some("rubric.pdf"));
        assert_eq!(doc.meta.original_content.as_ref(), Some(&doc.content));
        assert!(!store.is_dirty());
    }

    #[test]
    fn test_initialize_respects_extracted_status() {
        let store = store_with(Arc::new(InMemoryBackend::new()));
        let mut extracted = rubric_content();
        extracted.processing_status = Some(ProcessingStatus::Failed);
        store.initialize(extracted, UploadType::Rubric, None);
        assert_eq!(
            store.current().unwrap().meta.processing_status,
            ProcessingStatus::Failed
        );
    }

    #[test]
    fn test_update_increments_edit_count_and_keeps_metadata() {
        let store = store_with(Arc::new(InMemoryBackend::new()));
        store.initialize(rubric_content(), UploadType::Rubric, Some("rubric.pdf"));
        let before = store.current().unwrap();

        for expected in 1..=3 {
            let view = store.update(&ContentPatch::exam_name(format!("v{}", expected))).unwrap();
            assert_eq!(view.meta.edit_count, expected);
        }

        let after = store.current().unwrap();
        assert_eq!(after.meta.created_at, before.meta.created_at);
        assert_eq!(after.meta.confidence_score, Some(0.82));
        assert_eq!(after.content.general_instructions, "Show work");
        assert!(store.is_dirty());
    }

    #[test]
    fn test_update_without_document_is_state_error() {
        let store = store_with(Arc::new(InMemoryBackend::new()));
        let err = store.update(&ContentPatch::exam_name("x")).unwrap_err();
        assert!(matches!(err, AppError::State(StateError::NoDocument)));
    }

    #[test]
    fn test_restore_counts_as_edit() {
        let store = store_with(Arc::new(InMemoryBackend::new()));
        store.initialize(rubric_content(), UploadType::Rubric, None);
        store.update(&ContentPatch::exam_name("Final")).unwrap();

        let view = store.restore().unwrap();
        assert_eq!(view.content.exam_name, "Midterm");
        assert_eq!(view.meta.edit_count, 2);
        assert!(store.is_dirty());
    }

    #[test]
    fn test_changes_are_published_on_bus() {
        let bus = Arc::new(EventBus::default());
        let seen = Arc::new(Mutex::new(Vec::new()));
        let seen_in_handler = seen.clone();
        bus.subscribe(crate::models::EventKind::DocumentChanged, move |event| {
            if let crate::models::Event::Notice(Notice::DocumentChanged { document, dirty }) = event {
                seen_in_handler
                    .lock()
                    .unwrap()
                    .push((document.meta.edit_count, *dirty));
            }
            Ok(())
        });

        let store = DocumentStore::new(Arc::new(InMemoryBackend::new())).with_bus(bus);
        store.initialize(rubric_content(), UploadType::Rubric, None);
        store.update(&ContentPatch::student_name("Alex")).unwrap();

        assert_eq!(*seen.lock().unwrap(), vec![(0, false), (1, true)]);
    }

    #[tokio::test]
    async fn test_save_creates_then_updates() {
        let backend = Arc::new(InMemoryBackend::new());
        let store = store_with(backend.clone());
        store.initialize(rubric_content(), UploadType::Rubric, None);

        let id = store.save().await.unwrap();
        assert_eq!(store.document_id().as_deref(), Some(id.as_str()));
        assert!(!store.is_dirty());
        assert_eq!(backend.create_calls(), 1);

        store.update(&ContentPatch::exam_name("Final")).unwrap();
        let again = store.save().await.unwrap();
        assert_eq!(again, id);
        assert_eq!(backend.update_calls(), 1);
        assert_eq!(backend.stored(&id).unwrap().content.exam_name, "Final");
    }

    #[tokio::test]
    async fn test_failed_save_keeps_dirty_and_retry_succeeds() {
        let backend = Arc::new(InMemoryBackend::new());
        let store = store_with(backend.clone());
        store.initialize(rubric_content(), UploadType::Rubric, None);
        store.update(&ContentPatch::exam_name("Final")).unwrap();

        backend.fail_next(1);
        let err = store.save().await.unwrap_err();
        assert!(matches!(err, AppError::Persistence(_)));
        assert!(store.is_dirty());
        assert!(store.document_id().is_none());

        store.save().await.unwrap();
        assert!(!store.is_dirty());
    }

    #[tokio::test]
    async fn test_overlapping_saves_are_single_flight() {
        let backend = Arc::new(InMemoryBackend::new());
        backend.set_latency(Some(Duration::from_millis(30)));
        let store = store_with(backend.clone());
        store.initialize(rubric_content(), UploadType::Rubric, None);

        let first = tokio::spawn({
            let store = store.clone();
            async move { store.save().await }
        });
        tokio::time::sleep(Duration::from_millis(5)).await;
        store.update(&ContentPatch::exam_name("edited during flight")).unwrap();
        let second = store.save().await.unwrap();
        let first = first.await.unwrap().unwrap();

        // 第二次保存等待第一次完成，沿用第一次拿到的 ID 做 update
        assert_eq!(first, second);
        assert_eq!(backend.create_calls(), 1);
        assert_eq!(backend.update_calls(), 1);
        assert_eq!(backend.stored(&first).unwrap().content.exam_name, "edited during flight");
        assert!(!store.is_dirty());
    }

    #[tokio::test]
    async fn test_save_finishing_after_reset_is_superseded() {
        let backend = Arc::new(InMemoryBackend::new());
        backend.set_latency(Some(Duration::from_millis(30)));
        let store = store_with(backend.clone());
        store.initialize(rubric_content(), UploadType::Rubric, None);

        let flight = tokio::spawn({
            let store = store.clone();
            async move { store.save().await }
        });
        tokio::time::sleep(Duration::from_millis(5)).await;
        store.reset();

        match flight.await.unwrap() {
            Err(AppError::Superseded { document_id }) => {
                assert!(backend.stored(&document_id).is_some());
            }
            other => panic!("unexpected result: {:?}", other),
        }
        assert!(store.current().is_none());
        assert!(store.document_id().is_none());
    }

    #[tokio::test]
    async fn test_queued_save_of_same_revision_is_skipped() {
        let backend = Arc::new(InMemoryBackend::new());
        backend.set_latency(Some(Duration::from_millis(20)));
        let store = store_with(backend.clone());
        store.initialize(rubric_content(), UploadType::Rubric, None);

        let (a, b) = tokio::join!(store.save(), store.save());
        assert_eq!(a.unwrap(), b.unwrap());
        assert_eq!(backend.create_calls(), 1);
        assert_eq!(backend.update_calls(), 0);
    }

    #[tokio::test]
    async fn test_load_uses_embedded_backup_as_original() {
        let backend = Arc::new(InMemoryBackend::new());
        let store = store_with(backend.clone());
        store.initialize(rubric_content(), UploadType::Rubric, None);
        store.update(&ContentPatch::exam_name("Edited")).unwrap();
        let id = store.save().await.unwrap();

        let fresh = store_with(backend.clone());
        let view = fresh.load(&id).await.unwrap();
        assert_eq!(view.content.exam_name, "Edited");
        assert_eq!(fresh.original().unwrap().content().exam_name, "Midterm");
        assert!(!fresh.is_dirty());
    }

    #[tokio::test]
    async fn test_load_without_backup_falls_back_to_loaded_document() {
        let backend = Arc::new(InMemoryBackend::new());
        let store = store_with(backend.clone());
        store.initialize(rubric_content(), UploadType::Rubric, None);
        let mut legacy = store.current().unwrap();
        legacy.meta.original_content = None;
        legacy.content.exam_name = "Legacy".to_string();
        backend.insert("legacy-1", legacy);

        store.load("legacy-1").await.unwrap();
        assert_eq!(store.original().unwrap().content().exam_name, "Legacy");
        assert_eq!(store.document_id().as_deref(), Some("legacy-1"));
    }

    #[tokio::test]
    async fn test_failed_load_leaves_store_untouched() {
        let backend = Arc::new(InMemoryBackend::new());
        let store = store_with(backend.clone());
        store.initialize(rubric_content(), UploadType::Rubric, None);
        store.update(&ContentPatch::exam_name("Unsaved")).unwrap();

        let err = store.load("missing").await.unwrap_err();
        assert!(matches!(err, AppError::NotFound { .. }));

        backend.fail_next(1);
        assert_err!(store.load("missing").await);

        assert_eq!(store.current().unwrap().content.exam_name, "Unsaved");
        assert!(store.is_dirty());
    }

    #[test]
    fn test_export_is_pure() {
        let store = store_with(Arc::new(InMemoryBackend::new()));
        store.initialize(rubric_content(), UploadType::Student, None);
        let mut answers = BTreeMap::new();
        answers.insert("Q1".to_string(), "a".to_string());
        store.update(&ContentPatch::answers(answers)).unwrap();

        let artifact = store.export("Alex / midterm?").unwrap();
        assert_eq!(artifact.file_name, "Alex _ midterm_.json");
        assert_eq!(artifact.content_type, "application/json");
        let parsed: Document = serde_json::from_slice(&artifact.bytes).unwrap();
        assert_eq!(parsed.content.answers["Q1"], "a");
        assert!(store.is_dirty());

        assert_eq!(store.export("").unwrap().file_name, "Midterm.json");
    }
}
