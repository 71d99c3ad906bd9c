//! 工作流编排器 - 编排层
//!
//! 向导步骤的有限状态机。订阅总线上的全部意图，每个意图只做一件事：
//! 交给 `DocumentStore`、交给 `UndoRedoEngine`、交给 `PageRangeParser`，
//! 或者推进自己的 `WorkflowStep`。处理完成后把派生通知发回总线。
//!
//! ## 锁与重入
//!
//! 处理意图时持有内部状态锁；`DocumentStore` 的变更通知会在锁内同步分发。
//! 如果通知处理器在同一线程里又提交了意图，该意图进入队列，
//! 等当前意图处理完、锁释放后再执行（结果为 `IntentOutcome::Deferred`）。
//! 编排器自己的派生通知总是在锁释放之后才分发。
//!
//! 对外可读的状态（`status()`）是每次处理结束时发布的副本，
//! 通知处理器读取它不会阻塞。

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::thread::{self, ThreadId};

use tokio::runtime::Handle;
use tracing::{debug, info, warn};

use crate::clients::PdfSlicer;
use crate::config::Config;
use crate::error::{AppError, StateError};
use crate::infrastructure::event_bus::{EventBus, SubscriptionId};
use crate::models::document::{DocumentView, ExtractedContent, UploadType};
use crate::models::event::{Event, EventKind, Intent, Notice, NoticeLevel};
use crate::orchestrator::card_edit::card_edit_patch;
use crate::orchestrator::outcome::{IntentOutcome, PendingOutcome};
use crate::services::document_store::DocumentStore;
use crate::services::history::{HistoryAvailability, UndoRedoEngine};
use crate::services::page_range::PageRangeParser;
use crate::workflow::session::SessionSelection;
use crate::workflow::step::{NavigationBlock, StepContext, WorkflowStep};

/// 对外发布的编排器状态
#[derive(Debug, Clone, PartialEq, Default)]
pub struct WorkflowStatus {
    pub step: WorkflowStep,
    pub can_undo: bool,
    pub can_redo: bool,
    pub upload_type: Option<UploadType>,
    pub source_name: Option<String>,
    pub page_spec: String,
    pub pages: Vec<u32>,
    pub total_pages: Option<u32>,
}

impl WorkflowStatus {
    fn capture(state: &OrchestratorState) -> Self {
        let availability = state.history.availability();
        Self {
            step: state.step,
            can_undo: availability.can_undo,
            can_redo: availability.can_redo,
            upload_type: state.selection.upload_type,
            source_name: state.selection.source_name().map(str::to_string),
            page_spec: state.selection.page_spec.clone(),
            pages: state.selection.pages.clone(),
            total_pages: state.selection.total_pages,
        }
    }
}

struct OrchestratorState {
    step: WorkflowStep,
    selection: SessionSelection,
    history: UndoRedoEngine,
}

pub struct WorkflowOrchestrator {
    bus: Arc<EventBus>,
    store: Arc<DocumentStore>,
    slicer: Option<Arc<dyn PdfSlicer>>,
    reset_selection_on_invalid_range: bool,
    state: Mutex<OrchestratorState>,
    status: Mutex<WorkflowStatus>,
    /// 正在持有状态锁处理意图的线程
    busy_on: Mutex<Option<ThreadId>>,
    queued: Mutex<VecDeque<Intent>>,
    subscriptions: Mutex<Vec<(EventKind, SubscriptionId)>>,
}

impl WorkflowOrchestrator {
    /// 创建编排器；需要调用 `attach` 才会响应总线上的意图
    ///
    /// `store` 应当已经通过 `with_bus` 接到同一条总线上。
    pub fn new(
        config: &Config,
        bus: Arc<EventBus>,
        store: Arc<DocumentStore>,
        slicer: Option<Arc<dyn PdfSlicer>>,
    ) -> Arc<Self> {
        Arc::new(Self {
            bus,
            store,
            slicer,
            reset_selection_on_invalid_range: config.reset_selection_on_invalid_range,
            state: Mutex::new(OrchestratorState {
                step: WorkflowStep::default(),
                selection: SessionSelection::default(),
                history: UndoRedoEngine::from_config(config),
            }),
            status: Mutex::new(WorkflowStatus::default()),
            busy_on: Mutex::new(None),
            queued: Mutex::new(VecDeque::new()),
            subscriptions: Mutex::new(Vec::new()),
        })
    }

    /// 订阅总线上的全部意图；重复调用无效果
    pub fn attach(self: &Arc<Self>) {
        let mut subscriptions = lock(&self.subscriptions);
        if !subscriptions.is_empty() {
            return;
        }

        for kind in EventKind::INTENTS {
            let weak: Weak<Self> = Arc::downgrade(self);
            let id = self.bus.subscribe(kind, move |event| {
                let Some(orchestrator) = weak.upgrade() else {
                    return Ok(());
                };
                if let Event::Intent(intent) = event {
                    let mut pending = orchestrator.submit(intent.clone());
                    if let Some(IntentOutcome::Failed(e)) = pending.try_take() {
                        return Err(e.into());
                    }
                }
                Ok(())
            });
            subscriptions.push((kind, id));
        }
        debug!("[编排器] 已订阅 {} 种意图", subscriptions.len());
    }

    /// 取消全部订阅
    pub fn detach(&self) {
        for (kind, id) in lock(&self.subscriptions).drain(..) {
            self.bus.unsubscribe(kind, id);
        }
    }

    pub fn store(&self) -> &Arc<DocumentStore> {
        &self.store
    }

    pub fn bus(&self) -> &Arc<EventBus> {
        &self.bus
    }

    pub fn status(&self) -> WorkflowStatus {
        lock(&self.status).clone()
    }

    pub fn step(&self) -> WorkflowStep {
        lock(&self.status).step
    }

    pub fn history_availability(&self) -> HistoryAvailability {
        let status = lock(&self.status);
        HistoryAvailability {
            can_undo: status.can_undo,
            can_redo: status.can_redo,
        }
    }

    /// 提交一个意图
    ///
    /// 同步意图在返回前处理完毕；保存、加载、读取页数和切片在 tokio 任务中执行。
    /// 没有运行时的情况下异步意图无法执行，会得到 `Unsupported`。
    pub fn submit(self: &Arc<Self>, intent: Intent) -> PendingOutcome {
        let operation = operation_name(&intent);
        if !intent.is_async() {
            return PendingOutcome::ready(operation, self.handle(intent));
        }

        match Handle::try_current() {
            Ok(runtime) => {
                let (tx, pending) = PendingOutcome::channel(operation);
                let orchestrator = Arc::clone(self);
                runtime.spawn(async move {
                    let outcome = orchestrator.run_async(intent).await;
                    let _ = tx.send(outcome);
                });
                pending
            }
            Err(_) => {
                warn!("[编排器] 没有可用的异步运行时，无法执行 {}", operation);
                self.emit_all(vec![Notice::error(format!("{} 需要异步运行时", operation))]);
                PendingOutcome::ready(operation, IntentOutcome::Unsupported("没有可用的异步运行时"))
            }
        }
    }

    /// 提交并等待结果
    pub async fn dispatch(self: &Arc<Self>, intent: Intent) -> IntentOutcome {
        self.submit(intent).await
    }

    // ========== 同步意图 ==========

    fn handle(&self, intent: Intent) -> IntentOutcome {
        if *lock(&self.busy_on) == Some(thread::current().id()) {
            debug!("[编排器] 处理中收到 {}，排队", intent.kind());
            lock(&self.queued).push_back(intent);
            return IntentOutcome::Deferred;
        }

        let outcome = self.handle_now(intent);
        loop {
            let next = lock(&self.queued).pop_front();
            let Some(intent) = next else {
                break;
            };
            let queued_outcome = self.handle_now(intent);
            debug!("[编排器] 排队意图处理完成: {:?}", queued_outcome);
        }
        outcome
    }

    fn handle_now(&self, intent: Intent) -> IntentOutcome {
        debug!("[编排器] 处理意图 {}", intent.kind());
        let mut notices = Vec::new();
        let outcome = {
            let mut state = lock(&self.state);
            let _busy = BusyGuard::enter(&self.busy_on);
            let before = state.history.availability();
            let outcome = self.apply(&mut state, intent, &mut notices);
            self.publish(&state, before, &mut notices);
            outcome
        };
        self.emit_all(notices);
        outcome
    }

    fn apply(&self, state: &mut OrchestratorState, intent: Intent, notices: &mut Vec<Notice>) -> IntentOutcome {
        match intent {
            Intent::SelectUploadType { upload_type } => {
                state.selection.upload_type = Some(upload_type);
                IntentOutcome::Applied
            }
            Intent::SelectExtractionMethod { method } => {
                state.selection.extraction_method = non_empty(method);
                IntentOutcome::Applied
            }
            Intent::SetCustomInstructions { instructions } => {
                state.selection.custom_instructions = non_empty(instructions);
                IntentOutcome::Applied
            }
            Intent::ChooseFile { file } => {
                info!("[编排器] 选择文件: {} ({} 字节)", file.name, file.bytes.len());
                state.selection.set_source(Some(file));
                IntentOutcome::Applied
            }
            Intent::ClearFile => {
                state.selection.set_source(None);
                IntentOutcome::Applied
            }
            Intent::SetPageRange { spec } => {
                self.apply_page_range(state, spec, self.reset_selection_on_invalid_range, notices)
            }

            Intent::RequestProcessing => {
                if state.step != WorkflowStep::Upload {
                    return self.reject(state.step, NavigationBlock::WrongStep, notices);
                }
                self.navigate_forward(state, notices)
            }
            Intent::ProcessingCompleted { extracted } => self.complete_processing(state, extracted, notices),
            Intent::ProcessingFailed { reason } => {
                if state.step != WorkflowStep::Processing {
                    return self.reject(state.step, NavigationBlock::WrongStep, notices);
                }
                warn!("[编排器] 处理失败: {}", reason);
                notices.push(Notice::error(format!("处理失败: {}", reason)));
                self.set_step(state, WorkflowStep::Upload, notices);
                IntentOutcome::Navigated {
                    from: WorkflowStep::Processing,
                    to: WorkflowStep::Upload,
                }
            }

            Intent::Undo => self.apply_history(state, UndoRedoEngine::undo, notices),
            Intent::Redo => self.apply_history(state, UndoRedoEngine::redo, notices),
            Intent::RevertToOriginal => self.apply_history(state, UndoRedoEngine::revert_to_original, notices),

            Intent::NavigateNext => self.navigate_forward(state, notices),
            Intent::NavigateBack => self.navigate_back(state, notices),

            Intent::Export { name } => match self.store.export(name.as_deref().unwrap_or("")) {
                Ok(artifact) => {
                    info!("[编排器] 导出 {}", artifact.file_name);
                    notices.push(Notice::ExportReady {
                        artifact: artifact.clone(),
                    });
                    IntentOutcome::Exported(artifact)
                }
                Err(e) => {
                    warn!("[编排器] 导出失败: {}", e);
                    notices.push(Notice::error(format!("导出失败: {}", e)));
                    IntentOutcome::Failed(e)
                }
            },

            Intent::Reset => self.reset(state, notices),

            Intent::Save | Intent::Load { .. } | Intent::InspectPages | Intent::SliceSource => {
                IntentOutcome::Unsupported("异步意图需要通过 submit 提交")
            }

            edit => self.apply_card_edit(state, edit, notices),
        }
    }

    fn apply_page_range(
        &self,
        state: &mut OrchestratorState,
        spec: String,
        reset_on_error: bool,
        notices: &mut Vec<Notice>,
    ) -> IntentOutcome {
        let selection = &mut state.selection;
        match PageRangeParser::parse(&spec, selection.total_pages) {
            Ok(pages) => {
                debug!("[编排器] 页码范围 '{}' → {} 页", spec, pages.len());
                selection.page_spec = spec.clone();
                selection.pages = pages.clone();
                selection.range_error = None;
                notices.push(Notice::ValidationResult {
                    spec,
                    pages,
                    error: None,
                });
                IntentOutcome::Applied
            }
            Err(error) => {
                debug!("[编排器] 页码范围无效: {}", error);
                if reset_on_error {
                    selection.page_spec.clear();
                    selection.pages.clear();
                }
                notices.push(Notice::ValidationResult {
                    spec,
                    pages: selection.pages.clone(),
                    error: Some(error.clone()),
                });
                IntentOutcome::InvalidRange(error)
            }
        }
    }

    fn complete_processing(
        &self,
        state: &mut OrchestratorState,
        mut extracted: ExtractedContent,
        notices: &mut Vec<Notice>,
    ) -> IntentOutcome {
        if state.step != WorkflowStep::Processing {
            return self.reject(state.step, NavigationBlock::WrongStep, notices);
        }
        let Some(upload_type) = state.selection.upload_type else {
            return self.reject(state.step, NavigationBlock::UploadTypeMissing, notices);
        };

        if extracted.extraction_method.is_none() {
            extracted.extraction_method = state.selection.extraction_method.clone();
        }
        if extracted.custom_instructions.is_none() {
            extracted.custom_instructions = state.selection.custom_instructions.clone();
        }
        let source_name = state.selection.source_name().map(str::to_string);

        self.store.initialize(extracted, upload_type, source_name.as_deref());
        state.history.clear();
        self.set_step(state, WorkflowStep::Review, notices);
        IntentOutcome::Navigated {
            from: WorkflowStep::Processing,
            to: WorkflowStep::Review,
        }
    }

    fn apply_history<F>(&self, state: &mut OrchestratorState, op: F, notices: &mut Vec<Notice>) -> IntentOutcome
    where
        F: FnOnce(&mut UndoRedoEngine, &DocumentStore) -> Result<DocumentView, StateError>,
    {
        match op(&mut state.history, &self.store) {
            Ok(_) => IntentOutcome::Applied,
            Err(error) => {
                debug!("[编排器] {}", error);
                notices.push(Notice::HistoryUnavailable { error });
                IntentOutcome::HistoryUnavailable(error)
            }
        }
    }

    fn apply_card_edit(&self, state: &mut OrchestratorState, intent: Intent, notices: &mut Vec<Notice>) -> IntentOutcome {
        let Some(current) = self.store.view() else {
            notices.push(Notice::error("当前没有文档，无法编辑"));
            return IntentOutcome::Failed(StateError::NoDocument.into());
        };

        let patch = match card_edit_patch(&current.content, &intent) {
            Ok(Some(patch)) => patch,
            Ok(None) => {
                warn!("[编排器] 未处理的意图 {}", intent.kind());
                return IntentOutcome::Unsupported("未处理的意图");
            }
            Err(e) => {
                notices.push(Notice::Notification {
                    level: NoticeLevel::Warning,
                    message: e.to_string(),
                });
                return IntentOutcome::InvalidEdit(e);
            }
        };

        if let Err(e) = state.history.save_state(&self.store) {
            return IntentOutcome::Failed(e.into());
        }
        match self.store.update(&patch) {
            Ok(_) => IntentOutcome::Applied,
            Err(e) => IntentOutcome::Failed(e),
        }
    }

    fn navigate_forward(&self, state: &mut OrchestratorState, notices: &mut Vec<Notice>) -> IntentOutcome {
        let from = state.step;
        let ctx = StepContext {
            selection: &state.selection,
            has_document: self.store.has_document(),
        };
        if let Some(reason) = from.completion_block(&ctx) {
            return self.reject(from, reason, notices);
        }
        let Some(to) = from.next() else {
            return self.reject(from, NavigationBlock::AtFinalStep, notices);
        };

        self.set_step(state, to, notices);
        if let (WorkflowStep::Processing, Some(upload_type)) = (to, state.selection.upload_type) {
            notices.push(Notice::ProcessingStarted {
                filename: state.selection.source_name().unwrap_or_default().to_string(),
                upload_type,
                pages: state.selection.pages.clone(),
            });
        }
        IntentOutcome::Navigated { from, to }
    }

    fn navigate_back(&self, state: &mut OrchestratorState, notices: &mut Vec<Notice>) -> IntentOutcome {
        let from = state.step;
        match from.previous() {
            Some(to) => {
                self.set_step(state, to, notices);
                IntentOutcome::Navigated { from, to }
            }
            None => self.reject(from, NavigationBlock::AtInitialStep, notices),
        }
    }

    fn reset(&self, state: &mut OrchestratorState, notices: &mut Vec<Notice>) -> IntentOutcome {
        state.selection = SessionSelection::default();
        state.history.clear();
        self.store.reset();
        self.set_step(state, WorkflowStep::ModeSelection, notices);
        notices.push(Notice::SessionReset);
        info!("[编排器] 会话已重置");
        IntentOutcome::Applied
    }

    fn reject(&self, step: WorkflowStep, reason: NavigationBlock, notices: &mut Vec<Notice>) -> IntentOutcome {
        info!("[编排器] 在「{}」被拒绝: {}", step, reason);
        notices.push(Notice::NavigationRejected { step, reason });
        IntentOutcome::NavigationBlocked(reason)
    }

    fn set_step(&self, state: &mut OrchestratorState, to: WorkflowStep, notices: &mut Vec<Notice>) {
        let from = state.step;
        if from == to {
            return;
        }
        state.step = to;
        info!("[编排器] 步骤: {} → {}", from, to);
        notices.push(Notice::StepChanged { from, to });
    }

    // ========== 异步意图 ==========

    async fn run_async(&self, intent: Intent) -> IntentOutcome {
        match intent {
            Intent::Save => self.save().await,
            Intent::Load { document_id } => self.load(&document_id).await,
            Intent::InspectPages => self.inspect_pages().await,
            Intent::SliceSource => self.slice_source().await,
            other => self.handle(other),
        }
    }

    async fn save(&self) -> IntentOutcome {
        if !self.store.has_document() {
            self.emit_all(vec![Notice::error("当前没有可保存的文档")]);
            return IntentOutcome::Failed(StateError::NoDocument.into());
        }

        match self.store.save().await {
            Ok(document_id) => {
                self.emit_all(vec![Notice::Saved {
                    document_id: document_id.clone(),
                }]);
                IntentOutcome::Saved { document_id }
            }
            Err(AppError::Superseded { document_id }) => {
                warn!("[编排器] 保存结果已过期，后端记录 {} 不属于当前文档", document_id);
                self.emit_all(vec![Notice::Notification {
                    level: NoticeLevel::Warning,
                    message: format!("保存完成时文档已被替换，未采用记录 {}", document_id),
                }]);
                IntentOutcome::Failed(AppError::Superseded { document_id })
            }
            Err(e) => {
                warn!("[编排器] 保存失败: {}", e);
                self.emit_all(vec![Notice::error(format!("保存失败: {}", e))]);
                IntentOutcome::Failed(e)
            }
        }
    }

    async fn load(&self, document_id: &str) -> IntentOutcome {
        let view = match self.store.load(document_id).await {
            Ok(view) => view,
            Err(e) => {
                warn!("[编排器] 加载 {} 失败: {}", document_id, e);
                self.emit_all(vec![Notice::error(format!("加载失败: {}", e))]);
                return IntentOutcome::Failed(e);
            }
        };

        let loaded_id = view
            .meta
            .document_id
            .clone()
            .unwrap_or_else(|| document_id.to_string());
        let mut notices = vec![Notice::Loaded {
            document_id: loaded_id.clone(),
        }];
        {
            let mut state = lock(&self.state);
            let before = state.history.availability();
            state.history.clear();
            state.selection.upload_type = Some(view.meta.upload_type);
            self.set_step(&mut state, WorkflowStep::Review, &mut notices);
            self.publish(&state, before, &mut notices);
        }
        self.emit_all(notices);
        IntentOutcome::Loaded {
            document_id: loaded_id,
        }
    }

    async fn inspect_pages(&self) -> IntentOutcome {
        let Some(slicer) = self.slicer.clone() else {
            self.emit_all(vec![Notice::error("未配置切片服务，无法读取页数")]);
            return IntentOutcome::Unsupported("未配置切片服务");
        };
        let source = lock(&self.state).selection.source.clone();
        let Some(source) = source else {
            return self.source_missing();
        };

        let total_pages = match slicer.page_count(&source.bytes).await {
            Ok(total) => total,
            Err(e) => {
                warn!("[编排器] 读取页数失败: {}", e);
                self.emit_all(vec![Notice::error(format!("读取页数失败: {}", e))]);
                return IntentOutcome::Failed(e);
            }
        };

        let mut notices = vec![Notice::PagesInspected { total_pages }];
        {
            let mut state = lock(&self.state);
            let before = state.history.availability();
            if state.selection.source.as_ref() == Some(&source) {
                state.selection.total_pages = Some(total_pages);
                // 页数已知后重新按边界校验已有的选择
                if !state.selection.page_spec.is_empty() {
                    let spec = state.selection.page_spec.clone();
                    // 越界的旧选择不能再交给切片服务
                    if let IntentOutcome::InvalidRange(error) =
                        self.apply_page_range(&mut state, spec, true, &mut notices)
                    {
                        state.selection.range_error = Some(error);
                    }
                }
            } else {
                debug!("[编排器] 源文件已更换，丢弃过期的页数");
            }
            self.publish(&state, before, &mut notices);
        }
        self.emit_all(notices);
        IntentOutcome::PagesInspected { total_pages }
    }

    async fn slice_source(&self) -> IntentOutcome {
        let (source, pages, range_error) = {
            let state = lock(&self.state);
            let selection = &state.selection;
            (selection.source.clone(), selection.pages.clone(), selection.range_error.clone())
        };
        let Some(source) = source else {
            return self.source_missing();
        };
        if let Some(error) = range_error {
            warn!("[编排器] 页码选择已越界，拒绝切片: {}", error);
            self.emit_all(vec![Notice::error(format!("页码选择无效，请重新设置: {}", error))]);
            return IntentOutcome::InvalidRange(error);
        }

        // 没有页码选择时使用整个文件
        if pages.is_empty() {
            self.emit_all(vec![Notice::SourceSliced {
                pages: Vec::new(),
                size: source.bytes.len(),
            }]);
            return IntentOutcome::Sliced {
                pages,
                bytes: source.bytes,
            };
        }

        let Some(slicer) = self.slicer.clone() else {
            self.emit_all(vec![Notice::error("未配置切片服务，无法按页码切片")]);
            return IntentOutcome::Unsupported("未配置切片服务");
        };
        let spec = PageRangeParser::format(&pages);
        match slicer.slice(&source.bytes, &spec).await {
            Ok(bytes) => {
                info!("[编排器] 切片完成: {} → {} 字节", spec, bytes.len());
                self.emit_all(vec![Notice::SourceSliced {
                    pages: pages.clone(),
                    size: bytes.len(),
                }]);
                IntentOutcome::Sliced { pages, bytes }
            }
            Err(e) => {
                warn!("[编排器] 切片失败: {}", e);
                self.emit_all(vec![Notice::error(format!("切片失败: {}", e))]);
                IntentOutcome::Failed(e)
            }
        }
    }

    fn source_missing(&self) -> IntentOutcome {
        let step = self.step();
        self.emit_all(vec![Notice::NavigationRejected {
            step,
            reason: NavigationBlock::SourceFileMissing,
        }]);
        IntentOutcome::NavigationBlocked(NavigationBlock::SourceFileMissing)
    }

    // ========== 通知 ==========

    /// 补上历史可用性通知并发布对外状态；调用方持有状态锁
    fn publish(&self, state: &OrchestratorState, before: HistoryAvailability, notices: &mut Vec<Notice>) {
        let after = state.history.availability();
        if after != before {
            notices.push(Notice::HistoryAvailabilityChanged {
                can_undo: after.can_undo,
                can_redo: after.can_redo,
            });
        }
        *lock(&self.status) = WorkflowStatus::capture(state);
    }

    fn emit_all(&self, notices: Vec<Notice>) {
        for notice in notices {
            self.bus.emit_deferred(notice);
        }
        self.bus.flush_deferred();
    }
}

impl Drop for WorkflowOrchestrator {
    fn drop(&mut self) {
        self.detach();
    }
}

struct BusyGuard<'a> {
    slot: &'a Mutex<Option<ThreadId>>,
}

impl<'a> BusyGuard<'a> {
    fn enter(slot: &'a Mutex<Option<ThreadId>>) -> Self {
        *lock(slot) = Some(thread::current().id());
        Self { slot }
    }
}

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        *lock(self.slot) = None;
    }
}

fn operation_name(intent: &Intent) -> &'static str {
    match intent {
        Intent::Save => "save",
        Intent::Load { .. } => "load",
        Intent::InspectPages => "inspect_pages",
        Intent::SliceSource => "slice_source",
        _ => "intent",
    }
}

fn non_empty(value: String) -> Option<String> {
    if value.trim().is_empty() {
        None
    } else {
        Some(value)
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
