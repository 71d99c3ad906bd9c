//! 事件模型
//!
//! 事件总线上流动的只有两类事件：
//! - `Intent`：界面或系统发起的工作流意图
//! - `Notice`：编排器 / 文档存储派生出的状态通知，供界面渲染
//!
//! `EventKind` 是不带数据的判别值，作为订阅的键（即“事件名”）。

use serde::{Deserialize, Serialize};

use crate::error::{RangeError, StateError};
use crate::models::document::{DocumentView, ExportArtifact, ExtractedContent, SourceFile, UploadType};
use crate::workflow::step::{NavigationBlock, WorkflowStep};

/// 工作流意图
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Intent {
    // ---- 选择 ----
    SelectUploadType { upload_type: UploadType },
    SelectExtractionMethod { method: String },
    SetCustomInstructions { instructions: String },
    ChooseFile { file: SourceFile },
    ClearFile,
    SetPageRange { spec: String },
    InspectPages,

    // ---- 处理 ----
    RequestProcessing,
    ProcessingCompleted { extracted: ExtractedContent },
    ProcessingFailed { reason: String },
    SliceSource,

    // ---- 卡片编辑 ----
    SetExamName { value: String },
    SetGeneralInstructions { value: String },
    SetStudentName { value: String },
    AddQuestion {
        #[serde(default)]
        text: String,
        #[serde(default)]
        max_points: f64,
    },
    RemoveQuestion { question_id: String },
    EditQuestionText { question_id: String, text: String },
    SetQuestionMaxPoints { question_id: String, max_points: f64 },
    AddCriterion {
        question_id: String,
        #[serde(default)]
        criterion: String,
        #[serde(default)]
        max_points: f64,
    },
    RemoveCriterion { question_id: String, index: usize },
    EditCriterion { question_id: String, index: usize, criterion: String },
    SetCriterionPoints { question_id: String, index: usize, max_points: f64 },
    SetAnswer { question_id: String, answer: String },

    // ---- 历史 ----
    Undo,
    Redo,
    RevertToOriginal,

    // ---- 导航 ----
    NavigateNext,
    NavigateBack,

    // ---- 持久化 ----
    Save,
    Export {
        #[serde(default)]
        name: Option<String>,
    },
    Load { document_id: String },

    // ---- 会话 ----
    Reset,
}

impl Intent {
    pub fn kind(&self) -> EventKind {
        match self {
            Intent::SelectUploadType { .. } => EventKind::SelectUploadType,
            Intent::SelectExtractionMethod { .. } => EventKind::SelectExtractionMethod,
            Intent::SetCustomInstructions { .. } => EventKind::SetCustomInstructions,
            Intent::ChooseFile { .. } => EventKind::ChooseFile,
            Intent::ClearFile => EventKind::ClearFile,
            Intent::SetPageRange { .. } => EventKind::SetPageRange,
            Intent::InspectPages => EventKind::InspectPages,
            Intent::RequestProcessing => EventKind::RequestProcessing,
            Intent::ProcessingCompleted { .. } => EventKind::ProcessingCompleted,
            Intent::ProcessingFailed { .. } => EventKind::ProcessingFailed,
            Intent::SliceSource => EventKind::SliceSource,
            Intent::SetExamName { .. } => EventKind::SetExamName,
            Intent::SetGeneralInstructions { .. } => EventKind::SetGeneralInstructions,
            Intent::SetStudentName { .. } => EventKind::SetStudentName,
            Intent::AddQuestion { .. } => EventKind::AddQuestion,
            Intent::RemoveQuestion { .. } => EventKind::RemoveQuestion,
            Intent::EditQuestionText { .. } => EventKind::EditQuestionText,
            Intent::SetQuestionMaxPoints { .. } => EventKind::SetQuestionMaxPoints,
            Intent::AddCriterion { .. } => EventKind::AddCriterion,
            Intent::RemoveCriterion { .. } => EventKind::RemoveCriterion,
            Intent::EditCriterion { .. } => EventKind::EditCriterion,
            Intent::SetCriterionPoints { .. } => EventKind::SetCriterionPoints,
            Intent::SetAnswer { .. } => EventKind::SetAnswer,
            Intent::Undo => EventKind::Undo,
            Intent::Redo => EventKind::Redo,
            Intent::RevertToOriginal => EventKind::RevertToOriginal,
            Intent::NavigateNext => EventKind::NavigateNext,
            Intent::NavigateBack => EventKind::NavigateBack,
            Intent::Save => EventKind::Save,
            Intent::Export { .. } => EventKind::Export,
            Intent::Load { .. } => EventKind::Load,
            Intent::Reset => EventKind::Reset,
        }
    }

    /// 需要等待网络的意图，在独立任务中执行
    pub fn is_async(&self) -> bool {
        matches!(
            self,
            Intent::Save | Intent::Load { .. } | Intent::InspectPages | Intent::SliceSource
        )
    }
}

/// 通知级别
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Warning,
    Error,
}

/// 派生通知，供界面渲染
#[derive(Debug, Clone)]
pub enum Notice {
    /// 规范文档发生变化（携带只读视图）
    DocumentChanged { document: DocumentView, dirty: bool },
    StepChanged { from: WorkflowStep, to: WorkflowStep },
    /// 页码范围校验结果；`pages` 为当前生效的选择
    ValidationResult {
        spec: String,
        pages: Vec<u32>,
        error: Option<RangeError>,
    },
    HistoryAvailabilityChanged { can_undo: bool, can_redo: bool },
    ProcessingStarted {
        filename: String,
        upload_type: UploadType,
        pages: Vec<u32>,
    },
    PagesInspected { total_pages: u32 },
    SourceSliced { pages: Vec<u32>, size: usize },
    Saved { document_id: String },
    Loaded { document_id: String },
    ExportReady { artifact: ExportArtifact },
    NavigationRejected { step: WorkflowStep, reason: NavigationBlock },
    HistoryUnavailable { error: StateError },
    /// 面向用户的非致命提示
    Notification { level: NoticeLevel, message: String },
    SessionReset,
}

impl Notice {
    pub fn kind(&self) -> EventKind {
        match self {
            Notice::DocumentChanged { .. } => EventKind::DocumentChanged,
            Notice::StepChanged { .. } => EventKind::StepChanged,
            Notice::ValidationResult { .. } => EventKind::ValidationResult,
            Notice::HistoryAvailabilityChanged { .. } => EventKind::HistoryAvailabilityChanged,
            Notice::ProcessingStarted { .. } => EventKind::ProcessingStarted,
            Notice::PagesInspected { .. } => EventKind::PagesInspected,
            Notice::SourceSliced { .. } => EventKind::SourceSliced,
            Notice::Saved { .. } => EventKind::Saved,
            Notice::Loaded { .. } => EventKind::Loaded,
            Notice::ExportReady { .. } => EventKind::ExportReady,
            Notice::NavigationRejected { .. } => EventKind::NavigationRejected,
            Notice::HistoryUnavailable { .. } => EventKind::HistoryUnavailable,
            Notice::Notification { .. } => EventKind::Notification,
            Notice::SessionReset => EventKind::SessionReset,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Notice::Notification {
            level: NoticeLevel::Error,
            message: message.into(),
        }
    }
}

/// 总线事件
#[derive(Debug, Clone)]
pub enum Event {
    Intent(Intent),
    Notice(Notice),
}

impl Event {
    pub fn kind(&self) -> EventKind {
        match self {
            Event::Intent(intent) => intent.kind(),
            Event::Notice(notice) => notice.kind(),
        }
    }

    /// 事件摘要（用于调试窗口和日志）
    pub fn summary(&self) -> String {
        match self {
            Event::Intent(intent) => format!("{:?}", intent),
            Event::Notice(Notice::DocumentChanged { document, dirty }) => format!(
                "DocumentChanged {{ edit_count: {}, dirty: {} }}",
                document.meta.edit_count, dirty
            ),
            Event::Notice(notice) => format!("{:?}", notice),
        }
    }
}

impl From<Intent> for Event {
    fn from(intent: Intent) -> Self {
        Event::Intent(intent)
    }
}

impl From<Notice> for Event {
    fn from(notice: Notice) -> Self {
        Event::Notice(notice)
    }
}

/// 事件名
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EventKind {
    SelectUploadType,
    SelectExtractionMethod,
    SetCustomInstructions,
    ChooseFile,
    ClearFile,
    SetPageRange,
    InspectPages,
    RequestProcessing,
    ProcessingCompleted,
    ProcessingFailed,
    SliceSource,
    SetExamName,
    SetGeneralInstructions,
    SetStudentName,
    AddQuestion,
    RemoveQuestion,
    EditQuestionText,
    SetQuestionMaxPoints,
    AddCriterion,
    RemoveCriterion,
    EditCriterion,
    SetCriterionPoints,
    SetAnswer,
    Undo,
    Redo,
    RevertToOriginal,
    NavigateNext,
    NavigateBack,
    Save,
    Export,
    Load,
    Reset,

    DocumentChanged,
    StepChanged,
    ValidationResult,
    HistoryAvailabilityChanged,
    ProcessingStarted,
    PagesInspected,
    SourceSliced,
    Saved,
    Loaded,
    ExportReady,
    NavigationRejected,
    HistoryUnavailable,
    Notification,
    SessionReset,
}

impl EventKind {
    /// 编排器订阅的全部意图
    pub const INTENTS: [EventKind; 32] = [
        EventKind::SelectUploadType,
        EventKind::SelectExtractionMethod,
        EventKind::SetCustomInstructions,
        EventKind::ChooseFile,
        EventKind::ClearFile,
        EventKind::SetPageRange,
        EventKind::InspectPages,
        EventKind::RequestProcessing,
        EventKind::ProcessingCompleted,
        EventKind::ProcessingFailed,
        EventKind::SliceSource,
        EventKind::SetExamName,
        EventKind::SetGeneralInstructions,
        EventKind::SetStudentName,
        EventKind::AddQuestion,
        EventKind::RemoveQuestion,
        EventKind::EditQuestionText,
        EventKind::SetQuestionMaxPoints,
        EventKind::AddCriterion,
        EventKind::RemoveCriterion,
        EventKind::EditCriterion,
        EventKind::SetCriterionPoints,
        EventKind::SetAnswer,
        EventKind::Undo,
        EventKind::Redo,
        EventKind::RevertToOriginal,
        EventKind::NavigateNext,
        EventKind::NavigateBack,
        EventKind::Save,
        EventKind::Export,
        EventKind::Load,
        EventKind::Reset,
    ];

    /// 全部派生通知
    pub const NOTICES: [EventKind; 14] = [
        EventKind::DocumentChanged,
        EventKind::StepChanged,
        EventKind::ValidationResult,
        EventKind::HistoryAvailabilityChanged,
        EventKind::ProcessingStarted,
        EventKind::PagesInspected,
        EventKind::SourceSliced,
        EventKind::Saved,
        EventKind::Loaded,
        EventKind::ExportReady,
        EventKind::NavigationRejected,
        EventKind::HistoryUnavailable,
        EventKind::Notification,
        EventKind::SessionReset,
    ];

    pub fn is_intent(&self) -> bool {
        Self::INTENTS.contains(self)
    }
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_intent_kinds_are_intents() {
        let intents = vec![
            Intent::Undo,
            Intent::SetPageRange { spec: "1-3".into() },
            Intent::Load { document_id: "d1".into() },
        ];
        for intent in intents {
            assert!(intent.kind().is_intent());
        }
        assert!(!Notice::SessionReset.kind().is_intent());
    }

    #[test]
    fn test_intent_script_format() {
        let intent: Intent =
            serde_json::from_str(r#"{"type":"set_answer","question_id":"Q1","answer":"b"}"#).unwrap();
        assert_eq!(
            intent,
            Intent::SetAnswer {
                question_id: "Q1".into(),
                answer: "b".into()
            }
        );

        let intent: Intent = serde_json::from_str(r#"{"type":"export"}"#).unwrap();
        assert_eq!(intent, Intent::Export { name: None });
    }

    #[test]
    fn test_only_network_intents_are_async() {
        assert!(Intent::Save.is_async());
        assert!(Intent::InspectPages.is_async());
        assert!(!Intent::Undo.is_async());
        assert!(!Intent::Export { name: None }.is_async());
    }
}
