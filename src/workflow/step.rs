//! 向导步骤
//!
//! 前进需要满足当前步骤的完成条件；后退总是允许（初始步骤除外）。

use crate::workflow::session::SessionSelection;

/// 向导步骤
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum WorkflowStep {
    #[default]
    ModeSelection,
    Upload,
    Processing,
    Review,
    Edit,
    Complete,
}

impl WorkflowStep {
    pub const ALL: [WorkflowStep; 6] = [
        WorkflowStep::ModeSelection,
        WorkflowStep::Upload,
        WorkflowStep::Processing,
        WorkflowStep::Review,
        WorkflowStep::Edit,
        WorkflowStep::Complete,
    ];

    pub fn next(self) -> Option<Self> {
        match self {
            WorkflowStep::ModeSelection => Some(WorkflowStep::Upload),
            WorkflowStep::Upload => Some(WorkflowStep::Processing),
            WorkflowStep::Processing => Some(WorkflowStep::Review),
            WorkflowStep::Review => Some(WorkflowStep::Edit),
            WorkflowStep::Edit => Some(WorkflowStep::Complete),
            WorkflowStep::Complete => None,
        }
    }

    pub fn previous(self) -> Option<Self> {
        match self {
            WorkflowStep::ModeSelection => None,
            WorkflowStep::Upload => Some(WorkflowStep::ModeSelection),
            WorkflowStep::Processing => Some(WorkflowStep::Upload),
            WorkflowStep::Review => Some(WorkflowStep::Processing),
            WorkflowStep::Edit => Some(WorkflowStep::Review),
            WorkflowStep::Complete => Some(WorkflowStep::Edit),
        }
    }

    /// 当前步骤的完成条件；满足时返回 `None`，否则返回阻止前进的原因
    pub fn completion_block(self, ctx: &StepContext<'_>) -> Option<NavigationBlock> {
        match self {
            WorkflowStep::ModeSelection => {
                if ctx.selection.upload_type.is_none() {
                    return Some(NavigationBlock::UploadTypeMissing);
                }
                None
            }
            WorkflowStep::Upload => {
                if ctx.selection.upload_type.is_none() {
                    return Some(NavigationBlock::UploadTypeMissing);
                }
                if ctx.selection.source.is_none() {
                    return Some(NavigationBlock::SourceFileMissing);
                }
                None
            }
            WorkflowStep::Processing => {
                if !ctx.has_document {
                    return Some(NavigationBlock::ProcessingIncomplete);
                }
                None
            }
            WorkflowStep::Review | WorkflowStep::Edit => {
                if !ctx.has_document {
                    return Some(NavigationBlock::DocumentMissing);
                }
                None
            }
            WorkflowStep::Complete => Some(NavigationBlock::AtFinalStep),
        }
    }
}

impl std::fmt::Display for WorkflowStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            WorkflowStep::ModeSelection => "选择模式",
            WorkflowStep::Upload => "上传",
            WorkflowStep::Processing => "处理中",
            WorkflowStep::Review => "校对",
            WorkflowStep::Edit => "编辑",
            WorkflowStep::Complete => "完成",
        };
        write!(f, "{}", name)
    }
}

/// 判断完成条件所需的上下文
pub struct StepContext<'a> {
    pub selection: &'a SessionSelection,
    pub has_document: bool,
}

/// 导航被拒绝的原因
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavigationBlock {
    UploadTypeMissing,
    SourceFileMissing,
    ProcessingIncomplete,
    DocumentMissing,
    AtInitialStep,
    AtFinalStep,
    /// 意图只在特定步骤有效
    WrongStep,
}

impl NavigationBlock {
    pub fn code(&self) -> &'static str {
        match self {
            NavigationBlock::UploadTypeMissing => "upload_type_missing",
            NavigationBlock::SourceFileMissing => "source_file_missing",
            NavigationBlock::ProcessingIncomplete => "processing_incomplete",
            NavigationBlock::DocumentMissing => "document_missing",
            NavigationBlock::AtInitialStep => "at_initial_step",
            NavigationBlock::AtFinalStep => "at_final_step",
            NavigationBlock::WrongStep => "wrong_step",
        }
    }
}

impl std::fmt::Display for NavigationBlock {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.code())
    }
}
