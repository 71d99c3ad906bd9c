//! 编排层（Orchestration Layer）
//!
//! ## 职责
//!
//! 本层把界面意图翻译为对各能力组件的调用，是整个系统的"指挥中心"。
//!
//! ## 模块划分
//!
//! ### `workflow_orchestrator` - 工作流编排器
//! - 持有当前向导步骤，按完成条件决定能否前进
//! - 订阅总线上的全部意图，每个意图委托给一个组件
//! - 把处理结果作为派生通知发回总线
//! - 保存 / 加载 / 切片等网络操作在 tokio 任务中执行
//!
//! ### `card_edit` - 卡片编辑
//! - 把字段编辑意图转换为内容补丁
//!
//! ### `outcome` - 处理结果
//! - `IntentOutcome` 与可等待的 `PendingOutcome`
//!
//! ### `app` - 会话运行器
//! - 装配组件、读取意图脚本、导出落盘、输出会话统计
//!
//! ## 层次关系
//!
//! ```text
//! app (读取脚本，管理会话)
//!     ↓
//! workflow_orchestrator (处理单个意图)
//!     ↓
//! workflow (步骤与会话选择)
//!     ↓
//! services (能力层：document_store / history / page_range)
//!     ↓
//! infrastructure + clients (事件总线、后端、切片服务)
//! ```

pub mod app;
pub mod card_edit;
pub mod outcome;
pub mod workflow_orchestrator;

// 重新导出主要类型
pub use app::{App, SessionStats};
pub use card_edit::{card_edit_patch, CardEditError};
pub use outcome::{IntentOutcome, PendingOutcome};
pub use workflow_orchestrator::{WorkflowOrchestrator, WorkflowStatus};
