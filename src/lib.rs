//! # Scan Review Workflow
//!
//! 扫描件转录与校对向导的工作流引擎
//!
//! ## 架构设计
//!
//! 本系统采用分层架构，界面与各组件之间只通过事件总线通信：
//!
//! ### ① 基础设施层（Infrastructure）
//! - `infrastructure/` - 进程内事件总线
//! - `EventBus` - 按订阅顺序同步分发，隔离处理器失败，限制重入深度
//! - `clients/` - 文档后端与 PDF 切片服务（HTTP 实现 + 内存实现）
//!
//! ### ② 业务能力层（Services）
//! - `services/` - 描述"我能做什么"
//! - `DocumentStore` - 规范文档的唯一持有者（初始化 / 更新 / 保存 / 加载 / 导出）
//! - `UndoRedoEngine` - 基于快照的有界撤销 / 重做
//! - `PageRangeParser` - 页码范围解析与校验
//!
//! ### ③ 流程层（Workflow）
//! - `workflow/` - 向导步骤与完成条件、会话选择
//!
//! ### ④ 编排层（Orchestration）
//! - `orchestrator/workflow_orchestrator` - 订阅意图、驱动各组件、派生通知
//! - `orchestrator/app` - 装配组件并执行意图脚本
//!
//! ## 模块结构

pub mod clients;
pub mod config;
pub mod error;
pub mod infrastructure;
pub mod logger;

pub mod models;
pub mod orchestrator;
pub mod services;
pub mod utils;
pub mod workflow;

// 重新导出常用类型
pub use config::Config;
pub use error::{AppError, AppResult};
pub use infrastructure::EventBus;
pub use models::{Document, Event, EventKind, Intent, Notice};
pub use orchestrator::{App, IntentOutcome, WorkflowOrchestrator};
pub use services::{DocumentStore, PageRangeParser, UndoRedoEngine};
pub use workflow::WorkflowStep;
