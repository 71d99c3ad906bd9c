//! 会话运行器 - 编排层
//!
//! ## 职责
//!
//! 本模块是二进制程序的入口，负责装配各组件并驱动一次会话。
//!
//! ## 核心功能
//!
//! 1. **应用初始化**：按配置选择 HTTP 后端或内存后端、可选的切片服务
//! 2. **装配**：事件总线 → 文档存储 → 编排器，编排器订阅全部意图
//! 3. **脚本驱动**：逐行读取 JSON 意图脚本（文件或标准输入）并提交
//! 4. **导出落盘**：导出结果写入 `export_dir`
//! 5. **会话统计**：汇总已处理 / 未生效的意图和派生事件数量

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::io::AsyncReadExt;
use tracing::{debug, error, info, warn};

use crate::clients::{DocumentBackend, HttpDocumentBackend, HttpPdfSlicer, InMemoryBackend, PdfSlicer};
use crate::config::Config;
use crate::infrastructure::event_bus::EventBus;
use crate::models::document::ExportArtifact;
use crate::models::event::{Event, EventKind, Intent, Notice, NoticeLevel};
use crate::orchestrator::outcome::IntentOutcome;
use crate::orchestrator::workflow_orchestrator::WorkflowOrchestrator;
use crate::services::document_store::DocumentStore;
use crate::utils::logging::{log_session_start, print_session_stats, truncate_text};

/// 会话统计
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SessionStats {
    pub handled: usize,
    pub rejected: usize,
    pub notices: usize,
}

/// 应用主结构
pub struct App {
    config: Config,
    orchestrator: Arc<WorkflowOrchestrator>,
    notice_count: Arc<AtomicUsize>,
}

impl App {
    /// 初始化应用
    pub async fn initialize(config: Config) -> Result<Self> {
        log_session_start(&config);

        let timeout = Duration::from_secs(config.request_timeout_secs);
        let bus = Arc::new(EventBus::from_config(&config));

        let backend: Arc<dyn DocumentBackend> = match &config.backend_base_url {
            Some(url) => {
                info!("🌐 文档后端: {}", url);
                Arc::new(HttpDocumentBackend::new(url.clone(), timeout)?)
            }
            None => {
                info!("💾 未配置文档后端，使用内存存储");
                Arc::new(InMemoryBackend::new())
            }
        };
        let slicer: Option<Arc<dyn PdfSlicer>> = match &config.slicer_base_url {
            Some(url) => {
                info!("✂️ 切片服务: {}", url);
                Some(Arc::new(HttpPdfSlicer::new(url.clone(), timeout)?))
            }
            None => None,
        };

        let store = Arc::new(DocumentStore::new(backend).with_bus(bus.clone()));
        let orchestrator = WorkflowOrchestrator::new(&config, bus.clone(), store, slicer);
        orchestrator.attach();

        let notice_count = Arc::new(AtomicUsize::new(0));
        for kind in EventKind::NOTICES {
            let counter = notice_count.clone();
            bus.subscribe(kind, move |event| {
                counter.fetch_add(1, Ordering::Relaxed);
                if let Event::Notice(notice) = event {
                    log_notice(notice);
                }
                Ok(())
            });
        }

        Ok(Self {
            config,
            orchestrator,
            notice_count,
        })
    }

    pub fn orchestrator(&self) -> &Arc<WorkflowOrchestrator> {
        &self.orchestrator
    }

    /// 运行应用主逻辑：读取脚本（未指定时读标准输入）并逐条提交
    pub async fn run(&self, script: Option<&Path>) -> Result<SessionStats> {
        let content = match script {
            Some(path) => {
                info!("📄 读取意图脚本: {}", path.display());
                tokio::fs::read_to_string(path)
                    .await
                    .with_context(|| format!("读取意图脚本失败: {}", path.display()))?
            }
            None => {
                info!("📄 从标准输入读取意图脚本");
                let mut buffer = String::new();
                tokio::io::stdin().read_to_string(&mut buffer).await?;
                buffer
            }
        };

        self.run_script(&content).await
    }

    /// 执行 JSON lines 意图脚本；空行和 `#` 开头的行被忽略
    pub async fn run_script(&self, content: &str) -> Result<SessionStats> {
        let mut stats = SessionStats::default();

        for (idx, line) in content.lines().enumerate() {
            let line_no = idx + 1;
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let intent: Intent = match serde_json::from_str(line) {
                Ok(intent) => intent,
                Err(e) => {
                    warn!("[第 {} 行] 无法解析意图: {} ({})", line_no, e, truncate_text(line, 60));
                    stats.rejected += 1;
                    continue;
                }
            };
            let intent = resolve_source(intent).await;

            let outcome = self.orchestrator.dispatch(intent).await;
            if let IntentOutcome::Exported(artifact) = &outcome {
                self.write_export(artifact).await?;
            }

            if outcome.is_accepted() {
                stats.handled += 1;
            } else {
                debug!("[第 {} 行] 未生效: {:?}", line_no, outcome);
                stats.rejected += 1;
            }
        }

        stats.notices = self.notice_count.load(Ordering::Relaxed);
        print_session_stats(stats.handled, stats.rejected, stats.notices);
        Ok(stats)
    }

    /// 导出文件写入 `export_dir`
    async fn write_export(&self, artifact: &ExportArtifact) -> Result<PathBuf> {
        let dir = Path::new(&self.config.export_dir);
        tokio::fs::create_dir_all(dir)
            .await
            .with_context(|| format!("创建导出目录失败: {}", dir.display()))?;

        let path = dir.join(&artifact.file_name);
        tokio::fs::write(&path, &artifact.bytes)
            .await
            .with_context(|| format!("写入导出文件失败: {}", path.display()))?;
        info!("💾 已导出: {} ({} 字节)", path.display(), artifact.bytes.len());
        Ok(path)
    }
}

/// 脚本里的 `choose_file` 可以只给路径，字节从磁盘读取
async fn resolve_source(intent: Intent) -> Intent {
    match intent {
        Intent::ChooseFile { mut file } if file.bytes.is_empty() => {
            match tokio::fs::read(&file.name).await {
                Ok(bytes) => file.bytes = bytes,
                Err(e) => warn!("无法读取源文件 {}: {}", file.name, e),
            }
            Intent::ChooseFile { file }
        }
        other => other,
    }
}

fn log_notice(notice: &Notice) {
    match notice {
        Notice::DocumentChanged { document, dirty } => {
            debug!(
                "[通知] 文档变更 edit_count={} dirty={}",
                document.meta.edit_count, dirty
            );
        }
        Notice::StepChanged { from, to } => info!("[通知] 步骤 {} → {}", from, to),
        Notice::Notification { level, message } => match level {
            NoticeLevel::Warning => warn!("[通知] {}", message),
            NoticeLevel::Error => error!("[通知] {}", message),
        },
        other => debug!("[通知] {}", truncate_text(&format!("{:?}", other), 120)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{SystemTime, UNIX_EPOCH};

    fn temp_export_dir() -> PathBuf {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos())
            .unwrap_or_default();
        std::env::temp_dir().join(format!("scan-review-{}-{}", std::process::id(), nanos))
    }

    const SCRIPT: &str = r#"
# 学生答卷校对
{"type":"select_upload_type","upload_type":"student"}
{"type":"navigate_next"}
{"type":"choose_file","file":{"name":"alex.pdf","bytes":[37,80,68,70]}}
{"type":"request_processing"}
{"type":"processing_completed","extracted":{"student_name":"Alex","answers":{"Q1":"a"}}}
{"type":"set_answer","question_id":"Q1","answer":"b"}
{"type":"undo"}
{"type":"save"}
{"type":"export","name":"alex answers"}
not json
"#;

    #[tokio::test]
    async fn test_script_drives_session_and_writes_export() {
        let export_dir = temp_export_dir();
        let config = Config {
            export_dir: export_dir.display().to_string(),
            ..Config::default()
        };
        let app = App::initialize(config).await.unwrap();

        let stats = app.run_script(SCRIPT).await.unwrap();
        assert_eq!(stats.handled, 9);
        assert_eq!(stats.rejected, 1);
        assert!(stats.notices > 0);

        let store = app.orchestrator().store();
        assert_eq!(store.current().unwrap().content.answers["Q1"], "a");
        assert!(!store.is_dirty());

        let exported = tokio::fs::read_to_string(export_dir.join("alex answers.json"))
            .await
            .unwrap();
        assert!(exported.contains("\"student_name\": \"Alex\""));
        let _ = tokio::fs::remove_dir_all(&export_dir).await;
    }

    #[tokio::test]
    async fn test_rejected_navigation_is_counted() {
        let app = App::initialize(Config::default()).await.unwrap();
        let stats = app
            .run_script("{\"type\":\"navigate_next\"}\n{\"type\":\"undo\"}\n")
            .await
            .unwrap();
        assert_eq!(stats.handled, 0);
        assert_eq!(stats.rejected, 2);
    }
}
