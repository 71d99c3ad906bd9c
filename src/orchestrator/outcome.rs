//! 意图处理结果
//!
//! 编排器对每个意图都给出一个 `IntentOutcome`。同步意图在 `submit` 返回前
//! 就已经有结果；异步意图（保存、加载、读取页数、切片）的结果通过
//! `PendingOutcome` 在任务完成后送达。

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use tokio::sync::oneshot;

use crate::error::{AppError, PersistenceError, RangeError, StateError};
use crate::models::document::ExportArtifact;
use crate::orchestrator::card_edit::CardEditError;
use crate::workflow::step::{NavigationBlock, WorkflowStep};

#[derive(Debug)]
pub enum IntentOutcome {
    /// 意图已生效
    Applied,
    /// 处理中途收到的意图，排队等当前意图结束后再处理
    Deferred,
    Navigated {
        from: WorkflowStep,
        to: WorkflowStep,
    },
    NavigationBlocked(NavigationBlock),
    /// 撤销 / 重做 / 恢复无事可做
    HistoryUnavailable(StateError),
    InvalidRange(RangeError),
    InvalidEdit(CardEditError),
    Saved {
        document_id: String,
    },
    Loaded {
        document_id: String,
    },
    Exported(ExportArtifact),
    PagesInspected {
        total_pages: u32,
    },
    Sliced {
        pages: Vec<u32>,
        bytes: Vec<u8>,
    },
    /// 缺少完成意图所需的协作者（例如未配置切片服务）
    Unsupported(&'static str),
    Failed(AppError),
}

impl IntentOutcome {
    /// 意图是否被接受（包括排队）
    pub fn is_accepted(&self) -> bool {
        matches!(
            self,
            IntentOutcome::Applied
                | IntentOutcome::Deferred
                | IntentOutcome::Navigated { .. }
                | IntentOutcome::Saved { .. }
                | IntentOutcome::Loaded { .. }
                | IntentOutcome::Exported(_)
                | IntentOutcome::PagesInspected { .. }
                | IntentOutcome::Sliced { .. }
        )
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, IntentOutcome::Failed(_))
    }
}

/// 尚未送达的意图结果
///
/// 可以直接 `.await`；任务被取消时得到 `Failed(TaskAborted)`。
pub struct PendingOutcome {
    operation: &'static str,
    rx: oneshot::Receiver<IntentOutcome>,
}

impl PendingOutcome {
    pub(crate) fn channel(operation: &'static str) -> (oneshot::Sender<IntentOutcome>, Self) {
        let (tx, rx) = oneshot::channel();
        (tx, Self { operation, rx })
    }

    pub(crate) fn ready(operation: &'static str, outcome: IntentOutcome) -> Self {
        let (tx, pending) = Self::channel(operation);
        let _ = tx.send(outcome);
        pending
    }

    /// 不等待，结果已送达时取出
    pub fn try_take(&mut self) -> Option<IntentOutcome> {
        match self.rx.try_recv() {
            Ok(outcome) => Some(outcome),
            Err(oneshot::error::TryRecvError::Empty) => None,
            Err(oneshot::error::TryRecvError::Closed) => Some(aborted(self.operation)),
        }
    }
}

impl Future for PendingOutcome {
    type Output = IntentOutcome;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let operation = self.operation;
        match Pin::new(&mut self.rx).poll(cx) {
            Poll::Ready(Ok(outcome)) => Poll::Ready(outcome),
            Poll::Ready(Err(_)) => Poll::Ready(aborted(operation)),
            Poll::Pending => Poll::Pending,
        }
    }
}

fn aborted(operation: &'static str) -> IntentOutcome {
    IntentOutcome::Failed(AppError::Persistence(PersistenceError::TaskAborted {
        operation: operation.to_string(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_ready_outcome_resolves_immediately() {
        let outcome = PendingOutcome::ready("undo", IntentOutcome::Applied).await;
        assert!(outcome.is_accepted());
    }

    #[tokio::test]
    async fn test_dropped_sender_reports_aborted_task() {
        let (tx, pending) = PendingOutcome::channel("save");
        drop(tx);
        match pending.await {
            IntentOutcome::Failed(AppError::Persistence(PersistenceError::TaskAborted { operation })) => {
                assert_eq!(operation, "save");
            }
            other => panic!("unexpected outcome: {:?}", other),
        }
    }

    #[test]
    fn test_try_take_before_and_after_send() {
        let (tx, mut pending) = PendingOutcome::channel("load");
        assert!(pending.try_take().is_none());
        tx.send(IntentOutcome::Loaded {
            document_id: "doc-1".into(),
        })
        .unwrap();
        assert!(matches!(pending.try_take(), Some(IntentOutcome::Loaded { .. })));
    }
}
