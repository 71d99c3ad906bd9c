//! 撤销 / 重做 - 业务能力层
//!
//! 基于快照的有界历史。引擎只持有 `past` / `future` 两个栈，
//! 规范文档始终通过 `DocumentStore` 读写。
//!
//! 两个栈容量相同，满了以后丢弃最旧的记录。
//! 新的编辑（`save_state`）一定清空 `future`。

use std::collections::VecDeque;

use tracing::debug;

use crate::config::Config;
use crate::error::{AppError, StateError};
use crate::models::document::{DocumentView, Snapshot};
use crate::services::document_store::DocumentStore;

/// 历史记录：快照及其捕获序号
#[derive(Debug, Clone)]
pub struct HistoryEntry {
    pub snapshot: Snapshot,
    pub seq: u64,
}

/// 撤销 / 重做可用性
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct HistoryAvailability {
    pub can_undo: bool,
    pub can_redo: bool,
}

pub struct UndoRedoEngine {
    past: VecDeque<HistoryEntry>,
    future: VecDeque<HistoryEntry>,
    max_depth: usize,
    next_seq: u64,
}

impl UndoRedoEngine {
    pub fn new(max_depth: usize) -> Self {
        Self {
            past: VecDeque::new(),
            future: VecDeque::new(),
            max_depth: max_depth.max(1),
            next_seq: 1,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.history_depth)
    }

    /// 记录当前文档，准备一次新的编辑；会清空重做栈
    pub fn save_state(&mut self, store: &DocumentStore) -> Result<(), StateError> {
        let snapshot = store.snapshot().ok_or(StateError::NoDocument)?;
        let entry = self.entry(snapshot);
        push_bounded(&mut self.past, entry, self.max_depth);
        self.future.clear();
        debug!("[历史] 记录状态，past={}", self.past.len());
        Ok(())
    }

    /// 撤销：当前文档进入重做栈，恢复 `past` 栈顶
    pub fn undo(&mut self, store: &DocumentStore) -> Result<DocumentView, StateError> {
        if self.past.is_empty() {
            return Err(StateError::NothingToUndo);
        }
        let current = store.snapshot().ok_or(StateError::NoDocument)?;
        let Some(previous) = self.past.pop_back() else {
            return Err(StateError::NothingToUndo);
        };

        let entry = self.entry(current);
        push_bounded(&mut self.future, entry, self.max_depth);
        debug!("[历史] 撤销到 #{}", previous.seq);
        install(store, &previous.snapshot)
    }

    /// 重做：与撤销对称
    pub fn redo(&mut self, store: &DocumentStore) -> Result<DocumentView, StateError> {
        if self.future.is_empty() {
            return Err(StateError::NothingToRedo);
        }
        let current = store.snapshot().ok_or(StateError::NoDocument)?;
        let Some(next) = self.future.pop_back() else {
            return Err(StateError::NothingToRedo);
        };

        let entry = self.entry(current);
        push_bounded(&mut self.past, entry, self.max_depth);
        debug!("[历史] 重做到 #{}", next.seq);
        install(store, &next.snapshot)
    }

    /// 恢复为原始内容；恢复本身可以被撤销
    pub fn revert_to_original(&mut self, store: &DocumentStore) -> Result<DocumentView, StateError> {
        let current = store.snapshot().ok_or(StateError::NoDocument)?;
        let entry = self.entry(current);
        push_bounded(&mut self.past, entry, self.max_depth);
        self.future.clear();

        store.restore().map_err(state_error)
    }

    pub fn clear(&mut self) {
        self.past.clear();
        self.future.clear();
    }

    pub fn availability(&self) -> HistoryAvailability {
        HistoryAvailability {
            can_undo: !self.past.is_empty(),
            can_redo: !self.future.is_empty(),
        }
    }

    pub fn can_undo(&self) -> bool {
        !self.past.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.future.is_empty()
    }

    pub fn past_len(&self) -> usize {
        self.past.len()
    }

    pub fn future_len(&self) -> usize {
        self.future.len()
    }

    fn entry(&mut self, snapshot: Snapshot) -> HistoryEntry {
        let seq = self.next_seq;
        self.next_seq += 1;
        HistoryEntry { snapshot, seq }
    }
}

impl Default for UndoRedoEngine {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

fn push_bounded(stack: &mut VecDeque<HistoryEntry>, entry: HistoryEntry, max_depth: usize) {
    while stack.len() >= max_depth {
        stack.pop_front();
    }
    stack.push_back(entry);
}

fn install(store: &DocumentStore, snapshot: &Snapshot) -> Result<DocumentView, StateError> {
    store.install(snapshot).map_err(state_error)
}

fn state_error(error: AppError) -> StateError {
    match error {
        AppError::State(e) => e,
        _ => StateError::NoDocument,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clients::InMemoryBackend;
    use crate::models::document::{ContentPatch, DocumentContent, ExtractedContent, UploadType};
    use std::collections::BTreeMap;
    use std::sync::Arc;

    fn answers(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn student_store() -> DocumentStore {
        let store = DocumentStore::new(Arc::new(InMemoryBackend::new()));
        let content = DocumentContent {
            student_name: "Alex".to_string(),
            answers: answers(&[("Q1", "a")]),
            ..Default::default()
        };
        store.initialize(ExtractedContent::from(content), UploadType::Student, Some("alex.pdf"));
        store
    }

    fn edit(engine: &mut UndoRedoEngine, store: &DocumentStore, answer: &str) {
        engine.save_state(store).unwrap();
        store
            .update(&ContentPatch::answers(answers(&[("Q1", answer)])))
            .unwrap();
    }

    fn answer(store: &DocumentStore) -> String {
        store.current().unwrap().content.answers["Q1"].clone()
    }

    #[test]
    fn test_undo_then_redo_reapplies_edit() {
        let store = student_store();
        let mut engine = UndoRedoEngine::default();

        edit(&mut engine, &store, "b");
        engine.undo(&store).unwrap();
        assert_eq!(answer(&store), "a");
        assert!(engine.can_redo());

        engine.redo(&store).unwrap();
        assert_eq!(answer(&store), "b");
        assert!(!engine.can_redo());
        assert!(engine.can_undo());
    }

    #[test]
    fn test_new_edit_after_undo_clears_redo() {
        let store = student_store();
        let mut engine = UndoRedoEngine::default();

        edit(&mut engine, &store, "b");
        engine.undo(&store).unwrap();
        edit(&mut engine, &store, "c");

        assert_eq!(engine.redo(&store).unwrap_err(), StateError::NothingToRedo);
        assert_eq!(answer(&store), "c");
    }

    #[test]
    fn test_empty_stacks_are_noops() {
        let store = student_store();
        let mut engine = UndoRedoEngine::default();
        let before = store.current().unwrap();

        assert_eq!(engine.undo(&store).unwrap_err(), StateError::NothingToUndo);
        assert_eq!(engine.redo(&store).unwrap_err(), StateError::NothingToRedo);
        assert_eq!(store.current().unwrap(), before);
    }

    #[test]
    fn test_undo_of_revert_restores_pre_revert_state() {
        let store = student_store();
        let mut engine = UndoRedoEngine::default();

        edit(&mut engine, &store, "b");
        edit(&mut engine, &store, "c");
        engine.revert_to_original(&store).unwrap();
        assert_eq!(answer(&store), "a");
        assert!(!engine.can_redo());

        engine.undo(&store).unwrap();
        assert_eq!(answer(&store), "c");
    }

    #[test]
    fn test_revert_clears_redo_branch() {
        let store = student_store();
        let mut engine = UndoRedoEngine::default();

        edit(&mut engine, &store, "b");
        engine.undo(&store).unwrap();
        engine.revert_to_original(&store).unwrap();
        assert_eq!(engine.future_len(), 0);
    }

    #[test]
    fn test_capacity_evicts_oldest() {
        let store = student_store();
        let mut engine = UndoRedoEngine::new(3);

        for answer in ["b", "c", "d", "e", "f"] {
            edit(&mut engine, &store, answer);
        }
        assert_eq!(engine.past_len(), 3);

        while engine.undo(&store).is_ok() {}
        // 最早能回到的是倒数第三次编辑之前的状态
        assert_eq!(answer(&store), "c");
        assert_eq!(engine.future_len(), 3);
    }

    #[test]
    fn test_edit_count_keeps_growing_through_history() {
        let store = student_store();
        let mut engine = UndoRedoEngine::default();

        edit(&mut engine, &store, "b");
        let after_edit = store.current().unwrap().meta.edit_count;
        engine.undo(&store).unwrap();
        let after_undo = store.current().unwrap().meta.edit_count;

        assert!(after_undo > after_edit);
        assert!(store.is_dirty());
    }

    #[test]
    fn test_popped_snapshot_does_not_alias_stack() {
        let store = student_store();
        let mut engine = UndoRedoEngine::default();

        edit(&mut engine, &store, "b");
        edit(&mut engine, &store, "c");
        engine.undo(&store).unwrap();

        // 修改刚恢复出来的文档，不影响栈中剩余的快照
        store
            .update(&ContentPatch::answers(answers(&[("Q1", "zzz")])))
            .unwrap();
        engine.undo(&store).unwrap();
        assert_eq!(answer(&store), "a");
    }

    #[test]
    fn test_save_state_without_document() {
        let store = DocumentStore::new(Arc::new(InMemoryBackend::new()));
        let mut engine = UndoRedoEngine::default();
        assert_eq!(engine.save_state(&store).unwrap_err(), StateError::NoDocument);
    }
}
