//! 文档数据模型
//!
//! `Document` 由内容字段（`DocumentContent`）和元数据字段（`DocumentMeta`）组成，
//! 序列化时两者展平成同一个 JSON 对象。

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// 当前持久化格式版本
pub const CURRENT_SCHEMA_VERSION: u32 = 1;

/// 上传类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UploadType {
    /// 评分标准
    Rubric,
    /// 学生答卷
    Student,
}

impl std::fmt::Display for UploadType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UploadType::Rubric => write!(f, "rubric"),
            UploadType::Student => write!(f, "student"),
        }
    }
}

/// 处理状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProcessingStatus {
    Pending,
    Processing,
    #[default]
    Completed,
    Failed,
}

/// 评分细则
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Criterion {
    #[serde(default)]
    pub criterion: String,
    #[serde(default)]
    pub max_points: f64,
}

impl Criterion {
    pub fn new(criterion: impl Into<String>, max_points: f64) -> Self {
        Self {
            criterion: criterion.into(),
            max_points,
        }
    }
}

/// 题目
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Question {
    pub id: String,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub max_points: f64,
    #[serde(default)]
    pub criteria: Vec<Criterion>,
}

impl Question {
    pub fn new(id: impl Into<String>, text: impl Into<String>, max_points: f64) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
            max_points,
            criteria: Vec::new(),
        }
    }

    pub fn with_criterion(mut self, criterion: impl Into<String>, max_points: f64) -> Self {
        self.criteria.push(Criterion::new(criterion, max_points));
        self
    }
}

/// 文档内容字段
///
/// 快照相等性只比较这部分。
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DocumentContent {
    pub exam_name: String,
    pub general_instructions: String,
    pub questions: Vec<Question>,
    /// 题目 ID → 答案
    pub answers: BTreeMap<String, String>,
    pub student_name: String,
}

impl DocumentContent {
    pub fn question(&self, question_id: &str) -> Option<&Question> {
        self.questions.iter().find(|q| q.id == question_id)
    }

    /// 生成下一个未被占用的题目 ID（Q1, Q2, ...）
    pub fn next_question_id(&self) -> String {
        let mut n = self.questions.len() + 1;
        loop {
            let candidate = format!("Q{}", n);
            if self.question(&candidate).is_none() {
                return candidate;
            }
            n += 1;
        }
    }

    /// 所有题目满分之和
    pub fn total_points(&self) -> f64 {
        self.questions.iter().map(|q| q.max_points).sum()
    }
}

/// 文档元数据
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentMeta {
    /// 后端分配的 ID，首次保存前为空
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub document_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
    pub upload_type: UploadType,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub processing_status: ProcessingStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence_score: Option<f64>,
    #[serde(default)]
    pub edit_count: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extraction_method: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_instructions: Option<String>,
    /// 初次提取内容的备份，初始化时写入一次
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_content: Option<DocumentContent>,
    #[serde(default = "legacy_schema_version")]
    pub schema_version: u32,
}

// 没有版本字段的旧记录视为第 1 版
fn legacy_schema_version() -> u32 {
    1
}

/// 规范文档
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    #[serde(flatten)]
    pub content: DocumentContent,
    #[serde(flatten)]
    pub meta: DocumentMeta,
}

impl Document {
    /// 内容字段结构相等（忽略所有元数据）
    pub fn content_eq(&self, other: &Document) -> bool {
        self.content == other.content
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot::capture(self)
    }
}

/// 事件中携带的只读文档视图
pub type DocumentView = Arc<Document>;

/// 文档在某一时刻的不可变深拷贝
#[derive(Debug, Clone)]
pub struct Snapshot {
    document: Document,
}

impl Snapshot {
    pub fn capture(document: &Document) -> Self {
        Self {
            document: document.clone(),
        }
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    pub fn content(&self) -> &DocumentContent {
        &self.document.content
    }
}

impl PartialEq for Snapshot {
    fn eq(&self, other: &Self) -> bool {
        self.document.content_eq(&other.document)
    }
}

/// 提取结果：内容字段加上可选的处理元数据
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ExtractedContent {
    #[serde(flatten)]
    pub content: DocumentContent,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub processing_status: Option<ProcessingStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence_score: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extraction_method: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_instructions: Option<String>,
}

impl From<DocumentContent> for ExtractedContent {
    fn from(content: DocumentContent) -> Self {
        Self {
            content,
            ..Default::default()
        }
    }
}

/// 对内容字段的部分更新
///
/// 每个字段整体替换；`answers` 也是整体替换，调用方需要传入完整的映射。
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ContentPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exam_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub general_instructions: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub questions: Option<Vec<Question>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub answers: Option<BTreeMap<String, String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub student_name: Option<String>,
}

impl ContentPatch {
    pub fn exam_name(value: impl Into<String>) -> Self {
        Self {
            exam_name: Some(value.into()),
            ..Default::default()
        }
    }

    pub fn general_instructions(value: impl Into<String>) -> Self {
        Self {
            general_instructions: Some(value.into()),
            ..Default::default()
        }
    }

    pub fn questions(value: Vec<Question>) -> Self {
        Self {
            questions: Some(value),
            ..Default::default()
        }
    }

    pub fn answers(value: BTreeMap<String, String>) -> Self {
        Self {
            answers: Some(value),
            ..Default::default()
        }
    }

    pub fn student_name(value: impl Into<String>) -> Self {
        Self {
            student_name: Some(value.into()),
            ..Default::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self == &ContentPatch::default()
    }

    pub fn apply_to(&self, content: &mut DocumentContent) {
        if let Some(value) = &self.exam_name {
            content.exam_name = value.clone();
        }
        if let Some(value) = &self.general_instructions {
            content.general_instructions = value.clone();
        }
        if let Some(value) = &self.questions {
            content.questions = value.clone();
        }
        if let Some(value) = &self.answers {
            content.answers = value.clone();
        }
        if let Some(value) = &self.student_name {
            content.student_name = value.clone();
        }
    }
}

/// 用户选择的源文件
#[derive(Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SourceFile {
    pub name: String,
    #[serde(default)]
    pub bytes: Vec<u8>,
}

impl SourceFile {
    pub fn new(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            bytes,
        }
    }
}

impl std::fmt::Debug for SourceFile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SourceFile")
            .field("name", &self.name)
            .field("bytes", &format_args!("<{} bytes>", self.bytes.len()))
            .finish()
    }
}

/// 可下载的导出文件
#[derive(Clone, PartialEq)]
pub struct ExportArtifact {
    pub file_name: String,
    pub content_type: &'static str,
    pub bytes: Vec<u8>,
}

impl std::fmt::Debug for ExportArtifact {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExportArtifact")
            .field("file_name", &self.file_name)
            .field("content_type", &self.content_type)
            .field("bytes", &format_args!("<{} bytes>", self.bytes.len()))
            .finish()
    }
}
