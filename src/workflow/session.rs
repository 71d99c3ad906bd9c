//! 会话选择
//!
//! 封装“用户在进入处理之前选了什么”这一信息：上传类型、源文件、页码选择等。
//! 规范文档不在这里，它只由 `DocumentStore` 持有。

use crate::error::RangeError;
use crate::models::document::{SourceFile, UploadType};

/// 会话选择
#[derive(Debug, Clone, Default)]
pub struct SessionSelection {
    /// 上传类型
    pub upload_type: Option<UploadType>,
    /// 源文件
    pub source: Option<SourceFile>,
    /// 提取方式
    pub extraction_method: Option<String>,
    /// 自定义提取说明
    pub custom_instructions: Option<String>,
    /// 最近一次合法的页码范围描述
    pub page_spec: String,
    /// 最近一次合法的页码选择，空表示全部页
    pub pages: Vec<u32>,
    /// 源文件总页数，切片服务读取之前未知
    pub total_pages: Option<u32>,
    /// 页数已知后原有选择越界；重新设置合法范围之前不能切片
    pub range_error: Option<RangeError>,
}

impl SessionSelection {
    pub fn source_name(&self) -> Option<&str> {
        self.source.as_ref().map(|s| s.name.as_str())
    }

    /// 更换源文件时，页数和页码选择一并作废
    pub fn set_source(&mut self, source: Option<SourceFile>) {
        self.source = source;
        self.total_pages = None;
        self.page_spec.clear();
        self.pages.clear();
        self.range_error = None;
    }
}
