use thiserror::Error;

/// 应用程序错误类型
///
/// 所有错误都是可恢复的：没有任何一种错误会终止会话。
#[derive(Debug, Error)]
pub enum AppError {
    /// 保存 / 加载失败
    #[error("持久化错误: {0}")]
    Persistence(#[from] PersistenceError),
    /// 按 ID 加载时后端不存在该文档
    #[error("文档不存在: {document_id}")]
    NotFound { document_id: String },
    /// 保存完成时文档已被重置或加载替换，后端记录没有被采用
    #[error("保存完成时文档已被替换，未采用后端记录 {document_id}")]
    Superseded { document_id: String },
    /// 撤销 / 重做栈为空，或当前没有文档
    #[error("状态错误: {0}")]
    State(#[from] StateError),
    /// 配置错误
    #[error("配置错误: {0}")]
    Config(#[from] ConfigError),
    /// 序列化失败
    #[error("序列化失败: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// 页码范围解析失败的原因
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RangeErrorReason {
    /// 不是 ≥ 1 的整数
    InvalidPageNumber,
    /// 区间起点大于终点
    StartAfterEnd,
    /// 超出 `[1, total]`
    OutsideBounds { total: u32 },
    /// 展开后的页数超过上限
    TooManyPages { limit: u32 },
}

impl std::fmt::Display for RangeErrorReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RangeErrorReason::InvalidPageNumber => write!(f, "invalid page number"),
            RangeErrorReason::StartAfterEnd => write!(f, "start must be ≤ end"),
            RangeErrorReason::OutsideBounds { total } => {
                write!(f, "outside bounds, valid range is 1-{}", total)
            }
            RangeErrorReason::TooManyPages { limit } => {
                write!(f, "selects more than {} pages", limit)
            }
        }
    }
}

/// 页码范围错误，记录出错的片段
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("页码片段 '{token}' 无效: {reason}")]
pub struct RangeError {
    pub token: String,
    pub reason: RangeErrorReason,
}

impl RangeError {
    pub fn new(token: impl Into<String>, reason: RangeErrorReason) -> Self {
        Self {
            token: token.into(),
            reason,
        }
    }
}

/// 持久化错误
#[derive(Debug, Error)]
pub enum PersistenceError {
    /// 网络请求失败（包括超时）
    #[error("请求失败 ({operation}): {source}")]
    RequestFailed {
        operation: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    /// 后端返回错误响应
    #[error("后端返回错误响应 ({operation}): status={status}, message={message}")]
    BadResponse {
        operation: String,
        status: u16,
        message: String,
    },
    /// 后端返回的数据无法解析
    #[error("响应解析失败 ({operation}): {message}")]
    MalformedResponse { operation: String, message: String },
    /// 异步任务在完成前被丢弃
    #[error("任务中断 ({operation})")]
    TaskAborted { operation: String },
}

/// 状态错误：撤销/重做无可用历史或操作需要的文档不存在
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum StateError {
    #[error("没有可撤销的操作")]
    NothingToUndo,
    #[error("没有可重做的操作")]
    NothingToRedo,
    #[error("当前没有文档")]
    NoDocument,
}

/// 事件处理器重入超限
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("事件 {event} 递归深度超过上限 {limit}")]
pub struct ReentrancyError {
    pub event: String,
    pub limit: usize,
}

/// 配置错误
#[derive(Debug, Error)]
pub enum ConfigError {
    /// 环境变量解析失败
    #[error("环境变量 {var_name} 解析失败: 值 '{value}' 无法转换为 {expected_type}")]
    EnvVarParseFailed {
        var_name: String,
        value: String,
        expected_type: String,
    },
    /// 读取配置文件失败
    #[error("读取配置文件失败 ({path}): {source}")]
    ReadFailed {
        path: String,
        #[source]
        source: std::io::Error,
    },
    /// TOML 解析失败
    #[error("TOML解析失败 ({path}): {source}")]
    TomlParseFailed {
        path: String,
        #[source]
        source: toml::de::Error,
    },
}

// ========== 便捷构造函数 ==========

impl AppError {
    /// 创建网络请求失败的持久化错误
    pub fn persistence(
        operation: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        AppError::Persistence(PersistenceError::RequestFailed {
            operation: operation.into(),
            source: Box::new(source),
        })
    }

    /// 创建后端错误响应
    pub fn bad_response(operation: impl Into<String>, status: u16, message: impl Into<String>) -> Self {
        AppError::Persistence(PersistenceError::BadResponse {
            operation: operation.into(),
            status,
            message: message.into(),
        })
    }

    /// 创建文档不存在错误
    pub fn not_found(document_id: impl Into<String>) -> Self {
        AppError::NotFound {
            document_id: document_id.into(),
        }
    }

    /// 是否是可以直接重试的错误
    pub fn is_retryable(&self) -> bool {
        matches!(self, AppError::Persistence(_))
    }
}

// ========== Result 类型别名 ==========

/// 应用程序结果类型
pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_range_error_display_names_token() {
        let err = RangeError::new("7", RangeErrorReason::OutsideBounds { total: 5 });
        let text = err.to_string();
        assert!(text.contains("'7'"));
        assert!(text.contains("1-5"));
    }

    #[test]
    fn test_only_persistence_is_retryable() {
        assert!(AppError::bad_response("save", 500, "boom").is_retryable());
        assert!(!AppError::not_found("doc-1").is_retryable());
        assert!(!AppError::from(StateError::NothingToUndo).is_retryable());
    }
}
