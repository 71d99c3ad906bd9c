use std::path::Path;

use serde::Deserialize;

use crate::error::{AppResult, ConfigError};

/// 程序配置文件
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Config {
    /// 撤销 / 重做栈的最大深度
    pub history_depth: usize,
    /// 事件总线保留的最近事件数量
    pub event_log_capacity: usize,
    /// 同名事件允许的最大递归深度
    pub max_reentrancy_depth: usize,
    /// 页码范围非法时是否清空已有选择（否则保留上一次合法选择）
    pub reset_selection_on_invalid_range: bool,
    /// 文档后端地址，为空时使用内存后端
    pub backend_base_url: Option<String>,
    /// PDF 切片服务地址，为空时不做页数探测
    pub slicer_base_url: Option<String>,
    /// 网络请求超时（秒）
    pub request_timeout_secs: u64,
    /// 导出文件目录
    pub export_dir: String,
    /// 是否显示详细日志
    pub verbose_logging: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            history_depth: 50,
            event_log_capacity: 32,
            max_reentrancy_depth: 8,
            reset_selection_on_invalid_range: false,
            backend_base_url: None,
            slicer_base_url: None,
            request_timeout_secs: 30,
            export_dir: "exports".to_string(),
            verbose_logging: false,
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        Self::default().with_env_overrides()
    }

    /// 先读取 TOML 配置文件，再用环境变量覆盖
    pub fn load(path: impl AsRef<Path>) -> AppResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::ReadFailed {
            path: path.display().to_string(),
            source,
        })?;
        let config = Self::from_toml_str(&content).map_err(|source| ConfigError::TomlParseFailed {
            path: path.display().to_string(),
            source,
        })?;
        Ok(config.with_env_overrides())
    }

    pub fn from_toml_str(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    fn with_env_overrides(self) -> Self {
        Self {
            history_depth: env_parse("HISTORY_DEPTH").unwrap_or(self.history_depth),
            event_log_capacity: env_parse("EVENT_LOG_CAPACITY").unwrap_or(self.event_log_capacity),
            max_reentrancy_depth: env_parse("MAX_REENTRANCY_DEPTH").unwrap_or(self.max_reentrancy_depth),
            reset_selection_on_invalid_range: env_parse("RESET_SELECTION_ON_INVALID_RANGE")
                .unwrap_or(self.reset_selection_on_invalid_range),
            backend_base_url: std::env::var("BACKEND_BASE_URL").ok().or(self.backend_base_url),
            slicer_base_url: std::env::var("SLICER_BASE_URL").ok().or(self.slicer_base_url),
            request_timeout_secs: env_parse("REQUEST_TIMEOUT_SECS").unwrap_or(self.request_timeout_secs),
            export_dir: std::env::var("EXPORT_DIR").unwrap_or(self.export_dir),
            verbose_logging: env_parse("VERBOSE_LOGGING").unwrap_or(self.verbose_logging),
        }
    }
}

fn env_parse<T: std::str::FromStr>(var_name: &str) -> Option<T> {
    let value = std::env::var(var_name).ok()?;
    match value.parse() {
        Ok(parsed) => Some(parsed),
        Err(_) => {
            let err = ConfigError::EnvVarParseFailed {
                var_name: var_name.to_string(),
                value,
                expected_type: std::any::type_name::<T>().to_string(),
            };
            tracing::warn!("{}，使用默认值", err);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppError;

    #[test]
    fn test_toml_overrides_only_given_fields() {
        let config = Config::from_toml_str(
            r#"
            history_depth = 10
            backend_base_url = "http://localhost:9000"
            "#,
        )
        .unwrap();

        assert_eq!(config.history_depth, 10);
        assert_eq!(config.backend_base_url.as_deref(), Some("http://localhost:9000"));
        assert_eq!(config.event_log_capacity, 32);
        assert_eq!(config.max_reentrancy_depth, 8);
    }

    #[test]
    fn test_unknown_types_fail_to_parse() {
        assert!(Config::from_toml_str("history_depth = \"lots\"").is_err());
    }

    #[test]
    fn test_missing_config_file_is_config_error() {
        let err = Config::load("/nonexistent/workflow.toml").unwrap_err();
        assert!(matches!(err, AppError::Config(ConfigError::ReadFailed { .. })));
        assert!(!err.is_retryable());
    }
}
