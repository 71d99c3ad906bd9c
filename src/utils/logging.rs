/// 日志工具模块
///
/// 提供日志格式化和输出的辅助函数
use tracing::info;

use crate::config::Config;

/// 记录会话启动信息
pub fn log_session_start(config: &Config) {
    info!("{}", "=".repeat(60));
    info!("🚀 程序启动 - 扫描件校对工作流");
    info!(
        "📚 历史深度: {} | 后端: {}",
        config.history_depth,
        config.backend_base_url.as_deref().unwrap_or("内存")
    );
    info!("{}", "=".repeat(60));
}

/// 打印会话统计信息
///
/// # 参数
/// - `handled`: 成功处理的意图数量
/// - `rejected`: 被拒绝或失败的意图数量
/// - `notices`: 收到的派生事件数量
pub fn print_session_stats(handled: usize, rejected: usize, notices: usize) {
    info!("\n{}", "=".repeat(60));
    info!("📊 会话统计");
    info!(
        "完成时间: {}",
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
    );
    info!("{}", "=".repeat(60));
    info!("✅ 已处理: {}", handled);
    info!("❌ 未生效: {}", rejected);
    info!("📨 派生事件: {}", notices);
    info!("{}", "=".repeat(60));
}

/// 截断长文本用于日志显示
///
/// # 参数
/// - `text`: 原始文本
/// - `max_len`: 最大长度（按字符计）
///
/// # 返回
/// 返回截断后的文本
pub fn truncate_text(text: &str, max_len: usize) -> String {
    if text.chars().count() > max_len {
        text.chars().take(max_len).collect::<String>() + "..."
    } else {
        text.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::truncate_text;

    #[test]
    fn test_truncate_counts_chars_not_bytes() {
        assert_eq!(truncate_text("试卷处理日志", 2), "试卷...");
        assert_eq!(truncate_text("short", 10), "short");
    }
}
