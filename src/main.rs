use std::path::PathBuf;

use anyhow::Result;
use scan_review_workflow::{logger, App, Config};

#[tokio::main]
async fn main() -> Result<()> {
    // 加载配置：WORKFLOW_CONFIG 指向 TOML 文件时先读文件
    let config = match std::env::var("WORKFLOW_CONFIG") {
        Ok(path) => Config::load(path)?,
        Err(_) => Config::from_env(),
    };

    // 初始化日志
    logger::init_with_verbosity(config.verbose_logging);

    // 第一个参数为意图脚本路径，缺省时读标准输入
    let script = std::env::args().nth(1).map(PathBuf::from);

    // 初始化并运行应用
    App::initialize(config).await?.run(script.as_deref()).await?;

    Ok(())
}
