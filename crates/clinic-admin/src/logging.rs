//! 日志初始化
//!
//! 过滤表达式优先级：命令行参数 → `RUST_LOG` → 配置文件

use crate::config::LoggingConfig;
use anyhow::{Context, Result};
use tracing_subscriber::EnvFilter;

/// 解析日志过滤表达式
pub fn build_filter(directives: &str) -> Result<EnvFilter> {
    EnvFilter::try_new(directives)
        .with_context(|| format!("Invalid log filter {:?}", directives))
}

/// 选出最终生效的过滤表达式
pub fn resolve_filter(config: &LoggingConfig, cli_override: Option<&str>) -> Result<EnvFilter> {
    if let Some(directives) = cli_override {
        return build_filter(directives);
    }

    match EnvFilter::try_from_default_env() {
        Ok(filter) => Ok(filter),
        Err(_) => build_filter(&config.level),
    }
}

/// 安装全局 tracing 订阅者
pub fn init_logging(config: &LoggingConfig, cli_override: Option<&str>) -> Result<()> {
    let filter = resolve_filter(config, cli_override)?;

    let installed = if config.format == "json" {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .try_init()
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .try_init()
    };

    installed.map_err(|e| anyhow::anyhow!("Failed to install tracing subscriber: {}", e))
}
