//! # 门诊管理模块
//!
//! 提供配置加载、校验和日志初始化等运维功能

pub mod config;
pub mod logging;

pub use config::{ClinicConfig, ConfigManager, ConfigValidator, LoggingConfig, QueueConfig, TriageConfig};
pub use logging::init_logging;
