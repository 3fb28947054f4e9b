//! 配置管理
//!
//! 默认值 → 配置文件 → `CLINIC__*` 环境变量，逐层覆盖

use anyhow::{Context, Result};
use clinic_workflow::{TriageThresholds, DEFAULT_PAGE_LIMIT};
use config::builder::DefaultState;
use config::{Config, ConfigBuilder, Environment, File, FileFormat};
use serde::{Deserialize, Serialize};
use tracing::{error, info};

/// 环境变量前缀
pub const ENV_PREFIX: &str = "CLINIC";

/// 门诊系统完整配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClinicConfig {
    /// 日志配置
    pub logging: LoggingConfig,
    /// 分诊配置
    pub triage: TriageConfig,
    /// 候诊队列配置
    pub queue: QueueConfig,
}

/// 日志配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// 日志级别过滤表达式，如 `info` 或 `clinic_workflow=debug`
    pub level: String,
    /// 输出格式：`pretty` 或 `json`
    pub format: String,
}

/// 分诊配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TriageConfig {
    pub thresholds: TriageThresholds,
}

/// 候诊队列配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueueConfig {
    /// 同时候诊人数上限，为空表示不限制
    pub max_waiting: Option<usize>,
    /// 候诊列表每页条数
    pub page_limit: usize,
}

impl Default for ClinicConfig {
    fn default() -> Self {
        Self {
            logging: LoggingConfig::default(),
            triage: TriageConfig::default(),
            queue: QueueConfig::default(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}

impl Default for TriageConfig {
    fn default() -> Self {
        Self {
            thresholds: TriageThresholds::default(),
        }
    }
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            max_waiting: None,
            page_limit: DEFAULT_PAGE_LIMIT,
        }
    }
}

/// 验证规则
#[derive(Debug)]
struct ValidationRule {
    field_path: String,
    validator: fn(&ClinicConfig) -> Result<()>,
    error_message: String,
}

/// 配置验证器
#[derive(Debug)]
pub struct ConfigValidator {
    validation_rules: Vec<ValidationRule>,
}

impl ConfigValidator {
    /// 创建新的配置验证器
    pub fn new() -> Self {
        let validation_rules = vec![
            ValidationRule {
                field_path: "logging.level".to_string(),
                validator: |config| {
                    crate::logging::build_filter(&config.logging.level).map(|_| ())
                },
                error_message: "Invalid log level filter".to_string(),
            },
            ValidationRule {
                field_path: "logging.format".to_string(),
                validator: |config| match config.logging.format.as_str() {
                    "pretty" | "json" => Ok(()),
                    other => Err(anyhow::anyhow!("Unknown log format {:?}", other)),
                },
                error_message: "Invalid log format".to_string(),
            },
            ValidationRule {
                field_path: "triage.thresholds".to_string(),
                validator: |config| {
                    config
                        .triage
                        .thresholds
                        .validate()
                        .map_err(|e| anyhow::anyhow!(e))
                },
                error_message: "Invalid triage thresholds".to_string(),
            },
            ValidationRule {
                field_path: "queue.page_limit".to_string(),
                validator: |config| {
                    if config.queue.page_limit == 0 {
                        Err(anyhow::anyhow!("Queue page limit cannot be 0"))
                    } else {
                        Ok(())
                    }
                },
                error_message: "Invalid queue page limit".to_string(),
            },
            ValidationRule {
                field_path: "queue.max_waiting".to_string(),
                validator: |config| {
                    if config.queue.max_waiting == Some(0) {
                        Err(anyhow::anyhow!("Queue capacity cannot be 0"))
                    } else {
                        Ok(())
                    }
                },
                error_message: "Invalid queue capacity".to_string(),
            },
        ];

        Self { validation_rules }
    }

    /// 验证配置
    pub fn validate(&self, config: &ClinicConfig) -> Result<()> {
        for rule in &self.validation_rules {
            if let Err(e) = (rule.validator)(config) {
                error!("Configuration validation failed for {}: {}", rule.field_path, e);
                return Err(anyhow::anyhow!(
                    "{} ({}): {}",
                    rule.error_message,
                    rule.field_path,
                    e
                ));
            }
        }
        Ok(())
    }
}

impl Default for ConfigValidator {
    fn default() -> Self {
        Self::new()
    }
}

/// 配置管理器
#[derive(Debug)]
pub struct ConfigManager {
    /// 配置数据
    config: ClinicConfig,
    /// 配置文件路径
    config_path: Option<String>,
    /// 配置验证器
    validator: ConfigValidator,
}

impl ConfigManager {
    /// 加载并验证配置，没有配置文件时只使用默认值和环境变量
    pub fn new(config_path: Option<&str>) -> Result<Self> {
        let config = Self::load_config(config_path)?;
        let validator = ConfigValidator::new();
        validator.validate(&config)?;

        Ok(Self {
            config,
            config_path: config_path.map(str::to_string),
            validator,
        })
    }

    /// 从文件和环境变量加载配置
    fn load_config(config_path: Option<&str>) -> Result<ClinicConfig> {
        let mut builder = defaults_builder()?;
        if let Some(path) = config_path {
            builder = builder.add_source(File::with_name(path));
        }
        builder = builder.add_source(
            Environment::with_prefix(ENV_PREFIX)
                .separator("__")
                .try_parsing(true),
        );

        deserialize(builder)
    }

    /// 获取配置
    pub fn config(&self) -> &ClinicConfig {
        &self.config
    }

    pub fn config_path(&self) -> Option<&str> {
        self.config_path.as_deref()
    }

    /// 配置来源描述，供日志系统就绪后输出
    pub fn describe_source(&self) -> String {
        match &self.config_path {
            Some(path) => format!("defaults, {} and {}__* environment", path, ENV_PREFIX),
            None => format!("defaults and {}__* environment", ENV_PREFIX),
        }
    }

    /// 更新配置
    pub fn update_config(&mut self, new_config: ClinicConfig) -> Result<()> {
        self.validator.validate(&new_config)?;
        self.config = new_config;
        info!("Configuration updated successfully");
        Ok(())
    }

    /// 以 TOML 形式输出当前配置
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(&self.config).context("Failed to serialize configuration")
    }

    /// 保存配置到文件
    pub async fn save_config(&self, path: &str) -> Result<()> {
        let config_str = self.to_toml()?;

        tokio::fs::write(path, config_str)
            .await
            .with_context(|| format!("Failed to write configuration file {}", path))?;

        info!("Configuration saved to: {}", path);
        Ok(())
    }
}

/// 从 TOML 文本解析配置（叠加在默认值之上，不读环境变量）
pub fn parse_toml(source: &str) -> Result<ClinicConfig> {
    let builder = defaults_builder()?.add_source(File::from_str(source, FileFormat::Toml));
    deserialize(builder)
}

fn defaults_builder() -> Result<ConfigBuilder<DefaultState>> {
    let defaults = Config::try_from(&ClinicConfig::default())
        .context("Failed to build default configuration")?;
    Ok(Config::builder().add_source(defaults))
}

fn deserialize(builder: ConfigBuilder<DefaultState>) -> Result<ClinicConfig> {
    builder
        .build()
        .context("Failed to build configuration")?
        .try_deserialize()
        .context("Failed to deserialize configuration")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_source_yields_defaults() {
        let config = parse_toml("").unwrap();
        assert_eq!(config, ClinicConfig::default());
        assert!(ConfigValidator::new().validate(&config).is_ok());
    }

    #[test]
    fn test_partial_override_keeps_other_defaults() {
        let config = parse_toml(
            r#"
            [logging]
            level = "debug"

            [triage.thresholds.urgent.spo2]
            at_or_below = 97

            [queue]
            max_waiting = 40
            "#,
        )
        .unwrap();

        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.logging.format, "pretty");
        assert_eq!(config.triage.thresholds.urgent.spo2.at_or_below, Some(97.0));
        assert_eq!(config.triage.thresholds.urgent.spo2.at_or_above, None);
        assert_eq!(config.triage.thresholds.emergency.systolic_bp.at_or_below, Some(90.0));
        assert_eq!(config.queue.max_waiting, Some(40));
        assert_eq!(config.queue.page_limit, DEFAULT_PAGE_LIMIT);
    }

    #[test]
    fn test_validator_rejects_inverted_bands() {
        let config = parse_toml(
            r#"
            [triage.thresholds.emergency.heart_rate]
            at_or_below = 60
            "#,
        )
        .unwrap();
        assert!(ConfigValidator::new().validate(&config).is_err());
    }

    #[test]
    fn test_validator_rejects_bad_queue_and_logging() {
        let validator = ConfigValidator::new();

        let mut config = ClinicConfig::default();
        config.queue.page_limit = 0;
        assert!(validator.validate(&config).is_err());

        let mut config = ClinicConfig::default();
        config.queue.max_waiting = Some(0);
        assert!(validator.validate(&config).is_err());

        let mut config = ClinicConfig::default();
        config.logging.format = "xml".to_string();
        assert!(validator.validate(&config).is_err());
    }

    #[test]
    fn test_validation_error_names_field() {
        let mut config = ClinicConfig::default();
        config.queue.max_waiting = Some(0);
        let message = ConfigValidator::new().validate(&config).unwrap_err().to_string();
        assert!(message.contains("queue.max_waiting"), "{}", message);
    }

    #[test]
    fn test_describe_source() {
        let mut manager = ConfigManager {
            config: ClinicConfig::default(),
            config_path: None,
            validator: ConfigValidator::new(),
        };
        assert_eq!(manager.describe_source(), "defaults and CLINIC__* environment");

        manager.config_path = Some("clinic.toml".to_string());
        assert_eq!(
            manager.describe_source(),
            "defaults, clinic.toml and CLINIC__* environment"
        );
    }

    #[test]
    fn test_update_config_validates() {
        let mut manager = ConfigManager {
            config: ClinicConfig::default(),
            config_path: None,
            validator: ConfigValidator::new(),
        };

        let mut bad = ClinicConfig::default();
        bad.queue.page_limit = 0;
        assert!(manager.update_config(bad).is_err());
        assert_eq!(manager.config().queue.page_limit, DEFAULT_PAGE_LIMIT);

        let mut good = ClinicConfig::default();
        good.queue.page_limit = 10;
        manager.update_config(good).unwrap();
        assert_eq!(manager.config().queue.page_limit, 10);
    }

    #[test]
    fn test_toml_output_parses_back() {
        let manager = ConfigManager {
            config: ClinicConfig::default(),
            config_path: None,
            validator: ConfigValidator::new(),
        };
        let rendered = manager.to_toml().unwrap();
        assert!(rendered.contains("[triage.thresholds.emergency.systolic_bp]"));
        assert_eq!(parse_toml(&rendered).unwrap(), ClinicConfig::default());
    }
}
