//! 门诊分诊命令行程序

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};
use clinic_admin::{init_logging, ConfigManager, LoggingConfig};
use tracing::{error, info};

/// 门诊分诊命令行参数
#[derive(Parser, Debug)]
#[command(name = "clinic")]
#[command(about = "Hospital front-desk triage: vitals classification and waiting-queue ordering")]
struct Args {
    /// 配置文件路径
    #[arg(short, long, global = true)]
    config: Option<String>,

    /// 日志级别过滤表达式，覆盖配置文件和 RUST_LOG
    #[arg(short, long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// 根据生命体征计算分诊优先级，未给出、为 0 或无法解析的体征视为未测量
    Classify {
        /// 收缩压 (mmHg)
        #[arg(long)]
        systolic_bp: Option<String>,
        /// 心率 (bpm)
        #[arg(long)]
        heart_rate: Option<String>,
        /// 体温 (°C)
        #[arg(long)]
        temperature: Option<String>,
        /// 血氧饱和度 (%)
        #[arg(long)]
        spo2: Option<String>,
        /// 以 JSON 输出
        #[arg(long)]
        json: bool,
    },
    /// 对 JSON 候诊列表排序
    Sequence {
        /// 输入文件，内容为 [{"id", "priority", "joined_at"}] 数组
        #[arg(short, long)]
        input: String,
    },
    /// 运行一次前台分诊演示
    Demo,
    /// 加载并校验配置，以 TOML 输出
    CheckConfig {
        /// 同时写入该文件
        #[arg(long)]
        write: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config_manager = match ConfigManager::new(args.config.as_deref()) {
        Ok(manager) => manager,
        Err(e) => {
            // 配置不可用时按默认日志设置输出错误
            init_logging(&LoggingConfig::default(), args.log_level.as_deref())?;
            error!("配置加载失败: {:#}", e);
            return Err(e);
        }
    };
    init_logging(&config_manager.config().logging, args.log_level.as_deref())?;

    info!("启动门诊分诊程序...");
    info!("  配置来源: {}", config_manager.describe_source());

    let result = match args.command {
        Command::Classify {
            systolic_bp,
            heart_rate,
            temperature,
            spo2,
            json,
        } => commands::classify(
            config_manager.config(),
            [
                systolic_bp.as_deref(),
                heart_rate.as_deref(),
                temperature.as_deref(),
                spo2.as_deref(),
            ],
            json,
        ),
        Command::Sequence { input } => commands::sequence_file(&input).await,
        Command::Demo => commands::demo(config_manager.config()),
        Command::CheckConfig { write } => {
            commands::check_config(&config_manager, write.as_deref()).await
        }
    };

    if let Err(e) = &result {
        error!("命令执行失败: {:#}", e);
    }
    result
}
