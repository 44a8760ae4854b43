//! 急诊分诊服务器主程序

use anyhow::{Context, Result};
use clap::Parser;
use hms_admin::{init_logging, ConfigManager, ConfigValidator, HmsConfig};
use hms_core::fixtures::{reference_beds, reference_er_queue};
use hms_triage::{BedPool, QueueStore, TracingAudioSink, TriageDesk};
use hms_web::WebServer;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::{error, info};

/// 急诊分诊服务器命令行参数
#[derive(Parser, Debug)]
#[command(name = "hms-server")]
#[command(about = "急诊分诊队列、床位分配与生命体征告警服务")]
struct Args {
    /// 配置文件路径
    #[arg(short, long, default_value = "config/hms.toml")]
    config: String,

    /// 服务器端口，覆盖配置文件
    #[arg(short, long)]
    port: Option<u16>,

    /// 日志级别，覆盖配置文件
    #[arg(short, long)]
    log_level: Option<String>,

    /// 关闭生命体征恶化模拟
    #[arg(long)]
    no_simulator: bool,
}

/// 合并命令行覆盖项，返回实际生效的配置（尚未校验）
fn effective_config(args: &Args, mut config: HmsConfig) -> HmsConfig {
    if let Some(port) = args.port {
        config.server.port = port;
    }
    if let Some(level) = &args.log_level {
        config.logging.level = level.clone();
    }
    if args.no_simulator {
        config.triage.simulator.enabled = false;
    }
    config
}

/// 床位目录始终加载，演示患者按配置写入
fn seed_stores(config: &HmsConfig) -> (QueueStore, BedPool) {
    let queue = if config.triage.seed_demo_data {
        QueueStore::from_items(reference_er_queue())
    } else {
        QueueStore::new()
    };
    (queue, BedPool::new(reference_beds()))
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let manager = ConfigManager::new(Some(&args.config))?;
    let config = effective_config(&args, manager.get_config().await);

    init_logging(&config.logging)?;
    ConfigValidator::new().validate(&config)?;

    info!("启动急诊分诊服务器...");
    info!("  配置文件: {}", args.config);
    info!("  服务名称: {}", config.server.name);
    info!("  监听地址: {}:{}", config.server.host, config.server.port);
    info!("  恶化模拟: {}", config.triage.simulator.enabled);

    let (queue, beds) = seed_stores(&config);

    let desk = Arc::new(TriageDesk::new(
        queue,
        beds,
        Arc::new(TracingAudioSink),
        config.triage.desk_config(),
    ));
    desk.start().await;

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .context("Invalid server address")?;

    let server = WebServer::new(addr, desk.clone());
    let served = server
        .run(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!("Failed to listen for shutdown signal: {}", e);
            }
            info!("Shutdown signal received");
        })
        .await;

    desk.stop().await;

    if let Err(e) = served {
        error!("服务器运行失败: {}", e);
        return Err(e.into());
    }

    info!("急诊分诊服务器已停止");
    Ok(())
}
