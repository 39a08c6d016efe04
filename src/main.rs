use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Arg, Command};
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use registrar_core::{
    AppConfig, Job, JobAction, JobDispatcher, RegistrationFinishedEvent, RegistrationListener,
};
use registrar_dispatcher::{job_queue, RetryConfig};
use registrar_handler::ChannelJobHandler;
use registrar_infrastructure::{ApiClientConfig, ReqwestChannelApiClient, SqliteKeyValueStore};

#[tokio::main]
async fn main() -> Result<()> {
    // 解析命令行参数
    let matches = Command::new("registrar")
        .version("0.1.0")
        .about("推送渠道注册与标签组同步服务")
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("FILE")
                .help("配置文件路径")
                .default_value("config/registrar.toml"),
        )
        .arg(
            Arg::new("log-level")
                .short('l')
                .long("log-level")
                .value_name("LEVEL")
                .help("日志级别")
                .value_parser(["trace", "debug", "info", "warn", "error"])
                .default_value("info"),
        )
        .arg(
            Arg::new("log-format")
                .long("log-format")
                .value_name("FORMAT")
                .help("日志格式")
                .value_parser(["json", "pretty"])
                .default_value("pretty"),
        )
        .get_matches();

    let config_path = matches.get_one::<String>("config").unwrap();
    let log_level = matches.get_one::<String>("log-level").unwrap();
    let log_format = matches.get_one::<String>("log-format").unwrap();

    // 初始化日志系统
    init_logging(log_level, log_format)?;

    info!("启动渠道注册服务");
    info!("配置文件: {config_path}");

    // 加载配置
    let config = AppConfig::load(Some(config_path))
        .with_context(|| format!("加载配置文件失败: {config_path}"))?;

    // 初始化持久化存储
    let store = SqliteKeyValueStore::connect(&config.database.url)
        .await
        .with_context(|| format!("连接键值存储失败: {}", config.database.url))?;

    // 初始化渠道API客户端
    let channel_client = ReqwestChannelApiClient::new(ApiClientConfig {
        base_url: config.api.base_url.clone(),
        app_key: config.api.app_key.clone(),
        app_secret: config.api.app_secret.clone(),
    })
    .context("创建渠道API客户端失败")?;

    // 任务队列与处理器
    let (dispatcher, worker) = job_queue(RetryConfig::from(&config.retry));
    let handler = ChannelJobHandler::builder(
        Arc::new(channel_client),
        Arc::new(dispatcher.clone()),
        Arc::new(store),
    )
    .config(config.channel.clone())
    .listener(Arc::new(LoggingRegistrationListener))
    .build();

    let mut worker_handle = worker.spawn(handler);

    // 启动即触发一次注册流程
    dispatcher
        .dispatch(Job::new(JobAction::StartRegistration))
        .await
        .context("触发注册流程失败")?;

    // 等待关闭信号
    wait_for_shutdown_signal().await;

    info!("收到关闭信号，开始优雅关闭...");

    // 释放根部的队列发送端；处理器内部仍持有发送端用于派生后续任务，
    // 因此给一段排空窗口后强制停止工作循环
    drop(dispatcher);
    match tokio::time::timeout(Duration::from_secs(5), &mut worker_handle).await {
        Ok(_) => info!("任务工作循环已退出"),
        Err(_) => {
            warn!("任务工作循环排空超时，强制停止");
            worker_handle.abort();
        }
    }

    info!("渠道注册服务已退出");
    Ok(())
}

/// 将注册结果写入日志的监听器
struct LoggingRegistrationListener;

impl RegistrationListener for LoggingRegistrationListener {
    fn registration_finished(&self, event: &RegistrationFinishedEvent) {
        if event.success {
            info!(
                "渠道注册完成: channel_id={:?} is_create={}",
                event.channel_id, event.is_create_request
            );
        } else {
            warn!(
                "渠道注册失败，等待重试: is_create={}",
                event.is_create_request
            );
        }
    }
}

/// 初始化日志系统
fn init_logging(log_level: &str, log_format: &str) -> Result<()> {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));

    let registry = tracing_subscriber::registry().with(env_filter);

    match log_format {
        "json" => {
            registry
                .with(tracing_subscriber::fmt::layer().json())
                .try_init()
                .context("初始化JSON日志格式失败")?;
        }
        "pretty" => {
            registry
                .with(tracing_subscriber::fmt::layer().pretty())
                .try_init()
                .context("初始化Pretty日志格式失败")?;
        }
        _ => {
            return Err(anyhow::anyhow!("不支持的日志格式: {log_format}"));
        }
    }

    Ok(())
}

/// 等待关闭信号
async fn wait_for_shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c().await.expect("安装Ctrl+C信号处理器失败");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("安装SIGTERM信号处理器失败")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("收到Ctrl+C信号");
        },
        _ = terminate => {
            info!("收到SIGTERM信号");
        },
    }
}
