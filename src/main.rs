use anyhow::Context;
use chrono::Local;
use log::{info, warn};
use std::sync::Arc;
use wqbatch::app_service::{AppService, Remote};
use wqbatch::commands::{AppCommand, USAGE};
use wqbatch::config::AppConfig;
use wqbatch::session::{ApiUrls, WQBSession};
use wqbatch::simulation::CancelSignal;
use wqbatch::storage::{IdLedger, SqliteHistoryStore};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_logging()?;

    match dotenv::dotenv() {
        Ok(path) => info!("✓ 已加载 .env 文件: {}", path.display()),
        Err(_) => info!("⚠ 未找到 .env 文件，从系统环境变量读取"),
    }

    let line = std::env::args().skip(1).collect::<Vec<_>>().join(" ");
    let cmd: AppCommand = line.parse().unwrap_or(AppCommand::Help);
    match &cmd {
        AppCommand::Help => {
            println!("{}", USAGE);
            return Ok(());
        }
        AppCommand::Unknown(msg) => {
            eprintln!("{}\n{}", msg, USAGE);
            std::process::exit(2);
        }
        _ => {}
    }

    let config = AppConfig::from_env()?;
    let (cancel_tx, cancel) = CancelSignal::channel();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("⏹ 收到 Ctrl-C，正在取消当前任务");
            eprintln!("收到 Ctrl-C，正在取消...");
            let _ = cancel_tx.send(true);
        }
    });

    let store = SqliteHistoryStore::connect(&config.database_url)
        .await
        .with_context(|| format!("数据库连接失败: {}", config.database_url))?;
    info!("✓ 数据库连接成功: {}", config.database_url);
    let ledger = Arc::new(IdLedger::new(config.ledger_path.clone()));

    let remote = if cmd.needs_session() {
        let session = create_session(&config).await?;
        Some(Remote::from_session(Arc::new(session), &config, &cancel))
    } else {
        None
    };

    let mut service = AppService::new(config, Arc::new(store), ledger, cancel);
    if let Some(remote) = remote {
        service = service.with_remote(remote);
    }

    let out = service.execute(cmd).await?;
    println!("{}", out);
    Ok(())
}

fn init_logging() -> anyhow::Result<()> {
    let ts = Local::now().format("%Y%m%d-%H%M%S").to_string();
    let log_dir = std::path::PathBuf::from("logs");
    std::fs::create_dir_all(&log_dir)?;
    let log_path = log_dir.join(format!("app-{}.log", ts));
    let log_file = std::fs::File::create(&log_path)
        .with_context(|| format!("无法创建日志文件 {}", log_path.display()))?;
    env_logger::Builder::from_default_env()
        .target(env_logger::Target::Pipe(Box::new(log_file)))
        .filter_level(log::LevelFilter::Warn)
        .filter_module("wqbatch", log::LevelFilter::Info)
        .filter_module("sqlx", log::LevelFilter::Error)
        .filter_module("sea_orm", log::LevelFilter::Error)
        .init();
    Ok(())
}

async fn create_session(config: &AppConfig) -> anyhow::Result<WQBSession> {
    let (email, password) = config.credentials()?;
    let session = WQBSession::new(
        email.to_string(),
        password.to_string(),
        ApiUrls::new(config.api_url.clone()),
    )?;

    let resp = session.auth_request().await.context("认证请求失败")?;
    let status = resp.status();
    if !status.is_success() {
        anyhow::bail!("认证失败，状态码: {}", status);
    }
    info!("✓ 认证成功！状态码: {}", status);
    if let Ok(json) = resp.json::<serde_json::Value>().await {
        if let Some(user_id) = json.get("user").and_then(|u| u.get("id")) {
            info!("✓ 用户 ID: {}", user_id);
        }
    }
    Ok(session)
}
