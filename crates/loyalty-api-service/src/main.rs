//! 积分账本服务入口
//!
//! 启动 HTTP 服务与积分对账 Worker，收到关闭信号后先停止接收请求，
//! 再通知 Worker 退出并等待其结束。

use std::sync::Arc;

use anyhow::{Context, bail};
use clap::Parser;
use loyalty_api::{AppState, app, auth::JwtConfig, cli::Cli};
use loyalty_ledger::{HttpScoringClient, OrderRepository, Reconciler, ReconcilerConfig};
use loyalty_shared::{
    config::{AppConfig, AuthConfig},
    database::Database,
    observability,
};
use tokio::net::TcpListener;
use tokio::sync::watch;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = AppConfig::load("loyalty-api-service").context("加载配置失败")?;
    cli.apply(&mut config).context("命令行参数无效")?;

    let obs_config = config
        .observability
        .clone()
        .with_service_name(&config.service_name);
    let _guard = observability::init(&obs_config).await?;

    if config.auth.jwt_secret == AuthConfig::default().jwt_secret {
        if config.is_production() {
            bail!("生产环境必须通过 LOYALTY_AUTH__JWT_SECRET 设置 JWT 密钥");
        }
        warn!("Using default JWT secret - set LOYALTY_AUTH__JWT_SECRET for production");
    }

    info!("Starting loyalty-api-service on {}", config.server_addr());

    let db = Database::connect(&config.database).await?;
    if config.database.run_migrations {
        db.run_migrations().await?;
    }

    // 对账 Worker 与 HTTP 服务共享连接池
    let client = Arc::new(HttpScoringClient::from_config(&config.accrual)?);
    let reconciler = Arc::new(Reconciler::new(
        Arc::new(OrderRepository::new(db.pool().clone())),
        client,
        ReconcilerConfig::try_from(&config.accrual)?,
    ));
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let workers = reconciler.spawn(shutdown_rx);
    info!(
        workers = workers.len(),
        accrual = %config.accrual.base_url,
        "Reconciliation workers started"
    );

    let state = AppState::new(db.pool().clone(), JwtConfig::from(&config.auth));

    let listener = TcpListener::bind(config.server_addr()).await?;
    info!("Listening on {}", config.server_addr());

    // 优雅关闭：停止接收新连接并等待已有请求处理完毕
    axum::serve(listener, app(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("HTTP server stopped, waiting for reconciliation workers...");
    // 所有接收端都已退出时发送会失败，可以忽略
    let _ = shutdown_tx.send(true);
    for worker in workers {
        if let Err(e) = worker.await {
            warn!(error = %e, "Reconciliation worker terminated abnormally");
        }
    }

    db.close().await;
    info!("Server shutdown complete");

    Ok(())
}

/// 监听关闭信号
///
/// 容器停止时发送 SIGTERM，本地开发使用 Ctrl+C
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "注册 Ctrl+C 处理器失败");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "注册 SIGTERM 处理器失败");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C, initiating graceful shutdown..."),
        _ = terminate => info!("Received SIGTERM, initiating graceful shutdown..."),
    }
}
