use std::path::PathBuf;
use std::sync::Arc;

use souba_api::server::{AppState, start_server};
use souba_core::common::SeriesIdentity;
use souba_core::common::time::RealTimeProvider;
use souba_market::publisher::BroadcastPublisher;
use souba_market::service::CandleMarket;
use souba_store::candle::SqliteCandleStore;
use tracing::info;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

mod config;

/// # Summary
/// 应用启动入口，纯粹的 DI 容器。
/// 负责实例化所有具体实现组件并通过 Arc<dyn Trait> 注入到 CandleMarket。
///
/// # Logic
/// 1. 装载配置并初始化全局日志（控制台 + 按日滚动文件）。
/// 2. 实例化基础设施层（SQLite 存储、广播器、真实时钟）。
/// 3. 构造市场域服务并预挂载配置中的序列。
/// 4. 启动 HTTP/WebSocket 服务，等待外部信号退出。
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 1. 配置与日志
    let app_config = config::load()?;

    let file_appender = tracing_appender::rolling::daily("logs", "souba.log");
    let (file_writer, _guard) = tracing_appender::non_blocking(file_appender);
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(fmt::layer())
        .with(fmt::layer().with_writer(file_writer).with_ansi(false))
        .init();
    info!("Souba market service starting...");

    // 2. 实例化基础设施层
    souba_store::config::set_root_dir(PathBuf::from(&app_config.database.data_dir));
    let store = Arc::new(SqliteCandleStore::new().await?);
    let publisher = Arc::new(BroadcastPublisher::new(app_config.market.broadcast_capacity));
    let clock = Arc::new(RealTimeProvider);

    // 3. 构造市场域服务
    let market = CandleMarket::new(store, publisher, clock, app_config.market.clone());

    // 预挂载资产目录中的序列，服务一启动即持续封存
    for symbol in app_config.market.initial_prices.keys() {
        let series = SeriesIdentity::new(symbol, 1, "v1");
        let _monitor = market.track(&series).await;
    }
    info!(
        "{} series pre-tracked, boundary detection running",
        market.tracked_count()
    );

    // 4. 启动 API 服务并等待退出信号
    let state = AppState {
        market: market.clone(),
    };
    let bind_addr = format!("{}:{}", app_config.server.host, app_config.server.port);

    tokio::select! {
        result = start_server(state, &bind_addr) => {
            result?;
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Shutdown signal received. Exiting...");
        }
    }

    Ok(())
}
