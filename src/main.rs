use gif_backend::config::AppConfig;
use gif_backend::shutdown;
use gif_backend::startup::{prepare_engine, run_startup_checks};
use gif_backend::{AppState, ShutdownManager, build_app};

#[tokio::main]
async fn main() {
    // 默认日志级别来自配置，所以配置先于日志初始化；RUST_LOG 优先
    let config = match AppConfig::init_global() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Config init failed: {e}");
            std::process::exit(1);
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| config.default_log_filter().into()),
        )
        .init();

    tracing::info!(
        "gif-backend {} 启动，environment = {}",
        env!("CARGO_PKG_VERSION"),
        config.environment
    );

    let shutdown_manager = ShutdownManager::new();
    if let Err(e) = shutdown_manager.start_signal_handler() {
        tracing::error!("信号处理器启动失败: {}", e);
        std::process::exit(1);
    }

    if let Err(e) = run_startup_checks(config).await {
        tracing::error!("Startup checks failed: {}", e);
        std::process::exit(1);
    }

    let factory = match prepare_engine(config).await {
        Ok(f) => f,
        Err(e) => {
            tracing::error!("渲染引擎初始化失败: {}", e);
            std::process::exit(1);
        }
    };

    let app_state = AppState::from_config(config, factory);
    let background = app_state.background.clone();
    let app = build_app(app_state);

    let addr = config.server_addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .unwrap_or_else(|e| {
            tracing::error!("Bind address failed {}: {}", addr, e);
            std::process::exit(1);
        });

    tracing::info!("Server: http://{}", addr);
    tracing::info!("OpenAPI: http://{}/api-docs/openapi.json", addr);
    tracing::info!("Health: http://{}/health", addr);
    tracing::info!("Default mode: {}", config.render.default_mode);

    let graceful = axum::serve(listener, app).with_graceful_shutdown(async move {
        let reason = shutdown_manager.wait_for_shutdown().await;
        tracing::info!("接收到退出信号: {:?}，开始优雅关闭HTTP服务器...", reason);
    });

    if let Err(e) = graceful.await {
        tracing::error!("服务器运行错误: {}", e);
        std::process::exit(1);
    }

    // 在途请求已结束，排空它们派发的缓存写入
    match shutdown::finish(&background, &config.shutdown).await {
        Ok(()) => tracing::info!("服务器已优雅关闭"),
        Err(e) => tracing::warn!("{}，强制退出", e),
    }
}
