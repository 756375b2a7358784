use std::process::ExitCode;

use common::utils::logging::{init_logging, LogFormat};
use configs::AppConfig;
use dotenvy::dotenv;
use service::runtime::AppState;
use tracing::{error, info, warn};
use uuid::Uuid;

fn main() -> ExitCode {
    // 提前加载 .env，使得 RUST_LOG / OPENEO_* 等环境变量生效
    dotenv().ok();

    let cfg = match AppConfig::load_and_validate() {
        Ok(cfg) => cfg,
        Err(e) => {
            init_logging(LogFormat::Compact);
            error!(service = "openeo_services", event = "config_invalid", error = %e, "configuration rejected");
            return ExitCode::FAILURE;
        }
    };
    init_logging(LogFormat::parse(&cfg.logging.format).unwrap_or_default());

    let instance_id = Uuid::new_v4();
    let pid = std::process::id();
    let version = env!("CARGO_PKG_VERSION");

    std::panic::set_hook(Box::new(move |info| {
        error!(service = "openeo_services", event = "panic", %instance_id, pid, message = %info, "unhandled panic occurred");
    }));

    let mut builder = tokio::runtime::Builder::new_multi_thread();
    builder.enable_all();
    if let Some(w) = cfg.server.worker_threads {
        builder.worker_threads(w);
    }
    let rt = match builder.build() {
        Ok(rt) => rt,
        Err(e) => {
            error!(service = "openeo_services", event = "runtime_build_failed", error = %e, "failed to build tokio runtime");
            return ExitCode::FAILURE;
        }
    };

    info!(
        service = "openeo_services",
        event = "start",
        %instance_id,
        pid,
        version,
        store_url = %cfg.store.url,
        threads = cfg.server.worker_threads.unwrap_or_default(),
        "starting"
    );

    rt.block_on(async move {
        let state = match AppState::start(&cfg).await {
            Ok(state) => state,
            Err(e) => {
                error!(service = "openeo_services", event = "start_failed", error = %e, "application state could not start");
                return ExitCode::FAILURE;
            }
        };

        match state.store.list(None).await {
            Ok(records) => info!(
                service = "openeo_services",
                event = "ready",
                backend = %state.store.kind(),
                records = records.len(),
                stac = state.stac.as_ref().map(|s| s.url()).unwrap_or("-"),
                "service store ready"
            ),
            // 存储暂不可读时仍继续运行，由调用方按请求报告错误
            Err(e) => warn!(service = "openeo_services", event = "store_unreadable", backend = %state.store.kind(), error = %e, "service store not readable at startup"),
        }

        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(service = "openeo_services", event = "signal_error", error = %e, "failed to listen for Ctrl+C");
        }
        info!(service = "openeo_services", event = "shutdown_signal", %instance_id, pid, "shutting down");
        state.shutdown().await;
        info!(service = "openeo_services", event = "stop", %instance_id, pid, "stopped");
        ExitCode::SUCCESS
    })
}
