use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use axum::{
    routing::{get, post},
    Router,
};
use tokio::{net::TcpListener, sync::Mutex};
use tower_http::services::ServeDir;
use tracing::{info, warn};

use relaystat_common::{NetworkConfig, RuntimeConfig, Thermostat};

use crate::control::Controller;
use crate::http::{
    handle_get_history, handle_get_status, handle_target_decrement, handle_target_increment,
    AppState, HostController,
};
use crate::ports::{Clock, LoggingRelay, MonotonicClock, SimulatedSensor};
use crate::store::{ConfigStore, FsStorage, HistoryLog, Storage};
use crate::telemetry::MqttTelemetry;

const RUNTIME_CONFIG_OBJECT: &str = "runtime.json";

pub async fn run() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let data_dir = std::env::var("RELAYSTAT_DATA_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("./.relaystat"));
    let storage = FsStorage::new(data_dir);

    let mut runtime = load_runtime_config(&storage).await.unwrap_or_else(|err| {
        warn!("failed to load runtime config, using defaults: {err:#}");
        RuntimeConfig::default()
    });
    runtime.control.sanitize();
    apply_env_overrides(&mut runtime.network);

    let setpoint = ConfigStore::new(storage.clone(), runtime.control.default_setpoint);
    let target = setpoint.load().await;
    info!("starting with setpoint {target}");

    let history = HistoryLog::new(storage.clone());
    history.recover_if_oversized().await;

    let clock: Arc<dyn Clock> = Arc::new(MonotonicClock);
    let telemetry = MqttTelemetry::start(
        &runtime.network,
        runtime.control.retry_interval_ms,
        clock.clone(),
    );

    let controller = Controller::new(
        runtime.control.clone(),
        Thermostat::new(runtime.control.hysteresis_band, target),
        Box::new(SimulatedSensor::new(21.0)),
        Box::new(LoggingRelay::default()),
        history.clone(),
        telemetry,
    );
    let controller = Arc::new(Mutex::new(controller));

    spawn_control_loop(
        controller.clone(),
        clock,
        runtime.control.tick_interval_ms,
    );

    let app_state = AppState {
        controller,
        setpoint,
        history,
        setpoint_step: runtime.control.setpoint_step,
    };

    let web_root = format!("{}/web", env!("CARGO_MANIFEST_DIR"));
    let app = Router::new()
        .route("/status", get(handle_get_status))
        .route("/target/increment", post(handle_target_increment))
        .route("/target/decrement", post(handle_target_decrement))
        .route("/history", get(handle_get_history))
        .fallback_service(ServeDir::new(web_root))
        .with_state(app_state);

    let port = std::env::var("RELAYSTAT_HTTP_PORT")
        .ok()
        .and_then(|value| value.parse::<u16>().ok())
        .unwrap_or(runtime.network.http_port);
    let addr: SocketAddr = format!("0.0.0.0:{port}")
        .parse()
        .context("invalid listen address")?;
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind status server at {addr}"))?;

    info!("status server listening on http://{addr}");
    axum::serve(listener, app).await?;
    Ok(())
}

async fn load_runtime_config(storage: &FsStorage) -> anyhow::Result<RuntimeConfig> {
    match storage.read(RUNTIME_CONFIG_OBJECT).await? {
        Some(raw) => Ok(serde_json::from_slice(&raw)?),
        None => Ok(RuntimeConfig::default()),
    }
}

fn apply_env_overrides(network: &mut NetworkConfig) {
    if let Ok(host) = std::env::var("MQTT_HOST") {
        network.mqtt_host = host;
    }
    if let Some(port) = std::env::var("MQTT_PORT")
        .ok()
        .and_then(|value| value.parse::<u16>().ok())
    {
        network.mqtt_port = port;
    }
}

fn spawn_control_loop(
    controller: Arc<Mutex<HostController>>,
    clock: Arc<dyn Clock>,
    tick_interval_ms: u64,
) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_millis(tick_interval_ms));

        loop {
            interval.tick().await;
            let now_ms = clock.now_ms();

            let mut controller = controller.lock().await;
            controller.tick(now_ms).await;
        }
    });
}
