mod app;
mod control;
mod http;
mod ports;
mod store;
mod telemetry;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    app::run().await
}
