use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use rumqttc::{AsyncClient, Event, Incoming, MqttOptions, QoS};
use tracing::{debug, info, warn};

use relaystat_common::{NetworkConfig, ReconnectGate, TelemetryReading, TOPIC_READING, TOPIC_STATUS};

use crate::control::ReadingPublisher;
use crate::ports::Clock;

/// Best-effort telemetry publisher. Readings are dropped outright while
/// the link is down; reconnects are gated to the fixed retry interval.
#[derive(Clone)]
pub struct MqttTelemetry {
    client: AsyncClient,
    connected: Arc<AtomicBool>,
}

impl MqttTelemetry {
    pub fn start(
        network: &NetworkConfig,
        retry_interval_ms: u64,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let options = MqttOptions::new(
            network.mqtt_client_id.clone(),
            network.mqtt_host.clone(),
            network.mqtt_port,
        );
        let (client, eventloop) = AsyncClient::new(options, 64);
        let connected = Arc::new(AtomicBool::new(false));

        spawn_link_loop(
            client.clone(),
            eventloop,
            connected.clone(),
            retry_interval_ms,
            clock,
        );

        Self { client, connected }
    }

    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Relaxed)
    }
}

impl ReadingPublisher for MqttTelemetry {
    fn publish(&self, reading: &TelemetryReading) {
        if !self.is_connected() {
            debug!("telemetry link down, dropping reading");
            return;
        }

        let payload = match serde_json::to_vec(reading) {
            Ok(payload) => payload,
            Err(err) => {
                warn!("reading serialization failed: {err}");
                return;
            }
        };

        // Fire and forget: a full queue or lost connection drops the
        // reading, never blocks the control tick.
        if let Err(err) = self
            .client
            .try_publish(TOPIC_READING, QoS::AtMostOnce, false, payload)
        {
            warn!("telemetry publish failed: {err}");
        }
    }
}

fn spawn_link_loop(
    client: AsyncClient,
    mut eventloop: rumqttc::EventLoop,
    connected: Arc<AtomicBool>,
    retry_interval_ms: u64,
    clock: Arc<dyn Clock>,
) {
    tokio::spawn(async move {
        let mut gate = ReconnectGate::new(retry_interval_ms);

        loop {
            match eventloop.poll().await {
                Ok(Event::Incoming(Incoming::ConnAck(_))) => {
                    gate.mark_connected();
                    connected.store(true, Ordering::Relaxed);
                    info!("telemetry link up");

                    if let Err(err) =
                        client.try_publish(TOPIC_STATUS, QoS::AtLeastOnce, true, "online")
                    {
                        warn!("failed to publish online status: {err}");
                    }
                }
                Ok(_) => {}
                Err(err) => {
                    if gate.is_connected() {
                        warn!("telemetry link lost: {err}");
                    } else {
                        debug!("telemetry connect failed: {err}");
                    }
                    gate.mark_disconnected();
                    connected.store(false, Ordering::Relaxed);

                    let wait_ms = gate.retry_delay_ms(clock.now_ms());
                    if wait_ms > 0 {
                        tokio::time::sleep(Duration::from_millis(wait_ms)).await;
                    }
                    gate.record_attempt(clock.now_ms());
                }
            }
        }
    });
}
