use std::time::Duration;

use chamber_common::TimePoint;
use rumqttc::{AsyncClient, Event, Incoming, MqttOptions, QoS};
use tracing::{info, warn};

#[derive(Debug, Clone)]
pub struct MqttConfig {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub pass: String,
    pub chamber: String,
}

/// Publishes fired setpoints to the chamber's MQTT topic.
///
/// The connection event loop runs on its own task; `apply` only enqueues,
/// so a broker outage surfaces as a failed attempt the runner can retry.
pub struct MqttSink {
    client: AsyncClient,
    topic: String,
}

fn setpoint_topic(chamber: &str) -> String {
    format!("chamber/{chamber}/setpoint")
}

impl MqttSink {
    pub fn connect(config: MqttConfig) -> Self {
        let client_id = format!("{}-schedule-runner", config.chamber);
        let mut options = MqttOptions::new(client_id, config.host, config.port);
        if !config.user.is_empty() {
            options.set_credentials(config.user, config.pass);
        }

        let (client, eventloop) = AsyncClient::new(options, 64);
        spawn_mqtt_loop(eventloop);

        Self {
            client,
            topic: setpoint_topic(&config.chamber),
        }
    }

    /// One publish attempt. Retries are the caller's policy, not ours.
    pub fn apply(&self, point: &TimePoint) -> bool {
        let payload = match serde_json::to_vec(point) {
            Ok(payload) => payload,
            Err(err) => {
                warn!("setpoint serialization failed: {err}");
                return false;
            }
        };

        // Retained, so a controller that reconnects mid-interval still sees
        // the conditions it should be holding.
        match self
            .client
            .try_publish(&self.topic, QoS::AtLeastOnce, true, payload)
        {
            Ok(()) => true,
            Err(err) => {
                warn!("setpoint publish failed: {err}");
                false
            }
        }
    }
}

fn spawn_mqtt_loop(mut eventloop: rumqttc::EventLoop) {
    tokio::spawn(async move {
        loop {
            match eventloop.poll().await {
                Ok(Event::Incoming(Incoming::ConnAck(_))) => {
                    info!("mqtt connected");
                }
                Ok(_) => {}
                Err(err) => {
                    warn!("mqtt poll error: {err}");
                    tokio::time::sleep(Duration::from_secs(2)).await;
                }
            }
        }
    });
}
