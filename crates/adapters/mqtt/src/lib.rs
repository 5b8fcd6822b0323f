//! # rainhub-adapter-mqtt
//!
//! MQTT bridge built on [rumqttc](https://docs.rs/rumqttc).
//!
//! ## Responsibilities
//! - Connect to the broker and subscribe to the telemetry topic filter
//! - Hand inbound `(topic, payload)` pairs to an application handler,
//!   isolating per-message failures so one bad payload never stops the
//!   intake
//! - Implement the outbound [`CommandPublisher`] port
//!
//! ## Dependency rule
//! Depends on `rainhub-app` (for port traits) and `rainhub-domain`. The
//! `app` and `domain` crates must never reference this adapter.

use rumqttc::{AsyncClient, Event, EventLoop, MqttOptions, Packet, QoS};
use tracing::{debug, info, warn};

use rainhub_app::ports::CommandPublisher;
use rainhub_domain::error::RainHubError;

pub mod config;
pub mod error;

pub use config::MqttConfig;
pub use error::MqttError;

/// Connection to the broker, producing a publisher handle and the
/// consumer loop.
pub struct MqttBridge {
    client: AsyncClient,
    event_loop: EventLoop,
    config: MqttConfig,
}

impl MqttBridge {
    /// Create the client. No network traffic happens until the consumer
    /// loop polls.
    #[must_use]
    pub fn connect(config: MqttConfig) -> Self {
        let mut options = MqttOptions::new(
            config.client_id.clone(),
            config.broker_host.clone(),
            config.broker_port,
        );
        options.set_keep_alive(std::time::Duration::from_secs(u64::from(
            config.keep_alive_secs,
        )));
        let (client, event_loop) = AsyncClient::new(options, 64);
        Self {
            client,
            event_loop,
            config,
        }
    }

    /// A cheap clonable handle for publishing device commands.
    #[must_use]
    pub fn publisher(&self) -> MqttPublisher {
        MqttPublisher {
            client: self.client.clone(),
        }
    }

    /// Drive the connection and feed every inbound message to `handler`.
    ///
    /// The subscription is (re-)established on every broker handshake so
    /// it survives reconnects. Handler failures and connection drops are
    /// logged and the loop keeps going; it only returns when the client
    /// channel is closed.
    pub async fn run<F, Fut>(mut self, mut handler: F) -> Result<(), MqttError>
    where
        F: FnMut(String, String) -> Fut,
        Fut: Future<Output = Result<(), RainHubError>>,
    {
        loop {
            match self.event_loop.poll().await {
                Ok(Event::Incoming(Packet::ConnAck(_))) => {
                    info!(filter = self.config.subscribe_filter, "broker connected");
                    self.client
                        .subscribe(self.config.subscribe_filter.clone(), QoS::AtLeastOnce)
                        .await?;
                }
                Ok(Event::Incoming(Packet::Publish(publish))) => {
                    let topic = publish.topic.clone();
                    let payload = match std::str::from_utf8(&publish.payload) {
                        Ok(payload) => payload.to_string(),
                        Err(err) => {
                            warn!(topic, %err, "discarding non-UTF-8 payload");
                            continue;
                        }
                    };
                    debug!(topic, "message received");
                    if let Err(error) = handler(topic.clone(), payload).await {
                        warn!(topic, %error, "message handling failed");
                    }
                }
                Ok(_) => {}
                Err(rumqttc::ConnectionError::RequestsDone) => {
                    info!("client channel closed, stopping consumer");
                    return Ok(());
                }
                Err(err) => {
                    warn!(%err, "connection error, retrying");
                    tokio::time::sleep(std::time::Duration::from_secs(1)).await;
                }
            }
        }
    }
}

/// Outbound command publisher backed by the shared client handle.
#[derive(Clone)]
pub struct MqttPublisher {
    client: AsyncClient,
}

impl CommandPublisher for MqttPublisher {
    async fn publish(&self, topic: &str, message: &str) -> Result<(), RainHubError> {
        self.client
            .publish(topic, QoS::AtLeastOnce, false, message)
            .await
            .map_err(MqttError::from)?;
        Ok(())
    }
}
