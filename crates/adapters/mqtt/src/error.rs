//! MQTT adapter error types.

use rainhub_domain::error::RainHubError;

/// Errors specific to the MQTT adapter.
#[derive(Debug, thiserror::Error)]
pub enum MqttError {
    /// The rumqttc client returned an error.
    #[error("MQTT client error")]
    Client(#[from] rumqttc::ClientError),

    /// The broker connection failed.
    #[error("MQTT connection error")]
    Connection(#[from] rumqttc::ConnectionError),

    /// An inbound payload was not valid UTF-8.
    #[error("MQTT payload is not valid UTF-8")]
    PayloadEncoding(#[source] std::str::Utf8Error),

    /// A domain-level error (validation, not-found, etc.).
    #[error("domain error")]
    Domain(#[source] RainHubError),
}

impl MqttError {
    /// Convert into a [`RainHubError::Storage`] for propagation across
    /// port boundaries.
    #[must_use]
    pub fn into_domain(self) -> RainHubError {
        match self {
            Self::Domain(err) => err,
            other => RainHubError::Storage(Box::new(other)),
        }
    }
}

impl From<MqttError> for RainHubError {
    fn from(err: MqttError) -> Self {
        err.into_domain()
    }
}
