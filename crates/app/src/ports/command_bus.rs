//! Command bus port — outbound device commands.

use std::future::Future;

use rainhub_domain::error::RainHubError;

/// Publishes device commands back onto the messaging bus.
///
/// Fire-and-forget: there is no acknowledgement or retry; failures
/// propagate to the caller.
pub trait CommandPublisher {
    /// Publish a payload on a topic.
    fn publish(
        &self,
        topic: &str,
        message: &str,
    ) -> impl Future<Output = Result<(), RainHubError>> + Send;
}

impl<T: CommandPublisher + Send + Sync> CommandPublisher for std::sync::Arc<T> {
    fn publish(
        &self,
        topic: &str,
        message: &str,
    ) -> impl Future<Output = Result<(), RainHubError>> + Send {
        (**self).publish(topic, message)
    }
}
