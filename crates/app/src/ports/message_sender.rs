//! Message delivery port.

use std::future::Future;

use mailflow_domain::error::DeliveryError;

/// Outbound message delivery.
pub trait MessageSender {
    /// Deliver one message to `to`.
    fn send(
        &self,
        to: &str,
        subject: &str,
        body: &str,
    ) -> impl Future<Output = Result<(), DeliveryError>> + Send;
}
