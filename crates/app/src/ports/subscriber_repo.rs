//! Subscriber repository port — the subject store.

use std::future::Future;

use mailflow_domain::error::MailflowError;
use mailflow_domain::id::SubscriberId;
use mailflow_domain::subscriber::Subscriber;

pub trait SubscriberRepository {
    fn create(
        &self,
        subscriber: Subscriber,
    ) -> impl Future<Output = Result<Subscriber, MailflowError>> + Send;

    fn get_by_id(
        &self,
        id: SubscriberId,
    ) -> impl Future<Output = Result<Option<Subscriber>, MailflowError>> + Send;

    fn get_by_email(
        &self,
        email: &str,
    ) -> impl Future<Output = Result<Option<Subscriber>, MailflowError>> + Send;

    /// Persist `name` and `fields`.
    fn update(
        &self,
        subscriber: Subscriber,
    ) -> impl Future<Output = Result<Subscriber, MailflowError>> + Send;

    /// Delete a subscriber, cascading to its memberships, runs and tickets.
    fn delete(&self, id: SubscriberId) -> impl Future<Output = Result<(), MailflowError>> + Send;
}
