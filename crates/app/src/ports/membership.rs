//! Membership store port — group and label membership of subscribers.
//!
//! Every mutation is idempotent: joining a group twice, or removing a label
//! that is not attached, succeeds without error.

use std::future::Future;

use mailflow_domain::error::MailflowError;
use mailflow_domain::id::{GroupId, LabelId, SubscriberId};

pub trait MembershipStore {
    fn join_group(
        &self,
        subscriber_id: SubscriberId,
        group_id: GroupId,
    ) -> impl Future<Output = Result<(), MailflowError>> + Send;

    fn leave_group(
        &self,
        subscriber_id: SubscriberId,
        group_id: GroupId,
    ) -> impl Future<Output = Result<(), MailflowError>> + Send;

    fn add_label(
        &self,
        subscriber_id: SubscriberId,
        label_id: LabelId,
    ) -> impl Future<Output = Result<(), MailflowError>> + Send;

    fn remove_label(
        &self,
        subscriber_id: SubscriberId,
        label_id: LabelId,
    ) -> impl Future<Output = Result<(), MailflowError>> + Send;

    fn groups_of(
        &self,
        subscriber_id: SubscriberId,
    ) -> impl Future<Output = Result<Vec<GroupId>, MailflowError>> + Send;

    fn labels_of(
        &self,
        subscriber_id: SubscriberId,
    ) -> impl Future<Output = Result<Vec<LabelId>, MailflowError>> + Send;
}
