use crate::auth::Caller;
use crate::error::Error;
use crate::{Context, NotificationTopic, Subscription};
use entity_api::Store;
use events::{Notification, NotificationKind, PostId, User};
use sse::Broker;
use std::sync::Arc;

/// The caller's notifications, newest first.
pub async fn list(ctx: &Context, caller: &Caller) -> Result<Vec<Notification>, Error> {
    let user_id = caller.require_user()?;
    Ok(ctx.store.notifications(user_id).await?)
}

/// Live notifications addressed to the caller.
pub async fn subscribe(
    ctx: &Context,
    caller: &Caller,
) -> Result<Subscription<NotificationTopic>, Error> {
    let user_id = caller.require_user()?;
    Ok(ctx.hub.notifications().subscribe(user_id.clone()).await?)
}

/// Publishes each notification in order, stopping at the first failure.
pub(crate) async fn publish_all(
    broker: &Broker<NotificationTopic>,
    notifications: Vec<Notification>,
) -> Result<(), Error> {
    for notification in notifications {
        broker.publish(notification).await?;
    }
    Ok(())
}

/// Background job: notifies every user in `usernames` that `actor` mentioned
/// them on `post_id`.
pub(crate) async fn notify_mentions(
    store: Arc<dyn Store>,
    broker: Broker<NotificationTopic>,
    actor: User,
    post_id: PostId,
    usernames: Vec<String>,
    kind: NotificationKind,
) -> Result<(), Error> {
    let created = store
        .create_mention_notifications(&actor, &post_id, &usernames, kind)
        .await?;
    publish_all(&broker, created).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DomainErrorKind;
    use crate::test_support::Harness;

    #[tokio::test]
    async fn list_requires_a_user() {
        let harness = Harness::start();

        let result = list(&harness.ctx, &Caller::anonymous()).await;

        assert_eq!(
            result.unwrap_err().error_kind,
            DomainErrorKind::Unauthenticated
        );
        harness.finish().await;
    }

    #[tokio::test]
    async fn list_returns_the_callers_notifications() -> Result<(), Error> {
        let harness = Harness::start();
        let store = harness.ctx.store.clone();
        let alice = store.create_user("alice@example.com", "alice").await?;
        let bob = store.create_user("bob@example.com", "bob").await?;
        store.create_follow_notification(&alice, &bob.id).await?;

        let for_bob = list(&harness.ctx, &Caller::user(bob.id.clone())).await?;
        let for_alice = list(&harness.ctx, &Caller::user(alice.id.clone())).await?;

        assert_eq!(for_bob.len(), 1);
        assert_eq!(for_bob[0].kind, NotificationKind::Follow);
        assert_eq!(for_bob[0].actors, vec!["alice"]);
        assert!(for_alice.is_empty());
        harness.finish().await;
        Ok(())
    }
}
