use crate::auth::Caller;
use crate::error::Error;
use crate::{Context, FeedTopic, Subscription};
use events::FeedItem;

/// Timeline entries returned per snapshot page.
pub const PAGE_SIZE: usize = 25;

/// One page of the caller's timeline, newest first. `before` is the id of the
/// last entry of the previous page.
pub async fn page(
    ctx: &Context,
    caller: &Caller,
    before: Option<&str>,
) -> Result<Vec<FeedItem>, Error> {
    let user_id = caller.require_user()?;
    let before = before.map(str::trim).filter(|b| !b.is_empty());

    Ok(ctx.store.feed(user_id, before, PAGE_SIZE).await?)
}

/// Live timeline entries addressed to the caller.
pub async fn subscribe(ctx: &Context, caller: &Caller) -> Result<Subscription<FeedTopic>, Error> {
    let user_id = caller.require_user()?;
    Ok(ctx.hub.feed().subscribe(user_id.clone()).await?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{DomainErrorKind, InternalErrorKind};
    use crate::test_support::Harness;

    #[tokio::test]
    async fn page_holds_at_most_a_page_of_entries() -> Result<(), Error> {
        let harness = Harness::start();
        let ctx = &harness.ctx;
        let alice = ctx.store.create_user("alice@example.com", "alice").await?;
        let bob = ctx.store.create_user("bob@example.com", "bob").await?;
        ctx.store.toggle_follow(&bob.id, "alice").await?;
        for n in 0..PAGE_SIZE + 5 {
            let post = ctx.store.create_post(&alice, &format!("#{n}"), None).await?;
            ctx.store.insert_feed_items(&post).await?;
        }
        let caller = Caller::user(bob.id.clone());

        let first = page(ctx, &caller, None).await?;
        let last_id = first.last().map(|item| item.id.clone());
        let rest = page(ctx, &caller, last_id.as_deref()).await?;

        assert_eq!(first.len(), PAGE_SIZE);
        assert_eq!(first[0].post.content, format!("#{}", PAGE_SIZE + 4));
        assert_eq!(rest.len(), 5);
        assert_eq!(rest[4].post.content, "#0");
        harness.finish().await;
        Ok(())
    }

    #[tokio::test]
    async fn subscribe_fails_once_the_broker_is_shut_down() {
        let harness = Harness::start();
        harness.ctx.hub.shutdown().await;

        let result = subscribe(&harness.ctx, &Caller::user("bob")).await;

        assert_eq!(
            result.err().map(|e| e.error_kind),
            Some(DomainErrorKind::Internal(InternalErrorKind::Broker))
        );
        harness.finish().await;
    }
}
