use crate::auth::Caller;
use crate::content;
use crate::error::Error;
use crate::notification::notify_mentions;
use crate::Context;
use entity_api::{LikeToggle, SubscriptionToggle};
use events::{NotificationKind, Post};
use log::*;

/// Stores a post by the caller, who is subscribed to it from then on.
///
/// Every follower gets a timeline entry, published to the feed broker as it is
/// inserted, and mentioned users are notified. Both happen in the background
/// after this returns.
pub async fn create(
    ctx: &Context,
    caller: &Caller,
    content: &str,
    spoiler_of: Option<&str>,
) -> Result<Post, Error> {
    let user_id = caller.require_user()?;
    let content = content::validate(content)?;
    let spoiler_of = spoiler_of.map(str::trim).filter(|s| !s.is_empty());

    let author = ctx.store.find_user_by_id(user_id).await?;
    let mut post = ctx.store.create_post(&author, &content, spoiler_of).await?;

    debug!("Created post {} by {}", post.id, author.username);

    let store = ctx.store.clone();
    let feed = ctx.hub.feed().clone();
    let posted = post.clone();
    ctx.fanout.submit("feed_fanout", async move {
        let items = store.insert_feed_items(&posted).await?;
        trace!("Fanning post {} out to {} timelines", posted.id, items.len());
        for item in items {
            feed.publish(item).await?;
        }
        Ok(())
    });

    let mentioned = content::mentions(&content);
    if !mentioned.is_empty() {
        ctx.fanout.submit(
            "post_mention_notifications",
            notify_mentions(
                ctx.store.clone(),
                ctx.hub.notifications().clone(),
                author,
                post.id.clone(),
                mentioned,
                NotificationKind::PostMention,
            ),
        );
    }

    post.mine = true;
    post.subscribed = true;
    Ok(post)
}

/// A single post as seen by the caller.
pub async fn find(ctx: &Context, caller: &Caller, post_id: &str) -> Result<Post, Error> {
    Ok(ctx
        .store
        .find_post(post_id, caller.user_id.as_deref())
        .await?)
}

pub async fn toggle_like(
    ctx: &Context,
    caller: &Caller,
    post_id: &str,
) -> Result<LikeToggle, Error> {
    let user_id = caller.require_user()?;
    Ok(ctx.store.toggle_post_like(user_id, post_id).await?)
}

/// Starts or stops comment notifications on `post_id` for the caller.
pub async fn toggle_subscription(
    ctx: &Context,
    caller: &Caller,
    post_id: &str,
) -> Result<SubscriptionToggle, Error> {
    let user_id = caller.require_user()?;
    let toggled = ctx.store.toggle_subscription(user_id, post_id).await?;

    debug!(
        "{user_id} is {}subscribed to post {post_id}",
        if toggled.subscribed { "" } else { "un" }
    );
    Ok(toggled)
}
