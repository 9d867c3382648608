use crate::auth::Caller;
use crate::content;
use crate::error::Error;
use crate::notification::{notify_mentions, publish_all};
use crate::{CommentTopic, Context, Subscription};
use entity_api::LikeToggle;
use events::{Comment, NotificationKind};
use log::*;
use sse::topic::CommentKey;

/// Stores a comment on `post_id` and publishes it to everyone watching the
/// post's comments. Notifying post subscribers and mentioned users happens in
/// the background after this returns.
pub async fn create(
    ctx: &Context,
    caller: &Caller,
    post_id: &str,
    content: &str,
) -> Result<Comment, Error> {
    let user_id = caller.require_user()?;
    let content = content::validate(content)?;

    let author = ctx.store.find_user_by_id(user_id).await?;
    let mut comment = ctx.store.create_comment(&author, post_id, &content).await?;

    debug!("Created comment {} on post {post_id}", comment.id);

    ctx.hub.comments().publish(comment.clone()).await?;

    let store = ctx.store.clone();
    let broker = ctx.hub.notifications().clone();
    let commented = comment.clone();
    ctx.fanout.submit("comment_notifications", async move {
        let created = store.create_comment_notifications(&commented).await?;
        publish_all(&broker, created).await
    });

    let mentioned = content::mentions(&content);
    if !mentioned.is_empty() {
        ctx.fanout.submit(
            "comment_mention_notifications",
            notify_mentions(
                ctx.store.clone(),
                ctx.hub.notifications().clone(),
                author,
                comment.post_id.clone(),
                mentioned,
                NotificationKind::CommentMention,
            ),
        );
    }

    comment.mine = true;
    Ok(comment)
}

/// Comments on `post_id`, newest first, as seen by the caller.
pub async fn list(ctx: &Context, caller: &Caller, post_id: &str) -> Result<Vec<Comment>, Error> {
    Ok(ctx
        .store
        .comments(post_id, caller.user_id.as_deref())
        .await?)
}

/// Live comments on `post_id`. Comments the caller writes are not delivered
/// back to them. An unknown post is `NotFound`, as for [`list`].
pub async fn subscribe(
    ctx: &Context,
    caller: &Caller,
    post_id: &str,
) -> Result<Subscription<CommentTopic>, Error> {
    ctx.store
        .find_post(post_id, caller.user_id.as_deref())
        .await?;

    let key = CommentKey {
        viewer: caller.user_id.clone(),
        post_id: post_id.to_string(),
    };

    Ok(ctx.hub.comments().subscribe(key).await?)
}

pub async fn toggle_like(
    ctx: &Context,
    caller: &Caller,
    comment_id: &str,
) -> Result<LikeToggle, Error> {
    let user_id = caller.require_user()?;
    Ok(ctx.store.toggle_comment_like(user_id, comment_id).await?)
}
