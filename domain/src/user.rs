use crate::auth::Caller;
use crate::content;
use crate::error::Error;
use crate::Context;
use email_address::EmailAddress;
use entity_api::FollowToggle;
use events::User;
use log::*;

pub async fn create(ctx: &Context, email: &str, username: &str) -> Result<User, Error> {
    let email = email.trim();
    let username = username.trim();

    if !EmailAddress::is_valid(email) {
        return Err(Error::invalid("email is not a valid address"));
    }
    if !content::is_valid_username(username) {
        return Err(Error::invalid(format!(
            "username must start with a letter and hold at most {} letters, digits, '_' or '-'",
            content::MAX_USERNAME_CHARS
        )));
    }

    let user = ctx.store.create_user(email, username).await?;
    info!("Created user {}", user.username);
    Ok(user)
}

pub async fn find_by_username(ctx: &Context, username: &str) -> Result<User, Error> {
    Ok(ctx.store.find_user_by_username(username).await?)
}

/// Follows `username` or, if the caller already follows them, unfollows.
/// A new follow notifies the followed user in the background.
pub async fn toggle_follow(
    ctx: &Context,
    caller: &Caller,
    username: &str,
) -> Result<FollowToggle, Error> {
    let user_id = caller.require_user()?;
    let toggled = ctx.store.toggle_follow(user_id, username).await?;

    debug!(
        "User {user_id} {} {username}",
        if toggled.following { "followed" } else { "unfollowed" }
    );

    if toggled.following {
        let store = ctx.store.clone();
        let broker = ctx.hub.notifications().clone();
        let follower_id = user_id.clone();
        let followee_id = toggled.followee_id.clone();
        ctx.fanout.submit("follow_notification", async move {
            let actor = store.find_user_by_id(&follower_id).await?;
            let notification = store.create_follow_notification(&actor, &followee_id).await?;
            broker.publish(notification).await?;
            Ok(())
        });
    }

    Ok(toggled)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{DomainErrorKind, EntityErrorKind, InternalErrorKind};
    use crate::test_support::Harness;
    use events::NotificationKind;
    use std::time::Duration;
    use tokio::time::timeout;

    fn entity(kind: EntityErrorKind) -> DomainErrorKind {
        DomainErrorKind::Internal(InternalErrorKind::Entity(kind))
    }

    #[tokio::test]
    async fn create_validates_email_and_username() {
        let harness = Harness::start();
        let ctx = &harness.ctx;

        let bad_email = create(ctx, "not-an-email", "alice").await;
        let bad_username = create(ctx, "alice@example.com", "1alice").await;

        assert_eq!(
            bad_email.unwrap_err().error_kind,
            entity(EntityErrorKind::Invalid)
        );
        assert_eq!(
            bad_username.unwrap_err().error_kind,
            entity(EntityErrorKind::Invalid)
        );
        harness.finish().await;
    }

    #[tokio::test]
    async fn create_reports_taken_username_as_conflict() -> Result<(), Error> {
        let harness = Harness::start();
        let ctx = &harness.ctx;
        create(ctx, "alice@example.com", "alice").await?;

        let taken = create(ctx, "other@example.com", "alice").await;

        assert_eq!(
            taken.unwrap_err().error_kind,
            entity(EntityErrorKind::Conflict)
        );
        harness.finish().await;
        Ok(())
    }

    #[tokio::test]
    async fn following_notifies_the_followed_user_once() -> Result<(), Error> {
        let harness = Harness::start();
        let ctx = &harness.ctx;
        let alice = create(ctx, "alice@example.com", "alice").await?;
        let bob = create(ctx, "bob@example.com", "bob").await?;
        let caller = Caller::user(alice.id.clone());

        let mut bobs = ctx.hub.notifications().subscribe(bob.id.clone()).await?;

        let followed = toggle_follow(ctx, &caller, "bob").await?;
        assert!(followed.following);
        assert_eq!(followed.followers_count, 1);

        let notification = timeout(Duration::from_secs(2), bobs.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(notification.kind, NotificationKind::Follow);
        assert_eq!(notification.actors, vec!["alice"]);

        let unfollowed = toggle_follow(ctx, &caller, "bob").await?;
        assert!(!unfollowed.following);
        assert!(timeout(Duration::from_millis(200), bobs.recv())
            .await
            .is_err());

        drop(bobs);
        harness.finish().await;
        Ok(())
    }

    #[tokio::test]
    async fn following_yourself_or_nobody_fails() -> Result<(), Error> {
        let harness = Harness::start();
        let ctx = &harness.ctx;
        let alice = create(ctx, "alice@example.com", "alice").await?;
        let caller = Caller::user(alice.id.clone());

        let yourself = toggle_follow(ctx, &caller, "alice").await;
        let nobody = toggle_follow(ctx, &caller, "nobody").await;

        assert_eq!(
            yourself.unwrap_err().error_kind,
            entity(EntityErrorKind::Forbidden)
        );
        assert_eq!(
            nobody.unwrap_err().error_kind,
            entity(EntityErrorKind::NotFound)
        );
        harness.finish().await;
        Ok(())
    }
}
