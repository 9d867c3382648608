use crate::message::Frame;
use crate::subscription::Subscription;
use crate::topic::Topic;
use async_stream::stream;
use axum::body::Body;
use axum::http::header::{CACHE_CONTROL, CONNECTION, CONTENT_TYPE};
use axum::response::{IntoResponse, Response};
use futures::{Stream, StreamExt};
use log::*;
use serde::Serialize;
use std::convert::Infallible;
use std::time::Duration;

/// Media type that selects streaming over a JSON snapshot.
pub const EVENT_STREAM_MIME_TYPE: &str = "text/event-stream";

/// Interval of silence after which a heartbeat frame is written.
pub const DEFAULT_HEARTBEAT: Duration = Duration::from_secs(15);

/// Turns one subscription into a long-lived event-stream response body.
///
/// The body waits on three things at once: the connection going away (the
/// server drops the body, which drops the subscription and unsubscribes it),
/// the heartbeat timer, and the next event for this subscriber. The heartbeat
/// timer restarts after every frame written.
pub struct EventStream<T: Topic> {
    subscription: Subscription<T>,
    heartbeat: Duration,
}

impl<T> EventStream<T>
where
    T: Topic,
    T::Event: Serialize,
{
    pub fn new(subscription: Subscription<T>, heartbeat: Duration) -> Self {
        Self {
            subscription,
            heartbeat,
        }
    }

    /// Frames in the order they are written to the connection. Ends when the
    /// broker closes the subscription.
    pub fn frames(self) -> impl Stream<Item = Frame> + Send + 'static {
        let EventStream {
            mut subscription,
            heartbeat,
        } = self;

        stream! {
            loop {
                let frame = tokio::select! {
                    _ = tokio::time::sleep(heartbeat) => Frame::Ping,
                    event = subscription.recv() => match event {
                        Some(event) => Frame::from_event(&event),
                        None => break,
                    },
                };
                yield frame;
            }

            debug!(
                "{} broker closed the stream for subscriber {}",
                T::NAME,
                subscription.id().as_str()
            );
        }
    }
}

impl<T> IntoResponse for EventStream<T>
where
    T: Topic,
    T::Event: Serialize,
{
    fn into_response(self) -> Response {
        let body = self
            .frames()
            .map(|frame| Ok::<_, Infallible>(frame.encode()));

        (
            [
                (CONTENT_TYPE, EVENT_STREAM_MIME_TYPE),
                (CACHE_CONTROL, "no-cache"),
                (CONNECTION, "keep-alive"),
            ],
            Body::from_stream(body),
        )
            .into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::broker::{Broker, BrokerConfig};
    use crate::topic::FeedTopic;
    use chrono::Utc;
    use events::{FeedItem, Post};
    use futures::pin_mut;
    use serde::ser::Error as _;
    use serde::Serializer;
    use tokio::time::{timeout, Instant};

    fn feed_item(recipient: &str) -> FeedItem {
        FeedItem {
            id: "f-1".to_string(),
            user_id: recipient.to_string(),
            post_id: "p-1".to_string(),
            post: Post {
                id: "p-1".to_string(),
                user_id: "alice".to_string(),
                content: "hello".to_string(),
                spoiler_of: None,
                likes_count: 0,
                comments_count: 0,
                created_at: Utc::now(),
                user: None,
                mine: false,
                liked: false,
                subscribed: false,
            },
        }
    }

    #[derive(Clone)]
    struct Broken;

    impl Serialize for Broken {
        fn serialize<S: Serializer>(&self, _serializer: S) -> Result<S::Ok, S::Error> {
            Err(S::Error::custom("broken event"))
        }
    }

    struct BrokenTopic;

    impl Topic for BrokenTopic {
        type Event = Broken;
        type Key = ();

        const NAME: &'static str = "broken";

        fn matches(_key: &(), _event: &Broken) -> bool {
            true
        }
    }

    fn assert_elapsed(since: Instant, expected: Duration) {
        let elapsed = since.elapsed();
        assert!(
            elapsed >= expected && elapsed < expected + Duration::from_millis(10),
            "expected {expected:?} to elapse, got {elapsed:?}"
        );
    }

    #[tokio::test(start_paused = true)]
    async fn heartbeat_fires_every_interval_and_not_before() {
        let (broker, handle) = Broker::<FeedTopic>::start(&BrokerConfig::default());
        let subscription = broker.subscribe("bob".to_string()).await.unwrap();
        let frames = EventStream::new(subscription, DEFAULT_HEARTBEAT).frames();
        pin_mut!(frames);

        let mut since = Instant::now();
        for _ in 0..3 {
            assert!(
                timeout(DEFAULT_HEARTBEAT - Duration::from_secs(1), frames.next())
                    .await
                    .is_err(),
                "no frame expected before the heartbeat interval"
            );
            assert_eq!(frames.next().await, Some(Frame::Ping));
            assert_elapsed(since, DEFAULT_HEARTBEAT);
            since = Instant::now();
        }

        handle.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn event_is_written_as_data_and_restarts_heartbeat() {
        let (broker, handle) = Broker::<FeedTopic>::start(&BrokerConfig::default());
        let subscription = broker.subscribe("bob".to_string()).await.unwrap();
        let frames = EventStream::new(subscription, DEFAULT_HEARTBEAT).frames();
        pin_mut!(frames);

        assert!(timeout(Duration::from_secs(10), frames.next())
            .await
            .is_err());

        let item = feed_item("bob");
        broker.publish(item.clone()).await.unwrap();
        assert_eq!(
            frames.next().await,
            Some(Frame::Data(serde_json::to_string(&item).unwrap()))
        );

        let published_at = Instant::now();
        assert_eq!(frames.next().await, Some(Frame::Ping));
        assert_elapsed(published_at, DEFAULT_HEARTBEAT);

        handle.shutdown().await;
    }

    #[tokio::test]
    async fn serialization_failure_is_reported_inline_and_stream_continues() {
        let (broker, handle) = Broker::<BrokenTopic>::start(&BrokerConfig::default());
        let subscription = broker.subscribe(()).await.unwrap();
        let frames = EventStream::new(subscription, DEFAULT_HEARTBEAT).frames();
        pin_mut!(frames);

        broker.publish(Broken).await.unwrap();
        broker.publish(Broken).await.unwrap();

        for _ in 0..2 {
            let frame = timeout(Duration::from_secs(2), frames.next()).await.unwrap();
            assert_eq!(frame, Some(Frame::Error("broken event".to_string())));
        }

        handle.shutdown().await;
    }

    #[tokio::test]
    async fn stream_ends_when_broker_shuts_down() {
        let (broker, handle) = Broker::<FeedTopic>::start(&BrokerConfig::default());
        let subscription = broker.subscribe("bob".to_string()).await.unwrap();
        let frames = EventStream::new(subscription, DEFAULT_HEARTBEAT).frames();
        pin_mut!(frames);

        handle.shutdown().await;

        let frame = timeout(Duration::from_secs(2), frames.next()).await.unwrap();
        assert_eq!(frame, None);
    }

    #[tokio::test]
    async fn dropping_the_body_unsubscribes() {
        let (broker, handle) = Broker::<FeedTopic>::start(&BrokerConfig::default());
        let subscription = broker.subscribe("bob".to_string()).await.unwrap();
        let response = EventStream::new(subscription, DEFAULT_HEARTBEAT).into_response();
        assert_eq!(broker.subscriber_count().await.unwrap(), 1);

        drop(response);

        assert_eq!(broker.subscriber_count().await.unwrap(), 0);
        handle.shutdown().await;
    }

    #[tokio::test]
    async fn response_carries_event_stream_headers() {
        let (broker, handle) = Broker::<FeedTopic>::start(&BrokerConfig::default());
        let subscription = broker.subscribe("bob".to_string()).await.unwrap();

        let response = EventStream::new(subscription, DEFAULT_HEARTBEAT).into_response();
        let headers = response.headers();

        assert_eq!(headers[CONTENT_TYPE], EVENT_STREAM_MIME_TYPE);
        assert_eq!(headers[CACHE_CONTROL], "no-cache");
        assert_eq!(headers[CONNECTION], "keep-alive");

        drop(response);
        handle.shutdown().await;
    }
}
