use crate::error::Error;
use crate::subscription::{SubscriberId, Subscription};
use crate::topic::Topic;
use log::*;
use std::collections::HashMap;
use std::ops::ControlFlow;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot, Notify};
use tokio::task::JoinHandle;

/// Queue sizes shared by every broker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BrokerConfig {
    /// Events a broker buffers before `publish` starts waiting.
    pub ingress_capacity: usize,
    /// Events buffered per subscriber before the dispatch loop waits on it.
    pub subscriber_buffer: usize,
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self {
            ingress_capacity: 1,
            subscriber_buffer: 1,
        }
    }
}

/// Registry mutations, applied only by the dispatch loop.
pub(crate) enum Control<T: Topic> {
    Subscribe {
        key: T::Key,
        sender: mpsc::Sender<T::Event>,
        registered: oneshot::Sender<SubscriberId>,
    },
    Unsubscribe {
        id: SubscriberId,
    },
    Count {
        reply: oneshot::Sender<usize>,
    },
}

/// Cloneable handle to one topic's dispatch loop.
///
/// All registry reads and writes happen on the dispatch loop: `subscribe` and
/// `unsubscribe` are messages it consumes alongside published events, so no
/// lock guards the registry.
pub struct Broker<T: Topic> {
    ingress: mpsc::Sender<T::Event>,
    control: mpsc::UnboundedSender<Control<T>>,
    subscriber_buffer: usize,
}

impl<T: Topic> Clone for Broker<T> {
    fn clone(&self) -> Self {
        Self {
            ingress: self.ingress.clone(),
            control: self.control.clone(),
            subscriber_buffer: self.subscriber_buffer,
        }
    }
}

impl<T: Topic> Broker<T> {
    /// Spawns the dispatch loop. Must be called from within a tokio runtime.
    pub fn start(config: &BrokerConfig) -> (Self, BrokerHandle) {
        let (ingress_tx, ingress_rx) = mpsc::channel(config.ingress_capacity.max(1));
        let (control_tx, control_rx) = mpsc::unbounded_channel();
        let stop = Arc::new(Notify::new());

        let dispatcher = Dispatcher::<T> {
            registry: HashMap::new(),
            ingress: ingress_rx,
            control: control_rx,
            stop: Arc::clone(&stop),
        };
        let task = tokio::spawn(dispatcher.run());

        let broker = Self {
            ingress: ingress_tx,
            control: control_tx,
            subscriber_buffer: config.subscriber_buffer.max(1),
        };
        let handle = BrokerHandle {
            topic: T::NAME,
            stop,
            task,
        };

        (broker, handle)
    }

    /// Registers a new subscriber for `key`.
    ///
    /// Returns once the dispatch loop has applied the registration, so every
    /// event published afterwards is routed to it.
    pub async fn subscribe(&self, key: T::Key) -> Result<Subscription<T>, Error> {
        let (sender, receiver) = mpsc::channel(self.subscriber_buffer);
        let (registered_tx, registered_rx) = oneshot::channel();

        self.control
            .send(Control::Subscribe {
                key,
                sender,
                registered: registered_tx,
            })
            .map_err(|_| Error::broker_closed(T::NAME))?;

        let id = registered_rx
            .await
            .map_err(|_| Error::broker_closed(T::NAME))?;

        Ok(Subscription::new(id, receiver, self.control.clone()))
    }

    /// Enqueues an event for fan-out.
    ///
    /// Waits while the ingress queue is full; events are never dropped.
    pub async fn publish(&self, event: T::Event) -> Result<(), Error> {
        self.ingress
            .send(event)
            .await
            .map_err(|_| Error::broker_closed(T::NAME))
    }

    /// Number of registered subscribers, after every registry change already
    /// requested has been applied.
    pub async fn subscriber_count(&self) -> Result<usize, Error> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.control
            .send(Control::Count { reply: reply_tx })
            .map_err(|_| Error::broker_closed(T::NAME))?;
        reply_rx.await.map_err(|_| Error::broker_closed(T::NAME))
    }

    pub fn is_closed(&self) -> bool {
        self.ingress.is_closed()
    }
}

/// Owns a broker's dispatch loop task.
pub struct BrokerHandle {
    topic: &'static str,
    stop: Arc<Notify>,
    task: JoinHandle<()>,
}

impl BrokerHandle {
    pub fn topic(&self) -> &'static str {
        self.topic
    }

    /// Stops the dispatch loop and waits for it to exit.
    ///
    /// Every subscriber's channel is closed and the ingress queue is closed;
    /// later calls to `subscribe` or `publish` fail with `BrokerClosed`.
    pub async fn shutdown(self) {
        self.stop.notify_one();
        if let Err(e) = self.task.await {
            error!("{} broker dispatch loop failed: {e}", self.topic);
        }
    }
}

struct Subscriber<T: Topic> {
    key: T::Key,
    sender: mpsc::Sender<T::Event>,
}

struct Dispatcher<T: Topic> {
    registry: HashMap<SubscriberId, Subscriber<T>>,
    ingress: mpsc::Receiver<T::Event>,
    control: mpsc::UnboundedReceiver<Control<T>>,
    stop: Arc<Notify>,
}

impl<T: Topic> Dispatcher<T> {
    async fn run(mut self) {
        info!("Started {} broker", T::NAME);

        loop {
            tokio::select! {
                biased;

                _ = self.stop.notified() => break,

                control = self.control.recv() => match control {
                    Some(control) => self.apply(control),
                    None => break,
                },

                event = self.ingress.recv() => match event {
                    Some(event) => {
                        if self.dispatch(event).await.is_break() {
                            break;
                        }
                    }
                    None => break,
                },
            }
        }

        self.ingress.close();
        let remaining = self.registry.len();
        // Dropping the senders closes every subscriber's channel.
        self.registry.clear();

        info!(
            "Stopped {} broker, closed {remaining} subscriber channel(s)",
            T::NAME
        );
    }

    fn apply(&mut self, control: Control<T>) {
        match control {
            Control::Subscribe {
                key,
                sender,
                registered,
            } => {
                let id = SubscriberId::new();
                // The caller may have given up waiting; its receiver is gone then.
                if registered.send(id.clone()).is_err() {
                    trace!("{} subscriber abandoned before registration", T::NAME);
                    return;
                }
                debug!("Registered {} subscriber {} for {key:?}", T::NAME, id.as_str());
                self.registry.insert(id, Subscriber { key, sender });
            }
            Control::Unsubscribe { id } => {
                if self.registry.remove(&id).is_some() {
                    debug!("Unregistered {} subscriber {}", T::NAME, id.as_str());
                }
            }
            Control::Count { reply } => {
                let _ = reply.send(self.registry.len());
            }
        }
    }

    /// Sends `event` to every matching subscriber, one after another.
    ///
    /// A subscriber whose buffer is full holds up the remaining subscribers
    /// until it reads. A subscriber whose receiver is gone fails immediately
    /// and is removed. A stop request interrupts a held-up send and breaks
    /// out of the loop.
    async fn dispatch(&mut self, event: T::Event) -> ControlFlow<()> {
        let mut delivered = 0usize;
        let mut closed = Vec::new();
        let mut flow = ControlFlow::Continue(());

        for (id, subscriber) in self.registry.iter() {
            if !T::matches(&subscriber.key, &event) {
                continue;
            }
            tokio::select! {
                biased;

                _ = self.stop.notified() => {
                    warn!(
                        "{} broker stopped while subscriber {} was not reading",
                        T::NAME,
                        id.as_str()
                    );
                    flow = ControlFlow::Break(());
                    break;
                }

                sent = subscriber.sender.send(event.clone()) => match sent {
                    Ok(()) => delivered += 1,
                    Err(_) => closed.push(id.clone()),
                },
            }
        }

        for id in closed {
            debug!(
                "Removing {} subscriber {} with a closed channel",
                T::NAME,
                id.as_str()
            );
            self.registry.remove(&id);
        }

        trace!("Dispatched {} event to {delivered} subscriber(s)", T::NAME);
        flow
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SseErrorKind;
    use std::time::Duration;
    use tokio::time::timeout;

    const WAIT: Duration = Duration::from_secs(2);

    /// Events are (recipient, sequence number).
    struct TestTopic;

    impl Topic for TestTopic {
        type Event = (String, u32);
        type Key = String;

        const NAME: &'static str = "test";

        fn matches(key: &String, event: &(String, u32)) -> bool {
            *key == event.0
        }
    }

    fn event(recipient: &str, seq: u32) -> (String, u32) {
        (recipient.to_string(), seq)
    }

    async fn next(subscription: &mut Subscription<TestTopic>) -> Option<(String, u32)> {
        timeout(WAIT, subscription.recv())
            .await
            .expect("timed out waiting for an event")
    }

    #[tokio::test]
    async fn subscriber_receives_event_published_after_subscribing() {
        let (broker, handle) = Broker::<TestTopic>::start(&BrokerConfig::default());
        let mut alice = broker.subscribe("alice".to_string()).await.unwrap();

        broker.publish(event("alice", 1)).await.unwrap();

        assert_eq!(next(&mut alice).await, Some(event("alice", 1)));
        handle.shutdown().await;
    }

    #[tokio::test]
    async fn events_are_delivered_in_publish_order() {
        let (broker, handle) = Broker::<TestTopic>::start(&BrokerConfig::default());
        let mut alice = broker.subscribe("alice".to_string()).await.unwrap();

        let publisher = broker.clone();
        let publishing = tokio::spawn(async move {
            for seq in 0..50 {
                publisher.publish(event("alice", seq)).await.unwrap();
            }
        });

        for seq in 0..50 {
            assert_eq!(next(&mut alice).await, Some(event("alice", seq)));
        }
        publishing.await.unwrap();
        handle.shutdown().await;
    }

    #[tokio::test]
    async fn every_matching_subscriber_gets_exactly_one_copy() {
        let (broker, handle) = Broker::<TestTopic>::start(&BrokerConfig::default());
        let mut first_tab = broker.subscribe("alice".to_string()).await.unwrap();
        let mut second_tab = broker.subscribe("alice".to_string()).await.unwrap();
        let mut bob = broker.subscribe("bob".to_string()).await.unwrap();

        broker.publish(event("alice", 1)).await.unwrap();
        broker.publish(event("bob", 2)).await.unwrap();

        assert_eq!(next(&mut first_tab).await, Some(event("alice", 1)));
        assert_eq!(next(&mut second_tab).await, Some(event("alice", 1)));
        assert_eq!(next(&mut bob).await, Some(event("bob", 2)));

        // Nothing else is pending for alice's subscriptions.
        assert!(timeout(Duration::from_millis(50), first_tab.recv())
            .await
            .is_err());
        assert!(timeout(Duration::from_millis(50), second_tab.recv())
            .await
            .is_err());
        handle.shutdown().await;
    }

    #[tokio::test]
    async fn unsubscribe_stops_delivery_and_is_idempotent() {
        let (broker, handle) = Broker::<TestTopic>::start(&BrokerConfig::default());
        let mut alice = broker.subscribe("alice".to_string()).await.unwrap();
        let mut bob = broker.subscribe("bob".to_string()).await.unwrap();

        alice.unsubscribe();
        alice.unsubscribe();
        assert!(!alice.is_active());

        // Delivery to alice must fail fast rather than stall the loop for bob.
        for seq in 0..3 {
            broker.publish(event("alice", seq)).await.unwrap();
        }
        broker.publish(event("bob", 9)).await.unwrap();

        assert_eq!(next(&mut bob).await, Some(event("bob", 9)));
        assert_eq!(alice.recv().await, None);
        assert_eq!(broker.subscriber_count().await.unwrap(), 1);
        handle.shutdown().await;
    }

    #[tokio::test]
    async fn dropping_a_subscription_unregisters_it() {
        let (broker, handle) = Broker::<TestTopic>::start(&BrokerConfig::default());
        let alice = broker.subscribe("alice".to_string()).await.unwrap();
        assert_eq!(broker.subscriber_count().await.unwrap(), 1);

        drop(alice);

        assert_eq!(broker.subscriber_count().await.unwrap(), 0);
        handle.shutdown().await;
    }

    #[tokio::test]
    async fn full_queues_apply_backpressure_without_losing_events() {
        let (broker, handle) = Broker::<TestTopic>::start(&BrokerConfig::default());
        let mut alice = broker.subscribe("alice".to_string()).await.unwrap();

        // One event in alice's buffer, one held by the loop, one in ingress.
        for seq in 1..=3 {
            broker.publish(event("alice", seq)).await.unwrap();
        }
        assert!(
            timeout(Duration::from_millis(100), broker.publish(event("alice", 4)))
                .await
                .is_err(),
            "publish should wait while every queue is full"
        );

        for seq in 1..=3 {
            assert_eq!(next(&mut alice).await, Some(event("alice", seq)));
        }
        broker.publish(event("alice", 4)).await.unwrap();
        assert_eq!(next(&mut alice).await, Some(event("alice", 4)));
        handle.shutdown().await;
    }

    #[tokio::test]
    async fn shutdown_closes_subscribers_and_rejects_new_work() {
        let (broker, handle) = Broker::<TestTopic>::start(&BrokerConfig::default());
        let mut alice = broker.subscribe("alice".to_string()).await.unwrap();

        handle.shutdown().await;

        assert_eq!(next(&mut alice).await, None);
        assert!(broker.is_closed());
        assert_eq!(
            broker.publish(event("alice", 1)).await.unwrap_err().error_kind,
            SseErrorKind::BrokerClosed
        );
        assert_eq!(
            broker
                .subscribe("alice".to_string())
                .await
                .err()
                .map(|e| e.error_kind),
            Some(SseErrorKind::BrokerClosed)
        );
    }

    #[tokio::test]
    async fn shutdown_completes_while_a_subscriber_is_not_reading() {
        let (broker, handle) = Broker::<TestTopic>::start(&BrokerConfig::default());
        let mut alice = broker.subscribe("alice".to_string()).await.unwrap();

        // 1 fills alice's buffer, the loop holds 2, 3 waits in ingress.
        for seq in 1..=3 {
            broker.publish(event("alice", seq)).await.unwrap();
        }

        timeout(WAIT, handle.shutdown())
            .await
            .expect("shutdown waited on a subscriber that never reads");

        assert_eq!(next(&mut alice).await, Some(event("alice", 1)));
        assert_eq!(next(&mut alice).await, None);
        assert!(broker.is_closed());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_subscribers_and_publishers_leave_no_stale_entries() {
        let (broker, handle) = Broker::<TestTopic>::start(&BrokerConfig::default());

        let mut publishers = Vec::new();
        for publisher in 0..4 {
            let broker = broker.clone();
            publishers.push(tokio::spawn(async move {
                for seq in 0..200 {
                    let recipient = format!("user-{}", (publisher + seq) % 10);
                    broker.publish((recipient, seq)).await.unwrap();
                }
            }));
        }

        let mut connections = Vec::new();
        for connection in 0..40 {
            let broker = broker.clone();
            connections.push(tokio::spawn(async move {
                for round in 0..20 {
                    let user = format!("user-{}", (connection + round) % 10);
                    let mut subscription = broker.subscribe(user.clone()).await.unwrap();
                    if round % 2 == 0 {
                        if let Ok(Some(received)) =
                            timeout(Duration::from_millis(5), subscription.recv()).await
                        {
                            assert_eq!(received.0, user);
                        }
                        subscription.unsubscribe();
                    }
                    // Odd rounds just drop the subscription.
                }
            }));
        }

        for task in connections {
            task.await.unwrap();
        }
        for task in publishers {
            task.await.unwrap();
        }

        assert_eq!(broker.subscriber_count().await.unwrap(), 0);

        let mut late = broker.subscribe("user-3".to_string()).await.unwrap();
        broker.publish(event("user-3", 1000)).await.unwrap();
        assert_eq!(next(&mut late).await, Some(event("user-3", 1000)));
        handle.shutdown().await;
    }
}
