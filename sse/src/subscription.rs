use crate::broker::Control;
use crate::topic::Topic;
use log::*;
use tokio::sync::mpsc::{Receiver, UnboundedSender};

/// Unique identifier for a subscriber (server-generated)
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SubscriberId(String);

impl SubscriberId {
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for SubscriberId {
    fn default() -> Self {
        Self::new()
    }
}

/// A live registration with a broker.
///
/// Couples the subscriber's delivery channel with its cleanup. Dropping the
/// subscription unsubscribes it, so a streaming connection releases its
/// registration on every exit path.
pub struct Subscription<T: Topic> {
    id: SubscriberId,
    receiver: Receiver<T::Event>,
    control: UnboundedSender<Control<T>>,
    active: bool,
}

impl<T: Topic> Subscription<T> {
    pub(crate) fn new(
        id: SubscriberId,
        receiver: Receiver<T::Event>,
        control: UnboundedSender<Control<T>>,
    ) -> Self {
        Self {
            id,
            receiver,
            control,
            active: true,
        }
    }

    pub fn id(&self) -> &SubscriberId {
        &self.id
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Waits for the next event routed to this subscriber.
    ///
    /// Returns `None` once the subscription has been cancelled or the broker
    /// has shut down. Cancel safe.
    pub async fn recv(&mut self) -> Option<T::Event> {
        if !self.active {
            return None;
        }
        self.receiver.recv().await
    }

    /// Stops delivery and removes the subscriber from the broker's registry.
    ///
    /// The delivery channel is closed before this returns, so any later
    /// delivery attempt by the dispatch loop fails immediately. Calling this
    /// more than once is a no-op.
    pub fn unsubscribe(&mut self) {
        if !self.active {
            return;
        }
        self.active = false;
        self.receiver.close();

        if self
            .control
            .send(Control::Unsubscribe {
                id: self.id.clone(),
            })
            .is_err()
        {
            trace!(
                "{} broker already stopped, nothing to unregister for {}",
                T::NAME,
                self.id.as_str()
            );
        }

        debug!(
            "Unsubscribed {} subscriber {}",
            T::NAME,
            self.id.as_str()
        );
    }
}

impl<T: Topic> Drop for Subscription<T> {
    fn drop(&mut self) {
        self.unsubscribe();
    }
}
