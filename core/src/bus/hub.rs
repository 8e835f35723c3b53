use log::debug;
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tokio::sync::mpsc::{self, error::TrySendError};

pub const DEFAULT_CAPACITY: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(u64);

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "viewer-{}", self.0)
    }
}

#[derive(Debug)]
pub struct Subscription<E> {
    id: SubscriptionId,
    receiver: mpsc::Receiver<E>,
}

impl<E> Subscription<E> {
    pub fn id(&self) -> SubscriptionId {
        self.id
    }

    pub async fn recv(&mut self) -> Option<E> {
        self.receiver.recv().await
    }

    pub fn try_recv(&mut self) -> Option<E> {
        self.receiver.try_recv().ok()
    }
}

struct Subscribers<E> {
    next_id: u64,
    senders: HashMap<SubscriptionId, mpsc::Sender<E>>,
}

/// Fan-out to bounded per-consumer queues. A full queue drops the event for
/// that consumer only; publishing works on a snapshot of the subscriber set.
pub struct SampleBus<E> {
    inner: Arc<RwLock<Subscribers<E>>>,
    capacity: usize,
}

impl<E> Clone for SampleBus<E> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
            capacity: self.capacity,
        }
    }
}

impl<E: Clone> SampleBus<E> {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            inner: Arc::new(RwLock::new(Subscribers {
                next_id: 1,
                senders: HashMap::new(),
            })),
            capacity: capacity.max(1),
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, Subscribers<E>> {
        self.inner.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, Subscribers<E>> {
        self.inner
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn subscribe(&self) -> Subscription<E> {
        let (sender, receiver) = mpsc::channel(self.capacity);
        let mut subscribers = self.write();
        let id = SubscriptionId(subscribers.next_id);
        subscribers.next_id += 1;
        subscribers.senders.insert(id, sender);
        debug!("{} subscribed", id);
        Subscription { id, receiver }
    }

    pub fn unsubscribe(&self, subscription: Subscription<E>) {
        let Subscription { id, mut receiver } = subscription;
        self.write().senders.remove(&id);
        // Nothing racing this call is observed once the handle is consumed.
        receiver.close();
        debug!("{} unsubscribed", id);
    }

    pub fn publish(&self, event: E) -> usize {
        let snapshot: Vec<(SubscriptionId, mpsc::Sender<E>)> = self
            .read()
            .senders
            .iter()
            .map(|(id, sender)| (*id, sender.clone()))
            .collect();

        let mut delivered = 0;
        let mut closed = Vec::new();
        for (id, sender) in snapshot {
            match sender.try_send(event.clone()) {
                Ok(()) => delivered += 1,
                Err(TrySendError::Full(_)) => debug!("{} lagging, event dropped", id),
                Err(TrySendError::Closed(_)) => closed.push(id),
            }
        }

        if !closed.is_empty() {
            let mut subscribers = self.write();
            for id in closed {
                subscribers.senders.remove(&id);
                debug!("{} went away, pruned", id);
            }
        }
        delivered
    }

    pub fn subscriber_count(&self) -> usize {
        self.read().senders.len()
    }
}

impl<E: Clone> Default for SampleBus<E> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn each_subscriber_sees_publish_order() {
        let bus = SampleBus::new();
        let mut first = bus.subscribe();
        let mut second = bus.subscribe();

        for value in 1..=3 {
            assert_eq!(bus.publish(value), 2);
        }

        for sub in [&mut first, &mut second] {
            let seen: Vec<i32> = std::iter::from_fn(|| sub.try_recv()).collect();
            assert_eq!(seen, vec![1, 2, 3]);
        }
    }

    #[test]
    fn late_subscriber_gets_no_replay() {
        let bus = SampleBus::new();
        bus.publish(1);
        let mut late = bus.subscribe();
        assert_eq!(late.try_recv(), None);
        bus.publish(2);
        assert_eq!(late.try_recv(), Some(2));
    }

    #[test]
    fn unsubscribe_removes_consumer() {
        let bus = SampleBus::new();
        let sub = bus.subscribe();
        let other = bus.subscribe();
        assert_ne!(sub.id(), other.id());
        bus.unsubscribe(sub);
        assert_eq!(bus.subscriber_count(), 1);
        assert_eq!(bus.publish(7), 1);
    }

    #[test]
    fn slow_consumer_drops_instead_of_blocking() {
        let bus = SampleBus::with_capacity(2);
        let mut slow = bus.subscribe();
        assert_eq!(bus.publish(1), 1);
        assert_eq!(bus.publish(2), 1);
        assert_eq!(bus.publish(3), 0);
        assert_eq!(slow.try_recv(), Some(1));
        assert_eq!(slow.try_recv(), Some(2));
        assert_eq!(slow.try_recv(), None);
    }

    #[test]
    fn dropped_subscription_is_pruned_on_publish() {
        let bus = SampleBus::new();
        drop(bus.subscribe());
        assert_eq!(bus.subscriber_count(), 1);
        assert_eq!(bus.publish(1), 0);
        assert_eq!(bus.subscriber_count(), 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn unsubscribe_during_concurrent_publish_stops_delivery() {
        let bus: SampleBus<u32> = SampleBus::with_capacity(1024);
        let mut sub = bus.subscribe();
        let producer = bus.clone();
        let handle = tokio::spawn(async move {
            for value in 0..500 {
                producer.publish(value);
                tokio::task::yield_now().await;
            }
        });

        let mut last = None;
        while let Some(value) = sub.recv().await {
            if let Some(prev) = last {
                assert!(value > prev);
            }
            last = Some(value);
            if value >= 10 {
                break;
            }
        }
        bus.unsubscribe(sub);
        handle.await.unwrap();
        assert_eq!(bus.subscriber_count(), 0);
    }
}
