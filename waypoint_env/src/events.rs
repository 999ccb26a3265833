//! Scoped event subscriptions.
//!
//! Observers register on an [`EventBus`] and receive a [`Subscription`].
//! Registration lasts exactly as long as the subscription value: dropping
//! it deregisters, so a torn-down observer can never be called back.
//!
//! Events travel over channels, never through shared state. Publishing
//! does not block and does not run observer code.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, Weak};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tracing::trace;

struct Registry<E> {
    next_id: u64,
    subscribers: HashMap<u64, UnboundedSender<E>>,
}

/// Fan-out of events to every live subscription.
pub struct EventBus<E> {
    registry: Arc<Mutex<Registry<E>>>,
}

impl<E: Clone> EventBus<E> {
    /// Creates a bus with no subscribers.
    pub fn new() -> Self {
        Self {
            registry: Arc::new(Mutex::new(Registry {
                next_id: 0,
                subscribers: HashMap::new(),
            })),
        }
    }
    
    /// Registers a new observer.
    pub fn subscribe(&self) -> Subscription<E> {
        let (tx, rx) = mpsc::unbounded_channel();
        let id = match self.registry.lock() {
            Ok(mut registry) => {
                let id = registry.next_id;
                registry.next_id += 1;
                registry.subscribers.insert(id, tx);
                id
            }
            // A poisoned registry hands out a subscription that never fires
            Err(_) => u64::MAX,
        };
        
        Subscription {
            id,
            registry: Arc::downgrade(&self.registry),
            rx,
        }
    }
    
    /// Delivers `event` to every subscriber.
    ///
    /// Returns how many subscribers it was delivered to.
    pub fn publish(&self, event: E) -> usize {
        let Ok(mut registry) = self.registry.lock() else {
            return 0;
        };
        
        registry.subscribers.retain(|_, tx| !tx.is_closed());
        for tx in registry.subscribers.values() {
            // Receiver closed between retain and send; pruned next publish
            let _ = tx.send(event.clone());
        }
        
        let delivered = registry.subscribers.len();
        trace!(delivered, "event published");
        delivered
    }
    
    /// Number of live subscriptions.
    pub fn subscriber_count(&self) -> usize {
        self.registry
            .lock()
            .map(|r| r.subscribers.len())
            .unwrap_or(0)
    }
}

impl<E: Clone> Default for EventBus<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> Clone for EventBus<E> {
    fn clone(&self) -> Self {
        Self {
            registry: Arc::clone(&self.registry),
        }
    }
}

/// A live registration on an [`EventBus`].
pub struct Subscription<E> {
    id: u64,
    registry: Weak<Mutex<Registry<E>>>,
    rx: UnboundedReceiver<E>,
}

impl<E> Subscription<E> {
    /// Returns the next pending event without waiting.
    pub fn try_next(&mut self) -> Option<E> {
        self.rx.try_recv().ok()
    }
    
    /// Takes every pending event.
    pub fn drain(&mut self) -> Vec<E> {
        let mut events = Vec::new();
        while let Ok(event) = self.rx.try_recv() {
            events.push(event);
        }
        events
    }
    
    /// Waits for the next event.
    ///
    /// Returns `None` once the bus has been dropped and the queue is empty.
    pub async fn recv(&mut self) -> Option<E> {
        self.rx.recv().await
    }
}

impl<E> Drop for Subscription<E> {
    fn drop(&mut self) {
        if let Some(registry) = self.registry.upgrade() {
            if let Ok(mut registry) = registry.lock() {
                registry.subscribers.remove(&self.id);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    
    #[test]
    fn test_every_subscriber_receives() {
        let bus = EventBus::new();
        let mut a = bus.subscribe();
        let mut b = bus.subscribe();
        
        assert_eq!(bus.publish(7u32), 2);
        assert_eq!(a.try_next(), Some(7));
        assert_eq!(b.try_next(), Some(7));
        assert_eq!(a.try_next(), None);
    }
    
    #[test]
    fn test_drop_deregisters() {
        let bus = EventBus::new();
        let a = bus.subscribe();
        let mut b = bus.subscribe();
        assert_eq!(bus.subscriber_count(), 2);
        
        drop(a);
        assert_eq!(bus.subscriber_count(), 1);
        assert_eq!(bus.publish("hello"), 1);
        assert_eq!(b.drain(), vec!["hello"]);
    }
    
    #[test]
    fn test_subscription_outliving_bus() {
        let bus = EventBus::new();
        let mut sub = bus.subscribe();
        bus.publish(1u8);
        drop(bus);
        
        // Queued events survive; dropping afterwards must not panic
        assert_eq!(sub.drain(), vec![1]);
        drop(sub);
    }
    
    #[test]
    fn test_order_preserved() {
        let bus = EventBus::new();
        let mut sub = bus.subscribe();
        for i in 0..5u32 {
            bus.publish(i);
        }
        assert_eq!(sub.drain(), vec![0, 1, 2, 3, 4]);
    }
    
    #[tokio::test]
    async fn test_recv_waits_then_ends_with_bus() {
        let bus = EventBus::new();
        let mut sub = bus.subscribe();
        
        let publisher = bus.clone();
        let task = tokio::spawn(async move {
            publisher.publish("saved");
        });
        
        assert_eq!(sub.recv().await, Some("saved"));
        task.await.unwrap();
        drop(bus);
        assert_eq!(sub.recv().await, None);
    }
}
