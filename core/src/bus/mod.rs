pub mod connection;
pub mod hub;

pub use connection::{ConnectionMonitor, ConnectionState};
pub use hub::{SampleBus, Subscription, SubscriptionId};
