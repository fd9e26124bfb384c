pub mod notifier;

pub use notifier::{HeartbeatStats, NotificationResult, Notifier};
