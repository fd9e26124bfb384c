pub mod notifiers;
pub mod traits;

pub use traits::{HeartbeatStats, NotificationResult, Notifier};
