pub mod in_memory;
pub mod notification_repo;

pub use in_memory::InMemoryNotificationStore;
pub use notification_repo::{NotificationStore, PgNotificationStore, StoreError};
