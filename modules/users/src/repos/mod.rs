pub mod in_memory;
pub mod user_repo;

pub use in_memory::InMemoryUserStore;
pub use user_repo::{PgUserStore, StoreError, UserStore};
