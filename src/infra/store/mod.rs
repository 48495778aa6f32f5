//! Queue store backends.

pub mod jsonl;
pub mod memory;
#[cfg(feature = "postgres")]
pub mod postgres;

pub use jsonl::JsonlQueueStore;
pub use memory::InMemoryQueueStore;
#[cfg(feature = "postgres")]
pub use postgres::PostgresQueueStore;
