//! Infrastructure adapters for queue stores and host load sampling.

pub mod load;
pub mod store;

pub use load::{FixedLoad, ProcStatSampler};
pub use store::{InMemoryQueueStore, JsonlQueueStore};
#[cfg(feature = "postgres")]
pub use store::PostgresQueueStore;
