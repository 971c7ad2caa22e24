//! Storage adapters.

pub mod memory;
#[cfg(feature = "postgres")]
pub mod postgres;

pub use memory::InMemoryStatusStore;
#[cfg(feature = "postgres")]
pub use postgres::PostgresStatusStore;
