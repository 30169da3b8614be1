//! Order persistence.
//!
//! Orders are stored as records keyed by a store-assigned [`OrderId`]; every
//! order owns an append-only history, and one counter row per calendar year
//! backs order-number allocation. Two implementations share the
//! [`OrderStore`] trait: [`InMemoryOrderStore`] and [`PostgresOrderStore`].

pub mod error;
pub mod memory;
pub mod postgres;
pub mod query;
pub mod record;
pub mod store;

pub use common::{CustomerId, HistoryEntryId, OrderId, OrderNumber};
pub use error::{Result, StoreError};
pub use memory::InMemoryOrderStore;
pub use postgres::PostgresOrderStore;
pub use query::OrderQuery;
pub use record::{HistoryRecord, NewHistory, NewOrder, StoredOrder, Version};
pub use store::{OrderStore, OrderStoreExt};
