//! Durable storage for locally-initiated, not-yet-finalized rollup
//! operations. One JSON document per entity kind, partitioned by chain id
//! and wallet address. Survives reloads; the reconciliation engine is the
//! only writer.

mod local_store;

pub use local_store::LocalStore;
