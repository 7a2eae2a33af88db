//! Reconciliation of locally-tracked pending rollup operations against L1
//! transaction state and the coordinator's finality oracle.
//!
//! The engine cross-references the persistent pending-operation store with
//! the chain and coordinator on a schedule, removing entities that reached a
//! terminal state (canceled, expected to fail, reverted, or confirmed final)
//! and mirroring every mutation into the UI-facing projected state.

pub mod backoff;
pub mod deposit_event;
pub mod engine;
pub mod projector;
pub mod session;

pub use engine::{PassOutcome, Reconciler, SessionContext};
pub use projector::{ProjectedState, StateProjector};
pub use session::Session;
