#![deny(missing_docs)]
//! # weft-gateway — executor dispatch core
//!
//! Matches a dispatch against connected executors by selector, reserves
//! in-flight capacity atomically, and hands the payload to a pluggable
//! [`ExecutorTransport`]. [`capacity::CapacityLedger`] is the in-process
//! analogue of the atomic capacity-reservation script a Redis-backed
//! deployment would run as a Lua script: one `Mutex`-guarded table,
//! incremented and decremented together.
//!
//! [`Gateway`] implements `weft_engine::GatewayDispatcher`, so a deployment
//! wires this crate in as the engine's dispatch seam; `LocalTransport`
//! plus an in-memory store stands in for a real WebSocket/HTTP transport
//! in this workspace's own tests.

pub mod capacity;
pub mod error;
pub mod gateway;
pub mod model;
pub mod registry;
pub mod transport;

pub use capacity::CapacityLedger;
pub use error::GatewayError;
pub use gateway::{Gateway, GatewayConfig};
pub use model::{ExecutorRoute, Pool, Selector};
pub use registry::ExecutorRegistry;
pub use transport::{ExecutorTransport, LocalTransport};
