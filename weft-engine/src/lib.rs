#![deny(missing_docs)]
//! # weft-engine — run state machine, node executor registry, graph interpreter
//!
//! Three collaborating pieces:
//!
//! - [`interpreter`] — pure graph-evaluation state: the execution frontier,
//!   condition branch-skip propagation, and `parallel.join` fan-in, as a
//!   function of `(graph, cursor)` alone.
//! - [`node`] — the [`node::NodeExecutor`] trait and the registry of
//!   built-in executors (`http.request`, `condition`, `parallel.join`,
//!   `connector.action`, `agent.execute`, `agent.run`), generalizing the
//!   teacher's two-way operator contract into a three-way one that can also
//!   suspend on a remote result.
//! - [`run`] — [`run::Engine`], the state machine that claims a run off the
//!   work queue, walks the frontier one slice at a time using the
//!   interpreter and the registry, and checkpoints after every node.
//!
//! [`dispatch`] is the seam to the gateway; [`continuation`] resumes runs
//! once a gateway dispatch resolves.

pub mod config;
pub mod continuation;
pub mod dispatch;
pub mod error;
pub mod interpreter;
pub mod node;
pub mod run;

pub use config::EngineConfig;
pub use continuation::ContinuationPoller;
pub use dispatch::{DispatchResult, GatewayDispatcher};
pub use error::EngineError;
pub use interpreter::{BlockedNode, JoinMode, ResolvedRemoteResult, RunCursor};
pub use node::{ExecutionInput, NodeExecutor, NodeRegistry, NodeResult, ResultEnvelope};
pub use run::{graph_for, Engine, StepOutcome};
