#![deny(missing_docs)]
//! # weft-agent — ReAct-style agent loop
//!
//! A bounded conversation between an [`weft_llm::LlmProvider`] and a
//! [`weft_tool::ToolRegistry`], arbitrated through a JSON envelope
//! (`{"type":"final",...}` / `{"type":"tool_call",...}`) rather than a
//! provider's native tool-calling channel, so every backend looks the same
//! from here.
//!
//! [`AgentRunState`] is the resumable checkpoint: a node driving
//! `agent.run` persists it opaquely (this crate is the only thing that
//! interprets the blob) and resumes the same loop after a tool call that
//! suspended on a remote executor, by supplying the matching
//! [`PendingRemoteResult`].

pub mod config;
pub mod credits;
pub mod envelope;
pub mod error;
pub mod remote;
pub mod run;
pub mod state;

pub use config::{AgentLoopConfig, AgentLoopLimits, OutputMode, TeamConfig, TeammateConfig};
pub use credits::{credits_for_tokens, CreditError, CreditLedger, InMemoryCreditLedger};
pub use envelope::AgentEnvelope;
pub use error::AgentError;
pub use remote::{PendingRemoteResult, RemoteResultStatus};
pub use run::{AgentLoop, AgentOutcome};
pub use state::{AgentRunState, PendingToolCall};
