#![deny(missing_docs)]
//! # weft-llm — provider-agnostic completion types
//!
//! Defines the [`LlmProvider`] trait and the flat `Message`/
//! `CompletionRequest`/`CompletionResponse` wire types every backend
//! (`weft-provider-anthropic`, `weft-provider-openai`,
//! `weft-provider-google`) converts to and from.

pub mod context;
pub mod provider;
pub mod types;

pub use context::{ContextStrategy, NoCompaction, SlidingWindow};
pub use provider::{LlmProvider, ProviderError};
pub use types::*;
