//! Core evidence model for the financial agent workspace
//!
//! This crate defines the types every agent and the retrieval layer share:
//! the `Source` evidence item, the `Evidence` outcome of a retrieval call,
//! agent outputs, the per-request `Context`, and the `Agent` trait.

pub mod agent;
pub mod context;
pub mod error;
pub mod source;

pub use agent::{Agent, AgentOutput};
pub use context::Context;
pub use error::{Error, Result};
pub use source::{Evidence, Provenance, Source, UNCERTAINTY_PHRASE};
