//! Message relay for ollacord
//!
//! This crate turns inbound chat events into model replies: it records the
//! conversation in the history store, builds the prompt, calls the inference
//! backend and sends the reply back in platform-sized chunks.

pub mod chunk;
pub mod context;
pub mod relay;

pub use chunk::chunk_text;
pub use context::ContextBuilder;
pub use relay::{Relay, RelayError, RelayOutcome};
