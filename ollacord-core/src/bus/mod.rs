//! Message events exchanged between chat platforms and the relay
//!
//! Platform handlers turn their native events into [`InboundMessage`]s and
//! deliver replies through a [`MessageSink`].

pub mod events;
pub mod identity;
pub mod sink;

pub use events::{InboundMessage, OutboundMessage};
pub use identity::SelfIdentity;
pub use sink::MessageSink;
