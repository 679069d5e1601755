//! Wire protocol between orchestrator and tool provider
//!
//! JSON-RPC 2.0 messages in `Content-Length` frames over a duplex byte
//! stream.
//!
//! - [`transport`]: framing and the child-process transport
//! - [`messages`]: envelopes, method names, error codes
//! - [`client`]: [`ClientSession`], the orchestrator's end
//! - [`server`]: [`ProviderServer`], the provider's end

pub mod client;
pub mod error;
pub mod messages;
pub mod server;
pub mod transport;

pub use client::ClientSession;
pub use error::ProtocolError;
pub use server::ProviderServer;
pub use transport::{ProviderCommand, Transport};
