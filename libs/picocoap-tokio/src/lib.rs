//! # PicoCoAP Tokio
//!
//! Tokio runtime support for PicoCoAP.
//!
//! This crate runs a `picocoap-core` observe server inside a tokio event loop
//! and connects it to the outside world through channels: requests and
//! delivery reports go in, [`OutboundMessage`]s come out. It re-exports all
//! types from `picocoap-core` for convenience.
//!
//! ## Example
//!
//! ```no_run
//! use picocoap_tokio::{DefaultTokioObserveServer, ServerConfig, SharedLight, TokioServerConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
//!     let (server, handle, mut outbound) = DefaultTokioObserveServer::new(
//!         SharedLight::default(),
//!         ServerConfig::default(),
//!         TokioServerConfig::default(),
//!     )?;
//!     tokio::spawn(async move {
//!         while let Some(message) = outbound.recv().await {
//!             println!("{:?}", message);
//!         }
//!     });
//!     let _handle = handle;
//!     server.run().await
//! }
//! ```

pub mod exchange;
pub mod server;
pub mod state;

// Re-export core for convenience
pub use picocoap_core::*;

pub use exchange::{ChannelExchange, OutboundMessage};
pub use server::{ServerHandle, TokioObserveServer, TokioServerConfig, TransmissionReport};
pub use state::{MessageIdGenerator, SharedLight};

/// Default server: 8 resources, 4 observers, 8 confirmable notifications in
/// flight, 64 byte payloads, 100 byte discovery document
pub type DefaultTokioObserveServer<A> =
    TokioObserveServer<A, 8, 4, 8, DEFAULT_PAYLOAD_SIZE, DEFAULT_DISCOVERY_SIZE>;

