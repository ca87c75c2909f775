//! # PicoCoAP Core
//!
//! Pure `no_std` CoAP observe server core library.
//!
//! This library contains the resource tree, observer registry, resource
//! handlers and notification scheduler of a constrained-device CoAP server.
//! It is platform-agnostic and has no async runtime dependencies; message
//! framing and delivery are delegated to a [`MessageExchange`] adapter.
//!
//! ## Features
//!
//! - **no_std** compatible - Fully embedded, no standard library
//! - **Observe** - Subscriptions with scheduled freshness notifications
//! - **Heapless** - All stack/static allocation, no heap usage
//! - **Generic transport** - Works with any message exchange adapter
//! - **Configurable** - Compile-time capacities via const generics
//!
//! ## Limitations
//!
//! - No wire encoding (left to the adapter)
//! - No block-wise transfer
//! - No DTLS

#![cfg_attr(not(test), no_std)]

pub mod config;
pub mod discovery;
pub mod error;
pub mod handler;
pub mod observers;
pub mod protocol;
pub mod resource;
pub mod scheduler;
pub mod server;
pub mod traits;

pub use config::ServerConfig;
pub use error::{ConfigError, ServerError};
pub use observers::{Observer, ObserverHandle, ObserverRegistry};
pub use protocol::{Code, ContentFormat, Message, MessageConfig, MessageType, Remote, Request};
pub use resource::ResourceId;
pub use server::ObserveServer;
pub use traits::{
    Actuator, ExchangeError, MemoryActuator, MessageExchange, MessageHandle, TransmissionStatus,
};

/// Payload capacity of requests and messages
pub const DEFAULT_PAYLOAD_SIZE: usize = 64;

/// Discovery document capacity
pub const DEFAULT_DISCOVERY_SIZE: usize = 100;

/// Observe server with the capacities of a small device: 8 resources,
/// 4 observers, 8 confirmable notifications in flight
pub type DefaultObserveServer<E, A> =
    ObserveServer<E, A, 8, 4, 8, DEFAULT_PAYLOAD_SIZE, DEFAULT_DISCOVERY_SIZE>;
