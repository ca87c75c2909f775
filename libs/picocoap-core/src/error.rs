//! Error types for picocoap
//!
//! no_std compatible error handling

use crate::protocol::message::MessageError;
use crate::traits::ExchangeError;

/// Startup errors. Any of these aborts server construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ConfigError {
    /// Resource tree has no free slot left
    MaxResourcesReached { max_resources: usize },

    /// Parent id does not name a registered resource
    UnknownParent { parent: u8 },

    /// Resource name is empty or contains a path separator
    InvalidResourceName,

    /// Resource name longer than a single path segment may be
    ResourceNameTooLong {
        max_length: usize,
        actual_length: usize,
    },

    /// A sibling with the same name is already registered
    DuplicateResource,

    /// Discovery document does not fit its buffer
    DiscoveryDocumentTooLarge { capacity: usize },

    /// Notify margin must be smaller than max-age
    InvalidFreshness { max_age: u32, notify_margin: u32 },

    /// Reliable cadence of zero would never send a confirmable notification
    InvalidReliableCadence,
}

impl core::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            ConfigError::MaxResourcesReached { max_resources } => {
                write!(f, "Maximum number of resources reached: max {}", max_resources)
            }
            ConfigError::UnknownParent { parent } => {
                write!(f, "Unknown parent resource: {}", parent)
            }
            ConfigError::InvalidResourceName => write!(f, "Invalid resource name"),
            ConfigError::ResourceNameTooLong {
                max_length,
                actual_length,
            } => {
                write!(
                    f,
                    "Resource name too long: length {}, max {}",
                    actual_length, max_length
                )
            }
            ConfigError::DuplicateResource => write!(f, "Resource already registered"),
            ConfigError::DiscoveryDocumentTooLarge { capacity } => {
                write!(
                    f,
                    "Discovery document exceeds buffer of {} bytes",
                    capacity
                )
            }
            ConfigError::InvalidFreshness {
                max_age,
                notify_margin,
            } => {
                write!(
                    f,
                    "Notify margin {} must be below max-age {}",
                    notify_margin, max_age
                )
            }
            ConfigError::InvalidReliableCadence => {
                write!(f, "Reliable notification cadence must be non-zero")
            }
        }
    }
}

impl core::error::Error for ConfigError {}

/// Runtime errors surfaced by the server context
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ServerError {
    /// Observer table is full
    MaxObserversReached { max_observers: usize },

    /// Handle does not refer to a live subscription
    ObserverNotFound,

    /// Pending confirmable table is full
    MaxPendingReached { max_pending: usize },

    /// Outgoing message could not be assembled
    Message(MessageError),

    /// Message exchange adapter failed
    Exchange(ExchangeError),
}

impl core::fmt::Display for ServerError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            ServerError::MaxObserversReached { max_observers } => {
                write!(f, "Maximum number of observers reached: max {}", max_observers)
            }
            ServerError::ObserverNotFound => write!(f, "Observer not found"),
            ServerError::MaxPendingReached { max_pending } => {
                write!(
                    f,
                    "Maximum number of pending notifications reached: max {}",
                    max_pending
                )
            }
            ServerError::Message(error) => write!(f, "Message error: {}", error),
            ServerError::Exchange(error) => write!(f, "Exchange error: {}", error),
        }
    }
}

impl core::error::Error for ServerError {}

impl From<ExchangeError> for ServerError {
    fn from(error: ExchangeError) -> Self {
        ServerError::Exchange(error)
    }
}

impl From<MessageError> for ServerError {
    fn from(error: MessageError) -> Self {
        ServerError::Message(error)
    }
}
