use crate::protocol::message::{Message, MessageConfig};

/// Identifies one sent message until the adapter reports its outcome
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct MessageHandle(pub u32);

impl core::fmt::Display for MessageHandle {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Final outcome of a confirmable message, reported by the adapter after its
/// own retransmissions are exhausted or answered
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TransmissionStatus {
    /// Peer acknowledged
    Ok,
    /// Peer answered with a Reset
    ResetByPeer,
    /// No acknowledgement before the retransmission budget ran out
    Timeout,
}

impl TransmissionStatus {
    pub const fn is_failure(self) -> bool {
        !matches!(self, TransmissionStatus::Ok)
    }
}

/// Message exchange error enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ExchangeError {
    /// No message buffer available
    NoMemory,
    /// Message has no remote endpoint
    MissingRemote,
    /// Transport refused the message
    SendFailed,
    /// Transport is gone
    Closed,
}

impl core::fmt::Display for ExchangeError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            ExchangeError::NoMemory => write!(f, "No message buffer available"),
            ExchangeError::MissingRemote => write!(f, "Message has no remote endpoint"),
            ExchangeError::SendFailed => write!(f, "Transport refused the message"),
            ExchangeError::Closed => write!(f, "Transport closed"),
        }
    }
}

impl core::error::Error for ExchangeError {}

/// Message exchange adapter
///
/// Owns message buffers, wire encoding, retransmission of confirmable
/// messages and delivery. Outcomes of confirmable messages are handed back to
/// the server through `ObserveServer::handle_transmission_result`, from the
/// same event loop that drives requests and ticks.
pub trait MessageExchange<const MAX_PAYLOAD_SIZE: usize> {
    /// Allocate a message
    fn new_message(
        &mut self,
        config: MessageConfig,
    ) -> Result<Message<MAX_PAYLOAD_SIZE>, ExchangeError>;

    /// Queue a message for delivery. Never blocks.
    fn send(&mut self, message: &Message<MAX_PAYLOAD_SIZE>) -> Result<MessageHandle, ExchangeError>;

    /// Give the message buffer back
    fn release(&mut self, message: Message<MAX_PAYLOAD_SIZE>);
}

/// On/off actuator backing the light resource
pub trait Actuator {
    fn is_on(&self) -> bool;

    fn set(&mut self, on: bool);

    fn toggle(&mut self) {
        let on = self.is_on();
        self.set(!on);
    }
}

/// Actuator that only remembers its state
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MemoryActuator(pub bool);

impl Actuator for MemoryActuator {
    fn is_on(&self) -> bool {
        self.0
    }

    fn set(&mut self, on: bool) {
        self.0 = on;
    }
}
