//! Channel-backed message exchange
//!
//! Messages the server sends are copied into owned [`OutboundMessage`]s and
//! queued on a bounded tokio channel. Whatever drains the channel (a UDP
//! codec, a test, the demo client) is responsible for framing, delivery and
//! retransmission, and reports confirmable outcomes back to the server.

use bytes::Bytes;
use log::trace;
use picocoap_core::protocol::OptionNumber;
use picocoap_core::{
    Code, ExchangeError, Message, MessageConfig, MessageExchange, MessageHandle, MessageType,
    Remote,
};
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;

use crate::state::MessageIdGenerator;

/// A message handed to the transport
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundMessage {
    /// Handle to report the delivery outcome against
    pub handle: MessageHandle,
    pub remote: Remote,
    pub msg_type: MessageType,
    pub code: Code,
    pub message_id: u16,
    pub token: Bytes,
    pub options: Vec<(OptionNumber, u32)>,
    pub payload: Bytes,
}

impl OutboundMessage {
    pub fn option(&self, number: OptionNumber) -> Option<u32> {
        self.options
            .iter()
            .find(|(n, _)| *n == number)
            .map(|(_, value)| *value)
    }

    pub fn is_confirmable(&self) -> bool {
        self.msg_type.is_confirmable()
    }

    /// Payload as text, for logging
    pub fn payload_str(&self) -> &str {
        std::str::from_utf8(&self.payload).unwrap_or("<binary>")
    }
}

/// Message exchange writing into a tokio channel
#[derive(Debug)]
pub struct ChannelExchange {
    outbound: mpsc::Sender<OutboundMessage>,
    ids: MessageIdGenerator,
}

impl ChannelExchange {
    pub fn new(outbound: mpsc::Sender<OutboundMessage>) -> Self {
        Self {
            outbound,
            ids: MessageIdGenerator::new(),
        }
    }
}

impl<const MAX_PAYLOAD_SIZE: usize> MessageExchange<MAX_PAYLOAD_SIZE> for ChannelExchange {
    fn new_message(
        &mut self,
        config: MessageConfig,
    ) -> Result<Message<MAX_PAYLOAD_SIZE>, ExchangeError> {
        Ok(Message::from_config(config, self.ids.next_message_id()))
    }

    fn send(
        &mut self,
        message: &Message<MAX_PAYLOAD_SIZE>,
    ) -> Result<MessageHandle, ExchangeError> {
        let remote = message.remote.ok_or(ExchangeError::MissingRemote)?;
        let handle = self.ids.next_handle();
        let outbound = OutboundMessage {
            handle,
            remote,
            msg_type: message.msg_type,
            code: message.code,
            message_id: message.message_id,
            token: Bytes::copy_from_slice(message.token.as_slice()),
            options: message.options.iter().map(|o| (o.number, o.value)).collect(),
            payload: Bytes::copy_from_slice(&message.payload),
        };

        self.outbound.try_send(outbound).map_err(|e| match e {
            TrySendError::Full(_) => ExchangeError::SendFailed,
            TrySendError::Closed(_) => ExchangeError::Closed,
        })?;

        trace!(
            "Queued {:?} {} to {} as {}",
            message.msg_type,
            message.code,
            remote,
            handle
        );
        Ok(handle)
    }

    fn release(&mut self, _message: Message<MAX_PAYLOAD_SIZE>) {}
}
