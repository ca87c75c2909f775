//! Resource handlers
//!
//! Building blocks of request dispatch: light commands, light
//! representations, and the [`Reply`] a handler produces, turned into a
//! piggy-backed response by [`send_reply`].

use core::fmt::Write;

use crate::error::ServerError;
use crate::protocol::message::MessageError;
use crate::protocol::{
    Code, ContentFormat, Message, MessageConfig, MessageType, OptionNumber, Request,
};
use crate::traits::{Actuator, MessageExchange};

/// Buffer size of one light representation
pub const REPRESENTATION_SIZE: usize = 32;

/// Serialized light state
pub type Representation = heapless::String<REPRESENTATION_SIZE>;

/// Light command carried in the first byte of a PUT payload
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum LightCommand {
    Off,
    On,
    Toggle,
}

impl LightCommand {
    /// `'0'` off, `'1'` on, `'2'` toggle. Trailing bytes are ignored.
    pub fn parse(payload: &[u8]) -> Option<Self> {
        match payload.first()? {
            b'0' => Some(LightCommand::Off),
            b'1' => Some(LightCommand::On),
            b'2' => Some(LightCommand::Toggle),
            _ => None,
        }
    }

    pub fn apply<A: Actuator>(self, actuator: &mut A) {
        match self {
            LightCommand::Off => actuator.set(false),
            LightCommand::On => actuator.set(true),
            LightCommand::Toggle => actuator.toggle(),
        }
    }
}

/// Serialize the light state
///
/// Plain text is `0` or `1`; JSON is `{"<name>": true}`.
pub fn light_representation(
    name: &str,
    on: bool,
    format: ContentFormat,
) -> Result<Representation, MessageError> {
    let mut out = Representation::new();
    let written = match format {
        ContentFormat::Json => write!(out, "{{\"{}\": {}}}", name, on),
        _ => out.write_char(if on { '1' } else { '0' }),
    };
    written.map_err(|_| MessageError::PayloadTooLarge {
        max_size: REPRESENTATION_SIZE,
        actual_size: name.len() + 10,
    })?;
    Ok(out)
}

/// What a handler answers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Reply<'a> {
    pub code: Code,
    pub content_format: Option<ContentFormat>,
    pub observe: Option<u32>,
    pub max_age: Option<u32>,
    pub payload: &'a [u8],
}

impl<'a> Reply<'a> {
    /// Response without payload or options
    pub const fn status(code: Code) -> Self {
        Self {
            code,
            content_format: None,
            observe: None,
            max_age: None,
            payload: &[],
        }
    }

    /// `2.05 Content` carrying `payload` in `format`
    pub const fn content(format: ContentFormat, payload: &'a [u8]) -> Self {
        Self {
            code: Code::Content,
            content_format: Some(format),
            observe: None,
            max_age: None,
            payload,
        }
    }

    pub const fn with_observe(mut self, sequence: u32, max_age: u32) -> Self {
        self.observe = Some(sequence);
        self.max_age = Some(max_age);
        self
    }

    /// Message type answering a request of type `request_type`
    ///
    /// `4.15` goes out as a Reset; everything else is piggy-backed.
    pub const fn message_type(&self, request_type: MessageType) -> MessageType {
        match self.code {
            Code::UnsupportedContentFormat => MessageType::Reset,
            _ => request_type.response_type(),
        }
    }
}

/// Build the response to `request` from `reply` and send it
///
/// The response echoes the request's message id and token. The message is
/// released whether or not sending succeeded.
pub fn send_reply<E, const MAX_PAYLOAD_SIZE: usize>(
    exchange: &mut E,
    request: &Request<MAX_PAYLOAD_SIZE>,
    reply: &Reply<'_>,
) -> Result<(), ServerError>
where
    E: MessageExchange<MAX_PAYLOAD_SIZE>,
{
    let config = MessageConfig {
        msg_type: reply.message_type(request.msg_type),
        code: reply.code,
        message_id: Some(request.message_id),
        token: request.token.clone(),
    };
    let mut message = exchange.new_message(config)?;
    message.set_remote(request.remote);

    let result = write_reply(&mut message, reply)
        .map_err(ServerError::from)
        .and_then(|_| exchange.send(&message).map_err(ServerError::from));

    exchange.release(message);

    log::trace!(
        "Replied {} to {} (mid {})",
        reply.code,
        request.remote,
        request.message_id
    );
    result.map(|_| ())
}

/// Copy the options and payload of `reply` into `message`
pub(crate) fn write_reply<const MAX_PAYLOAD_SIZE: usize>(
    message: &mut Message<MAX_PAYLOAD_SIZE>,
    reply: &Reply<'_>,
) -> Result<(), MessageError> {
    if let Some(sequence) = reply.observe {
        message.add_option(OptionNumber::Observe, sequence)?;
    }
    if let Some(format) = reply.content_format {
        message.add_option(OptionNumber::ContentFormat, u32::from(format.number()))?;
    }
    if let Some(max_age) = reply.max_age {
        message.add_option(OptionNumber::MaxAge, max_age)?;
    }
    message.set_payload(reply.payload)
}
