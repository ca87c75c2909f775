//! Requests handed to the server and messages it asks the adapter to send

use super::code::{Code, MessageType};
use super::option::{OptionNumber, UintOption};
use super::MAX_TOKEN_LENGTH;

/// Longest request path, all segments included
pub const MAX_PATH_LENGTH: usize = 64;

/// Accept options kept from one request
pub const MAX_ACCEPT_OPTIONS: usize = 4;

/// Options a single outgoing message may carry
pub const MAX_MESSAGE_OPTIONS: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum MessageError {
    TokenTooLong { actual_length: usize },

    PathTooLong {
        max_length: usize,
        actual_length: usize,
    },

    PayloadTooLarge { max_size: usize, actual_size: usize },

    TooManyOptions { max_options: usize },
}

impl core::fmt::Display for MessageError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            MessageError::TokenTooLong { actual_length } => {
                write!(
                    f,
                    "Token too long: length {}, max {}",
                    actual_length, MAX_TOKEN_LENGTH
                )
            }
            MessageError::PathTooLong {
                max_length,
                actual_length,
            } => {
                write!(
                    f,
                    "Path too long: length {}, max {}",
                    actual_length, max_length
                )
            }
            MessageError::PayloadTooLarge {
                max_size,
                actual_size,
            } => {
                write!(
                    f,
                    "Payload too large: size {}, max {}",
                    actual_size, max_size
                )
            }
            MessageError::TooManyOptions { max_options } => {
                write!(f, "Too many options: max {}", max_options)
            }
        }
    }
}

impl core::error::Error for MessageError {}

/// Remote endpoint (IPv6 address and UDP port)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Remote {
    pub address: [u8; 16],
    pub port: u16,
}

impl Remote {
    pub const fn new(address: [u8; 16], port: u16) -> Self {
        Self { address, port }
    }
}

impl core::fmt::Display for Remote {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "[")?;
        for (i, pair) in self.address.chunks(2).enumerate() {
            if i > 0 {
                write!(f, ":")?;
            }
            write!(f, "{:x}", u16::from_be_bytes([pair[0], pair[1]]))?;
        }
        write!(f, "]:{}", self.port)
    }
}

/// Opaque client token, at most eight bytes
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Token(heapless::Vec<u8, MAX_TOKEN_LENGTH>);

impl Token {
    pub const fn empty() -> Self {
        Token(heapless::Vec::new())
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl TryFrom<&[u8]> for Token {
    type Error = MessageError;

    fn try_from(value: &[u8]) -> Result<Self, Self::Error> {
        heapless::Vec::from_slice(value)
            .map(Token)
            .map_err(|_| MessageError::TokenTooLong {
                actual_length: value.len(),
            })
    }
}

/// An inbound request as delivered by the message exchange adapter
///
/// Options the server does not act upon are not represented.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request<const MAX_PAYLOAD_SIZE: usize> {
    pub msg_type: MessageType,
    pub code: Code,
    pub message_id: u16,
    pub token: Token,
    pub remote: Remote,
    /// Uri-Path segments joined with `/`
    pub uri_path: heapless::String<MAX_PATH_LENGTH>,
    pub observe: Option<u32>,
    /// Accept options in the order the client sent them
    pub accept: heapless::Vec<u32, MAX_ACCEPT_OPTIONS>,
    pub payload: heapless::Vec<u8, MAX_PAYLOAD_SIZE>,
}

impl<const MAX_PAYLOAD_SIZE: usize> Request<MAX_PAYLOAD_SIZE> {
    pub fn new(msg_type: MessageType, code: Code, message_id: u16, remote: Remote) -> Self {
        Self {
            msg_type,
            code,
            message_id,
            token: Token::empty(),
            remote,
            uri_path: heapless::String::new(),
            observe: None,
            accept: heapless::Vec::new(),
            payload: heapless::Vec::new(),
        }
    }

    pub fn with_token(mut self, token: &[u8]) -> Result<Self, MessageError> {
        self.token = Token::try_from(token)?;
        Ok(self)
    }

    pub fn with_path(mut self, path: &str) -> Result<Self, MessageError> {
        self.uri_path = heapless::String::try_from(path).map_err(|_| MessageError::PathTooLong {
            max_length: MAX_PATH_LENGTH,
            actual_length: path.len(),
        })?;
        Ok(self)
    }

    pub fn with_observe(mut self, value: u32) -> Self {
        self.observe = Some(value);
        self
    }

    pub fn with_accept(mut self, format: u32) -> Result<Self, MessageError> {
        self.accept
            .push(format)
            .map_err(|_| MessageError::TooManyOptions {
                max_options: MAX_ACCEPT_OPTIONS,
            })?;
        Ok(self)
    }

    pub fn with_payload(mut self, payload: &[u8]) -> Result<Self, MessageError> {
        self.payload =
            heapless::Vec::from_slice(payload).map_err(|_| MessageError::PayloadTooLarge {
                max_size: MAX_PAYLOAD_SIZE,
                actual_size: payload.len(),
            })?;
        Ok(self)
    }
}

/// Parameters for a message the adapter is asked to allocate
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageConfig {
    pub msg_type: MessageType,
    pub code: Code,
    /// `None` lets the adapter pick a fresh message id
    pub message_id: Option<u16>,
    pub token: Token,
}

/// Outgoing message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message<const MAX_PAYLOAD_SIZE: usize> {
    pub msg_type: MessageType,
    pub code: Code,
    pub message_id: u16,
    pub token: Token,
    pub remote: Option<Remote>,
    pub options: heapless::Vec<UintOption, MAX_MESSAGE_OPTIONS>,
    pub payload: heapless::Vec<u8, MAX_PAYLOAD_SIZE>,
}

impl<const MAX_PAYLOAD_SIZE: usize> Message<MAX_PAYLOAD_SIZE> {
    /// Build an empty message from `config`; `fallback_id` is used when the
    /// config leaves the message id open.
    pub fn from_config(config: MessageConfig, fallback_id: u16) -> Self {
        Self {
            msg_type: config.msg_type,
            code: config.code,
            message_id: config.message_id.unwrap_or(fallback_id),
            token: config.token,
            remote: None,
            options: heapless::Vec::new(),
            payload: heapless::Vec::new(),
        }
    }

    pub fn set_remote(&mut self, remote: Remote) {
        self.remote = Some(remote);
    }

    /// Add a uint option, replacing an earlier value for the same number
    pub fn add_option(&mut self, number: OptionNumber, value: u32) -> Result<(), MessageError> {
        if let Some(existing) = self.options.iter_mut().find(|o| o.number == number) {
            existing.value = value;
            return Ok(());
        }
        self.options
            .push(UintOption::new(number, value))
            .map_err(|_| MessageError::TooManyOptions {
                max_options: MAX_MESSAGE_OPTIONS,
            })
    }

    pub fn option(&self, number: OptionNumber) -> Option<u32> {
        self.options
            .iter()
            .find(|o| o.number == number)
            .map(|o| o.value)
    }

    pub fn set_payload(&mut self, payload: &[u8]) -> Result<(), MessageError> {
        self.payload.clear();
        self.payload
            .extend_from_slice(payload)
            .map_err(|_| MessageError::PayloadTooLarge {
                max_size: MAX_PAYLOAD_SIZE,
                actual_size: payload.len(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_length_bound() {
        assert!(Token::try_from(&[1u8, 2, 3, 4, 5, 6, 7, 8][..]).is_ok());
        assert_eq!(
            Token::try_from(&[0u8; 9][..]),
            Err(MessageError::TokenTooLong { actual_length: 9 })
        );
    }

    #[test]
    fn test_add_option_replaces_same_number() {
        let config = MessageConfig {
            msg_type: MessageType::NonConfirmable,
            code: Code::Content,
            message_id: None,
            token: Token::empty(),
        };
        let mut message = Message::<16>::from_config(config, 7);
        assert_eq!(message.message_id, 7);

        message.add_option(OptionNumber::Observe, 1).unwrap();
        message.add_option(OptionNumber::Observe, 2).unwrap();
        assert_eq!(message.options.len(), 1);
        assert_eq!(message.option(OptionNumber::Observe), Some(2));
        assert_eq!(message.option(OptionNumber::MaxAge), None);
    }

    #[test]
    fn test_payload_bound() {
        let config = MessageConfig {
            msg_type: MessageType::Acknowledgement,
            code: Code::Content,
            message_id: Some(1),
            token: Token::empty(),
        };
        let mut message = Message::<4>::from_config(config, 0);
        assert!(message.set_payload(b"1234").is_ok());
        assert_eq!(
            message.set_payload(b"12345"),
            Err(MessageError::PayloadTooLarge {
                max_size: 4,
                actual_size: 5
            })
        );
    }

    #[test]
    fn test_request_builder() {
        let remote = Remote::new([0xfe, 0x80, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 1], 5683);
        let request = Request::<16>::new(MessageType::Confirmable, Code::Get, 42, remote)
            .with_token(&[0xAB])
            .unwrap()
            .with_path("lights/led3")
            .unwrap()
            .with_observe(0)
            .with_accept(50)
            .unwrap();
        assert_eq!(request.uri_path.as_str(), "lights/led3");
        assert_eq!(request.observe, Some(0));
        assert_eq!(request.accept.as_slice(), &[50]);
        assert_eq!(request.token.as_slice(), &[0xAB]);
    }

    #[test]
    fn test_remote_display() {
        let remote = Remote::new([0xfe, 0x80, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 1], 5683);
        assert_eq!(remote.to_string(), "[fe80:0:0:0:0:0:0:1]:5683");
    }
}
