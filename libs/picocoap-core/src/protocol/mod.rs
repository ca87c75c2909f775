pub mod code;
pub mod content_format;
pub mod message;
pub mod option;

pub use code::{Code, MessageType};
pub use content_format::{ContentFormat, ContentFormatSet};
pub use message::{Message, MessageConfig, MessageError, Remote, Request, Token};
pub use option::OptionNumber;

/// Longest token CoAP allows
pub const MAX_TOKEN_LENGTH: usize = 8;
