/// Message type carried in the header
#[repr(u8)]
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Ord, PartialOrd, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum MessageType {
    #[default]
    Confirmable = 0,

    NonConfirmable = 1,

    Acknowledgement = 2,

    Reset = 3,
}

impl MessageType {
    /// Piggy-backed response type for a request of this type
    pub const fn response_type(self) -> MessageType {
        match self {
            MessageType::Confirmable => MessageType::Acknowledgement,
            _ => MessageType::NonConfirmable,
        }
    }

    pub const fn is_confirmable(self) -> bool {
        matches!(self, MessageType::Confirmable)
    }
}

impl From<u8> for MessageType {
    fn from(byte: u8) -> Self {
        match byte & 0x03 {
            0 => MessageType::Confirmable,
            1 => MessageType::NonConfirmable,
            2 => MessageType::Acknowledgement,
            _ => MessageType::Reset,
        }
    }
}

/// Request methods and response codes used by the server
///
/// The discriminant is the raw code byte, `class << 5 | detail`.
#[repr(u8)]
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Ord, PartialOrd, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Code {
    #[default]
    Empty = 0x00,

    Get = 0x01,

    Post = 0x02,

    Put = 0x03,

    Delete = 0x04,

    Changed = 0x44,

    Content = 0x45,

    BadRequest = 0x80,

    NotFound = 0x84,

    MethodNotAllowed = 0x85,

    UnsupportedContentFormat = 0x8F,
}

impl Code {
    pub const fn class(self) -> u8 {
        (self as u8) >> 5
    }

    pub const fn detail(self) -> u8 {
        (self as u8) & 0x1F
    }

    pub fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            0x00 => Some(Code::Empty),
            0x01 => Some(Code::Get),
            0x02 => Some(Code::Post),
            0x03 => Some(Code::Put),
            0x04 => Some(Code::Delete),
            0x44 => Some(Code::Changed),
            0x45 => Some(Code::Content),
            0x80 => Some(Code::BadRequest),
            0x84 => Some(Code::NotFound),
            0x85 => Some(Code::MethodNotAllowed),
            0x8F => Some(Code::UnsupportedContentFormat),
            _ => None,
        }
    }
}

impl core::fmt::Display for Code {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Code::Empty => write!(f, "EMPTY"),
            Code::Get => write!(f, "GET"),
            Code::Post => write!(f, "POST"),
            Code::Put => write!(f, "PUT"),
            Code::Delete => write!(f, "DELETE"),
            _ => write!(f, "{}.{:02}", self.class(), self.detail()),
        }
    }
}
