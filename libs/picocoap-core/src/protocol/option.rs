/// Option numbers the server reads or writes
#[repr(u16)]
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Ord, PartialOrd)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum OptionNumber {
    /// Observe: 0 registers, any other value deregisters. In notifications it
    /// carries the sequence number.
    Observe = 6,

    UriPath = 11,

    ContentFormat = 12,

    MaxAge = 14,

    Accept = 17,
}

impl OptionNumber {
    pub const fn number(self) -> u16 {
        self as u16
    }

    pub fn from_number(number: u16) -> Option<Self> {
        match number {
            6 => Some(OptionNumber::Observe),
            11 => Some(OptionNumber::UriPath),
            12 => Some(OptionNumber::ContentFormat),
            14 => Some(OptionNumber::MaxAge),
            17 => Some(OptionNumber::Accept),
            _ => None,
        }
    }
}

/// A uint-valued option
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct UintOption {
    pub number: OptionNumber,
    pub value: u32,
}

impl UintOption {
    pub const fn new(number: OptionNumber, value: u32) -> Self {
        Self { number, value }
    }
}
