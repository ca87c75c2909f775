/// Content formats (representations) the server can produce
#[repr(u16)]
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Ord, PartialOrd, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ContentFormat {
    /// `text/plain; charset=utf-8`
    #[default]
    PlainText = 0,

    /// `application/link-format`
    LinkFormat = 40,

    /// `application/json`
    Json = 50,
}

impl ContentFormat {
    /// All known formats, lowest number first
    pub const ALL: [ContentFormat; 3] = [
        ContentFormat::PlainText,
        ContentFormat::LinkFormat,
        ContentFormat::Json,
    ];

    pub const fn number(self) -> u16 {
        self as u16
    }

    pub fn from_number(number: u32) -> Option<Self> {
        match number {
            0 => Some(ContentFormat::PlainText),
            40 => Some(ContentFormat::LinkFormat),
            50 => Some(ContentFormat::Json),
            _ => None,
        }
    }

    const fn mask(self) -> u8 {
        match self {
            ContentFormat::PlainText => 1 << 0,
            ContentFormat::LinkFormat => 1 << 1,
            ContentFormat::Json => 1 << 2,
        }
    }
}

/// Bitset of content formats a resource supports
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ContentFormatSet(u8);

impl ContentFormatSet {
    pub const EMPTY: ContentFormatSet = ContentFormatSet(0);

    pub const fn of(format: ContentFormat) -> Self {
        ContentFormatSet(format.mask())
    }

    pub const fn with(self, format: ContentFormat) -> Self {
        ContentFormatSet(self.0 | format.mask())
    }

    pub const fn contains(self, format: ContentFormat) -> bool {
        self.0 & format.mask() != 0
    }

    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub fn len(self) -> usize {
        self.0.count_ones() as usize
    }

    /// Supported formats, lowest number first
    pub fn iter(self) -> impl Iterator<Item = ContentFormat> {
        ContentFormat::ALL
            .into_iter()
            .filter(move |format| self.contains(*format))
    }

    /// The format used when a client expresses no preference
    pub fn preferred(self) -> Option<ContentFormat> {
        self.iter().next()
    }

    /// First entry of `accepted` this set supports.
    ///
    /// An empty `accepted` list means the client takes anything, in which case
    /// the preferred format is returned. Unknown format numbers are skipped.
    pub fn select(self, accepted: &[u32]) -> Option<ContentFormat> {
        if accepted.is_empty() {
            return self.preferred();
        }
        accepted
            .iter()
            .filter_map(|number| ContentFormat::from_number(*number))
            .find(|format| self.contains(*format))
    }
}
