//! Channel selection and the 16-bit command word.

/// Input configuration of the MCP3208.
///
/// The discriminant is the 4-bit `SGL/DIFF, D2, D1, D0` selector from the datasheet.
/// Differential variants are named `Diff<positive><negative>`.
#[allow(missing_docs)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Channel {
    Diff01 = 0b0000,
    Diff10 = 0b0001,
    Diff23 = 0b0010,
    Diff32 = 0b0011,
    Diff45 = 0b0100,
    Diff54 = 0b0101,
    Diff67 = 0b0110,
    Diff76 = 0b0111,
    CH0 = 0b1000,
    CH1 = 0b1001,
    CH2 = 0b1010,
    CH3 = 0b1011,
    CH4 = 0b1100,
    CH5 = 0b1101,
    CH6 = 0b1110,
    CH7 = 0b1111,
}

impl Channel {
    /// Iterate over the eight single-ended inputs.
    pub fn all() -> impl Iterator<Item = Self> {
        [
            Self::CH0,
            Self::CH1,
            Self::CH2,
            Self::CH3,
            Self::CH4,
            Self::CH5,
            Self::CH6,
            Self::CH7,
        ]
        .into_iter()
    }

    /// Iterate over the eight differential pairs.
    pub fn differential() -> impl Iterator<Item = Self> {
        [
            Self::Diff01,
            Self::Diff10,
            Self::Diff23,
            Self::Diff32,
            Self::Diff45,
            Self::Diff54,
            Self::Diff67,
            Self::Diff76,
        ]
        .into_iter()
    }

    /// Single-ended input `index` (0-7).
    pub fn single(index: u8) -> Option<Self> {
        if index < 8 {
            Self::from_selector(0b1000 | index)
        } else {
            None
        }
    }

    /// Build a channel from its raw 4-bit selector. Anything above 15 would spill into
    /// the start bit of the command word and is rejected.
    pub fn from_selector(selector: u8) -> Option<Self> {
        let channel = match selector {
            0b0000 => Self::Diff01,
            0b0001 => Self::Diff10,
            0b0010 => Self::Diff23,
            0b0011 => Self::Diff32,
            0b0100 => Self::Diff45,
            0b0101 => Self::Diff54,
            0b0110 => Self::Diff67,
            0b0111 => Self::Diff76,
            0b1000 => Self::CH0,
            0b1001 => Self::CH1,
            0b1010 => Self::CH2,
            0b1011 => Self::CH3,
            0b1100 => Self::CH4,
            0b1101 => Self::CH5,
            0b1110 => Self::CH6,
            0b1111 => Self::CH7,
            _ => return None,
        };

        Some(channel)
    }

    /// The raw 4-bit selector.
    pub const fn selector(self) -> u8 {
        self as u8
    }

    /// `true` for single-ended inputs.
    pub const fn is_single_ended(self) -> bool {
        self.selector() & 0b1000 != 0
    }

    /// The command word that starts a conversion on this channel.
    pub const fn command(self) -> Command {
        Command::new(self)
    }
}

/// Command word clocked out to start a conversion: `0b0000_01cc_cc00_0000`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Command(u16);

impl Command {
    /// Start bit, followed by the selector in bits 6 to 9.
    const START: u16 = 0x0400;

    /// Encode the command for `channel`.
    pub const fn new(channel: Channel) -> Self {
        Self(Self::START | ((channel.selector() as u16) << 6))
    }

    /// The full 16-bit word.
    pub const fn word(self) -> u16 {
        self.0
    }

    /// First byte on the wire.
    pub const fn high_byte(self) -> u8 {
        (self.0 >> 8) as u8
    }

    /// Second byte on the wire.
    pub const fn low_byte(self) -> u8 {
        (self.0 & 0xFF) as u8
    }
}

impl From<Channel> for Command {
    fn from(channel: Channel) -> Self {
        Self::new(channel)
    }
}
