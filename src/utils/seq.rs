use std::fmt;

/// Bit 7 of a sequence byte: the peer's sequence state is unknown.
pub const SEQ_UNSYNCED: u8 = 0x80;
const SEQ_MASK: u8 = 0x7f;

/// 7-bit wrapping sequence number as carried on the wire.
///
/// The high bit is not part of the number; it marks a record that has not
/// been synchronized with its peer yet.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Hash)]
pub struct SeqNum {
    n: u8,
}

impl SeqNum {
    pub const ZERO: SeqNum = SeqNum { n: 0 };
    pub const UNSYNCED: SeqNum = SeqNum { n: SEQ_UNSYNCED };

    #[must_use]
    pub fn from_u8(n: u8) -> Self {
        SeqNum { n }
    }

    #[must_use]
    pub fn to_u8(&self) -> u8 {
        self.n
    }

    #[must_use]
    pub fn is_synced(&self) -> bool {
        self.n & SEQ_UNSYNCED == 0
    }

    /// `(n + 1) mod 128`; the unsynchronized flag is dropped.
    #[must_use]
    pub fn next(&self) -> SeqNum {
        SeqNum {
            n: self.n.wrapping_add(1) & SEQ_MASK,
        }
    }

    pub fn increment(&mut self) {
        *self = self.next();
    }
}

impl Default for SeqNum {
    fn default() -> Self {
        SeqNum::UNSYNCED
    }
}

impl fmt::Display for SeqNum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_synced() {
            write!(f, "{}", self.n)
        } else {
            write!(f, "unsynced({:#04x})", self.n)
        }
    }
}
