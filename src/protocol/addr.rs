use std::fmt;

/// `mac` value meaning unspecified, or broadcast when used as destination.
pub const MAC_UNSPECIFIED: u8 = 255;
/// `net` value meaning the peer is on the local segment (short addressing).
pub const NET_LOCAL: u8 = 255;

#[derive(Debug, PartialEq, Eq, Clone, Copy, Hash)]
pub struct Address {
    pub net: u8,
    pub mac: u8,
}

impl Address {
    pub const UNSPECIFIED: Address = Address {
        net: NET_LOCAL,
        mac: MAC_UNSPECIFIED,
    };

    #[must_use]
    pub const fn new(net: u8, mac: u8) -> Self {
        Address { net, mac }
    }

    /// Peer reached by its mac alone.
    #[must_use]
    pub const fn short(mac: u8) -> Self {
        Address { net: NET_LOCAL, mac }
    }

    #[must_use]
    #[inline]
    pub fn is_unspecified(&self) -> bool {
        self.mac == MAC_UNSPECIFIED
    }

    #[must_use]
    #[inline]
    pub fn is_short(&self) -> bool {
        self.net == NET_LOCAL
    }
}

impl Default for Address {
    fn default() -> Self {
        Address::UNSPECIFIED
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_short() {
            write!(f, "{:02x}", self.mac)
        } else {
            write!(f, "{:02x}:{:02x}", self.net, self.mac)
        }
    }
}
