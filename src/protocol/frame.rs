use super::{packet::Level, DecodingError, EncodingError};

pub const FRAME_MAX: usize = 256;
pub const FRAME_HDR_LEN: usize = 3;
/// Bytes available after `src mac`, `dst mac` and `len`.
pub const FRAME_DAT_MAX: usize = FRAME_MAX - FRAME_HDR_LEN;

/// One link-layer frame: `[src mac, dst mac, len, dat...]`.
#[derive(Clone)]
pub struct Frame {
    buf: [u8; FRAME_MAX],
}

impl Default for Frame {
    fn default() -> Self {
        Frame {
            buf: [0; FRAME_MAX],
        }
    }
}

impl std::fmt::Debug for Frame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Frame")
            .field("src_mac", &self.src_mac())
            .field("dst_mac", &self.dst_mac())
            .field("dat", &self.dat())
            .finish()
    }
}

impl Frame {
    #[inline]
    fn check_rep(&self) {
        assert!(self.buf[2] as usize <= FRAME_DAT_MAX);
    }

    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Copies a raw frame in, e.g. as read from a bus driver.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, DecodingError> {
        if bytes.len() < FRAME_HDR_LEN {
            return Err(DecodingError::Decoding { field: "len" });
        }
        let len = bytes[2] as usize;
        if len > FRAME_DAT_MAX || bytes.len() < FRAME_HDR_LEN + len {
            return Err(DecodingError::Decoding { field: "len" });
        }
        let mut this = Frame::default();
        this.buf[..FRAME_HDR_LEN + len].copy_from_slice(&bytes[..FRAME_HDR_LEN + len]);
        this.check_rep();
        Ok(this)
    }

    /// The used part of the frame, header included.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.buf[..FRAME_HDR_LEN + self.buf[2] as usize]
    }

    #[must_use]
    #[inline]
    pub fn src_mac(&self) -> u8 {
        self.buf[0]
    }

    #[must_use]
    #[inline]
    pub fn dst_mac(&self) -> u8 {
        self.buf[1]
    }

    #[must_use]
    #[inline]
    pub fn dat(&self) -> &[u8] {
        &self.buf[FRAME_HDR_LEN..FRAME_HDR_LEN + self.buf[2] as usize]
    }

    /// Whole data area, for encoders; commit the written length with [`Frame::set_hdr`].
    #[must_use]
    #[inline]
    pub fn dat_buf_mut(&mut self) -> &mut [u8] {
        &mut self.buf[FRAME_HDR_LEN..]
    }

    pub fn set_hdr(&mut self, src_mac: u8, dst_mac: u8, len: usize) -> Result<(), EncodingError> {
        if len > FRAME_DAT_MAX {
            return Err(EncodingError::NotEnoughSpace);
        }
        self.buf[0] = src_mac;
        self.buf[1] = dst_mac;
        self.buf[2] = len as u8;
        self.check_rep();
        Ok(())
    }

    /// Addressing level selected by the first data byte; `None` for an empty frame.
    #[must_use]
    pub fn level(&self) -> Option<Level> {
        let hdr = *self.dat().first()?;
        let level = if hdr & 0xc0 == 0xc0 {
            Level::L2
        } else if hdr & 0x80 != 0 {
            Level::L1
        } else {
            Level::L0
        };
        Some(level)
    }
}
