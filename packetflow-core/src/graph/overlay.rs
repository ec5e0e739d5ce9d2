//! Overlay
//!
//! The overlay is the byte region that write nodes patch. It belongs to the
//! host, which hands it to each evaluation pass by mutable reference; nodes
//! reach it only through [`ProcessContext::set_overlay_data`].
//!
//! [`ProcessContext::set_overlay_data`]: super::ProcessContext::set_overlay_data

use thiserror::Error;

/// Largest overlay a write may grow to: 256 MiB past the base address.
pub const MAX_OVERLAY_LEN: usize = 1 << 28;

/// Rejected overlay write.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OverlayError {
    /// The address lies before the start of the overlay.
    #[error("address {address:#x} is below overlay base {base:#x}")]
    BelowBase { address: u64, base: u64 },

    /// The write would not fit in the host address space.
    #[error("write of {len} bytes at {address:#x} overflows the address space")]
    Overflow { address: u64, len: usize },

    /// The write would grow the overlay past [`MAX_OVERLAY_LEN`].
    #[error("write of {len} bytes at {address:#x} would grow the overlay past {max} bytes", max = MAX_OVERLAY_LEN)]
    TooLarge { address: u64, len: usize },
}

/// Addressable, growable byte buffer mirroring a region of the target data.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Overlay {
    base_address: u64,
    data: Vec<u8>,
}

impl Overlay {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty overlay starting at `base_address`.
    pub fn with_base_address(base_address: u64) -> Self {
        Self {
            base_address,
            data: Vec::new(),
        }
    }

    pub fn base_address(&self) -> u64 {
        self.base_address
    }

    pub fn set_base_address(&mut self, base_address: u64) {
        self.base_address = base_address;
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Copy `bytes` into the overlay at `address`.
    ///
    /// Existing bytes in the range are overwritten, the buffer grows when the
    /// write runs past its end, and any gap before `address` is zero-filled.
    pub fn write(&mut self, address: u64, bytes: &[u8]) -> Result<(), OverlayError> {
        let offset = address
            .checked_sub(self.base_address)
            .ok_or(OverlayError::BelowBase {
                address,
                base: self.base_address,
            })?;
        let overflow = OverlayError::Overflow {
            address,
            len: bytes.len(),
        };
        let start = usize::try_from(offset).map_err(|_| overflow.clone())?;
        let end = start.checked_add(bytes.len()).ok_or(overflow)?;
        if end > MAX_OVERLAY_LEN {
            return Err(OverlayError::TooLarge {
                address,
                len: bytes.len(),
            });
        }

        if end > self.data.len() {
            self.data.resize(end, 0x00);
        }
        self.data[start..end].copy_from_slice(bytes);

        Ok(())
    }

    /// Read `len` bytes at `address`, if the whole range is covered.
    pub fn read(&self, address: u64, len: usize) -> Option<&[u8]> {
        let start = usize::try_from(address.checked_sub(self.base_address)?).ok()?;
        let end = start.checked_add(len)?;
        self.data.get(start..end)
    }

    /// Drop all bytes, keeping the base address.
    pub fn clear(&mut self) {
        self.data.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_extends_and_zero_fills() {
        let mut overlay = Overlay::new();
        overlay.write(4, &[0xAA, 0xBB]).unwrap();

        assert_eq!(overlay.len(), 6);
        assert_eq!(overlay.data(), &[0, 0, 0, 0, 0xAA, 0xBB]);
    }

    #[test]
    fn write_merges_into_existing_bytes() {
        let mut overlay = Overlay::new();
        overlay.write(0, &[1, 2, 3, 4, 5]).unwrap();
        overlay.write(1, &[9, 9]).unwrap();

        assert_eq!(overlay.data(), &[1, 9, 9, 4, 5]);
    }

    #[test]
    fn repeated_write_is_idempotent() {
        let mut overlay = Overlay::with_base_address(0x1000);
        overlay.write(0x1002, &[7, 8]).unwrap();
        let first = overlay.clone();
        overlay.write(0x1002, &[7, 8]).unwrap();

        assert_eq!(overlay, first);
        assert_eq!(overlay.read(0x1002, 2), Some(&[7u8, 8][..]));
    }

    #[test]
    fn write_below_base_is_rejected() {
        let mut overlay = Overlay::with_base_address(0x100);
        let err = overlay.write(0x10, &[1]).unwrap_err();

        assert_eq!(err, OverlayError::BelowBase { address: 0x10, base: 0x100 });
        assert!(overlay.is_empty());
    }

    #[test]
    fn far_writes_are_refused() {
        let mut overlay = Overlay::new();
        let err = overlay.write(u64::MAX - 4, &[1, 2]).unwrap_err();
        assert_eq!(err, OverlayError::TooLarge { address: u64::MAX - 4, len: 2 });

        let err = overlay.write(MAX_OVERLAY_LEN as u64, &[1]).unwrap_err();
        assert!(matches!(err, OverlayError::TooLarge { .. }));
        assert!(overlay.is_empty());

        overlay.write(MAX_OVERLAY_LEN as u64 - 1, &[1]).unwrap();
        assert_eq!(overlay.len(), MAX_OVERLAY_LEN);
    }

    #[test]
    fn read_outside_range_is_none() {
        let mut overlay = Overlay::new();
        overlay.write(0, &[1, 2]).unwrap();

        assert!(overlay.read(1, 2).is_none());
        assert!(overlay.read(u64::MAX, 1).is_none());

        overlay.clear();
        assert!(overlay.is_empty());
    }
}
