//! Nibble arithmetic for the 2-pixels-per-byte format
//!
//! One byte holds two 4-bit pixels: the even column in the high nibble,
//! the odd column in the low nibble. These helpers are the single place
//! where that packing is spelled out; every drawing path goes through
//! them so the alignment edge cases stay in one tested spot.

/// Pack two pixels into one byte (`hi` = even column, `lo` = odd column)
#[inline]
pub const fn pack(hi: u8, lo: u8) -> u8 {
    (hi << 4) | (lo & 0x0F)
}

/// High-nibble pixel of a packed byte
#[inline]
pub const fn hi(byte: u8) -> u8 {
    byte >> 4
}

/// Low-nibble pixel of a packed byte
#[inline]
pub const fn lo(byte: u8) -> u8 {
    byte & 0x0F
}

/// Replace the high-nibble pixel, preserving its neighbor
#[inline]
pub const fn merge_hi(byte: u8, pixel: u8) -> u8 {
    (byte & 0x0F) | (pixel << 4)
}

/// Replace the low-nibble pixel, preserving its neighbor
#[inline]
pub const fn merge_lo(byte: u8, pixel: u8) -> u8 {
    (byte & 0xF0) | (pixel & 0x0F)
}

/// Both pixels of a byte set to the same color
#[inline]
pub const fn duplicate(color: u8) -> u8 {
    (color << 4) | (color & 0x0F)
}

/// Pixel at index `i` of a packed buffer (0 = high nibble of byte 0)
#[inline]
pub fn at(packed: &[u8], i: usize) -> u8 {
    let byte = packed[i / 2];
    if i % 2 == 0 {
        hi(byte)
    } else {
        lo(byte)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pack_unpack() {
        for h in 0..16u8 {
            for l in 0..16u8 {
                let b = pack(h, l);
                assert_eq!(hi(b), h);
                assert_eq!(lo(b), l);
            }
        }
    }

    #[test]
    fn test_merge_preserves_neighbor() {
        let b = pack(0x3, 0xC);
        assert_eq!(merge_hi(b, 0xF), pack(0xF, 0xC));
        assert_eq!(merge_lo(b, 0xF), pack(0x3, 0xF));
    }

    #[test]
    fn test_duplicate() {
        assert_eq!(duplicate(0), 0x00);
        assert_eq!(duplicate(0xF), 0xFF);
        assert_eq!(duplicate(0x5), 0x55);
    }

    #[test]
    fn test_at_walks_nibbles() {
        let buf = [pack(1, 2), pack(3, 4)];
        assert_eq!(at(&buf, 0), 1);
        assert_eq!(at(&buf, 1), 2);
        assert_eq!(at(&buf, 2), 3);
        assert_eq!(at(&buf, 3), 4);
    }
}
