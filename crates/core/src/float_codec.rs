//! IEEE-754 single-precision operand encoding.
//!
//! The accelerator's Cr/Ci registers hold raw binary32 words. Operands are
//! encoded big-endian (sign/exponent byte first); the wire protocols decide in
//! which order those bytes or nibbles actually travel over the data bus.
//!
//! No rounding or range check happens here: every 32-bit pattern, including
//! subnormals, infinities and NaN payloads, round-trips bit-exactly.

/// Number of bytes in one encoded operand.
pub const OPERAND_BYTES: usize = 4;
/// Number of 4-bit nibbles in one encoded operand.
pub const OPERAND_NIBBLES: usize = 8;

/// Encode `value` as 4 big-endian bytes.
pub fn encode(value: f32) -> [u8; OPERAND_BYTES] {
    value.to_bits().to_be_bytes()
}

/// Decode 4 big-endian bytes back into an `f32`.
pub fn decode(bytes: [u8; OPERAND_BYTES]) -> f32 {
    f32::from_bits(u32::from_be_bytes(bytes))
}

/// Split `value` into 8 nibbles, most significant first.
///
/// Each encoded byte contributes its high nibble, then its low nibble, so
/// `to_nibbles(x)[0]` is the top 4 bits of the binary32 word.
pub fn to_nibbles(value: f32) -> [u8; OPERAND_NIBBLES] {
    let mut out = [0u8; OPERAND_NIBBLES];
    for (i, byte) in encode(value).iter().enumerate() {
        out[i * 2] = byte >> 4;
        out[i * 2 + 1] = byte & 0x0F;
    }
    out
}

/// Reassemble an `f32` from 8 nibbles, most significant first.
///
/// Only the low 4 bits of each entry are used.
pub fn from_nibbles(nibbles: [u8; OPERAND_NIBBLES]) -> f32 {
    let mut bytes = [0u8; OPERAND_BYTES];
    for (i, byte) in bytes.iter_mut().enumerate() {
        *byte = ((nibbles[i * 2] & 0x0F) << 4) | (nibbles[i * 2 + 1] & 0x0F);
    }
    decode(bytes)
}

/// Bit-pattern equality. `-0.0` differs from `0.0`; a NaN equals itself.
///
/// This is the comparison the register cache uses: what matters is whether
/// the accelerator register already holds exactly these 32 bits.
pub fn same_bits(a: f32, b: f32) -> bool {
    a.to_bits() == b.to_bits()
}
