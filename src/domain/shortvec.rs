//! Compact-u16 length prefixes used throughout the ledger wire format.
//!
//! Each byte carries seven bits of the value, least significant group first,
//! with the high bit set on every byte except the last. At most three bytes
//! are allowed and the encoding must be minimal.

use super::message::MessageError;

/// Maximum number of bytes a compact-u16 may occupy.
pub const MAX_ENCODING_LENGTH: usize = 3;

/// Append the compact-u16 encoding of `value` to `out`.
pub fn encode_len(out: &mut Vec<u8>, value: u16) {
    let mut rem = value;
    loop {
        let mut byte = (rem & 0x7f) as u8;
        rem >>= 7;
        if rem == 0 {
            out.push(byte);
            break;
        }
        byte |= 0x80;
        out.push(byte);
    }
}

/// Decode a compact-u16 from the front of `bytes`.
///
/// Returns the value and the number of bytes consumed.
pub fn decode_len(bytes: &[u8]) -> Result<(u16, usize), MessageError> {
    let mut value: u32 = 0;

    for i in 0..MAX_ENCODING_LENGTH {
        let byte = *bytes.get(i).ok_or(MessageError::Truncated("compact-u16"))?;
        let bits = u32::from(byte & 0x7f);

        // Zero continuation groups mean a longer-than-needed encoding.
        if i > 0 && byte == 0 {
            return Err(MessageError::NonCanonicalLength);
        }

        value |= bits << (i * 7);

        if byte & 0x80 == 0 {
            return u16::try_from(value)
                .map(|v| (v, i + 1))
                .map_err(|_| MessageError::LengthOverflow);
        }

        if i == MAX_ENCODING_LENGTH - 1 {
            return Err(MessageError::LengthOverflow);
        }
    }

    Err(MessageError::LengthOverflow)
}
