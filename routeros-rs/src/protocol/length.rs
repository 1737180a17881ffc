use std::ops::Deref;

use tokio::io::{AsyncRead, AsyncReadExt};

use super::error::{FramingError, ReadError};

/// Longest prefix the protocol defines: a `0xF0` marker followed by a 32-bit big-endian length.
pub const MAX_PREFIX_LEN: usize = 5;

/// The encoded size prefix of a single word.
///
/// Lengths are encoded in 1 to 5 bytes. The number of leading one bits in the first
/// byte tells how many continuation bytes follow:
///
/// | Range                     | Width | First byte |
/// |---------------------------|-------|------------|
/// | `0x00..=0x7F`             | 1     | `0xxxxxxx` |
/// | `0x80..=0x3FFF`           | 2     | `10xxxxxx` |
/// | `0x4000..=0x1FFFFF`       | 3     | `110xxxxx` |
/// | `0x200000..=0xFFFFFFF`    | 4     | `1110xxxx` |
/// | `0x10000000..=0xFFFFFFFF` | 5     | `11110000` |
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LengthPrefix {
    bytes: [u8; MAX_PREFIX_LEN],
    len: usize,
}

impl Deref for LengthPrefix {
    type Target = [u8];

    fn deref(&self) -> &Self::Target {
        &self.bytes[..self.len]
    }
}

/// Encodes a word length into its variable-width prefix.
pub fn encode_length(len: u32) -> LengthPrefix {
    let mut bytes = [0_u8; MAX_PREFIX_LEN];
    let len = match len {
        0x00..=0x7F => {
            bytes[0] = len as u8;
            1
        }
        0x80..=0x3FFF => {
            let l = len | 0x8000;
            bytes[..2].copy_from_slice(&(l as u16).to_be_bytes());
            2
        }
        0x4000..=0x1FFFFF => {
            let l = len | 0xC00000;
            bytes[..3].copy_from_slice(&l.to_be_bytes()[1..]);
            3
        }
        0x200000..=0xFFFFFFF => {
            let l = len | 0xE0000000;
            bytes[..4].copy_from_slice(&l.to_be_bytes());
            4
        }
        _ => {
            bytes[0] = 0xF0;
            bytes[1..].copy_from_slice(&len.to_be_bytes());
            5
        }
    };
    LengthPrefix { bytes, len }
}

/// Returns the total prefix width announced by the first byte of a prefix.
pub fn prefix_width(first: u8) -> Result<usize, FramingError> {
    if first & 0x80 == 0x00 {
        Ok(1)
    } else if first & 0xC0 == 0x80 {
        Ok(2)
    } else if first & 0xE0 == 0xC0 {
        Ok(3)
    } else if first & 0xF0 == 0xE0 {
        Ok(4)
    } else if first == 0xF0 {
        Ok(5)
    } else {
        Err(FramingError::InvalidPrefix(first))
    }
}

/// Decodes a length prefix from the start of `data`.
///
/// Returns the decoded length and the number of bytes the prefix occupied.
pub fn decode_length(data: &[u8]) -> Result<(u32, usize), FramingError> {
    let first = *data.first().ok_or(FramingError::Truncated {
        expected: 1,
        actual: 0,
    })?;
    let width = prefix_width(first)?;
    let prefix = data.get(..width).ok_or(FramingError::Truncated {
        expected: width,
        actual: data.len(),
    })?;

    let mut c: u32 = match width {
        1 => return Ok((first as u32, 1)),
        2 => (first & !0xC0) as u32,
        3 => (first & !0xE0) as u32,
        4 => (first & !0xF0) as u32,
        // The 5-byte form carries no payload bits in its marker byte.
        _ => 0,
    };
    for byte in &prefix[1..] {
        c = (c << 8) | *byte as u32;
    }
    Ok((c, width))
}

/// Reads a length prefix from a stream.
///
/// A stream that ends inside a prefix yields an [`std::io::ErrorKind::UnexpectedEof`] error.
pub async fn read_length<R>(reader: &mut R) -> Result<u32, ReadError>
where
    R: AsyncRead + Unpin + ?Sized,
{
    let mut buf = [0_u8; MAX_PREFIX_LEN];
    reader.read_exact(&mut buf[..1]).await?;
    let width = prefix_width(buf[0])?;
    if width > 1 {
        reader.read_exact(&mut buf[1..width]).await?;
    }
    let (len, _) = decode_length(&buf[..width])?;
    Ok(len)
}
