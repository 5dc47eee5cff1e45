//! Mirror-image counterpart to [`super::writer`]: reads back whichever
//! encoding a stream was written in, reporting a truncated or malformed
//! stream as [`SerializeError::UnexpectedEof`] rather than panicking.

use crate::error::SerializeError;

/// Reads the primitive fields a node decoder expects, in field order --
/// the exact mirror image of [`super::writer::Writer`].
pub trait Reader {
    fn read_u8(&mut self) -> Result<u8, SerializeError>;
    fn read_u32(&mut self) -> Result<u32, SerializeError>;
    fn read_i64(&mut self) -> Result<i64, SerializeError>;
    fn read_f64(&mut self) -> Result<f64, SerializeError>;
    fn read_bool(&mut self) -> Result<bool, SerializeError> {
        Ok(self.read_u8()? != 0)
    }
    fn read_str(&mut self) -> Result<String, SerializeError>;
}

pub struct BinaryReader<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> BinaryReader<'a> {
    #[must_use]
    pub fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, pos: 0 }
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8], SerializeError> {
        let end = self.pos.checked_add(n).ok_or(SerializeError::UnexpectedEof)?;
        let slice = self.bytes.get(self.pos..end).ok_or(SerializeError::UnexpectedEof)?;
        self.pos = end;
        Ok(slice)
    }
}

impl Reader for BinaryReader<'_> {
    fn read_u8(&mut self) -> Result<u8, SerializeError> {
        Ok(self.take(1)?[0])
    }

    fn read_u32(&mut self) -> Result<u32, SerializeError> {
        let bytes: [u8; 4] = self.take(4)?.try_into().expect("slice of len 4");
        Ok(u32::from_be_bytes(bytes))
    }

    fn read_i64(&mut self) -> Result<i64, SerializeError> {
        let bytes: [u8; 8] = self.take(8)?.try_into().expect("slice of len 8");
        Ok(i64::from_be_bytes(bytes))
    }

    fn read_f64(&mut self) -> Result<f64, SerializeError> {
        let bytes: [u8; 8] = self.take(8)?.try_into().expect("slice of len 8");
        Ok(f64::from_bits(u64::from_be_bytes(bytes)))
    }

    fn read_str(&mut self) -> Result<String, SerializeError> {
        let len = self.read_u32()? as usize;
        let bytes = self.take(len)?;
        String::from_utf8(bytes.to_vec()).map_err(|_| SerializeError::UnexpectedEof)
    }
}

pub struct TextReader<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> TextReader<'a> {
    #[must_use]
    pub fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, pos: 0 }
    }

    /// Reads one space-delimited decimal token and consumes its trailing
    /// separator.
    fn read_token(&mut self) -> Result<&'a str, SerializeError> {
        let start = self.pos;
        while let Some(&b) = self.bytes.get(self.pos) {
            if b == b' ' {
                break;
            }
            self.pos += 1;
        }
        if self.pos >= self.bytes.len() {
            return Err(SerializeError::UnexpectedEof);
        }
        let token = std::str::from_utf8(&self.bytes[start..self.pos]).map_err(|_| SerializeError::UnexpectedEof)?;
        self.pos += 1; // the separating space
        Ok(token)
    }

    fn read_decimal<T: std::str::FromStr>(&mut self) -> Result<T, SerializeError> {
        self.read_token()?.parse().map_err(|_| SerializeError::UnexpectedEof)
    }
}

impl Reader for TextReader<'_> {
    fn read_u8(&mut self) -> Result<u8, SerializeError> {
        self.read_decimal()
    }

    fn read_u32(&mut self) -> Result<u32, SerializeError> {
        self.read_decimal()
    }

    fn read_i64(&mut self) -> Result<i64, SerializeError> {
        self.read_decimal()
    }

    fn read_f64(&mut self) -> Result<f64, SerializeError> {
        let bits: u64 = self.read_decimal()?;
        Ok(f64::from_bits(bits))
    }

    fn read_str(&mut self) -> Result<String, SerializeError> {
        let len: usize = self.read_decimal::<u32>()? as usize;
        let end = self.pos.checked_add(len).ok_or(SerializeError::UnexpectedEof)?;
        let bytes = self.bytes.get(self.pos..end).ok_or(SerializeError::UnexpectedEof)?;
        let s = String::from_utf8(bytes.to_vec()).map_err(|_| SerializeError::UnexpectedEof)?;
        self.pos = end;
        Ok(s)
    }
}
