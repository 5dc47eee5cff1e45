//! The two concrete encodings sharing one logical typed stream (§4.5).
//!
//! `BinaryWriter` packs integers as fixed-width big-endian bytes the same
//! way the teacher's `struct` module packs Python's `struct` format codes --
//! `to_be_bytes` directly, no external byte-order crate. `TextWriter` packs
//! the same logical fields as space-separated decimal text, for a module
//! file a developer can diff by eye.

/// Emits the primitive fields a node encoder writes, in field order.
pub trait Writer {
    fn write_u8(&mut self, v: u8);
    fn write_u32(&mut self, v: u32);
    fn write_i64(&mut self, v: i64);
    fn write_f64(&mut self, v: f64);
    fn write_bool(&mut self, v: bool) {
        self.write_u8(u8::from(v));
    }
    fn write_str(&mut self, v: &str);
    fn into_bytes(self: Box<Self>) -> Vec<u8>;
}

#[derive(Default)]
pub struct BinaryWriter {
    bytes: Vec<u8>,
}

impl BinaryWriter {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl Writer for BinaryWriter {
    fn write_u8(&mut self, v: u8) {
        self.bytes.push(v);
    }

    fn write_u32(&mut self, v: u32) {
        self.bytes.extend_from_slice(&v.to_be_bytes());
    }

    fn write_i64(&mut self, v: i64) {
        self.bytes.extend_from_slice(&v.to_be_bytes());
    }

    fn write_f64(&mut self, v: f64) {
        self.bytes.extend_from_slice(&v.to_bits().to_be_bytes());
    }

    fn write_str(&mut self, v: &str) {
        self.write_u32(u32::try_from(v.len()).expect("string longer than u32::MAX bytes"));
        self.bytes.extend_from_slice(v.as_bytes());
    }

    fn into_bytes(self: Box<Self>) -> Vec<u8> {
        self.bytes
    }
}

/// Space-separated decimal text. Each scalar is written as its decimal
/// digits followed by one space; a string is its decimal byte length, one
/// space, then the raw bytes themselves (not decimal-encoded).
#[derive(Default)]
pub struct TextWriter {
    bytes: Vec<u8>,
}

impl TextWriter {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn write_decimal(&mut self, text: &str) {
        self.bytes.extend_from_slice(text.as_bytes());
        self.bytes.push(b' ');
    }
}

impl Writer for TextWriter {
    fn write_u8(&mut self, v: u8) {
        self.write_decimal(&v.to_string());
    }

    fn write_u32(&mut self, v: u32) {
        self.write_decimal(&v.to_string());
    }

    fn write_i64(&mut self, v: i64) {
        self.write_decimal(&v.to_string());
    }

    fn write_f64(&mut self, v: f64) {
        // Bit pattern, not the decimal rendering: exact round-trip, same
        // reasoning as the binary encoding's raw byte copy.
        self.write_decimal(&v.to_bits().to_string());
    }

    fn write_str(&mut self, v: &str) {
        self.write_decimal(&v.len().to_string());
        self.bytes.extend_from_slice(v.as_bytes());
    }

    fn into_bytes(self: Box<Self>) -> Vec<u8> {
        self.bytes
    }
}
