//! Protocol Buffers wire format: the subset needed to read and write
//! `MessageData` envelopes.

use crate::message::DecodeError;

/// Longest varint encoding of a `u64`.
const MAX_VARINT_LEN: usize = 10;

/// Wire types defined by the encoding. Groups (3, 4) are deprecated and
/// refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WireType {
    Varint,
    Fixed64,
    LengthDelimited,
    Fixed32,
}

impl WireType {
    fn from_bits(bits: u64) -> Result<Self, DecodeError> {
        match bits {
            0 => Ok(Self::Varint),
            1 => Ok(Self::Fixed64),
            2 => Ok(Self::LengthDelimited),
            5 => Ok(Self::Fixed32),
            other => Err(DecodeError::UnsupportedWireType(other)),
        }
    }

    fn bits(self) -> u64 {
        match self {
            Self::Varint => 0,
            Self::Fixed64 => 1,
            Self::LengthDelimited => 2,
            Self::Fixed32 => 5,
        }
    }
}

/// A single decoded field value, borrowing length-delimited payloads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Value<'a> {
    Varint(u64),
    Fixed64(u64),
    Bytes(&'a [u8]),
    Fixed32(u32),
}

impl<'a> Value<'a> {
    pub fn as_varint(self, field: u32) -> Result<u64, DecodeError> {
        match self {
            Value::Varint(v) => Ok(v),
            Value::Fixed64(_) | Value::Bytes(_) | Value::Fixed32(_) => {
                Err(DecodeError::WrongWireType { field })
            }
        }
    }

    pub fn as_bytes(self, field: u32) -> Result<&'a [u8], DecodeError> {
        match self {
            Value::Bytes(b) => Ok(b),
            Value::Varint(_) | Value::Fixed64(_) | Value::Fixed32(_) => {
                Err(DecodeError::WrongWireType { field })
            }
        }
    }

    pub fn as_str(self, field: u32) -> Result<&'a str, DecodeError> {
        std::str::from_utf8(self.as_bytes(field)?).map_err(|_| DecodeError::InvalidUtf8 { field })
    }

    /// Repeated varint fields may arrive packed (length-delimited) or one
    /// value per tag; both forms are accepted.
    pub fn push_varints(self, field: u32, out: &mut Vec<u64>) -> Result<(), DecodeError> {
        match self {
            Value::Varint(v) => {
                out.push(v);
                Ok(())
            }
            Value::Bytes(packed) => {
                let mut reader = Reader::new(packed);
                while !reader.is_empty() {
                    out.push(reader.read_varint()?);
                }
                Ok(())
            }
            Value::Fixed64(_) | Value::Fixed32(_) => Err(DecodeError::WrongWireType { field }),
        }
    }
}

/// Cursor over an encoded message.
#[derive(Debug, Clone)]
pub struct Reader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    pub fn is_empty(&self) -> bool {
        self.pos >= self.buf.len()
    }

    fn take(&mut self, len: usize) -> Result<&'a [u8], DecodeError> {
        let end = self
            .pos
            .checked_add(len)
            .filter(|&end| end <= self.buf.len())
            .ok_or(DecodeError::Truncated)?;
        let out = &self.buf[self.pos..end];
        self.pos = end;
        Ok(out)
    }

    pub fn read_varint(&mut self) -> Result<u64, DecodeError> {
        let mut value = 0u64;
        for i in 0..MAX_VARINT_LEN {
            let byte = *self.buf.get(self.pos).ok_or(DecodeError::Truncated)?;
            self.pos += 1;
            let low = u64::from(byte & 0x7f);
            // The tenth byte may only contribute the single remaining bit.
            if i == MAX_VARINT_LEN - 1 && low > 1 {
                return Err(DecodeError::VarintOverflow);
            }
            value |= low << (7 * i);
            if byte & 0x80 == 0 {
                return Ok(value);
            }
        }
        Err(DecodeError::VarintOverflow)
    }

    /// Read the next `(field number, value)` pair, or `None` at the end of
    /// the buffer.
    pub fn next_field(&mut self) -> Result<Option<(u32, Value<'a>)>, DecodeError> {
        if self.is_empty() {
            return Ok(None);
        }
        let key = self.read_varint()?;
        let wire_type = WireType::from_bits(key & 0x7)?;
        let field = u32::try_from(key >> 3).map_err(|_| DecodeError::InvalidFieldNumber)?;
        if field == 0 {
            return Err(DecodeError::InvalidFieldNumber);
        }
        let value = match wire_type {
            WireType::Varint => Value::Varint(self.read_varint()?),
            WireType::Fixed64 => {
                let mut raw = [0u8; 8];
                raw.copy_from_slice(self.take(8)?);
                Value::Fixed64(u64::from_le_bytes(raw))
            }
            WireType::LengthDelimited => {
                let len = usize::try_from(self.read_varint()?).map_err(|_| DecodeError::Truncated)?;
                Value::Bytes(self.take(len)?)
            }
            WireType::Fixed32 => {
                let mut raw = [0u8; 4];
                raw.copy_from_slice(self.take(4)?);
                Value::Fixed32(u32::from_le_bytes(raw))
            }
        };
        Ok(Some((field, value)))
    }
}

/// Append-only encoder producing canonical output: callers skip default
/// values, and repeated varints are written packed.
#[derive(Debug, Default, Clone)]
pub struct Writer {
    buf: Vec<u8>,
}

impl Writer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }

    fn raw_varint(&mut self, mut value: u64) {
        while value >= 0x80 {
            self.buf.push((value as u8) | 0x80);
            value >>= 7;
        }
        self.buf.push(value as u8);
    }

    fn key(&mut self, field: u32, wire_type: WireType) {
        self.raw_varint((u64::from(field) << 3) | wire_type.bits());
    }

    /// Write a varint field, omitting the proto3 default of zero.
    pub fn varint(&mut self, field: u32, value: u64) {
        if value != 0 {
            self.key(field, WireType::Varint);
            self.raw_varint(value);
        }
    }

    /// Write a length-delimited field even when empty (used for present
    /// sub-messages).
    pub fn bytes(&mut self, field: u32, value: &[u8]) {
        self.key(field, WireType::LengthDelimited);
        self.raw_varint(value.len() as u64);
        self.buf.extend_from_slice(value);
    }

    /// Write a string/bytes scalar, omitting it when empty.
    pub fn bytes_if_present(&mut self, field: u32, value: &[u8]) {
        if !value.is_empty() {
            self.bytes(field, value);
        }
    }

    pub fn packed_varints(&mut self, field: u32, values: &[u64]) {
        if values.is_empty() {
            return;
        }
        let mut inner = Writer::new();
        for &v in values {
            inner.raw_varint(v);
        }
        self.bytes(field, &inner.buf);
    }

    pub fn message(&mut self, field: u32, inner: Writer) {
        self.bytes(field, &inner.buf);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_varint_known_encodings() {
        let mut w = Writer::new();
        w.raw_varint(1);
        w.raw_varint(300);
        assert_eq!(w.into_bytes(), vec![0x01, 0xac, 0x02]);
    }

    #[test]
    fn test_varint_max_value() {
        let mut w = Writer::new();
        w.raw_varint(u64::MAX);
        let bytes = w.into_bytes();
        assert_eq!(bytes.len(), MAX_VARINT_LEN);
        assert_eq!(Reader::new(&bytes).read_varint(), Ok(u64::MAX));
    }

    #[test]
    fn test_varint_overflow_rejected() {
        let mut bytes = vec![0xff; 9];
        bytes.push(0x02);
        assert_eq!(
            Reader::new(&bytes).read_varint(),
            Err(DecodeError::VarintOverflow)
        );
        let eleven = vec![0x80; 11];
        assert_eq!(
            Reader::new(&eleven).read_varint(),
            Err(DecodeError::VarintOverflow)
        );
    }

    #[test]
    fn test_truncated_varint() {
        assert_eq!(
            Reader::new(&[0x80, 0x80]).read_varint(),
            Err(DecodeError::Truncated)
        );
    }

    #[test]
    fn test_next_field_kinds() {
        let mut w = Writer::new();
        w.varint(1, 3);
        w.bytes(2, b"hi");
        let bytes = w.into_bytes();
        let mut r = Reader::new(&bytes);
        assert_eq!(r.next_field(), Ok(Some((1, Value::Varint(3)))));
        assert_eq!(r.next_field(), Ok(Some((2, Value::Bytes(b"hi")))));
        assert_eq!(r.next_field(), Ok(None));
    }

    #[test]
    fn test_fixed_width_fields() {
        // field 3 fixed64, field 4 fixed32
        let mut bytes: Vec<u8> = vec![(3 << 3) | 1];
        bytes.extend_from_slice(&7u64.to_le_bytes());
        bytes.push((4 << 3) | 5);
        bytes.extend_from_slice(&9u32.to_le_bytes());
        let mut r = Reader::new(&bytes);
        assert_eq!(r.next_field(), Ok(Some((3, Value::Fixed64(7)))));
        assert_eq!(r.next_field(), Ok(Some((4, Value::Fixed32(9)))));
    }

    #[test]
    fn test_group_wire_type_rejected() {
        let bytes: [u8; 1] = [(1 << 3) | 3];
        assert_eq!(
            Reader::new(&bytes).next_field(),
            Err(DecodeError::UnsupportedWireType(3))
        );
    }

    #[test]
    fn test_field_zero_rejected() {
        assert_eq!(
            Reader::new(&[0x00, 0x01]).next_field(),
            Err(DecodeError::InvalidFieldNumber)
        );
    }

    #[test]
    fn test_length_past_end_rejected() {
        let bytes: [u8; 3] = [(1 << 3) | 2, 0x05, b'a'];
        assert_eq!(
            Reader::new(&bytes).next_field(),
            Err(DecodeError::Truncated)
        );
    }

    #[test]
    fn test_packed_and_unpacked_varints() {
        let mut w = Writer::new();
        w.packed_varints(2, &[1, 300, 5]);
        let packed = w.into_bytes();
        let mut out = Vec::new();
        let (_, value) = Reader::new(&packed).next_field().unwrap().unwrap();
        value.push_varints(2, &mut out).unwrap();
        Value::Varint(9).push_varints(2, &mut out).unwrap();
        assert_eq!(out, vec![1, 300, 5, 9]);
    }

    proptest! {
        #[test]
        fn prop_varint_round_trip(v in any::<u64>()) {
            let mut w = Writer::new();
            w.raw_varint(v);
            let bytes = w.into_bytes();
            let mut r = Reader::new(&bytes);
            prop_assert_eq!(r.read_varint(), Ok(v));
            prop_assert!(r.is_empty());
        }

        #[test]
        fn prop_reader_never_panics(bytes in proptest::collection::vec(any::<u8>(), 0..64)) {
            let mut r = Reader::new(&bytes);
            while let Ok(Some(_)) = r.next_field() {}
        }
    }
}
