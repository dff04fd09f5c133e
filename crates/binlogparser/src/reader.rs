use std::io::Read;

use crate::types::{DateTime, DateTimeKind, ParseError, TimeSpan};
use crate::version::FormatVersion;

/// Upper bound on the buffer reserved up front for a length-prefixed payload.
/// Longer payloads grow as bytes actually arrive, so a corrupt length cannot
/// force a huge allocation.
const MAX_PREALLOC: usize = 64 * 1024;

/// Read the format version from the first four bytes of a decompressed log.
pub(crate) fn read_header(reader: &mut impl Read) -> Result<FormatVersion, ParseError> {
    let mut buf = [0u8; 4];
    reader.read_exact(&mut buf)?;
    FormatVersion::new(i32::from_le_bytes(buf))
}

/// A forward-only reader over the decompressed record stream.
///
/// Every `read_*` has a `skip_*` twin that consumes exactly the same bytes
/// without allocating. The two must stay in lockstep: a single byte of drift
/// desynchronizes every record after it.
pub(crate) struct EventReader<R> {
    inner: R,
    pos: u64,
    pub version: FormatVersion,
}

impl<R: Read> EventReader<R> {
    pub fn new(inner: R, version: FormatVersion) -> Self {
        Self {
            inner,
            pos: 0,
            version,
        }
    }

    /// Bytes consumed since the header.
    pub fn bytes_read(&self) -> u64 {
        self.pos
    }

    fn fill(&mut self, buf: &mut [u8]) -> Result<(), ParseError> {
        self.inner.read_exact(buf)?;
        self.pos += buf.len() as u64;
        Ok(())
    }

    /// Skip n raw bytes.
    pub fn skip_bytes(&mut self, n: u64) -> Result<(), ParseError> {
        let copied = std::io::copy(&mut (&mut self.inner).take(n), &mut std::io::sink())?;
        self.pos += copied;
        if copied < n {
            return Err(ParseError::TruncatedStream);
        }
        Ok(())
    }

    pub fn read_byte(&mut self) -> Result<u8, ParseError> {
        let mut b = [0u8; 1];
        self.fill(&mut b)?;
        Ok(b[0])
    }

    /// Read a 7-bit encoded 32-bit integer, low-order group first.
    pub fn read_varint32(&mut self) -> Result<u32, ParseError> {
        let mut result: u32 = 0;
        let mut shift = 0;
        while shift < 35 {
            let b = self.read_byte()?;
            result |= ((b & 0x7F) as u32) << shift;
            if b & 0x80 == 0 {
                return Ok(result);
            }
            shift += 7;
        }
        Err(ParseError::MalformedVarint)
    }

    pub fn skip_varint32(&mut self) -> Result<(), ParseError> {
        for _ in 0..5 {
            if self.read_byte()? & 0x80 == 0 {
                return Ok(());
            }
        }
        Err(ParseError::MalformedVarint)
    }

    /// Read a 7-bit encoded integer as a signed value.
    pub fn read_int32(&mut self) -> Result<i32, ParseError> {
        Ok(self.read_varint32()? as i32)
    }

    /// Read a 7-bit encoded length or element count.
    pub fn read_count(&mut self, what: &str) -> Result<usize, ParseError> {
        let n = self.read_int32()?;
        usize::try_from(n).map_err(|_| ParseError::InvalidData(format!("negative {what}: {n}")))
    }

    pub fn read_bool(&mut self) -> Result<bool, ParseError> {
        Ok(self.read_byte()? != 0)
    }

    pub fn skip_bool(&mut self) -> Result<(), ParseError> {
        self.skip_bytes(1)
    }

    /// Read a fixed 8-byte little-endian i64.
    pub fn read_int64(&mut self) -> Result<i64, ParseError> {
        let mut b = [0u8; 8];
        self.fill(&mut b)?;
        Ok(i64::from_le_bytes(b))
    }

    pub fn skip_int64(&mut self) -> Result<(), ParseError> {
        self.skip_bytes(8)
    }

    /// Read a length-prefixed UTF-8 string. Invalid UTF-8 is replaced.
    pub fn read_string(&mut self) -> Result<String, ParseError> {
        let len = self.read_count("string length")?;
        if len == 0 {
            return Ok(String::new());
        }
        let mut bytes = Vec::with_capacity(len.min(MAX_PREALLOC));
        let got = (&mut self.inner).take(len as u64).read_to_end(&mut bytes)?;
        self.pos += got as u64;
        if got < len {
            return Err(ParseError::TruncatedStream);
        }
        Ok(match String::from_utf8(bytes) {
            Ok(s) => s,
            Err(e) => String::from_utf8_lossy(e.as_bytes()).into_owned(),
        })
    }

    pub fn skip_string(&mut self) -> Result<(), ParseError> {
        let len = self.read_count("string length")?;
        self.skip_bytes(len as u64)
    }

    /// Read a timestamp: i64 ticks followed by a 7-bit encoded kind.
    pub fn read_datetime(&mut self) -> Result<DateTime, ParseError> {
        let ticks = self.read_int64()?;
        let kind = DateTimeKind::from_i32(self.read_int32()?);
        Ok(DateTime { ticks, kind })
    }

    pub fn skip_datetime(&mut self) -> Result<(), ParseError> {
        self.skip_int64()?;
        self.skip_varint32()
    }

    pub fn read_timespan(&mut self) -> Result<TimeSpan, ParseError> {
        Ok(TimeSpan {
            ticks: self.read_int64()?,
        })
    }

    pub fn skip_timespan(&mut self) -> Result<(), ParseError> {
        self.skip_int64()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_util::encode_varint;

    fn reader(data: &[u8]) -> EventReader<&[u8]> {
        EventReader::new(data, FormatVersion::new(9).unwrap())
    }

    #[test]
    fn test_read_header() {
        let data = 7i32.to_le_bytes();
        let version = read_header(&mut &data[..]).unwrap();
        assert_eq!(version.get(), 7);
    }

    #[test]
    fn test_read_header_unsupported() {
        let data = 10i32.to_le_bytes();
        let result = read_header(&mut &data[..]);
        assert!(matches!(
            result,
            Err(ParseError::UnsupportedVersion { version: 10, .. })
        ));
    }

    #[test]
    fn test_read_header_short() {
        let data = [0x09, 0x00];
        let result = read_header(&mut &data[..]);
        assert!(matches!(result, Err(ParseError::TruncatedStream)));
    }

    #[test]
    fn test_read_varint32() {
        let mut r = reader(&[0x00]);
        assert_eq!(r.read_varint32().unwrap(), 0);

        let mut r = reader(&[0x7F]);
        assert_eq!(r.read_varint32().unwrap(), 127);

        // 128 => [0x80, 0x01]
        let mut r = reader(&[0x80, 0x01]);
        assert_eq!(r.read_varint32().unwrap(), 128);

        // 300 => [0xAC, 0x02]
        let mut r = reader(&[0xAC, 0x02]);
        assert_eq!(r.read_varint32().unwrap(), 300);
        assert_eq!(r.bytes_read(), 2);
    }

    #[test]
    fn test_read_int32_negative() {
        // -1 occupies all five groups.
        let mut r = reader(&[0xFF, 0xFF, 0xFF, 0xFF, 0x0F]);
        assert_eq!(r.read_int32().unwrap(), -1);
        assert_eq!(r.bytes_read(), 5);
    }

    #[test]
    fn test_varint_too_long() {
        let data = [0x80, 0x80, 0x80, 0x80, 0x80, 0x01];
        let mut r = reader(&data);
        assert!(matches!(r.read_varint32(), Err(ParseError::MalformedVarint)));

        let mut r = reader(&data);
        assert!(matches!(r.skip_varint32(), Err(ParseError::MalformedVarint)));
    }

    #[test]
    fn test_varint_truncated() {
        let mut r = reader(&[0x80, 0x80]);
        assert!(matches!(r.read_varint32(), Err(ParseError::TruncatedStream)));
    }

    #[test]
    fn test_read_bool() {
        let mut r = reader(&[0x00, 0x01, 0xFF]);
        assert!(!r.read_bool().unwrap());
        assert!(r.read_bool().unwrap());
        assert!(r.read_bool().unwrap());
    }

    #[test]
    fn test_read_int64() {
        let data = (-123456789i64).to_le_bytes();
        let mut r = reader(&data);
        assert_eq!(r.read_int64().unwrap(), -123456789);
    }

    #[test]
    fn test_read_string() {
        let data = [0x05, b'h', b'e', b'l', b'l', b'o'];
        let mut r = reader(&data);
        assert_eq!(r.read_string().unwrap(), "hello");

        let mut r = reader(&[0x00]);
        assert_eq!(r.read_string().unwrap(), "");
    }

    #[test]
    fn test_read_string_invalid_utf8() {
        let data = [0x03, 0xFF, 0xFE, 0xFD];
        let mut r = reader(&data);
        let s = r.read_string().unwrap();
        assert!(s.contains('\u{FFFD}'));
        assert_eq!(r.bytes_read(), 4);
    }

    #[test]
    fn test_read_string_truncated() {
        let data = [0x05, b'h', b'e'];
        let mut r = reader(&data);
        assert!(matches!(r.read_string(), Err(ParseError::TruncatedStream)));

        let mut r = reader(&data);
        assert!(matches!(r.skip_string(), Err(ParseError::TruncatedStream)));
    }

    #[test]
    fn test_read_string_negative_length() {
        let data = [0xFF, 0xFF, 0xFF, 0xFF, 0x0F];
        let mut r = reader(&data);
        assert!(matches!(r.read_string(), Err(ParseError::InvalidData(_))));
    }

    #[test]
    fn test_huge_length_does_not_preallocate() {
        // Declares ~2GiB but carries three bytes.
        let mut data = encode_varint(i32::MAX as u32);
        data.extend_from_slice(b"abc");
        let mut r = reader(&data);
        assert!(matches!(r.read_string(), Err(ParseError::TruncatedStream)));
    }

    #[test]
    fn test_read_datetime() {
        let mut data = Vec::new();
        data.extend_from_slice(&637_000_000_000_000_000i64.to_le_bytes());
        data.push(0x01);
        let mut r = reader(&data);
        let dt = r.read_datetime().unwrap();
        assert_eq!(dt.ticks, 637_000_000_000_000_000);
        assert_eq!(dt.kind, DateTimeKind::Utc);
        assert_eq!(r.bytes_read(), 9);
    }

    #[test]
    fn test_skip_matches_read() {
        let mut data = Vec::new();
        data.extend_from_slice(&encode_varint(70_000));
        data.push(0x01);
        data.extend_from_slice(&5i64.to_le_bytes());
        data.push(0x03);
        data.extend_from_slice(b"abc");
        data.extend_from_slice(&9i64.to_le_bytes());
        data.extend_from_slice(&encode_varint(2));
        data.extend_from_slice(&1i64.to_le_bytes());

        let mut r = reader(&data);
        r.read_varint32().unwrap();
        r.read_bool().unwrap();
        r.read_int64().unwrap();
        r.read_string().unwrap();
        r.read_datetime().unwrap();
        r.read_timespan().unwrap();
        let read = r.bytes_read();

        let mut s = reader(&data);
        s.skip_varint32().unwrap();
        s.skip_bool().unwrap();
        s.skip_int64().unwrap();
        s.skip_string().unwrap();
        s.skip_datetime().unwrap();
        s.skip_timespan().unwrap();

        assert_eq!(read, data.len() as u64);
        assert_eq!(s.bytes_read(), read);
    }

    mod prop {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn test_varint_round_trip(value in 0u32..=i32::MAX as u32) {
                let data = encode_varint(value);
                let mut r = reader(&data);
                prop_assert_eq!(r.read_varint32().unwrap(), value);
                prop_assert_eq!(r.bytes_read(), data.len() as u64);

                let mut s = reader(&data);
                s.skip_varint32().unwrap();
                prop_assert_eq!(s.bytes_read(), data.len() as u64);
            }

            #[test]
            fn test_string_round_trip(value in ".{0,200}") {
                let mut data = encode_varint(value.len() as u32);
                data.extend_from_slice(value.as_bytes());
                let mut r = reader(&data);
                prop_assert_eq!(r.read_string().unwrap(), value);
            }
        }
    }
}
