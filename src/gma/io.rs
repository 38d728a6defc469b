#![forbid(unsafe_code)]

use std::io::{ErrorKind, Read, Write};

use crate::gma::error::{FormatError, FormatResult};

/// `read_exact` that reports a short read as truncation of `what`.
pub fn read_exact<const N: usize>(r: &mut dyn Read, what: &'static str) -> FormatResult<[u8; N]> {
    let mut buf = [0u8; N];
    r.read_exact(&mut buf).map_err(|e| eof_as_truncated(e, what))?;
    Ok(buf)
}

pub fn read_u8(r: &mut dyn Read, what: &'static str) -> FormatResult<u8> {
    Ok(read_exact::<1>(r, what)?[0])
}

pub fn read_u32(r: &mut dyn Read, what: &'static str) -> FormatResult<u32> {
    Ok(u32::from_le_bytes(read_exact::<4>(r, what)?))
}

pub fn read_i32(r: &mut dyn Read, what: &'static str) -> FormatResult<i32> {
    Ok(i32::from_le_bytes(read_exact::<4>(r, what)?))
}

pub fn read_u64(r: &mut dyn Read, what: &'static str) -> FormatResult<u64> {
    Ok(u64::from_le_bytes(read_exact::<8>(r, what)?))
}

pub fn read_i64(r: &mut dyn Read, what: &'static str) -> FormatResult<i64> {
    Ok(i64::from_le_bytes(read_exact::<8>(r, what)?))
}

/// Reads bytes up to (and consuming) a NUL terminator.
pub fn read_cstr(r: &mut dyn Read, what: &'static str) -> FormatResult<String> {
    let mut bytes = Vec::new();
    loop {
        let b = read_u8(r, what)?;
        if b == 0 {
            break;
        }
        bytes.push(b);
    }
    String::from_utf8(bytes).map_err(|_| FormatError::InvalidUtf8(what))
}

pub fn write_u32(w: &mut dyn Write, v: u32) -> std::io::Result<()> {
    w.write_all(&v.to_le_bytes())
}

pub fn write_i32(w: &mut dyn Write, v: i32) -> std::io::Result<()> {
    w.write_all(&v.to_le_bytes())
}

pub fn write_u64(w: &mut dyn Write, v: u64) -> std::io::Result<()> {
    w.write_all(&v.to_le_bytes())
}

pub fn write_i64(w: &mut dyn Write, v: i64) -> std::io::Result<()> {
    w.write_all(&v.to_le_bytes())
}

/// Writes `s` followed by a NUL terminator.
pub fn write_cstr(w: &mut dyn Write, s: &str) -> std::io::Result<()> {
    w.write_all(s.as_bytes())?;
    w.write_all(&[0])
}

pub(crate) fn eof_as_truncated(e: std::io::Error, what: &'static str) -> FormatError {
    if e.kind() == ErrorKind::UnexpectedEof {
        FormatError::Truncated(what)
    } else {
        FormatError::Io(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn cstr_stops_at_nul() {
        let mut cur = Cursor::new(b"abc\0def\0".to_vec());
        assert_eq!(read_cstr(&mut cur, "name").unwrap(), "abc");
        assert_eq!(read_cstr(&mut cur, "name").unwrap(), "def");
    }

    #[test]
    fn cstr_without_terminator_is_truncated() {
        let mut cur = Cursor::new(b"abc".to_vec());
        assert!(matches!(
            read_cstr(&mut cur, "name"),
            Err(FormatError::Truncated("name"))
        ));
    }

    #[test]
    fn cstr_rejects_bad_utf8() {
        let mut cur = Cursor::new(vec![0xff, 0xfe, 0]);
        assert!(matches!(
            read_cstr(&mut cur, "author"),
            Err(FormatError::InvalidUtf8("author"))
        ));
    }

    #[test]
    fn short_integer_is_truncated() {
        let mut cur = Cursor::new(vec![1, 2]);
        assert!(matches!(
            read_u32(&mut cur, "entry crc"),
            Err(FormatError::Truncated("entry crc"))
        ));
    }

    #[test]
    fn integers_are_little_endian() {
        let mut out = Vec::new();
        write_u32(&mut out, 0x0403_0201).unwrap();
        write_i64(&mut out, -2).unwrap();
        assert_eq!(&out[..4], &[1, 2, 3, 4]);

        let mut cur = Cursor::new(out);
        assert_eq!(read_u32(&mut cur, "x").unwrap(), 0x0403_0201);
        assert_eq!(read_i64(&mut cur, "y").unwrap(), -2);
    }
}
