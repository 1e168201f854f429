use crate::atom::Fourcc;
use crate::source::Source;
use crate::{Error, ErrorKind};

/// The size of a box header: a 32 bit unsigned length and a 4 byte
/// identifier.
pub(crate) const HEAD_LEN: u64 = 8;

/// The header of an MPEG-4 box: the total length in bytes including the
/// header itself, and the 4 byte identifier. A length field of 1 indicates a
/// 64 bit extended length following the identifier.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct Head {
    ext: bool,
    len: u64,
    fourcc: Fourcc,
}

impl Head {
    pub(crate) const fn new(ext: bool, len: u64, fourcc: Fourcc) -> Self {
        Self { ext, len, fourcc }
    }

    /// The total length of the box in bytes, header included. 0 means the
    /// box extends to the end of the file.
    pub(crate) fn len(&self) -> u64 {
        self.len
    }

    pub(crate) fn head_len(&self) -> u64 {
        if self.ext {
            HEAD_LEN + 8
        } else {
            HEAD_LEN
        }
    }

    pub(crate) fn content_len(&self) -> u64 {
        self.len - self.head_len()
    }

    pub(crate) fn ext(&self) -> bool {
        self.ext
    }

    pub(crate) fn fourcc(&self) -> Fourcc {
        self.fourcc
    }
}

/// Attempts to parse a box header from the source. Returns `Ok(None)` at a
/// clean end of input, an error if the length field is inconsistent with the
/// header size.
pub(crate) fn parse_head(src: &mut Source) -> crate::Result<Option<Head>> {
    let mut buf = [0u8; 8];
    if !src.read_or_eof(&mut buf)? {
        return Ok(None);
    }

    let len = u32::from_be_bytes([buf[0], buf[1], buf[2], buf[3]]) as u64;
    let fourcc = Fourcc([buf[4], buf[5], buf[6], buf[7]]);

    let head = if len == 1 {
        let mut ext = [0u8; 8];
        src.read_exact(&mut ext)?;
        Head::new(true, u64::from_be_bytes(ext), fourcc)
    } else {
        Head::new(false, len, fourcc)
    };

    if head.len() != 0 && head.len() < head.head_len() {
        return Err(Error::new(
            ErrorKind::Parsing,
            format!("Box {} is shorter than its header", head.fourcc()),
        ));
    }

    Ok(Some(head))
}
