use crate::atom::head::{parse_head, HEAD_LEN};
use crate::atom::FILETYPE;
use crate::source::Source;
use crate::{Error, ErrorKind};

/// Major brands accepted for the filetype.
const MAJOR_BRANDS: [&[u8; 4]; 5] = [b"M4A ", b"kddi", b"isom", b"mp41", b"mp42"];
/// Compatible brands each counting towards acceptance.
const COMPATIBLE_BRANDS: [&[u8; 4]; 9] =
    [b"mp41", b"mp42", b"M4A ", b"M4B ", b"M4P ", b"3g2a", b"3gp4", b"3gp5", b"isom"];
/// Brands identifying MPEG-7 metadata.
const MPEG7_BRANDS: [&[u8; 4]; 2] = [b"mp71", b"mp7b"];

#[derive(Debug)]
pub(crate) struct Ftyp {
    /// Total size of the `ftyp` box in bytes.
    pub len: u64,
    /// The major brand, as presented by `filetype()`.
    pub major_brand: String,
    /// Whether the file carries MPEG-7 metadata and must not be modified.
    pub mp7meta: bool,
}

/// Reads the first box of the source, requires it to be a well scoring
/// `ftyp` box. Acceptance requires at least three points: one for the box
/// being present, one for a known major brand, one if byte 2 of the version
/// word is `0x02`, and one per known compatible brand.
pub(crate) fn parse_ftyp(src: &mut Source) -> crate::Result<Ftyp> {
    let head = parse_head(src)?.ok_or_else(|| {
        Error::new(ErrorKind::NotMp4, "Empty input, no ftyp box found".to_owned())
    })?;

    if head.fourcc() != FILETYPE {
        return Err(Error::new(
            ErrorKind::NotMp4,
            format!("Expected ftyp as the first box, found {}", head.fourcc()),
        ));
    }

    let body = src.read_vec(head.content_len())?;
    let mut score = 1;
    let mut mp7meta = false;
    let mut major_brand = String::new();

    let mut idx = 0;
    while idx + 4 <= body.len() {
        let token: &[u8] = &body[idx..idx + 4];
        if idx == 0 {
            major_brand = String::from_utf8_lossy(token).into_owned();
            if MAJOR_BRANDS.iter().any(|b| &b[..] == token) {
                score += 1;
            }
        } else if idx == 4 {
            if token[2] == 0x02 {
                score += 1;
            }
        } else {
            if COMPATIBLE_BRANDS.iter().any(|b| &b[..] == token) {
                score += 1;
            }
            if MPEG7_BRANDS.iter().any(|b| &b[..] == token) {
                mp7meta = true;
            }
        }
        idx += 4;
    }

    if score < 3 {
        return Err(Error::new(
            ErrorKind::NotMp4,
            format!("Unrecognized set of ftyp brands, major brand {major_brand}"),
        ));
    }

    Ok(Ftyp { len: HEAD_LEN + body.len() as u64, major_brand, mp7meta })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;
    use std::time::Duration;

    fn ftyp_bytes(body: &[u8]) -> Vec<u8> {
        let mut buf = Vec::new();
        buf.extend_from_slice(&(8 + body.len() as u32).to_be_bytes());
        buf.extend_from_slice(b"ftyp");
        buf.extend_from_slice(body);
        buf
    }

    fn source(bytes: Vec<u8>) -> Source {
        Source::stream(Cursor::new(bytes), Duration::from_millis(10))
    }

    #[test]
    fn accepts_m4a() {
        let mut body = Vec::new();
        body.extend_from_slice(b"M4A ");
        body.extend_from_slice(&[0, 0, 2, 0]);
        body.extend_from_slice(b"isom");
        body.extend_from_slice(b"mp42");
        let ftyp = parse_ftyp(&mut source(ftyp_bytes(&body))).unwrap();
        assert_eq!(ftyp.major_brand, "M4A ");
        assert!(!ftyp.mp7meta);
        assert_eq!(ftyp.len, 8 + 16);
    }

    #[test]
    fn rejects_unknown_brands() {
        let mut body = Vec::new();
        body.extend_from_slice(b"qt  ");
        body.extend_from_slice(&[0, 0, 0, 0]);
        body.extend_from_slice(b"qt  ");
        let err = parse_ftyp(&mut source(ftyp_bytes(&body))).unwrap_err();
        assert!(matches!(err.kind, ErrorKind::NotMp4));
    }

    #[test]
    fn rejects_missing_ftyp() {
        let mut buf = Vec::new();
        buf.extend_from_slice(&16u32.to_be_bytes());
        buf.extend_from_slice(b"mdat");
        buf.extend_from_slice(&[0u8; 8]);
        let err = parse_ftyp(&mut source(buf)).unwrap_err();
        assert!(matches!(err.kind, ErrorKind::NotMp4));
    }

    #[test]
    fn flags_mpeg7() {
        let mut body = Vec::new();
        body.extend_from_slice(b"isom");
        body.extend_from_slice(&[0, 0, 2, 0]);
        body.extend_from_slice(b"mp71");
        body.extend_from_slice(b"mp42");
        let ftyp = parse_ftyp(&mut source(ftyp_bytes(&body))).unwrap();
        assert!(ftyp.mp7meta);
    }
}
