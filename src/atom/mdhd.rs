use std::io::Cursor;

use crate::atom::util::ReadUtil;
use crate::{Error, ErrorKind};

/// The decoded contents of a media header (`mdhd`) box.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub(crate) struct Mdhd {
    pub creation_date: u64,
    pub modification_date: u64,
    pub timescale: u32,
    pub duration_millis: u64,
}

/// Decodes a media header body. Version 0 carries 32 bit dates and duration,
/// version 1 carries 64 bit ones. Returns `None` for a zero duration.
pub(crate) fn parse_mdhd(body: &[u8]) -> crate::Result<Option<Mdhd>> {
    let mut cursor = Cursor::new(body);
    let flags = cursor
        .read_be_u32()
        .map_err(|e| Error::new(ErrorKind::Io(e), "Error reading mdhd version"))?;

    let (creation_date, modification_date, timescale, duration) = if flags & 0xff00_0000 == 0 {
        let c = read_u32(&mut cursor)? as u64;
        let m = read_u32(&mut cursor)? as u64;
        let t = read_u32(&mut cursor)?;
        let d = read_u32(&mut cursor)? as u64;
        (c, m, t, d)
    } else {
        let c = read_u64(&mut cursor)?;
        let m = read_u64(&mut cursor)?;
        let t = read_u32(&mut cursor)?;
        let d = read_u64(&mut cursor)?;
        (c, m, t, d)
    };

    if duration == 0 || timescale == 0 {
        return Ok(None);
    }

    let duration_millis = (duration as f64 * 1000.0 / timescale as f64) as u64;
    Ok(Some(Mdhd { creation_date, modification_date, timescale, duration_millis }))
}

fn read_u32(cursor: &mut Cursor<&[u8]>) -> crate::Result<u32> {
    cursor.read_be_u32().map_err(|e| Error::new(ErrorKind::Io(e), "mdhd box too short"))
}

fn read_u64(cursor: &mut Cursor<&[u8]>) -> crate::Result<u64> {
    cursor.read_be_u64().map_err(|e| Error::new(ErrorKind::Io(e), "mdhd box too short"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_0() {
        let mut body = Vec::new();
        body.extend_from_slice(&[0u8; 4]);
        body.extend_from_slice(&100u32.to_be_bytes());
        body.extend_from_slice(&200u32.to_be_bytes());
        body.extend_from_slice(&44100u32.to_be_bytes());
        body.extend_from_slice(&441000u32.to_be_bytes());
        body.extend_from_slice(&[0u8; 4]);

        let mdhd = parse_mdhd(&body).unwrap().unwrap();
        assert_eq!(mdhd.timescale, 44100);
        assert_eq!(mdhd.duration_millis, 10_000);
        assert_eq!(mdhd.creation_date, 100);
    }

    #[test]
    fn version_1() {
        let mut body = Vec::new();
        body.extend_from_slice(&[1, 0, 0, 0]);
        body.extend_from_slice(&300u64.to_be_bytes());
        body.extend_from_slice(&400u64.to_be_bytes());
        body.extend_from_slice(&1000u32.to_be_bytes());
        body.extend_from_slice(&1500u64.to_be_bytes());
        body.extend_from_slice(&[0u8; 4]);

        let mdhd = parse_mdhd(&body).unwrap().unwrap();
        assert_eq!(mdhd.duration_millis, 1500);
        assert_eq!(mdhd.modification_date, 400);
    }

    #[test]
    fn zero_duration() {
        let mut body = Vec::new();
        body.extend_from_slice(&[0u8; 4]);
        body.extend_from_slice(&[0u8; 16]);
        body.extend_from_slice(&[0u8; 4]);
        assert_eq!(parse_mdhd(&body).unwrap(), None);
    }
}
