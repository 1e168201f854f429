use std::fs::File;
use std::io::{self, ErrorKind as IoErrorKind, Read, Seek, SeekFrom};
use std::thread;
use std::time::{Duration, Instant};

use crate::{Error, ErrorKind};

/// Time slept between incomplete stream reads.
const RETRY_SLEEP: Duration = Duration::from_millis(2);

/// The byte source metadata is read from: either an owned file, or a
/// read-only forward-seekable stream bounded by a timeout.
pub(crate) enum Source {
    File(File),
    Stream(Stream),
}

pub(crate) struct Stream {
    reader: Box<dyn Read>,
    timeout: Duration,
}

impl Source {
    pub(crate) fn stream(reader: impl Read + 'static, timeout: Duration) -> Self {
        Self::Stream(Stream { reader: Box::new(reader), timeout })
    }

    pub(crate) fn is_stream(&self) -> bool {
        matches!(self, Self::Stream(_))
    }

    pub(crate) fn file_mut(&mut self) -> crate::Result<&mut File> {
        match self {
            Self::File(f) => Ok(f),
            Self::Stream(_) => {
                Err(Error::new(ErrorKind::CannotWrite, "Stream sources cannot be written to"))
            }
        }
    }

    /// Reads exactly `buf.len()` bytes. A short read is an error.
    pub(crate) fn read_exact(&mut self, buf: &mut [u8]) -> crate::Result<()> {
        if !self.read_or_eof(buf)? {
            return Err(Error::new(
                ErrorKind::Parsing,
                "Unexpected end of file inside a box".to_owned(),
            ));
        }
        Ok(())
    }

    pub(crate) fn read_vec(&mut self, len: u64) -> crate::Result<Vec<u8>> {
        let mut buf = vec![0u8; len as usize];
        self.read_exact(&mut buf)?;
        Ok(buf)
    }

    /// Attempts to fill `buf`. Returns `Ok(false)` if the source is already
    /// exhausted, `Ok(true)` on a complete read, and an error on a short
    /// read or when the stream timeout elapses.
    pub(crate) fn read_or_eof(&mut self, buf: &mut [u8]) -> crate::Result<bool> {
        match self {
            Self::File(f) => {
                let mut read = 0;
                while read < buf.len() {
                    match f.read(&mut buf[read..]) {
                        Ok(0) => break,
                        Ok(n) => read += n,
                        Err(e) if e.kind() == IoErrorKind::Interrupted => (),
                        Err(e) => {
                            return Err(Error::new(ErrorKind::Io(e), "Error reading file"));
                        }
                    }
                }
                match read {
                    0 => Ok(false),
                    n if n == buf.len() => Ok(true),
                    _ => Err(Error::new(
                        ErrorKind::Parsing,
                        "Unexpected end of file inside a box".to_owned(),
                    )),
                }
            }
            Self::Stream(s) => s.read_or_eof(buf),
        }
    }

    /// Seeks forward by `len` bytes. Streams consume and discard.
    pub(crate) fn skip(&mut self, len: u64) -> crate::Result<()> {
        match self {
            Self::File(f) => {
                f.seek(SeekFrom::Current(len as i64))
                    .map_err(|e| Error::new(ErrorKind::Io(e), "Error seeking in file"))?;
                Ok(())
            }
            Self::Stream(s) => s.skip(len),
        }
    }
}

impl Stream {
    fn read_or_eof(&mut self, buf: &mut [u8]) -> crate::Result<bool> {
        let deadline = Instant::now() + self.timeout;
        let mut read = 0;
        while read < buf.len() {
            match self.reader.read(&mut buf[read..]) {
                Ok(0) => break,
                Ok(n) => read += n,
                Err(e) if e.kind() == IoErrorKind::Interrupted => (),
                Err(e) if e.kind() == IoErrorKind::WouldBlock => {
                    if Instant::now() >= deadline {
                        return Err(Error::new(
                            ErrorKind::Timeout,
                            "Stream read timed out".to_owned(),
                        ));
                    }
                    thread::sleep(RETRY_SLEEP);
                }
                Err(e) => return Err(Error::new(ErrorKind::Io(e), "Error reading stream")),
            }
        }
        match read {
            0 => Ok(false),
            n if n == buf.len() => Ok(true),
            _ => Err(Error::new(
                ErrorKind::Parsing,
                "Unexpected end of stream inside a box".to_owned(),
            )),
        }
    }

    fn skip(&mut self, mut len: u64) -> crate::Result<()> {
        let mut scratch = [0u8; 8 * 1024];
        while len > 0 {
            let chunk = scratch.len().min(len as usize);
            if !self.read_or_eof(&mut scratch[..chunk])? {
                return Err(Error::new(
                    ErrorKind::Parsing,
                    "Unexpected end of stream while seeking forward".to_owned(),
                ));
            }
            len -= chunk as u64;
        }
        Ok(())
    }
}

impl io::Read for Source {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self {
            Self::File(f) => f.read(buf),
            Self::Stream(s) => s.reader.read(buf),
        }
    }
}
