use std::fmt;
use std::io;

/// A type alias for the result of fallible operations in this crate.
pub type Result<T> = std::result::Result<T, Error>;

/// A structure able to represent any error that may occur while reading,
/// editing or writing metadata.
#[derive(Debug)]
pub struct Error {
    /// The kind of error.
    pub kind: ErrorKind,
    /// A human readable description of the error.
    pub description: String,
}

impl Error {
    /// Creates a new `Error` of the provided kind and description.
    pub fn new(kind: ErrorKind, description: impl Into<String>) -> Self {
        Self { kind, description: description.into() }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match &self.kind {
            ErrorKind::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.description)
    }
}

impl From<io::Error> for Error {
    fn from(e: io::Error) -> Self {
        Self::new(ErrorKind::Io(e), "IO error")
    }
}

/// The different kinds of errors that may occur.
#[derive(Debug)]
pub enum ErrorKind {
    /// An IO error, wrapping the underlying `std::io::Error`. Read, seek,
    /// write and rename failures all surface through this kind.
    Io(io::Error),
    /// The file does not start with a valid `ftyp` box or its compatible
    /// brands do not identify it as an MP4 file.
    NotMp4,
    /// An operation that requires parsed metadata was called before
    /// [`parse`](crate::Mp4Tag::parse) succeeded.
    NotParsed,
    /// The handle has no open byte source.
    NotOpen,
    /// The handle is read-only: a stream, a file without write permission,
    /// or a file carrying MPEG-7 metadata.
    CannotWrite,
    /// A string operation was attempted on binary data or vice versa.
    Mismatch,
    /// The tag name is not part of the known tag list and cannot be created
    /// without explicit binary intent.
    TagNotFound(String),
    /// The tag store is empty.
    NoTags,
    /// The box structure is malformed or exceeds the supported nesting
    /// depth, or the file layout cannot be rewritten safely.
    UnableToProcess,
    /// An error while parsing the box structure.
    Parsing,
    /// A stream read did not complete within the configured timeout.
    Timeout,
}
