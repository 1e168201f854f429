use std::fmt;
use std::ops::Deref;

/// The first byte of an iTunes copyright-prefixed identifier.
pub(crate) const PREFIX_BYTE: u8 = 0xa9;
/// The two byte UTF-8 encoding of the copyright symbol used to display
/// copyright-prefixed identifiers.
pub(crate) const PREFIX_STR: &str = "\u{a9}";

/// Identifier of an atom containing information about the filetype.
pub(crate) const FILETYPE: Fourcc = Fourcc(*b"ftyp");
/// Identifier of an atom containing a structure of children storing metadata.
pub(crate) const MOVIE: Fourcc = Fourcc(*b"moov");
/// Identifier of an atom containing information about a single track.
pub(crate) const TRACK: Fourcc = Fourcc(*b"trak");
/// Identifier of an atom containing information about a track's media type and data.
pub(crate) const MEDIA: Fourcc = Fourcc(*b"mdia");
/// Identifier of an atom specifying the characteristics of a media atom.
pub(crate) const MEDIA_HEADER: Fourcc = Fourcc(*b"mdhd");
/// Identifier of an atom containing information about a track's media data.
pub(crate) const MEDIA_INFORMATION: Fourcc = Fourcc(*b"minf");
/// Identifier of an atom containing sample tables.
pub(crate) const SAMPLE_TABLE: Fourcc = Fourcc(*b"stbl");
/// Identifier of an atom containing a 32bit sample table chunk offset table.
pub(crate) const SAMPLE_TABLE_CHUNK_OFFSET: Fourcc = Fourcc(*b"stco");
/// Identifier of an atom containing a 64bit sample table chunk offset table.
pub(crate) const SAMPLE_TABLE_CHUNK_OFFSET_64: Fourcc = Fourcc(*b"co64");
/// Identifier of an atom containing user metadata.
pub(crate) const USER_DATA: Fourcc = Fourcc(*b"udta");
/// Identifier of an atom containing a metadata item list.
pub(crate) const METADATA: Fourcc = Fourcc(*b"meta");
/// Identifier of an atom specifying the handler component that interprets the metadata.
pub(crate) const HANDLER_REFERENCE: Fourcc = Fourcc(*b"hdlr");
/// Identifier of an atom containing a list of metadata atoms.
pub(crate) const ITEM_LIST: Fourcc = Fourcc(*b"ilst");
/// Identifier of an atom containing media data.
pub(crate) const MEDIA_DATA: Fourcc = Fourcc(*b"mdat");
/// Identifier of an atom containing discardable padding.
pub(crate) const FREE: Fourcc = Fourcc(*b"free");
/// Identifier of an atom containing typed data.
pub(crate) const DATA: Fourcc = Fourcc(*b"data");
/// Identifier of an atom containing the application identifier of a freeform tag.
pub(crate) const MEAN: Fourcc = Fourcc(*b"mean");
/// Identifier of an atom containing the key of a freeform tag, or a cover name.
pub(crate) const NAME: Fourcc = Fourcc(*b"name");
/// Identifier of a freeform metadata atom.
pub(crate) const FREEFORM: Fourcc = Fourcc(*b"----");
/// Identifier of a metadata atom containing artwork.
pub(crate) const ARTWORK: Fourcc = Fourcc(*b"covr");
/// Identifier of a metadata atom containing the track number.
pub(crate) const TRACK_NUMBER: Fourcc = Fourcc(*b"trkn");
/// Identifier of a metadata atom containing the disc number.
pub(crate) const DISC_NUMBER: Fourcc = Fourcc(*b"disk");
/// Identifier of a metadata atom containing an ID3 genre index.
pub(crate) const STANDARD_GENRE: Fourcc = Fourcc(*b"gnre");

/// The display name of the custom genre atom (`©gen`) the standard genre is
/// mapped to.
pub(crate) const CUSTOM_GENRE_NAME: &str = "\u{a9}gen";

/// A 4 byte atom identifier.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Fourcc(pub [u8; 4]);

impl Deref for Fourcc {
    type Target = [u8; 4];

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl fmt::Display for Fourcc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

impl fmt::Debug for Fourcc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Fourcc({})", self.display_name())
    }
}

impl Fourcc {
    /// Returns the identifier the way it is presented to users: the `0xa9`
    /// prefix byte is expanded to the two byte UTF-8 copyright symbol, other
    /// bytes are taken verbatim.
    pub(crate) fn display_name(&self) -> String {
        let mut name = String::with_capacity(5);
        let mut bytes = self.0.iter();
        match bytes.next() {
            Some(&PREFIX_BYTE) => name.push_str(PREFIX_STR),
            Some(&b) => name.push(char::from(b)),
            None => (),
        }
        for &b in bytes {
            name.push(char::from(b));
        }
        name
    }

    /// Parses a display name back into an identifier. Returns `None` if the
    /// name is neither 4 ASCII characters nor a copyright symbol followed by
    /// 3 ASCII characters.
    pub(crate) fn from_display_name(name: &str) -> Option<Self> {
        let bytes = name.as_bytes();
        if let Some(rest) = name.strip_prefix(PREFIX_STR) {
            let rest = rest.as_bytes();
            if rest.len() == 3 && rest.iter().all(u8::is_ascii) {
                return Some(Self([PREFIX_BYTE, rest[0], rest[1], rest[2]]));
            }
            return None;
        }
        if bytes.len() == 4 && bytes.iter().all(u8::is_ascii) {
            let mut id = [0u8; 4];
            id.copy_from_slice(bytes);
            return Some(Self(id));
        }
        None
    }
}
