use std::cmp::Ordering;
use std::fmt;
use std::str;

use crate::atom::ARTWORK;

/// The storage class of a `data` sub-box, as encoded in the lower 24 bits of
/// its type field.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DataKind {
    /// Untyped binary data (`0x00`).
    Binary,
    /// A UTF-8 string without terminator (`0x01`).
    Utf8,
    /// A JPEG image (`0x0d`).
    Jpeg,
    /// A PNG image (`0x0e`).
    Png,
    /// A big-endian signed integer of 1, 2, 4 or 8 bytes (`0x15`).
    Integer,
    /// Any other type code, preserved for re-emission.
    Other(u32),
}

impl DataKind {
    pub(crate) fn code(self) -> u32 {
        match self {
            Self::Binary => 0x00,
            Self::Utf8 => 0x01,
            Self::Jpeg => 0x0d,
            Self::Png => 0x0e,
            Self::Integer => 0x15,
            Self::Other(c) => c,
        }
    }

    pub(crate) fn from_code(code: u32) -> Self {
        match code {
            0x00 => Self::Binary,
            0x01 => Self::Utf8,
            0x0d => Self::Jpeg,
            0x0e => Self::Png,
            0x15 => Self::Integer,
            c => Self::Other(c),
        }
    }

    /// Returns true for the image storage classes.
    pub fn is_image(self) -> bool {
        matches!(self, Self::Jpeg | Self::Png)
    }
}

/// A single metadata value.
///
/// Multiple values stored under the same name (primarily cover images) are
/// distinguished by their [`data_index`](Self::data_index).
#[derive(Clone, PartialEq)]
pub struct TagEntry {
    pub(crate) name: String,
    pub(crate) data_index: u32,
    pub(crate) kind: DataKind,
    pub(crate) internal_len: u32,
    pub(crate) data: Vec<u8>,
    pub(crate) cover_name: Option<String>,
    pub(crate) priority: i32,
    pub(crate) binary: bool,
}

impl TagEntry {
    pub(crate) fn new(name: impl Into<String>, kind: DataKind) -> Self {
        Self {
            name: name.into(),
            data_index: 0,
            kind,
            internal_len: 0,
            data: Vec::new(),
            cover_name: None,
            priority: crate::tag::defs::PRIORITY_MAX,
            binary: false,
        }
    }

    /// The tag name: a 4 character identifier such as `trkn`, a copyright
    /// prefixed identifier such as `©nam`, or a freeform
    /// `----:<application>:<key>` triple.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The zero based position of this value within a multi-valued tag.
    pub fn data_index(&self) -> u32 {
        self.data_index
    }

    /// The storage class this value was read with, or will be written with.
    pub fn kind(&self) -> DataKind {
        self.kind
    }

    /// The raw value bytes. Strings are UTF-8 without terminator, numbers
    /// are held in their decimal representation, images and data tags hold
    /// the original bytes.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// The value as a string, `None` for binary values.
    pub fn data_str(&self) -> Option<&str> {
        if self.binary {
            return None;
        }
        str::from_utf8(&self.data).ok()
    }

    /// The name accompanying a cover image, if any.
    pub fn cover_name(&self) -> Option<&str> {
        self.cover_name.as_deref()
    }

    /// Returns true for image and data values.
    pub fn is_binary(&self) -> bool {
        self.binary
    }

    pub(crate) fn cmp_key(&self, other: &Self) -> Ordering {
        self.name.cmp(&other.name).then(self.data_index.cmp(&other.data_index))
    }
}

impl fmt::Debug for TagEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut s = f.debug_struct("TagEntry");
        s.field("name", &self.name).field("data_index", &self.data_index).field("kind", &self.kind);
        match self.data_str() {
            Some(d) => s.field("data", &d),
            None => s.field("data_len", &self.data.len()),
        };
        if let Some(cn) = &self.cover_name {
            s.field("cover_name", cn);
        }
        s.finish()
    }
}

/// A tag name broken into its base name, the optional value index, and
/// whether the trailing `name` selector addressing a cover name was present.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct TagName {
    pub base: String,
    pub data_index: Option<u32>,
    pub cover_name: bool,
}

impl TagName {
    pub(crate) fn index(&self) -> u32 {
        self.data_index.unwrap_or(0)
    }

    pub(crate) fn is_freeform(&self) -> bool {
        self.base.starts_with("----")
    }

    pub(crate) fn is_artwork(&self) -> bool {
        self.base.as_bytes().get(..4) == Some(&ARTWORK[..])
    }
}

/// Breaks a raw tag name into its components.
///
/// `<id>`, `<id>:<index>` and `covr:<index>:name` select plain tags, a value
/// of a multi-valued tag, and a cover name respectively. Freeform names have
/// the form `----:<application>:<key>`, optionally followed by `:<index>`.
pub(crate) fn parse_tag_name(raw: &str) -> TagName {
    let freeform_prefix = "----:";

    let (head, tail) = if let Some(rest) = raw.strip_prefix(freeform_prefix) {
        match rest.find(':') {
            Some(sep) => {
                let (mean, key) = rest.split_at(sep);
                let mut parts = key[1..].splitn(3, ':');
                let key = parts.next().unwrap_or_default();
                let base = format!("{}{}:{}", freeform_prefix, mean, key);
                (base, parts.collect::<Vec<_>>())
            }
            None => (raw.to_owned(), Vec::new()),
        }
    } else {
        let mut parts = raw.splitn(3, ':');
        let base = parts.next().unwrap_or_default().to_owned();
        (base, parts.collect::<Vec<_>>())
    };

    let mut name = TagName { base: head, data_index: None, cover_name: false };

    if let Some(idx) = tail.first() {
        name.data_index = Some(idx.parse().unwrap_or(0));
        if tail.get(1).copied() == Some("name") {
            name.cover_name = true;
        }
    }

    name
}
