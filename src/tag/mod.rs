use std::fmt;
use std::fs::{self, OpenOptions};
use std::io::{Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::atom::ftyp::parse_ftyp;
use crate::atom::ilst::build_ilst;
use crate::atom::mdhd::Mdhd;
use crate::atom::parse::{parse_source, ParseInfo};
use crate::source::Source;
use crate::tag::defs::find_def;
use crate::tag::entry::{parse_tag_name, DataKind, TagEntry, TagName};
use crate::{write, Error, ErrorKind};

mod accessors;
pub(crate) mod defs;
pub(crate) mod entry;
mod readonly;

/// A handle to the metadata of an MP4 file.
///
/// The lifecycle is open → [`parse`](Self::parse) → mutate →
/// [`write`](Self::write). Parsing records the absolute file offsets the
/// writer depends on, so after a successful write the handle has to be
/// parsed again before further mutations are written.
pub struct Mp4Tag {
    pub(crate) path: Option<PathBuf>,
    pub(crate) src: Option<Source>,
    pub(crate) canwrite: bool,
    pub(crate) mp7meta: bool,
    ftyp_checked: bool,
    data_start: u64,
    file_size: u64,
    filetype: String,
    pub(crate) parsed: bool,
    pub(crate) entries: Vec<TagEntry>,
    pub(crate) info: ParseInfo,
    pub(crate) mdhd: Option<Mdhd>,
    pub(crate) free_space: u32,
    pub(crate) keep_backup: bool,
}

impl Mp4Tag {
    /// Opens the file read-write, falling back to read-only, and verifies
    /// its `ftyp` box.
    pub fn open(path: impl AsRef<Path>) -> crate::Result<Self> {
        let path = path.as_ref();
        let (file, canwrite) = match OpenOptions::new().read(true).write(true).open(path) {
            Ok(f) => (f, true),
            Err(_) => {
                let f = OpenOptions::new().read(true).open(path).map_err(|e| {
                    Error::new(ErrorKind::Io(e), format!("Error opening {}", path.display()))
                })?;
                (f, false)
            }
        };

        let file_size = file
            .metadata()
            .map_err(|e| Error::new(ErrorKind::Io(e), "Error reading file metadata"))?
            .len();

        let mut src = Source::File(file);
        let ftyp = parse_ftyp(&mut src)?;

        Ok(Self {
            path: Some(path.to_owned()),
            src: Some(src),
            canwrite,
            mp7meta: ftyp.mp7meta,
            ftyp_checked: true,
            data_start: ftyp.len,
            file_size,
            filetype: ftyp.major_brand,
            parsed: false,
            entries: Vec::new(),
            info: ParseInfo::default(),
            mdhd: None,
            free_space: write::FREE_SPACE_DEFAULT,
            keep_backup: false,
        })
    }

    /// Opens the file and parses its metadata in one step.
    pub fn read_from_path(path: impl AsRef<Path>) -> crate::Result<Self> {
        let mut tag = Self::open(path)?;
        tag.parse()?;
        Ok(tag)
    }

    /// Attaches to a sequential stream. The handle is read-only, any write
    /// call fails with [`ErrorKind::CannotWrite`]. The `ftyp` box is
    /// verified when [`parse`](Self::parse) is called. Incomplete reads are
    /// retried until `timeout` elapses.
    pub fn from_stream(reader: impl Read + 'static, timeout: Duration) -> Self {
        Self {
            path: None,
            src: Some(Source::stream(reader, timeout)),
            canwrite: false,
            mp7meta: false,
            ftyp_checked: false,
            data_start: 0,
            file_size: 0,
            filetype: String::new(),
            parsed: false,
            entries: Vec::new(),
            info: ParseInfo::default(),
            mdhd: None,
            free_space: write::FREE_SPACE_DEFAULT,
            keep_backup: false,
        }
    }

    /// Parses the box tree: collects the tags, the duration, and the file
    /// offsets a later [`write`](Self::write) needs.
    pub fn parse(&mut self) -> crate::Result<()> {
        self.parsed = false;
        self.entries.clear();

        let is_stream = match &self.src {
            Some(s) => s.is_stream(),
            None => return Err(not_open()),
        };

        if is_stream {
            if self.ftyp_checked {
                return Err(Error::new(
                    ErrorKind::Parsing,
                    "A stream can only be parsed once".to_owned(),
                ));
            }
            let src = self.src.as_mut().ok_or_else(not_open)?;
            let ftyp = parse_ftyp(src)?;
            self.mp7meta = ftyp.mp7meta;
            self.data_start = ftyp.len;
            self.filetype = ftyp.major_brand;
            self.ftyp_checked = true;
        } else {
            let src = self.src.as_mut().ok_or_else(not_open)?;
            let file = src.file_mut()?;
            self.file_size = file
                .metadata()
                .map_err(|e| Error::new(ErrorKind::Io(e), "Error reading file metadata"))?
                .len();
            file.seek(SeekFrom::Start(self.data_start))
                .map_err(|e| Error::new(ErrorKind::Io(e), "Error seeking in file"))?;
        }

        let src = self.src.as_mut().ok_or_else(not_open)?;
        let mut out = parse_source(src, self.data_start, self.file_size, self.canwrite)?;

        if out.info.needs_heal && self.canwrite && !is_stream {
            // heal container lengths written by the buggy 1.3.0 version,
            // then parse the fixed file from scratch
            let leak = out.info.ilst_remaining;
            let src = self.src.as_mut().ok_or_else(not_open)?;
            let file = src.file_mut()?;
            write::update_parent_lengths(file, &out.info.parents, -leak)?;
            file.seek(SeekFrom::Start(self.data_start))
                .map_err(|e| Error::new(ErrorKind::Io(e), "Error seeking in file"))?;
            out = parse_source(src, self.data_start, self.file_size, self.canwrite)?;
        }

        self.info = out.info;
        self.entries = out.entries;
        self.mdhd = out.mdhd;
        self.sort_entries();
        self.parsed = true;
        Ok(())
    }

    /// Returns the tag addressed by `name`, using the same name grammar as
    /// [`set_tag`](Self::set_tag). Returns `None` before a successful parse.
    pub fn find_tag(&self, name: &str) -> Option<&TagEntry> {
        if !self.parsed {
            return None;
        }
        let tn = parse_tag_name(name);
        self.find_entry(&tn.base, tn.index()).map(|i| &self.entries[i])
    }

    /// Returns an iterator over all tags, sorted by name and value index.
    pub fn tags(&self) -> std::slice::Iter<'_, TagEntry> {
        self.entries.iter()
    }

    /// Sets a tag from a string value.
    ///
    /// Tag names follow the grammar `<id>`, `<id>:<index>`,
    /// `covr:<index>:name` and `----:<application>:<key>`. When the
    /// addressed tag holds binary data, or `force_binary` is set, `value`
    /// names a file whose contents become the tag data. New tags must be
    /// known or freeform.
    pub fn set_tag(&mut self, name: &str, value: &str, force_binary: bool) -> crate::Result<()> {
        self.ensure_parsed()?;
        let tn = parse_tag_name(name);

        let mut binary =
            self.find_entry(&tn.base, tn.index()).map(|i| self.entries[i].binary).unwrap_or(false);
        if tn.is_artwork() {
            binary = !tn.cover_name;
        }
        if force_binary {
            binary = true;
        }

        if binary {
            let data = fs::read(value)
                .map_err(|e| Error::new(ErrorKind::Io(e), format!("Error reading {}", value)))?;
            self.set_binary_value(&tn, &data, Some(Path::new(value)))
        } else {
            self.set_string_value_inner(&tn, value)
        }
    }

    /// Sets a tag from raw bytes.
    ///
    /// Existing string tags are not overwritten (that fails with
    /// [`ErrorKind::Mismatch`]). A bare `covr` name appends a new cover at
    /// the next index, `covr:<index>` replaces that slot. Unknown tag names
    /// are accepted as-is; the resulting file may not be readable by other
    /// applications.
    pub fn set_binary_tag(&mut self, name: &str, data: &[u8]) -> crate::Result<()> {
        self.ensure_parsed()?;
        let tn = parse_tag_name(name);
        self.set_binary_value(&tn, data, None)
    }

    /// Deletes the tag addressed by `name`, or only the cover name when the
    /// `covr:<index>:name` form is used. Returns `Ok(false)` when there was
    /// no such tag.
    pub fn delete_tag(&mut self, name: &str) -> crate::Result<bool> {
        self.ensure_parsed()?;
        let tn = parse_tag_name(name);
        match self.find_entry(&tn.base, tn.index()) {
            Some(i) => {
                if tn.is_artwork() && tn.cover_name {
                    self.entries[i].cover_name = None;
                } else {
                    self.entries.remove(i);
                    self.sort_entries();
                }
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Removes all tags.
    pub fn clean_tags(&mut self) -> crate::Result<()> {
        self.ensure_parsed()?;
        self.entries.clear();
        Ok(())
    }

    /// Writes the current tag store back to the file, in place when the new
    /// `ilst` fits its existing footprint plus adjacent free space, through
    /// an atomic temp-file rewrite otherwise. After a successful write the
    /// handle has to be parsed again.
    pub fn write(&mut self) -> crate::Result<()> {
        if !self.canwrite {
            return Err(Error::new(
                ErrorKind::CannotWrite,
                "The file was opened without write permission".to_owned(),
            ));
        }
        if self.mp7meta {
            return Err(Error::new(
                ErrorKind::CannotWrite,
                "Files carrying MPEG-7 metadata cannot be modified".to_owned(),
            ));
        }
        self.ensure_parsed()?;

        let body = build_ilst(&mut self.entries);
        let result = write::write_data(self, &body);
        // the recorded offsets are spent, require a fresh parse
        self.parsed = false;
        result
    }

    /// Deep-clones the tag store so it can be restored later, possibly onto
    /// another handle.
    pub fn preserve(&self) -> crate::Result<TagSnapshot> {
        self.ensure_parsed()?;
        if self.entries.is_empty() {
            return Err(Error::new(ErrorKind::NoTags, "There are no tags to preserve".to_owned()));
        }
        Ok(TagSnapshot { entries: self.entries.clone() })
    }

    /// Replaces the tag store with a preserved snapshot.
    pub fn restore(&mut self, snapshot: &TagSnapshot) -> crate::Result<()> {
        self.ensure_parsed()?;
        self.entries = snapshot.entries.clone();
        self.sort_entries();
        Ok(())
    }

    /// Keeps the `.bak` copy of the original file around after a write.
    pub fn set_keep_backup(&mut self, keep: bool) {
        self.keep_backup = keep;
    }

    /// Configures the body size of the free box planted after a rewritten
    /// `ilst`. Defaults to 2048 bytes.
    pub fn set_free_space(&mut self, size: u32) {
        self.free_space = size;
    }

    // store internals

    fn ensure_parsed(&self) -> crate::Result<()> {
        if self.parsed {
            Ok(())
        } else {
            Err(Error::new(ErrorKind::NotParsed, "The file has not been parsed yet".to_owned()))
        }
    }

    pub(crate) fn find_entry(&self, name: &str, index: u32) -> Option<usize> {
        self.entries
            .binary_search_by(|e| e.name.as_str().cmp(name).then(e.data_index.cmp(&index)))
            .ok()
    }

    /// Keeps the store sorted by `(name, data_index)` with the indices of
    /// every name forming a dense prefix starting at 0.
    fn sort_entries(&mut self) {
        self.entries.sort_by(|a, b| a.cmp_key(b));

        let mut start = 0;
        while start < self.entries.len() {
            let mut end = start + 1;
            while end < self.entries.len() && self.entries[end].name == self.entries[start].name {
                end += 1;
            }
            for (index, entry) in self.entries[start..end].iter_mut().enumerate() {
                entry.data_index = index as u32;
            }
            start = end;
        }
    }

    fn add_entry(&mut self, entry: TagEntry) {
        self.entries.push(entry);
        self.sort_entries();
    }

    fn set_string_value_inner(&mut self, tn: &TagName, data: &str) -> crate::Result<()> {
        if let Some(i) = self.find_entry(&tn.base, tn.index()) {
            if tn.is_artwork() {
                if tn.cover_name {
                    self.entries[i].cover_name = Some(data.to_owned());
                    return Ok(());
                }
                return Err(Error::new(
                    ErrorKind::Mismatch,
                    "Cover images are set from binary data".to_owned(),
                ));
            }
            if self.entries[i].binary {
                return Err(Error::new(
                    ErrorKind::Mismatch,
                    format!("Tag {} holds binary data", tn.base),
                ));
            }
            let entry = &mut self.entries[i];
            entry.data = data.as_bytes().to_vec();
            if entry.kind == DataKind::Utf8 {
                entry.internal_len = data.len() as u32;
            }
            return Ok(());
        }

        let (kind, internal_len) = if tn.is_freeform() {
            (DataKind::Utf8, data.len() as u32)
        } else {
            let def = find_def(&tn.base).ok_or_else(|| {
                Error::new(
                    ErrorKind::TagNotFound(tn.base.clone()),
                    format!("Unknown tag {}", tn.base),
                )
            })?;
            if tn.is_artwork() && tn.cover_name {
                return Err(Error::new(
                    ErrorKind::TagNotFound(tn.base.clone()),
                    format!("No cover at index {} to name", tn.index()),
                ));
            }
            let valid = match def.kind {
                DataKind::Utf8 | DataKind::Integer => true,
                DataKind::Binary => tn.base == "trkn" || tn.base == "disk",
                _ => false,
            };
            if !valid {
                return Err(Error::new(
                    ErrorKind::Mismatch,
                    format!("Tag {} cannot be set from a string", tn.base),
                ));
            }
            let len = if def.kind == DataKind::Utf8 { data.len() as u32 } else { def.len };
            (def.kind, len)
        };

        let mut entry = TagEntry::new(tn.base.clone(), kind);
        entry.data = data.as_bytes().to_vec();
        entry.internal_len = internal_len;
        entry.data_index = tn.index();
        self.add_entry(entry);
        Ok(())
    }

    fn set_binary_value(
        &mut self,
        tn: &TagName,
        data: &[u8],
        path: Option<&Path>,
    ) -> crate::Result<()> {
        if tn.cover_name {
            return Err(Error::new(
                ErrorKind::Mismatch,
                "A cover name is not binary data".to_owned(),
            ));
        }

        let existing = if tn.is_artwork() && tn.data_index.is_none() {
            // a bare covr name appends instead of replacing index 0
            None
        } else {
            self.find_entry(&tn.base, tn.index())
        };

        if let Some(i) = existing {
            if !self.entries[i].binary {
                return Err(Error::new(
                    ErrorKind::Mismatch,
                    format!("Tag {} holds a string value", tn.base),
                ));
            }
            let kind = binary_kind(tn, data, path);
            let entry = &mut self.entries[i];
            entry.data = data.to_vec();
            entry.internal_len = data.len() as u32;
            entry.kind = kind;
            return Ok(());
        }

        if tn.base == "trkn" || tn.base == "disk" {
            return Err(Error::new(
                ErrorKind::Mismatch,
                format!("Tag {} is set from its pair representation", tn.base),
            ));
        }
        if !tn.is_freeform() {
            if let Some(def) = find_def(&tn.base) {
                let valid = matches!(def.kind, DataKind::Binary | DataKind::Jpeg | DataKind::Png);
                if !valid {
                    return Err(Error::new(
                        ErrorKind::Mismatch,
                        format!("Tag {} does not hold binary data", tn.base),
                    ));
                }
            }
        }

        let index = match tn.data_index {
            Some(i) => i,
            None if tn.is_artwork() => {
                self.entries.iter().filter(|e| e.name == tn.base).count() as u32
            }
            None => 0,
        };

        let mut entry = TagEntry::new(tn.base.clone(), binary_kind(tn, data, path));
        entry.data = data.to_vec();
        entry.internal_len = data.len() as u32;
        entry.data_index = index;
        entry.binary = true;
        self.add_entry(entry);
        Ok(())
    }

    // accessor plumbing used by the generated per-tag methods

    pub(crate) fn string_value(&self, name: &str) -> Option<&str> {
        self.find_entry(name, 0).and_then(move |i| self.entries[i].data_str())
    }

    pub(crate) fn set_string_value(&mut self, name: &str, value: &str) -> crate::Result<()> {
        self.set_tag(name, value, false)
    }

    pub(crate) fn remove_value(&mut self, name: &str) {
        if self.parsed {
            let _ = self.delete_tag(name);
        }
    }

    pub(crate) fn flag_value(&self, name: &str) -> bool {
        self.string_value(name) == Some("1")
    }

    pub(crate) fn set_flag_value(&mut self, name: &str) -> crate::Result<()> {
        self.set_tag(name, "1", false)
    }

    pub(crate) fn u16_value(&self, name: &str) -> Option<u16> {
        self.string_value(name)?.parse().ok()
    }

    pub(crate) fn set_u16_value(&mut self, name: &str, value: u16) -> crate::Result<()> {
        self.set_tag(name, &value.to_string(), false)
    }
}

impl fmt::Display for Mp4Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.format_duration(f)?;
        for entry in &self.entries {
            match entry.data_str() {
                Some(s) => writeln!(f, "{}: {}", entry.name, s)?,
                None => writeln!(f, "{}: <{} bytes>", entry.name, entry.data.len())?,
            }
        }
        Ok(())
    }
}

impl fmt::Debug for Mp4Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Mp4Tag")
            .field("filetype", &self.filetype)
            .field("parsed", &self.parsed)
            .field("entries", &self.entries)
            .finish()
    }
}

/// A deep clone of a tag store, produced by
/// [`preserve`](Mp4Tag::preserve) and consumed by
/// [`restore`](Mp4Tag::restore).
#[derive(Clone, Debug)]
pub struct TagSnapshot {
    pub(crate) entries: Vec<TagEntry>,
}

impl TagSnapshot {
    /// Returns an iterator over the preserved tags.
    pub fn tags(&self) -> std::slice::Iter<'_, TagEntry> {
        self.entries.iter()
    }
}

/// Chooses the storage class for binary data: covers are identified by the
/// file extension when available, by their magic bytes otherwise, with JPEG
/// as the fallback.
fn binary_kind(tn: &TagName, data: &[u8], path: Option<&Path>) -> DataKind {
    if !tn.is_artwork() {
        return DataKind::Binary;
    }
    if let Some(ext) = path.and_then(|p| p.extension()).and_then(|e| e.to_str()) {
        match ext.to_ascii_lowercase().as_str() {
            "png" => return DataKind::Png,
            "jpg" | "jpeg" => return DataKind::Jpeg,
            _ => (),
        }
    }
    if data.starts_with(&[0x89, b'P', b'N', b'G']) {
        DataKind::Png
    } else {
        DataKind::Jpeg
    }
}

fn not_open() -> Error {
    Error::new(ErrorKind::NotOpen, "The file is not open".to_owned())
}
