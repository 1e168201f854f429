use crate::atom::head::{parse_head, Head, HEAD_LEN};
use crate::atom::ilst::decode_item;
use crate::atom::mdhd::{parse_mdhd, Mdhd};
use crate::atom::{
    Fourcc, FREE, ITEM_LIST, MEDIA, MEDIA_DATA, MEDIA_HEADER, MEDIA_INFORMATION, METADATA, MOVIE,
    SAMPLE_TABLE, SAMPLE_TABLE_CHUNK_OFFSET, SAMPLE_TABLE_CHUNK_OFFSET_64, TRACK, USER_DATA,
};
use crate::source::Source;
use crate::tag::entry::TagEntry;
use crate::{Error, ErrorKind};

/// Maximum box nesting depth.
const MAX_DEPTH: usize = 15;
/// Size of the `meta` box header including its version and flags word.
pub(crate) const META_LEN: u32 = 12;

/// An ancestor of the `ilst` box whose length has to be adjusted when the
/// `ilst` changes size.
#[derive(Clone, Debug)]
pub(crate) struct ParentBox {
    pub offset: u64,
    pub len: u64,
    pub ext: bool,
    pub fourcc: Fourcc,
}

/// Location of a sample table chunk offset box (`stco` or `co64`).
#[derive(Clone, Copy, Debug)]
pub(crate) struct OffsetTable {
    /// Absolute offset of the box content.
    pub offset: u64,
    /// Length of the box content.
    pub len: u32,
}

/// Everything the rewriter needs to know about the file layout. Valid for
/// one write; any mutation of the file invalidates it.
#[derive(Default)]
pub(crate) struct ParseInfo {
    /// Ancestors of the `ilst` box, outermost first.
    pub parents: Vec<ParentBox>,
    /// Absolute offset of the `ilst` box header, 0 if there is none.
    pub ilst_base_offset: u64,
    /// Absolute offset of the `ilst` box content, 0 if there is none.
    pub ilst_offset: u64,
    /// The original `ilst` body length.
    pub orig_body_len: u32,
    /// The `ilst` body length plus all absorbed trailing free space.
    pub taglist_len: u32,
    /// Absorbed free space at the same level as the `ilst`.
    pub interior_free: u32,
    /// Absorbed free space at the top level, trailing the `moov` box.
    pub exterior_free: u32,
    /// The `ilst` and its free space extend to the end of the file.
    pub unlimited: bool,
    /// First offset past the `ilst` footprint, where the copied tail starts.
    pub after_ilst: u64,
    /// Insertion point for a synthesized hierarchy when there is no `ilst`.
    pub no_ilst: u64,
    /// Header bytes of already existing hierarchy levels at the insertion
    /// point.
    pub insert_delta: u32,
    pub stco: Option<OffsetTable>,
    pub co64: Option<OffsetTable>,
    pub file_size: u64,
    /// A second `moov` box was seen past the first `mdat`; offsets cannot be
    /// patched by a scalar shift.
    pub split_moov: bool,
    /// Length overshoot left at the end of the `ilst` box.
    pub ilst_remaining: i64,
    /// All four indicators of the upstream 1.3.0 length bug are present.
    pub needs_heal: bool,
}

pub(crate) struct ParseOutput {
    pub info: ParseInfo,
    pub entries: Vec<TagEntry>,
    pub mdhd: Option<Mdhd>,
}

/// Parses the box tree of the source positioned right after the `ftyp` box.
pub(crate) fn parse_source(
    src: &mut Source,
    start_offset: u64,
    file_size: u64,
    canwrite: bool,
) -> crate::Result<ParseOutput> {
    let mut parser = Parser {
        src,
        offset: start_offset,
        info: ParseInfo { file_size, ..ParseInfo::default() },
        entries: Vec::new(),
        mdhd: None,
        rem: [0; MAX_DEPTH],
        process_data: false,
        check_for_free: false,
        parse_done: false,
        ilst_remain: false,
        ilst_end: false,
        ilst_done: false,
        free_neg: false,
        udta_zero: false,
        seen_moov: false,
        seen_mdat: false,
        cover_count: 0,
        canwrite,
    };

    parser.parse_level(0, 0)?;

    if parser.check_for_free {
        parser.check_end();
    }

    Ok(ParseOutput { info: parser.info, entries: parser.entries, mdhd: parser.mdhd })
}

struct Parser<'a> {
    src: &'a mut Source,
    offset: u64,
    info: ParseInfo,
    entries: Vec<TagEntry>,
    mdhd: Option<Mdhd>,
    rem: [i64; MAX_DEPTH],
    process_data: bool,
    check_for_free: bool,
    parse_done: bool,
    ilst_remain: bool,
    ilst_end: bool,
    ilst_done: bool,
    free_neg: bool,
    udta_zero: bool,
    seen_moov: bool,
    seen_mdat: bool,
    cover_count: u32,
    canwrite: bool,
}

impl<'a> Parser<'a> {
    fn parse_level(&mut self, box_len: u64, level: usize) -> crate::Result<()> {
        if level >= MAX_DEPTH {
            return Err(Error::new(
                ErrorKind::UnableToProcess,
                "Maximum box nesting depth exceeded".to_owned(),
            ));
        }
        if self.parse_done {
            return Ok(());
        }

        // the box's own header is not part of its contents
        self.rem[level] = box_len as i64 - HEAD_LEN as i64;

        while let Some(head) = self.read_head()? {
            if head.len() == 0 {
                // mdat extending to the end of the file
                self.parse_done = true;
                break;
            }

            let fourcc = head.fourcc();
            let head_start = self.offset - head.head_len();
            let content_len = head.content_len();

            if box_len == 0 {
                self.rem[level] = head.len() as i64;
            }

            let mut skip_len = content_len;
            let mut descend = false;
            match fourcc {
                MOVIE | TRACK | USER_DATA | MEDIA | SAMPLE_TABLE | MEDIA_INFORMATION
                | ITEM_LIST => {
                    descend = true;
                    skip_len = 0;
                }
                METADATA => {
                    // skip the version and flags word before descending
                    descend = true;
                    skip_len = (META_LEN as u64) - HEAD_LEN;
                    self.info.insert_delta += META_LEN;
                }
                _ => (),
            }

            if fourcc == MEDIA_DATA {
                self.seen_mdat = true;
            }
            if fourcc == MOVIE {
                if self.seen_moov && self.seen_mdat {
                    self.info.split_moov = true;
                }
                self.seen_moov = true;
            }

            if fourcc == USER_DATA {
                // insertion point in case there is no ilst below
                self.info.no_ilst = head_start;
                self.info.after_ilst = head_start + HEAD_LEN;
                self.info.insert_delta = HEAD_LEN as u32;
            }

            if fourcc == ITEM_LIST {
                self.info.parents.truncate(level);
                self.info.ilst_offset = self.offset;
                self.info.ilst_base_offset = head_start;
                self.info.orig_body_len = content_len as u32;
                self.info.taglist_len = content_len as u32;
                self.info.after_ilst = self.offset + content_len;
                self.process_data = true;
                if content_len == 0 {
                    self.process_data = false;
                    if self.canwrite {
                        self.check_for_free = true;
                    }
                }
            }

            if fourcc == SAMPLE_TABLE_CHUNK_OFFSET {
                self.info.stco =
                    Some(OffsetTable { offset: self.offset, len: content_len as u32 });
            }
            if fourcc == SAMPLE_TABLE_CHUNK_OFFSET_64 {
                self.info.co64 =
                    Some(OffsetTable { offset: self.offset, len: content_len as u32 });
            }

            if self.check_for_free {
                if fourcc == FREE {
                    // consolidate consecutive free boxes into the footprint
                    if level == 0 {
                        self.info.exterior_free += head.len() as u32;
                    } else {
                        self.info.interior_free += head.len() as u32;
                    }
                    self.info.taglist_len += head.len() as u32;
                    self.info.after_ilst += head.len();
                } else {
                    // some other box follows the free space, stop absorbing
                    self.check_for_free = false;
                    self.parse_done = true;
                    break;
                }
            }

            if descend && content_len > 0 {
                if self.info.ilst_offset == 0 && level < self.info.parents.len() + 1 {
                    self.info.parents.truncate(level);
                    self.info.parents.push(ParentBox {
                        offset: head_start,
                        len: head.len(),
                        ext: head.ext(),
                        fourcc,
                    });
                }

                if skip_len > 0 {
                    self.skip(skip_len)?;
                }
                self.parse_level(head.len() - skip_len, level + 1)?;
                skip_len = 0;
            }

            if fourcc == MOVIE && self.info.no_ilst == 0 {
                self.info.no_ilst = self.offset;
                self.info.after_ilst = self.info.no_ilst;
            }

            if fourcc == ITEM_LIST {
                self.process_data = false;
                if self.canwrite {
                    self.check_for_free = true;
                }
            }

            let need_data = fourcc == MEDIA_HEADER || self.process_data;
            if need_data && !descend && content_len > 0 {
                let data = self.read_vec(content_len)?;
                if fourcc == MEDIA_HEADER {
                    if let Some(mdhd) = parse_mdhd(&data)? {
                        self.mdhd = Some(mdhd);
                    }
                }
                if self.process_data {
                    decode_item(&mut self.entries, &mut self.cover_count, fourcc, &data)?;
                }
            } else if skip_len > 0 {
                self.skip(skip_len)?;
            }

            self.rem[level] -= head.len() as i64;

            if fourcc == ITEM_LIST {
                self.info.ilst_remaining = self.rem[level];
                self.ilst_end = true;
                if self.rem[level] > 0 {
                    self.ilst_remain = true;
                }
            }

            if self.rem[level] <= 0 && box_len != 0 {
                self.check_level_end(fourcc, level);
                return Ok(());
            }

            if self.parse_done {
                break;
            }
        }

        if level == 0 && self.check_for_free {
            self.check_end();
        }
        if self.check_for_free {
            self.check_for_free = false;
            self.parse_done = true;
        }

        Ok(())
    }

    /// Checks on the four indicators of the upstream 1.3.0 bug: the `ilst`
    /// length overshot into a trailing free box while the containers still
    /// account for it. Only the combination of all four triggers the heal.
    fn check_level_end(&mut self, fourcc: Fourcc, level: usize) {
        if fourcc == ITEM_LIST {
            self.ilst_done = true;
        }
        if fourcc == FREE
            && self.ilst_end
            && !self.ilst_done
            && self.rem[level] < 0
        {
            self.free_neg = true;
        }
        if fourcc == USER_DATA {
            if self.rem[level] == 0 {
                self.udta_zero = true;
            }
            if self.ilst_remain && !self.ilst_done && self.free_neg && self.udta_zero {
                self.info.needs_heal = true;
            }
        }
        self.ilst_end = false;
    }

    fn check_end(&mut self) {
        if self.offset == self.info.file_size {
            self.info.unlimited = true;
        }
    }

    fn read_head(&mut self) -> crate::Result<Option<Head>> {
        let head = parse_head(self.src)?;
        if let Some(h) = &head {
            self.offset += h.head_len();
        }
        Ok(head)
    }

    fn read_vec(&mut self, len: u64) -> crate::Result<Vec<u8>> {
        let data = self.src.read_vec(len)?;
        self.offset += len;
        Ok(data)
    }

    fn skip(&mut self, len: u64) -> crate::Result<()> {
        self.src.skip(len)?;
        self.offset += len;
        Ok(())
    }
}
