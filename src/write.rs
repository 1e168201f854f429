use std::fs::{self, File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use crate::atom::head::HEAD_LEN;
use crate::atom::parse::{OffsetTable, ParentBox, META_LEN};
use crate::atom::util::WriteUtil;
use crate::atom::{FREE, HANDLER_REFERENCE, ITEM_LIST, METADATA, USER_DATA};
use crate::source::Source;
use crate::tag::Mp4Tag;
use crate::{Error, ErrorKind};

/// Default body size of the free box planted after a rewritten `ilst`.
pub(crate) const FREE_SPACE_DEFAULT: u32 = 2048;
/// Size of a synthesized `hdlr` box.
const HDLR_LEN: u32 = 33;
/// Buffer bound for bulk file copies.
const COPY_CHUNK: usize = 5 * 1024 * 1024;

const TMP_SUFFIX: &str = ".tmp";
const BACKUP_SUFFIX: &str = ".bak";

/// Writes the encoded `ilst` body to the file, in place when it fits the
/// existing footprint, through a temp-file rewrite otherwise. An empty body
/// always takes the rewrite path so the file shrinks.
pub(crate) fn write_data(tag: &mut Mp4Tag, body: &[u8]) -> crate::Result<()> {
    let datalen = body.len() as u32;
    let max_len = tag.info.taglist_len as i64 - HEAD_LEN as i64;

    let in_place = tag.info.ilst_offset != 0
        && datalen != 0
        && (tag.info.unlimited
            || datalen == tag.info.taglist_len
            || (max_len >= 0 && (datalen as i64) < max_len));

    if in_place {
        write_in_place(tag, body)
    } else {
        write_rewrite(tag, body)
    }
}

fn write_in_place(tag: &mut Mp4Tag, body: &[u8]) -> crate::Result<()> {
    let datalen = body.len() as u32;
    let ilst_offset = tag.info.ilst_offset;
    let ilst_base_offset = tag.info.ilst_base_offset;
    let orig_body_len = tag.info.orig_body_len;
    let taglist_len = tag.info.taglist_len;
    let interior = tag.info.interior_free;
    let exterior = tag.info.exterior_free;
    let unlimited = tag.info.unlimited;
    let file_size = tag.info.file_size;
    let free_space = tag.free_space;
    let parents = tag.info.parents.clone();

    if tag.keep_backup {
        backup_file(tag)?;
    }

    let file = source_file(&mut tag.src)?;

    seek(file, ilst_offset)?;
    write(file, body)?;

    let mut free_len = (interior + exterior) as i64;
    let mut delta = datalen as i64 - orig_body_len as i64;
    if free_len > 0 {
        free_len -= delta;
    }
    let mut total_delta = delta;
    if exterior != 0 || unlimited {
        // interior and exterior free space merge into one box at the top
        // level, the parents no longer account for the interior part
        delta -= interior as i64;
        total_delta = delta;
    }
    if exterior == 0 && !unlimited {
        // the free box stays inside the parent, which keeps its length
        total_delta = taglist_len as i64 - (datalen as i64 + free_len);
    }

    if free_len != 0 || unlimited {
        if unlimited && free_len < free_space as i64 {
            free_len = HEAD_LEN as i64 + free_space as i64;
        }
        if free_len > HEAD_LEN as i64 {
            write_free_box(file, free_len as u32)?;
            if unlimited {
                let end = file
                    .seek(SeekFrom::Current(0))
                    .map_err(|e| Error::new(ErrorKind::Io(e), "Error locating file end"))?;
                if end < file_size {
                    file.set_len(end)
                        .map_err(|e| Error::new(ErrorKind::Io(e), "Error truncating file"))?;
                }
            }
        }
    }

    seek(file, ilst_base_offset)?;
    file.write_be_u32(datalen + HEAD_LEN as u32)
        .map_err(|e| Error::new(ErrorKind::Io(e), "Error updating ilst length"))?;

    if total_delta != 0 {
        update_parent_lengths(file, &parents, delta)?;
    }

    Ok(())
}

fn write_rewrite(tag: &mut Mp4Tag, body: &[u8]) -> crate::Result<()> {
    if tag.info.ilst_offset == 0 && tag.info.no_ilst == 0 {
        return Err(Error::new(
            ErrorKind::UnableToProcess,
            "No position to insert metadata at".to_owned(),
        ));
    }
    if tag.info.split_moov {
        return Err(Error::new(
            ErrorKind::UnableToProcess,
            "A moov box past the first mdat box prevents patching chunk offsets".to_owned(),
        ));
    }

    let path = match &tag.path {
        Some(p) => p.clone(),
        None => {
            return Err(Error::new(
                ErrorKind::CannotWrite,
                "Stream sources cannot be rewritten".to_owned(),
            ));
        }
    };
    let tmp = suffixed(&path, TMP_SUFFIX);

    if let Err(e) = rewrite_to(tag, body, &tmp) {
        let _ = fs::remove_file(&tmp);
        return Err(e);
    }

    // the input file has to be closed before the renames
    tag.src = None;
    let backup = suffixed(&path, BACKUP_SUFFIX);
    let swapped = fs::rename(&path, &backup)
        .and_then(|_| fs::rename(&tmp, &path))
        .map_err(|e| Error::new(ErrorKind::Io(e), "Error swapping in the rewritten file"));

    if swapped.is_ok() && !tag.keep_backup {
        let _ = fs::remove_file(&backup);
    }

    match OpenOptions::new().read(true).write(true).open(&path) {
        Ok(f) => tag.src = Some(Source::File(f)),
        Err(e) => {
            swapped?;
            return Err(Error::new(ErrorKind::Io(e), "Error reopening the rewritten file"));
        }
    }

    swapped
}

fn rewrite_to(tag: &mut Mp4Tag, body: &[u8], tmp: &Path) -> crate::Result<()> {
    let datalen = body.len() as u32;
    let ilst_offset = tag.info.ilst_offset;
    let ilst_base_offset = tag.info.ilst_base_offset;
    let no_ilst = tag.info.no_ilst;
    let taglist_len = tag.info.taglist_len;
    let interior = tag.info.interior_free;
    let after_ilst = tag.info.after_ilst;
    let insert_delta = tag.info.insert_delta;
    let file_size = tag.info.file_size;
    let free_space = tag.free_space;
    let stco = tag.info.stco;
    let co64 = tag.info.co64;
    let mut parents = tag.info.parents.clone();
    if ilst_offset == 0 {
        // only the moov length changes when the hierarchy is synthesized
        parents.truncate(1);
    }

    let infile = source_file(&mut tag.src)?;

    let mut ofh = OpenOptions::new()
        .read(true)
        .write(true)
        .create(true)
        .truncate(true)
        .open(tmp)
        .map_err(|e| Error::new(ErrorKind::Io(e), "Error creating temporary file"))?;

    let copy_end = if ilst_offset != 0 { ilst_base_offset } else { no_ilst };
    copy_range(infile, &mut ofh, 0, copy_end)?;

    let head_len = HEAD_LEN as u32;
    if ilst_offset == 0 {
        // synthesize the udta/meta/hdlr hierarchy around the new ilst
        let synth_len = head_len + META_LEN + HDLR_LEN + head_len;
        let udta_len = synth_len + datalen + head_len + free_space;

        let mut buf = Vec::with_capacity(synth_len as usize);
        buf.extend_from_slice(&udta_len.to_be_bytes());
        buf.extend_from_slice(&*USER_DATA);

        buf.extend_from_slice(&(udta_len - head_len).to_be_bytes());
        buf.extend_from_slice(&*METADATA);
        buf.extend_from_slice(&0u32.to_be_bytes());

        buf.extend_from_slice(&HDLR_LEN.to_be_bytes());
        buf.extend_from_slice(&*HANDLER_REFERENCE);
        buf.extend_from_slice(&0u32.to_be_bytes());
        buf.extend_from_slice(&0u32.to_be_bytes());
        buf.extend_from_slice(b"mdir");
        buf.extend_from_slice(b"appl");
        buf.extend_from_slice(&0u32.to_be_bytes());
        buf.extend_from_slice(&0u32.to_be_bytes());
        buf.push(0);

        buf.extend_from_slice(&(datalen + head_len).to_be_bytes());
        buf.extend_from_slice(&*ITEM_LIST);

        write(&mut ofh, &buf)?;
    } else {
        ofh.write_be_u32(datalen + head_len)
            .map_err(|e| Error::new(ErrorKind::Io(e), "Error writing ilst header"))?;
        write(&mut ofh, &*ITEM_LIST)?;
    }

    write(&mut ofh, body)?;

    let free_len = head_len + free_space;
    write_free_box(&mut ofh, free_len)?;

    let tail_len = file_size.saturating_sub(after_ilst);
    copy_range(infile, &mut ofh, after_ilst, tail_len)?;

    let mut delta = datalen as i64 - taglist_len as i64 + free_len as i64 - interior as i64;
    if ilst_offset == 0 {
        delta += (head_len + META_LEN + HDLR_LEN + head_len) as i64;
        delta -= insert_delta as i64;
    }

    update_parent_lengths(&mut ofh, &parents, delta)?;
    patch_offset_table(&mut ofh, stco, 4, delta, after_ilst)?;
    patch_offset_table(&mut ofh, co64, 8, delta, after_ilst)?;

    Ok(())
}

/// Walks the recorded ancestors innermost first and adjusts each length
/// field by `delta`.
pub(crate) fn update_parent_lengths(
    file: &mut File,
    parents: &[ParentBox],
    delta: i64,
) -> crate::Result<()> {
    for parent in parents.iter().rev() {
        let new_len = (parent.len as i64 + delta) as u64;
        let written = if parent.ext {
            seek(file, parent.offset + HEAD_LEN)?;
            file.write_be_u64(new_len)
        } else {
            seek(file, parent.offset)?;
            file.write_be_u32(new_len as u32)
        };
        written.map_err(|e| {
            Error::new(ErrorKind::Io(e), format!("Error updating {} length", parent.fourcc))
        })?;
    }
    Ok(())
}

/// Shifts every chunk offset strictly beyond `pivot` by `delta`. The table's
/// own recorded position is relocated when it lies at or beyond `pivot`.
fn patch_offset_table(
    ofh: &mut File,
    table: Option<OffsetTable>,
    width: usize,
    delta: i64,
    pivot: u64,
) -> crate::Result<()> {
    let table = match table {
        Some(t) => t,
        None => return Ok(()),
    };

    let mut box_offset = table.offset;
    if box_offset >= pivot {
        box_offset = (box_offset as i64 + delta) as u64;
    }

    seek(ofh, box_offset)?;
    let mut buf = vec![0u8; table.len as usize];
    ofh.read_exact(&mut buf)
        .map_err(|e| Error::new(ErrorKind::Io(e), "Error reading chunk offset table"))?;

    if buf.len() < 8 {
        return Err(Error::new(
            ErrorKind::Parsing,
            "Chunk offset table is shorter than its header".to_owned(),
        ));
    }

    let count = u32::from_be_bytes([buf[4], buf[5], buf[6], buf[7]]) as usize;
    let mut pos = 8;
    for _ in 0..count {
        if pos + width > buf.len() {
            break;
        }
        if width == 4 {
            let mut bytes = [0u8; 4];
            bytes.copy_from_slice(&buf[pos..pos + 4]);
            let offset = u32::from_be_bytes(bytes);
            if offset as u64 > pivot {
                let shifted = (offset as i64 + delta) as u32;
                buf[pos..pos + 4].copy_from_slice(&shifted.to_be_bytes());
            }
        } else {
            let mut bytes = [0u8; 8];
            bytes.copy_from_slice(&buf[pos..pos + 8]);
            let offset = u64::from_be_bytes(bytes);
            if offset > pivot {
                let shifted = (offset as i64 + delta) as u64;
                buf[pos..pos + 8].copy_from_slice(&shifted.to_be_bytes());
            }
        }
        pos += width;
    }

    seek(ofh, box_offset)?;
    write(ofh, &buf)?;

    Ok(())
}

fn write_free_box(file: &mut File, total_len: u32) -> crate::Result<()> {
    let mut buf = vec![0u8; total_len as usize];
    buf[..4].copy_from_slice(&total_len.to_be_bytes());
    buf[4..8].copy_from_slice(&*FREE);
    write(file, &buf)
}

fn backup_file(tag: &mut Mp4Tag) -> crate::Result<()> {
    let path = match &tag.path {
        Some(p) => p.clone(),
        None => return Ok(()),
    };
    let file_size = tag.info.file_size;
    let backup = suffixed(&path, BACKUP_SUFFIX);
    let infile = source_file(&mut tag.src)?;

    let mut out = File::create(&backup)
        .map_err(|e| Error::new(ErrorKind::Io(e), "Error creating backup file"))?;
    copy_range(infile, &mut out, 0, file_size)?;

    if let Ok(modified) = infile.metadata().and_then(|m| m.modified()) {
        let _ = out.set_modified(modified);
    }
    Ok(())
}

fn copy_range(src: &mut File, dst: &mut File, offset: u64, len: u64) -> crate::Result<()> {
    if len == 0 {
        return Ok(());
    }
    seek(src, offset)?;
    let mut buf = vec![0u8; COPY_CHUNK.min(len as usize)];
    let mut remaining = len;
    while remaining > 0 {
        let chunk = buf.len().min(remaining as usize);
        src.read_exact(&mut buf[..chunk])
            .map_err(|e| Error::new(ErrorKind::Io(e), "Error reading file data"))?;
        write(dst, &buf[..chunk])?;
        remaining -= chunk as u64;
    }
    Ok(())
}

fn source_file(src: &mut Option<Source>) -> crate::Result<&mut File> {
    match src {
        Some(s) => s.file_mut(),
        None => Err(Error::new(ErrorKind::NotOpen, "The file is not open".to_owned())),
    }
}

fn seek(file: &mut File, offset: u64) -> crate::Result<()> {
    file.seek(SeekFrom::Start(offset))
        .map_err(|e| Error::new(ErrorKind::Io(e), "Error seeking in file"))?;
    Ok(())
}

fn write(file: &mut File, data: &[u8]) -> crate::Result<()> {
    file.write_all(data).map_err(|e| Error::new(ErrorKind::Io(e), "Error writing file data"))
}

fn suffixed(path: &Path, suffix: &str) -> PathBuf {
    let mut os = path.as_os_str().to_owned();
    os.push(suffix);
    PathBuf::from(os)
}
