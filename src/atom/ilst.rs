use crate::atom::{
    Fourcc, ARTWORK, CUSTOM_GENRE_NAME, DATA, DISC_NUMBER, FREE, FREEFORM, MEAN, NAME,
    STANDARD_GENRE, TRACK_NUMBER,
};
use crate::tag::defs::{find_def, GENRES, PRIORITY_CUSTOM, PRIORITY_MAX};
use crate::tag::entry::{DataKind, TagEntry};
use crate::{Error, ErrorKind};

/// Length of a `data` sub-box header: length, identifier, type and reserved
/// words.
pub(crate) const DATA_HEAD_LEN: usize = 16;
/// Length of a plain sub-box header.
const SUB_HEAD_LEN: usize = 8;

// Decoding

/// Decodes a single child of the `ilst` box into zero or more entries.
pub(crate) fn decode_item(
    entries: &mut Vec<TagEntry>,
    cover_count: &mut u32,
    fourcc: Fourcc,
    body: &[u8],
) -> crate::Result<()> {
    if fourcc == FREE {
        return Ok(());
    }
    if fourcc == ARTWORK {
        return decode_covr(entries, cover_count, body);
    }
    decode_tag(entries, fourcc, body)
}

fn decode_tag(entries: &mut Vec<TagEntry>, fourcc: Fourcc, body: &[u8]) -> crate::Result<()> {
    let mut name = fourcc.display_name();
    let mut pos = 0;

    if fourcc == FREEFORM {
        let mean = read_flagged_sub_box(body, &mut pos, MEAN)?;
        name.push(':');
        name.push_str(&String::from_utf8_lossy(mean));
        let key = read_flagged_sub_box(body, &mut pos, NAME)?;
        name.push(':');
        name.push_str(&String::from_utf8_lossy(key));
    }

    while pos + SUB_HEAD_LEN <= body.len() {
        let (sub_len, sub_id) = sub_head(body, pos, fourcc)?;
        let end = pos + sub_len;

        if sub_id == DATA {
            if sub_len < DATA_HEAD_LEN {
                return Err(Error::new(
                    ErrorKind::Parsing,
                    format!("Error reading {}: data sub-box too short", name),
                ));
            }
            let type_code = be_u32(body, pos + SUB_HEAD_LEN) & 0x00ff_ffff;
            let payload = &body[pos + DATA_HEAD_LEN..end];
            classify(entries, &name, fourcc, type_code, payload);
        }

        pos = end;
    }

    Ok(())
}

/// Turns one `data` sub-box payload into an entry. Integers become their
/// decimal representation, `trkn`/`disk` their `a/b` pair form, `gnre` is
/// mapped through the genre table to a `©gen` string, everything else is
/// kept as binary with the type code preserved.
fn classify(
    entries: &mut Vec<TagEntry>,
    name: &str,
    fourcc: Fourcc,
    type_code: u32,
    payload: &[u8],
) {
    let kind = DataKind::from_code(type_code);

    match kind {
        DataKind::Binary | DataKind::Integer => {
            if fourcc == TRACK_NUMBER || fourcc == DISC_NUMBER {
                if payload.len() < 4 {
                    return;
                }
                let a = be_u32(payload, 0);
                // short trkn variants omit the total
                let b = if payload.len() >= 6 { be_u16(payload, 4) } else { 0 };
                let text = if b == 0 { a.to_string() } else { format!("{}/{}", a, b) };
                push_string(entries, name, text, kind, payload.len() as u32);
            } else if fourcc == STANDARD_GENRE && payload.len() == 2 {
                // one based ID3 index, never re-emitted as gnre
                let index = be_u16(payload, 0).checked_sub(1);
                if let Some(genre) = index.and_then(|i| GENRES.get(i as usize)) {
                    push_string(
                        entries,
                        CUSTOM_GENRE_NAME,
                        (*genre).to_owned(),
                        DataKind::Utf8,
                        genre.len() as u32,
                    );
                }
            } else {
                match payload.len() {
                    1 => {
                        push_string(entries, name, payload[0].to_string(), kind, 1);
                    }
                    2 => {
                        push_string(entries, name, be_u16(payload, 0).to_string(), kind, 2);
                    }
                    4 => {
                        push_string(entries, name, be_u32(payload, 0).to_string(), kind, 4);
                    }
                    8 => {
                        push_string(entries, name, be_u64(payload, 0).to_string(), kind, 8);
                    }
                    _ => push_binary(entries, name, payload, kind),
                }
            }
        }
        DataKind::Utf8 => {
            if !payload.is_empty() {
                let mut entry = TagEntry::new(name, kind);
                entry.data_index = next_index(entries, name);
                entry.internal_len = payload.len() as u32;
                entry.data = payload.to_vec();
                entries.push(entry);
            }
        }
        _ => push_binary(entries, name, payload, kind),
    }
}

fn push_string(entries: &mut Vec<TagEntry>, name: &str, text: String, kind: DataKind, len: u32) {
    let mut entry = TagEntry::new(name, kind);
    entry.data_index = next_index(entries, name);
    entry.internal_len = len;
    entry.data = text.into_bytes();
    entries.push(entry);
}

fn push_binary(entries: &mut Vec<TagEntry>, name: &str, payload: &[u8], kind: DataKind) {
    let mut entry = TagEntry::new(name, kind);
    entry.data_index = next_index(entries, name);
    entry.internal_len = payload.len() as u32;
    entry.data = payload.to_vec();
    entry.binary = true;
    entries.push(entry);
}

fn next_index(entries: &[TagEntry], name: &str) -> u32 {
    match entries.last() {
        Some(last) if last.name == name => last.data_index + 1,
        _ => 0,
    }
}

/// Decodes a `covr` child. Multiple `data` sub-boxes yield multiple covers
/// with incrementing indices, a `name` sub-box attaches to the preceding
/// `data` sub-box.
fn decode_covr(
    entries: &mut Vec<TagEntry>,
    cover_count: &mut u32,
    body: &[u8],
) -> crate::Result<()> {
    let mut pending: Option<(DataKind, Vec<u8>)> = None;
    let mut cover_name: Option<String> = None;
    let mut pos = 0;

    while pos + SUB_HEAD_LEN <= body.len() {
        let (sub_len, sub_id) = sub_head(body, pos, ARTWORK)?;
        let end = pos + sub_len;

        if sub_id == DATA {
            if sub_len < DATA_HEAD_LEN {
                return Err(Error::new(
                    ErrorKind::Parsing,
                    "Error reading covr: data sub-box too short".to_owned(),
                ));
            }
            if let Some((kind, data)) = pending.take() {
                flush_cover(entries, cover_count, kind, data, cover_name.take());
            }
            let type_code = be_u32(body, pos + SUB_HEAD_LEN) & 0x00ff_ffff;
            let kind = match type_code {
                0 => DataKind::Jpeg,
                c => DataKind::from_code(c),
            };
            pending = Some((kind, body[pos + DATA_HEAD_LEN..end].to_vec()));
        } else if sub_id == NAME {
            let text = String::from_utf8_lossy(&body[pos + SUB_HEAD_LEN..end]).into_owned();
            cover_name = Some(text);
        }

        pos = end;
    }

    if let Some((kind, data)) = pending {
        flush_cover(entries, cover_count, kind, data, cover_name);
    }

    Ok(())
}

fn flush_cover(
    entries: &mut Vec<TagEntry>,
    cover_count: &mut u32,
    kind: DataKind,
    data: Vec<u8>,
    cover_name: Option<String>,
) {
    let mut entry = TagEntry::new(ARTWORK.display_name(), kind);
    entry.data_index = *cover_count;
    *cover_count += 1;
    entry.internal_len = data.len() as u32;
    entry.data = data;
    entry.cover_name = cover_name;
    entry.binary = true;
    entries.push(entry);
}

fn read_flagged_sub_box<'a>(
    body: &'a [u8],
    pos: &mut usize,
    expected: Fourcc,
) -> crate::Result<&'a [u8]> {
    if *pos + SUB_HEAD_LEN + 4 > body.len() {
        return Err(Error::new(
            ErrorKind::Parsing,
            format!("Freeform tag is missing its {} sub-box", expected),
        ));
    }
    let (sub_len, sub_id) = sub_head(body, *pos, FREEFORM)?;
    if sub_id != expected || sub_len < SUB_HEAD_LEN + 4 {
        return Err(Error::new(
            ErrorKind::Parsing,
            format!("Expected a {} sub-box in a freeform tag, found {}", expected, sub_id),
        ));
    }
    let payload = &body[*pos + SUB_HEAD_LEN + 4..*pos + sub_len];
    *pos += sub_len;
    Ok(payload)
}

fn sub_head(body: &[u8], pos: usize, parent: Fourcc) -> crate::Result<(usize, Fourcc)> {
    let len = be_u32(body, pos) as usize;
    let id = Fourcc([body[pos + 4], body[pos + 5], body[pos + 6], body[pos + 7]]);
    if len < SUB_HEAD_LEN || pos + len > body.len() {
        return Err(Error::new(
            ErrorKind::Parsing,
            format!("Sub-box {} of {} exceeds its parent", id, parent),
        ));
    }
    Ok((len, id))
}

fn be_u16(buf: &[u8], pos: usize) -> u16 {
    u16::from_be_bytes([buf[pos], buf[pos + 1]])
}

fn be_u32(buf: &[u8], pos: usize) -> u32 {
    u32::from_be_bytes([buf[pos], buf[pos + 1], buf[pos + 2], buf[pos + 3]])
}

fn be_u64(buf: &[u8], pos: usize) -> u64 {
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&buf[pos..pos + 8]);
    u64::from_be_bytes(bytes)
}

// Encoding

/// Serializes the store into the body of a fresh `ilst` box. Tags are
/// emitted by ascending priority, then in store order. Entries sharing a
/// composite key contribute additional `data` (and cover `name`) sub-boxes
/// to one outer box whose length is extended in place.
pub(crate) fn build_ilst(entries: &mut [TagEntry]) -> Vec<u8> {
    for e in entries.iter_mut() {
        e.priority = if e.name.starts_with("----") {
            PRIORITY_CUSTOM
        } else {
            find_def(&e.name).map(|d| d.priority).unwrap_or(PRIORITY_CUSTOM)
        };
    }

    let mut buf = Vec::new();
    let mut state = BuildState::default();
    for priority in 0..PRIORITY_MAX {
        for e in entries.iter() {
            if e.priority == priority {
                append_entry(&mut buf, e, &mut state);
            }
        }
    }
    buf
}

#[derive(Default)]
struct BuildState {
    last_key: String,
    box_start: usize,
    count: u32,
}

fn append_entry(buf: &mut Vec<u8>, entry: &TagEntry, state: &mut BuildState) {
    let freeform = entry.name.starts_with("----");
    let parts = if freeform {
        match split_freeform(&entry.name) {
            Some(p) => Some(p),
            None => return,
        }
    } else {
        None
    };
    let fourcc = match parts {
        Some(_) => FREEFORM,
        None => match Fourcc::from_display_name(&entry.name) {
            Some(f) => f,
            None => return,
        },
    };

    if entry.name != state.last_key {
        state.count = 0;
        state.last_key = entry.name.clone();
    }

    let payload = encode_payload(entry);

    if state.count == 0 {
        state.box_start = buf.len();

        let mut outer_len = SUB_HEAD_LEN + DATA_HEAD_LEN + payload.len();
        if let Some((mean, key)) = parts {
            outer_len += 2 * (SUB_HEAD_LEN + 4) + mean.len() + key.len();
        }
        push_u32(buf, outer_len as u32);
        buf.extend_from_slice(&*fourcc);

        if let Some((mean, key)) = parts {
            push_u32(buf, (SUB_HEAD_LEN + 4 + mean.len()) as u32);
            buf.extend_from_slice(&*MEAN);
            push_u32(buf, 0);
            buf.extend_from_slice(mean.as_bytes());

            push_u32(buf, (SUB_HEAD_LEN + 4 + key.len()) as u32);
            buf.extend_from_slice(&*NAME);
            push_u32(buf, 0);
            buf.extend_from_slice(key.as_bytes());
        }
    }

    push_u32(buf, (DATA_HEAD_LEN + payload.len()) as u32);
    buf.extend_from_slice(&*DATA);
    push_u32(buf, entry.kind.code());
    push_u32(buf, 0);
    buf.extend_from_slice(&payload);
    if state.count > 0 {
        bump_len(buf, state.box_start, (DATA_HEAD_LEN + payload.len()) as u32);
    }

    if entry.kind.is_image() {
        if let Some(cover_name) = entry.cover_name.as_deref().filter(|n| !n.is_empty()) {
            push_u32(buf, (SUB_HEAD_LEN + cover_name.len()) as u32);
            buf.extend_from_slice(&*NAME);
            buf.extend_from_slice(cover_name.as_bytes());
            bump_len(buf, state.box_start, (SUB_HEAD_LEN + cover_name.len()) as u32);
        }
    }

    state.count += 1;
}

fn encode_payload(entry: &TagEntry) -> Vec<u8> {
    match entry.kind {
        DataKind::Utf8 => entry.data.clone(),
        DataKind::Integer => {
            let val: i64 =
                entry.data_str().and_then(|s| s.trim().parse().ok()).unwrap_or_default();
            match entry.internal_len {
                1 => vec![val as u8],
                2 => (val as u16).to_be_bytes().to_vec(),
                8 => (val as u64).to_be_bytes().to_vec(),
                _ => (val as u32).to_be_bytes().to_vec(),
            }
        }
        DataKind::Binary if !entry.binary && entry.name == TRACK_NUMBER.display_name() => {
            let (a, b) = parse_pair(entry.data_str().unwrap_or_default());
            let mut payload = a.to_be_bytes().to_vec();
            payload.extend_from_slice(&b.to_be_bytes());
            // two trailing bytes of padding
            payload.extend_from_slice(&[0, 0]);
            payload
        }
        DataKind::Binary if !entry.binary && entry.name == DISC_NUMBER.display_name() => {
            let (a, b) = parse_pair(entry.data_str().unwrap_or_default());
            let mut payload = a.to_be_bytes().to_vec();
            payload.extend_from_slice(&b.to_be_bytes());
            payload
        }
        _ => entry.data.clone(),
    }
}

/// Parses a `track[/total]` pair, also accepting the `(track,total)` form
/// written by mutagen.
pub(crate) fn parse_pair(text: &str) -> (u32, u16) {
    let text = text.trim();
    if let Some(inner) = text.strip_prefix('(').and_then(|t| t.strip_suffix(')')) {
        if let Some(sep) = inner.find(',') {
            let (a, b) = inner.split_at(sep);
            return (a.trim().parse().unwrap_or(0), b[1..].trim().parse().unwrap_or(0));
        }
    }
    match text.find('/') {
        Some(sep) => {
            let (a, b) = text.split_at(sep);
            (a.trim().parse().unwrap_or(0), b[1..].trim().parse().unwrap_or(0))
        }
        None => (text.parse().unwrap_or(0), 0),
    }
}

fn split_freeform(name: &str) -> Option<(&str, &str)> {
    let rest = name.strip_prefix("----:")?;
    let sep = rest.find(':')?;
    let (mean, key) = rest.split_at(sep);
    Some((mean, &key[1..]))
}

fn push_u32(buf: &mut Vec<u8>, val: u32) {
    buf.extend_from_slice(&val.to_be_bytes());
}

fn bump_len(buf: &mut [u8], start: usize, add: u32) {
    let cur = be_u32(buf, start);
    buf[start..start + 4].copy_from_slice(&(cur + add).to_be_bytes());
}
