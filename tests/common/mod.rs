#![allow(dead_code)]

use std::fs;
use std::path::PathBuf;

/// Wraps `body` in a box with the given identifier.
pub fn boxx(name: &[u8; 4], body: &[u8]) -> Vec<u8> {
    let mut buf = Vec::with_capacity(8 + body.len());
    buf.extend_from_slice(&(8 + body.len() as u32).to_be_bytes());
    buf.extend_from_slice(name);
    buf.extend_from_slice(body);
    buf
}

pub fn concat(parts: &[Vec<u8>]) -> Vec<u8> {
    let mut buf = Vec::new();
    for p in parts {
        buf.extend_from_slice(p);
    }
    buf
}

/// A `data` sub-box with the given type code.
pub fn data_box(type_code: u32, payload: &[u8]) -> Vec<u8> {
    let mut body = Vec::new();
    body.extend_from_slice(&type_code.to_be_bytes());
    body.extend_from_slice(&0u32.to_be_bytes());
    body.extend_from_slice(payload);
    boxx(b"data", &body)
}

/// An `ilst` child holding a single `data` sub-box.
pub fn tag_box(name: &[u8; 4], type_code: u32, payload: &[u8]) -> Vec<u8> {
    boxx(name, &data_box(type_code, payload))
}

pub fn string_tag(name: &[u8; 4], value: &str) -> Vec<u8> {
    tag_box(name, 1, value.as_bytes())
}

/// A freeform `----` child with `mean`, `name` and one string `data`
/// sub-box.
pub fn freeform_tag(mean: &str, key: &str, value: &str) -> Vec<u8> {
    let mut mean_body = 0u32.to_be_bytes().to_vec();
    mean_body.extend_from_slice(mean.as_bytes());
    let mut key_body = 0u32.to_be_bytes().to_vec();
    key_body.extend_from_slice(key.as_bytes());

    let body = concat(&[
        boxx(b"mean", &mean_body),
        boxx(b"name", &key_body),
        data_box(1, value.as_bytes()),
    ]);
    boxx(b"----", &body)
}

pub fn ftyp() -> Vec<u8> {
    let mut body = Vec::new();
    body.extend_from_slice(b"M4A ");
    body.extend_from_slice(&[0, 0, 2, 0]);
    body.extend_from_slice(b"isom");
    body.extend_from_slice(b"mp42");
    boxx(b"ftyp", &body)
}

pub fn mdhd(timescale: u32, duration: u32) -> Vec<u8> {
    let mut body = vec![0u8; 4];
    body.extend_from_slice(&1u32.to_be_bytes());
    body.extend_from_slice(&2u32.to_be_bytes());
    body.extend_from_slice(&timescale.to_be_bytes());
    body.extend_from_slice(&duration.to_be_bytes());
    body.extend_from_slice(&[0u8; 4]);
    boxx(b"mdhd", &body)
}

pub fn hdlr() -> Vec<u8> {
    let mut body = Vec::new();
    body.extend_from_slice(&0u32.to_be_bytes());
    body.extend_from_slice(&0u32.to_be_bytes());
    body.extend_from_slice(b"mdir");
    body.extend_from_slice(b"appl");
    body.extend_from_slice(&0u32.to_be_bytes());
    body.extend_from_slice(&0u32.to_be_bytes());
    body.push(0);
    boxx(b"hdlr", &body)
}

pub fn meta(children: &[u8]) -> Vec<u8> {
    let mut body = vec![0u8; 4];
    body.extend_from_slice(children);
    boxx(b"meta", &body)
}

pub fn stco(offsets: &[u32]) -> Vec<u8> {
    let mut body = Vec::new();
    body.extend_from_slice(&0u32.to_be_bytes());
    body.extend_from_slice(&(offsets.len() as u32).to_be_bytes());
    for o in offsets {
        body.extend_from_slice(&o.to_be_bytes());
    }
    boxx(b"stco", &body)
}

pub fn co64(offsets: &[u64]) -> Vec<u8> {
    let mut body = Vec::new();
    body.extend_from_slice(&0u32.to_be_bytes());
    body.extend_from_slice(&(offsets.len() as u32).to_be_bytes());
    for o in offsets {
        body.extend_from_slice(&o.to_be_bytes());
    }
    boxx(b"co64", &body)
}

/// A free box of `total_len` bytes including its header.
pub fn free_box(total_len: u32) -> Vec<u8> {
    let mut buf = vec![0u8; total_len as usize];
    buf[..4].copy_from_slice(&total_len.to_be_bytes());
    buf[4..8].copy_from_slice(b"free");
    buf
}

fn trak_with_tables(sample_tables: Vec<u8>) -> Vec<u8> {
    let stbl = boxx(b"stbl", &sample_tables);
    let minf = boxx(b"minf", &stbl);
    let mdia = boxx(b"mdia", &concat(&[mdhd(1000, 10_000), minf]));
    boxx(b"trak", &mdia)
}

/// `ftyp moov(trak udta(meta(hdlr ilst [free]))) mdat`, with the `stco`
/// entries pointing at `chunk_rel` offsets into the `mdat` payload.
pub fn file_moov_first(
    tags: &[Vec<u8>],
    ilst_free: u32,
    mdat_body: &[u8],
    chunk_rel: &[u32],
) -> Vec<u8> {
    let assemble = |offsets: &[u32]| {
        let mut meta_children = concat(&[hdlr(), boxx(b"ilst", &concat(tags))]);
        if ilst_free > 0 {
            meta_children.extend_from_slice(&free_box(ilst_free));
        }
        let udta = boxx(b"udta", &meta(&meta_children));
        let moov = boxx(b"moov", &concat(&[trak_with_tables(stco(offsets)), udta]));

        let mut file = ftyp();
        file.extend_from_slice(&moov);
        file.extend_from_slice(&boxx(b"mdat", mdat_body));
        file
    };

    let probe = assemble(&vec![0u32; chunk_rel.len()]);
    let mdat_payload_start = (probe.len() - mdat_body.len()) as u32;
    let offsets: Vec<u32> = chunk_rel.iter().map(|r| mdat_payload_start + r).collect();
    assemble(&offsets)
}

/// Like [`file_moov_first`] but with explicit absolute `stco` entries.
pub fn file_moov_first_abs(tags: &[Vec<u8>], abs_offsets: &[u32], mdat_body: &[u8]) -> Vec<u8> {
    let meta_children = concat(&[hdlr(), boxx(b"ilst", &concat(tags))]);
    let udta = boxx(b"udta", &meta(&meta_children));
    let moov = boxx(b"moov", &concat(&[trak_with_tables(stco(abs_offsets)), udta]));

    let mut file = ftyp();
    file.extend_from_slice(&moov);
    file.extend_from_slice(&boxx(b"mdat", mdat_body));
    file
}

/// `ftyp moov(trak)` followed by `mdat`: no `udta`, `meta` or `ilst`.
pub fn file_no_udta(mdat_body: &[u8], chunk_rel: &[u32]) -> Vec<u8> {
    let assemble = |offsets: &[u32]| {
        let moov = boxx(b"moov", &trak_with_tables(stco(offsets)));
        let mut file = ftyp();
        file.extend_from_slice(&moov);
        file.extend_from_slice(&boxx(b"mdat", mdat_body));
        file
    };

    let probe = assemble(&vec![0u32; chunk_rel.len()]);
    let mdat_payload_start = (probe.len() - mdat_body.len()) as u32;
    let offsets: Vec<u32> = chunk_rel.iter().map(|r| mdat_payload_start + r).collect();
    assemble(&offsets)
}

/// `ftyp mdat moov(trak udta(...))`: the metadata extends to the end of the
/// file.
pub fn file_mdat_first(tags: &[Vec<u8>], mdat_body: &[u8], chunk_rel: &[u32]) -> Vec<u8> {
    let mdat_payload_start = (ftyp().len() + 8) as u32;
    let offsets: Vec<u32> = chunk_rel.iter().map(|r| mdat_payload_start + r).collect();

    let meta_children = concat(&[hdlr(), boxx(b"ilst", &concat(tags))]);
    let udta = boxx(b"udta", &meta(&meta_children));
    let moov = boxx(b"moov", &concat(&[trak_with_tables(stco(&offsets)), udta]));

    let mut file = ftyp();
    file.extend_from_slice(&boxx(b"mdat", mdat_body));
    file.extend_from_slice(&moov);
    file
}

/// Writes the bytes to a uniquely named temp file and returns its path.
pub fn write_temp(name: &str, bytes: &[u8]) -> PathBuf {
    let path =
        std::env::temp_dir().join(format!("mp4tag-{}-{}.m4a", name, std::process::id()));
    fs::write(&path, bytes).unwrap();
    path
}

pub fn remove_temp(path: &PathBuf) {
    let _ = fs::remove_file(path);
}

/// Returns the position of the first occurrence of `needle`.
pub fn find_sub(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|w| w == needle)
}

pub fn be_u32_at(buf: &[u8], pos: usize) -> u32 {
    u32::from_be_bytes([buf[pos], buf[pos + 1], buf[pos + 2], buf[pos + 3]])
}

/// Reads the `stco` entries of the first `stco` box in the buffer.
pub fn read_stco_entries(file: &[u8]) -> Vec<u32> {
    let pos = find_sub(file, b"stco").unwrap() + 4;
    let count = be_u32_at(file, pos + 4) as usize;
    (0..count).map(|i| be_u32_at(file, pos + 8 + i * 4)).collect()
}

/// Reads the `co64` entries of the first `co64` box in the buffer.
pub fn read_co64_entries(file: &[u8]) -> Vec<u64> {
    let pos = find_sub(file, b"co64").unwrap() + 4;
    let count = be_u32_at(file, pos + 4) as usize;
    (0..count)
        .map(|i| {
            let mut bytes = [0u8; 8];
            bytes.copy_from_slice(&file[pos + 8 + i * 8..pos + 16 + i * 8]);
            u64::from_be_bytes(bytes)
        })
        .collect()
}
