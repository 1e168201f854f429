mod common;

use std::io::Cursor;
use std::time::Duration;

use common::*;
use mp4tag::{DataKind, ErrorKind, Mp4Tag};

const JPEG: &[u8] = &[0xff, 0xd8, 0xff, 0xe0, 1, 2, 3, 4, 5, 6, 7, 8];
const PNG: &[u8] = &[0x89, b'P', b'N', b'G', 0x0d, 0x0a, 0x1a, 0x0a, 9, 9];

#[test]
fn reads_basic_tags() {
    let tags = vec![
        string_tag(b"\xa9nam", "Song"),
        string_tag(b"\xa9ART", "Artist"),
        tag_box(b"trkn", 0, &[0, 0, 0, 3, 0, 12, 0, 0]),
        tag_box(b"tmpo", 0x15, &[0, 120]),
        tag_box(b"covr", 13, JPEG),
    ];
    let file = file_moov_first(&tags, 0, b"AUDIO", &[0]);
    let path = write_temp("read-basic", &file);

    let tag = Mp4Tag::read_from_path(&path).unwrap();

    assert_eq!(tag.title(), Some("Song"));
    assert_eq!(tag.artist(), Some("Artist"));
    assert_eq!(tag.track_number(), Some((3, 12)));
    assert_eq!(tag.bpm(), Some(120));
    assert_eq!(tag.duration(), Some(Duration::from_secs(10)));
    assert_eq!(tag.timescale(), Some(1000));
    assert_eq!(tag.filetype(), "M4A ");

    let cover = tag.artwork().unwrap();
    assert_eq!(cover.data(), JPEG);
    assert_eq!(cover.kind(), DataKind::Jpeg);
    assert!(cover.is_binary());

    // the store is sorted by name
    let names: Vec<&str> = tag.tags().map(|e| e.name()).collect();
    assert_eq!(names, ["covr", "tmpo", "trkn", "\u{a9}ART", "\u{a9}nam"]);

    assert_eq!(tag.find_tag("trkn").unwrap().data_str(), Some("3/12"));
    assert!(tag.find_tag("\u{a9}alb").is_none());

    remove_temp(&path);
}

#[test]
fn maps_gnre_to_custom_genre() {
    let tags = vec![string_tag(b"\xa9nam", "Song"), tag_box(b"gnre", 0, &[0, 18])];
    let file = file_moov_first(&tags, 0, b"AUDIO", &[0]);
    let path = write_temp("read-gnre", &file);

    let tag = Mp4Tag::read_from_path(&path).unwrap();

    assert_eq!(tag.genre(), Some("Techno"));
    assert!(tag.tags().all(|e| e.name() != "gnre"));

    remove_temp(&path);
}

#[test]
fn reads_freeform_tags() {
    let tags = vec![freeform_tag("com.apple.iTunes", "MusicBrainz Track Id", "abc")];
    let file = file_moov_first(&tags, 0, b"AUDIO", &[0]);
    let path = write_temp("read-freeform", &file);

    let tag = Mp4Tag::read_from_path(&path).unwrap();

    let entry = tag.find_tag("----:com.apple.iTunes:MusicBrainz Track Id").unwrap();
    assert_eq!(entry.data_str(), Some("abc"));
    assert_eq!(entry.kind(), DataKind::Utf8);

    remove_temp(&path);
}

#[test]
fn reads_multiple_covers_with_names() {
    let covr_body = concat(&[
        data_box(13, JPEG),
        boxx(b"name", b"front"),
        data_box(14, PNG),
    ]);
    let tags = vec![string_tag(b"\xa9nam", "Song"), boxx(b"covr", &covr_body)];
    let file = file_moov_first(&tags, 0, b"AUDIO", &[0]);
    let path = write_temp("read-covers", &file);

    let tag = Mp4Tag::read_from_path(&path).unwrap();

    let covers: Vec<_> = tag.artworks().collect();
    assert_eq!(covers.len(), 2);
    assert_eq!(covers[0].data_index(), 0);
    assert_eq!(covers[0].kind(), DataKind::Jpeg);
    assert_eq!(covers[0].cover_name(), Some("front"));
    assert_eq!(covers[1].data_index(), 1);
    assert_eq!(covers[1].kind(), DataKind::Png);
    assert_eq!(covers[1].data(), PNG);
    assert_eq!(covers[1].cover_name(), None);

    assert_eq!(tag.find_tag("covr:1").unwrap().data(), PNG);

    remove_temp(&path);
}

#[test]
fn indices_stay_dense_after_delete() {
    let covr_body = concat(&[data_box(13, JPEG), data_box(14, PNG)]);
    let tags = vec![boxx(b"covr", &covr_body)];
    let file = file_moov_first(&tags, 0, b"AUDIO", &[0]);
    let path = write_temp("read-dense", &file);

    let mut tag = Mp4Tag::read_from_path(&path).unwrap();
    assert!(tag.delete_tag("covr:0").unwrap());

    let covers: Vec<_> = tag.artworks().collect();
    assert_eq!(covers.len(), 1);
    assert_eq!(covers[0].data_index(), 0);
    assert_eq!(covers[0].data(), PNG);
    assert_eq!(tag.find_tag("covr").unwrap().kind(), DataKind::Png);

    remove_temp(&path);
}

#[test]
fn parses_streams_read_only() {
    let tags = vec![string_tag(b"\xa9nam", "Song")];
    let file = file_moov_first(&tags, 0, b"AUDIO", &[0]);

    let mut tag = Mp4Tag::from_stream(Cursor::new(file), Duration::from_millis(100));
    tag.parse().unwrap();

    assert_eq!(tag.title(), Some("Song"));

    let err = tag.write().unwrap_err();
    assert!(matches!(err.kind, ErrorKind::CannotWrite));
}

#[test]
fn heals_oversized_container_lengths() {
    // container lengths overcounting by 16 bytes that leak into the free
    // box following the ilst, the way the buggy 1.3.0 writer left them
    let leak = 16u32;
    let trak = boxx(
        b"trak",
        &boxx(
            b"mdia",
            &concat(&[mdhd(1000, 10_000), boxx(b"minf", &boxx(b"stbl", &stco(&[0])))]),
        ),
    );
    let hdlr_box = hdlr();
    let ilst_box = boxx(b"ilst", &string_tag(b"\xa9nam", "Song"));

    let meta_len = 12 + (hdlr_box.len() + ilst_box.len()) as u32 + leak;
    let udta_len = 8 + meta_len;
    let moov_len = 8 + trak.len() as u32 + udta_len;

    let mut file = ftyp();
    let moov_pos = file.len();
    file.extend_from_slice(&moov_len.to_be_bytes());
    file.extend_from_slice(b"moov");
    file.extend_from_slice(&trak);
    let udta_pos = file.len();
    file.extend_from_slice(&udta_len.to_be_bytes());
    file.extend_from_slice(b"udta");
    let meta_pos = file.len();
    file.extend_from_slice(&meta_len.to_be_bytes());
    file.extend_from_slice(b"meta");
    file.extend_from_slice(&0u32.to_be_bytes());
    file.extend_from_slice(&hdlr_box);
    file.extend_from_slice(&ilst_box);
    file.extend_from_slice(&free_box(64));
    file.extend_from_slice(&boxx(b"mdat", b"AUDIO"));

    let path = write_temp("read-heal", &file);

    let tag = Mp4Tag::read_from_path(&path).unwrap();
    assert_eq!(tag.title(), Some("Song"));

    // the container lengths were fixed up on disk
    let healed = std::fs::read(&path).unwrap();
    assert_eq!(be_u32_at(&healed, moov_pos), moov_len - leak);
    assert_eq!(be_u32_at(&healed, udta_pos), udta_len - leak);
    assert_eq!(be_u32_at(&healed, meta_pos), meta_len - leak);

    // a second parse of the healed file is clean
    let tag = Mp4Tag::read_from_path(&path).unwrap();
    assert_eq!(tag.title(), Some("Song"));

    remove_temp(&path);
}

#[test]
fn rejects_non_mp4_input() {
    let path = write_temp("read-notmp4", b"this is not an mp4 file at all..");
    let err = Mp4Tag::open(&path).unwrap_err();
    assert!(matches!(err.kind, ErrorKind::NotMp4));
    remove_temp(&path);
}

#[test]
fn parses_files_without_ilst() {
    let file = file_no_udta(b"AUDIO", &[0]);
    let path = write_temp("read-noilst", &file);

    let tag = Mp4Tag::read_from_path(&path).unwrap();
    assert_eq!(tag.tags().count(), 0);
    assert_eq!(tag.duration(), Some(Duration::from_secs(10)));

    remove_temp(&path);
}

#[test]
fn refuses_writing_mpeg7_files() {
    let mut body = Vec::new();
    body.extend_from_slice(b"isom");
    body.extend_from_slice(&[0, 0, 2, 0]);
    body.extend_from_slice(b"mp71");
    body.extend_from_slice(b"mp42");
    let mut file = boxx(b"ftyp", &body);
    let rest = file_moov_first(&[string_tag(b"\xa9nam", "Song")], 0, b"AUDIO", &[0]);
    file.extend_from_slice(&rest[ftyp().len()..]);
    let path = write_temp("read-mp7", &file);

    let mut tag = Mp4Tag::read_from_path(&path).unwrap();
    assert_eq!(tag.title(), Some("Song"));
    let err = tag.write().unwrap_err();
    assert!(matches!(err.kind, ErrorKind::CannotWrite));

    remove_temp(&path);
}

#[test]
fn set_requires_parse() {
    let tags = vec![string_tag(b"\xa9nam", "Song")];
    let file = file_moov_first(&tags, 0, b"AUDIO", &[0]);
    let path = write_temp("read-unparsed", &file);

    let mut tag = Mp4Tag::open(&path).unwrap();
    let err = tag.set_tag("\u{a9}nam", "Other", false).unwrap_err();
    assert!(matches!(err.kind, ErrorKind::NotParsed));

    remove_temp(&path);
}

#[test]
fn unknown_tags_are_rejected_as_strings() {
    let tags = vec![string_tag(b"\xa9nam", "Song")];
    let file = file_moov_first(&tags, 0, b"AUDIO", &[0]);
    let path = write_temp("read-unknown", &file);

    let mut tag = Mp4Tag::read_from_path(&path).unwrap();
    let err = tag.set_tag("zzzz", "value", false).unwrap_err();
    assert!(matches!(err.kind, ErrorKind::TagNotFound(_)));

    // binary data of unknown tags is accepted as-is
    tag.set_binary_tag("zzzz", &[1, 2, 3]).unwrap();
    assert_eq!(tag.find_tag("zzzz").unwrap().data(), &[1, 2, 3]);

    remove_temp(&path);
}

#[test]
fn string_binary_mismatches() {
    let tags = vec![string_tag(b"\xa9nam", "Song"), tag_box(b"covr", 13, JPEG)];
    let file = file_moov_first(&tags, 0, b"AUDIO", &[0]);
    let path = write_temp("read-mismatch", &file);

    let mut tag = Mp4Tag::read_from_path(&path).unwrap();

    let err = tag.set_binary_tag("\u{a9}nam", &[1, 2]).unwrap_err();
    assert!(matches!(err.kind, ErrorKind::Mismatch));

    let err = tag.set_binary_tag("trkn", &[0u8; 8]).unwrap_err();
    assert!(matches!(err.kind, ErrorKind::Mismatch));

    let err = tag.set_binary_tag("covr:0:name", b"x").unwrap_err();
    assert!(matches!(err.kind, ErrorKind::Mismatch));

    // naming a cover that does not exist
    let err = tag.set_tag("covr:7:name", "x", false).unwrap_err();
    assert!(matches!(err.kind, ErrorKind::TagNotFound(_)));

    remove_temp(&path);
}
