use mp4tag_proc::{flag_value_accessor, individual_string_value_accessor, integer_value_accessor};

use crate::atom::ilst::parse_pair;
use crate::tag::entry::TagEntry;
use crate::tag::Mp4Tag;

individual_string_value_accessor!("album", "©alb");
individual_string_value_accessor!("album_artist", "aART");
individual_string_value_accessor!("artist", "©ART");
individual_string_value_accessor!("category", "catg");
individual_string_value_accessor!("comment", "©cmt");
individual_string_value_accessor!("composer", "©wrt");
individual_string_value_accessor!("copyright", "cprt");
individual_string_value_accessor!("description", "desc");
individual_string_value_accessor!("encoder", "©too");
individual_string_value_accessor!("genre", "©gen");
individual_string_value_accessor!("grouping", "©grp");
individual_string_value_accessor!("keyword", "keyw");
individual_string_value_accessor!("lyrics", "©lyr");
individual_string_value_accessor!("movement", "©mvn");
individual_string_value_accessor!("title", "©nam");
individual_string_value_accessor!("tv_show", "tvsh");
individual_string_value_accessor!("work", "©wrk");
individual_string_value_accessor!("year", "©day");

flag_value_accessor!("compilation", "cpil");
flag_value_accessor!("gapless_playback", "pgap");
flag_value_accessor!("podcast", "pcst");
flag_value_accessor!("show_movement", "shwm");

integer_value_accessor!("bpm", "tmpo");
integer_value_accessor!("movement_count", "©mvc");
integer_value_accessor!("movement_index", "©mvi");

/// ### Track number
impl Mp4Tag {
    /// Returns the track number and total number of tracks (`trkn`).
    pub fn track_number(&self) -> Option<(u32, u16)> {
        self.string_value("trkn").map(parse_pair)
    }

    /// Sets the track number and total number of tracks (`trkn`).
    pub fn set_track_number(&mut self, track: u32, total: u16) -> crate::Result<()> {
        self.set_string_value("trkn", &format_pair(track, total))
    }

    /// Removes the track number (`trkn`).
    pub fn remove_track_number(&mut self) {
        self.remove_value("trkn");
    }
}

/// ### Disc number
impl Mp4Tag {
    /// Returns the disc number and total number of discs (`disk`).
    pub fn disc_number(&self) -> Option<(u32, u16)> {
        self.string_value("disk").map(parse_pair)
    }

    /// Sets the disc number and total number of discs (`disk`).
    pub fn set_disc_number(&mut self, disc: u32, total: u16) -> crate::Result<()> {
        self.set_string_value("disk", &format_pair(disc, total))
    }

    /// Removes the disc number (`disk`).
    pub fn remove_disc_number(&mut self) {
        self.remove_value("disk");
    }
}

/// ### Artwork
impl Mp4Tag {
    /// Returns all cover images (`covr`).
    pub fn artworks(&self) -> impl Iterator<Item = &TagEntry> {
        self.tags().filter(|e| e.name() == "covr")
    }

    /// Returns the first cover image (`covr`).
    pub fn artwork(&self) -> Option<&TagEntry> {
        self.artworks().next()
    }
}

fn format_pair(a: u32, b: u16) -> String {
    if b == 0 {
        a.to_string()
    } else {
        format!("{}/{}", a, b)
    }
}
