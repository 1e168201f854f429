use std::fmt;
use std::time::Duration;

use crate::tag::Mp4Tag;

/// ### Media information
impl Mp4Tag {
    /// Returns the duration read from the media header (`mdhd`), with
    /// millisecond precision.
    pub fn duration(&self) -> Option<Duration> {
        self.mdhd.map(|m| Duration::from_millis(m.duration_millis))
    }

    /// Returns the duration formatted in an easily readable way.
    pub(crate) fn format_duration(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let duration = match self.duration() {
            Some(d) => d,
            None => return Ok(()),
        };
        let total_seconds = duration.as_secs();
        let millis = duration.subsec_millis();
        let seconds = total_seconds % 60;
        let minutes = total_seconds / 60 % 60;
        let hours = total_seconds / 60 / 60;

        match (hours, minutes, seconds, millis) {
            (0, 0, 0, m) => writeln!(f, "duration: {m}ms"),
            (0, 0, s, _) => writeln!(f, "duration: {s}s"),
            (0, m, s, _) => writeln!(f, "duration: {m}:{s:02}"),
            (h, m, s, _) => writeln!(f, "duration: {h}:{m:02}:{s:02}"),
        }
    }

    /// Returns the timescale of the media header (`mdhd`).
    pub fn timescale(&self) -> Option<u32> {
        self.mdhd.map(|m| m.timescale)
    }
}

/// ### Filetype
impl Mp4Tag {
    /// Returns the major brand of the filetype (`ftyp`).
    pub fn filetype(&self) -> &str {
        &self.filetype
    }
}
