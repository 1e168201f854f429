//! A library for reading, editing and writing iTunes style MPEG-4 (`ilst`)
//! metadata in MP4/M4A files.
//!
//! A file is parsed once, mutated through the flat tag view, and written
//! back either in place (when the new tag list fits its existing footprint
//! plus adjacent free space) or through an atomic temp-file rewrite that
//! relocates the media data and patches the `stco`/`co64` sample offset
//! tables.
//!
//! # Example
//!
//! ```no_run
//! let mut tag = mp4tag::Mp4Tag::read_from_path("music.m4a")?;
//!
//! if let Some(artist) = tag.artist() {
//!     println!("artist: {}", artist);
//! }
//!
//! tag.set_title("Song")?;
//! tag.set_tag("\u{a9}alb", "Album", false)?;
//! tag.write()?;
//! # Ok::<(), mp4tag::Error>(())
//! ```

pub use crate::error::{Error, ErrorKind, Result};
pub use crate::tag::entry::{DataKind, TagEntry};
pub use crate::tag::{Mp4Tag, TagSnapshot};

mod atom;
mod error;
mod source;
mod tag;
mod write;
