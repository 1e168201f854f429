//! Relevant structure of an mp4 file
//!
//! ```md
//! ftyp
//! mdat
//! moov
//! ├─ trak
//! │  └─ mdia
//! │     ├─ mdhd
//! │     └─ minf
//! │        └─ stbl
//! │           ├─ stco
//! │           └─ co64
//! └─ udta
//!    └─ meta
//!       ├─ hdlr
//!       └─ ilst
//!          ├─ **** (any fourcc)
//!          │  └─ data
//!          └─ ---- (freeform fourcc)
//!             ├─ mean
//!             ├─ name
//!             └─ data
//! ```
//!
//! Trailing `free` boxes, at the `ilst` level or at the top level, count as
//! slack the writer may consume or emit.

pub(crate) use ident::*;

pub(crate) mod ftyp;
pub(crate) mod head;
pub(crate) mod ident;
pub(crate) mod ilst;
pub(crate) mod mdhd;
pub(crate) mod parse;
pub(crate) mod util;
