use crate::tag::entry::DataKind;

/// Write priority of freeform and unknown tags.
pub(crate) const PRIORITY_CUSTOM: i32 = 8;
/// Tags carrying this priority are never emitted.
pub(crate) const PRIORITY_NOWRITE: i32 = -1;
/// One past the highest priority in use.
pub(crate) const PRIORITY_MAX: i32 = 20;

/// A known tag: its write priority, display name, storage class and fixed
/// byte width (0 for variable length values).
pub(crate) struct TagDef {
    pub priority: i32,
    pub name: &'static str,
    pub kind: DataKind,
    pub len: u32,
}

const fn def(priority: i32, name: &'static str, kind: DataKind, len: u32) -> TagDef {
    TagDef { priority, name, kind, len }
}

/// The known tag list, sorted by name in byte order so it can be searched
/// binarily. The copyright prefixed names encode the symbol as UTF-8 and
/// therefore sort after all plain ASCII names. The priorities roughly follow
/// what iTunes writes, they do not affect reading.
pub(crate) static TAG_DEFS: [TagDef; 57] = [
    def(2, "aART", DataKind::Utf8, 0),
    def(6, "akID", DataKind::Integer, 1),
    def(6, "atID", DataKind::Integer, 4),
    def(7, "catg", DataKind::Utf8, 0),
    def(6, "cmID", DataKind::Integer, 4),
    def(6, "cnID", DataKind::Integer, 4),
    def(10, "covr", DataKind::Jpeg, 0),
    def(5, "cpil", DataKind::Integer, 1),
    def(7, "cprt", DataKind::Utf8, 0),
    def(7, "desc", DataKind::Utf8, 0),
    def(4, "disk", DataKind::Binary, 6),
    def(7, "egid", DataKind::Utf8, 0),
    def(6, "geID", DataKind::Integer, 4),
    def(PRIORITY_NOWRITE, "gnre", DataKind::Binary, 2),
    def(6, "hdvd", DataKind::Integer, 1),
    def(7, "keyw", DataKind::Utf8, 0),
    def(7, "ldes", DataKind::Utf8, 0),
    def(7, "ownr", DataKind::Utf8, 0),
    def(5, "pcst", DataKind::Integer, 1),
    def(5, "pgap", DataKind::Integer, 1),
    def(6, "plID", DataKind::Integer, 8),
    def(7, "purd", DataKind::Utf8, 0),
    def(7, "purl", DataKind::Utf8, 0),
    def(6, "rtng", DataKind::Integer, 1),
    def(6, "sfID", DataKind::Integer, 4),
    def(6, "shwm", DataKind::Integer, 1),
    def(7, "soaa", DataKind::Utf8, 0),
    def(7, "soal", DataKind::Utf8, 0),
    def(7, "soar", DataKind::Utf8, 0),
    def(7, "soco", DataKind::Utf8, 0),
    def(7, "sonm", DataKind::Utf8, 0),
    def(7, "sosn", DataKind::Utf8, 0),
    def(6, "stik", DataKind::Integer, 1),
    def(5, "tmpo", DataKind::Integer, 2),
    def(4, "trkn", DataKind::Binary, 8),
    def(7, "tven", DataKind::Utf8, 0),
    def(6, "tves", DataKind::Integer, 4),
    def(7, "tvnn", DataKind::Utf8, 0),
    def(7, "tvsh", DataKind::Utf8, 0),
    def(6, "tvsn", DataKind::Integer, 4),
    def(1, "\u{a9}ART", DataKind::Utf8, 0),
    def(2, "\u{a9}alb", DataKind::Utf8, 0),
    def(7, "\u{a9}cmt", DataKind::Utf8, 0),
    def(5, "\u{a9}day", DataKind::Utf8, 0),
    def(7, "\u{a9}dir", DataKind::Utf8, 0),
    def(3, "\u{a9}gen", DataKind::Utf8, 0),
    def(7, "\u{a9}grp", DataKind::Utf8, 0),
    def(9, "\u{a9}lyr", DataKind::Utf8, 0),
    def(6, "\u{a9}mvc", DataKind::Integer, 2),
    def(6, "\u{a9}mvi", DataKind::Integer, 2),
    def(7, "\u{a9}mvn", DataKind::Utf8, 0),
    def(0, "\u{a9}nam", DataKind::Utf8, 0),
    def(7, "\u{a9}nrt", DataKind::Utf8, 0),
    def(7, "\u{a9}pub", DataKind::Utf8, 0),
    def(5, "\u{a9}too", DataKind::Utf8, 0),
    def(7, "\u{a9}wrk", DataKind::Utf8, 0),
    def(2, "\u{a9}wrt", DataKind::Utf8, 0),
];

/// Looks up a tag definition by its display name.
pub(crate) fn find_def(name: &str) -> Option<&'static TagDef> {
    TAG_DEFS.binary_search_by(|d| d.name.cmp(name)).ok().map(|i| &TAG_DEFS[i])
}

/// The ID3 genre list. The `gnre` tag stores a one based index into this
/// table and is mapped to a `©gen` string on read.
pub(crate) static GENRES: [&str; 192] = [
    "Blues", "Classic Rock", "Country", "Dance", "Disco", "Funk", "Grunge", "Hip-Hop", "Jazz",
    "Metal", "New Age", "Oldies", "Other", "Pop", "R&B", "Rap", "Reggae", "Rock", "Techno",
    "Industrial", "Alternative", "Ska", "Death Metal", "Pranks", "Soundtrack", "Euro-Techno",
    "Ambient", "Trip-Hop", "Vocal", "Jazz+Funk", "Fusion", "Trance", "Classical", "Instrumental",
    "Acid", "House", "Game", "Sound Clip", "Gospel", "Noise", "Alt. Rock", "Bass", "Soul", "Punk",
    "Space", "Meditative", "Instrumental Pop", "Instrumental Rock", "Ethnic", "Gothic",
    "Darkwave", "Techno-Industrial", "Electronic", "Pop-Folk", "Eurodance", "Dream",
    "Southern Rock", "Comedy", "Cult", "Gangsta Rap", "Top 40", "Christian Rap", "Pop/Funk",
    "Jungle", "Native American", "Cabaret", "New Wave", "Psychedelic", "Rave", "Showtunes",
    "Trailer", "Lo-Fi", "Tribal", "Acid Punk", "Acid Jazz", "Polka", "Retro", "Musical",
    "Rock & Roll", "Hard Rock", "Folk", "Folk-Rock", "National Folk", "Swing", "Fast-Fusion",
    "Bebop", "Latin", "Revival", "Celtic", "Bluegrass", "Avantgarde", "Gothic Rock",
    "Progressive Rock", "Psychedelic Rock", "Symphonic Rock", "Slow Rock", "Big Band", "Chorus",
    "Easy Listening", "Acoustic", "Humour", "Speech", "Chanson", "Opera", "Chamber Music",
    "Sonata", "Symphony", "Booty Bass", "Primus", "Porn Groove", "Satire", "Slow Jam", "Club",
    "Tango", "Samba", "Folklore", "Ballad", "Power Ballad", "Rhythmic Soul", "Freestyle", "Duet",
    "Punk Rock", "Drum Solo", "A Cappella", "Euro-House", "Dance Hall", "Goa", "Drum & Bass",
    "Club-House", "Hardcore", "Terror", "Indie", "BritPop", "Afro-Punk", "Polsk Punk", "Beat",
    "Christian Gangsta Rap", "Heavy Metal", "Black Metal", "Crossover",
    "Contemporary Christian", "Christian Rock", "Merengue", "Salsa", "Thrash Metal", "Anime",
    "JPop", "Synthpop", "Abstract", "Art Rock", "Baroque", "Bhangra", "Big Beat", "Breakbeat",
    "Chillout", "Downtempo", "Dub", "EBM", "Eclectic", "Electro", "Electroclash", "Emo",
    "Experimental", "Garage", "Global", "IDM", "Illbient", "Industro-Goth", "Jam Band",
    "Krautrock", "Leftfield", "Lounge", "Math Rock", "New Romantic", "Nu-Breakz", "Post-Punk",
    "Post-Rock", "Psytrance", "Shoegaze", "Space Rock", "Trop Rock", "World Music",
    "Neoclassical", "Audiobook", "Audio Theatre", "Neue Deutsche Welle", "Podcast", "Indie Rock",
    "G-Funk", "Dubstep", "Garage Rock", "Psybient",
];
