//! Predefined resource type ids.

pub const RT_CURSOR: u16 = 1;
pub const RT_BITMAP: u16 = 2;
pub const RT_ICON: u16 = 3;
pub const RT_MENU: u16 = 4;
pub const RT_DIALOG: u16 = 5;
pub const RT_STRING: u16 = 6;
pub const RT_FONTDIR: u16 = 7;
pub const RT_FONT: u16 = 8;
pub const RT_ACCELERATOR: u16 = 9;
pub const RT_RCDATA: u16 = 10;
pub const RT_MESSAGETABLE: u16 = 11;
pub const RT_GROUP_CURSOR: u16 = 12;
pub const RT_GROUP_ICON: u16 = 14;
pub const RT_VERSION: u16 = 16;
pub const RT_DLGINCLUDE: u16 = 17;
pub const RT_PLUGPLAY: u16 = 19;
pub const RT_VXD: u16 = 20;
pub const RT_ANICURSOR: u16 = 21;
pub const RT_ANIICON: u16 = 22;
pub const RT_HTML: u16 = 23;
pub const RT_MANIFEST: u16 = 24;

const NAMED_TYPES: [(&str, u16); 21] = [
    ("cursor", RT_CURSOR),
    ("bitmap", RT_BITMAP),
    ("icon", RT_ICON),
    ("menu", RT_MENU),
    ("dialog", RT_DIALOG),
    ("string", RT_STRING),
    ("fontdir", RT_FONTDIR),
    ("font", RT_FONT),
    ("accelerator", RT_ACCELERATOR),
    ("rcdata", RT_RCDATA),
    ("messagetable", RT_MESSAGETABLE),
    ("group_cursor", RT_GROUP_CURSOR),
    ("group_icon", RT_GROUP_ICON),
    ("version", RT_VERSION),
    ("dlginclude", RT_DLGINCLUDE),
    ("plugplay", RT_PLUGPLAY),
    ("vxd", RT_VXD),
    ("anicursor", RT_ANICURSOR),
    ("aniicon", RT_ANIICON),
    ("html", RT_HTML),
    ("manifest", RT_MANIFEST),
];

/// Looks up a predefined type by its lowercase name, e.g. `group_icon`.
pub fn type_from_name(name: &str) -> Option<u16> {
    NAMED_TYPES
        .iter()
        .find(|(n, _)| *n == name)
        .map(|(_, id)| *id)
}
