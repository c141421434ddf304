//! Raw 32-byte directory-entry slot layout.

/// Size of a directory entry slot in bytes (always 32 bytes)
pub const DIR_ENTRY_SIZE: usize = 32;

/// Offset of the attribute byte within a slot
pub const ATTRIBUTES_OFFSET: usize = 11;
/// Offset of the LFN type byte within a long-name slot
pub const LFN_TYPE_OFFSET: usize = 12;

/// First-byte status markers of a short entry
pub mod status {
    /// Free entry, and no allocated entries follow
    pub const END_OF_ENTRIES: u8 = 0x00;
    /// First name character is actually 0xE5 (Kanji lead byte escape)
    pub const KANJI_ESCAPE: u8 = 0x05;
    /// Deleted entry
    pub const DELETED: u8 = 0xE5;
    /// Smallest status byte that denotes a live, printable entry
    pub const FIRST_PRINTABLE: u8 = 0x20;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// Directory entry attributes
pub struct Attributes(u8);

impl Attributes {
    /// Read-only attribute
    pub const READ_ONLY: u8 = 0x01;
    /// Hidden attribute
    pub const HIDDEN: u8 = 0x02;
    /// System attribute
    pub const SYSTEM: u8 = 0x04;
    /// Volume ID attribute
    pub const VOLUME_ID: u8 = 0x08;
    /// Directory attribute
    pub const DIRECTORY: u8 = 0x10;
    /// Archive attribute
    pub const ARCHIVE: u8 = 0x20;
    /// Long file name marker (all four low bits set)
    pub const LONG_NAME: u8 = Self::READ_ONLY | Self::HIDDEN | Self::SYSTEM | Self::VOLUME_ID;

    #[must_use]
    #[inline]
    /// Creates a new attribute set
    pub const fn new(attributes: u8) -> Self {
        Self(attributes)
    }

    #[must_use]
    #[inline]
    /// Returns the raw attribute byte
    pub const fn bits(&self) -> u8 {
        self.0
    }

    #[must_use]
    #[inline]
    /// Returns true if the slot is a VFAT long-name fragment
    ///
    /// The marker is an exact byte match, not a mask test: a slot carrying
    /// extra bits on top of the four low ones is *not* a name fragment
    pub const fn is_long_name(&self) -> bool {
        self.0 == Self::LONG_NAME
    }

    #[must_use]
    #[inline]
    /// Returns true if the entry is a directory
    pub const fn is_directory(&self) -> bool {
        self.0 & Self::DIRECTORY != 0
    }

    #[must_use]
    #[inline]
    /// Returns true if the entry is a volume ID
    pub const fn is_volume_id(&self) -> bool {
        self.0 & Self::VOLUME_ID != 0
    }

    #[must_use]
    #[inline]
    /// Returns the attribute bits that classify the entry
    ///
    /// 0 is a plain file, `DIRECTORY` a subdirectory, `VOLUME_ID` an
    /// administrative pseudo-entry; anything else is unsupported
    pub const fn classification(&self) -> u8 {
        self.0 & (Self::DIRECTORY | Self::VOLUME_ID)
    }
}

/// A named metadata field of a short directory entry
///
/// Each field occupies a fixed byte span within the 32-byte slot; patching
/// goes through this table so offsets are never scattered around the code
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetadataField {
    /// 8.3 name plus extension, space-padded
    ShortName,
    /// Attribute byte
    Attributes,
    /// High halfword of the first cluster number
    FirstClusterHigh,
    /// Low halfword of the first cluster number
    FirstClusterLow,
    /// File size in bytes
    Size,
}

impl MetadataField {
    /// All fields, for exhaustive boundary tests
    pub const ALL: [Self; 5] = [
        Self::ShortName,
        Self::Attributes,
        Self::FirstClusterHigh,
        Self::FirstClusterLow,
        Self::Size,
    ];

    #[must_use]
    #[inline]
    /// Byte offset of the field within its 32-byte slot
    pub const fn offset(self) -> usize {
        match self {
            Self::ShortName => 0,
            Self::Attributes => 11,
            Self::FirstClusterHigh => 20,
            Self::FirstClusterLow => 26,
            Self::Size => 28,
        }
    }

    #[must_use]
    #[inline]
    /// Byte length of the field
    pub const fn byte_len(self) -> usize {
        match self {
            Self::ShortName => 11,
            Self::Attributes => 1,
            Self::FirstClusterHigh | Self::FirstClusterLow => 2,
            Self::Size => 4,
        }
    }
}

#[must_use]
#[inline]
/// Reads a little-endian halfword at `offset`
pub(crate) fn read_u16(data: &[u8], offset: usize) -> u16 {
    u16::from_le_bytes([data[offset], data[offset + 1]])
}

#[must_use]
#[inline]
/// Reads a little-endian word at `offset`
pub(crate) fn read_u32(data: &[u8], offset: usize) -> u32 {
    u32::from_le_bytes([
        data[offset],
        data[offset + 1],
        data[offset + 2],
        data[offset + 3],
    ])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_long_name_marker_is_exact() {
        assert!(Attributes::new(Attributes::LONG_NAME).is_long_name());
        // Any extra bit disqualifies the slot as a name fragment.
        assert!(!Attributes::new(Attributes::LONG_NAME | Attributes::ARCHIVE).is_long_name());
        assert!(!Attributes::new(Attributes::READ_ONLY).is_long_name());
    }

    #[test]
    fn test_classification() {
        assert_eq!(Attributes::new(0).classification(), 0);
        assert_eq!(Attributes::new(Attributes::ARCHIVE).classification(), 0);
        assert_eq!(
            Attributes::new(Attributes::DIRECTORY).classification(),
            Attributes::DIRECTORY
        );
        assert_eq!(
            Attributes::new(Attributes::VOLUME_ID | Attributes::SYSTEM).classification(),
            Attributes::VOLUME_ID
        );
    }

    #[test]
    fn test_field_table() {
        let expected = [
            (MetadataField::ShortName, 0, 11),
            (MetadataField::Attributes, 11, 1),
            (MetadataField::FirstClusterHigh, 20, 2),
            (MetadataField::FirstClusterLow, 26, 2),
            (MetadataField::Size, 28, 4),
        ];
        for (field, offset, len) in expected {
            assert_eq!(field.offset(), offset);
            assert_eq!(field.byte_len(), len);
            // Every field span fits inside one slot.
            assert!(field.offset() + field.byte_len() <= DIR_ENTRY_SIZE);
        }
        assert_eq!(MetadataField::ALL.len(), expected.len());
    }

    #[test]
    fn test_le_readers() {
        let data = [0x45, 0x23, 0x01, 0x00, 0xFF];
        assert_eq!(read_u16(&data, 0), 0x2345);
        assert_eq!(read_u16(&data, 1), 0x0123);
        assert_eq!(read_u32(&data, 0), 0x0001_2345);
        assert_eq!(read_u32(&data, 1), 0xFF00_0123);
    }
}
