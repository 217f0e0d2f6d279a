use super::Cluster;
use alloc::string::String;

/// Size of an on-disk directory entry.
pub const DIR_ENTRY_SIZE: usize = 32;

/// First name byte marking an entry as deleted and reusable.
pub const FREE_ENTRY: u8 = 0xE5;
/// First name byte marking the end of the entry list.
pub const END_OF_ENTRIES: u8 = 0x00;

/// Attribute flags of a directory entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Attributes(u8);

impl Attributes {
    pub const READ_ONLY: Self = Self(0x01);
    pub const HIDDEN: Self = Self(0x02);
    pub const SYSTEM: Self = Self(0x04);
    pub const VOLUME_ID: Self = Self(0x08);
    pub const DIRECTORY: Self = Self(0x10);
    pub const ARCHIVE: Self = Self(0x20);
    /// All four low bits set at once mark a long-file-name entry.
    pub const LONG_NAME: Self = Self(0x0F);

    #[must_use]
    #[inline]
    pub const fn new(value: u8) -> Self {
        Self(value)
    }

    #[must_use]
    #[inline]
    pub const fn value(self) -> u8 {
        self.0
    }

    #[must_use]
    #[inline]
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }
}

/// A 32-byte directory entry, kept in its raw on-disk form.
///
/// Accessors decode the fixed-offset fields on demand so an entry can be
/// copied back into a directory buffer unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DirEntry {
    raw: [u8; DIR_ENTRY_SIZE],
}

impl DirEntry {
    #[must_use]
    /// Wraps the raw bytes of one entry.
    pub const fn from_raw(raw: [u8; DIR_ENTRY_SIZE]) -> Self {
        Self { raw }
    }

    #[must_use]
    /// Returns a blank entry whose fields are all zero.
    pub const fn zeroed() -> Self {
        Self {
            raw: [0; DIR_ENTRY_SIZE],
        }
    }

    #[must_use]
    /// Builds a fresh entry for the given name, first cluster and attributes.
    ///
    /// The name is split at the first dot; base and extension are uppercased
    /// and padded with spaces to 8 and 3 bytes. Overlong parts are truncated.
    pub fn create(name: &str, first_cluster: Cluster, attributes: Attributes) -> Self {
        let mut entry = Self::zeroed();
        entry.set_filename(name);
        entry.set_first_cluster(first_cluster);
        entry.raw[11] = attributes.value();
        entry
    }

    #[must_use]
    /// Builds the `.` self-reference entry of a subdirectory.
    pub fn dot(own_cluster: Cluster) -> Self {
        let mut entry = Self::zeroed();
        entry.raw[..11].copy_from_slice(b".          ");
        entry.raw[11] = Attributes::DIRECTORY.value();
        entry.set_first_cluster(own_cluster);
        entry
    }

    #[must_use]
    /// Builds the `..` parent-reference entry of a subdirectory.
    pub fn dotdot(parent_cluster: Cluster) -> Self {
        let mut entry = Self::zeroed();
        entry.raw[..11].copy_from_slice(b"..         ");
        entry.raw[11] = Attributes::DIRECTORY.value();
        entry.set_first_cluster(parent_cluster);
        entry
    }

    #[must_use]
    #[inline]
    /// Returns the raw 32 bytes of the entry.
    pub const fn as_raw(&self) -> &[u8; DIR_ENTRY_SIZE] {
        &self.raw
    }

    #[must_use]
    #[inline]
    /// Returns whether the entry slot was deleted and may be reused.
    pub const fn is_free(&self) -> bool {
        self.raw[0] == FREE_ENTRY
    }

    #[must_use]
    #[inline]
    /// Returns whether the entry marks the end of the entry list.
    pub const fn is_end(&self) -> bool {
        self.raw[0] == END_OF_ENTRIES
    }

    #[must_use]
    #[inline]
    /// Returns whether the entry is a long-file-name continuation.
    pub const fn is_long_name(&self) -> bool {
        self.raw[11] == Attributes::LONG_NAME.value()
    }

    #[must_use]
    #[inline]
    /// Returns whether the entry names a real file or directory.
    pub const fn is_valid(&self) -> bool {
        !self.is_free() && !self.is_end() && !self.is_long_name()
    }

    #[must_use]
    #[inline]
    pub const fn attributes(&self) -> Attributes {
        Attributes::new(self.raw[11])
    }

    #[must_use]
    #[inline]
    /// Returns whether the entry names a directory.
    pub const fn is_directory(&self) -> bool {
        self.attributes().contains(Attributes::DIRECTORY)
    }

    #[must_use]
    #[inline]
    /// Returns the first cluster of the entry's chain.
    pub const fn first_cluster(&self) -> Cluster {
        Cluster::new(u16::from_le_bytes([self.raw[26], self.raw[27]]))
    }

    #[inline]
    pub const fn set_first_cluster(&mut self, cluster: Cluster) {
        let bytes = cluster.value().to_le_bytes();
        self.raw[26] = bytes[0];
        self.raw[27] = bytes[1];
    }

    #[must_use]
    #[inline]
    /// Returns the recorded byte size of the file.
    pub const fn file_size(&self) -> u32 {
        u32::from_le_bytes([self.raw[28], self.raw[29], self.raw[30], self.raw[31]])
    }

    #[inline]
    pub const fn set_file_size(&mut self, size: u32) {
        let bytes = size.to_le_bytes();
        self.raw[28] = bytes[0];
        self.raw[29] = bytes[1];
        self.raw[30] = bytes[2];
        self.raw[31] = bytes[3];
    }

    #[must_use]
    /// Reconstructs the display name from the padded base and extension.
    ///
    /// Trailing spaces are trimmed from both parts; the dot is only emitted
    /// when the extension is non-empty, so `.` and `..` come back intact.
    pub fn filename(&self) -> String {
        let base_len = self.raw[..8]
            .iter()
            .rposition(|&byte| byte != b' ')
            .map_or(0, |pos| pos + 1);
        let ext_len = self.raw[8..11]
            .iter()
            .rposition(|&byte| byte != b' ')
            .map_or(0, |pos| pos + 1);

        let mut name = String::with_capacity(base_len + 1 + ext_len);
        for &byte in &self.raw[..base_len] {
            name.push(char::from(byte));
        }
        if ext_len > 0 {
            name.push('.');
            for &byte in &self.raw[8..8 + ext_len] {
                name.push(char::from(byte));
            }
        }
        name
    }

    /// Stores a name into the padded base and extension fields.
    pub fn set_filename(&mut self, name: &str) {
        self.raw[..11].fill(b' ');

        let (base, ext) = name.split_once('.').unwrap_or((name, ""));
        for (dst, byte) in self.raw[..8].iter_mut().zip(base.bytes()) {
            *dst = byte.to_ascii_uppercase();
        }
        for (dst, byte) in self.raw[8..11].iter_mut().zip(ext.bytes()) {
            *dst = byte.to_ascii_uppercase();
        }
    }

    /// Marks the slot as deleted.
    pub const fn mark_free(&mut self) {
        self.raw[0] = FREE_ENTRY;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_pads_and_uppercases() {
        let entry = DirEntry::create("foo.txt", Cluster::new(5), Attributes::new(0));
        assert_eq!(&entry.as_raw()[..11], b"FOO     TXT");
        assert_eq!(entry.filename(), "FOO.TXT");
        assert_eq!(entry.first_cluster(), Cluster::new(5));
        assert_eq!(entry.file_size(), 0);
        assert!(!entry.is_directory());
    }

    #[test]
    fn create_truncates_overlong_parts() {
        let entry = DirEntry::create("verylongname.text", Cluster::new(2), Attributes::new(0));
        assert_eq!(&entry.as_raw()[..11], b"VERYLONGTEX");
        assert_eq!(entry.filename(), "VERYLONG.TEX");
    }

    #[test]
    fn filename_without_extension() {
        let entry = DirEntry::create("subdir", Cluster::new(3), Attributes::DIRECTORY);
        assert_eq!(entry.filename(), "SUBDIR");
        assert!(entry.is_directory());
    }

    #[test]
    fn dot_entries_keep_their_names() {
        let dot = DirEntry::dot(Cluster::new(4));
        let dotdot = DirEntry::dotdot(Cluster::ROOT);

        assert_eq!(dot.filename(), ".");
        assert_eq!(dot.first_cluster(), Cluster::new(4));
        assert_eq!(dotdot.filename(), "..");
        assert_eq!(dotdot.first_cluster(), Cluster::ROOT);
        assert!(dot.is_directory() && dotdot.is_directory());
    }

    #[test]
    fn sentinel_classification() {
        let mut raw = [0_u8; DIR_ENTRY_SIZE];
        assert!(DirEntry::from_raw(raw).is_end());

        raw[0] = FREE_ENTRY;
        assert!(DirEntry::from_raw(raw).is_free());

        raw[0] = b'A';
        raw[11] = Attributes::LONG_NAME.value();
        let entry = DirEntry::from_raw(raw);
        assert!(entry.is_long_name());
        assert!(!entry.is_valid());
    }

    #[test]
    fn size_round_trip() {
        let mut entry = DirEntry::create("a.b", Cluster::new(2), Attributes::new(0));
        entry.set_file_size(0x0102_0304);
        assert_eq!(entry.file_size(), 0x0102_0304);
    }
}
