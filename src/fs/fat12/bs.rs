use super::dirent::DIR_ENTRY_SIZE;
use crate::fs::{FsError, FsResult};

/// Size of the fixed-offset boot sector record that the driver reads.
///
/// Everything past this offset is boot code and is ignored.
pub const BOOT_RECORD_SIZE: usize = 62;

/// Boot sector of a FAT12 volume.
///
/// Fields are deserialized one by one from their fixed little-endian
/// offsets; the struct never aliases the raw sector bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BootSector {
    bytes_per_sector: u16,
    sectors_per_cluster: u8,
    reserved_sectors: u16,
    fat_count: u8,
    max_root_entries: u16,
    total_sectors: u16,
    media_descriptor: u8,
    sectors_per_fat: u16,
    sectors_per_track: u16,
    heads: u16,
    boot_signature: u8,
    volume_id: u32,
    volume_label: [u8; 11],
    fs_type: [u8; 8],
}

#[inline]
const fn read_u16(bytes: &[u8], offset: usize) -> u16 {
    u16::from_le_bytes([bytes[offset], bytes[offset + 1]])
}

#[inline]
const fn read_u32(bytes: &[u8], offset: usize) -> u32 {
    u32::from_le_bytes([
        bytes[offset],
        bytes[offset + 1],
        bytes[offset + 2],
        bytes[offset + 3],
    ])
}

impl BootSector {
    /// Parses the boot sector record from the first sector of the volume.
    ///
    /// ## Errors
    ///
    /// Returns `FsError::Format` if the buffer is shorter than the record.
    pub fn parse(bytes: &[u8]) -> FsResult<Self> {
        if bytes.len() < BOOT_RECORD_SIZE {
            return Err(FsError::Format);
        }

        let mut volume_label = [0_u8; 11];
        volume_label.copy_from_slice(&bytes[43..54]);
        let mut fs_type = [0_u8; 8];
        fs_type.copy_from_slice(&bytes[54..62]);

        Ok(Self {
            bytes_per_sector: read_u16(bytes, 11),
            sectors_per_cluster: bytes[13],
            reserved_sectors: read_u16(bytes, 14),
            fat_count: bytes[16],
            max_root_entries: read_u16(bytes, 17),
            total_sectors: read_u16(bytes, 19),
            media_descriptor: bytes[21],
            sectors_per_fat: read_u16(bytes, 22),
            sectors_per_track: read_u16(bytes, 24),
            heads: read_u16(bytes, 26),
            boot_signature: bytes[38],
            volume_id: read_u32(bytes, 39),
            volume_label,
            fs_type,
        })
    }

    #[must_use]
    #[inline]
    /// Returns the number of bytes per sector.
    pub const fn bytes_per_sector(&self) -> u16 {
        self.bytes_per_sector
    }

    #[must_use]
    #[inline]
    /// Returns the number of sectors per cluster.
    pub const fn sectors_per_cluster(&self) -> u8 {
        self.sectors_per_cluster
    }

    #[must_use]
    #[inline]
    /// Returns the number of reserved sectors.
    pub const fn reserved_sectors(&self) -> u16 {
        self.reserved_sectors
    }

    #[must_use]
    #[inline]
    /// Returns the number of FAT table copies.
    pub const fn fat_count(&self) -> u8 {
        self.fat_count
    }

    #[must_use]
    #[inline]
    /// Returns the maximum number of root directory entries.
    pub const fn max_root_entries(&self) -> u16 {
        self.max_root_entries
    }

    #[must_use]
    #[inline]
    /// Returns the total number of sectors in the volume.
    pub const fn total_sectors(&self) -> u16 {
        self.total_sectors
    }

    #[must_use]
    #[inline]
    /// Returns the media descriptor.
    pub const fn media_descriptor(&self) -> u8 {
        self.media_descriptor
    }

    #[must_use]
    #[inline]
    /// Returns the number of sectors per FAT table copy.
    pub const fn sectors_per_fat(&self) -> u16 {
        self.sectors_per_fat
    }

    #[must_use]
    #[inline]
    /// Returns the number of sectors per track.
    pub const fn sectors_per_track(&self) -> u16 {
        self.sectors_per_track
    }

    #[must_use]
    #[inline]
    /// Returns the number of heads.
    pub const fn heads(&self) -> u16 {
        self.heads
    }

    #[must_use]
    #[inline]
    /// Returns the boot signature.
    pub const fn boot_signature(&self) -> u8 {
        self.boot_signature
    }

    #[must_use]
    #[inline]
    /// Returns the volume serial number.
    pub const fn volume_id(&self) -> u32 {
        self.volume_id
    }

    #[must_use]
    #[inline]
    /// Returns the volume label.
    pub const fn volume_label(&self) -> [u8; 11] {
        self.volume_label
    }

    #[must_use]
    #[inline]
    /// Returns the filesystem type string (e.g. `FAT12   `).
    pub const fn fs_type(&self) -> &[u8] {
        &self.fs_type
    }
}

/// Sector offsets of the three regions that follow the reserved sectors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Geometry {
    /// First sector of the FAT table region.
    pub fat_region: usize,
    /// First sector of the fixed root directory region.
    pub root_region: usize,
    /// First sector of the data region (cluster 2 maps here).
    pub data_region: usize,
}

impl Geometry {
    /// Derives the region offsets from a parsed boot sector.
    ///
    /// The root directory footprint is rounded up to whole sectors.
    #[must_use]
    pub fn new(boot_sector: &BootSector) -> Self {
        let fat_region = usize::from(boot_sector.reserved_sectors());
        let root_region = fat_region
            + usize::from(boot_sector.sectors_per_fat()) * usize::from(boot_sector.fat_count());
        let root_sectors = (usize::from(boot_sector.max_root_entries()) * DIR_ENTRY_SIZE)
            .div_ceil(usize::from(boot_sector.bytes_per_sector()));
        let data_region = root_region + root_sectors;

        Self {
            fat_region,
            root_region,
            data_region,
        }
    }
}
