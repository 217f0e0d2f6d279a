use super::Cluster;
use crate::fs::{FsError, FsResult};
use alloc::vec::Vec;

/// Classification of a 12-bit FAT entry value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FatEntry {
    /// 0x000: the cluster is unused.
    Free,
    /// 0xFF0..=0xFF6: reserved.
    Reserved,
    /// 0xFF7: bad cluster.
    Bad,
    /// 0xFF8..=0xFFF: last cluster of a chain.
    EndOfChain,
    /// Any other value is the number of the next cluster in the chain.
    Next(Cluster),
}

impl FatEntry {
    #[must_use]
    /// Classifies a raw 12-bit entry value.
    pub const fn classify(value: u16) -> Self {
        match value {
            0x000 => Self::Free,
            0xFF0..=0xFF6 => Self::Reserved,
            0xFF7 => Self::Bad,
            0xFF8..=0xFFF => Self::EndOfChain,
            next => Self::Next(Cluster::new(next)),
        }
    }

    #[must_use]
    /// Returns the raw 12-bit value this entry encodes to.
    pub const fn encode(self) -> u16 {
        match self {
            Self::Free => 0x000,
            Self::Reserved => 0xFF0,
            Self::Bad => 0xFF7,
            Self::EndOfChain => 0xFFF,
            Self::Next(next) => next.value(),
        }
    }
}

/// The allocation table of a FAT12 volume, held fully in memory.
///
/// Two consecutive entries share three bytes: the even entry occupies the
/// first byte plus the low nibble of the second, the odd entry the high
/// nibble of the second byte plus the third.
pub struct FatTable {
    data: Vec<u8>,
    total_entries: u16,
}

impl FatTable {
    /// Wraps the raw bytes of one FAT table copy.
    ///
    /// `total_entries` covers the reserved entries 0 and 1 plus one entry
    /// per data cluster.
    ///
    /// ## Errors
    ///
    /// Returns `FsError::Format` if the buffer cannot hold that many
    /// packed 12-bit entries.
    pub fn new(data: Vec<u8>, total_entries: u16) -> FsResult<Self> {
        if total_entries < 2 {
            return Err(FsError::Format);
        }
        let last_index = usize::from(total_entries - 1) * 3 / 2;
        if last_index + 2 > data.len() {
            return Err(FsError::Format);
        }
        Ok(Self {
            data,
            total_entries,
        })
    }

    #[must_use]
    #[inline]
    /// Returns the total number of entries, including the reserved two.
    pub const fn total_entries(&self) -> u16 {
        self.total_entries
    }

    #[must_use]
    #[inline]
    /// Returns the raw bytes of the table, for flushing back to storage.
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    #[must_use]
    /// Returns the raw 12-bit value of an entry, or `None` past the table.
    pub fn raw(&self, entry: u16) -> Option<u16> {
        if entry >= self.total_entries {
            return None;
        }
        let index = usize::from(entry) * 3 / 2;
        let word = u16::from_le_bytes([self.data[index], self.data[index + 1]]);
        Some(if entry % 2 == 0 {
            word & 0x0FFF
        } else {
            word >> 4
        })
    }

    #[must_use]
    /// Classifies the entry for the given cluster.
    ///
    /// Clusters past the table classify as bad, so a walk over a corrupted
    /// chain terminates instead of indexing out of range.
    pub fn get(&self, cluster: Cluster) -> FatEntry {
        self.raw(cluster.value())
            .map_or(FatEntry::Bad, FatEntry::classify)
    }

    /// Stores an entry for the given cluster at the packed 12-bit layout.
    ///
    /// Out-of-range clusters are ignored.
    pub fn set(&mut self, cluster: Cluster, entry: FatEntry) {
        if cluster.value() >= self.total_entries {
            return;
        }
        let value = entry.encode();
        let index = usize::from(cluster.value()) * 3 / 2;
        if cluster.value() % 2 == 0 {
            self.data[index] = (value & 0xFF) as u8;
            self.data[index + 1] = (self.data[index + 1] & 0xF0) | ((value >> 8) as u8);
        } else {
            self.data[index] = (self.data[index] & 0x0F) | (((value & 0x0F) << 4) as u8);
            self.data[index + 1] = (value >> 4) as u8;
        }
    }

    /// Finds the lowest-numbered free entry in the data range.
    ///
    /// The scan always starts at entry 2 and moves upward, so allocation
    /// order is deterministic.
    ///
    /// ## Errors
    ///
    /// Returns `FsError::NoSpace` when every data entry is in use.
    pub fn find_first_free(&self) -> FsResult<Cluster> {
        (2..self.total_entries)
            .find(|&entry| matches!(FatEntry::classify(self.raw(entry).unwrap_or(0)), FatEntry::Free))
            .map(Cluster::new)
            .ok_or(FsError::NoSpace)
    }

    #[must_use]
    /// Returns the number of clusters in the chain starting at `first`.
    ///
    /// A chain starting on a free, reserved or bad entry has length 0.
    /// The walk is bounded by the table size, so a cyclic chain cannot
    /// loop forever.
    pub fn chain_length(&self, first: Cluster) -> u16 {
        let mut entry = self.get(first);
        if !matches!(entry, FatEntry::Next(_) | FatEntry::EndOfChain) {
            return 0;
        }

        let mut length = 1_u16;
        while let FatEntry::Next(next) = entry {
            if length >= self.total_entries {
                break;
            }
            length += 1;
            entry = self.get(next);
        }
        length
    }

    #[must_use]
    /// Returns `(used, total)` block counts over the data range.
    ///
    /// Entries 0 and 1 are excluded from both counts.
    pub fn used_blocks(&self) -> (u16, u16) {
        let total = self.total_entries - 2;
        let used = (2..self.total_entries)
            .filter(|&entry| !matches!(FatEntry::classify(self.raw(entry).unwrap_or(0)), FatEntry::Free))
            .count();
        (used as u16, total)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec;

    fn empty_table(entries: u16) -> FatTable {
        FatTable::new(vec![0_u8; 512], entries).unwrap()
    }

    #[test]
    fn classify_boundaries() {
        assert_eq!(FatEntry::classify(0x000), FatEntry::Free);
        assert_eq!(FatEntry::classify(0xFF0), FatEntry::Reserved);
        assert_eq!(FatEntry::classify(0xFF6), FatEntry::Reserved);
        assert_eq!(FatEntry::classify(0xFF7), FatEntry::Bad);
        assert_eq!(FatEntry::classify(0xFF8), FatEntry::EndOfChain);
        assert_eq!(FatEntry::classify(0xFFF), FatEntry::EndOfChain);
        assert_eq!(FatEntry::classify(0x003), FatEntry::Next(Cluster::new(3)));
        assert_eq!(FatEntry::classify(0xFEF), FatEntry::Next(Cluster::new(0xFEF)));
    }

    #[test]
    fn packed_set_get_even_and_odd() {
        let mut fat = empty_table(16);
        fat.set(Cluster::new(2), FatEntry::Next(Cluster::new(0xABC)));
        fat.set(Cluster::new(3), FatEntry::Next(Cluster::new(0x123)));

        assert_eq!(fat.raw(2), Some(0xABC));
        assert_eq!(fat.raw(3), Some(0x123));

        // Rewriting one half must not disturb its neighbor.
        fat.set(Cluster::new(2), FatEntry::EndOfChain);
        assert_eq!(fat.raw(2), Some(0xFFF));
        assert_eq!(fat.raw(3), Some(0x123));
    }

    #[test]
    fn raw_is_bounded() {
        let fat = empty_table(16);
        assert_eq!(fat.raw(15), Some(0));
        assert_eq!(fat.raw(16), None);
        assert_eq!(fat.get(Cluster::new(16)), FatEntry::Bad);
    }

    #[test]
    fn first_fit_is_lowest_numbered() {
        let mut fat = empty_table(16);
        assert_eq!(fat.find_first_free().unwrap(), Cluster::new(2));

        fat.set(Cluster::new(2), FatEntry::EndOfChain);
        fat.set(Cluster::new(3), FatEntry::EndOfChain);
        assert_eq!(fat.find_first_free().unwrap(), Cluster::new(4));

        fat.set(Cluster::new(2), FatEntry::Free);
        assert_eq!(fat.find_first_free().unwrap(), Cluster::new(2));
    }

    #[test]
    fn find_first_free_reports_no_space() {
        let mut fat = empty_table(4);
        fat.set(Cluster::new(2), FatEntry::EndOfChain);
        fat.set(Cluster::new(3), FatEntry::EndOfChain);
        assert_eq!(fat.find_first_free(), Err(FsError::NoSpace));
    }

    #[test]
    fn chain_length_counts_hops() {
        let mut fat = empty_table(16);
        assert_eq!(fat.chain_length(Cluster::new(2)), 0);

        fat.set(Cluster::new(2), FatEntry::Next(Cluster::new(5)));
        fat.set(Cluster::new(5), FatEntry::Next(Cluster::new(7)));
        fat.set(Cluster::new(7), FatEntry::EndOfChain);
        assert_eq!(fat.chain_length(Cluster::new(2)), 3);
        assert_eq!(fat.chain_length(Cluster::new(5)), 2);
        assert_eq!(fat.chain_length(Cluster::new(7)), 1);
    }

    #[test]
    fn chain_length_survives_cycles() {
        let mut fat = empty_table(16);
        fat.set(Cluster::new(2), FatEntry::Next(Cluster::new(3)));
        fat.set(Cluster::new(3), FatEntry::Next(Cluster::new(2)));
        assert!(fat.chain_length(Cluster::new(2)) <= fat.total_entries());
    }

    #[test]
    fn used_blocks_accounting() {
        let mut fat = empty_table(18);
        assert_eq!(fat.used_blocks(), (0, 16));

        fat.set(Cluster::new(2), FatEntry::EndOfChain);
        fat.set(Cluster::new(9), FatEntry::Bad);
        assert_eq!(fat.used_blocks(), (2, 16));
    }
}
