use super::dirent::{DirEntry, DIR_ENTRY_SIZE, END_OF_ENTRIES};
use alloc::vec::Vec;

/// An in-memory copy of one directory's entry area.
///
/// The buffer holds whole sectors, either the fixed root region or the
/// sectors of a subdirectory's cluster chain. Mutations happen here and
/// are persisted in one piece.
pub struct Directory {
    data: Vec<u8>,
}

impl Directory {
    #[must_use]
    /// Wraps the raw bytes of a directory's sectors.
    pub fn from_bytes(data: Vec<u8>) -> Self {
        Self { data }
    }

    #[must_use]
    #[inline]
    /// Returns the raw bytes, for writing back to storage.
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    #[must_use]
    #[inline]
    /// Returns the number of entry slots the buffer can hold.
    pub fn capacity(&self) -> usize {
        self.data.len() / DIR_ENTRY_SIZE
    }

    #[must_use]
    /// Returns the entry at the given slot, or `None` past the buffer.
    pub fn entry(&self, index: usize) -> Option<DirEntry> {
        let offset = index * DIR_ENTRY_SIZE;
        let bytes = self.data.get(offset..offset + DIR_ENTRY_SIZE)?;
        let mut raw = [0_u8; DIR_ENTRY_SIZE];
        raw.copy_from_slice(bytes);
        Some(DirEntry::from_raw(raw))
    }

    /// Stores an entry at the given slot. Out-of-range slots are ignored.
    pub fn set_entry(&mut self, index: usize, entry: &DirEntry) {
        let offset = index * DIR_ENTRY_SIZE;
        if let Some(bytes) = self.data.get_mut(offset..offset + DIR_ENTRY_SIZE) {
            bytes.copy_from_slice(entry.as_raw());
        }
    }

    /// Writes the end-of-entries sentinel at the given slot.
    pub fn set_end(&mut self, index: usize) {
        let offset = index * DIR_ENTRY_SIZE;
        if let Some(byte) = self.data.get_mut(offset) {
            *byte = END_OF_ENTRIES;
        }
    }

    /// Appends one zeroed sector's worth of bytes to the buffer.
    pub fn grow(&mut self, sector_size: usize) {
        self.data.resize(self.data.len() + sector_size, 0);
    }

    /// Iterates over the valid entries, paired with their slot index.
    ///
    /// Deleted and long-name slots are skipped; the first end-of-entries
    /// sentinel stops the scan for good.
    pub fn entries(&self) -> impl Iterator<Item = (usize, DirEntry)> + '_ {
        self.entries_from(0)
    }

    /// Same as [`Self::entries`], starting at the given slot.
    pub fn entries_from(&self, start: usize) -> impl Iterator<Item = (usize, DirEntry)> + '_ {
        (start..self.capacity())
            .map(|index| (index, self.entry(index).unwrap_or_else(DirEntry::zeroed)))
            .take_while(|(_, entry)| !entry.is_end())
            .filter(|(_, entry)| entry.is_valid())
    }

    #[must_use]
    /// Finds the entry with the given name, matched case-insensitively
    /// against the reconstructed display name.
    pub fn find(&self, name: &str) -> Option<(usize, DirEntry)> {
        self.entries()
            .find(|(_, entry)| entry.filename().eq_ignore_ascii_case(name))
    }

    #[must_use]
    /// Returns whether the directory holds nothing but `.` and `..`.
    pub fn is_empty(&self) -> bool {
        self.entries()
            .all(|(_, entry)| matches!(entry.filename().as_str(), "." | ".."))
    }

    /// Marks the entry at the given slot as deleted.
    pub fn mark_free(&mut self, index: usize) {
        if let Some(mut entry) = self.entry(index) {
            entry.mark_free();
            self.set_entry(index, &entry);
        }
    }

    /// Slides every surviving entry toward slot 0, removing deleted and
    /// long-name slots, and re-terminates the list.
    ///
    /// Relative order is preserved. Running it twice is a no-op.
    pub fn compact(&mut self) {
        let survivors: Vec<DirEntry> = self.entries().map(|(_, entry)| entry).collect();

        for (index, entry) in survivors.iter().enumerate() {
            self.set_entry(index, entry);
        }
        if survivors.len() < self.capacity() {
            self.set_end(survivors.len());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::fat12::dirent::Attributes;
    use crate::fs::fat12::Cluster;
    use alloc::vec;

    fn directory_with(names: &[&str]) -> Directory {
        let mut dir = Directory::from_bytes(vec![0_u8; 512]);
        for (index, name) in names.iter().enumerate() {
            let entry = DirEntry::create(name, Cluster::new(2 + index as u16), Attributes::new(0));
            dir.set_entry(index, &entry);
        }
        dir
    }

    #[test]
    fn iteration_stops_at_sentinel() {
        let mut dir = directory_with(&["a.txt", "b.txt", "c.txt"]);
        dir.set_end(1);

        let names: Vec<_> = dir.entries().map(|(_, e)| e.filename()).collect();
        assert_eq!(names, ["A.TXT"]);
    }

    #[test]
    fn iteration_skips_deleted_slots() {
        let mut dir = directory_with(&["a.txt", "b.txt", "c.txt"]);
        dir.mark_free(1);

        let slots: Vec<_> = dir.entries().map(|(index, _)| index).collect();
        assert_eq!(slots, [0, 2]);
    }

    #[test]
    fn find_is_case_insensitive() {
        let dir = directory_with(&["readme.md"]);
        assert!(dir.find("README.MD").is_some());
        assert!(dir.find("readme.md").is_some());
        assert!(dir.find("other.md").is_none());
    }

    #[test]
    fn compact_slides_and_reterminates() {
        let mut dir = directory_with(&["a.txt", "b.txt", "c.txt"]);
        dir.mark_free(0);
        dir.mark_free(2);
        dir.compact();

        let collected: Vec<_> = dir.entries().map(|(i, e)| (i, e.filename())).collect();
        assert_eq!(collected.len(), 1);
        assert_eq!(collected[0].0, 0);
        assert_eq!(collected[0].1, "B.TXT");
        assert!(dir.entry(1).unwrap().is_end());
    }

    #[test]
    fn compact_is_idempotent() {
        let mut dir = directory_with(&["a.txt", "b.txt", "c.txt"]);
        dir.mark_free(1);
        dir.compact();
        let once = dir.as_bytes().to_vec();
        dir.compact();
        assert_eq!(dir.as_bytes(), &once[..]);
    }

    #[test]
    fn is_empty_ignores_dot_entries() {
        let mut dir = Directory::from_bytes(vec![0_u8; 512]);
        dir.set_entry(0, &DirEntry::dot(Cluster::new(4)));
        dir.set_entry(1, &DirEntry::dotdot(Cluster::ROOT));
        assert!(dir.is_empty());

        let file = DirEntry::create("x.y", Cluster::new(5), Attributes::new(0));
        dir.set_entry(2, &file);
        assert!(!dir.is_empty());
    }
}
