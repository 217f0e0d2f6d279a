//! FAT12 driver.
//!
//! A [`Fat12Fs`] session owns the block device, the parsed boot sector,
//! the derived region geometry and one in-memory copy of the allocation
//! table. The table is loaded in full at [`Fat12Fs::open`] and flushed in
//! full at [`Fat12Fs::close`]; directory buffers are loaded on demand and
//! written back explicitly.

use crate::fs::{FsError, FsResult};
use crate::BlockDevice;
use alloc::string::String;
use alloc::vec;
use alloc::vec::Vec;

pub mod bs;
pub mod dir;
pub mod dirent;
pub mod fat;
pub mod path;

use bs::{BootSector, Geometry};
use dir::Directory;
use dirent::{Attributes, DirEntry};
use fat::{FatEntry, FatTable};
use path::{FilePath, PathKind};

/// A logical cluster number.
///
/// Cluster 0 is the sentinel addressing the fixed root directory region;
/// clusters 2 and up address the data region.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Cluster(u16);

impl Cluster {
    /// Sentinel cluster of the fixed root directory region.
    pub const ROOT: Self = Self(0);

    #[must_use]
    #[inline]
    pub const fn new(value: u16) -> Self {
        Self(value)
    }

    #[must_use]
    #[inline]
    pub const fn value(self) -> u16 {
        self.0
    }

    #[must_use]
    #[inline]
    pub const fn is_root(self) -> bool {
        self.0 == 0
    }
}

/// External store for the working directory text, shared across sessions.
pub trait WorkingDirStore {
    /// Returns the stored path text, or an empty string when unset.
    fn load(&self) -> String;

    /// Persists the canonical path text.
    fn store(&mut self, path: &str);
}

/// One entry of a directory listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryInfo {
    pub name: String,
    pub attributes: Attributes,
    pub first_cluster: Cluster,
    pub size: u32,
    pub is_directory: bool,
}

/// An open FAT12 filesystem session over a block device.
pub struct Fat12Fs<D: BlockDevice> {
    device: D,
    boot_sector: BootSector,
    geometry: Geometry,
    fat: FatTable,
}

impl<D: BlockDevice> Fat12Fs<D> {
    /// Opens a session: parses the boot sector, derives the geometry and
    /// loads the first allocation table copy into memory.
    ///
    /// ## Errors
    ///
    /// Returns `FsError::Format` if the boot sector is malformed, its
    /// sector size disagrees with the device's, or the declared regions do
    /// not fit the volume. Device failures surface as `FsError::Storage`.
    pub fn open(mut device: D) -> FsResult<Self> {
        let mut sector = vec![0_u8; D::BLOCK_SIZE];
        device.read(&mut sector, 0, 1)?;
        let boot_sector = BootSector::parse(&sector)?;

        if usize::from(boot_sector.bytes_per_sector()) != D::BLOCK_SIZE {
            return Err(FsError::Format);
        }

        let geometry = Geometry::new(&boot_sector);
        let total_sectors = usize::from(boot_sector.total_sectors());
        if geometry.data_region > total_sectors {
            return Err(FsError::Format);
        }
        // One entry per data sector, plus the two reserved entries.
        let total_entries = u16::try_from(total_sectors - geometry.data_region + 2)
            .map_err(|_| FsError::Format)?;

        let fat_sectors = usize::from(boot_sector.sectors_per_fat());
        let mut table = vec![0_u8; fat_sectors * D::BLOCK_SIZE];
        device.read(&mut table, geometry.fat_region, fat_sectors)?;
        let fat = FatTable::new(table, total_entries)?;

        Ok(Self {
            device,
            boot_sector,
            geometry,
            fat,
        })
    }

    /// Closes the session: flushes the allocation table back to the first
    /// table copy and releases the device.
    ///
    /// ## Errors
    ///
    /// Returns `FsError::Storage` if the flush fails; the device is lost
    /// in that case.
    pub fn close(mut self) -> FsResult<D> {
        self.device
            .write(self.fat.as_bytes(), self.geometry.fat_region)?;
        Ok(self.device)
    }

    #[must_use]
    #[inline]
    /// Returns the parsed boot sector, for summary reporting.
    pub const fn boot_sector(&self) -> &BootSector {
        &self.boot_sector
    }

    #[must_use]
    #[inline]
    /// Returns the derived region geometry.
    pub const fn geometry(&self) -> Geometry {
        self.geometry
    }

    #[must_use]
    #[inline]
    /// Returns the raw 12-bit allocation table value of an entry number,
    /// or `None` past the table. Diagnostic accessor.
    pub fn fat_entry(&self, entry: u16) -> Option<u16> {
        self.fat.raw(entry)
    }

    #[must_use]
    #[inline]
    /// Returns `(used, total)` data block counts.
    pub fn used_blocks(&self) -> (u16, u16) {
        self.fat.used_blocks()
    }

    #[must_use]
    /// Translates a logical cluster to an absolute sector number.
    const fn physical_sector(&self, cluster: Cluster) -> usize {
        if cluster.is_root() {
            self.geometry.root_region
        } else {
            self.geometry.data_region + cluster.value() as usize - 2
        }
    }

    /// Reads the whole chain starting at `first`, one sector per cluster,
    /// in chain order.
    ///
    /// ## Errors
    ///
    /// Returns `FsError::Storage` if a sector read fails.
    pub fn read_chain(&mut self, first: Cluster) -> FsResult<Vec<u8>> {
        let length = usize::from(self.fat.chain_length(first));
        let mut data = vec![0_u8; length * D::BLOCK_SIZE];

        let mut cluster = first;
        for block in data.chunks_exact_mut(D::BLOCK_SIZE) {
            let sector = self.physical_sector(cluster);
            self.device.read(block, sector, 1)?;
            if let FatEntry::Next(next) = self.fat.get(cluster) {
                cluster = next;
            }
        }
        Ok(data)
    }

    /// Rewrites the chain starting at `first` to hold `data`, padded to
    /// whole sectors.
    ///
    /// The chain is resized in place: it always spans
    /// `max(1, ceil(len / sector_size))` sectors afterwards. A shorter
    /// rewrite frees the excess entries; a longer one links in fresh
    /// clusters, lowest-numbered first.
    ///
    /// ## Errors
    ///
    /// Returns `FsError::NoSpace`, with the table untouched, when growth
    /// would exceed the free block count. Sector write failures surface as
    /// `FsError::Storage`.
    pub fn write_chain(&mut self, first: Cluster, data: &[u8]) -> FsResult<()> {
        let needed = data.len().div_ceil(D::BLOCK_SIZE).max(1);
        let used = usize::from(self.fat.chain_length(first));

        if needed > used {
            let (used_blocks, total_blocks) = self.fat.used_blocks();
            let free = usize::from(total_blocks - used_blocks);
            if free + used < needed {
                return Err(FsError::NoSpace);
            }
        }

        let mut cluster = first;
        let mut sector = vec![0_u8; D::BLOCK_SIZE];
        for index in 0..needed.max(used) {
            // Classified before any mutation so truncation can keep
            // following the old links.
            let entry = self.fat.get(cluster);

            if index < needed {
                let start = index * D::BLOCK_SIZE;
                sector.fill(0);
                if start < data.len() {
                    let end = data.len().min(start + D::BLOCK_SIZE);
                    sector[..end - start].copy_from_slice(&data[start..end]);
                }
                let physical = self.physical_sector(cluster);
                self.device.write(&sector, physical)?;
            } else {
                self.fat.set(cluster, FatEntry::Free);
            }

            if index + 1 == needed {
                self.fat.set(cluster, FatEntry::EndOfChain);
            }

            if index + 1 < needed.max(used) {
                if let FatEntry::Next(next) = entry {
                    cluster = next;
                } else {
                    let fresh = self.fat.find_first_free()?;
                    self.fat.set(cluster, FatEntry::Next(fresh));
                    self.fat.set(fresh, FatEntry::EndOfChain);
                    cluster = fresh;
                }
            }
        }
        Ok(())
    }

    /// Releases the chain starting at `first`.
    ///
    /// Only the first entry is freed; the remainder of a multi-sector
    /// chain stays allocated until overwritten.
    pub fn free_chain(&mut self, first: Cluster) {
        self.fat.set(first, FatEntry::Free);
    }

    /// Loads the entry buffer of the directory at `cluster`.
    ///
    /// ## Errors
    ///
    /// Returns `FsError::Storage` if reading the chain fails.
    pub fn open_directory(&mut self, cluster: Cluster) -> FsResult<Directory> {
        Ok(Directory::from_bytes(self.read_chain(cluster)?))
    }

    /// Writes a directory's entry buffer back to its chain.
    ///
    /// ## Errors
    ///
    /// Propagates the [`Self::write_chain`] errors.
    pub fn save_directory(&mut self, cluster: Cluster, directory: &Directory) -> FsResult<()> {
        self.write_chain(cluster, directory.as_bytes())
    }

    /// Claims a slot in the directory buffer and initializes a fresh entry
    /// in it: uppercased 8.3 name, the given attributes, zero size and a
    /// newly allocated one-cluster chain.
    ///
    /// The buffer grows by one sector when full, which extends the
    /// directory's chain on disk immediately; the root region cannot grow.
    /// The caller persists the slot itself via [`Self::save_directory`].
    ///
    /// ## Errors
    ///
    /// Returns `FsError::NoSpace` when the root directory is full or no
    /// free cluster remains for the entry's content.
    pub fn create_entry(
        &mut self,
        directory: &mut Directory,
        cluster: Cluster,
        name: &str,
        attributes: Attributes,
    ) -> FsResult<usize> {
        let mut slot = None;
        let mut claim_sentinel = false;
        for index in 0..directory.capacity() {
            let entry = directory.entry(index).unwrap_or_else(DirEntry::zeroed);
            if entry.is_free() {
                slot = Some(index);
                break;
            }
            if entry.is_end() {
                slot = Some(index);
                claim_sentinel = true;
                break;
            }
        }

        // Claiming the last slot would leave no room for the sentinel, so
        // that counts as full too.
        let full = match slot {
            None => true,
            Some(index) => claim_sentinel && index + 1 == directory.capacity(),
        };
        let index = if full {
            if cluster.is_root() {
                return Err(FsError::NoSpace);
            }
            let index = slot.unwrap_or(directory.capacity());
            directory.grow(D::BLOCK_SIZE);
            self.write_chain(cluster, directory.as_bytes())?;
            claim_sentinel = true;
            index
        } else {
            slot.unwrap_or_default()
        };

        let content = self.fat.find_first_free()?;
        self.fat.set(content, FatEntry::EndOfChain);

        let entry = DirEntry::create(name, content, attributes);
        directory.set_entry(index, &entry);
        if claim_sentinel {
            directory.set_end(index + 1);
        }
        Ok(index)
    }

    /// Marks the slot free and releases the entry's chain.
    ///
    /// Neither compacts nor persists; the caller does both.
    pub fn remove_entry(&mut self, directory: &mut Directory, index: usize) {
        if let Some(entry) = directory.entry(index) {
            self.free_chain(entry.first_cluster());
            directory.mark_free(index);
        }
    }

    /// Resolves `text` against `start` into a canonical path.
    ///
    /// An absolute `text` restarts from the root; otherwise the walk
    /// continues from `start`, which is left untouched either way. Each
    /// token is matched case-insensitively in the current directory, and
    /// revisited directories (`.`, `..`, loops) collapse by cluster
    /// identity.
    ///
    /// ## Errors
    ///
    /// `FsError::NotFound` for an unmatched token, `FsError::NotADirectory`
    /// when descending through a file or when `Directory` was requested on
    /// a file, `FsError::IsADirectory` when `File` was requested on a
    /// directory.
    pub fn resolve(&mut self, start: &FilePath, text: &str, kind: PathKind) -> FsResult<FilePath> {
        let mut path = if text.starts_with('/') {
            FilePath::root()
        } else {
            start.clone()
        };

        for token in text.split('/').filter(|token| !token.is_empty()) {
            if !path.is_directory() {
                return Err(FsError::NotADirectory);
            }
            let directory = self.open_directory(path.last().cluster)?;
            let (index, entry) = directory.find(token).ok_or(FsError::NotFound)?;
            path.push(
                &entry.filename(),
                entry.first_cluster(),
                index,
                entry.is_directory(),
            );
        }

        match kind {
            PathKind::File if path.is_directory() => Err(FsError::IsADirectory),
            PathKind::Directory if !path.is_directory() => Err(FsError::NotADirectory),
            _ => Ok(path),
        }
    }

    /// Lists the live entries of the directory at `path`.
    ///
    /// ## Errors
    ///
    /// `FsError::NotADirectory` when `path` names a file.
    pub fn list_directory(&mut self, path: &FilePath) -> FsResult<Vec<EntryInfo>> {
        if !path.is_directory() {
            return Err(FsError::NotADirectory);
        }
        let directory = self.open_directory(path.last().cluster)?;
        Ok(directory
            .entries()
            .map(|(_, entry)| EntryInfo {
                name: entry.filename(),
                attributes: entry.attributes(),
                first_cluster: entry.first_cluster(),
                size: entry.file_size(),
                is_directory: entry.is_directory(),
            })
            .collect())
    }

    /// Reads the content of the file at `path`.
    ///
    /// The chain bytes are truncated to the recorded file size when one is
    /// recorded; a zero-size entry returns its whole chain.
    ///
    /// ## Errors
    ///
    /// `FsError::IsADirectory` when `path` names a directory.
    pub fn read_file(&mut self, path: &FilePath) -> FsResult<Vec<u8>> {
        let (_, entry) = self.parent_entry(path)?;
        let mut data = self.read_chain(entry.first_cluster())?;
        let size = entry.file_size() as usize;
        if size > 0 && size < data.len() {
            data.truncate(size);
        }
        Ok(data)
    }

    /// Rewrites the content of the file at `path` and records its size in
    /// the parent directory entry.
    ///
    /// ## Errors
    ///
    /// `FsError::IsADirectory` when `path` names a directory,
    /// `FsError::NoSpace` when the chain cannot grow enough.
    pub fn write_file(&mut self, path: &FilePath, data: &[u8]) -> FsResult<()> {
        let (parent, mut entry) = self.parent_entry(path)?;
        let size = u32::try_from(data.len()).map_err(|_| FsError::NoSpace)?;

        self.write_chain(entry.first_cluster(), data)?;

        entry.set_file_size(size);
        let mut directory = self.open_directory(parent)?;
        directory.set_entry(path.last().index_in_parent, &entry);
        self.save_directory(parent, &directory)
    }

    /// Creates an empty file named by `text`, relative to `start`.
    ///
    /// ## Errors
    ///
    /// `FsError::AlreadyExists` when the path already resolves,
    /// `FsError::NotFound` when the parent path does not,
    /// `FsError::NoSpace` when no slot or cluster is available.
    pub fn create_file(&mut self, start: &FilePath, text: &str) -> FsResult<()> {
        self.create(start, text, Attributes::new(0))
    }

    /// Creates an empty directory named by `text`, relative to `start`.
    ///
    /// The new directory starts with its `.` and `..` entries.
    ///
    /// ## Errors
    ///
    /// Same as [`Self::create_file`].
    pub fn create_directory(&mut self, start: &FilePath, text: &str) -> FsResult<()> {
        self.create(start, text, Attributes::DIRECTORY)
    }

    fn create(&mut self, start: &FilePath, text: &str, attributes: Attributes) -> FsResult<()> {
        if self.resolve(start, text, PathKind::Any).is_ok() {
            return Err(FsError::AlreadyExists);
        }

        let (parent_text, name) = match text.rsplit_once('/') {
            Some(("", name)) => ("/", name),
            Some(pair) => pair,
            None => ("", text),
        };
        if name.is_empty() {
            return Err(FsError::NotFound);
        }
        let parent = if parent_text.is_empty() {
            start.clone()
        } else {
            self.resolve(start, parent_text, PathKind::Directory)?
        };
        let parent_cluster = parent.last().cluster;

        let mut directory = self.open_directory(parent_cluster)?;
        let index = self.create_entry(&mut directory, parent_cluster, name, attributes)?;

        if attributes.contains(Attributes::DIRECTORY) {
            let own = directory
                .entry(index)
                .unwrap_or_else(DirEntry::zeroed)
                .first_cluster();
            let mut child = Directory::from_bytes(vec![0_u8; D::BLOCK_SIZE]);
            child.set_entry(0, &DirEntry::dot(own));
            child.set_entry(1, &DirEntry::dotdot(parent_cluster));
            self.write_chain(own, child.as_bytes())?;
        }

        self.save_directory(parent_cluster, &directory)
    }

    /// Removes the file at `text`, relative to `start`.
    ///
    /// The slot is freed, the parent compacted and persisted.
    ///
    /// ## Errors
    ///
    /// `FsError::NotFound` when the path does not resolve,
    /// `FsError::IsADirectory` when it names a directory.
    pub fn remove_file(&mut self, start: &FilePath, text: &str) -> FsResult<()> {
        let path = self.resolve(start, text, PathKind::File)?;
        self.remove_resolved(&path)
    }

    /// Removes the empty directory at `text`, relative to `start`.
    ///
    /// ## Errors
    ///
    /// `FsError::ProtectedTarget` for the root or for `start` itself (the
    /// working directory), `FsError::DirectoryNotEmpty` when the directory
    /// holds more than `.` and `..`, `FsError::NotADirectory` when the
    /// path names a file.
    pub fn remove_directory(&mut self, start: &FilePath, text: &str) -> FsResult<()> {
        let path = self.resolve(start, text, PathKind::Directory)?;
        let target = path.last().cluster;
        if target.is_root() || target == start.last().cluster {
            return Err(FsError::ProtectedTarget);
        }
        if !self.open_directory(target)?.is_empty() {
            return Err(FsError::DirectoryNotEmpty);
        }
        self.remove_resolved(&path)
    }

    fn remove_resolved(&mut self, path: &FilePath) -> FsResult<()> {
        let parent = path
            .depth()
            .checked_sub(2)
            .and_then(|level| path.level(level))
            .ok_or(FsError::ProtectedTarget)?
            .cluster;
        let mut directory = self.open_directory(parent)?;
        self.remove_entry(&mut directory, path.last().index_in_parent);
        directory.compact();
        self.save_directory(parent, &directory)
    }

    /// Seeds the working directory from the external store.
    ///
    /// A missing or stale stored path falls back to the root.
    pub fn working_directory<S: WorkingDirStore>(&mut self, store: &S) -> FilePath {
        let text = store.load();
        self.resolve(&FilePath::root(), &text, PathKind::Directory)
            .unwrap_or_else(|_| FilePath::root())
    }

    /// Resolves `text` to a directory and persists its canonical path as
    /// the working directory.
    ///
    /// ## Errors
    ///
    /// Propagates the [`Self::resolve`] errors; nothing is stored then.
    pub fn set_working_directory<S: WorkingDirStore>(
        &mut self,
        store: &mut S,
        start: &FilePath,
        text: &str,
    ) -> FsResult<FilePath> {
        let path = self.resolve(start, text, PathKind::Directory)?;
        store.store(path.as_str());
        Ok(path)
    }

    /// Returns the parent directory's cluster and the entry of the file at
    /// `path`.
    fn parent_entry(&mut self, path: &FilePath) -> FsResult<(Cluster, DirEntry)> {
        if path.is_directory() {
            return Err(FsError::IsADirectory);
        }
        // A file path always has a parent level above it.
        let parent = path
            .depth()
            .checked_sub(2)
            .and_then(|level| path.level(level))
            .ok_or(FsError::NotFound)?
            .cluster;
        let entry = self
            .open_directory(parent)?
            .entry(path.last().index_in_parent)
            .ok_or(FsError::NotFound)?;
        Ok((parent, entry))
    }
}
