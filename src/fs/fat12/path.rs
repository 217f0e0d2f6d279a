use super::Cluster;
use alloc::string::String;
use alloc::vec::Vec;

/// What kind of entry a path lookup is allowed to land on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathKind {
    /// Either a file or a directory.
    Any,
    /// A file only.
    File,
    /// A directory only.
    Directory,
}

/// One resolved directory level of a path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DirLevel {
    /// First cluster of the entry at this level (the root sentinel for `/`).
    pub cluster: Cluster,
    /// Slot index of the entry within its parent directory.
    pub index_in_parent: usize,
    /// Byte offset of this level's name within the canonical path text.
    pub path_offset: usize,
}

/// A fully resolved path: its canonical text plus one level per component.
///
/// Level 0 is always the root. The canonical text never contains `.` or
/// `..` components and never names the same directory cluster twice.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilePath {
    path: String,
    levels: Vec<DirLevel>,
    is_directory: bool,
}

const ROOT_LEVEL: DirLevel = DirLevel {
    cluster: Cluster::ROOT,
    index_in_parent: 0,
    path_offset: 0,
};

impl FilePath {
    #[must_use]
    /// Returns the path of the root directory, `/`.
    pub fn root() -> Self {
        Self {
            path: String::from("/"),
            levels: Vec::from([ROOT_LEVEL]),
            is_directory: true,
        }
    }

    #[must_use]
    #[inline]
    /// Returns the canonical path text.
    pub fn as_str(&self) -> &str {
        &self.path
    }

    #[must_use]
    #[inline]
    /// Returns the number of levels, root included.
    pub fn depth(&self) -> usize {
        self.levels.len()
    }

    #[must_use]
    #[inline]
    /// Returns whether the resolved entry is a directory.
    pub const fn is_directory(&self) -> bool {
        self.is_directory
    }

    #[must_use]
    #[inline]
    /// Returns the level at the given position, root being level 0.
    pub fn level(&self, index: usize) -> Option<&DirLevel> {
        self.levels.get(index)
    }

    #[must_use]
    #[inline]
    /// Returns the deepest level, the resolved entry itself.
    pub fn last(&self) -> &DirLevel {
        self.levels.last().unwrap_or(&ROOT_LEVEL)
    }

    /// Appends one resolved component.
    ///
    /// When the component is a directory already present at an earlier
    /// level (same cluster number), the path is cut back to that level
    /// instead, so loops through `..` and self-referencing chains collapse
    /// to their shortest form.
    pub(crate) fn push(&mut self, name: &str, cluster: Cluster, index_in_parent: usize, is_directory: bool) {
        let path_offset = self.path.len() + usize::from(self.depth() > 1);
        if self.depth() > 1 {
            self.path.push('/');
        }
        self.path.push_str(name);
        self.levels.push(DirLevel {
            cluster,
            index_in_parent,
            path_offset,
        });
        self.is_directory = is_directory;

        if is_directory {
            self.collapse_redundancy();
        }
    }

    /// Cuts the path back to the first earlier level that names the same
    /// directory cluster as the deepest one, if any.
    fn collapse_redundancy(&mut self) {
        let deepest = self.last().cluster;
        let Some(keep) = self
            .levels
            .iter()
            .take(self.depth() - 1)
            .position(|level| level.cluster == deepest)
        else {
            return;
        };

        let cut = if keep == 0 {
            1
        } else {
            self.levels[keep + 1].path_offset - 1
        };
        self.path.truncate(cut);
        self.levels.truncate(keep + 1);
        self.is_directory = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn root_shape() {
        let path = FilePath::root();
        assert_eq!(path.as_str(), "/");
        assert_eq!(path.depth(), 1);
        assert!(path.is_directory());
        assert_eq!(path.last().cluster, Cluster::ROOT);
    }

    #[test]
    fn push_builds_canonical_text() {
        let mut path = FilePath::root();
        path.push("A", Cluster::new(2), 0, true);
        assert_eq!(path.as_str(), "/A");

        path.push("B", Cluster::new(3), 1, true);
        assert_eq!(path.as_str(), "/A/B");

        path.push("C.TXT", Cluster::new(4), 0, false);
        assert_eq!(path.as_str(), "/A/B/C.TXT");
        assert_eq!(path.depth(), 4);
        assert!(!path.is_directory());
    }

    #[test]
    fn revisiting_a_directory_collapses_the_path() {
        let mut path = FilePath::root();
        path.push("A", Cluster::new(2), 0, true);
        path.push("B", Cluster::new(3), 0, true);
        // Walking back into A (e.g. through "..") must shorten, not append.
        path.push("A", Cluster::new(2), 0, true);

        assert_eq!(path.as_str(), "/A");
        assert_eq!(path.depth(), 2);
    }

    #[test]
    fn revisiting_the_root_collapses_to_slash() {
        let mut path = FilePath::root();
        path.push("A", Cluster::new(2), 0, true);
        path.push("ROOT", Cluster::ROOT, 0, true);

        assert_eq!(path.as_str(), "/");
        assert_eq!(path.depth(), 1);
    }

    #[test]
    fn files_do_not_collapse_on_cluster_identity() {
        let mut path = FilePath::root();
        path.push("A", Cluster::new(2), 0, true);
        // An empty file can share cluster 0 with the root sentinel; that
        // must not be mistaken for a revisit.
        path.push("EMPTY.TXT", Cluster::new(0), 0, false);

        assert_eq!(path.as_str(), "/A/EMPTY.TXT");
        assert_eq!(path.depth(), 3);
    }
}
