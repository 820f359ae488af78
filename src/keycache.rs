use smol_str::SmolStr;

use crate::{Error, Result};

/// Document-scoped key interning cache.
///
/// Keys live in an append-only slot table, so a slot handed out to an item
/// stays valid for the document's lifetime. A separate permutation of the
/// slots is kept ordered by byte comparison of the backing text; lookups
/// binary-search that order, and a miss inserts at the sorted position.
/// Key sets are small per document and reused heavily, so the O(n) shift
/// on a cache miss stays cheap.
#[derive(Debug, Default)]
pub(crate) struct KeyCache {
    entries: Vec<SmolStr>,
    sorted: Vec<usize>,
}

impl KeyCache {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn get(&self, slot: usize) -> &str {
        self.entries[slot].as_str()
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    /// Position of `candidate` in the sorted order, or the insertion point.
    fn rank_of(&self, candidate: &str) -> std::result::Result<usize, usize> {
        self.sorted
            .binary_search_by(|&slot| self.entries[slot].as_bytes().cmp(candidate.as_bytes()))
    }

    pub(crate) fn lookup(&self, candidate: &str) -> Option<usize> {
        self.rank_of(candidate).ok().map(|rank| self.sorted[rank])
    }

    pub(crate) fn intern(&mut self, candidate: &str) -> usize {
        match self.rank_of(candidate) {
            Ok(rank) => self.sorted[rank],
            Err(rank) => {
                let slot = self.entries.len();
                self.entries.push(SmolStr::new(candidate));
                self.sorted.insert(rank, slot);
                slot
            }
        }
    }

    /// Interns the decimal form of an array element's position.
    pub(crate) fn intern_position(&mut self, position: usize) -> usize {
        let mut buf = itoa::Buffer::new();
        self.intern(buf.format(position))
    }

    /// Replaces a cache entry's backing text in place. Every item holding
    /// the slot observes the new text. The slot is re-positioned in the
    /// sorted order so later lookups keep finding it.
    ///
    /// Returns `false` when `old` is not interned. Renaming onto an
    /// already interned key is a [`Error::KeyCollision`]; uniqueness of
    /// cache entries is an invariant.
    pub(crate) fn rename(&mut self, old: &str, new: &str) -> Result<bool> {
        if old == new {
            return Ok(self.lookup(old).is_some());
        }
        if self.lookup(new).is_some() {
            return Err(Error::KeyCollision {
                key: new.to_string(),
            });
        }
        let rank = match self.rank_of(old) {
            Ok(rank) => rank,
            Err(_) => return Ok(false),
        };
        let slot = self.sorted.remove(rank);
        self.entries[slot] = SmolStr::new(new);
        let insert_at = match self.rank_of(new) {
            Ok(at) | Err(at) => at,
        };
        self.sorted.insert(insert_at, slot);
        Ok(true)
    }
}
