use smallvec::SmallVec;

use crate::constants::DEFAULT_MAX_DEPTH;
use crate::tree::Document;
use crate::{Error, Result};

/// State of the document-owned resumable walk: one "last child index
/// entered" frame per depth, plus the current position.
#[derive(Debug)]
pub(crate) struct WalkState {
    stack: SmallVec<[usize; 16]>,
    cursor: Option<usize>,
    max_depth: usize,
}

impl WalkState {
    pub(crate) fn new() -> Self {
        Self {
            stack: SmallVec::new(),
            cursor: None,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }

    pub(crate) fn reset(&mut self) {
        self.stack.clear();
        self.cursor = None;
    }

    pub(crate) fn set_max_depth(&mut self, max_depth: usize) {
        self.max_depth = max_depth.max(1);
    }
}

impl Document {
    /// Caps the resumable walk's index stack, in tree levels.
    pub fn set_walk_depth(&mut self, max_depth: usize) {
        self.walk.set_max_depth(max_depth);
    }

    /// Starts (or restarts) the resumable walk at the root and returns
    /// the root id, the walk's first visit. Structural mutation resets
    /// an in-flight walk; call this again afterwards.
    pub fn walk_start(&mut self) -> usize {
        self.walk.reset();
        self.walk.cursor = Some(self.root());
        self.root()
    }

    /// Steps the resumable walk to the next item in depth-first document
    /// order, or `Ok(None)` once the walk is complete.
    ///
    /// Descending past the configured depth is [`Error::TraversalOverflow`];
    /// ascending from an item the stack no longer accounts for is
    /// [`Error::TraversalUnderflow`]. Both leave the tree untouched.
    pub fn advance(&mut self) -> Result<Option<usize>> {
        let Some(mut cur) = self.walk.cursor else {
            return Ok(None);
        };
        // unvisited children: push a frame and descend
        if !self.items[cur].children.is_empty() {
            if self.walk.stack.len() >= self.walk.max_depth {
                return Err(Error::TraversalOverflow {
                    max_depth: self.walk.max_depth,
                });
            }
            self.walk.stack.push(0);
            let child = self.items[cur].children[0];
            self.walk.cursor = Some(child);
            return Ok(Some(child));
        }
        // pop frames until one still has an unexplored sibling
        loop {
            let depth = self.walk.stack.len();
            if depth == 0 {
                self.walk.cursor = None;
                return Ok(None);
            }
            let Some(parent) = self.items[cur].parent else {
                self.walk.cursor = None;
                return Err(Error::TraversalUnderflow);
            };
            let entered = self.walk.stack[depth - 1];
            if entered + 1 < self.items[parent].children.len() {
                self.walk.stack[depth - 1] = entered + 1;
                let next = self.items[parent].children[entered + 1];
                self.walk.cursor = Some(next);
                return Ok(Some(next));
            }
            self.walk.stack.pop();
            cur = parent;
        }
    }

    /// An independent read-only walk over the whole document. Each
    /// walker owns its stack, so any number may run at once.
    pub fn walker(&self) -> Walker<'_> {
        Walker::new(self, self.root())
    }

    /// An independent read-only walk over the subtree rooted at `origin`.
    pub fn walker_from(&self, origin: usize) -> Walker<'_> {
        Walker::new(self, origin)
    }
}

/// Caller-owned depth-first iterator over a (sub)tree, origin included.
/// The stack grows on the heap as needed; the document's walk-depth cap
/// applies only to the document-owned walk.
pub struct Walker<'a> {
    doc: &'a Document,
    stack: SmallVec<[usize; 16]>,
    cursor: Option<usize>,
    origin_pending: bool,
}

impl<'a> Walker<'a> {
    fn new(doc: &'a Document, origin: usize) -> Self {
        Self {
            doc,
            stack: SmallVec::new(),
            cursor: Some(origin),
            origin_pending: true,
        }
    }
}

impl Iterator for Walker<'_> {
    type Item = usize;

    fn next(&mut self) -> Option<usize> {
        if self.origin_pending {
            self.origin_pending = false;
            return self.cursor;
        }
        let mut cur = self.cursor?;
        let items = &self.doc.items;
        if !items[cur].children.is_empty() {
            self.stack.push(0);
            let child = items[cur].children[0];
            self.cursor = Some(child);
            return Some(child);
        }
        loop {
            let depth = self.stack.len();
            if depth == 0 {
                self.cursor = None;
                return None;
            }
            let parent = items[cur].parent?;
            let entered = self.stack[depth - 1];
            if entered + 1 < items[parent].children.len() {
                self.stack[depth - 1] = entered + 1;
                let next = items[parent].children[entered + 1];
                self.cursor = Some(next);
                return Some(next);
            }
            self.stack.pop();
            cur = parent;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> (Document, Vec<usize>) {
        // root -> [a -> [a0, a1], b]
        let mut doc = Document::new();
        let root = doc.root();
        let a = doc.add_child(root, Some("a"));
        let a0 = doc.add_child(a, Some("a0"));
        let a1 = doc.add_child(a, Some("a1"));
        let b = doc.add_child(root, Some("b"));
        (doc, vec![root, a, a0, a1, b])
    }

    #[rstest::rstest]
    fn test_advance_visits_document_order() {
        let (mut doc, order) = sample();
        let mut seen = vec![doc.walk_start()];
        while let Some(id) = doc.advance().unwrap() {
            seen.push(id);
        }
        assert_eq!(seen, order);
        // completed walk stays completed
        assert_eq!(doc.advance().unwrap(), None);
    }

    #[rstest::rstest]
    fn test_walk_restart() {
        let (mut doc, order) = sample();
        doc.walk_start();
        doc.advance().unwrap();
        let mut seen = vec![doc.walk_start()];
        while let Some(id) = doc.advance().unwrap() {
            seen.push(id);
        }
        assert_eq!(seen, order);
    }

    #[rstest::rstest]
    fn test_overflow_is_reported_not_corrupting() {
        let (mut doc, _) = sample();
        doc.set_walk_depth(1);
        doc.walk_start();
        doc.advance().unwrap(); // into `a`, depth 1
        let err = doc.advance().unwrap_err();
        assert_eq!(err, Error::TraversalOverflow { max_depth: 1 });
    }

    #[rstest::rstest]
    fn test_walker_matches_advance() {
        let (doc, order) = sample();
        let seen: Vec<usize> = doc.walker().collect();
        assert_eq!(seen, order);
    }

    #[rstest::rstest]
    fn test_walker_from_subtree_only() {
        let (doc, order) = sample();
        let a = order[1];
        let seen: Vec<usize> = doc.walker_from(a).collect();
        assert_eq!(seen, order[1..4].to_vec());
    }

    #[rstest::rstest]
    fn test_two_walkers_at_once() {
        let (doc, order) = sample();
        let mut first = doc.walker();
        let mut second = doc.walker();
        first.next();
        first.next();
        assert_eq!(second.next(), Some(order[0]));
        assert_eq!(first.next(), Some(order[2]));
    }
}
