use std::collections::HashMap;

use smallvec::SmallVec;

use crate::constants::index_capacity;
use crate::tree::{Composite, Datatype, Document};

/// Key index maintenance for composite items.
///
/// Indexes are built lazily: the decoder appends children untouched and
/// builds the hashtable in one pass when the composite's closing
/// delimiter fixes the final child count. Finalized composites are also
/// threaded onto a flat doubly linked chain in finalization order, so
/// whole-document index maintenance walks the chain instead of the tree
/// and never recurses into attacker-controlled nesting depth.
impl Document {
    /// Marks an item as an open composite of the given datatype.
    pub(crate) fn open_composite(&mut self, id: usize, datatype: Datatype) {
        self.items[id].datatype = datatype;
        self.items[id].comp = Some(Composite::default());
    }

    pub(crate) fn is_indexed(&self, id: usize) -> bool {
        self.items[id].comp.as_ref().is_some_and(|comp| comp.linked)
    }

    /// Builds the index from the final child set and links the composite
    /// onto the document-wide chain.
    pub(crate) fn finalize_composite(&mut self, id: usize) {
        self.build_index(id);
        self.link_composite(id);
    }

    fn build_index(&mut self, id: usize) {
        let pairs: SmallVec<[(usize, usize); 16]> = self.items[id]
            .children
            .iter()
            .filter_map(|&child| self.items[child].key.map(|slot| (slot, child)))
            .collect();
        let mut index = HashMap::with_capacity(index_capacity(self.items[id].children.len()));
        for (slot, child) in pairs {
            index.insert(slot, child);
        }
        if let Some(comp) = self.items[id].comp.as_mut() {
            comp.index = index;
        }
    }

    fn link_composite(&mut self, id: usize) {
        if self.is_indexed(id) {
            return;
        }
        if let Some(last) = self.last_composite {
            if let Some(comp) = self.items[last].comp.as_mut() {
                comp.next = Some(id);
            }
        } else {
            self.first_composite = Some(id);
        }
        let prev = self.last_composite;
        if let Some(comp) = self.items[id].comp.as_mut() {
            comp.prev = prev;
            comp.linked = true;
        }
        self.last_composite = Some(id);
    }

    /// O(1) lookup of a direct child by key. Unknown keys and
    /// non-composite receivers resolve to absent, not to an error.
    /// Array elements resolve through their synthesized decimal keys.
    pub fn get(&self, id: usize, key: &str) -> Option<usize> {
        let comp = self.items[id].comp.as_ref()?;
        let slot = self.keys.lookup(key)?;
        comp.index.get(&slot).copied()
    }

    /// Registers an item into its parent's index under the item's own
    /// key. The root has no parent and cannot be registered; keyless
    /// items are skipped. Returns whether an insertion happened.
    pub fn index_register(&mut self, id: usize) -> bool {
        let Some(parent) = self.items[id].parent else {
            return false;
        };
        let Some(slot) = self.items[id].key else {
            return false;
        };
        match self.items[parent].comp.as_mut() {
            Some(comp) => {
                comp.index.insert(slot, id);
                true
            }
            None => false,
        }
    }

    /// Discards and reconstructs a composite's index from its current
    /// child sequence, re-deriving capacity from the current child count.
    pub fn rebuild_index(&mut self, id: usize) {
        if self.items[id].comp.is_some() {
            self.build_index(id);
        }
    }

    /// Rebuilds every finalized index in the document by walking the
    /// composite chain.
    pub fn rebuild_all_indexes(&mut self) {
        let mut next = self.first_composite;
        while let Some(id) = next {
            self.build_index(id);
            next = self.items[id].comp.as_ref().and_then(|comp| comp.next);
        }
    }

    /// Finalized composites in chain order; the maintenance view of the
    /// document.
    pub fn composites(&self) -> Composites<'_> {
        Composites {
            doc: self,
            next: self.first_composite,
        }
    }
}

pub struct Composites<'a> {
    doc: &'a Document,
    next: Option<usize>,
}

impl Iterator for Composites<'_> {
    type Item = usize;

    fn next(&mut self) -> Option<usize> {
        let id = self.next?;
        self.next = self.doc.items[id].comp.as_ref().and_then(|comp| comp.next);
        Some(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn composite_doc() -> (Document, usize) {
        let mut doc = Document::new();
        let root = doc.root();
        doc.open_composite(root, Datatype::Object);
        (doc, root)
    }

    #[rstest::rstest]
    fn test_build_and_get() {
        let (mut doc, root) = composite_doc();
        let slot_a = doc.intern("a");
        let slot_b = doc.intern("b");
        let a = doc.push_child(root, Some(slot_a));
        let b = doc.push_child(root, Some(slot_b));
        doc.finalize_composite(root);
        assert_eq!(doc.get(root, "a"), Some(a));
        assert_eq!(doc.get(root, "b"), Some(b));
        assert_eq!(doc.get(root, "c"), None);
        assert_eq!(doc.get(a, "a"), None, "scalar receivers resolve to absent");
    }

    #[rstest::rstest]
    fn test_add_child_after_finalize_rebuilds() {
        let (mut doc, root) = composite_doc();
        doc.finalize_composite(root);
        let late = doc.add_child(root, Some("late"));
        assert_eq!(doc.get(root, "late"), Some(late));
    }

    #[rstest::rstest]
    fn test_detach_rebuilds_parent_index() {
        let (mut doc, root) = composite_doc();
        let slot = doc.intern("gone");
        let child = doc.push_child(root, Some(slot));
        doc.finalize_composite(root);
        assert_eq!(doc.get(root, "gone"), Some(child));
        assert!(doc.detach(child));
        assert_eq!(doc.get(root, "gone"), None);
    }

    #[rstest::rstest]
    fn test_chain_links_in_finalization_order() {
        let (mut doc, root) = composite_doc();
        let slot = doc.intern("inner");
        let inner = doc.push_child(root, Some(slot));
        doc.open_composite(inner, Datatype::Array);
        // inner closes first, parser-style
        doc.finalize_composite(inner);
        doc.finalize_composite(root);
        let chain: Vec<usize> = doc.composites().collect();
        assert_eq!(chain, vec![inner, root]);
    }

    #[rstest::rstest]
    fn test_index_register() {
        let (mut doc, root) = composite_doc();
        doc.finalize_composite(root);
        let slot = doc.intern("k");
        let child = doc.push_child(root, Some(slot));
        assert!(doc.index_register(child));
        assert_eq!(doc.get(root, "k"), Some(child));
        assert!(!doc.index_register(root));
    }
}
