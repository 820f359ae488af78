use std::collections::HashMap;

use crate::keycache::KeyCache;
use crate::walk::WalkState;

/// Datatype tag of a decoded node. Set once by the decoder; `Undefined`
/// only exists on a root that has not received its first token, or on a
/// child freshly appended through [`Document::add_child`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Datatype {
    Undefined,
    Null,
    Boolean,
    Number,
    String,
    Object,
    Array,
}

impl Datatype {
    pub fn name(self) -> &'static str {
        match self {
            Datatype::Undefined => "undefined",
            Datatype::Null => "null",
            Datatype::Boolean => "boolean",
            Datatype::Number => "number",
            Datatype::String => "string",
            Datatype::Object => "object",
            Datatype::Array => "array",
        }
    }

    pub fn is_composite(self) -> bool {
        matches!(self, Datatype::Object | Datatype::Array)
    }
}

/// Value payload matching the datatype tag. Object, array, null, and
/// undefined nodes carry no payload.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Payload {
    None,
    Boolean(bool),
    Number(f64),
    String(String),
}

/// Extension present only on object/array items: the key index plus the
/// links of the document-wide chain of finalized composites.
#[derive(Debug, Default)]
pub(crate) struct Composite {
    /// Interned key slot -> child item id. Empty until finalization.
    pub(crate) index: HashMap<usize, usize>,
    pub(crate) prev: Option<usize>,
    pub(crate) next: Option<usize>,
    /// Whether this composite has been finalized onto the chain.
    pub(crate) linked: bool,
}

/// One decoded JSON value node.
///
/// Items are owned by their [`Document`] and addressed by `usize` ids;
/// child order is insertion order and is authoritative for arrays and for
/// key iteration over objects.
#[derive(Debug)]
pub struct Item {
    pub(crate) datatype: Datatype,
    pub(crate) payload: Payload,
    /// Slot into the document's key cache; `None` for the root and for
    /// detached subtree roots.
    pub(crate) key: Option<usize>,
    pub(crate) parent: Option<usize>,
    pub(crate) children: Vec<usize>,
    pub(crate) comp: Option<Composite>,
}

impl Item {
    pub(crate) fn undefined(parent: Option<usize>, key: Option<usize>) -> Self {
        Self {
            datatype: Datatype::Undefined,
            payload: Payload::None,
            key,
            parent,
            children: Vec::new(),
            comp: None,
        }
    }

    pub fn datatype(&self) -> Datatype {
        self.datatype
    }

    pub fn is_composite(&self) -> bool {
        self.datatype.is_composite()
    }

    pub fn is_null(&self) -> bool {
        self.datatype == Datatype::Null
    }

    /// String payload, if this is a string item.
    pub fn as_str(&self) -> Option<&str> {
        match &self.payload {
            Payload::String(value) => Some(value),
            _ => None,
        }
    }

    /// Number payload, if this is a number item.
    pub fn as_f64(&self) -> Option<f64> {
        match self.payload {
            Payload::Number(value) => Some(value),
            _ => None,
        }
    }

    /// Boolean payload, if this is a boolean item.
    pub fn as_bool(&self) -> Option<bool> {
        match self.payload {
            Payload::Boolean(value) => Some(value),
            _ => None,
        }
    }

    /// Child ids in insertion order.
    pub fn children(&self) -> &[usize] {
        &self.children
    }

    pub fn num_children(&self) -> usize {
        self.children.len()
    }

    /// Replaces the payload with a string. Has no effect on object/array
    /// items; tree shape is never changed through payload mutators.
    pub fn set_string(&mut self, value: impl Into<String>) {
        if self.is_composite() {
            return;
        }
        self.datatype = Datatype::String;
        self.payload = Payload::String(value.into());
    }

    /// Replaces the payload with a number.
    pub fn set_number(&mut self, value: f64) {
        if self.is_composite() {
            return;
        }
        self.datatype = Datatype::Number;
        self.payload = Payload::Number(value);
    }

    /// Replaces the payload with a boolean.
    pub fn set_boolean(&mut self, value: bool) {
        if self.is_composite() {
            return;
        }
        self.datatype = Datatype::Boolean;
        self.payload = Payload::Boolean(value);
    }

    /// Replaces the payload with null.
    pub fn set_null(&mut self) {
        if self.is_composite() {
            return;
        }
        self.datatype = Datatype::Null;
        self.payload = Payload::None;
    }
}

/// A parsed document: the item arena, the interned keys, and the state of
/// the resumable walk.
///
/// A document is a single-owner resource: built by one parse call and
/// mutated from one execution context. Read-only traversal through
/// [`crate::Walker`] handles is safe to run concurrently once the
/// document is no longer mutated; the built-in walk in `walk_start` /
/// `advance` uses document-owned state and therefore supports one walk in
/// flight at a time.
///
/// Dropping a document releases every item, index, and interned key; the
/// arena layout keeps teardown non-recursive and safe for partially built
/// trees left behind by an aborted parse.
#[derive(Debug)]
pub struct Document {
    pub(crate) items: Vec<Item>,
    pub(crate) keys: KeyCache,
    pub(crate) walk: WalkState,
    pub(crate) first_composite: Option<usize>,
    pub(crate) last_composite: Option<usize>,
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    /// An empty document: a single undefined root with no parent.
    pub fn new() -> Self {
        Self {
            items: vec![Item::undefined(None, None)],
            keys: KeyCache::new(),
            walk: WalkState::new(),
            first_composite: None,
            last_composite: None,
        }
    }

    /// Id of the root item. The root's parent is always `None`.
    pub fn root(&self) -> usize {
        0
    }

    /// Borrows an item. Ids come from this document's own accessors;
    /// a foreign or stale id panics like any out-of-range index.
    pub fn item(&self, id: usize) -> &Item {
        &self.items[id]
    }

    /// Mutably borrows an item, for payload revision.
    pub fn item_mut(&mut self, id: usize) -> &mut Item {
        &mut self.items[id]
    }

    pub fn num_items(&self) -> usize {
        self.items.len()
    }

    /// Number of distinct interned keys in the document.
    pub fn num_keys(&self) -> usize {
        self.keys.len()
    }

    /// The item's key text, or `None` for the root and detached roots.
    pub fn key_of(&self, id: usize) -> Option<&str> {
        self.items[id].key.map(|slot| self.keys.get(slot))
    }

    /// Parent id; `None` for the root.
    pub fn parent_of(&self, id: usize) -> Option<usize> {
        self.items[id].parent
    }

    /// Bounds-checked positional child access.
    pub fn child_at(&self, id: usize, index: usize) -> Option<usize> {
        self.items[id].children.get(index).copied()
    }

    /// The item's position among its parent's children, found by
    /// identity scan.
    pub fn position_of(&self, id: usize) -> Option<usize> {
        let parent = self.items[id].parent?;
        self.items[parent].children.iter().position(|&c| c == id)
    }

    /// Sibling at a signed offset from this item's own position among its
    /// parent's children; `None` when the target falls out of range.
    pub fn sibling_at(&self, id: usize, offset: isize) -> Option<usize> {
        let parent = self.items[id].parent?;
        let position = self.items[parent].children.iter().position(|&c| c == id)?;
        let target = position.checked_add_signed(offset)?;
        self.items[parent].children.get(target).copied()
    }

    /// Appends a fresh undefined child and returns its id.
    ///
    /// Array parents get the decimal position synthesized as the child's
    /// key regardless of `key`; elsewhere `key` is interned as given (and
    /// a `None` key leaves the child reachable by position only). If the
    /// parent's index was already finalized it is rebuilt, and any walk in
    /// flight is reset.
    pub fn add_child(&mut self, parent: usize, key: Option<&str>) -> usize {
        let slot = if self.items[parent].datatype == Datatype::Array {
            Some(self.keys.intern_position(self.items[parent].children.len()))
        } else {
            key.map(|k| self.keys.intern(k))
        };
        let id = self.push_child(parent, slot);
        if self.is_indexed(parent) {
            self.rebuild_index(parent);
        }
        self.walk.reset();
        id
    }

    /// Raw append used by the decoder: the key slot is already interned.
    pub(crate) fn push_child(&mut self, parent: usize, key: Option<usize>) -> usize {
        let id = self.items.len();
        self.items.push(Item::undefined(Some(parent), key));
        self.items[parent].children.push(id);
        id
    }

    /// Unlinks an item from its parent's child sequence and index,
    /// turning it into the root of a detached subtree (no parent, no
    /// key). The subtree stays owned by the document. Returns `false`
    /// for the root and for already detached items.
    pub fn detach(&mut self, id: usize) -> bool {
        let Some(parent) = self.items[id].parent else {
            return false;
        };
        let Some(position) = self.items[parent].children.iter().position(|&c| c == id) else {
            return false;
        };
        self.items[parent].children.remove(position);
        self.items[id].parent = None;
        self.items[id].key = None;
        if self.is_indexed(parent) {
            self.rebuild_index(parent);
        }
        self.walk.reset();
        true
    }

    /// Interns `key`, returning its slot.
    pub fn intern(&mut self, key: &str) -> usize {
        self.keys.intern(key)
    }

    /// Slot of an already interned key, without inserting.
    pub fn lookup_key(&self, key: &str) -> Option<usize> {
        self.keys.lookup(key)
    }

    /// Text of an interned key slot.
    pub fn key_text(&self, slot: usize) -> &str {
        self.keys.get(slot)
    }

    /// Replaces an interned key's text in place; every item referencing
    /// the entry sees the new text, and the composite indexes stay valid
    /// because they are keyed by slot. Returns `false` when `old` is not
    /// interned; renaming onto an existing key is a
    /// [`crate::Error::KeyCollision`].
    pub fn rename_key(&mut self, old: &str, new: &str) -> crate::Result<bool> {
        self.keys.rename(old, new)
    }

    /// Applies `revise` once to every item, root first, depth-first in
    /// document order. Iterative: nesting depth is input-controlled, so
    /// even this pass stays off the native call stack.
    pub fn revise(&mut self, mut revise: impl FnMut(&mut Item)) {
        let mut pending = vec![self.root()];
        while let Some(id) = pending.pop() {
            revise(&mut self.items[id]);
            for &child in self.items[id].children.iter().rev() {
                pending.push(child);
            }
        }
    }
}
