//! Node structures for rich-text document trees.
//!
//! A document is a tree of `NodeInner` values shared through `NodeRef`
//! handles. Children are owned by their parent; the parent link is weak and
//! only used for upward queries. Every node carries a `ModificationType`
//! describing its edit status relative to an origin version.

mod content;
mod tree;

pub use content::{NodeContent, TagContent, TextContent};
pub use tree::{
    ancestors, children_excluding_insertions, clone_subtree, content_equal, index_of, leaves,
    DfsTreeIterator,
};

use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_ID: AtomicU64 = AtomicU64::new(1);

fn next_node_id() -> u64 {
    NEXT_ID.fetch_add(1, Ordering::Relaxed)
}

/// Edit status of a node relative to an origin version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ModificationType {
    /// Unchanged.
    #[default]
    None,
    /// Inserted in the descendant.
    Added,
    /// Deleted from the origin.
    Removed,
    /// Present on both sides with different surrounding markup.
    Changed,
    /// Marked conflicting.
    Conflict,
}

impl ModificationType {
    /// Returns the lowercase name used in logs and XML output.
    pub fn name(&self) -> &'static str {
        match self {
            ModificationType::None => "none",
            ModificationType::Added => "added",
            ModificationType::Removed => "removed",
            ModificationType::Changed => "changed",
            ModificationType::Conflict => "conflict",
        }
    }

    /// Returns true for anything but `None`.
    pub fn is_modified(&self) -> bool {
        *self != ModificationType::None
    }
}

impl fmt::Display for ModificationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Shared handle to a document node.
pub type NodeRef = Rc<RefCell<NodeInner>>;

/// Creates a detached node holding `content`.
pub fn new_node(content: NodeContent) -> NodeRef {
    Rc::new(RefCell::new(NodeInner::new(content)))
}

/// A document node: its content, its edit status and its place in the tree.
#[derive(Debug)]
pub struct NodeInner {
    /// Process-wide unique, used to key side tables.
    id: u64,
    children: Vec<NodeRef>,
    content: NodeContent,
    parent: Weak<RefCell<NodeInner>>,
    /// Index in the parent's child list, -1 while detached.
    child_pos: i32,
    modification: ModificationType,
    /// Cached result of `children_excluding_insertions`.
    excluded_memo: Option<Vec<NodeRef>>,
}

impl NodeInner {
    pub fn new(content: NodeContent) -> Self {
        NodeInner {
            id: next_node_id(),
            children: Vec::new(),
            content,
            parent: Weak::new(),
            child_pos: -1,
            modification: ModificationType::None,
            excluded_memo: None,
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn content(&self) -> &NodeContent {
        &self.content
    }

    /// Edit status relative to the origin version.
    pub fn modification(&self) -> ModificationType {
        self.modification
    }

    pub fn child_count(&self) -> usize {
        self.children.len()
    }

    pub fn child(&self, index: usize) -> Option<&NodeRef> {
        self.children.get(index)
    }

    pub fn children(&self) -> &[NodeRef] {
        &self.children
    }

    /// Link to the parent; dangling for the body and for detached nodes.
    pub fn parent(&self) -> &Weak<RefCell<NodeInner>> {
        &self.parent
    }

    /// Index among the parent's children, or -1 without a parent.
    pub fn child_pos(&self) -> i32 {
        self.child_pos
    }

    /// Returns the tag name, if this is a tag.
    pub fn qname(&self) -> Option<&str> {
        self.content.qname()
    }

    pub(crate) fn excluded_memo(&self) -> Option<&Vec<NodeRef>> {
        self.excluded_memo.as_ref()
    }

    pub(crate) fn set_excluded_memo(&mut self, memo: Vec<NodeRef>) {
        self.excluded_memo = Some(memo);
    }

    fn renumber_from(&mut self, start: usize) {
        for (i, child) in self.children.iter().enumerate().skip(start) {
            child.borrow_mut().child_pos = i as i32;
        }
    }
}

/// Tree edits. These take the handle because they update both ends of a
/// parent link.
impl NodeInner {
    /// Sets the modification of a node.
    ///
    /// The parent's cached insertion-free child list depends on the
    /// modification of its children, so it is invalidated here.
    pub fn set_modification_of_ref(node_ref: &NodeRef, modification: ModificationType) {
        let parent = {
            let mut node = node_ref.borrow_mut();
            if node.modification == modification {
                return;
            }
            node.modification = modification;
            node.excluded_memo = None;
            node.parent.upgrade()
        };
        if let Some(parent) = parent {
            parent.borrow_mut().excluded_memo = None;
        }
    }

    /// Appends `child_ref` as the last child of `parent_ref`.
    pub fn add_child_to_ref(parent_ref: &NodeRef, child_ref: NodeRef) {
        let len = parent_ref.borrow().children.len();
        NodeInner::add_child_at_to_ref(parent_ref, len, child_ref);
    }

    /// Inserts a child at the given index. Indices past the end append.
    pub fn add_child_at_to_ref(parent_ref: &NodeRef, index: usize, child_ref: NodeRef) {
        let index = index.min(parent_ref.borrow().children.len());
        {
            let mut child = child_ref.borrow_mut();
            child.parent = Rc::downgrade(parent_ref);
            child.child_pos = index as i32;
        }
        let mut parent = parent_ref.borrow_mut();
        parent.children.insert(index, child_ref);
        parent.renumber_from(index + 1);
        parent.excluded_memo = None;
    }

    /// Removes the child at the given index and returns it detached.
    pub fn remove_child_to_ref(parent_ref: &NodeRef, index: usize) -> Option<NodeRef> {
        let removed = {
            let mut parent = parent_ref.borrow_mut();
            if index >= parent.children.len() {
                return None;
            }
            let removed = parent.children.remove(index);
            parent.renumber_from(index);
            parent.excluded_memo = None;
            removed
        };
        {
            let mut child = removed.borrow_mut();
            child.parent = Weak::new();
            child.child_pos = -1;
        }
        Some(removed)
    }

    /// Detaches a node from its parent. Returns false for roots.
    pub fn detach_ref(node_ref: &NodeRef) -> bool {
        let (parent, pos) = {
            let node = node_ref.borrow();
            (node.parent.upgrade(), node.child_pos)
        };
        match parent {
            Some(parent) if pos >= 0 => {
                NodeInner::remove_child_to_ref(&parent, pos as usize).is_some()
            }
            _ => false,
        }
    }
}
