//! Arena-backed plan trees.
//!
//! Nodes live in a vector and refer to each other by `NodeId`. Rewrite passes
//! restructure a tree through the splice operations below instead of moving
//! boxed subtrees around. Removed nodes leave a vacant slot behind.

use alloc::string::String;
use alloc::vec::Vec;
use core::fmt::Write;

pub type NodeId = usize;

#[derive(Clone, Debug)]
struct Slot<N> {
    value: N,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

#[derive(Clone, Debug)]
pub struct Tree<N> {
    slots: Vec<Option<Slot<N>>>,
    root: Option<NodeId>,
}

impl<N> Default for Tree<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<N> Tree<N> {
    pub fn new() -> Self {
        Self {
            slots: Vec::new(),
            root: None,
        }
    }

    /// Adds a detached node.
    pub fn add(&mut self, value: N) -> NodeId {
        self.slots.push(Some(Slot {
            value,
            parent: None,
            children: Vec::new(),
        }));
        self.slots.len() - 1
    }

    pub fn root(&self) -> Option<NodeId> {
        self.root
    }

    pub fn set_root(&mut self, id: NodeId) {
        self.slot_mut(id).parent = None;
        self.root = Some(id);
    }

    fn slot(&self, id: NodeId) -> &Slot<N> {
        match self.slots.get(id) {
            Some(Some(slot)) => slot,
            _ => panic!("plan node {} does not exist", id),
        }
    }

    fn slot_mut(&mut self, id: NodeId) -> &mut Slot<N> {
        match self.slots.get_mut(id) {
            Some(Some(slot)) => slot,
            _ => panic!("plan node {} does not exist", id),
        }
    }

    pub fn contains(&self, id: NodeId) -> bool {
        matches!(self.slots.get(id), Some(Some(_)))
    }

    pub fn get(&self, id: NodeId) -> &N {
        &self.slot(id).value
    }

    pub fn get_mut(&mut self, id: NodeId) -> &mut N {
        &mut self.slot_mut(id).value
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.slot(id).children
    }

    pub fn child(&self, id: NodeId, index: usize) -> Option<NodeId> {
        self.slot(id).children.get(index).copied()
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.slot(id).parent
    }

    /// Number of live nodes.
    pub fn len(&self) -> usize {
        self.slots.iter().filter(|s| s.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.root.is_none()
    }

    pub fn add_child(&mut self, parent: NodeId, child: NodeId) {
        self.slot_mut(child).parent = Some(parent);
        self.slot_mut(parent).children.push(child);
    }

    /// Convenience for building chains: adds `value` as the last child of
    /// `parent`, or as the root when there is no parent.
    pub fn push(&mut self, parent: Option<NodeId>, value: N) -> NodeId {
        let id = self.add(value);
        match parent {
            Some(parent) => self.add_child(parent, id),
            None => self.set_root(id),
        }
        id
    }

    /// Puts `new` where `old` hangs, detaching `old`.
    fn take_position(&mut self, old: NodeId, new: NodeId) {
        match self.slot(old).parent {
            Some(parent) => {
                let children = &mut self.slot_mut(parent).children;
                if let Some(pos) = children.iter().position(|c| *c == old) {
                    children[pos] = new;
                }
                self.slot_mut(new).parent = Some(parent);
            }
            None => self.set_root(new),
        }
        self.slot_mut(old).parent = None;
    }

    /// Replaces `old` with the chain `new_root .. new_leaf`; the children of
    /// `old` move below `new_leaf`. Returns the removed value.
    pub fn replace_node_with_chain(&mut self, old: NodeId, new_root: NodeId, new_leaf: NodeId) -> N {
        self.take_position(old, new_root);
        let children = core::mem::take(&mut self.slot_mut(old).children);
        for child in children {
            self.add_child(new_leaf, child);
        }
        self.free(old)
    }

    /// Replaces the chain `old_root .. old_leaf` with `new`; the children of
    /// `old_leaf` move below `new`. Nodes in between are dropped.
    pub fn replace_chain_with_node(&mut self, old_root: NodeId, old_leaf: NodeId, new: NodeId) {
        self.take_position(old_root, new);
        let children = core::mem::take(&mut self.slot_mut(old_leaf).children);
        for child in children {
            self.add_child(new, child);
        }
        let mut current = Some(old_leaf);
        while let Some(id) = current {
            current = if id == old_root { None } else { self.parent(id) };
            self.free(id);
        }
    }

    /// Removes `id`, splicing its children into its place.
    ///
    /// A root with a single child is replaced by that child.
    pub fn remove_node(&mut self, id: NodeId) -> N {
        let children = core::mem::take(&mut self.slot_mut(id).children);
        match self.slot(id).parent {
            Some(parent) => {
                let siblings = &mut self.slot_mut(parent).children;
                if let Some(pos) = siblings.iter().position(|c| *c == id) {
                    siblings.remove(pos);
                    for (i, child) in children.iter().enumerate() {
                        siblings.insert(pos + i, *child);
                    }
                }
                for child in &children {
                    self.slot_mut(*child).parent = Some(parent);
                }
            }
            None => {
                debug_assert!(children.len() <= 1, "cannot remove a root with several children");
                self.root = None;
                if let Some(child) = children.first() {
                    self.set_root(*child);
                }
            }
        }
        self.free(id)
    }

    /// Hangs the detached `node` where `child` was and puts `child` below it.
    pub fn insert_above(&mut self, child: NodeId, node: NodeId) {
        self.take_position(child, node);
        self.add_child(node, child);
    }

    /// Unhooks `child` from its parent, leaving it a free subtree.
    pub fn detach(&mut self, child: NodeId) {
        if let Some(parent) = self.slot(child).parent {
            self.slot_mut(parent).children.retain(|c| *c != child);
        }
        self.slot_mut(child).parent = None;
    }

    fn free(&mut self, id: NodeId) -> N {
        match self.slots.get_mut(id).and_then(Option::take) {
            Some(slot) => slot.value,
            None => panic!("plan node {} does not exist", id),
        }
    }

    /// Node ids in pre-order, starting at the root.
    pub fn pre_order(&self) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeId> = self.root.into_iter().collect();
        while let Some(id) = stack.pop() {
            out.push(id);
            stack.extend(self.children(id).iter().rev());
        }
        out
    }

    /// Pre-order ids of the nodes for which `pred` holds.
    pub fn find(&self, pred: impl Fn(&N) -> bool) -> Vec<NodeId> {
        self.pre_order()
            .into_iter()
            .filter(|id| pred(self.get(*id)))
            .collect()
    }

    /// Renders the tree one node per line, each line prefixed by one `-` per
    /// level of depth.
    pub fn explain(&self, label: impl Fn(&N) -> String) -> String {
        let mut out = String::new();
        let mut stack: Vec<(NodeId, usize)> = self.root.into_iter().map(|r| (r, 0)).collect();
        while let Some((id, depth)) = stack.pop() {
            for _ in 0..depth {
                out.push('-');
            }
            let _ = writeln!(out, "{}", label(self.get(id)));
            stack.extend(self.children(id).iter().rev().map(|c| (*c, depth + 1)));
        }
        out
    }
}
