//! Retained element tree.
//!
//! Nodes are addressed by opaque `u32` handles. Handles are sequential,
//! never recycled, and 0 is permanently invalid, so a stale handle fails
//! loudly instead of aliasing a newer node. Each node shadows a leaf in
//! the taffy tree; structural mutations keep the two in lockstep.

use std::collections::HashMap;

use taffy::TaffyTree;

use crate::error::ReefError;
use crate::types::{Node, NodeKind, PointerHandler, PointerKind};

pub struct Tree {
    pub(crate) taffy: TaffyTree<()>,
    pub(crate) nodes: HashMap<u32, Node>,
    next_handle: u32,
    root: Option<u32>,
}

impl Tree {
    pub fn new() -> Self {
        Self {
            taffy: TaffyTree::new(),
            nodes: HashMap::new(),
            next_handle: 1,
            root: None,
        }
    }

    pub fn create_node(&mut self, kind: NodeKind) -> Result<u32, ReefError> {
        let taffy_node = self
            .taffy
            .new_leaf(taffy::Style::default())
            .map_err(|e| ReefError::Layout(e.to_string()))?;
        let handle = self.next_handle;
        self.next_handle += 1;
        self.nodes.insert(handle, Node::new(kind, taffy_node));
        Ok(handle)
    }

    pub fn get(&self, handle: u32) -> Result<&Node, ReefError> {
        self.nodes.get(&handle).ok_or(ReefError::InvalidHandle(handle))
    }

    pub fn get_mut(&mut self, handle: u32) -> Result<&mut Node, ReefError> {
        self.nodes
            .get_mut(&handle)
            .ok_or(ReefError::InvalidHandle(handle))
    }

    pub fn set_root(&mut self, handle: u32) -> Result<(), ReefError> {
        self.get(handle)?;
        self.root = Some(handle);
        self.mark_dirty(handle)?;
        Ok(())
    }

    pub fn root(&self) -> Option<u32> {
        self.root
    }

    pub fn append_child(&mut self, parent: u32, child: u32) -> Result<(), ReefError> {
        let parent_node = self.get(parent)?;
        if !parent_node.kind.is_container() {
            return Err(ReefError::NotAContainer {
                parent,
                kind: parent_node.kind.name(),
            });
        }
        let parent_taffy = parent_node.taffy_node;
        let child_taffy = self.get(child)?.taffy_node;

        // Re-appending moves: detach from the old parent first.
        if let Some(old) = self.get(child)?.parent {
            self.detach(old, child)?;
        }

        self.taffy
            .add_child(parent_taffy, child_taffy)
            .map_err(|e| ReefError::Layout(e.to_string()))?;
        self.get_mut(parent)?.children.push(child);
        self.get_mut(child)?.parent = Some(parent);
        self.mark_dirty(parent)?;
        Ok(())
    }

    pub fn remove_child(&mut self, parent: u32, child: u32) -> Result<(), ReefError> {
        if self.get(child)?.parent != Some(parent) {
            return Err(ReefError::NotAChild { parent, child });
        }
        self.detach(parent, child)?;
        self.get_mut(child)?.parent = None;
        self.mark_dirty(parent)?;
        Ok(())
    }

    fn detach(&mut self, parent: u32, child: u32) -> Result<(), ReefError> {
        let parent_taffy = self.get(parent)?.taffy_node;
        let child_taffy = self.get(child)?.taffy_node;
        self.taffy
            .remove_child(parent_taffy, child_taffy)
            .map_err(|e| ReefError::Layout(e.to_string()))?;
        self.get_mut(parent)?.children.retain(|&c| c != child);
        Ok(())
    }

    /// Destroy a node and its whole subtree. The handles are gone for good;
    /// they are never reissued.
    pub fn destroy_node(&mut self, handle: u32) -> Result<(), ReefError> {
        if let Some(parent) = self.get(handle)?.parent {
            self.detach(parent, handle)?;
            self.mark_dirty(parent)?;
        }
        if self.root == Some(handle) {
            self.root = None;
        }

        let mut stack = vec![handle];
        while let Some(h) = stack.pop() {
            if let Some(node) = self.nodes.remove(&h) {
                stack.extend(&node.children);
                // Ignore failures on an already-detached taffy leaf.
                let _ = self.taffy.remove(node.taffy_node);
            }
        }
        Ok(())
    }

    pub fn set_text(&mut self, handle: u32, text: &str) -> Result<bool, ReefError> {
        let node = self.get_mut(handle)?;
        if node.content == text {
            return Ok(false);
        }
        node.content = text.to_string();
        self.mark_dirty(handle)?;
        Ok(true)
    }

    /// Register a pointer handler. Multiple handlers per kind run in
    /// registration order.
    pub fn on(
        &mut self,
        handle: u32,
        kind: PointerKind,
        handler: PointerHandler,
    ) -> Result<(), ReefError> {
        self.get_mut(handle)?
            .handlers
            .entry(kind)
            .or_default()
            .push(handler);
        Ok(())
    }

    /// Mark a node and all its ancestors dirty.
    pub fn mark_dirty(&mut self, handle: u32) -> Result<(), ReefError> {
        let mut cursor = Some(handle);
        while let Some(h) = cursor {
            let node = self.get_mut(h)?;
            if node.dirty {
                break;
            }
            node.dirty = true;
            cursor = node.parent;
        }
        Ok(())
    }

    pub fn clear_dirty(&mut self) {
        for node in self.nodes.values_mut() {
            node.dirty = false;
        }
    }

    /// Depth-first pre-order walk from the root.
    pub fn preorder(&self) -> Vec<u32> {
        let mut out = Vec::with_capacity(self.nodes.len());
        let mut stack: Vec<u32> = self.root.into_iter().collect();
        while let Some(h) = stack.pop() {
            if let Some(node) = self.nodes.get(&h) {
                out.push(h);
                // Reverse so the first child is visited first.
                stack.extend(node.children.iter().rev());
            }
        }
        out
    }
}

impl Default for Tree {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_handles_are_sequential_and_never_recycled() {
        let mut t = Tree::new();
        let a = t.create_node(NodeKind::Box).unwrap();
        let b = t.create_node(NodeKind::Text).unwrap();
        assert_eq!((a, b), (1, 2));
        t.destroy_node(a).unwrap();
        let c = t.create_node(NodeKind::Box).unwrap();
        assert_eq!(c, 3);
    }

    #[test]
    fn test_zero_and_stale_handles_are_invalid() {
        let mut t = Tree::new();
        assert!(matches!(t.get(0), Err(ReefError::InvalidHandle(0))));
        let a = t.create_node(NodeKind::Box).unwrap();
        t.destroy_node(a).unwrap();
        assert!(matches!(t.get(a), Err(ReefError::InvalidHandle(1))));
    }

    #[test]
    fn test_append_and_reparent() {
        let mut t = Tree::new();
        let a = t.create_node(NodeKind::Box).unwrap();
        let b = t.create_node(NodeKind::Box).unwrap();
        let c = t.create_node(NodeKind::Text).unwrap();
        t.append_child(a, c).unwrap();
        assert_eq!(t.get(a).unwrap().children, vec![c]);

        // Appending to a new parent moves the child.
        t.append_child(b, c).unwrap();
        assert!(t.get(a).unwrap().children.is_empty());
        assert_eq!(t.get(b).unwrap().children, vec![c]);
        assert_eq!(t.get(c).unwrap().parent, Some(b));
    }

    #[test]
    fn test_non_container_rejects_children() {
        let mut t = Tree::new();
        let text = t.create_node(NodeKind::Text).unwrap();
        let child = t.create_node(NodeKind::Box).unwrap();
        let err = t.append_child(text, child).unwrap_err();
        assert!(matches!(err, ReefError::NotAContainer { .. }));
        assert!(err.is_fatal());
    }

    #[test]
    fn test_remove_child_requires_membership() {
        let mut t = Tree::new();
        let a = t.create_node(NodeKind::Box).unwrap();
        let b = t.create_node(NodeKind::Box).unwrap();
        let err = t.remove_child(a, b).unwrap_err();
        assert!(matches!(err, ReefError::NotAChild { parent: 1, child: 2 }));
    }

    #[test]
    fn test_destroy_takes_subtree() {
        let mut t = Tree::new();
        let a = t.create_node(NodeKind::Box).unwrap();
        let b = t.create_node(NodeKind::Box).unwrap();
        let c = t.create_node(NodeKind::Text).unwrap();
        t.append_child(a, b).unwrap();
        t.append_child(b, c).unwrap();
        t.destroy_node(b).unwrap();
        assert!(t.get(b).is_err());
        assert!(t.get(c).is_err());
        assert!(t.get(a).unwrap().children.is_empty());
    }

    #[test]
    fn test_dirty_propagates_to_ancestors() {
        let mut t = Tree::new();
        let a = t.create_node(NodeKind::Box).unwrap();
        let b = t.create_node(NodeKind::Box).unwrap();
        let c = t.create_node(NodeKind::Text).unwrap();
        t.append_child(a, b).unwrap();
        t.append_child(b, c).unwrap();
        t.clear_dirty();

        t.mark_dirty(c).unwrap();
        assert!(t.get(c).unwrap().dirty);
        assert!(t.get(b).unwrap().dirty);
        assert!(t.get(a).unwrap().dirty);
    }

    #[test]
    fn test_set_text_reports_change() {
        let mut t = Tree::new();
        let a = t.create_node(NodeKind::Text).unwrap();
        t.clear_dirty();
        assert!(t.set_text(a, "hi").unwrap());
        assert!(t.get(a).unwrap().dirty);
        t.clear_dirty();
        assert!(!t.set_text(a, "hi").unwrap());
        assert!(!t.get(a).unwrap().dirty);
    }

    #[test]
    fn test_preorder_walk() {
        let mut t = Tree::new();
        let a = t.create_node(NodeKind::Box).unwrap();
        let b = t.create_node(NodeKind::Box).unwrap();
        let c = t.create_node(NodeKind::Text).unwrap();
        let d = t.create_node(NodeKind::Text).unwrap();
        t.append_child(a, b).unwrap();
        t.append_child(b, c).unwrap();
        t.append_child(a, d).unwrap();
        t.set_root(a).unwrap();
        assert_eq!(t.preorder(), vec![a, b, c, d]);
    }
}
